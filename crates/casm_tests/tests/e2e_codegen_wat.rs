mod common;

use common::compile_to_wat;

fn trimmed_lines(wat: &str) -> Vec<&str> {
    wat.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

#[test]
fn arithmetic_lowers_to_the_stack_sequence() {
    let wat = compile_to_wat("i32 main() { i32 x = 2 + 3 * 4; return x; }");
    let ops = trimmed_lines(&wat);
    let func = ops
        .iter()
        .position(|l| l.starts_with("(func $main"))
        .expect("main emitted");
    assert_eq!(
        &ops[func + 1..func + 9],
        &[
            "i32.const 2",
            "i32.const 3",
            "i32.const 4",
            "i32.mul",
            "i32.add",
            "local.set $x",
            "local.get $x",
            "return",
        ],
        "got:\n{}",
        wat
    );
    assert!(wat.contains("(local $x i32)"), "got:\n{}", wat);
}

#[test]
fn assignment_expressions_use_local_tee() {
    let wat = compile_to_wat("i32 main() { i32 x; return (x = 1) + (x = 2); }");
    assert_eq!(wat.matches("local.tee $x").count(), 2, "got:\n{}", wat);
}

#[test]
fn plain_module_has_no_debug_machinery() {
    let wat = compile_to_wat("i32 main() { return 0; }");
    assert!(!wat.contains("import"), "got:\n{}", wat);
    assert!(!wat.contains("memory"), "got:\n{}", wat);
    assert!(!wat.contains("(data"), "got:\n{}", wat);
    assert!(wat.contains("(export \"main\" (func $main))"), "got:\n{}", wat);
}

#[test]
fn dbg_imports_the_host_interface_and_exports_memory() {
    let wat = compile_to_wat(
        "i32 main() {\n    i32 x = 5;\n    dbg(x, x + 1);\n    return 0;\n}",
    );
    assert!(wat.contains("(import \"host\" \"debug_begin\" (func $debug_begin (param i32 i32)))"));
    assert!(wat.contains("(import \"host\" \"debug_value_i32\" (func $debug_value_i32 (param i32)))"));
    assert!(wat.contains("(import \"host\" \"debug_value_i64\" (func $debug_value_i64 (param i64)))"));
    assert!(wat.contains("(import \"host\" \"debug_value_u32\" (func $debug_value_u32 (param i32)))"));
    assert!(wat.contains("(import \"host\" \"debug_value_u64\" (func $debug_value_u64 (param i64)))"));
    assert!(wat.contains("(import \"host\" \"debug_value_bool\" (func $debug_value_bool (param i32)))"));
    assert!(wat.contains("(import \"host\" \"debug_end\" (func $debug_end))"));
    assert!(wat.contains("(memory 1)"));
    assert!(wat.contains("(export \"memory\" (memory 0))"));

    let ops = trimmed_lines(&wat);
    let begin = ops.iter().position(|l| *l == "call $debug_begin").unwrap();
    let format = "test.csm:3:4: x = %, x + 1 = %";
    assert_eq!(ops[begin - 2], "i32.const 0");
    assert_eq!(ops[begin - 1], format!("i32.const {}", format.len()));
    assert_eq!(
        &ops[begin + 1..begin + 8],
        &[
            "local.get $x",
            "call $debug_value_i32",
            "local.get $x",
            "i32.const 1",
            "i32.add",
            "call $debug_value_i32",
            "call $debug_end",
        ],
        "got:\n{}",
        wat
    );
    assert!(
        wat.contains("(data (i32.const 0) \"test.csm:3:4: x = %, x + 1 = %\")"),
        "got:\n{}",
        wat
    );
}

#[test]
fn format_pool_offsets_accumulate() {
    let wat = compile_to_wat(
        "i32 main() {\n    i32 x = 1;\n    dbg(x);\n    dbg(x + x);\n    return 0;\n}",
    );
    let first = "test.csm:3:4: x = %";
    let second = "test.csm:4:4: x + x = %";
    let ops = trimmed_lines(&wat);
    let begins: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, l)| **l == "call $debug_begin")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(begins.len(), 2);
    assert_eq!(ops[begins[0] - 2], "i32.const 0");
    assert_eq!(ops[begins[0] - 1], format!("i32.const {}", first.len()));
    assert_eq!(ops[begins[1] - 2], format!("i32.const {}", first.len()));
    assert_eq!(ops[begins[1] - 1], format!("i32.const {}", second.len()));
    assert!(
        wat.contains(&format!("(data (i32.const 0) \"{}\" \"{}\")", first, second)),
        "got:\n{}",
        wat
    );
}

#[test]
fn dbg_nested_deep_in_control_flow_is_found() {
    let wat = compile_to_wat(
        "i32 main() {\n\
             i32 x = 0;\n\
             while (x < 3) {\n\
                 if (x == 1) {\n\
                     dbg(x);\n\
                 }\n\
                 x = x + 1;\n\
             }\n\
             return x;\n\
         }",
    );
    assert!(wat.contains("(import \"host\" \"debug_begin\""), "got:\n{}", wat);
    assert!(wat.contains("call $debug_begin"), "got:\n{}", wat);
}

#[test]
fn while_loop_uses_block_loop_with_negated_condition() {
    let wat = compile_to_wat("i32 main() { i32 x = 0; while (x < 3) { x = x + 1; } return x; }");
    let ops = trimmed_lines(&wat);
    let block = ops.iter().position(|l| *l == "block $break").unwrap();
    assert_eq!(ops[block + 1], "loop $continue");
    assert_eq!(ops[block + 2], "local.get $x");
    assert_eq!(ops[block + 3], "i32.const 3");
    assert_eq!(ops[block + 4], "i32.lt_s");
    assert_eq!(ops[block + 5], "i32.eqz");
    assert_eq!(ops[block + 6], "br_if $break");
    let back = ops.iter().position(|l| *l == "br $continue").unwrap();
    assert_eq!(ops[back + 1], "end");
    assert_eq!(ops[back + 2], "end");
}

#[test]
fn for_loop_emits_init_condition_update() {
    let wat = compile_to_wat(
        "i32 main() { i32 acc = 0; for (i32 i = 0; i < 4; i = i + 1) { acc = acc + i; } return acc; }",
    );
    let ops = trimmed_lines(&wat);
    // Init runs before the loop.
    let block = ops.iter().position(|l| *l == "block $break").unwrap();
    assert!(ops[..block].contains(&"local.set $i"), "got:\n{}", wat);
    // Update runs immediately before the back branch.
    let back = ops.iter().rposition(|l| *l == "br $continue").unwrap();
    assert_eq!(ops[back - 1], "drop");
    assert_eq!(ops[back - 2], "local.tee $i");
}

#[test]
fn negation_pushes_zero_first() {
    let wat = compile_to_wat("i32 main() { i32 x = 5; return -x; }");
    let ops = trimmed_lines(&wat);
    let zero = ops.iter().rposition(|l| *l == "i32.const 0").unwrap();
    assert_eq!(ops[zero + 1], "local.get $x");
    assert_eq!(ops[zero + 2], "i32.sub");
}

#[test]
fn logical_operators_lower_to_bitwise_ops() {
    let wat = compile_to_wat(
        "i32 main() { bool a = true; bool b = false; if (a && b) { return 1; } if (a || b) { return 2; } return 0; }",
    );
    assert!(wat.contains("i32.and"), "got:\n{}", wat);
    assert!(wat.contains("i32.or"), "got:\n{}", wat);
}

#[test]
fn booleans_are_zero_and_one() {
    let wat = compile_to_wat("i32 main() { bool t = true; bool f = false; if (t) { return 1; } if (f) { return 2; } return 0; }");
    assert!(wat.contains("i32.const 1"), "got:\n{}", wat);
    assert!(wat.contains("i32.const 0"), "got:\n{}", wat);
}

#[test]
fn calls_push_arguments_in_order() {
    let wat = compile_to_wat(
        "i32 sub(i32 a, i32 b) { return a - b; }\ni32 main() { return sub(10, 4); }",
    );
    let ops = trimmed_lines(&wat);
    let call = ops.iter().position(|l| *l == "call $sub").unwrap();
    assert_eq!(ops[call - 2], "i32.const 10");
    assert_eq!(ops[call - 1], "i32.const 4");
}

#[test]
fn qualified_bool_channel_is_used_for_bool_arguments() {
    let wat = compile_to_wat("i32 main() { bool flag = 1 < 2; dbg(flag); return 0; }");
    assert!(wat.contains("call $debug_value_bool"), "got:\n{}", wat);
}

#[test]
fn program_without_main_emits_no_functions() {
    let wat = compile_to_wat("i32 helper() { return 1; }");
    assert!(!wat.contains("(func"), "got:\n{}", wat);
    assert!(wat.starts_with("(module"), "got:\n{}", wat);
}
