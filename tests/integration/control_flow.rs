mod common;
use bcnative::diagnostics::CompileError;
use common::{assert_in_order, count, lower_code, lower_code_err, lower_method, method};
use serde_json::json;

#[test]
fn unreferenced_label_has_no_anchor() {
    let text = lower_code(json!([
        {"kind": "label", "id": 3},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(!text.contains("label_3"));
}

#[test]
fn backward_branch_gets_one_anchor_at_column_zero() {
    let text = lower_method(method(
        "(I)V",
        json!([
            {"kind": "label", "id": 1},
            {"kind": "iinc", "slot": 0, "delta": 1},
            {"kind": "insn", "op": "iload_0"},
            {"kind": "insn", "op": "bipush", "operand": 10},
            {"kind": "jump", "op": "if_icmplt", "target": 1},
            {"kind": "insn", "op": "return"},
        ]),
    ));
    assert_eq!(count(&text, "label_1: ;"), 1);
    assert!(text.contains("\nlabel_1: ;\n"));
    assert_in_order(
        &text,
        &[
            "label_1: ;",
            "ilocals_0_ += 1;",
            "PUSH_INT(ilocals_0_);",
            "PUSH_INT(10);",
            "JAVA_INT __b = POP_INT();",
            "JAVA_INT __a = POP_INT();",
            "if (__a < __b) goto label_1;",
        ],
    );
}

#[test]
fn single_operand_branches_pop_and_compare_with_zero() {
    let text = lower_method(method(
        "(I)V",
        json!([
            {"kind": "insn", "op": "iload_0"},
            {"kind": "jump", "op": "ifeq", "target": 2},
            {"kind": "insn", "op": "iload_0"},
            {"kind": "jump", "op": "ifge", "target": 2},
            {"kind": "label", "id": 2},
            {"kind": "insn", "op": "return"},
        ]),
    ));
    assert!(text.contains("    if (POP_INT() == 0) goto label_2;\n"));
    assert!(text.contains("    if (POP_INT() >= 0) goto label_2;\n"));
}

#[test]
fn reference_compares_release_both_operands() {
    let text = lower_method(method(
        "(Ljava/lang/Object;Ljava/lang/Object;)V",
        json!([
            {"kind": "insn", "op": "aload_0"},
            {"kind": "insn", "op": "aload_1"},
            {"kind": "jump", "op": "if_acmpne", "target": 2},
            {"kind": "insn", "op": "aload_0"},
            {"kind": "jump", "op": "ifnonnull", "target": 2},
            {"kind": "label", "id": 2},
            {"kind": "insn", "op": "return"},
        ]),
    ));
    assert_in_order(
        &text,
        &[
            "JAVA_OBJECT __b = POP_OBJ();",
            "JAVA_OBJECT __a = POP_OBJ();",
            "JAVA_BOOLEAN __cond = __a != __b;",
            "RELEASE(__a);",
            "RELEASE(__b);",
            "if (__cond) goto label_2;",
            "JAVA_OBJECT __v = POP_OBJ();",
            "JAVA_BOOLEAN __cond = __v != JAVA_NULL;",
            "RELEASE(__v);",
            "if (__cond) goto label_2;",
        ],
    );
}

#[test]
fn condition_override_replaces_the_default_test() {
    let text = lower_method(method(
        "(I)V",
        json!([
            {"kind": "jump", "op": "ifeq", "target": 2, "condition": "ilocals_0_ > 3"},
            {"kind": "label", "id": 2},
            {"kind": "insn", "op": "return"},
        ]),
    ));
    assert!(text.contains("    if (ilocals_0_ > 3) goto label_2;\n"));
    assert!(!text.contains("POP_INT()"));
}

#[test]
fn tableswitch_lowers_to_c_switch() {
    let text = lower_method(method(
        "(I)V",
        json!([
            {"kind": "insn", "op": "iload_0"},
            {"kind": "switch", "low": 0, "targets": [1, 2], "default": 3},
            {"kind": "label", "id": 1},
            {"kind": "label", "id": 2},
            {"kind": "label", "id": 3},
            {"kind": "insn", "op": "return"},
        ]),
    ));
    assert!(text.contains(
        "    switch (POP_INT()) {
        case 0: goto label_1;
        case 1: goto label_2;
        default: goto label_3;
    }
"
    ));
}

#[test]
fn lookupswitch_keys_are_c_literals() {
    let text = lower_method(method(
        "(I)V",
        json!([
            {"kind": "insn", "op": "iload_0"},
            {"kind": "switch", "keys": [-2147483648, 7], "targets": [1, 1]},
            {"kind": "label", "id": 1},
            {"kind": "insn", "op": "return"},
        ]),
    ));
    assert!(text.contains("case (-2147483647 - 1): goto label_1;"));
    assert!(text.contains("case 7: goto label_1;"));
    assert!(!text.contains("default:"));
}

#[test]
fn switch_inside_try_region_uses_catch_depths() {
    let mut m = method(
        "(I)V",
        json!([
            {"kind": "label", "id": 1},
            {"kind": "insn", "op": "iload_0"},
            {"kind": "switch", "keys": [1], "targets": [4], "default": 5},
            {"kind": "label", "id": 4},
            {"kind": "label", "id": 2},
            {"kind": "label", "id": 5},
            {"kind": "insn", "op": "return"},
            {"kind": "label", "id": 3},
            {"kind": "insn", "op": "athrow"},
        ]),
    );
    m["try_catch"] = json!([{"start": 1, "end": 2, "handler": 3}]);
    let text = lower_method(m);
    assert!(text.contains("case 1: JUMP_TO(label_4, 1);"));
    assert!(text.contains("default: JUMP_TO(label_5, 0);"));
}

#[test]
fn regions_sharing_a_start_open_outer_first() {
    let mut m = method(
        "()V",
        json!([
            {"kind": "label", "id": 1},
            {"kind": "insn", "op": "nop"},
            {"kind": "label", "id": 2},
            {"kind": "insn", "op": "nop"},
            {"kind": "label", "id": 3},
            {"kind": "insn", "op": "return"},
            {"kind": "label", "id": 5},
            {"kind": "insn", "op": "athrow"},
            {"kind": "label", "id": 6},
            {"kind": "insn", "op": "athrow"},
        ]),
    );
    m["try_catch"] = json!([
        {"start": 1, "end": 2, "handler": 5, "catch_type": "a/E1"},
        {"start": 1, "end": 3, "handler": 6},
    ]);
    let text = lower_method(m);
    assert_in_order(
        &text,
        &[
            "SAVE_TRY_OFFSET(__try_offset_1);",
            "BEGIN_TRY(CATCH_ALL, label_6, __try_offset_1);",
            "SAVE_TRY_OFFSET(__try_offset_0);",
            "BEGIN_TRY(CLASS_ID_a_E1, label_5, __try_offset_0);",
            "label_2: ;",
            "END_TRY(__try_offset_0);",
            "label_3: ;",
            "END_TRY(__try_offset_1);",
            "EXIT_TRY_SCOPES();",
            "return;",
            "label_5: ;",
            "THROW(POP_OBJ());",
        ],
    );
}

#[test]
fn returns_inside_methods_with_regions_exit_scopes_first() {
    let mut m = method(
        "(Ljava/lang/String;)Ljava/lang/String;",
        json!([
            {"kind": "label", "id": 1},
            {"kind": "insn", "op": "aload_0"},
            {"kind": "label", "id": 2},
            {"kind": "insn", "op": "areturn"},
            {"kind": "label", "id": 3},
            {"kind": "insn", "op": "athrow"},
        ]),
    );
    m["try_catch"] = json!([{"start": 1, "end": 2, "handler": 3}]);
    let text = lower_method(m);
    assert_in_order(
        &text,
        &[
            "JAVA_OBJECT __ret = POP_OBJ();",
            "EXIT_TRY_SCOPES();",
            "RELEASE(olocals_0_);",
            "return AUTORELEASE(__ret);",
        ],
    );
}

#[test]
fn jsr_and_ret_are_unsupported() {
    let err = lower_code_err(json!([
        {"kind": "jump", "op": "jsr", "target": 1},
        {"kind": "label", "id": 1},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(matches!(err.root(), CompileError::Unsupported { .. }));
    assert!(err.to_string().contains("jsr"));

    let err = lower_code_err(json!([
        {"kind": "var", "op": "ret", "slot": 1},
    ]));
    assert!(matches!(err.root(), CompileError::Unsupported { .. }));
}

#[test]
fn jump_to_missing_label_is_rejected() {
    let err = lower_code_err(json!([
        {"kind": "jump", "op": "goto", "target": 99},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(matches!(err.root(), CompileError::Unsupported { .. }));
    assert!(err.to_string().contains("label_99"));
}

#[test]
fn region_closed_before_it_opens_is_unbalanced() {
    let mut m = method(
        "()V",
        json!([
            {"kind": "label", "id": 2},
            {"kind": "label", "id": 1},
            {"kind": "label", "id": 3},
            {"kind": "insn", "op": "return"},
        ]),
    );
    m["try_catch"] = json!([{"start": 1, "end": 2, "handler": 3}]);
    let err = common::try_lower_method(m, &Default::default()).unwrap_err();
    assert!(matches!(err.root(), CompileError::UnbalancedTry { .. }));
}

#[test]
fn crossing_regions_are_unbalanced() {
    let mut m = method(
        "()V",
        json!([
            {"kind": "label", "id": 1},
            {"kind": "label", "id": 2},
            {"kind": "label", "id": 3},
            {"kind": "label", "id": 4},
            {"kind": "insn", "op": "return"},
            {"kind": "label", "id": 9},
            {"kind": "insn", "op": "athrow"},
        ]),
    );
    m["try_catch"] = json!([
        {"start": 1, "end": 3, "handler": 9},
        {"start": 2, "end": 4, "handler": 9},
    ]);
    let err = common::try_lower_method(m, &Default::default()).unwrap_err();
    assert!(matches!(err.root(), CompileError::UnbalancedTry { .. }));
    assert!(err.to_string().contains("nesting order"));
}
