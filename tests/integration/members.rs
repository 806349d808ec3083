mod common;
use bcnative::config::LowerOptions;
use bcnative::diagnostics::CompileError;
use common::{
    assert_in_order, lower_code, lower_code_err, lower_code_unreduced, lower_method,
    lower_method_unreduced, method,
};
use serde_json::{Value, json};

fn instance(descriptor: &str, code: Value) -> Value {
    let mut m = method(descriptor, code);
    m["is_static"] = json!(false);
    m
}

// Static fields

#[test]
fn getstatic_pushes_accessor_result() {
    let text = lower_code(json!([
        {"kind": "field", "op": "getstatic", "owner": "a/Conf", "name": "LIMIT", "descriptor": "I"},
        {"kind": "insn", "op": "pop"},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(text.contains("    PUSH_INT(get_static_a_Conf_LIMIT(threadStateData));\n"));
}

#[test]
fn putstatic_of_object_releases_the_popped_value() {
    let text = lower_code(json!([
        {"kind": "insn", "op": "aconst_null"},
        {"kind": "field", "op": "putstatic", "owner": "a/Conf", "name": "name", "descriptor": "Ljava/lang/String;"},
        {"kind": "insn", "op": "iconst_4"},
        {"kind": "field", "op": "putstatic", "owner": "a/Conf", "name": "size", "descriptor": "I"},
        {"kind": "insn", "op": "return"},
    ]));
    assert_in_order(
        &text,
        &[
            "PUSH_OBJ(JAVA_NULL);",
            "JAVA_OBJECT __value = POP_OBJ();",
            "set_static_a_Conf_name(threadStateData, __value);",
            "RELEASE(__value);",
            "PUSH_INT(4);",
            "set_static_a_Conf_size(threadStateData, POP_INT());",
        ],
    );
}

#[test]
fn inherited_static_field_resolves_declaring_class() {
    let source = json!({
        "classes": [
            {"name": "t/Base", "fields": [{"name": "COUNT", "descriptor": "I", "is_static": true}]},
            {
                "name": "t/Main",
                "super_name": "t/Base",
                "methods": [{
                    "name": "run",
                    "descriptor": "()I",
                    "is_static": true,
                    "code": [
                        {"kind": "field", "op": "getstatic", "owner": "t/Main", "name": "COUNT", "descriptor": "I"},
                        {"kind": "insn", "op": "ireturn"},
                    ],
                }],
            },
        ]
    })
    .to_string();
    let unit = bcnative::lower_source(&source, &LowerOptions::default()).unwrap();
    assert!(unit.methods[0].code.contains("PUSH_INT(get_static_t_Base_COUNT(threadStateData));"));
}

// Instance fields

#[test]
fn getfield_on_popped_object_null_checks_and_releases() {
    let text = lower_method(method(
        "(Lt/Point;)I",
        json!([
            {"kind": "insn", "op": "aload_0"},
            {"kind": "field", "op": "getfield", "owner": "t/Point", "name": "x", "descriptor": "I"},
            {"kind": "insn", "op": "ireturn"},
        ]),
    ));
    assert!(text.contains(
        "    {
        JAVA_OBJECT __object = POP_OBJ();
        CHECK_NULL(__object);
        PUSH_INT(get_field_t_Point_x(__object));
        RELEASE(__object);
    }
"
    ));
}

#[test]
fn getfield_on_receiver_reads_through_this() {
    let text = lower_method_unreduced(instance(
        "()Ljava/lang/String;",
        json!([
            {"kind": "insn", "op": "aload_0"},
            {"kind": "field", "op": "getfield", "owner": "t/Main", "name": "label", "descriptor": "Ljava/lang/String;"},
            {"kind": "insn", "op": "areturn"},
        ]),
    ));
    assert!(text.contains("    PUSH_OBJ(RETAIN(get_field_t_Main_label(__this)));\n"));
    assert!(!text.contains("CHECK_NULL"));
}

#[test]
fn putfield_on_receiver_skips_object_pop() {
    let text = lower_method(instance(
        "(Ljava/lang/String;)V",
        json!([
            {"kind": "insn", "op": "aload_1"},
            {"kind": "field", "op": "putfield", "owner": "t/Main", "name": "label",
             "descriptor": "Ljava/lang/String;", "use_this": true},
            {"kind": "insn", "op": "return"},
        ]),
    ));
    assert!(text.contains(
        "    {
        JAVA_OBJECT __value = POP_OBJ();
        set_field_t_Main_label(threadStateData, __value, __this);
        RELEASE(__value);
    }
"
    ));
}

#[test]
fn putfield_on_popped_object() {
    let text = lower_method(method(
        "(Lt/Point;)V",
        json!([
            {"kind": "insn", "op": "aload_0"},
            {"kind": "insn", "op": "iconst_5"},
            {"kind": "field", "op": "putfield", "owner": "t/Point", "name": "y", "descriptor": "I"},
            {"kind": "insn", "op": "return"},
        ]),
    ));
    assert_in_order(
        &text,
        &[
            "JAVA_INT __value = POP_INT();",
            "JAVA_OBJECT __object = POP_OBJ();",
            "CHECK_NULL(__object);",
            "set_field_t_Point_y(threadStateData, __value, __object);",
            "RELEASE(__object);",
        ],
    );
    assert!(!text.contains("RELEASE(__value)"));
}

#[test]
fn receiver_field_access_in_static_method_is_rejected() {
    let err = lower_code_err(json!([
        {"kind": "insn", "op": "iconst_1"},
        {"kind": "field", "op": "putfield", "owner": "t/Main", "name": "y", "descriptor": "I", "use_this": true},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(matches!(err.root(), CompileError::Unsupported { .. }));
}

// Arrays

#[test]
fn unreduced_array_load_checks_bounds() {
    let text = lower_method_unreduced(method(
        "([J)J",
        json!([
            {"kind": "insn", "op": "aload_0"},
            {"kind": "insn", "op": "iconst_2"},
            {"kind": "insn", "op": "laload"},
            {"kind": "insn", "op": "lreturn"},
        ]),
    ));
    assert!(text.contains(
        "    {
        JAVA_INT __index = POP_INT();
        JAVA_OBJECT __array = POP_OBJ();
        CHECK_ARRAY_ACCESS(__array, __index);
        PUSH_LONG(ARRAY_ELEMENT_LONG(__array, __index));
        RELEASE(__array);
    }
"
    ));
}

#[test]
fn primitive_array_store_assigns_directly() {
    let text = lower_method(method(
        "([B)V",
        json!([
            {"kind": "insn", "op": "aload_0"},
            {"kind": "insn", "op": "iconst_0"},
            {"kind": "insn", "op": "iconst_1"},
            {"kind": "insn", "op": "bastore"},
            {"kind": "insn", "op": "return"},
        ]),
    ));
    assert_in_order(
        &text,
        &[
            "JAVA_INT __value = POP_INT();",
            "JAVA_INT __index = POP_INT();",
            "JAVA_OBJECT __array = POP_OBJ();",
            "CHECK_ARRAY_ACCESS(__array, __index);",
            "ARRAY_ELEMENT_BYTE(__array, __index) = __value;",
            "RELEASE(__array);",
        ],
    );
    assert!(!text.contains("RETAIN(__value)"));
}

#[test]
fn unreduced_arraylength() {
    let text = lower_method_unreduced(method(
        "([I)I",
        json!([
            {"kind": "insn", "op": "aload_0"},
            {"kind": "insn", "op": "arraylength"},
            {"kind": "insn", "op": "ireturn"},
        ]),
    ));
    assert_in_order(
        &text,
        &[
            "JAVA_OBJECT __array = POP_OBJ();",
            "PUSH_INT(CHECKED_ARRAY_LENGTH(__array));",
            "RELEASE(__array);",
        ],
    );
}

// Allocation and type checks

#[test]
fn newarray_of_primitives() {
    let text = lower_code(json!([
        {"kind": "insn", "op": "bipush", "operand": 16},
        {"kind": "new_array", "element": "T_INT"},
        {"kind": "insn", "op": "pop"},
        {"kind": "insn", "op": "iconst_2"},
        {"kind": "new_array", "element": "double"},
        {"kind": "insn", "op": "pop"},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(text.contains(
        "PUSH_OBJ(allocArray(threadStateData, POP_INT(), &class_array1__JAVA_INT, sizeof(JAVA_INT), 1));"
    ));
    assert!(text.contains(
        "PUSH_OBJ(allocArray(threadStateData, POP_INT(), &class_array1__JAVA_DOUBLE, sizeof(JAVA_DOUBLE), 1));"
    ));
}

#[test]
fn anewarray_of_classes_and_arrays() {
    let text = lower_code(json!([
        {"kind": "insn", "op": "iconst_3"},
        {"kind": "type", "op": "anewarray", "type_name": "java/lang/String"},
        {"kind": "insn", "op": "pop"},
        {"kind": "insn", "op": "iconst_3"},
        {"kind": "type", "op": "anewarray", "type_name": "[I"},
        {"kind": "insn", "op": "pop"},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(text.contains(
        "PUSH_OBJ(allocArray(threadStateData, POP_INT(), &class_array1__java_lang_String, sizeof(JAVA_OBJECT), 1));"
    ));
    assert!(text.contains(
        "PUSH_OBJ(allocArray(threadStateData, POP_INT(), &class_array2__JAVA_INT, sizeof(JAVA_OBJECT), 2));"
    ));
}

#[test]
fn new_checkcast_and_instanceof() {
    let text = lower_code(json!([
        {"kind": "type", "op": "new", "type_name": "java/lang/StringBuilder"},
        {"kind": "type", "op": "checkcast", "type_name": "java/lang/CharSequence"},
        {"kind": "type", "op": "instanceof", "type_name": "java/lang/Appendable"},
        {"kind": "insn", "op": "pop"},
        {"kind": "insn", "op": "return"},
    ]));
    assert_in_order(
        &text,
        &[
            "PUSH_OBJ(__NEW_java_lang_StringBuilder(threadStateData));",
            "JAVA_OBJECT __object = POP_OBJ();",
            "CHECK_CAST(__object, &class__java_lang_CharSequence);",
            "PUSH_OBJ(__object);",
            "JAVA_OBJECT __object = POP_OBJ();",
            "PUSH_INT(INSTANCE_OF(__object, &class__java_lang_Appendable));",
            "RELEASE(__object);",
        ],
    );
}

#[test]
fn multianewarray_of_references_links_class_levels() {
    let text = lower_code(json!([
        {"kind": "insn", "op": "iconst_2"},
        {"kind": "insn", "op": "iconst_3"},
        {"kind": "multi_array", "descriptor": "[[Ljava/lang/String;", "dimensions": 2},
        {"kind": "insn", "op": "pop"},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(text.contains(
        "    {
        JAVA_INT __dim1 = POP_INT();
        JAVA_INT __dim0 = POP_INT();
        ARRAY_CLASS_BACKREF(class_array2__java_lang_String, class_array1__java_lang_String);
        PUSH_OBJ(ALLOC_ARRAY_2D(threadStateData, __dim0, __dim1, &class_array2__java_lang_String, &class_array1__java_lang_String, sizeof(JAVA_OBJECT)));
    }
"
    ));
}

#[test]
fn multianewarray_pads_unspecified_dimensions() {
    let text = lower_code(json!([
        {"kind": "insn", "op": "iconst_2"},
        {"kind": "insn", "op": "iconst_3"},
        {"kind": "multi_array", "descriptor": "[[[I", "dimensions": 2},
        {"kind": "insn", "op": "pop"},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(text.contains(
        "PUSH_OBJ(ALLOC_ARRAY_3D(threadStateData, __dim0, __dim1, -1, &class_array3__JAVA_INT, &class_array2__JAVA_INT, &class_array1__JAVA_INT, sizeof(JAVA_INT)));"
    ));
    assert!(!text.contains("ARRAY_CLASS_BACKREF"));
}

#[test]
fn arrays_deeper_than_four_dimensions_are_unsupported() {
    let err = lower_code_err(json!([
        {"kind": "insn", "op": "iconst_1"},
        {"kind": "multi_array", "descriptor": "[[[[[I", "dimensions": 1},
        {"kind": "insn", "op": "pop"},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(matches!(err.root(), CompileError::Unsupported { .. }));

    let err = lower_code_err(json!([
        {"kind": "insn", "op": "iconst_1"},
        {"kind": "multi_array", "descriptor": "[[I", "dimensions": 3},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(matches!(err.root(), CompileError::Unsupported { .. }));
}

// Locals, literals, monitors

#[test]
fn object_store_moves_stake_into_local() {
    let text = lower_code(json!([
        {"kind": "insn", "op": "aconst_null"},
        {"kind": "var", "op": "astore", "slot": 2},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(text.contains("    JAVA_OBJECT olocals_2_ = JAVA_NULL;\n"));
    assert!(text.contains(
        "    {
        JAVA_OBJECT __value = POP_OBJ();
        RELEASE(olocals_2_);
        olocals_2_ = __value;
    }
"
    ));
    assert!(text.contains("    RELEASE(olocals_2_);\n    return;\n"));
}

#[test]
fn named_locals_replace_generated_names() {
    let text = lower_code(json!([
        {"kind": "insn", "op": "iconst_0"},
        {"kind": "var", "op": "istore", "slot": 1, "name": "count"},
        {"kind": "iinc", "slot": 1, "delta": 2, "name": "count"},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(text.contains("    JAVA_INT count = 0;\n"));
    assert!(text.contains("    count = POP_INT();\n"));
    assert!(text.contains("    count += 2;\n"));
    assert!(!text.contains("ilocals_1_"));
}

#[test]
fn reserved_local_names_are_rejected() {
    let err = lower_code_err(json!([
        {"kind": "insn", "op": "iconst_0"},
        {"kind": "var", "op": "istore", "slot": 1, "name": "__tmp"},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(matches!(err.root(), CompileError::Unsupported { .. }));
}

#[test]
fn string_and_class_literals_come_from_the_pool() {
    let text = lower_code_unreduced(json!([
        {"kind": "ldc", "constant": {"type": "string", "value": "hello"}},
        {"kind": "ldc", "constant": {"type": "class", "value": "java/util/List"}},
        {"kind": "ldc", "constant": {"type": "long", "value": 5}},
        {"kind": "ldc", "constant": {"type": "double", "value": 0.5}},
        {"kind": "insn", "op": "return"},
    ]));
    assert_in_order(
        &text,
        &[
            "PUSH_OBJ(RETAIN(STRING_FROM_CONSTANT_POOL_OFFSET(0)));",
            "PUSH_OBJ(RETAIN(CLASS_FROM_CONSTANT_POOL_OFFSET(1)));",
            "PUSH_LONG(5LL);",
            "PUSH_DOUBLE(0.5);",
        ],
    );
}

#[test]
fn method_handle_literal_is_unsupported() {
    let err = lower_code_err(json!([
        {"kind": "ldc", "constant": {"type": "method_handle", "value": "a/B.f()V"}},
        {"kind": "insn", "op": "return"},
    ]));
    assert!(matches!(err.root(), CompileError::Unsupported { .. }));
}

#[test]
fn monitors_and_throw() {
    let text = lower_method(method(
        "(Ljava/lang/Object;)V",
        json!([
            {"kind": "insn", "op": "aload_0"},
            {"kind": "insn", "op": "monitorenter"},
            {"kind": "insn", "op": "aload_0"},
            {"kind": "insn", "op": "monitorexit"},
            {"kind": "insn", "op": "aload_0"},
            {"kind": "insn", "op": "athrow"},
        ]),
    ));
    assert_in_order(
        &text,
        &[
            "JAVA_OBJECT __lock = POP_OBJ();",
            "monitorEnter(threadStateData, __lock);",
            "RELEASE(__lock);",
            "monitorExit(threadStateData, __lock);",
            "THROW(POP_OBJ());",
        ],
    );
}
