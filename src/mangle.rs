//! C symbol mangling for classes, members and method signatures.
//!
//! `com/example/Foo.add(II)I` becomes `com_example_Foo_add___int_int_R_int`;
//! virtual dispatch stubs carry a `virtual_` prefix.

use crate::descriptor::{JvmType, MethodDescriptor};
use crate::diagnostics::CompileError;

/// Mangle an internal class name into a C identifier fragment.
pub fn class_symbol(internal_name: &str) -> String {
    let mut out = String::with_capacity(internal_name.len());
    for c in internal_name.chars() {
        match c {
            '/' | '.' | '-' => out.push('_'),
            '$' => out.push_str("_00024"),
            c if c.is_ascii_alphanumeric() || c == '_' => out.push(c),
            other => out.push_str(&format!("_{:05x}", other as u32)),
        }
    }
    out
}

/// Mangle a member name; constructors and static initializers get fixed names.
pub fn member_symbol(name: &str) -> String {
    match name {
        "<init>" => "__INIT__".to_string(),
        "<clinit>" => "__CLINIT__".to_string(),
        other => class_symbol(other),
    }
}

/// Type name fragment used inside mangled signatures.
pub fn type_symbol(ty: &JvmType) -> String {
    match ty {
        JvmType::Int => "int".into(),
        JvmType::Long => "long".into(),
        JvmType::Float => "float".into(),
        JvmType::Double => "double".into(),
        JvmType::Byte => "byte".into(),
        JvmType::Char => "char".into(),
        JvmType::Short => "short".into(),
        JvmType::Boolean => "boolean".into(),
        JvmType::Void => "void".into(),
        JvmType::Reference(name) => class_symbol(name),
        JvmType::Array(_) => {
            let mut dims = 0;
            let mut inner = ty;
            while let JvmType::Array(next) = inner {
                dims += 1;
                inner = next;
            }
            format!("{}_{}ARRAY", type_symbol(inner), dims)
        }
    }
}

/// Mangle a method symbol from its owner, name and parsed descriptor.
pub fn method_symbol(owner: &str, name: &str, desc: &MethodDescriptor) -> String {
    let mut out = format!("{}_{}__", class_symbol(owner), member_symbol(name));
    for param in &desc.params {
        out.push('_');
        out.push_str(&type_symbol(param));
    }
    if desc.returns_value() {
        out.push_str("_R_");
        out.push_str(&type_symbol(&desc.ret));
    }
    out
}

/// Mangle a method symbol from its raw descriptor string.
pub fn method_symbol_from_descriptor(
    owner: &str,
    name: &str,
    descriptor: &str,
) -> Result<String, CompileError> {
    let desc = MethodDescriptor::parse(descriptor)?;
    Ok(method_symbol(owner, name, &desc))
}

/// Symbol of the class identity struct, `class__java_lang_String` or
/// `class_array2__JAVA_INT` for arrays.
pub fn class_identity(type_name: &str) -> String {
    let dims = crate::descriptor::array_dimensions(type_name);
    if dims == 0 {
        return format!("class__{}", class_symbol(type_name));
    }
    let element = &type_name[dims..];
    let element = match crate::descriptor::element_class_name(element) {
        Some(class) => class_symbol(class),
        None => crate::descriptor::primitive_c_name(element.as_bytes()[0])
            .unwrap_or("JAVA_OBJECT")
            .to_string(),
    };
    format!("class_array{}__{}", dims, element)
}

/// Symbol used as the exception type identifier in `BEGIN_TRY`.
pub fn class_id(internal_name: &str) -> String {
    format!("CLASS_ID_{}", class_symbol(internal_name))
}
