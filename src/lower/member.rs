use crate::descriptor::{self, StackType};
use crate::diagnostics::CompileError;
use crate::instr::{FieldInstr, MultiArrayInstr, TypeInstr, array_element_type};
use crate::mangle;
use crate::opcodes::{self, *};

use super::LowerContext;

/// Deepest array the runtime's `ALLOC_ARRAY_<D>D` templates cover.
const MAX_ARRAY_DIMENSIONS: usize = 4;

impl LowerContext<'_> {
    pub(super) fn lower_field(&mut self, field: &FieldInstr) -> Result<(), CompileError> {
        let ty = self.stack_type_of(&field.field_type()?)?;
        let name = mangle::member_symbol(&field.name);
        match field.opcode {
            GETSTATIC | PUTSTATIC => {
                let owner = self.resolver.static_field_owner(&field.owner, &field.name);
                let owner = mangle::class_symbol(&owner);
                if field.opcode == GETSTATIC {
                    self.push_value(ty, &format!("get_static_{owner}_{name}(threadStateData)"));
                } else if ty == StackType::Object {
                    self.open_block();
                    self.pop_into(ty, "__value");
                    self.line(format!("set_static_{owner}_{name}(threadStateData, __value);"));
                    self.line("RELEASE(__value);");
                    self.close_block();
                } else {
                    self.line(format!(
                        "set_static_{owner}_{name}(threadStateData, POP_{}());",
                        ty.macro_suffix()
                    ));
                }
            }
            GETFIELD => {
                let owner = mangle::class_symbol(&field.owner);
                if field.use_this {
                    let this = self.receiver_this("getfield")?;
                    self.push_value(ty, &format!("get_field_{owner}_{name}({this})"));
                } else {
                    self.open_block();
                    self.pop_into(StackType::Object, "__object");
                    self.line("CHECK_NULL(__object);");
                    self.push_value(ty, &format!("get_field_{owner}_{name}(__object)"));
                    self.line("RELEASE(__object);");
                    self.close_block();
                }
            }
            PUTFIELD => {
                let owner = mangle::class_symbol(&field.owner);
                self.open_block();
                self.pop_into(ty, "__value");
                let object = if field.use_this {
                    self.receiver_this("putfield")?
                } else {
                    self.pop_into(StackType::Object, "__object");
                    self.line("CHECK_NULL(__object);");
                    "__object"
                };
                self.line(format!("set_field_{owner}_{name}(threadStateData, __value, {object});"));
                if ty == StackType::Object {
                    self.line("RELEASE(__value);");
                }
                if !field.use_this {
                    self.line("RELEASE(__object);");
                }
                self.close_block();
            }
            other => {
                return Err(CompileError::unsupported(format!(
                    "{} is not a field access",
                    opcodes::mnemonic(other)
                )));
            }
        }
        Ok(())
    }

    pub(super) fn lower_array_load(&mut self, opcode: u8) -> Result<(), CompileError> {
        let element = array_element_type(opcode).ok_or_else(|| {
            CompileError::unsupported(format!("{} is not an array load", opcodes::mnemonic(opcode)))
        })?;
        self.open_block();
        self.pop_into(StackType::Int, "__index");
        self.pop_into(StackType::Object, "__array");
        self.line("CHECK_ARRAY_ACCESS(__array, __index);");
        self.push_value(
            element.stack_type(),
            &format!("ARRAY_ELEMENT_{}(__array, __index)", element.macro_suffix()),
        );
        self.line("RELEASE(__array);");
        self.close_block();
        Ok(())
    }

    pub(super) fn lower_array_store(&mut self, opcode: u8) -> Result<(), CompileError> {
        let element = array_element_type(opcode).ok_or_else(|| {
            CompileError::unsupported(format!("{} is not an array store", opcodes::mnemonic(opcode)))
        })?;
        let slot = format!("ARRAY_ELEMENT_{}(__array, __index)", element.macro_suffix());
        self.open_block();
        self.pop_into(element.stack_type(), "__value");
        self.pop_into(StackType::Int, "__index");
        self.pop_into(StackType::Object, "__array");
        self.line("CHECK_ARRAY_ACCESS(__array, __index);");
        if element.stack_type() == StackType::Object {
            self.line(format!("RELEASE({slot});"));
            self.line(format!("{slot} = __value;"));
            self.line("RETAIN(__value);");
            self.line("RELEASE(__value);");
        } else {
            self.line(format!("{slot} = __value;"));
        }
        self.line("RELEASE(__array);");
        self.close_block();
        Ok(())
    }

    pub(super) fn lower_array_length(&mut self) -> Result<(), CompileError> {
        self.open_block();
        self.pop_into(StackType::Object, "__array");
        self.line("PUSH_INT(CHECKED_ARRAY_LENGTH(__array));");
        self.line("RELEASE(__array);");
        self.close_block();
        Ok(())
    }

    /// `newarray` with a primitive element code.
    pub(super) fn lower_new_array(&mut self, code: Option<i32>) -> Result<(), CompileError> {
        let tag = code.and_then(primitive_tag).ok_or_else(|| {
            CompileError::unsupported(format!("newarray with element code {code:?}"))
        })?;
        let c_type = descriptor::primitive_c_name(tag as u8).unwrap_or("JAVA_OBJECT");
        let class = mangle::class_identity(&format!("[{tag}"));
        self.line(format!(
            "PUSH_OBJ(allocArray(threadStateData, POP_INT(), &{class}, sizeof({c_type}), 1));"
        ));
        Ok(())
    }

    pub(super) fn lower_type(&mut self, ty: &TypeInstr) -> Result<(), CompileError> {
        match ty.opcode {
            NEW => {
                if ty.is_array() {
                    return Err(CompileError::unsupported(format!(
                        "new of array type '{}'",
                        ty.type_name
                    )));
                }
                let class = mangle::class_symbol(&ty.type_name);
                self.line(format!("PUSH_OBJ(__NEW_{class}(threadStateData));"));
            }
            ANEWARRAY => {
                let array = if ty.is_array() {
                    format!("[{}", ty.type_name)
                } else {
                    format!("[L{};", ty.type_name)
                };
                let dims = descriptor::array_dimensions(&array);
                if dims > MAX_ARRAY_DIMENSIONS {
                    return Err(too_many_dimensions(&array));
                }
                self.line(format!(
                    "PUSH_OBJ(allocArray(threadStateData, POP_INT(), &{}, sizeof(JAVA_OBJECT), {dims}));",
                    mangle::class_identity(&array)
                ));
            }
            CHECKCAST => {
                let class = mangle::class_identity(&ty.type_name);
                self.open_block();
                self.pop_into(StackType::Object, "__object");
                self.line(format!("CHECK_CAST(__object, &{class});"));
                self.line("PUSH_OBJ(__object);");
                self.close_block();
            }
            INSTANCEOF => {
                let class = mangle::class_identity(&ty.type_name);
                self.open_block();
                self.pop_into(StackType::Object, "__object");
                self.line(format!("PUSH_INT(INSTANCE_OF(__object, &{class}));"));
                self.line("RELEASE(__object);");
                self.close_block();
            }
            other => {
                return Err(CompileError::unsupported(format!(
                    "{} is not a type instruction",
                    opcodes::mnemonic(other)
                )));
            }
        }
        Ok(())
    }

    pub(super) fn lower_multi_array(&mut self, array: &MultiArrayInstr) -> Result<(), CompileError> {
        let total = array.total_dimensions();
        if total > MAX_ARRAY_DIMENSIONS {
            return Err(too_many_dimensions(&array.descriptor));
        }
        let given = array.dimensions as usize;
        if given == 0 || given > total {
            return Err(CompileError::unsupported(format!(
                "multianewarray of '{}' with {given} dimension sizes",
                array.descriptor
            )));
        }
        let element = &array.descriptor[total..];
        let is_reference = array.element_type()? == descriptor::ElementType::Object;
        let element_c = if is_reference {
            "JAVA_OBJECT"
        } else {
            element
                .bytes()
                .next()
                .and_then(descriptor::primitive_c_name)
                .ok_or_else(|| {
                    CompileError::unsupported(format!("array element of '{}'", array.descriptor))
                })?
        };
        // class_arrayD__E down to class_array1__E
        let classes: Vec<String> = (1..=total)
            .rev()
            .map(|d| mangle::class_identity(&format!("{}{element}", "[".repeat(d))))
            .collect();

        self.open_block();
        for d in (0..given).rev() {
            self.pop_into(StackType::Int, &format!("__dim{d}"));
        }
        if is_reference {
            for pair in classes.windows(2) {
                self.line(format!("ARRAY_CLASS_BACKREF({}, {});", pair[0], pair[1]));
            }
        }
        let mut args: Vec<String> = (0..given).map(|d| format!("__dim{d}")).collect();
        args.extend(std::iter::repeat_n("-1".to_string(), total - given));
        args.extend(classes.iter().map(|c| format!("&{c}")));
        args.push(format!("sizeof({element_c})"));
        self.line(format!(
            "PUSH_OBJ(ALLOC_ARRAY_{total}D(threadStateData, {}));",
            args.join(", ")
        ));
        self.close_block();
        Ok(())
    }

    pub(super) fn lower_monitor(&mut self, function: &str) -> Result<(), CompileError> {
        self.open_block();
        self.pop_into(StackType::Object, "__lock");
        self.line(format!("{function}(threadStateData, __lock);"));
        self.line("RELEASE(__lock);");
        self.close_block();
        Ok(())
    }
}

fn too_many_dimensions(desc: &str) -> CompileError {
    CompileError::unsupported(format!(
        "array '{desc}' has more than {MAX_ARRAY_DIMENSIONS} dimensions"
    ))
}

/// Descriptor character for a `newarray` element code.
fn primitive_tag(code: i32) -> Option<char> {
    let tag = match code {
        T_BOOLEAN => 'Z',
        T_CHAR => 'C',
        T_FLOAT => 'F',
        T_DOUBLE => 'D',
        T_BYTE => 'B',
        T_SHORT => 'S',
        T_INT => 'I',
        T_LONG => 'J',
        _ => return None,
    };
    Some(tag)
}
