use serde::{Deserialize, Serialize};

use crate::descriptor::{self, StackType};
use crate::diagnostics::CompileError;
use crate::hierarchy::ClassIndex;
use crate::instr::{
    BasicInstr, Constant, DispatchKind, FieldInstr, Instr, InstrList, InvokeInstr, JumpInstr,
    LabelInstr, LdcInstr, MultiArrayInstr, NamedLocalInstr, Receiver, SwitchInstr, TryCatchInstr,
    TypeInstr, VarInstr, local_stack_type,
};
use crate::lower::MethodInfo;
use crate::opcodes::{self, *};
use crate::unit::{LabelId, TranslationUnit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub classes: Vec<Class>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    #[serde(default)]
    pub super_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub max_stack: u16,
    #[serde(default)]
    pub max_locals: u16,
    /// Empty for abstract and native methods.
    #[serde(default)]
    pub code: Vec<Insn>,
    #[serde(default)]
    pub try_catch: Vec<TryCatchEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryCatchEntry {
    pub start: LabelId,
    pub end: LabelId,
    pub handler: LabelId,
    #[serde(default)]
    pub catch_type: Option<String>,
}

/// One decoded instruction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Insn {
    /// Operand-less instruction; `operand` carries `bipush`/`sipush` values.
    #[serde(rename = "insn")]
    Simple {
        op: String,
        #[serde(default)]
        operand: Option<i32>,
    },
    Var {
        op: String,
        #[serde(default)]
        slot: Option<u16>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        type_tag: Option<char>,
    },
    Iinc {
        slot: u16,
        delta: i32,
        #[serde(default)]
        name: Option<String>,
    },
    Field {
        op: String,
        owner: String,
        name: String,
        descriptor: String,
        #[serde(default)]
        use_this: bool,
    },
    Invoke {
        op: String,
        owner: String,
        name: String,
        descriptor: String,
        #[serde(default)]
        literal_args: Vec<Option<String>>,
        /// C expression used as the receiver instead of popping one.
        #[serde(default)]
        receiver: Option<String>,
        /// Call on the method's own receiver.
        #[serde(default)]
        self_call: bool,
        #[serde(default)]
        discard_result: bool,
    },
    Jump {
        op: String,
        target: LabelId,
        #[serde(default)]
        condition: Option<String>,
    },
    Label {
        id: LabelId,
    },
    /// `lookupswitch` (explicit keys) or `tableswitch` (`low` plus targets).
    Switch {
        #[serde(default)]
        default: Option<LabelId>,
        #[serde(default)]
        keys: Vec<i32>,
        #[serde(default)]
        low: Option<i32>,
        targets: Vec<LabelId>,
    },
    Type {
        op: String,
        type_name: String,
    },
    NewArray {
        element: String,
    },
    MultiArray {
        descriptor: String,
        dimensions: u8,
    },
    Ldc {
        constant: LdcValue,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LdcValue {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
    MethodHandle(String),
}

/// Parse a program from JSON text.
pub fn parse_program(text: &str) -> Result<Program, CompileError> {
    Ok(serde_json::from_str(text)?)
}

impl Program {
    /// Static members of every class, for declaring-owner lookup.
    pub fn class_index(&self) -> ClassIndex {
        let mut index = ClassIndex::new();
        for class in &self.classes {
            index.add_class(&class.name, class.super_name.as_deref());
            for method in class.methods.iter().filter(|m| m.is_static) {
                index.add_static_method(&class.name, &method.name, &method.descriptor);
            }
            for field in class.fields.iter().filter(|f| f.is_static) {
                index.add_static_field(&class.name, &field.name);
            }
        }
        index
    }
}

impl Method {
    pub fn info(&self, owner: &str) -> MethodInfo {
        MethodInfo {
            owner: owner.to_string(),
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
            is_static: self.is_static,
            max_stack: self.max_stack,
            max_locals: self.max_locals,
        }
    }

    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }
}

fn opcode_of(op: &str) -> Result<u8, CompileError> {
    opcodes::from_mnemonic(op).ok_or_else(|| CompileError::unsupported(format!("unknown opcode '{op}'")))
}

/// Build the instruction list of `method`. Registers its try regions and
/// literals in `unit`; the caller must have called
/// [`TranslationUnit::begin_method`] first.
pub fn build_method(method: &Method, unit: &mut TranslationUnit) -> Result<InstrList, CompileError> {
    let mut list = InstrList::new();

    for entry in &method.try_catch {
        if entry.start == entry.end {
            tracing::warn!(
                method = %method.name,
                label = entry.start,
                "skipping empty try region"
            );
            continue;
        }
        let seq = unit.register_try_region(entry.start, entry.end, entry.handler, entry.catch_type.clone());
        list.push(Instr::TryCatch(TryCatchInstr {
            seq,
            start: entry.start,
            end: entry.end,
            handler: entry.handler,
            catch_type: entry.catch_type.clone(),
        }));
    }

    // `aload 0; getfield` reads through the receiver directly unless slot 0 is
    // ever overwritten.
    let this_is_stable = !method.is_static && !writes_slot_zero(&method.code);

    for insn in &method.code {
        let instr = build_insn(insn, unit, &mut list)?;
        if this_is_stable {
            if let Instr::Field(field) = &instr {
                if field.opcode == GETFIELD && !field.use_this && last_is_load_of_this(&list) {
                    list.pop();
                    let mut field = field.clone();
                    field.use_this = true;
                    list.push(Instr::Field(field));
                    continue;
                }
            }
        }
        list.push(instr);
    }
    Ok(list)
}

fn writes_slot_zero(code: &[Insn]) -> bool {
    code.iter().any(|insn| match insn {
        Insn::Var { op, slot, .. } => {
            let (opcode, slot) = match opcodes::split_slot_form(op) {
                Some(pair) => pair,
                None => (opcodes::from_mnemonic(op).unwrap_or(NOP), slot.unwrap_or(u16::MAX)),
            };
            opcodes::is_store(opcode) && slot == 0
        }
        Insn::Simple { op, .. } => {
            matches!(opcodes::split_slot_form(op), Some((opcode, 0)) if opcodes::is_store(opcode))
        }
        Insn::Iinc { slot, .. } => *slot == 0,
        _ => false,
    })
}

fn last_is_load_of_this(list: &InstrList) -> bool {
    let Some(last) = list.len().checked_sub(1).and_then(|pos| list.at(pos)) else {
        return false;
    };
    match last {
        Instr::Var(v) => v.opcode == ALOAD && v.slot == 0,
        _ => false,
    }
}

fn build_insn(insn: &Insn, unit: &mut TranslationUnit, list: &mut InstrList) -> Result<Instr, CompileError> {
    let instr = match insn {
        Insn::Simple { op, operand } => {
            if let Some((opcode, slot)) = opcodes::split_slot_form(op) {
                return Ok(Instr::Var(VarInstr { opcode, slot, increment: None }));
            }
            let opcode = opcode_of(op)?;
            if matches!(opcode, BIPUSH | SIPUSH) && operand.is_none() {
                return Err(CompileError::unsupported(format!("{op} without an operand")));
            }
            Instr::Basic(BasicInstr { opcode, immediate: *operand })
        }
        Insn::Var { op, slot, name, type_tag } => {
            let (opcode, slot) = match (opcodes::split_slot_form(op), slot) {
                (Some(pair), _) => pair,
                (None, Some(slot)) => (opcode_of(op)?, *slot),
                (None, None) => {
                    return Err(CompileError::unsupported(format!("{op} without a slot")));
                }
            };
            if opcode == RET {
                return Err(CompileError::unsupported("ret (subroutines are not supported)"));
            }
            let ty = local_stack_type(opcode).ok_or_else(|| {
                CompileError::unsupported(format!("'{op}' is not a local variable instruction"))
            })?;
            match name {
                Some(name) => {
                    let type_tag = type_tag.unwrap_or_else(|| default_tag(ty));
                    let named = NamedLocalInstr {
                        opcode,
                        slot,
                        name: name.clone(),
                        type_tag,
                        increment: None,
                    };
                    named.validate()?;
                    list.bind_local_name(slot, ty, name)?;
                    Instr::NamedLocal(named)
                }
                None => Instr::Var(VarInstr { opcode, slot, increment: None }),
            }
        }
        Insn::Iinc { slot, delta, name } => match name {
            Some(name) => {
                let named = NamedLocalInstr {
                    opcode: IINC,
                    slot: *slot,
                    name: name.clone(),
                    type_tag: 'I',
                    increment: Some(*delta),
                };
                named.validate()?;
                list.bind_local_name(*slot, StackType::Int, name)?;
                Instr::NamedLocal(named)
            }
            None => Instr::Var(VarInstr { opcode: IINC, slot: *slot, increment: Some(*delta) }),
        },
        Insn::Field { op, owner, name, descriptor, use_this } => {
            let opcode = opcode_of(op)?;
            if !matches!(opcode, GETSTATIC | PUTSTATIC | GETFIELD | PUTFIELD) {
                return Err(CompileError::unsupported(format!("'{op}' is not a field instruction")));
            }
            crate::descriptor::parse_field_descriptor(descriptor)?;
            Instr::Field(FieldInstr {
                opcode,
                owner: owner.clone(),
                name: name.clone(),
                descriptor: descriptor.clone(),
                use_this: *use_this,
            })
        }
        Insn::Invoke { op, owner, name, descriptor, literal_args, receiver, self_call, discard_result } => {
            let kind = match op.as_str() {
                "invokestatic" => DispatchKind::Static,
                "invokespecial" => DispatchKind::Special,
                "invokevirtual" => DispatchKind::Virtual,
                "invokeinterface" => DispatchKind::Interface,
                "invokedynamic" => {
                    return Err(CompileError::unsupported(format!(
                        "invokedynamic call site '{name}{descriptor}'"
                    )));
                }
                other => {
                    return Err(CompileError::unsupported(format!("'{other}' is not an invoke instruction")));
                }
            };
            let receiver = match (receiver, self_call) {
                (Some(_), true) => {
                    return Err(CompileError::unsupported(format!(
                        "call to {owner}.{name} has both a literal receiver and self_call"
                    )));
                }
                (Some(expr), false) => Receiver::Literal(expr.clone()),
                (None, true) => Receiver::CurrentObject,
                (None, false) => Receiver::Stack,
            };
            let mut call = InvokeInstr::new(kind, owner, name, descriptor);
            call.literal_args = literal_args.clone();
            call.receiver = receiver;
            call.discard_result = *discard_result;
            Instr::Invoke(call)
        }
        Insn::Jump { op, target, condition } => {
            let opcode = opcode_of(op)?;
            let opcode = if opcode == GOTO_W { GOTO } else { opcode };
            Instr::Jump(JumpInstr { opcode, target: *target, condition: condition.clone() })
        }
        Insn::Label { id } => Instr::Label(LabelInstr { label: *id }),
        Insn::Switch { default, keys, low, targets } => {
            let keys = match (keys.is_empty(), low) {
                (false, _) => keys.clone(),
                (true, Some(low)) => (0..targets.len())
                    .map(|i| low.checked_add(i as i32))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| CompileError::unsupported("tableswitch keys overflow"))?,
                (true, None) if targets.is_empty() => Vec::new(),
                (true, None) => {
                    return Err(CompileError::unsupported("switch targets without keys or low bound"));
                }
            };
            Instr::Switch(SwitchInstr { default: *default, keys, targets: targets.clone() })
        }
        Insn::Type { op, type_name } => {
            let opcode = opcode_of(op)?;
            if !matches!(opcode, NEW | ANEWARRAY | CHECKCAST | INSTANCEOF) {
                return Err(CompileError::unsupported(format!("'{op}' is not a type instruction")));
            }
            let is_array = type_name.starts_with('[');
            if !descriptor::is_type_name(type_name) || (opcode == NEW && is_array) {
                return Err(CompileError::unsupported(format!(
                    "{} operand '{type_name}' is not a {}",
                    opcodes::mnemonic(opcode),
                    if opcode == NEW { "class name" } else { "class name or array descriptor" }
                )));
            }
            Instr::Type(TypeInstr { opcode, type_name: type_name.clone() })
        }
        Insn::NewArray { element } => {
            let code = match element.trim_start_matches("T_").to_ascii_lowercase().as_str() {
                "boolean" => T_BOOLEAN,
                "char" => T_CHAR,
                "float" => T_FLOAT,
                "double" => T_DOUBLE,
                "byte" => T_BYTE,
                "short" => T_SHORT,
                "int" => T_INT,
                "long" => T_LONG,
                other => {
                    return Err(CompileError::unsupported(format!("newarray of '{other}'")));
                }
            };
            Instr::Basic(BasicInstr::with_immediate(NEWARRAY, code))
        }
        Insn::MultiArray { descriptor, dimensions } => Instr::MultiArray(MultiArrayInstr {
            descriptor: descriptor.clone(),
            dimensions: *dimensions,
        }),
        Insn::Ldc { constant } => {
            let (constant, pool_offset) = match constant {
                LdcValue::Int(v) => (Constant::Int(*v), None),
                LdcValue::Float(v) => (Constant::Float(*v), None),
                LdcValue::Long(v) => (Constant::Long(*v), None),
                LdcValue::Double(v) => (Constant::Double(*v), None),
                LdcValue::String(s) => (Constant::String(s.clone()), Some(unit.intern_string(s))),
                LdcValue::Class(c) => (Constant::Class(c.clone()), Some(unit.intern_class(c))),
                LdcValue::MethodHandle(h) => (Constant::MethodHandle(h.clone()), None),
            };
            Instr::Ldc(LdcInstr { constant, pool_offset })
        }
    };
    Ok(instr)
}

fn default_tag(ty: StackType) -> char {
    match ty {
        StackType::Int => 'I',
        StackType::Long => 'J',
        StackType::Float => 'F',
        StackType::Double => 'D',
        StackType::Object => 'L',
    }
}
