//! Instruction model: one flat sum type over every elementary operation the
//! lowering understands, stored in an arena with a separate program-order
//! index sequence so rewrites never invalidate node identities.

pub mod expr;

use std::collections::{BTreeSet, HashMap};

use crate::descriptor::{self, ElementType, JvmType, MethodDescriptor, StackType};
use crate::diagnostics::CompileError;
use crate::mangle;
use crate::opcodes::{self, *};
use crate::unit::LabelId;

pub use expr::{ArithExpr, ArrayLengthExpr, ArrayLoadExpr, Assignable, DupExpr, Effect};

/// Arena index of an instruction node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Basic(BasicInstr),
    Var(VarInstr),
    NamedLocal(NamedLocalInstr),
    Field(FieldInstr),
    Invoke(InvokeInstr),
    Jump(JumpInstr),
    Label(LabelInstr),
    Switch(SwitchInstr),
    TryCatch(TryCatchInstr),
    Type(TypeInstr),
    MultiArray(MultiArrayInstr),
    Ldc(LdcInstr),
    Arith(ArithExpr),
    ArrayLoad(ArrayLoadExpr),
    ArrayLength(ArrayLengthExpr),
    Dup(DupExpr),
}

/// Opcode with an optional immediate (`bipush`/`sipush` value, `newarray` code).
#[derive(Debug, Clone, PartialEq)]
pub struct BasicInstr {
    pub opcode: u8,
    pub immediate: Option<i32>,
}

/// Local slot load, store or increment.
#[derive(Debug, Clone, PartialEq)]
pub struct VarInstr {
    pub opcode: u8,
    pub slot: u16,
    /// Delta for `iinc`.
    pub increment: Option<i32>,
}

/// A local slot access that also names the variable.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLocalInstr {
    pub opcode: u8,
    pub slot: u16,
    pub name: String,
    /// Descriptor character of the declared type (`I`, `J`, `L`, `[`, ...).
    pub type_tag: char,
    pub increment: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInstr {
    pub opcode: u8,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    /// Use the method's own receiver instead of popping one.
    pub use_this: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Static,
    Special,
    Virtual,
    Interface,
}

/// Where an instance call takes its receiver from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    Stack,
    Literal(String),
    CurrentObject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvokeInstr {
    pub kind: DispatchKind,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    /// Per-argument literal overrides; empty means every argument is popped.
    pub literal_args: Vec<Option<String>>,
    pub receiver: Receiver,
    /// Drop the result even when the descriptor returns one.
    pub discard_result: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JumpInstr {
    pub opcode: u8,
    pub target: LabelId,
    /// C condition replacing the default pop-and-compare test.
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelInstr {
    pub label: LabelId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchInstr {
    pub default: Option<LabelId>,
    pub keys: Vec<i32>,
    pub targets: Vec<LabelId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryCatchInstr {
    pub seq: u32,
    pub start: LabelId,
    pub end: LabelId,
    pub handler: LabelId,
    pub catch_type: Option<String>,
}

/// `new`, `anewarray`, `checkcast` or `instanceof` with its type operand.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInstr {
    pub opcode: u8,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiArrayInstr {
    pub descriptor: String,
    /// Number of dimension sizes popped from the stack.
    pub dimensions: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
    MethodHandle(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LdcInstr {
    pub constant: Constant,
    /// Constant pool offset of string and class literals.
    pub pool_offset: Option<usize>,
}

impl Instr {
    /// The JVM opcode, or `None` for labels, try descriptors and reduced nodes.
    pub fn opcode(&self) -> Option<u8> {
        match self {
            Instr::Basic(b) => Some(b.opcode),
            Instr::Var(v) => Some(v.opcode),
            Instr::NamedLocal(n) => Some(n.opcode),
            Instr::Field(f) => Some(f.opcode),
            Instr::Invoke(i) => Some(i.opcode()),
            Instr::Jump(j) => Some(j.opcode),
            Instr::Switch(_) => Some(LOOKUPSWITCH),
            Instr::Type(t) => Some(t.opcode),
            Instr::MultiArray(_) => Some(MULTIANEWARRAY),
            Instr::Ldc(_) => Some(LDC),
            Instr::Label(_)
            | Instr::TryCatch(_)
            | Instr::Arith(_)
            | Instr::ArrayLoad(_)
            | Instr::ArrayLength(_)
            | Instr::Dup(_) => None,
        }
    }

    /// Short description used in annotations and log lines.
    pub fn describe(&self) -> String {
        match self {
            Instr::Label(l) => format!("label_{}", l.label),
            Instr::TryCatch(t) => format!("try #{}", t.seq),
            Instr::Arith(a) => format!("({})", opcodes::mnemonic(a.opcode)),
            Instr::ArrayLoad(a) => format!("({})", opcodes::mnemonic(a.opcode)),
            Instr::ArrayLength(_) => "(arraylength)".to_string(),
            Instr::Dup(_) => "(dup)".to_string(),
            Instr::Var(v) => format!("{} {}", opcodes::mnemonic(v.opcode), v.slot),
            Instr::NamedLocal(n) => format!("{} {}", opcodes::mnemonic(n.opcode), n.name),
            Instr::Field(f) => format!("{} {}.{}", opcodes::mnemonic(f.opcode), f.owner, f.name),
            Instr::Invoke(i) => format!(
                "{} {}.{}{}",
                opcodes::mnemonic(i.opcode()),
                i.owner,
                i.name,
                i.descriptor
            ),
            Instr::Jump(j) => format!("{} label_{}", opcodes::mnemonic(j.opcode), j.target),
            Instr::Type(t) => format!("{} {}", opcodes::mnemonic(t.opcode), t.type_name),
            Instr::MultiArray(m) => format!("multianewarray {} {}", m.descriptor, m.dimensions),
            other => other.opcode().map(opcodes::mnemonic).unwrap_or("?").to_string(),
        }
    }

    /// Add the mangled names of classes the lowered code references.
    pub fn collect_dependencies(&self, deps: &mut BTreeSet<String>) {
        match self {
            Instr::Field(f) => {
                deps.insert(mangle::class_symbol(&f.owner));
                if let Some(class) = descriptor::element_class_name(&f.descriptor) {
                    deps.insert(mangle::class_symbol(class));
                }
            }
            Instr::Invoke(i) => {
                if !i.owner.starts_with('[') {
                    deps.insert(mangle::class_symbol(&i.owner));
                }
                if let Ok(md) = MethodDescriptor::parse(&i.descriptor) {
                    for ty in md.params.iter().chain(std::iter::once(&md.ret)) {
                        add_type_dependency(ty, deps);
                    }
                }
            }
            Instr::Type(t) => {
                if let Some(class) = descriptor::element_class_name(&t.type_name) {
                    deps.insert(mangle::class_symbol(class));
                }
            }
            Instr::MultiArray(m) => {
                if let Some(class) = descriptor::element_class_name(&m.descriptor) {
                    deps.insert(mangle::class_symbol(class));
                }
            }
            Instr::Ldc(LdcInstr { constant: Constant::Class(name), .. }) => {
                if let Some(class) = descriptor::element_class_name(name) {
                    deps.insert(mangle::class_symbol(class));
                }
            }
            Instr::Ldc(LdcInstr { constant: Constant::String(_), .. }) => {
                deps.insert(mangle::class_symbol("java/lang/String"));
            }
            Instr::TryCatch(t) => {
                if let Some(class) = &t.catch_type {
                    deps.insert(mangle::class_symbol(class));
                }
            }
            _ => {}
        }
    }

    /// Render as a side-effect-free expression, if this node has one.
    pub fn as_assignable(&self, list: &InstrList) -> Option<Assignable> {
        match self {
            Instr::Basic(b) => b.as_assignable(),
            Instr::Var(v) if opcodes::is_load(v.opcode) => {
                let ty = local_stack_type(v.opcode)?;
                Some(Assignable::pure(list.local_name(v.slot, ty), ty))
            }
            Instr::NamedLocal(n) if opcodes::is_load(n.opcode) => {
                let ty = local_stack_type(n.opcode)?;
                Some(Assignable::pure(list.local_name(n.slot, ty), ty))
            }
            Instr::Field(f) if f.opcode == GETFIELD && f.use_this => {
                let ty = descriptor::parse_field_descriptor(&f.descriptor).ok()?.stack_type()?;
                Some(Assignable::pure(
                    format!(
                        "get_field_{}_{}(__this)",
                        mangle::class_symbol(&f.owner),
                        mangle::member_symbol(&f.name)
                    ),
                    ty,
                ))
            }
            Instr::Ldc(l) => l.as_assignable(),
            Instr::Arith(_) | Instr::ArrayLoad(_) | Instr::ArrayLength(_) => {
                self.render_expression(list).ok()
            }
            _ => None,
        }
    }

    /// Render a reduced expression node. Children that are missing or no longer
    /// assignable mean the reducer broke its own preconditions.
    pub fn render_expression(&self, list: &InstrList) -> Result<Assignable, CompileError> {
        match self {
            Instr::Arith(a) => a.render(list),
            Instr::ArrayLoad(a) => a.render(list),
            Instr::ArrayLength(a) => a.render(list),
            Instr::Dup(d) => list.assignable_child(d.source, "dup source"),
            other => other.as_assignable(list).ok_or_else(|| {
                CompileError::malformed(format!("'{}' is not an expression", other.describe()))
            }),
        }
    }
}

fn add_type_dependency(ty: &JvmType, deps: &mut BTreeSet<String>) {
    match ty {
        JvmType::Reference(name) => {
            deps.insert(mangle::class_symbol(name));
        }
        JvmType::Array(inner) => add_type_dependency(inner, deps),
        _ => {}
    }
}

/// Stack type moved by a local load/store opcode.
pub fn local_stack_type(opcode: u8) -> Option<StackType> {
    match opcode {
        ILOAD | ISTORE | IINC => Some(StackType::Int),
        LLOAD | LSTORE => Some(StackType::Long),
        FLOAD | FSTORE => Some(StackType::Float),
        DLOAD | DSTORE => Some(StackType::Double),
        ALOAD | ASTORE => Some(StackType::Object),
        _ => None,
    }
}

/// Element type moved by an array load/store opcode.
pub fn array_element_type(opcode: u8) -> Option<ElementType> {
    match opcode {
        IALOAD | IASTORE => Some(ElementType::Int),
        LALOAD | LASTORE => Some(ElementType::Long),
        FALOAD | FASTORE => Some(ElementType::Float),
        DALOAD | DASTORE => Some(ElementType::Double),
        AALOAD | AASTORE => Some(ElementType::Object),
        BALOAD | BASTORE => Some(ElementType::Byte),
        CALOAD | CASTORE => Some(ElementType::Char),
        SALOAD | SASTORE => Some(ElementType::Short),
        _ => None,
    }
}

impl BasicInstr {
    pub fn new(opcode: u8) -> Self {
        Self { opcode, immediate: None }
    }

    pub fn with_immediate(opcode: u8, value: i32) -> Self {
        Self { opcode, immediate: Some(value) }
    }

    fn as_assignable(&self) -> Option<Assignable> {
        let (expr, ty) = match self.opcode {
            ACONST_NULL => ("JAVA_NULL".to_string(), StackType::Object),
            ICONST_M1..=ICONST_5 => {
                ((self.opcode as i32 - ICONST_0 as i32).to_string(), StackType::Int)
            }
            LCONST_0 => ("0LL".to_string(), StackType::Long),
            LCONST_1 => ("1LL".to_string(), StackType::Long),
            FCONST_0 => ("0.0f".to_string(), StackType::Float),
            FCONST_1 => ("1.0f".to_string(), StackType::Float),
            FCONST_2 => ("2.0f".to_string(), StackType::Float),
            DCONST_0 => ("0.0".to_string(), StackType::Double),
            DCONST_1 => ("1.0".to_string(), StackType::Double),
            BIPUSH | SIPUSH => (int_literal(self.immediate?), StackType::Int),
            _ => return None,
        };
        Some(Assignable::pure(expr, ty))
    }
}

impl NamedLocalInstr {
    /// Check that the declared type tag fits the opcode family and the name is
    /// usable as a C identifier.
    pub fn validate(&self) -> Result<(), CompileError> {
        let ok = match local_stack_type(self.opcode) {
            Some(StackType::Int) => matches!(self.type_tag, 'I' | 'Z' | 'B' | 'C' | 'S'),
            Some(StackType::Long) => self.type_tag == 'J',
            Some(StackType::Float) => self.type_tag == 'F',
            Some(StackType::Double) => self.type_tag == 'D',
            Some(StackType::Object) => matches!(self.type_tag, 'L' | '['),
            None => false,
        };
        if !ok {
            return Err(CompileError::unsupported(format!(
                "local '{}' in slot {} has type '{}' but is accessed with {}",
                self.name,
                self.slot,
                self.type_tag,
                opcodes::mnemonic(self.opcode)
            )));
        }
        if !is_c_identifier(&self.name) {
            return Err(CompileError::unsupported(format!(
                "local name '{}' is not a usable C identifier",
                self.name
            )));
        }
        Ok(())
    }
}

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while",
];

fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with("__")
        && name != "threadStateData"
        && !C_KEYWORDS.contains(&name)
        && !is_generated_local_name(name)
}

/// Whether `name` has the shape of a default local name (`ilocals_3_`).
fn is_generated_local_name(name: &str) -> bool {
    let Some(rest) = name.get(1..).and_then(|r| r.strip_prefix("locals_")) else {
        return false;
    };
    rest.strip_suffix('_')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

impl FieldInstr {
    pub fn is_static(&self) -> bool {
        matches!(self.opcode, GETSTATIC | PUTSTATIC)
    }

    pub fn field_type(&self) -> Result<JvmType, CompileError> {
        descriptor::parse_field_descriptor(&self.descriptor)
    }
}

impl InvokeInstr {
    pub fn opcode(&self) -> u8 {
        match self.kind {
            DispatchKind::Static => INVOKESTATIC,
            DispatchKind::Special => INVOKESPECIAL,
            DispatchKind::Virtual => INVOKEVIRTUAL,
            DispatchKind::Interface => INVOKEINTERFACE,
        }
    }

    pub fn new(kind: DispatchKind, owner: &str, name: &str, descriptor: &str) -> Self {
        Self {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            literal_args: Vec::new(),
            receiver: Receiver::Stack,
            discard_result: false,
        }
    }
}

impl TypeInstr {
    pub fn is_array(&self) -> bool {
        self.type_name.starts_with('[')
    }

    /// C name of the innermost primitive element; `None` for class elements.
    pub fn primitive_element(&self) -> Option<&'static str> {
        if descriptor::element_class_name(&self.type_name).is_some() {
            return None;
        }
        let stripped = self.type_name.trim_start_matches('[');
        descriptor::primitive_c_name(*stripped.as_bytes().first()?)
    }
}

impl MultiArrayInstr {
    pub fn total_dimensions(&self) -> usize {
        descriptor::array_dimensions(&self.descriptor)
    }

    pub fn element_type(&self) -> Result<ElementType, CompileError> {
        descriptor::element_type_of(&self.descriptor)
    }
}

impl LdcInstr {
    fn as_assignable(&self) -> Option<Assignable> {
        let (expr, ty) = match &self.constant {
            Constant::Int(v) => (int_literal(*v), StackType::Int),
            Constant::Long(v) => (long_literal(*v), StackType::Long),
            Constant::Float(v) => (float_literal(*v), StackType::Float),
            Constant::Double(v) => (double_literal(*v), StackType::Double),
            Constant::String(_) => (
                format!("STRING_FROM_CONSTANT_POOL_OFFSET({})", self.pool_offset?),
                StackType::Object,
            ),
            Constant::Class(_) => (
                format!("CLASS_FROM_CONSTANT_POOL_OFFSET({})", self.pool_offset?),
                StackType::Object,
            ),
            Constant::MethodHandle(_) => return None,
        };
        Some(Assignable::pure(expr, ty))
    }
}

pub fn int_literal(v: i32) -> String {
    if v == i32::MIN {
        "(-2147483647 - 1)".to_string()
    } else {
        v.to_string()
    }
}

pub fn long_literal(v: i64) -> String {
    if v == i64::MIN {
        "(-9223372036854775807LL - 1)".to_string()
    } else {
        format!("{v}LL")
    }
}

pub fn float_literal(v: f32) -> String {
    if v.is_nan() {
        "JAVA_FLOAT_NAN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "JAVA_FLOAT_POSITIVE_INFINITY" } else { "JAVA_FLOAT_NEGATIVE_INFINITY" }
            .to_string()
    } else {
        format!("{v:?}f")
    }
}

pub fn double_literal(v: f64) -> String {
    if v.is_nan() {
        "JAVA_DOUBLE_NAN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "JAVA_DOUBLE_POSITIVE_INFINITY" } else { "JAVA_DOUBLE_NEGATIVE_INFINITY" }
            .to_string()
    } else {
        format!("{v:?}")
    }
}

/// Arena of instruction nodes plus the program-order sequence over them.
#[derive(Debug, Clone, Default)]
pub struct InstrList {
    nodes: Vec<Instr>,
    order: Vec<InstrId>,
    local_names: HashMap<(u16, StackType), String>,
}

impl InstrList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node at the end of the program order.
    pub fn push(&mut self, instr: Instr) -> InstrId {
        let id = self.alloc(instr);
        self.order.push(id);
        id
    }

    /// Remove the last node from the program order. The arena keeps it.
    pub fn pop(&mut self) -> Option<InstrId> {
        self.order.pop()
    }

    /// Add a node to the arena without placing it in the program order.
    pub fn alloc(&mut self, instr: Instr) -> InstrId {
        let id = InstrId(self.nodes.len() as u32);
        self.nodes.push(instr);
        id
    }

    pub fn node(&self, id: InstrId) -> Option<&Instr> {
        self.nodes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn order(&self) -> &[InstrId] {
        &self.order
    }

    /// Instruction at program position `pos`.
    pub fn at(&self, pos: usize) -> Option<&Instr> {
        self.order.get(pos).and_then(|id| self.node(*id))
    }

    /// Instructions in program order.
    pub fn iter(&self) -> impl Iterator<Item = &Instr> + '_ {
        self.order.iter().filter_map(|id| self.node(*id))
    }

    /// Label ids in program order.
    pub fn labels(&self) -> impl Iterator<Item = LabelId> + '_ {
        self.iter().filter_map(|instr| match instr {
            Instr::Label(l) => Some(l.label),
            _ => None,
        })
    }

    /// Replace positions `start..=end` of the program order with `replacement`.
    /// The new sequence is built fresh; the arena keeps every node.
    pub fn replace_window(&mut self, start: usize, end: usize, replacement: InstrId) {
        let mut next = Vec::with_capacity(self.order.len() - (end - start));
        next.extend_from_slice(&self.order[..start]);
        next.push(replacement);
        next.extend_from_slice(&self.order[end + 1..]);
        self.order = next;
    }

    /// Bind a symbolic name to a (slot, stack type) pair. Conflicting names for
    /// the same pair are rejected.
    pub fn bind_local_name(
        &mut self,
        slot: u16,
        ty: StackType,
        name: &str,
    ) -> Result<(), CompileError> {
        if let Some(existing) = self.local_names.get(&(slot, ty)) {
            if existing != name {
                return Err(CompileError::unsupported(format!(
                    "slot {slot} is named both '{existing}' and '{name}'"
                )));
            }
            return Ok(());
        }
        if self.local_names.values().any(|n| n == name) {
            return Err(CompileError::unsupported(format!(
                "local name '{name}' is bound to more than one slot"
            )));
        }
        self.local_names.insert((slot, ty), name.to_string());
        Ok(())
    }

    /// C variable for a local slot of the given stack type.
    pub fn local_name(&self, slot: u16, ty: StackType) -> String {
        match self.local_names.get(&(slot, ty)) {
            Some(name) => name.clone(),
            None => format!("{}locals_{}_", ty.local_prefix(), slot),
        }
    }

    pub(crate) fn assignable_child(
        &self,
        id: InstrId,
        role: &str,
    ) -> Result<Assignable, CompileError> {
        let node = self
            .node(id)
            .ok_or_else(|| CompileError::malformed(format!("{role} #{} is missing", id.0)))?;
        node.as_assignable(self).ok_or_else(|| {
            CompileError::malformed(format!("{role} '{}' is not assignable", node.describe()))
        })
    }
}
