mod control;
mod dispatch;
mod member;
mod stack;

use std::collections::BTreeSet;

use crate::descriptor::{JvmType, MethodDescriptor, StackType};
use crate::diagnostics::CompileError;
use crate::hierarchy::StaticOwnerResolver;
use crate::instr::{Instr, InstrList, local_stack_type};
use crate::mangle;
use crate::unit::{LabelId, TranslationUnit};

/// The method whose body is being lowered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
    pub max_stack: u16,
    pub max_locals: u16,
}

impl MethodInfo {
    pub fn symbol(&self) -> Result<String, CompileError> {
        mangle::method_symbol_from_descriptor(&self.owner, &self.name, &self.descriptor)
    }

    /// Human-readable `owner.name(desc)` used in logs.
    pub fn display_name(&self) -> String {
        format!("{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// A local variable of the generated function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
    pub slot: u16,
    pub ty: StackType,
    pub name: String,
    /// C parameter initializing this local, for `this` and declared arguments.
    pub param: Option<String>,
}

/// Lay out the locals of a method: `this` and the declared arguments first,
/// then every other (slot, type) pair the body touches, ordered by slot.
pub fn collect_locals(list: &InstrList, method: &MethodInfo) -> Result<Vec<LocalVar>, CompileError> {
    let desc = MethodDescriptor::parse(&method.descriptor)?;
    let mut locals = Vec::new();
    let mut seen = BTreeSet::new();
    let mut slot: u16 = 0;
    if !method.is_static {
        seen.insert((0, StackType::Object));
        locals.push(LocalVar {
            slot: 0,
            ty: StackType::Object,
            name: list.local_name(0, StackType::Object),
            param: Some("__this".to_string()),
        });
        slot = 1;
    }
    for param in &desc.params {
        let ty = param.stack_type().ok_or_else(|| {
            CompileError::unsupported(format!("void parameter in '{}'", method.descriptor))
        })?;
        seen.insert((slot, ty));
        locals.push(LocalVar {
            slot,
            ty,
            name: list.local_name(slot, ty),
            param: Some(param_name(slot)),
        });
        slot += param.slot_width();
    }

    let mut body = BTreeSet::new();
    for instr in list.iter() {
        let (opcode, slot) = match instr {
            Instr::Var(v) => (v.opcode, v.slot),
            Instr::NamedLocal(n) => (n.opcode, n.slot),
            _ => continue,
        };
        if let Some(ty) = local_stack_type(opcode) {
            if !seen.contains(&(slot, ty)) {
                body.insert((slot, ty));
            }
        }
    }
    locals.extend(body.into_iter().map(|(slot, ty)| LocalVar {
        slot,
        ty,
        name: list.local_name(slot, ty),
        param: None,
    }));
    Ok(locals)
}

/// C parameter name for the argument stored in `slot`.
pub fn param_name(slot: u16) -> String {
    format!("__param_{slot}")
}

/// Walks a reduced instruction list once, appending C statements per
/// instruction. The per-kind rules live in the submodules.
pub struct LowerContext<'a> {
    list: &'a InstrList,
    unit: &'a mut TranslationUnit,
    method: &'a MethodInfo,
    resolver: &'a dyn StaticOwnerResolver,
    annotate: bool,
    // Per-method state
    out: String,
    indent: usize,
    labels: Vec<LabelId>,
    /// Try regions currently open, innermost last.
    open_tries: Vec<u32>,
    /// Object locals released on every return.
    object_locals: Vec<String>,
    virtual_calls: BTreeSet<String>,
}

/// Result of lowering one method body.
#[derive(Debug, Clone, Default)]
pub struct LoweredBody {
    pub code: String,
    /// Virtual/interface symbols called from this body.
    pub virtual_calls: BTreeSet<String>,
}

impl<'a> LowerContext<'a> {
    pub fn new(
        list: &'a InstrList,
        unit: &'a mut TranslationUnit,
        method: &'a MethodInfo,
        resolver: &'a dyn StaticOwnerResolver,
        locals: &[LocalVar],
    ) -> Self {
        Self {
            list,
            unit,
            method,
            resolver,
            annotate: false,
            out: String::new(),
            indent: 1,
            labels: list.labels().collect(),
            open_tries: Vec::new(),
            object_locals: locals
                .iter()
                .filter(|l| l.ty == StackType::Object)
                .map(|l| l.name.clone())
                .collect(),
            virtual_calls: BTreeSet::new(),
        }
    }

    /// Emit a `/* mnemonic */` comment before each instruction.
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    pub fn lower_body(mut self) -> Result<LoweredBody, CompileError> {
        let list = self.list;
        for instr in list.iter() {
            if self.annotate && !matches!(instr, Instr::Label(_) | Instr::TryCatch(_)) {
                let note = instr.describe().replace("*/", "* /");
                self.line(format!("/* {note} */"));
            }
            self.lower_instr(instr)?;
        }
        if let Some(seq) = self.open_tries.last() {
            return Err(CompileError::unbalanced_try(format!(
                "try region #{seq} is still open at the end of the method"
            )));
        }
        Ok(LoweredBody { code: self.out, virtual_calls: self.virtual_calls })
    }

    fn lower_instr(&mut self, instr: &Instr) -> Result<(), CompileError> {
        match instr {
            Instr::Basic(b) => self.lower_basic(b.opcode, b.immediate),
            Instr::Var(v) => self.lower_local(v.opcode, v.slot, v.increment),
            Instr::NamedLocal(n) => {
                n.validate()?;
                self.lower_local(n.opcode, n.slot, n.increment)
            }
            Instr::Field(f) => self.lower_field(f),
            Instr::Invoke(i) => self.lower_invoke(i),
            Instr::Jump(j) => self.lower_jump(j),
            Instr::Label(l) => self.lower_label(l.label),
            Instr::Switch(s) => self.lower_switch(s),
            // Regions are registered while the list is built.
            Instr::TryCatch(_) => Ok(()),
            Instr::Type(t) => self.lower_type(t),
            Instr::MultiArray(m) => self.lower_multi_array(m),
            Instr::Ldc(l) => self.lower_ldc(l),
            Instr::Arith(_) | Instr::ArrayLoad(_) | Instr::ArrayLength(_) => {
                let value = instr.render_expression(self.list)?;
                self.push_value(value.ty, &value.expr);
                Ok(())
            }
            Instr::Dup(_) => {
                let value = instr.render_expression(self.list)?;
                self.push_value(value.ty, &value.expr);
                self.push_value(value.ty, &value.expr);
                Ok(())
            }
        }
    }

    // ── Output helpers ───────────────────────────────────────────────

    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn open_block(&mut self) {
        self.line("{");
        self.indent += 1;
    }

    fn close_block(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    /// Push `expr` with the typed push macro. Object values get a fresh stake.
    fn push_value(&mut self, ty: StackType, expr: &str) {
        match ty {
            StackType::Object => self.line(format!("PUSH_OBJ(RETAIN({expr}));")),
            other => self.line(format!("PUSH_{}({expr});", other.macro_suffix())),
        }
    }

    /// Declare `name` and pop the top of stack into it.
    fn pop_into(&mut self, ty: StackType, name: &str) {
        self.line(format!("{} {name} = POP_{}();", ty.c_type(), ty.macro_suffix()));
    }

    fn stack_type_of(&self, ty: &JvmType) -> Result<StackType, CompileError> {
        ty.stack_type()
            .ok_or_else(|| CompileError::unsupported("void value on the operand stack"))
    }

    fn receiver_this(&self, what: &str) -> Result<&'static str, CompileError> {
        if self.method.is_static {
            return Err(CompileError::unsupported(format!(
                "{what} uses the current object inside static method {}",
                self.method.display_name()
            )));
        }
        Ok("__this")
    }

    fn release_object_locals(&mut self) {
        let names = self.object_locals.clone();
        for name in names {
            self.line(format!("RELEASE({name});"));
        }
    }
}
