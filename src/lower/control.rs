use crate::descriptor::StackType;
use crate::diagnostics::CompileError;
use crate::instr::{JumpInstr, SwitchInstr};
use crate::mangle;
use crate::opcodes::{self, *};
use crate::unit::LabelId;

use super::LowerContext;

impl LowerContext<'_> {
    /// Anchor, then region closes (innermost first), then region opens.
    pub(super) fn lower_label(&mut self, label: LabelId) -> Result<(), CompileError> {
        if self.unit.is_label_referenced(label) {
            self.out.push_str(&format!("label_{label}: ;\n"));
        }

        let ending = self.unit.end_markers(label).to_vec();
        for _ in 0..ending.len() {
            let top = self.open_tries.pop().ok_or_else(|| {
                CompileError::unbalanced_try(format!(
                    "label_{label} closes a try region that was never opened"
                ))
            })?;
            if !ending.contains(&top) {
                return Err(CompileError::unbalanced_try(format!(
                    "label_{label} closes try regions out of nesting order (region #{top} is innermost)"
                )));
            }
            self.line(format!("END_TRY(__try_offset_{top});"));
        }

        let beginning = self.unit.begin_markers(label).to_vec();
        for seq in beginning.into_iter().rev() {
            let region = self
                .unit
                .region(seq)
                .cloned()
                .ok_or_else(|| CompileError::unbalanced_try(format!("unknown try region #{seq}")))?;
            let class_id = match &region.catch_type {
                Some(class) => mangle::class_id(class),
                None => "CATCH_ALL".to_string(),
            };
            self.line(format!("SAVE_TRY_OFFSET(__try_offset_{seq});"));
            self.line(format!(
                "BEGIN_TRY({class_id}, label_{}, __try_offset_{seq});",
                region.handler
            ));
            self.open_tries.push(seq);
        }
        Ok(())
    }

    /// `goto`, or the depth-aware `JUMP_TO` once the method has any try region.
    fn jump_stmt(&mut self, target: LabelId) -> Result<String, CompileError> {
        if self.unit.has_try_regions() {
            let depth = self.unit.catch_depth(target, self.labels.iter().copied())?;
            Ok(format!("JUMP_TO(label_{target}, {depth});"))
        } else {
            Ok(format!("goto label_{target};"))
        }
    }

    pub(super) fn lower_jump(&mut self, jump: &JumpInstr) -> Result<(), CompileError> {
        let stmt = match jump.opcode {
            JSR | JSR_W => {
                return Err(CompileError::unsupported("jsr (subroutines are not supported)"));
            }
            GOTO | GOTO_W => {
                let stmt = self.jump_stmt(jump.target)?;
                self.line(stmt);
                return Ok(());
            }
            op if opcodes::is_conditional_jump(op) => self.jump_stmt(jump.target)?,
            other => {
                return Err(CompileError::unsupported(format!(
                    "{} is not a branch",
                    opcodes::mnemonic(other)
                )));
            }
        };

        if let Some(condition) = &jump.condition {
            self.line(format!("if ({condition}) {stmt}"));
            return Ok(());
        }

        match jump.opcode {
            IFEQ..=IFLE => {
                let op = compare_operator(jump.opcode - IFEQ);
                self.line(format!("if (POP_INT() {op} 0) {stmt}"));
            }
            IF_ICMPEQ..=IF_ICMPLE => {
                let op = compare_operator(jump.opcode - IF_ICMPEQ);
                self.open_block();
                self.pop_into(StackType::Int, "__b");
                self.pop_into(StackType::Int, "__a");
                self.line(format!("if (__a {op} __b) {stmt}"));
                self.close_block();
            }
            IF_ACMPEQ | IF_ACMPNE => {
                let op = if jump.opcode == IF_ACMPEQ { "==" } else { "!=" };
                self.open_block();
                self.pop_into(StackType::Object, "__b");
                self.pop_into(StackType::Object, "__a");
                self.line(format!("JAVA_BOOLEAN __cond = __a {op} __b;"));
                self.line("RELEASE(__a);");
                self.line("RELEASE(__b);");
                self.line(format!("if (__cond) {stmt}"));
                self.close_block();
            }
            IFNULL | IFNONNULL => {
                let op = if jump.opcode == IFNULL { "==" } else { "!=" };
                self.open_block();
                self.pop_into(StackType::Object, "__v");
                self.line(format!("JAVA_BOOLEAN __cond = __v {op} JAVA_NULL;"));
                self.line("RELEASE(__v);");
                self.line(format!("if (__cond) {stmt}"));
                self.close_block();
            }
            other => {
                return Err(CompileError::unsupported(format!(
                    "{} is not a conditional branch",
                    opcodes::mnemonic(other)
                )));
            }
        }
        Ok(())
    }

    pub(super) fn lower_switch(&mut self, switch: &SwitchInstr) -> Result<(), CompileError> {
        if switch.keys.len() != switch.targets.len() {
            return Err(CompileError::unsupported(format!(
                "switch has {} keys but {} targets",
                switch.keys.len(),
                switch.targets.len()
            )));
        }
        self.line("switch (POP_INT()) {");
        self.indent += 1;
        for (key, target) in switch.keys.iter().zip(&switch.targets) {
            let stmt = self.jump_stmt(*target)?;
            self.line(format!("case {}: {stmt}", crate::instr::int_literal(*key)));
        }
        if let Some(default) = switch.default {
            let stmt = self.jump_stmt(default)?;
            self.line(format!("default: {stmt}"));
        }
        self.close_block();
        Ok(())
    }

    pub(super) fn lower_return(&mut self, value: Option<StackType>) -> Result<(), CompileError> {
        let has_tries = self.unit.has_try_regions();
        match value {
            None => {
                if has_tries {
                    self.line("EXIT_TRY_SCOPES();");
                }
                self.release_object_locals();
                self.line("return;");
            }
            Some(ty) => {
                self.open_block();
                self.pop_into(ty, "__ret");
                if has_tries {
                    self.line("EXIT_TRY_SCOPES();");
                }
                self.release_object_locals();
                if ty == StackType::Object {
                    self.line("return AUTORELEASE(__ret);");
                } else {
                    self.line("return __ret;");
                }
                self.close_block();
            }
        }
        Ok(())
    }
}

/// C operator for the `eq ne lt ge gt le` family at offset `n`.
fn compare_operator(n: u8) -> &'static str {
    match n {
        0 => "==",
        1 => "!=",
        2 => "<",
        3 => ">=",
        4 => ">",
        _ => "<=",
    }
}
