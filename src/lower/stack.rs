use crate::descriptor::StackType;
use crate::diagnostics::CompileError;
use crate::instr::expr::{binary_operand_types, render_binary, render_unary, unary_types};
use crate::instr::{BasicInstr, Constant, Instr, LdcInstr, local_stack_type};
use crate::opcodes::{self, *};

use super::LowerContext;

impl LowerContext<'_> {
    pub(super) fn lower_basic(&mut self, opcode: u8, immediate: Option<i32>) -> Result<(), CompileError> {
        match opcode {
            NOP => Ok(()),
            ACONST_NULL => {
                self.line("PUSH_OBJ(JAVA_NULL);");
                Ok(())
            }
            ICONST_M1..=DCONST_1 | BIPUSH | SIPUSH => {
                let value = Instr::Basic(BasicInstr { opcode, immediate })
                    .as_assignable(self.list)
                    .ok_or_else(|| {
                        CompileError::unsupported(format!("{} without an operand", opcodes::mnemonic(opcode)))
                    })?;
                self.push_value(value.ty, &value.expr);
                Ok(())
            }
            POP => self.stack_op("BC_POP"),
            POP2 => self.stack_op("BC_POP2"),
            DUP => self.stack_op("BC_DUP"),
            DUP_X1 => self.stack_op("BC_DUP_X1"),
            DUP_X2 => self.stack_op("BC_DUP_X2"),
            DUP2 => self.stack_op("BC_DUP2"),
            DUP2_X1 => self.stack_op("BC_DUP2_X1"),
            DUP2_X2 => self.stack_op("BC_DUP2_X2"),
            SWAP => self.stack_op("BC_SWAP"),
            op if opcodes::is_binary_arith(op) => self.lower_binary(op),
            op if opcodes::is_unary_arith(op) => self.lower_unary(op),
            LCMP => self.lower_compare(StackType::Long, None),
            FCMPL => self.lower_compare(StackType::Float, Some(-1)),
            FCMPG => self.lower_compare(StackType::Float, Some(1)),
            DCMPL => self.lower_compare(StackType::Double, Some(-1)),
            DCMPG => self.lower_compare(StackType::Double, Some(1)),
            op if opcodes::is_array_load(op) => self.lower_array_load(op),
            op if opcodes::is_array_store(op) => self.lower_array_store(op),
            ARRAYLENGTH => self.lower_array_length(),
            NEWARRAY => self.lower_new_array(immediate),
            IRETURN..=RETURN => self.lower_return(op_return_type(opcode)),
            ATHROW => {
                self.line("THROW(POP_OBJ());");
                Ok(())
            }
            MONITORENTER => self.lower_monitor("monitorEnter"),
            MONITOREXIT => self.lower_monitor("monitorExit"),
            other => Err(CompileError::unsupported(format!(
                "opcode {} cannot be lowered here",
                opcodes::mnemonic(other)
            ))),
        }
    }

    fn stack_op(&mut self, name: &str) -> Result<(), CompileError> {
        self.line(format!("{name}();"));
        Ok(())
    }

    pub(super) fn lower_local(
        &mut self,
        opcode: u8,
        slot: u16,
        increment: Option<i32>,
    ) -> Result<(), CompileError> {
        if opcode == RET {
            return Err(CompileError::unsupported("ret (subroutines are not supported)"));
        }
        let ty = local_stack_type(opcode).ok_or_else(|| {
            CompileError::unsupported(format!("{} is not a local access", opcodes::mnemonic(opcode)))
        })?;
        let name = self.list.local_name(slot, ty);
        if opcode == IINC {
            let delta = increment
                .ok_or_else(|| CompileError::unsupported(format!("iinc on slot {slot} has no delta")))?;
            self.line(format!("{name} += {delta};"));
        } else if opcodes::is_load(opcode) {
            self.push_value(ty, &name);
        } else if ty == StackType::Object {
            // The popped slot's stake moves into the local.
            self.open_block();
            self.pop_into(StackType::Object, "__value");
            self.line(format!("RELEASE({name});"));
            self.line(format!("{name} = __value;"));
            self.close_block();
        } else {
            self.line(format!("{name} = POP_{}();", ty.macro_suffix()));
        }
        Ok(())
    }

    pub(super) fn lower_ldc(&mut self, ldc: &LdcInstr) -> Result<(), CompileError> {
        if let Constant::MethodHandle(handle) = &ldc.constant {
            return Err(CompileError::unsupported(format!("method handle constant '{handle}'")));
        }
        let value = Instr::Ldc(ldc.clone()).as_assignable(self.list).ok_or_else(|| {
            CompileError::unsupported("literal was not registered in the constant pool")
        })?;
        self.push_value(value.ty, &value.expr);
        Ok(())
    }

    fn lower_binary(&mut self, opcode: u8) -> Result<(), CompileError> {
        let (lt, rt) = binary_operand_types(opcode).ok_or_else(|| {
            CompileError::unsupported(format!("{} has no operand types", opcodes::mnemonic(opcode)))
        })?;
        let expr = render_binary(opcode, "__a", "__b").ok_or_else(|| {
            CompileError::unsupported(format!("cannot render {}", opcodes::mnemonic(opcode)))
        })?;
        self.open_block();
        self.pop_into(rt, "__b");
        self.pop_into(lt, "__a");
        self.push_value(lt, &expr);
        self.close_block();
        Ok(())
    }

    fn lower_unary(&mut self, opcode: u8) -> Result<(), CompileError> {
        let (operand, result) = unary_types(opcode).ok_or_else(|| {
            CompileError::unsupported(format!("{} has no operand type", opcodes::mnemonic(opcode)))
        })?;
        let expr = render_unary(opcode, "__a").ok_or_else(|| {
            CompileError::unsupported(format!("cannot render {}", opcodes::mnemonic(opcode)))
        })?;
        self.open_block();
        self.pop_into(operand, "__a");
        self.push_value(result, &expr);
        self.close_block();
        Ok(())
    }

    /// `lcmp` and the floating compares. `nan_result` is the value pushed when
    /// either operand is NaN (`-1` for the `l` forms, `1` for the `g` forms).
    fn lower_compare(&mut self, ty: StackType, nan_result: Option<i32>) -> Result<(), CompileError> {
        self.open_block();
        self.pop_into(ty, "__b");
        self.pop_into(ty, "__a");
        match nan_result {
            None => self.line("PUSH_INT((__a > __b) - (__a < __b));"),
            Some(nan) => self.line(format!(
                "PUSH_INT(__a > __b ? 1 : (__a == __b ? 0 : (__a < __b ? -1 : {nan})));"
            )),
        }
        self.close_block();
        Ok(())
    }
}

/// Stack type returned by an `xreturn` opcode; `None` for `return`.
fn op_return_type(opcode: u8) -> Option<StackType> {
    match opcode {
        IRETURN => Some(StackType::Int),
        LRETURN => Some(StackType::Long),
        FRETURN => Some(StackType::Float),
        DRETURN => Some(StackType::Double),
        ARETURN => Some(StackType::Object),
        _ => None,
    }
}
