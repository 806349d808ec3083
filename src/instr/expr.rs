use crate::descriptor::{ElementType, StackType};
use crate::diagnostics::CompileError;
use crate::opcodes::{self, *};

use super::{InstrId, InstrList, array_element_type};

/// Whether evaluating an expression can raise a runtime exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Effect {
    Pure,
    MayTrap,
}

impl Effect {
    pub fn join(self, other: Effect) -> Effect {
        self.max(other)
    }
}

/// A value that can be computed in place, without touching the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignable {
    pub expr: String,
    pub ty: StackType,
    pub effect: Effect,
}

impl Assignable {
    pub fn pure(expr: impl Into<String>, ty: StackType) -> Self {
        Self { expr: expr.into(), ty, effect: Effect::Pure }
    }
}

/// Arithmetic over already-rendered operands.
#[derive(Debug, Clone, PartialEq)]
pub struct ArithExpr {
    pub opcode: u8,
    pub lhs: InstrId,
    /// `None` for negation and conversions.
    pub rhs: Option<InstrId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLoadExpr {
    pub opcode: u8,
    pub array: InstrId,
    pub index: InstrId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLengthExpr {
    pub array: InstrId,
}

/// `dup` of an assignable value: pushes the source twice.
#[derive(Debug, Clone, PartialEq)]
pub struct DupExpr {
    pub source: InstrId,
}

fn expect_type(a: &Assignable, ty: StackType, role: &str, opcode: u8) -> Result<(), CompileError> {
    if a.ty != ty {
        return Err(CompileError::malformed(format!(
            "{role} of {} is {:?}, expected {:?}",
            opcodes::mnemonic(opcode),
            a.ty,
            ty
        )));
    }
    Ok(())
}

impl ArithExpr {
    pub fn render(&self, list: &InstrList) -> Result<Assignable, CompileError> {
        let lhs = list.assignable_child(self.lhs, "left operand")?;
        match self.rhs {
            Some(rhs_id) => {
                let (lt, rt) = binary_operand_types(self.opcode).ok_or_else(|| {
                    CompileError::malformed(format!(
                        "{} is not a binary operator",
                        opcodes::mnemonic(self.opcode)
                    ))
                })?;
                let rhs = list.assignable_child(rhs_id, "right operand")?;
                expect_type(&lhs, lt, "left operand", self.opcode)?;
                expect_type(&rhs, rt, "right operand", self.opcode)?;
                let expr = render_binary(self.opcode, &lhs.expr, &rhs.expr).ok_or_else(|| {
                    CompileError::malformed(format!("cannot render {}", opcodes::mnemonic(self.opcode)))
                })?;
                let mut effect = lhs.effect.join(rhs.effect);
                if divides_integers(self.opcode) {
                    effect = Effect::MayTrap;
                }
                Ok(Assignable { expr, ty: lt, effect })
            }
            None => {
                let (operand, result) = unary_types(self.opcode).ok_or_else(|| {
                    CompileError::malformed(format!(
                        "{} is not a unary operator",
                        opcodes::mnemonic(self.opcode)
                    ))
                })?;
                expect_type(&lhs, operand, "operand", self.opcode)?;
                let expr = render_unary(self.opcode, &lhs.expr).ok_or_else(|| {
                    CompileError::malformed(format!("cannot render {}", opcodes::mnemonic(self.opcode)))
                })?;
                Ok(Assignable { expr, ty: result, effect: lhs.effect })
            }
        }
    }
}

impl ArrayLoadExpr {
    pub fn element(&self) -> Option<ElementType> {
        array_element_type(self.opcode)
    }

    pub fn render(&self, list: &InstrList) -> Result<Assignable, CompileError> {
        let element = self.element().ok_or_else(|| {
            CompileError::malformed(format!("{} is not an array load", opcodes::mnemonic(self.opcode)))
        })?;
        let array = list.assignable_child(self.array, "array")?;
        let index = list.assignable_child(self.index, "index")?;
        expect_type(&array, StackType::Object, "array", self.opcode)?;
        expect_type(&index, StackType::Int, "index", self.opcode)?;
        Ok(Assignable {
            expr: format!("ELEMENT_ACCESS_{}({}, {})", element.macro_suffix(), array.expr, index.expr),
            ty: element.stack_type(),
            effect: Effect::MayTrap,
        })
    }
}

impl ArrayLengthExpr {
    pub fn render(&self, list: &InstrList) -> Result<Assignable, CompileError> {
        let array = list.assignable_child(self.array, "array")?;
        expect_type(&array, StackType::Object, "array", ARRAYLENGTH)?;
        Ok(Assignable {
            expr: format!("CHECKED_ARRAY_LENGTH({})", array.expr),
            ty: StackType::Int,
            effect: Effect::MayTrap,
        })
    }
}

/// Operand types of a binary arithmetic opcode as (left, right). The result
/// has the left operand's type.
pub fn binary_operand_types(opcode: u8) -> Option<(StackType, StackType)> {
    let by_lane = |lane: u8| match lane {
        0 => StackType::Int,
        1 => StackType::Long,
        2 => StackType::Float,
        _ => StackType::Double,
    };
    match opcode {
        IADD..=DREM => {
            let ty = by_lane((opcode - IADD) % 4);
            Some((ty, ty))
        }
        ISHL | ISHR | IUSHR => Some((StackType::Int, StackType::Int)),
        LSHL | LSHR | LUSHR => Some((StackType::Long, StackType::Int)),
        IAND | IOR | IXOR => Some((StackType::Int, StackType::Int)),
        LAND | LOR | LXOR => Some((StackType::Long, StackType::Long)),
        _ => None,
    }
}

/// Operand and result type of a negation or conversion opcode.
pub fn unary_types(opcode: u8) -> Option<(StackType, StackType)> {
    use StackType::*;
    let pair = match opcode {
        INEG => (Int, Int),
        LNEG => (Long, Long),
        FNEG => (Float, Float),
        DNEG => (Double, Double),
        I2L => (Int, Long),
        I2F => (Int, Float),
        I2D => (Int, Double),
        L2I => (Long, Int),
        L2F => (Long, Float),
        L2D => (Long, Double),
        F2I => (Float, Int),
        F2L => (Float, Long),
        F2D => (Float, Double),
        D2I => (Double, Int),
        D2L => (Double, Long),
        D2F => (Double, Float),
        I2B | I2C | I2S => (Int, Int),
        _ => return None,
    };
    Some(pair)
}

/// Integral division and remainder, which throw `ArithmeticException` on a
/// zero divisor.
pub fn divides_integers(opcode: u8) -> bool {
    matches!(opcode, IDIV | LDIV | IREM | LREM)
}

/// Render a binary arithmetic opcode over two C operand expressions.
pub fn render_binary(opcode: u8, a: &str, b: &str) -> Option<String> {
    let infix = |op: &str| Some(format!("({a} {op} {b})"));
    match opcode {
        IADD | LADD | FADD | DADD => infix("+"),
        ISUB | LSUB | FSUB | DSUB => infix("-"),
        IMUL | LMUL | FMUL | DMUL => infix("*"),
        FDIV | DDIV => infix("/"),
        // Zero divisors throw and MIN / -1 wraps, neither of which C's `/` does.
        IDIV => Some(format!("JAVA_IDIV({a}, {b})")),
        LDIV => Some(format!("JAVA_LDIV({a}, {b})")),
        IREM => Some(format!("JAVA_IREM({a}, {b})")),
        LREM => Some(format!("JAVA_LREM({a}, {b})")),
        FREM => Some(format!("fmodf({a}, {b})")),
        DREM => Some(format!("fmod({a}, {b})")),
        ISHL => Some(format!("((JAVA_INT)((JAVA_UINT)({a}) << (({b}) & 0x1f)))")),
        LSHL => Some(format!("((JAVA_LONG)((JAVA_ULONG)({a}) << (({b}) & 0x3f)))")),
        ISHR => Some(format!("(({a}) >> (({b}) & 0x1f))")),
        LSHR => Some(format!("(({a}) >> (({b}) & 0x3f))")),
        IUSHR => Some(format!("((JAVA_INT)((JAVA_UINT)({a}) >> (({b}) & 0x1f)))")),
        LUSHR => Some(format!("((JAVA_LONG)((JAVA_ULONG)({a}) >> (({b}) & 0x3f)))")),
        IAND | LAND => infix("&"),
        IOR | LOR => infix("|"),
        IXOR | LXOR => infix("^"),
        _ => None,
    }
}

/// Render a negation or conversion opcode over one C operand expression.
pub fn render_unary(opcode: u8, a: &str) -> Option<String> {
    let text = match opcode {
        INEG | LNEG | FNEG | DNEG => format!("(-({a}))"),
        I2L => format!("((JAVA_LONG)({a}))"),
        I2F | L2F | D2F => format!("((JAVA_FLOAT)({a}))"),
        I2D | L2D | F2D => format!("((JAVA_DOUBLE)({a}))"),
        L2I => format!("((JAVA_INT)({a}))"),
        F2I => format!("JAVA_F2I({a})"),
        F2L => format!("JAVA_F2L({a})"),
        D2I => format!("JAVA_D2I({a})"),
        D2L => format!("JAVA_D2L({a})"),
        I2B => format!("((JAVA_BYTE)({a}))"),
        I2C => format!("((JAVA_CHAR)({a}))"),
        I2S => format!("((JAVA_SHORT)({a}))"),
        _ => return None,
    };
    Some(text)
}
