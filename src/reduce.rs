use crate::descriptor::StackType;
use crate::instr::{
    ArithExpr, ArrayLengthExpr, ArrayLoadExpr, Assignable, DupExpr, Effect, Instr, InstrList,
};
use crate::opcodes::{self, *};

/// Try to fold the operator at program position `pos`. Returns the position
/// of the new expression node, or `None` with the list untouched. Only adjacent
/// operands fold, and at most one of them may trap.
pub fn reduce_at(list: &mut InstrList, pos: usize) -> Option<usize> {
    let opcode = match list.at(pos)? {
        Instr::Basic(b) => b.opcode,
        _ => return None,
    };
    let (start, node) = if opcodes::is_binary_arith(opcode) {
        let (lhs, rhs) = operands2(list, pos)?;
        (pos - 2, Instr::Arith(ArithExpr { opcode, lhs, rhs: Some(rhs) }))
    } else if opcodes::is_unary_arith(opcode) {
        let lhs = operand1(list, pos)?;
        (pos - 1, Instr::Arith(ArithExpr { opcode, lhs, rhs: None }))
    } else if opcodes::is_array_load(opcode) {
        let (array, index) = operands2(list, pos)?;
        (pos - 2, Instr::ArrayLoad(ArrayLoadExpr { opcode, array, index }))
    } else if opcode == ARRAYLENGTH {
        let array = operand1(list, pos)?;
        (pos - 1, Instr::ArrayLength(ArrayLengthExpr { array }))
    } else if opcode == DUP {
        let source = dup_source(list, pos)?;
        (pos - 1, Instr::Dup(DupExpr { source }))
    } else {
        return None;
    };

    // Type-check the candidate before touching the order.
    if !matches!(node, Instr::Dup(_)) && node.render_expression(list).is_err() {
        return None;
    }
    let replacement = list.alloc(node);
    list.replace_window(start, pos, replacement);
    tracing::trace!(position = start, op = opcodes::mnemonic(opcode), "folded expression");
    Some(start)
}

/// Fold until no window changes. Returns the number of folds applied.
pub fn reduce(list: &mut InstrList) -> usize {
    let mut folds = 0;
    loop {
        let mut changed = false;
        let mut pos = 0;
        while pos < list.len() {
            if let Some(at) = reduce_at(list, pos) {
                folds += 1;
                changed = true;
                pos = at + 1;
            } else {
                pos += 1;
            }
        }
        if !changed {
            break;
        }
    }
    folds
}

fn assignable_at(list: &InstrList, pos: usize) -> Option<Assignable> {
    list.at(pos)?.as_assignable(list)
}

fn operand1(list: &InstrList, pos: usize) -> Option<crate::instr::InstrId> {
    let at = pos.checked_sub(1)?;
    assignable_at(list, at)?;
    Some(list.order()[at])
}

fn operands2(
    list: &InstrList,
    pos: usize,
) -> Option<(crate::instr::InstrId, crate::instr::InstrId)> {
    let first = pos.checked_sub(2)?;
    let a = assignable_at(list, first)?;
    let b = assignable_at(list, first + 1)?;
    if a.effect == Effect::MayTrap && b.effect == Effect::MayTrap {
        return None;
    }
    Some((list.order()[first], list.order()[first + 1]))
}

/// Source of a `dup` that directly follows an object local load.
fn dup_source(list: &InstrList, pos: usize) -> Option<crate::instr::InstrId> {
    let at = pos.checked_sub(1)?;
    let is_aload = match list.at(at)? {
        Instr::Var(v) => v.opcode == ALOAD,
        Instr::NamedLocal(n) => n.opcode == ALOAD,
        _ => false,
    };
    if !is_aload {
        return None;
    }
    let value = assignable_at(list, at)?;
    (value.ty == StackType::Object).then(|| list.order()[at])
}
