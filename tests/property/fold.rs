// Property tests for the expression reducer:
// 1. Soundness: the folded list computes the same symbolic stack as the original
// 2. No partial folds: a rejected fold leaves the list untouched
// 3. Effects: no folded binary node combines two trapping operands

use bcnative::descriptor::StackType;
use bcnative::instr::expr::{render_binary, render_unary};
use bcnative::instr::{
    BasicInstr, Effect, Instr, InstrList, LabelInstr, VarInstr, array_element_type,
};
use bcnative::opcodes::*;
use bcnative::reduce::{reduce, reduce_at};
use proptest::prelude::*;

/// One generator step; steps that do not fit the current stack are skipped.
#[derive(Debug, Clone)]
enum Step {
    LoadInt(u16),
    LoadArray,
    Const(i32),
    Binary(u8),
    Unary(u8),
    ArrayLoad,
    ArrayLength,
    Label(u32),
    Dup,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..3u16).prop_map(Step::LoadInt),
        Just(Step::LoadArray),
        (-1..6i32).prop_map(Step::Const),
        prop_oneof![Just(IADD), Just(ISUB), Just(IMUL), Just(IAND), Just(ISHL), Just(IUSHR)]
            .prop_map(Step::Binary),
        prop_oneof![Just(INEG), Just(I2B), Just(I2S)].prop_map(Step::Unary),
        Just(Step::ArrayLoad),
        Just(Step::ArrayLength),
        (1..4u32).prop_map(Step::Label),
        Just(Step::Dup),
    ]
}

/// Turn steps into a well-typed instruction list.
fn build(steps: &[Step]) -> InstrList {
    let mut list = InstrList::new();
    let mut types: Vec<StackType> = Vec::new();
    let top2 = |t: &[StackType]| t.len() >= 2 && t[t.len() - 2..] == [StackType::Int, StackType::Int];
    for step in steps {
        match step {
            Step::LoadInt(slot) => {
                list.push(Instr::Var(VarInstr { opcode: ILOAD, slot: *slot, increment: None }));
                types.push(StackType::Int);
            }
            Step::LoadArray => {
                list.push(Instr::Var(VarInstr { opcode: ALOAD, slot: 5, increment: None }));
                types.push(StackType::Object);
            }
            Step::Const(v) => {
                list.push(Instr::Basic(BasicInstr::new((ICONST_0 as i32 + v) as u8)));
                types.push(StackType::Int);
            }
            Step::Binary(op) if top2(&types) => {
                list.push(Instr::Basic(BasicInstr::new(*op)));
                types.pop();
            }
            Step::Unary(op) if types.last() == Some(&StackType::Int) => {
                list.push(Instr::Basic(BasicInstr::new(*op)));
            }
            Step::ArrayLoad
                if types.len() >= 2
                    && types[types.len() - 2..] == [StackType::Object, StackType::Int] =>
            {
                list.push(Instr::Basic(BasicInstr::new(IALOAD)));
                types.pop();
                types.pop();
                types.push(StackType::Int);
            }
            Step::ArrayLength if types.last() == Some(&StackType::Object) => {
                list.push(Instr::Basic(BasicInstr::new(ARRAYLENGTH)));
                types.pop();
                types.push(StackType::Int);
            }
            Step::Label(id) => {
                list.push(Instr::Label(LabelInstr { label: *id }));
            }
            Step::Dup if !types.is_empty() => {
                list.push(Instr::Basic(BasicInstr::new(DUP)));
                let top = types[types.len() - 1];
                types.push(top);
            }
            _ => {}
        }
    }
    list
}

/// Evaluate a list over a stack of rendered C expressions.
fn evaluate(list: &InstrList) -> Vec<String> {
    let mut stack: Vec<String> = Vec::new();
    for instr in list.iter() {
        match instr {
            Instr::Label(_) => {}
            Instr::Arith(_) | Instr::ArrayLoad(_) | Instr::ArrayLength(_) => {
                stack.push(instr.render_expression(list).unwrap().expr);
            }
            Instr::Dup(_) => {
                let value = instr.render_expression(list).unwrap().expr;
                stack.push(value.clone());
                stack.push(value);
            }
            Instr::Basic(b) if b.opcode == DUP => {
                let top = stack.last().cloned().unwrap();
                stack.push(top);
            }
            Instr::Basic(b) if render_binary(b.opcode, "", "").is_some() => {
                let rhs = stack.pop().unwrap();
                let lhs = stack.pop().unwrap();
                stack.push(render_binary(b.opcode, &lhs, &rhs).unwrap());
            }
            Instr::Basic(b) if render_unary(b.opcode, "").is_some() => {
                let operand = stack.pop().unwrap();
                stack.push(render_unary(b.opcode, &operand).unwrap());
            }
            Instr::Basic(b) if array_element_type(b.opcode).is_some() => {
                let index = stack.pop().unwrap();
                let array = stack.pop().unwrap();
                stack.push(format!("ELEMENT_ACCESS_INT({array}, {index})"));
            }
            Instr::Basic(b) if b.opcode == ARRAYLENGTH => {
                let array = stack.pop().unwrap();
                stack.push(format!("CHECKED_ARRAY_LENGTH({array})"));
            }
            other => stack.push(other.as_assignable(list).unwrap().expr),
        }
    }
    stack
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn folding_preserves_the_symbolic_stack(steps in prop::collection::vec(arb_step(), 0..40)) {
        let original = build(&steps);
        let mut folded = original.clone();
        let folds = reduce(&mut folded);

        prop_assert_eq!(evaluate(&original), evaluate(&folded));
        prop_assert!(folded.len() <= original.len());
        if folds == 0 {
            prop_assert_eq!(folded.order(), original.order());
        }
    }

    #[test]
    fn rejected_fold_leaves_list_unchanged(
        steps in prop::collection::vec(arb_step(), 0..30),
        pos in 0..40usize,
    ) {
        let mut list = build(&steps);
        let before = list.order().to_vec();
        if reduce_at(&mut list, pos).is_none() {
            prop_assert_eq!(list.order(), before.as_slice());
        } else {
            prop_assert!(list.len() < before.len());
        }
    }

    #[test]
    fn folded_binaries_never_pair_two_traps(steps in prop::collection::vec(arb_step(), 0..40)) {
        let mut list = build(&steps);
        reduce(&mut list);
        let mut pending: Vec<&Instr> = list.iter().collect();
        while let Some(instr) = pending.pop() {
            if let Instr::Arith(arith) = instr {
                let lhs = list.node(arith.lhs).unwrap();
                pending.push(lhs);
                if let Some(rhs) = arith.rhs {
                    let rhs = list.node(rhs).unwrap();
                    pending.push(rhs);
                    let l = lhs.as_assignable(&list).unwrap().effect;
                    let r = rhs.as_assignable(&list).unwrap().effect;
                    prop_assert!(!(l == Effect::MayTrap && r == Effect::MayTrap));
                }
            }
        }
    }

    #[test]
    fn reduction_reaches_a_fixed_point(steps in prop::collection::vec(arb_step(), 0..40)) {
        let mut list = build(&steps);
        reduce(&mut list);
        let settled = list.order().to_vec();
        prop_assert_eq!(reduce(&mut list), 0);
        prop_assert_eq!(list.order(), settled.as_slice());
    }
}
