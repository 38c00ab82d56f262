use std::cmp::Ordering;

use crate::vm::frame::{FlowControl, Frame};

/// Operands pop as `v2, v1`; the first value pushed is the left-hand side
/// of the predicate.
pub(super) fn int_compare(
    frame: &mut Frame,
    target: i64,
    cond: fn(Ordering) -> bool,
) -> Result<(), FlowControl> {
    let val2 = frame.pop_int()?;
    let val1 = frame.pop_int()?;
    if cond(val1.cmp(&val2)) {
        debug!("branching to {}", target);
        return Err(FlowControl::Branch(target as usize));
    }
    Ok(())
}

pub(super) fn float_compare(
    frame: &mut Frame,
    target: i64,
    cond: fn(Ordering) -> bool,
) -> Result<(), FlowControl> {
    let val2 = frame.pop_float()?;
    let val1 = frame.pop_float()?;
    // unordered operands (NaN) never take an ordered branch
    if let Some(order) = val1.partial_cmp(&val2) {
        if cond(order) {
            debug!("branching to {}", target);
            return Err(FlowControl::Branch(target as usize));
        }
    }
    Ok(())
}

/// Not-equal is true whenever the operands do not compare equal, so an
/// unordered (NaN) pair takes the branch.
pub(super) fn float_compare_ne(frame: &mut Frame, target: i64) -> Result<(), FlowControl> {
    let val2 = frame.pop_float()?;
    let val1 = frame.pop_float()?;
    if val1.partial_cmp(&val2) != Some(Ordering::Equal) {
        debug!("branching to {}", target);
        return Err(FlowControl::Branch(target as usize));
    }
    Ok(())
}

pub(super) fn if_null(frame: &mut Frame, target: i64) -> Result<(), FlowControl> {
    let value = frame.pop()?;
    if value.is_none() {
        debug!("branching to {}", target);
        return Err(FlowControl::Branch(target as usize));
    }
    Ok(())
}

pub(super) fn if_non_null(frame: &mut Frame, target: i64) -> Result<(), FlowControl> {
    let value = frame.pop()?;
    if !value.is_none() {
        debug!("branching to {}", target);
        return Err(FlowControl::Branch(target as usize));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::instruction::Instruction;
    use crate::vm::frame::{FlowControl, Frame};
    use crate::vm::mem::{Value, ValueType};

    fn branches(ins: Instruction, v1: Value, v2: Value) -> bool {
        let mut frame = Frame::new(vec![]);
        frame.push(v1);
        frame.push(v2);
        match ins.exec(&mut frame) {
            Ok(()) => false,
            Err(FlowControl::Branch(_)) => true,
            other => panic!("unexpected flow {:?}", other),
        }
    }

    #[test]
    fn operand_order_is_first_pushed_on_the_left() {
        // 1 < 2: first pushed is the left-hand operand
        assert!(branches(Instruction::IfICmpLt(0), Value::from(1), Value::from(2)));
        assert!(!branches(Instruction::IfICmpLt(0), Value::from(2), Value::from(1)));
        assert!(branches(Instruction::IfICmpGt(0), Value::from(2), Value::from(1)));
        assert!(branches(
            Instruction::IfFCmpLt(0),
            Value::from(1.5),
            Value::from(2.5)
        ));
        assert!(!branches(
            Instruction::IfFCmpGt(0),
            Value::from(1.5),
            Value::from(2.5)
        ));
    }

    #[test]
    fn equality_and_orderings() {
        assert!(branches(Instruction::IfICmpEq(0), Value::from(3), Value::from(3)));
        assert!(!branches(Instruction::IfICmpNe(0), Value::from(3), Value::from(3)));
        assert!(branches(Instruction::IfICmpGe(0), Value::from(3), Value::from(3)));
        assert!(branches(Instruction::IfICmpLe(0), Value::from(3), Value::from(3)));
        assert!(!branches(Instruction::IfICmpGt(0), Value::from(3), Value::from(3)));
        assert!(!branches(Instruction::IfICmpLt(0), Value::from(3), Value::from(3)));
    }

    #[test]
    fn nan_never_takes_ordered_branches() {
        for ins in [
            Instruction::IfFCmpEq(0),
            Instruction::IfFCmpGe(0),
            Instruction::IfFCmpGt(0),
            Instruction::IfFCmpLe(0),
            Instruction::IfFCmpLt(0),
        ]
        .iter()
        {
            assert!(!branches(ins.clone(), Value::from(f64::NAN), Value::from(1.0)));
            assert!(!branches(ins.clone(), Value::from(1.0), Value::from(f64::NAN)));
        }
    }

    #[test]
    fn nan_compares_not_equal() {
        assert!(branches(
            Instruction::IfFCmpNe(0),
            Value::from(f64::NAN),
            Value::from(1.0)
        ));
        assert!(branches(
            Instruction::IfFCmpNe(0),
            Value::from(1.0),
            Value::from(f64::NAN)
        ));
        assert!(branches(
            Instruction::IfFCmpNe(0),
            Value::from(f64::NAN),
            Value::from(f64::NAN)
        ));
        assert!(!branches(
            Instruction::IfFCmpNe(0),
            Value::from(1.0),
            Value::from(1.0)
        ));
    }

    #[test]
    fn comparing_wrong_types_faults() {
        let mut frame = Frame::new(vec![]);
        frame.push(Value::from(1));
        frame.push(Value::from(1.0));
        assert!(matches!(
            Instruction::IfICmpEq(0).exec(&mut frame),
            Err(FlowControl::Fault(_))
        ));
    }

    #[test]
    fn null_branches_observe_allocation() {
        let mut frame = Frame::new(vec![]);
        frame.push(Value::none_of(ValueType::IntArray));
        assert!(matches!(
            Instruction::IfNull(4).exec(&mut frame),
            Err(FlowControl::Branch(4))
        ));

        frame.push(Value::from(vec![1i64]));
        assert!(matches!(
            Instruction::IfNonNull(2).exec(&mut frame),
            Err(FlowControl::Branch(2))
        ));

        frame.push(Value::from(vec![1i64]));
        assert!(Instruction::IfNull(0).exec(&mut frame).is_ok());
    }
}
