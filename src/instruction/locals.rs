use crate::error::RuntimeError;
use crate::instruction::OperandType;
use crate::vm::frame::{FlowControl, Frame};

pub(super) fn load(frame: &mut Frame, index: i64, expected: OperandType) -> Result<(), FlowControl> {
    let value = frame.local(index)?.clone();
    if !expected.admits(&value) {
        return Err(RuntimeError::StackValue {
            index: -1,
            expected,
            received: value.vtype(),
        }
        .into());
    }
    frame.push(value);
    Ok(())
}

pub(super) fn store(
    frame: &mut Frame,
    index: i64,
    expected: OperandType,
) -> Result<(), FlowControl> {
    let value = frame.pop_typed(expected)?;
    frame.set_local(index, value)?;
    Ok(())
}

/// Array stores also require the popped reference's element type to match
/// the declared type of the local.
pub(super) fn store_reference(frame: &mut Frame, index: i64) -> Result<(), FlowControl> {
    let value = frame.pop_typed(OperandType::AnyArray)?;
    let declared = frame.local(index)?.vtype();
    if value.vtype() != declared {
        return Err(RuntimeError::ArrayElementType {
            expected: declared,
            received: value.vtype(),
        }
        .into());
    }
    frame.set_local(index, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::instruction::Instruction;
    use crate::vm::frame::{FlowControl, Frame};
    use crate::vm::mem::{Value, ValueType};

    #[test]
    fn load_pushes_a_copy() {
        let mut frame = Frame::new(vec![Value::from(41)]);
        Instruction::ILoad(0).exec(&mut frame).unwrap();
        assert_eq!(frame.stack, vec![Value::from(41)]);
    }

    #[test]
    fn store_replaces_the_slot() {
        let mut frame = Frame::new(vec![Value::Int(None)]);
        frame.push(Value::from(7));
        Instruction::IStore(0).exec(&mut frame).unwrap();
        assert_eq!(frame.locals[0], Value::from(7));
        assert!(frame.stack.is_empty());
    }

    #[test]
    fn load_of_wrong_slot_type_faults() {
        let mut frame = Frame::new(vec![Value::from(1.5)]);
        assert!(matches!(
            Instruction::ILoad(0).exec(&mut frame),
            Err(FlowControl::Fault(_))
        ));
    }

    #[test]
    fn store_reference_checks_element_type() {
        let mut frame = Frame::new(vec![Value::none_of(ValueType::IntArray)]);
        frame.push(Value::from(vec![1.5f64]));
        match Instruction::AStore(0).exec(&mut frame) {
            Err(FlowControl::Fault(e)) => {
                assert_eq!(
                    e.to_string(),
                    "arrays differ in element type, cannot assign floatarray to intarray"
                );
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn store_reference_accepts_matching_array() {
        let mut frame = Frame::new(vec![Value::none_of(ValueType::IntArray)]);
        frame.push(Value::from(vec![3i64]));
        Instruction::AStore(0).exec(&mut frame).unwrap();
        assert_eq!(frame.locals[0], Value::from(vec![3i64]));
    }

    #[test]
    fn out_of_range_local_faults() {
        let mut frame = Frame::new(vec![]);
        assert!(matches!(
            Instruction::ILoad(0).exec(&mut frame),
            Err(FlowControl::Fault(_))
        ));
    }
}
