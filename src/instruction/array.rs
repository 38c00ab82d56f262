use crate::instruction::ArrayKind;
use crate::vm::frame::{FlowControl, Frame};
use crate::vm::mem::{ArrayRef, Value};

pub(super) fn new_array(frame: &mut Frame, kind: ArrayKind) -> Result<(), FlowControl> {
    let size = frame.pop_int()?;
    debug!("creating {} of size {}", kind.array_type(), size);
    let value = match kind {
        ArrayKind::Int => Value::IntArray(Some(ArrayRef::allocate(size)?)),
        ArrayKind::Float => Value::FloatArray(Some(ArrayRef::allocate(size)?)),
    };
    frame.push(value);
    Ok(())
}

pub(super) fn ia_load(frame: &mut Frame) -> Result<(), FlowControl> {
    let index = frame.pop_int()?;
    let array = frame.pop_int_array()?;
    frame.push(Value::Int(array.get(index)?));
    Ok(())
}

pub(super) fn fa_load(frame: &mut Frame) -> Result<(), FlowControl> {
    let index = frame.pop_int()?;
    let array = frame.pop_float_array()?;
    frame.push(Value::Float(array.get(index)?));
    Ok(())
}

pub(super) fn ia_store(frame: &mut Frame) -> Result<(), FlowControl> {
    let value = frame.pop_int_cell()?;
    let index = frame.pop_int()?;
    let array = frame.pop_int_array()?;
    array.set(index, value)?;
    Ok(())
}

pub(super) fn fa_store(frame: &mut Frame) -> Result<(), FlowControl> {
    let value = frame.pop_float_cell()?;
    let index = frame.pop_int()?;
    let array = frame.pop_float_array()?;
    array.set(index, value)?;
    Ok(())
}

pub(super) fn array_length(frame: &mut Frame) -> Result<(), FlowControl> {
    // a reference that was never allocated reports length 0
    let length = match frame.pop_reference()? {
        Value::IntArray(Some(array)) => array.len(),
        Value::FloatArray(Some(array)) => array.len(),
        _ => 0,
    };
    frame.push(Value::from(length as i64));
    Ok(())
}
