use crate::vm::frame::{FlowControl, Frame};
use crate::vm::mem::Value;

/// Truncating float to int conversion.
pub(super) fn f2i(frame: &mut Frame) -> Result<(), FlowControl> {
    let value = frame.pop_float()?;
    frame.push(Value::from(value as i64));
    Ok(())
}

pub(super) fn i2f(frame: &mut Frame) -> Result<(), FlowControl> {
    let value = frame.pop_int()?;
    frame.push(Value::from(value as f64));
    Ok(())
}
