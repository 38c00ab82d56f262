use crate::vm::frame::{FlowControl, Frame};

pub(super) fn pop(frame: &mut Frame) -> Result<(), FlowControl> {
    frame.pop()?;
    Ok(())
}

/// Scalars are duplicated by value; array references by handle, so both
/// copies keep pointing at the same storage.
pub(super) fn dup(frame: &mut Frame) -> Result<(), FlowControl> {
    let value = frame.pop()?;
    frame.push(value.clone());
    frame.push(value);
    Ok(())
}

pub(super) fn swap(frame: &mut Frame) -> Result<(), FlowControl> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push(a);
    frame.push(b);
    Ok(())
}
