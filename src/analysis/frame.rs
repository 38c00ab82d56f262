//! Abstract frame: the concrete frame's shape over type tags.

use crate::analysis::interpreter::BasicVerifier;
use crate::analysis::values::BasicValue;
use crate::error::VerifyError;
use crate::instruction::Instruction;

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    locals: Vec<BasicValue>,
    /// Declared types of the local slots, fixed for the whole analysis.
    local_types: Vec<BasicValue>,
    stack: Vec<BasicValue>,
    return_value: BasicValue,
}

impl Frame {
    pub fn new(return_value: BasicValue) -> Self {
        Frame {
            locals: Vec::new(),
            local_types: Vec::new(),
            stack: Vec::new(),
            return_value,
        }
    }

    pub fn add_local(&mut self, value: BasicValue) {
        self.locals.push(value);
    }

    pub fn add_local_type(&mut self, vtype: BasicValue) {
        self.local_types.push(vtype);
    }

    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    fn pop(&mut self) -> Result<BasicValue, VerifyError> {
        self.stack.pop().ok_or(VerifyError::StackUnderflow)
    }

    fn push(&mut self, value: BasicValue) {
        self.stack.push(value);
    }

    fn get_local(&self, index: i64) -> Result<BasicValue, VerifyError> {
        if index < 0 || index as usize >= self.locals.len() {
            return Err(VerifyError::LocalOutOfBounds {
                index,
                max: self.locals.len(),
            });
        }
        Ok(self.locals[index as usize])
    }

    fn set_local(&mut self, index: i64, value: BasicValue) -> Result<(), VerifyError> {
        if index < 0 || index as usize >= self.locals.len() {
            return Err(VerifyError::LocalOutOfBounds {
                index,
                max: self.locals.len(),
            });
        }
        self.locals[index as usize] = value;
        Ok(())
    }

    fn local_type(&self, index: i64) -> Result<BasicValue, VerifyError> {
        if index < 0 || index as usize >= self.local_types.len() {
            return Err(VerifyError::LocalOutOfBounds {
                index,
                max: self.local_types.len(),
            });
        }
        Ok(self.local_types[index as usize])
    }

    /// Symbolically execute one instruction.
    pub fn execute(
        &mut self,
        ins: &Instruction,
        interpreter: &BasicVerifier,
    ) -> Result<(), VerifyError> {
        match ins {
            Instruction::IPush(_) | Instruction::FPush(_) => {
                let value = interpreter.new_operation(ins)?;
                self.push(value);
            }
            Instruction::ILoad(index) | Instruction::FLoad(index) | Instruction::ALoad(index) => {
                let value = interpreter.copy_operation(ins, self.get_local(*index)?)?;
                self.push(value);
            }
            Instruction::IStore(index)
            | Instruction::FStore(index)
            | Instruction::AStore(index) => {
                let popped = self.pop()?;
                let value = interpreter.copy_operation(ins, popped)?;
                interpreter.return_operation(value, self.local_type(*index)?)?;
                self.set_local(*index, value)?;
            }
            Instruction::Goto(_) | Instruction::Nop => {}
            Instruction::IReturn | Instruction::FReturn | Instruction::AReturn => {
                let value = self.pop()?;
                interpreter.unary_operation(ins, value)?;
                interpreter.return_operation(value, self.return_value)?;
            }
            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Dup => {
                let value = self.pop()?;
                self.push(value);
                let copy = interpreter.copy_operation(ins, value)?;
                self.push(copy);
            }
            Instruction::Swap => {
                let value2 = self.pop()?;
                let value1 = self.pop()?;
                let value2 = interpreter.copy_operation(ins, value2)?;
                let value1 = interpreter.copy_operation(ins, value1)?;
                self.push(value2);
                self.push(value1);
            }
            Instruction::IAdd
            | Instruction::ISub
            | Instruction::IMul
            | Instruction::IDiv
            | Instruction::FAdd
            | Instruction::FSub
            | Instruction::FMul
            | Instruction::FDiv
            | Instruction::IALoad
            | Instruction::FALoad => {
                let value2 = self.pop()?;
                let value1 = self.pop()?;
                if let Some(result) = interpreter.binary_operation(ins, value1, value2)? {
                    self.push(result);
                }
            }
            Instruction::IfICmpEq(_)
            | Instruction::IfICmpNe(_)
            | Instruction::IfICmpGe(_)
            | Instruction::IfICmpGt(_)
            | Instruction::IfICmpLe(_)
            | Instruction::IfICmpLt(_)
            | Instruction::IfFCmpEq(_)
            | Instruction::IfFCmpNe(_)
            | Instruction::IfFCmpGe(_)
            | Instruction::IfFCmpGt(_)
            | Instruction::IfFCmpLe(_)
            | Instruction::IfFCmpLt(_) => {
                let value2 = self.pop()?;
                let value1 = self.pop()?;
                interpreter.binary_operation(ins, value1, value2)?;
            }
            Instruction::F2I
            | Instruction::I2F
            | Instruction::NewArray(_)
            | Instruction::ArrayLength => {
                let value = self.pop()?;
                if let Some(result) = interpreter.unary_operation(ins, value)? {
                    self.push(result);
                }
            }
            Instruction::IfNull(_) | Instruction::IfNonNull(_) => {
                let value = self.pop()?;
                interpreter.unary_operation(ins, value)?;
            }
            Instruction::IAStore | Instruction::FAStore => {
                let value3 = self.pop()?;
                let value2 = self.pop()?;
                let value1 = self.pop()?;
                interpreter.ternary_operation(ins, value1, value2, value3)?;
            }
        }
        Ok(())
    }

    /// Merge another frame into this one; reports whether anything
    /// changed. Diverging stack heights cannot be merged.
    pub fn merge(
        &mut self,
        other: &Frame,
        interpreter: &BasicVerifier,
    ) -> Result<bool, VerifyError> {
        if self.stack.len() != other.stack.len() {
            return Err(VerifyError::StackHeightMismatch(
                self.stack.len(),
                other.stack.len(),
            ));
        }
        let mut changes = false;
        for i in 0..self.locals.len() {
            let merged = interpreter.merge(self.locals[i], other.locals[i]);
            if merged != self.locals[i] {
                self.locals[i] = merged;
                changes = true;
            }
        }
        for i in 0..self.stack.len() {
            let merged = interpreter.merge(self.stack[i], other.stack[i]);
            if merged != self.stack[i] {
                self.stack[i] = merged;
                changes = true;
            }
        }
        Ok(changes)
    }
}
