//! Abstract semantics used by the verifier.
//!
//! Operations mirror the arity groups of the instruction set: new, copy,
//! unary, binary, ternary, return and merge. Every operation checks the
//! incoming abstract values against the opcode's contract and produces
//! the abstract result that lands on the stack.

use crate::analysis::values::{
    BasicValue, ARRAY_REF, FLOAT_ARRAY_REF, FLOAT_VALUE, INT_ARRAY_REF, INT_VALUE,
    UNINITIALIZED_VALUE,
};
use crate::error::VerifyError;
use crate::instruction::{ArrayKind, Instruction};
use crate::vm::mem::ValueType;

fn expected(expected: impl ToString, received: impl ToString) -> VerifyError {
    VerifyError::Expected {
        expected: expected.to_string(),
        received: received.to_string(),
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct BasicVerifier;

impl BasicVerifier {
    pub fn new_value(&self, vtype: Option<ValueType>) -> BasicValue {
        BasicValue::from_type(vtype)
    }

    pub fn new_operation(&self, ins: &Instruction) -> Result<BasicValue, VerifyError> {
        match ins {
            Instruction::IPush(_) => Ok(INT_VALUE),
            Instruction::FPush(_) => Ok(FLOAT_VALUE),
            _ => Err(VerifyError::OpcodeNotAllowed(ins.to_string(), "new")),
        }
    }

    pub fn copy_operation(
        &self,
        ins: &Instruction,
        value: BasicValue,
    ) -> Result<BasicValue, VerifyError> {
        let required = match ins {
            Instruction::ILoad(_) | Instruction::IStore(_) => INT_VALUE,
            Instruction::FLoad(_) | Instruction::FStore(_) => FLOAT_VALUE,
            Instruction::ALoad(_) | Instruction::AStore(_) => {
                if !value.is_array_reference() {
                    return Err(expected(ValueType::Array, value));
                }
                return Ok(value);
            }
            Instruction::Dup | Instruction::Swap => return Ok(value),
            _ => return Err(VerifyError::OpcodeNotAllowed(ins.to_string(), "copy")),
        };
        if required != value {
            return Err(expected(required, value));
        }
        Ok(value)
    }

    pub fn unary_operation(
        &self,
        ins: &Instruction,
        value: BasicValue,
    ) -> Result<Option<BasicValue>, VerifyError> {
        match ins {
            Instruction::IReturn => {
                self.require(INT_VALUE, value)?;
                Ok(Some(INT_VALUE))
            }
            Instruction::I2F => {
                self.require(INT_VALUE, value)?;
                Ok(Some(FLOAT_VALUE))
            }
            Instruction::NewArray(kind) => {
                self.require(INT_VALUE, value)?;
                Ok(Some(match kind {
                    ArrayKind::Int => INT_ARRAY_REF,
                    ArrayKind::Float => FLOAT_ARRAY_REF,
                }))
            }
            Instruction::FReturn => {
                self.require(FLOAT_VALUE, value)?;
                Ok(Some(FLOAT_VALUE))
            }
            Instruction::F2I => {
                self.require(FLOAT_VALUE, value)?;
                Ok(Some(INT_VALUE))
            }
            Instruction::AReturn => {
                self.require_array(value)?;
                Ok(Some(ARRAY_REF))
            }
            Instruction::ArrayLength => {
                self.require_array(value)?;
                Ok(Some(INT_VALUE))
            }
            Instruction::IfNull(_) | Instruction::IfNonNull(_) => {
                self.require_array(value)?;
                Ok(None)
            }
            _ => Err(VerifyError::OpcodeNotAllowed(ins.to_string(), "unary")),
        }
    }

    pub fn binary_operation(
        &self,
        ins: &Instruction,
        value1: BasicValue,
        value2: BasicValue,
    ) -> Result<Option<BasicValue>, VerifyError> {
        match ins {
            Instruction::IAdd | Instruction::ISub | Instruction::IMul | Instruction::IDiv => {
                self.require(INT_VALUE, value1)?;
                self.require(INT_VALUE, value2)?;
                Ok(Some(INT_VALUE))
            }
            Instruction::IfICmpEq(_)
            | Instruction::IfICmpNe(_)
            | Instruction::IfICmpGe(_)
            | Instruction::IfICmpGt(_)
            | Instruction::IfICmpLe(_)
            | Instruction::IfICmpLt(_) => {
                self.require(INT_VALUE, value1)?;
                self.require(INT_VALUE, value2)?;
                Ok(None)
            }
            Instruction::FAdd | Instruction::FSub | Instruction::FMul | Instruction::FDiv => {
                self.require(FLOAT_VALUE, value1)?;
                self.require(FLOAT_VALUE, value2)?;
                Ok(Some(FLOAT_VALUE))
            }
            Instruction::IfFCmpEq(_)
            | Instruction::IfFCmpNe(_)
            | Instruction::IfFCmpGe(_)
            | Instruction::IfFCmpGt(_)
            | Instruction::IfFCmpLe(_)
            | Instruction::IfFCmpLt(_) => {
                self.require(FLOAT_VALUE, value1)?;
                self.require(FLOAT_VALUE, value2)?;
                Ok(None)
            }
            Instruction::IALoad => {
                self.require(INT_ARRAY_REF, value1)?;
                self.require(INT_VALUE, value2)?;
                Ok(Some(INT_VALUE))
            }
            Instruction::FALoad => {
                self.require(FLOAT_ARRAY_REF, value1)?;
                self.require(INT_VALUE, value2)?;
                Ok(Some(FLOAT_VALUE))
            }
            _ => Err(VerifyError::OpcodeNotAllowed(ins.to_string(), "binary")),
        }
    }

    pub fn ternary_operation(
        &self,
        ins: &Instruction,
        value1: BasicValue,
        value2: BasicValue,
        value3: BasicValue,
    ) -> Result<(), VerifyError> {
        let (array, element) = match ins {
            Instruction::IAStore => (INT_ARRAY_REF, INT_VALUE),
            Instruction::FAStore => (FLOAT_ARRAY_REF, FLOAT_VALUE),
            _ => return Err(VerifyError::OpcodeNotAllowed(ins.to_string(), "ternary")),
        };
        self.require(array, value1)?;
        self.require(INT_VALUE, value2)?;
        self.require(element, value3)?;
        Ok(())
    }

    /// Returns and stores: the value must equal the expected type, or be
    /// an array subtype of it.
    pub fn return_operation(
        &self,
        value: BasicValue,
        required: BasicValue,
    ) -> Result<(), VerifyError> {
        if value.is_array_reference() {
            if !value.is_subtype_of(&required) {
                return Err(VerifyError::NotSubtype {
                    expected: required.to_string(),
                    received: value.to_string(),
                });
            }
        } else if value != required {
            return Err(expected(required, value));
        }
        Ok(())
    }

    /// Merge of unequal abstract values loses the type information.
    pub fn merge(&self, value1: BasicValue, value2: BasicValue) -> BasicValue {
        if value1 != value2 {
            return UNINITIALIZED_VALUE;
        }
        value1
    }

    fn require(&self, required: BasicValue, value: BasicValue) -> Result<(), VerifyError> {
        if required != value {
            return Err(expected(required, value));
        }
        Ok(())
    }

    fn require_array(&self, value: BasicValue) -> Result<(), VerifyError> {
        if !value.is_array_reference() {
            return Err(expected(ValueType::Array, value));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_equal_and_forgets_unequal() {
        let verifier = BasicVerifier;
        assert_eq!(verifier.merge(INT_VALUE, INT_VALUE), INT_VALUE);
        assert_eq!(verifier.merge(INT_VALUE, FLOAT_VALUE), UNINITIALIZED_VALUE);
        assert_eq!(
            verifier.merge(INT_ARRAY_REF, FLOAT_ARRAY_REF),
            UNINITIALIZED_VALUE
        );
        assert_eq!(
            verifier.merge(UNINITIALIZED_VALUE, INT_VALUE),
            UNINITIALIZED_VALUE
        );
    }

    #[test]
    fn copy_checks_scalar_loads() {
        let verifier = BasicVerifier;
        assert!(verifier
            .copy_operation(&Instruction::ILoad(0), INT_VALUE)
            .is_ok());
        assert!(verifier
            .copy_operation(&Instruction::ILoad(0), FLOAT_VALUE)
            .is_err());
        assert!(verifier
            .copy_operation(&Instruction::IStore(0), UNINITIALIZED_VALUE)
            .is_err());
    }

    #[test]
    fn copy_accepts_any_array_for_reference_ops() {
        let verifier = BasicVerifier;
        assert!(verifier
            .copy_operation(&Instruction::ALoad(0), INT_ARRAY_REF)
            .is_ok());
        assert!(verifier
            .copy_operation(&Instruction::AStore(0), FLOAT_ARRAY_REF)
            .is_ok());
        assert!(verifier
            .copy_operation(&Instruction::ALoad(0), INT_VALUE)
            .is_err());
    }

    #[test]
    fn return_accepts_array_subtypes() {
        let verifier = BasicVerifier;
        assert!(verifier.return_operation(INT_VALUE, INT_VALUE).is_ok());
        assert!(verifier.return_operation(FLOAT_VALUE, INT_VALUE).is_err());
        assert!(verifier.return_operation(INT_ARRAY_REF, ARRAY_REF).is_ok());
        assert!(verifier
            .return_operation(INT_ARRAY_REF, INT_ARRAY_REF)
            .is_ok());
    }

    #[test]
    fn array_loads_check_element_types() {
        let verifier = BasicVerifier;
        assert!(verifier
            .binary_operation(&Instruction::IALoad, INT_ARRAY_REF, INT_VALUE)
            .is_ok());
        assert!(verifier
            .binary_operation(&Instruction::IALoad, FLOAT_ARRAY_REF, INT_VALUE)
            .is_err());
        assert!(verifier
            .binary_operation(&Instruction::FALoad, FLOAT_ARRAY_REF, FLOAT_VALUE)
            .is_err());
    }
}
