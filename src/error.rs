//! Error taxonomy of the virtual machine.
//!
//! Four families, matching the phase that produces them: parsing the
//! document, assembling instructions, static verification, and execution.
//! Errors are reported to the caller, never recovered internally.

use thiserror::Error;

use crate::instruction::OperandType;
use crate::vm::mem::ValueType;

/// Front-end errors: the document shape is wrong or a label rule is broken.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("\"func\" section is not defined")]
    MissingFunc,
    #[error("unknown value type {0:?}")]
    UnknownType(String),
    #[error("unknown instruction keyword {0:?}")]
    UnknownKeyword(String),
    #[error("every variable needs a label")]
    MissingVariableLabel,
    #[error("labels have to be unique: duplicate {0:?}")]
    DuplicateLabel(String),
    #[error("label cannot follow label: {0:?}, {1:?}")]
    LabelAfterLabel(String, String),
    #[error("label {0:?} cannot be the last element")]
    LabelAtEnd(String),
    #[error("label {0:?} is not defined")]
    UndefinedLabel(String),
    #[error("unknown instruction format {0}")]
    MalformedEntry(String),
    #[error("malformed document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Instruction(#[from] InstructionError),
}

/// Errors raised while assembling a single instruction from a keyword and
/// an immediate operand.
#[derive(Debug, Error, PartialEq)]
pub enum InstructionError {
    #[error("unknown instruction keyword {0:?}")]
    UnknownKeyword(String),
    #[error("instruction {0} requires an argument")]
    MissingArgument(String),
    #[error("instruction {0} takes no argument")]
    UnexpectedArgument(String),
    #[error("instruction {0} requires an integer argument")]
    ExpectedInteger(String),
    #[error("newarray can accept only element kind 0 or 1, received {0}")]
    IllegalArrayKind(i64),
}

/// Static verification failures. The verifier stops at the first one.
#[derive(Debug, Error, PartialEq)]
pub enum VerifyError {
    #[error("instruction {ins} jump target {target} outside boundary <0, {max}>")]
    JumpOutOfBounds { ins: String, target: i64, max: usize },
    #[error("expected {expected} received {received}")]
    Expected { expected: String, received: String },
    #[error("{received} is not a subtype of {expected}")]
    NotSubtype { expected: String, received: String },
    #[error("leaf basic block does not end with a return instruction, but with {0}")]
    LeafWithoutReturn(String),
    #[error("incompatible stack heights {0} {1}")]
    StackHeightMismatch(usize, usize),
    #[error("local variable index {index} outside boundary <0, {max}>")]
    LocalOutOfBounds { index: i64, max: usize },
    #[error("operand stack underflow during verification")]
    StackUnderflow,
    #[error("execution can fall off the end of the code")]
    FallsOffEnd,
    #[error("code has no instructions")]
    EmptyCode,
    #[error("opcode {0} not allowed in {1} operation")]
    OpcodeNotAllowed(String, &'static str),
}

/// Failures during a `run` call.
#[derive(Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("stack is empty, cannot pop value")]
    StackUnderflow,
    #[error("stack value at {index} expected {expected} got {received}")]
    StackValue {
        index: i64,
        expected: OperandType,
        received: ValueType,
    },
    #[error("instruction pointer {0} outside code boundary")]
    PcOutOfRange(usize),
    #[error("number of function arguments ({expected}) does not match number of passed arguments ({received})")]
    ArityMismatch { expected: usize, received: usize },
    #[error("argument at position {position} expected {expected} got {received}")]
    ArgumentType {
        position: usize,
        expected: ValueType,
        received: ValueType,
    },
    #[error("cannot convert argument at position {position} value {value:?} to {expected}")]
    ArgumentConvert {
        position: usize,
        value: String,
        expected: ValueType,
    },
    #[error("array must have size of at least 1, got {0}")]
    ArraySize(i64),
    #[error("array index {index} outside length {length}")]
    ArrayIndex { index: i64, length: usize },
    #[error("array reference is not allocated")]
    UnallocatedArray,
    #[error("arrays differ in element type, cannot assign {received} to {expected}")]
    ArrayElementType {
        expected: ValueType,
        received: ValueType,
    },
    #[error("local variable index {index} outside boundary <0, {max}>")]
    LocalOutOfBounds { index: i64, max: usize },
    #[error("cannot operate on an empty {0} value")]
    EmptyValue(ValueType),
    #[error("division by zero")]
    DivisionByZero,
}

/// Umbrella for callers that cross phases, e.g. loading a file and running
/// it in one go.
#[derive(Debug, Error)]
pub enum VmError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Instruction(#[from] InstructionError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
