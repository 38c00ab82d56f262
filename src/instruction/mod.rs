//! The instruction set: one enum variant per opcode keyword.
//!
//! Every opcode has an argument shape (none, integer immediate, float
//! immediate, or a label resolving to an integer), a stack effect, and a
//! semantic step over a frame. The step either falls through, branches,
//! returns, or faults; dispatch pattern-matches the variant so the
//! compiler checks the enumeration is exhaustive.

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use hashbrown::HashMap;
use num_traits::FromPrimitive;

use crate::error::InstructionError;
use crate::vm::frame::{FlowControl, Frame};
use crate::vm::mem::{Value, ValueType};

mod array;
mod cmp;
mod convert;
mod locals;
mod math;
mod stack;

/// Argument shape of an opcode keyword.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArgKind {
    None,
    Int,
    Float,
    /// Integer that may be written as a label name in the source.
    Label,
}

/// Element kind tag accepted by `newarray`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum ArrayKind {
    Int = 0,
    Float = 1,
}

impl ArrayKind {
    pub fn tag(self) -> i64 {
        self as i64
    }

    pub fn array_type(self) -> ValueType {
        match self {
            ArrayKind::Int => ValueType::IntArray,
            ArrayKind::Float => ValueType::FloatArray,
        }
    }
}

/// Immediate operand as produced by the front-end, before shape checking.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Operand {
    Int(i64),
    Float(f64),
}

/// Operand type expected or produced on the stack by an opcode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OperandType {
    Any,
    Int,
    Float,
    AnyArray,
    IntArray,
    FloatArray,
}

impl OperandType {
    pub fn admits(self, value: &Value) -> bool {
        match self {
            OperandType::Any => true,
            OperandType::Int => matches!(value, Value::Int(_)),
            OperandType::Float => matches!(value, Value::Float(_)),
            OperandType::AnyArray => value.is_array_reference(),
            OperandType::IntArray => matches!(value, Value::IntArray(_)),
            OperandType::FloatArray => matches!(value, Value::FloatArray(_)),
        }
    }
}

impl Display for OperandType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperandType::Any => "any value",
            OperandType::Int => "int",
            OperandType::Float => "float",
            OperandType::AnyArray => "array reference",
            OperandType::IntArray => "intarray",
            OperandType::FloatArray => "floatarray",
        };
        write!(f, "{}", name)
    }
}

/// Values consumed from and pushed to the stack, listed bottom to top.
#[derive(Debug, Copy, Clone)]
pub struct StackEffect {
    pub inputs: &'static [OperandType],
    pub outputs: &'static [OperandType],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    IPush(i64),
    FPush(f64),
    ILoad(i64),
    FLoad(i64),
    ALoad(i64),
    IStore(i64),
    FStore(i64),
    AStore(i64),
    Goto(i64),
    IReturn,
    FReturn,
    AReturn,
    Nop,
    Pop,
    Dup,
    Swap,
    IfICmpEq(i64),
    IfICmpNe(i64),
    IfICmpGe(i64),
    IfICmpGt(i64),
    IfICmpLe(i64),
    IfICmpLt(i64),
    IfFCmpEq(i64),
    IfFCmpNe(i64),
    IfFCmpGe(i64),
    IfFCmpGt(i64),
    IfFCmpLe(i64),
    IfFCmpLt(i64),
    IfNonNull(i64),
    IfNull(i64),
    IAdd,
    ISub,
    IMul,
    IDiv,
    FAdd,
    FSub,
    FMul,
    FDiv,
    F2I,
    I2F,
    NewArray(ArrayKind),
    IALoad,
    FALoad,
    IAStore,
    FAStore,
    ArrayLength,
}

/// Keyword table of the whole instruction set. Each keyword maps to
/// exactly one opcode.
pub const KEYWORD_TABLE: &[(&str, ArgKind)] = &[
    ("ipush", ArgKind::Int),
    ("fpush", ArgKind::Float),
    ("iload", ArgKind::Label),
    ("fload", ArgKind::Label),
    ("istore", ArgKind::Label),
    ("fstore", ArgKind::Label),
    ("aload", ArgKind::Label),
    ("astore", ArgKind::Label),
    ("goto", ArgKind::Label),
    ("ireturn", ArgKind::None),
    ("freturn", ArgKind::None),
    ("areturn", ArgKind::None),
    ("nop", ArgKind::None),
    ("pop", ArgKind::None),
    ("dup", ArgKind::None),
    ("swap", ArgKind::None),
    ("if_icmpeq", ArgKind::Label),
    ("if_icmpne", ArgKind::Label),
    ("if_icmpge", ArgKind::Label),
    ("if_icmpgt", ArgKind::Label),
    ("if_icmple", ArgKind::Label),
    ("if_icmplt", ArgKind::Label),
    ("if_fcmpeq", ArgKind::Label),
    ("if_fcmpne", ArgKind::Label),
    ("if_fcmpge", ArgKind::Label),
    ("if_fcmpgt", ArgKind::Label),
    ("if_fcmple", ArgKind::Label),
    ("if_fcmplt", ArgKind::Label),
    ("ifnonnull", ArgKind::Label),
    ("ifnull", ArgKind::Label),
    ("iadd", ArgKind::None),
    ("isub", ArgKind::None),
    ("imul", ArgKind::None),
    ("idiv", ArgKind::None),
    ("fadd", ArgKind::None),
    ("fsub", ArgKind::None),
    ("fmul", ArgKind::None),
    ("fdiv", ArgKind::None),
    ("f2i", ArgKind::None),
    ("i2f", ArgKind::None),
    ("newarray", ArgKind::Int),
    ("iaload", ArgKind::None),
    ("faload", ArgKind::None),
    ("iastore", ArgKind::None),
    ("fastore", ArgKind::None),
    ("arraylength", ArgKind::None),
];

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, ArgKind> = {
        let mut map = HashMap::with_capacity(KEYWORD_TABLE.len());
        for &(keyword, kind) in KEYWORD_TABLE {
            map.insert(keyword, kind);
        }
        map
    };
}

/// Argument shape of a keyword, or `None` for an unknown keyword.
pub fn keyword_arg_kind(keyword: &str) -> Option<ArgKind> {
    KEYWORDS.get(keyword).copied()
}

fn int_arg(keyword: &str, operand: Option<Operand>) -> Result<i64, InstructionError> {
    match operand {
        Some(Operand::Int(v)) => Ok(v),
        Some(Operand::Float(_)) => Err(InstructionError::ExpectedInteger(keyword.to_string())),
        None => Err(InstructionError::MissingArgument(keyword.to_string())),
    }
}

fn float_arg(keyword: &str, operand: Option<Operand>) -> Result<f64, InstructionError> {
    match operand {
        Some(Operand::Float(v)) => Ok(v),
        Some(Operand::Int(v)) => Ok(v as f64),
        None => Err(InstructionError::MissingArgument(keyword.to_string())),
    }
}

fn no_arg(keyword: &str, operand: Option<Operand>) -> Result<(), InstructionError> {
    match operand {
        None => Ok(()),
        Some(_) => Err(InstructionError::UnexpectedArgument(keyword.to_string())),
    }
}

impl Instruction {
    /// Assemble an instruction from its keyword and an optional immediate.
    /// Label operands must already be resolved to integers.
    pub fn from_parts(
        keyword: &str,
        operand: Option<Operand>,
    ) -> Result<Instruction, InstructionError> {
        let kw = keyword.to_ascii_lowercase();
        let ins = match kw.as_str() {
            "ipush" => Instruction::IPush(int_arg(&kw, operand)?),
            "fpush" => Instruction::FPush(float_arg(&kw, operand)?),
            "iload" => Instruction::ILoad(int_arg(&kw, operand)?),
            "fload" => Instruction::FLoad(int_arg(&kw, operand)?),
            "aload" => Instruction::ALoad(int_arg(&kw, operand)?),
            "istore" => Instruction::IStore(int_arg(&kw, operand)?),
            "fstore" => Instruction::FStore(int_arg(&kw, operand)?),
            "astore" => Instruction::AStore(int_arg(&kw, operand)?),
            "goto" => Instruction::Goto(int_arg(&kw, operand)?),
            "ireturn" => {
                no_arg(&kw, operand)?;
                Instruction::IReturn
            }
            "freturn" => {
                no_arg(&kw, operand)?;
                Instruction::FReturn
            }
            "areturn" => {
                no_arg(&kw, operand)?;
                Instruction::AReturn
            }
            "nop" => {
                no_arg(&kw, operand)?;
                Instruction::Nop
            }
            "pop" => {
                no_arg(&kw, operand)?;
                Instruction::Pop
            }
            "dup" => {
                no_arg(&kw, operand)?;
                Instruction::Dup
            }
            "swap" => {
                no_arg(&kw, operand)?;
                Instruction::Swap
            }
            "if_icmpeq" => Instruction::IfICmpEq(int_arg(&kw, operand)?),
            "if_icmpne" => Instruction::IfICmpNe(int_arg(&kw, operand)?),
            "if_icmpge" => Instruction::IfICmpGe(int_arg(&kw, operand)?),
            "if_icmpgt" => Instruction::IfICmpGt(int_arg(&kw, operand)?),
            "if_icmple" => Instruction::IfICmpLe(int_arg(&kw, operand)?),
            "if_icmplt" => Instruction::IfICmpLt(int_arg(&kw, operand)?),
            "if_fcmpeq" => Instruction::IfFCmpEq(int_arg(&kw, operand)?),
            "if_fcmpne" => Instruction::IfFCmpNe(int_arg(&kw, operand)?),
            "if_fcmpge" => Instruction::IfFCmpGe(int_arg(&kw, operand)?),
            "if_fcmpgt" => Instruction::IfFCmpGt(int_arg(&kw, operand)?),
            "if_fcmple" => Instruction::IfFCmpLe(int_arg(&kw, operand)?),
            "if_fcmplt" => Instruction::IfFCmpLt(int_arg(&kw, operand)?),
            "ifnonnull" => Instruction::IfNonNull(int_arg(&kw, operand)?),
            "ifnull" => Instruction::IfNull(int_arg(&kw, operand)?),
            "iadd" => {
                no_arg(&kw, operand)?;
                Instruction::IAdd
            }
            "isub" => {
                no_arg(&kw, operand)?;
                Instruction::ISub
            }
            "imul" => {
                no_arg(&kw, operand)?;
                Instruction::IMul
            }
            "idiv" => {
                no_arg(&kw, operand)?;
                Instruction::IDiv
            }
            "fadd" => {
                no_arg(&kw, operand)?;
                Instruction::FAdd
            }
            "fsub" => {
                no_arg(&kw, operand)?;
                Instruction::FSub
            }
            "fmul" => {
                no_arg(&kw, operand)?;
                Instruction::FMul
            }
            "fdiv" => {
                no_arg(&kw, operand)?;
                Instruction::FDiv
            }
            "f2i" => {
                no_arg(&kw, operand)?;
                Instruction::F2I
            }
            "i2f" => {
                no_arg(&kw, operand)?;
                Instruction::I2F
            }
            "newarray" => {
                let tag = int_arg(&kw, operand)?;
                let kind =
                    ArrayKind::from_i64(tag).ok_or(InstructionError::IllegalArrayKind(tag))?;
                Instruction::NewArray(kind)
            }
            "iaload" => {
                no_arg(&kw, operand)?;
                Instruction::IALoad
            }
            "faload" => {
                no_arg(&kw, operand)?;
                Instruction::FALoad
            }
            "iastore" => {
                no_arg(&kw, operand)?;
                Instruction::IAStore
            }
            "fastore" => {
                no_arg(&kw, operand)?;
                Instruction::FAStore
            }
            "arraylength" => {
                no_arg(&kw, operand)?;
                Instruction::ArrayLength
            }
            _ => return Err(InstructionError::UnknownKeyword(keyword.to_string())),
        };
        Ok(ins)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Instruction::IPush(_) => "ipush",
            Instruction::FPush(_) => "fpush",
            Instruction::ILoad(_) => "iload",
            Instruction::FLoad(_) => "fload",
            Instruction::ALoad(_) => "aload",
            Instruction::IStore(_) => "istore",
            Instruction::FStore(_) => "fstore",
            Instruction::AStore(_) => "astore",
            Instruction::Goto(_) => "goto",
            Instruction::IReturn => "ireturn",
            Instruction::FReturn => "freturn",
            Instruction::AReturn => "areturn",
            Instruction::Nop => "nop",
            Instruction::Pop => "pop",
            Instruction::Dup => "dup",
            Instruction::Swap => "swap",
            Instruction::IfICmpEq(_) => "if_icmpeq",
            Instruction::IfICmpNe(_) => "if_icmpne",
            Instruction::IfICmpGe(_) => "if_icmpge",
            Instruction::IfICmpGt(_) => "if_icmpgt",
            Instruction::IfICmpLe(_) => "if_icmple",
            Instruction::IfICmpLt(_) => "if_icmplt",
            Instruction::IfFCmpEq(_) => "if_fcmpeq",
            Instruction::IfFCmpNe(_) => "if_fcmpne",
            Instruction::IfFCmpGe(_) => "if_fcmpge",
            Instruction::IfFCmpGt(_) => "if_fcmpgt",
            Instruction::IfFCmpLe(_) => "if_fcmple",
            Instruction::IfFCmpLt(_) => "if_fcmplt",
            Instruction::IfNonNull(_) => "ifnonnull",
            Instruction::IfNull(_) => "ifnull",
            Instruction::IAdd => "iadd",
            Instruction::ISub => "isub",
            Instruction::IMul => "imul",
            Instruction::IDiv => "idiv",
            Instruction::FAdd => "fadd",
            Instruction::FSub => "fsub",
            Instruction::FMul => "fmul",
            Instruction::FDiv => "fdiv",
            Instruction::F2I => "f2i",
            Instruction::I2F => "i2f",
            Instruction::NewArray(_) => "newarray",
            Instruction::IALoad => "iaload",
            Instruction::FALoad => "faload",
            Instruction::IAStore => "iastore",
            Instruction::FAStore => "fastore",
            Instruction::ArrayLength => "arraylength",
        }
    }

    /// Immediate operand carried by the instruction, if any.
    pub fn immediate(&self) -> Option<Operand> {
        match *self {
            Instruction::IPush(v)
            | Instruction::ILoad(v)
            | Instruction::FLoad(v)
            | Instruction::ALoad(v)
            | Instruction::IStore(v)
            | Instruction::FStore(v)
            | Instruction::AStore(v)
            | Instruction::Goto(v)
            | Instruction::IfICmpEq(v)
            | Instruction::IfICmpNe(v)
            | Instruction::IfICmpGe(v)
            | Instruction::IfICmpGt(v)
            | Instruction::IfICmpLe(v)
            | Instruction::IfICmpLt(v)
            | Instruction::IfFCmpEq(v)
            | Instruction::IfFCmpNe(v)
            | Instruction::IfFCmpGe(v)
            | Instruction::IfFCmpGt(v)
            | Instruction::IfFCmpLe(v)
            | Instruction::IfFCmpLt(v)
            | Instruction::IfNonNull(v)
            | Instruction::IfNull(v) => Some(Operand::Int(v)),
            Instruction::FPush(v) => Some(Operand::Float(v)),
            Instruction::NewArray(kind) => Some(Operand::Int(kind.tag())),
            _ => None,
        }
    }

    /// Conditional jumps: two successors, the target and the fall-through.
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
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
                | Instruction::IfFCmpLt(_)
                | Instruction::IfNonNull(_)
                | Instruction::IfNull(_)
        )
    }

    pub fn is_goto(&self) -> bool {
        matches!(self, Instruction::Goto(_))
    }

    pub fn is_jump(&self) -> bool {
        self.is_goto() || self.is_branch()
    }

    pub fn is_return(&self) -> bool {
        matches!(
            self,
            Instruction::IReturn | Instruction::FReturn | Instruction::AReturn
        )
    }

    pub fn is_store(&self) -> bool {
        matches!(
            self,
            Instruction::IStore(_) | Instruction::FStore(_) | Instruction::AStore(_)
        )
    }

    /// Code index this instruction can transfer control to.
    pub fn jump_target(&self) -> Option<i64> {
        match self.immediate() {
            Some(Operand::Int(target)) if self.is_jump() => Some(target),
            _ => None,
        }
    }

    /// Local variable slot referenced by a load or store.
    pub fn local_index(&self) -> Option<i64> {
        match *self {
            Instruction::ILoad(k)
            | Instruction::FLoad(k)
            | Instruction::ALoad(k)
            | Instruction::IStore(k)
            | Instruction::FStore(k)
            | Instruction::AStore(k) => Some(k),
            _ => None,
        }
    }

    pub fn stack_effect(&self) -> StackEffect {
        use OperandType::*;
        let (inputs, outputs): (&'static [OperandType], &'static [OperandType]) = match self {
            Instruction::IPush(_) => (&[], &[Int]),
            Instruction::FPush(_) => (&[], &[Float]),
            Instruction::ILoad(_) => (&[], &[Int]),
            Instruction::FLoad(_) => (&[], &[Float]),
            Instruction::ALoad(_) => (&[], &[AnyArray]),
            Instruction::IStore(_) => (&[Int], &[]),
            Instruction::FStore(_) => (&[Float], &[]),
            Instruction::AStore(_) => (&[AnyArray], &[]),
            Instruction::Goto(_) => (&[], &[]),
            Instruction::IReturn => (&[Int], &[]),
            Instruction::FReturn => (&[Float], &[]),
            Instruction::AReturn => (&[AnyArray], &[]),
            Instruction::Nop => (&[], &[]),
            Instruction::Pop => (&[Any], &[]),
            Instruction::Dup => (&[Any], &[Any, Any]),
            Instruction::Swap => (&[Any, Any], &[Any, Any]),
            Instruction::IfICmpEq(_)
            | Instruction::IfICmpNe(_)
            | Instruction::IfICmpGe(_)
            | Instruction::IfICmpGt(_)
            | Instruction::IfICmpLe(_)
            | Instruction::IfICmpLt(_) => (&[Int, Int], &[]),
            Instruction::IfFCmpEq(_)
            | Instruction::IfFCmpNe(_)
            | Instruction::IfFCmpGe(_)
            | Instruction::IfFCmpGt(_)
            | Instruction::IfFCmpLe(_)
            | Instruction::IfFCmpLt(_) => (&[Float, Float], &[]),
            Instruction::IfNonNull(_) | Instruction::IfNull(_) => (&[Any], &[]),
            Instruction::IAdd | Instruction::ISub | Instruction::IMul | Instruction::IDiv => {
                (&[Int, Int], &[Int])
            }
            Instruction::FAdd | Instruction::FSub | Instruction::FMul | Instruction::FDiv => {
                (&[Float, Float], &[Float])
            }
            Instruction::F2I => (&[Float], &[Int]),
            Instruction::I2F => (&[Int], &[Float]),
            Instruction::NewArray(_) => (&[Int], &[AnyArray]),
            Instruction::IALoad => (&[IntArray, Int], &[Int]),
            Instruction::FALoad => (&[FloatArray, Int], &[Float]),
            Instruction::IAStore => (&[IntArray, Int, Int], &[]),
            Instruction::FAStore => (&[FloatArray, Int, Float], &[]),
            Instruction::ArrayLength => (&[AnyArray], &[Int]),
        };
        StackEffect { inputs, outputs }
    }

    /// Semantic step. `Ok(())` falls through to the next instruction;
    /// branches and returns transfer control through the error channel,
    /// the way the interpreter loop consumes them.
    pub fn exec(&self, frame: &mut Frame) -> Result<(), FlowControl> {
        match *self {
            Instruction::IPush(value) => {
                frame.push(Value::Int(Some(value)));
                Ok(())
            }
            Instruction::FPush(value) => {
                frame.push(Value::Float(Some(value)));
                Ok(())
            }
            Instruction::ILoad(index) => locals::load(frame, index, OperandType::Int),
            Instruction::FLoad(index) => locals::load(frame, index, OperandType::Float),
            Instruction::ALoad(index) => locals::load(frame, index, OperandType::AnyArray),
            Instruction::IStore(index) => locals::store(frame, index, OperandType::Int),
            Instruction::FStore(index) => locals::store(frame, index, OperandType::Float),
            Instruction::AStore(index) => locals::store_reference(frame, index),
            Instruction::Goto(target) => Err(FlowControl::Branch(target as usize)),
            Instruction::IReturn => {
                let value = frame.pop_typed(OperandType::Int)?;
                Err(FlowControl::Return(value))
            }
            Instruction::FReturn => {
                let value = frame.pop_typed(OperandType::Float)?;
                Err(FlowControl::Return(value))
            }
            Instruction::AReturn => {
                let value = frame.pop_typed(OperandType::AnyArray)?;
                Err(FlowControl::Return(value))
            }
            Instruction::Nop => Ok(()),
            Instruction::Pop => stack::pop(frame),
            Instruction::Dup => stack::dup(frame),
            Instruction::Swap => stack::swap(frame),
            Instruction::IfICmpEq(t) => cmp::int_compare(frame, t, |o| o == Ordering::Equal),
            Instruction::IfICmpNe(t) => cmp::int_compare(frame, t, |o| o != Ordering::Equal),
            Instruction::IfICmpGe(t) => cmp::int_compare(frame, t, |o| o != Ordering::Less),
            Instruction::IfICmpGt(t) => cmp::int_compare(frame, t, |o| o == Ordering::Greater),
            Instruction::IfICmpLe(t) => cmp::int_compare(frame, t, |o| o != Ordering::Greater),
            Instruction::IfICmpLt(t) => cmp::int_compare(frame, t, |o| o == Ordering::Less),
            Instruction::IfFCmpEq(t) => cmp::float_compare(frame, t, |o| o == Ordering::Equal),
            Instruction::IfFCmpNe(t) => cmp::float_compare_ne(frame, t),
            Instruction::IfFCmpGe(t) => cmp::float_compare(frame, t, |o| o != Ordering::Less),
            Instruction::IfFCmpGt(t) => cmp::float_compare(frame, t, |o| o == Ordering::Greater),
            Instruction::IfFCmpLe(t) => cmp::float_compare(frame, t, |o| o != Ordering::Greater),
            Instruction::IfFCmpLt(t) => cmp::float_compare(frame, t, |o| o == Ordering::Less),
            Instruction::IfNonNull(t) => cmp::if_non_null(frame, t),
            Instruction::IfNull(t) => cmp::if_null(frame, t),
            Instruction::IAdd => math::iadd(frame),
            Instruction::ISub => math::isub(frame),
            Instruction::IMul => math::imul(frame),
            Instruction::IDiv => math::idiv(frame),
            Instruction::FAdd => math::fadd(frame),
            Instruction::FSub => math::fsub(frame),
            Instruction::FMul => math::fmul(frame),
            Instruction::FDiv => math::fdiv(frame),
            Instruction::F2I => convert::f2i(frame),
            Instruction::I2F => convert::i2f(frame),
            Instruction::NewArray(kind) => array::new_array(frame, kind),
            Instruction::IALoad => array::ia_load(frame),
            Instruction::FALoad => array::fa_load(frame),
            Instruction::IAStore => array::ia_store(frame),
            Instruction::FAStore => array::fa_store(frame),
            Instruction::ArrayLength => array::array_length(frame),
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.immediate() {
            Some(Operand::Int(v)) => write!(f, "{} <{}>", self.keyword(), v),
            Some(Operand::Float(v)) => write!(f, "{} <{}>", self.keyword(), v),
            None => write!(f, "{}", self.keyword()),
        }
    }
}
