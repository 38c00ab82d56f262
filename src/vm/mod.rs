//! The machine itself: wraps a verified program and runs it against
//! caller-supplied arguments.

use std::path::Path;

pub mod frame;
pub mod mem;

use crate::analysis::verifier::Verifier;
use crate::error::{RuntimeError, VerifyError, VmError};
use crate::parser;
use crate::program::Program;
use frame::Frame;
use mem::{Value, ValueType};

pub struct VirtualMachine {
    pub program: Program,
}

impl VirtualMachine {
    /// Verify a parsed program and wrap it for execution. Nothing runs
    /// unless verification succeeds.
    pub fn new(program: Program) -> Result<Self, VerifyError> {
        Verifier::new().verify(&program)?;
        Ok(VirtualMachine { program })
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, VmError> {
        let program = parser::parse_file(path)?;
        Ok(VirtualMachine::new(program)?)
    }

    pub fn load_str(data: &str) -> Result<Self, VmError> {
        let program = parser::parse_str(data)?;
        Ok(VirtualMachine::new(program)?)
    }

    /// Execute the program. Arguments must already be domain values of
    /// the declared parameter types.
    pub fn run(&self, args: Vec<Value>) -> Result<Value, RuntimeError> {
        info!("{:<15}{}", "args", args.len());
        info!("{:<15}{}", "local vars", self.program.var_count());
        info!("{:<15}{}", "instructions", self.program.ins_count());
        let locals = self.assign_arguments(args)?;
        let mut frame = Frame::new(locals);
        frame.exec(&self.program.code)
    }

    /// Build the local-variable vector: parameters from the caller,
    /// everything else an empty container of its declared type.
    fn assign_arguments(&self, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        self.check_argument_count(args.len())?;
        let mut locals = Vec::with_capacity(self.program.var_count());
        for (position, (value, declared)) in
            args.into_iter().zip(self.program.arguments()).enumerate()
        {
            if value.vtype() != *declared {
                return Err(RuntimeError::ArgumentType {
                    position,
                    expected: *declared,
                    received: value.vtype(),
                });
            }
            locals.push(value);
        }
        for declared in self.program.local_variables() {
            locals.push(Value::none_of(*declared));
        }
        Ok(locals)
    }

    fn check_argument_count(&self, received: usize) -> Result<(), RuntimeError> {
        if received != self.program.argument_count {
            return Err(RuntimeError::ArityMismatch {
                expected: self.program.argument_count,
                received,
            });
        }
        Ok(())
    }

    /// Convert host strings into domain values, driven by the declared
    /// parameter types. Array arguments are comma-separated element
    /// lists.
    pub fn convert_args(&self, raw: &[String]) -> Result<Vec<Value>, RuntimeError> {
        self.check_argument_count(raw.len())?;
        let mut values = Vec::with_capacity(raw.len());
        for (position, (text, declared)) in raw.iter().zip(self.program.arguments()).enumerate() {
            values.push(convert_arg(position, text, *declared)?);
        }
        Ok(values)
    }
}

fn convert_arg(position: usize, text: &str, declared: ValueType) -> Result<Value, RuntimeError> {
    let cannot_convert = || RuntimeError::ArgumentConvert {
        position,
        value: text.to_string(),
        expected: declared,
    };
    let value = match declared {
        ValueType::Int => Value::from(text.parse::<i64>().map_err(|_| cannot_convert())?),
        ValueType::Float => Value::from(text.parse::<f64>().map_err(|_| cannot_convert())?),
        ValueType::IntArray => {
            let elements = text
                .split(',')
                .map(|part| part.trim().parse::<i64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| cannot_convert())?;
            Value::from(elements)
        }
        ValueType::FloatArray => {
            let elements = text
                .split(',')
                .map(|part| part.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| cannot_convert())?;
            Value::from(elements)
        }
        _ => return Err(cannot_convert()),
    };
    Ok(value)
}
