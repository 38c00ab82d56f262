//! Static verification: four checks run in order, stopping at the first
//! failure. Jump targets must be in range, store opcodes must agree with
//! the declared local types, every leaf basic block must end in a return,
//! and a worklist dataflow pass proves the operand types and stack
//! heights consistent at every reachable program point.

use crate::analysis::controlflow::ControlFlowAnalyzer;
use crate::analysis::frame::Frame;
use crate::analysis::interpreter::BasicVerifier;
use crate::error::VerifyError;
use crate::program::Program;

pub struct Verifier {
    interpreter: BasicVerifier,
    changed: Vec<bool>,
    frames: Vec<Option<Frame>>,
    queue: Vec<usize>,
}

impl Verifier {
    pub fn new() -> Self {
        Verifier {
            interpreter: BasicVerifier,
            changed: Vec::new(),
            frames: Vec::new(),
            queue: Vec::new(),
        }
    }

    pub fn verify(&mut self, program: &Program) -> Result<(), VerifyError> {
        self.verify_jump_points(program)?;
        self.verify_load_store_vars(program)?;
        self.verify_return(program)?;
        self.verify_values(program)?;
        Ok(())
    }

    /// Every jump target must point at an instruction.
    pub fn verify_jump_points(&self, program: &Program) -> Result<(), VerifyError> {
        for ins in &program.code {
            if let Some(target) = ins.jump_target() {
                if target < 0 || target as usize >= program.code.len() {
                    return Err(VerifyError::JumpOutOfBounds {
                        ins: ins.to_string(),
                        target,
                        max: program.code.len().saturating_sub(1),
                    });
                }
            }
        }
        Ok(())
    }

    /// Store opcodes must agree with the declared type of their slot.
    pub fn verify_load_store_vars(&self, program: &Program) -> Result<(), VerifyError> {
        for ins in &program.code {
            if !ins.is_store() {
                continue;
            }
            let index = match ins.local_index() {
                Some(index) => index,
                None => continue,
            };
            if index < 0 || index as usize >= program.locals.len() {
                return Err(VerifyError::LocalOutOfBounds {
                    index,
                    max: program.locals.len(),
                });
            }
            let declared = self
                .interpreter
                .new_value(Some(program.locals[index as usize]));
            self.interpreter.copy_operation(ins, declared)?;
        }
        Ok(())
    }

    /// Every basic block without successors must end in a return.
    pub fn verify_return(&self, program: &Program) -> Result<(), VerifyError> {
        let mut analyzer = ControlFlowAnalyzer::new();
        for block in analyzer.analyze(program) {
            let end_ins = &program.code[block.end_inst_index()];
            if block.successors.is_empty() && !end_ins.is_return() {
                return Err(VerifyError::LeafWithoutReturn(end_ins.to_string()));
            }
        }
        Ok(())
    }

    /// Worklist fixed-point over abstract frames.
    pub fn verify_values(&mut self, program: &Program) -> Result<(), VerifyError> {
        if program.code.is_empty() {
            return Err(VerifyError::EmptyCode);
        }
        self.changed = vec![false; program.code.len()];
        self.frames = vec![None; program.code.len()];
        self.queue.clear();

        let mut entry = Frame::new(self.interpreter.new_value(Some(program.return_type)));
        for (i, vtype) in program.locals.iter().enumerate() {
            if i < program.argument_count {
                entry.add_local(self.interpreter.new_value(Some(*vtype)));
            } else {
                entry.add_local(self.interpreter.new_value(None));
            }
            entry.add_local_type(self.interpreter.new_value(Some(*vtype)));
        }
        self.merge(0, &entry, program.code.len())?;

        while let Some(pc) = self.queue.pop() {
            self.changed[pc] = false;
            let mut current = match self.frames[pc].clone() {
                Some(frame) => frame,
                None => continue,
            };
            let ins = &program.code[pc];
            current.execute(ins, &self.interpreter)?;

            if !ins.is_return() && !ins.is_goto() {
                self.merge(pc + 1, &current, program.code.len())?;
            }
            if let Some(target) = ins.jump_target() {
                self.merge(target as usize, &current, program.code.len())?;
            }
        }
        Ok(())
    }

    fn merge(&mut self, pc: usize, frame: &Frame, code_len: usize) -> Result<(), VerifyError> {
        if pc >= code_len {
            return Err(VerifyError::FallsOffEnd);
        }
        let changes = match self.frames[pc].take() {
            None => {
                self.frames[pc] = Some(frame.clone());
                true
            }
            Some(mut old) => {
                let changed = old.merge(frame, &self.interpreter)?;
                self.frames[pc] = Some(old);
                changed
            }
        };
        if changes && !self.changed[pc] {
            self.changed[pc] = true;
            self.queue.push(pc);
        }
        Ok(())
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}
