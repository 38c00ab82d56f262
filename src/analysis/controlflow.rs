//! Partition of the instruction vector into basic blocks.
//!
//! Two passes: first record every jump source and target, then walk the
//! code left to right, opening a block at every jump target and closing
//! one after every jump source or return. Edges are attached afterwards
//! through the jump-point maps; blocks refer to each other by index.

use hashbrown::HashMap;

use crate::instruction::Instruction;
use crate::program::Program;

/// Contiguous run of instruction indices with a single entry and exit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicBlock {
    pub instruction_indexes: Vec<usize>,
    pub successors: Vec<usize>,
    pub predecessors: Vec<usize>,
}

impl BasicBlock {
    pub fn is_empty(&self) -> bool {
        self.instruction_indexes.is_empty()
    }

    /// First instruction index; the block must be non-empty.
    pub fn start_inst_index(&self) -> usize {
        self.instruction_indexes[0]
    }

    /// Last instruction index; the block must be non-empty.
    pub fn end_inst_index(&self) -> usize {
        self.instruction_indexes[self.instruction_indexes.len() - 1]
    }
}

/// Expects jump targets to be bounds-checked already; the verifier orders
/// its passes so that holds.
pub struct ControlFlowAnalyzer {
    pub basic_blocks: Vec<BasicBlock>,
    // target index -> indices of instructions jumping there
    jump_target: HashMap<usize, Vec<usize>>,
    // jump instruction index -> its possible targets
    jump_source: HashMap<usize, Vec<usize>>,
}

impl ControlFlowAnalyzer {
    pub fn new() -> Self {
        ControlFlowAnalyzer {
            basic_blocks: Vec::new(),
            jump_target: HashMap::new(),
            jump_source: HashMap::new(),
        }
    }

    pub fn analyze(&mut self, program: &Program) -> &[BasicBlock] {
        self.find_jump_points(&program.code);
        self.scan_basic_blocks(&program.code);
        self.connect_basic_blocks(&program.code);
        &self.basic_blocks
    }

    fn find_jump_points(&mut self, code: &[Instruction]) {
        for (i, ins) in code.iter().enumerate() {
            if let Some(target) = ins.jump_target() {
                let target = target as usize;
                self.jump_target.entry(target).or_default().push(i);
                self.jump_source.entry(i).or_default().push(target);
            }
            if ins.is_branch() {
                // fall-through of a conditional jump
                self.jump_target.entry(i + 1).or_default().push(i);
                self.jump_source.entry(i).or_default().push(i + 1);
            }
        }
    }

    fn scan_basic_blocks(&mut self, code: &[Instruction]) {
        let mut block = BasicBlock::default();
        for (i, ins) in code.iter().enumerate() {
            if self.jump_target.contains_key(&i) {
                let previous = std::mem::take(&mut block);
                if !previous.is_empty() {
                    // straight-line entry into this join point; jumps and
                    // returns get their edges from the jump-point maps
                    let end = &code[previous.end_inst_index()];
                    let falls_through = !end.is_return() && !end.is_jump();
                    let previous_index = self.basic_blocks.len();
                    self.basic_blocks.push(previous);
                    if falls_through {
                        self.basic_blocks[previous_index]
                            .successors
                            .push(previous_index + 1);
                        block.predecessors.push(previous_index);
                    }
                }
                block.instruction_indexes.push(i);
            } else if self.jump_source.contains_key(&i) || ins.is_return() {
                block.instruction_indexes.push(i);
                self.basic_blocks.push(std::mem::take(&mut block));
            } else {
                block.instruction_indexes.push(i);
            }
        }
        if !block.is_empty() {
            self.basic_blocks.push(block);
        }
    }

    fn connect_basic_blocks(&mut self, code: &[Instruction]) {
        let count = self.basic_blocks.len();
        for b in 0..count {
            let start = self.basic_blocks[b].start_inst_index();
            let end = self.basic_blocks[b].end_inst_index();

            let mut successors = Vec::new();
            if !code[end].is_return() {
                if let Some(targets) = self.jump_source.get(&end) {
                    for &target in targets {
                        for other in 0..count {
                            if self.basic_blocks[other].start_inst_index() == target {
                                successors.push(other);
                            }
                        }
                    }
                }
            }
            let mut predecessors = Vec::new();
            if let Some(sources) = self.jump_target.get(&start) {
                for &source in sources {
                    for other in 0..count {
                        if self.basic_blocks[other].end_inst_index() == source {
                            predecessors.push(other);
                        }
                    }
                }
            }
            self.basic_blocks[b].successors.extend(successors);
            self.basic_blocks[b].predecessors.extend(predecessors);
        }
    }
}

impl Default for ControlFlowAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
