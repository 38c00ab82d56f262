//! Static analysis: control-flow partitioning and the dataflow verifier
//! that proves a program type-safe before it is ever executed.

pub mod controlflow;
pub mod frame;
pub mod interpreter;
pub mod values;
pub mod verifier;
