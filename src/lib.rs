// Ensure each result error is either unwrapped or returned
#![deny(unused_must_use)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate num_derive;

pub mod analysis;
pub mod error;
pub mod instruction;
pub mod parser;
pub mod program;
pub mod vm;
