//! Bare-bones implementation of the LS8, an 8-bit machine with 256 bytes of
//! memory, eight registers and a handful of instructions.
//!
//! Programs are loaded from `.ls8` images (one binary byte per line) and run
//! until they execute `HLT`.

pub mod alu;
pub mod opcode;
pub mod region;
pub mod vm;
