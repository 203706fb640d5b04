//! CPU state and execution engine for the ISL simulator.
//!
//! The executor runs a small IA-32 subset (ADD, MOV, XCHG, CMPXCHG, far JMP,
//! JNE, HLT) against [`CpuState`] and an [`isl_mem::MemoryImage`]. Other
//! decodable instructions are reported as [`StepOutcome::Unimplemented`] and
//! skipped.

#![forbid(unsafe_code)]

mod addr;
mod alu;
mod exec;
mod sim;
mod state;
pub mod trace;

pub use addr::{effective_address, write_mem, Location};
pub use alu::{operand_size, sign_extend, update_flags, AluOp, OperandSize};
pub use exec::{execute_one, StepOutcome};
pub use sim::{RunConfig, RunExit, SimError, Simulator};
pub use state::{CpuState, Flags, Gpr, Segment};
