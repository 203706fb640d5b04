use std::collections::BTreeMap;
use std::io::{self, Write};

use isl_decoder::{decode_all, DecodeError, DecodedInstruction};
use isl_mem::MemoryImage;
use thiserror::Error;

use crate::exec::{execute_one, StepOutcome};
use crate::state::CpuState;
use crate::trace::write_state;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Address the decode pass starts from.
    pub start_address: u32,
    /// Stop after this many executed instructions.
    pub max_steps: Option<u64>,
    /// Pick the next instruction by EIP instead of replaying the decoded
    /// sequence in order.
    pub follow_branches: bool,
}

/// Why [`Simulator::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// Every instruction was executed (or control fell off the decoded image).
    Completed { executed: u64 },
    /// `HLT` was executed.
    Halted { executed: u64 },
    /// `max_steps` was reached.
    StepLimit { executed: u64 },
    /// Following branches led to an address with no decoded instruction.
    NoInstruction { eip: u32, executed: u64 },
}

impl RunExit {
    pub fn executed(&self) -> u64 {
        match *self {
            RunExit::Completed { executed }
            | RunExit::Halted { executed }
            | RunExit::StepLimit { executed }
            | RunExit::NoInstruction { executed, .. } => executed,
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to write state trace: {0}")]
    Trace(#[from] io::Error),
}

/// Decode-then-execute driver.
///
/// The whole image is decoded up front; execution replays the decoded
/// instructions, so code modified at run time keeps its original decoding.
pub struct Simulator {
    state: CpuState,
    memory: MemoryImage,
    program: Vec<DecodedInstruction>,
    by_address: BTreeMap<u32, usize>,
    cursor: usize,
    executed: u64,
    config: RunConfig,
}

impl Simulator {
    pub fn new(memory: MemoryImage, config: RunConfig) -> Result<Self, SimError> {
        let program = decode_all(&memory, config.start_address)?;
        Ok(Self::from_program(memory, program, config))
    }

    /// Build a simulator around an already decoded instruction sequence.
    pub fn from_program(
        memory: MemoryImage,
        program: Vec<DecodedInstruction>,
        config: RunConfig,
    ) -> Self {
        let by_address = program
            .iter()
            .enumerate()
            .map(|(i, inst)| (inst.start_address, i))
            .collect();
        let mut state = CpuState::new();
        state.eip = program
            .first()
            .map_or(config.start_address, |inst| inst.start_address);

        Self {
            state,
            memory,
            program,
            by_address,
            cursor: 0,
            executed: 0,
            config,
        }
    }

    pub fn state(&self) -> &CpuState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    pub fn program(&self) -> &[DecodedInstruction] {
        &self.program
    }

    pub fn executed(&self) -> u64 {
        self.executed
    }

    fn next_index(&self) -> Option<usize> {
        if !self.config.follow_branches {
            return (self.cursor < self.program.len()).then_some(self.cursor);
        }

        let eip = self.state.eip;
        if let Some(&idx) = self.by_address.get(&eip) {
            return Some(idx);
        }
        if self.memory.contains(eip) {
            // Mapped, but not an instruction boundary of the decode pass.
            return None;
        }
        // Same gap rule as the decode pass: resume at the next instruction above.
        self.by_address.range(eip..).next().map(|(_, &idx)| idx)
    }

    /// Execute the next instruction.
    ///
    /// Returns `None` once the CPU has halted or no instruction is left.
    pub fn step(&mut self) -> Option<StepOutcome> {
        if self.state.halted {
            return None;
        }
        let idx = self.next_index()?;
        let inst = self.program[idx];
        if self.config.follow_branches {
            self.state.eip = inst.start_address;
        }

        let outcome = execute_one(&inst, &mut self.state, &mut self.memory);
        self.cursor = idx + 1;
        self.executed += 1;
        Some(outcome)
    }

    fn exit_without_instruction(&self) -> RunExit {
        let executed = self.executed;
        if self.state.halted {
            RunExit::Halted { executed }
        } else if self.config.follow_branches && self.memory.contains(self.state.eip) {
            RunExit::NoInstruction {
                eip: self.state.eip,
                executed,
            }
        } else {
            RunExit::Completed { executed }
        }
    }

    /// Step until HLT, the end of the program, or the step limit.
    ///
    /// When `trace` is given, the state after every executed instruction is
    /// written to it.
    pub fn run(&mut self, mut trace: Option<&mut dyn Write>) -> Result<RunExit, SimError> {
        let exit = loop {
            if let Some(limit) = self.config.max_steps {
                if self.executed >= limit && !self.state.halted {
                    break RunExit::StepLimit {
                        executed: self.executed,
                    };
                }
            }

            let Some(outcome) = self.step() else {
                break self.exit_without_instruction();
            };
            if let Some(out) = trace.as_deref_mut() {
                write_state(out, &self.state, &self.memory)?;
            }
            if outcome == StepOutcome::Halted {
                break RunExit::Halted {
                    executed: self.executed,
                };
            }
        };

        tracing::debug!(?exit, "run finished");
        Ok(exit)
    }
}
