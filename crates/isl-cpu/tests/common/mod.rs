// Shared test helpers (integration tests compile as separate crates, so put
// common code in a submodule to avoid it becoming its own test target).
#![allow(dead_code)]

use isl_cpu::{execute_one, CpuState, StepOutcome};
use isl_decoder::{decode_bytes, DecodedInstruction};
use isl_mem::MemoryImage;

pub fn decode_at(bytes: &[u8], address: u32) -> DecodedInstruction {
    decode_bytes(bytes, address).expect("test encoding must decode")
}

/// Decode `bytes` at `address` and execute the result.
pub fn exec_at(
    bytes: &[u8],
    address: u32,
    cpu: &mut CpuState,
    mem: &mut MemoryImage,
) -> StepOutcome {
    let inst = decode_at(bytes, address);
    cpu.eip = address;
    execute_one(&inst, cpu, mem)
}

pub fn exec(bytes: &[u8], cpu: &mut CpuState, mem: &mut MemoryImage) -> StepOutcome {
    exec_at(bytes, 0x1000, cpu, mem)
}
