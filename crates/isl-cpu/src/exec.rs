//! Instruction execution.
//!
//! [`execute_one`] dispatches on the [`InstructionFamily`] the decoder
//! assigned. Handlers read and write operands through [`Location`], update
//! flags through [`update_flags`], and leave EIP at `next_address` unless the
//! instruction transfers control or halts.

use isl_decoder::{DecodedInstruction, InstructionFamily};
use isl_mem::MemoryImage;

use crate::addr::{effective_address, Location};
use crate::alu::{operand_size, sign_extend, update_flags, AluOp, OperandSize};
use crate::state::{CpuState, Flags, Segment};

/// Result of executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Executed,
    /// `HLT` ran; the caller should stop stepping.
    Halted,
    /// The instruction decoded but has no handler. It was treated as a no-op.
    Unimplemented { opcode: u8, two_byte: bool },
}

pub fn execute_one(
    inst: &DecodedInstruction,
    state: &mut CpuState,
    mem: &mut MemoryImage,
) -> StepOutcome {
    match inst.family {
        InstructionFamily::Add => add(inst, state, mem),
        InstructionFamily::Mov => mov(inst, state, mem),
        InstructionFamily::Xchg => xchg(inst, state, mem),
        InstructionFamily::Cmpxchg => cmpxchg(inst, state, mem),
        InstructionFamily::FarJmp => far_jmp(inst, state),
        InstructionFamily::Jne => jne(inst, state),
        InstructionFamily::Hlt => {
            tracing::debug!(eip = inst.start_address, "hlt");
            state.halted = true;
            StepOutcome::Halted
        }
        InstructionFamily::Unimplemented => unimplemented(inst, state),
    }
}

fn advance(inst: &DecodedInstruction, state: &mut CpuState) -> StepOutcome {
    state.eip = inst.next_address;
    StepOutcome::Executed
}

fn unimplemented(inst: &DecodedInstruction, state: &mut CpuState) -> StepOutcome {
    tracing::warn!(
        eip = inst.start_address,
        opcode = inst.opcode,
        two_byte = inst.two_byte_opcode,
        "unimplemented instruction treated as no-op"
    );
    state.eip = inst.next_address;
    StepOutcome::Unimplemented {
        opcode: inst.opcode,
        two_byte: inst.two_byte_opcode,
    }
}

fn add(inst: &DecodedInstruction, state: &mut CpuState, mem: &mut MemoryImage) -> StepOutcome {
    let size = operand_size(inst);
    let m = inst.modrm_fields();

    let (dest, src) = match inst.opcode {
        // ADD AL/eAX, imm
        0x04 | 0x05 => (Location::Reg(0), inst.immediate),
        // ADD r/m, imm
        0x80 | 0x81 | 0x83 => {
            let src = if inst.opcode == 0x83 {
                sign_extend(inst.immediate, 8) as u32
            } else {
                inst.immediate
            };
            (Location::rm(inst, state), src)
        }
        // ADD r/m, r
        0x00 | 0x01 => (Location::rm(inst, state), state.read_reg(m.reg, size)),
        // ADD r, r/m
        0x02 | 0x03 => {
            let src = Location::rm(inst, state).read(state, mem, size);
            (Location::Reg(m.reg), src)
        }
        _ => return unimplemented(inst, state),
    };

    let mask = size.mask();
    let a = dest.read(state, mem, size) & mask;
    let b = src & mask;
    let sum = u64::from(a) + u64::from(b);
    update_flags(
        &mut state.flags,
        u64::from(a),
        u64::from(b),
        sum,
        size,
        AluOp::Add,
    );
    dest.write(state, mem, size, sum as u32 & mask);

    advance(inst, state)
}

fn mov(inst: &DecodedInstruction, state: &mut CpuState, mem: &mut MemoryImage) -> StepOutcome {
    let size = operand_size(inst);
    let m = inst.modrm_fields();
    let op = inst.opcode;

    match (inst.two_byte_opcode, op) {
        // MOVQ mm, mm/m64
        (true, 0x6F) => {
            let val = if m.is_register() {
                state.mmx(m.rm)
            } else {
                mem.read_u64(effective_address(inst, state))
            };
            state.set_mmx(m.reg, val);
        }
        (false, 0xB0..=0xB7) => state.write_reg(op & 7, OperandSize::Byte, inst.immediate),
        (false, 0xB8..=0xBF) => state.write_reg(op & 7, size, inst.immediate),
        (false, 0xC6) => {
            Location::rm(inst, state).write(state, mem, OperandSize::Byte, inst.immediate)
        }
        (false, 0xC7) => Location::rm(inst, state).write(state, mem, size, inst.immediate),
        (false, 0x88 | 0x89) => {
            let size = if op == 0x88 { OperandSize::Byte } else { size };
            let val = state.read_reg(m.reg, size);
            Location::rm(inst, state).write(state, mem, size, val);
        }
        (false, 0x8A | 0x8B) => {
            let size = if op == 0x8A { OperandSize::Byte } else { size };
            let val = Location::rm(inst, state).read(state, mem, size);
            state.write_reg(m.reg, size, val);
        }
        // MOV Sreg, r/m16
        (false, 0x8E) => {
            let val = Location::rm(inst, state).read(state, mem, OperandSize::Word) as u16;
            state.set_segment(Segment::ALL[usize::from(m.reg % 6)], val);
        }
        _ => return unimplemented(inst, state),
    }

    advance(inst, state)
}

/// `XCHG r/m8, r8`.
fn xchg(inst: &DecodedInstruction, state: &mut CpuState, mem: &mut MemoryImage) -> StepOutcome {
    let m = inst.modrm_fields();
    let loc = Location::rm(inst, state);

    let reg_val = state.read_reg(m.reg, OperandSize::Byte);
    let rm_val = loc.read(state, mem, OperandSize::Byte);
    loc.write(state, mem, OperandSize::Byte, reg_val);
    state.write_reg(m.reg, OperandSize::Byte, rm_val);

    advance(inst, state)
}

/// `CMPXCHG r/m, r`: compare the accumulator with the destination.
fn cmpxchg(inst: &DecodedInstruction, state: &mut CpuState, mem: &mut MemoryImage) -> StepOutcome {
    let size = operand_size(inst);
    let m = inst.modrm_fields();
    let dest = Location::rm(inst, state);

    let acc = state.read_reg(0, size);
    let dest_val = dest.read(state, mem, size);
    let src = state.read_reg(m.reg, size);

    update_flags(
        &mut state.flags,
        u64::from(acc),
        u64::from(dest_val),
        u64::from(acc).wrapping_sub(u64::from(dest_val)),
        size,
        AluOp::Cmp,
    );

    if acc == dest_val {
        dest.write(state, mem, size, src);
    } else {
        state.write_reg(0, size, dest_val);
    }

    advance(inst, state)
}

/// `JMP ptr16:32`.
///
/// The offset comes from the immediate field and the selector from the
/// displacement field.
fn far_jmp(inst: &DecodedInstruction, state: &mut CpuState) -> StepOutcome {
    state.eip = inst.immediate;
    state.set_segment(Segment::Cs, (inst.displacement & 0xFFFF) as u16);
    StepOutcome::Executed
}

/// `JNE rel8`.
fn jne(inst: &DecodedInstruction, state: &mut CpuState) -> StepOutcome {
    state.eip = if state.flag(Flags::ZF) == 0 {
        inst.next_address.wrapping_add(sign_extend(inst.immediate, 8) as u32)
    } else {
        inst.next_address
    };
    StepOutcome::Executed
}
