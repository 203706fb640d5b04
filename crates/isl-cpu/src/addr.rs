use isl_decoder::DecodedInstruction;
use isl_mem::MemoryImage;

use crate::alu::{sign_extend, OperandSize};
use crate::state::{CpuState, Segment};

/// Effective address of the ModRM memory operand.
///
/// Only base + displacement addressing is modelled: the base is the register
/// named by `rm` (none for the `mod=00 rm=101` disp32 form), and the segment
/// contributes `selector << 16`. SS is used for `rm` 4 and 5, DS otherwise.
pub fn effective_address(inst: &DecodedInstruction, state: &CpuState) -> u32 {
    let m = inst.modrm_fields();
    let disp_only = m.mode == 0b00 && m.rm == 0b101;

    let base = if disp_only {
        0
    } else {
        state.read_reg(m.rm, OperandSize::Dword)
    };
    let disp = match m.mode {
        0b01 => sign_extend(inst.displacement, 8) as u32,
        0b10 => inst.displacement,
        _ if disp_only => inst.displacement,
        _ => 0,
    };
    let seg = if matches!(m.rm, 4 | 5) {
        state.segment(Segment::Ss)
    } else {
        state.segment(Segment::Ds)
    };

    base.wrapping_add(disp).wrapping_add(u32::from(seg) << 16)
}

/// Where an operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Reg(u8),
    Mem(u32),
}

impl Location {
    /// The operand named by ModRM `rm`.
    pub fn rm(inst: &DecodedInstruction, state: &CpuState) -> Self {
        let m = inst.modrm_fields();
        if m.is_register() {
            Location::Reg(m.rm)
        } else {
            Location::Mem(effective_address(inst, state))
        }
    }

    pub fn read(self, state: &CpuState, mem: &MemoryImage, size: OperandSize) -> u32 {
        match self {
            Location::Reg(index) => state.read_reg(index, size),
            Location::Mem(addr) => mem.read(addr, size.bytes()) as u32,
        }
    }

    pub fn write(self, state: &mut CpuState, mem: &mut MemoryImage, size: OperandSize, val: u32) {
        match self {
            Location::Reg(index) => state.write_reg(index, size, val),
            Location::Mem(addr) => write_mem(state, mem, addr, size.bytes(), u64::from(val)),
        }
    }
}

/// Store `size` bytes of `val` at `addr` and record every touched address.
pub fn write_mem(state: &mut CpuState, mem: &mut MemoryImage, addr: u32, size: usize, val: u64) {
    mem.write(addr, size, val);
    for i in 0..size {
        state.note_write(addr.wrapping_add(i as u32));
    }
}
