use isl_decoder::DecodedInstruction;

use crate::state::Flags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSize {
    Byte,
    Word,
    Dword,
}

impl OperandSize {
    pub fn bytes(self) -> usize {
        match self {
            OperandSize::Byte => 1,
            OperandSize::Word => 2,
            OperandSize::Dword => 4,
        }
    }

    pub fn mask(self) -> u32 {
        match self {
            OperandSize::Byte => 0xFF,
            OperandSize::Word => 0xFFFF,
            OperandSize::Dword => 0xFFFF_FFFF,
        }
    }

    pub fn sign_bit(self) -> u32 {
        match self {
            OperandSize::Byte => 0x80,
            OperandSize::Word => 0x8000,
            OperandSize::Dword => 0x8000_0000,
        }
    }
}

/// Operand width for `inst`: byte for the byte-oriented opcodes, otherwise
/// 16 bits with the `66` prefix and 32 bits without.
pub fn operand_size(inst: &DecodedInstruction) -> OperandSize {
    if !inst.two_byte_opcode && matches!(inst.opcode, 0x00 | 0x02 | 0x04 | 0x80 | 0x86) {
        OperandSize::Byte
    } else if inst.prefixes.operand_size_override {
        OperandSize::Word
    } else {
        OperandSize::Dword
    }
}

/// Sign-extend the low `bits` bits of `value`.
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    debug_assert!((1..=32).contains(&bits), "bits={bits}");
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Cmp,
}

fn parity(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}

/// Recompute the arithmetic flags for `a op b = result`.
///
/// `result` may be unmasked (e.g. a 33-bit sum); everything is reduced to
/// `size` first. DF is left alone.
pub fn update_flags(flags: &mut Flags, a: u64, b: u64, result: u64, size: OperandSize, op: AluOp) {
    let mask = u64::from(size.mask());
    let sb = u64::from(size.sign_bit());
    let a = a & mask;
    let b = b & mask;
    let res = result & mask;

    flags.set(Flags::ZF, res == 0);
    flags.set(Flags::SF, res & sb != 0);
    flags.set(Flags::PF, parity(res as u8));
    flags.set(Flags::AF, (a ^ b ^ res) & 0x10 != 0);

    match op {
        AluOp::Add => {
            flags.set(Flags::CF, res < a);
            flags.set(Flags::OF, (a ^ res) & (b ^ res) & sb != 0);
        }
        AluOp::Sub | AluOp::Cmp => {
            flags.set(Flags::CF, a < b);
            flags.set(Flags::OF, (a ^ b) & (a ^ res) & sb != 0);
        }
    }
}
