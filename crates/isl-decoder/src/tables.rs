//! Static per-opcode layout tables.
//!
//! Each opcode map (one-byte and `0F`-escaped) has a 256-entry table built at
//! compile time. An entry says whether the opcode takes a ModRM byte, how wide
//! its immediate is, and which instruction family executes it.

use crate::inst::{
    DisplacementSize, ImmediateKind, ImmediateSize, InstructionFamily, ModRm, Sib,
};

/// Prefix bytes, in the groups the decoder records.
pub const REPEAT_PREFIX: u8 = 0xF3;
pub const OPERAND_SIZE_PREFIX: u8 = 0x66;
pub const SEGMENT_PREFIXES: [u8; 6] = [0x26, 0x2E, 0x36, 0x3E, 0x64, 0x65];

/// Escape byte selecting the two-byte opcode map.
pub const TWO_BYTE_ESCAPE: u8 = 0x0F;

const MODRM_ONE_BYTE: &[u8] = &[
    0x00, 0x01, 0x02, 0x03, 0x08, 0x09, 0x0A, 0x0B, 0x20, 0x21, 0x22, 0x23, 0x80, 0x81, 0x83,
    0x86, 0x87, 0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x8E, 0x8F, 0xC0, 0xC1, 0xC6, 0xC7, 0xD0, 0xD1,
    0xD2, 0xD3, 0xF6, 0xF7, 0xFF,
];

const MODRM_TWO_BYTE: &[u8] = &[
    0x42, 0x63, 0x6B, 0x68, 0x69, 0x6F, 0x7F, 0xB0, 0xB1, 0xBC, 0xFD, 0xFE,
];

/// Width rule for an opcode's immediate field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateWidth {
    None,
    Fixed(ImmediateSize),
    /// 16 bits with the `66` prefix, 32 bits without.
    OperandSized,
    /// Far pointer offset: 16 bits only for `EA` with `66`, else 32.
    FarPointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeLayout {
    pub modrm: bool,
    pub immediate: ImmediateWidth,
    pub immediate_kind: ImmediateKind,
    pub family: InstructionFamily,
}

const EMPTY: OpcodeLayout = OpcodeLayout {
    modrm: false,
    immediate: ImmediateWidth::None,
    immediate_kind: ImmediateKind::Unused,
    family: InstructionFamily::Unimplemented,
};

const fn contains(list: &[u8], op: u8) -> bool {
    let mut i = 0;
    while i < list.len() {
        if list[i] == op {
            return true;
        }
        i += 1;
    }
    false
}

const fn one_byte_immediate(op: u8) -> (ImmediateWidth, ImmediateKind) {
    use ImmediateKind::{Double, Regular, Relative};
    use ImmediateWidth::{FarPointer, Fixed, OperandSized};

    if op & 0xF8 == 0xB0 {
        return (Fixed(ImmediateSize::Imm8), Regular);
    }
    if op & 0xF8 == 0xB8 {
        return (OperandSized, Regular);
    }
    match op {
        0x75 | 0x77 | 0xEB => (Fixed(ImmediateSize::Imm8), Relative),
        0x04 | 0x0C | 0x24 | 0x6A | 0x80 | 0x83 | 0xC0 | 0xC1 | 0xC6 => {
            (Fixed(ImmediateSize::Imm8), Regular)
        }
        0xC2 | 0xCA => (Fixed(ImmediateSize::Imm16), Regular),
        0xE8 | 0xE9 => (OperandSized, Relative),
        0x05 | 0x0D | 0x25 | 0x68 | 0x81 | 0xC7 => (OperandSized, Regular),
        0x9A | 0xEA => (FarPointer, Double),
        _ => (ImmediateWidth::None, ImmediateKind::Unused),
    }
}

/// Group opcodes `80/81/83` and `C6/C7` belong to their family whatever the
/// ModRM.reg extension.
const fn one_byte_family(op: u8) -> InstructionFamily {
    use InstructionFamily::*;

    match op {
        0x00..=0x05 | 0x80 | 0x81 | 0x83 => Add,
        0x88..=0x8B | 0x8E | 0xB0..=0xBF | 0xC6 | 0xC7 => Mov,
        0x86 => Xchg,
        0xEA => FarJmp,
        0x75 => Jne,
        0xF4 => Hlt,
        _ => Unimplemented,
    }
}

const fn two_byte_immediate(op: u8) -> (ImmediateWidth, ImmediateKind) {
    match op {
        0x85 | 0x87 => (ImmediateWidth::OperandSized, ImmediateKind::Relative),
        _ => (ImmediateWidth::None, ImmediateKind::Unused),
    }
}

const fn two_byte_family(op: u8) -> InstructionFamily {
    match op {
        0x6F => InstructionFamily::Mov,
        0xB1 => InstructionFamily::Cmpxchg,
        _ => InstructionFamily::Unimplemented,
    }
}

const fn build_one_byte() -> [OpcodeLayout; 256] {
    let mut table = [EMPTY; 256];
    let mut i = 0;
    while i < 256 {
        let op = i as u8;
        let (immediate, immediate_kind) = one_byte_immediate(op);
        table[i] = OpcodeLayout {
            modrm: contains(MODRM_ONE_BYTE, op),
            immediate,
            immediate_kind,
            family: one_byte_family(op),
        };
        i += 1;
    }
    table
}

const fn build_two_byte() -> [OpcodeLayout; 256] {
    let mut table = [EMPTY; 256];
    let mut i = 0;
    while i < 256 {
        let op = i as u8;
        let (immediate, immediate_kind) = two_byte_immediate(op);
        table[i] = OpcodeLayout {
            modrm: contains(MODRM_TWO_BYTE, op),
            immediate,
            immediate_kind,
            family: two_byte_family(op),
        };
        i += 1;
    }
    table
}

static ONE_BYTE: [OpcodeLayout; 256] = build_one_byte();
static TWO_BYTE: [OpcodeLayout; 256] = build_two_byte();

/// Layout descriptor for `opcode` in the selected map.
pub fn layout(opcode: u8, two_byte: bool) -> &'static OpcodeLayout {
    if two_byte {
        &TWO_BYTE[opcode as usize]
    } else {
        &ONE_BYTE[opcode as usize]
    }
}

pub fn is_prefix(byte: u8) -> bool {
    byte == REPEAT_PREFIX || byte == OPERAND_SIZE_PREFIX || SEGMENT_PREFIXES.contains(&byte)
}

pub fn needs_modrm(opcode: u8, two_byte: bool) -> bool {
    layout(opcode, two_byte).modrm
}

/// A SIB byte follows ModRM when `rm == 100` and the operand is in memory.
pub fn needs_sib(modrm: u8) -> bool {
    let m = ModRm::from_byte(modrm);
    m.rm == 0b100 && m.mode != 0b11
}

pub fn displacement_size(modrm: u8, sib: u8) -> DisplacementSize {
    let m = ModRm::from_byte(modrm);
    let base = Sib::from_byte(sib).base;
    match m.mode {
        0b01 => DisplacementSize::Disp8,
        0b10 => DisplacementSize::Disp32,
        0b00 if base == 0b101 || m.rm == 0b101 => DisplacementSize::Disp32,
        _ => DisplacementSize::None,
    }
}

/// Immediate width and kind for `opcode`, resolved against the `66` prefix.
pub fn immediate_layout(
    opcode: u8,
    two_byte: bool,
    operand_size_override: bool,
) -> (ImmediateSize, ImmediateKind) {
    let entry = layout(opcode, two_byte);
    let sized = if operand_size_override {
        ImmediateSize::Imm16
    } else {
        ImmediateSize::Imm32
    };
    let size = match entry.immediate {
        ImmediateWidth::None => ImmediateSize::None,
        ImmediateWidth::Fixed(size) => size,
        ImmediateWidth::OperandSized => sized,
        ImmediateWidth::FarPointer if operand_size_override && opcode == 0xEA => {
            ImmediateSize::Imm16
        }
        ImmediateWidth::FarPointer => ImmediateSize::Imm32,
    };
    (size, entry.immediate_kind)
}

/// Family for an instruction, keyed by `(opcode, two_byte)`.
pub fn classify(opcode: u8, two_byte: bool) -> InstructionFamily {
    layout(opcode, two_byte).family
}
