use core::fmt;

/// Legacy prefixes recognized by the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prefixes {
    /// One of `26 2E 36 3E 64 65` was seen.
    pub segment_override: bool,
    /// `66` was seen.
    pub operand_size_override: bool,
    /// `F3` was seen.
    pub repeat: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplacementSize {
    #[default]
    None,
    Disp8,
    Disp32,
}

impl DisplacementSize {
    pub fn bytes(self) -> usize {
        match self {
            Self::None => 0,
            Self::Disp8 => 1,
            Self::Disp32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImmediateSize {
    #[default]
    None,
    Imm8,
    Imm16,
    Imm32,
}

impl ImmediateSize {
    pub fn bytes(self) -> usize {
        match self {
            Self::None => 0,
            Self::Imm8 => 1,
            Self::Imm16 => 2,
            Self::Imm32 => 4,
        }
    }
}

/// How the immediate field is meant to be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImmediateKind {
    /// Plain data operand.
    Regular,
    /// Branch offset relative to the next instruction.
    Relative,
    /// Far pointer operand (`CALLF`/`JMPF ptr16:32`).
    Double,
    /// The instruction has no immediate.
    #[default]
    Unused,
}

/// Where operand 0 comes from, as seen by the field decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressingHint {
    /// No ModRM byte; the operand is implied by the opcode.
    #[default]
    Register,
    /// ModRM `rm` selects a register or a base+displacement address.
    ModRm,
    /// A SIB byte follows ModRM.
    Sib,
}

/// Instruction family the executor dispatches on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InstructionFamily {
    Add,
    Mov,
    Xchg,
    Cmpxchg,
    FarJmp,
    Jne,
    Hlt,
    /// Decodable, but not executed by this simulator.
    #[default]
    Unimplemented,
}

/// Split view of a ModRM byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm {
    /// Bits 7:6.
    pub mode: u8,
    /// Bits 5:3.
    pub reg: u8,
    /// Bits 2:0.
    pub rm: u8,
}

impl ModRm {
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            mode: (byte >> 6) & 0b11,
            reg: (byte >> 3) & 0b111,
            rm: byte & 0b111,
        }
    }

    /// `mod == 11`: `rm` names a register rather than memory.
    pub const fn is_register(self) -> bool {
        self.mode == 0b11
    }
}

/// Split view of a SIB byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sib {
    pub scale: u8,
    pub index: u8,
    pub base: u8,
}

impl Sib {
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            scale: (byte >> 6) & 0b11,
            index: (byte >> 3) & 0b111,
            base: byte & 0b111,
        }
    }
}

/// One decoded instruction occurrence.
///
/// All multi-byte fields hold the raw little-endian bits read from the stream;
/// sign interpretation is left to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub start_address: u32,
    pub next_address: u32,
    pub length: u8,
    pub prefixes: Prefixes,
    /// The `0F` escape byte was consumed.
    pub two_byte_opcode: bool,
    pub opcode: u8,
    pub modrm: u8,
    pub sib: u8,
    pub displacement: u32,
    pub displacement_size: DisplacementSize,
    pub immediate: u32,
    pub immediate_size: ImmediateSize,
    pub immediate_kind: ImmediateKind,
    pub addressing: AddressingHint,
    pub family: InstructionFamily,
}

impl DecodedInstruction {
    pub fn has_modrm(&self) -> bool {
        self.addressing != AddressingHint::Register
    }

    pub fn has_sib(&self) -> bool {
        self.addressing == AddressingHint::Sib
    }

    /// The ModRM fields. A missing ModRM reads as all-zero fields.
    pub fn modrm_fields(&self) -> ModRm {
        ModRm::from_byte(self.modrm)
    }

    pub fn sib_fields(&self) -> Sib {
        Sib::from_byte(self.sib)
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#010x}: len={} op={}{:02x} modrm={:02x} sib={:02x} disp={:#x} imm={:#x} [{:?}]",
            self.start_address,
            self.length,
            if self.two_byte_opcode { "0f " } else { "" },
            self.opcode,
            self.modrm,
            self.sib,
            self.displacement,
            self.immediate,
            self.family,
        )
    }
}
