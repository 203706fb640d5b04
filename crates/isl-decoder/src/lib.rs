//! IA-32 field decoder for the ISL simulator.
//!
//! The decoder splits an instruction into its encoding fields (prefixes,
//! opcode, ModRM, SIB, displacement, immediate) and tags it with the
//! [`InstructionFamily`] the executor runs. It does not validate instructions
//! beyond the membership rules in [`tables`]; opcodes the simulator does not
//! execute still decode, with [`InstructionFamily::Unimplemented`].

#![forbid(unsafe_code)]

mod dump;
mod hex;
mod inst;
pub mod tables;

pub use dump::write_decode_record;
pub use hex::{parse_hex_bytes, HexError};
pub use inst::{
    AddressingHint, DecodedInstruction, DisplacementSize, ImmediateKind, ImmediateSize,
    InstructionFamily, ModRm, Prefixes, Sib,
};
pub use tables::{displacement_size, immediate_layout, is_prefix, needs_modrm, needs_sib};

use isl_mem::MemoryImage;
use thiserror::Error;

/// Maximum x86 instruction length (architectural limit).
pub const MAX_INST_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The instruction continues past the end of the supplied bytes.
    #[error("instruction byte at {address:#010x} is outside the decode window")]
    OutOfBounds { address: u32 },
    /// The instruction would exceed [`MAX_INST_LEN`] bytes.
    #[error("instruction at {address:#010x} exceeds {MAX_INST_LEN} bytes")]
    TooLong { address: u32 },
    #[error(transparent)]
    Hex(#[from] HexError),
}

struct Cursor<'a> {
    bytes: &'a [u8],
    start: u32,
    pos: usize,
    /// The caller supplied more than `MAX_INST_LEN` bytes.
    capped: bool,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], start: u32) -> Self {
        let capped = bytes.len() > MAX_INST_LEN;
        Self {
            bytes: &bytes[..bytes.len().min(MAX_INST_LEN)],
            start,
            pos: 0,
            capped,
        }
    }

    fn peek(&self) -> Result<u8, DecodeError> {
        self.bytes.get(self.pos).copied().ok_or_else(|| {
            if self.capped {
                DecodeError::TooLong {
                    address: self.start,
                }
            } else {
                DecodeError::OutOfBounds {
                    address: self.start.wrapping_add(self.pos as u32),
                }
            }
        })
    }

    fn next_u8(&mut self) -> Result<u8, DecodeError> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    /// Little-endian field of `len` bytes (at most 4).
    fn next_le(&mut self, len: usize) -> Result<u32, DecodeError> {
        let mut v = 0u32;
        for i in 0..len {
            v |= u32::from(self.next_u8()?) << (i * 8);
        }
        Ok(v)
    }
}

/// Decode one instruction from the start of `bytes`, whose first byte lives
/// at `address`.
///
/// Only the first [`MAX_INST_LEN`] bytes are considered.
pub fn decode_bytes(bytes: &[u8], address: u32) -> Result<DecodedInstruction, DecodeError> {
    let mut cur = Cursor::new(bytes, address);

    let mut prefixes = Prefixes::default();
    loop {
        match cur.peek()? {
            tables::REPEAT_PREFIX => prefixes.repeat = true,
            tables::OPERAND_SIZE_PREFIX => prefixes.operand_size_override = true,
            b if tables::SEGMENT_PREFIXES.contains(&b) => prefixes.segment_override = true,
            _ => break,
        }
        cur.pos += 1;
    }

    let mut two_byte_opcode = false;
    let mut opcode = cur.next_u8()?;
    if opcode == tables::TWO_BYTE_ESCAPE {
        two_byte_opcode = true;
        opcode = cur.next_u8()?;
    }

    let mut addressing = AddressingHint::Register;
    let modrm = if needs_modrm(opcode, two_byte_opcode) {
        addressing = AddressingHint::ModRm;
        cur.next_u8()?
    } else {
        0
    };

    let sib = if addressing == AddressingHint::ModRm && needs_sib(modrm) {
        addressing = AddressingHint::Sib;
        cur.next_u8()?
    } else {
        0
    };

    let displacement_size = displacement_size(modrm, sib);
    let displacement = cur.next_le(displacement_size.bytes())?;

    let (immediate_size, immediate_kind) =
        immediate_layout(opcode, two_byte_opcode, prefixes.operand_size_override);
    let immediate = cur.next_le(immediate_size.bytes())?;

    let length = cur.pos as u8;
    let inst = DecodedInstruction {
        start_address: address,
        next_address: address.wrapping_add(u32::from(length)),
        length,
        prefixes,
        two_byte_opcode,
        opcode,
        modrm,
        sib,
        displacement,
        displacement_size,
        immediate,
        immediate_size,
        immediate_kind,
        addressing,
        family: tables::classify(opcode, two_byte_opcode),
    };
    tracing::trace!(%inst, "decoded");
    Ok(inst)
}

/// Decode hex text (see [`parse_hex_bytes`]) as if it were loaded at `address`.
pub fn decode_hex(text: &str, address: u32) -> Result<DecodedInstruction, DecodeError> {
    let bytes = parse_hex_bytes(text)?;
    decode_bytes(&bytes, address)
}

/// Decode the instruction at `address`.
///
/// The decode window is the run of mapped bytes starting at `address`; an
/// unmapped byte inside the instruction is reported as
/// [`DecodeError::OutOfBounds`].
pub fn decode_one(memory: &MemoryImage, address: u32) -> Result<DecodedInstruction, DecodeError> {
    // One byte past the limit lets the cursor tell a capped window from a gap.
    let window = memory.contiguous_from(address, MAX_INST_LEN + 1);
    decode_bytes(&window, address)
}

/// Decode every instruction reachable by walking the image forward from
/// `start_address`.
///
/// When the pointer lands on an unmapped address the walk resumes at the next
/// mapped address above it, so gaps in a sparse image are skipped. The walk
/// ends when nothing is mapped above the pointer. The first decode error
/// aborts the whole pass.
pub fn decode_all(
    memory: &MemoryImage,
    start_address: u32,
) -> Result<Vec<DecodedInstruction>, DecodeError> {
    let mut out = Vec::new();
    let mut ip = start_address;

    loop {
        if !memory.contains(ip) {
            let Some(next) = memory.next_mapped_after(ip) else {
                break;
            };
            tracing::debug!(from = ip, to = next, "skipping unmapped gap");
            ip = next;
        }

        let inst = decode_one(memory, ip)?;
        out.push(inst);

        match ip.checked_add(u32::from(inst.length)) {
            Some(next) => ip = next,
            None => break,
        }
    }

    tracing::debug!(count = out.len(), "decode pass complete");
    Ok(out)
}
