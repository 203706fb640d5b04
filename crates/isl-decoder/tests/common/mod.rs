// Shared test helpers (integration tests compile as separate crates, so put
// common code in a submodule to avoid it becoming its own test target).

use isl_decoder::{displacement_size, immediate_layout, needs_modrm, needs_sib};

/// Synthetic instruction fields, serialized in x86 field order.
///
/// Fields the opcode does not take are dropped by [`Encoding::bytes`], and
/// displacement/immediate values are truncated to their encoded width.
#[derive(Debug, Clone)]
pub struct Encoding {
    pub prefixes: Vec<u8>,
    pub two_byte: bool,
    pub opcode: u8,
    pub modrm: u8,
    pub sib: u8,
    pub disp: u32,
    pub imm: u32,
}

impl Encoding {
    pub fn has_modrm(&self) -> bool {
        needs_modrm(self.opcode, self.two_byte)
    }

    pub fn modrm_or_zero(&self) -> u8 {
        if self.has_modrm() {
            self.modrm
        } else {
            0
        }
    }

    pub fn has_sib(&self) -> bool {
        self.has_modrm() && needs_sib(self.modrm)
    }

    pub fn sib_or_zero(&self) -> u8 {
        if self.has_sib() {
            self.sib
        } else {
            0
        }
    }

    pub fn disp_len(&self) -> usize {
        displacement_size(self.modrm_or_zero(), self.sib_or_zero()).bytes()
    }

    pub fn imm_len(&self) -> usize {
        let opsize = self.prefixes.contains(&0x66);
        immediate_layout(self.opcode, self.two_byte, opsize).0.bytes()
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut out = self.prefixes.clone();
        if self.two_byte {
            out.push(0x0F);
        }
        out.push(self.opcode);
        if self.has_modrm() {
            out.push(self.modrm);
        }
        if self.has_sib() {
            out.push(self.sib);
        }
        out.extend_from_slice(&self.disp.to_le_bytes()[..self.disp_len()]);
        out.extend_from_slice(&self.imm.to_le_bytes()[..self.imm_len()]);
        out
    }
}

pub fn truncate(value: u32, len: usize) -> u32 {
    match len {
        0 => 0,
        4 => value,
        n => value & ((1u32 << (n * 8)) - 1),
    }
}
