use std::collections::BTreeSet;

use crate::alu::OperandSize;

bitflags::bitflags! {
    /// Status/control flags tracked by the simulator, at their EFLAGS bit
    /// positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Flags: u32 {
        const CF = 1 << 0;
        const PF = 1 << 2;
        const AF = 1 << 4;
        const ZF = 1 << 6;
        const SF = 1 << 7;
        const DF = 1 << 10;
        const OF = 1 << 11;
    }
}

impl Flags {
    /// Flags in report order, with their names.
    pub const NAMED: [(&'static str, Flags); 7] = [
        ("CF", Flags::CF),
        ("PF", Flags::PF),
        ("AF", Flags::AF),
        ("ZF", Flags::ZF),
        ("SF", Flags::SF),
        ("DF", Flags::DF),
        ("OF", Flags::OF),
    ];
}

/// General-purpose registers in x86 encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gpr {
    Eax = 0,
    Ecx = 1,
    Edx = 2,
    Ebx = 3,
    Esp = 4,
    Ebp = 5,
    Esi = 6,
    Edi = 7,
}

impl Gpr {
    pub const ALL: [Gpr; 8] = [
        Gpr::Eax,
        Gpr::Ecx,
        Gpr::Edx,
        Gpr::Ebx,
        Gpr::Esp,
        Gpr::Ebp,
        Gpr::Esi,
        Gpr::Edi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Gpr::Eax => "EAX",
            Gpr::Ecx => "ECX",
            Gpr::Edx => "EDX",
            Gpr::Ebx => "EBX",
            Gpr::Esp => "ESP",
            Gpr::Ebp => "EBP",
            Gpr::Esi => "ESI",
            Gpr::Edi => "EDI",
        }
    }
}

/// Segment registers in x86 encoding order (`ModRM.reg` of `MOV Sreg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Es = 0,
    Cs = 1,
    Ss = 2,
    Ds = 3,
    Fs = 4,
    Gs = 5,
}

impl Segment {
    pub const ALL: [Segment; 6] = [
        Segment::Es,
        Segment::Cs,
        Segment::Ss,
        Segment::Ds,
        Segment::Fs,
        Segment::Gs,
    ];
}

/// Architectural state of the simulated CPU.
///
/// Register indices follow the x86 encoding. Byte-sized accesses with index
/// 4-7 address AH/CH/DH/BH, the second byte of registers 0-3.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuState {
    pub eip: u32,
    gpr: [u32; 8],
    segments: [u16; 6],
    mmx: [u64; 8],
    pub flags: Flags,
    pub halted: bool,
    written: BTreeSet<u32>,
}

impl CpuState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gpr(&self, reg: Gpr) -> u32 {
        self.gpr[reg as usize]
    }

    pub fn set_gpr(&mut self, reg: Gpr, val: u32) {
        self.gpr[reg as usize] = val;
    }

    /// Read register `index` (0-7) at the given width.
    pub fn read_reg(&self, index: u8, size: OperandSize) -> u32 {
        let index = usize::from(index);
        match size {
            OperandSize::Dword => self.gpr[index],
            OperandSize::Word => self.gpr[index] & 0xFFFF,
            OperandSize::Byte if index < 4 => self.gpr[index] & 0xFF,
            OperandSize::Byte => (self.gpr[index - 4] >> 8) & 0xFF,
        }
    }

    /// Write register `index` (0-7) at the given width, preserving the bits
    /// outside the addressed sub-register.
    pub fn write_reg(&mut self, index: u8, size: OperandSize, val: u32) {
        let index = usize::from(index);
        match size {
            OperandSize::Dword => self.gpr[index] = val,
            OperandSize::Word => {
                self.gpr[index] = (self.gpr[index] & 0xFFFF_0000) | (val & 0xFFFF);
            }
            OperandSize::Byte if index < 4 => {
                self.gpr[index] = (self.gpr[index] & 0xFFFF_FF00) | (val & 0xFF);
            }
            OperandSize::Byte => {
                let owner = &mut self.gpr[index - 4];
                *owner = (*owner & 0xFFFF_00FF) | ((val & 0xFF) << 8);
            }
        }
    }

    pub fn segment(&self, seg: Segment) -> u16 {
        self.segments[seg as usize]
    }

    pub fn set_segment(&mut self, seg: Segment, val: u16) {
        self.segments[seg as usize] = val;
    }

    pub fn mmx(&self, index: u8) -> u64 {
        self.mmx[usize::from(index)]
    }

    pub fn set_mmx(&mut self, index: u8, val: u64) {
        self.mmx[usize::from(index)] = val;
    }

    /// Flag value as 0 or 1.
    pub fn flag(&self, flag: Flags) -> u8 {
        u8::from(self.flags.contains(flag))
    }

    pub fn set_flag(&mut self, flag: Flags, val: bool) {
        self.flags.set(flag, val);
    }

    /// Record that the byte at `addr` was written by an instruction.
    pub fn note_write(&mut self, addr: u32) {
        self.written.insert(addr);
    }

    /// Every byte address written since start, ascending.
    pub fn written_addresses(&self) -> impl Iterator<Item = u32> + '_ {
        self.written.iter().copied()
    }
}
