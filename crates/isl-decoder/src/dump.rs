use std::io::{self, Write};

use crate::inst::{AddressingHint, DecodedInstruction, ImmediateKind};

/// Write the field-level report for one decoded instruction.
///
/// `count` is the 1-based position of `inst` in the decode pass.
pub fn write_decode_record(
    out: &mut dyn Write,
    count: usize,
    inst: &DecodedInstruction,
) -> io::Result<()> {
    let p = inst.prefixes;
    writeln!(out, "=== Predecode Output ===")?;
    writeln!(out, "Instruction count: {count}")?;
    writeln!(
        out,
        "prefixes         : seg={} opsize={} rep={}",
        u8::from(p.segment_override),
        u8::from(p.operand_size_override),
        u8::from(p.repeat)
    )?;
    writeln!(out, "two_byte_opcode  : {}", u8::from(inst.two_byte_opcode))?;
    writeln!(out, "opcode           : {:#04x}", inst.opcode)?;
    writeln!(out, "modrm            : {:#04x}", inst.modrm)?;
    writeln!(out, "sib              : {:#04x}", inst.sib)?;
    writeln!(out, "disp             : {:#x}", inst.displacement)?;
    writeln!(out, "disp_size        : {}", inst.displacement_size.bytes())?;
    writeln!(out, "imm              : {:#x}", inst.immediate)?;
    writeln!(out, "imm_size         : {}", inst.immediate_size.bytes())?;
    writeln!(out, "imm_kind         : {}", imm_kind_name(inst.immediate_kind))?;
    writeln!(out, "addressing       : {}", addressing_name(inst.addressing))?;
    writeln!(out, "eip              : {:#x}", inst.start_address)?;
    writeln!(out, "eip_new          : {:#x}", inst.next_address)?;
    writeln!(out, "length           : {}", inst.length)?;
    writeln!(out, "family           : {:?}", inst.family)?;
    writeln!(out, "========================")
}

fn imm_kind_name(kind: ImmediateKind) -> &'static str {
    match kind {
        ImmediateKind::Regular => "regular",
        ImmediateKind::Relative => "relative",
        ImmediateKind::Double => "double",
        ImmediateKind::Unused => "unused",
    }
}

fn addressing_name(hint: AddressingHint) -> &'static str {
    match hint {
        AddressingHint::Register => "register",
        AddressingHint::ModRm => "modrm",
        AddressingHint::Sib => "sib",
    }
}
