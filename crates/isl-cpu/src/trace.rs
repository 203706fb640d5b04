use std::io::{self, Write};

use isl_mem::MemoryImage;

use crate::state::{CpuState, Flags, Gpr, Segment};

/// Write a human-readable snapshot of `state`, plus every memory row holding
/// a byte written since start.
///
/// Written bytes are grouped into 4-byte rows aligned to 4; the other bytes of
/// a row show their current value (0 when unmapped).
pub fn write_state(out: &mut dyn Write, state: &CpuState, mem: &MemoryImage) -> io::Result<()> {
    writeln!(out, "--- Instruction Executed. New State: ---")?;
    writeln!(out, "EIP : 0x{:08X}", state.eip)?;
    if state.halted {
        writeln!(out, "(halted)")?;
    }
    writeln!(out)?;

    writeln!(out, "General Purpose Registers:")?;
    for row in [
        [Gpr::Eax, Gpr::Ebx, Gpr::Ecx, Gpr::Edx],
        [Gpr::Esp, Gpr::Ebp, Gpr::Esi, Gpr::Edi],
    ] {
        let cells: Vec<String> = row
            .iter()
            .map(|&r| format!("{}: {:08X}", r.name(), state.gpr(r)))
            .collect();
        writeln!(out, "  {}", cells.join("   "))?;
    }
    writeln!(out)?;

    writeln!(out, "MMX Registers:")?;
    for pair in (0..8u8).step_by(2) {
        writeln!(
            out,
            "  MM{}: {:016X}   MM{}: {:016X}",
            pair,
            state.mmx(pair),
            pair + 1,
            state.mmx(pair + 1)
        )?;
    }
    writeln!(out)?;

    let flags: Vec<String> = Flags::NAMED
        .iter()
        .map(|&(name, flag)| format!("{name}:{}", state.flag(flag)))
        .collect();
    writeln!(out, "Segment Registers:           Flags:")?;
    writeln!(
        out,
        "  CS: {:04X}  DS: {:04X}  SS: {:04X}    {}",
        state.segment(Segment::Cs),
        state.segment(Segment::Ds),
        state.segment(Segment::Ss),
        flags.join(" ")
    )?;
    writeln!(
        out,
        "  ES: {:04X}  FS: {:04X}  GS: {:04X}",
        state.segment(Segment::Es),
        state.segment(Segment::Fs),
        state.segment(Segment::Gs)
    )?;
    writeln!(out)?;

    writeln!(out, "Modified Memory Locations:")?;
    let mut last_row = None;
    for addr in state.written_addresses() {
        let row = addr & !0x3;
        if last_row == Some(row) {
            continue;
        }
        last_row = Some(row);
        let bytes: Vec<String> = (0..4u32)
            .map(|i| format!("{:02X}", mem.read_u8(row.wrapping_add(i))))
            .collect();
        writeln!(out, "  [0x{row:08X}]: {}", bytes.join(" "))?;
    }
    if last_row.is_none() {
        writeln!(out, "  (No memory writes yet)")?;
    }

    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out)
}
