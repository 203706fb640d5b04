use isl_decoder::{decode_hex, immediate_layout, ImmediateKind, ImmediateSize, InstructionFamily};

#[test]
fn mov_immediate_ranges() {
    for op in 0xB0..=0xB7u8 {
        assert_eq!(
            immediate_layout(op, false, true),
            (ImmediateSize::Imm8, ImmediateKind::Regular)
        );
    }
    for op in 0xB8..=0xBFu8 {
        assert_eq!(immediate_layout(op, false, false).0, ImmediateSize::Imm32);
        assert_eq!(immediate_layout(op, false, true).0, ImmediateSize::Imm16);
    }
}

#[test]
fn byte_immediates_and_relative_kinds() {
    for op in [0x04u8, 0x0C, 0x24, 0x6A, 0x80, 0x83, 0xC0, 0xC1, 0xC6] {
        assert_eq!(
            immediate_layout(op, false, false),
            (ImmediateSize::Imm8, ImmediateKind::Regular),
            "{op:#04x}"
        );
    }
    for op in [0x75u8, 0x77, 0xEB] {
        assert_eq!(
            immediate_layout(op, false, false),
            (ImmediateSize::Imm8, ImmediateKind::Relative),
            "{op:#04x}"
        );
    }
}

#[test]
fn word_and_operand_sized_immediates() {
    for op in [0xC2u8, 0xCA] {
        assert_eq!(immediate_layout(op, false, false).0, ImmediateSize::Imm16);
        assert_eq!(immediate_layout(op, false, true).0, ImmediateSize::Imm16);
    }
    for op in [0x05u8, 0x0D, 0x25, 0x68, 0x81, 0xC7] {
        assert_eq!(
            immediate_layout(op, false, false),
            (ImmediateSize::Imm32, ImmediateKind::Regular)
        );
        assert_eq!(immediate_layout(op, false, true).0, ImmediateSize::Imm16);
    }
    for op in [0xE8u8, 0xE9] {
        assert_eq!(
            immediate_layout(op, false, true),
            (ImmediateSize::Imm16, ImmediateKind::Relative)
        );
    }
}

#[test]
fn far_pointer_immediates() {
    assert_eq!(
        immediate_layout(0xEA, false, true),
        (ImmediateSize::Imm16, ImmediateKind::Double)
    );
    assert_eq!(
        immediate_layout(0xEA, false, false),
        (ImmediateSize::Imm32, ImmediateKind::Double)
    );
    // CALLF keeps a 32-bit offset even with the override.
    assert_eq!(
        immediate_layout(0x9A, false, true),
        (ImmediateSize::Imm32, ImmediateKind::Double)
    );
}

#[test]
fn two_byte_map_only_has_near_jcc_immediates() {
    assert_eq!(
        immediate_layout(0x85, true, false),
        (ImmediateSize::Imm32, ImmediateKind::Relative)
    );
    assert_eq!(
        immediate_layout(0x87, true, true),
        (ImmediateSize::Imm16, ImmediateKind::Relative)
    );
    for op in (0..=255u8).filter(|op| !matches!(op, 0x85 | 0x87)) {
        assert_eq!(
            immediate_layout(op, true, false),
            (ImmediateSize::None, ImmediateKind::Unused),
            "0f {op:#04x}"
        );
    }
}

#[test]
fn unlisted_opcodes_have_no_immediate() {
    for op in [0x90u8, 0xF4, 0x01, 0x86, 0xFF] {
        assert_eq!(
            immediate_layout(op, false, false),
            (ImmediateSize::None, ImmediateKind::Unused)
        );
    }
}

#[test]
fn decodes_jne_rel8() {
    let inst = decode_hex("75 FE", 0x1003).expect("decode");
    assert_eq!(inst.immediate, 0xFE);
    assert_eq!(inst.immediate_kind, ImmediateKind::Relative);
    assert_eq!(inst.next_address, 0x1005);
    assert_eq!(inst.family, InstructionFamily::Jne);
}

#[test]
fn decodes_far_jmp_as_offset_only() {
    let inst = decode_hex("EA 78 56 34 12", 0).expect("decode");
    assert_eq!(inst.immediate, 0x1234_5678);
    assert_eq!(inst.immediate_kind, ImmediateKind::Double);
    assert_eq!(inst.displacement, 0);
    assert_eq!(inst.length, 5);
    assert_eq!(inst.family, InstructionFamily::FarJmp);
}

#[test]
fn group_opcodes_classify_by_opcode_alone() {
    for text in ["83 C0 01", "83 E8 01", "81 F9 01 00 00 00", "80 FB 05"] {
        assert_eq!(
            decode_hex(text, 0).unwrap().family,
            InstructionFamily::Add,
            "{text}"
        );
    }
    for text in ["C6 00 07", "C6 08 07", "C7 C8 11 00 00 00"] {
        assert_eq!(
            decode_hex(text, 0).unwrap().family,
            InstructionFamily::Mov,
            "{text}"
        );
    }
}

#[test]
fn movq_only_in_two_byte_map() {
    assert_eq!(decode_hex("0F 6F C1", 0).unwrap().family, InstructionFamily::Mov);
    assert_eq!(
        decode_hex("6F", 0).unwrap().family,
        InstructionFamily::Unimplemented
    );
}
