use isl_decoder::{
    decode_bytes, decode_hex, displacement_size, needs_modrm, needs_sib, AddressingHint,
    DecodeError, DisplacementSize, ModRm,
};

const MODRM_ONE_BYTE: [u8; 35] = [
    0x00, 0x01, 0x02, 0x03, 0x08, 0x09, 0x0A, 0x0B, 0x20, 0x21, 0x22, 0x23, 0x80, 0x81, 0x83,
    0x86, 0x87, 0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x8E, 0x8F, 0xC0, 0xC1, 0xC6, 0xC7, 0xD0, 0xD1,
    0xD2, 0xD3, 0xF6, 0xF7, 0xFF,
];

const MODRM_TWO_BYTE: [u8; 12] = [
    0x42, 0x63, 0x6B, 0x68, 0x69, 0x6F, 0x7F, 0xB0, 0xB1, 0xBC, 0xFD, 0xFE,
];

#[test]
fn modrm_membership_is_per_map() {
    for op in 0..=255u8 {
        assert_eq!(needs_modrm(op, false), MODRM_ONE_BYTE.contains(&op), "{op:#04x}");
        assert_eq!(needs_modrm(op, true), MODRM_TWO_BYTE.contains(&op), "0f {op:#04x}");
    }
}

#[test]
fn register_form_modrm_opcodes_are_two_bytes_plus_immediate() {
    // mod=11 rm=000: no SIB, no displacement.
    for &op in &MODRM_ONE_BYTE {
        let inst = decode_bytes(&[op, 0xC0, 0, 0, 0, 0], 0).expect("decode");
        let expected = 2 + inst.immediate_size.bytes();
        assert_eq!(inst.length as usize, expected, "{op:#04x}");
        assert_eq!(inst.addressing, AddressingHint::ModRm);
    }
}

#[test]
fn sib_presence_rule() {
    assert!(needs_sib(0x04)); // mod=00 rm=100
    assert!(needs_sib(0x44)); // mod=01 rm=100
    assert!(needs_sib(0x84)); // mod=10 rm=100
    assert!(!needs_sib(0xC4)); // mod=11 rm=100: register esp
    assert!(!needs_sib(0x05));
}

#[test]
fn displacement_size_rules() {
    assert_eq!(displacement_size(0x40, 0), DisplacementSize::Disp8);
    assert_eq!(displacement_size(0x80, 0), DisplacementSize::Disp32);
    assert_eq!(displacement_size(0x05, 0), DisplacementSize::Disp32);
    // mod=00 with SIB base=101: disp32 without a base register.
    assert_eq!(displacement_size(0x04, 0x25), DisplacementSize::Disp32);
    assert_eq!(displacement_size(0x04, 0x24), DisplacementSize::None);
    assert_eq!(displacement_size(0x00, 0), DisplacementSize::None);
    assert_eq!(displacement_size(0xC5, 0x25), DisplacementSize::None);
}

#[test]
fn decodes_disp8_form() {
    // mov eax, [ebp-4]
    let inst = decode_hex("8B 45 FC", 0).expect("decode");
    assert_eq!(inst.modrm_fields(), ModRm { mode: 1, reg: 0, rm: 5 });
    assert_eq!(inst.displacement, 0xFC);
    assert_eq!(inst.displacement_size, DisplacementSize::Disp8);
    assert_eq!(inst.length, 3);
}

#[test]
fn decodes_absolute_disp32_form() {
    // add [0x12345678], eax
    let inst = decode_hex("01 05 78 56 34 12", 0).expect("decode");
    assert_eq!(inst.displacement, 0x1234_5678);
    assert_eq!(inst.displacement_size, DisplacementSize::Disp32);
    assert_eq!(inst.length, 6);
}

#[test]
fn decodes_sib_with_disp32_and_immediate() {
    // mov dword [esp+0x100], 0xdeadbeef
    let inst = decode_hex("C7 84 24 00 01 00 00 EF BE AD DE", 0x2000).expect("decode");
    assert_eq!(inst.addressing, AddressingHint::Sib);
    assert_eq!(inst.sib, 0x24);
    assert_eq!(inst.sib_fields().base, 0b100);
    assert_eq!(inst.displacement, 0x100);
    assert_eq!(inst.immediate, 0xDEAD_BEEF);
    assert_eq!(inst.length, 11);
    assert_eq!(inst.next_address, 0x200B);
}

#[test]
fn opcode_without_modrm_leaves_fields_zero() {
    let inst = decode_hex("F4", 0).expect("decode");
    assert_eq!(inst.addressing, AddressingHint::Register);
    assert!(!inst.has_modrm());
    assert_eq!((inst.modrm, inst.sib, inst.displacement), (0, 0, 0));
    assert_eq!(inst.length, 1);
}

#[test]
fn truncated_displacement_is_out_of_bounds() {
    assert_eq!(
        decode_bytes(&[0x8B, 0x85, 0x00, 0x01], 0x10),
        Err(DecodeError::OutOfBounds { address: 0x14 })
    );
}
