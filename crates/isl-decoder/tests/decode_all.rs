use isl_decoder::{decode_all, decode_one, write_decode_record, DecodeError, InstructionFamily};
use isl_mem::MemoryImage;

#[test]
fn walks_contiguous_stream() {
    // mov eax, 1; add eax, 2; hlt
    let mem = MemoryImage::from_bytes(0, &[0xB8, 1, 0, 0, 0, 0x05, 2, 0, 0, 0, 0xF4]);
    let insts = decode_all(&mem, 0).expect("decode");
    let starts: Vec<u32> = insts.iter().map(|i| i.start_address).collect();
    assert_eq!(starts, vec![0, 5, 10]);
    assert_eq!(
        insts.iter().map(|i| i.family).collect::<Vec<_>>(),
        vec![
            InstructionFamily::Mov,
            InstructionFamily::Add,
            InstructionFamily::Hlt
        ]
    );
    for inst in &insts {
        assert_eq!(
            inst.next_address - inst.start_address,
            u32::from(inst.length)
        );
    }
}

#[test]
fn skips_gaps_in_sparse_image() {
    let mut mem = MemoryImage::new();
    mem.load(0x0000, &[0x04, 0x01]); // add al, 1
    mem.load(0x0100, &[0x90]); // nop
    mem.load(0x1000, &[0xF4]); // hlt

    let insts = decode_all(&mem, 0).expect("decode");
    let starts: Vec<u32> = insts.iter().map(|i| i.start_address).collect();
    assert_eq!(starts, vec![0x0, 0x100, 0x1000]);
}

#[test]
fn unmapped_start_jumps_to_first_mapped_byte() {
    let mem = MemoryImage::from_bytes(0x40, &[0xF4]);
    let insts = decode_all(&mem, 0).expect("decode");
    assert_eq!(insts.len(), 1);
    assert_eq!(insts[0].start_address, 0x40);
}

#[test]
fn empty_image_decodes_nothing() {
    assert!(decode_all(&MemoryImage::new(), 0).expect("decode").is_empty());
}

#[test]
fn instruction_split_by_gap_aborts_pass() {
    let mut mem = MemoryImage::from_bytes(0, &[0x90, 0xB8, 0x01]);
    mem.load(0x10, &[0xF4]);
    assert_eq!(
        decode_all(&mem, 0),
        Err(DecodeError::OutOfBounds { address: 3 })
    );
}

#[test]
fn stops_at_top_of_address_space() {
    let mem = MemoryImage::from_bytes(u32::MAX, &[0x90]);
    let insts = decode_all(&mem, 0).expect("decode");
    assert_eq!(insts.len(), 1);
    assert_eq!(insts[0].start_address, u32::MAX);
    assert_eq!(insts[0].next_address, 0);
}

#[test]
fn decode_one_reads_from_image() {
    let mem = MemoryImage::from_bytes(0x7C00, &[0x0F, 0x6F, 0xC1]);
    let inst = decode_one(&mem, 0x7C00).expect("decode");
    assert!(inst.two_byte_opcode);
    assert_eq!(inst.next_address, 0x7C03);
}

#[test]
fn decode_record_lists_fields() {
    let mem = MemoryImage::from_bytes(0, &[0x75, 0xFE]);
    let inst = decode_one(&mem, 0).expect("decode");

    let mut out = Vec::new();
    write_decode_record(&mut out, 1, &inst).expect("write");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.starts_with("=== Predecode Output ===\n"));
    assert!(text.contains("Instruction count: 1\n"));
    assert!(text.contains("opcode           : 0x75\n"));
    assert!(text.contains("imm_kind         : relative\n"));
    assert!(text.contains("eip_new          : 0x2\n"));
}
