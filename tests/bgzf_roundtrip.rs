//! BGZF block-container round trips (§8 "writing a BAM then reading it
//! yields the same records"; here exercised directly at the BGZF layer).

use std::io::Cursor;

use bam_core::bgzf::{Reader, VirtualPosition, Writer};

#[test]
fn single_block_round_trips_through_compression() {
    let mut w = Writer::new(Vec::new());
    w.write_data(b"a small alignment payload").unwrap();
    w.finish().unwrap();

    let bytes = w.get_ref().clone();
    let mut r = Reader::new(Cursor::new(bytes));
    let mut out = vec![0u8; "a small alignment payload".len()];
    r.read_exact(&mut out).unwrap();
    assert_eq!(&out, b"a small alignment payload");
}

#[test]
fn multi_block_stream_round_trips_in_order() {
    let mut w = Writer::new(Vec::new());
    let chunk_a = vec![b'a'; 70_000];
    let chunk_b = vec![b'b'; 1_000];
    w.write_data(&chunk_a).unwrap();
    w.write_data(&chunk_b).unwrap();
    w.finish().unwrap();

    let bytes = w.get_ref().clone();
    let mut r = Reader::new(Cursor::new(bytes));
    let mut out = vec![0u8; chunk_a.len() + chunk_b.len()];
    r.read_exact(&mut out).unwrap();
    assert_eq!(&out[..chunk_a.len()], &chunk_a[..]);
    assert_eq!(&out[chunk_a.len()..], &chunk_b[..]);
}

#[test]
fn seeking_to_a_virtual_offset_lands_on_the_right_byte() {
    let mut w = Writer::new(Vec::new());
    w.write_data(&vec![b'x'; 65_536]).unwrap();
    let vo_before_tail = w.virtual_position();
    w.write_data(b"tail").unwrap();
    w.finish().unwrap();

    let bytes = w.get_ref().clone();
    let mut r = Reader::new(Cursor::new(bytes));
    r.seek(vo_before_tail).unwrap();
    let mut out = [0u8; 4];
    r.read_exact(&mut out).unwrap();
    assert_eq!(&out, b"tail");
}

#[test]
fn every_produced_virtual_offset_points_at_a_bgzf_block_header() {
    // §8: "For all VOs produced by the writer: (vo >> 16) equals the byte
    // offset of a valid BGZF block header in the output."
    let mut w = Writer::new(Vec::new());
    let first_vo = w.virtual_position();
    w.write_data(&vec![b'z'; 65_536]).unwrap();
    let second_vo = w.virtual_position();
    w.finish().unwrap();

    let bytes = w.get_ref().clone();
    for vo in [first_vo, second_vo] {
        let offset = vo.block_offset() as usize;
        assert_eq!(&bytes[offset..offset + 2], &[0x1f, 0x8b]);
    }
}

#[test]
fn virtual_position_roundtrips_through_raw_u64() {
    let vo = VirtualPosition::pack(12345, 42);
    let raw = vo.as_raw();
    assert_eq!(VirtualPosition::from_raw(raw), vo);
}
