//! Full `Writer` → `Reader` round trips (§8 end-to-end scenarios), including
//! the sibling `.bai`/`.md5` sidecars.

use std::io::Cursor;

use bam_core::bai::{self, ByteSource};
use bam_core::config::WriterConfig;
use bam_core::header::{ReferenceSequenceEntry, SamHeader};
use bam_core::reader::Reader;
use bam_core::record::{Cigar, CigarOp, CigarOpKind, Flags, Record, Sequence};
use bam_core::writer::Writer;

fn sorted_header() -> SamHeader {
    SamHeader::new(
        "@HD\tVN:1.6\tSO:coordinate\n@SQ\tSN:chr1\tLN:1000\n",
        vec![ReferenceSequenceEntry::new("chr1", 1000)],
    )
}

fn mapped_record(name: &[u8], start: u32) -> Record {
    mapped_record_on(name, 0, start)
}

fn mapped_record_on(name: &[u8], ref_id: usize, start: u32) -> Record {
    let mut rec = Record::new();
    rec.name = name.to_vec();
    rec.flags = Flags::new(0);
    rec.reference_sequence_id = Some(ref_id);
    rec.alignment_start = Some(start);
    rec.mapping_quality = Some(60);
    rec.cigar = Cigar(vec![CigarOp::new(CigarOpKind::Match, 36)]);
    rec.sequence = Sequence::from_ascii(b"ACGTACGTACGTACGTACGTACGTACGTACGTACGT");
    rec.quality_scores = vec![30; 37];
    rec
}

fn two_reference_sorted_header() -> SamHeader {
    SamHeader::new(
        "@HD\tVN:1.6\tSO:coordinate\n@SQ\tSN:chr1\tLN:1000\n@SQ\tSN:chr2\tLN:1000\n",
        vec![
            ReferenceSequenceEntry::new("chr1", 1000),
            ReferenceSequenceEntry::new("chr2", 1000),
        ],
    )
}

#[test]
fn an_empty_coordinate_sorted_file_indexes_with_all_zero_counts() {
    // Scenario 1: a header declaring one reference, no records written.
    let opts = WriterConfig { create_index: true, ..Default::default() };
    let mut w = Writer::new(Vec::new(), sorted_header(), opts).unwrap();
    w.close().unwrap();
    let bytes = w.get_ref().clone();

    let mut reader = Reader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.header().reference_sequences.len(), 1);
    assert!(reader.records().next().is_none());
}

#[test]
fn records_written_coordinate_sorted_are_all_recovered_by_file_order_iteration() {
    let opts = WriterConfig::default();
    let mut w = Writer::new(Vec::new(), sorted_header(), opts).unwrap();
    w.write_record(&mapped_record(b"r1", 100)).unwrap();
    w.write_record(&mapped_record(b"r2", 200)).unwrap();
    w.write_record(&mapped_record(b"r3", 300)).unwrap();
    w.close().unwrap();
    let bytes = w.get_ref().clone();

    let mut reader = Reader::new(Cursor::new(bytes)).unwrap();
    let names: Vec<Vec<u8>> = reader.records().map(|r| r.unwrap().name).collect();
    assert_eq!(names, vec![b"r1".to_vec(), b"r2".to_vec(), b"r3".to_vec()]);
}

#[test]
fn a_region_query_against_the_in_memory_bai_returns_only_overlapping_records() {
    let opts = WriterConfig { create_index: true, ..Default::default() };
    let mut w = Writer::new(Vec::new(), sorted_header(), opts).unwrap();
    w.write_record(&mapped_record(b"inside", 100)).unwrap();
    w.write_record(&mapped_record(b"outside", 900)).unwrap();
    w.close().unwrap();
    let bytes = w.get_ref().clone();

    let mut builder = bam_core::index::builder::BinningIndexBuilder::new(1);
    for (name, start) in [(b"inside".to_vec(), 100u32), (b"outside".to_vec(), 900u32)] {
        let _ = name;
        let start0 = start - 1;
        let end0 = start0 + 36;
        builder
            .process_feature(
                0,
                start0,
                end0,
                bam_core::index::reg2bin::reg2bin(start0, end0),
                bam_core::index::bin::Chunk::new(bam_core::bgzf::VirtualPosition::MIN, bam_core::bgzf::VirtualPosition::MIN),
                true,
            )
            .unwrap();
    }
    let (references, no_coordinate) = builder.finish(1);
    let bai_index = bai::Index::new(references, Some(no_coordinate));

    let mut reader = Reader::new(Cursor::new(bytes)).unwrap();
    let hits: Vec<Vec<u8>> = reader
        .query(&bai_index, 0, 50, 200, false)
        .unwrap()
        .map(|r| r.unwrap().name)
        .collect();
    assert_eq!(hits, vec![b"inside".to_vec()]);
}

#[test]
fn create_index_writes_a_readable_bai_sidecar_to_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.bam");
    let opts = WriterConfig { create_index: true, create_md5: true, ..Default::default() };

    let mut w = Writer::create(&path, sorted_header(), opts).unwrap();
    w.write_record(&mapped_record(b"r1", 100)).unwrap();
    w.close().unwrap();

    let bai_path = path.with_extension("bam.bai");
    let md5_path = path.with_extension("bam.md5");
    assert!(bai_path.exists());
    assert!(md5_path.exists());

    let bai_file = std::fs::File::open(&bai_path).unwrap();
    let mut src = ByteSource::paged(bai_file);
    let index = bai::read(&mut src).unwrap();
    assert_eq!(index.references.len(), 1);
    assert!(index.references[0].is_some());

    let digest_text = std::fs::read_to_string(&md5_path).unwrap();
    assert_eq!(digest_text.trim().len(), 32);
}

#[test]
fn create_index_succeeds_across_multiple_references() {
    // A coordinate-sorted BAM spanning chr1..chrN is the normal case;
    // writing records across two references must not turn into an
    // `IndexOnly` failure that deletes the partial index.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("multi_ref.bam");
    let opts = WriterConfig { create_index: true, ..Default::default() };

    let mut w = Writer::create(&path, two_reference_sorted_header(), opts).unwrap();
    w.write_record(&mapped_record_on(b"chr1-r1", 0, 100)).unwrap();
    w.write_record(&mapped_record_on(b"chr1-r2", 0, 200)).unwrap();
    w.write_record(&mapped_record_on(b"chr2-r1", 1, 150)).unwrap();
    w.close().unwrap();

    let bai_path = path.with_extension("bam.bai");
    assert!(bai_path.exists(), "a failed index build must not leave a deleted/missing .bai behind");

    let bai_file = std::fs::File::open(&bai_path).unwrap();
    let mut src = ByteSource::paged(bai_file);
    let index = bai::read(&mut src).unwrap();
    assert_eq!(index.references.len(), 2);
    assert!(index.references[0].is_some(), "chr1 must be indexed");
    assert!(index.references[1].is_some(), "chr2 must be indexed");
    assert_eq!(index.references[0].as_ref().unwrap().metadata().aligned, 2);
    assert_eq!(index.references[1].as_ref().unwrap().metadata().aligned, 1);

    let bam_file = std::fs::File::open(&path).unwrap();
    let mut reader = Reader::new(bam_file).unwrap();
    let names: Vec<Vec<u8>> = reader.records().map(|r| r.unwrap().name).collect();
    assert_eq!(names, vec![b"chr1-r1".to_vec(), b"chr1-r2".to_vec(), b"chr2-r1".to_vec()]);
}
