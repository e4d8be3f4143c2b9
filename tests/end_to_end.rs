use std::io::Cursor;

use matroska_ebml::matroska::{
    ids, read_document, Block, BlockGroup, LacingType, SeekMode, Segment, TrackEntry, TrackType,
    WriterOptions,
};
use matroska_ebml::ReadOptions;

const MS: u64 = 1_000_000;

fn frame(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

// One track, two clusters, each holding a laced block, a single-frame block and a block group
// referencing the single frame.
fn build() -> (Segment, Vec<(u64, Vec<u8>)>) {
    let mut segment = Segment::new();
    segment
        .add_track(TrackEntry::new(1, TrackType::Video, "V_VP9").with_video(320, 240))
        .unwrap();
    let mut expected = Vec::new();
    for c in 0..2u64 {
        let start = c * 1000 * MS;
        let cluster = segment.new_cluster();

        let first = segment
            .add_frame(cluster, 1, start, frame(1, 100), LacingType::Auto)
            .unwrap();
        let laced = segment
            .add_frame(cluster, 1, start, frame(2, 120), LacingType::Auto)
            .unwrap();
        assert_eq!(first, laced);
        segment.add_cue(first).unwrap();
        expected.push((start, frame(1, 100)));
        expected.push((start, frame(2, 120)));

        // no lacing requested, so the open laced block is left alone
        segment
            .add_frame(cluster, 1, start + 33 * MS, frame(3, 80), LacingType::None)
            .unwrap();
        expected.push((start + 33 * MS, frame(3, 80)));

        let mut block = Block::new();
        block.add_frame(1, start + 66 * MS, frame(4, 60), LacingType::None).unwrap();
        let mut group = BlockGroup::new(block);
        group.add_reference(start + 33 * MS);
        segment.add_block_group(cluster, group).unwrap();
        expected.push((start + 66 * MS, frame(4, 60)));
    }
    (segment, expected)
}

#[test]
fn write_then_read() {
    let (mut segment, expected) = build();
    let mut cursor = segment
        .write_to(Cursor::new(Vec::new()), WriterOptions::default())
        .unwrap();
    cursor.set_position(0);
    let document = read_document(&mut cursor, &ReadOptions::default()).unwrap();
    let read = document.segment;

    assert_eq!(1, read.track_entries().len());
    assert_eq!(Some((320, 240)), read.track_entries()[0].video);
    assert_eq!(2, read.clusters().len());
    for cluster in read.clusters() {
        assert_eq!(3, cluster.entries().len());
    }

    let frames = read.frames();
    let got: Vec<_> = frames
        .iter()
        .map(|f| (f.start, f.data.unwrap().to_vec()))
        .collect();
    assert_eq!(expected, got);
    let keyframes: Vec<_> = frames.iter().map(|f| f.keyframe).collect();
    assert_eq!(vec![true, true, true, false, true, true, true, false], keyframes);

    let group = read.clusters()[1].entries()[2].group().unwrap();
    assert_eq!(&[1033 * MS][..], group.references());

    let cues = read.cues().unwrap();
    assert_eq!(2, cues.points().len());
    let first_cluster = read.clusters()[0].position().unwrap();
    assert_eq!(
        Some(read.relative_position(first_cluster).unwrap()),
        cues.timecode_position(500 * MS)
    );
    assert_eq!(Some(0), read.seek_cluster(500 * MS).map(|h| h.index()));
    assert_eq!(Some(1), read.seek_cluster(1500 * MS).map(|h| h.index()));

    let target = read.seek(1500 * MS, SeekMode::PreviousKeyframe).unwrap();
    assert_eq!(1, target.cluster.index());
    let resumed: Vec<_> = read.frames_from(&target).iter().map(|f| f.start).collect();
    assert_eq!(vec![1033 * MS, 1066 * MS], resumed);

    assert_eq!(read.locate(ids::CUES), segment.locate(ids::CUES));
}

#[test]
fn headers_only_then_load() {
    let (mut segment, expected) = build();
    let mut cursor = segment
        .write_to(Cursor::new(Vec::new()), WriterOptions::default())
        .unwrap();
    cursor.set_position(0);
    let mut read = read_document(&mut cursor, &ReadOptions::headers())
        .unwrap()
        .segment;

    // metadata is read in full whatever the scope
    assert_eq!("V_VP9", read.track_entries()[0].codec_id);
    assert!(read.frames().iter().all(|f| f.data.is_none()));
    let block = read.clusters()[0].entries()[0].block();
    assert_eq!(Some(120), block.frame_size(1));

    read.load_frames(&mut cursor).unwrap();
    let got: Vec<_> = read
        .frames()
        .iter()
        .map(|f| (f.start, f.data.unwrap().to_vec()))
        .collect();
    assert_eq!(expected, got);
}
