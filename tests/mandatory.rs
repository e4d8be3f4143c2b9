use std::io::Cursor;

use matroska_ebml::matroska::{ids, Segment, TrackEntry, TrackType, WriterOptions};
use matroska_ebml::{EbmlError, Element};

#[test]
fn segment_without_info() {
    let segment = Segment::empty();
    assert_eq!(vec!["Info"], segment.check_mandatory().unwrap());

    let mut segment = Segment::empty();
    match segment.write_to(Cursor::new(Vec::new()), WriterOptions::default()) {
        Err(EbmlError::MissingMandatory(names)) => assert_eq!(vec!["Info".to_string()], names),
        other => panic!("expected MissingMandatory, got {:?}", other),
    }
}

#[test]
fn every_missing_name_is_reported() {
    let mut segment = Segment::empty();
    segment.info_mut().set_uint(ids::TIMECODE_SCALE, 1_000_000).unwrap();
    segment
        .add_element(Element::master(
            ids::ATTACHMENTS,
            vec![Element::master(
                ids::ATTACHED_FILE,
                vec![Element::string(ids::FILE_NAME, "cover.jpg")],
            )],
        ))
        .unwrap();
    assert_eq!(
        vec!["MuxingApp", "WritingApp", "FileMimeType", "FileData", "FileUID"],
        segment.check_mandatory().unwrap()
    );
}

#[test]
fn complete_segment_passes() {
    let mut segment = Segment::new();
    segment
        .add_track(TrackEntry::new(1, TrackType::Audio, "A_VORBIS").with_audio(44_100.0, 2))
        .unwrap();
    assert!(segment.check_mandatory().unwrap().is_empty());
    segment.validate().unwrap();
}
