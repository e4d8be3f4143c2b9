//! The Matroska layer: segments, clusters, blocks and their indexes on top of the element tree.

use std::io::{Read, Seek};

use log::warn;

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::read::{read_ebml_head, ElementHeader, ReadOptions};
use crate::schema;

pub mod block;
pub mod cluster;
pub mod cues;
pub mod ids;
pub mod seek_head;
pub mod segment;
pub mod tracks;
pub mod writer;

pub use self::block::{best_lacing_for, Block, BlockGroup, DataBuffer, LacingType};
pub use self::cluster::{BlockEntry, BlockRef, Cluster, ClusterHandle};
pub use self::cues::{BlockPosition, CuePoint, CueReference, CueTrackPositions, Cues};
pub use self::seek_head::{Seek as SeekEntry, SeekHead};
pub use self::segment::{Frame, SeekMode, SeekTarget, Segment, SegmentBase};
pub use self::tracks::{
    info_element, CompressionAlgorithm, ContentCompression, ContentEncoding, TrackEntry, TrackType,
};
pub use self::writer::{SegmentWriter, WriterOptions};

/// A Matroska file: its EBML header and its first segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The EBML header.
    pub head: Element,
    /// The first segment.
    pub segment: Segment,
}

/// Reads the EBML header and the first segment of a stream. Other top-level elements before the
/// segment are skipped.
pub fn read_document<R: Read + Seek>(
    source: &mut R,
    options: &ReadOptions,
) -> EbmlResult<Document> {
    let head = read_ebml_head(source, options)?;
    while let Some(header) = ElementHeader::read(source)? {
        if header.id == ids::SEGMENT {
            let segment = Segment::read(source, &header, options)?;
            return Ok(Document { head, segment });
        }
        warn!(
            "skipping top-level {} ({}) at {}",
            schema::name_of(header.id),
            header.id,
            header.position
        );
        header.skip(source)?;
    }
    Err(EbmlError::MissingElement("Segment"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::std_elems;
    use std::io::Cursor;

    #[test]
    fn void_before_segment() {
        let mut bytes = Vec::new();
        std_elems::ebml_head("matroska", 4, 2).write(&mut bytes).unwrap();
        std_elems::void(10).write(&mut bytes).unwrap();
        let mut segment = Segment::new();
        let options = writer::WriterOptions {
            write_ebml_head: false,
            ..Default::default()
        };
        let mut cursor = Cursor::new(bytes);
        cursor.set_position(cursor.get_ref().len() as u64);
        let mut cursor = segment.write_to(cursor, options).unwrap();

        cursor.set_position(0);
        let document = read_document(&mut cursor, &ReadOptions::default()).unwrap();
        assert_eq!(Some("matroska".to_string()), document.head.get_string(std_elems::DOC_TYPE));
        assert_eq!(segment.base(), document.segment.base());
        assert_eq!(1_000_000, document.segment.timecode_scale());
    }

    #[test]
    fn no_segment() {
        let mut bytes = Vec::new();
        std_elems::ebml_head("webm", 4, 2).write(&mut bytes).unwrap();
        assert!(matches!(
            read_document(&mut Cursor::new(bytes), &ReadOptions::default()),
            Err(EbmlError::MissingElement("Segment"))
        ));
    }
}
