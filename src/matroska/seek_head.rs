//! The seek head: an index of where the top-level elements of a segment are.

use log::warn;

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::matroska::ids;
use crate::matroska::segment::SegmentBase;

/// One entry: an element ID and its segment-relative position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seek {
    /// The indexed element's ID.
    pub id: Id,
    /// Its position, relative to the segment's payload.
    pub position: u64,
}

/// A `SeekHead` element's entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeekHead {
    entries: Vec<Seek>,
    position: Option<u64>,
}
impl SeekHead {
    /// An empty seek head.
    pub fn new() -> Self {
        Default::default()
    }

    /// Indexes a rendered or read element of the segment at `base`.
    pub fn index_this(&mut self, element: &Element, base: &SegmentBase) -> EbmlResult<()> {
        let position = element
            .position()
            .ok_or(EbmlError::NotRendered(element.id()))?;
        self.add(element.id(), base.relative_position(position)?);
        Ok(())
    }

    /// Adds an entry.
    pub fn add(&mut self, id: Id, position: u64) {
        self.entries.push(Seek { id, position });
    }

    /// The entries, in file order.
    pub fn entries(&self) -> &[Seek] {
        &self.entries
    }

    /// The relative position of the first entry for `id`.
    pub fn find(&self, id: Id) -> Option<u64> {
        self.entries.iter().find(|s| s.id == id).map(|s| s.position)
    }

    /// Absolute position of the `SeekHead` element, if it was read.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the `SeekHead` element.
    pub fn to_element(&self) -> Element {
        let seeks = self
            .entries
            .iter()
            .map(|seek| {
                let (bytes, width) = seek.id.encode();
                Element::master(
                    ids::SEEK,
                    vec![
                        Element::binary(ids::SEEK_ID, &bytes[..width]),
                        Element::uint(ids::SEEK_POSITION, seek.position),
                    ],
                )
            })
            .collect();
        Element::master(ids::SEEK_HEAD, seeks)
    }

    /// Reads the entries of a `SeekHead` element, dropping malformed ones.
    pub fn from_element(element: &Element) -> Self {
        let mut head = SeekHead {
            entries: Vec::new(),
            position: element.position(),
        };
        for seek in element.find_all(ids::SEEK) {
            let id = seek
                .get_binary(ids::SEEK_ID)
                .and_then(|bytes| match Id::decode(bytes) {
                    Ok((id, width)) if width == bytes.len() => Some(id),
                    _ => None,
                });
            match (id, seek.get_uint(ids::SEEK_POSITION)) {
                (Some(id), Some(position)) => head.add(id, position),
                _ => warn!("dropping malformed seek entry at {:?}", seek.position()),
            }
        }
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::ReadOptions;
    use std::io::Cursor;

    #[test]
    fn entry_bytes() {
        let mut head = SeekHead::new();
        head.add(ids::INFO, 0x40);
        let element = head.to_element();
        let mut out = Vec::new();
        element.write(&mut out).unwrap();
        assert_eq!(
            vec![
                0x11, 0x4D, 0x9B, 0x74, 0x8E, // SeekHead
                0x4D, 0xBB, 0x8B, // Seek
                0x53, 0xAB, 0x84, 0x15, 0x49, 0xA9, 0x66, // SeekID
                0x53, 0xAC, 0x81, 0x40, // SeekPosition
            ],
            out
        );
    }

    #[test]
    fn index_rendered() {
        let base = SegmentBase {
            position: 10,
            header_size: 12,
        };
        let mut tracks = Element::master(ids::TRACKS, vec![]);
        let mut head = SeekHead::new();
        assert!(matches!(
            head.index_this(&tracks, &base),
            Err(EbmlError::NotRendered(ids::TRACKS))
        ));

        let mut cursor = Cursor::new(vec![0u8; 100]);
        cursor.set_position(50);
        tracks.render(&mut cursor).unwrap();
        head.index_this(&tracks, &base).unwrap();
        assert_eq!(Some(28), head.find(ids::TRACKS));
        assert_eq!(None, head.find(ids::CUES));
    }

    #[test]
    fn read_back() {
        let mut head = SeekHead::new();
        head.add(ids::INFO, 0x40);
        head.add(ids::CUES, 0x1_0000);
        let mut cursor = Cursor::new(Vec::new());
        head.to_element().render(&mut cursor).unwrap();
        cursor.set_position(0);
        let options = ReadOptions::default();
        let element = Element::read(&mut cursor, Some(ids::SEGMENT), &options)
            .unwrap()
            .unwrap();
        let read = SeekHead::from_element(&element);
        assert_eq!(head.entries(), read.entries());
        assert_eq!(Some(0), read.position());
    }
}
