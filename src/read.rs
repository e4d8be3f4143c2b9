//! Reading EBML documents

use std::io::{Read, Seek, SeekFrom};

use log::trace;

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::schema;
use crate::size::Size;
use crate::std_elems;

/// How much of each element a read materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// Everything, including leaf payloads and frame data.
    Full,
    /// The tree structure only. Leaf payloads are left on disk (see `Element::load_data`), and
    /// blocks read only their head and lace sizes.
    Headers,
}

/// Options steering a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// How much to materialize.
    pub scope: ReadScope,
    /// Keep elements with unknown or misplaced IDs as opaque dummies instead of skipping them.
    pub allow_dummy: bool,
    /// The deepest master nesting accepted before failing with `RecursionLimit`.
    pub max_depth: usize,
}
impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            scope: ReadScope::Full,
            allow_dummy: true,
            max_depth: 64,
        }
    }
}
impl ReadOptions {
    /// The default options with a headers-only scope.
    pub fn headers() -> Self {
        ReadOptions {
            scope: ReadScope::Headers,
            ..ReadOptions::default()
        }
    }
}

/// The ID and size of an element, and where it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    /// The element ID.
    pub id: Id,
    /// The payload size, possibly unknown.
    pub size: Size,
    /// Absolute position of the first byte of the ID.
    pub position: u64,
    /// Bytes taken by the ID and the size.
    pub header_size: usize,
}
impl ElementHeader {
    /// Reads a header at the current position. Returns `None` at a clean end of the stream.
    pub fn read<R: Read + Seek>(source: &mut R) -> EbmlResult<Option<Self>> {
        let position = source.stream_position()?;
        let mut first = [0u8; 1];
        if source.read(&mut first)? == 0 {
            return Ok(None);
        }
        source.seek(SeekFrom::Start(position))?;

        let id = Id::load(source)?;
        let size = Size::load(source).map_err(|e| match e {
            EbmlError::MalformedVarInt { .. } => EbmlError::MalformedVarInt {
                offset: position + id.get_width() as u64,
            },
            e => e,
        })?;
        Ok(Some(ElementHeader {
            id,
            size,
            position,
            header_size: id.get_width() + size.get_width(),
        }))
    }

    /// Absolute position of the first payload byte.
    pub fn data_position(&self) -> u64 {
        self.position + self.header_size as u64
    }

    /// Absolute position just past the payload, if the size is known.
    pub fn end(&self) -> Option<u64> {
        self.size.get_value().map(|size| self.data_position() + size)
    }

    /// Moves the stream past this element.
    pub fn skip<R: Seek>(&self, source: &mut R) -> EbmlResult<()> {
        let end = self.end().ok_or(EbmlError::UnknownSizeNotAllowed(self.id))?;
        source.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}

/// Walks the children of `parent`, handing each header to `on_child` with the stream positioned
/// at the child's payload. Whatever `on_child` leaves unread of a sized child is skipped.
///
/// A parent with an unknown size ends at the end of the stream or at the first known element
/// that cannot be its child; the stream is left at that element.
pub fn read_children<R, F>(
    source: &mut R,
    parent: &ElementHeader,
    mut on_child: F,
) -> EbmlResult<()>
where
    R: Read + Seek,
    F: FnMut(&mut R, ElementHeader) -> EbmlResult<()>,
{
    let end = parent.end();
    loop {
        if let Some(end) = end {
            if source.stream_position()? >= end {
                break;
            }
        }
        let child = match ElementHeader::read(source)? {
            Some(child) => child,
            None if end.is_none() => break,
            None => return Err(EbmlError::UnexpectedEof),
        };

        if end.is_none()
            && schema::lookup(child.id).is_some()
            && !schema::is_legal_child(Some(parent.id), child.id)
        {
            trace!(
                "{} at {} ends {}",
                schema::name_of(child.id),
                child.position,
                schema::name_of(parent.id)
            );
            source.seek(SeekFrom::Start(child.position))?;
            break;
        }
        if let (Some(end), Some(child_end)) = (end, child.end()) {
            if child_end > end {
                return Err(EbmlError::ElementOverrun {
                    id: child.id,
                    position: child.position,
                });
            }
        }
        if child.size.is_unknown()
            && !schema::lookup(child.id).map_or(false, |ctx| ctx.unknown_size_allowed)
        {
            return Err(EbmlError::UnknownSizeNotAllowed(child.id));
        }

        on_child(source, child)?;
        if let Some(child_end) = child.end() {
            source.seek(SeekFrom::Start(child_end))?;
        }
    }
    Ok(())
}

/// Reads the EBML header which every document starts with.
pub fn read_ebml_head<R: Read + Seek>(
    source: &mut R,
    options: &ReadOptions,
) -> EbmlResult<Element> {
    let header = ElementHeader::read(source)?.ok_or(EbmlError::UnexpectedEof)?;
    if header.id != std_elems::EBML {
        return Err(EbmlError::WrongId {
            expected: std_elems::EBML,
            found: header.id,
        });
    }
    Element::read_body(source, &header, None, options, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn load_valid_document() {
        // This is the header of a valid document
        let data = include_bytes!("../tests/min_valid_header");
        let mut cursor = Cursor::new(&data[..]);

        let head = read_ebml_head(&mut cursor, &ReadOptions::default()).unwrap();
        assert_eq!(Some("matroska"), head.get_string(std_elems::DOC_TYPE).as_deref());
        assert_eq!(Some(4), head.get_uint(std_elems::DOC_TYPE_VERSION));
        assert_eq!(Some(2), head.get_uint(std_elems::DOC_TYPE_READ_VERSION));
        assert_eq!(Some(1), head.get_uint(std_elems::EBML_VERSION));
        assert_eq!(data.len() as u64, cursor.position());
    }

    #[test]
    fn wrong_head() {
        let mut cursor = Cursor::new(vec![0x18, 0x53, 0x80, 0x67, 0x80]);
        match read_ebml_head(&mut cursor, &ReadOptions::default()) {
            Err(EbmlError::WrongId { found, .. }) => assert_eq!(Id::new(0x1853_8067), found),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn header_positions() {
        let mut cursor = Cursor::new(vec![0x00, 0xEC, 0x82, 0x00, 0x00]);
        cursor.set_position(1);
        let header = ElementHeader::read(&mut cursor).unwrap().unwrap();
        assert_eq!(std_elems::VOID, header.id);
        assert_eq!(Some(2), header.size.get_value());
        assert_eq!(3, header.data_position());
        assert_eq!(Some(5), header.end());

        header.skip(&mut cursor).unwrap();
        assert!(ElementHeader::read(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn overrun() {
        // a Void claiming 2 bytes holding a Void claiming 4
        let mut cursor = Cursor::new(vec![0xEC, 0x82, 0xEC, 0x84, 0, 0, 0, 0]);
        let parent = ElementHeader::read(&mut cursor).unwrap().unwrap();
        let result = read_children(&mut cursor, &parent, |_, _| Ok(()));
        assert!(matches!(result, Err(EbmlError::ElementOverrun { position: 2, .. })));
    }

    #[test]
    fn malformed_size() {
        let mut cursor = Cursor::new(vec![0xEC, 0x00, 0x00]);
        assert!(matches!(
            ElementHeader::read(&mut cursor),
            Err(EbmlError::MalformedVarInt { offset: 1 })
        ));
    }
}
