//! EBML elements: an ID, a size, and either a value or more elements.
//!
//! Every element type shares the one `Element` struct; what an ID means is looked up in the
//! `schema` registry. Sizes are never cached: `data_size` and friends are computed from the
//! payload each time they are asked for, so a tree can be edited freely between renders.

use std::io::{Read, Seek, SeekFrom, Write};

use log::warn;

use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::read::{read_children, ElementHeader, ReadOptions, ReadScope};
use crate::schema::{self, ElementKind};
use crate::size::{coded_size_length, Size, MAX_WIDTH};
use crate::std_elems;
use crate::value::{DateValue, Value};

/// On-disk size of the CRC-32 element a checksummed master starts with.
pub(crate) const CRC_ELEMENT_SIZE: u64 = 6;

/// What an element holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The children of a master, in file order.
    Children(Vec<Element>),
    /// A decoded leaf value. Dummies hold their raw bytes as `Value::Binary`.
    Value(Value),
    /// A leaf whose payload of the given size was left on disk by a headers-only read.
    Skipped(u64),
}

/// An element of an EBML document.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub(crate) id: Id,
    pub(crate) payload: Payload,
    pub(crate) position: Option<u64>,
    pub(crate) size_length: Option<usize>,
    pub(crate) unknown_size: bool,
    pub(crate) dummy: bool,
    pub(crate) checksum: bool,
    pub(crate) checksum_valid: Option<bool>,
}
impl Element {
    fn with_payload(id: Id, payload: Payload) -> Self {
        Element {
            id,
            payload,
            position: None,
            size_length: None,
            unknown_size: false,
            dummy: false,
            checksum: false,
            checksum_valid: None,
        }
    }

    /// Creates an element of the given type: an empty master, or a leaf holding the schema default
    /// (or the zero value of its kind). IDs missing from the schema become empty binary leaves.
    pub fn new(id: Id) -> Self {
        let payload = match schema::lookup(id) {
            Some(ctx) if ctx.kind == ElementKind::Master => Payload::Children(Vec::new()),
            Some(ctx) => Payload::Value(
                ctx.default_value()
                    .or_else(|| Value::zero(ctx.kind))
                    .unwrap_or(Value::Binary(Vec::new())),
            ),
            None => Payload::Value(Value::Binary(Vec::new())),
        };
        Element::with_payload(id, payload)
    }

    /// Creates a master holding `children`.
    pub fn master(id: Id, children: Vec<Element>) -> Self {
        Element::with_payload(id, Payload::Children(children))
    }

    /// Creates a leaf holding `value`.
    pub fn with_value<V: Into<Value>>(id: Id, value: V) -> Self {
        Element::with_payload(id, Payload::Value(value.into()))
    }

    /// Creates an unsigned integer leaf.
    pub fn uint(id: Id, value: u64) -> Self {
        Element::with_value(id, value)
    }

    /// Creates a signed integer leaf.
    pub fn sint(id: Id, value: i64) -> Self {
        Element::with_value(id, value)
    }

    /// Creates a float leaf.
    pub fn float(id: Id, value: f64) -> Self {
        Element::with_value(id, value)
    }

    /// Creates a string leaf.
    pub fn string<S: Into<String>>(id: Id, value: S) -> Self {
        Element::with_value(id, value.into())
    }

    /// Creates a binary leaf.
    pub fn binary<B: Into<Vec<u8>>>(id: Id, value: B) -> Self {
        Element::with_value(id, value.into())
    }

    /// Creates a date leaf.
    pub fn date(id: Id, value: DateValue) -> Self {
        Element::with_value(id, value)
    }

    /// The element ID.
    pub fn id(&self) -> Id {
        self.id
    }

    /// The symbolic name of the element type.
    pub fn name(&self) -> &'static str {
        schema::name_of(self.id)
    }

    /// The payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// True for masters.
    pub fn is_master(&self) -> bool {
        match self.payload {
            Payload::Children(_) => true,
            _ => false,
        }
    }

    /// True if the element was kept verbatim because its ID is unknown or misplaced.
    pub fn is_dummy(&self) -> bool {
        self.dummy
    }

    /// Absolute position of the element header, once read or rendered.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Absolute position of the first payload byte, once read or rendered.
    pub fn data_position(&self) -> Option<u64> {
        self.position.map(|p| p + self.header_size())
    }

    /// The children of a master. Leaves have none.
    pub fn children(&self) -> &[Element] {
        match self.payload {
            Payload::Children(ref children) => children,
            _ => &[],
        }
    }

    /// The children of a master, for editing.
    pub fn children_mut(&mut self) -> EbmlResult<&mut Vec<Element>> {
        match self.payload {
            Payload::Children(ref mut children) => Ok(children),
            _ => Err(EbmlError::NotAMaster(self.id)),
        }
    }

    /// The leaf value, if loaded.
    pub fn value(&self) -> Option<&Value> {
        match self.payload {
            Payload::Value(ref v) => Some(v),
            _ => None,
        }
    }

    /// Replaces the payload with a leaf value.
    pub fn set_value<V: Into<Value>>(&mut self, value: V) {
        self.payload = Payload::Value(value.into());
    }

    /// The value as an unsigned integer.
    pub fn as_uint(&self) -> Option<u64> {
        self.value().and_then(Value::as_uint)
    }

    /// The value as a signed integer.
    pub fn as_sint(&self) -> Option<i64> {
        self.value().and_then(Value::as_sint)
    }

    /// The value as a float.
    pub fn as_float(&self) -> Option<f64> {
        self.value().and_then(Value::as_float)
    }

    /// The value as a string.
    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }

    /// The value as binary data.
    pub fn as_binary(&self) -> Option<&[u8]> {
        self.value().and_then(Value::as_binary)
    }

    /// The value as a date.
    pub fn as_date(&self) -> Option<DateValue> {
        self.value().and_then(Value::as_date)
    }

    /// Forces the width of the size field. A width too small for the payload is widened when
    /// rendering.
    pub fn set_size_length(&mut self, width: usize) -> EbmlResult<()> {
        if width == 0 || width > MAX_WIDTH {
            return Err(EbmlError::ValueOutOfRange(width as i128));
        }
        self.size_length = Some(width);
        Ok(())
    }

    /// The forced width of the size field, if any.
    pub fn size_length(&self) -> Option<usize> {
        self.size_length
    }

    /// Writes the size field as the unknown size. The width defaults to 8 bytes unless set with
    /// `set_size_length`.
    pub fn set_unknown_size(&mut self, unknown: bool) {
        self.unknown_size = unknown;
    }

    /// True if the size field is (or was read as) the unknown size.
    pub fn is_unknown_size(&self) -> bool {
        self.unknown_size
    }

    /// Bytes taken by the payload. For an unknown-size master this is still the real size of its
    /// children.
    pub fn data_size(&self) -> u64 {
        match self.payload {
            Payload::Children(ref children) => {
                let crc = if self.checksum { CRC_ELEMENT_SIZE } else { 0 };
                children.iter().map(Element::total_size).sum::<u64>() + crc
            }
            Payload::Value(ref v) => v.data_size(),
            Payload::Skipped(size) => size,
        }
    }

    fn size_width(&self) -> usize {
        if self.unknown_size {
            self.size_length.unwrap_or(MAX_WIDTH)
        } else {
            coded_size_length(self.data_size()).max(self.size_length.unwrap_or(0))
        }
    }

    /// Bytes taken by the ID and the size field.
    pub fn header_size(&self) -> u64 {
        (self.id.get_width() + self.size_width()) as u64
    }

    /// Bytes taken by the whole element.
    pub fn total_size(&self) -> u64 {
        self.header_size() + self.data_size()
    }

    /// The size field as it will be written.
    pub fn coded_size(&self) -> EbmlResult<Size> {
        if self.unknown_size {
            Size::unknown(self.size_width())
        } else {
            Size::with_width(self.data_size(), self.size_width())
        }
    }

    /// Writes the element at the current stream position, recording the positions of it and all
    /// its descendants. Returns the number of bytes written.
    pub fn render<W: Write + Seek>(&mut self, target: &mut W) -> EbmlResult<u64> {
        let start = target.stream_position()?;
        self.assign_positions(start);
        self.write(target)?;
        Ok(self.total_size())
    }

    /// Records the positions the element and its descendants would have if written at `at`.
    pub(crate) fn assign_positions(&mut self, at: u64) {
        self.position = Some(at);
        let crc = if self.checksum { CRC_ELEMENT_SIZE } else { 0 };
        let mut offset = at + self.header_size() + crc;
        if let Payload::Children(ref mut children) = self.payload {
            for child in children.iter_mut() {
                child.assign_positions(offset);
                offset += child.total_size();
            }
        }
    }

    /// Writes the element without recording positions.
    pub fn write<W: Write>(&self, target: &mut W) -> EbmlResult<()> {
        self.id.write(target)?;
        self.coded_size()?.write(target)?;
        match self.payload {
            Payload::Value(ref v) => v.write(target),
            Payload::Skipped(_) => Err(EbmlError::DataNotLoaded(self.id)),
            Payload::Children(ref children) if self.checksum => {
                let mut body = Vec::new();
                for child in children {
                    child.write(&mut body)?;
                }
                std_elems::crc32_element(crate::container::crc32(&body)).write(target)?;
                target.write_all(&body)?;
                Ok(())
            }
            Payload::Children(ref children) => {
                for child in children {
                    child.write(target)?;
                }
                Ok(())
            }
        }
    }

    /// Reads the next element. `parent` is the master being read (`None` at the top level); it
    /// decides whether the element is in place or becomes a dummy. Returns `None` at the end of
    /// the stream.
    pub fn read<R: Read + Seek>(
        source: &mut R,
        parent: Option<Id>,
        options: &ReadOptions,
    ) -> EbmlResult<Option<Element>> {
        match ElementHeader::read(source)? {
            Some(header) => Element::read_body(source, &header, parent, options, 0).map(Some),
            None => Ok(None),
        }
    }

    /// Reads the payload of an element whose header has just been read.
    pub(crate) fn read_body<R: Read + Seek>(
        source: &mut R,
        header: &ElementHeader,
        parent: Option<Id>,
        options: &ReadOptions,
        depth: usize,
    ) -> EbmlResult<Element> {
        let ctx = match schema::lookup(header.id) {
            Some(ctx) if ctx.allows_parent(parent) => ctx,
            _ => return Element::read_dummy(source, header, parent, options),
        };

        let payload = if ctx.kind == ElementKind::Master {
            if depth >= options.max_depth {
                return Err(EbmlError::RecursionLimit(depth));
            }
            let mut children = Vec::new();
            read_children(source, header, |source, child| {
                let depth = depth + 1;
                children.extend(Element::read_child(source, &child, header.id, options, depth)?);
                Ok(())
            })?;
            Payload::Children(children)
        } else {
            let size = header
                .size
                .get_value()
                .ok_or(EbmlError::UnknownSizeNotAllowed(header.id))?;
            match options.scope {
                ReadScope::Full => Payload::Value(Value::read(source, ctx.kind, header.id, size)?),
                ReadScope::Headers => {
                    header.skip(source)?;
                    Payload::Skipped(size)
                }
            }
        };

        let mut element = Element::from_header(header, payload);
        if element.children().first().map(Element::id) == Some(std_elems::CRC32) {
            element.take_checksum(source)?;
        }
        Ok(element)
    }

    /// Reads a child of `parent`, or skips it (returning `None`) if it does not belong there and
    /// dummies are not allowed.
    pub(crate) fn read_child<R: Read + Seek>(
        source: &mut R,
        child: &ElementHeader,
        parent: Id,
        options: &ReadOptions,
        depth: usize,
    ) -> EbmlResult<Option<Element>> {
        if !schema::is_legal_child(Some(parent), child.id) && !options.allow_dummy {
            warn!(
                "skipping {} ({}) at {} in {}",
                schema::name_of(child.id),
                child.id,
                child.position,
                schema::name_of(parent)
            );
            child.skip(source)?;
            return Ok(None);
        }
        Element::read_body(source, child, Some(parent), options, depth).map(Some)
    }

    fn from_header(header: &ElementHeader, payload: Payload) -> Self {
        Element {
            position: Some(header.position),
            size_length: Some(header.size.get_width()),
            unknown_size: header.size.is_unknown(),
            ..Element::with_payload(header.id, payload)
        }
    }

    fn read_dummy<R: Read + Seek>(
        source: &mut R,
        header: &ElementHeader,
        parent: Option<Id>,
        options: &ReadOptions,
    ) -> EbmlResult<Element> {
        let size = header
            .size
            .get_value()
            .ok_or(EbmlError::UnknownSizeNotAllowed(header.id))?;
        warn!(
            "keeping {} ({}) at {} in {} as a dummy",
            schema::name_of(header.id),
            header.id,
            header.position,
            parent.map_or("the top level", schema::name_of)
        );
        let payload = match options.scope {
            ReadScope::Full => {
                Payload::Value(Value::read(source, ElementKind::Binary, header.id, size)?)
            }
            ReadScope::Headers => {
                header.skip(source)?;
                Payload::Skipped(size)
            }
        };
        let mut element = Element::from_header(header, payload);
        element.dummy = true;
        Ok(element)
    }

    // Moves a leading CRC-32 child into the checksum flag, verifying it against the bytes that
    // follow it. Expects the stream at the end of the master and leaves it there.
    fn take_checksum<R: Read + Seek>(&mut self, source: &mut R) -> EbmlResult<()> {
        let end = source.stream_position()?;
        let mut crc = match self.payload {
            Payload::Children(ref mut children) => children.remove(0),
            _ => return Ok(()),
        };
        crc.load_data(source)?;
        let stored = crc
            .as_binary()
            .filter(|b| b.len() == 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));

        let crc_end = crc.position.map_or(end, |p| p + crc.total_size());
        source.seek(SeekFrom::Start(crc_end))?;
        let mut body = Vec::new();
        (&mut *source)
            .take(end.saturating_sub(crc_end))
            .read_to_end(&mut body)?;
        source.seek(SeekFrom::Start(end))?;

        let valid = stored == Some(crate::container::crc32(&body));
        if !valid {
            warn!("checksum mismatch in {} at {:?}", self.name(), self.position);
        }
        self.checksum = true;
        self.checksum_valid = Some(valid);
        Ok(())
    }

    /// Loads the payloads a headers-only read left on disk, recursively.
    pub fn load_data<R: Read + Seek>(&mut self, source: &mut R) -> EbmlResult<()> {
        match self.payload {
            Payload::Skipped(size) => {
                let position = self
                    .data_position()
                    .ok_or(EbmlError::DataNotLoaded(self.id))?;
                let kind = match schema::lookup(self.id) {
                    Some(ctx) if !self.dummy => ctx.kind,
                    _ => ElementKind::Binary,
                };
                source.seek(SeekFrom::Start(position))?;
                self.payload = Payload::Value(Value::read(source, kind, self.id, size)?);
            }
            Payload::Children(ref mut children) => {
                for child in children.iter_mut() {
                    child.load_data(source)?;
                }
            }
            Payload::Value(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matroska::ids;
    use std::io::Cursor;

    fn head() -> Element {
        Element::master(
            std_elems::EBML,
            vec![
                Element::uint(std_elems::EBML_VERSION, 1),
                Element::string(std_elems::DOC_TYPE, "webm"),
            ],
        )
    }

    fn rendered(element: &mut Element) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let written = element.render(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(written, bytes.len() as u64);
        bytes
    }

    #[test]
    fn defaults() {
        assert_eq!(Some(1), Element::new(std_elems::EBML_VERSION).as_uint());
        assert_eq!(Some("matroska"), Element::new(std_elems::DOC_TYPE).as_str());
        assert_eq!(Some(0), Element::new(ids::TRACK_NUMBER).as_uint());
        assert!(Element::new(ids::CLUSTER).is_master());
    }

    #[test]
    fn render_master() {
        let mut element = head();
        assert_eq!(11, element.data_size());
        assert_eq!(5, element.header_size());
        assert_eq!(
            vec![
                0x1A, 0x45, 0xDF, 0xA3, 0x8B, 0x42, 0x86, 0x81, 0x01, 0x42, 0x82, 0x84, b'w',
                b'e', b'b', b'm',
            ],
            rendered(&mut element)
        );
        assert_eq!(Some(0), element.position());
        assert_eq!(Some(5), element.children()[0].position());
        assert_eq!(Some(9), element.children()[1].position());
        assert_eq!(Some(12), element.children()[1].data_position());
    }

    #[test]
    fn forced_and_unknown_sizes() {
        let mut element = head();
        element.set_size_length(4).unwrap();
        let bytes = rendered(&mut element);
        assert_eq!(&[0x10, 0x00, 0x00, 0x0B], &bytes[4..8]);

        element.set_unknown_size(true);
        element.set_size_length(5).unwrap();
        let bytes = rendered(&mut element);
        assert_eq!(&[0x0F, 0xFF, 0xFF, 0xFF, 0xFF], &bytes[4..9]);
        assert_eq!(20, bytes.len());

        assert!(element.set_size_length(9).is_err());
    }

    #[test]
    fn equality() {
        let tag = |value| Element::master(ids::TAGS, vec![Element::uint(ids::TAG_DEFAULT, value)]);
        assert_eq!(tag(1), tag(1));
        assert_ne!(tag(1), tag(0));
        assert_ne!(Element::master(ids::TAGS, vec![]), tag(1));
    }

    #[test]
    fn read_back() {
        let bytes = rendered(&mut head());
        let mut cursor = Cursor::new(bytes);
        let element = Element::read(&mut cursor, None, &ReadOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(std_elems::EBML, element.id());
        assert_eq!(2, element.children().len());
        assert_eq!(Some("webm"), element.children()[1].as_str());
        assert_eq!(Some(9), element.children()[1].position());
        assert!(Element::read(&mut cursor, None, &ReadOptions::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn dummies() {
        let mut element = head();
        element
            .children_mut()
            .unwrap()
            .insert(1, Element::binary(Id::new(0x4ABC), vec![1, 2, 3]));
        let bytes = rendered(&mut element);

        let read = Element::read(&mut Cursor::new(&bytes), None, &ReadOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(3, read.children().len());
        assert!(read.children()[1].is_dummy());
        assert_eq!(Some(&[1u8, 2, 3][..]), read.children()[1].as_binary());
        let mut copy = read.clone();
        assert_eq!(bytes, rendered(&mut copy));

        let options = ReadOptions {
            allow_dummy: false,
            ..ReadOptions::default()
        };
        let read = Element::read(&mut Cursor::new(&bytes), None, &options)
            .unwrap()
            .unwrap();
        assert_eq!(2, read.children().len());
        assert_eq!(Some("webm"), read.children()[1].as_str());
    }

    #[test]
    fn misplaced_element_becomes_dummy() {
        // a Cluster Timecode inside the EBML header
        let mut element = Element::master(std_elems::EBML, vec![Element::uint(ids::TIMECODE, 3)]);
        let bytes = rendered(&mut element);
        let read = Element::read(&mut Cursor::new(&bytes), None, &ReadOptions::default())
            .unwrap()
            .unwrap();
        assert!(read.children()[0].is_dummy());
        assert_eq!(Some(&[3u8][..]), read.children()[0].as_binary());
    }

    #[test]
    fn unknown_size_ends_at_illegal_element() {
        let mut info = Element::master(ids::INFO, vec![Element::uint(ids::TIMECODE_SCALE, 1000)]);
        let mut segment = Element::master(ids::SEGMENT, vec![]);
        segment.set_unknown_size(true);
        segment.set_size_length(1).unwrap();

        let mut cursor = Cursor::new(Vec::new());
        segment.render(&mut cursor).unwrap();
        info.render(&mut cursor).unwrap();
        head().render(&mut cursor).unwrap();
        cursor.set_position(0);

        let read = Element::read(&mut cursor, None, &ReadOptions::default())
            .unwrap()
            .unwrap();
        assert!(read.is_unknown_size());
        assert_eq!(1, read.children().len());
        assert_eq!(Some(1000), read.children()[0].get_uint(ids::TIMECODE_SCALE));

        let next = Element::read(&mut cursor, None, &ReadOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(std_elems::EBML, next.id());
    }

    #[test]
    fn recursion_limit() {
        let mut atom = Element::master(ids::CHAPTER_ATOM, vec![]);
        for _ in 0..4 {
            atom = Element::master(ids::CHAPTER_ATOM, vec![atom]);
        }
        let mut chapters = Element::master(
            ids::CHAPTERS,
            vec![Element::master(ids::EDITION_ENTRY, vec![atom])],
        );
        let bytes = rendered(&mut chapters);

        let options = ReadOptions {
            max_depth: 4,
            ..ReadOptions::default()
        };
        let result = Element::read(&mut Cursor::new(&bytes), Some(ids::SEGMENT), &options);
        assert!(matches!(result, Err(EbmlError::RecursionLimit(4))));
        let read = Element::read(&mut Cursor::new(&bytes), Some(ids::SEGMENT), &Default::default())
            .unwrap()
            .unwrap();
        assert!(!read.is_dummy());
    }

    #[test]
    fn deferred_data() {
        let bytes = rendered(&mut head());
        let mut cursor = Cursor::new(bytes);
        let mut element = Element::read(&mut cursor, None, &ReadOptions::headers())
            .unwrap()
            .unwrap();
        assert_eq!(&Payload::Skipped(4), element.children()[1].payload());
        assert_eq!(16, element.total_size());
        assert!(matches!(
            element.write(&mut Vec::new()),
            Err(EbmlError::DataNotLoaded(_))
        ));

        element.load_data(&mut cursor).unwrap();
        assert_eq!(Some("webm"), element.children()[1].as_str());
    }
}
