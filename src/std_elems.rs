//! Standard EBML elements common to all documents: the EBML header which every document begins
//! with, and the global Void and CRC-32 elements.

use crate::element::Element;
use crate::id::Id;
use crate::schema::{Cardinality, DefaultValue, ElementKind, Parents, SemanticContext};
use crate::size::coded_size_length;

/// The EBML header which all documents must begin with.
pub const EBML: Id = Id::new(0x1A45_DFA3);
/// A member of the header; the EBML version the document conforms to.
pub const EBML_VERSION: Id = Id::new(0x4286);
/// A member of the header; the minimum EBML version a parser must be aware of to read the
/// document.
pub const EBML_READ_VERSION: Id = Id::new(0x42F7);
/// A member of the header; an upper bound on the width of ID used in the document.
pub const EBML_MAX_ID_LENGTH: Id = Id::new(0x42F2);
/// A member of the header; an upper bound on the width of size used in the document.
pub const EBML_MAX_SIZE_LENGTH: Id = Id::new(0x42F3);
/// A member of the header; an ASCII string that identifies the type of document.
pub const DOC_TYPE: Id = Id::new(0x4282);
/// A member of the header; the version of the document type to which this document conforms.
pub const DOC_TYPE_VERSION: Id = Id::new(0x4287);
/// A member of the header; the minimum version of the document type an interpreter has to support
/// to be able to read the document.
pub const DOC_TYPE_READ_VERSION: Id = Id::new(0x4285);

/// Padding, legal anywhere. Its content is ignored.
pub const VOID: Id = Id::new(0xEC);
/// The CRC-32 of the rest of its parent's payload, stored little-endian.
pub const CRC32: Id = Id::new(0xBF);

pub(crate) fn schema() -> Vec<SemanticContext> {
    use self::ElementKind::*;

    let header = Parents::Of(&[EBML]);
    vec![
        SemanticContext::new(EBML, "EBML", Master, Parents::Root)
            .cardinality(Cardinality::OneOrMany),
        SemanticContext::new(EBML_VERSION, "EBMLVersion", UInt, header)
            .default(DefaultValue::UInt(1)),
        SemanticContext::new(EBML_READ_VERSION, "EBMLReadVersion", UInt, header)
            .default(DefaultValue::UInt(1)),
        SemanticContext::new(EBML_MAX_ID_LENGTH, "EBMLMaxIDLength", UInt, header)
            .default(DefaultValue::UInt(4)),
        SemanticContext::new(EBML_MAX_SIZE_LENGTH, "EBMLMaxSizeLength", UInt, header)
            .default(DefaultValue::UInt(8)),
        SemanticContext::new(DOC_TYPE, "DocType", String, header)
            .default(DefaultValue::Str("matroska")),
        SemanticContext::new(DOC_TYPE_VERSION, "DocTypeVersion", UInt, header)
            .default(DefaultValue::UInt(1)),
        SemanticContext::new(DOC_TYPE_READ_VERSION, "DocTypeReadVersion", UInt, header)
            .default(DefaultValue::UInt(1)),
        SemanticContext::new(VOID, "Void", Binary, Parents::Any).repeatable(),
        SemanticContext::new(CRC32, "CRC-32", Binary, Parents::Any),
    ]
}

/// Builds an EBML header for the given document type. Fields equal to their defaults are still
/// written, as readers commonly expect them.
pub fn ebml_head(doc_type: &str, version: u64, read_version: u64) -> Element {
    Element::master(
        EBML,
        vec![
            Element::uint(EBML_VERSION, 1),
            Element::uint(EBML_READ_VERSION, 1),
            Element::uint(EBML_MAX_ID_LENGTH, 4),
            Element::uint(EBML_MAX_SIZE_LENGTH, 8),
            Element::string(DOC_TYPE, doc_type),
            Element::uint(DOC_TYPE_VERSION, version),
            Element::uint(DOC_TYPE_READ_VERSION, read_version),
        ],
    )
}

/// Builds a Void element taking exactly `total_size` bytes on disk, header included. The
/// smallest Void is 2 bytes; smaller requests are rounded up to that.
pub fn void(total_size: u64) -> Element {
    let total_size = total_size.max(2);
    // the ID takes one byte; find the size width whose payload fills the rest
    let mut width = 1;
    while coded_size_length(total_size - 1 - width as u64) > width {
        width += 1;
    }
    let mut element = Element::binary(VOID, vec![0u8; (total_size - 1 - width as u64) as usize]);
    element.size_length = Some(width);
    element
}

/// Builds a CRC-32 element holding `crc`.
pub fn crc32_element(crc: u32) -> Element {
    Element::binary(CRC32, crc.to_le_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn head_bytes() {
        let mut head = ebml_head("matroska", 4, 2);
        let mut cursor = Cursor::new(Vec::new());
        head.render(&mut cursor).unwrap();
        assert_eq!(&include_bytes!("../tests/min_valid_header")[..], &cursor.into_inner()[..]);
        assert!(head.check_mandatory().is_empty());
    }

    #[test]
    fn void_sizes() {
        for total in &[2u64, 3, 100, 128, 129, 130, 16_386, 16_387, 4096] {
            let element = void(*total);
            assert_eq!(*total, element.total_size(), "void of {}", total);
            let mut out = Vec::new();
            element.write(&mut out).unwrap();
            assert_eq!(*total, out.len() as u64);
        }
        assert_eq!(2, void(0).total_size());
    }

    #[test]
    fn crc_element() {
        let mut out = Vec::new();
        crc32_element(0x1234_5678).write(&mut out).unwrap();
        assert_eq!(vec![0xBF, 0x84, 0x78, 0x56, 0x34, 0x12], out);
    }
}
