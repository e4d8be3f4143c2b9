//! EBML element IDs.

use std::fmt;
use std::io::{Read, Write};

use crate::error::{EbmlError, EbmlResult};
use crate::size::read_fully;

/// The maximum width of an ID, in bytes.
pub const MAX_ID_WIDTH: usize = 4;

/// An EBML ID. These are coded like sizes, except there are additional reserved values and a
/// maximum width of 4. The ID is kept in its encoded form (marker bit included), which is how
/// element IDs are conventionally written: the EBML header is `0x1A45DFA3`, not `0x0A45DFA3`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u32);
impl Id {
    /// Wraps an encoded ID without checking it. Used for the schema tables, whose IDs are known
    /// to be well formed.
    pub const fn new(encoded: u32) -> Self {
        Id(encoded)
    }

    /// Wraps an encoded ID, returning `None` if it is not a legal EBML ID.
    pub fn from_encoded(encoded: u32) -> Option<Self> {
        let (buf, width) = Id(encoded).encode();
        match Id::decode(&buf[..width]) {
            Ok((id, _)) if id.0 == encoded => Some(id),
            _ => None,
        }
    }

    /// Constructs an EBML Class A ID (width 1) from its literal value, returning `None` if the
    /// value is not in range for the ID. The range of valid values is 0x01 to 0x7E inclusive, so
    /// there are 126 possible Class A IDs.
    pub const fn new_class_a(data: u8) -> Option<Self> {
        if data == 0 || data >= 0x7F {
            None
        } else {
            Some(Id(0x80 | data as u32))
        }
    }

    /// Constructs an EBML Class B ID (width 2) from its literal value, returning `None` if the
    /// value is not in range for the ID. The range of valid values is 0x7F to 0x3FFE inclusive, so
    /// there are 16256 Class B IDs.
    pub const fn new_class_b(data: u16) -> Option<Self> {
        if data < 0x7F || data >= 0x3FFF {
            None
        } else {
            Some(Id(0x4000 | data as u32))
        }
    }

    /// Constructs an EBML Class C ID (width 3) from its literal value, returning `None` if the
    /// value is not in range for the ID. The range of valid values is 0x3FFF to 0x1F_FFFE
    /// inclusive, so there are 2080768 Class C IDs.
    pub const fn new_class_c(data: u32) -> Option<Self> {
        if data < 0x3FFF || data >= 0x1F_FFFF {
            None
        } else {
            Some(Id(0x20_0000 | data))
        }
    }

    /// Constructs an EBML Class D ID (width 4) from its literal value, returning `None` if the
    /// value is not in range for the ID. The range of valid values is 0x001F_FFFF to 0x0FFF_FFFE
    /// inclusive, so there are 266338304 Class D IDs.
    pub const fn new_class_d(data: u32) -> Option<Self> {
        if data < 0x1F_FFFF || data >= 0x0FFF_FFFF {
            None
        } else {
            Some(Id(0x1000_0000 | data))
        }
    }

    /// The encoded value, marker bit included.
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// The value with the marker bit stripped.
    pub const fn literal(&self) -> u32 {
        self.0 & !(1 << (7 * self.get_width()))
    }

    /// Gets the width of the ID. A width of 1 means the ID is Class A, width of 2 means Class B,
    /// etc.
    pub const fn get_width(&self) -> usize {
        if self.0 <= 0xFF {
            1
        } else if self.0 <= 0xFFFF {
            2
        } else if self.0 <= 0xFF_FFFF {
            3
        } else {
            4
        }
    }

    /// Encodes the ID. Only the first `width` bytes of the array are meaningful.
    pub fn encode(&self) -> ([u8; MAX_ID_WIDTH], usize) {
        let width = self.get_width();
        let mut buf = [0u8; MAX_ID_WIDTH];
        for i in 0..width {
            buf[width - 1 - i] = (self.0 >> (8 * i)) as u8;
        }
        (buf, width)
    }

    /// Writes the ID to a data sink, returning the number of bytes written.
    pub fn write<W: Write + ?Sized>(&self, target: &mut W) -> EbmlResult<usize> {
        let (buf, width) = self.encode();
        target.write_all(&buf[..width])?;
        Ok(width)
    }

    /// Decodes an ID from the front of `data`, returning it with the number of bytes used.
    pub fn decode(data: &[u8]) -> EbmlResult<(Self, usize)> {
        let head = *data.first().ok_or(EbmlError::UnexpectedEof)?;
        let width = head.leading_zeros() as usize + 1;
        if width > MAX_ID_WIDTH {
            return Err(EbmlError::IdOutOfRange);
        }
        if data.len() < width {
            return Err(EbmlError::UnexpectedEof);
        }
        let encoded = data[..width]
            .iter()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
        let id = Id(encoded);
        let literal = id.literal();

        let legal = match width {
            // 0x80 is reserved by EBML but taken by Matroska's ChapterDisplay
            1 => encoded == 0x80 || Id::new_class_a(literal as u8).is_some(),
            2 => Id::new_class_b(literal as u16).is_some(),
            3 => Id::new_class_c(literal).is_some(),
            _ => Id::new_class_d(literal).is_some(),
        };
        if legal {
            Ok((id, width))
        } else {
            Err(EbmlError::IdOutOfRange)
        }
    }

    /// Attempts to read an `Id` from a data source.
    pub fn load<R: Read + ?Sized>(source: &mut R) -> EbmlResult<Self> {
        let mut buf = [0u8; MAX_ID_WIDTH];
        read_fully(source, &mut buf[..1])?;
        let width = buf[0].leading_zeros() as usize + 1;
        if width > MAX_ID_WIDTH {
            return Err(EbmlError::IdOutOfRange);
        }
        read_fully(source, &mut buf[1..width])?;
        Ok(Id::decode(&buf[..width])?.0)
    }
}
impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:0width$X}", self.0, width = 2 * self.get_width())
    }
}
impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_a() {
        assert!(Id::new_class_a(0x00).is_none());
        assert_eq!(1, Id::new_class_a(0x01).unwrap().get_width());
        assert_eq!(0xEC, Id::new_class_a(0x6C).unwrap().value());
        assert_eq!(1, Id::new_class_a(0x7E).unwrap().get_width());
        assert!(Id::new_class_a(0x7F).is_none());
        assert!(Id::new_class_a(0xFF).is_none());
    }

    #[test]
    fn class_b() {
        assert!(Id::new_class_b(0x00).is_none());
        assert!(Id::new_class_b(0x7E).is_none());
        assert_eq!(2, Id::new_class_b(0x7F).unwrap().get_width());
        assert_eq!(0x4286, Id::new_class_b(0x0286).unwrap().value());
        assert_eq!(2, Id::new_class_b(0x3FFE).unwrap().get_width());
        assert!(Id::new_class_b(0x3FFF).is_none());
    }

    #[test]
    fn class_c() {
        assert!(Id::new_class_c(0x3FFE).is_none());
        assert_eq!(3, Id::new_class_c(0x3FFF).unwrap().get_width());
        assert_eq!(0x2A_D7B1, Id::new_class_c(0x0A_D7B1).unwrap().value());
        assert!(Id::new_class_c(0x001F_FFFF).is_none());
    }

    #[test]
    fn class_d() {
        assert!(Id::new_class_d(0x001F_FFFE).is_none());
        assert_eq!(4, Id::new_class_d(0x001F_FFFF).unwrap().get_width());
        assert_eq!(0x1A45_DFA3, Id::new_class_d(0x0A45_DFA3).unwrap().value());
        assert!(Id::new_class_d(0x0FFF_FFFF).is_none());
    }

    #[test]
    fn literal() {
        assert_eq!(0x0A45_DFA3, Id::new(0x1A45_DFA3).literal());
        assert_eq!(0x6C, Id::new(0xEC).literal());
        assert_eq!(0x0286, Id::new(0x4286).literal());
        assert_eq!(0x0A_D7B1, Id::new(0x2A_D7B1).literal());
        assert_eq!(0x0F43_B675, Id::new(0x1F43_B675).literal());
    }

    #[test]
    fn decode() {
        let (id, used) = Id::decode(&[0x1A, 0x45, 0xDF, 0xA3, 0x00]).unwrap();
        assert_eq!(Id::new(0x1A45_DFA3), id);
        assert_eq!(4, used);

        // reserved: all ones
        assert!(matches!(Id::decode(&[0xFF]), Err(EbmlError::IdOutOfRange)));
        // ChapterDisplay
        assert_eq!((Id::new(0x80), 1), Id::decode(&[0x80]).unwrap());
        // not minimally coded
        assert!(matches!(Id::decode(&[0x40, 0x01]), Err(EbmlError::IdOutOfRange)));
        // wider than four bytes
        assert!(matches!(Id::decode(&[0x08, 0, 0, 0, 1]), Err(EbmlError::IdOutOfRange)));
        assert!(matches!(Id::decode(&[0x1A, 0x45]), Err(EbmlError::UnexpectedEof)));
    }

    #[test]
    fn validate_encoded() {
        assert!(Id::from_encoded(0x1F43_B675).is_some());
        assert!(Id::from_encoded(0xA3).is_some());
        assert!(Id::from_encoded(0x80).is_some());
        assert!(Id::from_encoded(0xFF).is_none());
        assert!(Id::from_encoded(0x7F).is_none());
        assert!(Id::from_encoded(0x4001).is_none());
    }

    #[test]
    fn write_and_load() {
        let mut out = Vec::new();
        assert_eq!(4, Id::new(0x1F43_B675).write(&mut out).unwrap());
        assert_eq!(vec![0x1F, 0x43, 0xB6, 0x75], out);
        let id = Id::load(&mut &out[..]).unwrap();
        assert_eq!("0x1F43B675", id.to_string());
        assert_eq!("Id(0xA3)", format!("{:?}", Id::new(0xA3)));
    }
}
