//! Variable-width integers, used by EBML to code element sizes, and (with a bias) the signed
//! deltas of EBML lacing.

use std::cmp::Ordering;
use std::io::{self, Read, Write};

use crate::error::{EbmlError, EbmlResult};

/// The maximum width of a size, in bytes.
pub const MAX_WIDTH: usize = 8;

/// The largest value a size can hold. 2^56 - 1 would need the all-ones coding, which is reserved.
pub const MAX_VALUE: u64 = (1 << 56) - 2;

/// An integer with a special value, representing an unknown size.
pub const UNKNOWN_SIZE: Size = Size {
    value: None,
    width: 1,
};

// The bitmask applied to the head to decode it as part of the real value.
const HEAD_MASK_VALUES: [u8; 8] = [0x7F, 0x3F, 0x1F, 0x0F, 0x07, 0x03, 0x01, 0x00];

const fn all_ones(width: usize) -> u64 {
    (1u64 << (7 * width)) - 1
}

const fn max_value(width: usize) -> u64 {
    all_ones(width) - 1
}

const fn bias(width: usize) -> i64 {
    (1i64 << (7 * width - 1)) - 1
}

/// Returns the smallest width able to hold `value`. Values above `MAX_VALUE` report `MAX_WIDTH`,
/// which still cannot hold them.
pub fn coded_size_length(value: u64) -> usize {
    (1..MAX_WIDTH)
        .find(|&width| value <= max_value(width))
        .unwrap_or(MAX_WIDTH)
}

/// Returns the smallest width able to hold the signed `value` once biased.
pub fn coded_size_length_signed(value: i64) -> usize {
    (1..MAX_WIDTH)
        .find(|&width| value.unsigned_abs() <= bias(width) as u64)
        .unwrap_or(MAX_WIDTH)
}

/// Fills `buf` from `source`, mapping a short read to `EbmlError::UnexpectedEof`.
pub(crate) fn read_fully<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> EbmlResult<()> {
    source.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => EbmlError::UnexpectedEof,
        _ => e.into(),
    })
}

/// An unsigned variable-width integer, used by EBML to represent a size. It can also represent an
/// unknown size. The range of this integer is 0 to 2^56 - 2.
///
/// The unknown size is always equal to the unknown size, and each other value is equal to itself.
/// However, the unknown size can not be ordered with respect to known sizes. The width is part of
/// the coding, not of the value: sizes of different widths holding the same value are equal.
#[derive(Debug, Clone, Copy)]
pub struct Size {
    value: Option<u64>,
    width: u8,
}
impl Size {
    fn known(data: u64) -> Self {
        Size {
            value: Some(data),
            width: coded_size_length(data) as u8,
        }
    }

    /// Converts the given value to a `Size` of minimal width, failing if the value is out of range
    /// (that is, greater than 2^56 - 2).
    pub fn from_u64(data: u64) -> Option<Self> {
        if data > MAX_VALUE {
            None
        } else {
            Some(Size::known(data))
        }
    }

    /// Codes `data` with exactly `width` bytes. Fails if that width cannot hold the value without
    /// colliding with the reserved unknown coding.
    pub fn with_width(data: u64, width: usize) -> EbmlResult<Self> {
        if width == 0 || width > MAX_WIDTH || data > max_value(width) {
            return Err(EbmlError::LengthTooShort { value: data, width });
        }
        Ok(Size {
            value: Some(data),
            width: width as u8,
        })
    }

    /// The unknown size, coded with `width` bytes.
    pub fn unknown(width: usize) -> EbmlResult<Self> {
        if width == 0 || width > MAX_WIDTH {
            return Err(EbmlError::ValueOutOfRange(width as i128));
        }
        Ok(Size {
            value: None,
            width: width as u8,
        })
    }

    /// Codes a signed value. The value is shifted by `2^(7w - 1) - 1` so that it lands in the
    /// unsigned range of width `w`; with no explicit width the smallest fitting one is used.
    pub fn from_signed(data: i64, width: Option<usize>) -> EbmlResult<Self> {
        let width = width.unwrap_or_else(|| coded_size_length_signed(data));
        if width == 0 || width > MAX_WIDTH {
            return Err(EbmlError::ValueOutOfRange(i128::from(data)));
        }
        let bias = bias(width);
        if data > bias || data < -bias {
            return Err(EbmlError::ValueOutOfRange(i128::from(data)));
        }
        Size::with_width((data + bias) as u64, width)
    }

    /// Retrieves the width of this integer (the number of bytes the representation requires).
    pub fn get_width(&self) -> usize {
        self.width as usize
    }

    /// Retrieves the value as a `u64`, returning `None` if this represents an unknown size.
    pub fn get_value(&self) -> Option<u64> {
        self.value
    }

    /// Retrieves the value as a signed integer, undoing the bias applied by `from_signed`.
    pub fn get_signed_value(&self) -> Option<i64> {
        self.value.map(|v| v as i64 - bias(self.get_width()))
    }

    /// Returns true for the reserved unknown size.
    pub fn is_unknown(&self) -> bool {
        self.value.is_none()
    }

    /// Encodes the integer. Only the first `width` bytes of the array are meaningful.
    pub fn encode(&self) -> ([u8; MAX_WIDTH], usize) {
        let width = self.get_width();
        let data = self.value.unwrap_or_else(|| all_ones(width));
        let mut buf = [0u8; MAX_WIDTH];
        for i in 0..width {
            buf[width - 1 - i] = (data >> (8 * i)) as u8;
        }
        buf[0] |= 0x80 >> (width - 1);
        (buf, width)
    }

    /// Writes the integer to a data sink, returning the number of bytes written.
    pub fn write<W: Write + ?Sized>(&self, target: &mut W) -> EbmlResult<usize> {
        let (buf, width) = self.encode();
        target.write_all(&buf[..width])?;
        Ok(width)
    }

    /// Decodes an integer from the front of `data`, returning it with the number of bytes used.
    pub fn decode(data: &[u8]) -> EbmlResult<(Self, usize)> {
        let head = *data.first().ok_or(EbmlError::UnexpectedEof)?;
        if head == 0 {
            return Err(EbmlError::MalformedVarInt { offset: 0 });
        }
        let width = head.leading_zeros() as usize + 1;
        if data.len() < width {
            return Err(EbmlError::UnexpectedEof);
        }

        let mut value = u64::from(head & HEAD_MASK_VALUES[width - 1]);
        for byte in &data[1..width] {
            value = (value << 8) | u64::from(*byte);
        }
        let value = if value == all_ones(width) {
            None
        } else {
            Some(value)
        };
        Ok((
            Size {
                value,
                width: width as u8,
            },
            width,
        ))
    }

    /// Attempts to read a `Size` from a data source.
    pub fn load<R: Read + ?Sized>(source: &mut R) -> EbmlResult<Self> {
        let mut buf = [0u8; MAX_WIDTH];
        read_fully(source, &mut buf[..1])?;
        if buf[0] == 0 {
            return Err(EbmlError::MalformedVarInt { offset: 0 });
        }
        let width = buf[0].leading_zeros() as usize + 1;
        read_fully(source, &mut buf[1..width])?;
        Ok(Size::decode(&buf[..width])?.0)
    }
}
impl From<u8> for Size {
    fn from(data: u8) -> Self {
        Size::known(u64::from(data))
    }
}
impl From<u16> for Size {
    fn from(data: u16) -> Self {
        Size::known(u64::from(data))
    }
}
impl From<u32> for Size {
    fn from(data: u32) -> Self {
        Size::known(u64::from(data))
    }
}
impl PartialOrd for Size {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.value, other.value) {
            (Some(self_val), Some(other_val)) => self_val.partial_cmp(&other_val),
            (None, None) => Some(Ordering::Equal),
            _ => None,
        }
    }
}
impl PartialEq for Size {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl Eq for Size {}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(size: Size) -> Vec<u8> {
        let (buf, width) = size.encode();
        buf[..width].to_vec()
    }

    #[test]
    fn ord_eq() {
        let x: Size = 4u8.into();
        let y: Size = 5u32.into();
        let z = UNKNOWN_SIZE;

        assert_eq!(x, x);
        assert_ne!(x, y);
        assert_ne!(x, z);
        assert_ne!(y, z);
        assert_eq!(z, z);

        assert!(x < y);
        assert!(y >= x);
        assert!(x <= x);

        assert!(!(z > x));
        assert!(!(z >= x));
        assert!(!(x > z));
        assert!(!(x >= z));
    }

    #[test]
    fn unknown() {
        let x = UNKNOWN_SIZE;
        assert_eq!(vec![0b1111_1111], bytes(x));
        assert_eq!(1, x.get_width());
        assert!(x.get_value().is_none());

        let x = Size::unknown(5).unwrap();
        assert_eq!(vec![0x0F, 0xFF, 0xFF, 0xFF, 0xFF], bytes(x));
        let (decoded, used) = Size::decode(&bytes(x)).unwrap();
        assert!(decoded.is_unknown());
        assert_eq!(5, used);
    }

    #[test]
    fn unknown_never_collides() {
        for width in 1..=MAX_WIDTH {
            let largest = Size::with_width(max_value(width), width).unwrap();
            let (decoded, _) = Size::decode(&bytes(largest)).unwrap();
            assert_eq!(Some(max_value(width)), decoded.get_value());

            let (decoded, _) = Size::decode(&bytes(Size::unknown(width).unwrap())).unwrap();
            assert!(decoded.is_unknown());
        }
    }

    #[test]
    fn from_u8() {
        let x: Size = 0u8.into();
        assert_eq!(vec![0b1000_0000], bytes(x));
        assert_eq!(1, x.get_width());
        assert_eq!(0, x.get_value().unwrap());

        let x: Size = 1u8.into();
        assert_eq!(vec![0b1000_0001], bytes(x));

        // 0x7F would normally be stored in width 1, but data of all 1's is reserved
        let x: Size = 127u8.into();
        assert_eq!(vec![0b0100_0000, 0b0111_1111], bytes(x));
        assert_eq!(2, x.get_width());

        let x: Size = 233u8.into();
        assert_eq!(vec![0b0100_0000, 0b1110_1001], bytes(x));
    }

    #[test]
    fn from_u16() {
        let x: Size = 4000u16.into();
        assert_eq!(vec![0b0100_1111, 0b1010_0000], bytes(x));
        assert_eq!(4000, x.get_value().unwrap());

        let x: Size = 16383u16.into();
        assert_eq!(vec![0b0010_0000, 0b0011_1111, 0b1111_1111], bytes(x));

        let x: Size = 65534u16.into();
        assert_eq!(vec![0b0010_0000, 0b1111_1111, 0b1111_1110], bytes(x));
    }

    #[test]
    fn from_u32() {
        let x: Size = 8_323_591u32.into();
        assert_eq!(4, x.get_width());
        assert_eq!(vec![0b0001_0000, 0b0111_1111, 0b0000_0010, 0b0000_0111], bytes(x));

        let x: Size = 268_435_455u32.into();
        assert_eq!(5, x.get_width());
        assert_eq!(vec![0b0000_1000, 0b0000_1111, 0xFF, 0xFF, 0xFF], bytes(x));
    }

    #[test]
    fn from_u64() {
        let x = Size::from_u64(3_423_912_007_635).unwrap();
        assert_eq!(6, x.get_width());
        assert_eq!(3_423_912_007_635, x.get_value().unwrap());

        // the maximum value storable
        let x = Size::from_u64(72_057_594_037_927_934).unwrap();
        assert_eq!(8, x.get_width());
        assert_eq!(vec![0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE], bytes(x));

        assert!(Size::from_u64(72_057_594_037_927_935).is_none());
        assert!(Size::from_u64(72_057_594_037_927_936).is_none());
    }

    #[test]
    fn minimal_widths() {
        assert_eq!(1, coded_size_length(0));
        assert_eq!(1, coded_size_length(126));
        assert_eq!(2, coded_size_length(127));
        assert_eq!(2, coded_size_length(16_382));
        assert_eq!(3, coded_size_length(16_383));
        assert_eq!(8, coded_size_length(MAX_VALUE));
    }

    #[test]
    fn explicit_width() {
        let x = Size::with_width(5, 4).unwrap();
        assert_eq!(vec![0x10, 0x00, 0x00, 0x05], bytes(x));
        assert_eq!(x, Size::from(5u8));

        match Size::with_width(127, 1) {
            Err(EbmlError::LengthTooShort { value: 127, width: 1 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(Size::with_width(1, 9).is_err());
    }

    #[test]
    fn signed() {
        assert_eq!(vec![0xBF], bytes(Size::from_signed(0, None).unwrap()));
        assert_eq!(vec![0x80], bytes(Size::from_signed(-63, None).unwrap()));
        assert_eq!(vec![0xFE], bytes(Size::from_signed(63, None).unwrap()));
        assert_eq!(2, Size::from_signed(64, None).unwrap().get_width());
        assert_eq!(2, Size::from_signed(-64, None).unwrap().get_width());

        // the EBML lacing example from the Matroska docs: 500 - 800
        let delta = Size::from_signed(-300, None).unwrap();
        assert_eq!(vec![0x5E, 0xD3], bytes(delta));
        let (decoded, _) = Size::decode(&[0x5E, 0xD3]).unwrap();
        assert_eq!(Some(-300), decoded.get_signed_value());

        assert!(Size::from_signed(64, Some(1)).is_err());
    }

    #[test]
    fn malformed() {
        match Size::decode(&[0x00, 0x81]) {
            Err(EbmlError::MalformedVarInt { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match Size::decode(&[0x40]) {
            Err(EbmlError::UnexpectedEof) => {}
            other => panic!("unexpected {:?}", other),
        }
        let mut source: &[u8] = &[0x20, 0x01];
        assert!(matches!(Size::load(&mut source), Err(EbmlError::UnexpectedEof)));
    }

    #[test]
    fn load() {
        let mut source: &[u8] = &[0x43, 0x20, 0xAA];
        let x = Size::load(&mut source).unwrap();
        assert_eq!(Some(800), x.get_value());
        assert_eq!(2, x.get_width());
        assert_eq!(&[0xAA], source);
    }
}
