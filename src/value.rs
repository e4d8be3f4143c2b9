//! Values which can be stored in an EBML document.

use std::io::{Read, Write};

#[cfg(feature = "chrono")]
use chrono::{DateTime, TimeZone, Utc};

use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::schema::ElementKind;

const UNIX_TO_MILLENNIUM_NANOS: i64 = 978_307_200_000_000_000;
const UNIX_TO_MILLENNIUM_SECONDS: i64 = 978_307_200;

/// A timestamp with nanosecond precision, counted from 2001-01-01T00:00:00 UTC.
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Default)]
pub struct DateValue {
    nanos_since_millennium: i64,
}
impl DateValue {
    /// Creates a `DateValue` from the raw EBML representation.
    pub const fn from_nanos_since_millennium(nanos_since_millennium: i64) -> Self {
        DateValue {
            nanos_since_millennium,
        }
    }

    /// Creates a `DateValue` given the number of milliseconds since the Unix epoch, returning
    /// `None` if the value would over/underflow.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        millis
            .checked_mul(1_000_000)
            .and_then(|x| x.checked_sub(UNIX_TO_MILLENNIUM_NANOS))
            .map(DateValue::from_nanos_since_millennium)
    }

    /// Creates a `DateValue` given the number of seconds since the Unix epoch, returning `None`
    /// if the value would over/underflow.
    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        seconds
            .checked_sub(UNIX_TO_MILLENNIUM_SECONDS)
            .and_then(|x| x.checked_mul(1_000_000_000))
            .map(DateValue::from_nanos_since_millennium)
    }

    /// Creates a `DateValue` given a `DateTime`, returning `None` if the value would
    /// over/underflow.
    #[cfg(feature = "chrono")]
    pub fn from_datetime<Tz: TimeZone>(datetime: DateTime<Tz>) -> Option<Self> {
        datetime
            .timestamp_nanos_opt()
            .and_then(|nanos| nanos.checked_sub(UNIX_TO_MILLENNIUM_NANOS))
            .map(DateValue::from_nanos_since_millennium)
    }

    /// The raw EBML representation.
    pub fn nanos_since_millennium(&self) -> i64 {
        self.nanos_since_millennium
    }

    /// Nanoseconds since the Unix epoch, or `None` past the year 2262.
    pub fn unix_nanos(&self) -> Option<i64> {
        self.nanos_since_millennium
            .checked_add(UNIX_TO_MILLENNIUM_NANOS)
    }

    /// Converts to a UTC `DateTime`.
    #[cfg(feature = "chrono")]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        self.unix_nanos().map(|nanos| Utc.timestamp_nanos(nanos))
    }
}

/// The decoded payload of a leaf element.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    /// An unsigned integer, 0 to 8 bytes big-endian.
    UInt(u64),
    /// A two's complement signed integer, 0 to 8 bytes big-endian.
    SInt(i64),
    /// An IEEE 754 float, 0, 4 or 8 bytes. Always written with 8 bytes.
    Float(f64),
    /// A string, either printable ASCII or UTF-8 depending on the element kind.
    String(String),
    /// Arbitrary binary data.
    Binary(Vec<u8>),
    /// A date.
    Date(DateValue),
}
impl Value {
    /// The zero value of a leaf kind, or `None` for masters.
    pub fn zero(kind: ElementKind) -> Option<Value> {
        Some(match kind {
            ElementKind::Master => return None,
            ElementKind::UInt => Value::UInt(0),
            ElementKind::SInt => Value::SInt(0),
            ElementKind::Float => Value::Float(0.0),
            ElementKind::String | ElementKind::Utf8 => Value::String(String::new()),
            ElementKind::Binary => Value::Binary(Vec::new()),
            ElementKind::Date => Value::Date(DateValue::default()),
        })
    }

    /// Number of payload bytes the value is written with. Integers use their minimal
    /// big-endian width, but never less than one byte.
    pub fn data_size(&self) -> u64 {
        match *self {
            Value::UInt(x) => uint_width(x) as u64,
            Value::SInt(x) => sint_width(x) as u64,
            Value::Float(_) | Value::Date(_) => 8,
            Value::String(ref s) => s.len() as u64,
            Value::Binary(ref b) => b.len() as u64,
        }
    }

    /// Writes the payload (not the element header).
    pub fn write<W: Write + ?Sized>(&self, target: &mut W) -> EbmlResult<()> {
        match *self {
            Value::UInt(x) => {
                let width = uint_width(x);
                target.write_all(&x.to_be_bytes()[8 - width..])?;
            }
            Value::SInt(x) => {
                let width = sint_width(x);
                target.write_all(&x.to_be_bytes()[8 - width..])?;
            }
            Value::Float(x) => target.write_all(&x.to_be_bytes())?,
            Value::Date(x) => target.write_all(&x.nanos_since_millennium.to_be_bytes())?,
            Value::String(ref s) => target.write_all(s.as_bytes())?,
            Value::Binary(ref b) => target.write_all(b)?,
        }
        Ok(())
    }

    /// Reads a payload of `size` bytes as the given kind. `id` is only used for error reports.
    pub fn read<R: Read + ?Sized>(
        source: &mut R,
        kind: ElementKind,
        id: Id,
        size: u64,
    ) -> EbmlResult<Value> {
        let invalid = || EbmlError::InvalidValueSize { id, size };
        match kind {
            ElementKind::Master => Err(EbmlError::NotAMaster(id)),
            ElementKind::UInt => {
                if size > 8 {
                    return Err(invalid());
                }
                let bytes = read_bytes(source, size)?;
                Ok(Value::UInt(
                    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
                ))
            }
            ElementKind::SInt => {
                if size > 8 {
                    return Err(invalid());
                }
                let bytes = read_bytes(source, size)?;
                let mut buf = match bytes.first() {
                    Some(b) if b & 0x80 != 0 => [0xFF; 8],
                    _ => [0; 8],
                };
                buf[8 - bytes.len()..].copy_from_slice(&bytes);
                Ok(Value::SInt(i64::from_be_bytes(buf)))
            }
            ElementKind::Float => {
                let bytes = read_bytes(source, size)?;
                match bytes.len() {
                    0 => Ok(Value::Float(0.0)),
                    4 => {
                        let mut buf = [0u8; 4];
                        buf.copy_from_slice(&bytes);
                        Ok(Value::Float(f64::from(f32::from_be_bytes(buf))))
                    }
                    8 => {
                        let mut buf = [0u8; 8];
                        buf.copy_from_slice(&bytes);
                        Ok(Value::Float(f64::from_be_bytes(buf)))
                    }
                    _ => Err(invalid()),
                }
            }
            ElementKind::Date => {
                let bytes = read_bytes(source, size)?;
                match bytes.len() {
                    0 => Ok(Value::Date(DateValue::default())),
                    8 => {
                        let mut buf = [0u8; 8];
                        buf.copy_from_slice(&bytes);
                        Ok(Value::Date(DateValue::from_nanos_since_millennium(
                            i64::from_be_bytes(buf),
                        )))
                    }
                    _ => Err(invalid()),
                }
            }
            ElementKind::String | ElementKind::Utf8 => {
                let mut bytes = read_bytes(source, size)?;
                // trailing NUL padding is not part of the value
                if let Some(end) = bytes.iter().position(|b| *b == 0) {
                    bytes.truncate(end);
                }
                Ok(Value::String(match String::from_utf8(bytes) {
                    Ok(s) => s,
                    Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
                }))
            }
            ElementKind::Binary => Ok(Value::Binary(read_bytes(source, size)?)),
        }
    }

    /// The kind this value is naturally written as.
    pub fn kind(&self) -> ElementKind {
        match *self {
            Value::UInt(_) => ElementKind::UInt,
            Value::SInt(_) => ElementKind::SInt,
            Value::Float(_) => ElementKind::Float,
            Value::String(_) => ElementKind::Utf8,
            Value::Binary(_) => ElementKind::Binary,
            Value::Date(_) => ElementKind::Date,
        }
    }

    /// The value as an unsigned integer, if it is one.
    pub fn as_uint(&self) -> Option<u64> {
        match *self {
            Value::UInt(x) => Some(x),
            _ => None,
        }
    }

    /// The value as a signed integer, if it is one.
    pub fn as_sint(&self) -> Option<i64> {
        match *self {
            Value::SInt(x) => Some(x),
            _ => None,
        }
    }

    /// The value as a float, if it is one.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(x) => Some(x),
            _ => None,
        }
    }

    /// The value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::String(ref s) => Some(s),
            _ => None,
        }
    }

    /// The value as binary data, if it is some.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match *self {
            Value::Binary(ref b) => Some(b),
            _ => None,
        }
    }

    /// The value as a date, if it is one.
    pub fn as_date(&self) -> Option<DateValue> {
        match *self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }
}
impl From<u64> for Value {
    fn from(data: u64) -> Self {
        Value::UInt(data)
    }
}
impl From<i64> for Value {
    fn from(data: i64) -> Self {
        Value::SInt(data)
    }
}
impl From<f64> for Value {
    fn from(data: f64) -> Self {
        Value::Float(data)
    }
}
impl From<String> for Value {
    fn from(data: String) -> Self {
        Value::String(data)
    }
}
impl<'a> From<&'a str> for Value {
    fn from(data: &'a str) -> Self {
        Value::String(data.to_owned())
    }
}
impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Value::Binary(data)
    }
}
impl From<DateValue> for Value {
    fn from(data: DateValue) -> Self {
        Value::Date(data)
    }
}

fn uint_width(x: u64) -> usize {
    (8 - x.leading_zeros() as usize / 8).max(1)
}

fn sint_width(x: i64) -> usize {
    (1..8)
        .find(|&n| {
            let half = 1i64 << (8 * n - 1);
            x >= -half && x < half
        })
        .unwrap_or(8)
}

// Reads exactly `size` bytes without trusting `size` for the allocation.
fn read_bytes<R: Read + ?Sized>(source: &mut R, size: u64) -> EbmlResult<Vec<u8>> {
    let mut buf = Vec::new();
    (&mut *source).take(size).read_to_end(&mut buf)?;
    if (buf.len() as u64) < size {
        return Err(EbmlError::UnexpectedEof);
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        value.write(&mut out).unwrap();
        assert_eq!(value.data_size(), out.len() as u64);
        out
    }

    fn read(kind: ElementKind, bytes: &[u8]) -> Value {
        Value::read(&mut &bytes[..], kind, Id::new(0x81), bytes.len() as u64).unwrap()
    }

    #[test]
    fn unsigned_vals() {
        assert_eq!(vec![0x00], written(&Value::UInt(0)));
        assert_eq!(vec![0xFF], written(&Value::UInt(0xFF)));
        assert_eq!(vec![0x01, 0x00], written(&Value::UInt(0x100)));
        assert_eq!(vec![0x0F, 0x42, 0x40], written(&Value::UInt(1_000_000)));
        assert_eq!(vec![0xFF; 8], written(&Value::UInt(u64::max_value())));

        assert_eq!(Value::UInt(0), read(ElementKind::UInt, &[]));
        assert_eq!(Value::UInt(1_000_000), read(ElementKind::UInt, &[0x00, 0x0F, 0x42, 0x40]));
    }

    #[test]
    fn signed_vals() {
        assert_eq!(vec![0x00], written(&Value::SInt(0)));
        assert_eq!(vec![0x7F], written(&Value::SInt(127)));
        assert_eq!(vec![0x00, 0x80], written(&Value::SInt(128)));
        assert_eq!(vec![0x80], written(&Value::SInt(-128)));
        assert_eq!(vec![0xFF, 0x7F], written(&Value::SInt(-129)));
        assert_eq!(8, Value::SInt(i64::min_value()).data_size());

        assert_eq!(Value::SInt(-2), read(ElementKind::SInt, &[0xFE]));
        assert_eq!(Value::SInt(-129), read(ElementKind::SInt, &[0xFF, 0x7F]));
        assert_eq!(Value::SInt(0), read(ElementKind::SInt, &[]));
    }

    #[test]
    fn float_vals() {
        assert_eq!(8, written(&Value::Float(1.0)).len());
        assert_eq!(Value::Float(0.0), read(ElementKind::Float, &[]));
        assert_eq!(Value::Float(1.0), read(ElementKind::Float, &1.0f32.to_be_bytes()));
        assert_eq!(Value::Float(48000.0), read(ElementKind::Float, &48000.0f64.to_be_bytes()));

        let err = Value::read(&mut &[0u8; 3][..], ElementKind::Float, Id::new(0xB5), 3);
        assert!(matches!(err, Err(EbmlError::InvalidValueSize { size: 3, .. })));
    }

    #[test]
    fn string_vals() {
        assert_eq!(b"abcd".to_vec(), written(&"abcd".into()));
        assert_eq!(Value::String("eng".into()), read(ElementKind::String, b"eng\0\0\0"));
        assert_eq!(Value::String("ü".into()), read(ElementKind::Utf8, "ü".as_bytes()));
    }

    #[test]
    fn binary_vals() {
        assert_eq!(vec![0x01, 0x02], written(&vec![0x01, 0x02].into()));
        assert_eq!(Value::Binary(vec![0x01, 0x02]), read(ElementKind::Binary, &[0x01, 0x02]));
    }

    #[test]
    fn short_read() {
        let err = Value::read(&mut &[0u8; 2][..], ElementKind::Binary, Id::new(0xA3), 10);
        assert!(matches!(err, Err(EbmlError::UnexpectedEof)));
    }

    #[test]
    fn dates() {
        let x = DateValue::from_unix_seconds(978_307_201).unwrap();
        assert_eq!(1_000_000_000, x.nanos_since_millennium());
        assert_eq!(x, DateValue::from_unix_millis(978_307_201_000).unwrap());
        assert_eq!(Some(978_307_201_000_000_000), x.unix_nanos());
        assert_eq!(Value::Date(x), read(ElementKind::Date, &written(&x.into())));
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn from_datetime() {
        let sample = Utc.with_ymd_and_hms(2017, 4, 20, 4, 20, 0).unwrap();
        let x = DateValue::from_datetime(sample).unwrap();
        assert_eq!(Some(sample), x.as_datetime());
        let millennium = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(0, DateValue::from_datetime(millennium).unwrap().nanos_since_millennium());
    }
}
