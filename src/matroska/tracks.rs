//! Track descriptions, their content encodings, and the segment `Info` element.

use std::borrow::Cow;

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::matroska::block::MAX_TRACK_NUMBER;
use crate::matroska::ids;

/// What a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    /// Video.
    Video,
    /// Audio.
    Audio,
    /// Audio and video in one track.
    Complex,
    /// An overlay picture.
    Logo,
    /// Subtitles.
    Subtitle,
    /// Menu buttons.
    Buttons,
    /// Control codes.
    Control,
    /// A type this crate has no name for.
    Other(u64),
}
impl TrackType {
    /// The value of the `TrackType` element.
    pub fn code(self) -> u64 {
        match self {
            TrackType::Video => 0x01,
            TrackType::Audio => 0x02,
            TrackType::Complex => 0x03,
            TrackType::Logo => 0x10,
            TrackType::Subtitle => 0x11,
            TrackType::Buttons => 0x12,
            TrackType::Control => 0x20,
            TrackType::Other(code) => code,
        }
    }
}
impl From<u64> for TrackType {
    fn from(code: u64) -> Self {
        match code {
            0x01 => TrackType::Video,
            0x02 => TrackType::Audio,
            0x03 => TrackType::Complex,
            0x10 => TrackType::Logo,
            0x11 => TrackType::Subtitle,
            0x12 => TrackType::Buttons,
            0x20 => TrackType::Control,
            other => TrackType::Other(other),
        }
    }
}

/// `ContentEncodingScope` bit: the encoding applies to every frame.
pub const SCOPE_FRAMES: u64 = 0x01;
/// `ContentEncodingScope` bit: the encoding applies to the track's `CodecPrivate`.
pub const SCOPE_CODEC_PRIVATE: u64 = 0x02;

/// How a track's data is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    /// zlib deflate.
    Zlib,
    /// bzip2.
    Bzlib,
    /// LZO1X.
    Lzo1x,
    /// A fixed prefix removed from each frame, stored in the settings.
    HeaderStripping,
    /// An algorithm this crate has no name for.
    Other(u64),
}
impl CompressionAlgorithm {
    /// The value of the `ContentCompAlgo` element.
    pub fn code(self) -> u64 {
        match self {
            CompressionAlgorithm::Zlib => 0,
            CompressionAlgorithm::Bzlib => 1,
            CompressionAlgorithm::Lzo1x => 2,
            CompressionAlgorithm::HeaderStripping => 3,
            CompressionAlgorithm::Other(code) => code,
        }
    }
}
impl From<u64> for CompressionAlgorithm {
    fn from(code: u64) -> Self {
        match code {
            0 => CompressionAlgorithm::Zlib,
            1 => CompressionAlgorithm::Bzlib,
            2 => CompressionAlgorithm::Lzo1x,
            3 => CompressionAlgorithm::HeaderStripping,
            other => CompressionAlgorithm::Other(other),
        }
    }
}

/// A `ContentCompression`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCompression {
    /// The algorithm.
    pub algorithm: CompressionAlgorithm,
    /// Settings of the algorithm: for header stripping, the removed bytes.
    pub settings: Option<Vec<u8>>,
}

/// A `ContentEncoding`: one step applied to a track's data when it was muxed.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentEncoding {
    /// Position in the chain of encodings. The highest order is undone first.
    pub order: u64,
    /// What the encoding applies to; a set of `SCOPE_*` bits.
    pub scope: u64,
    /// 0 for compression, 1 for encryption.
    pub encoding_type: u64,
    /// The compression, for a compression step.
    pub compression: Option<ContentCompression>,
    /// The `ContentEncryption` element, kept as read.
    pub encryption: Option<Element>,
}
impl ContentEncoding {
    /// A compression step applied to every frame.
    pub fn compression(algorithm: CompressionAlgorithm, settings: Option<Vec<u8>>) -> Self {
        ContentEncoding {
            order: 0,
            scope: SCOPE_FRAMES,
            encoding_type: 0,
            compression: Some(ContentCompression {
                algorithm,
                settings,
            }),
            encryption: None,
        }
    }

    /// Header stripping: `header` was removed from the start of every frame.
    pub fn header_stripping(header: Vec<u8>) -> Self {
        ContentEncoding::compression(CompressionAlgorithm::HeaderStripping, Some(header))
    }

    /// True if the encoding applies to the frames of the track.
    pub fn applies_to_frames(&self) -> bool {
        self.scope & SCOPE_FRAMES != 0
    }

    /// The bytes removed from each frame, for header stripping.
    pub fn stripped_header(&self) -> Option<&[u8]> {
        match self.compression {
            Some(ContentCompression {
                algorithm: CompressionAlgorithm::HeaderStripping,
                ref settings,
            }) if self.encoding_type == 0 => Some(settings.as_deref().unwrap_or(&[])),
            _ => None,
        }
    }

    /// Builds the `ContentEncoding` element.
    pub fn to_element(&self) -> Element {
        let mut children = vec![
            Element::uint(ids::CONTENT_ENCODING_ORDER, self.order),
            Element::uint(ids::CONTENT_ENCODING_SCOPE, self.scope),
            Element::uint(ids::CONTENT_ENCODING_TYPE, self.encoding_type),
        ];
        if let Some(ref compression) = self.compression {
            let mut fields = vec![Element::uint(
                ids::CONTENT_COMP_ALGO,
                compression.algorithm.code(),
            )];
            if let Some(ref settings) = compression.settings {
                fields.push(Element::binary(ids::CONTENT_COMP_SETTINGS, settings.clone()));
            }
            children.push(Element::master(ids::CONTENT_COMPRESSION, fields));
        }
        children.extend(self.encryption.iter().cloned());
        Element::master(ids::CONTENT_ENCODING, children)
    }

    /// Reads a `ContentEncoding` element. Absent fields take their schema defaults.
    pub fn from_element(element: &Element) -> ContentEncoding {
        let compression = element.find_first(ids::CONTENT_COMPRESSION).map(|compression| {
            ContentCompression {
                algorithm: compression.get_uint(ids::CONTENT_COMP_ALGO).unwrap_or(0).into(),
                settings: compression
                    .get_binary(ids::CONTENT_COMP_SETTINGS)
                    .map(<[u8]>::to_vec),
            }
        });
        ContentEncoding {
            order: element.get_uint(ids::CONTENT_ENCODING_ORDER).unwrap_or(0),
            scope: element.get_uint(ids::CONTENT_ENCODING_SCOPE).unwrap_or(SCOPE_FRAMES),
            encoding_type: element.get_uint(ids::CONTENT_ENCODING_TYPE).unwrap_or(0),
            compression,
            encryption: element.find_first(ids::CONTENT_ENCRYPTION).cloned(),
        }
    }
}

/// A `TrackEntry`: the fields a muxer sets and a demuxer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry {
    /// The number blocks refer to the track by.
    pub number: u64,
    /// A number identifying the track across segments.
    pub uid: u64,
    /// What the track carries.
    pub track_type: TrackType,
    /// The codec, e.g. `V_MPEG4/ISO/AVC`.
    pub codec_id: String,
    /// Codec initialisation data.
    pub codec_private: Option<Vec<u8>>,
    /// A human-readable name.
    pub name: Option<String>,
    /// The language, as an ISO 639-2 code.
    pub language: Option<String>,
    /// Nanoseconds per frame.
    pub default_duration: Option<u64>,
    /// Whether the track may use lacing.
    pub lacing: bool,
    /// Pixel width and height, for video.
    pub video: Option<(u64, u64)>,
    /// Sampling frequency and channel count, for audio.
    pub audio: Option<(f64, u64)>,
    /// The encodings applied to the track's data, in the order they were added or read.
    pub content_encodings: Vec<ContentEncoding>,
}
impl TrackEntry {
    /// A track with the given number, type and codec. The UID defaults to the number.
    pub fn new<S: Into<String>>(number: u64, track_type: TrackType, codec_id: S) -> Self {
        TrackEntry {
            number,
            uid: number,
            track_type,
            codec_id: codec_id.into(),
            codec_private: None,
            name: None,
            language: None,
            default_duration: None,
            lacing: true,
            video: None,
            audio: None,
            content_encodings: Vec::new(),
        }
    }

    /// Sets the UID.
    pub fn with_uid(mut self, uid: u64) -> Self {
        self.uid = uid;
        self
    }

    /// Sets the codec private data.
    pub fn with_codec_private(mut self, data: Vec<u8>) -> Self {
        self.codec_private = Some(data);
        self
    }

    /// Sets the name.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the language.
    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the duration of each frame, in nanoseconds.
    pub fn with_default_duration(mut self, duration: u64) -> Self {
        self.default_duration = Some(duration);
        self
    }

    /// Sets whether the track may use lacing.
    pub fn with_lacing(mut self, lacing: bool) -> Self {
        self.lacing = lacing;
        self
    }

    /// Sets the picture size.
    pub fn with_video(mut self, width: u64, height: u64) -> Self {
        self.video = Some((width, height));
        self
    }

    /// Sets the sampling frequency and channel count.
    pub fn with_audio(mut self, frequency: f64, channels: u64) -> Self {
        self.audio = Some((frequency, channels));
        self
    }

    /// Adds a content encoding.
    pub fn with_content_encoding(mut self, encoding: ContentEncoding) -> Self {
        self.content_encodings.push(encoding);
        self
    }

    /// The bytes stripped from the start of every frame, if the track uses header stripping.
    pub fn stripped_header(&self) -> Option<&[u8]> {
        self.content_encodings
            .iter()
            .filter(|e| e.applies_to_frames())
            .find_map(ContentEncoding::stripped_header)
    }

    /// Undoes the content encodings on a frame as stored in a block. Only header stripping can
    /// be undone; other compression and encryption fail with `UnsupportedEncoding`.
    pub fn decode_frame<'a>(&self, frame: &'a [u8]) -> EbmlResult<Cow<'a, [u8]>> {
        let mut steps: Vec<&ContentEncoding> = self
            .content_encodings
            .iter()
            .filter(|e| e.applies_to_frames())
            .collect();
        steps.sort_by(|a, b| b.order.cmp(&a.order));
        let mut frame = Cow::Borrowed(frame);
        for step in steps {
            let header = step.stripped_header().ok_or_else(|| {
                EbmlError::UnsupportedEncoding(match step.compression {
                    Some(ref compression) if step.encoding_type == 0 => {
                        format!("{:?} compression", compression.algorithm)
                    }
                    _ => format!("encoding type {}", step.encoding_type),
                })
            })?;
            let mut restored = Vec::with_capacity(header.len() + frame.len());
            restored.extend_from_slice(header);
            restored.extend_from_slice(&frame);
            frame = Cow::Owned(restored);
        }
        Ok(frame)
    }

    /// Builds the `TrackEntry` element. Fails if the number cannot be used in a block.
    pub fn to_element(&self) -> EbmlResult<Element> {
        if self.number == 0 || self.number > MAX_TRACK_NUMBER {
            return Err(EbmlError::TrackNumberOutOfRange(self.number));
        }
        let mut children = vec![
            Element::uint(ids::TRACK_NUMBER, self.number),
            Element::uint(ids::TRACK_UID, self.uid),
            Element::uint(ids::TRACK_TYPE, self.track_type.code()),
            Element::uint(ids::FLAG_LACING, u64::from(self.lacing)),
            Element::string(ids::CODEC_ID, self.codec_id.clone()),
        ];
        if let Some(ref data) = self.codec_private {
            children.push(Element::binary(ids::CODEC_PRIVATE, data.clone()));
        }
        if let Some(ref name) = self.name {
            children.push(Element::string(ids::NAME, name.clone()));
        }
        if let Some(ref language) = self.language {
            children.push(Element::string(ids::LANGUAGE, language.clone()));
        }
        if let Some(duration) = self.default_duration {
            children.push(Element::uint(ids::DEFAULT_DURATION, duration));
        }
        if let Some((width, height)) = self.video {
            children.push(Element::master(
                ids::VIDEO,
                vec![
                    Element::uint(ids::PIXEL_WIDTH, width),
                    Element::uint(ids::PIXEL_HEIGHT, height),
                ],
            ));
        }
        if let Some((frequency, channels)) = self.audio {
            children.push(Element::master(
                ids::AUDIO,
                vec![
                    Element::float(ids::SAMPLING_FREQUENCY, frequency),
                    Element::uint(ids::CHANNELS, channels),
                ],
            ));
        }
        if !self.content_encodings.is_empty() {
            let encodings = self
                .content_encodings
                .iter()
                .map(ContentEncoding::to_element)
                .collect();
            children.push(Element::master(ids::CONTENT_ENCODINGS, encodings));
        }
        Ok(Element::master(ids::TRACK_ENTRY, children))
    }

    /// Reads a `TrackEntry` element. Optional fields absent from the element stay `None`.
    pub fn from_element(element: &Element) -> EbmlResult<TrackEntry> {
        let number = element
            .get_uint(ids::TRACK_NUMBER)
            .ok_or(EbmlError::MissingElement("TrackNumber"))?;
        let track_type = element
            .get_uint(ids::TRACK_TYPE)
            .ok_or(EbmlError::MissingElement("TrackType"))?;
        let codec_id = element
            .get_string(ids::CODEC_ID)
            .ok_or(EbmlError::MissingElement("CodecID"))?;
        let video = element.find_first(ids::VIDEO).and_then(|video| {
            Some((
                video.get_uint(ids::PIXEL_WIDTH)?,
                video.get_uint(ids::PIXEL_HEIGHT)?,
            ))
        });
        let audio = element.find_first(ids::AUDIO).and_then(|audio| {
            Some((
                audio.get_float(ids::SAMPLING_FREQUENCY)?,
                audio.get_uint(ids::CHANNELS)?,
            ))
        });
        let content_encodings = element
            .find_first(ids::CONTENT_ENCODINGS)
            .map(|encodings| {
                encodings
                    .find_all(ids::CONTENT_ENCODING)
                    .map(ContentEncoding::from_element)
                    .collect()
            })
            .unwrap_or_default();
        Ok(TrackEntry {
            number,
            uid: element.get_uint(ids::TRACK_UID).unwrap_or(number),
            track_type: track_type.into(),
            codec_id,
            codec_private: element.get_binary(ids::CODEC_PRIVATE).map(<[u8]>::to_vec),
            name: present_string(element, ids::NAME),
            language: present_string(element, ids::LANGUAGE),
            default_duration: element
                .find_first(ids::DEFAULT_DURATION)
                .and_then(Element::as_uint),
            lacing: element.get_uint(ids::FLAG_LACING) != Some(0),
            video,
            audio,
            content_encodings,
        })
    }
}

fn present_string(element: &Element, id: Id) -> Option<String> {
    element
        .find_first(id)
        .and_then(Element::as_str)
        .map(String::from)
}

/// Builds an `Info` element with the timecode scale and the applications that wrote the file.
pub fn info_element(timecode_scale: u64, muxing_app: &str, writing_app: &str) -> Element {
    Element::master(
        ids::INFO,
        vec![
            Element::uint(ids::TIMECODE_SCALE, timecode_scale),
            Element::string(ids::MUXING_APP, muxing_app),
            Element::string(ids::WRITING_APP, writing_app),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_types() {
        assert_eq!(TrackType::Subtitle, TrackType::from(0x11));
        assert_eq!(TrackType::Other(0x42), TrackType::from(0x42));
        assert_eq!(0x20, TrackType::Control.code());
    }

    #[test]
    fn entry_round_trip() {
        let track = TrackEntry::new(2, TrackType::Video, "V_VP9")
            .with_uid(0xDEAD)
            .with_language("und")
            .with_default_duration(40_000_000)
            .with_video(640, 480)
            .with_lacing(false);
        let element = track.to_element().unwrap();
        element.validate().unwrap();
        assert_eq!(track, TrackEntry::from_element(&element).unwrap());

        let audio = TrackEntry::new(1, TrackType::Audio, "A_OPUS").with_audio(48_000.0, 2);
        let element = audio.to_element().unwrap();
        assert_eq!(audio, TrackEntry::from_element(&element).unwrap());
    }

    #[test]
    fn absent_language_stays_absent() {
        let element = Element::master(
            ids::TRACK_ENTRY,
            vec![
                Element::uint(ids::TRACK_NUMBER, 1),
                Element::uint(ids::TRACK_UID, 1),
                Element::uint(ids::TRACK_TYPE, 2),
                Element::string(ids::CODEC_ID, "A_OPUS"),
            ],
        );
        let track = TrackEntry::from_element(&element).unwrap();
        assert_eq!(None, track.language);
        assert_eq!(None, track.name);
        assert_eq!(None, track.default_duration);
        assert!(track.lacing);
        assert_eq!(Some("eng".to_string()), element.get_string(ids::LANGUAGE));
    }

    #[test]
    fn content_encodings() {
        let track = TrackEntry::new(1, TrackType::Audio, "A_AC3")
            .with_content_encoding(ContentEncoding::header_stripping(vec![0x0B, 0x77]));
        let element = track.to_element().unwrap();
        element.validate().unwrap();
        let encodings = element.find_first(ids::CONTENT_ENCODINGS).unwrap();
        let compression = encodings
            .find_first(ids::CONTENT_ENCODING)
            .and_then(|e| e.find_first(ids::CONTENT_COMPRESSION))
            .unwrap();
        assert_eq!(Some(3), compression.get_uint(ids::CONTENT_COMP_ALGO));
        assert_eq!(Some(&[0x0B, 0x77][..]), compression.get_binary(ids::CONTENT_COMP_SETTINGS));

        let read = TrackEntry::from_element(&element).unwrap();
        assert_eq!(track, read);
        assert_eq!(Some(&[0x0B, 0x77][..]), read.stripped_header());
        assert_eq!(&[0x0B, 0x77, 1, 2][..], &*read.decode_frame(&[1, 2]).unwrap());

        let plain = TrackEntry::new(2, TrackType::Video, "V_VP9");
        assert!(matches!(plain.decode_frame(&[5]).unwrap(), Cow::Borrowed(&[5])));

        let zlib = plain
            .with_content_encoding(ContentEncoding::compression(CompressionAlgorithm::Zlib, None));
        assert_eq!(None, zlib.stripped_header());
        assert!(matches!(
            zlib.decode_frame(&[5]),
            Err(EbmlError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn encoding_defaults() {
        let element = Element::master(
            ids::CONTENT_ENCODING,
            vec![Element::master(ids::CONTENT_COMPRESSION, vec![])],
        );
        let encoding = ContentEncoding::from_element(&element);
        assert_eq!(0, encoding.order);
        assert_eq!(SCOPE_FRAMES, encoding.scope);
        assert_eq!(
            Some(ContentCompression {
                algorithm: CompressionAlgorithm::Zlib,
                settings: None,
            }),
            encoding.compression
        );
        assert_eq!(CompressionAlgorithm::Other(9), CompressionAlgorithm::from(9));
    }

    #[test]
    fn bad_entries() {
        let track = TrackEntry::new(0x3FFF, TrackType::Audio, "A_AAC");
        assert!(matches!(
            track.to_element(),
            Err(EbmlError::TrackNumberOutOfRange(0x3FFF))
        ));

        let element = Element::master(
            ids::TRACK_ENTRY,
            vec![
                Element::uint(ids::TRACK_NUMBER, 1),
                Element::uint(ids::TRACK_TYPE, 2),
            ],
        );
        assert!(matches!(
            TrackEntry::from_element(&element),
            Err(EbmlError::MissingElement("CodecID"))
        ));
        assert_eq!(vec!["TrackUID", "CodecID"], element.check_mandatory());
    }

    #[test]
    fn info() {
        let info = info_element(1_000_000, "mux", "write");
        assert!(info.check_mandatory().is_empty());
        assert_eq!(Some(1_000_000), info.get_uint(ids::TIMECODE_SCALE));
    }
}
