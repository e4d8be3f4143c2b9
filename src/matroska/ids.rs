//! Matroska element IDs and their schema entries.

use crate::id::Id;
use crate::schema::{Cardinality, DefaultValue, ElementKind, Parents, SemanticContext};

/// The root of a Matroska stream, holding everything but the EBML header.
pub const SEGMENT: Id = Id::new(0x1853_8067);

/// An index of the top-level elements of the segment.
pub const SEEK_HEAD: Id = Id::new(0x114D_9B74);
/// One entry of a seek head.
pub const SEEK: Id = Id::new(0x4DBB);
/// The encoded ID of the element a seek entry points at.
pub const SEEK_ID: Id = Id::new(0x53AB);
/// The segment-relative position of the element a seek entry points at.
pub const SEEK_POSITION: Id = Id::new(0x53AC);

/// General information about the segment.
pub const INFO: Id = Id::new(0x1549_A966);
/// A random 128-bit identifier of the segment.
pub const SEGMENT_UID: Id = Id::new(0x73A4);
/// The file name of the segment.
pub const SEGMENT_FILENAME: Id = Id::new(0x7384);
/// The UID of the segment played before this one.
pub const PREV_UID: Id = Id::new(0x3C_B923);
/// The file name of the segment played before this one.
pub const PREV_FILENAME: Id = Id::new(0x3C_83AB);
/// The UID of the segment played after this one.
pub const NEXT_UID: Id = Id::new(0x3E_B923);
/// The file name of the segment played after this one.
pub const NEXT_FILENAME: Id = Id::new(0x3E_83BB);
/// A UID shared by all segments of a family.
pub const SEGMENT_FAMILY: Id = Id::new(0x4444);
/// Nanoseconds per timecode tick, for every timecode of the segment.
pub const TIMECODE_SCALE: Id = Id::new(0x2A_D7B1);
/// The duration of the segment, in ticks.
pub const DURATION: Id = Id::new(0x4489);
/// When the segment was made.
pub const DATE_UTC: Id = Id::new(0x4461);
/// A general name for the segment.
pub const TITLE: Id = Id::new(0x7BA9);
/// The library that muxed the segment.
pub const MUXING_APP: Id = Id::new(0x4D80);
/// The application that wrote the segment.
pub const WRITING_APP: Id = Id::new(0x5741);

/// A group of blocks sharing a base timecode.
pub const CLUSTER: Id = Id::new(0x1F43_B675);
/// The absolute timecode of a cluster, in ticks.
pub const TIMECODE: Id = Id::new(0xE7);
/// The tracks with no frames in a cluster.
pub const SILENT_TRACKS: Id = Id::new(0x5854);
/// A track with no frames in the cluster.
pub const SILENT_TRACK_NUMBER: Id = Id::new(0x58D7);
/// The segment-relative position of the cluster itself.
pub const POSITION: Id = Id::new(0xA7);
/// The size of the previous cluster, in bytes.
pub const PREV_SIZE: Id = Id::new(0xAB);
/// A block whose flags carry the keyframe bit, with no group around it.
pub const SIMPLE_BLOCK: Id = Id::new(0xA3);
/// A block with the elements describing it.
pub const BLOCK_GROUP: Id = Id::new(0xA0);
/// The block of a group.
pub const BLOCK: Id = Id::new(0xA1);
/// Extra data attached to a block.
pub const BLOCK_ADDITIONS: Id = Id::new(0x75A1);
/// One piece of extra data.
pub const BLOCK_MORE: Id = Id::new(0xA6);
/// What the extra data is.
pub const BLOCK_ADD_ID: Id = Id::new(0xEE);
/// The extra data.
pub const BLOCK_ADDITIONAL: Id = Id::new(0xA5);
/// The duration of a block, in ticks.
pub const BLOCK_DURATION: Id = Id::new(0x9B);
/// How long a block must be kept for decoding others.
pub const REFERENCE_PRIORITY: Id = Id::new(0xFA);
/// A frame the block depends on, as a signed tick offset from the block's timecode.
pub const REFERENCE_BLOCK: Id = Id::new(0xFB);
/// Decoder state to use from this block on.
pub const CODEC_STATE: Id = Id::new(0xA4);
/// Nanoseconds of decoded audio to drop.
pub const DISCARD_PADDING: Id = Id::new(0x75A2);

/// The track descriptions.
pub const TRACKS: Id = Id::new(0x1654_AE6B);
/// One track.
pub const TRACK_ENTRY: Id = Id::new(0xAE);
/// The number blocks use for the track.
pub const TRACK_NUMBER: Id = Id::new(0xD7);
/// A number identifying the track across segments.
pub const TRACK_UID: Id = Id::new(0x73C5);
/// What the track carries.
pub const TRACK_TYPE: Id = Id::new(0x83);
/// Whether the track is used.
pub const FLAG_ENABLED: Id = Id::new(0xB9);
/// Whether the track is picked when the user has no preference.
pub const FLAG_DEFAULT: Id = Id::new(0x88);
/// Whether the track must be played.
pub const FLAG_FORCED: Id = Id::new(0x55AA);
/// Whether blocks of the track may be laced.
pub const FLAG_LACING: Id = Id::new(0x9C);
/// The fewest frames a player must keep for the track.
pub const MIN_CACHE: Id = Id::new(0x6DE7);
/// The most frames a player must keep for the track.
pub const MAX_CACHE: Id = Id::new(0x6DF8);
/// Nanoseconds per frame, when constant.
pub const DEFAULT_DURATION: Id = Id::new(0x23_E383);
/// A scale applied to the timecodes of the track.
pub const TRACK_TIMECODE_SCALE: Id = Id::new(0x23_314F);
/// The largest `BlockAddID` the track uses.
pub const MAX_BLOCK_ADDITION_ID: Id = Id::new(0x55EE);
/// A human-readable name for the track.
pub const NAME: Id = Id::new(0x536E);
/// The language of the track.
pub const LANGUAGE: Id = Id::new(0x22_B59C);
/// The codec of the track.
pub const CODEC_ID: Id = Id::new(0x86);
/// Codec initialisation data.
pub const CODEC_PRIVATE: Id = Id::new(0x63A2);
/// A human-readable name for the codec.
pub const CODEC_NAME: Id = Id::new(0x25_8688);
/// Nanoseconds the codec delays its output by.
pub const CODEC_DELAY: Id = Id::new(0x56AA);
/// Nanoseconds to decode before a seek target.
pub const SEEK_PRE_ROLL: Id = Id::new(0x56BB);
/// Video settings of a track.
pub const VIDEO: Id = Id::new(0xE0);
/// Whether the video is interlaced.
pub const FLAG_INTERLACED: Id = Id::new(0x9A);
/// The width of the stored picture.
pub const PIXEL_WIDTH: Id = Id::new(0xB0);
/// The height of the stored picture.
pub const PIXEL_HEIGHT: Id = Id::new(0xBA);
/// The width to show the picture at.
pub const DISPLAY_WIDTH: Id = Id::new(0x54B0);
/// The height to show the picture at.
pub const DISPLAY_HEIGHT: Id = Id::new(0x54BA);
/// The unit of the display size.
pub const DISPLAY_UNIT: Id = Id::new(0x54B2);
/// Audio settings of a track.
pub const AUDIO: Id = Id::new(0xE1);
/// Samples per second.
pub const SAMPLING_FREQUENCY: Id = Id::new(0xB5);
/// Samples per second after decoding, when it differs.
pub const OUTPUT_SAMPLING_FREQUENCY: Id = Id::new(0x78B5);
/// The number of channels.
pub const CHANNELS: Id = Id::new(0x9F);
/// Bits per sample.
pub const BIT_DEPTH: Id = Id::new(0x6264);
/// The encodings applied to the frames of a track.
pub const CONTENT_ENCODINGS: Id = Id::new(0x6D80);
/// One encoding.
pub const CONTENT_ENCODING: Id = Id::new(0x6240);
/// Where the encoding comes in the chain; the highest is undone first.
pub const CONTENT_ENCODING_ORDER: Id = Id::new(0x5031);
/// What the encoding applies to, as a bit set.
pub const CONTENT_ENCODING_SCOPE: Id = Id::new(0x5032);
/// 0 for compression, 1 for encryption.
pub const CONTENT_ENCODING_TYPE: Id = Id::new(0x5033);
/// The compression settings of an encoding.
pub const CONTENT_COMPRESSION: Id = Id::new(0x5034);
/// The compression algorithm.
pub const CONTENT_COMP_ALGO: Id = Id::new(0x4254);
/// Settings of the algorithm; the stripped bytes for header stripping.
pub const CONTENT_COMP_SETTINGS: Id = Id::new(0x4255);
/// The encryption settings of an encoding.
pub const CONTENT_ENCRYPTION: Id = Id::new(0x5035);

/// The cue index.
pub const CUES: Id = Id::new(0x1C53_BB6B);
/// One entry of the index.
pub const CUE_POINT: Id = Id::new(0xBB);
/// The timecode of a cue point, in ticks.
pub const CUE_TIME: Id = Id::new(0xB3);
/// Where the cued block of one track is.
pub const CUE_TRACK_POSITIONS: Id = Id::new(0xB7);
/// The track of the cued block.
pub const CUE_TRACK: Id = Id::new(0xF7);
/// The segment-relative position of the cluster holding the cued block.
pub const CUE_CLUSTER_POSITION: Id = Id::new(0xF1);
/// The position of the block relative to the first payload byte of its cluster.
pub const CUE_RELATIVE_POSITION: Id = Id::new(0xF0);
/// The duration of the cued block, in ticks.
pub const CUE_DURATION: Id = Id::new(0xB2);
/// The 1-based index of the block within its cluster.
pub const CUE_BLOCK_NUMBER: Id = Id::new(0x5378);
/// The segment-relative position of the codec state for the cued block.
pub const CUE_CODEC_STATE: Id = Id::new(0xEA);
/// A frame the cued block depends on.
pub const CUE_REFERENCE: Id = Id::new(0xDB);
/// The timecode of the referenced frame, in ticks.
pub const CUE_REF_TIME: Id = Id::new(0x96);
/// The segment-relative position of the cluster holding the referenced frame.
pub const CUE_REF_CLUSTER: Id = Id::new(0x97);
/// The 1-based index of the referenced block within its cluster.
pub const CUE_REF_NUMBER: Id = Id::new(0x535F);
/// The segment-relative position of the codec state for the referenced frame.
pub const CUE_REF_CODEC_STATE: Id = Id::new(0xEB);

/// Files attached to the segment.
pub const ATTACHMENTS: Id = Id::new(0x1941_A469);
/// One attached file.
pub const ATTACHED_FILE: Id = Id::new(0x61A7);
/// A human-readable description of the file.
pub const FILE_DESCRIPTION: Id = Id::new(0x467E);
/// The name of the file.
pub const FILE_NAME: Id = Id::new(0x466E);
/// The MIME type of the file.
pub const FILE_MIME_TYPE: Id = Id::new(0x4660);
/// The file contents.
pub const FILE_DATA: Id = Id::new(0x465C);
/// A number identifying the file.
pub const FILE_UID: Id = Id::new(0x46AE);

/// The chapters of the segment.
pub const CHAPTERS: Id = Id::new(0x1043_A770);
/// One set of chapters.
pub const EDITION_ENTRY: Id = Id::new(0x45B9);
/// A number identifying the edition.
pub const EDITION_UID: Id = Id::new(0x45BC);
/// Whether the edition is hidden.
pub const EDITION_FLAG_HIDDEN: Id = Id::new(0x45BD);
/// Whether the edition is used when the user has no preference.
pub const EDITION_FLAG_DEFAULT: Id = Id::new(0x45DB);
/// One chapter, possibly holding others.
pub const CHAPTER_ATOM: Id = Id::new(0xB6);
/// A number identifying the chapter.
pub const CHAPTER_UID: Id = Id::new(0x73C4);
/// When the chapter starts, in nanoseconds.
pub const CHAPTER_TIME_START: Id = Id::new(0x91);
/// When the chapter ends, in nanoseconds.
pub const CHAPTER_TIME_END: Id = Id::new(0x92);
/// Whether the chapter is hidden.
pub const CHAPTER_FLAG_HIDDEN: Id = Id::new(0x98);
/// Whether the chapter is used.
pub const CHAPTER_FLAG_ENABLED: Id = Id::new(0x4598);
/// The title of a chapter in one language.
pub const CHAPTER_DISPLAY: Id = Id::new(0x80);
/// The title.
pub const CHAP_STRING: Id = Id::new(0x85);
/// The language of the title.
pub const CHAP_LANGUAGE: Id = Id::new(0x43_7C);
/// The country of the title.
pub const CHAP_COUNTRY: Id = Id::new(0x43_7E);

/// The tags of the segment.
pub const TAGS: Id = Id::new(0x1254_C367);
/// One tag and what it applies to.
pub const TAG: Id = Id::new(0x7373);
/// What a tag applies to.
pub const TARGETS: Id = Id::new(0x63C0);
/// The level of the target, such as 50 for an album or a movie.
pub const TARGET_TYPE_VALUE: Id = Id::new(0x68CA);
/// A name for the level of the target.
pub const TARGET_TYPE: Id = Id::new(0x63CA);
/// A track the tag applies to.
pub const TAG_TRACK_UID: Id = Id::new(0x63C5);
/// A name and its value.
pub const SIMPLE_TAG: Id = Id::new(0x67C8);
/// The name.
pub const TAG_NAME: Id = Id::new(0x45A3);
/// The language of the value.
pub const TAG_LANGUAGE: Id = Id::new(0x447A);
/// Whether this is the value to use when the user has no language preference.
pub const TAG_DEFAULT: Id = Id::new(0x4484);
/// The value, as text.
pub const TAG_STRING: Id = Id::new(0x4487);
/// The value, as bytes.
pub const TAG_BINARY: Id = Id::new(0x4485);

/// The top-level elements a SeekHead may point at.
pub const TOP_LEVEL: &[Id] = &[SEEK_HEAD, INFO, TRACKS, CLUSTER, CUES, ATTACHMENTS, CHAPTERS, TAGS];

pub(crate) fn schema() -> Vec<SemanticContext> {
    use self::Cardinality::*;
    use self::ElementKind::*;

    let ctx = SemanticContext::new;
    let segment = Parents::Of(&[SEGMENT]);
    let seek = Parents::Of(&[SEEK]);
    let info = Parents::Of(&[INFO]);
    let cluster = Parents::Of(&[CLUSTER]);
    let group = Parents::Of(&[BLOCK_GROUP]);
    let more = Parents::Of(&[BLOCK_MORE]);
    let entry = Parents::Of(&[TRACK_ENTRY]);
    let video = Parents::Of(&[VIDEO]);
    let audio = Parents::Of(&[AUDIO]);
    let encoding = Parents::Of(&[CONTENT_ENCODING]);
    let compression = Parents::Of(&[CONTENT_COMPRESSION]);
    let point = Parents::Of(&[CUE_POINT]);
    let positions = Parents::Of(&[CUE_TRACK_POSITIONS]);
    let reference = Parents::Of(&[CUE_REFERENCE]);
    let file = Parents::Of(&[ATTACHED_FILE]);
    let edition = Parents::Of(&[EDITION_ENTRY]);
    let atom = Parents::Of(&[CHAPTER_ATOM]);
    let display = Parents::Of(&[CHAPTER_DISPLAY]);
    let tag = Parents::Of(&[TAG]);
    let targets = Parents::Of(&[TARGETS]);
    let simple_tag = Parents::Of(&[SIMPLE_TAG]);

    vec![
        ctx(SEGMENT, "Segment", Master, Parents::Root).unknown_size(),

        ctx(SEEK_HEAD, "SeekHead", Master, segment).cardinality(ZeroOrMany),
        ctx(SEEK, "Seek", Master, Parents::Of(&[SEEK_HEAD])).cardinality(OneOrMany),
        ctx(SEEK_ID, "SeekID", Binary, seek).mandatory(),
        ctx(SEEK_POSITION, "SeekPosition", UInt, seek).mandatory(),

        ctx(INFO, "Info", Master, segment).mandatory(),
        ctx(SEGMENT_UID, "SegmentUID", Binary, info),
        ctx(SEGMENT_FILENAME, "SegmentFilename", Utf8, info),
        ctx(PREV_UID, "PrevUID", Binary, info),
        ctx(PREV_FILENAME, "PrevFilename", Utf8, info),
        ctx(NEXT_UID, "NextUID", Binary, info),
        ctx(NEXT_FILENAME, "NextFilename", Utf8, info),
        ctx(SEGMENT_FAMILY, "SegmentFamily", Binary, info).repeatable(),
        ctx(TIMECODE_SCALE, "TimecodeScale", UInt, info)
            .mandatory()
            .default(DefaultValue::UInt(1_000_000)),
        ctx(DURATION, "Duration", Float, info),
        ctx(DATE_UTC, "DateUTC", Date, info),
        ctx(TITLE, "Title", Utf8, info),
        ctx(MUXING_APP, "MuxingApp", Utf8, info).mandatory(),
        ctx(WRITING_APP, "WritingApp", Utf8, info).mandatory(),

        ctx(CLUSTER, "Cluster", Master, segment)
            .repeatable()
            .unknown_size(),
        ctx(TIMECODE, "Timecode", UInt, cluster).mandatory(),
        ctx(SILENT_TRACKS, "SilentTracks", Master, cluster),
        ctx(SILENT_TRACK_NUMBER, "SilentTrackNumber", UInt, Parents::Of(&[SILENT_TRACKS]))
            .repeatable(),
        ctx(POSITION, "Position", UInt, cluster),
        ctx(PREV_SIZE, "PrevSize", UInt, cluster),
        ctx(SIMPLE_BLOCK, "SimpleBlock", Binary, cluster).repeatable(),
        ctx(BLOCK_GROUP, "BlockGroup", Master, cluster).repeatable(),
        ctx(BLOCK, "Block", Binary, group).mandatory(),
        ctx(BLOCK_ADDITIONS, "BlockAdditions", Master, group),
        ctx(BLOCK_MORE, "BlockMore", Master, Parents::Of(&[BLOCK_ADDITIONS]))
            .cardinality(OneOrMany),
        ctx(BLOCK_ADD_ID, "BlockAddID", UInt, more)
            .mandatory()
            .default(DefaultValue::UInt(1)),
        ctx(BLOCK_ADDITIONAL, "BlockAdditional", Binary, more).mandatory(),
        ctx(BLOCK_DURATION, "BlockDuration", UInt, group),
        ctx(REFERENCE_PRIORITY, "ReferencePriority", UInt, group)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(REFERENCE_BLOCK, "ReferenceBlock", SInt, group).repeatable(),
        ctx(CODEC_STATE, "CodecState", Binary, group),
        ctx(DISCARD_PADDING, "DiscardPadding", SInt, group),

        ctx(TRACKS, "Tracks", Master, segment),
        ctx(TRACK_ENTRY, "TrackEntry", Master, Parents::Of(&[TRACKS])).cardinality(OneOrMany),
        ctx(TRACK_NUMBER, "TrackNumber", UInt, entry).mandatory(),
        ctx(TRACK_UID, "TrackUID", UInt, entry).mandatory(),
        ctx(TRACK_TYPE, "TrackType", UInt, entry).mandatory(),
        ctx(FLAG_ENABLED, "FlagEnabled", UInt, entry)
            .mandatory()
            .default(DefaultValue::UInt(1)),
        ctx(FLAG_DEFAULT, "FlagDefault", UInt, entry)
            .mandatory()
            .default(DefaultValue::UInt(1)),
        ctx(FLAG_FORCED, "FlagForced", UInt, entry)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(FLAG_LACING, "FlagLacing", UInt, entry)
            .mandatory()
            .default(DefaultValue::UInt(1)),
        ctx(MIN_CACHE, "MinCache", UInt, entry)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(MAX_CACHE, "MaxCache", UInt, entry),
        ctx(DEFAULT_DURATION, "DefaultDuration", UInt, entry),
        ctx(TRACK_TIMECODE_SCALE, "TrackTimecodeScale", Float, entry)
            .mandatory()
            .default(DefaultValue::Float(1.0)),
        ctx(MAX_BLOCK_ADDITION_ID, "MaxBlockAdditionID", UInt, entry)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(NAME, "Name", Utf8, entry),
        ctx(LANGUAGE, "Language", String, entry).default(DefaultValue::Str("eng")),
        ctx(CODEC_ID, "CodecID", String, entry).mandatory(),
        ctx(CODEC_PRIVATE, "CodecPrivate", Binary, entry),
        ctx(CODEC_NAME, "CodecName", Utf8, entry),
        ctx(CODEC_DELAY, "CodecDelay", UInt, entry).default(DefaultValue::UInt(0)),
        ctx(SEEK_PRE_ROLL, "SeekPreRoll", UInt, entry).default(DefaultValue::UInt(0)),
        ctx(VIDEO, "Video", Master, entry),
        ctx(FLAG_INTERLACED, "FlagInterlaced", UInt, video).default(DefaultValue::UInt(0)),
        ctx(PIXEL_WIDTH, "PixelWidth", UInt, video).mandatory(),
        ctx(PIXEL_HEIGHT, "PixelHeight", UInt, video).mandatory(),
        ctx(DISPLAY_WIDTH, "DisplayWidth", UInt, video),
        ctx(DISPLAY_HEIGHT, "DisplayHeight", UInt, video),
        ctx(DISPLAY_UNIT, "DisplayUnit", UInt, video).default(DefaultValue::UInt(0)),
        ctx(AUDIO, "Audio", Master, entry),
        ctx(SAMPLING_FREQUENCY, "SamplingFrequency", Float, audio)
            .mandatory()
            .default(DefaultValue::Float(8000.0)),
        ctx(OUTPUT_SAMPLING_FREQUENCY, "OutputSamplingFrequency", Float, audio),
        ctx(CHANNELS, "Channels", UInt, audio)
            .mandatory()
            .default(DefaultValue::UInt(1)),
        ctx(BIT_DEPTH, "BitDepth", UInt, audio),
        ctx(CONTENT_ENCODINGS, "ContentEncodings", Master, entry),
        ctx(CONTENT_ENCODING, "ContentEncoding", Master, Parents::Of(&[CONTENT_ENCODINGS]))
            .cardinality(OneOrMany),
        ctx(CONTENT_ENCODING_ORDER, "ContentEncodingOrder", UInt, encoding)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(CONTENT_ENCODING_SCOPE, "ContentEncodingScope", UInt, encoding)
            .mandatory()
            .default(DefaultValue::UInt(1)),
        ctx(CONTENT_ENCODING_TYPE, "ContentEncodingType", UInt, encoding)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(CONTENT_COMPRESSION, "ContentCompression", Master, encoding),
        ctx(CONTENT_COMP_ALGO, "ContentCompAlgo", UInt, compression)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(CONTENT_COMP_SETTINGS, "ContentCompSettings", Binary, compression),
        ctx(CONTENT_ENCRYPTION, "ContentEncryption", Master, encoding),

        ctx(CUES, "Cues", Master, segment),
        ctx(CUE_POINT, "CuePoint", Master, Parents::Of(&[CUES])).cardinality(OneOrMany),
        ctx(CUE_TIME, "CueTime", UInt, point).mandatory(),
        ctx(CUE_TRACK_POSITIONS, "CueTrackPositions", Master, point).cardinality(OneOrMany),
        ctx(CUE_TRACK, "CueTrack", UInt, positions).mandatory(),
        ctx(CUE_CLUSTER_POSITION, "CueClusterPosition", UInt, positions).mandatory(),
        ctx(CUE_RELATIVE_POSITION, "CueRelativePosition", UInt, positions),
        ctx(CUE_DURATION, "CueDuration", UInt, positions),
        ctx(CUE_BLOCK_NUMBER, "CueBlockNumber", UInt, positions).default(DefaultValue::UInt(1)),
        ctx(CUE_CODEC_STATE, "CueCodecState", UInt, positions).default(DefaultValue::UInt(0)),
        ctx(CUE_REFERENCE, "CueReference", Master, positions).repeatable(),
        ctx(CUE_REF_TIME, "CueRefTime", UInt, reference).mandatory(),
        ctx(CUE_REF_CLUSTER, "CueRefCluster", UInt, reference),
        ctx(CUE_REF_NUMBER, "CueRefNumber", UInt, reference).default(DefaultValue::UInt(1)),
        ctx(CUE_REF_CODEC_STATE, "CueRefCodecState", UInt, reference)
            .default(DefaultValue::UInt(0)),

        ctx(ATTACHMENTS, "Attachments", Master, segment),
        ctx(ATTACHED_FILE, "AttachedFile", Master, Parents::Of(&[ATTACHMENTS]))
            .cardinality(OneOrMany),
        ctx(FILE_DESCRIPTION, "FileDescription", Utf8, file),
        ctx(FILE_NAME, "FileName", Utf8, file).mandatory(),
        ctx(FILE_MIME_TYPE, "FileMimeType", String, file).mandatory(),
        ctx(FILE_DATA, "FileData", Binary, file).mandatory(),
        ctx(FILE_UID, "FileUID", UInt, file).mandatory(),

        ctx(CHAPTERS, "Chapters", Master, segment),
        ctx(EDITION_ENTRY, "EditionEntry", Master, Parents::Of(&[CHAPTERS]))
            .cardinality(OneOrMany),
        ctx(EDITION_UID, "EditionUID", UInt, edition),
        ctx(EDITION_FLAG_HIDDEN, "EditionFlagHidden", UInt, edition)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(EDITION_FLAG_DEFAULT, "EditionFlagDefault", UInt, edition)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(CHAPTER_ATOM, "ChapterAtom", Master, Parents::Of(&[EDITION_ENTRY, CHAPTER_ATOM]))
            .cardinality(OneOrMany),
        ctx(CHAPTER_UID, "ChapterUID", UInt, atom).mandatory(),
        ctx(CHAPTER_TIME_START, "ChapterTimeStart", UInt, atom).mandatory(),
        ctx(CHAPTER_TIME_END, "ChapterTimeEnd", UInt, atom),
        ctx(CHAPTER_FLAG_HIDDEN, "ChapterFlagHidden", UInt, atom)
            .mandatory()
            .default(DefaultValue::UInt(0)),
        ctx(CHAPTER_FLAG_ENABLED, "ChapterFlagEnabled", UInt, atom)
            .mandatory()
            .default(DefaultValue::UInt(1)),
        ctx(CHAPTER_DISPLAY, "ChapterDisplay", Master, atom).repeatable(),
        ctx(CHAP_STRING, "ChapString", Utf8, display).mandatory(),
        ctx(CHAP_LANGUAGE, "ChapLanguage", String, display)
            .cardinality(OneOrMany)
            .default(DefaultValue::Str("eng")),
        ctx(CHAP_COUNTRY, "ChapCountry", String, display).repeatable(),

        ctx(TAGS, "Tags", Master, segment).repeatable(),
        ctx(TAG, "Tag", Master, Parents::Of(&[TAGS])).cardinality(OneOrMany),
        ctx(TARGETS, "Targets", Master, tag).mandatory(),
        ctx(TARGET_TYPE_VALUE, "TargetTypeValue", UInt, targets).default(DefaultValue::UInt(50)),
        ctx(TARGET_TYPE, "TargetType", String, targets),
        ctx(TAG_TRACK_UID, "TagTrackUID", UInt, targets)
            .repeatable()
            .default(DefaultValue::UInt(0)),
        ctx(SIMPLE_TAG, "SimpleTag", Master, Parents::Of(&[TAG, SIMPLE_TAG]))
            .cardinality(OneOrMany),
        ctx(TAG_NAME, "TagName", Utf8, simple_tag).mandatory(),
        ctx(TAG_LANGUAGE, "TagLanguage", String, simple_tag)
            .mandatory()
            .default(DefaultValue::Str("und")),
        ctx(TAG_DEFAULT, "TagDefault", UInt, simple_tag)
            .mandatory()
            .default(DefaultValue::UInt(1)),
        ctx(TAG_STRING, "TagString", Utf8, simple_tag),
        ctx(TAG_BINARY, "TagBinary", Binary, simple_tag),
    ]
}
