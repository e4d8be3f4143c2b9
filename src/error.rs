use std::io;

use thiserror::Error;

use crate::id::Id;

/// An error which can occur parsing, writing, or manipulating an EBML document.
#[derive(Error, Debug)]
pub enum EbmlError {
    /// An error from the standard I/O library.
    #[error("I/O error: {0}")]
    StdIo(#[from] io::Error),

    /// A variable-length integer used a reserved or impossible coding (a first byte of 0x00,
    /// which would require a width over 8 bytes).
    #[error("malformed variable-length integer at offset {offset}")]
    MalformedVarInt {
        /// Offset of the first byte of the integer, relative to the decoded buffer or stream.
        offset: u64,
    },

    /// The data ended in the middle of an element.
    #[error("unexpected end of data")]
    UnexpectedEof,

    /// A value does not fit the width explicitly requested for it.
    #[error("value {value} does not fit in {width} byte(s)")]
    LengthTooShort {
        /// The value to be coded.
        value: u64,
        /// The requested width.
        width: usize,
    },

    /// A value is outside the range the coding can represent at all.
    #[error("value {0} is out of range")]
    ValueOutOfRange(i128),

    /// An EBML ID was out of range.
    #[error("an id was out of range")]
    IdOutOfRange,

    /// The wrong ID was read.
    #[error("expected element {expected}, found {found}")]
    WrongId {
        /// The ID that was required at this point.
        expected: Id,
        /// The ID that was actually read.
        found: Id,
    },

    /// A child element extends past the end of its parent.
    #[error("element {id} at offset {position} overruns its parent")]
    ElementOverrun {
        /// The overrunning child.
        id: Id,
        /// Absolute position of the child's header.
        position: u64,
    },

    /// An element which must have a known size was coded with the unknown-size sentinel.
    #[error("element {0} may not have an unknown size")]
    UnknownSizeNotAllowed(Id),

    /// A leaf payload has a length its value kind cannot have.
    #[error("element {id} has an invalid payload size of {size} byte(s)")]
    InvalidValueSize {
        /// The element.
        id: Id,
        /// The payload size that was read.
        size: u64,
    },

    /// The payload of an element read with `ReadScope::Headers` was needed before being loaded.
    #[error("payload of element {0} has not been loaded")]
    DataNotLoaded(Id),

    /// Masters were nested deeper than allowed.
    #[error("recursion limit exceeded at depth {0}")]
    RecursionLimit(usize),

    /// A master operation was attempted on a leaf element.
    #[error("element {0} is not a master element")]
    NotAMaster(Id),

    /// An element was added to a master its schema does not allow as a parent.
    #[error("{child} is not a legal child of {parent}")]
    IllegalChild {
        /// Name of the parent element.
        parent: &'static str,
        /// Name of the rejected child.
        child: &'static str,
    },

    /// A block timecode is too far from its cluster's timecode to be coded in 16 bits.
    #[error("local timecode {0} does not fit in a signed 16-bit integer")]
    TimecodeOutOfRange(i64),

    /// A track number cannot be coded in a block header.
    #[error("track number {0} is out of range")]
    TrackNumberOutOfRange(u64),

    /// A frame was added to a block that no longer accepts frames.
    #[error("block is sealed and accepts no more frames")]
    BlockSealed,

    /// A frame for another track was added to a block.
    #[error("frame for track {found} added to a block of track {expected}")]
    TrackMismatch {
        /// The block's track.
        expected: u64,
        /// The frame's track.
        found: u64,
    },

    /// The lacing of a block is inconsistent.
    #[error("invalid lacing: {0}")]
    InvalidLacing(String),

    /// Frame data was requested that has not been read or has been released.
    #[error("frame {0} is not loaded")]
    FrameNotLoaded(usize),

    /// A block position was reported to the cue index without a pending reference.
    #[error("no pending cue for track {track} at timecode {timecode}")]
    CueNotPending {
        /// The block's track.
        track: u64,
        /// The block's absolute timecode.
        timecode: u64,
    },

    /// A cluster has neither a resolved nor a stored timecode.
    #[error("cluster timecode is not known")]
    MissingClusterTimecode,

    /// A segment-relative position was requested before the segment was placed in a stream.
    #[error("segment has not been read or written yet")]
    SegmentNotPlaced,

    /// An absolute position lies before the segment's data.
    #[error("position {0} lies before the segment data")]
    PositionOutsideSegment(u64),

    /// Mandatory elements without a default value are absent.
    #[error("missing mandatory element(s): {}", .0.join(", "))]
    MissingMandatory(Vec<String>),

    /// An element's position was needed before it was read or rendered.
    #[error("element {0} has no position; it has not been read or rendered")]
    NotRendered(Id),

    /// A required top-level element was not found in the stream.
    #[error("missing element: {0}")]
    MissingElement(&'static str),

    /// A track's frames use an encoding this crate cannot undo.
    #[error("unsupported content encoding: {0}")]
    UnsupportedEncoding(String),
}

/// A `Result` with error type `EbmlError`.
pub type EbmlResult<T> = Result<T, EbmlError>;
