#![deny(missing_debug_implementations, trivial_casts, unsafe_code)]
#![warn(missing_docs)]

//! This library reads and writes documents in the Extensible Binary Meta Language format, and the
//! Matroska media container built on top of it. Like XML, EBML is an extensible format with many
//! possible elements; what each element ID means is described by a schema. Here the schema is a
//! table (see `schema`) covering the EBML header elements and the Matroska elements, and every
//! element, whatever its type, is an `Element` holding either a value or more elements.
//!
//! On top of the generic tree the `matroska` module provides the parts of the container that are
//! more than a tree: blocks and their frame lacing, clusters and their timecodes, the cue and
//! seek indexes, and a writer which streams a segment to disk and fixes its size up at the end.
//!
//! All I/O goes through `std::io::{Read, Write, Seek}`; nothing here is asynchronous or
//! synchronized internally.
//!
//! ## Features
//!
//! Enable the "chrono" cargo feature in order to support conversion between `chrono` dates and
//! EBML dates.
//!
//! ## Logging
//!
//! Recoverable problems in a document (skipped or unknown elements, bad checksums) are reported
//! through the `log` facade. No logger is installed by this crate.

pub mod matroska;
pub mod read;
pub mod schema;
pub mod std_elems;
pub mod value;

mod container;
mod element;
mod error;
mod id;
mod size;

pub use crate::container::crc32;
pub use crate::element::{Element, Payload};
pub use crate::error::{EbmlError, EbmlResult};
pub use crate::id::{Id, MAX_ID_WIDTH};
pub use crate::read::{read_ebml_head, ElementHeader, ReadOptions, ReadScope};
pub use crate::schema::{Cardinality, ElementKind, SemanticContext};
pub use crate::size::{
    coded_size_length, coded_size_length_signed, Size, MAX_VALUE, MAX_WIDTH, UNKNOWN_SIZE,
};
pub use crate::value::{DateValue, Value};
