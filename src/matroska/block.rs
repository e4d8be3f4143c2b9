//! Blocks: the frames of one track sharing a timecode, and the lacing which packs several frames
//! into a single block.
//!
//! A block is written as a short head (track number, 16-bit timecode relative to the cluster, a
//! flags byte), an optional lace header giving the frame sizes, and the frames themselves. Frame
//! buffers can be released once written, and left on disk by a partial read, without losing the
//! block's structure.

use std::io::{Read, Seek, SeekFrom};

use log::trace;

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::matroska::cluster::ClusterHandle;
use crate::matroska::ids;
use crate::read::{read_children, ElementHeader, ReadOptions, ReadScope};
use crate::size::{coded_size_length, coded_size_length_signed, read_fully, Size};

/// The number of frames after which a block stops accepting more.
pub const MAX_FRAMES: usize = 8;
/// The highest track number a block head can carry.
pub const MAX_TRACK_NUMBER: u64 = 0x3FFE;

const KEYFRAME: u8 = 0x80;
const INVISIBLE: u8 = 0x08;
const LACING_MASK: u8 = 0x06;
const DISCARDABLE: u8 = 0x01;

/// How the frames of a block are packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LacingType {
    /// A single frame; no lace header. Requesting it seals the block after its first frame.
    None,
    /// Frame sizes coded as runs of 255 plus a final byte.
    Xiph,
    /// All frames have the same size; only the count is stored.
    Fixed,
    /// The first size as a VarInt, the others as signed differences to their predecessor.
    Ebml,
    /// Whichever of the above is cheapest for the frames added.
    Auto,
}
impl LacingType {
    fn flag_bits(self) -> u8 {
        match self {
            LacingType::None | LacingType::Auto => 0,
            LacingType::Xiph => 1 << 1,
            LacingType::Fixed => 2 << 1,
            LacingType::Ebml => 3 << 1,
        }
    }

    fn from_flags(flags: u8) -> Self {
        match (flags & LACING_MASK) >> 1 {
            0 => LacingType::None,
            1 => LacingType::Xiph,
            2 => LacingType::Fixed,
            _ => LacingType::Ebml,
        }
    }

    /// Bytes taken by the lace header (frame count and size table) for frames of the given
    /// sizes, or `None` if they cannot be laced this way.
    pub fn overhead(self, sizes: &[u64]) -> Option<u64> {
        let (last, rest) = sizes.split_last()?;
        match self {
            LacingType::None if rest.is_empty() => Some(0),
            LacingType::None => None,
            LacingType::Auto => best_lacing_for(sizes).overhead(sizes),
            LacingType::Fixed if rest.iter().all(|size| size == last) => Some(1),
            LacingType::Fixed => None,
            LacingType::Xiph => Some(1 + rest.iter().map(|size| size / 255 + 1).sum::<u64>()),
            LacingType::Ebml => {
                let mut total = 1;
                let mut previous: Option<u64> = None;
                for &size in rest {
                    total += match previous {
                        None => coded_size_length(size),
                        Some(previous) => coded_size_length_signed(size as i64 - previous as i64),
                    } as u64;
                    previous = Some(size);
                }
                Some(total)
            }
        }
    }
}

/// The cheapest lacing for frames of the given sizes. Fixed lacing wins whenever all sizes are
/// equal; otherwise Xiph lacing is chosen only if strictly cheaper than EBML lacing.
pub fn best_lacing_for(sizes: &[u64]) -> LacingType {
    if sizes.len() < 2 {
        return LacingType::None;
    }
    if LacingType::Fixed.overhead(sizes).is_some() {
        return LacingType::Fixed;
    }
    if LacingType::Xiph.overhead(sizes) < LacingType::Ebml.overhead(sizes) {
        LacingType::Xiph
    } else {
        LacingType::Ebml
    }
}

fn invalid_lacing<S: Into<String>>(reason: S) -> EbmlError {
    EbmlError::InvalidLacing(reason.into())
}

fn read_frame<R: Read + ?Sized>(source: &mut R, size: u64) -> EbmlResult<Vec<u8>> {
    let mut data = Vec::new();
    (&mut *source).take(size).read_to_end(&mut data)?;
    if (data.len() as u64) < size {
        return Err(EbmlError::UnexpectedEof);
    }
    Ok(data)
}

/// The bytes of one frame. The buffer can be released independently of the block holding it; the
/// frame's size and position stay known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBuffer {
    data: Option<Vec<u8>>,
    size: u64,
    position: Option<u64>,
}
impl DataBuffer {
    /// A frame held in memory.
    pub fn new(data: Vec<u8>) -> Self {
        DataBuffer {
            size: data.len() as u64,
            data: Some(data),
            position: None,
        }
    }

    fn on_disk(size: u64, position: u64) -> Self {
        DataBuffer {
            data: None,
            size,
            position: Some(position),
        }
    }

    /// The frame size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The frame bytes, unless released or not yet loaded.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// True if the frame bytes are in memory.
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Absolute position of the frame bytes, once read or rendered.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Frees the frame bytes.
    pub fn release(&mut self) {
        self.data = None;
    }
}

/// A `SimpleBlock`, or the `Block` of a `BlockGroup`.
///
/// The timecode is absolute, in nanoseconds. The 16-bit timecode stored on disk is relative to
/// the cluster and in ticks of the segment's timecode scale; the cluster converts between the
/// two.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    simple: bool,
    track: u64,
    timecode: u64,
    local_timecode: i16,
    keyframe: bool,
    invisible: bool,
    discardable: bool,
    lacing: LacingType,
    frames: Vec<DataBuffer>,
    sealed: bool,
    position: Option<u64>,
    pub(crate) cluster: Option<ClusterHandle>,
}
impl Block {
    fn empty(simple: bool) -> Self {
        Block {
            simple,
            track: 0,
            timecode: 0,
            local_timecode: 0,
            keyframe: simple,
            invisible: false,
            discardable: false,
            lacing: LacingType::Auto,
            frames: Vec::new(),
            sealed: false,
            position: None,
            cluster: None,
        }
    }

    /// An empty `Block`, for use in a `BlockGroup`.
    pub fn new() -> Self {
        Block::empty(false)
    }

    /// An empty `SimpleBlock`, flagged as a keyframe.
    pub fn simple() -> Self {
        Block::empty(true)
    }

    /// Adds a frame. The first frame fixes the block's track and timecode, and its lacing
    /// request decides how the frames are packed. Returns whether the block accepts more frames:
    /// it seals itself once it holds `MAX_FRAMES` frames or when `LacingType::None` is requested.
    pub fn add_frame(
        &mut self,
        track: u64,
        timecode: u64,
        frame: Vec<u8>,
        lacing: LacingType,
    ) -> EbmlResult<bool> {
        if self.sealed {
            return Err(EbmlError::BlockSealed);
        }
        if self.frames.is_empty() {
            if track == 0 || track > MAX_TRACK_NUMBER {
                return Err(EbmlError::TrackNumberOutOfRange(track));
            }
            self.track = track;
            self.timecode = timecode;
            self.lacing = lacing;
        } else if track != self.track {
            return Err(EbmlError::TrackMismatch {
                expected: self.track,
                found: track,
            });
        }
        self.frames.push(DataBuffer::new(frame));
        if lacing == LacingType::None || self.frames.len() >= MAX_FRAMES {
            self.sealed = true;
        }
        Ok(!self.sealed)
    }

    /// True for a `SimpleBlock`.
    pub fn is_simple(&self) -> bool {
        self.simple
    }

    /// The track number.
    pub fn track(&self) -> u64 {
        self.track
    }

    /// The absolute timecode, in nanoseconds.
    pub fn timecode(&self) -> u64 {
        self.timecode
    }

    pub(crate) fn set_timecode(&mut self, timecode: u64) {
        self.timecode = timecode;
    }

    /// The timecode relative to the cluster, in ticks, as last read or rendered.
    pub fn local_timecode(&self) -> i16 {
        self.local_timecode
    }

    /// The keyframe flag. Only `SimpleBlock`s carry it; a `BlockGroup` is a keyframe when it has
    /// no references.
    pub fn is_keyframe(&self) -> bool {
        self.keyframe
    }

    /// Sets the keyframe flag of a `SimpleBlock`.
    pub fn set_keyframe(&mut self, keyframe: bool) {
        self.keyframe = keyframe;
    }

    /// The invisible flag: the frames are decoded but not shown.
    pub fn is_invisible(&self) -> bool {
        self.invisible
    }

    /// Sets the invisible flag.
    pub fn set_invisible(&mut self, invisible: bool) {
        self.invisible = invisible;
    }

    /// The discardable flag of a `SimpleBlock`.
    pub fn is_discardable(&self) -> bool {
        self.discardable
    }

    /// Sets the discardable flag of a `SimpleBlock`.
    pub fn set_discardable(&mut self, discardable: bool) {
        self.discardable = discardable;
    }

    /// True once the block accepts no more frames. Blocks which were read are always sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The lacing requested when the first frame was added, or the one read from disk.
    pub fn lacing(&self) -> LacingType {
        self.lacing
    }

    /// The lacing the block is written with: the requested one, or for `LacingType::Auto` the
    /// cheapest for the frames added so far.
    pub fn best_lacing(&self) -> LacingType {
        match self.lacing {
            LacingType::Auto => best_lacing_for(&self.sizes()),
            lacing => lacing,
        }
    }

    /// The cluster holding the block, if it has been added to one.
    pub fn cluster(&self) -> Option<ClusterHandle> {
        self.cluster
    }

    /// Absolute position of the block element, once read or rendered.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// The frames.
    pub fn frames(&self) -> &[DataBuffer] {
        &self.frames
    }

    /// The number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The frame sizes, in order.
    pub fn sizes(&self) -> Vec<u64> {
        self.frames.iter().map(DataBuffer::size).collect()
    }

    /// The size of frame `index`.
    pub fn frame_size(&self, index: usize) -> Option<u64> {
        self.frames.get(index).map(DataBuffer::size)
    }

    /// Absolute position of the bytes of frame `index`, once read or rendered.
    pub fn data_position(&self, index: usize) -> Option<u64> {
        self.frames.get(index).and_then(DataBuffer::position)
    }

    /// The bytes of frame `index`. Fails if they were released or left on disk by a partial read.
    pub fn frame_data(&self, index: usize) -> EbmlResult<&[u8]> {
        self.frames
            .get(index)
            .and_then(DataBuffer::data)
            .ok_or(EbmlError::FrameNotLoaded(index))
    }

    /// Frees the bytes of all frames, keeping their sizes and positions.
    pub fn release_frames(&mut self) {
        for frame in &mut self.frames {
            frame.release();
        }
    }

    /// Reads the bytes of any frames not in memory from their recorded positions.
    pub fn load_frames<R: Read + Seek>(&mut self, source: &mut R) -> EbmlResult<()> {
        for (index, frame) in self.frames.iter_mut().enumerate() {
            if frame.is_loaded() {
                continue;
            }
            let position = frame.position.ok_or(EbmlError::FrameNotLoaded(index))?;
            source.seek(SeekFrom::Start(position))?;
            frame.data = Some(read_frame(source, frame.size)?);
        }
        Ok(())
    }

    fn lacing_for_write(&self) -> EbmlResult<LacingType> {
        let sizes = self.sizes();
        let lacing = match self.lacing {
            LacingType::Auto => best_lacing_for(&sizes),
            lacing => lacing,
        };
        if sizes.len() > 256 || lacing.overhead(&sizes).is_none() {
            return Err(invalid_lacing(format!(
                "{} frame(s) cannot be written with {:?} lacing",
                sizes.len(),
                lacing
            )));
        }
        Ok(lacing)
    }

    /// Bytes before the first frame: the head and the lace header.
    pub fn head_size(&self) -> EbmlResult<u64> {
        let lacing = self.lacing_for_write()?;
        let overhead = lacing.overhead(&self.sizes()).unwrap_or(0);
        Ok(coded_size_length(self.track) as u64 + 3 + overhead)
    }

    /// Bytes taken by the block payload.
    pub fn data_size(&self) -> EbmlResult<u64> {
        Ok(self.head_size()? + self.frames.iter().map(DataBuffer::size).sum::<u64>())
    }

    fn flags(&self, lacing: LacingType) -> u8 {
        let mut flags = lacing.flag_bits();
        if self.invisible {
            flags |= INVISIBLE;
        }
        if self.simple && self.keyframe {
            flags |= KEYFRAME;
        }
        if self.simple && self.discardable {
            flags |= DISCARDABLE;
        }
        flags
    }

    /// Encodes the block payload with the given cluster-relative timecode.
    pub fn encode(&self, local_timecode: i16) -> EbmlResult<Vec<u8>> {
        let lacing = self.lacing_for_write()?;
        let sizes = self.sizes();
        let mut out = Vec::with_capacity(self.data_size()? as usize);

        Size::from_u64(self.track)
            .ok_or(EbmlError::TrackNumberOutOfRange(self.track))?
            .write(&mut out)?;
        out.extend_from_slice(&local_timecode.to_be_bytes());
        out.push(self.flags(lacing));

        if lacing != LacingType::None {
            out.push((sizes.len() - 1) as u8);
            let laced = &sizes[..sizes.len() - 1];
            match lacing {
                LacingType::Xiph => {
                    for &size in laced {
                        let mut size = size;
                        while size >= 255 {
                            out.push(255);
                            size -= 255;
                        }
                        out.push(size as u8);
                    }
                }
                LacingType::Ebml => {
                    for (i, &size) in laced.iter().enumerate() {
                        let coded = match i {
                            0 => Size::from_u64(size)
                                .ok_or(EbmlError::ValueOutOfRange(i128::from(size)))?,
                            _ => Size::from_signed(size as i64 - laced[i - 1] as i64, None)?,
                        };
                        coded.write(&mut out)?;
                    }
                }
                LacingType::Fixed | LacingType::None | LacingType::Auto => {}
            }
        }

        for index in 0..self.frames.len() {
            out.extend_from_slice(self.frame_data(index)?);
        }
        Ok(out)
    }

    /// Builds the `SimpleBlock` or `Block` element holding the encoded block.
    pub fn to_element(&self, local_timecode: i16) -> EbmlResult<Element> {
        let id = if self.simple {
            ids::SIMPLE_BLOCK
        } else {
            ids::BLOCK
        };
        Ok(Element::binary(id, self.encode(local_timecode)?))
    }

    // Records where the element built by `to_element` was rendered.
    pub(crate) fn set_rendered(
        &mut self,
        element: &Element,
        local_timecode: i16,
    ) -> EbmlResult<()> {
        self.position = element.position();
        self.local_timecode = local_timecode;
        if let Some(data_position) = element.data_position() {
            let mut offset = data_position + self.head_size()?;
            for frame in &mut self.frames {
                frame.position = Some(offset);
                offset += frame.size;
            }
        }
        Ok(())
    }

    /// Reads a block whose element header has just been read. With `ReadScope::Headers` only the
    /// head and the frame sizes are read; the frames stay on disk until `load_frames`.
    ///
    /// The timecode of the returned block is only its local timecode; the cluster reading it
    /// resolves the absolute one.
    pub fn read<R: Read + Seek>(
        source: &mut R,
        header: &ElementHeader,
        scope: ReadScope,
    ) -> EbmlResult<Block> {
        let end = header.end().ok_or(EbmlError::UnknownSizeNotAllowed(header.id))?;
        source.seek(SeekFrom::Start(header.data_position()))?;

        let track = Size::load(source)?;
        let track = track
            .get_value()
            .ok_or(EbmlError::TrackNumberOutOfRange((1u64 << (7 * track.get_width())) - 1))?;
        let mut head = [0u8; 3];
        read_fully(source, &mut head)?;
        let flags = head[2];
        let lacing = LacingType::from_flags(flags);

        let count = if lacing == LacingType::None {
            1
        } else {
            let mut count = [0u8; 1];
            read_fully(source, &mut count)?;
            usize::from(count[0]) + 1
        };

        let mut sizes: Vec<u64> = Vec::with_capacity(count);
        match lacing {
            LacingType::Xiph => {
                for _ in 1..count {
                    let mut size = 0u64;
                    loop {
                        let mut byte = [0u8; 1];
                        read_fully(source, &mut byte)?;
                        size = size
                            .checked_add(u64::from(byte[0]))
                            .ok_or_else(|| invalid_lacing("Xiph frame size overflows"))?;
                        if byte[0] != 255 {
                            break;
                        }
                    }
                    sizes.push(size);
                }
            }
            LacingType::Ebml if count > 1 => {
                let first = Size::load(source)?
                    .get_value()
                    .ok_or_else(|| invalid_lacing("unknown size in EBML lacing"))?;
                sizes.push(first);
                let mut previous = first;
                for _ in 2..count {
                    let delta = Size::load(source)?
                        .get_signed_value()
                        .ok_or_else(|| invalid_lacing("unknown size in EBML lacing"))?;
                    let size = (previous as i64)
                        .checked_add(delta)
                        .and_then(|size| u64::try_from(size).ok())
                        .ok_or_else(|| invalid_lacing("negative frame size in EBML lacing"))?;
                    sizes.push(size);
                    previous = size;
                }
            }
            _ => {}
        }

        let data_start = source.stream_position()?;
        let remaining = end
            .checked_sub(data_start)
            .ok_or_else(|| invalid_lacing("lace header overruns the block"))?;
        if lacing == LacingType::Fixed {
            if remaining % count as u64 != 0 {
                return Err(invalid_lacing(format!(
                    "{} byte(s) cannot be split into {} equal frames",
                    remaining, count
                )));
            }
            sizes = vec![remaining / count as u64; count];
        } else {
            let last = sizes
                .iter()
                .try_fold(0u64, |total, &size| total.checked_add(size))
                .and_then(|laced| remaining.checked_sub(laced))
                .ok_or_else(|| invalid_lacing("frame sizes overrun the block"))?;
            sizes.push(last);
        }

        let mut frames = Vec::with_capacity(count);
        let mut position = data_start;
        for size in sizes {
            let mut frame = DataBuffer::on_disk(size, position);
            if scope == ReadScope::Full {
                frame.data = Some(read_frame(source, size)?);
            }
            position += size;
            frames.push(frame);
        }
        source.seek(SeekFrom::Start(end))?;

        let simple = header.id == ids::SIMPLE_BLOCK;
        trace!(
            "block of track {} at {} with {} frame(s), {:?} lacing",
            track,
            header.position,
            frames.len(),
            lacing
        );
        Ok(Block {
            simple,
            track,
            timecode: 0,
            local_timecode: i16::from_be_bytes([head[0], head[1]]),
            keyframe: simple && flags & KEYFRAME != 0,
            invisible: flags & INVISIBLE != 0,
            discardable: simple && flags & DISCARDABLE != 0,
            lacing,
            frames,
            sealed: true,
            position: Some(header.position),
            cluster: None,
        })
    }
}
impl Default for Block {
    fn default() -> Self {
        Block::new()
    }
}

/// A `BlockGroup`: a `Block` with the information a `SimpleBlock` cannot carry.
///
/// References are absolute timecodes in nanoseconds; on disk they are signed tick offsets from
/// the block's own timecode.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockGroup {
    block: Block,
    duration: Option<u64>,
    reference_priority: u64,
    references: Vec<u64>,
    reference_offsets: Vec<i64>,
    codec_state: Option<Vec<u8>>,
    discard_padding: Option<i64>,
    others: Vec<Element>,
    position: Option<u64>,
}
impl BlockGroup {
    /// Wraps a block.
    pub fn new(block: Block) -> Self {
        BlockGroup {
            block,
            duration: None,
            reference_priority: 0,
            references: Vec::new(),
            reference_offsets: Vec::new(),
            codec_state: None,
            discard_padding: None,
            others: Vec::new(),
            position: None,
        }
    }

    /// The block.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// The block, for editing.
    pub fn block_mut(&mut self) -> &mut Block {
        &mut self.block
    }

    /// The duration of the block, in ticks.
    pub fn duration(&self) -> Option<u64> {
        self.duration
    }

    /// Sets the duration of the block, in ticks.
    pub fn set_duration(&mut self, duration: Option<u64>) {
        self.duration = duration;
    }

    /// The reference priority. 0 means no other block refers to this one.
    pub fn reference_priority(&self) -> u64 {
        self.reference_priority
    }

    /// Sets the reference priority.
    pub fn set_reference_priority(&mut self, priority: u64) {
        self.reference_priority = priority;
    }

    /// The absolute timecodes of the frames this block depends on.
    pub fn references(&self) -> &[u64] {
        &self.references
    }

    /// Makes the block depend on the frame at `timecode`.
    pub fn add_reference(&mut self, timecode: u64) {
        self.references.push(timecode);
    }

    /// True if the block does not depend on other frames.
    pub fn is_keyframe(&self) -> bool {
        self.references.is_empty() && self.reference_offsets.is_empty()
    }

    /// The codec state.
    pub fn codec_state(&self) -> Option<&[u8]> {
        self.codec_state.as_deref()
    }

    /// Sets the codec state.
    pub fn set_codec_state(&mut self, state: Option<Vec<u8>>) {
        self.codec_state = state;
    }

    /// Nanoseconds of padding to discard at the end of the block.
    pub fn discard_padding(&self) -> Option<i64> {
        self.discard_padding
    }

    /// Sets the discard padding.
    pub fn set_discard_padding(&mut self, padding: Option<i64>) {
        self.discard_padding = padding;
    }

    /// Children of the group which have no dedicated field, in file order.
    pub fn others(&self) -> &[Element] {
        &self.others
    }

    /// Absolute position of the group element, once read or rendered.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Builds the `BlockGroup` element. `timecode_scale` converts references to ticks.
    pub fn to_element(&self, local_timecode: i16, timecode_scale: u64) -> EbmlResult<Element> {
        let scale = timecode_scale.max(1) as i128;
        let mut children = vec![self.block.to_element(local_timecode)?];
        if let Some(duration) = self.duration {
            children.push(Element::uint(ids::BLOCK_DURATION, duration));
        }
        if self.reference_priority != 0 {
            children.push(Element::uint(ids::REFERENCE_PRIORITY, self.reference_priority));
        }
        for &reference in &self.references {
            let offset = (i128::from(reference) - i128::from(self.block.timecode)) / scale;
            let offset =
                i64::try_from(offset).map_err(|_| EbmlError::ValueOutOfRange(offset))?;
            children.push(Element::sint(ids::REFERENCE_BLOCK, offset));
        }
        for &offset in &self.reference_offsets {
            children.push(Element::sint(ids::REFERENCE_BLOCK, offset));
        }
        if let Some(ref state) = self.codec_state {
            children.push(Element::binary(ids::CODEC_STATE, state.clone()));
        }
        if let Some(padding) = self.discard_padding {
            children.push(Element::sint(ids::DISCARD_PADDING, padding));
        }
        children.extend(self.others.iter().cloned());
        Ok(Element::master(ids::BLOCK_GROUP, children))
    }

    pub(crate) fn set_rendered(
        &mut self,
        element: &Element,
        local_timecode: i16,
    ) -> EbmlResult<()> {
        self.position = element.position();
        let block = element
            .find_first(ids::BLOCK)
            .ok_or(EbmlError::MissingElement("Block"))?;
        self.block.set_rendered(block, local_timecode)
    }

    // Turns the tick offsets read from disk into absolute timecodes, once the block's own
    // timecode is known.
    pub(crate) fn resolve_references(&mut self, timecode_scale: u64) -> EbmlResult<()> {
        let base = i128::from(self.block.timecode);
        let scale = i128::from(timecode_scale.max(1));
        for &offset in &self.reference_offsets {
            let reference = base + i128::from(offset) * scale;
            let reference = u64::try_from(reference)
                .map_err(|_| EbmlError::TimecodeOutOfRange(offset))?;
            self.references.push(reference);
        }
        self.reference_offsets.clear();
        Ok(())
    }

    // Turns resolved references back into tick offsets against the scale they were resolved
    // with.
    pub(crate) fn unresolve_references(&mut self, timecode_scale: u64) -> EbmlResult<()> {
        let base = i128::from(self.block.timecode);
        let scale = i128::from(timecode_scale.max(1));
        for reference in self.references.drain(..) {
            let offset = (i128::from(reference) - base) / scale;
            let offset =
                i64::try_from(offset).map_err(|_| EbmlError::ValueOutOfRange(offset))?;
            self.reference_offsets.push(offset);
        }
        Ok(())
    }

    /// Reads a group whose element header has just been read. The block follows the scope of
    /// `options`; the other children are always read in full.
    pub fn read<R: Read + Seek>(
        source: &mut R,
        header: &ElementHeader,
        options: &ReadOptions,
        depth: usize,
    ) -> EbmlResult<BlockGroup> {
        if depth >= options.max_depth {
            return Err(EbmlError::RecursionLimit(depth));
        }
        let full = ReadOptions {
            scope: ReadScope::Full,
            ..*options
        };
        let mut block = None;
        let mut group = BlockGroup::new(Block::new());
        read_children(source, header, |source, child| {
            if child.id == ids::BLOCK {
                block = Some(Block::read(source, &child, options.scope)?);
                return Ok(());
            }
            let element =
                match Element::read_child(source, &child, ids::BLOCK_GROUP, &full, depth + 1)? {
                    Some(element) => element,
                    None => return Ok(()),
                };
            match element.id() {
                ids::BLOCK_DURATION => group.duration = element.as_uint(),
                ids::REFERENCE_PRIORITY => {
                    group.reference_priority = element.as_uint().unwrap_or(0)
                }
                ids::REFERENCE_BLOCK => group.reference_offsets.extend(element.as_sint()),
                ids::CODEC_STATE => group.codec_state = element.as_binary().map(<[u8]>::to_vec),
                ids::DISCARD_PADDING => group.discard_padding = element.as_sint(),
                _ => group.others.push(element),
            }
            Ok(())
        })?;
        group.block = block.ok_or(EbmlError::MissingElement("Block"))?;
        group.position = Some(header.position);
        Ok(group)
    }
}
