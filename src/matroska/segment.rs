//! The segment: the top-level Matroska element, owning its metadata, clusters and indexes.
//!
//! Positions stored in the indexes are relative to the segment's payload. A `SegmentBase`
//! converts between those and absolute stream positions once the segment has been read or its
//! header written.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::matroska::block::{BlockGroup, LacingType, MAX_TRACK_NUMBER};
use crate::matroska::cluster::{BlockEntry, BlockRef, Cluster, ClusterHandle};
use crate::matroska::cues::Cues;
use crate::matroska::ids;
use crate::matroska::seek_head::SeekHead;
use crate::matroska::tracks::{info_element, TrackEntry};
use crate::read::{read_children, ElementHeader, ReadOptions, ReadScope};
use crate::schema;
use crate::std_elems;

/// The default number of nanoseconds per tick.
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Where a segment sits in its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBase {
    /// Absolute position of the segment's ID.
    pub position: u64,
    /// Bytes taken by the segment's ID and size field.
    pub header_size: u64,
}
impl SegmentBase {
    /// Absolute position of the first payload byte; relative positions count from here.
    pub fn data_position(&self) -> u64 {
        self.position + self.header_size
    }

    /// Converts an absolute position to one relative to the segment's payload.
    pub fn relative_position(&self, absolute: u64) -> EbmlResult<u64> {
        absolute
            .checked_sub(self.data_position())
            .ok_or(EbmlError::PositionOutsideSegment(absolute))
    }

    /// Converts a position relative to the segment's payload to an absolute one.
    pub fn global_position(&self, relative: u64) -> u64 {
        self.data_position() + relative
    }
}

/// One frame of a segment with its timing, as returned by `Segment::frames`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// The track.
    pub track: u64,
    /// Start time, in nanoseconds.
    pub start: u64,
    /// End time, in nanoseconds, when the block or its track gives a duration.
    pub end: Option<u64>,
    /// True if the frame can be decoded on its own.
    pub keyframe: bool,
    /// True if the frame may be dropped.
    pub discardable: bool,
    /// True if the frame is decoded but not shown.
    pub invisible: bool,
    /// The frame bytes, unless released or not read.
    pub data: Option<&'a [u8]>,
}

/// How `Segment::seek` picks where playback resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Resume at the requested time; earlier frames are skipped.
    Exact,
    /// Resume each track at its last keyframe at or before the requested time.
    PreviousKeyframe,
}

/// Where playback resumes, as found by `Segment::seek`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeekTarget {
    /// The cluster to start reading from.
    pub cluster: ClusterHandle,
    /// The requested time, in nanoseconds.
    pub timecode: u64,
    /// The mode the target was found with.
    pub mode: SeekMode,
    /// For each track, the start of its first frame to deliver. Tracks without an entry resume
    /// at `timecode`.
    pub starts: BTreeMap<u64, u64>,
}

/// A Matroska segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub(crate) base: Option<SegmentBase>,
    pub(crate) info: Option<Element>,
    pub(crate) tracks: Vec<TrackEntry>,
    pub(crate) seek_heads: Vec<SeekHead>,
    pub(crate) clusters: Vec<Cluster>,
    pub(crate) cues: Option<Cues>,
    pub(crate) others: Vec<Element>,
    pub(crate) size: Option<u64>,
}
impl Segment {
    /// A segment with an `Info` element using the default timecode scale and naming this crate
    /// as the muxing and writing application.
    pub fn new() -> Self {
        let app = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));
        Segment {
            info: Some(info_element(DEFAULT_TIMECODE_SCALE, app, app)),
            ..Segment::empty()
        }
    }

    /// A segment with no elements at all, not even `Info`.
    pub fn empty() -> Self {
        Segment {
            base: None,
            info: None,
            tracks: Vec::new(),
            seek_heads: Vec::new(),
            clusters: Vec::new(),
            cues: None,
            others: Vec::new(),
            size: None,
        }
    }

    /// Nanoseconds per tick, from `Info`.
    pub fn timecode_scale(&self) -> u64 {
        self.info
            .as_ref()
            .and_then(|info| info.get_uint(ids::TIMECODE_SCALE))
            .filter(|&scale| scale > 0)
            .unwrap_or(DEFAULT_TIMECODE_SCALE)
    }

    /// The `Info` element.
    pub fn info(&self) -> Option<&Element> {
        self.info.as_ref()
    }

    /// Sets the `TimecodeScale` in `Info`. Clusters already read or rendered keep their stored
    /// tick values, so their block timecodes are resolved again under the new scale.
    pub fn set_timecode_scale(&mut self, timecode_scale: u64) -> EbmlResult<()> {
        let timecode_scale = timecode_scale.max(1);
        self.info_mut().set_uint(ids::TIMECODE_SCALE, timecode_scale)?;
        self.apply_timecode_scale()
    }

    fn apply_timecode_scale(&mut self) -> EbmlResult<()> {
        let scale = self.timecode_scale();
        for cluster in &mut self.clusters {
            cluster.rescale(scale)?;
        }
        if let Some(ref mut cues) = self.cues {
            cues.set_timecode_scale(scale);
        }
        Ok(())
    }

    /// The `Info` element, created empty if absent.
    pub fn info_mut(&mut self) -> &mut Element {
        self.info
            .get_or_insert_with(|| Element::master(ids::INFO, Vec::new()))
    }

    /// Adds a track, replacing any track with the same number.
    pub fn add_track(&mut self, track: TrackEntry) -> EbmlResult<()> {
        if track.number == 0 || track.number > MAX_TRACK_NUMBER {
            return Err(EbmlError::TrackNumberOutOfRange(track.number));
        }
        self.tracks.retain(|t| t.number != track.number);
        self.tracks.push(track);
        Ok(())
    }

    /// The tracks, in the order they were added or read.
    pub fn track_entries(&self) -> &[TrackEntry] {
        &self.tracks
    }

    /// The track with number `number`.
    pub fn track(&self, number: u64) -> Option<&TrackEntry> {
        self.tracks.iter().find(|t| t.number == number)
    }

    /// The numbers of all tracks.
    pub fn track_numbers(&self) -> BTreeSet<u64> {
        self.tracks.iter().map(|t| t.number).collect()
    }

    /// Starts a new cluster after the existing ones.
    pub fn new_cluster(&mut self) -> ClusterHandle {
        let handle = ClusterHandle(self.clusters.len());
        let mut cluster = Cluster::new(self.timecode_scale());
        cluster.set_previous_timecode(self.clusters.last().and_then(Cluster::global_timecode));
        cluster.set_handle(handle);
        self.clusters.push(cluster);
        handle
    }

    /// The clusters, in file order.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// The cluster behind `handle`.
    pub fn cluster(&self, handle: ClusterHandle) -> Option<&Cluster> {
        self.clusters.get(handle.0)
    }

    /// The cluster behind `handle`, for editing.
    pub fn cluster_mut(&mut self, handle: ClusterHandle) -> Option<&mut Cluster> {
        self.clusters.get_mut(handle.0)
    }

    fn cluster_for_write(&mut self, handle: ClusterHandle) -> EbmlResult<&mut Cluster> {
        self.clusters
            .get_mut(handle.0)
            .ok_or(EbmlError::MissingElement("Cluster"))
    }

    /// Adds a frame to a cluster; see `Cluster::add_frame`.
    pub fn add_frame(
        &mut self,
        handle: ClusterHandle,
        track: u64,
        timecode: u64,
        frame: Vec<u8>,
        lacing: LacingType,
    ) -> EbmlResult<BlockRef> {
        let index = self
            .cluster_for_write(handle)?
            .add_frame(track, timecode, frame, lacing)?;
        Ok(BlockRef {
            cluster: handle,
            index,
        })
    }

    /// Adds a block group to a cluster.
    pub fn add_block_group(
        &mut self,
        handle: ClusterHandle,
        group: BlockGroup,
    ) -> EbmlResult<BlockRef> {
        let index = self.cluster_for_write(handle)?.add_block_group(group)?;
        Ok(BlockRef {
            cluster: handle,
            index,
        })
    }

    /// The block behind `block`.
    pub fn block(&self, block: BlockRef) -> Option<&BlockEntry> {
        self.cluster(block.cluster)?.entry(block.index)
    }

    /// The cue index, if there is one.
    pub fn cues(&self) -> Option<&Cues> {
        self.cues.as_ref()
    }

    /// The cue index, created empty if absent.
    pub fn cues_mut(&mut self) -> &mut Cues {
        let scale = self.timecode_scale();
        self.cues.get_or_insert_with(|| Cues::new(scale))
    }

    /// Asks for a cue on a block, written once the block's cluster is.
    pub fn add_cue(&mut self, block: BlockRef) -> EbmlResult<()> {
        let (track, timecode) = {
            let entry = self
                .block(block)
                .ok_or(EbmlError::MissingElement("Block"))?;
            (entry.block().track(), entry.block().timecode())
        };
        self.cues_mut().add_block(block, track, timecode);
        Ok(())
    }

    /// Adds another top-level element, such as `Tags` or `Chapters`.
    pub fn add_element(&mut self, element: Element) -> EbmlResult<()> {
        if !schema::is_legal_child(Some(ids::SEGMENT), element.id()) {
            return Err(EbmlError::IllegalChild {
                parent: "Segment",
                child: element.name(),
            });
        }
        self.others.push(element);
        Ok(())
    }

    /// Top-level elements with no dedicated field, in file order.
    pub fn others(&self) -> &[Element] {
        &self.others
    }

    /// The seek heads read or written.
    pub fn seek_heads(&self) -> &[SeekHead] {
        &self.seek_heads
    }

    /// The `Tracks` element, or `None` without tracks.
    pub fn tracks_element(&self) -> EbmlResult<Option<Element>> {
        if self.tracks.is_empty() {
            return Ok(None);
        }
        let entries = self
            .tracks
            .iter()
            .map(TrackEntry::to_element)
            .collect::<EbmlResult<Vec<_>>>()?;
        Ok(Some(Element::master(ids::TRACKS, entries)))
    }

    /// Names of the mandatory elements without a default missing from the segment's metadata.
    pub fn check_mandatory(&self) -> EbmlResult<Vec<&'static str>> {
        let mut children: Vec<Element> = self.info.iter().cloned().collect();
        children.extend(self.tracks_element()?);
        children.extend(self.others.iter().cloned());
        Ok(Element::master(ids::SEGMENT, children).check_mandatory())
    }

    /// Fails with `MissingMandatory` if `check_mandatory` reports anything.
    pub fn validate(&self) -> EbmlResult<()> {
        let missing = self.check_mandatory()?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EbmlError::MissingMandatory(
                missing.into_iter().map(String::from).collect(),
            ))
        }
    }

    /// Where the segment sits in its stream, once read or written.
    pub fn base(&self) -> Option<SegmentBase> {
        self.base
    }

    /// Bytes taken by the segment's payload, once read or written.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Converts an absolute position to a segment-relative one.
    pub fn relative_position(&self, absolute: u64) -> EbmlResult<u64> {
        self.base
            .ok_or(EbmlError::SegmentNotPlaced)?
            .relative_position(absolute)
    }

    /// Converts a segment-relative position to an absolute one.
    pub fn global_position(&self, relative: u64) -> EbmlResult<u64> {
        Ok(self
            .base
            .ok_or(EbmlError::SegmentNotPlaced)?
            .global_position(relative))
    }

    /// The absolute position of a top-level element according to the seek heads.
    pub fn locate(&self, id: Id) -> Option<u64> {
        let base = self.base?;
        self.seek_heads
            .iter()
            .find_map(|head| head.find(id))
            .map(|relative| base.global_position(relative))
    }

    /// The cluster to start decoding from to reach `timecode` (nanoseconds), according to the
    /// cues.
    pub fn seek_cluster(&self, timecode: u64) -> Option<ClusterHandle> {
        let relative = self.cues.as_ref()?.timecode_position(timecode)?;
        let absolute = self.base?.global_position(relative);
        self.clusters
            .iter()
            .position(|c| c.position() == Some(absolute))
            .map(ClusterHandle)
    }

    /// Finds where to resume playback to reach `timecode` (nanoseconds).
    ///
    /// The search starts at the last cue point at or before `timecode`, or without usable cues
    /// at the last cluster starting at or before it. With `SeekMode::PreviousKeyframe`, each
    /// track resumes at its last keyframe before `timecode`; a track which only has delta frames
    /// there moves the start back one cue point or cluster. `None` for a segment without
    /// clusters.
    pub fn seek(&self, timecode: u64, mode: SeekMode) -> Option<SeekTarget> {
        let candidates = self.seek_candidates(timecode);
        let mut j = candidates.len().checked_sub(1)?;
        loop {
            let start = candidates[j];
            let mut target = SeekTarget {
                cluster: ClusterHandle(start),
                timecode,
                mode,
                starts: BTreeMap::new(),
            };
            if mode == SeekMode::Exact {
                return Some(target);
            }
            let mut deltas = BTreeSet::new();
            let clusters = self.clusters[start..]
                .iter()
                .take_while(|c| c.min_timecode().map_or(true, |min| min <= timecode));
            for entry in clusters.flat_map(Cluster::entries) {
                let block = entry.block();
                if block.timecode() > timecode {
                    continue;
                }
                if entry.is_keyframe() {
                    let start = target.starts.entry(block.track()).or_insert(0);
                    *start = (*start).max(block.timecode());
                } else {
                    deltas.insert(block.track());
                }
            }
            let missing = deltas.iter().any(|t| !target.starts.contains_key(t));
            if missing && j > 0 {
                debug!("no keyframe after cluster {} for every track, stepping back", start);
                j -= 1;
                continue;
            }
            return Some(target);
        }
    }

    // Cluster indices seeking may start from, ascending, all at or before `timecode`.
    fn seek_candidates(&self, timecode: u64) -> Vec<usize> {
        let scale = self.timecode_scale();
        let mut candidates: Vec<usize> = Vec::new();
        if let (Some(cues), Some(base)) = (self.cues.as_ref(), self.base) {
            for point in cues.points() {
                if point.time.saturating_mul(scale) > timecode {
                    break;
                }
                let at = point.positions.iter().find_map(|p| {
                    let absolute = base.global_position(p.cluster_position);
                    self.clusters
                        .iter()
                        .position(|c| c.position() == Some(absolute))
                });
                if let Some(index) = at {
                    if candidates.last().map_or(true, |&last| last < index) {
                        candidates.push(index);
                    }
                }
            }
        }
        if candidates.is_empty() {
            candidates = self
                .clusters
                .iter()
                .enumerate()
                .filter(|(_, c)| c.min_timecode().map_or(false, |min| min <= timecode))
                .map(|(i, _)| i)
                .collect();
        }
        if candidates.is_empty() && !self.clusters.is_empty() {
            candidates.push(0);
        }
        candidates
    }

    /// The frames to deliver after seeking to `target`, in file order.
    ///
    /// Frames starting before the track's resume time are dropped. With
    /// `SeekMode::PreviousKeyframe` a track's frames are also dropped until its first keyframe.
    pub fn frames_from(&self, target: &SeekTarget) -> Vec<Frame<'_>> {
        let clusters = self.clusters.get(target.cluster.0..).unwrap_or(&[]);
        let mut waiting_for_key: BTreeSet<u64> = BTreeSet::new();
        if target.mode == SeekMode::PreviousKeyframe {
            waiting_for_key = self.track_numbers();
            waiting_for_key.extend(clusters.iter().flat_map(Cluster::tracks_present));
        }
        self.frames_of(clusters)
            .into_iter()
            .filter(|frame| {
                let resume = target.starts.get(&frame.track).copied();
                if frame.start < resume.unwrap_or(target.timecode) {
                    return false;
                }
                if waiting_for_key.contains(&frame.track) {
                    if !frame.keyframe {
                        return false;
                    }
                    waiting_for_key.remove(&frame.track);
                }
                true
            })
            .collect()
    }

    /// Every frame of the segment in file order, with its timing.
    ///
    /// A `BlockDuration` is spread evenly over the frames of a laced block, the remainder going
    /// to the last frame. Without one, the track's `DefaultDuration` spaces the frames. Times
    /// past the range of `u64` nanoseconds saturate.
    pub fn frames(&self) -> Vec<Frame<'_>> {
        self.frames_of(&self.clusters)
    }

    fn frames_of<'a>(&'a self, clusters: &'a [Cluster]) -> Vec<Frame<'a>> {
        let scale = self.timecode_scale();
        let default_durations: HashMap<u64, u64> = self
            .tracks
            .iter()
            .filter_map(|t| Some((t.number, t.default_duration?)))
            .collect();
        let mut frames = Vec::new();
        for entry in clusters.iter().flat_map(|c| c.entries()) {
            let block = entry.block();
            let count = block.frame_count() as u64;
            let block_duration = entry
                .group()
                .and_then(BlockGroup::duration)
                .map(|ticks| ticks.saturating_mul(scale));
            let timecode = block.timecode();
            for (i, frame) in (0..count).zip(block.frames()) {
                let (start, end) = match (block_duration, default_durations.get(&block.track())) {
                    (Some(total), _) => {
                        let each = total / count;
                        let start = timecode.saturating_add(i.saturating_mul(each));
                        let end = if i + 1 == count {
                            timecode.saturating_add(total)
                        } else {
                            start.saturating_add(each)
                        };
                        (start, Some(end))
                    }
                    (None, Some(&duration)) => {
                        let start = timecode.saturating_add(i.saturating_mul(duration));
                        (start, Some(start.saturating_add(duration)))
                    }
                    (None, None) => (timecode, None),
                };
                frames.push(Frame {
                    track: block.track(),
                    start,
                    end,
                    keyframe: entry.is_keyframe(),
                    discardable: block.is_discardable(),
                    invisible: block.is_invisible(),
                    data: frame.data(),
                });
            }
        }
        frames
    }

    /// Loads the frames a headers-only read left on disk.
    pub fn load_frames<R: Read + Seek>(&mut self, source: &mut R) -> EbmlResult<()> {
        for cluster in &mut self.clusters {
            cluster.load_frames(source)?;
        }
        Ok(())
    }

    /// Reads a segment whose element header has just been read.
    ///
    /// Metadata is always read in full; the scope of `options` applies to blocks. A seek head
    /// pointing to another seek head outside the part of the stream read is followed once.
    pub fn read<R: Read + Seek>(
        source: &mut R,
        header: &ElementHeader,
        options: &ReadOptions,
    ) -> EbmlResult<Segment> {
        let full = ReadOptions {
            scope: ReadScope::Full,
            ..*options
        };
        let base = SegmentBase {
            position: header.position,
            header_size: header.header_size as u64,
        };
        let mut segment = Segment::empty();
        segment.base = Some(base);
        let mut cues = None;

        read_children(source, header, |source, child| {
            match child.id {
                ids::CLUSTER => {
                    let scale = segment.timecode_scale();
                    let mut cluster = Cluster::read(source, &child, options, 1, scale)?;
                    let previous = segment.clusters.last().and_then(Cluster::global_timecode);
                    cluster.set_previous_timecode(previous);
                    cluster.set_handle(ClusterHandle(segment.clusters.len()));
                    segment.clusters.push(cluster);
                }
                std_elems::VOID | std_elems::CRC32 => {}
                _ => {
                    if let Some(element) =
                        Element::read_child(source, &child, ids::SEGMENT, &full, 1)?
                    {
                        segment.take_element(element, &mut cues);
                    }
                }
            }
            Ok(())
        })?;
        let end = source.stream_position()?;
        segment.size = Some(end - base.data_position());

        let chained: Vec<u64> = segment
            .seek_heads
            .iter()
            .flat_map(|head| head.entries())
            .filter(|seek| seek.id == ids::SEEK_HEAD)
            .map(|seek| base.global_position(seek.position))
            .filter(|&at| at >= end)
            .collect();
        for at in chained {
            if segment.seek_heads.iter().any(|h| h.position() == Some(at)) {
                continue;
            }
            source.seek(SeekFrom::Start(at))?;
            match ElementHeader::read(source)? {
                Some(child) if child.id == ids::SEEK_HEAD => {
                    if let Some(element) =
                        Element::read_child(source, &child, ids::SEGMENT, &full, 1)?
                    {
                        debug!("following chained seek head at {}", at);
                        segment.seek_heads.push(SeekHead::from_element(&element));
                    }
                }
                _ => warn!("no seek head at {} where one was indexed", at),
            }
        }
        source.seek(SeekFrom::Start(end))?;

        if let Some(element) = cues {
            segment.cues = Some(Cues::from_element(&element, segment.timecode_scale()));
        }
        // clusters read before Info used the default scale
        segment.apply_timecode_scale()?;
        debug!(
            "read segment at {} with {} track(s), {} cluster(s)",
            base.position,
            segment.tracks.len(),
            segment.clusters.len()
        );
        Ok(segment)
    }

    fn take_element(&mut self, element: Element, cues: &mut Option<Element>) {
        match element.id() {
            ids::SEEK_HEAD => self.seek_heads.push(SeekHead::from_element(&element)),
            ids::INFO => self.info = Some(element),
            ids::TRACKS => {
                for entry in element.find_all(ids::TRACK_ENTRY) {
                    match TrackEntry::from_element(entry) {
                        Ok(track) => self.tracks.push(track),
                        Err(e) => warn!("skipping track entry at {:?}: {}", entry.position(), e),
                    }
                }
            }
            ids::CUES => *cues = Some(element),
            _ => self.others.push(element),
        }
    }
}
impl Default for Segment {
    fn default() -> Self {
        Segment::new()
    }
}
