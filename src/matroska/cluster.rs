//! Clusters: groups of blocks whose timecodes are stored relative to the cluster's own.

use std::collections::BTreeSet;
use std::io::{Read, Seek, Write};

use log::{debug, warn};

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::matroska::block::{Block, BlockGroup, LacingType};
use crate::matroska::ids;
use crate::read::{read_children, ElementHeader, ReadOptions, ReadScope};
use crate::std_elems;

/// Identifies a cluster within its segment. Blocks refer to their cluster through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterHandle(pub(crate) usize);
impl ClusterHandle {
    /// The index of the cluster in its segment.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identifies a block: its cluster and its index among the cluster's blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef {
    /// The cluster holding the block.
    pub cluster: ClusterHandle,
    /// The index of the block in the cluster.
    pub index: usize,
}

/// A block as stored in a cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEntry {
    /// A `SimpleBlock`.
    Simple(Block),
    /// A `BlockGroup`.
    Group(BlockGroup),
}
impl BlockEntry {
    /// The block.
    pub fn block(&self) -> &Block {
        match *self {
            BlockEntry::Simple(ref block) => block,
            BlockEntry::Group(ref group) => group.block(),
        }
    }

    /// The block, for editing.
    pub fn block_mut(&mut self) -> &mut Block {
        match *self {
            BlockEntry::Simple(ref mut block) => block,
            BlockEntry::Group(ref mut group) => group.block_mut(),
        }
    }

    /// The group, for a `BlockGroup`.
    pub fn group(&self) -> Option<&BlockGroup> {
        match *self {
            BlockEntry::Simple(_) => None,
            BlockEntry::Group(ref group) => Some(group),
        }
    }

    /// True if the frames can be decoded on their own.
    pub fn is_keyframe(&self) -> bool {
        match *self {
            BlockEntry::Simple(ref block) => block.is_keyframe(),
            BlockEntry::Group(ref group) => group.is_keyframe(),
        }
    }

    /// Absolute position of the `SimpleBlock` or `BlockGroup` element, once read or rendered.
    pub fn position(&self) -> Option<u64> {
        match *self {
            BlockEntry::Simple(ref block) => block.position(),
            BlockEntry::Group(ref group) => group.position(),
        }
    }

    fn to_element(&self, local_timecode: i16, timecode_scale: u64) -> EbmlResult<Element> {
        match *self {
            BlockEntry::Simple(ref block) => block.to_element(local_timecode),
            BlockEntry::Group(ref group) => group.to_element(local_timecode, timecode_scale),
        }
    }

    fn set_rendered(&mut self, element: &Element, local_timecode: i16) -> EbmlResult<()> {
        match *self {
            BlockEntry::Simple(ref mut block) => block.set_rendered(element, local_timecode),
            BlockEntry::Group(ref mut group) => group.set_rendered(element, local_timecode),
        }
    }
}

/// A cluster and its blocks.
///
/// Block timecodes are absolute nanoseconds. The cluster's own timecode, its anchor, is in ticks
/// of the segment's timecode scale: the earliest block timecode, but always at least one tick
/// past the previous cluster's. It is frozen once the cluster is rendered or read.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    handle: Option<ClusterHandle>,
    timecode_scale: u64,
    previous_timecode: Option<u64>,
    timecode: Option<u64>,
    min_timecode: Option<u64>,
    max_timecode: Option<u64>,
    entries: Vec<BlockEntry>,
    silent_tracks: Vec<u64>,
    relative_position: Option<u64>,
    prev_size: Option<u64>,
    others: Vec<Element>,
    checksum: bool,
    position: Option<u64>,
    data_position: Option<u64>,
    size: Option<u64>,
}
impl Cluster {
    /// An empty cluster for a segment with the given timecode scale (nanoseconds per tick).
    pub fn new(timecode_scale: u64) -> Self {
        Cluster {
            handle: None,
            timecode_scale: timecode_scale.max(1),
            previous_timecode: None,
            timecode: None,
            min_timecode: None,
            max_timecode: None,
            entries: Vec::new(),
            silent_tracks: Vec::new(),
            relative_position: None,
            prev_size: None,
            others: Vec::new(),
            checksum: false,
            position: None,
            data_position: None,
            size: None,
        }
    }

    /// The handle of the cluster in its segment.
    pub fn handle(&self) -> Option<ClusterHandle> {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: ClusterHandle) {
        self.handle = Some(handle);
        for entry in &mut self.entries {
            entry.block_mut().cluster = Some(handle);
        }
    }

    /// Nanoseconds per tick.
    pub fn timecode_scale(&self) -> u64 {
        self.timecode_scale
    }

    fn track_range(&mut self, timecode: u64) {
        self.min_timecode = Some(self.min_timecode.map_or(timecode, |min| min.min(timecode)));
        self.max_timecode = Some(self.max_timecode.map_or(timecode, |max| max.max(timecode)));
    }

    /// Adds a frame, lacing it into the last block if that block is a `SimpleBlock` of the same
    /// track which still accepts frames, and starting a new `SimpleBlock` otherwise. Returns the
    /// index of the block holding the frame.
    pub fn add_frame(
        &mut self,
        track: u64,
        timecode: u64,
        frame: Vec<u8>,
        lacing: LacingType,
    ) -> EbmlResult<usize> {
        if let Some(BlockEntry::Simple(block)) = self.entries.last_mut() {
            if !block.is_sealed() && block.track() == track && lacing != LacingType::None {
                block.add_frame(track, timecode, frame, lacing)?;
                self.track_range(timecode);
                return Ok(self.entries.len() - 1);
            }
        }
        let mut block = Block::simple();
        block.add_frame(track, timecode, frame, lacing)?;
        self.add_entry(BlockEntry::Simple(block))
    }

    /// Adds a block group, returning its index.
    pub fn add_block_group(&mut self, group: BlockGroup) -> EbmlResult<usize> {
        self.add_entry(BlockEntry::Group(group))
    }

    /// Adds a block of either kind, returning its index. The block must hold a frame.
    pub fn add_entry(&mut self, mut entry: BlockEntry) -> EbmlResult<usize> {
        if entry.block().frame_count() == 0 {
            return Err(EbmlError::InvalidLacing("a block needs at least one frame".into()));
        }
        let timecode = entry.block().timecode();
        entry.block_mut().cluster = self.handle;
        self.track_range(timecode);
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    /// The blocks, in file order.
    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    /// The block at `index`.
    pub fn entry(&self, index: usize) -> Option<&BlockEntry> {
        self.entries.get(index)
    }

    /// The block at `index`, for editing.
    pub fn entry_mut(&mut self, index: usize) -> Option<&mut BlockEntry> {
        self.entries.get_mut(index)
    }

    /// The earliest block timecode, in nanoseconds.
    pub fn min_timecode(&self) -> Option<u64> {
        self.min_timecode
    }

    /// The latest block timecode, in nanoseconds.
    pub fn max_timecode(&self) -> Option<u64> {
        self.max_timecode
    }

    /// The anchor of the previous cluster, in ticks.
    pub fn previous_timecode(&self) -> Option<u64> {
        self.previous_timecode
    }

    /// Sets the anchor of the previous cluster, in ticks.
    pub fn set_previous_timecode(&mut self, timecode: Option<u64>) {
        self.previous_timecode = timecode;
    }

    /// The cluster's anchor in ticks: as read or rendered if it has been, else the earliest block
    /// timecode, bumped to one tick past the previous cluster if needed. `None` for an empty
    /// cluster which has not been read.
    pub fn global_timecode(&self) -> Option<u64> {
        if let Some(timecode) = self.timecode {
            return Some(timecode);
        }
        let min = self.min_timecode? / self.timecode_scale;
        Some(match self.previous_timecode {
            Some(previous) if min <= previous => previous + 1,
            _ => min,
        })
    }

    /// Fixes the anchor, in ticks.
    pub fn set_global_timecode(&mut self, timecode: u64) {
        self.timecode = Some(timecode);
    }

    /// The timecode of a block at `timecode` nanoseconds, relative to the anchor and in ticks.
    pub fn block_local_timecode(&self, timecode: u64) -> EbmlResult<i16> {
        let anchor = self
            .global_timecode()
            .ok_or(EbmlError::MissingClusterTimecode)?;
        let scale = i128::from(self.timecode_scale);
        let delta = (i128::from(timecode) - i128::from(anchor) * scale) / scale;
        i16::try_from(delta).map_err(|_| {
            EbmlError::TimecodeOutOfRange(i64::try_from(delta).unwrap_or(i64::MAX))
        })
    }

    /// The absolute timecode in nanoseconds of a block whose local timecode is `local`.
    pub fn block_global_timecode(&self, local: i16) -> EbmlResult<u64> {
        let anchor = self
            .global_timecode()
            .ok_or(EbmlError::MissingClusterTimecode)?;
        let ticks = i64::try_from(anchor)
            .ok()
            .and_then(|anchor| anchor.checked_add(i64::from(local)))
            .ok_or(EbmlError::TimecodeOutOfRange(i64::MAX))?;
        let ticks = u64::try_from(ticks).map_err(|_| EbmlError::TimecodeOutOfRange(ticks))?;
        ticks.checked_mul(self.timecode_scale).ok_or_else(|| {
            EbmlError::TimecodeOutOfRange(i64::try_from(ticks).unwrap_or(i64::MAX))
        })
    }

    /// The track numbers of the blocks in the cluster.
    pub fn tracks_present(&self) -> BTreeSet<u64> {
        self.entries.iter().map(|e| e.block().track()).collect()
    }

    /// The tracks listed as silent.
    pub fn silent_tracks(&self) -> &[u64] {
        &self.silent_tracks
    }

    /// Lists tracks which have no frames in this cluster.
    pub fn set_silent_tracks(&mut self, tracks: Vec<u64>) {
        self.silent_tracks = tracks;
    }

    /// The segment-relative position the cluster records for itself.
    pub fn relative_position(&self) -> Option<u64> {
        self.relative_position
    }

    /// Sets the segment-relative position to record in the `Position` element.
    pub fn set_relative_position(&mut self, position: Option<u64>) {
        self.relative_position = position;
    }

    /// The size of the previous cluster, in bytes.
    pub fn prev_size(&self) -> Option<u64> {
        self.prev_size
    }

    /// Sets the size of the previous cluster to record in the `PrevSize` element.
    pub fn set_prev_size(&mut self, size: Option<u64>) {
        self.prev_size = size;
    }

    /// Children with no dedicated field, in file order.
    pub fn others(&self) -> &[Element] {
        &self.others
    }

    /// Writes the cluster with a CRC-32 element.
    pub fn enable_checksum(&mut self, enabled: bool) {
        self.checksum = enabled;
    }

    /// Absolute position of the cluster, once read or rendered.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Absolute position of the cluster's first payload byte, once read or rendered.
    pub fn data_position(&self) -> Option<u64> {
        self.data_position
    }

    /// Bytes taken by the whole cluster, once read or rendered.
    pub fn total_size(&self) -> Option<u64> {
        self.size
    }

    /// Frees the frame bytes of all blocks.
    pub fn release_frames(&mut self) {
        for entry in &mut self.entries {
            entry.block_mut().release_frames();
        }
    }

    /// Loads the frame bytes a partial read left on disk.
    pub fn load_frames<R: Read + Seek>(&mut self, source: &mut R) -> EbmlResult<()> {
        for entry in &mut self.entries {
            entry.block_mut().load_frames(source)?;
        }
        Ok(())
    }

    /// Builds the `Cluster` element: the anchor, the silent tracks, `Position` and `PrevSize` if
    /// set, other children, then the blocks.
    pub fn to_element(&self) -> EbmlResult<Element> {
        let anchor = self
            .global_timecode()
            .ok_or(EbmlError::MissingClusterTimecode)?;
        let mut children = vec![Element::uint(ids::TIMECODE, anchor)];
        if !self.silent_tracks.is_empty() {
            let tracks = self
                .silent_tracks
                .iter()
                .map(|&track| Element::uint(ids::SILENT_TRACK_NUMBER, track))
                .collect();
            children.push(Element::master(ids::SILENT_TRACKS, tracks));
        }
        if let Some(position) = self.relative_position {
            children.push(Element::uint(ids::POSITION, position));
        }
        if let Some(size) = self.prev_size {
            children.push(Element::uint(ids::PREV_SIZE, size));
        }
        children.extend(self.others.iter().cloned());
        for entry in &self.entries {
            let local = self.block_local_timecode(entry.block().timecode())?;
            children.push(entry.to_element(local, self.timecode_scale)?);
        }
        let mut element = Element::master(ids::CLUSTER, children);
        element.enable_checksum(self.checksum)?;
        Ok(element)
    }

    /// Writes the cluster at the current position, freezing its anchor and recording where it
    /// and each of its blocks and frames landed. Returns the number of bytes written.
    pub fn render<W: Write + Seek>(&mut self, target: &mut W) -> EbmlResult<u64> {
        let anchor = self
            .global_timecode()
            .ok_or(EbmlError::MissingClusterTimecode)?;
        let locals = self
            .entries
            .iter()
            .map(|entry| self.block_local_timecode(entry.block().timecode()))
            .collect::<EbmlResult<Vec<i16>>>()?;
        let mut element = self.to_element()?;
        let written = element.render(target)?;

        self.timecode = Some(anchor);
        self.position = element.position();
        self.data_position = element.data_position();
        self.size = Some(written);
        let first = element.children().len() - self.entries.len();
        for ((entry, rendered), local) in self
            .entries
            .iter_mut()
            .zip(&element.children()[first..])
            .zip(locals)
        {
            entry.set_rendered(rendered, local)?;
        }
        debug!(
            "rendered cluster at {} ticks with {} block(s), {} bytes at {:?}",
            anchor,
            self.entries.len(),
            written,
            self.position
        );
        Ok(written)
    }

    /// Reads a cluster whose element header has just been read. Blocks follow the scope of
    /// `options`; their absolute timecodes are resolved against the cluster's `Timecode`.
    pub fn read<R: Read + Seek>(
        source: &mut R,
        header: &ElementHeader,
        options: &ReadOptions,
        depth: usize,
        timecode_scale: u64,
    ) -> EbmlResult<Cluster> {
        if depth >= options.max_depth {
            return Err(EbmlError::RecursionLimit(depth));
        }
        let full = ReadOptions {
            scope: ReadScope::Full,
            ..*options
        };
        let mut cluster = Cluster::new(timecode_scale);
        read_children(source, header, |source, child| {
            match child.id {
                ids::SIMPLE_BLOCK => {
                    let block = Block::read(source, &child, options.scope)?;
                    cluster.entries.push(BlockEntry::Simple(block));
                }
                ids::BLOCK_GROUP => {
                    let group = BlockGroup::read(source, &child, options, depth + 1)?;
                    cluster.entries.push(BlockEntry::Group(group));
                }
                // rewritten on render
                std_elems::CRC32 => cluster.checksum = true,
                _ => {
                    let element =
                        match Element::read_child(source, &child, ids::CLUSTER, &full, depth + 1)? {
                            Some(element) => element,
                            None => return Ok(()),
                        };
                    match element.id() {
                        ids::TIMECODE => cluster.timecode = element.as_uint(),
                        ids::SILENT_TRACKS => {
                            cluster.silent_tracks = element
                                .find_all(ids::SILENT_TRACK_NUMBER)
                                .filter_map(Element::as_uint)
                                .collect()
                        }
                        ids::POSITION => cluster.relative_position = element.as_uint(),
                        ids::PREV_SIZE => cluster.prev_size = element.as_uint(),
                        _ => cluster.others.push(element),
                    }
                }
            }
            Ok(())
        })?;

        let end = source.stream_position()?;
        cluster.position = Some(header.position);
        cluster.data_position = Some(header.data_position());
        cluster.size = Some(end - header.position);
        if cluster.timecode.is_none() && !cluster.entries.is_empty() {
            return Err(EbmlError::MissingClusterTimecode);
        }
        cluster.resolve_timecodes()?;
        Ok(cluster)
    }

    /// Resolves the block timecodes of a read cluster again under a new timecode scale, for a
    /// segment whose `Info` came after the cluster.
    pub(crate) fn rescale(&mut self, timecode_scale: u64) -> EbmlResult<()> {
        let timecode_scale = timecode_scale.max(1);
        if timecode_scale == self.timecode_scale || self.timecode.is_none() {
            self.timecode_scale = timecode_scale;
            return Ok(());
        }
        for entry in &mut self.entries {
            if let BlockEntry::Group(ref mut group) = *entry {
                group.unresolve_references(self.timecode_scale)?;
            }
        }
        self.timecode_scale = timecode_scale;
        self.resolve_timecodes()
    }

    fn resolve_timecodes(&mut self) -> EbmlResult<()> {
        let globals = self
            .entries
            .iter()
            .map(|entry| {
                let local = entry.block().local_timecode();
                self.block_global_timecode(local).map_err(|e| {
                    warn!("block at {:?}: {}", entry.position(), e);
                    e
                })
            })
            .collect::<EbmlResult<Vec<u64>>>()?;
        for (entry, timecode) in self.entries.iter_mut().zip(globals) {
            entry.block_mut().set_timecode(timecode);
            if let BlockEntry::Group(ref mut group) = *entry {
                group.resolve_references(self.timecode_scale)?;
            }
        }
        self.min_timecode = None;
        self.max_timecode = None;
        for i in 0..self.entries.len() {
            let timecode = self.entries[i].block().timecode();
            self.track_range(timecode);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MS: u64 = 1_000_000;

    fn read_back(bytes: Vec<u8>, options: &ReadOptions) -> Cluster {
        let mut cursor = Cursor::new(bytes);
        let header = ElementHeader::read(&mut cursor).unwrap().unwrap();
        Cluster::read(&mut cursor, &header, options, 1, MS).unwrap()
    }

    #[test]
    fn anchors() {
        let mut cluster = Cluster::new(MS);
        assert_eq!(None, cluster.global_timecode());
        cluster.add_frame(1, 5_500_000, vec![1], LacingType::None).unwrap();
        cluster.add_frame(1, 3_200_000, vec![1], LacingType::None).unwrap();
        assert_eq!(Some(3_200_000), cluster.min_timecode());
        assert_eq!(Some(5_500_000), cluster.max_timecode());
        assert_eq!(Some(3), cluster.global_timecode());

        cluster.set_previous_timecode(Some(3));
        assert_eq!(Some(4), cluster.global_timecode());
        cluster.set_previous_timecode(Some(2));
        assert_eq!(Some(3), cluster.global_timecode());
    }

    #[test]
    fn local_timecodes() {
        let mut cluster = Cluster::new(MS);
        cluster.add_frame(1, 10 * MS, vec![1], LacingType::None).unwrap();
        assert_eq!(0, cluster.block_local_timecode(10 * MS).unwrap());
        assert_eq!(32_767, cluster.block_local_timecode(32_777 * MS).unwrap());
        assert_eq!(-10, cluster.block_local_timecode(0).unwrap());
        assert!(matches!(
            cluster.block_local_timecode(32_778 * MS),
            Err(EbmlError::TimecodeOutOfRange(32_768))
        ));
        assert_eq!(25 * MS, cluster.block_global_timecode(15).unwrap());
        assert!(cluster.block_global_timecode(-11).is_err());

        assert!(matches!(
            Cluster::new(MS).block_local_timecode(0),
            Err(EbmlError::MissingClusterTimecode)
        ));
    }

    #[test]
    fn lacing_into_last_block() {
        let mut cluster = Cluster::new(MS);
        assert_eq!(0, cluster.add_frame(1, 0, vec![1], LacingType::Auto).unwrap());
        assert_eq!(0, cluster.add_frame(1, 0, vec![2], LacingType::Auto).unwrap());
        assert_eq!(1, cluster.add_frame(2, 0, vec![3], LacingType::Auto).unwrap());
        assert_eq!(2, cluster.add_frame(2, 0, vec![4], LacingType::None).unwrap());
        assert_eq!(3, cluster.add_frame(2, 0, vec![5], LacingType::Auto).unwrap());
        assert_eq!(2, cluster.entry(0).unwrap().block().frame_count());
        let tracks: Vec<_> = cluster.tracks_present().into_iter().collect();
        assert_eq!(vec![1, 2], tracks);
    }

    #[test]
    fn render_and_read() {
        let mut cluster = Cluster::new(MS);
        cluster.add_frame(1, 100 * MS, vec![1; 10], LacingType::None).unwrap();
        cluster.add_frame(1, 120 * MS, vec![2; 10], LacingType::Auto).unwrap();
        cluster.add_frame(1, 120 * MS, vec![3; 20], LacingType::Auto).unwrap();
        let mut block = Block::new();
        block.add_frame(1, 140 * MS, vec![4; 5], LacingType::None).unwrap();
        let mut group = BlockGroup::new(block);
        group.add_reference(120 * MS);
        group.set_duration(Some(20));
        cluster.add_block_group(group).unwrap();
        cluster.set_silent_tracks(vec![2]);
        cluster.set_prev_size(Some(1234));

        let mut cursor = Cursor::new(Vec::new());
        let written = cluster.render(&mut cursor).unwrap();
        assert_eq!(Some(written), cluster.total_size());
        assert_eq!(Some(100), cluster.global_timecode());
        let bytes = cursor.into_inner();
        let position = cluster.entry(1).unwrap().block().data_position(1).unwrap() as usize;
        assert_eq!(&[3u8; 20][..], &bytes[position..position + 20]);

        let read = read_back(bytes, &ReadOptions::default());
        assert_eq!(Some(100), read.global_timecode());
        assert_eq!(&[2][..], read.silent_tracks());
        assert_eq!(Some(1234), read.prev_size());
        assert_eq!(3, read.entries().len());
        let timecodes: Vec<_> = read.entries().iter().map(|e| e.block().timecode()).collect();
        assert_eq!(vec![100 * MS, 120 * MS, 140 * MS], timecodes);
        assert_eq!(Some(100 * MS), read.min_timecode());
        assert_eq!(Some(140 * MS), read.max_timecode());

        let group = read.entry(2).unwrap().group().unwrap();
        assert_eq!(&[120 * MS][..], group.references());
        assert_eq!(Some(20), group.duration());
        assert!(!read.entry(2).unwrap().is_keyframe());
        assert!(read.entry(0).unwrap().is_keyframe());
        assert_eq!(cluster.entry(2).unwrap().position(), read.entry(2).unwrap().position());
    }

    #[test]
    fn partial_read_then_load() {
        let mut cluster = Cluster::new(MS);
        cluster.add_frame(3, 0, vec![9; 40], LacingType::None).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        cluster.render(&mut cursor).unwrap();
        let bytes = cursor.into_inner();

        let mut read = read_back(bytes.clone(), &ReadOptions::headers());
        let block = read.entry(0).unwrap().block();
        assert_eq!(Some(40), block.frame_size(0));
        assert!(block.frame_data(0).is_err());
        read.load_frames(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(&[9u8; 40][..], read.entry(0).unwrap().block().frame_data(0).unwrap());
    }

    #[test]
    fn missing_timecode() {
        let mut block = Block::simple();
        block.add_frame(1, 0, vec![1], LacingType::None).unwrap();
        let mut element = Element::master(ids::CLUSTER, vec![block.to_element(0).unwrap()]);
        let mut cursor = Cursor::new(Vec::new());
        element.render(&mut cursor).unwrap();
        cursor.set_position(0);
        let header = ElementHeader::read(&mut cursor).unwrap().unwrap();
        assert!(matches!(
            Cluster::read(&mut cursor, &header, &ReadOptions::default(), 1, MS),
            Err(EbmlError::MissingClusterTimecode)
        ));
    }

    #[test]
    fn timecode_overflowing() {
        let mut block = Block::simple();
        block.add_frame(1, 0, vec![1], LacingType::None).unwrap();
        let mut element = Element::master(
            ids::CLUSTER,
            vec![Element::uint(ids::TIMECODE, 1 << 50), block.to_element(0).unwrap()],
        );
        let mut cursor = Cursor::new(Vec::new());
        element.render(&mut cursor).unwrap();
        cursor.set_position(0);
        let header = ElementHeader::read(&mut cursor).unwrap().unwrap();
        assert!(matches!(
            Cluster::read(&mut cursor, &header, &ReadOptions::default(), 1, MS),
            Err(EbmlError::TimecodeOutOfRange(_))
        ));

        let mut cluster = Cluster::new(MS);
        cluster.set_global_timecode(i64::MAX as u64);
        assert!(cluster.block_global_timecode(1).is_err());
        cluster.set_global_timecode(1 << 50);
        assert!(matches!(
            cluster.block_global_timecode(0),
            Err(EbmlError::TimecodeOutOfRange(_))
        ));
    }

    #[test]
    fn rescale_after_read() {
        let mut cluster = Cluster::new(MS);
        cluster.add_frame(1, 10 * MS, vec![1], LacingType::None).unwrap();
        let mut block = Block::new();
        block.add_frame(1, 15 * MS, vec![2], LacingType::None).unwrap();
        let mut group = BlockGroup::new(block);
        group.add_reference(10 * MS);
        cluster.add_block_group(group).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        cluster.render(&mut cursor).unwrap();

        let mut read = read_back(cursor.into_inner(), &ReadOptions::default());
        read.rescale(2 * MS).unwrap();
        assert_eq!(2 * MS, read.timecode_scale());
        assert_eq!(Some(10), read.global_timecode());
        let timecodes: Vec<_> = read.entries().iter().map(|e| e.block().timecode()).collect();
        assert_eq!(vec![20 * MS, 30 * MS], timecodes);
        assert_eq!(&[20 * MS][..], read.entry(1).unwrap().group().unwrap().references());
        assert_eq!(Some(20 * MS), read.min_timecode());
        assert_eq!(Some(30 * MS), read.max_timecode());
    }

    #[test]
    fn checksummed_cluster() {
        let mut cluster = Cluster::new(MS);
        cluster.add_frame(1, 0, vec![5; 3], LacingType::None).unwrap();
        cluster.enable_checksum(true);
        let mut cursor = Cursor::new(Vec::new());
        cluster.render(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(&[0xBF, 0x84], &bytes[5..7]);

        let read = read_back(bytes, &ReadOptions::default());
        assert_eq!(1, read.entries().len());
        assert!(read.others().is_empty());
    }
}
