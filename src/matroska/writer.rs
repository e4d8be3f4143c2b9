//! Streams a segment to a seekable sink.
//!
//! The segment header is written first with an unknown size, followed by a Void reserving room
//! for the seek head, the metadata, then the clusters one at a time. `finish` writes the cues,
//! places the seek head in the reserved room (or at the end if it does not fit) and fixes the
//! segment size up.

use std::collections::BTreeSet;
use std::io::{Seek, SeekFrom, Write};

use log::{debug, warn};

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::matroska::cluster::{BlockEntry, BlockRef, Cluster, ClusterHandle};
use crate::matroska::cues::{BlockPosition, CueReference};
use crate::matroska::ids;
use crate::matroska::seek_head::SeekHead;
use crate::matroska::segment::{Segment, SegmentBase};
use crate::size::Size;
use crate::std_elems;

/// How a segment is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Write an EBML header before the segment.
    pub write_ebml_head: bool,
    /// The `DocType` of the EBML header.
    pub doc_type: String,
    /// The `DocTypeVersion` of the EBML header.
    pub doc_type_version: u64,
    /// The `DocTypeReadVersion` of the EBML header.
    pub doc_type_read_version: u64,
    /// Width of the segment's size field. It is written as unknown first and fixed up at the
    /// end, so it must be wide enough for the final size.
    pub size_length: usize,
    /// Bytes reserved after the segment header for the seek head. 0 appends it at the end.
    pub seek_head_reserve: u64,
    /// Write the cue index.
    pub write_cues: bool,
    /// List the tracks without frames in each cluster.
    pub silent_tracks: bool,
    /// Write each cluster's `Position` and `PrevSize`.
    pub cluster_positions: bool,
    /// Free frame bytes once their cluster is written.
    pub release_frames: bool,
    /// Protect top-level masters with CRC-32 elements.
    pub checksums: bool,
}
impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            write_ebml_head: true,
            doc_type: "matroska".into(),
            doc_type_version: 4,
            doc_type_read_version: 2,
            size_length: 5,
            seek_head_reserve: 256,
            write_cues: true,
            silent_tracks: false,
            cluster_positions: false,
            release_frames: false,
            checksums: false,
        }
    }
}

/// Writes a segment to `W`, a cluster at a time.
#[derive(Debug)]
pub struct SegmentWriter<W: Write + Seek> {
    target: W,
    options: WriterOptions,
    base: Option<SegmentBase>,
    seek_head: SeekHead,
    reserve: Option<(u64, u64)>,
    written: BTreeSet<usize>,
    previous_timecode: Option<u64>,
    prev_size: Option<u64>,
}
impl<W: Write + Seek> SegmentWriter<W> {
    /// A writer which will start writing at the current position of `target`.
    pub fn new(target: W, options: WriterOptions) -> Self {
        SegmentWriter {
            target,
            options,
            base: None,
            seek_head: SeekHead::new(),
            reserve: None,
            written: BTreeSet::new(),
            previous_timecode: None,
            prev_size: None,
        }
    }

    fn placed(&self) -> EbmlResult<SegmentBase> {
        self.base.ok_or(EbmlError::SegmentNotPlaced)
    }

    fn render_indexed(&mut self, mut element: Element) -> EbmlResult<Element> {
        if self.options.checksums && element.is_master() {
            element.enable_checksum(true)?;
        }
        element.render(&mut self.target)?;
        let base = self.placed()?;
        self.seek_head.index_this(&element, &base)?;
        Ok(element)
    }

    /// Writes the EBML header, the segment header and the segment's metadata. Fails with
    /// `MissingMandatory` before writing anything if mandatory metadata is missing.
    pub fn start(&mut self, segment: &mut Segment) -> EbmlResult<()> {
        segment.validate()?;
        if self.options.write_ebml_head {
            let mut head = std_elems::ebml_head(
                &self.options.doc_type,
                self.options.doc_type_version,
                self.options.doc_type_read_version,
            );
            head.render(&mut self.target)?;
        }

        let position = self.target.stream_position()?;
        let id_width = ids::SEGMENT.write(&mut self.target)?;
        let size_width = Size::unknown(self.options.size_length)?.write(&mut self.target)?;
        let base = SegmentBase {
            position,
            header_size: (id_width + size_width) as u64,
        };
        self.base = Some(base);
        segment.base = Some(base);

        if self.options.seek_head_reserve > 0 {
            let at = self.target.stream_position()?;
            let mut void = std_elems::void(self.options.seek_head_reserve);
            let size = void.render(&mut self.target)?;
            self.reserve = Some((at, size));
        }

        if let Some(info) = segment.info.clone() {
            segment.info = Some(self.render_indexed(info)?);
        }
        if let Some(tracks) = segment.tracks_element()? {
            self.render_indexed(tracks)?;
        }
        for i in 0..segment.others.len() {
            let element = segment.others[i].clone();
            let indexed = ids::TOP_LEVEL.contains(&element.id());
            segment.others[i] = if indexed {
                self.render_indexed(element)?
            } else {
                let mut element = element;
                element.render(&mut self.target)?;
                element
            };
        }
        debug!(
            "started segment at {} with a {}-byte size field",
            position, self.options.size_length
        );
        Ok(())
    }

    /// Writes a cluster of the segment and turns the pending cues of its blocks into cue points.
    pub fn write_cluster(
        &mut self,
        segment: &mut Segment,
        handle: ClusterHandle,
    ) -> EbmlResult<()> {
        let base = self.placed()?;
        if self.written.contains(&handle.0) {
            return Ok(());
        }
        let silent: Vec<u64> = match segment.cluster(handle) {
            Some(cluster) if self.options.silent_tracks => {
                let present = cluster.tracks_present();
                segment
                    .track_numbers()
                    .into_iter()
                    .filter(|t| !present.contains(t))
                    .collect()
            }
            Some(_) => Vec::new(),
            None => return Err(EbmlError::MissingElement("Cluster")),
        };

        let at = self.target.stream_position()?;
        let cluster = segment
            .clusters
            .get_mut(handle.0)
            .ok_or(EbmlError::MissingElement("Cluster"))?;
        if cluster.entries().is_empty() && cluster.global_timecode().is_none() {
            warn!("skipping empty cluster {}", handle.0);
            self.written.insert(handle.0);
            return Ok(());
        }
        cluster.set_previous_timecode(self.previous_timecode);
        cluster.set_silent_tracks(silent);
        if self.options.cluster_positions {
            cluster.set_relative_position(Some(base.relative_position(at)?));
            cluster.set_prev_size(self.prev_size);
        }
        cluster.enable_checksum(self.options.checksums);
        let size = cluster.render(&mut self.target)?;
        self.previous_timecode = cluster.global_timecode();
        self.prev_size = Some(size);
        if self.written.is_empty() {
            self.seek_head.add(ids::CLUSTER, base.relative_position(at)?);
        }
        self.written.insert(handle.0);

        let positions = block_positions(segment, handle, &base)?;
        if let Some(cues) = segment.cues.as_mut() {
            for position in positions {
                if cues.is_pending(position.block) {
                    cues.position_set(position)?;
                }
            }
        }
        if self.options.release_frames {
            if let Some(cluster) = segment.clusters.get_mut(handle.0) {
                cluster.release_frames();
            }
        }
        Ok(())
    }

    /// Writes the remaining clusters, the cues and the seek head, fixes the segment size up and
    /// hands the sink back.
    pub fn finish(mut self, segment: &mut Segment) -> EbmlResult<W> {
        let base = self.placed()?;
        for i in 0..segment.clusters.len() {
            self.write_cluster(segment, ClusterHandle(i))?;
        }

        if self.options.write_cues {
            if let Some(cues) = segment.cues.as_ref() {
                if cues.pending_count() > 0 {
                    warn!("{} cue(s) were never written", cues.pending_count());
                }
                if !cues.is_empty() {
                    let element = cues.to_element();
                    self.render_indexed(element)?;
                }
            }
        }

        let mut end = self.target.stream_position()?;
        let mut head = self.seek_head.to_element();
        if self.options.checksums {
            head.enable_checksum(true)?;
        }
        let size = head.total_size();
        match self.reserve {
            Some((at, reserved)) if size == reserved || size + 2 <= reserved => {
                self.target.seek(SeekFrom::Start(at))?;
                head.render(&mut self.target)?;
                if reserved > size {
                    std_elems::void(reserved - size).render(&mut self.target)?;
                }
                debug!("seek head placed in the {} reserved byte(s) at {}", reserved, at);
            }
            _ => {
                head.render(&mut self.target)?;
                end = self.target.stream_position()?;
                debug!("seek head of {} byte(s) appended at the end", size);
            }
        }
        segment.seek_heads = vec![SeekHead::from_element(&head)];

        let data_size = end - base.data_position();
        let id_width = ids::SEGMENT.get_width() as u64;
        self.target.seek(SeekFrom::Start(base.position + id_width))?;
        Size::with_width(data_size, self.options.size_length)?.write(&mut self.target)?;
        self.target.seek(SeekFrom::Start(end))?;
        self.target.flush()?;
        segment.size = Some(data_size);
        debug!("segment size fixed up to {}", data_size);
        Ok(self.target)
    }
}

// Everything the cue index needs to know about the blocks of a rendered cluster.
fn block_positions(
    segment: &Segment,
    handle: ClusterHandle,
    base: &SegmentBase,
) -> EbmlResult<Vec<BlockPosition>> {
    let scale = segment.timecode_scale();
    let cluster = segment
        .cluster(handle)
        .ok_or(EbmlError::MissingElement("Cluster"))?;
    let cluster_position = cluster
        .position()
        .ok_or(EbmlError::NotRendered(ids::CLUSTER))?;
    let cluster_relative = base.relative_position(cluster_position)?;
    let data_position = cluster.data_position().unwrap_or(cluster_position);

    let mut positions = Vec::with_capacity(cluster.entries().len());
    for (index, entry) in cluster.entries().iter().enumerate() {
        let block = entry.block();
        let references = entry.group().map_or_else(Vec::new, |group| {
            group
                .references()
                .iter()
                .map(|&timecode| cue_reference(segment, block.track(), timecode, base, scale))
                .collect()
        });
        positions.push(BlockPosition {
            block: BlockRef {
                cluster: handle,
                index,
            },
            track: block.track(),
            timecode: block.timecode(),
            cluster_position: cluster_relative,
            relative_position: entry.position().map(|p| p - data_position),
            block_number: Some(index as u64 + 1),
            duration: entry.group().and_then(|g| g.duration()),
            codec_state: None,
            references,
        });
    }
    Ok(positions)
}

// Finds the block of `track` at `timecode` among the rendered clusters.
fn cue_reference(
    segment: &Segment,
    track: u64,
    timecode: u64,
    base: &SegmentBase,
    scale: u64,
) -> CueReference {
    let found = segment.clusters().iter().find_map(|cluster: &Cluster| {
        let index = cluster.entries().iter().position(|e: &BlockEntry| {
            e.block().track() == track && e.block().timecode() == timecode
        })?;
        let cluster_position = base.relative_position(cluster.position()?).ok()?;
        Some((cluster_position, index as u64 + 1))
    });
    CueReference {
        time: timecode / scale,
        cluster: found.map(|(position, _)| position),
        number: found.map(|(_, number)| number),
        codec_state: None,
    }
}

impl Segment {
    /// Writes the whole segment to `target` at its current position and hands it back.
    pub fn write_to<W: Write + Seek>(
        &mut self,
        target: W,
        options: WriterOptions,
    ) -> EbmlResult<W> {
        let mut writer = SegmentWriter::new(target, options);
        writer.start(self)?;
        writer.finish(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matroska::block::LacingType;
    use crate::matroska::read_document;
    use crate::matroska::tracks::{TrackEntry, TrackType};
    use crate::read::ReadOptions;
    use std::io::Cursor;

    const MS: u64 = 1_000_000;

    fn segment() -> Segment {
        let mut segment = Segment::new();
        segment.add_track(TrackEntry::new(1, TrackType::Audio, "A_PCM/INT/LIT")).unwrap();
        segment.add_track(TrackEntry::new(2, TrackType::Subtitle, "S_TEXT/UTF8")).unwrap();
        for c in 0..3u64 {
            let cluster = segment.new_cluster();
            for f in 0..4u64 {
                let timecode = (c * 4 + f) * 10 * MS;
                let block = segment
                    .add_frame(cluster, 1, timecode, vec![f as u8; 16], LacingType::None)
                    .unwrap();
                if f == 0 {
                    segment.add_cue(block).unwrap();
                }
            }
        }
        segment
    }

    #[test]
    fn size_is_fixed_up() {
        let mut segment = segment();
        let bytes = segment.write_to(Cursor::new(Vec::new()), Default::default()).unwrap();
        let bytes = bytes.into_inner();
        let base = segment.base().unwrap();
        let at = base.position as usize + 4;
        let (size, width) = Size::decode(&bytes[at..]).unwrap();
        assert_eq!(5, width);
        assert_eq!(Some(bytes.len() as u64 - base.data_position()), size.get_value());
        assert_eq!(segment.size(), size.get_value());
    }

    #[test]
    fn seek_head_in_reserved_room() {
        let mut segment = segment();
        let bytes = segment.write_to(Cursor::new(Vec::new()), Default::default()).unwrap();
        let data_position = segment.base().unwrap().data_position() as usize;
        assert_eq!(&[0x11, 0x4D, 0x9B, 0x74], &bytes.get_ref()[data_position..data_position + 4]);
        assert_eq!(Some(data_position as u64), segment.seek_heads()[0].position());

        let mut cursor = bytes;
        cursor.set_position(0);
        let document = read_document(&mut cursor, &ReadOptions::default()).unwrap();
        let read = document.segment;
        for &id in &[ids::INFO, ids::TRACKS, ids::CLUSTER, ids::CUES] {
            assert!(read.locate(id).is_some(), "{} not indexed", id);
        }
        assert_eq!(segment.locate(ids::CUES), read.locate(ids::CUES));
        assert_eq!(3, read.cues().unwrap().points().len());
    }

    #[test]
    fn seek_head_appended_without_room() {
        let mut segment = segment();
        let options = WriterOptions {
            seek_head_reserve: 8,
            ..Default::default()
        };
        let bytes = segment.write_to(Cursor::new(Vec::new()), options).unwrap();
        let position = segment.seek_heads()[0].position().unwrap();
        let mut cursor = bytes;
        cursor.set_position(0);
        let read = read_document(&mut cursor, &ReadOptions::default()).unwrap().segment;
        assert_eq!(Some(position), read.seek_heads()[0].position());
        assert_eq!(segment.locate(ids::TRACKS), read.locate(ids::TRACKS));
    }

    #[test]
    fn cluster_extras() {
        let mut segment = segment();
        let options = WriterOptions {
            silent_tracks: true,
            cluster_positions: true,
            release_frames: true,
            checksums: true,
            ..Default::default()
        };
        let mut cursor = segment.write_to(Cursor::new(Vec::new()), options).unwrap();
        assert!(segment.clusters()[0].entries()[0].block().frame_data(0).is_err());

        cursor.set_position(0);
        let read = read_document(&mut cursor, &ReadOptions::default()).unwrap().segment;
        let clusters = read.clusters();
        assert_eq!(3, clusters.len());
        assert_eq!(&[2][..], clusters[1].silent_tracks());
        assert_eq!(None, clusters[0].prev_size());
        assert_eq!(clusters[0].total_size(), clusters[1].prev_size());
        for cluster in clusters {
            let position = cluster.position().unwrap();
            let relative = read.relative_position(position).unwrap();
            assert_eq!(Some(relative), cluster.relative_position());
        }
        assert_eq!(Some(true), read.info().unwrap().verify_checksum());
    }

    #[test]
    fn missing_info_writes_nothing() {
        let mut segment = Segment::empty();
        let mut writer = SegmentWriter::new(Cursor::new(Vec::new()), Default::default());
        assert!(matches!(
            writer.start(&mut segment),
            Err(EbmlError::MissingMandatory(ref names)) if names == &["Info".to_string()]
        ));
        assert!(writer.target.get_ref().is_empty());
    }
}
