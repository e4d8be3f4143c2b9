//! The cue index: for chosen blocks, where their cluster starts, so a player can seek.
//!
//! Blocks are registered as pending when they are added to a cluster and turned into cue points
//! once their cluster is rendered and their positions are known.

use log::{trace, warn};

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::matroska::cluster::BlockRef;
use crate::matroska::ids;

/// Another frame a cued block depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CueReference {
    /// Timecode of the referenced frame, in ticks.
    pub time: u64,
    /// Segment-relative position of the cluster holding it.
    pub cluster: Option<u64>,
    /// Number of the referenced block in its cluster, starting at 1.
    pub number: Option<u64>,
    /// Segment-relative position of the codec state for the referenced frame.
    pub codec_state: Option<u64>,
}

/// Where the cued block of one track is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CueTrackPositions {
    /// The track.
    pub track: u64,
    /// Segment-relative position of the cluster.
    pub cluster_position: u64,
    /// Position of the block relative to the cluster's payload.
    pub relative_position: Option<u64>,
    /// Duration of the block, in ticks.
    pub duration: Option<u64>,
    /// Number of the block in its cluster, starting at 1.
    pub block_number: Option<u64>,
    /// Segment-relative position of the codec state to use, 0 for the one in `CodecPrivate`.
    pub codec_state: Option<u64>,
    /// Frames the block depends on.
    pub references: Vec<CueReference>,
}

/// One entry in the index: a time and where blocks at that time are.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CuePoint {
    /// The time, in ticks.
    pub time: u64,
    /// One entry per cued track.
    pub positions: Vec<CueTrackPositions>,
}

/// What the writer knows about a rendered block, reported to `Cues::position_set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPosition {
    /// The block.
    pub block: BlockRef,
    /// Its track.
    pub track: u64,
    /// Its absolute timecode, in nanoseconds.
    pub timecode: u64,
    /// Segment-relative position of its cluster.
    pub cluster_position: u64,
    /// Position of the block relative to the cluster's payload.
    pub relative_position: Option<u64>,
    /// Number of the block in its cluster, starting at 1.
    pub block_number: Option<u64>,
    /// Duration of the block, in ticks.
    pub duration: Option<u64>,
    /// Codec state position.
    pub codec_state: Option<u64>,
    /// Frames the block depends on.
    pub references: Vec<CueReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingCue {
    block: BlockRef,
    track: u64,
    timecode: u64,
}

/// The cue index of a segment, kept sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct Cues {
    timecode_scale: u64,
    points: Vec<CuePoint>,
    pending: Vec<PendingCue>,
}
impl Cues {
    /// An empty index for a segment with the given timecode scale.
    pub fn new(timecode_scale: u64) -> Self {
        Cues {
            timecode_scale: timecode_scale.max(1),
            points: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Nanoseconds per tick.
    pub fn timecode_scale(&self) -> u64 {
        self.timecode_scale
    }

    pub(crate) fn set_timecode_scale(&mut self, timecode_scale: u64) {
        self.timecode_scale = timecode_scale.max(1);
    }

    /// Asks for a cue on a block. The cue is created once `position_set` reports where the block
    /// was written.
    pub fn add_block(&mut self, block: BlockRef, track: u64, timecode: u64) {
        self.pending.push(PendingCue {
            block,
            track,
            timecode,
        });
    }

    /// True if a cue was asked for on `block` and it has not been written yet.
    pub fn is_pending(&self, block: BlockRef) -> bool {
        self.pending.iter().any(|p| p.block == block)
    }

    /// The number of cues waiting for a position.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Turns the pending cue for a rendered block into a cue point. The pending cue is found by
    /// the block, or failing that by timecode and track.
    pub fn position_set(&mut self, position: BlockPosition) -> EbmlResult<()> {
        let index = self
            .pending
            .iter()
            .position(|p| p.block == position.block)
            .or_else(|| {
                self.pending
                    .iter()
                    .position(|p| p.timecode == position.timecode && p.track == position.track)
            })
            .ok_or(EbmlError::CueNotPending {
                track: position.track,
                timecode: position.timecode,
            })?;
        self.pending.remove(index);

        let time = position.timecode / self.timecode_scale;
        trace!(
            "cue for track {} at {} ticks in cluster {}",
            position.track,
            time,
            position.cluster_position
        );
        self.insert(CuePoint {
            time,
            positions: vec![CueTrackPositions {
                track: position.track,
                cluster_position: position.cluster_position,
                relative_position: position.relative_position,
                duration: position.duration,
                block_number: position.block_number,
                codec_state: position.codec_state,
                references: position.references,
            }],
        });
        Ok(())
    }

    /// Adds a cue point, merging it into an existing point at the same time.
    pub fn insert(&mut self, point: CuePoint) {
        match self.points.binary_search_by_key(&point.time, |p| p.time) {
            Ok(index) => {
                let existing = &mut self.points[index];
                existing.positions.extend(point.positions);
                existing.positions.sort_by_key(|p| p.track);
            }
            Err(index) => self.points.insert(index, point),
        }
    }

    /// The cue points, sorted by time.
    pub fn points(&self) -> &[CuePoint] {
        &self.points
    }

    /// True if the index has no cue points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The last cue point strictly before `timecode` (in nanoseconds): where decoding must start
    /// to reach that time.
    pub fn timecode_point(&self, timecode: u64) -> Option<&CuePoint> {
        let target = timecode / self.timecode_scale;
        self.points.iter().take_while(|p| p.time < target).last()
    }

    /// The segment-relative position of the cluster to start decoding from to reach `timecode`.
    pub fn timecode_position(&self, timecode: u64) -> Option<u64> {
        self.timecode_point(timecode)
            .and_then(|point| point.positions.first())
            .map(|positions| positions.cluster_position)
    }

    /// Builds the `Cues` element.
    pub fn to_element(&self) -> Element {
        let points = self.points.iter().map(point_element).collect();
        Element::master(ids::CUES, points)
    }

    /// Reads the index from a `Cues` element. Cue points without a `CueTime`, and positions
    /// without a track or cluster, are dropped.
    pub fn from_element(element: &Element, timecode_scale: u64) -> Self {
        let mut cues = Cues::new(timecode_scale);
        for point in element.find_all(ids::CUE_POINT) {
            let time = match point.get_uint(ids::CUE_TIME) {
                Some(time) => time,
                None => {
                    warn!("cue point at {:?} has no time", point.position());
                    continue;
                }
            };
            let positions = point
                .find_all(ids::CUE_TRACK_POSITIONS)
                .filter_map(read_track_positions)
                .collect();
            cues.insert(CuePoint { time, positions });
        }
        cues
    }
}

fn point_element(point: &CuePoint) -> Element {
    let mut children = vec![Element::uint(ids::CUE_TIME, point.time)];
    for positions in &point.positions {
        let mut inner = vec![
            Element::uint(ids::CUE_TRACK, positions.track),
            Element::uint(ids::CUE_CLUSTER_POSITION, positions.cluster_position),
        ];
        let optional = [
            (ids::CUE_RELATIVE_POSITION, positions.relative_position),
            (ids::CUE_DURATION, positions.duration),
            (ids::CUE_BLOCK_NUMBER, positions.block_number),
            (ids::CUE_CODEC_STATE, positions.codec_state),
        ];
        inner.extend(
            optional
                .iter()
                .filter_map(|&(id, value)| value.map(|v| Element::uint(id, v))),
        );
        for reference in &positions.references {
            let mut fields = vec![Element::uint(ids::CUE_REF_TIME, reference.time)];
            let optional = [
                (ids::CUE_REF_CLUSTER, reference.cluster),
                (ids::CUE_REF_NUMBER, reference.number),
                (ids::CUE_REF_CODEC_STATE, reference.codec_state),
            ];
            fields.extend(
                optional
                    .iter()
                    .filter_map(|&(id, value)| value.map(|v| Element::uint(id, v))),
            );
            inner.push(Element::master(ids::CUE_REFERENCE, fields));
        }
        children.push(Element::master(ids::CUE_TRACK_POSITIONS, inner));
    }
    Element::master(ids::CUE_POINT, children)
}

// The value of a child, only if it is actually there.
fn present_uint(element: &Element, id: Id) -> Option<u64> {
    element.find_first(id).and_then(Element::as_uint)
}

fn read_track_positions(element: &Element) -> Option<CueTrackPositions> {
    let track = element.get_uint(ids::CUE_TRACK)?;
    let cluster_position = element.get_uint(ids::CUE_CLUSTER_POSITION)?;
    let references = element
        .find_all(ids::CUE_REFERENCE)
        .filter_map(|reference| {
            Some(CueReference {
                time: reference.get_uint(ids::CUE_REF_TIME)?,
                cluster: present_uint(reference, ids::CUE_REF_CLUSTER),
                number: present_uint(reference, ids::CUE_REF_NUMBER),
                codec_state: present_uint(reference, ids::CUE_REF_CODEC_STATE),
            })
        })
        .collect();
    Some(CueTrackPositions {
        track,
        cluster_position,
        relative_position: present_uint(element, ids::CUE_RELATIVE_POSITION),
        duration: present_uint(element, ids::CUE_DURATION),
        block_number: present_uint(element, ids::CUE_BLOCK_NUMBER),
        codec_state: present_uint(element, ids::CUE_CODEC_STATE),
        references,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matroska::cluster::ClusterHandle;
    use crate::read::ReadOptions;
    use std::io::Cursor;

    const MS: u64 = 1_000_000;

    fn block(cluster: usize, index: usize) -> BlockRef {
        BlockRef {
            cluster: ClusterHandle(cluster),
            index,
        }
    }

    fn position(block: BlockRef, track: u64, timecode: u64, cluster: u64) -> BlockPosition {
        BlockPosition {
            block,
            track,
            timecode,
            cluster_position: cluster,
            relative_position: None,
            block_number: None,
            duration: None,
            codec_state: None,
            references: Vec::new(),
        }
    }

    #[test]
    fn pending_to_point() {
        let mut cues = Cues::new(MS);
        cues.add_block(block(0, 0), 1, 0);
        cues.add_block(block(1, 0), 1, 40 * MS);
        assert!(cues.is_pending(block(1, 0)));
        assert_eq!(2, cues.pending_count());

        cues.position_set(position(block(1, 0), 1, 40 * MS, 500)).unwrap();
        // matched by timecode and track
        cues.position_set(position(block(7, 7), 1, 0, 50)).unwrap();
        assert_eq!(0, cues.pending_count());
        let times: Vec<_> = cues.points().iter().map(|p| p.time).collect();
        assert_eq!(vec![0, 40], times);

        assert!(matches!(
            cues.position_set(position(block(2, 0), 1, 80 * MS, 900)),
            Err(EbmlError::CueNotPending { track: 1, timecode: 80_000_000 })
        ));
    }

    #[test]
    fn same_time_merges() {
        let mut cues = Cues::new(MS);
        cues.add_block(block(0, 1), 2, 10 * MS);
        cues.add_block(block(0, 0), 1, 10 * MS);
        cues.position_set(position(block(0, 1), 2, 10 * MS, 7)).unwrap();
        cues.position_set(position(block(0, 0), 1, 10 * MS, 7)).unwrap();
        assert_eq!(1, cues.points().len());
        let tracks: Vec<_> = cues.points()[0].positions.iter().map(|p| p.track).collect();
        assert_eq!(vec![1, 2], tracks);
    }

    #[test]
    fn seeking() {
        let mut cues = Cues::new(MS);
        for &(time, cluster) in &[(0, 10), (100, 2000), (200, 4000)] {
            cues.insert(CuePoint {
                time,
                positions: vec![CueTrackPositions {
                    track: 1,
                    cluster_position: cluster,
                    ..Default::default()
                }],
            });
        }
        assert_eq!(None, cues.timecode_position(0));
        assert_eq!(Some(10), cues.timecode_position(MS));
        assert_eq!(Some(10), cues.timecode_position(100 * MS));
        assert_eq!(Some(2000), cues.timecode_position(150 * MS));
        assert_eq!(Some(4000), cues.timecode_position(10_000 * MS));
        assert_eq!(100, cues.timecode_point(101 * MS).unwrap().time);
    }

    #[test]
    fn element_round_trip() {
        let mut cues = Cues::new(MS);
        cues.insert(CuePoint {
            time: 12,
            positions: vec![CueTrackPositions {
                track: 1,
                cluster_position: 345,
                relative_position: Some(6),
                duration: Some(40),
                block_number: Some(2),
                codec_state: None,
                references: vec![CueReference {
                    time: 8,
                    cluster: Some(345),
                    number: Some(1),
                    codec_state: None,
                }],
            }],
        });
        let mut element = cues.to_element();
        element.validate().unwrap();
        let mut cursor = Cursor::new(Vec::new());
        element.render(&mut cursor).unwrap();
        cursor.set_position(0);
        let options = ReadOptions::default();
        let read = Element::read(&mut cursor, Some(ids::SEGMENT), &options).unwrap().unwrap();
        assert_eq!(cues.points(), Cues::from_element(&read, MS).points());
    }

    #[test]
    fn absent_fields_stay_absent() {
        let element = Element::master(
            ids::CUES,
            vec![Element::master(
                ids::CUE_POINT,
                vec![
                    Element::uint(ids::CUE_TIME, 3),
                    Element::master(
                        ids::CUE_TRACK_POSITIONS,
                        vec![
                            Element::uint(ids::CUE_TRACK, 1),
                            Element::uint(ids::CUE_CLUSTER_POSITION, 90),
                            Element::master(
                                ids::CUE_REFERENCE,
                                vec![Element::uint(ids::CUE_REF_TIME, 1)],
                            ),
                        ],
                    ),
                ],
            )],
        );
        let cues = Cues::from_element(&element, MS);
        let positions = &cues.points()[0].positions[0];
        assert_eq!(None, positions.block_number);
        assert_eq!(None, positions.codec_state);
        assert_eq!(None, positions.relative_position);
        assert_eq!(
            vec![CueReference {
                time: 1,
                ..Default::default()
            }],
            positions.references
        );
    }
}
