//! `ISetMap` reader: video id → sorted, disjoint plain intervals.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::interval::{self, Interval};

use super::format::MappedIndex;

const RECORD_LEN: usize = 8; // two little-endian u32 endpoints

fn decode_record(bytes: &[u8]) -> Interval {
    let start = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let end = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    (start, end)
}

/// The interface every composed ISetMap view implements: base mmapped
/// readers and the lazy projections (`IListToISet`, `UnionIListsToISet`,
/// `ISetIntersection`, `ISetSubset`) are interchangeable behind this trait.
/// Cloning a handle (`Arc<dyn IsetReader>`) never duplicates the
/// underlying mmap.
pub trait IsetReader: Send + Sync + std::fmt::Debug {
    fn get_intervals(&self, video_id: u32, deoverlap: bool) -> Vec<Interval>;
    fn get_ids(&self) -> Vec<u32>;
    fn has_id(&self, video_id: u32) -> bool;

    fn intersect(&self, video_id: u32, query: &[Interval], deoverlap: bool) -> Vec<Interval> {
        interval::intersect(&self.get_intervals(video_id, deoverlap), query)
    }

    fn minus(&self, video_id: u32, query: &[Interval], deoverlap: bool) -> Vec<Interval> {
        interval::subtract(query, &self.get_intervals(video_id, deoverlap))
    }

    fn is_contained(&self, video_id: u32, t: u32, deoverlap: bool) -> bool {
        self.get_intervals(video_id, deoverlap)
            .iter()
            .any(|&(s, e)| s <= t && t < e)
    }

    /// Total covered milliseconds across every video, used by the
    /// derivation pipeline's screen-time prefilter.
    fn sum_ms(&self) -> u64 {
        self.get_ids()
            .iter()
            .flat_map(|&id| self.get_intervals(id, true))
            .map(|(s, e)| (e - s) as u64)
            .sum()
    }
}

/// A memory-mapped, on-disk `ISetMap`.
pub struct MmapIntervalSetMapping {
    inner: MappedIndex,
}

impl std::fmt::Debug for MmapIntervalSetMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapIntervalSetMapping")
            .field("inner", &self.inner)
            .finish()
    }
}

impl MmapIntervalSetMapping {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            inner: MappedIndex::open(path)?,
        })
    }

    fn raw_intervals(&self, video_id: u32) -> Vec<Interval> {
        self.inner
            .record_bytes(video_id, RECORD_LEN)
            .chunks_exact(RECORD_LEN)
            .map(decode_record)
            .collect()
    }
}

impl IsetReader for MmapIntervalSetMapping {
    fn get_intervals(&self, video_id: u32, deoverlap: bool) -> Vec<Interval> {
        let raw = self.raw_intervals(video_id);
        if deoverlap {
            interval::deoverlap(raw, 0)
        } else {
            raw
        }
    }

    fn get_ids(&self) -> Vec<u32> {
        self.inner.ids().collect()
    }

    fn has_id(&self, video_id: u32) -> bool {
        self.inner.has_id(video_id)
    }
}

/// Restricts an inner ISet view to a fixed set of video ids, used when a
/// request is scoped to a handful of videos (`/search-videos`).
#[derive(Debug)]
pub struct ISetSubset {
    inner: Arc<dyn IsetReader>,
    allowed_ids: std::collections::BTreeSet<u32>,
}

impl ISetSubset {
    pub fn new(inner: Arc<dyn IsetReader>, allowed_ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            inner,
            allowed_ids: allowed_ids.into_iter().collect(),
        }
    }
}

impl IsetReader for ISetSubset {
    fn get_intervals(&self, video_id: u32, deoverlap: bool) -> Vec<Interval> {
        if self.allowed_ids.contains(&video_id) {
            self.inner.get_intervals(video_id, deoverlap)
        } else {
            Vec::new()
        }
    }

    fn get_ids(&self) -> Vec<u32> {
        self.inner
            .get_ids()
            .into_iter()
            .filter(|id| self.allowed_ids.contains(id))
            .collect()
    }

    fn has_id(&self, video_id: u32) -> bool {
        self.allowed_ids.contains(&video_id) && self.inner.has_id(video_id)
    }
}

/// Pairwise intersection of N ISet views, computed lazily per video.
#[derive(Debug)]
pub struct ISetIntersection {
    views: Vec<Arc<dyn IsetReader>>,
}

impl ISetIntersection {
    pub fn new(views: Vec<Arc<dyn IsetReader>>) -> Self {
        Self { views }
    }
}

impl IsetReader for ISetIntersection {
    fn get_intervals(&self, video_id: u32, deoverlap: bool) -> Vec<Interval> {
        let mut iter = self.views.iter();
        let Some(first) = iter.next() else {
            return Vec::new();
        };
        let mut acc = first.get_intervals(video_id, deoverlap);
        for view in iter {
            if acc.is_empty() {
                break;
            }
            acc = interval::intersect(&acc, &view.get_intervals(video_id, deoverlap));
        }
        acc
    }

    fn get_ids(&self) -> Vec<u32> {
        let Some(first) = self.views.first() else {
            return Vec::new();
        };
        let mut ids: std::collections::BTreeSet<u32> = first.get_ids().into_iter().collect();
        for view in &self.views[1..] {
            let other: std::collections::BTreeSet<u32> = view.get_ids().into_iter().collect();
            ids = ids.intersection(&other).copied().collect();
        }
        ids.into_iter().collect()
    }

    fn has_id(&self, video_id: u32) -> bool {
        self.views.iter().all(|v| v.has_id(video_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::writer::{write_iset_file, IsetFileSpec};

    #[test]
    fn roundtrip_iset_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.iset.bin");
        write_iset_file(
            &path,
            IsetFileSpec {
                entries: vec![(10000, vec![(0, 1000), (2000, 3000)]), (10001, vec![(500, 600)])],
            },
        )
        .unwrap();

        let reader = MmapIntervalSetMapping::open(&path).unwrap();
        assert_eq!(reader.get_intervals(10000, false), vec![(0, 1000), (2000, 3000)]);
        assert_eq!(reader.get_intervals(10001, false), vec![(500, 600)]);
        assert_eq!(reader.get_intervals(99999, false), vec![]);
        assert!(reader.has_id(10000));
        assert!(!reader.has_id(99999));
        assert_eq!(reader.get_ids(), vec![10000, 10001]);
    }

    #[test]
    fn iset_intersection_of_two_views() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.iset.bin");
        let b_path = dir.path().join("b.iset.bin");
        write_iset_file(
            &a_path,
            IsetFileSpec {
                entries: vec![(1, vec![(0, 100)])],
            },
        )
        .unwrap();
        write_iset_file(
            &b_path,
            IsetFileSpec {
                entries: vec![(1, vec![(50, 150)])],
            },
        )
        .unwrap();

        let a: Arc<dyn IsetReader> = Arc::new(MmapIntervalSetMapping::open(&a_path).unwrap());
        let b: Arc<dyn IsetReader> = Arc::new(MmapIntervalSetMapping::open(&b_path).unwrap());
        let inter = ISetIntersection::new(vec![a, b]);
        assert_eq!(inter.get_intervals(1, false), vec![(50, 100)]);
    }
}
