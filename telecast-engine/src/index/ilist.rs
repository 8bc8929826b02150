//! `IListMap` reader: video id → sorted plain intervals, each carrying a
//! payload byte (face attributes, tag membership, face count, ...).

use std::path::Path;

use crate::error::Result;
use crate::interval::{self, Interval, PayloadInterval};

use super::format::MappedIndex;

/// Payload width fixed at open time; every index this engine reads uses
/// `P = 1` (faces, people, tags, num-faces all fit in a single byte).
const PAYLOAD_LEN: usize = 1;
const RECORD_LEN: usize = 8 + PAYLOAD_LEN;

fn decode_record(bytes: &[u8]) -> PayloadInterval {
    let start = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let end = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    (start, end, bytes[8])
}

/// A memory-mapped, on-disk `IListMap`.
pub struct MmapIntervalListMapping {
    inner: MappedIndex,
}

impl std::fmt::Debug for MmapIntervalListMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapIntervalListMapping")
            .field("inner", &self.inner)
            .finish()
    }
}

impl MmapIntervalListMapping {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            inner: MappedIndex::open(path)?,
        })
    }

    /// Every record for `video_id`, payload-masked iff `mask != 0`. An
    /// entry `(s, e, p)` is included iff `p & mask == value`.
    pub fn get_intervals_with_payload(
        &self,
        video_id: u32,
        mask: u8,
        value: u8,
    ) -> Vec<PayloadInterval> {
        self.inner
            .record_bytes(video_id, RECORD_LEN)
            .chunks_exact(RECORD_LEN)
            .map(decode_record)
            .filter(|&(_, _, p)| p & mask == value)
            .collect()
    }

    /// Plain (payload-stripped) intervals for `video_id`, mask-filtered.
    pub fn get_intervals(
        &self,
        video_id: u32,
        mask: u8,
        value: u8,
        deoverlap: bool,
    ) -> Vec<Interval> {
        let raw: Vec<Interval> = self
            .get_intervals_with_payload(video_id, mask, value)
            .into_iter()
            .map(|(s, e, _)| (s, e))
            .collect();
        if deoverlap {
            interval::deoverlap(raw, 0)
        } else {
            raw
        }
    }

    pub fn intersect(
        &self,
        video_id: u32,
        query: &[Interval],
        mask: u8,
        value: u8,
        deoverlap: bool,
    ) -> Vec<Interval> {
        interval::intersect(&self.get_intervals(video_id, mask, value, deoverlap), query)
    }

    /// Sum of milliseconds covered by `query`, filtered to payload entries
    /// matching `(mask, value)`. Used by the `facetime` countable path.
    pub fn intersect_sum(
        &self,
        video_id: u32,
        query: &[Interval],
        mask: u8,
        value: u8,
        deoverlap: bool,
    ) -> u64 {
        self.intersect(video_id, query, mask, value, deoverlap)
            .iter()
            .map(|&(s, e)| (e - s) as u64)
            .sum()
    }

    pub fn get_ids(&self) -> Vec<u32> {
        self.inner.ids().collect()
    }

    pub fn has_id(&self, video_id: u32) -> bool {
        self.inner.has_id(video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::writer::{write_ilist_file, IlistFileSpec};

    #[test]
    fn payload_mask_filters_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.ilist.bin");
        write_ilist_file(
            &path,
            IlistFileSpec {
                entries: vec![(
                    10000,
                    vec![(0, 1000, 0b001), (1000, 2000, 0b000), (2000, 3000, 0b101)],
                )],
            },
        )
        .unwrap();

        let reader = MmapIntervalListMapping::open(&path).unwrap();
        // mask=0b1, value=0b1 -> male faces only
        assert_eq!(
            reader.get_intervals(10000, 0b1, 0b1, false),
            vec![(0, 1000), (2000, 3000)]
        );
        // mask=0, value=0 -> everything, unfiltered
        assert_eq!(reader.get_intervals(10000, 0, 0, false).len(), 3);
    }
}
