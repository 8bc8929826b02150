//! Lazy composed views that present an [`IsetReader`] interface over one
//! or more `IListMap`s. Construction is O(1); all work happens on a
//! per-video access (§4.B).

use std::sync::Arc;

use crate::interval::{self, Interval};

use super::ilist::MmapIntervalListMapping;
use super::iset::IsetReader;

/// Projects a payload-mask-filtered `IListMap` to a deoverlapped `ISetMap`
/// on the fly. `pad` may expand each endpoint outward by a fixed amount
/// before deoverlapping (used for `num_faces = N` views, where `pad = 0`;
/// face-tag/name views use `pad = 100`).
#[derive(Debug)]
pub struct IListToISet {
    ilist: Arc<MmapIntervalListMapping>,
    mask: u8,
    value: u8,
    fuzz_ms: u32,
    pad_ms: u32,
}

impl IListToISet {
    pub fn new(ilist: Arc<MmapIntervalListMapping>, mask: u8, value: u8, fuzz_ms: u32, pad_ms: u32) -> Self {
        Self {
            ilist,
            mask,
            value,
            fuzz_ms,
            pad_ms,
        }
    }

    fn padded(&self, video_id: u32) -> Vec<Interval> {
        self.ilist
            .get_intervals(video_id, self.mask, self.value, false)
            .into_iter()
            .map(|(s, e)| (s.saturating_sub(self.pad_ms), e.saturating_add(self.pad_ms)))
            .collect()
    }
}

impl IsetReader for IListToISet {
    fn get_intervals(&self, video_id: u32, _deoverlap: bool) -> Vec<Interval> {
        interval::deoverlap(self.padded(video_id), self.fuzz_ms)
    }

    fn get_ids(&self) -> Vec<u32> {
        self.ilist.get_ids()
    }

    fn has_id(&self, video_id: u32) -> bool {
        self.ilist.has_id(video_id)
    }
}

/// Projects the union of several mask-filtered `IListMap`s to a single
/// deoverlapped `ISetMap`, used for face-tag resolution when a tag
/// resolves to more than one person (§4.F).
#[derive(Debug)]
pub struct UnionIListsToISet {
    ilists: Vec<Arc<MmapIntervalListMapping>>,
    mask: u8,
    value: u8,
    fuzz_ms: u32,
    pad_ms: u32,
}

impl UnionIListsToISet {
    pub fn new(
        ilists: Vec<Arc<MmapIntervalListMapping>>,
        mask: u8,
        value: u8,
        fuzz_ms: u32,
        pad_ms: u32,
    ) -> Self {
        Self {
            ilists,
            mask,
            value,
            fuzz_ms,
            pad_ms,
        }
    }
}

impl IsetReader for UnionIListsToISet {
    fn get_intervals(&self, video_id: u32, _deoverlap: bool) -> Vec<Interval> {
        let mut merged: Vec<Interval> = self
            .ilists
            .iter()
            .flat_map(|l| l.get_intervals(video_id, self.mask, self.value, false))
            .map(|(s, e)| (s.saturating_sub(self.pad_ms), e.saturating_add(self.pad_ms)))
            .collect();
        merged.sort_unstable_by_key(|&(s, _)| s);
        interval::deoverlap(merged, self.fuzz_ms)
    }

    fn get_ids(&self) -> Vec<u32> {
        let mut ids: std::collections::BTreeSet<u32> = std::collections::BTreeSet::new();
        for l in &self.ilists {
            ids.extend(l.get_ids());
        }
        ids.into_iter().collect()
    }

    fn has_id(&self, video_id: u32) -> bool {
        self.ilists.iter().any(|l| l.has_id(video_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::writer::{write_ilist_file, IlistFileSpec};

    #[test]
    fn ilist_to_iset_coalesces_adjacent_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.ilist.bin");
        write_ilist_file(
            &path,
            IlistFileSpec {
                entries: vec![(1, vec![(0, 1000, 0), (1000, 2000, 0)])],
            },
        )
        .unwrap();

        let ilist = Arc::new(MmapIntervalListMapping::open(&path).unwrap());
        let view = IListToISet::new(ilist, 0, 0, 100, 0);
        assert_eq!(view.get_intervals(1, true), vec![(0, 2000)]);
    }
}
