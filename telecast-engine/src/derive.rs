//! Offline derivation primitives (§4.H): the pieces `telecast-derive`
//! composes into a worker-pool pipeline. Library code only — no CLI or
//! filesystem walking here, that lives in the `telecast-derive` binary.

use std::collections::BTreeMap;
use std::path::Path;

use crate::index::{MappedIndex, MmapIntervalListMapping};
use crate::interval::{Interval, PayloadInterval};

/// Default derivation-time coalescing fuzz, shared by face isets, person
/// isets, and per-tag ilists (§4.H). Distinct from the runtime default of
/// 100ms used by [`crate::interval::deoverlap`] at query time.
pub const DERIVATION_FUZZ_MS: u32 = 250;

/// Gaps longer than this in a video's face coverage get an explicit
/// zero-count filler segment in the num-faces ilist.
pub const MIN_NO_FACES_MS: u32 = 1000;

/// Streaming accumulator mirroring `derive_data.py`'s `IntervalAccumulator`:
/// fed intervals in start order, coalescing any two within `fuzz_ms`.
pub struct IntervalAccumulator {
    fuzz_ms: u32,
    current: Option<Interval>,
    out: Vec<Interval>,
}

impl IntervalAccumulator {
    pub fn new(fuzz_ms: u32) -> Self {
        Self {
            fuzz_ms,
            current: None,
            out: Vec::new(),
        }
    }

    pub fn add(&mut self, start: u32, end: u32) {
        match self.current {
            Some((cs, ce)) if start < ce.saturating_add(self.fuzz_ms) => {
                self.current = Some((cs, ce.max(end)));
            }
            _ => {
                if let Some(c) = self.current.take() {
                    self.out.push(c);
                }
                self.current = Some((start, end));
            }
        }
    }

    pub fn get(mut self) -> Vec<Interval> {
        if let Some(c) = self.current.take() {
            self.out.push(c);
        }
        self.out
    }
}

/// One of the nine (mask, value) pairs selecting a face-attribute
/// combination, matching `derive_face_isets` exactly.
pub struct FaceMaskSpec {
    pub file_name: &'static str,
    pub mask: u8,
    pub value: u8,
}

pub const FACE_MASK_SPECS: [FaceMaskSpec; 9] = [
    FaceMaskSpec { file_name: "all.iset.bin", mask: 0b000, value: 0b000 },
    FaceMaskSpec { file_name: "male.iset.bin", mask: 0b011, value: 0b001 },
    FaceMaskSpec { file_name: "female.iset.bin", mask: 0b011, value: 0b000 },
    FaceMaskSpec { file_name: "host.iset.bin", mask: 0b100, value: 0b100 },
    FaceMaskSpec { file_name: "nonhost.iset.bin", mask: 0b100, value: 0b000 },
    FaceMaskSpec { file_name: "male_host.iset.bin", mask: 0b111, value: 0b101 },
    FaceMaskSpec { file_name: "male_nonhost.iset.bin", mask: 0b111, value: 0b001 },
    FaceMaskSpec { file_name: "female_host.iset.bin", mask: 0b111, value: 0b100 },
    FaceMaskSpec { file_name: "female_nonhost.iset.bin", mask: 0b111, value: 0b000 },
];

/// One video's deoverlapped, mask-filtered face intervals.
pub fn derive_face_iset_for_video(faces: &MmapIntervalListMapping, video_id: u32, mask: u8, value: u8) -> Vec<Interval> {
    let mut acc = IntervalAccumulator::new(DERIVATION_FUZZ_MS);
    for (s, e) in faces.get_intervals(video_id, mask, value, false) {
        acc.add(s, e);
    }
    acc.get()
}

/// A person's deoverlapped iset, payload-agnostic (mask=0).
pub fn derive_person_iset_for_video(ilist: &MmapIntervalListMapping, video_id: u32) -> Vec<Interval> {
    derive_face_iset_for_video(ilist, video_id, 0, 0)
}

/// Builds the num-faces ilist for one video: disjoint segments labelled
/// with concurrent-face count, zero-filled across gaps > [`MIN_NO_FACES_MS`],
/// coalescing adjacent equal-count segments within [`DERIVATION_FUZZ_MS`].
///
/// `raw` is the video's (possibly overlapping) face intervals, sorted by
/// start. `video_duration_ms` anchors the trailing filler.
pub fn derive_num_faces_for_video(raw: &[Interval], video_duration_ms: u32) -> Vec<PayloadInterval> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut boundaries: Vec<u32> = raw.iter().flat_map(|&(s, e)| [s, e]).collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut segments: Vec<(u32, u32, u32)> = Vec::new();
    for w in boundaries.windows(2) {
        let (t0, t1) = (w[0], w[1]);
        let count = raw.iter().filter(|&&(s, e)| s <= t0 && t1 <= e).count() as u32;
        if count > 0 {
            segments.push((t0, t1, count));
        }
    }

    let mut filled: Vec<(u32, u32, u32)> = Vec::new();
    let mut cursor = 0u32;
    for &(s, e, c) in &segments {
        if s > cursor && s - cursor > MIN_NO_FACES_MS {
            filled.push((cursor, s, 0));
        }
        filled.push((s, e, c));
        cursor = e;
    }
    if video_duration_ms > cursor && video_duration_ms - cursor > MIN_NO_FACES_MS {
        filled.push((cursor, video_duration_ms, 0));
    }

    let mut out: Vec<PayloadInterval> = Vec::new();
    for (s, e, c) in filled {
        let payload = c.min(255) as u8;
        match out.last_mut() {
            Some(last) if last.2 == payload && s < last.1.saturating_add(DERIVATION_FUZZ_MS) => {
                last.1 = last.1.max(e);
            }
            _ => out.push((s, e, payload)),
        }
    }
    out
}

/// Merges postings from every person carrying a tag into a single
/// per-payload-deoverlapped list, matching `derive_tag_ilists`.
pub fn derive_tag_intervals(person_postings: &[PayloadInterval]) -> Vec<PayloadInterval> {
    let mut sorted = person_postings.to_vec();
    sorted.sort_by_key(|&(s, _, _)| s);

    let mut by_payload: BTreeMap<u8, IntervalAccumulator> = BTreeMap::new();
    for (s, e, p) in sorted {
        by_payload.entry(p).or_insert_with(|| IntervalAccumulator::new(DERIVATION_FUZZ_MS)).add(s, e);
    }

    let mut out: Vec<PayloadInterval> = by_payload
        .into_iter()
        .flat_map(|(p, acc)| acc.get().into_iter().map(move |(s, e)| (s, e, p)))
        .collect();
    out.sort_by_key(|&(s, _, _)| s);
    out
}

/// Incremental-mode support: video ids not already present in an
/// existing output file (or all ids, if the file doesn't exist yet).
pub fn missing_ids(existing_path: &Path, all_ids: &[u32]) -> Vec<u32> {
    match MappedIndex::open(existing_path) {
        Ok(existing) => {
            let present: std::collections::HashSet<u32> = existing.ids().collect();
            all_ids.iter().copied().filter(|id| !present.contains(id)).collect()
        }
        Err(_) => all_ids.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_coalesces_within_fuzz() {
        let mut acc = IntervalAccumulator::new(250);
        acc.add(0, 1000);
        acc.add(1100, 2000);
        acc.add(3000, 4000);
        assert_eq!(acc.get(), vec![(0, 2000), (3000, 4000)]);
    }

    #[test]
    fn num_faces_inserts_trailing_filler_past_threshold() {
        let raw = vec![(0, 500)];
        let segments = derive_num_faces_for_video(&raw, 5000);
        assert_eq!(segments, vec![(0, 500, 1), (500, 5000, 0)]);
    }

    #[test]
    fn num_faces_skips_short_trailing_gap() {
        let raw = vec![(0, 500)];
        let segments = derive_num_faces_for_video(&raw, 700);
        assert_eq!(segments, vec![(0, 500, 1)]);
    }

    #[test]
    fn tag_intervals_split_by_payload() {
        let postings = vec![(0, 1000, 0b001), (500, 1500, 0b100)];
        let merged = derive_tag_intervals(&postings);
        assert_eq!(merged, vec![(0, 1000, 0b001), (500, 1500, 0b100)]);
    }
}
