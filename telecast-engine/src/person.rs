//! Per-person and global face interval data loaded into a [`crate::context::DataContext`].

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::index::{IsetReader, MmapIntervalListMapping, MmapIntervalSetMapping};

/// The nine precomputed face-attribute isets plus the raw faces ilist and
/// the num-faces ilist, exactly as derived by [`crate::derive::derive_face_isets`].
#[derive(Debug)]
pub struct FaceIntervals {
    pub faces_ilist: Arc<MmapIntervalListMapping>,
    pub num_faces_ilist: Arc<MmapIntervalListMapping>,
    pub all: Arc<MmapIntervalSetMapping>,
    pub male: Arc<MmapIntervalSetMapping>,
    pub female: Arc<MmapIntervalSetMapping>,
    pub host: Arc<MmapIntervalSetMapping>,
    pub nonhost: Arc<MmapIntervalSetMapping>,
    pub male_host: Arc<MmapIntervalSetMapping>,
    pub male_nonhost: Arc<MmapIntervalSetMapping>,
    pub female_host: Arc<MmapIntervalSetMapping>,
    pub female_nonhost: Arc<MmapIntervalSetMapping>,
}

impl FaceIntervals {
    /// Resolve one of the five global face tags to its precomputed iset.
    /// `nonbinary` persons (bit1 set) never appear under `male`/`female`;
    /// see the derivation mask table in [`crate::derive`].
    pub fn global_tag(&self, tag: &str) -> Option<Arc<dyn IsetReader>> {
        let view: Arc<dyn IsetReader> = match tag {
            "all" => self.all.clone(),
            "male" => self.male.clone(),
            "female" => self.female.clone(),
            "host" => self.host.clone(),
            "nonhost" => self.nonhost.clone(),
            _ => return None,
        };
        Some(view)
    }

    /// The combined tag resolution used when a query names exactly two
    /// global tags at once (e.g. `male` AND `host`), matching
    /// `get_face_tag_intervals`'s nine-way decision tree.
    pub fn global_pair(&self, a: &str, b: &str) -> Option<Arc<dyn IsetReader>> {
        let view: Arc<dyn IsetReader> = match (a, b) {
            ("male", "host") | ("host", "male") => self.male_host.clone(),
            ("male", "nonhost") | ("nonhost", "male") => self.male_nonhost.clone(),
            ("female", "host") | ("host", "female") => self.female_host.clone(),
            ("female", "nonhost") | ("nonhost", "female") => self.female_nonhost.clone(),
            _ => return None,
        };
        Some(view)
    }
}

/// One named person's screen-time intervals, plus a handle to the raw
/// ilist so face-tag union queries (multiple people sharing a tag) can
/// recombine before deoverlapping.
#[derive(Debug)]
pub struct PersonIntervals {
    pub name: String,
    pub ilist: Arc<MmapIntervalListMapping>,
    pub iset: Arc<dyn IsetReader>,
    pub total_screen_time_ms: u64,
}

/// Name (lowercased) → that person's intervals, loaded with the
/// screen-time prefilter from §4.C applied.
#[derive(Debug, Default)]
pub struct PersonIntervalsTable {
    by_name: BTreeMap<String, PersonIntervals>,
}

impl PersonIntervalsTable {
    pub fn new(by_name: BTreeMap<String, PersonIntervals>) -> Self {
        Self { by_name }
    }

    pub fn get(&self, name_lower: &str) -> Option<&PersonIntervals> {
        self.by_name.get(name_lower)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
