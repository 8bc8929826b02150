//! The loaded world (§4.C): everything a query evaluates against, built
//! once at startup and shared read-only across requests.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::index::{IListToISet, IsetReader, MmapIntervalListMapping, MmapIntervalSetMapping};
use crate::parsing::parse_date_from_video_name;
use crate::person::{FaceIntervals, PersonIntervals, PersonIntervalsTable};
use crate::tag::{sanitize_tag, AllPersonTags, Tag, MAX_PERSON_ATTRIBUTE_LEN, MIN_PERSON_ATTRIBUTE_LEN};
use crate::video::{Video, VideoTable};

/// Injected predicate narrowing which persons get loaded, e.g. a lexicon
/// gate. Defaults to accept-all (§11).
pub type PersonNameFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Directory layout and tunables controlling [`DataContext::load`].
pub struct ContextPaths {
    pub data_dir: PathBuf,
    pub timezone: Tz,
    pub min_person_screen_time_ms: u64,
    pub person_name_filter: Option<PersonNameFilter>,
}

/// Derivation-time fuzz for coalescing ilist-backed person isets; matches
/// `IntervalAccumulator`'s default in the offline pipeline (§4.H).
const PERSON_ISET_FUZZ_MS: u32 = 250;

#[derive(Debug)]
pub struct DataContext {
    pub videos: VideoTable,
    pub commercial_iset: Arc<MmapIntervalSetMapping>,
    pub face: FaceIntervals,
    pub persons: PersonIntervalsTable,
    pub tags: AllPersonTags,
    pub cached_tag_ilists: BTreeMap<String, Arc<MmapIntervalListMapping>>,
    /// Person name (lowercased) → channels they host on.
    pub hosts: BTreeMap<String, std::collections::BTreeSet<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVideoRecord {
    /// `[id, name, show, channel, num_frames, fps, width, height]`
    NoTimestamp(u32, String, String, String, u32, f64, u32, u32),
    /// Older shape carrying a pre-parsed `minute`.
    WithMinute(u32, String, String, String, u32, f64, u32, u32, u32),
}

impl DataContext {
    pub fn load(paths: &ContextPaths) -> Result<Self> {
        let videos = Self::load_videos(paths)?;
        let commercial_iset = Arc::new(MmapIntervalSetMapping::open(
            paths.data_dir.join("commercials.iset.bin"),
        )?);
        let face = Self::load_face_intervals(paths)?;
        let persons = Self::load_persons(paths)?;
        let tags = Self::load_person_tags(paths, &persons)?;
        let cached_tag_ilists = Self::load_cached_tag_ilists(paths)?;
        let hosts = Self::load_hosts(paths)?;

        Ok(Self {
            videos,
            commercial_iset,
            face,
            persons,
            tags,
            cached_tag_ilists,
            hosts,
        })
    }

    /// Loads just the video table, independent of any derived index —
    /// used by `telecast-derive` to know video ids and durations before
    /// the derived files it is about to produce exist.
    pub fn load_videos(paths: &ContextPaths) -> Result<VideoTable> {
        let raw = fs::read_to_string(paths.data_dir.join("videos.json")).map_err(|source| Error::Index {
            path: paths.data_dir.join("videos.json"),
            source,
        })?;
        let records: Vec<RawVideoRecord> = serde_json::from_str(&raw)?;

        let mut videos = Vec::with_capacity(records.len());
        for record in records {
            let (id, name, show, channel, num_frames, fps, width, height) = match record {
                RawVideoRecord::NoTimestamp(id, name, show, channel, num_frames, fps, width, height) => {
                    (id, name, show, channel, num_frames, fps, width, height)
                }
                RawVideoRecord::WithMinute(id, name, show, channel, num_frames, fps, width, height, _minute) => {
                    (id, name, show, channel, num_frames, fps, width, height)
                }
            };
            let ts = parse_date_from_video_name(&name, paths.timezone)?;
            videos.push(Video {
                id,
                name,
                show,
                channel,
                date: ts.date,
                day_of_week: ts.day_of_week,
                hour: ts.hour,
                num_frames,
                fps,
                width,
                height,
            });
        }
        Ok(VideoTable::new(videos))
    }

    fn load_face_intervals(paths: &ContextPaths) -> Result<FaceIntervals> {
        let derived = paths.data_dir.join("derived").join("face");
        let open_iset = |name: &str| -> Result<Arc<MmapIntervalSetMapping>> {
            Ok(Arc::new(MmapIntervalSetMapping::open(derived.join(name))?))
        };
        Ok(FaceIntervals {
            faces_ilist: Arc::new(MmapIntervalListMapping::open(paths.data_dir.join("faces.ilist.bin"))?),
            num_faces_ilist: Arc::new(MmapIntervalListMapping::open(
                paths.data_dir.join("derived").join("num_faces.ilist.bin"),
            )?),
            all: open_iset("all.iset.bin")?,
            male: open_iset("male.iset.bin")?,
            female: open_iset("female.iset.bin")?,
            host: open_iset("host.iset.bin")?,
            nonhost: open_iset("nonhost.iset.bin")?,
            male_host: open_iset("male_host.iset.bin")?,
            male_nonhost: open_iset("male_nonhost.iset.bin")?,
            female_host: open_iset("female_host.iset.bin")?,
            female_nonhost: open_iset("female_nonhost.iset.bin")?,
        })
    }

    /// Step 4: scan the per-person directory, rejecting by a size-based
    /// prefilter before opening, then by measured screen time after.
    fn load_persons(paths: &ContextPaths) -> Result<PersonIntervalsTable> {
        let dir = paths.data_dir.join("persons");
        let mut by_name = BTreeMap::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(PersonIntervalsTable::default()),
        };

        for entry in entries {
            let entry = entry.map_err(|source| Error::Index { path: dir.clone(), source })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bin")
                || !path.to_string_lossy().ends_with(".ilist.bin")
            {
                continue;
            }
            let stem = path
                .file_name()
                .and_then(|f| f.to_str())
                .map(|f| f.trim_end_matches(".ilist.bin").to_string())
                .unwrap_or_default();
            let name_lower = stem.to_lowercase();

            if let Some(filter) = &paths.person_name_filter {
                if !filter(&name_lower) {
                    continue;
                }
            }

            let metadata = entry.metadata().map_err(|source| Error::Index { path: path.clone(), source })?;
            if estimated_screen_time_below_threshold(metadata.len(), paths.min_person_screen_time_ms) {
                continue;
            }

            let ilist = Arc::new(MmapIntervalListMapping::open(&path)?);
            let iset_path = dir.join(format!("{stem}.iset.bin"));
            let iset: Arc<dyn IsetReader> = if iset_path.exists() {
                Arc::new(MmapIntervalSetMapping::open(&iset_path)?)
            } else {
                Arc::new(IListToISet::new(ilist.clone(), 0, 0, PERSON_ISET_FUZZ_MS, 0))
            };

            let total_screen_time_ms = iset.sum_ms();
            if total_screen_time_ms < paths.min_person_screen_time_ms {
                continue;
            }

            by_name.insert(
                name_lower.clone(),
                PersonIntervals {
                    name: stem,
                    ilist,
                    iset,
                    total_screen_time_ms,
                },
            );
        }

        Ok(PersonIntervalsTable::new(by_name))
    }

    /// Step 5: load `people.metadata.json`, keeping only tags for persons
    /// already present in `persons`, sanitized to a bounded-length slug.
    fn load_person_tags(paths: &ContextPaths, persons: &PersonIntervalsTable) -> Result<AllPersonTags> {
        let path = paths.data_dir.join("people.metadata.json");
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Ok(AllPersonTags::default()),
        };
        let parsed: BTreeMap<String, Vec<(String, String)>> = serde_json::from_str(&raw)?;

        let mut by_person = BTreeMap::new();
        for (name, raw_tags) in parsed {
            let name_lower = name.to_lowercase();
            if persons.get(&name_lower).is_none() {
                continue;
            }
            let mut tags = Vec::new();
            for (tag_name, source) in raw_tags {
                let sanitized = sanitize_tag(&tag_name);
                if sanitized.len() > MIN_PERSON_ATTRIBUTE_LEN && sanitized.len() < MAX_PERSON_ATTRIBUTE_LEN {
                    tags.push(Tag { name: sanitized, source });
                }
            }
            if !tags.is_empty() {
                by_person.insert(name_lower, tags);
            }
        }
        Ok(AllPersonTags::new(by_person))
    }

    fn load_cached_tag_ilists(paths: &ContextPaths) -> Result<BTreeMap<String, Arc<MmapIntervalListMapping>>> {
        let dir = paths.data_dir.join("derived").join("tags");
        let mut out = BTreeMap::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(out),
        };
        for entry in entries {
            let entry = entry.map_err(|source| Error::Index { path: dir.clone(), source })?;
            let path = entry.path();
            let Some(stem) = path.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            let Some(tag_name) = stem.strip_suffix(".ilist.bin") else {
                continue;
            };
            out.insert(tag_name.to_string(), Arc::new(MmapIntervalListMapping::open(&path)?));
        }
        Ok(out)
    }

    fn load_hosts(paths: &ContextPaths) -> Result<BTreeMap<String, std::collections::BTreeSet<String>>> {
        let path = paths.data_dir.join("hosts.csv");
        let mut out: BTreeMap<String, std::collections::BTreeSet<String>> = BTreeMap::new();
        let Ok(raw) = fs::read_to_string(&path) else {
            return Ok(out);
        };
        for line in raw.lines().skip(1) {
            let mut cols = line.splitn(2, ',');
            let (Some(name), Some(channel)) = (cols.next(), cols.next()) else {
                continue;
            };
            out.entry(name.trim().to_lowercase())
                .or_default()
                .insert(channel.trim().to_string());
        }
        Ok(out)
    }

    pub fn person(&self, name_lower: &str) -> Option<&PersonIntervals> {
        self.persons.get(name_lower)
    }
}

fn estimated_screen_time_below_threshold(file_size_bytes: u64, min_screen_time_ms: u64) -> bool {
    let estimated_ms = file_size_bytes / 4 / 2 * 3;
    estimated_ms < min_screen_time_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefilter_skips_small_files() {
        assert!(estimated_screen_time_below_threshold(8, 1_000_000));
        assert!(!estimated_screen_time_below_threshold(8_000_000, 1_000));
    }
}
