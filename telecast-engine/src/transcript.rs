//! Transcript search adapter (§4.E): phrase → sorted-by-video stream of
//! intervals, gated by an estimated cost ceiling.

use crate::context::DataContext;
use crate::error::{Error, Result};
use crate::interval;
use crate::result::LazyItem;
use crate::search::{get_video_filter, SearchContext};

/// The external full-text index is out of scope (§1): this crate only
/// depends on its query/cost-estimate interface.
pub trait CaptionIndex: Send + Sync {
    /// Video name (sans extension) this transcript document corresponds to.
    fn document_video_name(&self, document_id: u32) -> Option<String>;

    /// `(document_id, postings)` pairs, postings as `(start_sec, end_sec)`,
    /// restricted to `document_ids` when `Some`.
    fn search(&self, phrase: &str, document_ids: Option<&[u32]>) -> Result<Vec<(u32, Vec<(f64, f64)>)>>;

    /// Fraction of total postings this phrase is expected to match,
    /// estimated against the lexicon without running the full query.
    fn estimate_cost(&self, phrase: &str) -> Result<f64>;
}

/// Whole-corpus transcript queries above this fraction of total postings
/// are rejected rather than executed (§4.E).
pub const MAX_TRANSCRIPT_SEARCH_COST: f64 = 0.005;

/// Deoverlap fuzz applied after text-window dilation, in milliseconds.
const DILATION_DEOVERLAP_FUZZ_MS: u32 = 100;

pub fn search_transcript(
    data: &DataContext,
    captions: &dyn CaptionIndex,
    ctx: &SearchContext,
    phrase: &str,
) -> Result<Vec<LazyItem>> {
    let restricted_ids: Option<Vec<u32>> = ctx.videos.as_ref().map(|ids| ids.iter().copied().collect());

    if restricted_ids.is_none() {
        let cost = captions.estimate_cost(phrase)?;
        if cost > MAX_TRANSCRIPT_SEARCH_COST {
            return Err(Error::QueryTooExpensive(format!(
                "transcript query {phrase:?} matches {:.2}% of postings, exceeds {:.2}% cap",
                cost * 100.0,
                MAX_TRANSCRIPT_SEARCH_COST * 100.0
            )));
        }
    }

    let hits = captions.search(phrase, restricted_ids.as_deref())?;
    let video_filter = get_video_filter(ctx);

    let mut items = Vec::new();
    for (document_id, postings) in hits {
        let Some(name) = captions.document_video_name(document_id) else {
            continue;
        };
        let Some(video) = data.videos.get_by_name(&name) else {
            continue;
        };
        if let Some(filter) = &video_filter {
            if !filter(video) {
                continue;
            }
        }

        let dilated: Vec<(f64, f64)> = if ctx.text_window > 0 {
            let half = ctx.text_window as f64 / 2.0;
            postings
                .into_iter()
                .map(|(s, e)| {
                    let centre = (s + e) / 2.0;
                    (centre - half, centre + half)
                })
                .collect()
        } else {
            postings
        };

        let ms_intervals: Vec<(u32, u32)> = dilated
            .into_iter()
            .map(|(s, e)| ((s * 1000.0).max(0.0) as u32, (e * 1000.0).max(0.0) as u32))
            .collect();
        let deoverlapped = interval::deoverlap(ms_intervals, DILATION_DEOVERLAP_FUZZ_MS);
        if deoverlapped.is_empty() {
            continue;
        }

        items.push(LazyItem::partial(video.id, deoverlapped));
    }

    items.sort_by_key(|item| item.video_id);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextPaths;
    use crate::index::writer::{write_iset_file, IsetFileSpec};
    use std::collections::BTreeSet;

    struct FakeCaptions {
        cost: f64,
        hits: Vec<(u32, Vec<(f64, f64)>)>,
        names: std::collections::HashMap<u32, String>,
    }

    impl CaptionIndex for FakeCaptions {
        fn document_video_name(&self, document_id: u32) -> Option<String> {
            self.names.get(&document_id).cloned()
        }
        fn search(&self, _phrase: &str, _document_ids: Option<&[u32]>) -> Result<Vec<(u32, Vec<(f64, f64)>)>> {
            Ok(self.hits.clone())
        }
        fn estimate_cost(&self, _phrase: &str) -> Result<f64> {
            Ok(self.cost)
        }
    }

    fn dummy_context() -> DataContext {
        let dir = tempfile::tempdir().unwrap();
        write_iset_file(
            dir.path().join("commercials.iset.bin"),
            IsetFileSpec { entries: vec![] },
        )
        .unwrap();
        std::fs::write(
            dir.path().join("videos.json"),
            r#"[[10000, "CNN_20160101_050000_Show", "Show", "CNN", 3600, 30.0, 1280, 720]]"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("derived").join("face")).unwrap();
        for f in [
            "all.iset.bin",
            "male.iset.bin",
            "female.iset.bin",
            "host.iset.bin",
            "nonhost.iset.bin",
            "male_host.iset.bin",
            "male_nonhost.iset.bin",
            "female_host.iset.bin",
            "female_nonhost.iset.bin",
        ] {
            write_iset_file(dir.path().join("derived").join("face").join(f), IsetFileSpec { entries: vec![] }).unwrap();
        }
        crate::index::writer::write_ilist_file(
            dir.path().join("faces.ilist.bin"),
            crate::index::writer::IlistFileSpec { entries: vec![] },
        )
        .unwrap();
        crate::index::writer::write_ilist_file(
            dir.path().join("derived").join("num_faces.ilist.bin"),
            crate::index::writer::IlistFileSpec { entries: vec![] },
        )
        .unwrap();

        DataContext::load(&ContextPaths {
            data_dir: dir.path().to_path_buf(),
            timezone: chrono_tz::America::New_York,
            min_person_screen_time_ms: 0,
            person_name_filter: None,
        })
        .unwrap()
    }

    #[test]
    fn rejects_expensive_whole_corpus_query() {
        let data = dummy_context();
        let captions = FakeCaptions {
            cost: 0.1,
            hits: vec![],
            names: Default::default(),
        };
        let err = search_transcript(&data, &captions, &SearchContext::default(), "the").unwrap_err();
        assert!(matches!(err, Error::QueryTooExpensive(_)));
    }

    #[test]
    fn skips_cost_gate_when_videos_restricted() {
        let data = dummy_context();
        let captions = FakeCaptions {
            cost: 0.9,
            hits: vec![(1, vec![(1.0, 2.0)])],
            names: std::collections::HashMap::from([(1, "CNN_20160101_050000_Show".to_string())]),
        };
        let mut ctx = SearchContext::default();
        ctx.videos = Some(BTreeSet::from([10000]));
        let items = search_transcript(&data, &captions, &ctx, "the").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].video_id, 10000);
        assert_eq!(items[0].intervals, vec![(1000, 2000)]);
    }
}
