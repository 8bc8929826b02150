//! End-to-end coverage: build a small on-disk data directory with the
//! production writer API, load it, and run whole query trees through
//! the planner and accumulator.

use std::path::Path;

use telecast_engine::accumulate::{self, AggregateBy, IsCommercial};
use telecast_engine::context::{ContextPaths, DataContext};
use telecast_engine::error::Result;
use telecast_engine::index::writer::{IntervalListMappingWriter, IntervalSetMappingWriter};
use telecast_engine::query::{eval, parse_query, to_lazy_iset, EvalEnv};
use telecast_engine::result::LazyItem;
use telecast_engine::search::SearchContext;
use telecast_engine::transcript::CaptionIndex;

struct NoCaptions;

impl CaptionIndex for NoCaptions {
    fn document_video_name(&self, _document_id: u32) -> Option<String> {
        None
    }

    fn search(&self, _phrase: &str, _document_ids: Option<&[u32]>) -> Result<Vec<(u32, Vec<(f64, f64)>)>> {
        Ok(Vec::new())
    }

    fn estimate_cost(&self, _phrase: &str) -> Result<f64> {
        Ok(0.0)
    }
}

fn empty_iset(path: impl AsRef<Path>) {
    IntervalSetMappingWriter::create(path.as_ref(), false).finish().unwrap();
}

fn empty_ilist(path: impl AsRef<Path>) {
    IntervalListMappingWriter::create(path.as_ref(), false).finish().unwrap();
}

/// Two CNN videos and one FOXNEWS video, a week apart, with a commercial
/// break carved out of the middle of the first CNN video.
fn build_data_dir(dir: &Path) -> DataContext {
    std::fs::write(
        dir.join("videos.json"),
        r#"[[1, "CNN_20160104_050000_Morning", "Morning", "CNN", 36000, 30.0, 1280, 720],
            [2, "CNN_20160111_050000_Morning", "Morning", "CNN", 36000, 30.0, 1280, 720],
            [3, "FOXNEWS_20160104_150000_Afternoon", "Afternoon", "FOXNEWS", 36000, 30.0, 1280, 720]]"#,
    )
    .unwrap();

    let mut commercials = IntervalSetMappingWriter::create(dir.join("commercials.iset.bin"), false);
    commercials.write(1, &[(600_000, 660_000)]);
    commercials.finish().unwrap();

    let face_dir = dir.join("derived").join("face");
    std::fs::create_dir_all(&face_dir).unwrap();
    for name in [
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
        empty_iset(face_dir.join(name));
    }
    empty_ilist(dir.join("faces.ilist.bin"));
    empty_ilist(dir.join("derived").join("num_faces.ilist.bin"));

    DataContext::load(&ContextPaths {
        data_dir: dir.to_path_buf(),
        timezone: chrono_tz::America::New_York,
        min_person_screen_time_ms: 0,
        person_name_filter: None,
    })
    .unwrap()
}

fn run_query(json: &str, ctx: &SearchContext, data: &DataContext) -> Vec<LazyItem> {
    let value: serde_json::Value = serde_json::from_str(json).unwrap();
    let node = parse_query(&value).unwrap();
    let env = EvalEnv { data, captions: &NoCaptions };
    match eval(&node, ctx, &env).unwrap() {
        Some(result) => to_lazy_iset(&result, data),
        None => Vec::new(),
    }
}

#[test]
fn channel_filter_selects_both_cnn_videos() {
    let dir = tempfile::tempdir().unwrap();
    let data = build_data_dir(dir.path());

    let items = run_query(r#"["channel", "CNN"]"#, &SearchContext::default(), &data);
    let mut ids: Vec<u32> = items.iter().map(|i| i.video_id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn and_of_channel_and_day_of_week_narrows_to_one() {
    let dir = tempfile::tempdir().unwrap();
    let data = build_data_dir(dir.path());

    // 2016-01-04 was a Monday; 2016-01-11 was the following Monday too,
    // so narrow with an hour filter that only the first video's start hour
    // satisfies isn't distinguishing — use an explicit video id set instead.
    let items = run_query(r#"["and", [["channel", "CNN"], ["video", [1]]]]"#, &SearchContext::default(), &data);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].video_id, 1);
}

#[test]
fn or_across_channels_matches_all_three_videos() {
    let dir = tempfile::tempdir().unwrap();
    let data = build_data_dir(dir.path());

    let items = run_query(r#"["or", [["channel", "CNN"], ["channel", "FOXNEWS"]]]"#, &SearchContext::default(), &data);
    assert_eq!(items.len(), 3);
}

#[test]
fn accumulate_buckets_by_week_and_excludes_commercials() {
    let dir = tempfile::tempdir().unwrap();
    let data = build_data_dir(dir.path());

    let items = run_query(r#"["channel", "CNN"]"#, &SearchContext::default(), &data);
    let acc = accumulate::accumulate(&items, &data, AggregateBy::Week, IsCommercial::Exclude, false);
    let buckets = acc.simple_buckets().unwrap();

    // Both videos are 1200s long; the first has a 60s commercial carved out.
    assert_eq!(buckets.len(), 2);
    let total: f64 = buckets.values().sum();
    assert!((total - (1200.0 - 60.0 + 1200.0)).abs() < 1e-6);
}

#[test]
fn accumulate_both_includes_full_duration_regardless_of_commercials() {
    let dir = tempfile::tempdir().unwrap();
    let data = build_data_dir(dir.path());

    let items = run_query(r#"["video", [1]]"#, &SearchContext::default(), &data);
    let acc = accumulate::accumulate(&items, &data, AggregateBy::Day, IsCommercial::Both, false);
    let buckets = acc.simple_buckets().unwrap();
    assert_eq!(*buckets.values().next().unwrap(), 1200.0);
}

#[test]
fn search_videos_returns_per_video_intervals_minus_commercials() {
    let dir = tempfile::tempdir().unwrap();
    let data = build_data_dir(dir.path());

    let items = run_query(r#"["video", [1]]"#, &SearchContext::default(), &data);
    let entries = accumulate::search_videos(&items, &data, IsCommercial::Exclude);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].video_id, 1);
    // The whole-video interval [0, 1200s) minus the [600s, 660s) commercial
    // splits into two intervals.
    assert_eq!(entries[0].intervals_sec, vec![(0.0, 600.0), (660.0, 1200.0)]);
}

#[test]
fn contradictory_and_yields_no_results() {
    let dir = tempfile::tempdir().unwrap();
    let data = build_data_dir(dir.path());

    let items = run_query(r#"["and", [["channel", "CNN"], ["channel", "FOXNEWS"]]]"#, &SearchContext::default(), &data);
    assert!(items.is_empty());
}
