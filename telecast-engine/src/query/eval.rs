//! The recursive evaluator (§4.F): `eval(node, context) -> SearchResult?`,
//! with AND's hoist-then-evaluate and OR's gather-then-fold passes.

use std::sync::Arc;

use crate::context::DataContext;
use crate::error::{Error, Result};
use crate::index::IListToISet;
use crate::result::LazyItem;
use crate::search::{and_search_contexts, get_video_filter, SearchContext};
use crate::transcript::{self, CaptionIndex};

use super::ast::QueryNode;
use super::combine::{combine_and, combine_or};
use super::facetag::resolve_face_tag;
use super::resultset::SearchResult;

/// Fuzz used for both `face_count` and `face_tag` projections off their
/// backing ilists, matching `get_face_tag_intervals`'s `3000`.
const ATOM_PROJECTION_FUZZ_MS: u32 = 3000;

pub struct EvalEnv<'a> {
    pub data: &'a DataContext,
    pub captions: &'a dyn CaptionIndex,
}

fn is_metadata_kind(node: &QueryNode) -> bool {
    matches!(
        node,
        QueryNode::Video(_)
            | QueryNode::Channel(_)
            | QueryNode::Show(_)
            | QueryNode::Hour(_)
            | QueryNode::DayOfWeek(_)
            | QueryNode::TextWindow(_)
    )
}

fn constraint_context(node: &QueryNode) -> SearchContext {
    let mut c = SearchContext::default();
    match node {
        QueryNode::Video(ids) => c.videos = Some(ids.clone()),
        QueryNode::Channel(s) => c.channel = Some(s.clone()),
        QueryNode::Show(s) => c.show = Some(s.clone()),
        QueryNode::Hour(set) => c.hours = Some(set.clone()),
        QueryNode::DayOfWeek(set) => c.days_of_week = Some(set.clone()),
        QueryNode::TextWindow(w) => c.text_window = *w,
        _ => {}
    }
    c
}

/// `SEARCH_KEY_EXEC_PRIORITY`: lower runs first. `face_count` shares
/// `face_name`'s tier — both are a single cheap RustISet projection.
fn exec_priority(node: &QueryNode) -> u8 {
    match node {
        QueryNode::Video(_)
        | QueryNode::Channel(_)
        | QueryNode::Show(_)
        | QueryNode::Hour(_)
        | QueryNode::DayOfWeek(_)
        | QueryNode::TextWindow(_)
        | QueryNode::All => 0,
        QueryNode::Or(_) => 1,
        QueryNode::And(_) => 2,
        QueryNode::Text(_) => 3,
        QueryNode::FaceName(_) | QueryNode::FaceCount(_) => 4,
        QueryNode::FaceTag(_) => 5,
    }
}

pub fn eval(node: &QueryNode, ctx: &SearchContext, env: &EvalEnv) -> Result<Option<SearchResult>> {
    match node {
        QueryNode::All => Ok(Some(SearchResult::VideoSet(ctx.clone()))),
        QueryNode::And(children) => eval_and(children, ctx, env),
        QueryNode::Or(children) => eval_or(children, ctx, env),
        QueryNode::Video(_)
        | QueryNode::Channel(_)
        | QueryNode::Show(_)
        | QueryNode::Hour(_)
        | QueryNode::DayOfWeek(_)
        | QueryNode::TextWindow(_) => {
            Ok(and_search_contexts(ctx, &constraint_context(node)).map(SearchResult::VideoSet))
        }
        QueryNode::FaceCount(n) => {
            if *n == 0 {
                return Err(Error::InvalidUsage("face_count must be in 1..255".into()));
            }
            let iset = Arc::new(IListToISet::new(
                env.data.face.num_faces_ilist.clone(),
                0xFF,
                *n,
                ATOM_PROJECTION_FUZZ_MS,
                0,
            ));
            Ok(Some(SearchResult::RustISet { iset, ctx: ctx.clone() }))
        }
        QueryNode::FaceName(name) => {
            let person = env.data.person(name).ok_or_else(|| Error::PersonNotInDatabase(name.clone()))?;
            Ok(Some(SearchResult::RustISet {
                iset: person.iset.clone(),
                ctx: ctx.clone(),
            }))
        }
        QueryNode::FaceTag(raw) => {
            let iset = resolve_face_tag(raw, env.data)?;
            Ok(Some(SearchResult::RustISet { iset, ctx: ctx.clone() }))
        }
        QueryNode::Text(phrase) => {
            let items = transcript::search_transcript(env.data, env.captions, ctx, phrase)?;
            Ok(Some(SearchResult::LazyISet(items)))
        }
    }
}

fn eval_and(children: &[QueryNode], ctx: &SearchContext, env: &EvalEnv) -> Result<Option<SearchResult>> {
    let mut hoisted = ctx.clone();
    let mut deferred: Vec<&QueryNode> = Vec::new();
    for child in children {
        if is_metadata_kind(child) {
            match and_search_contexts(&hoisted, &constraint_context(child)) {
                Some(merged) => hoisted = merged,
                None => return Ok(None),
            }
        } else {
            deferred.push(child);
        }
    }

    deferred.sort_by_key(|n| exec_priority(n));

    let mut acc: Option<SearchResult> = None;
    for child in deferred {
        let Some(result) = eval(child, &hoisted, env)? else {
            return Ok(None);
        };
        acc = Some(match acc {
            None => result,
            Some(prev) => match combine_and(prev, result, env.data) {
                Some(combined) => combined,
                None => return Ok(None),
            },
        });
    }

    Ok(Some(acc.unwrap_or(SearchResult::VideoSet(hoisted))))
}

fn eval_or(children: &[QueryNode], ctx: &SearchContext, env: &EvalEnv) -> Result<Option<SearchResult>> {
    let mut metadata_ctxs: Vec<SearchContext> = Vec::new();
    let mut deferred: Vec<&QueryNode> = Vec::new();

    for child in children {
        match child {
            QueryNode::TextWindow(_) => continue,
            QueryNode::All => metadata_ctxs.push(ctx.clone()),
            QueryNode::Video(_) | QueryNode::Channel(_) | QueryNode::Show(_) | QueryNode::Hour(_) | QueryNode::DayOfWeek(_) => {
                if let Some(merged) = and_search_contexts(ctx, &constraint_context(child)) {
                    metadata_ctxs.push(merged);
                }
            }
            _ => deferred.push(child),
        }
    }

    for mctx in &metadata_ctxs {
        if get_video_filter(mctx).is_none() {
            return Ok(Some(SearchResult::VideoSet(mctx.clone())));
        }
    }

    let mut acc: Option<SearchResult> = if metadata_ctxs.is_empty() {
        None
    } else {
        let filters: Vec<_> = metadata_ctxs.iter().map(get_video_filter).collect();
        let items: Vec<LazyItem> = env
            .data
            .videos
            .iter()
            .filter(|v| filters.iter().any(|f| f.as_ref().is_none_or(|f| f(v))))
            .map(|v| LazyItem::whole(v.id))
            .collect();
        Some(SearchResult::LazyISet(items))
    };

    deferred.sort_by_key(|n| exec_priority(n));

    for child in deferred {
        let Some(result) = eval(child, ctx, env)? else {
            continue;
        };
        acc = Some(match acc {
            None => result,
            Some(prev) => combine_or(prev, result, env.data),
        });
    }

    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::parse_query;
    use crate::query::resultset::to_lazy_iset;
    use crate::context::ContextPaths;
    use crate::index::writer::{write_iset_file, write_ilist_file, IsetFileSpec, IlistFileSpec};

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

    fn build_context(dir: &std::path::Path) -> DataContext {
        write_iset_file(dir.join("commercials.iset.bin"), IsetFileSpec { entries: vec![] }).unwrap();
        std::fs::write(
            dir.join("videos.json"),
            r#"[[10000, "CNN_20160101_050000_ShowA", "ShowA", "CNN", 36000, 30.0, 1280, 720],
                [10001, "FOXNEWS_20160102_150000_ShowB", "ShowB", "FOXNEWS", 36000, 30.0, 1280, 720]]"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.join("derived").join("face")).unwrap();
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
            write_iset_file(dir.join("derived").join("face").join(f), IsetFileSpec { entries: vec![] }).unwrap();
        }
        write_ilist_file(dir.join("faces.ilist.bin"), IlistFileSpec { entries: vec![] }).unwrap();
        write_ilist_file(dir.join("derived").join("num_faces.ilist.bin"), IlistFileSpec { entries: vec![] }).unwrap();

        DataContext::load(&ContextPaths {
            data_dir: dir.to_path_buf(),
            timezone: chrono_tz::America::New_York,
            min_person_screen_time_ms: 0,
            person_name_filter: None,
        })
        .unwrap()
    }

    #[test]
    fn all_matches_every_video() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_context(dir.path());
        let env = EvalEnv { data: &data, captions: &NoCaptions };
        let query: serde_json::Value = serde_json::from_str(r#"["all", null]"#).unwrap();
        let node = parse_query(&query).unwrap();
        let result = eval(&node, &SearchContext::default(), &env).unwrap().unwrap();
        let items = to_lazy_iset(&result, &data);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.is_entire_video));
    }

    #[test]
    fn and_channel_filters_to_one_video() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_context(dir.path());
        let env = EvalEnv { data: &data, captions: &NoCaptions };
        let query: serde_json::Value = serde_json::from_str(r#"["and", [["all", null], ["channel", "CNN"]]]"#).unwrap();
        let node = parse_query(&query).unwrap();
        let result = eval(&node, &SearchContext::default(), &env).unwrap().unwrap();
        let items = to_lazy_iset(&result, &data);
        assert_eq!(items, vec![LazyItem::whole(10000)]);
    }

    #[test]
    fn or_of_two_channels_matches_both() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_context(dir.path());
        let env = EvalEnv { data: &data, captions: &NoCaptions };
        let query: serde_json::Value =
            serde_json::from_str(r#"["or", [["channel", "CNN"], ["channel", "FOXNEWS"]]]"#).unwrap();
        let node = parse_query(&query).unwrap();
        let result = eval(&node, &SearchContext::default(), &env).unwrap().unwrap();
        let items = to_lazy_iset(&result, &data);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn face_tag_male_and_female_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_context(dir.path());
        let env = EvalEnv { data: &data, captions: &NoCaptions };
        let query: serde_json::Value =
            serde_json::from_str(r#"["face_tag", "male,female"]"#).unwrap();
        let node = parse_query(&query).unwrap();
        assert!(eval(&node, &SearchContext::default(), &env).is_err());
    }

    #[test]
    fn and_contradictory_channels_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_context(dir.path());
        let env = EvalEnv { data: &data, captions: &NoCaptions };
        let query: serde_json::Value =
            serde_json::from_str(r#"["and", [["channel", "CNN"], ["channel", "FOXNEWS"]]]"#).unwrap();
        let node = parse_query(&query).unwrap();
        assert!(eval(&node, &SearchContext::default(), &env).unwrap().is_none());
    }
}
