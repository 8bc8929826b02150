//! Pairwise AND/OR combine rules across the 3×3 `SearchResult` matrix
//! (§4.F), canonicalised by the preference order `VideoSet ≺ LazyISet ≺
//! RustISet` so each table need only state the six cases where `r1`'s
//! rank is no greater than `r2`'s.

use std::sync::Arc;

use crate::context::DataContext;
use crate::index::{ISetIntersection, IsetReader};
use crate::interval;
use crate::result::LazyItem;
use crate::search::{and_search_contexts, get_video_filter};

use super::resultset::{to_lazy_iset, SearchResult};

/// Interval-merge fuzz used when deoverlapping two sides of an OR/AND
/// merge at the `LazyISet` level; matches the runtime default (§4.A).
const MERGE_FUZZ_MS: u32 = 100;

fn canonicalize(r1: SearchResult, r2: SearchResult) -> (SearchResult, SearchResult) {
    if r1.rank() <= r2.rank() {
        (r1, r2)
    } else {
        (r2, r1)
    }
}

fn resolve_intervals(item: &LazyItem, data: &DataContext) -> Vec<(u32, u32)> {
    if item.is_entire_video {
        match data.videos.get(item.video_id) {
            Some(video) => vec![video.entire_interval_ms()],
            None => Vec::new(),
        }
    } else {
        item.intervals.clone()
    }
}

pub fn combine_and(r1: SearchResult, r2: SearchResult, data: &DataContext) -> Option<SearchResult> {
    let (r1, r2) = canonicalize(r1, r2);
    match (r1, r2) {
        (SearchResult::VideoSet(c1), SearchResult::VideoSet(c2)) => {
            and_search_contexts(&c1, &c2).map(SearchResult::VideoSet)
        }
        (SearchResult::VideoSet(c1), SearchResult::LazyISet(items)) => {
            let filter = get_video_filter(&c1);
            let filtered: Vec<LazyItem> = items
                .into_iter()
                .filter(|item| {
                    filter
                        .as_ref()
                        .is_none_or(|f| data.videos.get(item.video_id).is_some_and(|v| f(v)))
                })
                .collect();
            Some(SearchResult::LazyISet(filtered))
        }
        (SearchResult::VideoSet(c1), SearchResult::RustISet { iset, ctx: c2 }) => {
            and_search_contexts(&c1, &c2).map(|ctx| SearchResult::RustISet { iset, ctx })
        }
        (SearchResult::LazyISet(a), SearchResult::LazyISet(b)) => {
            Some(SearchResult::LazyISet(merge_and_lazy(a, b, data)))
        }
        (SearchResult::LazyISet(items), SearchResult::RustISet { iset, ctx }) => {
            let filter = get_video_filter(&ctx);
            let mut out = Vec::new();
            for item in items {
                if !iset.has_id(item.video_id) {
                    continue;
                }
                if let Some(f) = &filter {
                    match data.videos.get(item.video_id) {
                        Some(v) if f(v) => {}
                        _ => continue,
                    }
                }
                let lhs = resolve_intervals(&item, data);
                let rhs = iset.get_intervals(item.video_id, true);
                let merged = interval::intersect(&lhs, &rhs);
                if !merged.is_empty() {
                    out.push(LazyItem::partial(item.video_id, merged));
                }
            }
            Some(SearchResult::LazyISet(out))
        }
        (SearchResult::RustISet { iset: i1, ctx: c1 }, SearchResult::RustISet { iset: i2, ctx: c2 }) => {
            and_search_contexts(&c1, &c2).map(|ctx| SearchResult::RustISet {
                iset: Arc::new(ISetIntersection::new(vec![i1, i2])) as Arc<dyn IsetReader>,
                ctx,
            })
        }
        _ => unreachable!("canonicalize() orders every pair into one of the six cases above"),
    }
}

pub fn combine_or(r1: SearchResult, r2: SearchResult, data: &DataContext) -> SearchResult {
    let (r1, r2) = canonicalize(r1, r2);
    match (r1, r2) {
        (SearchResult::VideoSet(c1), SearchResult::VideoSet(c2)) => {
            let (f1, f2) = (get_video_filter(&c1), get_video_filter(&c2));
            let items = data
                .videos
                .iter()
                .filter(|v| f1.as_ref().is_none_or(|f| f(v)) || f2.as_ref().is_none_or(|f| f(v)))
                .map(|v| LazyItem::whole(v.id))
                .collect();
            SearchResult::LazyISet(items)
        }
        (SearchResult::VideoSet(c1), SearchResult::LazyISet(items)) => {
            let filter = get_video_filter(&c1);
            let by_id: std::collections::BTreeMap<u32, LazyItem> =
                items.into_iter().map(|i| (i.video_id, i)).collect();
            let out = data
                .videos
                .iter()
                .filter_map(|v| {
                    if filter.as_ref().is_none_or(|f| f(v)) {
                        Some(LazyItem::whole(v.id))
                    } else {
                        by_id.get(&v.id).cloned()
                    }
                })
                .collect();
            SearchResult::LazyISet(out)
        }
        (SearchResult::VideoSet(c1), SearchResult::RustISet { iset, ctx: c2 }) => {
            let filter1 = get_video_filter(&c1);
            let filter2 = get_video_filter(&c2);
            let out = data
                .videos
                .iter()
                .filter_map(|v| {
                    if filter1.as_ref().is_none_or(|f| f(v)) {
                        Some(LazyItem::whole(v.id))
                    } else if iset.has_id(v.id) && filter2.as_ref().is_none_or(|f| f(v)) {
                        Some(LazyItem::partial(v.id, iset.get_intervals(v.id, true)))
                    } else {
                        None
                    }
                })
                .collect();
            SearchResult::LazyISet(out)
        }
        (SearchResult::LazyISet(a), SearchResult::LazyISet(b)) => SearchResult::LazyISet(merge_or_lazy(a, b)),
        (SearchResult::LazyISet(items), rust @ SearchResult::RustISet { .. }) => {
            let concretized = to_lazy_iset(&rust, data);
            SearchResult::LazyISet(merge_or_lazy(items, concretized))
        }
        (r1 @ SearchResult::RustISet { .. }, r2 @ SearchResult::RustISet { .. }) => {
            let a = to_lazy_iset(&r1, data);
            let b = to_lazy_iset(&r2, data);
            SearchResult::LazyISet(merge_or_lazy(a, b))
        }
        _ => unreachable!("canonicalize() orders every pair into one of the six cases above"),
    }
}

/// Sorted-by-`video_id` intersection merge: ids absent from either side
/// drop out; shared ids keep the other side's intervals when one side is
/// whole, else the plain interval intersection.
fn merge_and_lazy(a: Vec<LazyItem>, b: Vec<LazyItem>, data: &DataContext) -> Vec<LazyItem> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].video_id.cmp(&b[j].video_id) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                let merged = match (a[i].is_entire_video, b[j].is_entire_video) {
                    (true, true) => LazyItem::whole(a[i].video_id),
                    (true, false) => LazyItem::partial(a[i].video_id, b[j].intervals.clone()),
                    (false, true) => LazyItem::partial(a[i].video_id, a[i].intervals.clone()),
                    (false, false) => {
                        let merged = interval::intersect(&a[i].intervals, &b[j].intervals);
                        LazyItem::partial(a[i].video_id, merged)
                    }
                };
                if !(merged.intervals.is_empty() && !merged.is_entire_video) {
                    out.push(merged);
                }
                i += 1;
                j += 1;
            }
        }
    }
    let _ = data;
    out
}

/// Sorted-by-`video_id` union merge: ids unique to either side pass
/// through unchanged; shared ids favour `whole`, else union + deoverlap.
fn merge_or_lazy(a: Vec<LazyItem>, b: Vec<LazyItem>) -> Vec<LazyItem> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].video_id.cmp(&b[j].video_id) {
            std::cmp::Ordering::Less => {
                out.push(a[i].clone());
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j].clone());
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                let merged = if a[i].is_entire_video || b[j].is_entire_video {
                    LazyItem::whole(a[i].video_id)
                } else {
                    let mut both: Vec<(u32, u32)> =
                        a[i].intervals.iter().chain(b[j].intervals.iter()).copied().collect();
                    both.sort_unstable_by_key(|&(s, _)| s);
                    LazyItem::partial(a[i].video_id, interval::deoverlap(both, MERGE_FUZZ_MS))
                };
                out.push(merged);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
