//! [`SearchResult`] (§3/§4.F): the three representations an atom or
//! subtree can evaluate to, and the step that concretises any of them to
//! a [`LazyItem`] stream.

use std::sync::Arc;

use crate::context::DataContext;
use crate::index::IsetReader;
use crate::result::LazyItem;
use crate::search::{get_video_filter, SearchContext};

#[derive(Debug, Clone)]
pub enum SearchResult {
    /// Every video passing `SearchContext`, whole-video interval.
    VideoSet(SearchContext),
    /// A composed/mmapped ISetMap view plus the context still applying.
    RustISet { iset: Arc<dyn IsetReader>, ctx: SearchContext },
    /// A materialised, `video_id`-sorted stream. The source streams
    /// lazily via a generator; this crate has no generator machinery, so
    /// per §9's non-generator fallback guidance, this is a sorted `Vec`
    /// rather than a boxed iterator — fine since the evaluator consumes
    /// it exactly once regardless of representation.
    LazyISet(Vec<LazyItem>),
}

/// Preference order used to canonicalise a pairwise combine: the
/// "stronger"/more expensive-to-concretise representation sorts last.
impl SearchResult {
    pub fn rank(&self) -> u8 {
        match self {
            SearchResult::VideoSet(_) => 0,
            SearchResult::LazyISet(_) => 1,
            SearchResult::RustISet { .. } => 2,
        }
    }
}

/// Concretise any `SearchResult` variant into a sorted `LazyItem` stream.
pub fn to_lazy_iset(result: &SearchResult, data: &DataContext) -> Vec<LazyItem> {
    match result {
        SearchResult::VideoSet(ctx) => {
            let filter = get_video_filter(ctx);
            data.videos
                .iter()
                .filter(|v| filter.as_ref().is_none_or(|f| f(v)))
                .map(|v| LazyItem::whole(v.id))
                .collect()
        }
        SearchResult::RustISet { iset, ctx } => {
            let filter = get_video_filter(ctx);
            data.videos
                .iter()
                .filter(|v| iset.has_id(v.id) && filter.as_ref().is_none_or(|f| f(v)))
                .map(|v| LazyItem::partial(v.id, iset.get_intervals(v.id, true)))
                .collect()
        }
        SearchResult::LazyISet(items) => items.clone(),
    }
}
