use std::fmt;
use std::sync::Arc;

use telecast_config::Config;
use telecast_engine::context::DataContext;
use telecast_engine::transcript::CaptionIndex;

/// Placeholder wired in when no caption index directory is configured
/// (§4.E: the caption index is an external black box, out of scope here).
/// Every text search against it legitimately matches nothing.
#[derive(Debug, Default)]
pub struct NullCaptionIndex;

impl CaptionIndex for NullCaptionIndex {
    fn document_video_name(&self, _document_id: u32) -> Option<String> {
        None
    }

    fn search(
        &self,
        _phrase: &str,
        _document_ids: Option<&[u32]>,
    ) -> telecast_engine::Result<Vec<(u32, Vec<(f64, f64)>)>> {
        Ok(Vec::new())
    }

    fn estimate_cost(&self, _phrase: &str) -> telecast_engine::Result<f64> {
        Ok(0.0)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub data: Arc<DataContext>,
    pub captions: Arc<dyn CaptionIndex>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
