//! The record type streamed by a `LazyISet` (§3): one entry per matching
//! video, strictly increasing in `video_id`.

use crate::interval::Interval;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazyItem {
    pub video_id: u32,
    /// True when the whole video matched (no sub-interval constraint);
    /// `intervals` is then meaningless and the caller substitutes
    /// `video.entire_interval_ms()`.
    pub is_entire_video: bool,
    pub intervals: Vec<Interval>,
}

impl LazyItem {
    pub fn whole(video_id: u32) -> Self {
        Self {
            video_id,
            is_entire_video: true,
            intervals: Vec::new(),
        }
    }

    pub fn partial(video_id: u32, intervals: Vec<Interval>) -> Self {
        Self {
            video_id,
            is_entire_video: false,
            intervals,
        }
    }
}
