use std::collections::BTreeSet;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use telecast_engine::accumulate::{self, MAX_VIDEO_SEARCH_IDS};
use telecast_engine::parsing::format_date;
use telecast_engine::query::{eval, parse_query, to_lazy_iset, EvalEnv};
use telecast_engine::search::SearchContext;

use super::search::parse_is_commercial;
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct SearchVideosParams {
    pub ids: String,
    pub query: Option<String>,
    pub is_commercial: Option<String>,
}

fn video_metadata_json(video: &telecast_engine::video::Video) -> Value {
    json!({
        "id": video.id,
        "name": video.name,
        "channel": video.channel,
        "show": video.show,
        "date": format_date(video.date),
        "width": video.width,
        "height": video.height,
        "fps": video.fps,
        "num_frames": video.num_frames,
    })
}

pub async fn search_videos_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchVideosParams>,
) -> AppResult<Json<Value>> {
    let ids: BTreeSet<u32> =
        serde_json::from_str(&params.ids).map_err(|_| AppError::bad_request("ids must be a JSON array of video ids"))?;
    if ids.is_empty() {
        return Err(AppError::bad_request("must specify video ids"));
    }
    if ids.len() > MAX_VIDEO_SEARCH_IDS {
        return Err(AppError::bad_request("too many video ids specified"));
    }

    let query_node = match &params.query {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw)?;
            parse_query(&value)?
        }
        None => parse_query(&json!(["all", null]))?,
    };

    let is_commercial =
        parse_is_commercial(params.is_commercial.as_deref(), state.config.default_is_commercial)?;

    let ctx = SearchContext {
        videos: Some(ids.clone()),
        text_window: state.config.default_text_window,
        ..SearchContext::default()
    };

    let env = EvalEnv {
        data: &state.data,
        captions: state.captions.as_ref(),
    };

    let result = eval(&query_node, &ctx, &env)?;
    let entries = match result {
        Some(result) => {
            let items = to_lazy_iset(&result, &state.data);
            accumulate::search_videos(&items, &state.data, is_commercial)
        }
        None => Vec::new(),
    };

    let mut body = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(video) = state.data.videos.get(entry.video_id) else {
            continue;
        };
        body.push(json!({
            "metadata": video_metadata_json(video),
            "intervals": entry.intervals_sec,
        }));
    }

    Ok(Json(Value::Array(body)))
}
