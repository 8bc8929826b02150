use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use telecast_engine::accumulate::{self, AggregateBy, DateAccumulator, IsCommercial};
use telecast_engine::parsing::{format_date, parse_date};
use telecast_engine::query::{eval, parse_query, to_lazy_iset, EvalEnv};
use telecast_engine::search::SearchContext;

use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub aggregate: Option<String>,
    pub detailed: Option<bool>,
    pub is_commercial: Option<String>,
}

fn parse_aggregate(raw: Option<&str>, default: AggregateBy) -> AppResult<AggregateBy> {
    match raw {
        None => Ok(default),
        Some("day") => Ok(AggregateBy::Day),
        Some("week") => Ok(AggregateBy::Week),
        Some("month") => Ok(AggregateBy::Month),
        Some("year") => Ok(AggregateBy::Year),
        Some(other) => Err(AppError::bad_request(format!("unknown aggregate {other:?}"))),
    }
}

pub(crate) fn parse_is_commercial(raw: Option<&str>, default: IsCommercial) -> AppResult<IsCommercial> {
    match raw {
        None => Ok(default),
        Some("true") => Ok(IsCommercial::Include),
        Some("false") => Ok(IsCommercial::Exclude),
        Some("both") => Ok(IsCommercial::Both),
        Some(other) => Err(AppError::bad_request(format!("unknown is_commercial {other:?}"))),
    }
}

fn accumulator_to_json(acc: &DateAccumulator) -> Value {
    match acc {
        DateAccumulator::Detailed(buckets) => {
            let mut out = serde_json::Map::new();
            for (date, entries) in buckets {
                let entries: Vec<Value> = entries
                    .iter()
                    .map(|(video_id, seconds)| json!([video_id, seconds]))
                    .collect();
                out.insert(format_date(*date), Value::Array(entries));
            }
            Value::Object(out)
        }
        DateAccumulator::Simple(buckets) => {
            let mut out = serde_json::Map::new();
            for (date, seconds) in buckets {
                out.insert(format_date(*date), json!(seconds));
            }
            Value::Object(out)
        }
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Value>> {
    let query_node = match &params.query {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw)?;
            parse_query(&value)?
        }
        None => parse_query(&json!(["all", null]))?,
    };

    let start_date = params.start_date.as_deref().map(parse_date).transpose()?;
    let end_date = params.end_date.as_deref().map(parse_date).transpose()?;
    let aggregate_by = parse_aggregate(params.aggregate.as_deref(), state.config.default_aggregate_by)?;
    let is_commercial =
        self::parse_is_commercial(params.is_commercial.as_deref(), state.config.default_is_commercial)?;
    let detailed = params.detailed.unwrap_or(true);

    let ctx = SearchContext {
        start_date,
        end_date,
        text_window: state.config.default_text_window,
        ..SearchContext::default()
    };

    let env = EvalEnv {
        data: &state.data,
        captions: state.captions.as_ref(),
    };

    let result = eval(&query_node, &ctx, &env)?;
    let body = match result {
        Some(result) => {
            let items = to_lazy_iset(&result, &state.data);
            let acc = accumulate::accumulate(&items, &state.data, aggregate_by, is_commercial, detailed);
            accumulator_to_json(&acc)
        }
        None => Value::Object(serde_json::Map::new()),
    };

    Ok(Json(body))
}
