//! Drives the real router through `tower::ServiceExt::oneshot`, the way
//! `axum` apps are conventionally tested, against a synthetic data
//! directory built with the production index-writer API.

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use telecast_config::Config;
use telecast_engine::accumulate::{AggregateBy, IsCommercial};
use telecast_engine::context::{ContextPaths, DataContext};
use telecast_engine::index::writer::{IntervalListMappingWriter, IntervalSetMappingWriter};

use telecast_server::infra::app_state::{AppState, NullCaptionIndex};
use telecast_server::routes::create_router;

fn empty_iset(path: impl AsRef<Path>) {
    IntervalSetMappingWriter::create(path.as_ref(), false).finish().unwrap();
}

fn empty_ilist(path: impl AsRef<Path>) {
    IntervalListMappingWriter::create(path.as_ref(), false).finish().unwrap();
}

fn build_state(dir: &Path) -> AppState {
    std::fs::write(
        dir.join("videos.json"),
        r#"[[1, "CNN_20160104_050000_Morning", "Morning", "CNN", 36000, 30.0, 1280, 720],
            [2, "FOXNEWS_20160104_150000_Afternoon", "Afternoon", "FOXNEWS", 36000, 30.0, 1280, 720]]"#,
    )
    .unwrap();

    empty_iset(dir.join("commercials.iset.bin"));

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

    let data = DataContext::load(&ContextPaths {
        data_dir: dir.to_path_buf(),
        timezone: chrono_tz::America::New_York,
        min_person_screen_time_ms: 0,
        person_name_filter: None,
    })
    .unwrap();

    let config = Config {
        data_dir: dir.to_path_buf(),
        caption_index_dir: None,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        default_aggregate_by: AggregateBy::Day,
        default_is_commercial: IsCommercial::Exclude,
        default_text_window: 0,
        min_person_screen_time_seconds: 0.0,
        tag_limit: 250,
        person_limit: 1 << 20,
        timezone: chrono_tz::America::New_York,
    };

    let captions: Arc<dyn telecast_engine::transcript::CaptionIndex> = Arc::new(NullCaptionIndex);
    AppState {
        data: Arc::new(data),
        captions,
        config: Arc::new(config),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(build_state(dir.path()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn search_all_videos_buckets_by_day() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(build_state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/search?query=%5B%22channel%22%2C%22CNN%22%5D&detailed=false")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let obj = body.as_object().unwrap();
    assert_eq!(obj.len(), 1);
    assert_eq!(obj.values().next().unwrap().as_f64().unwrap(), 1200.0);
}

#[tokio::test]
async fn search_rejects_malformed_query_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(build_state(dir.path()));

    let response = app
        .oneshot(Request::builder().uri("/search?query=not-json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_videos_rejects_too_many_ids() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(build_state(dir.path()));

    let ids: Vec<u32> = (1..=11).collect();
    let ids_json = serde_json::to_string(&ids).unwrap();
    let uri = format!("/search-videos?ids={}", urlencoding_light(&ids_json));

    let response = app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_videos_returns_metadata_and_intervals() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(build_state(dir.path()));

    let uri = format!("/search-videos?ids={}", urlencoding_light("[1]"));
    let response = app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["metadata"]["channel"], "CNN");
    assert_eq!(entries[0]["intervals"], serde_json::json!([[0.0, 1200.0]]));
}

/// Minimal percent-encoding for the characters this test's query strings
/// actually contain; avoids pulling in a dedicated URL-encoding crate for
/// a handful of brackets and quotes.
fn urlencoding_light(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '[' => out.push_str("%5B"),
            ']' => out.push_str("%5D"),
            '"' => out.push_str("%22"),
            ',' => out.push_str("%2C"),
            other => out.push(other),
        }
    }
    out
}
