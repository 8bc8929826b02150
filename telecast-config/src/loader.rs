use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigLoadError, Result};
use crate::model::{
    parse_aggregate_by, parse_is_commercial, parse_timezone, Config, FileConfig,
    DEFAULT_PERSON_LIMIT, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, DEFAULT_TAG_LIMIT,
    DEFAULT_TIMEZONE,
};

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn find_default_file() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &["telecast.toml", "config/telecast.toml"];
    CANDIDATES
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(|path| path.to_path_buf())
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => env_var("TELECAST_CONFIG_PATH")
            .map(PathBuf::from)
            .or_else(find_default_file),
    };

    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::FileIo {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Toml { path, source })
}

/// Resolves the effective configuration: env var, then config file, then
/// built-in default (§10.3), mirroring `ferrex-config`'s env-first-then-file
/// cascade for the database URL.
pub fn load(explicit_config_path: Option<&Path>) -> Result<Config> {
    let _ = dotenvy::dotenv();

    let file = load_file_config(explicit_config_path)?;

    let data_dir = env_var("TELECAST_DATA_DIR")
        .map(PathBuf::from)
        .or_else(|| file.data_dir.clone())
        .ok_or(ConfigLoadError::Missing("data_dir"))?;

    let caption_index_dir = env_var("TELECAST_CAPTION_INDEX_DIR")
        .map(PathBuf::from)
        .or_else(|| file.caption_index_dir.clone());

    let server_host = env_var("TELECAST_SERVER_HOST")
        .or_else(|| file.server.host.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string());

    let server_port = match env_var("TELECAST_SERVER_PORT") {
        Some(raw) => raw.parse().map_err(|_| ConfigLoadError::InvalidValue {
            key: "server_port",
            value: raw,
            reason: "not a valid port number".to_string(),
        })?,
        None => file.server.port.unwrap_or(DEFAULT_SERVER_PORT),
    };

    let default_aggregate_by = match env_var("TELECAST_DEFAULT_AGGREGATE_BY") {
        Some(raw) => parse_aggregate_by(&raw)?,
        None => match &file.default_aggregate_by {
            Some(raw) => parse_aggregate_by(raw)?,
            None => telecast_engine::accumulate::AggregateBy::Day,
        },
    };

    let default_is_commercial = match env_var("TELECAST_DEFAULT_IS_COMMERCIAL") {
        Some(raw) => parse_is_commercial(&raw)?,
        None => match &file.default_is_commercial {
            Some(raw) => parse_is_commercial(raw)?,
            None => telecast_engine::accumulate::IsCommercial::default(),
        },
    };

    let default_text_window = match env_var("TELECAST_DEFAULT_TEXT_WINDOW") {
        Some(raw) => raw.parse().map_err(|_| ConfigLoadError::InvalidValue {
            key: "default_text_window",
            value: raw,
            reason: "not an integer".to_string(),
        })?,
        None => file.default_text_window.unwrap_or(0),
    };

    let min_person_screen_time_seconds = match env_var("TELECAST_MIN_PERSON_SCREEN_TIME_SECONDS") {
        Some(raw) => raw.parse().map_err(|_| ConfigLoadError::InvalidValue {
            key: "min_person_screen_time_seconds",
            value: raw,
            reason: "not a float".to_string(),
        })?,
        None => file.min_person_screen_time_seconds.unwrap_or(0.0),
    };

    let tag_limit = match env_var("TELECAST_TAG_LIMIT") {
        Some(raw) => raw.parse().map_err(|_| ConfigLoadError::InvalidValue {
            key: "tag_limit",
            value: raw,
            reason: "not an integer".to_string(),
        })?,
        None => file.tag_limit.unwrap_or(DEFAULT_TAG_LIMIT),
    };

    let person_limit = match env_var("TELECAST_PERSON_LIMIT") {
        Some(raw) => raw.parse().map_err(|_| ConfigLoadError::InvalidValue {
            key: "person_limit",
            value: raw,
            reason: "not an integer".to_string(),
        })?,
        None => file.person_limit.unwrap_or(DEFAULT_PERSON_LIMIT),
    };

    let timezone = match env_var("TELECAST_TIMEZONE") {
        Some(raw) => parse_timezone(&raw)?,
        None => match &file.timezone {
            Some(raw) => parse_timezone(raw)?,
            None => parse_timezone(DEFAULT_TIMEZONE).expect("default timezone is valid"),
        },
    };

    tracing::info!(data_dir = %data_dir.display(), server_host, server_port, "configuration resolved");

    Ok(Config {
        data_dir,
        caption_index_dir,
        server_host,
        server_port,
        default_aggregate_by,
        default_is_commercial,
        default_text_window,
        min_person_screen_time_seconds,
        tag_limit,
        person_limit,
        timezone,
    })
}
