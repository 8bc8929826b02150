use std::path::PathBuf;

use serde::Deserialize;
use telecast_engine::accumulate::{AggregateBy, IsCommercial};

use crate::error::{ConfigLoadError, Result};

/// Raw configuration as defined in a TOML file; every field optional so a
/// file only needs to override what it wants to change (§10.3).
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub caption_index_dir: Option<PathBuf>,
    #[serde(default)]
    pub server: FileServerConfig,
    pub default_aggregate_by: Option<String>,
    pub default_is_commercial: Option<String>,
    pub default_text_window: Option<i32>,
    pub min_person_screen_time_seconds: Option<f64>,
    pub tag_limit: Option<usize>,
    pub person_limit: Option<u64>,
    pub timezone: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Resolved, effective configuration (§10.3): every field has a value, each
/// drawn from an env var, then the config file, then a built-in default.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub caption_index_dir: Option<PathBuf>,
    pub server_host: String,
    pub server_port: u16,
    pub default_aggregate_by: AggregateBy,
    pub default_is_commercial: IsCommercial,
    pub default_text_window: i32,
    pub min_person_screen_time_seconds: f64,
    pub tag_limit: usize,
    pub person_limit: u64,
    pub timezone: chrono_tz::Tz,
}

/// `derive_data.py`'s CLI defaults, carried over exactly (§10.3).
pub const DEFAULT_TAG_LIMIT: usize = 250;
pub const DEFAULT_PERSON_LIMIT: u64 = 1 << 20;
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

pub fn parse_aggregate_by(raw: &str) -> Result<AggregateBy> {
    match raw {
        "day" => Ok(AggregateBy::Day),
        "week" => Ok(AggregateBy::Week),
        "month" => Ok(AggregateBy::Month),
        "year" => Ok(AggregateBy::Year),
        other => Err(ConfigLoadError::InvalidValue {
            key: "default_aggregate_by",
            value: other.to_string(),
            reason: "expected one of day, week, month, year".to_string(),
        }),
    }
}

pub fn parse_is_commercial(raw: &str) -> Result<IsCommercial> {
    match raw {
        "true" => Ok(IsCommercial::Include),
        "false" => Ok(IsCommercial::Exclude),
        "both" => Ok(IsCommercial::Both),
        other => Err(ConfigLoadError::InvalidValue {
            key: "default_is_commercial",
            value: other.to_string(),
            reason: "expected one of true, false, both".to_string(),
        }),
    }
}

pub fn parse_timezone(raw: &str) -> Result<chrono_tz::Tz> {
    raw.parse().map_err(|_| ConfigLoadError::InvalidValue {
        key: "timezone",
        value: raw.to_string(),
        reason: "not a recognized IANA timezone name".to_string(),
    })
}
