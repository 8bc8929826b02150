//! Exercises the full env → file → default cascade from outside the
//! crate, the way a binary crate linking against `telecast-config` would.

use std::fs;
use std::io::Write;

use telecast_config::{load, ConfigLoadError};
use telecast_engine::accumulate::{AggregateBy, IsCommercial};

// All scenarios run in one test so env var mutations can't race against
// each other or against the crate's own inline unit tests, which run in a
// separate process.
#[test]
fn full_cascade_resolves_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let toml_path = dir.path().join("telecast.toml");
    let mut f = fs::File::create(&toml_path).unwrap();
    writeln!(f, "data_dir = \"{}\"", dir.path().display()).unwrap();
    writeln!(f, "caption_index_dir = \"{}\"", dir.path().join("captions").display()).unwrap();
    writeln!(f, "default_aggregate_by = \"week\"").unwrap();
    writeln!(f, "default_is_commercial = \"both\"").unwrap();
    writeln!(f, "default_text_window = 30").unwrap();
    writeln!(f, "min_person_screen_time_seconds = 12.5").unwrap();
    writeln!(f, "timezone = \"UTC\"").unwrap();
    writeln!(f, "[server]\nhost = \"127.0.0.1\"\nport = 9100").unwrap();
    drop(f);

    // SAFETY: single test function, no concurrent env mutation in this process.
    unsafe {
        std::env::remove_var("TELECAST_DATA_DIR");
        std::env::remove_var("TELECAST_SERVER_PORT");
        std::env::remove_var("TELECAST_SERVER_HOST");
    }

    let config = load(Some(&toml_path)).unwrap();
    assert_eq!(config.data_dir, dir.path());
    assert_eq!(config.caption_index_dir, Some(dir.path().join("captions")));
    assert_eq!(config.server_host, "127.0.0.1");
    assert_eq!(config.server_port, 9100);
    assert_eq!(config.default_aggregate_by, AggregateBy::Week);
    assert_eq!(config.default_is_commercial, IsCommercial::Both);
    assert_eq!(config.default_text_window, 30);
    assert!((config.min_person_screen_time_seconds - 12.5).abs() < 1e-9);
    assert_eq!(config.timezone, chrono_tz::UTC);

    // An env var overrides the same key from the file.
    unsafe {
        std::env::set_var("TELECAST_SERVER_PORT", "7000");
    }
    let overridden = load(Some(&toml_path)).unwrap();
    assert_eq!(overridden.server_port, 7000);
    unsafe {
        std::env::remove_var("TELECAST_SERVER_PORT");
    }

    // An unrecognized enum value from the file is rejected, not silently
    // defaulted.
    let bad_path = dir.path().join("bad.toml");
    let mut bad = fs::File::create(&bad_path).unwrap();
    writeln!(bad, "data_dir = \"{}\"", dir.path().display()).unwrap();
    writeln!(bad, "default_is_commercial = \"sometimes\"").unwrap();
    drop(bad);
    let err = load(Some(&bad_path)).unwrap_err();
    assert!(matches!(err, ConfigLoadError::InvalidValue { key: "default_is_commercial", .. }));
}
