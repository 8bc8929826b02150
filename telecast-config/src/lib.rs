//! Configuration loading for the telecast query engine and server (§10.3):
//! env var, then optional TOML file, then built-in default, per setting.

mod error;
mod loader;
mod model;

pub use error::{ConfigLoadError, Result};
pub use loader::load;
pub use model::{
    Config, FileConfig, DEFAULT_PERSON_LIMIT, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    DEFAULT_TAG_LIMIT, DEFAULT_TIMEZONE,
};
