//! Query planner and interval-algebra execution engine for TV-news video
//! analytics: recursive evaluation of `and`/`or` trees over mmapped
//! per-video interval indices, bucketed by date.

pub mod accumulate;
pub mod context;
pub mod derive;
pub mod error;
pub mod index;
pub mod interval;
pub mod parsing;
pub mod person;
pub mod query;
pub mod result;
pub mod search;
pub mod tag;
pub mod transcript;
pub mod video;

pub use error::{Error, Result};
