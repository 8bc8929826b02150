//! HTTP surface for the telecast query engine: route wiring, per-request
//! handlers, and the shared [`infra::app_state::AppState`].
//!
//! Split into a library so integration tests under `tests/` can build the
//! router and drive it with `tower::ServiceExt::oneshot` without spawning a
//! real listener.

pub mod handlers;
pub mod infra;
pub mod routes;
