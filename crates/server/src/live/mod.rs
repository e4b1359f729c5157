// crates/server/src/live/mod.rs
//! Live job progress over websockets.
//!
//! Each connection gets a snapshot of the persisted job and then every
//! payload published on the job's progress channel, unmodified and in publish
//! order. There is no replay: a reconnecting client starts from a fresh
//! snapshot.

pub mod bridge;

pub use bridge::{relay_job_progress, CLOSE_FORBIDDEN, FORBIDDEN_ERROR};
