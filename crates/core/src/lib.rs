// crates/core/src/lib.rs
//! Domain model for transcription jobs.
//!
//! Everything here is pure: no I/O, no clocks other than the timestamps
//! callers pass in. The record store, the broker and the server all build on
//! these types.

pub mod cancellation;
pub mod error;
pub mod job;
pub mod pagination;
pub mod progress;
pub mod queue;
pub mod upload;

pub use cancellation::*;
pub use error::*;
pub use job::*;
pub use pagination::*;
pub use progress::*;
pub use queue::*;
pub use upload::*;
