// crates/db/src/queries/mod.rs
//! Query methods on [`crate::Database`].

pub mod jobs;
mod row_types;
