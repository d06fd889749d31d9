//! feedsink: ingest the feeds listed in an OPML file into a deduplicated
//! SQL store.
//!
//! The binary in `main.rs` wires CLI arguments and logging around
//! [`pipeline::Orchestrator`]; everything else lives here so integration
//! tests can drive a run directly.

pub mod config;
pub mod feed;
pub mod pipeline;
pub mod storage;
pub mod util;
