//! Generic JSON document query engine for exported music-library data.
//!
//! This crate answers structured questions ("how many tracks are tagged
//! genre=rock, sorted by popularity") over JSON files without flooding an
//! LLM context window with raw data:
//! - Dot-notation path resolution over nested records (`path`)
//! - Total-order comparison across heterogeneous values (`value`)
//! - A query engine with filtering, sorting, aggregation and search
//!   (`engine`)
//! - Canned high-level music-library queries (`library`)

pub mod engine;
pub mod library;
pub mod path;
pub mod value;

// Re-export commonly used types
pub use engine::{Engine, Filter, FilterOp, Query, QueryResult};
pub use library::LibraryQueries;
