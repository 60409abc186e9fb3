//! Time-series sinks for radiation data
//!
//! This module provides a trait-based abstraction over the store the
//! agent writes samples to and renders charts from.
//!
//! ## Design
//!
//! - **Trait-based**: `TimeSeriesSink` keeps the control loop ignorant of the
//!   storage technology
//! - **Async**: All operations are async; chart regeneration runs in a
//!   detached task
//! - **No buffering**: a rejected or missed sample is a permanent gap
//!
//! ## Sinks
//!
//! - **rrdtool** (default): round-robin database driven through the
//!   `rrdtool` command line tool
//! - **In-Memory**: ring buffer, for tests or running without rrdtool
//!
//! ## Usage
//!
//! ```no_run
//! use radmon::config::StorageConfig;
//! use radmon::storage::rrdtool::RrdtoolSink;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _sink = RrdtoolSink::open(&StorageConfig::default())?;
//!     // hand to the Agent
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod charts;
pub mod error;
pub mod memory;
pub mod rrdtool;

pub use backend::{DataPoint, TimeSeriesSink};
pub use error::{SinkError, SinkResult};
