//! Row aggregation engine
//!
//! Enumerates every key of a table, fetches all rows concurrently and counts
//! key components and field values.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │       Streaming Key Enumerator      │
//! │   batches buffered until `done`     │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │          Fetch Fan-out              │
//! │  JoinSet, optional Semaphore bound  │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │        Stats Accumulator            │
//! │  Mutex-guarded key/field counts     │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │        Aggregation Report           │
//! │  handed out after the full drain    │
//! └─────────────────────────────────────┘
//! ```

pub mod fanout;
pub mod report;

pub use fanout::{Aggregator, FetchOptions};
pub use report::{AggregationReport, StatsAccumulator};
