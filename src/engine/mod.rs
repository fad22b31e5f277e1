//! Store client capability, in-memory backend and the table engine

pub mod stubs;
pub mod tables;
pub mod traits;

pub use stubs::InMemoryStore;
pub use tables::{TableEngine, TableEngineBuilder};
pub use traits::{KeyBatch, KeyStream, StoreClient};
