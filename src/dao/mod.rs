//! Persistence layer: entities, the store abstraction, and the in-memory
//! backend used by the default deployment and the tests.

pub mod memory;
pub mod models;
pub mod storage;
pub mod store;
