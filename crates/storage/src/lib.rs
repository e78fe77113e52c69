#![forbid(unsafe_code)]

pub mod position;
pub mod repository;
pub mod sqlite;

pub use position::PositionStore;
pub use repository::{InMemoryKeyValueStore, KeyValueStore, Storage, StorageError};
