//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_storage_engine;
mod json_catalog;

pub use in_memory_storage_engine::InMemoryStorageEngine;
pub use json_catalog::{Catalog, load_catalog, parse_catalog};
