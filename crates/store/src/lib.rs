//! Mapping persistence for encore.
//!
//! The user-to-source mapping lives in a single JSON object on disk. This
//! crate provides the storage port (`MappingStore`), the file-backed
//! implementation with atomic persists, an in-memory test double, and the
//! `MappingService` that guards the load-mutate-persist sequence with one
//! coarse lock.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use encore_core::UserSourceMap;

pub mod json_file;
pub mod memory;
pub mod service;

pub use json_file::JsonFileMappingStore;
pub use memory::InMemoryMappingStore;
pub use service::MappingService;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read mapping file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("mapping file `{path}` is not valid JSON: {source}")]
    Decode { path: PathBuf, source: serde_json::Error },
    #[error("could not persist mapping file `{path}`: {detail}")]
    Persist { path: PathBuf, detail: String },
}

/// Storage port for the user-to-source mapping. `load` on absent storage is
/// a cold start: it returns an empty map rather than an error. `persist`
/// replaces the stored map wholesale and must never leave a torn file
/// visible to a subsequent `load`.
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn load(&self) -> Result<UserSourceMap, StoreError>;
    async fn persist(&self, map: &UserSourceMap) -> Result<(), StoreError>;
}
