use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use encore_core::UserSourceMap;

use crate::{MappingStore, StoreError};

/// File-backed mapping store. The whole map is serialized as one pretty JSON
/// object; persists write a sibling `.tmp` file and rename it over the real
/// path so a crash mid-write can never leave a truncated file behind.
pub struct JsonFileMappingStore {
    path: PathBuf,
}

impl JsonFileMappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "user_sources.json".to_owned());
        self.path.with_file_name(format!("{file_name}.tmp"))
    }
}

#[async_trait]
impl MappingStore for JsonFileMappingStore {
    async fn load(&self) -> Result<UserSourceMap, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                warn!(
                    event_name = "store.mapping.cold_start",
                    path = %self.path.display(),
                    "no mapping file found; starting with an empty map"
                );
                return Ok(UserSourceMap::new());
            }
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };

        let map = serde_json::from_str(&raw)
            .map_err(|source| StoreError::Decode { path: self.path.clone(), source })?;
        debug!(
            event_name = "store.mapping.loaded",
            path = %self.path.display(),
            "loaded existing mapping file"
        );
        Ok(map)
    }

    async fn persist(&self, map: &UserSourceMap) -> Result<(), StoreError> {
        let persist_error = |detail: String| StoreError::Persist {
            path: self.path.clone(),
            detail,
        };

        let bytes = serde_json::to_vec_pretty(map).map_err(|error| persist_error(error.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|error| persist_error(error.to_string()))?;
            }
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, &bytes).await.map_err(|error| persist_error(error.to_string()))?;
        fs::rename(&tmp, &self.path).await.map_err(|error| persist_error(error.to_string()))?;

        debug!(
            event_name = "store.mapping.persisted",
            path = %self.path.display(),
            users = map.user_count(),
            "mapping file persisted"
        );
        Ok(())
    }
}
