use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use encore_core::UserSourceMap;

use crate::{MappingStore, StoreError};

/// In-memory mapping store for tests. Load and persist failures can be
/// injected to exercise the memory-stays-source-of-truth contract.
#[derive(Default)]
pub struct InMemoryMappingStore {
    stored: RwLock<UserSourceMap>,
    fail_load: AtomicBool,
    fail_persist: AtomicBool,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial(map: UserSourceMap) -> Self {
        Self { stored: RwLock::new(map), ..Self::default() }
    }

    pub fn fail_next_loads(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_persists(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    pub async fn stored(&self) -> UserSourceMap {
        self.stored.read().await.clone()
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn load(&self) -> Result<UserSourceMap, StoreError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(StoreError::Read {
                path: PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::Other, "injected load failure"),
            });
        }

        Ok(self.stored.read().await.clone())
    }

    async fn persist(&self, map: &UserSourceMap) -> Result<(), StoreError> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(StoreError::Persist {
                path: PathBuf::from("<memory>"),
                detail: "injected persist failure".to_owned(),
            });
        }

        *self.stored.write().await = map.clone();
        Ok(())
    }
}
