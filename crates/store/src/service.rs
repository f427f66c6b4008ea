use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use encore_core::{LinkOutcome, SourceId, UserId, UserSourceMap};

use crate::{MappingStore, StoreError};

/// Owns the in-memory mapping and serializes every load-mutate-persist
/// sequence behind one coarse mutex. Write volume is human-command-rate, so
/// whole-map locking trades throughput for correctness.
pub struct MappingService {
    map: Mutex<UserSourceMap>,
    store: Arc<dyn MappingStore>,
}

impl MappingService {
    /// Loads the persisted map once at startup. An absent file is a cold
    /// start handled inside the store; anything else is surfaced.
    pub async fn load(store: Arc<dyn MappingStore>) -> Result<Self, StoreError> {
        let map = store.load().await?;
        Ok(Self { map: Mutex::new(map), store })
    }

    /// Links `source` to `user` and persists the updated map. Linking an
    /// already-present source is an idempotent no-op with no persist. On
    /// persist failure the in-memory link is kept (memory remains the
    /// source of truth until the next successful persist) and the error is
    /// returned for the caller to surface.
    pub async fn add_source(
        &self,
        user: UserId,
        source: SourceId,
    ) -> Result<LinkOutcome, StoreError> {
        let mut map = self.map.lock().await;
        match map.link(user.clone(), source.clone()) {
            LinkOutcome::AlreadyLinked => Ok(LinkOutcome::AlreadyLinked),
            LinkOutcome::Linked => {
                info!(
                    event_name = "store.mapping.linked",
                    user = %user,
                    source = %source,
                    "linked user to source file"
                );
                self.store.persist(&map).await?;
                Ok(LinkOutcome::Linked)
            }
        }
    }

    pub async fn list_sources(&self, user: &UserId) -> Option<Vec<SourceId>> {
        let map = self.map.lock().await;
        map.sources_for(user).map(<[SourceId]>::to_vec)
    }

    /// A point-in-time copy for the scheduled batch, so rendering does not
    /// hold the lock while files are read.
    pub async fn snapshot(&self) -> UserSourceMap {
        self.map.lock().await.clone()
    }

    /// Health probe: checks that the backing storage is still readable.
    pub async fn probe_store(&self) -> Result<(), StoreError> {
        self.store.load().await.map(|_| ())
    }
}
