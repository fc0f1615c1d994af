use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::storage::StorageService;

/// Handles shared by every handler. Clones share one allocation.
#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<AppResources>,
}

struct AppResources {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    storage: Option<StorageService>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        storage: Option<StorageService>,
    ) -> Self {
        Self { inner: Arc::new(AppResources { settings, db, redis, storage }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Rate limiting only; every caller tolerates a disconnected handle.
    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    /// Present only when S3 credentials are configured.
    pub(crate) fn storage(&self) -> Option<&StorageService> {
        self.inner.storage.as_ref()
    }

    pub(crate) fn storage_enabled(&self) -> bool {
        self.inner.storage.is_some()
    }
}
