use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::geo::BoundingBox;
use crate::report::{CoordinateCluster, NewReport, NoiseReport};

use super::Storage;

/// Async access to the report collection.
///
/// HTTP handlers and the ingestion path depend on this trait rather than on
/// a concrete database, so a store is constructed once at startup and
/// injected wherever it is needed.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert one report atomically, assigning `id` and `createdAt`.
    async fn create(&self, report: NewReport) -> Result<NoiseReport>;

    /// All reports, newest first.
    async fn list_all(&self) -> Result<Vec<NoiseReport>>;

    /// One user's reports, newest first; empty when there are none.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<NoiseReport>>;

    /// Located reports grouped by exact coordinate pair.
    async fn aggregate_by_coordinate(&self) -> Result<Vec<CoordinateCluster>>;

    /// Reports whose point lies inside `bounds`, newest first.
    async fn list_within(&self, bounds: BoundingBox) -> Result<Vec<NoiseReport>>;
}

/// [`ReportStore`] backed by a shared [`Storage`] connection.
///
/// Each call takes the connection lock on the blocking thread pool, so slow
/// disk I/O never stalls the async workers.
#[derive(Debug, Clone)]
pub struct SqliteReportStore {
    storage: Arc<Mutex<Storage>>,
}

impl SqliteReportStore {
    /// Wrap an open storage engine.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
        }
    }

    async fn with_storage<T, F>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&Storage) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || {
            let guard = storage
                .lock()
                .map_err(|_| Error::internal("storage lock poisoned"))?;
            operation(&guard)
        })
        .await
        .map_err(|e| Error::internal(format!("storage task failed: {e}")))?
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn create(&self, report: NewReport) -> Result<NoiseReport> {
        self.with_storage(move |storage| storage.insert(&report))
            .await
    }

    async fn list_all(&self) -> Result<Vec<NoiseReport>> {
        self.with_storage(Storage::list_all).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<NoiseReport>> {
        let user_id = user_id.to_string();
        self.with_storage(move |storage| storage.list_by_user(&user_id))
            .await
    }

    async fn aggregate_by_coordinate(&self) -> Result<Vec<CoordinateCluster>> {
        self.with_storage(Storage::aggregate_by_coordinate).await
    }

    async fn list_within(&self, bounds: BoundingBox) -> Result<Vec<NoiseReport>> {
        self.with_storage(move |storage| storage.list_within(&bounds))
            .await
    }
}
