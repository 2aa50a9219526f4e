//! Embedding store lifecycle management.
//!
//! [`IndexManager`] owns the one-time, idempotent creation of the external
//! vector index and hands out the shared handle afterwards. Creation happens
//! at most once per process: concurrent callers pile up on a
//! `tokio::sync::OnceCell` rather than racing to double-create, and the
//! external service's own idempotency covers restarts.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

use super::VectorIndex;

pub struct IndexManager {
    index: Arc<dyn VectorIndex>,
    /// Dimensionality reported by the embedding capability.
    dimensions: usize,
    poll_interval: Duration,
    ready: OnceCell<()>,
}

impl IndexManager {
    pub fn new(index: Arc<dyn VectorIndex>, dimensions: usize, poll_interval: Duration) -> Self {
        Self {
            index,
            dimensions,
            poll_interval,
            ready: OnceCell::new(),
        }
    }

    /// Lazily initialize the index, then return the shared handle.
    pub async fn get_handle(&self) -> Result<Arc<dyn VectorIndex>> {
        self.ensure_index_exists().await?;
        Ok(Arc::clone(&self.index))
    }

    /// Create the index if absent and block until it reports ready.
    ///
    /// Runs once per cold start; a fixed sleep between readiness polls is
    /// sufficient here, so there is no backoff.
    pub async fn ensure_index_exists(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                if !self.index.index_exists().await? {
                    info!(dimensions = self.dimensions, "creating vector index");
                    self.index.create_index(self.dimensions).await?;
                }
                while !self.index.index_ready().await? {
                    tokio::time::sleep(self.poll_interval).await;
                }
                info!("vector index ready");
                Ok::<(), anyhow::Error>(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MetadataFilter, QueryMatch, VectorEntry};
    use crate::record::Namespace;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Index stub that counts lifecycle calls and becomes ready after a
    /// configurable number of polls.
    struct CountingIndex {
        creates: AtomicUsize,
        polls_until_ready: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for CountingIndex {
        async fn upsert(&self, _: Namespace, _: VectorEntry) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _: Namespace, _: &str) -> Result<()> {
            Ok(())
        }
        async fn fetch(&self, _: Namespace, _: &str) -> Result<Option<VectorEntry>> {
            Ok(None)
        }
        async fn query_by_vector(
            &self,
            _: Namespace,
            _: &[f32],
            _: usize,
            _: Option<&MetadataFilter>,
        ) -> Result<Vec<QueryMatch>> {
            Ok(Vec::new())
        }
        async fn query_by_id(&self, _: Namespace, _: &str, _: usize) -> Result<Vec<QueryMatch>> {
            Ok(Vec::new())
        }
        async fn index_exists(&self) -> Result<bool> {
            Ok(self.creates.load(Ordering::SeqCst) > 0)
        }
        async fn create_index(&self, _: usize) -> Result<()> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn index_ready(&self) -> Result<bool> {
            let remaining = self.polls_until_ready.load(Ordering::SeqCst);
            if remaining == 0 {
                return Ok(true);
            }
            self.polls_until_ready.store(remaining - 1, Ordering::SeqCst);
            Ok(false)
        }
    }

    #[tokio::test]
    async fn creates_index_once_across_callers() {
        let stub = Arc::new(CountingIndex {
            creates: AtomicUsize::new(0),
            polls_until_ready: AtomicUsize::new(2),
        });
        let manager = Arc::new(IndexManager::new(
            stub.clone(),
            1024,
            Duration::from_millis(1),
        ));

        let a = Arc::clone(&manager);
        let b = Arc::clone(&manager);
        let (ra, rb) = tokio::join!(
            async move { a.get_handle().await },
            async move { b.get_handle().await },
        );
        ra.unwrap();
        rb.unwrap();

        assert_eq!(stub.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn skips_creation_when_index_exists() {
        let stub = Arc::new(CountingIndex {
            creates: AtomicUsize::new(1), // index_exists() is already true
            polls_until_ready: AtomicUsize::new(0),
        });
        let manager = IndexManager::new(stub.clone(), 1024, Duration::from_millis(1));

        manager.ensure_index_exists().await.unwrap();
        assert_eq!(stub.creates.load(Ordering::SeqCst), 1);
    }
}
