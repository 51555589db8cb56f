use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

use super::{RepositoryError, TrackingRepository, UserRepository};
use crate::models::tracking::{EventEntry, TrackingRecord};
use crate::models::user::User;

/// Wraps a repository with network-like latency and random transient failures.
///
/// The delay is an `await` point, so a caller that stops polling (a cancelled
/// search) abandons the call without waiting it out.
#[derive(Debug)]
pub struct SimulatedNetwork<R> {
    inner: R,
    latency: Duration,
    failure_rate: f64,
}

impl<R> SimulatedNetwork<R> {
    pub fn new(inner: R, latency: Duration, failure_rate: f64) -> Self {
        Self {
            inner,
            latency,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    async fn round_trip(&self, operation: &str) -> Result<(), RepositoryError> {
        // ThreadRng is not Send; draw before the await
        let fail = self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if fail {
            warn!(operation, "⚠️ Simulated network failure");
            return Err(RepositoryError::Unavailable(format!(
                "simulated network failure during {operation}"
            )));
        }
        debug!(operation, latency_ms = self.latency.as_millis() as u64, "round trip complete");
        Ok(())
    }
}

#[async_trait]
impl<R: TrackingRepository> TrackingRepository for SimulatedNetwork<R> {
    async fn get(&self, product_id: &str) -> Result<Option<TrackingRecord>, RepositoryError> {
        self.round_trip("get").await?;
        self.inner.get(product_id).await
    }

    async fn search(&self, needle: &str) -> Result<Vec<TrackingRecord>, RepositoryError> {
        self.round_trip("search").await?;
        self.inner.search(needle).await
    }

    async fn list(&self) -> Result<Vec<TrackingRecord>, RepositoryError> {
        self.round_trip("list").await?;
        TrackingRepository::list(&self.inner).await
    }

    async fn insert(&self, record: TrackingRecord) -> Result<(), RepositoryError> {
        self.round_trip("insert").await?;
        TrackingRepository::insert(&self.inner, record).await
    }

    async fn append_event(
        &self,
        product_id: &str,
        entry: EventEntry,
    ) -> Result<TrackingRecord, RepositoryError> {
        self.round_trip("append_event").await?;
        self.inner.append_event(product_id, entry).await
    }
}

#[async_trait]
impl<R: UserRepository> UserRepository for SimulatedNetwork<R> {
    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        self.round_trip("list_users").await?;
        UserRepository::list(&self.inner).await
    }

    async fn insert(&self, user: User) -> Result<(), RepositoryError> {
        self.round_trip("insert_user").await?;
        UserRepository::insert(&self.inner, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn always_failing_network_reports_unavailable() {
        let network = SimulatedNetwork::new(MemoryStore::default(), Duration::ZERO, 1.0);
        let err = TrackingRepository::list(&network).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable(_)));
    }

    #[tokio::test]
    async fn healthy_network_passes_through() {
        let network = SimulatedNetwork::new(MemoryStore::default(), Duration::from_millis(5), 0.0);
        assert!(TrackingRepository::list(&network).await.unwrap().is_empty());
        assert!(network.get("PRD1").await.unwrap().is_none());
    }
}
