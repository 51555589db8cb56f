use crate::config::AppConfig;
use crate::models::tracking::{EventEntry, TrackingError, TrackingRecord};
use crate::models::user::User;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod memory;
pub mod seed;
pub mod simulated;

pub use memory::MemoryStore;
pub use simulated::SimulatedNetwork;

/// Storage-level failures
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record '{0}' already exists")]
    Duplicate(String),

    #[error("Record '{0}' not found")]
    Missing(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Rejected(#[from] TrackingError),
}

impl From<RepositoryError> for TrackingError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Duplicate(id) => TrackingError::Conflict(format!("'{id}' already exists")),
            RepositoryError::Missing(id) => TrackingError::NotFound { query: id },
            RepositoryError::Unavailable(msg) => TrackingError::TransientNetwork(msg),
            RepositoryError::Rejected(inner) => inner,
        }
    }
}

/// Access to tracked products. `GET /products/{id}` in a networked deployment.
#[async_trait]
pub trait TrackingRepository: Send + Sync {
    /// Case-insensitive exact product id lookup
    async fn get(&self, product_id: &str) -> Result<Option<TrackingRecord>, RepositoryError>;

    /// Records whose id or name contains `needle` (case-insensitive), in registration order
    async fn search(&self, needle: &str) -> Result<Vec<TrackingRecord>, RepositoryError>;

    async fn list(&self) -> Result<Vec<TrackingRecord>, RepositoryError>;

    async fn insert(&self, record: TrackingRecord) -> Result<(), RepositoryError>;

    /// Append to a record's event log and return the updated record
    async fn append_event(
        &self,
        product_id: &str,
        entry: EventEntry,
    ) -> Result<TrackingRecord, RepositoryError>;
}

/// Access to registered users
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// Fails with `Duplicate` when the email is taken
    async fn insert(&self, user: User) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<T: TrackingRepository + ?Sized> TrackingRepository for Arc<T> {
    async fn get(&self, product_id: &str) -> Result<Option<TrackingRecord>, RepositoryError> {
        (**self).get(product_id).await
    }

    async fn search(&self, needle: &str) -> Result<Vec<TrackingRecord>, RepositoryError> {
        (**self).search(needle).await
    }

    async fn list(&self) -> Result<Vec<TrackingRecord>, RepositoryError> {
        (**self).list().await
    }

    async fn insert(&self, record: TrackingRecord) -> Result<(), RepositoryError> {
        (**self).insert(record).await
    }

    async fn append_event(
        &self,
        product_id: &str,
        entry: EventEntry,
    ) -> Result<TrackingRecord, RepositoryError> {
        (**self).append_event(product_id, entry).await
    }
}

#[async_trait]
impl<T: UserRepository + ?Sized> UserRepository for Arc<T> {
    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        (**self).list().await
    }

    async fn insert(&self, user: User) -> Result<(), RepositoryError> {
        (**self).insert(user).await
    }
}

/// Handle to the configured repositories, cheap to clone into handlers
#[derive(Clone)]
pub struct Database {
    products: Arc<dyn TrackingRepository>,
    users: Arc<dyn UserRepository>,
    backend: &'static str,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.backend)
            .finish()
    }
}

impl Database {
    /// Build the in-memory backend behind the simulated network layer
    pub async fn new(config: &AppConfig) -> Result<Self> {
        info!("🔄 Initializing in-memory tracking store");

        let store = Arc::new(MemoryStore::default());
        if config.seed_demo_data {
            let (products, users) = seed::load(store.as_ref()).await?;
            info!("🌱 Seeded {} demo products and {} demo users", products, users);
        }

        let network = Arc::new(SimulatedNetwork::new(
            store,
            Duration::from_millis(config.simulated_latency_ms),
            config.simulated_failure_rate,
        ));

        info!(
            "✅ Tracking store ready - latency: {}ms, failure rate: {:.2}",
            config.simulated_latency_ms, config.simulated_failure_rate
        );

        Ok(Self {
            products: network.clone(),
            users: network,
            backend: "memory+simulated-network",
        })
    }

    /// Store without latency or failures
    #[cfg(test)]
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            products: store.clone(),
            users: store,
            backend: "memory",
        }
    }

    pub fn with_repositories(
        products: Arc<dyn TrackingRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            products,
            users,
            backend: "custom",
        }
    }

    pub fn products(&self) -> &dyn TrackingRepository {
        self.products.as_ref()
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn get_backend_name(&self) -> &str {
        self.backend
    }
}
