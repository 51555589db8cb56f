use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RepositoryError, TrackingRepository, UserRepository};
use crate::models::tracking::{EventEntry, TrackingRecord};
use crate::models::user::User;

/// Process-local store. Vectors keep registration order, which search relies on.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: RwLock<Vec<TrackingRecord>>,
    users: RwLock<Vec<User>>,
}

#[async_trait]
impl TrackingRepository for MemoryStore {
    async fn get(&self, product_id: &str) -> Result<Option<TrackingRecord>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .iter()
            .find(|r| r.product_id.eq_ignore_ascii_case(product_id))
            .cloned())
    }

    async fn search(&self, needle: &str) -> Result<Vec<TrackingRecord>, RepositoryError> {
        let needle = needle.to_lowercase();
        let products = self.products.read().await;
        Ok(products.iter().filter(|r| r.matches(&needle)).cloned().collect())
    }

    async fn list(&self) -> Result<Vec<TrackingRecord>, RepositoryError> {
        Ok(self.products.read().await.clone())
    }

    async fn insert(&self, record: TrackingRecord) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if products
            .iter()
            .any(|r| r.product_id.eq_ignore_ascii_case(&record.product_id))
        {
            return Err(RepositoryError::Duplicate(record.product_id));
        }
        products.push(record);
        Ok(())
    }

    async fn append_event(
        &self,
        product_id: &str,
        entry: EventEntry,
    ) -> Result<TrackingRecord, RepositoryError> {
        let mut products = self.products.write().await;
        let record = products
            .iter_mut()
            .find(|r| r.product_id.eq_ignore_ascii_case(product_id))
            .ok_or_else(|| RepositoryError::Missing(product_id.to_string()))?;
        record.append(entry)?;
        Ok(record.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.users.read().await.clone())
    }

    async fn insert(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate(user.email));
        }
        users.push(user);
        Ok(())
    }
}
