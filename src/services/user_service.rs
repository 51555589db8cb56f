use chrono::Utc;
use tracing::{info, instrument};

use crate::database::{Database, RepositoryError};
use crate::models::tracking::TrackingError;
use crate::models::user::{NewUser, User, UserFilter};

/// Supply chain participant registration and profiles
#[derive(Debug, Clone)]
pub struct UserService {
    database: Database,
}

impl UserService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, TrackingError> {
        let mut users = self.database.users().list().await?;
        users.retain(|u| filter.accepts(u));
        Ok(users)
    }

    #[instrument(skip(self, request), fields(role = %request.role))]
    pub async fn register(&self, request: NewUser) -> Result<User, TrackingError> {
        request.validate()?;
        let user = request.into_user(Utc::now());

        match self.database.users().insert(user.clone()).await {
            Ok(()) => {
                info!(user_id = %user.id, "👤 User registered");
                Ok(user)
            }
            Err(RepositoryError::Duplicate(email)) => Err(TrackingError::Conflict(format!(
                "A user with email '{email}' already exists"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str) -> NewUser {
        NewUser {
            name: "Ana Lima".to_string(),
            email: email.to_string(),
            role: "Retailer".to_string(),
            company: None,
            location: Some("Lisbon".to_string()),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let service = UserService::new(Database::in_memory());
        service.register(request("ana@example.com")).await.unwrap();
        let again = service.register(request("ANA@example.com")).await;
        assert!(matches!(again, Err(TrackingError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_applies_filter() {
        let service = UserService::new(Database::in_memory());
        service.register(request("ana@example.com")).await.unwrap();
        let mut other = request("bo@example.com");
        other.name = "Bo Chen".to_string();
        other.role = "Producer".to_string();
        service.register(other).await.unwrap();

        let retailers = service
            .list(&UserFilter {
                role: Some("retailer".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(retailers.len(), 1);
        assert_eq!(retailers[0].email, "ana@example.com");

        let everyone = service.list(&UserFilter::default()).await.unwrap();
        assert_eq!(everyone.len(), 2);
    }

    #[tokio::test]
    async fn invalid_request_is_rejected() {
        let service = UserService::new(Database::in_memory());
        assert!(matches!(
            service.register(request("not-an-email")).await,
            Err(TrackingError::Validation(_))
        ));
    }
}
