use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::tracking::{require, TrackingError};

/// Supply chain participant profile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// User registration request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), TrackingError> {
        require("name", &self.name)?;
        require("role", &self.role)?;
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(TrackingError::Validation(format!(
                "'{email}' is not a valid email address"
            ))),
        }
    }

    pub fn into_user(self, created_at: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            role: self.role.trim().to_string(),
            company: non_blank(self.company),
            location: non_blank(self.location),
            active: true,
            created_at,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Filters for the user profiles listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub query: Option<String>,
    pub role: Option<String>,
    /// `active`, `inactive` or `all`
    pub status: Option<String>,
}

impl UserFilter {
    pub fn accepts(&self, user: &User) -> bool {
        let query_ok = match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                user.name.to_lowercase().contains(&q) || user.email.contains(&q)
            }
            _ => true,
        };
        let role_ok = match self.role.as_deref() {
            Some(role) if !role.eq_ignore_ascii_case("all") => user.role.eq_ignore_ascii_case(role),
            _ => true,
        };
        let status_ok = match self.status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("active") => user.active,
            Some(s) if s.eq_ignore_ascii_case("inactive") => !user.active,
            _ => true,
        };
        query_ok && role_ok && status_ok
    }
}
