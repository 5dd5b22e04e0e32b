//! Account domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::DEFAULT_MODEL;

/// Normalize a username, email or login identifier for storage and comparison.
///
/// Usernames and emails are unique case-insensitively, so every value is
/// lowercased (and trimmed) before it reaches the database.
pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Account domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub default_model: String,
    /// Opaque key-value bag owned by the caller
    pub preferences: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn has_logged_in(&self) -> bool {
        self.last_login_at.is_some()
    }
}

/// Account registration data transfer object
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAccount {
    pub username: String,
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
    /// Falls back to [`DEFAULT_MODEL`]
    pub default_model: Option<String>,
    /// Falls back to an empty object
    pub preferences: Option<Value>,
}

impl RegisterAccount {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            default_model: None,
            preferences: None,
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_preferences(mut self, preferences: Value) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn default_model_or_default(&self) -> String {
        self.default_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string()
    }

    pub fn preferences_or_default(&self) -> Value {
        self.preferences
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

/// Account edit data transfer object.
///
/// `None` and empty strings both mean "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAccount {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Plaintext password, re-hashed before storage
    pub password: Option<String>,
    pub default_model: Option<String>,
}

impl UpdateAccount {
    /// Normalized new username, if one was supplied
    pub fn username(&self) -> Option<String> {
        non_empty(self.username.as_deref()).map(normalize_identifier)
    }

    /// Normalized new email, if one was supplied
    pub fn email(&self) -> Option<String> {
        non_empty(self.email.as_deref()).map(normalize_identifier)
    }

    pub fn password(&self) -> Option<&str> {
        non_empty(self.password.as_deref())
    }

    pub fn default_model(&self) -> Option<&str> {
        non_empty(self.default_model.as_deref())
    }
}

/// Validated column changes handed to storage (password already hashed)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub default_model: Option<String>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.default_model.is_none()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
