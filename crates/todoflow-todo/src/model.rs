//! Todo domain types and flow payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todoflow_core::domain::validation::{require_max_chars, require_non_blank};
use todoflow_core::{Validate, ValidationErrors};
use uuid::Uuid;

/// Longest accepted title, in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// A single entry on a user's todo list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: Uuid,
    /// Subject of the principal that created the item
    pub owner: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoItem {
    pub fn new(owner: impl Into<String>, title: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            title: title.into(),
            description,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, subject: &str) -> bool {
        self.owner == subject
    }
}

/// Input of `Todo/AddTodoItem`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodoItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for NewTodoItem {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_blank(&mut errors, "title", &self.title);
        require_max_chars(&mut errors, "title", &self.title, MAX_TITLE_CHARS);
        errors.into_result()
    }
}

/// Input of `Todo/UpdateTodoItem`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItemUpdate {
    pub id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl TodoItemUpdate {
    pub(crate) fn apply_to(self, item: &mut TodoItem) {
        if let Some(title) = self.title {
            item.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            item.description = Some(description);
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
        item.updated_at = Utc::now();
    }
}

impl Validate for TodoItemUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            require_non_blank(&mut errors, "title", title);
            require_max_chars(&mut errors, "title", title, MAX_TITLE_CHARS);
        }
        errors.into_result()
    }
}

/// Input of the flows addressing one item by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItemKey {
    pub id: Uuid,
}

impl From<Uuid> for TodoItemKey {
    fn from(id: Uuid) -> Self {
        Self { id }
    }
}

impl Validate for TodoItemKey {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if self.id.is_nil() {
            return Err(ValidationErrors::single("id", "must not be nil"));
        }
        Ok(())
    }
}

/// Input of `Security/GenerateJwt`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_blank(&mut errors, "username", &self.username);
        require_non_blank(&mut errors, "password", &self.password);
        errors.into_result()
    }
}

/// Output of `Security/GenerateJwt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}
