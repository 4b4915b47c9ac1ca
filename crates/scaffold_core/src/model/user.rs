//! User entity.

use crate::crud::{Column, ColumnKind, CrudBase, Entity, EntityId};
use serde::{Deserialize, Serialize};

/// Persisted user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// `None` until the first flush.
    #[serde(default)]
    pub id: Option<EntityId>,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Epoch milliseconds, assigned by the database.
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", ColumnKind::Integer),
        Column::new("email", ColumnKind::Text),
        Column::new("full_name", ColumnKind::Text),
        Column::new("is_active", ColumnKind::Bool),
        Column::new("created_at", ColumnKind::Integer),
    ];
}

/// Input for registering a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl UserCreate {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            full_name: None,
            is_active: true,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}

/// Partial user update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

pub type UserCrud = CrudBase<User, UserCreate, UserUpdate>;

/// Shared CRUD object for users.
pub const USERS: UserCrud = CrudBase::new();

fn default_active() -> bool {
    true
}
