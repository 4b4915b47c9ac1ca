//! Shop entity, owned by a user.

use crate::crud::{Column, ColumnKind, CrudBase, Entity, EntityId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted shop row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub owner_id: EntityId,
    pub name: String,
    /// Free-form JSON settings.
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Entity for Shop {
    const TABLE: &'static str = "shops";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", ColumnKind::Integer),
        Column::new("owner_id", ColumnKind::Integer),
        Column::new("name", ColumnKind::Text),
        Column::new("settings", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Integer),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopCreate {
    pub owner_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

pub type ShopCrud = CrudBase<Shop, ShopCreate, ShopUpdate>;

pub const SHOPS: ShopCrud = CrudBase::new();
