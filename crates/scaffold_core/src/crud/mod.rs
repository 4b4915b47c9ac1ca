//! Generic data access over `Session`.
//!
//! # Responsibility
//! - Map serde record types onto tables (`entity`).
//! - Provide entity-agnostic CRUD primitives (`base`).
//!
//! # Invariants
//! - CRUD primitives never raise `DataError`; existence and uniqueness
//!   checks belong to call sites.
//! - Flush-only variants leave the transaction open for the caller.

pub mod base;
pub mod entity;

pub use base::{CrudBase, UpdateInput, DEFAULT_LIMIT, DEFAULT_SKIP};
pub use entity::{encode_fields, Column, ColumnKind, Entity, EntityId, FieldMap};
