//! Example domain entities wired onto `CrudBase`.
//!
//! # Responsibility
//! - Show how a feature declares its record, create shape and update shape.
//! - Expose one stateless CRUD object per entity.
//!
//! # Invariants
//! - Serialized field names match the columns in `db/migrations`.

pub mod shop;
pub mod user;
