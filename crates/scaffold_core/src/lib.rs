//! Core of the backend scaffold.
//!
//! Generic CRUD over a SQLite unit of work, a structured error taxonomy for
//! data conflicts, and the logging/settings bootstrap around them.

pub mod boundary;
pub mod config;
pub mod crud;
pub mod db;
pub mod exceptions;
pub mod logging;
pub mod model;
pub mod service;
pub mod session;

pub use boundary::{decode_body, ErrorResponse, FieldError};
pub use config::{ConfigError, DatabaseLocation, Settings};
pub use crud::{
    encode_fields, Column, ColumnKind, CrudBase, Entity, EntityId, FieldMap, UpdateInput,
    DEFAULT_LIMIT, DEFAULT_SKIP,
};
pub use exceptions::{DataError, DataErrorKind, KeyAttr, ResponsePayload};
pub use logging::{default_log_level, init_logging, LoggingContext};
pub use model::shop::{Shop, ShopCreate, ShopUpdate, SHOPS};
pub use model::user::{User, UserCreate, UserUpdate, USERS};
pub use service::shop_service::ShopService;
pub use service::user_service::UserService;
pub use service::{ServiceError, ServiceResult};
pub use session::{FlushSummary, PendingId, Query, Session, SessionError, SessionResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
