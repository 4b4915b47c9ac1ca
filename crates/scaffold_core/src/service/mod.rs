//! Example use-case services built on `CrudBase`.
//!
//! # Responsibility
//! - Perform existence/uniqueness checks before calling CRUD primitives.
//! - Raise `DataError` values when a check fails.
//!
//! # Invariants
//! - Services borrow the caller's `Session` and never create their own.
//! - Structured errors are returned unchanged to the boundary layer.

use crate::exceptions::DataError;
use crate::session::SessionError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod shop_service;
pub mod user_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-layer error: a structured data error or a persistence fault.
#[derive(Debug)]
pub enum ServiceError {
    Data(DataError),
    Session(SessionError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data(err) => write!(f, "{err}"),
            Self::Session(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Data(err) => Some(err),
            Self::Session(err) => Some(err),
        }
    }
}

impl From<DataError> for ServiceError {
    fn from(value: DataError) -> Self {
        Self::Data(value)
    }
}

impl From<SessionError> for ServiceError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}
