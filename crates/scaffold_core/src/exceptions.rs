//! Structured data-integrity errors raised by CRUD call sites.
//!
//! # Responsibility
//! - Describe existence conflicts, missing records and failed data checks as
//!   values the boundary layer can render directly.
//! - Carry a stable status classification per error kind.
//!
//! # Invariants
//! - A `DataError` is immutable once built; builders consume and return it.
//! - The response payload has exactly the keys `title`, `message`, `detail`.
//! - An explicitly supplied message always wins over the derived one.

use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

const EXIST_TITLE: &str = "Data Already Exists Error";
const NOT_EXIST_TITLE: &str = "Data Not Exists Error";
const CHECK_TITLE: &str = "Data Check Error";

/// Error classification, each mapped to one HTTP-style status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataErrorKind {
    /// A uniqueness/existence precondition was violated (409).
    Exist,
    /// A required record is missing (404).
    NotExist,
    /// A cross-field or business-rule check failed (400).
    Check,
    /// Anything else raised through the taxonomy (500).
    Other,
}

impl DataErrorKind {
    /// Status classification for the transport layer.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Exist => 409,
            Self::NotExist => 404,
            Self::Check => 400,
            Self::Other => 500,
        }
    }
}

/// One `{name, value}` pair describing a conflicting or missing key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyAttr {
    pub name: String,
    pub value: Value,
}

impl KeyAttr {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Body rendered for a structured error. Status is carried separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponsePayload {
    pub title: Option<String>,
    pub message: String,
    pub detail: Option<String>,
}

/// Structured, user-presentable data error.
#[derive(Debug, Clone, PartialEq)]
pub struct DataError {
    kind: DataErrorKind,
    name: String,
    title: Option<String>,
    message: String,
    detail: Option<String>,
    attrs: Vec<KeyAttr>,
}

impl DataError {
    /// Duplicate data, e.g. a second user with the same email.
    pub fn exist(name: impl Into<String>, repeated_attrs: Vec<KeyAttr>) -> Self {
        let message = format!(
            "The data already exists with key attribute(s):{}",
            describe_attrs(&repeated_attrs)
        );
        Self::build(DataErrorKind::Exist, name.into(), EXIST_TITLE, message, repeated_attrs)
    }

    /// A record looked up by `attrs` does not exist.
    pub fn not_exist(name: impl Into<String>, attrs: Vec<KeyAttr>) -> Self {
        let message = format!(
            "The data not exist with key attribute(s):{}",
            describe_attrs(&attrs)
        );
        Self::build(DataErrorKind::NotExist, name.into(), NOT_EXIST_TITLE, message, attrs)
    }

    /// Generic validity failure that is neither duplication nor absence.
    pub fn check(name: impl Into<String>) -> Self {
        let name = name.into();
        let message = default_message(&name);
        Self::build(DataErrorKind::Check, name, CHECK_TITLE, message, Vec::new())
    }

    /// Untitled error with server-error classification.
    pub fn other(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: DataErrorKind::Other,
            message: default_message(&name),
            name,
            title: None,
            detail: None,
            attrs: Vec::new(),
        }
    }

    fn build(
        kind: DataErrorKind,
        name: String,
        title: &str,
        message: String,
        attrs: Vec<KeyAttr>,
    ) -> Self {
        Self {
            kind,
            name,
            title: Some(title.to_string()),
            message,
            detail: None,
            attrs,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> DataErrorKind {
        self.kind
    }

    /// Subject the error is about, usually the entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Conflicting (`Exist`) or missing (`NotExist`) key attributes in order.
    pub fn attrs(&self) -> &[KeyAttr] {
        &self.attrs
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn to_response_payload(&self) -> ResponsePayload {
        ResponsePayload {
            title: self.title.clone(),
            message: self.message.clone(),
            detail: self.detail.clone(),
        }
    }
}

impl Display for DataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl Error for DataError {}

fn default_message(name: &str) -> String {
    format!("Something went wrong on {name}")
}

fn describe_attrs(attrs: &[KeyAttr]) -> String {
    attrs
        .iter()
        .map(|attr| format!("{}:{}", attr.name, display_value(&attr.value)))
        .collect::<Vec<_>>()
        .join(" ")
}

// Strings render bare; everything else uses its JSON form.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{DataError, DataErrorKind, KeyAttr};
    use serde_json::json;

    #[test]
    fn exist_error_derives_message_from_repeated_attrs() {
        let err = DataError::exist("user", vec![KeyAttr::new("email", "a@b.com")]);

        assert_eq!(err.kind(), DataErrorKind::Exist);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.title(), Some("Data Already Exists Error"));
        assert!(err.message().contains("email"));
        assert!(err.message().contains("a@b.com"));
        assert_eq!(
            err.message(),
            "The data already exists with key attribute(s):email:a@b.com"
        );
    }

    #[test]
    fn not_exist_error_reports_numeric_attr_and_404() {
        let err = DataError::not_exist("user", vec![KeyAttr::new("id", 42)]);

        assert_eq!(err.status_code(), 404);
        assert!(err.message().contains("42"));
        assert_eq!(err.attrs()[0].value, json!(42));
    }

    #[test]
    fn attrs_keep_insertion_order_in_message() {
        let err = DataError::exist(
            "shop",
            vec![KeyAttr::new("owner_id", 7), KeyAttr::new("name", "corner")],
        );
        assert!(err.message().ends_with("owner_id:7 name:corner"));
    }

    #[test]
    fn check_error_uses_default_message_and_400() {
        let err = DataError::check("shop");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.title(), Some("Data Check Error"));
        assert_eq!(err.message(), "Something went wrong on shop");
    }

    #[test]
    fn explicit_message_and_detail_override_defaults() {
        let err = DataError::exist("user", vec![KeyAttr::new("email", "x@y.z")])
            .with_message("email taken")
            .with_detail("pick another address");
        assert_eq!(err.message(), "email taken");
        assert_eq!(err.detail(), Some("pick another address"));
    }

    #[test]
    fn response_payload_has_exactly_title_message_detail() {
        let err = DataError::check("user").with_detail("bad range");
        let payload = serde_json::to_value(err.to_response_payload()).expect("payload should serialize");
        let object = payload.as_object().expect("payload should be an object");

        assert_eq!(object.len(), 3);
        assert_eq!(payload["title"], json!("Data Check Error"));
        assert_eq!(payload["message"], json!("Something went wrong on user"));
        assert_eq!(payload["detail"], json!("bad range"));
    }

    #[test]
    fn other_error_is_untitled_server_error() {
        let err = DataError::other("report");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.title(), None);
        assert_eq!(err.to_string(), "report: Something went wrong on report");
    }
}
