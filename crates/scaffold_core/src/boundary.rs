//! Translation of core errors into transport-level responses.
//!
//! # Responsibility
//! - Map `DataError` to its status and `{title, message, detail}` body.
//! - Treat persistence faults as server errors without leaking internals.
//! - Shape request-body validation failures as `{detail, body}` with 422.

use crate::exceptions::DataError;
use crate::service::ServiceError;
use crate::session::SessionError;
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

pub const STATUS_UNPROCESSABLE_ENTITY: u16 = 422;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Status plus JSON body, ready for any HTTP framework.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub status: u16,
    pub body: Value,
}

/// One per-field validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path to the offending field, e.g. `["body", "email"]`.
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(loc: Vec<String>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

impl ErrorResponse {
    pub fn from_data_error(err: &DataError) -> Self {
        warn!(
            "event=data_error module=boundary status={} name={} message={}",
            err.status_code(),
            err.name(),
            err.message()
        );
        Self {
            status: err.status_code(),
            body: json!(err.to_response_payload()),
        }
    }

    pub fn from_session_error(err: &SessionError) -> Self {
        error!("event=unhandled_error module=boundary status=500 error={err}");
        Self {
            status: STATUS_INTERNAL_SERVER_ERROR,
            body: json!({
                "title": "Internal Server Error",
                "message": "An unexpected error occurred",
                "detail": Value::Null,
            }),
        }
    }

    /// Validation failure body: `{"detail": [...], "body": <original>}`.
    pub fn validation(errors: Vec<FieldError>, body: Value) -> Self {
        Self {
            status: STATUS_UNPROCESSABLE_ENTITY,
            body: json!({ "detail": errors, "body": body }),
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(value: &ServiceError) -> Self {
        match value {
            ServiceError::Data(err) => Self::from_data_error(err),
            ServiceError::Session(err) => Self::from_session_error(err),
        }
    }
}

/// Deserializes a request body into `T`, or returns the 422 response.
pub fn decode_body<T: DeserializeOwned>(body: &Value) -> Result<T, ErrorResponse> {
    T::deserialize(body).map_err(|err| {
        let field_error = FieldError::new(
            vec!["body".to_string()],
            err.to_string(),
            "value_error",
        );
        ErrorResponse::validation(vec![field_error], body.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::{decode_body, ErrorResponse};
    use crate::exceptions::{DataError, KeyAttr};
    use crate::model::user::UserCreate;
    use crate::service::ServiceError;
    use crate::session::SessionError;
    use serde_json::json;

    #[test]
    fn data_errors_keep_their_status_and_payload() {
        let err = ServiceError::Data(DataError::exist(
            "user",
            vec![KeyAttr::new("email", "a@b.com")],
        ));
        let response = ErrorResponse::from(&err);

        assert_eq!(response.status, 409);
        assert_eq!(response.body["title"], json!("Data Already Exists Error"));
        assert_eq!(response.body["detail"], json!(null));
    }

    #[test]
    fn session_errors_become_opaque_500() {
        let err = ServiceError::Session(SessionError::RecordNotFound {
            table: "users",
            id: 5,
        });
        let response = ErrorResponse::from(&err);

        assert_eq!(response.status, 500);
        assert!(!response.body.to_string().contains("users"));
    }

    #[test]
    fn decode_body_reports_422_with_original_body() {
        let body = json!({"full_name": "No Email"});
        let response = decode_body::<UserCreate>(&body).expect_err("missing email should fail");

        assert_eq!(response.status, 422);
        assert_eq!(response.body["body"], body);
        assert_eq!(response.body["detail"][0]["loc"], json!(["body"]));
        assert!(response.body["detail"][0]["msg"]
            .as_str()
            .expect("msg should be a string")
            .contains("email"));
    }

    #[test]
    fn decode_body_accepts_valid_input() {
        let body = json!({"email": "a@b.com"});
        let decoded = decode_body::<UserCreate>(&body).expect("valid body should decode");
        assert_eq!(decoded.email, "a@b.com");
        assert!(decoded.is_active);
    }
}
