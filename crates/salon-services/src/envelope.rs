//! # Response Envelope
//!
//! What a boundary (HTTP handler, desktop command, CLI) hands back:
//!
//! ```json
//! { "success": true,  "data": { ... } }
//! { "success": false, "error": { "code": "STATE_CONFLICT",
//!                                "message": "Sale 42 has already been paid" } }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use salon_core::{CoreError, CoreResult, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable discriminant
    pub code: ErrorKind,

    /// Human-readable reason, ready to show or translate
    pub message: String,
}

impl From<&CoreError> for ErrorBody {
    fn from(err: &CoreError) -> Self {
        ErrorBody {
            code: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(err: &CoreError) -> Self {
        Envelope {
            success: false,
            data: None,
            error: Some(ErrorBody::from(err)),
        }
    }

    /// Wraps a use-case result, logging the failure once here so callers
    /// don't have to.
    pub fn from_result(operation: &str, result: CoreResult<T>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(err) => {
                match err.kind() {
                    ErrorKind::StorageError => {
                        error!(operation, error = %err, "Operation failed")
                    }
                    kind => warn!(operation, code = ?kind, error = %err, "Operation rejected"),
                }
                Envelope::err(&err)
            }
        }
    }
}

impl<T> From<CoreResult<T>> for Envelope<T> {
    fn from(result: CoreResult<T>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(err) => Envelope::err(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let envelope = Envelope::ok(vec!["a", "b"]);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "success": true, "data": ["a", "b"] })
        );
    }

    #[test]
    fn test_failure_shape() {
        let err = CoreError::conflict(salon_core::register::ALREADY_OPEN_MESSAGE);
        let envelope: Envelope<()> = Envelope::from_result("open_register", Err(err));

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": false,
                "error": {
                    "code": "STATE_CONFLICT",
                    "message": "Cannot open a new cash register while another one is already open"
                }
            })
        );
    }

    #[test]
    fn test_not_found_message() {
        let envelope: Envelope<u8> = Err(CoreError::not_found("Sale", "s-1")).into();
        let body = envelope.error.unwrap();
        assert_eq!(body.code, ErrorKind::NotFound);
        assert_eq!(body.message, "Sale not found: s-1");
    }

    #[test]
    fn test_storage_failure() {
        let err = CoreError::storage("database is locked");
        let envelope: Envelope<u8> = Envelope::from_result("pay_sale", Err(err));

        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        let body = envelope.error.unwrap();
        assert_eq!(body.code, ErrorKind::StorageError);
        assert_eq!(body.message, "Storage failure: database is locked");
    }
}
