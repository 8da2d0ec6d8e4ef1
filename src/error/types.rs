//! DAO error types

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Header DynamoDB uses to carry the request id
const REQUEST_ID_HEADER: &str = "x-amzn-RequestId";

/// Which side is at fault for a rejected request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFault {
    /// 4xx: the request was malformed, unauthorized, throttled, ...
    Client,
    /// 5xx: the service failed to handle a valid request
    Service,
    Unknown,
}

impl ErrorFault {
    pub fn from_status(status: u16) -> Self {
        match status {
            400..=499 => ErrorFault::Client,
            500..=599 => ErrorFault::Service,
            _ => ErrorFault::Unknown,
        }
    }
}

impl fmt::Display for ErrorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorFault::Client => write!(f, "client"),
            ErrorFault::Service => write!(f, "service"),
            ErrorFault::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DaoError {
    #[error("A unique table name prefix is required (set DYNAMODB_TABLE_PREFIX)")]
    MissingTablePrefix,

    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The request reached DynamoDB and was rejected
    #[error("{operation} on {table} rejected by DynamoDB ({code}, HTTP {status}): {message}")]
    Service {
        operation: &'static str,
        table: String,
        code: String,
        message: String,
        status: u16,
        request_id: Option<String>,
        fault: ErrorFault,
    },

    /// The SDK could not complete the request (network, timeout, bad response)
    #[error("{operation} on {table} failed before DynamoDB answered: {message}")]
    Client {
        operation: &'static str,
        table: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_dynamo::Error),

    #[error("Record has no '{attribute}' primary key attribute")]
    MissingKey { attribute: String },

    #[error("Primary key attribute '{attribute}' must be a string")]
    InvalidKey { attribute: String },

    #[error("Table {table} did not become ACTIVE within {waited:?}")]
    TableNotReady { table: String, waited: Duration },
}

impl DaoError {
    /// Translate an SDK failure for `operation` against `table`
    pub fn from_sdk<E>(operation: &'static str, table: &str, err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        match &err {
            SdkError::ServiceError(service) => {
                let raw = service.raw();
                let status = raw.status().as_u16();
                let inner = service.err();

                DaoError::Service {
                    operation,
                    table: table.to_string(),
                    code: inner.code().unwrap_or("Unknown").to_string(),
                    message: inner
                        .message()
                        .map(str::to_string)
                        .unwrap_or_else(|| DisplayErrorContext(&err).to_string()),
                    status,
                    request_id: raw.headers().get(REQUEST_ID_HEADER).map(str::to_string),
                    fault: ErrorFault::from_status(status),
                }
            }
            _ => DaoError::Client {
                operation,
                table: table.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            },
        }
    }

    /// Emit a single structured error event describing this failure
    pub fn log(&self) {
        match self {
            DaoError::Service {
                operation,
                table,
                code,
                message,
                status,
                request_id,
                fault,
            } => {
                tracing::error!(
                    operation = %operation,
                    table = %table,
                    error_message = %message,
                    http_status = %status,
                    error_code = %code,
                    error_type = %fault,
                    request_id = ?request_id,
                    "Request reached DynamoDB but was rejected"
                );
            }
            DaoError::Client {
                operation,
                table,
                message,
            } => {
                tracing::error!(
                    operation = %operation,
                    table = %table,
                    error_message = %message,
                    "Client failed to communicate with DynamoDB"
                );
            }
            other => {
                tracing::error!(error = %other, "DAO operation failed");
            }
        }
    }

    /// Whether the service rejected the call with the given error code
    pub fn is_code(&self, expected: &str) -> bool {
        matches!(self, DaoError::Service { code, .. } if code == expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::error::ErrorMetadata;
    use aws_sdk_dynamodb::operation::get_item::GetItemError;
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;

    #[test]
    fn test_fault_from_status() {
        assert_eq!(ErrorFault::from_status(400), ErrorFault::Client);
        assert_eq!(ErrorFault::from_status(429), ErrorFault::Client);
        assert_eq!(ErrorFault::from_status(500), ErrorFault::Service);
        assert_eq!(ErrorFault::from_status(302), ErrorFault::Unknown);
    }

    #[test]
    fn test_service_error_translation() {
        let mut raw = HttpResponse::new(StatusCode::try_from(400).unwrap(), SdkBody::empty());
        raw.headers_mut().insert("x-amzn-RequestId", "REQ123");

        let inner = GetItemError::generic(
            ErrorMetadata::builder()
                .code("ValidationException")
                .message("The provided key element does not match the schema")
                .build(),
        );

        let err = DaoError::from_sdk("GetItem", "QA_USERS", SdkError::service_error(inner, raw));

        match &err {
            DaoError::Service {
                operation,
                table,
                code,
                status,
                request_id,
                fault,
                ..
            } => {
                assert_eq!(*operation, "GetItem");
                assert_eq!(table, "QA_USERS");
                assert_eq!(code, "ValidationException");
                assert_eq!(*status, 400);
                assert_eq!(request_id.as_deref(), Some("REQ123"));
                assert_eq!(*fault, ErrorFault::Client);
            }
            other => panic!("expected service error, got {other:?}"),
        }
        assert!(err.is_code("ValidationException"));
        assert!(err.to_string().contains("does not match the schema"));
    }

    #[test]
    fn test_client_error_translation() {
        let sdk_err = SdkError::<GetItemError, HttpResponse>::construction_failure("endpoint unreachable");
        let err = DaoError::from_sdk("GetItem", "QA_USERS", sdk_err);

        assert!(matches!(err, DaoError::Client { operation: "GetItem", .. }));
        assert!(!err.is_code("ValidationException"));
    }

    #[test]
    fn test_missing_prefix_message() {
        assert!(DaoError::MissingTablePrefix
            .to_string()
            .contains("unique table name prefix"));
    }
}
