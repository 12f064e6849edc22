use std::time::Duration;

use http::Method;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Tls,
    Read,
    Timeout,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Read => "read",
            Self::Timeout => "timeout",
            Self::Other => "other",
        };
        formatter.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    RequestCreation,
    InvalidHeaderName,
    InvalidHeaderValue,
    BodyCapture,
    Transport,
    Cancelled,
    TransportInit,
    ReadBody,
    Deserialize,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestCreation => "request_creation",
            Self::InvalidHeaderName => "invalid_header_name",
            Self::InvalidHeaderValue => "invalid_header_value",
            Self::BodyCapture => "body_capture",
            Self::Transport => "transport",
            Self::Cancelled => "cancelled",
            Self::TransportInit => "transport_init",
            Self::ReadBody => "read_body",
            Self::Deserialize => "deserialize",
        }
    }
}

/// Returned as the cause of [`Error::RequestCreation`] when the caller's
/// cancellation token fired before the request was built.
#[derive(Clone, Copy, Debug, Default, Error, PartialEq, Eq)]
#[error("context cancelled before the request was created")]
pub struct ContextCancelled;

/// Returned as the cause of [`Error::RequestCreation`] for URIs that
/// cannot be sent over http or https.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported request uri {uri}: {reason}")]
pub struct UnsupportedUri {
    pub uri: String,
    pub reason: &'static str,
}

/// Returned as the cause of [`Error::ReadBody`] when the default transport's
/// per-attempt deadline passes while the response body is still streaming.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("response body not received within {timeout:?}")]
pub struct ResponseBodyTimeout {
    pub timeout: Duration,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("request creation failed: {source}")]
    RequestCreation {
        #[source]
        source: BoxError,
    },
    #[error("invalid header name {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    #[error("failed to capture request body for {method} {uri}: {source}")]
    BodyCapture {
        method: Method,
        uri: String,
        #[source]
        source: BoxError,
    },
    #[error("http transport error ({kind}) for {method} {uri}: {source}")]
    Transport {
        kind: TransportErrorKind,
        method: Method,
        uri: String,
        #[source]
        source: BoxError,
    },
    #[error("http request cancelled for {method} {uri}")]
    Cancelled { method: Method, uri: String },
    #[error("failed to initialize default transport: {message}")]
    TransportInit { message: String },
    #[error("failed to read response body: {source}")]
    ReadBody {
        #[source]
        source: BoxError,
    },
    #[error("failed to decode response json: {source}; body={body}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl Error {
    pub(crate) fn request_creation(source: impl Into<BoxError>) -> Self {
        Self::RequestCreation {
            source: source.into(),
        }
    }

    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::RequestCreation { .. } => ErrorCode::RequestCreation,
            Self::InvalidHeaderName { .. } => ErrorCode::InvalidHeaderName,
            Self::InvalidHeaderValue { .. } => ErrorCode::InvalidHeaderValue,
            Self::BodyCapture { .. } => ErrorCode::BodyCapture,
            Self::Transport { .. } => ErrorCode::Transport,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
            Self::TransportInit { .. } => ErrorCode::TransportInit,
            Self::ReadBody { .. } => ErrorCode::ReadBody,
            Self::Deserialize { .. } => ErrorCode::Deserialize,
        }
    }

    /// True for failures a retry strategy may re-attempt.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{ContextCancelled, Error, ErrorCode, TransportErrorKind};

    #[test]
    fn request_creation_error_wraps_cause_in_message() {
        let error = Error::request_creation("an error message");
        assert_eq!(error.to_string(), "request creation failed: an error message");
        assert_eq!(error.code(), ErrorCode::RequestCreation);
        assert!(!error.is_transport());
    }

    #[test]
    fn cancelled_context_cause_is_preserved_as_source() {
        let error = Error::request_creation(ContextCancelled);
        let source = std::error::Error::source(&error).expect("source should be kept");
        assert!(source.downcast_ref::<ContextCancelled>().is_some());
    }

    #[test]
    fn transport_error_is_retry_eligible() {
        let error = Error::Transport {
            kind: TransportErrorKind::Connect,
            method: http::Method::GET,
            uri: "http://localhost/".to_owned(),
            source: "connection refused".into(),
        };
        assert!(error.is_transport());
        assert_eq!(error.code().as_str(), "transport");
        assert_eq!(
            error.to_string(),
            "http transport error (connect) for GET http://localhost/: connection refused"
        );
    }
}
