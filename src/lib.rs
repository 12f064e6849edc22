//! `reqretry` wraps an HTTP transport with a pluggable retry strategy.
//!
//! Request bodies are read once and replayed byte for byte on every attempt.
//! A [`RetryPolicy`] decides which response statuses warrant another attempt,
//! and a [`RetryStrategy`] decides how many attempts run and how long to wait
//! between them.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use http::HeaderMap;
//! use reqretry::prelude::{Client, RequestBody, RetryableStatusCodes};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .retry_policy(Arc::new(RetryableStatusCodes::server_errors()))
//!         .try_build()?;
//!
//!     let cancel = CancellationToken::new();
//!     let response = client
//!         .post(
//!             &cancel,
//!             "https://api.example.com/v1/items",
//!             Some(RequestBody::from(r#"{"name":"demo"}"#)),
//!             HeaderMap::new(),
//!         )
//!         .await?;
//!
//!     println!("status={}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! # Defaults
//!
//! - [`NoRetry`]: every request runs exactly one attempt.
//! - [`NeverRetry`]: no status is considered retryable.
//! - [`HyperExecutor`] with a 60 second per-attempt timeout.

mod body;
mod client;
mod error;
mod executor;
mod request;
mod response;
mod retry;
mod util;

pub use crate::body::{MaterializedBody, ReplayBody, RequestBody, ResponseBody};
pub use crate::client::{Client, ClientBuilder};
pub use crate::error::{
    BoxError, ContextCancelled, Error, ErrorCode, ResponseBodyTimeout, TransportErrorKind,
    UnsupportedUri,
};
pub use crate::executor::{HyperExecutor, RequestExecutor};
pub use crate::request::Request;
pub use crate::response::Response;
pub use crate::retry::{
    AttemptFn, AttemptOutcome, NeverRetry, NoRetry, RetryPolicy, RetryStrategy,
    RetryableStatusCodes,
};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::{
        AttemptFn, AttemptOutcome, Client, ClientBuilder, Error, ErrorCode, NeverRetry, NoRetry,
        Request, RequestBody, RequestExecutor, Response, RetryPolicy, RetryStrategy,
        RetryableStatusCodes, TransportErrorKind,
    };
}
