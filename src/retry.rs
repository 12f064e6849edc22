use std::collections::BTreeSet;

use futures_util::future::BoxFuture;
use http::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::response::Response;

/// Decides from a status code whether a response warrants another attempt.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, status: StatusCode) -> bool;
}

impl<F> RetryPolicy for F
where
    F: Fn(StatusCode) -> bool + Send + Sync,
{
    fn should_retry(&self, status: StatusCode) -> bool {
        self(status)
    }
}

/// Default policy: no status code is retried.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn should_retry(&self, _status: StatusCode) -> bool {
        false
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetryableStatusCodes {
    codes: BTreeSet<u16>,
}

impl RetryableStatusCodes {
    pub fn new(codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    /// Every 5xx status.
    pub fn server_errors() -> Self {
        Self::new(500..=599)
    }

    pub fn contains(&self, status: StatusCode) -> bool {
        self.codes.contains(&status.as_u16())
    }
}

impl RetryPolicy for RetryableStatusCodes {
    fn should_retry(&self, status: StatusCode) -> bool {
        self.contains(status)
    }
}

/// Result of a single attempt.
///
/// A retry strategy only needs [`should_retry`](Self::should_retry); the
/// variant decides what the caller of
/// [`Client::execute`](crate::Client::execute) eventually sees.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The executor answered with a status the policy accepts.
    Success(Response),
    /// The executor answered, but the policy asks for another attempt.
    RetryableStatus(Response),
    /// The executor failed before producing a response.
    TransportFailure(Error),
}

impl AttemptOutcome {
    pub fn should_retry(&self) -> bool {
        !matches!(self, Self::Success(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Success(response) | Self::RetryableStatus(response) => Some(response.status()),
            Self::TransportFailure(_) => None,
        }
    }

    /// A retryable status that outlived every attempt is still a response,
    /// not an error.
    pub fn into_result(self) -> crate::Result<Response> {
        match self {
            Self::Success(response) | Self::RetryableStatus(response) => Ok(response),
            Self::TransportFailure(error) => Err(error),
        }
    }
}

/// One attempt of a logical request, run with a (possibly per-attempt)
/// cancellation token.
pub type AttemptFn = dyn FnMut(CancellationToken) -> BoxFuture<'static, AttemptOutcome> + Send;

/// Owns attempt count, delay, and jitter between attempts.
///
/// Implementations must call `attempt` at least once and return the last
/// outcome they observed. Attempts must run one after another.
pub trait RetryStrategy: Send + Sync {
    fn retry<'a>(
        &'a self,
        cancel: CancellationToken,
        attempt: &'a mut AttemptFn,
    ) -> BoxFuture<'a, AttemptOutcome>;
}

/// Default strategy: runs the attempt exactly once.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn retry<'a>(
        &'a self,
        cancel: CancellationToken,
        attempt: &'a mut AttemptFn,
    ) -> BoxFuture<'a, AttemptOutcome> {
        attempt(cancel)
    }
}
