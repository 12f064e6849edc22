use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use http::{HeaderMap, Method, Uri};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::body::{MaterializedBody, ReplayBody, RequestBody};
use crate::error::Error;
use crate::executor::{DEFAULT_REQUEST_TIMEOUT, HyperExecutor, RequestExecutor};
use crate::request::{Request, RequestParts};
use crate::response::Response;
use crate::retry::{AttemptOutcome, NeverRetry, NoRetry, RetryPolicy, RetryStrategy};
use crate::util::{classify_transport_error, redact_uri_for_logs};

/// Runs requests through a retry strategy on top of a request executor.
///
/// Cloning is cheap and clones share the executor, strategy, and policy.
#[derive(Clone)]
pub struct Client {
    executor: Arc<dyn RequestExecutor>,
    retrier: Arc<dyn RetryStrategy>,
    retry_policy: Arc<dyn RetryPolicy>,
}

pub struct ClientBuilder {
    executor: Option<Arc<dyn RequestExecutor>>,
    retrier: Arc<dyn RetryStrategy>,
    retry_policy: Arc<dyn RetryPolicy>,
    request_timeout: Duration,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            executor: None,
            retrier: Arc::new(NoRetry),
            retry_policy: Arc::new(NeverRetry),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Replaces the default hyper transport.
    pub fn executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn retrier(mut self, retrier: Arc<dyn RetryStrategy>) -> Self {
        self.retrier = retrier;
        self
    }

    pub fn retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Per-attempt timeout of the default transport. Ignored when a custom
    /// executor is set.
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout.max(Duration::from_millis(1));
        self
    }

    pub fn try_build(self) -> crate::Result<Client> {
        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(HyperExecutor::new(self.request_timeout)?),
        };
        Ok(Client {
            executor,
            retrier: self.retrier,
            retry_policy: self.retry_policy,
        })
    }

    /// # Panics
    ///
    /// Panics if the default transport cannot be initialized. Use
    /// [`try_build`](Self::try_build) to handle that case.
    pub fn build(self) -> Client {
        match self.try_build() {
            Ok(client) => client,
            Err(error) => panic!("failed to build reqretry client: {error}"),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct AttemptTarget {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    redacted_uri: String,
}

impl AttemptTarget {
    fn build_request(&self, body: Option<ReplayBody>) -> http::Request<ReplayBody> {
        let mut request = http::Request::new(body.unwrap_or_else(ReplayBody::absent));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.headers_mut() = self.headers.clone();
        request
    }
}

impl Client {
    /// Client with the default transport, no retries, and no retryable
    /// statuses.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sends `request`, retrying as the configured strategy decides.
    ///
    /// The body is read once up front and every attempt gets an identical
    /// copy. Transport failures that outlast the strategy are returned as
    /// errors. A retryable status that outlasts the strategy is returned as
    /// the last response, with no error.
    pub async fn execute(&self, request: Request) -> crate::Result<Response> {
        let RequestParts {
            method,
            uri,
            headers,
            body,
            cancel,
        } = request.into_parts();
        let redacted_uri = redact_uri_for_logs(&uri.to_string());

        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                method,
                uri: redacted_uri,
            });
        }

        let body = match MaterializedBody::capture(body).await {
            Ok(body) => body,
            Err(source) => {
                warn!(
                    method = %method,
                    uri = %redacted_uri,
                    error = %source,
                    "failed to capture request body"
                );
                return Err(Error::BodyCapture {
                    method,
                    uri: redacted_uri,
                    source,
                });
            }
        };

        let target = Arc::new(AttemptTarget {
            method,
            uri,
            headers,
            redacted_uri,
        });
        let executor = Arc::clone(&self.executor);
        let retry_policy = Arc::clone(&self.retry_policy);
        let mut attempt_number = 0_usize;
        let mut attempt = move |cancel: CancellationToken| -> BoxFuture<'static, AttemptOutcome> {
            attempt_number += 1;
            Box::pin(run_attempt(
                Arc::clone(&executor),
                Arc::clone(&retry_policy),
                Arc::clone(&target),
                body.replay(),
                cancel,
                attempt_number,
            ))
        };

        self.retrier
            .retry(cancel, &mut attempt)
            .await
            .into_result()
    }

    pub async fn get(
        &self,
        cancel: &CancellationToken,
        url: &str,
        headers: HeaderMap,
    ) -> crate::Result<Response> {
        self.send(cancel, Method::GET, url, None, headers).await
    }

    pub async fn post(
        &self,
        cancel: &CancellationToken,
        url: &str,
        body: Option<RequestBody>,
        headers: HeaderMap,
    ) -> crate::Result<Response> {
        self.send(cancel, Method::POST, url, body, headers).await
    }

    pub async fn put(
        &self,
        cancel: &CancellationToken,
        url: &str,
        body: Option<RequestBody>,
        headers: HeaderMap,
    ) -> crate::Result<Response> {
        self.send(cancel, Method::PUT, url, body, headers).await
    }

    pub async fn patch(
        &self,
        cancel: &CancellationToken,
        url: &str,
        body: Option<RequestBody>,
        headers: HeaderMap,
    ) -> crate::Result<Response> {
        self.send(cancel, Method::PATCH, url, body, headers).await
    }

    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        url: &str,
        headers: HeaderMap,
    ) -> crate::Result<Response> {
        self.send(cancel, Method::DELETE, url, None, headers).await
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        method: Method,
        url: &str,
        body: Option<RequestBody>,
        headers: HeaderMap,
    ) -> crate::Result<Response> {
        let mut request = Request::new(cancel, method, url)?.with_headers(headers);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.execute(request).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Client").finish_non_exhaustive()
    }
}

async fn run_attempt(
    executor: Arc<dyn RequestExecutor>,
    retry_policy: Arc<dyn RetryPolicy>,
    target: Arc<AttemptTarget>,
    body: Option<ReplayBody>,
    cancel: CancellationToken,
    attempt: usize,
) -> AttemptOutcome {
    let span = info_span!(
        "reqretry.attempt",
        method = %target.method,
        uri = %target.redacted_uri,
        attempt = attempt
    );
    async move {
        let started = Instant::now();
        let request = target.build_request(body);

        debug!("sending request");
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = executor.execute(request) => Some(result),
        };
        let Some(result) = result else {
            warn!("attempt cancelled");
            return AttemptOutcome::TransportFailure(Error::Cancelled {
                method: target.method.clone(),
                uri: target.redacted_uri.clone(),
            });
        };

        let response = match result {
            Ok(response) => response,
            Err(source) => {
                let error = Error::Transport {
                    kind: classify_transport_error(source.as_ref()),
                    method: target.method.clone(),
                    uri: target.redacted_uri.clone(),
                    source,
                };
                warn!(error = %error, "attempt failed with transport error");
                return AttemptOutcome::TransportFailure(error);
            }
        };

        let status = response.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        if retry_policy.should_retry(status) {
            warn!(status = status.as_u16(), "attempt returned retryable status");
            AttemptOutcome::RetryableStatus(response)
        } else {
            AttemptOutcome::Success(response)
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::header::{CONTENT_TYPE, HeaderValue};
    use http::{HeaderMap, Method};

    use super::{AttemptTarget, Client};

    #[tokio::test]
    async fn default_builder_creates_hyper_transport() {
        let client = Client::builder()
            .request_timeout(Duration::from_secs(1))
            .try_build()
            .expect("default transport should initialize");
        let _clone = client.clone();
    }

    #[test]
    fn attempt_target_builds_independent_requests() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let target = AttemptTarget {
            method: Method::PUT,
            uri: "http://localhost/items/1".parse().expect("valid uri"),
            headers,
            redacted_uri: "http://localhost/items/1".to_owned(),
        };

        let mut first = target.build_request(None);
        first.headers_mut().clear();
        let second = target.build_request(None);

        assert_eq!(second.method(), Method::PUT);
        assert_eq!(second.uri(), "http://localhost/items/1");
        assert_eq!(second.headers()[CONTENT_TYPE], "text/plain");
        assert!(second.body().is_absent());
    }
}
