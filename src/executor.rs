use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http_body::{Body, Frame, SizeHint};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tokio::time::{Instant, Sleep};

use crate::body::ReplayBody;
use crate::error::{BoxError, Error, ResponseBodyTimeout};
use crate::response::Response;

pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Performs a single attempt of a request.
///
/// The request is handed over by value for every attempt, so an executor can
/// neither keep the caller's body nor change the caller's request.
pub trait RequestExecutor: Send + Sync {
    fn execute(&self, request: http::Request<ReplayBody>)
    -> BoxFuture<'_, Result<Response, BoxError>>;
}

type HyperClient = Client<HttpsConnector<HttpConnector>, ReplayBody>;

/// Default executor: a hyper client speaking HTTP/1.1 and HTTP/2 over plain
/// TCP or rustls.
///
/// Each attempt has one deadline covering the response headers and the
/// whole response body.
#[derive(Clone, Debug)]
pub struct HyperExecutor {
    client: HyperClient,
    request_timeout: Duration,
}

impl HyperExecutor {
    pub fn new(request_timeout: Duration) -> crate::Result<Self> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|source| Error::TransportInit {
                message: source.to_string(),
            })?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http);
        let client = Client::builder(TokioExecutor::new()).build(https);
        Ok(Self {
            client,
            request_timeout: request_timeout.max(Duration::from_millis(1)),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl RequestExecutor for HyperExecutor {
    fn execute(
        &self,
        request: http::Request<ReplayBody>,
    ) -> BoxFuture<'_, Result<Response, BoxError>> {
        Box::pin(async move {
            let deadline = Instant::now() + self.request_timeout;
            let response =
                tokio::time::timeout_at(deadline, self.client.request(request)).await??;
            let response = response.map(|body| DeadlineBody {
                inner: body,
                deadline: Box::pin(tokio::time::sleep_until(deadline)),
                timeout: self.request_timeout,
            });
            Ok(Response::from(response))
        })
    }
}

/// Response body that fails once the attempt's deadline has passed.
struct DeadlineBody {
    inner: Incoming,
    deadline: Pin<Box<Sleep>>,
    timeout: Duration,
}

impl Body for DeadlineBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if let Poll::Ready(frame) = Pin::new(&mut this.inner).poll_frame(cx) {
            return Poll::Ready(frame.map(|frame| frame.map_err(Into::<BoxError>::into)));
        }
        if this.deadline.as_mut().poll(cx).is_ready() {
            let error: BoxError = Box::new(ResponseBodyTimeout {
                timeout: this.timeout,
            });
            return Poll::Ready(Some(Err(error)));
        }
        Poll::Pending
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
