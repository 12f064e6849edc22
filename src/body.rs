//! Request bodies and their replayable copies.
//!
//! A [`RequestBody`] is read exactly once per [`Client::execute`] call into a
//! [`MaterializedBody`]. Every attempt then receives its own [`ReplayBody`]
//! over the same buffer, so retries resend identical bytes without copying.
//!
//! [`Client::execute`]: crate::Client::execute

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http_body::{Body, Frame, SizeHint};
use http_body_util::combinators::{BoxBody, UnsyncBoxBody};
use http_body_util::{BodyExt, Full, StreamBody};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::BoxError;

/// Body stream of a [`Response`](crate::Response), read at most once.
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// The original, single-use body of a [`Request`](crate::Request).
pub struct RequestBody {
    inner: BoxBody<Bytes, BoxError>,
}

impl RequestBody {
    pub fn from_bytes(body: impl Into<Bytes>) -> Self {
        Self::from_body(Full::new(body.into()))
    }

    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let frames = stream.map(|item| item.map(Frame::data).map_err(Into::<BoxError>::into));
        Self {
            inner: BodyExt::boxed(StreamBody::new(frames)),
        }
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        Self::from_stream(ReaderStream::new(reader))
    }

    pub fn from_body<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            inner: body.map_err(Into::<BoxError>::into).boxed(),
        }
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RequestBody")
            .field("size_hint", &self.inner.size_hint())
            .finish_non_exhaustive()
    }
}

impl From<Bytes> for RequestBody {
    fn from(body: Bytes) -> Self {
        Self::from_bytes(body)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(body: Vec<u8>) -> Self {
        Self::from_bytes(body)
    }
}

impl From<String> for RequestBody {
    fn from(body: String) -> Self {
        Self::from_bytes(body)
    }
}

impl From<&'static str> for RequestBody {
    fn from(body: &'static str) -> Self {
        Self::from_bytes(body)
    }
}

impl From<&'static [u8]> for RequestBody {
    fn from(body: &'static [u8]) -> Self {
        Self::from_bytes(body)
    }
}

/// Buffered copy of a request body, captured once and replayed per attempt.
///
/// `None` means the request had no body at all, which is distinct from an
/// empty body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterializedBody {
    bytes: Option<Bytes>,
}

impl MaterializedBody {
    /// Drains `body` into memory and drops the original stream.
    ///
    /// An absent body is not an error. Any frame error aborts the capture and
    /// discards what was read so far.
    pub async fn capture(body: Option<RequestBody>) -> Result<Self, BoxError> {
        let Some(body) = body else {
            return Ok(Self::default());
        };
        let collected = body.inner.collect().await?;
        Ok(Self {
            bytes: Some(collected.to_bytes()),
        })
    }

    /// Returns a fresh, independently positioned view, or `None` when the
    /// request had no body.
    pub fn replay(&self) -> Option<ReplayBody> {
        self.bytes.clone().map(ReplayBody::new)
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        self.bytes.as_ref()
    }

    pub fn is_absent(&self) -> bool {
        self.bytes.is_none()
    }
}

/// Body handed to a [`RequestExecutor`](crate::RequestExecutor) for one attempt.
///
/// Reading it never affects any other view of the same [`MaterializedBody`].
#[derive(Clone, Debug, Default)]
pub struct ReplayBody {
    remaining: Option<Bytes>,
    present: bool,
}

impl ReplayBody {
    pub(crate) fn new(bytes: Bytes) -> Self {
        Self {
            remaining: Some(bytes),
            present: true,
        }
    }

    /// Body of a request that was built without one.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        !self.present
    }

    /// Bytes not yet yielded by this view.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        self.remaining.as_ref()
    }
}

impl Body for ReplayBody {
    type Data = Bytes;
    type Error = std::convert::Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let chunk = self.get_mut().remaining.take().filter(|bytes| !bytes.is_empty());
        Poll::Ready(chunk.map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        self.remaining.as_ref().is_none_or(Bytes::is_empty)
    }

    fn size_hint(&self) -> SizeHint {
        let len = self.remaining.as_ref().map_or(0, Bytes::len);
        SizeHint::with_exact(len as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;
    use futures_util::stream;
    use http_body::Body;
    use http_body_util::BodyExt;

    use super::{MaterializedBody, ReplayBody, RequestBody};

    const REQUEST_BODY: &str = r#"{ "id": "me" }"#;

    async fn read_all(body: ReplayBody) -> Bytes {
        body.collect()
            .await
            .unwrap_or_else(|never| match never {})
            .to_bytes()
    }

    #[tokio::test]
    async fn capture_reads_the_whole_body() {
        let body = RequestBody::from_stream(stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from_static(b"{ \"id\"")),
            Ok(Bytes::from_static(b": \"me\" }")),
        ]));

        let captured = MaterializedBody::capture(Some(body))
            .await
            .expect("capture should succeed");

        assert_eq!(
            captured.as_bytes().map(|bytes| &bytes[..]),
            Some(REQUEST_BODY.as_bytes())
        );
    }

    #[tokio::test]
    async fn capture_of_absent_body_is_absent() {
        let captured = MaterializedBody::capture(None)
            .await
            .expect("absent body is not an error");

        assert!(captured.is_absent());
        assert!(captured.replay().is_none());
    }

    #[tokio::test]
    async fn capture_keeps_empty_body_distinct_from_absent() {
        let captured = MaterializedBody::capture(Some(RequestBody::from_bytes(Bytes::new())))
            .await
            .expect("capture should succeed");

        assert!(!captured.is_absent());
        let view = captured.replay().expect("empty body still replays");
        assert!(!view.is_absent());
        assert!(view.is_end_stream());
        assert!(read_all(view).await.is_empty());
    }

    #[tokio::test]
    async fn capture_fails_when_the_stream_errors() {
        let body = RequestBody::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "cannot read")),
        ]));

        let error = MaterializedBody::capture(Some(body))
            .await
            .expect_err("stream error should abort capture");

        assert_eq!(error.to_string(), "cannot read");
    }

    #[tokio::test]
    async fn capture_reads_async_readers() {
        let body = RequestBody::from_reader(io::Cursor::new(REQUEST_BODY.as_bytes().to_vec()));

        let captured = MaterializedBody::capture(Some(body))
            .await
            .expect("capture should succeed");

        assert_eq!(
            captured.as_bytes(),
            Some(&Bytes::from_static(REQUEST_BODY.as_bytes()))
        );
    }

    #[tokio::test]
    async fn replay_views_are_independent() {
        let captured = MaterializedBody::capture(Some(RequestBody::from(REQUEST_BODY)))
            .await
            .expect("capture should succeed");

        let first = captured.replay().expect("body is present");
        let second = captured.replay().expect("body is present");

        assert_eq!(read_all(first).await, REQUEST_BODY.as_bytes());
        assert_eq!(second.size_hint().exact(), Some(REQUEST_BODY.len() as u64));
        assert_eq!(read_all(second).await, REQUEST_BODY.as_bytes());
        assert_eq!(
            read_all(captured.replay().expect("body is present")).await,
            REQUEST_BODY.as_bytes()
        );
    }

    #[test]
    fn absent_replay_body_is_end_of_stream() {
        let body = ReplayBody::absent();
        assert!(body.is_absent());
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }
}
