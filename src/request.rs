use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use tokio_util::sync::CancellationToken;

use crate::body::RequestBody;
use crate::error::{ContextCancelled, Error, UnsupportedUri};
use crate::util::{parse_header_name, parse_header_value};

/// One logical HTTP request, bound to the caller's cancellation token.
///
/// A request is only mutable until it is handed to
/// [`Client::execute`](crate::Client::execute).
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<RequestBody>,
    cancel: CancellationToken,
}

pub(crate) struct RequestParts {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<RequestBody>,
    pub(crate) cancel: CancellationToken,
}

impl Request {
    /// Builds a body-less request.
    ///
    /// Fails with [`Error::RequestCreation`] when `cancel` is already
    /// cancelled, or when `url` is not an absolute http or https URI.
    pub fn new(cancel: &CancellationToken, method: Method, url: &str) -> crate::Result<Self> {
        if cancel.is_cancelled() {
            return Err(Error::request_creation(ContextCancelled));
        }
        let uri = parse_request_uri(url)?;
        Ok(Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: None,
            cancel: cancel.clone(),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn try_header(self, name: &str, value: &str) -> crate::Result<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.header(name, value))
    }

    /// Replaces every header set so far.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub(crate) fn into_parts(self) -> RequestParts {
        RequestParts {
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            body: self.body,
            cancel: self.cancel,
        }
    }
}

fn parse_request_uri(url: &str) -> crate::Result<Uri> {
    let uri: Uri = url.parse().map_err(Error::request_creation)?;
    let unsupported = |reason| {
        Error::request_creation(UnsupportedUri {
            uri: url.to_owned(),
            reason,
        })
    };
    let Some(scheme) = uri.scheme_str() else {
        return Err(unsupported("missing scheme"));
    };
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return Err(unsupported("scheme must be http or https"));
    }
    if uri.host().is_none_or(str::is_empty) {
        return Err(unsupported("missing host"));
    }
    Ok(uri)
}
