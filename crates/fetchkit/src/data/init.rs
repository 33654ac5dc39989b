use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use fetchkit_signal::CancelSignal;
use http::{HeaderMap, HeaderName, HeaderValue};

/// Per-request configuration.
///
/// `method`, `body` and `headers` are handed to the transport untouched.
/// `signal` selects the cancellation mode of the controller for its whole
/// lifetime.
///
/// # Examples
///
/// ```
/// use fetchkit::header::{CONTENT_TYPE, HeaderValue};
/// use fetchkit::{AbortController, RequestInit};
///
/// let controller = AbortController::new();
/// let init = RequestInit::default()
///     .method("POST")
///     .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
///     .body(r#"{"name":"becky"}"#)
///     .signal(controller.signal());
///
/// assert_eq!(init.method, "POST");
/// assert!(init.signal.is_some());
/// ```
#[derive(Clone)]
pub struct RequestInit {
    /// HTTP method. Default: `GET`.
    pub method: String,

    /// Request payload, if any.
    pub body: Option<Bytes>,

    /// Request headers. Repeated names are sent as repeated headers.
    pub headers: HeaderMap,

    /// External cancellation signal.
    pub signal: Option<Arc<dyn CancelSignal>>,
}

impl fmt::Debug for RequestInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestInit")
            .field("method", &self.method)
            .field("body", &self.body.as_ref().map(Bytes::len))
            .field("headers", &self.headers)
            .field("signal", &self.signal.as_ref().map(|s| s.aborted()))
            .finish()
    }
}

impl Default for RequestInit {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            body: None,
            headers: HeaderMap::new(),
            signal: None,
        }
    }
}

impl RequestInit {
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Append a single header, keeping earlier values for the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace all headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attach a cancellation signal, switching the controller to signal mode.
    #[must_use]
    pub fn signal(mut self, signal: impl CancelSignal + 'static) -> Self {
        self.signal = Some(Arc::new(signal));
        self
    }

    /// Attach an already shared cancellation signal.
    #[must_use]
    pub fn shared_signal(mut self, signal: Arc<dyn CancelSignal>) -> Self {
        self.signal = Some(signal);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchkit_signal::AbortSignal;

    #[test]
    fn defaults_to_get_without_signal() {
        let init = RequestInit::default();
        assert_eq!(init.method, "GET");
        assert!(init.body.is_none());
        assert!(init.headers.is_empty());
        assert!(init.signal.is_none());
    }

    #[test]
    fn header_appends_and_headers_replaces() {
        let accept = HeaderName::from_static("accept");
        let init = RequestInit::default()
            .header(accept.clone(), HeaderValue::from_static("text/plain"))
            .header(accept.clone(), HeaderValue::from_static("application/json"));
        assert_eq!(init.headers.get_all(&accept).iter().count(), 2);

        let mut replacement = HeaderMap::new();
        replacement.insert("x-request", HeaderValue::from_static("3"));
        let init = init.headers(replacement.clone());
        assert_eq!(init.headers, replacement);
    }

    #[test]
    fn debug_does_not_dump_body() {
        let init = RequestInit::default()
            .body(vec![0u8; 4096])
            .signal(AbortSignal::abort_now());
        let rendered = format!("{init:?}");
        assert!(rendered.contains("Some(4096)"));
        assert!(rendered.contains("signal: Some(true)"));
    }
}
