//! Outgoing fetch request type.

use bytes::Bytes;
use http::Method;

/// A request issued through a [`Fetcher`](super::Fetcher).
///
/// ```rust
/// use fetch_har::fetch::FetchRequest;
/// use http::Method;
///
/// FetchRequest::get("https://postman-echo.com/get?foo1=bar1");
///
/// FetchRequest::builder(Method::POST, "https://api.example.test/graphql")
///     .header("accept", "application/json")
///     .json(br#"{"query":"{ __schema { queryType { name } } }"}"#.to_vec());
/// ```
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl FetchRequest {
    /// `GET` with no headers and no body.
    pub fn get(url: impl Into<String>) -> Self {
        Self::builder(Method::GET, url).no_body()
    }

    pub fn builder(method: Method, url: impl Into<String>) -> FetchRequestBuilder {
        FetchRequestBuilder { method, url: url.into(), headers: Vec::new() }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// ── FetchRequestBuilder ───────────────────────────────────────────────────────

/// Fluent builder for [`FetchRequest`], terminated by a typed body method.
pub struct FetchRequestBuilder {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
}

impl FetchRequestBuilder {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> FetchRequest {
        self.finish("application/json", body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> FetchRequest {
        let body: String = body.into();
        self.finish("text/plain; charset=utf-8", Bytes::from(body))
    }

    /// Terminate with a body of any media type.
    pub fn bytes(self, content_type: &str, body: impl Into<Bytes>) -> FetchRequest {
        self.finish(content_type, body.into())
    }

    pub fn no_body(self) -> FetchRequest {
        FetchRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: Bytes::new(),
        }
    }

    fn finish(self, content_type: &str, body: Bytes) -> FetchRequest {
        let mut headers = self.headers;
        if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
            headers.insert(0, ("content-type".to_owned(), content_type.to_owned()));
        }
        FetchRequest { method: self.method, url: self.url, headers, body }
    }
}
