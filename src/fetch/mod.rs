//! The fetch capability handed to page hooks.
//!
//! A context holds either the plain base fetcher or a recording one, which are
//! different closure types. [`Fetcher`] erases them behind one cloneable
//! handle; clones are cheap, so page code can pass copies to spawned tasks.

mod client;
mod request;
mod response;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use client::HttpFetch;
pub use request::{FetchRequest, FetchRequestBuilder};
pub use response::FetchResponse;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure of a single fetch call.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// A heap-allocated, type-erased future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedFetch {
    fn call(&self, req: FetchRequest) -> BoxFuture<Result<FetchResponse, FetchError>>;
}

#[doc(hidden)]
pub type BoxedFetch = Arc<dyn ErasedFetch + Send + Sync + 'static>;

/// Any `Fn(FetchRequest)` returning a future of `Result<FetchResponse, FetchError>`.
pub trait Fetch: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_fetch(self) -> BoxedFetch;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut> private::Sealed for F
where
    F: Fn(FetchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FetchResponse, FetchError>> + Send + 'static,
{
}

impl<F, Fut> Fetch for F
where
    F: Fn(FetchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FetchResponse, FetchError>> + Send + 'static,
{
    fn into_boxed_fetch(self) -> BoxedFetch {
        Arc::new(Closure(self))
    }
}

struct Closure<F>(F);

impl<F, Fut> ErasedFetch for Closure<F>
where
    F: Fn(FetchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResponse, FetchError>> + Send + 'static,
{
    fn call(&self, req: FetchRequest) -> BoxFuture<Result<FetchResponse, FetchError>> {
        Box::pin((self.0)(req))
    }
}

// ── Fetcher handle ────────────────────────────────────────────────────────────

/// A cloneable, thread-safe fetch capability.
///
/// ```rust
/// use fetch_har::fetch::{FetchError, FetchRequest, FetchResponse, Fetcher};
///
/// let fetcher = Fetcher::new(|_req: FetchRequest| async move {
///     Ok::<_, FetchError>(FetchResponse::new(200, "ok"))
/// });
/// ```
#[derive(Clone)]
pub struct Fetcher(BoxedFetch);

impl Fetcher {
    pub fn new(f: impl Fetch) -> Self {
        Self(f.into_boxed_fetch())
    }

    /// Issues `req`. The returned future is `'static`, so it can be spawned.
    pub fn fetch(&self, req: FetchRequest) -> BoxFuture<Result<FetchResponse, FetchError>> {
        self.0.call(req)
    }

    /// Whether both handles point at the same underlying capability.
    pub fn same_as(&self, other: &Fetcher) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fetcher(..)")
    }
}
