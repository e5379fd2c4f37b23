//! Unified error type.

/// A boxed, thread-safe error. Page hooks fail with this so that the
/// instrumentation wrapper can hand the exact same value back to its caller.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by fetch-har's fallible operations.
///
/// Failures raised by a wrapped page's own data-loading hook are never
/// converted into this type; they travel through the wrapper untouched as
/// [`BoxError`]s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The `enabled` predicate failed while deciding whether to instrument.
    #[error("instrumentation predicate failed: {0}")]
    Predicate(#[source] BoxError),

    /// The archive recorder could not wrap the base fetcher.
    #[error("recorder setup failed: {0}")]
    Recorder(String),

    /// The archive could not be serialized.
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A downloadable artifact could not be created.
    #[error("artifact: {0}")]
    Artifact(String),

    /// Settings were missing or malformed.
    #[error("config: {0}")]
    Config(String),

    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
