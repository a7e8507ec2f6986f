//! The mask-and-link error taxonomy.
//!
//! One variant per row of the error table: programming/configuration
//! errors and unsupported signature types are fatal (returned as `Err`
//! all the way to the caller); fetch failures and signature-validation
//! failures are instead folded into verdict booleans by the callers in
//! `remote.rs`/`chain.rs` and never surface here directly.

use thiserror::Error;

/// Errors raised by the core mask-and-link operations.
#[derive(Debug, Error)]
pub enum Error {
    /// `mask()` was called without a `nonceurl`.
    #[error("mask requires a nonceurl")]
    MissingNonceUrl,

    /// A required argument was missing or empty (e.g. `maskRemoteResourceAsNewResource`
    /// called with no `url` or no `paths`).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// `resolveConnection` was called with neither a connection nor a token.
    #[error("no connection and no token/domain to build one")]
    MissingCredentials,

    /// Fetching the original plaintext at a mask's `url` failed.
    #[error("fetching original at {url} failed: {source}")]
    OriginalFetchFailed {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Fetching the nonce at a mask's `nonceurl` failed.
    #[error("fetching nonce at {url} failed: {source}")]
    NonceFetchFailed {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Persisting a freshly-generated nonce (PUT) failed.
    #[error("persisting nonce at {url} failed: {source}")]
    NoncePersistFailed {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Persisting the masked resource copy (POST) failed.
    #[error("persisting masked resource copy failed: {source}")]
    CopyPersistFailed {
        #[source]
        source: TransportError,
    },

    /// A signature carried a `"modification"` payload type, which this
    /// core does not implement.
    #[error("modification-type signatures are not supported")]
    ModificationUnsupported,

    /// A signature type other than `"mask"`/`"modification"` was encountered.
    #[error("unrecognized signature payload type: {0}")]
    UnknownSignatureType(String),

    /// The enclosing operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Serialization/deserialization of a JSON value failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The external signer's `sign`/`verify` contract returned an error.
    #[error("signer error: {0}")]
    Signer(String),
}

/// Errors from the transport adapter (`transport.rs`).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote responded with a non-2xx status.
    #[error("http {status} from {url}")]
    Http { status: u16, url: String },

    /// The underlying HTTP client failed (DNS, TLS, connection reset, timeout, ...).
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The response body could not be parsed as JSON.
    #[error("response from {url} was not valid JSON: {message}")]
    InvalidJson { url: String, message: String },

    /// The operation's deadline elapsed before the transport returned.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The enclosing [`Connection`](crate::transport::Connection)'s
    /// cancellation token fired before the request completed.
    #[error("request to {path} cancelled")]
    Cancelled { path: String },
}

impl TransportError {
    /// `true` iff this transport failure originated from cancellation
    /// rather than a genuine fetch/persist failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Fold a [`TransportError`] into an [`Error`], preferring
/// [`Error::Cancelled`] over the caller-supplied wrapper whenever the
/// failure was cancellation rather than a genuine transport failure
/// (§5 "Cancellation").
pub fn wrap_transport_error(
    url: &str,
    source: TransportError,
    wrap: impl FnOnce(String, TransportError) -> Error,
) -> Error {
    if source.is_cancelled() {
        Error::Cancelled
    } else {
        wrap(url.to_string(), source)
    }
}
