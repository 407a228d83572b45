//! Error types for the fluent HTTP client.
//!
//! # Design
//! Configuration problems (`MissingTarget`, `InvalidUrl`) are reported before
//! any connection is opened. Everything the transport or an entity strategy
//! raises travels as `Io` unchanged. `FailureResponse` is the one enriched
//! case: the success body could not be opened and the server sent an error
//! body, so the original message is extended with that body's text while the
//! original error stays reachable through `source()`.

use std::io;
use std::path::PathBuf;

/// Errors returned by `HttpClient` verbs and `Response` accessors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A verb was issued before `set_target` was called.
    #[error("no target set; call set_target before issuing a request")]
    MissingTarget,

    /// The assembled `target + path + query` string is not a valid URL.
    #[error("malformed URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Transport failure, or a failure raised by an entity reader/writer.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Opening the response body failed and the server supplied an error
    /// body. `body` is the error body rendered as `[line1, line2, ...]`.
    #[error("{message}: {body}")]
    FailureResponse {
        message: String,
        body: String,
        #[source]
        source: io::Error,
    },

    /// The configured client identity file could not be used.
    #[error("client identity {}: {reason}", .path.display())]
    ClientCertificate { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
