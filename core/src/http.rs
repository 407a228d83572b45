//! HTTP request description handed to the transport.
//!
//! # Design
//! `HttpClient` accumulates mutable builder state; every verb call freezes
//! that state into an `HttpRequest` value and passes it to a `Connector`.
//! The request is plain data with owned fields, so it can be logged, compared
//! in tests, and handed to any transport without lifetime concerns.

use std::fmt;
use std::time::Duration;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved HTTP request described as plain data.
///
/// Built by `HttpClient::build_request`. `url` is the full
/// `target + path + query` string, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Connect and read timeout in milliseconds; `0` waits forever.
    pub timeout_ms: u64,
}

impl HttpRequest {
    /// The timeout as a `Duration`, or `None` when no timeout applies.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn is_secure(&self) -> bool {
        self.url
            .get(..8)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
    }
}
