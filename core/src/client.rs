//! Fluent request builder.
//!
//! # Design
//! `HttpClient` accumulates a target, path segments, headers, query
//! parameters and a timeout. Each verb call resolves that state into an
//! `HttpRequest`, opens a fresh connection through the configured
//! `Connector`, writes the optional payload, forces the request onto the wire
//! and returns the `Response`. Nothing is shared between verb calls, and the
//! caller owns the returned connection.
//!
//! Headers and query parameters keep insertion order and hold one value per
//! key; setting a key again replaces its value in place. Repeated query keys
//! are not supported.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::ClientConfig;
use crate::connection::{Connector, UreqConnector};
use crate::entity::{EntityWriter, StringEntityReader};
use crate::error::{Error, Result};
use crate::headers::{basic_auth_header_value, AUTHORIZATION};
use crate::http::{HttpMethod, HttpRequest};
use crate::response::Response;

/// Builder for simple blocking HTTP requests.
///
/// ```no_run
/// use fluent_http::HttpClient;
///
/// let lines = HttpClient::new()
///     .set_target("http://myhost:8080")
///     .path("my/uri")
///     .path("path")
///     .header("Accept", "text/plain")
///     .get_text_response()?;
/// # Ok::<(), fluent_http::Error>(())
/// ```
#[derive(Clone)]
pub struct HttpClient {
    target: Option<String>,
    path: String,
    headers: Vec<(String, String)>,
    query_params: Vec<(String, String)>,
    timeout_ms: u64,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            target: None,
            path: String::new(),
            headers: Vec::new(),
            query_params: Vec::new(),
            timeout_ms: 0,
            config: ClientConfig::default(),
            connector: Arc::new(UreqConnector),
        }
    }

    /// Use `config` for every connection this client opens.
    #[must_use]
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Open connections through `connector` instead of the default transport.
    #[must_use]
    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// `{scheme}://{host}:{port}`. Validated only when a request is built.
    #[must_use]
    pub fn set_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Append a path segment (or several, e.g. `"foo/bar"`). Leading and
    /// trailing slashes are ignored; a single `/` separates segments.
    #[must_use]
    pub fn path(mut self, segment: &str) -> Self {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            self.path.push('/');
            self.path.push_str(segment);
        }
        self
    }

    /// Set a request header, replacing any earlier value for `key`. Ignored
    /// when either part is empty.
    #[must_use]
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if !key.is_empty() && !value.is_empty() {
            upsert(&mut self.headers, key, value);
        }
        self
    }

    /// Set `Authorization: Basic ...` from `user:pass`. Ignored when empty.
    #[must_use]
    pub fn set_basic_auth(self, user_and_pass: &str) -> Self {
        if user_and_pass.is_empty() {
            return self;
        }
        self.header(AUTHORIZATION, &basic_auth_header_value(user_and_pass))
    }

    /// Set a query parameter, replacing any earlier value for `key`. Ignored
    /// when `key` is empty. Keys and values are used as given, so encode
    /// them first if they need it.
    #[must_use]
    pub fn query_param(mut self, key: &str, value: &str) -> Self {
        if !key.is_empty() {
            upsert(&mut self.query_params, key, value);
        }
        self
    }

    /// Connect and read timeout in milliseconds. `0` waits forever.
    #[must_use]
    pub fn set_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The accumulated path, e.g. `/a/b`, or empty.
    pub fn resolved_path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// `?k1=v1&k2=v2` in insertion order, or an empty string.
    pub fn query_string(&self) -> String {
        if self.query_params.is_empty() {
            return String::new();
        }
        let pairs: Vec<String> = self
            .query_params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        format!("?{}", pairs.join("&"))
    }

    /// `target + path + query`, checked to be a well-formed URL.
    pub fn url(&self) -> Result<String> {
        let target = self.target.as_deref().ok_or(Error::MissingTarget)?;
        let url = format!("{target}{}{}", self.path, self.query_string());
        url::Url::parse(&url).map_err(|source| Error::InvalidUrl {
            url: url.clone(),
            source,
        })?;
        Ok(url)
    }

    /// Freeze the current state into a request for `method`.
    pub fn build_request(&self, method: HttpMethod) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method,
            url: self.url()?,
            headers: self.headers.clone(),
            timeout_ms: self.timeout_ms,
        })
    }

    pub fn get(&self) -> Result<Response> {
        self.execute(HttpMethod::Get, None)
    }

    pub fn delete(&self) -> Result<Response> {
        self.execute(HttpMethod::Delete, None)
    }

    /// POST, with the payload produced by `writer` if one is given.
    pub fn post(&self, writer: Option<&dyn EntityWriter>) -> Result<Response> {
        self.execute(HttpMethod::Post, writer)
    }

    /// PUT, with the payload produced by `writer` if one is given.
    pub fn put(&self, writer: Option<&dyn EntityWriter>) -> Result<Response> {
        self.execute(HttpMethod::Put, writer)
    }

    /// GET the body as lines of text, then disconnect.
    pub fn get_text_response(&self) -> Result<Vec<String>> {
        let mut response = self.get()?;
        let lines = response.read_entity(&StringEntityReader);
        response.disconnect();
        lines
    }

    fn execute(&self, method: HttpMethod, writer: Option<&dyn EntityWriter>) -> Result<Response> {
        let request = self.build_request(method)?;
        debug!(%method, url = %request.url, headers = request.headers.len(), "executing request");

        let mut connection = self.connector.open(&request, &self.config)?;
        if let Some(writer) = writer {
            writer.write_entity(connection.output_stream()?)?;
        }
        Response::new(connection).flush()
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("target", &self.target)
            .field("path", &self.path)
            .field("headers", &self.headers.len())
            .field("query_params", &self.query_params)
            .field("timeout_ms", &self.timeout_ms)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn upsert(entries: &mut Vec<(String, String)>, key: &str, value: &str) {
    match entries.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value.to_string(),
        None => entries.push((key.to_string(), value.to_string())),
    }
}
