//! Small blocking HTTP client with a fluent request builder.
//!
//! # Overview
//! Configure a target, path segments, headers, query parameters and a
//! timeout on an `HttpClient`, issue one of `get`, `post`, `put` or
//! `delete`, then consume the `Response` through an `EntityReader`,
//! `copy_to_stream`, or the status and header accessors.
//!
//! # Design
//! - One request per verb call, one connection per request. No pooling, no
//!   retries, no background work; every step blocks the calling thread.
//! - Every verb forces the request onto the wire before returning, so the
//!   status code is available from the `Response` straight away.
//! - The transport sits behind the `Connector` / `Connection` traits. The
//!   default `UreqConnector` is built on `ureq`.
//! - Payload and body formats are caller-supplied strategies (`EntityWriter`,
//!   `EntityReader`); closures work directly.
//! - The caller owns the returned connection: `Response::disconnect` or drop
//!   releases it. Only `get_text_response` disconnects on its own.
//! - TLS toggles live in an explicit `ClientConfig`; see `config`.

pub mod client;
pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod headers;
pub mod http;
pub mod response;
pub mod stream;

pub use client::HttpClient;
pub use config::{ClientConfig, TlsConfig};
pub use connection::{Connection, Connector, UreqConnection, UreqConnector};
pub use entity::{BytesEntityWriter, EntityReader, EntityWriter, JsonEntityReader, JsonEntityWriter, StringEntityReader};
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest};
pub use response::Response;
