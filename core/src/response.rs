//! Reading what the server sent back.
//!
//! # Design
//! `Response` owns exactly one `Connection` and adds no state of its own. By
//! the time a verb hands one out, `flush` has already forced the request onto
//! the wire, so the status is known even though the body may still be
//! streaming.
//!
//! The caller decides when the connection goes away: call `disconnect`, or
//! drop the `Response`. Nothing here closes it early.

use std::io::{self, Write};

use tracing::debug;

use crate::connection::Connection;
use crate::entity::{EntityReader, StringEntityReader};
use crate::error::{Error, Result};
use crate::headers::{first_non_empty, parse_header_parameter, CONTENT_TYPE};
use crate::stream::{copy_stream, copy_text};

const DEFAULT_CHARSET: &str = "UTF-8";

pub struct Response {
    connection: Box<dyn Connection>,
}

impl Response {
    pub fn new(connection: Box<dyn Connection>) -> Self {
        Self { connection }
    }

    /// Hand the response body to `reader` and return what it produces.
    pub fn read_entity<T, R>(&mut self, reader: &R) -> Result<T>
    where
        R: EntityReader<T> + ?Sized,
    {
        let mut input = self.input_stream()?;
        Ok(reader.read_entity(&mut *input)?)
    }

    /// The response body stream.
    ///
    /// If the transport refuses to open it (typically a 4xx/5xx status), the
    /// error body is read and folded into the returned error.
    pub fn input_stream(&mut self) -> Result<Box<dyn io::Read>> {
        match self.connection.input_stream() {
            Ok(stream) => Ok(stream),
            Err(err) => Err(self.handle_failure_response(err)),
        }
    }

    /// Attach the server's error body to `err`. With no error body, `err` is
    /// returned as is.
    fn handle_failure_response(&mut self, err: io::Error) -> Error {
        let lines = match self.connection.error_stream() {
            Some(mut stream) => match StringEntityReader.read_entity(&mut *stream) {
                Ok(lines) => lines,
                Err(read_err) => {
                    debug!(error = %read_err, "could not read error body");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        if lines.is_empty() {
            return Error::Io(err);
        }
        Error::FailureResponse {
            message: err.to_string(),
            body: format!("[{}]", lines.join(", ")),
            source: err,
        }
    }

    /// First value of the named response header.
    pub fn header(&self, name: &str) -> Option<String> {
        self.connection.header(name)
    }

    /// Copy the response body into `out`.
    ///
    /// `text/plain` bodies are decoded with the `charset` named in the
    /// `Content-Type` header (UTF-8 when absent or empty) and written as
    /// UTF-8, after which `out` is flushed. Anything else is copied byte for
    /// byte. The body stream is closed afterwards; `out` stays open.
    pub fn copy_to_stream<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        // Body before headers: opening the body may follow a redirect, and
        // the headers must describe the final response.
        let body = self.input_stream()?;
        let content_type = self.header(CONTENT_TYPE);

        match content_type.as_deref() {
            Some(ct) if ct.contains("text/plain") => {
                let charset = parse_header_parameter(ct, "charset");
                let charset = first_non_empty(charset.as_deref(), DEFAULT_CHARSET);
                debug!(charset, "copying text body");
                copy_text(body, charset, out)?;
            }
            _ => {
                debug!(content_type = content_type.as_deref().unwrap_or(""), "copying raw body");
                copy_stream(body, out)?;
            }
        }
        Ok(())
    }

    /// The HTTP status code. Sends the request first if it has not been sent.
    pub fn response_code(&mut self) -> Result<u16> {
        Ok(self.connection.response_code()?)
    }

    /// Force the request onto the wire.
    ///
    /// Some transports only send once the response is asked for, so this asks
    /// for the status. Transports that send eagerly just report it.
    pub fn flush(mut self) -> Result<Self> {
        self.response_code()?;
        Ok(self)
    }

    pub fn connection(&self) -> &dyn Connection {
        self.connection.as_ref()
    }

    pub fn connection_mut(&mut self) -> &mut dyn Connection {
        self.connection.as_mut()
    }

    pub fn into_connection(self) -> Box<dyn Connection> {
        self.connection
    }

    /// Release the connection. Reads after this fail.
    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.connection.url())
            .finish()
    }
}
