//! The transport seam: one `Connection` per verb call, opened by a
//! `Connector`.
//!
//! # Design
//! A connection moves through `configured → transmitted → disconnected`.
//! Opening configures the method, URL, headers and timeouts but sends nothing.
//! The request body is buffered through `output_stream`, and the exchange
//! happens on the first call that needs the response (`response_code`,
//! `input_stream`, `error_stream`). Later calls reuse the stored exchange, so
//! asking for the status twice never sends the request twice.
//!
//! `input_stream` fails for 4xx/5xx statuses; the error body stays available
//! through `error_stream`. Streams are returned as owned readers, so a caller
//! can hold the body while still inspecting headers.
//!
//! Dropping a connection releases its socket. Nothing here closes a
//! connection implicitly before it is dropped or `disconnect` is called.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::{debug, trace, warn};
use ureq::http;
use ureq::tls::{ClientCert, PemItem};

use crate::config::{ClientConfig, TlsConfig};
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest};

/// Opens connections for resolved requests.
pub trait Connector {
    fn open(&self, request: &HttpRequest, config: &ClientConfig) -> Result<Box<dyn Connection>>;
}

/// A single live HTTP exchange.
pub trait Connection {
    /// The URL this connection was opened for.
    fn url(&self) -> &str;

    /// Sink for the request body. Only usable before the request is sent.
    fn output_stream(&mut self) -> io::Result<&mut dyn Write>;

    /// Send the request if it has not been sent yet, and return the status.
    fn response_code(&mut self) -> io::Result<u16>;

    /// The response body. Fails if the status is 4xx/5xx or the body was
    /// already taken.
    fn input_stream(&mut self) -> io::Result<Box<dyn Read>>;

    /// The body of a 4xx/5xx response, if there is one left to read.
    fn error_stream(&mut self) -> Option<Box<dyn Read>>;

    /// First value of a response header. Lookup is case-insensitive.
    fn header(&self, name: &str) -> Option<String>;

    /// Release the underlying socket. Streams taken earlier stay readable
    /// only as far as the transport allows.
    fn disconnect(&mut self);
}

/// The message a failed `input_stream` carries for 4xx/5xx statuses.
pub fn status_error(status: u16, url: &str) -> io::Error {
    io::Error::other(format!(
        "Server returned HTTP response code: {status} for URL: {url}"
    ))
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection is disconnected")
}

/// Blocking transport built on `ureq`, one agent per connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqConnector;

impl Connector for UreqConnector {
    fn open(&self, request: &HttpRequest, config: &ClientConfig) -> Result<Box<dyn Connection>> {
        Ok(Box::new(UreqConnection::open(request, config)?))
    }
}

pub struct UreqConnection {
    agent: ureq::Agent,
    method: HttpMethod,
    url: String,
    headers: Vec<(String, String)>,
    payload: Vec<u8>,
    state: State,
}

enum State {
    Configured,
    Transmitted(Exchange),
    Disconnected,
}

struct Exchange {
    status: u16,
    headers: http::HeaderMap,
    body: Option<ureq::Body>,
}

impl UreqConnection {
    pub fn open(request: &HttpRequest, config: &ClientConfig) -> Result<Self> {
        let url = url::Url::parse(&request.url).map_err(|source| Error::InvalidUrl {
            url: request.url.clone(),
            source,
        })?;
        let timeout = request.timeout();

        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(timeout)
            .timeout_recv_response(timeout)
            .timeout_recv_body(timeout)
            .tls_config(tls_config(&config.tls, request.is_secure(), url.as_str())?)
            .build()
            .new_agent();

        debug!(method = %request.method, url = %url, "opened connection");
        Ok(Self {
            agent,
            method: request.method,
            url: url.into(),
            headers: request.headers.clone(),
            payload: Vec::new(),
            state: State::Configured,
        })
    }

    fn transmit(&mut self) -> io::Result<&mut Exchange> {
        if matches!(self.state, State::Configured) {
            let exchange = self.send()?;
            self.state = State::Transmitted(exchange);
        }
        match &mut self.state {
            State::Transmitted(exchange) => Ok(exchange),
            _ => Err(not_connected()),
        }
    }

    fn send(&mut self) -> io::Result<Exchange> {
        let mut builder = http::Request::builder()
            .method(self.method.as_str())
            .uri(self.url.as_str());
        for (name, value) in &self.headers {
            trace!(header = %name, "applying request header");
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = match self.method {
            HttpMethod::Get | HttpMethod::Delete => {
                let request = builder.body(()).map_err(io::Error::other)?;
                self.agent.run(request)
            }
            HttpMethod::Post | HttpMethod::Put => {
                // Kept so a failed send can be retried with the same body.
                let request = builder
                    .body(self.payload.clone())
                    .map_err(io::Error::other)?;
                self.agent.run(request)
            }
        }
        .map_err(into_io)?;

        let (parts, body) = response.into_parts();
        debug!(method = %self.method, url = %self.url, status = parts.status.as_u16(), "request sent");
        Ok(Exchange {
            status: parts.status.as_u16(),
            headers: parts.headers,
            body: Some(body),
        })
    }
}

impl Connection for UreqConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn output_stream(&mut self) -> io::Result<&mut dyn Write> {
        match self.state {
            State::Configured => Ok(&mut self.payload),
            State::Transmitted(_) => Err(io::Error::other(
                "request already sent; the body can no longer be written",
            )),
            State::Disconnected => Err(not_connected()),
        }
    }

    fn response_code(&mut self) -> io::Result<u16> {
        Ok(self.transmit()?.status)
    }

    fn input_stream(&mut self) -> io::Result<Box<dyn Read>> {
        let url = self.url.clone();
        let exchange = self.transmit()?;
        if exchange.status >= 400 {
            return Err(status_error(exchange.status, &url));
        }
        let body = exchange
            .body
            .take()
            .ok_or_else(|| io::Error::other("response body already consumed"))?;
        Ok(Box::new(body.into_reader()))
    }

    fn error_stream(&mut self) -> Option<Box<dyn Read>> {
        let exchange = self.transmit().ok()?;
        if exchange.status < 400 {
            return None;
        }
        let body = exchange.body.take()?;
        Some(Box::new(body.into_reader()))
    }

    fn header(&self, name: &str) -> Option<String> {
        match &self.state {
            State::Transmitted(exchange) => exchange
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            _ => None,
        }
    }

    fn disconnect(&mut self) {
        if !matches!(self.state, State::Disconnected) {
            debug!(url = %self.url, "disconnected");
        }
        self.state = State::Disconnected;
    }
}

fn into_io(err: ureq::Error) -> io::Error {
    match err {
        ureq::Error::Io(err) => err,
        timeout @ ureq::Error::Timeout(_) => io::Error::new(io::ErrorKind::TimedOut, timeout),
        other => io::Error::other(other),
    }
}

fn tls_config(tls: &TlsConfig, secure: bool, url: &str) -> Result<ureq::tls::TlsConfig> {
    let mut builder = ureq::tls::TlsConfig::builder();
    if !secure {
        return Ok(builder.build());
    }
    if tls.disable_hostname_verification {
        warn!(url, "TLS certificate verification disabled for this connection");
        builder = builder.disable_verification(true);
    }
    if let Some(path) = &tls.client_identity {
        builder = builder.client_cert(Some(load_client_identity(path)?));
    }
    Ok(builder.build())
}

fn load_client_identity(path: &Path) -> Result<ClientCert> {
    let invalid = |reason: String| Error::ClientCertificate {
        path: path.to_path_buf(),
        reason,
    };
    let pem = fs::read(path).map_err(|e| invalid(e.to_string()))?;

    let mut chain = Vec::new();
    let mut key = None;
    for item in ureq::tls::parse_pem(&pem) {
        match item.map_err(|e| invalid(e.to_string()))? {
            PemItem::Certificate(cert) => chain.push(cert.to_owned()),
            PemItem::PrivateKey(private_key) => key = Some(private_key.to_owned()),
            _ => {}
        }
    }

    if chain.is_empty() {
        return Err(invalid("no certificate found".to_string()));
    }
    let key = key.ok_or_else(|| invalid("no private key found".to_string()))?;
    debug!(path = %path.display(), certificates = chain.len(), "loaded client identity");
    Ok(ClientCert::new_with_certs(&chain, key))
}

#[cfg(test)]
pub(crate) mod scripted {
    //! In-memory transport for unit tests: replays a canned response and
    //! records what the client did with the connection.

    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, Default)]
    pub(crate) struct Script {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl Script {
        pub fn ok(content_type: &str, body: &[u8]) -> Self {
            Self {
                status: 200,
                headers: vec![("Content-Type".to_string(), content_type.to_string())],
                body: body.to_vec(),
            }
        }

        pub fn status(status: u16, body: &[u8]) -> Self {
            Self {
                status,
                headers: Vec::new(),
                body: body.to_vec(),
            }
        }
    }

    #[derive(Debug, Default)]
    pub(crate) struct Recording {
        pub opened: Vec<HttpRequest>,
        pub payload: Vec<u8>,
        pub transmissions: usize,
        pub writes_after_send: usize,
        pub disconnected: bool,
    }

    #[derive(Clone, Default)]
    pub(crate) struct ScriptedConnector {
        pub script: Script,
        pub recording: Rc<RefCell<Recording>>,
    }

    impl ScriptedConnector {
        pub fn new(script: Script) -> Self {
            Self {
                script,
                recording: Rc::default(),
            }
        }
    }

    impl Connector for ScriptedConnector {
        fn open(&self, request: &HttpRequest, _config: &ClientConfig) -> Result<Box<dyn Connection>> {
            self.recording.borrow_mut().opened.push(request.clone());
            Ok(Box::new(ScriptedConnection::new(
                &request.url,
                self.script.clone(),
                Rc::clone(&self.recording),
            )))
        }
    }

    pub(crate) struct ScriptedConnection {
        url: String,
        script: Script,
        recording: Rc<RefCell<Recording>>,
        sent: bool,
        body: Option<Vec<u8>>,
        sink: RecordingSink,
    }

    struct RecordingSink(Rc<RefCell<Recording>>);

    impl Write for RecordingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut recording = self.0.borrow_mut();
            if recording.transmissions > 0 {
                recording.writes_after_send += 1;
            }
            recording.payload.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ScriptedConnection {
        pub fn new(url: &str, script: Script, recording: Rc<RefCell<Recording>>) -> Self {
            let body = Some(script.body.clone());
            Self {
                url: url.to_string(),
                script,
                sink: RecordingSink(Rc::clone(&recording)),
                recording,
                sent: false,
                body,
            }
        }

        fn transmit(&mut self) {
            if !self.sent {
                self.sent = true;
                self.recording.borrow_mut().transmissions += 1;
            }
        }
    }

    impl Connection for ScriptedConnection {
        fn url(&self) -> &str {
            &self.url
        }

        fn output_stream(&mut self) -> io::Result<&mut dyn Write> {
            Ok(&mut self.sink)
        }

        fn response_code(&mut self) -> io::Result<u16> {
            self.transmit();
            Ok(self.script.status)
        }

        fn input_stream(&mut self) -> io::Result<Box<dyn Read>> {
            self.transmit();
            if self.script.status >= 400 {
                return Err(status_error(self.script.status, &self.url));
            }
            let body = self
                .body
                .take()
                .ok_or_else(|| io::Error::other("response body already consumed"))?;
            Ok(Box::new(Cursor::new(body)))
        }

        fn error_stream(&mut self) -> Option<Box<dyn Read>> {
            self.transmit();
            if self.script.status < 400 {
                return None;
            }
            let body = self.body.take()?;
            Some(Box::new(Cursor::new(body)))
        }

        fn header(&self, name: &str) -> Option<String> {
            self.script
                .headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
        }

        fn disconnect(&mut self) {
            self.recording.borrow_mut().disconnected = true;
        }
    }
}
