use std::{
    io::{Read, Write},
    net::{IpAddr, TcpStream},
    str::FromStr,
    time::{Duration, Instant},
};

use native_tls::TlsConnector;
use tracing::debug;
use trust_dns_resolver::Resolver as DnsResolver;
use url::Url;

use crate::configuration::Configuration;
use crate::error::BenchError;
use crate::report::RequestSample;

pub mod request;
pub mod response;

use request::HttpRequest;
use response::{BodyFraming, ResponseHead};

const READ_CHUNK: usize = 8 * 1024;

trait ReadAndWrite: Write + Read {}
impl<T: Write + Read> ReadAndWrite for T {}

/// The capability the benchmark loop consumes: one blocking request against
/// the fixed endpoint, returning the instrumentation readout. Release is
/// `Drop`.
pub trait Transport {
    fn perform(&mut self) -> Result<RequestSample, BenchError>;
}

/// Blocking HTTP/1.1 session against one endpoint. Holds at most one live
/// connection and reuses it across requests; response bodies are drained and
/// counted, never stored.
pub struct HttpSession {
    url: Url,
    request: String,
    insecure: bool,
    conn: Option<Conn>,
}

impl HttpSession {
    pub fn new(url: Url, config: &Configuration) -> Self {
        let request = HttpRequest::new(url.clone())
            .accept_encoding(config.accept_encoding.as_deref())
            .headers(&config.headers)
            .render();
        Self {
            url,
            request,
            insecure: config.insecure,
            conn: None,
        }
    }

    fn connect(&self) -> Result<Conn, BenchError> {
        let (addr, dns_duration) = dns_resolve(&self.url)?;
        let port = self
            .url
            .port_or_known_default()
            .ok_or_else(|| BenchError::Connection("target url has no port".into()))?;
        let (stream, connect_duration) = tcp_connect(addr, port)?;
        let (stream, tls_duration) = tls_handshake(stream, &self.url, self.insecure)?;
        debug!(
            ?dns_duration,
            ?connect_duration,
            ?tls_duration,
            "established connection to {addr}:{port}"
        );
        Ok(Conn::new(stream))
    }

    fn exchange(
        &mut self,
        start: Instant,
        pretransfer: Duration,
    ) -> Result<(RequestSample, bool), BenchError> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| BenchError::Connection("no live connection".into()))?;
        conn.stream
            .write_all(self.request.as_bytes())
            .and_then(|_| conn.stream.flush())
            .map_err(|e| {
                BenchError::Connection(format!("cannot send request to {}: {e}", self.url))
            })?;

        let (head_raw, starttransfer) = conn.read_head(start)?;
        let head = ResponseHead::parse(&head_raw)?;
        let framing = head.framing()?;
        let size_download = match framing {
            BodyFraming::Length(n) => conn.discard_exact(n)?,
            BodyFraming::Chunked => conn.discard_chunked()?,
            BodyFraming::UntilClose => conn.discard_to_eof()?,
        };
        let total = start.elapsed();

        let secs = total.as_secs_f64();
        let speed_download = if secs > 0.0 {
            size_download as f64 / secs
        } else {
            0.0
        };
        let reusable = head.keep_alive() && framing != BodyFraming::UntilClose;
        let sample = RequestSample {
            status: head.status,
            pretransfer,
            starttransfer,
            total,
            size_download,
            speed_download,
        };
        Ok((sample, reusable))
    }
}

impl Transport for HttpSession {
    fn perform(&mut self) -> Result<RequestSample, BenchError> {
        let start = Instant::now();
        if self.conn.is_none() {
            self.conn = Some(self.connect()?);
        }
        let pretransfer = start.elapsed();

        match self.exchange(start, pretransfer) {
            Ok((sample, reusable)) => {
                if !reusable {
                    debug!("server closed the connection, next request will re-dial");
                    self.conn = None;
                }
                Ok(sample)
            }
            Err(e) => {
                // A half-read connection cannot be reused.
                self.conn = None;
                Err(e)
            }
        }
    }
}

/// One live connection plus the bytes read past the current parse point.
struct Conn {
    stream: Box<dyn ReadAndWrite>,
    carry: Vec<u8>,
}

impl Conn {
    fn new(stream: Box<dyn ReadAndWrite>) -> Self {
        Self {
            stream,
            carry: Vec::new(),
        }
    }

    /// One blocking read appended to the carry buffer. Ok(0) means EOF.
    fn fill(&mut self) -> Result<usize, BenchError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.stream.read(&mut chunk).map_err(|e| {
            BenchError::Connection(format!("could not read the server's response: {e}"))
        })?;
        self.carry.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    /// Reads up to the head/body separator, returning the head text and the
    /// elapsed time at which the first response bytes arrived.
    fn read_head(&mut self, start: Instant) -> Result<(String, Duration), BenchError> {
        let mut first_byte = if self.carry.is_empty() {
            None
        } else {
            Some(start.elapsed())
        };
        loop {
            if let Some(pos) = self.carry.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&self.carry[..pos]).to_string();
                self.carry.drain(..pos + 4);
                return Ok((head, first_byte.unwrap_or_else(|| start.elapsed())));
            }
            if self.fill()? == 0 {
                return Err(BenchError::Connection(
                    "connection closed before a full response head arrived".into(),
                ));
            }
            if first_byte.is_none() {
                first_byte = Some(start.elapsed());
            }
        }
    }

    fn read_line(&mut self) -> Result<String, BenchError> {
        loop {
            if let Some(pos) = self.carry.windows(2).position(|w| w == b"\r\n") {
                let line = String::from_utf8_lossy(&self.carry[..pos]).to_string();
                self.carry.drain(..pos + 2);
                return Ok(line);
            }
            if self.fill()? == 0 {
                return Err(BenchError::Connection(
                    "connection closed mid-response".into(),
                ));
            }
        }
    }

    /// Discards exactly `n` body bytes.
    fn discard_exact(&mut self, n: u64) -> Result<u64, BenchError> {
        let mut remaining = n;
        loop {
            let take = remaining.min(self.carry.len() as u64) as usize;
            self.carry.drain(..take);
            remaining -= take as u64;
            if remaining == 0 {
                return Ok(n);
            }
            if self.fill()? == 0 {
                return Err(BenchError::Connection(
                    "connection closed mid-response".into(),
                ));
            }
        }
    }

    /// Discards a chunked body, counting payload bytes only.
    fn discard_chunked(&mut self) -> Result<u64, BenchError> {
        let mut total = 0u64;
        loop {
            let line = self.read_line()?;
            let size_str = line.split(';').next().unwrap_or("").trim();
            let size = u64::from_str_radix(size_str, 16).map_err(|_| {
                BenchError::Connection(format!("malformed chunk size '{line}'"))
            })?;
            if size == 0 {
                // trailers end with an empty line
                while !self.read_line()?.is_empty() {}
                return Ok(total);
            }
            self.discard_exact(size)?;
            self.read_line()?;
            total += size;
        }
    }

    /// Discards until EOF for responses delimited by connection close.
    fn discard_to_eof(&mut self) -> Result<u64, BenchError> {
        let mut total = self.carry.len() as u64;
        self.carry.clear();
        loop {
            let mut chunk = [0u8; READ_CHUNK];
            let n = self.stream.read(&mut chunk).map_err(|e| {
                BenchError::Connection(format!("could not read the server's response: {e}"))
            })?;
            if n == 0 {
                return Ok(total);
            }
            total += n as u64;
        }
    }
}

fn dns_resolve(url: &Url) -> Result<(IpAddr, Option<Duration>), BenchError> {
    if url.domain().is_none() {
        // literal address, nothing to resolve
        let mut ip_str = url.host_str().unwrap_or_default();
        if ip_str.starts_with('[') {
            ip_str = &ip_str[1..ip_str.len() - 1];
        }
        match IpAddr::from_str(ip_str) {
            Ok(addr) => Ok((addr, None)),
            Err(e) => Err(BenchError::Connection(e.to_string())),
        }
    } else {
        let resolver = DnsResolver::from_system_conf().map_err(|e| {
            BenchError::Connection(format!("cannot initialise the system resolver: {e}"))
        })?;
        let start = Instant::now();
        let result = resolver.lookup_ip(url.host_str().unwrap_or_default());
        let duration = start.elapsed();
        match result {
            Ok(response) => match response.iter().next() {
                Some(addr) => Ok((addr, Some(duration))),
                None => Err(BenchError::Connection("unresolved hostname".into())),
            },
            Err(e) => Err(BenchError::Connection(e.to_string())),
        }
    }
}

fn tcp_connect(addr: IpAddr, port: u16) -> Result<(TcpStream, Duration), BenchError> {
    let start = Instant::now();
    match TcpStream::connect((addr, port)) {
        Ok(mut stream) => match stream.flush() {
            Ok(_) => Ok((stream, start.elapsed())),
            Err(_) => Err(BenchError::Connection(format!(
                "unexpected I/O errors while connecting to {addr}:{port}"
            ))),
        },
        Err(_) => Err(BenchError::Connection(format!(
            "cannot connect to {addr}:{port}"
        ))),
    }
}

fn tls_handshake(
    stream: TcpStream,
    url: &Url,
    allow_insecure_certificates: bool,
) -> Result<(Box<dyn ReadAndWrite>, Option<Duration>), BenchError> {
    if url.scheme() == "https" {
        let tls_connector = TlsConnector::builder()
            .danger_accept_invalid_hostnames(allow_insecure_certificates)
            .danger_accept_invalid_certs(allow_insecure_certificates)
            .build()
            .map_err(|e| BenchError::Connection(format!("cannot initialise tls: {e}")))?;
        let domain = url.host_str().unwrap_or_default();
        let start = Instant::now();
        match tls_connector.connect(domain, stream) {
            Ok(mut stream) => match stream.flush() {
                Ok(_) => Ok((Box::new(stream), Some(start.elapsed()))),
                Err(_) => Err(BenchError::Connection(format!(
                    "unexpected I/O errors while tls handshake to {domain}"
                ))),
            },
            Err(_) => Err(BenchError::Connection(format!(
                "cannot establish a tls handshake to {domain}"
            ))),
        }
    } else {
        Ok((Box::new(stream), None))
    }
}
