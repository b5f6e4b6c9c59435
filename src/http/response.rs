use crate::error::BenchError;

/// Status line and headers of one response, parsed from the raw head block
/// (everything before the blank line).
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

/// How the body after this head is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    Length(u64),
    Chunked,
    UntilClose,
}

impl ResponseHead {
    pub fn parse(head: &str) -> Result<Self, BenchError> {
        let malformed = || BenchError::Connection(format!("malformed response head: '{head}'"));
        let mut lines = head.split("\r\n");
        let status_line = lines.next().filter(|l| !l.is_empty()).ok_or_else(malformed)?;
        let mut parts = status_line.split_whitespace();
        let version = parts.next().ok_or_else(malformed)?.to_string();
        let status = parts
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(malformed)?;
        let mut headers = vec![];
        for entry in lines.filter(|l| !l.is_empty()) {
            if let Some((k, v)) = entry.split_once(':') {
                headers.push((k.trim().to_lowercase(), v.trim().to_string()));
            }
        }
        Ok(Self {
            version,
            status,
            headers,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn framing(&self) -> Result<BodyFraming, BenchError> {
        // Bodiless by status, regardless of headers.
        if self.status < 200 || self.status == 204 || self.status == 304 {
            return Ok(BodyFraming::Length(0));
        }
        if self
            .header("transfer-encoding")
            .map_or(false, |v| v.to_lowercase().contains("chunked"))
        {
            return Ok(BodyFraming::Chunked);
        }
        if let Some(v) = self.header("content-length") {
            let n = v.parse::<u64>().map_err(|_| {
                BenchError::Connection(format!("malformed content-length '{v}'"))
            })?;
            return Ok(BodyFraming::Length(n));
        }
        Ok(BodyFraming::UntilClose)
    }

    /// Whether the connection may be reused for the next request.
    pub fn keep_alive(&self) -> bool {
        match self.header("connection").map(|v| v.to_lowercase()) {
            Some(v) if v.contains("close") => false,
            Some(v) if v.contains("keep-alive") => true,
            _ => self.version != "HTTP/1.0",
        }
    }
}
