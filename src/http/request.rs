use std::collections::HashMap;
use url::Url;

/// The fixed GET request sent on every iteration. Rendered once at session
/// build time and replayed verbatim, so no per-request allocation shows up in
/// the measured path.
pub struct HttpRequest {
    headers: HashMap<String, String>,
    url: Url,
}

impl HttpRequest {
    pub fn new(url: Url) -> Self {
        let mut request = Self {
            headers: HashMap::new(),
            url,
        };
        // Ensure minimal headers are present but allow overrides.
        request.headers.insert("accept".into(), "*/*".into());
        request
    }

    /// Advertise a content encoding (e.g. "lzf", "gzip"). Absent by default:
    /// an uninstructed benchmark measures the uncompressed payload.
    pub fn accept_encoding(mut self, encoding: Option<&str>) -> Self {
        if let Some(encoding) = encoding {
            self.headers
                .insert("accept-encoding".into(), encoding.to_string());
        }
        self
    }

    pub fn headers(mut self, headers: &[(String, String)]) -> Self {
        for (k, v) in headers {
            let key = k.to_lowercase();
            if !["host", "cookie"].contains(&key.as_str()) {
                self.headers.insert(key, v.to_string());
            }
        }
        self
    }

    pub fn render(&self) -> String {
        let headers = self
            .headers
            .iter()
            .map(|(k, v)| format!("{k}: {v}\r\n"))
            .collect::<Vec<String>>()
            .join("");
        let path_with_query = match self.url.query() {
            Some(query) => self.url.path().to_string() + "?" + query,
            None => self.url.path().to_string(),
        };
        let optional_port = self
            .url
            .port()
            .map(|port| format!(":{port}"))
            .unwrap_or_default();
        format!(
            "GET {path_with_query} HTTP/1.1\r\n\
            host: {hostname}{optional_port}\r\n\
            {headers}\r\n",
            hostname = self.url.host_str().unwrap_or_default(),
        )
    }
}
