use crate::error::BenchError;
use url::Url;

pub const DEFAULT_WARMUP_RUNS: u64 = 1000;
pub const DEFAULT_BENCHMARK_RUNS: u64 = 10000;

const DEFAULT_SCHEME: &str = "http";

/// One benchmark run's inputs. Defaults match the flag defaults in `main`.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub target_url: String,
    pub warmup_runs: u64,
    pub benchmark_runs: u64,
    pub print_intermediate: bool,
    /// Accept-Encoding value to advertise, e.g. "lzf" or "gzip". Affects
    /// payload size/speed only, never the timing decomposition.
    pub accept_encoding: Option<String>,
    pub headers: Vec<(String, String)>,
    pub insecure: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            warmup_runs: DEFAULT_WARMUP_RUNS,
            benchmark_runs: DEFAULT_BENCHMARK_RUNS,
            print_intermediate: false,
            accept_encoding: None,
            headers: vec![],
            insecure: false,
        }
    }
}

impl Configuration {
    /// Checks run counts and the target, returning the parsed endpoint URL.
    /// Must pass before any request is issued.
    pub fn validate(&self) -> Result<Url, BenchError> {
        if self.benchmark_runs == 0 {
            return Err(BenchError::Configuration(
                "benchmark runs must be at least 1".into(),
            ));
        }
        self.target()
    }

    /// Parses the target, completing scheme-less values like
    /// `localhost:8080/path` with the default scheme first.
    pub fn target(&self) -> Result<Url, BenchError> {
        let raw = if self.target_url.contains("://") {
            self.target_url.clone()
        } else {
            format!("{DEFAULT_SCHEME}://{}", self.target_url)
        };
        let url = Url::parse(&raw).map_err(|e| {
            BenchError::Configuration(format!("invalid target url '{}': {e}", self.target_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BenchError::Configuration(format!(
                "unsupported scheme '{}': only http and https targets can be benchmarked",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(BenchError::Configuration(format!(
                "target url '{}' has no host",
                self.target_url
            )));
        }
        Ok(url)
    }
}

/// Parser for `--header "name: value"` flags.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("'{raw}' is not a 'name: value' pair"))?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return Err(format!("'{raw}' is not a 'name: value' pair"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(target: &str) -> Configuration {
        Configuration {
            target_url: target.into(),
            ..Configuration::default()
        }
    }

    #[test]
    fn rejects_zero_benchmark_runs() {
        let mut c = config("http://localhost:8080/");
        c.benchmark_runs = 0;
        assert!(matches!(c.validate(), Err(BenchError::Configuration(_))));
    }

    #[test]
    fn completes_missing_scheme() {
        let url = config("localhost:8080/rest/complex/10000").target().unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(8080));
        assert_eq!(url.path(), "/rest/complex/10000");
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(matches!(
            config("ftp://localhost/file").target(),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_malformed_targets() {
        assert!(config("http://").target().is_err());
        assert!(config("").target().is_err());
    }

    #[test]
    fn parses_header_flags() {
        assert_eq!(
            parse_header("x-trace: on").unwrap(),
            ("x-trace".to_string(), "on".to_string())
        );
        assert!(parse_header("no separator").is_err());
        assert!(parse_header(": empty").is_err());
    }
}
