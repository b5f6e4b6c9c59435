use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("connection failure: {0}")]
    Connection(String),

    #[error("request {iteration} failed with status {status}")]
    Service { status: u16, iteration: u64 },
}
