use std::fmt;
use std::time::Duration;

pub const MIB: f64 = 1024.0 * 1024.0;

/// Instrumentation readout of one measured request. The three timestamps are
/// cumulative from request start: connection ready, first response byte, body
/// fully received. They are non-decreasing in that order.
#[derive(Debug, Clone)]
pub struct RequestSample {
    pub status: u16,
    pub pretransfer: Duration,
    pub starttransfer: Duration,
    pub total: Duration,
    pub size_download: u64,
    pub speed_download: f64,
}

/// The three non-overlapping intervals a request decomposes into.
#[derive(Debug, Clone, Copy)]
pub struct Phases {
    pub pre: Duration,
    pub server: Duration,
    pub xfer: Duration,
}

impl RequestSample {
    pub fn phases(&self) -> Phases {
        Phases {
            pre: self.pretransfer,
            server: self.starttransfer.saturating_sub(self.pretransfer),
            xfer: self.total.saturating_sub(self.starttransfer),
        }
    }
}

/// Arithmetic means over all measured requests. Times in seconds, speed in
/// bytes/second (converted to MiB/s for display only).
#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub runs: u64,
    pub avg_bytes: f64,
    pub avg_speed: f64,
    pub avg_pre: f64,
    pub avg_server: f64,
    pub avg_xfer: f64,
}

impl AggregateReport {
    pub fn from_samples(samples: &[RequestSample]) -> Self {
        debug_assert!(!samples.is_empty());
        let n = samples.len() as f64;
        let mut bytes = 0.0;
        let mut speed = 0.0;
        let mut pre = 0.0;
        let mut server = 0.0;
        let mut xfer = 0.0;
        for sample in samples {
            let phases = sample.phases();
            bytes += sample.size_download as f64;
            speed += sample.speed_download;
            pre += phases.pre.as_secs_f64();
            server += phases.server.as_secs_f64();
            xfer += phases.xfer.as_secs_f64();
        }
        Self {
            runs: samples.len() as u64,
            avg_bytes: bytes / n,
            avg_speed: speed / n,
            avg_pre: pre / n,
            avg_server: server / n,
            avg_xfer: xfer / n,
        }
    }
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Average bytes {}, average transfer speed (MB/s): {}",
            self.avg_bytes,
            self.avg_speed / MIB
        )?;
        write!(
            f,
            "Avg pre/server/xfer time (s) {}/{}/{}",
            self.avg_pre, self.avg_server, self.avg_xfer
        )
    }
}
