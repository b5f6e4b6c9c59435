pub mod configuration;
pub mod error;
pub mod http;
pub mod report;

use configuration::Configuration;
use error::BenchError;
use http::{HttpSession, Transport};
use report::{AggregateReport, MIB};

pub const SUCCESS_STATUS: u16 = 200;

/// Drives the full benchmark: validation, warmup burst, measured burst,
/// aggregation. The session is released on every exit path before the result
/// surfaces.
pub fn run(config: &Configuration) -> Result<AggregateReport, BenchError> {
    let url = config.validate()?;
    let session = HttpSession::new(url, config);
    execute(session, config)
}

fn execute<T: Transport>(
    mut transport: T,
    config: &Configuration,
) -> Result<AggregateReport, BenchError> {
    println!("Warmup: started");
    for _ in 0..config.warmup_runs {
        // status codes are deliberately not inspected during warmup
        transport.perform()?;
    }
    println!("Warmup: finished");

    println!("Benchmark: starting");
    let mut samples = Vec::with_capacity(config.benchmark_runs as usize);
    for iteration in 1..=config.benchmark_runs {
        let sample = transport.perform()?;
        if sample.status != SUCCESS_STATUS {
            return Err(BenchError::Service {
                status: sample.status,
                iteration,
            });
        }
        if config.print_intermediate {
            let phases = sample.phases();
            println!(
                "Bytes: {}, speed (MB/s) {}",
                sample.size_download,
                sample.speed_download / MIB
            );
            println!(
                "Pre-transfer, server processing, and transfer times: {}/{}/{}",
                phases.pre.as_secs_f64(),
                phases.server.as_secs_f64(),
                phases.xfer.as_secs_f64()
            );
        }
        samples.push(sample);
    }
    println!("Benchmark: ending");

    Ok(AggregateReport::from_samples(&samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use report::RequestSample;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    /// Replays a canned reply per `perform` call; counts calls and drops.
    struct ScriptedTransport {
        replies: VecDeque<RequestSample>,
        performed: Rc<Cell<u64>>,
        dropped: Rc<Cell<u64>>,
    }

    impl Transport for ScriptedTransport {
        fn perform(&mut self) -> Result<RequestSample, BenchError> {
            self.performed.set(self.performed.get() + 1);
            self.replies
                .pop_front()
                .ok_or_else(|| BenchError::Connection("connection refused".into()))
        }
    }

    impl Drop for ScriptedTransport {
        fn drop(&mut self) {
            self.dropped.set(self.dropped.get() + 1);
        }
    }

    fn reply(status: u16) -> RequestSample {
        RequestSample {
            status,
            pretransfer: Duration::from_millis(10),
            starttransfer: Duration::from_millis(50),
            total: Duration::from_millis(80),
            size_download: 2048,
            speed_download: 2048.0 / 0.08,
        }
    }

    fn harness(
        replies: Vec<RequestSample>,
    ) -> (ScriptedTransport, Rc<Cell<u64>>, Rc<Cell<u64>>) {
        let performed = Rc::new(Cell::new(0));
        let dropped = Rc::new(Cell::new(0));
        let transport = ScriptedTransport {
            replies: replies.into(),
            performed: performed.clone(),
            dropped: dropped.clone(),
        };
        (transport, performed, dropped)
    }

    fn config(warmup_runs: u64, benchmark_runs: u64) -> Configuration {
        Configuration {
            target_url: "http://localhost:8080/".into(),
            warmup_runs,
            benchmark_runs,
            ..Configuration::default()
        }
    }

    #[test]
    fn collects_exactly_the_configured_number_of_samples() {
        let (transport, performed, dropped) = harness(vec![reply(200); 5]);
        let report = execute(transport, &config(2, 3)).unwrap();
        assert_eq!(report.runs, 3);
        assert_eq!(performed.get(), 5);
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn aborts_on_the_first_non_success_response() {
        let replies = vec![reply(200), reply(500), reply(200), reply(200), reply(200)];
        let (transport, performed, dropped) = harness(replies);
        let result = execute(transport, &config(0, 5));
        match result {
            Err(BenchError::Service { status, iteration }) => {
                assert_eq!(status, 500);
                assert_eq!(iteration, 2);
            }
            other => panic!("expected a service error, got {other:?}"),
        }
        // no request issued past the failing one, session released once
        assert_eq!(performed.get(), 2);
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn warmup_ignores_response_status() {
        let (transport, _, _) = harness(vec![reply(500), reply(200)]);
        assert!(execute(transport, &config(1, 1)).is_ok());
    }

    #[test]
    fn warmup_connection_failure_is_fatal() {
        let (transport, performed, dropped) = harness(vec![]);
        let result = execute(transport, &config(3, 1));
        assert!(matches!(result, Err(BenchError::Connection(_))));
        assert_eq!(performed.get(), 1);
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn zero_warmup_runs_skips_straight_to_measurement() {
        let (transport, performed, _) = harness(vec![reply(200)]);
        let report = execute(transport, &config(0, 1)).unwrap();
        assert_eq!(report.runs, 1);
        assert_eq!(performed.get(), 1);
    }

    #[test]
    fn aggregates_the_measured_burst() {
        let (transport, _, _) = harness(vec![reply(200); 3]);
        let report = execute(transport, &config(0, 3)).unwrap();
        assert!((report.avg_bytes - 2048.0).abs() < 1e-9);
        assert!((report.avg_pre - 0.01).abs() < 1e-9);
        assert!((report.avg_server - 0.04).abs() < 1e-9);
        assert!((report.avg_xfer - 0.03).abs() < 1e-9);
    }
}
