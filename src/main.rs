// MIT License - free as in freedom; Full license in the LICENSE file
use clap::Parser;
use httpbench::configuration::{
    self, Configuration, DEFAULT_BENCHMARK_RUNS, DEFAULT_WARMUP_RUNS,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Target endpoint, e.g. http://localhost:8080/rest/complex/10000
    url: String,

    /// Untimed requests issued before measurement begins
    #[arg(short, long, default_value_t = DEFAULT_WARMUP_RUNS)]
    warmup_runs: u64,

    /// Timed requests to issue and aggregate
    #[arg(short = 'n', long, default_value_t = DEFAULT_BENCHMARK_RUNS)]
    benchmark_runs: u64,

    /// Print every measured request as it completes
    #[arg(short, long)]
    print_intermediate: bool,

    /// Accept-Encoding value to advertise, e.g. lzf or gzip
    #[arg(short, long)]
    encoding: Option<String>,

    /// Extra request header as 'name: value', may be repeated
    #[arg(short = 'H', long = "header", value_parser = configuration::parse_header)]
    headers: Vec<(String, String)>,

    /// Accept invalid certificates and hostnames on https targets
    #[arg(long)]
    insecure: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Configuration {
        target_url: cli.url,
        warmup_runs: cli.warmup_runs,
        benchmark_runs: cli.benchmark_runs,
        print_intermediate: cli.print_intermediate,
        accept_encoding: cli.encoding,
        headers: cli.headers,
        insecure: cli.insecure,
    };
    match httpbench::run(&config) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
