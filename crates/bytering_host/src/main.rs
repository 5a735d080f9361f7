mod demo;
mod stats;
mod stream;
mod throughput;

use anyhow::Result;
use bytering_core::FullPolicy;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
struct Cli {
    /// Log at debug level, or at trace level when built with the `trace`
    /// feature, which also compiles in the ring buffer's own trace records.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PolicyArg {
    Reject,
    Overwrite,
}

impl From<PolicyArg> for FullPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Reject => FullPolicy::Reject,
            PolicyArg::Overwrite => FullPolicy::Overwrite,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LockArg {
    Std,
    Spin,
}

#[derive(Subcommand)]
enum Commands {
    Demo {
        #[arg(long, default_value_t = 16)]
        capacity: usize,
    },
    Stream {
        #[arg(short, long, default_value_t = 1024)]
        capacity: usize,
        #[arg(short, long, default_value_t = 1000)]
        ops: usize,
        #[arg(short, long, value_enum, default_value_t = PolicyArg::Reject)]
        policy: PolicyArg,
        #[arg(short, long, value_enum, default_value_t = LockArg::Std)]
        lock: LockArg,
        #[arg(long)]
        seed: Option<u64>,
    },
    Bench {
        #[arg(short, long, default_value_t = 4096)]
        capacity: usize,
        #[arg(long, default_value_t = 64)]
        buffers: usize,
        #[arg(long, default_value_t = 10_000)]
        rounds: usize,
        #[arg(long, default_value_t = 64)]
        chunk: usize,
    },
}

/// Default log filter; `RUST_LOG` still takes precedence.
fn log_filter(verbose: bool) -> &'static str {
    match (verbose, cfg!(feature = "trace")) {
        (false, _) => "info",
        (true, true) => "trace",
        (true, false) => "debug",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = log_filter(cli.verbose);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Demo { capacity } => {
            demo::run_demo(capacity)?;
        }
        Commands::Stream {
            capacity,
            ops,
            policy,
            lock,
            seed,
        } => {
            let cfg = stream::StreamConfig {
                capacity,
                ops,
                policy: policy.into(),
                seed: seed.unwrap_or_else(rand::random),
            };
            stream::run_stream(cfg, lock)?;
        }
        Commands::Bench {
            capacity,
            buffers,
            rounds,
            chunk,
        } => {
            throughput::run_benchmark(capacity, buffers, rounds, chunk)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_run_logs_at_info() {
        assert_eq!(log_filter(false), "info");
    }

    #[test]
    fn verbose_level_follows_trace_feature() {
        let expected = if cfg!(feature = "trace") { "trace" } else { "debug" };
        assert_eq!(log_filter(true), expected);
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["bytering_host", "demo", "--verbose"]).unwrap();
        assert!(cli.verbose);
        let cli = Cli::try_parse_from(["bytering_host", "demo"]).unwrap();
        assert!(!cli.verbose);
    }
}
