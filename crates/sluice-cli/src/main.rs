//! sluice CLI entry point.
//!
//! Usage:
//!   sluice pipe-closure            # Early-stop demonstrations
//!   sluice file-stats [DIR]        # File statistics for DIR (default .)
//!   sluice log-processor [DIR]     # DIR/logs/*.log errors into DIR/results.csv

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use sluice_kernel::{PipelineError, PipelineRunner, RunnerConfig, Scope};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None | Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!("sluice {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }

        Some("pipe-closure") => run_demo(Demo::PipeClosure),

        Some("file-stats") => run_demo(Demo::FileStats(dir_arg(&args))),

        Some("log-processor") => run_demo(Demo::LogProcessor(dir_arg(&args))),

        Some(unknown) => {
            eprintln!("Unknown command: {unknown}");
            eprintln!("Run 'sluice --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(r#"sluice v{}

Usage:
  sluice pipe-closure          Show how closing a pipe stops upstream work
  sluice file-stats [DIR]      Count files by extension, list the largest, sum sizes
  sluice log-processor [DIR]   Extract errors/warnings from DIR/logs/*.log into DIR/results.csv

Options:
  -h, --help                   Show this help
  -V, --version                Show version

Configuration:
  Runner settings (link_capacity, timeout_ms) are read from
  {}
"#,
        env!("CARGO_PKG_VERSION"),
        RunnerConfig::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "<no config directory>".to_string()),
    );
}

enum Demo {
    PipeClosure,
    FileStats(PathBuf),
    LogProcessor(PathBuf),
}

fn dir_arg(args: &[String]) -> PathBuf {
    args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

fn run_demo(demo: Demo) -> Result<ExitCode> {
    let config = RunnerConfig::load().context("Failed to load runner config")?;
    tracing::debug!(?config, "runner config loaded");
    let runner = PipelineRunner::new(config);

    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result: Result<(), PipelineError> = rt.block_on(async {
        // Ctrl-C stops the demo cooperatively; that still counts as success.
        let scope = Scope::new();
        let interrupt = {
            let scope = scope.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupted, cancelling");
                    scope.cancel();
                }
            })
        };

        let result = match &demo {
            Demo::PipeClosure => sluice_cli::pipe_closure(&runner, &scope).await,
            Demo::FileStats(dir) => sluice_cli::file_stats(&runner, &scope, dir).await,
            Demo::LogProcessor(dir) => sluice_cli::log_processor(&runner, &scope, dir).await,
        };
        interrupt.abort();
        result
    });

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
