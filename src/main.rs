//! dupescan: content-addressed duplicate detector.
//!
//! Entry point for the CLI.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;

use dupescan::cli::{Cli, OutputFormat};
use dupescan::duplicates::{DuplicateFinder, FinderConfig};
use dupescan::error::ExitCode;
use dupescan::output::{JsonOutput, TextOutput};
use dupescan::progress::{NoopSink, ProgressSink, TerminalSink};
use dupescan::{logging, signal};

fn main() {
    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet);
    let shutdown = signal::install_handler();

    // Progress bars only make sense on an interactive text run.
    let sink: Arc<dyn ProgressSink> = if cli.quiet || cli.output == OutputFormat::Json {
        Arc::new(NoopSink)
    } else {
        Arc::new(TerminalSink::new())
    };

    let config = FinderConfig::default()
        .with_workers(cli.workers)
        .with_partial_size(cli.partial_bytes)
        .with_chunk_size(cli.chunk_bytes)
        .with_batch_size(cli.batch_size)
        .with_memory_efficient(cli.memory_efficient)
        .with_metadata_only(cli.metadata_only)
        .with_ignore_patterns(cli.ignore_patterns.clone())
        .with_shutdown_flag(shutdown.get_flag())
        .with_progress(sink);

    let finder = DuplicateFinder::new(config);
    let report = match finder.find_duplicates(&cli.path) {
        Ok(report) => report,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(e.exit_code().as_i32());
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let write_result = match cli.output {
        OutputFormat::Text => TextOutput::new(&report).write_to(&mut out),
        OutputFormat::Json => JsonOutput::new(&report)
            .write_to(&mut out, cli.pretty)
            .map_err(|e| std::io::Error::other(e.to_string())),
    };
    if let Err(e) = write_result.and_then(|()| out.flush()) {
        // A closed pipe is normal when output is piped into head etc.
        if e.kind() != std::io::ErrorKind::BrokenPipe {
            log::error!("Failed to write report: {}", e);
            std::process::exit(ExitCode::FatalError.as_i32());
        }
    }

    if shutdown.is_shutdown_requested() {
        std::process::exit(ExitCode::Interrupted.as_i32());
    }
    std::process::exit(ExitCode::Success.as_i32());
}
