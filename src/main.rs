//! Checks the inbox once and sends notifications for matching PDF attachments.
//!
//! Configuration comes from the `PYTHON_*` environment variables and `emailText.txt`
//! in the working directory. Set `RUST_LOG` to change verbosity.
//!
//! Exit codes: `0` success, `1` fatal error, `2` completed with fetch or delivery
//! failures.

use pdf_notifier::{NotifierConfig, RunReport};
use std::error::Error as _;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_DEGRADED: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pdf_notifier=info")),
        )
        .with_target(false)
        .init();

    let outcome = match NotifierConfig::from_env() {
        Ok(config) => pdf_notifier::run_once(&config).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(report) if report.is_degraded() => {
            warn!(
                delivery_failures = report.delivery_failures,
                fetch_failures = report.fetch_failures,
                notified = report.notified,
                "Run completed with failures"
            );
            ExitCode::from(EXIT_DEGRADED)
        }
        Ok(report) => {
            log_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(
                category = %e.category(),
                cause = %source_chain(&e),
                "{e}"
            );
            ExitCode::FAILURE
        }
    }
}

fn log_summary(report: &RunReport) {
    info!(
        unread = report.unread,
        pdfs_scanned = report.pdfs_scanned,
        matched = report.matched,
        notified = report.notified,
        "Run completed"
    );
}

/// Joins the `source()` chain below `error` into one line.
fn source_chain(error: &pdf_notifier::Error) -> String {
    let mut causes = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes.join(": ")
}
