//! Run the full command sequence against the node set.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use kvprobe_client::{Dispatcher, Sequencer, TcpTransport};
use kvprobe_core::{assert_all_answered, assert_outcome_count, assert_response_eq, AssertionResult};
use kvprobe_types::RunReport;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::config::{Config, Harness, NodeProfile};

/// Flags for the run command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Force the container node profile.
    pub docker: bool,
    /// Node selection seed, overriding the file.
    pub seed: Option<u64>,
    /// Warm-up override in milliseconds.
    pub warmup_ms: Option<u64>,
    /// Pacing override in milliseconds.
    pub pacing_ms: Option<u64>,
    /// Print the report as JSON on stdout.
    pub json: bool,
    /// Fail when any assertion fails.
    pub strict: bool,
}

/// Run the run command.
pub async fn run(mut config: Config, options: RunOptions) -> Result<()> {
    if let Some(warmup_ms) = options.warmup_ms {
        config.sequence.warmup_ms = warmup_ms;
    }
    if let Some(pacing_ms) = options.pacing_ms {
        config.sequence.pacing_ms = pacing_ms;
    }

    let profile = if options.docker {
        NodeProfile::Docker
    } else {
        NodeProfile::from_env()
    };
    let harness = config.validate(profile)?;

    let seed = options
        .seed
        .or(harness.seed)
        .unwrap_or_else(rand::random::<u64>);
    info!(seed, "node selection seed");

    let mut sequencer = Sequencer::new(
        Dispatcher::new(TcpTransport::new(), harness.policy),
        harness.timing,
        StdRng::seed_from_u64(seed),
    );

    let abort = sequencer.abort_handle();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, abort).await {
            warn!("second interrupt received, exiting immediately");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    let report = sequencer.run(&harness.nodes, &harness.commands).await;
    let results = evaluate(&report, &harness);

    if options.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        println!("{}", json);
        // Keep stdout parseable; the summary goes to stderr.
        eprint!("{}", summary(&report, seed, &results));
    } else {
        for outcome in &report.outcomes {
            println!("Response: {}", outcome.outcome.response_text());
        }
        println!();
        print!("{}", summary(&report, seed, &results));
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    if options.strict && failed > 0 {
        anyhow::bail!("{} of {} assertions failed", failed, results.len());
    }

    Ok(())
}

/// Exit status after a second interrupt (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Set `abort` on the first interrupt so the run stops at the next command
/// boundary. Returns `true` on a second interrupt, and `false` if the signal
/// source fails.
async fn watch_interrupts<S, Fut>(mut next_interrupt: S, abort: Arc<AtomicBool>) -> bool
where
    S: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let mut interrupted = false;
    while next_interrupt().await.is_ok() {
        if interrupted {
            return true;
        }
        interrupted = true;
        warn!("interrupt received, stopping after the current command (again to exit now)");
        abort.store(true, Ordering::SeqCst);
    }
    false
}

/// Check a finished run: every command recorded, every command answered,
/// and each configured `expect` matched.
pub fn evaluate(report: &RunReport, harness: &Harness) -> Vec<AssertionResult> {
    let mut results = vec![
        assert_outcome_count(&report.outcomes, harness.commands.len()),
        assert_all_answered(&report.outcomes),
    ];

    for outcome in &report.outcomes {
        if let Some(Some(expected)) = harness.expectations.get(outcome.index) {
            results.push(assert_response_eq(outcome, expected));
        }
    }

    results
}

/// Human-readable summary of a run and its assertions.
fn summary(report: &RunReport, seed: u64, results: &[AssertionResult]) -> String {
    let mut out = String::new();
    out.push_str("=== kvprobe run ===\n");
    out.push_str(&format!("  Commands:  {}\n", report.outcomes.len()));
    out.push_str(&format!("  Answered:  {}\n", report.answered()));
    out.push_str(&format!("  Exhausted: {}\n", report.exhausted()));
    out.push_str(&format!("  Elapsed:   {} ms\n", report.elapsed_ms));
    out.push_str(&format!("  Seed:      {}\n", seed));
    if report.aborted {
        out.push_str("  Aborted:   yes\n");
    }

    out.push_str("\nHits per node:\n");
    for (node, hits) in report.hits_per_node() {
        out.push_str(&format!("  {:<24} {}\n", node.to_string(), hits));
    }

    out.push_str("\nAssertions:\n");
    for result in results {
        match &result.failure_details {
            None => out.push_str(&format!("  [PASS] {}\n", result.description)),
            Some(details) => {
                out.push_str(&format!("  [FAIL] {}: {}\n", result.description, details))
            }
        }
    }
    out
}
