//! Sequencer - drives an ordered command list against a node set.
//!
//! After one fixed warm-up delay, each command goes to a node picked
//! uniformly at random, followed by a fixed pacing delay. The sequencer
//! records every outcome and never branches on response content.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kvprobe_core::select_node;
use kvprobe_types::{Command, CommandOutcome, NodeSet, RunReport};
use rand::Rng;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::transport::Transport;

/// Timing for a sequencer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Delay before the first command, giving nodes time to come up.
    pub warmup: Duration,
    /// Delay after every command.
    pub pacing: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(40),
            pacing: Duration::from_millis(500),
        }
    }
}

/// Issues commands one at a time to randomly chosen nodes.
pub struct Sequencer<T: Transport, R: Rng> {
    dispatcher: Dispatcher<T>,
    config: SequencerConfig,
    rng: R,
    abort: Arc<AtomicBool>,
}

impl<T: Transport, R: Rng> Sequencer<T, R> {
    /// Create a sequencer. `rng` drives node selection; seed it for a
    /// reproducible run.
    pub fn new(dispatcher: Dispatcher<T>, config: SequencerConfig, rng: R) -> Self {
        Self {
            dispatcher,
            config,
            rng,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the run before the next command once set.
    ///
    /// A command already in flight always runs to completion.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// The dispatcher commands go through.
    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// Timing in use.
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Run every command once, in order.
    pub async fn run(&mut self, nodes: &NodeSet, commands: &[Command]) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::default();

        info!(
            nodes = nodes.len(),
            commands = commands.len(),
            warmup_ms = millis(self.config.warmup),
            "waiting for nodes to come up"
        );
        sleep(self.config.warmup).await;

        for (index, command) in commands.iter().enumerate() {
            if self.abort.load(Ordering::SeqCst) {
                warn!(index, remaining = commands.len() - index, "run aborted");
                report.aborted = true;
                break;
            }

            let node = select_node(nodes, &mut self.rng).clone();
            let sent_at = Instant::now();
            let outcome = self.dispatcher.dispatch(&node, command).await;

            info!(
                index,
                node = %node,
                command = %command,
                answered = outcome.is_answered(),
                "Response: {}",
                outcome.response_text()
            );
            report.outcomes.push(CommandOutcome {
                index,
                node,
                command: command.clone(),
                outcome,
                elapsed_ms: millis(sent_at.elapsed()),
            });

            sleep(self.config.pacing).await;
        }

        report.elapsed_ms = millis(started.elapsed());
        info!(
            answered = report.answered(),
            exhausted = report.exhausted(),
            elapsed_ms = report.elapsed_ms,
            "run finished"
        );
        report
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
