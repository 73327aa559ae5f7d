//! Results of dispatching commands.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Command, NodeEndpoint};

/// Terminal result of one dispatch call.
///
/// `Exhausted` means "no answer obtained after every attempt". It is not an
/// empty server reply: a node that answers with a bare newline produces
/// `Answered` with an empty `response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A connection completed and the response was read.
    Answered {
        /// Trimmed response text.
        response: String,
        /// Attempt number that succeeded (1-based).
        attempts: u32,
    },
    /// Every attempt failed.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl DispatchOutcome {
    /// Returns true if a response was obtained.
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }

    /// The response, if any.
    pub fn response(&self) -> Option<&str> {
        match self {
            Self::Answered { response, .. } => Some(response),
            Self::Exhausted { .. } => None,
        }
    }

    /// The response text, or `""` when retries were exhausted.
    pub fn response_text(&self) -> &str {
        self.response().unwrap_or("")
    }

    /// Number of attempts the call used.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Answered { attempts, .. } | Self::Exhausted { attempts } => *attempts,
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answered { response, .. } => f.write_str(response),
            Self::Exhausted { attempts } => write!(f, "<no answer after {attempts} attempts>"),
        }
    }
}

/// One recorded step of a sequencer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Position of the command in the sequence (0-based).
    pub index: usize,
    /// Node the command was sent to.
    pub node: NodeEndpoint,
    /// The command that was sent.
    pub command: Command,
    /// What came back.
    pub outcome: DispatchOutcome,
    /// Wall time spent in the dispatcher, in milliseconds.
    pub elapsed_ms: u64,
}

/// Everything a sequencer run observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Outcomes in command order.
    pub outcomes: Vec<CommandOutcome>,
    /// Total wall time including warm-up and pacing, in milliseconds.
    pub elapsed_ms: u64,
    /// True if the run stopped early at a sequence boundary.
    pub aborted: bool,
}

impl RunReport {
    /// Number of commands that got a response.
    pub fn answered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_answered())
            .count()
    }

    /// Number of commands that exhausted their retries.
    pub fn exhausted(&self) -> usize {
        self.outcomes.len() - self.answered()
    }

    /// How many commands landed on each node.
    pub fn hits_per_node(&self) -> BTreeMap<NodeEndpoint, usize> {
        let mut hits = BTreeMap::new();
        for outcome in &self.outcomes {
            *hits.entry(outcome.node.clone()).or_insert(0) += 1;
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, port: u16, outcome: DispatchOutcome) -> CommandOutcome {
        CommandOutcome {
            index,
            node: NodeEndpoint::new("localhost", port).unwrap(),
            command: Command::get("k").unwrap(),
            outcome,
            elapsed_ms: 1,
        }
    }

    #[test]
    fn exhausted_text_is_empty_sentinel() {
        let exhausted = DispatchOutcome::Exhausted { attempts: 3 };
        assert_eq!(exhausted.response_text(), "");
        assert_eq!(exhausted.response(), None);
        assert!(!exhausted.is_answered());
        assert_eq!(exhausted.attempts(), 3);
    }

    #[test]
    fn empty_answer_is_distinct_from_exhausted() {
        let empty = DispatchOutcome::Answered {
            response: String::new(),
            attempts: 1,
        };
        assert!(empty.is_answered());
        assert_eq!(empty.response(), Some(""));
        assert_ne!(empty, DispatchOutcome::Exhausted { attempts: 1 });
    }

    #[test]
    fn serializes_with_status_tag() {
        let answered = DispatchOutcome::Answered {
            response: "OK".into(),
            attempts: 2,
        };
        let json = serde_json::to_value(&answered).unwrap();
        assert_eq!(json["status"], "answered");
        assert_eq!(json["response"], "OK");
        assert_eq!(json["attempts"], 2);

        let json = serde_json::to_value(DispatchOutcome::Exhausted { attempts: 3 }).unwrap();
        assert_eq!(json["status"], "exhausted");
    }

    #[test]
    fn report_summaries() {
        let report = RunReport {
            outcomes: vec![
                outcome(
                    0,
                    8081,
                    DispatchOutcome::Answered {
                        response: "OK".into(),
                        attempts: 1,
                    },
                ),
                outcome(1, 8082, DispatchOutcome::Exhausted { attempts: 3 }),
                outcome(
                    2,
                    8081,
                    DispatchOutcome::Answered {
                        response: "v".into(),
                        attempts: 2,
                    },
                ),
            ],
            elapsed_ms: 10,
            aborted: false,
        };

        assert_eq!(report.answered(), 2);
        assert_eq!(report.exhausted(), 1);

        let hits = report.hits_per_node();
        assert_eq!(hits[&NodeEndpoint::new("localhost", 8081).unwrap()], 2);
        assert_eq!(hits[&NodeEndpoint::new("localhost", 8082).unwrap()], 1);
    }

    #[test]
    fn display_marks_exhausted() {
        assert_eq!(
            DispatchOutcome::Exhausted { attempts: 3 }.to_string(),
            "<no answer after 3 attempts>"
        );
    }
}
