//! Assertion helpers for harness runs.
//!
//! These are pure functions that check recorded outcomes after a run. The
//! sequencer never calls them; correctness checking sits on top of the
//! recorded report.

use kvprobe_types::{CommandOutcome, DispatchOutcome};

/// Result of an assertion check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Description of what was checked
    pub description: String,
    /// Details on failure
    pub failure_details: Option<String>,
}

impl AssertionResult {
    /// Create a passing result.
    pub fn pass(description: &str) -> Self {
        Self {
            passed: true,
            description: description.into(),
            failure_details: None,
        }
    }

    /// Create a failing result.
    pub fn fail(description: &str, details: &str) -> Self {
        Self {
            passed: false,
            description: description.into(),
            failure_details: Some(details.into()),
        }
    }
}

/// Assert that a run recorded exactly `expected` outcomes.
pub fn assert_outcome_count(outcomes: &[CommandOutcome], expected: usize) -> AssertionResult {
    if outcomes.len() == expected {
        AssertionResult::pass(&format!("Recorded {expected} outcomes"))
    } else {
        AssertionResult::fail(
            "Outcome count check",
            &format!("Expected {expected} outcomes, got {}", outcomes.len()),
        )
    }
}

/// Assert that no command exhausted its retries.
pub fn assert_all_answered(outcomes: &[CommandOutcome]) -> AssertionResult {
    let unanswered: Vec<String> = outcomes
        .iter()
        .filter(|o| !o.outcome.is_answered())
        .map(|o| format!("#{} {} on {}", o.index, o.command, o.node))
        .collect();

    if unanswered.is_empty() {
        AssertionResult::pass(&format!("All {} commands answered", outcomes.len()))
    } else {
        AssertionResult::fail(
            "All commands answered",
            &format!(
                "{}/{} commands got no answer: {}",
                unanswered.len(),
                outcomes.len(),
                unanswered.join(", ")
            ),
        )
    }
}

/// Assert that one command was answered with exactly `expected`.
pub fn assert_response_eq(outcome: &CommandOutcome, expected: &str) -> AssertionResult {
    let description = format!("#{} {} returns {:?}", outcome.index, outcome.command, expected);
    match &outcome.outcome {
        DispatchOutcome::Answered { response, .. } if response == expected => {
            AssertionResult::pass(&description)
        }
        DispatchOutcome::Answered { response, .. } => AssertionResult::fail(
            &description,
            &format!("node {} answered {:?}", outcome.node, response),
        ),
        DispatchOutcome::Exhausted { attempts } => AssertionResult::fail(
            &description,
            &format!("node {} gave no answer after {attempts} attempts", outcome.node),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvprobe_types::{Command, NodeEndpoint};

    fn outcome(index: usize, result: DispatchOutcome) -> CommandOutcome {
        CommandOutcome {
            index,
            node: NodeEndpoint::new("kvstore1", 8081).unwrap(),
            command: Command::get("session:user1").unwrap(),
            outcome: result,
            elapsed_ms: 0,
        }
    }

    fn answered(text: &str) -> DispatchOutcome {
        DispatchOutcome::Answered {
            response: text.into(),
            attempts: 1,
        }
    }

    #[test]
    fn count_passes_and_fails() {
        let outcomes = vec![outcome(0, answered("OK")), outcome(1, answered("OK"))];
        assert!(assert_outcome_count(&outcomes, 2).passed);

        let result = assert_outcome_count(&outcomes, 9);
        assert!(!result.passed);
        assert!(result.failure_details.unwrap().contains("got 2"));
    }

    #[test]
    fn all_answered_lists_missing_commands() {
        let outcomes = vec![
            outcome(0, answered("OK")),
            outcome(1, DispatchOutcome::Exhausted { attempts: 3 }),
        ];

        let result = assert_all_answered(&outcomes);
        assert!(!result.passed);
        let details = result.failure_details.unwrap();
        assert!(details.contains("1/2"));
        assert!(details.contains("#1 GET session:user1 on kvstore1:8081"));

        assert!(assert_all_answered(&outcomes[..1]).passed);
    }

    #[test]
    fn response_eq_checks_text() {
        assert!(assert_response_eq(&outcome(0, answered("{token:xyz123}")), "{token:xyz123}").passed);

        let wrong = assert_response_eq(&outcome(0, answered("NOT_FOUND")), "{token:xyz123}");
        assert!(!wrong.passed);
        assert!(wrong.failure_details.unwrap().contains("NOT_FOUND"));
    }

    #[test]
    fn exhausted_never_matches_empty_expectation() {
        let result = assert_response_eq(&outcome(0, DispatchOutcome::Exhausted { attempts: 3 }), "");
        assert!(!result.passed);
        assert!(result.failure_details.unwrap().contains("no answer"));

        assert!(assert_response_eq(&outcome(0, answered("")), "").passed);
    }
}
