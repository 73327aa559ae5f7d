//! Dispatch state machine for kvprobe.
//!
//! This module provides a pure, side-effect-free state machine for one
//! dispatch call: connect, send, receive, and retry with a fixed backoff.
//! The state machine takes events as input and produces a new state plus a
//! list of actions to execute.
//!
//! The actual socket I/O is performed by kvprobe-client, not by this module.
//!
//! ```text
//! Idle ─► Connecting ─► Sending ─► Receiving ─► Succeeded
//!             │            │           │
//!             └────────────┴───────────┴─► BackingOff ─► Connecting (attempt + 1)
//!                                      └─► Exhausted   (last attempt)
//! ```

use std::time::Duration;

/// Retry and timeout limits for one dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, each on a fresh connection.
    pub max_attempts: u32,
    /// Fixed wait between a failed attempt and the next one.
    pub backoff: Duration,
    /// Bound on each connect, send, and read operation.
    pub io_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            io_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-call state - NO I/O, just state transitions.
///
/// Attempt numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Call not started.
    Idle,
    /// Opening a connection.
    Connecting {
        /// Current attempt.
        attempt: u32,
    },
    /// Writing the command line.
    Sending {
        /// Current attempt.
        attempt: u32,
    },
    /// Reading the response.
    Receiving {
        /// Current attempt.
        attempt: u32,
    },
    /// Waiting before the next attempt.
    BackingOff {
        /// The attempt that just failed.
        attempt: u32,
    },
    /// A response was read. Terminal.
    Succeeded {
        /// The attempt that succeeded.
        attempt: u32,
    },
    /// Every attempt failed. Terminal.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl DispatchState {
    /// Create a state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function. The caller executes the returned actions in
    /// order and feeds the result of each back in as the next event.
    pub fn on_event(self, policy: &RetryPolicy, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            (Self::Idle, Event::Start) => {
                if policy.max_attempts == 0 {
                    (Self::Exhausted { attempts: 0 }, vec![])
                } else {
                    (
                        Self::Connecting { attempt: 1 },
                        vec![Action::Connect { attempt: 1 }],
                    )
                }
            }

            (Self::Connecting { attempt }, Event::Connected) => {
                (Self::Sending { attempt }, vec![Action::Send])
            }
            // Nothing was opened, so nothing to close.
            (Self::Connecting { attempt }, Event::Failed) => after_failure(attempt, policy, vec![]),

            (Self::Sending { attempt }, Event::Sent) => {
                (Self::Receiving { attempt }, vec![Action::Receive])
            }
            (Self::Sending { attempt } | Self::Receiving { attempt }, Event::Failed) => {
                after_failure(attempt, policy, vec![Action::Close])
            }

            (Self::Receiving { attempt }, Event::ResponseComplete) => {
                (Self::Succeeded { attempt }, vec![Action::Close])
            }

            (Self::BackingOff { attempt }, Event::BackoffElapsed) => {
                let next = attempt.saturating_add(1);
                (
                    Self::Connecting { attempt: next },
                    vec![Action::Connect { attempt: next }],
                )
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// True once the call has succeeded or exhausted its attempts.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Exhausted { .. })
    }

    /// The current (or final) attempt number; 0 before the first attempt.
    pub fn attempt(&self) -> u32 {
        match *self {
            Self::Idle => 0,
            Self::Connecting { attempt }
            | Self::Sending { attempt }
            | Self::Receiving { attempt }
            | Self::BackingOff { attempt }
            | Self::Succeeded { attempt } => attempt,
            Self::Exhausted { attempts } => attempts,
        }
    }
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::new()
    }
}

fn after_failure(
    attempt: u32,
    policy: &RetryPolicy,
    mut actions: Vec<Action>,
) -> (DispatchState, Vec<Action>) {
    if attempt < policy.max_attempts {
        actions.push(Action::Wait {
            delay: policy.backoff,
        });
        (DispatchState::BackingOff { attempt }, actions)
    } else {
        (DispatchState::Exhausted { attempts: attempt }, actions)
    }
}

/// Results fed back into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Caller started the dispatch.
    Start,
    /// Connection established.
    Connected,
    /// Command line fully written and flushed.
    Sent,
    /// Response read finished (newline seen or peer closed).
    ResponseComplete,
    /// Connect, send, or receive failed or timed out.
    Failed,
    /// Backoff wait finished.
    BackoffElapsed,
}

/// Actions to be executed by the dispatcher.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open a fresh connection.
    Connect {
        /// Attempt this connection belongs to.
        attempt: u32,
    },
    /// Write the command line.
    Send,
    /// Read the response.
    Receive,
    /// Release the connection.
    Close,
    /// Sleep before the next attempt.
    Wait {
        /// How long to wait.
        delay: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            ..RetryPolicy::default()
        }
    }

    /// Drive the machine, answering each action from `results` in order.
    /// `Close` consumes nothing; `Wait` always elapses.
    fn drive(policy: &RetryPolicy, results: &[Event]) -> (DispatchState, Vec<Action>) {
        let mut results = results.iter().copied();
        let (mut state, mut pending) = DispatchState::new().on_event(policy, Event::Start);
        let mut executed = Vec::new();

        while !pending.is_empty() {
            let action = pending.remove(0);
            executed.push(action);
            let event = match action {
                Action::Close => continue,
                Action::Wait { .. } => Event::BackoffElapsed,
                _ => results.next().expect("ran out of scripted results"),
            };
            let (next, actions) = state.on_event(policy, event);
            state = next;
            pending.extend(actions);
        }
        (state, executed)
    }

    #[test]
    fn starts_idle() {
        let state = DispatchState::new();
        assert_eq!(state, DispatchState::Idle);
        assert_eq!(state.attempt(), 0);
        assert!(!state.is_terminal());
    }

    #[test]
    fn start_connects_first_attempt() {
        let (state, actions) = DispatchState::Idle.on_event(&policy(3), Event::Start);
        assert_eq!(state, DispatchState::Connecting { attempt: 1 });
        assert_eq!(actions, vec![Action::Connect { attempt: 1 }]);
    }

    #[test]
    fn zero_attempts_exhausts_immediately() {
        let (state, actions) = DispatchState::Idle.on_event(&policy(0), Event::Start);
        assert_eq!(state, DispatchState::Exhausted { attempts: 0 });
        assert!(actions.is_empty());
    }

    #[test]
    fn happy_path_closes_after_success() {
        let (state, executed) = drive(
            &policy(3),
            &[Event::Connected, Event::Sent, Event::ResponseComplete],
        );
        assert_eq!(state, DispatchState::Succeeded { attempt: 1 });
        assert_eq!(
            executed,
            vec![
                Action::Connect { attempt: 1 },
                Action::Send,
                Action::Receive,
                Action::Close,
            ]
        );
    }

    #[test]
    fn connect_failure_backs_off_without_close() {
        let (state, actions) =
            DispatchState::Connecting { attempt: 1 }.on_event(&policy(3), Event::Failed);
        assert_eq!(state, DispatchState::BackingOff { attempt: 1 });
        assert_eq!(
            actions,
            vec![Action::Wait {
                delay: Duration::from_secs(1)
            }]
        );
    }

    #[test]
    fn send_and_receive_failures_close_first() {
        for state in [
            DispatchState::Sending { attempt: 2 },
            DispatchState::Receiving { attempt: 2 },
        ] {
            let (next, actions) = state.on_event(&policy(3), Event::Failed);
            assert_eq!(next, DispatchState::BackingOff { attempt: 2 });
            assert_eq!(actions[0], Action::Close);
            assert!(matches!(actions[1], Action::Wait { .. }));
        }
    }

    #[test]
    fn backoff_elapsed_starts_next_attempt() {
        let (state, actions) =
            DispatchState::BackingOff { attempt: 1 }.on_event(&policy(3), Event::BackoffElapsed);
        assert_eq!(state, DispatchState::Connecting { attempt: 2 });
        assert_eq!(actions, vec![Action::Connect { attempt: 2 }]);
    }

    #[test]
    fn last_attempt_failure_exhausts_without_wait() {
        let (state, actions) =
            DispatchState::Receiving { attempt: 3 }.on_event(&policy(3), Event::Failed);
        assert_eq!(state, DispatchState::Exhausted { attempts: 3 });
        assert_eq!(actions, vec![Action::Close]);
        assert!(state.is_terminal());
    }

    #[test]
    fn all_failures_make_exactly_max_attempts_and_max_minus_one_waits() {
        let (state, executed) = drive(&policy(3), &[Event::Failed, Event::Failed, Event::Failed]);

        assert_eq!(state, DispatchState::Exhausted { attempts: 3 });
        let connects = executed
            .iter()
            .filter(|a| matches!(a, Action::Connect { .. }))
            .count();
        let waits = executed
            .iter()
            .filter(|a| matches!(a, Action::Wait { .. }))
            .count();
        assert_eq!(connects, 3);
        assert_eq!(waits, 2);
    }

    #[test]
    fn transient_failure_recovers_on_next_attempt() {
        let (state, _) = drive(
            &policy(3),
            &[
                Event::Connected,
                Event::Failed, // send fails on attempt 1
                Event::Connected,
                Event::Sent,
                Event::ResponseComplete,
            ],
        );
        assert_eq!(state, DispatchState::Succeeded { attempt: 2 });
    }

    #[test]
    fn every_opened_connection_is_closed() {
        // Attempt 1 fails mid-receive, attempt 2 fails on connect,
        // attempt 3 succeeds.
        let (_, executed) = drive(
            &policy(3),
            &[
                Event::Connected,
                Event::Sent,
                Event::Failed,
                Event::Failed,
                Event::Connected,
                Event::Sent,
                Event::ResponseComplete,
            ],
        );
        let opened = 2; // attempts 1 and 3 connected
        let closes = executed.iter().filter(|a| **a == Action::Close).count();
        assert_eq!(closes, opened);
    }

    #[test]
    fn invalid_transitions_are_ignored() {
        let (state, actions) = DispatchState::Idle.on_event(&policy(3), Event::Sent);
        assert_eq!(state, DispatchState::Idle);
        assert!(actions.is_empty());

        let done = DispatchState::Succeeded { attempt: 1 };
        let (state, actions) = done.on_event(&policy(3), Event::Failed);
        assert_eq!(state, done);
        assert!(actions.is_empty());
    }
}
