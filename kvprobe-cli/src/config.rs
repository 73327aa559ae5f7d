//! Configuration loading for kvprobe.
//!
//! Configuration is loaded from a TOML file (default: `kvprobe.toml`). Every
//! field has a default, so an absent file or an empty one describes the
//! reference scenario: three local nodes, nine commands, 40s warm-up.

use kvprobe_client::SequencerConfig;
use kvprobe_core::RetryPolicy;
use kvprobe_types::{Command, NodeEndpoint, NodeSet};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "kvprobe.toml";

/// Environment variable that selects the container node profile.
pub const IN_DOCKER_VAR: &str = "IN_DOCKER";

/// Root configuration for kvprobe.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Retry and timeout settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Warm-up and pacing settings.
    #[serde(default)]
    pub sequence: SequenceConfig,
    /// Nodes under test. Empty means "use the environment profile".
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Commands to issue, in order.
    #[serde(default = "default_steps")]
    pub steps: Vec<StepConfig>,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Attempts per command (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Bound on each connect/send/read in milliseconds (default: 30000).
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
    /// Wait between attempts in milliseconds (default: 1000).
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Sequencer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceConfig {
    /// Delay before the first command in milliseconds (default: 40000).
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
    /// Delay after each command in milliseconds (default: 500).
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Node selection seed. Random when absent.
    pub seed: Option<u64>,
}

/// One node address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeConfig {
    /// Host name or IP.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// One command in the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StepConfig {
    /// Request line, without the newline.
    pub command: String,
    /// Response expected by the assertion pass, if any.
    #[serde(default)]
    pub expect: Option<String>,
}

impl StepConfig {
    fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            expect: None,
        }
    }
}

// Default value functions
fn default_max_retries() -> u32 {
    3
}

fn default_io_timeout_ms() -> u64 {
    30_000
}

fn default_backoff_ms() -> u64 {
    1_000
}

fn default_warmup_ms() -> u64 {
    40_000
}

fn default_pacing_ms() -> u64 {
    500
}

fn default_steps() -> Vec<StepConfig> {
    [
        "PUT session:user1 {token:xyz123}",
        "GET session:user1",
        "PUT session:user2 {token:abc456}",
        "GET session:user2",
        "PUT session:user3 {token:def789}",
        "RANGE session:user1 session:user3",
        "PREFIX session:user",
        "REMOVE session:user2",
        "GET session:user2",
    ]
    .into_iter()
    .map(StepConfig::new)
    .collect()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            io_timeout_ms: default_io_timeout_ms(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            warmup_ms: default_warmup_ms(),
            pacing_ms: default_pacing_ms(),
            seed: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            sequence: SequenceConfig::default(),
            nodes: Vec::new(),
            steps: default_steps(),
        }
    }
}

impl DispatchConfig {
    /// Convert to a retry policy, rejecting zero attempts and a zero
    /// I/O timeout.
    pub fn policy(&self) -> Result<RetryPolicy, ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.max_retries must be at least 1".into(),
            ));
        }
        if self.io_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.io_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(RetryPolicy {
            max_attempts: self.max_retries,
            backoff: Duration::from_millis(self.backoff_ms),
            io_timeout: Duration::from_millis(self.io_timeout_ms),
        })
    }
}

impl SequenceConfig {
    /// Convert to sequencer timing.
    pub fn timing(&self) -> SequencerConfig {
        SequencerConfig {
            warmup: Duration::from_millis(self.warmup_ms),
            pacing: Duration::from_millis(self.pacing_ms),
        }
    }
}

/// Which built-in node list to use when the file names none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeProfile {
    /// `localhost:8081..=8083`
    Local,
    /// `kvstore1:8081`, `kvstore2:8082`, `kvstore3:8083`
    Docker,
}

impl NodeProfile {
    /// Read the profile from `IN_DOCKER`.
    pub fn from_env() -> Self {
        Self::from_flag(std::env::var(IN_DOCKER_VAR).ok().as_deref())
    }

    /// `true` (any case) selects Docker; anything else, or unset, is Local.
    pub fn from_flag(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("true") => Self::Docker,
            _ => Self::Local,
        }
    }

    /// The node list for this profile.
    pub fn nodes(self) -> Vec<NodeConfig> {
        (1..=3u16)
            .map(|i| NodeConfig {
                host: match self {
                    Self::Local => "localhost".to_string(),
                    Self::Docker => format!("kvstore{i}"),
                },
                port: 8080 + i,
            })
            .collect()
    }
}

/// Validated inputs for a run.
#[derive(Debug, Clone)]
pub struct Harness {
    /// Nodes under test.
    pub nodes: NodeSet,
    /// Commands in order.
    pub commands: Vec<Command>,
    /// Expected response per command, aligned with `commands`.
    pub expectations: Vec<Option<String>>,
    /// Dispatcher retry policy.
    pub policy: RetryPolicy,
    /// Sequencer timing.
    pub timing: SequencerConfig,
    /// Node selection seed from the file.
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `path` if given, else `kvprobe.toml` if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    tracing::debug!("no {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate everything up front so bad input fails before any I/O.
    ///
    /// An empty `nodes` list falls back to `profile`.
    pub fn validate(self, profile: NodeProfile) -> Result<Harness, ConfigError> {
        let policy = self.dispatch.policy()?;
        let timing = self.sequence.timing();

        let node_configs = if self.nodes.is_empty() {
            profile.nodes()
        } else {
            self.nodes
        };
        let endpoints = node_configs
            .into_iter()
            .enumerate()
            .map(|(i, n)| {
                NodeEndpoint::new(n.host, n.port)
                    .map_err(|e| ConfigError::Invalid(format!("nodes[{i}]: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let nodes = NodeSet::new(endpoints).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut commands = Vec::with_capacity(self.steps.len());
        let mut expectations = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.into_iter().enumerate() {
            let command = Command::new(step.command)
                .map_err(|e| ConfigError::Invalid(format!("steps[{i}]: {e}")))?;
            commands.push(command);
            expectations.push(step.expect);
        }

        Ok(Harness {
            nodes,
            commands,
            expectations,
            policy,
            timing,
            seed: self.sequence.seed,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration parsed but describes an unusable harness.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
