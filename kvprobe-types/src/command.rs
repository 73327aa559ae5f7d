//! Request lines sent to key-value nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// One request line, e.g. `PUT key value`.
///
/// The harness never parses a command; it is sent verbatim followed by a
/// single `\n`. The only constraint is that the text itself holds no newline.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Command(String);

impl Command {
    /// Create a command, rejecting text that contains a newline.
    pub fn new(text: impl Into<String>) -> Result<Self, TypesError> {
        let text = text.into();
        if text.contains('\n') {
            return Err(TypesError::NewlineInCommand(text));
        }
        Ok(Self(text))
    }

    /// `PUT <key> <value>`
    pub fn put(key: &str, value: &str) -> Result<Self, TypesError> {
        Self::new(format!("PUT {key} {value}"))
    }

    /// `GET <key>`
    pub fn get(key: &str) -> Result<Self, TypesError> {
        Self::new(format!("GET {key}"))
    }

    /// `RANGE <start-key> <end-key>`
    pub fn range(start: &str, end: &str) -> Result<Self, TypesError> {
        Self::new(format!("RANGE {start} {end}"))
    }

    /// `PREFIX <prefix>`
    pub fn prefix(prefix: &str) -> Result<Self, TypesError> {
        Self::new(format!("PREFIX {prefix}"))
    }

    /// `REMOVE <key>`
    pub fn remove(key: &str) -> Result<Self, TypesError> {
        Self::new(format!("REMOVE {key}"))
    }

    /// The command text without the line terminator.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes to put on the wire: the text plus a trailing `\n`.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() + 1);
        bytes.extend_from_slice(self.0.as_bytes());
        bytes.push(b'\n');
        bytes
    }
}

impl TryFrom<String> for Command {
    type Error = TypesError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::new(text)
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        command.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({:?})", self.0)
    }
}
