//! Node addressing for kvprobe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use crate::TypesError;

/// Address of one key-value node under test.
///
/// Immutable once built. Both constructors and deserialization reject an
/// empty host and port 0.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawEndpoint")]
pub struct NodeEndpoint {
    host: String,
    port: u16,
}

#[derive(Deserialize)]
struct RawEndpoint {
    host: String,
    port: u16,
}

impl TryFrom<RawEndpoint> for NodeEndpoint {
    type Error = TypesError;

    fn try_from(raw: RawEndpoint) -> Result<Self, Self::Error> {
        Self::new(raw.host, raw.port)
    }
}

impl NodeEndpoint {
    /// Create a validated endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, TypesError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(TypesError::EmptyHost);
        }
        if port == 0 {
            return Err(TypesError::InvalidPort(port));
        }
        Ok(Self { host, port })
    }

    /// Host name or IP address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for NodeEndpoint {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| TypesError::InvalidAddress(s.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| TypesError::InvalidAddress(s.to_string()))?;
        Self::new(host, port)
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeEndpoint({self})")
    }
}

/// The fixed, non-empty set of nodes a run targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSet(Vec<NodeEndpoint>);

impl NodeSet {
    /// Build a node set, rejecting an empty list.
    pub fn new(nodes: Vec<NodeEndpoint>) -> Result<Self, TypesError> {
        if nodes.is_empty() {
            return Err(TypesError::EmptyNodeSet);
        }
        Ok(Self(nodes))
    }

    /// Number of nodes (always at least one).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The endpoints in configuration order.
    pub fn as_slice(&self) -> &[NodeEndpoint] {
        &self.0
    }

    /// Iterate over the endpoints.
    pub fn iter(&self) -> std::slice::Iter<'_, NodeEndpoint> {
        self.0.iter()
    }
}

impl Index<usize> for NodeSet {
    type Output = NodeEndpoint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a NodeEndpoint;
    type IntoIter = std::slice::Iter<'a, NodeEndpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
