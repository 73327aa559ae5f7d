//! Node selection.
//!
//! Each command picks its node independently and uniformly at random. The
//! random source is passed in, so a seeded generator makes a run
//! reproducible.

use kvprobe_types::{NodeEndpoint, NodeSet};
use rand::Rng;

/// Pick one node uniformly at random.
pub fn select_node<'a, R: Rng + ?Sized>(nodes: &'a NodeSet, rng: &mut R) -> &'a NodeEndpoint {
    // NodeSet is never empty, so the range is never empty.
    let index = rng.gen_range(0..nodes.len());
    &nodes[index]
}
