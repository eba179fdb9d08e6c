//! Core types for the Ensorbi knowledge graph.

use std::collections::BTreeMap;

/// Hash: lowercase hex SHA-256 digest identifying a node
pub type Hash = String;

/// Labels on a single edge: label -> integer weight
pub type EdgeLabels = BTreeMap<String, i64>;

/// Edge map keyed by the hash of the node on the other end
pub type EdgeMap = BTreeMap<Hash, EdgeLabels>;

/// Label used for backlinks written by the consistency transaction
pub const REFERER_LABEL: &str = "referer";

/// Label used for auto-tagging edges
pub const TAG_LABEL: &str = "tag";

/// Build a single-label edge with weight 1
pub fn single_label(label: &str) -> EdgeLabels {
    let mut labels = EdgeLabels::new();
    labels.insert(label.to_string(), 1);
    labels
}
