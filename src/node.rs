//! Graph nodes
//!
//! A node is a content-addressed record with outgoing labelled edges (`vector`)
//! and a backlink mirror (`referers`) that only the store writes. The variant
//! set is closed; per-variant fields live on [`NodeKind`].

use crate::address::{content_hash, is_valid_hash, WellKnownHashes};
use crate::error::StorageError;
use crate::types::{single_label, EdgeLabels, EdgeMap, Hash, TAG_LABEL};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nodes keyed by hash, as returned by store transactions
pub type NodeDictionary = BTreeMap<Hash, Node>;

/// Node variant, serialized as the `type` discriminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    TagMeta,
    BlobMeta {
        extention: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    SymbolNode,
    MarkdownFolderMeta {
        extention: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    TemporaryQuery,
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::TagMeta => "TagMeta",
            NodeKind::BlobMeta { .. } => "BlobMeta",
            NodeKind::SymbolNode => "SymbolNode",
            NodeKind::MarkdownFolderMeta { .. } => "MarkdownFolderMeta",
            NodeKind::TemporaryQuery => "TemporaryQuery",
        }
    }

    /// File extension of the payload for blob-like variants
    pub fn extension(&self) -> Option<&str> {
        match self {
            NodeKind::BlobMeta { extention, .. } | NodeKind::MarkdownFolderMeta { extention, .. } => {
                Some(extention)
            }
            _ => None,
        }
    }
}

/// A node of the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub hash: Hash,
    pub title: String,
    pub created_at: String,
    pub thumbnail: String,
    pub description: String,
    /// Outgoing edges
    pub vector: EdgeMap,
    /// Backlinks, maintained by the store
    pub referers: EdgeMap,
    /// Older files predate this field
    #[serde(default)]
    pub remote_uri: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Build a node and apply the auto-tagging edges for its variant.
    pub fn new(
        kind: NodeKind,
        hash: Hash,
        title: impl Into<String>,
        description: impl Into<String>,
        vector: EdgeMap,
        well_known: &WellKnownHashes,
        today: &str,
    ) -> Self {
        let mut node = Node {
            hash,
            title: title.into(),
            created_at: now_rfc3339(),
            thumbnail: String::new(),
            description: description.into(),
            vector,
            referers: EdgeMap::new(),
            remote_uri: String::new(),
            kind,
        };
        node.apply_auto_tags(well_known, today);
        node
    }

    /// Tag node; identity is the hash of its title.
    pub fn tag(title: &str, well_known: &WellKnownHashes, today: &str) -> Self {
        Node::new(
            NodeKind::TagMeta,
            content_hash(title),
            title,
            "",
            EdgeMap::new(),
            well_known,
            today,
        )
    }

    /// Symbol node; identity comes from a fresh random seed so symbols never collide.
    pub fn symbol<R: Rng + ?Sized>(
        title: &str,
        description: &str,
        well_known: &WellKnownHashes,
        today: &str,
        rng: &mut R,
    ) -> Self {
        Node::new(
            NodeKind::SymbolNode,
            random_seed_hash(rng),
            title,
            description,
            EdgeMap::new(),
            well_known,
            today,
        )
    }

    /// Blob node; identity is the hash of the payload bytes.
    pub fn blob(
        payload: &[u8],
        title: &str,
        extention: &str,
        mime_type: &str,
        well_known: &WellKnownHashes,
        today: &str,
    ) -> Self {
        Node::new(
            NodeKind::BlobMeta {
                extention: extention.to_string(),
                mime_type: mime_type.to_string(),
            },
            content_hash(payload),
            title,
            "",
            EdgeMap::new(),
            well_known,
            today,
        )
    }

    /// Markdown folder node pointing at an externally managed directory.
    pub fn markdown_folder<R: Rng + ?Sized>(
        title: &str,
        remote_uri: &str,
        well_known: &WellKnownHashes,
        today: &str,
        rng: &mut R,
    ) -> Self {
        let mut node = Node::new(
            NodeKind::MarkdownFolderMeta {
                extention: ".md".to_string(),
                mime_type: "text/markdown".to_string(),
            },
            random_seed_hash(rng),
            title,
            "",
            EdgeMap::new(),
            well_known,
            today,
        );
        node.remote_uri = remote_uri.to_string();
        node
    }

    /// Client-side query node; never persisted.
    pub fn temporary_query(
        title: &str,
        description: &str,
        well_known: &WellKnownHashes,
        today: &str,
    ) -> Self {
        Node::new(
            NodeKind::TemporaryQuery,
            content_hash(format!("temporaryQuery:{}", title)),
            title,
            description,
            EdgeMap::new(),
            well_known,
            today,
        )
    }

    /// Add the `{tag: 1}` edges every node of this variant carries.
    ///
    /// Existing labels on those targets are left alone.
    pub fn apply_auto_tags(&mut self, well_known: &WellKnownHashes, today: &str) {
        let mut targets = vec![well_known.node.clone()];
        if !today.is_empty() {
            targets.push(WellKnownHashes::day(today));
        }
        match self.kind {
            NodeKind::TagMeta => targets.push(well_known.tag.clone()),
            NodeKind::BlobMeta { .. } | NodeKind::MarkdownFolderMeta { .. } => {
                targets.push(well_known.blob.clone())
            }
            NodeKind::SymbolNode | NodeKind::TemporaryQuery => {}
        }
        for target in targets {
            self.vector
                .entry(target)
                .or_insert_with(|| single_label(TAG_LABEL));
        }
    }

    /// Add one labelled edge toward `target`.
    pub fn link(&mut self, target: &str, label: &str, weight: i64) {
        self.vector
            .entry(target.to_string())
            .or_default()
            .insert(label.to_string(), weight);
    }

    /// Parse and validate a persisted node document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, StorageError> {
        let node: Node = serde_json::from_slice(bytes)?;
        node.validate()?;
        Ok(node)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, StorageError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Shape checks beyond what deserialization enforces
    pub fn validate(&self) -> Result<(), StorageError> {
        if !is_valid_hash(&self.hash) {
            return Err(StorageError::InvalidNode {
                hash: self.hash.clone(),
                reason: "hash is not 64 lowercase hex characters".to_string(),
            });
        }
        if let NodeKind::TemporaryQuery = self.kind {
            return Err(StorageError::InvalidNode {
                hash: self.hash.clone(),
                reason: "temporary query nodes are not persistable".to_string(),
            });
        }
        Ok(())
    }

    /// Content hash over the canonical serialization.
    ///
    /// Edge maps are ordered, so two nodes with equal fields always agree.
    pub fn fingerprint(&self) -> Hash {
        match serde_json::to_vec(self) {
            Ok(bytes) => content_hash(bytes),
            Err(_) => String::new(),
        }
    }
}

/// Outgoing and incoming edges merged, without the node's own hash.
///
/// Backlink labels replace outgoing labels on the same key.
pub fn node_edges(node: &Node) -> Vec<(Hash, EdgeLabels)> {
    let mut merged = node.vector.clone();
    for (hash, labels) in &node.referers {
        merged.insert(hash.clone(), labels.clone());
    }
    merged.remove(&node.hash);
    merged.into_iter().collect()
}

/// Current time as RFC 3339 with millisecond precision
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn random_seed_hash<R: Rng + ?Sized>(rng: &mut R) -> Hash {
    let millis = chrono::Utc::now().timestamp_millis();
    let salt: u64 = rng.gen();
    content_hash(format!("{}{:x}", millis, salt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TODAY: &str = "2024-05-06";

    #[test]
    fn test_tag_hash_depends_only_on_title() {
        let wk = WellKnownHashes::compute();
        let a = Node::tag("project-x", &wk, TODAY);
        let b = Node::tag("project-x", &wk, "2031-01-01");
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash, content_hash("project-x"));
    }

    #[test]
    fn test_symbols_never_collide() {
        let wk = WellKnownHashes::compute();
        let mut rng = StdRng::seed_from_u64(7);
        let a = Node::symbol("same", "", &wk, TODAY, &mut rng);
        let b = Node::symbol("same", "", &wk, TODAY, &mut rng);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_auto_tags_per_variant() {
        let wk = WellKnownHashes::compute();
        let day = WellKnownHashes::day(TODAY);

        let tag = Node::tag("t", &wk, TODAY);
        assert!(tag.vector.contains_key(&wk.node));
        assert!(tag.vector.contains_key(&day));
        assert!(tag.vector.contains_key(&wk.tag));
        assert!(!tag.vector.contains_key(&wk.blob));

        let blob = Node::blob(b"payload", "p", ".txt", "text/plain", &wk, TODAY);
        assert!(blob.vector.contains_key(&wk.blob));
        assert_eq!(blob.hash, content_hash(b"payload"));
        assert_eq!(blob.vector[&wk.node]["tag"], 1);
    }

    #[test]
    fn test_auto_tags_keep_existing_labels() {
        let wk = WellKnownHashes::compute();
        let mut vector = EdgeMap::new();
        let mut labels = EdgeLabels::new();
        labels.insert("pinned".to_string(), 5);
        vector.insert(wk.node.clone(), labels);
        let node = Node::new(NodeKind::SymbolNode, "h".into(), "s", "", vector, &wk, TODAY);
        assert_eq!(node.vector[&wk.node].get("pinned"), Some(&5));
        assert!(node.vector[&wk.node].get("tag").is_none());
    }

    #[test]
    fn test_json_shape_round_trips_through_validation() {
        let wk = WellKnownHashes::compute();
        let node = Node::blob(b"x", "x.png", ".png", "image/png", &wk, TODAY);
        let json: serde_json::Value = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "BlobMeta");
        assert_eq!(json["extention"], ".png");
        assert_eq!(json["mimeType"], "image/png");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("remoteUri").is_some());

        let parsed = Node::from_json(&node.to_json().unwrap()).unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn test_missing_remote_uri_is_defaulted() {
        let doc = r#"{"hash":"abc","title":"t","createdAt":"","thumbnail":"",
            "description":"","vector":{},"referers":{},"type":"TagMeta"}"#;
        let node = Node::from_json(doc.as_bytes()).unwrap();
        assert_eq!(node.remote_uri, "");
        assert_eq!(node.kind, NodeKind::TagMeta);
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        let missing_referers = r#"{"hash":"abc","title":"t","createdAt":"","thumbnail":"",
            "description":"","vector":{},"remoteUri":"","type":"TagMeta"}"#;
        assert!(Node::from_json(missing_referers.as_bytes()).is_err());

        let vector_not_map = r#"{"hash":"abc","title":"t","createdAt":"","thumbnail":"",
            "description":"","vector":[],"referers":{},"remoteUri":"","type":"TagMeta"}"#;
        assert!(Node::from_json(vector_not_map.as_bytes()).is_err());

        let blob_without_mime = r#"{"hash":"abc","title":"t","createdAt":"","thumbnail":"",
            "description":"","vector":{},"referers":{},"remoteUri":"","type":"BlobMeta",
            "extention":".png"}"#;
        assert!(Node::from_json(blob_without_mime.as_bytes()).is_err());

        let empty_hash = r#"{"hash":"","title":"t","createdAt":"","thumbnail":"",
            "description":"","vector":{},"referers":{},"remoteUri":"","type":"SymbolNode"}"#;
        assert!(Node::from_json(empty_hash.as_bytes()).is_err());
    }

    #[test]
    fn test_node_edges_strip_self_and_merge() {
        let wk = WellKnownHashes::compute();
        let mut node = Node::tag(TODAY, &wk, TODAY);
        // A day tag points at its own hash through auto-tagging
        assert!(node.vector.contains_key(&node.hash));
        node.referers.insert(node.hash.clone(), single_label("referer"));
        node.referers.insert("other".into(), single_label("referer"));

        let edges = node_edges(&node);
        assert!(edges.iter().all(|(hash, _)| hash != &node.hash));
        assert!(edges.iter().any(|(hash, _)| hash == "other"));
        assert!(edges.iter().any(|(hash, _)| hash == &wk.tag));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let wk = WellKnownHashes::compute();
        let node = Node::tag("t", &wk, TODAY);
        let mut edited = node.clone();
        assert_eq!(node.fingerprint(), edited.fingerprint());
        edited.description = "changed".into();
        assert_ne!(node.fingerprint(), edited.fingerprint());
    }
}
