//! Node Store
//!
//! In-memory dictionary of nodes backed by per-node JSON documents. The store
//! is the only writer of `referers`: every write that changes a node's edges
//! goes through [`NodeStore::change_vector_transaction`], which mirrors each
//! outgoing edge as a backlink on its target.

pub mod persistence;

use crate::address::{content_hash, is_valid_hash, today_string, WellKnownHashes};
use crate::error::StorageError;
use crate::node::{now_rfc3339, Node, NodeDictionary};
use crate::types::{single_label, Hash, REFERER_LABEL};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub use persistence::{FsPersistence, NodePersistence, StorageLayout};

/// Titles of the tags the graph expects to exist
pub const WELL_KNOWN_TITLES: [&str; 4] = ["node", "tag", "blob", "entryPoint"];

/// Node store over a persistence backend
pub struct NodeStore<P: NodePersistence = FsPersistence> {
    persistence: P,
    cache: RwLock<HashMap<Hash, Node>>,
    well_known: WellKnownHashes,
    /// Fixed date for the daily tag; `None` follows the clock
    today: Option<String>,
}

impl<P: NodePersistence> NodeStore<P> {
    pub fn new(persistence: P, well_known: WellKnownHashes) -> Self {
        Self {
            persistence,
            cache: RwLock::new(HashMap::new()),
            well_known,
            today: None,
        }
    }

    /// Pin the date used for daily tags
    pub fn with_today(mut self, today: impl Into<String>) -> Self {
        self.today = Some(today.into());
        self
    }

    pub fn today(&self) -> String {
        self.today.clone().unwrap_or_else(today_string)
    }

    pub fn well_known(&self) -> &WellKnownHashes {
        &self.well_known
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Cached node, loading it from persistence on a miss
    pub fn fetch(&self, hash: &str) -> Option<Node> {
        if let Some(node) = self.cache.read().get(hash) {
            return Some(node.clone());
        }
        self.load(hash, false)
    }

    /// Read a node from persistence unless cached (or `force` is set).
    ///
    /// Missing and malformed documents are logged and reported as `None`.
    pub fn load(&self, hash: &str, force: bool) -> Option<Node> {
        if !is_valid_hash(hash) {
            warn!("Refusing to load malformed hash {:?}", hash);
            return None;
        }
        if !force {
            if let Some(node) = self.cache.read().get(hash) {
                return Some(node.clone());
            }
        }

        let bytes = match self.persistence.read_node(hash) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!("Node {} has no local file", hash);
                return None;
            }
            Err(e) => {
                warn!("Failed to read node {}: {}", hash, e);
                return None;
            }
        };

        match Node::from_json(&bytes) {
            Ok(node) => {
                self.cache.write().insert(hash.to_string(), node.clone());
                Some(node)
            }
            Err(e) => {
                warn!("Node {} failed validation: {}", hash, e);
                None
            }
        }
    }

    /// The node as currently stored, without logging its absence.
    ///
    /// A node being written for the first time has no stored copy; that is
    /// expected, so only read and parse failures are warned about.
    fn stored_copy(&self, hash: &str) -> Option<Node> {
        if let Some(node) = self.cache.read().get(hash) {
            return Some(node.clone());
        }
        match self.persistence.read_node(hash) {
            Ok(Some(bytes)) => match Node::from_json(&bytes) {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!("Stored copy of {} failed validation: {}", hash, e);
                    None
                }
            },
            Ok(None) => {
                debug!("No stored copy of {}", hash);
                None
            }
            Err(e) => {
                warn!("Failed to read stored copy of {}: {}", hash, e);
                None
            }
        }
    }

    /// Overwrite the cache entry and persist the node.
    pub fn register(&self, node: &Node) -> Result<(), StorageError> {
        node.validate()?;
        let bytes = node.to_json()?;
        self.cache.write().insert(node.hash.clone(), node.clone());
        self.persistence.write_node(&node.hash, &bytes)?;
        debug!("Registered node {} ({})", node.hash, node.kind.type_name());
        Ok(())
    }

    /// Drop a node from memory only
    pub fn unload(&self, hash: &str) -> bool {
        self.cache.write().remove(hash).is_some()
    }

    /// Drop a node from memory and delete its files.
    ///
    /// Edges pointing at the removed node are left dangling.
    pub fn remove(&self, hash: &str) -> Result<bool, StorageError> {
        let node = self.load(hash, false);
        self.cache.write().remove(hash);
        if let Some(extension) = node.as_ref().and_then(|n| n.kind.extension()) {
            self.persistence.remove_binary(hash, extension)?;
        }
        let removed = self.persistence.remove_node(hash)?;
        if removed {
            info!("Removed node {}", hash);
        }
        Ok(removed)
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// Load every persisted node into memory; returns how many resolved
    pub fn fetch_all(&self) -> Result<usize, StorageError> {
        let hashes = self.persistence.list_all_node_files()?;
        let mut loaded = 0;
        for hash in hashes {
            if self.load(&hash, false).is_some() {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    pub fn to_array(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.cache.read().values().cloned().collect();
        nodes.sort_by(|a, b| a.hash.cmp(&b.hash));
        nodes
    }

    pub fn filter<F>(&self, predicate: F) -> Vec<Node>
    where
        F: Fn(&Node) -> bool,
    {
        let mut nodes: Vec<Node> = self
            .cache
            .read()
            .values()
            .filter(|node| predicate(node))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.hash.cmp(&b.hash));
        nodes
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.cache.read().contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Persist `node` and mirror its outgoing edges as backlinks.
    ///
    /// Returns every node written: the node itself, each backlinked target,
    /// any target whose stale backlink was dropped, and the daily tag when it
    /// had to be created. A target that cannot be resolved is logged and
    /// skipped; there is no rollback. Only a failure to persist `node` itself
    /// is an error.
    pub fn change_vector_transaction(&self, node: &Node) -> Result<NodeDictionary, StorageError> {
        let mut changed = NodeDictionary::new();

        node.validate()?;
        let previous = self.stored_copy(&node.hash);
        let mut node = node.clone();
        node.referers = previous
            .as_ref()
            .map(|previous| previous.referers.clone())
            .unwrap_or_default();

        self.register(&node)?;
        changed.insert(node.hash.clone(), node.clone());

        if let Err(e) = self.persistence.ensure_companion(&node) {
            warn!("Failed to write companion document for {}: {}", node.hash, e);
        }

        let today = self.today();
        let today_hash = WellKnownHashes::day(&today);

        for (target_hash, labels) in &node.vector {
            if *target_hash == node.hash {
                continue;
            }

            let mut target = self.load(target_hash, false);
            if target.is_none() && *target_hash == today_hash {
                info!("Creating daily tag {}", today);
                let day = Node::tag(&today, &self.well_known, &today);
                match self.change_vector_transaction(&day) {
                    Ok(created) => changed.extend(created),
                    Err(e) => warn!("Failed to create daily tag {}: {}", today, e),
                }
                target = self.load(target_hash, false);
            }

            let Some(mut target) = target else {
                warn!(
                    "Edge target {} of {} could not be loaded {:?}",
                    target_hash, node.hash, labels
                );
                continue;
            };

            target
                .referers
                .insert(node.hash.clone(), single_label(REFERER_LABEL));
            if let Err(e) = self.register(&target) {
                warn!("Failed to write backlink on {}: {}", target_hash, e);
                continue;
            }
            changed.insert(target.hash.clone(), target);
        }

        if let Some(previous) = previous {
            for stale in previous.vector.keys() {
                if node.vector.contains_key(stale) || *stale == node.hash {
                    continue;
                }
                let Some(mut target) = self.load(stale, false) else {
                    continue;
                };
                if target.referers.remove(&node.hash).is_none() {
                    continue;
                }
                match self.register(&target) {
                    Ok(()) => {
                        changed.insert(target.hash.clone(), target);
                    }
                    Err(e) => warn!("Failed to drop stale backlink on {}: {}", stale, e),
                }
            }
        }

        // A nested daily-tag transaction can write to nodes collected earlier
        {
            let cache = self.cache.read();
            for (hash, entry) in changed.iter_mut() {
                if let Some(current) = cache.get(hash) {
                    *entry = current.clone();
                }
            }
        }

        info!(
            "Vector transaction for {} touched {} nodes",
            node.hash,
            changed.len()
        );
        Ok(changed)
    }

    /// Rebuild every backlink from the persisted outgoing edges.
    pub fn reconstruct_referrers(&self) -> Result<usize, StorageError> {
        self.clear();
        self.fetch_all()?;

        let hashes: Vec<Hash> = self.to_array().into_iter().map(|n| n.hash).collect();
        for hash in &hashes {
            if let Some(mut node) = self.fetch(hash) {
                node.referers.clear();
                self.register(&node)?;
            }
        }

        for hash in &hashes {
            if let Some(node) = self.fetch(hash) {
                self.change_vector_transaction(&node)?;
            }
        }

        info!("Rebuilt referrers for {} nodes", hashes.len());
        Ok(hashes.len())
    }

    /// Rewrite every persisted document in the current format.
    pub fn migrate_meta_files(&self) -> Result<usize, StorageError> {
        let mut migrated = 0;
        for hash in self.persistence.list_all_node_files()? {
            let Some(node) = self.load(&hash, true) else {
                continue;
            };
            self.register(&node)?;
            migrated += 1;
        }
        info!("Migrated {} node files", migrated);
        Ok(migrated)
    }

    /// Create or refresh a tag; tags with the same title share one hash.
    pub fn register_tag_meta(&self, title: &str) -> Result<NodeDictionary, StorageError> {
        let today = self.today();
        let mut tag = match self.fetch(&content_hash(title)) {
            Some(existing) => existing,
            None => Node::tag(title, &self.well_known, &today),
        };
        tag.created_at = now_rfc3339();
        self.change_vector_transaction(&tag)
    }

    /// Store a payload and register its blob node.
    pub fn register_blob_meta(
        &self,
        payload: &[u8],
        mut meta: Node,
    ) -> Result<NodeDictionary, StorageError> {
        let Some(extension) = meta.kind.extension().map(str::to_string) else {
            return Err(StorageError::InvalidNode {
                hash: meta.hash,
                reason: format!("{} cannot carry a payload", meta.kind.type_name()),
            });
        };
        if payload.is_empty() {
            return Err(StorageError::EmptyPayload(meta.title));
        }

        meta.hash = content_hash(payload);
        meta.created_at = now_rfc3339();
        self.persistence
            .write_binary(&meta.hash, &extension, payload)?;
        self.change_vector_transaction(&meta)
    }

    /// Register an edited node
    pub fn update_node(&self, node: &Node) -> Result<NodeDictionary, StorageError> {
        self.change_vector_transaction(node)
    }

    /// Create a symbol node with a fresh identity
    pub fn register_symbol(
        &self,
        title: &str,
        description: &str,
    ) -> Result<NodeDictionary, StorageError> {
        let today = self.today();
        let symbol = Node::symbol(
            title,
            description,
            &self.well_known,
            &today,
            &mut rand::thread_rng(),
        );
        self.change_vector_transaction(&symbol)
    }

    /// Register any of the well-known tags that are missing
    pub fn ensure_well_known_tags(&self) -> Result<usize, StorageError> {
        let mut created = 0;
        for title in WELL_KNOWN_TITLES {
            if self.fetch(&content_hash(title)).is_none() {
                self.register_tag_meta(title)?;
                created += 1;
            }
        }
        Ok(created)
    }

    /// Payload bytes of a blob-like node
    pub fn read_payload(&self, hash: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(node) = self.fetch(hash) else {
            return Ok(None);
        };
        match node.kind.extension() {
            Some(extension) => self.persistence.read_binary(hash, extension),
            None => Ok(None),
        }
    }
}
