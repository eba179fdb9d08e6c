//! CLI Tooling
//!
//! Command-line interface for the knowledge graph. Every write goes through the
//! store's consistency transaction, so backlinks stay in step with the edges
//! each command adds or removes.

use crate::address::{is_valid_hash, WellKnownHashes};
use crate::config::{AppConfig, CONFIG_FILE_NAME};
use crate::error::ApiError;
use crate::node::{Node, NodeDictionary};
use crate::scope::{HeadlessCanvas, ScopeManager};
use crate::store::{FsPersistence, NodeStore};
use crate::types::Hash;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Ensorbi CLI - personal knowledge graph
#[derive(Parser)]
#[command(name = "ensorbi")]
#[command(about = "Content-addressed personal knowledge graph")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory used to resolve relative paths and the local ensorbi.toml
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Storage root (overrides storage.root)
    #[arg(long)]
    pub storage: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Fold the logging flags into a loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
        if let Some(storage) = &self.storage {
            config.storage.root = Some(storage.clone());
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a tag (or refresh an existing one with the same title)
    Tag { title: String },
    /// Create a symbol node with a fresh identity
    Symbol {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Store a file as a blob node
    Attach {
        file: PathBuf,
        /// Defaults to the file name
        #[arg(long)]
        title: Option<String>,
        /// Defaults to a guess from the extension
        #[arg(long)]
        mime: Option<String>,
    },
    /// Register a markdown folder managed elsewhere
    Folder {
        title: String,
        #[arg(long, default_value = "")]
        remote_uri: String,
    },
    /// Add an edge between two nodes
    Link {
        from: String,
        to: String,
        #[arg(long, default_value = "link")]
        label: String,
        #[arg(long, default_value = "1")]
        weight: i64,
    },
    /// Remove an edge (one label, or all labels when none is given)
    Unlink {
        from: String,
        to: String,
        #[arg(long)]
        label: Option<String>,
    },
    /// Show one node and its edges
    Show {
        hash: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List stored nodes
    List {
        /// Only nodes of this type (e.g. TagMeta, tag, blob)
        #[arg(long)]
        kind: Option<String>,
    },
    /// Delete a node and its files
    Remove { hash: String },
    /// Rebuild every backlink from the outgoing edges
    Reconstruct,
    /// Rewrite every node document in the current format
    Migrate,
    /// Lay out the neighbourhood of a node and print the positions
    Scope {
        hash: String,
        #[arg(long, default_value = "100")]
        steps: usize,
        /// Seed for the initial placement
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Write a default ensorbi.toml
    InitConfig {
        /// Target file (defaults to ./ensorbi.toml)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// CLI context: the opened store plus the configuration it was opened with
pub struct CliContext {
    store: NodeStore<FsPersistence>,
    config: AppConfig,
}

impl CliContext {
    /// Open the store described by an already loaded configuration.
    ///
    /// Missing well-known tags are created on the way.
    pub fn from_config(base_dir: &Path, config: AppConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let layout = config.storage.layout(base_dir)?;
        info!("Opening store at {}", layout.root.display());
        let store = NodeStore::new(FsPersistence::new(layout), WellKnownHashes::compute());
        let created = store.ensure_well_known_tags()?;
        if created > 0 {
            info!("Provisioned {} well-known tags", created);
        }
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &NodeStore<FsPersistence> {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Tag { title } => {
                let changed = self.store.register_tag_meta(title)?;
                Ok(format_written(&changed, &crate::address::content_hash(title)))
            }
            Commands::Symbol { title, description } => {
                let changed = self.store.register_symbol(title, description)?;
                let hash = first_of_type(&changed, "SymbolNode", title);
                Ok(format_written(&changed, &hash))
            }
            Commands::Attach { file, title, mime } => {
                self.attach(file, title.as_deref(), mime.as_deref())
            }
            Commands::Folder { title, remote_uri } => {
                let node = Node::markdown_folder(
                    title,
                    remote_uri,
                    self.store.well_known(),
                    &self.store.today(),
                    &mut rand::thread_rng(),
                );
                let changed = self.store.update_node(&node)?;
                Ok(format_written(&changed, &node.hash))
            }
            Commands::Link {
                from,
                to,
                label,
                weight,
            } => {
                let mut node = self.require(from)?;
                let target = self.require(to)?;
                node.link(&target.hash, label, *weight);
                let changed = self.store.update_node(&node)?;
                Ok(format_written(&changed, &node.hash))
            }
            Commands::Unlink { from, to, label } => {
                let mut node = self.require(from)?;
                let target = self.resolve_hash(to)?;
                let removed = match label {
                    None => node.vector.remove(&target).is_some(),
                    Some(label) => {
                        let removed = node
                            .vector
                            .get_mut(&target)
                            .is_some_and(|labels| labels.remove(label).is_some());
                        if node.vector.get(&target).is_some_and(|labels| labels.is_empty()) {
                            node.vector.remove(&target);
                        }
                        removed
                    }
                };
                if !removed {
                    return Err(ApiError::InvalidArgument(format!(
                        "{} has no such edge to {}",
                        node.hash, target
                    )));
                }
                let changed = self.store.update_node(&node)?;
                Ok(format_written(&changed, &node.hash))
            }
            Commands::Show { hash, format } => {
                let node = self.require(hash)?;
                match format.as_str() {
                    "json" => serde_json::to_string_pretty(&node)
                        .map_err(|e| ApiError::Storage(e.into())),
                    "text" => Ok(self.format_node(&node)),
                    other => Err(ApiError::InvalidArgument(format!(
                        "Unknown format {} (must be 'text' or 'json')",
                        other
                    ))),
                }
            }
            Commands::List { kind } => {
                self.store.fetch_all()?;
                let nodes = self.store.filter(|node| match kind {
                    Some(kind) => kind_matches(node, kind),
                    None => true,
                });
                Ok(format_node_table(&nodes))
            }
            Commands::Remove { hash } => {
                let hash = self.resolve_hash(hash)?;
                if self.store.remove(&hash)? {
                    Ok(format!("Removed {}", hash))
                } else {
                    Err(ApiError::NodeNotFound(hash))
                }
            }
            Commands::Reconstruct => {
                let count = self.store.reconstruct_referrers()?;
                Ok(format!("Rebuilt backlinks for {} nodes", count))
            }
            Commands::Migrate => {
                let count = self.store.migrate_meta_files()?;
                Ok(format!("Migrated {} node files", count))
            }
            Commands::Scope { hash, steps, seed } => self.scope(hash, *steps, *seed),
            Commands::InitConfig { path, force } => {
                write_default_config(path.as_deref().unwrap_or(Path::new(CONFIG_FILE_NAME)), *force)
            }
        }
    }

    /// Full hash for a unique prefix of a stored node's hash
    pub fn resolve_hash(&self, prefix: &str) -> Result<Hash, ApiError> {
        if prefix.is_empty() {
            return Err(ApiError::InvalidArgument("empty hash".to_string()));
        }
        if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ApiError::InvalidArgument(format!(
                "{:?} is not a hex hash prefix",
                prefix
            )));
        }
        if is_valid_hash(prefix) && self.store.fetch(prefix).is_some() {
            return Ok(prefix.to_string());
        }
        self.store.fetch_all()?;
        let matches = self.store.filter(|node| node.hash.starts_with(prefix));
        match matches.as_slice() {
            [node] => Ok(node.hash.clone()),
            [] => Err(ApiError::NodeNotFound(prefix.to_string())),
            _ => Err(ApiError::InvalidArgument(format!(
                "Hash prefix {} is ambiguous ({} matches)",
                prefix,
                matches.len()
            ))),
        }
    }

    fn require(&self, prefix: &str) -> Result<Node, ApiError> {
        let hash = self.resolve_hash(prefix)?;
        self.store.fetch(&hash).ok_or(ApiError::NodeNotFound(hash))
    }

    fn attach(&self, file: &Path, title: Option<&str>, mime: Option<&str>) -> Result<String, ApiError> {
        let payload = std::fs::read(file)
            .map_err(|e| ApiError::Storage(crate::error::StorageError::io(file, e)))?;
        let extension = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        let title = match title {
            Some(title) => title.to_string(),
            None => file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let mime = mime.unwrap_or_else(|| guess_mime(&extension));
        let meta = Node::blob(
            &payload,
            &title,
            &extension,
            mime,
            self.store.well_known(),
            &self.store.today(),
        );
        let hash = meta.hash.clone();
        let changed = self.store.register_blob_meta(&payload, meta)?;
        Ok(format_written(&changed, &hash))
    }

    fn scope(&self, hash: &str, steps: usize, seed: Option<u64>) -> Result<String, ApiError> {
        let hash = self.resolve_hash(hash)?;
        let layout = &self.config.layout;
        let canvas = HeadlessCanvas::new(layout.canvas_width, layout.canvas_height);
        let mut manager = ScopeManager::new(
            &self.store,
            Some(canvas),
            self.store.well_known().node.clone(),
            layout.params(),
        );
        if let Some(seed) = seed {
            manager = manager.with_seed(seed);
        }
        if !manager.restart(&hash) {
            return Err(ApiError::NodeNotFound(hash));
        }
        for _ in 0..steps {
            manager.update();
        }
        manager.draw();

        let Some(session) = manager.current().session() else {
            return Err(ApiError::NodeNotFound(hash));
        };
        let mut table = comfy_table::Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.set_header(vec!["Hash", "Title", "X", "Y", "Pinned"]);
        for node in session.nodes().values() {
            table.add_row(vec![
                short_hash(&node.node_hash).to_string(),
                node.title.clone(),
                format!("{:.1}", node.x),
                format!("{:.1}", node.y),
                if node.movable { "" } else { "yes" }.to_string(),
            ]);
        }
        Ok(format!(
            "Scope around {} after {} steps\n{}",
            short_hash(&hash),
            steps,
            table
        ))
    }

    fn format_node(&self, node: &Node) -> String {
        let mut output = format!(
            "{} [{}]\nhash: {}\ncreated: {}\n",
            node.title,
            node.kind.type_name(),
            node.hash,
            node.created_at
        );
        if !node.description.is_empty() {
            output.push_str(&format!("description: {}\n", node.description));
        }
        if !node.remote_uri.is_empty() {
            output.push_str(&format!("remote: {}\n", node.remote_uri));
        }
        for (heading, edges) in [("links", &node.vector), ("referers", &node.referers)] {
            output.push_str(&format!("{} ({}):\n", heading, edges.len()));
            for (target, labels) in edges {
                let title = self
                    .store
                    .fetch(target)
                    .map(|n| n.title)
                    .unwrap_or_else(|| "?".to_string());
                let labels: Vec<String> = labels
                    .iter()
                    .map(|(label, weight)| format!("{}={}", label, weight))
                    .collect();
                output.push_str(&format!(
                    "  {} {} ({})\n",
                    short_hash(target),
                    title,
                    labels.join(", ")
                ));
            }
        }
        output
    }
}

/// Write the default configuration as TOML.
pub fn write_default_config(path: &Path, force: bool) -> Result<String, ApiError> {
    if path.exists() && !force {
        return Err(ApiError::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    let text = AppConfig::default_toml()?;
    std::fs::write(path, text)
        .map_err(|e| ApiError::Storage(crate::error::StorageError::io(path, e)))?;
    Ok(format!("Wrote {}", path.display()))
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

fn kind_matches(node: &Node, kind: &str) -> bool {
    let type_name = node.kind.type_name();
    type_name.eq_ignore_ascii_case(kind)
        || type_name
            .strip_suffix("Meta")
            .or_else(|| type_name.strip_suffix("Node"))
            .is_some_and(|short| short.eq_ignore_ascii_case(kind))
}

fn first_of_type(changed: &NodeDictionary, type_name: &str, title: &str) -> Hash {
    changed
        .values()
        .find(|n| n.kind.type_name() == type_name && n.title == title)
        .map(|n| n.hash.clone())
        .unwrap_or_default()
}

fn guess_mime(extension: &str) -> &'static str {
    match extension {
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".svg" => "image/svg+xml",
        ".webp" => "image/webp",
        ".pdf" => "application/pdf",
        ".md" => "text/markdown",
        ".txt" => "text/plain",
        ".html" | ".htm" => "text/html",
        ".json" => "application/json",
        _ => "application/octet-stream",
    }
}

fn format_written(changed: &NodeDictionary, hash: &str) -> String {
    format!("{}\n{} node(s) written", hash, changed.len())
}

fn format_node_table(nodes: &[Node]) -> String {
    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Hash", "Type", "Title", "Created", "Links", "Referers"]);
    for node in nodes {
        table.add_row(vec![
            short_hash(&node.hash).to_string(),
            node.kind.type_name().to_string(),
            node.title.clone(),
            node.created_at.clone(),
            node.vector.len().to_string(),
            node.referers.len().to_string(),
        ]);
    }
    table.to_string()
}
