//! Ensorbi: Personal Knowledge Graph
//!
//! Content-addressed nodes stored as sharded JSON documents, a store that keeps
//! every outgoing edge mirrored as a backlink on its target, and scope graphs:
//! force-laid-out neighbourhoods around a focal node.

pub mod address;
pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod node;
pub mod scope;
pub mod store;
pub mod tooling;
pub mod types;
