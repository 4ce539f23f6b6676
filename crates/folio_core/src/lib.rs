//! Core engine for Folio
//!
//! This crate holds the document tree and its anchors, the per-document build
//! stack, the registry of open documents, export, conversion and the passage
//! index. `FolioEngine` ties them together for the tool-call server.

use sha2::{Digest, Sha256};

pub mod anchor;
pub mod builder;
pub mod convert;
#[cfg(feature = "embeddings")]
pub mod embeddings;
pub mod engine;
pub mod export;
pub mod index;
pub mod overview;
pub mod registry;
pub mod resolver;
pub mod tree;

pub use anchor::{Anchor, Collection};
pub use builder::{BuildStack, DocumentSession, ListItemSpec, StackEntry};
pub use convert::{Converter, DocumentSource, InputFormat, NativeConverter};
pub use engine::FolioEngine;
pub use index::{PassageIndex, SearchHit};
pub use registry::DocumentRegistry;
pub use tree::{DocTree, Node, NodeKind};

/// Length of a document key in hex characters
pub const DOCUMENT_KEY_LEN: usize = 32;

/// Deterministic document key: the first 32 hex characters of the SHA-256
/// digest of `input`
pub fn document_key(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    let mut hash = format!("{:x}", hasher.finalize());
    hash.truncate(DOCUMENT_KEY_LEN);
    hash
}
