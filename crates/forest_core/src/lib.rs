//! Portable decision-tree forest for page classification
//!
//! Defines the artifact a trainer writes and a scorer reads: nested tree
//! nodes, the per-fold forest with its feature names, and the serializer
//! that turns any array-backed fitted tree into the nested form.
//!
//! Modules:
//! - `tree`: Portable tree nodes, the `TreeSource` view and the serializer
//! - `forest`: The persisted forest export and its validation
//! - `serialization`: Canonical JSON helpers
//! - `errors`: Error types

pub mod errors;
pub mod forest;
pub mod serialization;
pub mod tree;

pub use errors::ForestError;
pub use forest::{ForestExport, N_CLASSES};
pub use serialization::canonical_json_bytes;
pub use tree::{serialize_tree, TreeNode, TreeSource};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
