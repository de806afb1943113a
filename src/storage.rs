//! Byte stores for model artifacts.
//!
//! The bootstrapper only needs to read, write and discard named blobs, and
//! the feedback log appends to one. Two backends are provided:
//!
//! - [`FileArtifactStore`]: one file per artifact in a directory, replaced
//!   atomically on write
//! - [`MemoryArtifactStore`]: a shared in-process map for tests and embedding
//!
//! # Example
//!
//! ```
//! use verity::storage::{ArtifactStore, MemoryArtifactStore};
//!
//! let store = MemoryArtifactStore::new();
//! store.write("model.vrty", b"bytes").unwrap();
//! assert_eq!(store.read("model.vrty").unwrap().as_deref(), Some(&b"bytes"[..]));
//! assert!(store.read("other.vrty").unwrap().is_none());
//! ```

pub mod file;
pub mod memory;

pub use file::FileArtifactStore;
pub use memory::MemoryArtifactStore;

use crate::error::{Result, VerityError};

/// A named-blob store holding persisted model artifacts.
pub trait ArtifactStore: Send + Sync + std::fmt::Debug {
    /// Read an artifact. `Ok(None)` when it does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Create or replace an artifact.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Append to an artifact, creating it if needed.
    ///
    /// The default reads and rewrites the whole blob; backends that can
    /// append in place override it.
    fn append(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut existing = self.read(name)?.unwrap_or_default();
        existing.extend_from_slice(bytes);
        self.write(name, &existing)
    }

    /// Check if an artifact exists.
    fn exists(&self, name: &str) -> bool;

    /// Delete an artifact. Removing a missing artifact is not an error.
    fn remove(&self, name: &str) -> Result<()>;
}

/// Reject names that could escape the store's namespace.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        return Err(VerityError::storage(format!(
            "invalid artifact name: {name:?}"
        )));
    }
    Ok(())
}
