//! In-memory artifact store for testing and embedding.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::{ArtifactStore, validate_name};

/// An in-memory artifact store.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    artifacts: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.lock().is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        validate_name(name)?;
        Ok(self.artifacts.lock().get(name).cloned())
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        validate_name(name)?;
        self.artifacts
            .lock()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn append(&self, name: &str, bytes: &[u8]) -> Result<()> {
        validate_name(name)?;
        self.artifacts
            .lock()
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(bytes);
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.artifacts.lock().contains_key(name)
    }

    fn remove(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.artifacts.lock().remove(name);
        Ok(())
    }
}
