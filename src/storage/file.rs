//! File-based artifact store.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, VerityError};
use crate::storage::{ArtifactStore, validate_name};

/// Stores each artifact as a file inside one directory.
///
/// Writes go to a temporary file in the same directory which is then
/// persisted over the target, so readers never observe a partial artifact.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    directory: PathBuf,
}

impl FileArtifactStore {
    /// Open a store rooted at `directory`, creating it if needed.
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            std::fs::create_dir_all(&directory)
                .map_err(|e| VerityError::storage(format!("Failed to create directory: {e}")))?;
        }

        if !directory.is_dir() {
            return Err(VerityError::storage(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        Ok(FileArtifactStore { directory })
    }

    /// Root directory of the store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full path of an artifact.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }
}

impl ArtifactStore for FileArtifactStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        validate_name(name)?;
        match std::fs::read(self.artifact_path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        validate_name(name)?;
        let mut temp = NamedTempFile::new_in(&self.directory)
            .map_err(|e| VerityError::storage(format!("Failed to create temp file: {e}")))?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(self.artifact_path(name))
            .map_err(|e| VerityError::storage(format!("Failed to persist {name}: {}", e.error)))?;
        Ok(())
    }

    fn append(&self, name: &str, bytes: &[u8]) -> Result<()> {
        validate_name(name)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.artifact_path(name))
            .map_err(|e| VerityError::storage(format!("Failed to open {name} for append: {e}")))?;
        file.write_all(bytes)?;
        file.sync_data()?;
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.artifact_path(name).is_file()
    }

    fn remove(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        match std::fs::remove_file(self.artifact_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VerityError::storage(format!("Failed to delete {name}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(temp_dir.path()).unwrap();

        assert!(!store.exists("model.vrty"));
        assert_eq!(store.read("model.vrty").unwrap(), None);

        store.write("model.vrty", b"first").unwrap();
        assert!(store.exists("model.vrty"));
        store.write("model.vrty", b"second").unwrap();
        assert_eq!(store.read("model.vrty").unwrap(), Some(b"second".to_vec()));

        store.remove("model.vrty").unwrap();
        assert!(!store.exists("model.vrty"));
        store.remove("model.vrty").unwrap();
    }

    #[test]
    fn test_append_keeps_existing_lines() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(temp_dir.path()).unwrap();

        store.append("feedback.jsonl", b"{\"a\":1}\n").unwrap();
        store.append("feedback.jsonl", b"{\"a\":2}\n").unwrap();
        let content = std::fs::read_to_string(temp_dir.path().join("feedback.jsonl")).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["{\"a\":1}", "{\"a\":2}"]);
    }

    #[test]
    fn test_creates_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let store = FileArtifactStore::new(&nested).unwrap();
        store.write("m", b"x").unwrap();
        assert!(nested.join("m").is_file());
        // no temp files left behind
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 1);
    }

    #[test]
    fn test_path_is_not_a_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = FileArtifactStore::new(file.path());
        assert!(matches!(result, Err(VerityError::Storage(_))));
    }

    #[test]
    fn test_rejects_escaping_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(temp_dir.path()).unwrap();
        assert!(store.write("../escape", b"x").is_err());
        assert!(!store.exists("../escape"));
    }
}
