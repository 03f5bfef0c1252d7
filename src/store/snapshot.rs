//! JSON snapshots of an object store.

use crate::core::{ObjectId, RepositoryObject, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub objects: Vec<RepositoryObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protected: Vec<ObjectId>,
}

impl StoreSnapshot {
    pub fn new(objects: Vec<RepositoryObject>, protected: Vec<ObjectId>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            objects,
            protected,
        }
    }
}

/// Reads and atomically replaces a snapshot file.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes to a temp file in the target directory, then renames it over
    /// the snapshot.
    pub fn save(&self, snapshot: &StoreSnapshot) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Io(format!("Failed to create snapshot directory: {}", e)))?;

        let temp = NamedTempFile::new_in(&dir)
            .map_err(|e| StoreError::Io(format!("Failed to create temp snapshot: {}", e)))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer
                .flush()
                .map_err(|e| StoreError::Io(format!("Failed to flush snapshot: {}", e)))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::Io(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.path)
            .map_err(|e| StoreError::Io(format!("Failed to rename snapshot: {}", e.error)))?;
        Ok(())
    }

    /// Returns `None` when the file does not exist yet.
    pub fn load(&self) -> StoreResult<Option<StoreSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path)
            .map_err(|e| StoreError::Io(format!("Failed to open snapshot: {}", e)))?;
        let snapshot: StoreSnapshot = serde_json::from_reader(BufReader::new(file))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Serialization(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("store.json"));
        assert!(file.load().unwrap().is_none());

        let snapshot = StoreSnapshot::new(
            vec![
                RepositoryObject::new("demo:1").with_model("Item"),
                RepositoryObject::new("demo:2").with_model("Other"),
            ],
            vec![ObjectId::new("demo:2")],
        );
        file.save(&snapshot).unwrap();
        assert!(file.exists());

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.objects, snapshot.objects);
        assert_eq!(loaded.protected, snapshot.protected);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(
            &path,
            r#"{"version": 7, "saved_at": "2024-01-01T00:00:00Z", "objects": []}"#,
        )
        .unwrap();

        let err = SnapshotFile::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        let err = SnapshotFile::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
