//! Atomic snapshot persistence: write-then-rename so a crash never leaves a
//! torn file on disk.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageError, StorageResult};

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// Writes to a temporary file in the same directory as `path` (so the final
/// `rename` is same-filesystem and therefore atomic), then persists it over
/// the target. A reader never observes a partially written file.
///
/// # Errors
///
/// Returns an error if the parent directory does not exist, serialization
/// fails, or the rename cannot complete.
pub fn write_snapshot_atomic<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let json = serde_json::to_vec_pretty(value)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

/// Read and deserialize a snapshot previously written by
/// [`write_snapshot_atomic`].
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if `path` does not exist, or a
/// serialization error if the file is not valid JSON for `T`.
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.display().to_string())
        } else {
            StorageError::Io(e)
        }
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read a snapshot if it exists, or return `T::default()` if the file has
/// never been written.
///
/// # Errors
///
/// Returns a serialization error if the file exists but is not valid JSON.
pub fn read_snapshot_or_default<T: DeserializeOwned + Default>(path: &Path) -> StorageResult<T> {
    match read_snapshot(path) {
        Ok(value) => Ok(value),
        Err(StorageError::NotFound(_)) => Ok(T::default()),
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn round_trips_a_map_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = HashMap::new();
        history.insert("conv-1".to_string(), vec!["hello".to_string(), "world".to_string()]);

        write_snapshot_atomic(&path, &history).unwrap();
        let loaded: HashMap<String, Vec<String>> = read_snapshot(&path).unwrap();
        assert_eq!(loaded, history);
    }

    #[test]
    fn missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = read_snapshot::<HashMap<String, Vec<String>>>(&path).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded: HashMap<String, Vec<String>> = read_snapshot_or_default(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn second_write_fully_replaces_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        write_snapshot_atomic(&path, &vec![1, 2, 3]).unwrap();
        write_snapshot_atomic(&path, &vec![9]).unwrap();

        let loaded: Vec<i32> = read_snapshot(&path).unwrap();
        assert_eq!(loaded, vec![9]);
    }
}
