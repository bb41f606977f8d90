//! Append-only newline-delimited event log (`events.json`).
//!
//! Durability here is best-effort: a torn final line from a crash mid-write
//! is tolerated by [`EventLog::replay`], which skips any line that fails to
//! parse rather than failing the whole replay.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::StorageResult;

/// An append-only, newline-delimited JSON log file.
pub struct EventLog {
    path: PathBuf,
    file: File,
}

impl EventLog {
    /// Open (creating if necessary) the log file at `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Serialize `event` as one JSON line and append it, flushing
    /// immediately so a crash loses at most the in-flight write.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn append<T: Serialize>(&mut self, event: &T) -> StorageResult<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.flush()?;
        Ok(())
    }

    /// Replay every successfully-parsed line in order.
    ///
    /// Lines that fail to deserialize (a torn write from a crash) are
    /// skipped with a warning rather than aborting the replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for reading.
    pub fn replay<T: DeserializeOwned>(path: &Path) -> StorageResult<Vec<T>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);
        let mut events = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(line = line_no, error = %e, "skipping unparsable event-log line"),
            }
        }
        Ok(events)
    }

    /// The path this log writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Rec {
        seq: u64,
        msg: String,
    }

    #[test]
    fn appended_records_replay_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");

        let mut log = EventLog::open(&path).unwrap();
        log.append(&Rec { seq: 1, msg: "a".into() }).unwrap();
        log.append(&Rec { seq: 2, msg: "b".into() }).unwrap();
        drop(log);

        let replayed: Vec<Rec> = EventLog::replay(&path).unwrap();
        assert_eq!(replayed, vec![Rec { seq: 1, msg: "a".into() }, Rec { seq: 2, msg: "b".into() }]);
    }

    #[test]
    fn replay_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let replayed: Vec<Rec> = EventLog::replay(&path).unwrap();
        assert!(replayed.is_empty());
    }

    #[test]
    fn reopening_appends_rather_than_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");

        EventLog::open(&path).unwrap().append(&Rec { seq: 1, msg: "a".into() }).unwrap();
        EventLog::open(&path).unwrap().append(&Rec { seq: 2, msg: "b".into() }).unwrap();

        let replayed: Vec<Rec> = EventLog::replay(&path).unwrap();
        assert_eq!(replayed.len(), 2);
    }

    #[test]
    fn a_torn_trailing_line_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");

        let mut log = EventLog::open(&path).unwrap();
        log.append(&Rec { seq: 1, msg: "a".into() }).unwrap();
        drop(log);
        std::fs::OpenOptions::new().append(true).open(&path).unwrap().write_all(b"{\"seq\":2,\"m").unwrap();

        let replayed: Vec<Rec> = EventLog::replay(&path).unwrap();
        assert_eq!(replayed, vec![Rec { seq: 1, msg: "a".into() }]);
    }
}
