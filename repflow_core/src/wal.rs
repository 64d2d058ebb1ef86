//! Write-Ahead Log (WAL) for session summaries.
//!
//! Summaries are appended to a JSONL (JSON Lines) file with file locking
//! so the CLI and an exporter can share it safely.

use crate::{Result, SessionSummary};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for completed session summaries
pub trait SummarySink {
    fn append(&mut self, summary: &SessionSummary) -> Result<()>;
}

/// JSONL-based summary sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SummarySink for JsonlSink {
    fn append(&mut self, summary: &SessionSummary) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(summary)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended summary {} to WAL", summary.id);
        Ok(())
    }
}

/// Keeps summaries in memory
impl SummarySink for Vec<SessionSummary> {
    fn append(&mut self, summary: &SessionSummary) -> Result<()> {
        self.push(summary.clone());
        Ok(())
    }
}

/// Read all summaries from a WAL file
///
/// Lines that fail to parse are logged and skipped.
pub fn read_summaries(path: &Path) -> Result<Vec<SessionSummary>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut summaries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionSummary>(&line) {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                tracing::warn!("Failed to parse summary at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} summaries from WAL", summaries.len());
    Ok(summaries)
}

/// Most recent `limit` summaries, newest first
pub fn recent_summaries(path: &Path, limit: usize) -> Result<Vec<SessionSummary>> {
    let mut summaries = read_summaries(path)?;
    summaries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    summaries.truncate(limit);
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn create_test_summary(name: &str) -> SessionSummary {
        SessionSummary {
            id: Uuid::new_v4(),
            program_name: name.into(),
            completed_at: Utc::now(),
            total_elapsed_seconds: 300,
            step_count: 4,
            zone_durations: BTreeMap::new(),
            set_records: vec![],
        }
    }

    #[test]
    fn test_append_and_read_single_summary() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("nested").join("test.wal");

        let summary = create_test_summary("Squat day");
        let id = summary.id;

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&summary).unwrap();

        let summaries = read_summaries(&wal_path).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, id);
    }

    #[test]
    fn test_append_multiple_summaries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let mut sink = JsonlSink::new(&wal_path);
        for i in 0..5 {
            sink.append(&create_test_summary(&format!("p{}", i))).unwrap();
        }

        assert_eq!(read_summaries(&wal_path).unwrap().len(), 5);
    }

    #[test]
    fn test_read_missing_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let summaries = read_summaries(&temp_dir.path().join("nonexistent.wal")).unwrap();
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_corrupt_lines_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&create_test_summary("good")).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
            writeln!(file, "{{\"id\": \"truncated").unwrap();
            writeln!(file).unwrap();
        }
        sink.append(&create_test_summary("also good")).unwrap();

        let summaries = read_summaries(&wal_path).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].program_name, "also good");
    }

    #[test]
    fn test_recent_summaries_newest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");
        let mut sink = JsonlSink::new(&wal_path);

        for days_ago in [3, 1, 2] {
            let mut summary = create_test_summary(&format!("{} days ago", days_ago));
            summary.completed_at = Utc::now() - Duration::days(days_ago);
            sink.append(&summary).unwrap();
        }

        let recent = recent_summaries(&wal_path, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].program_name, "1 days ago");
        assert_eq!(recent[1].program_name, "2 days ago");
    }
}
