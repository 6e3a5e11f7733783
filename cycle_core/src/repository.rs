//! Persistence boundary for cycle records.
//!
//! The engine only needs two operations from storage: fetch a user's
//! records and append one. [`JsonlRepository`] keeps one JSON-lines file per
//! user with file locking so concurrent processes can append safely;
//! [`InMemoryRepository`] serves embedding and tests.
//!
//! Both stores key records by start date: appending a record whose start
//! date already exists supersedes the earlier one when fetched. That is how
//! a widened end date is persisted without rewriting the log.

use crate::config::EngineConfig;
use crate::error::RepositoryError;
use crate::{CycleHistory, CycleRecord, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Storage contract consumed by the engine.
pub trait CycleRepository {
    /// All records for `user_id`, or `NotFound` if the user has none stored.
    fn fetch(&self, user_id: &str) -> RepositoryResult<Vec<CycleRecord>>;

    fn append(&mut self, user_id: &str, record: &CycleRecord) -> RepositoryResult<()>;
}

/// Fetch records and derive predictions for them.
pub fn fetch_history<R: CycleRepository + ?Sized>(
    repo: &R,
    user_id: &str,
    config: &EngineConfig,
) -> Result<CycleHistory> {
    let cycles = repo.fetch(user_id)?;
    CycleHistory::from_cycles(cycles, config)
}

/// Like [`fetch_history`] but a user with no stored data gets an empty history.
pub fn fetch_history_or_empty<R: CycleRepository + ?Sized>(
    repo: &R,
    user_id: &str,
    config: &EngineConfig,
) -> Result<CycleHistory> {
    match repo.fetch(user_id) {
        Ok(cycles) => CycleHistory::from_cycles(cycles, config),
        Err(e) if e.is_not_found() => {
            tracing::info!("No stored cycles for {:?}, starting empty", user_id);
            Ok(CycleHistory::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Refuse a record that would supersede an existing one with an earlier end.
fn check_supersede(existing: &[CycleRecord], record: &CycleRecord) -> RepositoryResult<()> {
    let current = existing
        .iter()
        .rev()
        .find(|c| c.start_date == record.start_date);
    match current {
        Some(current) if record.end_date < current.end_date => {
            Err(RepositoryError::EndDateNarrowed {
                start: record.start_date,
                current: current.end_date,
                requested: record.end_date,
            })
        }
        _ => Ok(()),
    }
}

/// Collapse records sharing a start date, keeping the last one written.
fn latest_per_start(records: Vec<CycleRecord>) -> Vec<CycleRecord> {
    let mut by_start: BTreeMap<NaiveDate, CycleRecord> = BTreeMap::new();
    for record in records {
        by_start.insert(record.start_date, record);
    }
    by_start.into_values().collect()
}

fn validate_user_id(user_id: &str) -> RepositoryResult<()> {
    let valid = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RepositoryError::InvalidUserId(user_id.to_string()))
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct InMemoryRepository {
    users: HashMap<String, Vec<CycleRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CycleRepository for InMemoryRepository {
    fn fetch(&self, user_id: &str) -> RepositoryResult<Vec<CycleRecord>> {
        self.users
            .get(user_id)
            .map(|records| latest_per_start(records.clone()))
            .ok_or_else(|| RepositoryError::NotFound {
                user_id: user_id.to_string(),
            })
    }

    fn append(&mut self, user_id: &str, record: &CycleRecord) -> RepositoryResult<()> {
        validate_user_id(user_id)?;
        let records = self.users.entry(user_id.to_string()).or_default();
        check_supersede(records, record)?;
        records.push(record.clone());
        Ok(())
    }
}

// ============================================================================
// JSON-lines store
// ============================================================================

/// One `<user_id>.jsonl` file per user under a root directory.
pub struct JsonlRepository {
    root: PathBuf,
}

impl JsonlRepository {
    /// Create a store rooted at `root` (typically `<data_dir>/cycles`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the log file for `user_id`.
    pub fn path_for(&self, user_id: &str) -> RepositoryResult<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.root.join(format!("{}.jsonl", user_id)))
    }
}

impl CycleRepository for JsonlRepository {
    fn fetch(&self, user_id: &str) -> RepositoryResult<Vec<CycleRecord>> {
        let path = self.path_for(user_id)?;
        if !path.exists() {
            return Err(RepositoryError::NotFound {
                user_id: user_id.to_string(),
            });
        }
        let records = read_records(&path)?;
        Ok(latest_per_start(records))
    }

    fn append(&mut self, user_id: &str, record: &CycleRecord) -> RepositoryResult<()> {
        let path = self.path_for(user_id)?;
        std::fs::create_dir_all(&self.root)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        // Acquire exclusive lock
        file.lock_exclusive()?;

        let existing = parse_records(BufReader::new(&file), &path)?;
        if let Err(e) = check_supersede(&existing, record) {
            file.unlock()?;
            return Err(e);
        }

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.sync_all()?;
        file.unlock()?;

        tracing::debug!(
            "Appended cycle starting {} for {:?}",
            record.start_date,
            user_id
        );
        Ok(())
    }
}

/// Read every parseable record from a log file, in write order.
///
/// Corrupt lines (for example a torn final write) are skipped with a warning.
pub fn read_records(path: &Path) -> RepositoryResult<Vec<CycleRecord>> {
    let file = File::open(path)?;
    // Acquire shared lock for reading
    file.lock_shared()?;

    let records = parse_records(BufReader::new(&file), path)?;

    file.unlock()?;
    tracing::debug!("Read {} cycle records from {:?}", records.len(), path);
    Ok(records)
}

fn parse_records(reader: impl BufRead, path: &Path) -> RepositoryResult<Vec<CycleRecord>> {
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CycleRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable cycle at {:?} line {}: {}",
                    path,
                    line_num + 1,
                    e
                );
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flow;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(start: NaiveDate, end: NaiveDate) -> CycleRecord {
        CycleRecord::new(start, end, Flow::Medium).with_symptoms(["cramps"])
    }

    #[test]
    fn test_jsonl_append_and_fetch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = JsonlRepository::new(temp_dir.path().join("cycles"));

        repo.append("alice", &record(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap();
        repo.append("alice", &record(date(2024, 1, 29), date(2024, 2, 2)))
            .unwrap();

        let records = repo.fetch("alice").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].start_date, date(2024, 1, 1));
        assert!(records[1].symptoms.contains("cramps"));
    }

    #[test]
    fn test_jsonl_missing_user_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = JsonlRepository::new(temp_dir.path());

        let err = repo.fetch("nobody").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_jsonl_later_line_supersedes_same_start() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = JsonlRepository::new(temp_dir.path());

        repo.append("alice", &record(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap();
        repo.append("alice", &record(date(2024, 1, 1), date(2024, 1, 8)))
            .unwrap();

        let records = repo.fetch("alice").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].end_date, date(2024, 1, 8));
    }

    #[test]
    fn test_superseding_record_cannot_shorten() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut jsonl = JsonlRepository::new(temp_dir.path());
        let mut memory = InMemoryRepository::new();
        let repos: [&mut dyn CycleRepository; 2] = [&mut jsonl, &mut memory];

        for repo in repos {
            repo.append("alice", &record(date(2024, 1, 1), date(2024, 1, 5)))
                .unwrap();

            let err = repo
                .append("alice", &record(date(2024, 1, 1), date(2024, 1, 2)))
                .unwrap_err();
            assert!(matches!(err, RepositoryError::EndDateNarrowed { .. }));

            let records = repo.fetch("alice").unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].end_date, date(2024, 1, 5));
        }
    }

    #[test]
    fn test_jsonl_skips_corrupt_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = JsonlRepository::new(temp_dir.path());
        repo.append("alice", &record(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap();

        let path = repo.path_for("alice").unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"startDate\": \"2024-0\n").unwrap();

        repo.append("alice", &record(date(2024, 2, 1), date(2024, 2, 5)))
            .unwrap();

        let records = repo.fetch("alice").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_user_ids_are_restricted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = JsonlRepository::new(temp_dir.path());

        let err = repo
            .append("../escape", &record(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidUserId(_)));
        assert!(repo.path_for("").is_err());
        assert!(repo.path_for("user_123-b").is_ok());
    }

    #[test]
    fn test_users_are_isolated() {
        let mut repo = InMemoryRepository::new();
        repo.append("alice", &record(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap();

        assert_eq!(repo.fetch("alice").unwrap().len(), 1);
        assert!(repo.fetch("bob").unwrap_err().is_not_found());
    }

    #[test]
    fn test_fetch_history_derives_predictions() {
        let mut repo = InMemoryRepository::new();
        repo.append("alice", &record(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap();

        let config = EngineConfig::default();
        let history = fetch_history(&repo, "alice", &config).unwrap();
        assert_eq!(
            history.predictions.unwrap().next_period_start,
            date(2024, 1, 29)
        );

        let err = fetch_history(&repo, "bob", &config).unwrap_err();
        assert!(matches!(err, crate::Error::Repository(ref e) if e.is_not_found()));

        let empty = fetch_history_or_empty(&repo, "bob", &config).unwrap();
        assert!(empty.is_empty());
    }
}
