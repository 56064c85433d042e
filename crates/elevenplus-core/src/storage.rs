//! Durable local storage: a string key-value backend plus a typed layer that
//! treats bad data as absent and write failures as non-fatal.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::history::{AttemptRecord, Granularity, HistoryLog, SubjectFilter, HISTORY_CAP};
use crate::sampling::QuestionCount;
use crate::session::SavedSession;

/// Key of the in-progress session snapshot.
pub const PROGRESS_KEY: &str = "elevenPlusTestProgress";
/// Key of the attempt history log.
pub const HISTORY_KEY: &str = "elevenPlusTestHistory";
/// Key of the last-used test setup choices.
pub const SETUP_PREFS_KEY: &str = "elevenPlusTestSetup";
/// Key of the trend view choices.
pub const TREND_PREFS_KEY: &str = "elevenPlusTrendsPrefs";

/// A synchronous string blob store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        std::fs::write(&tmp, value).map_err(io_err)?;
        std::fs::rename(&tmp, self.path_for(key)).map_err(io_err)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// In-process store. Can be told to reject writes, like a full or
/// disabled browser store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            Err(StorageError::Unavailable("quota exceeded".into()))
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.lock().remove(key);
        Ok(())
    }
}

/// Last-used test setup choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPrefs {
    #[serde(default)]
    pub question_count: QuestionCount,
    #[serde(default)]
    pub timer_enabled: bool,
}

/// Last-used trend view choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPrefs {
    #[serde(default)]
    pub exam_filter: SubjectFilter,
    #[serde(default)]
    pub granularity: Granularity,
    /// Share of the most recent buckets to show, 1..=100.
    #[serde(default = "default_range_percent")]
    pub range_percent: u8,
}

fn default_range_percent() -> u8 {
    100
}

impl Default for TrendPrefs {
    fn default() -> Self {
        Self {
            exam_filter: SubjectFilter::All,
            granularity: Granularity::Week,
            range_percent: default_range_percent(),
        }
    }
}

/// Typed access to the persisted blobs.
///
/// Reads of missing or malformed data return the empty default; writes
/// report success as a `bool` and log failures instead of returning them.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
    history_cap: usize,
}

impl Storage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            history_cap: HISTORY_CAP,
        }
    }

    /// Storage backed by an in-process map.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap.max(1);
        self
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("could not read '{key}': {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("ignoring malformed '{key}': {e}");
                None
            }
        }
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("could not serialize '{key}': {e}");
                return false;
            }
        };
        match self.store.set(key, &json) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("could not persist '{key}': {e}");
                false
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("could not clear '{key}': {e}");
                false
            }
        }
    }

    pub fn load_progress(&self) -> Option<SavedSession> {
        self.load_json(PROGRESS_KEY)
    }

    pub fn save_progress(&self, saved: &SavedSession) -> bool {
        self.save_json(PROGRESS_KEY, saved)
    }

    pub fn clear_progress(&self) -> bool {
        self.remove(PROGRESS_KEY)
    }

    /// The stored log. Entries that no longer parse are skipped so the
    /// valid ones survive the next append.
    pub fn load_history(&self) -> HistoryLog {
        let entries: Vec<serde_json::Value> = self.load_json(HISTORY_KEY).unwrap_or_default();
        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<AttemptRecord>(entry) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("skipping malformed history entry {index}: {e}"),
            }
        }
        HistoryLog::from(records)
    }

    /// Append to the log, evicting the oldest entries beyond the cap.
    pub fn append_history(&self, record: AttemptRecord) -> bool {
        let mut log = self.load_history();
        log.push(record, self.history_cap);
        self.save_json(HISTORY_KEY, &log)
    }

    pub fn clear_history(&self) -> bool {
        self.remove(HISTORY_KEY)
    }

    pub fn load_setup_prefs(&self) -> SetupPrefs {
        self.load_json(SETUP_PREFS_KEY).unwrap_or_default()
    }

    pub fn save_setup_prefs(&self, prefs: &SetupPrefs) -> bool {
        self.save_json(SETUP_PREFS_KEY, prefs)
    }

    pub fn load_trend_prefs(&self) -> TrendPrefs {
        self.load_json(TREND_PREFS_KEY).unwrap_or_default()
    }

    pub fn save_trend_prefs(&self, prefs: &TrendPrefs) -> bool {
        self.save_json(TREND_PREFS_KEY, prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::attempt;
    use crate::model::Subject;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn file_store_roundtrip_and_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.get("absent").unwrap(), None);
        store.set("k", "{\"a\":1}").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("{\"a\":1}"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn malformed_blobs_read_as_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, "not json").unwrap();
        store.set(SETUP_PREFS_KEY, "[1,2,3]").unwrap();
        store.set(PROGRESS_KEY, "{\"subject\":\"maths\"}").unwrap();
        let storage = Storage::new(store);

        assert!(storage.load_history().is_empty());
        assert_eq!(storage.load_setup_prefs(), SetupPrefs::default());
        assert!(storage.load_progress().is_none());
        assert_eq!(storage.load_trend_prefs().range_percent, 100);
    }

    #[test]
    fn zero_question_count_in_prefs_reads_as_default() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(SETUP_PREFS_KEY, r#"{"questionCount":0,"timerEnabled":true}"#)
            .unwrap();
        let storage = Storage::new(store);
        assert_eq!(storage.load_setup_prefs().question_count, QuestionCount::All);
    }

    #[test]
    fn malformed_history_entry_does_not_wipe_the_log() {
        let store = Arc::new(MemoryStore::new());
        let storage = Storage::new(store.clone());
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        for i in 0..3 {
            storage.append_history(attempt(Subject::Maths, base + Duration::days(i), 50));
        }

        let raw = store.get(HISTORY_KEY).unwrap().unwrap();
        let mut entries: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        let mut bad = entries[0].clone();
        bad["subject"] = serde_json::json!("science");
        entries.insert(1, bad);
        store
            .set(HISTORY_KEY, &serde_json::to_string(&entries).unwrap())
            .unwrap();

        assert_eq!(storage.load_history().len(), 3);
        assert!(storage.append_history(attempt(Subject::English, base + Duration::days(5), 80)));
        let log = storage.load_history();
        assert_eq!(log.len(), 4);
        assert_eq!(log.entries()[3].subject, Subject::English);
    }

    #[test]
    fn failed_writes_are_reported_not_raised() {
        let store = Arc::new(MemoryStore::new());
        let storage = Storage::new(store.clone());
        store.set_fail_writes(true);
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert!(!storage.append_history(attempt(Subject::Maths, at, 50)));
        assert!(!storage.clear_progress());
        store.set_fail_writes(false);
        assert!(storage.append_history(attempt(Subject::Maths, at, 50)));
        assert_eq!(storage.load_history().len(), 1);
    }

    #[test]
    fn history_cap_is_applied_on_append() {
        let storage = Storage::in_memory().with_history_cap(3);
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        for i in 0..5 {
            storage.append_history(attempt(
                Subject::English,
                base + Duration::days(i),
                10 * i as u32,
            ));
        }
        let log = storage.load_history();
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[0].percentage, 20);
    }

    #[test]
    fn prefs_roundtrip_with_camel_case_keys() {
        let storage = Storage::in_memory();
        let prefs = SetupPrefs {
            question_count: QuestionCount::Sample(10),
            timer_enabled: true,
        };
        assert!(storage.save_setup_prefs(&prefs));
        assert_eq!(storage.load_setup_prefs(), prefs);

        let json = serde_json::to_value(TrendPrefs::default()).unwrap();
        assert_eq!(json["examFilter"], "all");
        assert_eq!(json["granularity"], "week");
        assert_eq!(json["rangePercent"], 100);
    }
}
