use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{List, Note, Task};

/// Version written into export bundles
pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Failed to encode or decode '{key}': {source}")]
    JsonError {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid import data: {0}")]
    InvalidImport(String),
}

/// Logical keys of the persisted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Tasks,
    Lists,
    CalendarEvents,
    Notes,
    PomodoroSettings,
    PomodoroStats,
    AppSettings,
    UserProfile,
    Theme,
    AnalyticsCache,
    Challenge,
    ChallengeHabits,
}

impl StorageKey {
    pub const ALL: [StorageKey; 12] = [
        StorageKey::Tasks,
        StorageKey::Lists,
        StorageKey::CalendarEvents,
        StorageKey::Notes,
        StorageKey::PomodoroSettings,
        StorageKey::PomodoroStats,
        StorageKey::AppSettings,
        StorageKey::UserProfile,
        StorageKey::Theme,
        StorageKey::AnalyticsCache,
        StorageKey::Challenge,
        StorageKey::ChallengeHabits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Tasks => "tasks",
            StorageKey::Lists => "lists",
            StorageKey::CalendarEvents => "calendar-events",
            StorageKey::Notes => "notes",
            StorageKey::PomodoroSettings => "pomodoro-settings",
            StorageKey::PomodoroStats => "pomodoro-stats",
            StorageKey::AppSettings => "app-settings",
            StorageKey::UserProfile => "user-profile",
            StorageKey::Theme => "theme",
            StorageKey::AnalyticsCache => "analytics-cache",
            StorageKey::Challenge => "challenge",
            StorageKey::ChallengeHabits => "challenge-habits",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// Cached analytics are derived data and are left out of exports.
    fn exported(&self) -> bool {
        !matches!(self, StorageKey::AnalyticsCache)
    }
}

/// Groups of keys that are cleared together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Tasks,
    Calendar,
    Notes,
    Pomodoro,
    Settings,
    Challenge,
}

impl Module {
    pub fn keys(&self) -> &'static [StorageKey] {
        match self {
            Module::Tasks => &[StorageKey::Tasks, StorageKey::Lists],
            Module::Calendar => &[StorageKey::CalendarEvents],
            Module::Notes => &[StorageKey::Notes],
            Module::Pomodoro => &[StorageKey::PomodoroSettings, StorageKey::PomodoroStats],
            Module::Settings => &[StorageKey::AppSettings, StorageKey::UserProfile, StorageKey::Theme],
            Module::Challenge => &[StorageKey::Challenge, StorageKey::ChallengeHabits],
        }
    }
}

/// Everything `export_all` writes and `import_all` accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    pub export_date: DateTime<Utc>,
    #[serde(flatten)]
    pub documents: BTreeMap<String, serde_json::Value>,
}

/// Key/value store of JSON documents kept in SQLite.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        let db = Database { conn };
        db.initialize_schema()?;
        tracing::debug!(path = %db_path.display(), "database opened");

        Ok(db)
    }

    /// Open a throwaway database that lives only as long as the value.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Read the raw JSON stored under a key
    pub fn get_value(&self, key: StorageKey) -> Result<Option<serde_json::Value>, DatabaseError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?1",
                rusqlite::params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|source| DatabaseError::JsonError {
                key: key.as_str().to_string(),
                source,
            })
        })
        .transpose()
    }

    /// Read and decode a document. Date fields come back as the instants
    /// they were written with.
    pub fn get_json<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Option<T>, DatabaseError> {
        match self.get_value(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| DatabaseError::JsonError {
                    key: key.as_str().to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Encode and store a document, replacing whatever was there
    pub fn set_json<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> Result<(), DatabaseError> {
        let text = serde_json::to_string(value).map_err(|source| DatabaseError::JsonError {
            key: key.as_str().to_string(),
            source,
        })?;
        self.conn.execute(
            "INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key.as_str(), text, Utc::now().to_rfc3339()],
        )?;
        tracing::trace!(key = key.as_str(), bytes = text.len(), "document written");
        Ok(())
    }

    pub fn remove(&self, key: StorageKey) -> Result<(), DatabaseError> {
        self.conn.execute(
            "DELETE FROM documents WHERE key = ?1",
            rusqlite::params![key.as_str()],
        )?;
        Ok(())
    }

    pub fn load_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        Ok(self.get_json(StorageKey::Tasks)?.unwrap_or_default())
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), DatabaseError> {
        self.set_json(StorageKey::Tasks, tasks)
    }

    pub fn load_lists(&self) -> Result<Vec<List>, DatabaseError> {
        Ok(self.get_json(StorageKey::Lists)?.unwrap_or_default())
    }

    pub fn save_lists(&self, lists: &[List]) -> Result<(), DatabaseError> {
        self.set_json(StorageKey::Lists, lists)
    }

    pub fn load_notes(&self) -> Result<Vec<Note>, DatabaseError> {
        Ok(self.get_json(StorageKey::Notes)?.unwrap_or_default())
    }

    pub fn save_notes(&self, notes: &[Note]) -> Result<(), DatabaseError> {
        self.set_json(StorageKey::Notes, notes)
    }

    /// Serialize every exported document into one pretty-printed bundle
    pub fn export_all(&self) -> Result<String, DatabaseError> {
        let mut documents = BTreeMap::new();
        for key in StorageKey::ALL.into_iter().filter(StorageKey::exported) {
            if let Some(value) = self.get_value(key)? {
                documents.insert(key.as_str().to_string(), value);
            }
        }
        let bundle = ExportBundle {
            version: EXPORT_VERSION.to_string(),
            export_date: Utc::now(),
            documents,
        };
        serde_json::to_string_pretty(&bundle).map_err(|source| DatabaseError::JsonError {
            key: "export".to_string(),
            source,
        })
    }

    /// Import a bundle produced by `export_all`. Unknown keys are ignored.
    /// Returns the number of documents written.
    pub fn import_all(&self, json: &str) -> Result<usize, DatabaseError> {
        let bundle: ExportBundle = serde_json::from_str(json)
            .map_err(|e| DatabaseError::InvalidImport(e.to_string()))?;
        if bundle.version.trim().is_empty() {
            return Err(DatabaseError::InvalidImport("missing version".to_string()));
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        for (name, value) in &bundle.documents {
            let Some(key) = StorageKey::parse(name).filter(StorageKey::exported) else {
                tracing::warn!(key = %name, "skipping unknown key in import");
                continue;
            };
            tx.execute(
                "INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key.as_str(), value.to_string(), Utc::now().to_rfc3339()],
            )?;
            written += 1;
        }
        tx.commit()?;
        tracing::info!(documents = written, version = %bundle.version, "import finished");
        Ok(written)
    }

    pub fn clear_module(&self, module: Module) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        for key in module.keys() {
            tx.execute(
                "DELETE FROM documents WHERE key = ?1",
                rusqlite::params![key.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn clear_all(&self) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM documents", [])?;
        Ok(())
    }

    /// Make every later read and write fail.
    #[cfg(test)]
    pub(crate) fn drop_schema(&self) {
        self.conn
            .execute("DROP TABLE documents", [])
            .expect("drop documents table");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{INBOX_LIST_ID, Priority, SubTask};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_task() -> Task {
        let created = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(678);
        let mut task = Task::new("Ship release".into(), INBOX_LIST_ID.into(), created);
        task.due_date = Some(Utc.with_ymd_and_hms(2026, 1, 9, 0, 0, 0).unwrap());
        task.priority = Priority::High;
        task.tags = vec!["release".into(), "work".into()];
        task.subtasks = vec![SubTask::new("Tag build")];
        task.set_completed(true, created + chrono::Duration::microseconds(1_234_567));
        task
    }

    #[test]
    fn tasks_round_trip_with_full_timestamps() {
        let db = Database::in_memory().unwrap();
        let tasks = vec![sample_task()];
        db.save_tasks(&tasks).unwrap();

        let loaded = db.load_tasks().unwrap();
        assert_eq!(loaded, tasks);
        assert_eq!(loaded[0].completed_at, tasks[0].completed_at);
    }

    #[test]
    fn missing_documents_read_as_empty() {
        let db = Database::in_memory().unwrap();
        assert!(db.load_tasks().unwrap().is_empty());
        assert!(db.get_value(StorageKey::Theme).unwrap().is_none());
    }

    #[test]
    fn remove_and_clear_module() {
        let db = Database::in_memory().unwrap();
        db.set_json(StorageKey::Theme, "sage").unwrap();
        db.set_json(StorageKey::Tasks, &Vec::<Task>::new()).unwrap();
        db.set_json(StorageKey::Lists, &Vec::<List>::new()).unwrap();

        db.clear_module(Module::Tasks).unwrap();
        assert!(db.get_value(StorageKey::Tasks).unwrap().is_none());
        assert!(db.get_value(StorageKey::Lists).unwrap().is_none());
        assert_eq!(db.get_json::<String>(StorageKey::Theme).unwrap().as_deref(), Some("sage"));

        db.remove(StorageKey::Theme).unwrap();
        assert!(db.get_value(StorageKey::Theme).unwrap().is_none());
    }

    #[test]
    fn export_then_import_into_fresh_file() {
        let temp = TempDir::new().unwrap();
        let source = Database::new(temp.path().join("a/source.db").to_str().unwrap()).unwrap();
        source.save_tasks(&[sample_task()]).unwrap();
        source.set_json(StorageKey::Theme, "ocean").unwrap();
        source.set_json(StorageKey::AnalyticsCache, &serde_json::json!({"hits": 1})).unwrap();

        let bundle = source.export_all().unwrap();
        let target = Database::new(temp.path().join("target.db").to_str().unwrap()).unwrap();
        let written = target.import_all(&bundle).unwrap();

        assert_eq!(written, 2);
        assert_eq!(target.load_tasks().unwrap(), source.load_tasks().unwrap());
        assert!(target.get_value(StorageKey::AnalyticsCache).unwrap().is_none());
    }

    #[test]
    fn import_rejects_bundle_without_header() {
        let db = Database::in_memory().unwrap();
        let err = db.import_all(r#"{"tasks": []}"#).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidImport(_)));
    }

    #[test]
    fn corrupt_document_reports_key() {
        let db = Database::in_memory().unwrap();
        db.set_json(StorageKey::Tasks, &serde_json::json!([{"title": 3}])).unwrap();
        match db.load_tasks() {
            Err(DatabaseError::JsonError { key, .. }) => assert_eq!(key, "tasks"),
            other => panic!("expected json error, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn clear_all_removes_every_document() {
        let db = Database::in_memory().unwrap();
        db.save_tasks(&[sample_task()]).unwrap();
        db.set_json(StorageKey::Theme, "ocean").unwrap();
        db.set_json(StorageKey::Challenge, &serde_json::json!({"id": "c1"})).unwrap();

        db.clear_all().unwrap();
        for key in StorageKey::ALL {
            assert!(db.get_value(key).unwrap().is_none(), "{} survived", key.as_str());
        }
        db.save_tasks(&[sample_task()]).unwrap();
        assert_eq!(db.load_tasks().unwrap().len(), 1);
    }
}
