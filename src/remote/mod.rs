//! Remote data adapters.
//!
//! The store talks to its backend only through [`RemoteTasks`]. Three
//! backends exist:
//!
//! - [`Offline`]: local-only, every write is accepted as sent
//! - [`RestRemote`]: the REST API, over any [`Transport`]
//! - [`MemoryBackend`]: owner-scoped table rows with a change feed, the way
//!   the hosted database variant behaves

pub mod mapping;
pub mod memory;
pub mod rest;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{List, Note, Task};

pub use mapping::{ListRow, NoteRow, TaskRow};
pub use memory::MemoryBackend;
pub use rest::{Method, RawResponse, RestRemote, RestRequest, Session, TaskQuery, Transport};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
}

impl RemoteError {
    /// Classify a non-2xx HTTP status.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => RemoteError::Validation(message),
            401 | 403 => RemoteError::Auth(message),
            404 => RemoteError::NotFound(message),
            409 => RemoteError::Conflict(message),
            _ => RemoteError::Network(message),
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::Validation(msg) | RemoteError::NotFound(msg) | RemoteError::Conflict(msg) => {
                msg.clone()
            }
            RemoteError::Auth(_) => "unauthorized".to_string(),
            RemoteError::Network(_) => "Network error, please try again".to_string(),
        }
    }
}

/// Envelope every REST response is wrapped in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }
}

/// One `{id, order}` pair of a bulk reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: String,
    pub order: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Tasks,
    Lists,
    Notes,
}

/// Real-time notification of a row change on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub event_type: ChangeType,
    pub table: Table,
    #[serde(default)]
    pub old: Option<serde_json::Value>,
    #[serde(default)]
    pub new: Option<serde_json::Value>,
}

/// CRUD surface of a task backend. Writes return the record as the backend
/// stored it, so server-assigned fields can be merged back.
pub trait RemoteTasks {
    /// True for backends with nothing to fetch from.
    fn is_offline(&self) -> bool {
        false
    }

    fn fetch_tasks(&mut self) -> Result<Vec<Task>, RemoteError>;
    fn create_task(&mut self, task: &Task) -> Result<Task, RemoteError>;
    fn update_task(&mut self, task: &Task) -> Result<Task, RemoteError>;
    fn delete_task(&mut self, id: &str) -> Result<(), RemoteError>;
    fn reorder_tasks(&mut self, entries: &[OrderEntry]) -> Result<(), RemoteError>;

    fn fetch_lists(&mut self) -> Result<Vec<List>, RemoteError>;
    fn create_list(&mut self, list: &List) -> Result<List, RemoteError>;
    fn update_list(&mut self, list: &List) -> Result<List, RemoteError>;
    fn delete_list(&mut self, id: &str) -> Result<(), RemoteError>;

    fn fetch_notes(&mut self) -> Result<Vec<Note>, RemoteError>;
    fn create_note(&mut self, note: &Note) -> Result<Note, RemoteError>;
    fn update_note(&mut self, note: &Note) -> Result<Note, RemoteError>;
    fn delete_note(&mut self, id: &str) -> Result<(), RemoteError>;
}

/// Local-only backend: accepts every write unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl RemoteTasks for Offline {
    fn is_offline(&self) -> bool {
        true
    }

    fn fetch_tasks(&mut self) -> Result<Vec<Task>, RemoteError> {
        Ok(Vec::new())
    }

    fn create_task(&mut self, task: &Task) -> Result<Task, RemoteError> {
        Ok(task.clone())
    }

    fn update_task(&mut self, task: &Task) -> Result<Task, RemoteError> {
        Ok(task.clone())
    }

    fn delete_task(&mut self, _id: &str) -> Result<(), RemoteError> {
        Ok(())
    }

    fn reorder_tasks(&mut self, _entries: &[OrderEntry]) -> Result<(), RemoteError> {
        Ok(())
    }

    fn fetch_lists(&mut self) -> Result<Vec<List>, RemoteError> {
        Ok(Vec::new())
    }

    fn create_list(&mut self, list: &List) -> Result<List, RemoteError> {
        Ok(list.clone())
    }

    fn update_list(&mut self, list: &List) -> Result<List, RemoteError> {
        Ok(list.clone())
    }

    fn delete_list(&mut self, _id: &str) -> Result<(), RemoteError> {
        Ok(())
    }

    fn fetch_notes(&mut self) -> Result<Vec<Note>, RemoteError> {
        Ok(Vec::new())
    }

    fn create_note(&mut self, note: &Note) -> Result<Note, RemoteError> {
        Ok(note.clone())
    }

    fn update_note(&mut self, note: &Note) -> Result<Note, RemoteError> {
        Ok(note.clone())
    }

    fn delete_note(&mut self, _id: &str) -> Result<(), RemoteError> {
        Ok(())
    }
}
