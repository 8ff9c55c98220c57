use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Id of the default list. Tasks created without a list land here.
pub const INBOX_LIST_ID: &str = "inbox";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::None, Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Priority::None),
            "low" => Ok(Priority::Low),
            "medium" | "med" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl SubTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    pub list_id: String,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String, list_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title,
            completed: false,
            completed_at: None,
            due_date: None,
            priority: Priority::None,
            tags: Vec::new(),
            list_id,
            subtasks: Vec::new(),
            order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the completion flag, keeping `completed_at` in step with it.
    /// Returns true when the flag actually changed.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) -> bool {
        if self.completed == completed {
            return false;
        }
        self.completed = completed;
        self.completed_at = if completed { Some(now) } else { None };
        true
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }
}

/// Input for creating a task. Everything but the title is optional.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub list_id: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub subtasks: Vec<SubTask>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn in_list(mut self, list_id: impl Into<String>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Partial update for a task. `None` leaves the field untouched; `due_date`
/// uses a nested option so it can be cleared.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub list_id: Option<String>,
    pub subtasks: Option<Vec<SubTask>>,
    pub order: Option<i64>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub order: i64,
}

impl List {
    pub fn new(name: String) -> Self {
        Self {
            id: new_id(),
            name,
            color: None,
            icon: None,
            is_default: false,
            order: 0,
        }
    }

    pub fn inbox(name: String) -> Self {
        Self {
            id: INBOX_LIST_ID.to_string(),
            name,
            color: None,
            icon: Some("inbox".to_string()),
            is_default: true,
            order: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListDraft {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl ListDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListPatch {
    pub name: Option<String>,
    pub color: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Note {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title: String::new(),
            content: String::new(),
            created_at: now,
            updated_at: now,
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<Option<String>>,
}

/// Generate a fresh client-side identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, h, 0, 0).unwrap()
    }

    #[test]
    fn completion_keeps_timestamp_in_step() {
        let mut task = Task::new("Write report".into(), INBOX_LIST_ID.into(), at(8));
        assert!(task.set_completed(true, at(9)));
        assert_eq!(task.completed_at, Some(at(9)));
        assert!(!task.set_completed(true, at(10)));
        assert_eq!(task.completed_at, Some(at(9)));
        assert!(task.set_completed(false, at(11)));
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn priority_parses_loosely() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("med".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn task_serializes_camel_case() {
        let mut task = Task::new("Ship".into(), "work".into(), at(8));
        task.set_completed(true, at(9));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["listId"], "work");
        assert!(json.get("completedAt").is_some());
        assert!(json.get("dueDate").is_none());
        assert_eq!(json["priority"], "none");
    }

    #[test]
    fn overdue_requires_pending_and_past_due() {
        let mut task = Task::new("Pay rent".into(), INBOX_LIST_ID.into(), at(8));
        task.due_date = Some(at(9));
        assert!(task.is_overdue(at(10)));
        assert!(!task.is_overdue(at(8)));
        task.set_completed(true, at(10));
        assert!(!task.is_overdue(at(11)));
    }
}
