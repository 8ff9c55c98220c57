//! Row shapes of the hosted tables and their mapping to local models.
//!
//! Columns are snake_case (`due_date`, `completed_at`, `order_index`,
//! `list_id`, `is_default`); local models are camelCase on the wire.
//! `user_id` stays on the row and never reaches a local model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{List, Note, Priority, SubTask, Task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    pub list_id: String,
    #[serde(default)]
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRow {
    pub fn from_task(task: &Task, owner: &str) -> Self {
        Self {
            id: task.id.clone(),
            user_id: owner.to_string(),
            title: task.title.clone(),
            completed: task.completed,
            completed_at: task.completed_at,
            due_date: task.due_date,
            priority: task.priority,
            tags: task.tags.clone(),
            subtasks: task.subtasks.clone(),
            list_id: task.list_id.clone(),
            order_index: task.order,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }

    pub fn into_task(self) -> Task {
        // Rows written by older clients may carry a flag without a timestamp
        let completed_at = match (self.completed, self.completed_at) {
            (true, None) => Some(self.updated_at),
            (true, at) => at,
            (false, _) => None,
        };
        Task {
            id: self.id,
            title: self.title,
            completed: self.completed,
            completed_at,
            due_date: self.due_date,
            priority: self.priority,
            tags: self.tags,
            list_id: self.list_id,
            subtasks: self.subtasks,
            order: self.order_index,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub order_index: i64,
}

impl ListRow {
    pub fn from_list(list: &List, owner: &str) -> Self {
        Self {
            id: list.id.clone(),
            user_id: owner.to_string(),
            name: list.name.clone(),
            color: list.color.clone(),
            icon: list.icon.clone(),
            is_default: list.is_default,
            order_index: list.order,
        }
    }

    pub fn into_list(self) -> List {
        List {
            id: self.id,
            name: self.name,
            color: self.color,
            icon: self.icon,
            is_default: self.is_default,
            order: self.order_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteRow {
    pub fn from_note(note: &Note, owner: &str) -> Self {
        Self {
            id: note.id.clone(),
            user_id: owner.to_string(),
            title: note.title.clone(),
            content: note.content.clone(),
            summary: note.summary.clone(),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }

    pub fn into_note(self) -> Note {
        Note {
            id: self.id,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
            updated_at: self.updated_at,
            summary: self.summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn task_row_uses_column_names() {
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap();
        let mut task = Task::new("Review PR".into(), "work".into(), now);
        task.order = 4;
        task.due_date = Some(now);
        let row = TaskRow::from_task(&task, "user-1");
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["list_id"], "work");
        assert_eq!(json["order_index"], 4);
        assert_eq!(json["user_id"], "user-1");
        assert!(json.get("due_date").is_some());
        assert!(json.get("listId").is_none());

        assert_eq!(row.into_task(), task);
    }

    #[test]
    fn completed_row_without_timestamp_gets_one() {
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap();
        let row: TaskRow = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "user_id": "u1",
            "title": "Legacy",
            "completed": true,
            "list_id": "inbox",
            "created_at": now,
            "updated_at": now,
        }))
        .unwrap();
        let task = row.into_task();
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(now));
    }

    #[test]
    fn list_row_maps_default_flag() {
        let list = List::inbox("Inbox".into());
        let json = serde_json::to_value(ListRow::from_list(&list, "u1")).unwrap();
        assert_eq!(json["is_default"], true);
        assert_eq!(json["order_index"], 0);
    }
}
