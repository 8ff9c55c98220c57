use chrono::Utc;
use serde::Serialize;

use super::mapping::{ListRow, NoteRow, TaskRow};
use super::{ChangeEvent, ChangeType, OrderEntry, RemoteError, RemoteTasks, Table};
use crate::models::{List, Note, Task, new_id};

/// In-process stand-in for the hosted tables. Rows are scoped to one owner,
/// inserts get a server-assigned id, and every write is appended to a change
/// feed in the shape real-time subscriptions deliver.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    owner: String,
    tasks: Vec<TaskRow>,
    lists: Vec<ListRow>,
    notes: Vec<NoteRow>,
    changes: Vec<ChangeEvent>,
    fail_next: Option<RemoteError>,
    writes: usize,
}

impl MemoryBackend {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..Self::default()
        }
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&mut self, error: RemoteError) {
        self.fail_next = Some(error);
    }

    /// Take all change notifications recorded since the last drain.
    pub fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.changes)
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn task_rows(&self) -> &[TaskRow] {
        &self.tasks
    }

    pub fn note_rows(&self) -> &[NoteRow] {
        &self.notes
    }

    /// Upsert a row as another client would. Rows owned by someone else are
    /// stored but stay invisible to this owner.
    pub fn upsert_task_row(&mut self, row: TaskRow) {
        let visible = row.user_id == self.owner;
        let old = self.tasks.iter().position(|r| r.id == row.id).map(|i| self.tasks.remove(i));
        let event_type = if old.is_some() { ChangeType::Update } else { ChangeType::Insert };
        if visible {
            self.record(event_type, Table::Tasks, old.as_ref(), Some(&row));
        }
        self.tasks.push(row);
    }

    /// Note counterpart of [`MemoryBackend::upsert_task_row`].
    pub fn upsert_note_row(&mut self, row: NoteRow) {
        let visible = row.user_id == self.owner;
        let old = self.notes.iter().position(|r| r.id == row.id).map(|i| self.notes.remove(i));
        let event_type = if old.is_some() { ChangeType::Update } else { ChangeType::Insert };
        if visible {
            self.record(event_type, Table::Notes, old.as_ref(), Some(&row));
        }
        self.notes.push(row);
    }

    fn check(&mut self) -> Result<(), RemoteError> {
        match self.fail_next.take() {
            Some(err) => {
                tracing::debug!(error = %err, "injected backend failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn record<T: Serialize>(&mut self, event_type: ChangeType, table: Table, old: Option<&T>, new: Option<&T>) {
        self.writes += 1;
        self.changes.push(ChangeEvent {
            event_type,
            table,
            old: old.and_then(|row| serde_json::to_value(row).ok()),
            new: new.and_then(|row| serde_json::to_value(row).ok()),
        });
    }

    fn owned_task(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|r| r.id == id && r.user_id == self.owner)
    }

    fn owned_list(&self, id: &str) -> Option<usize> {
        self.lists.iter().position(|r| r.id == id && r.user_id == self.owner)
    }

    fn owned_note(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|r| r.id == id && r.user_id == self.owner)
    }
}

impl RemoteTasks for MemoryBackend {
    fn fetch_tasks(&mut self) -> Result<Vec<Task>, RemoteError> {
        self.check()?;
        let mut rows: Vec<TaskRow> = self
            .tasks
            .iter()
            .filter(|r| r.user_id == self.owner)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.order_index);
        Ok(rows.into_iter().map(TaskRow::into_task).collect())
    }

    fn create_task(&mut self, task: &Task) -> Result<Task, RemoteError> {
        self.check()?;
        let now = Utc::now();
        let mut row = TaskRow::from_task(task, &self.owner);
        row.id = new_id();
        row.created_at = now;
        row.updated_at = now;
        self.record(ChangeType::Insert, Table::Tasks, None, Some(&row));
        self.tasks.push(row.clone());
        Ok(row.into_task())
    }

    fn update_task(&mut self, task: &Task) -> Result<Task, RemoteError> {
        self.check()?;
        let index = self
            .owned_task(&task.id)
            .ok_or_else(|| RemoteError::NotFound(format!("task {}", task.id)))?;
        let old = self.tasks[index].clone();
        let mut row = TaskRow::from_task(task, &self.owner);
        row.created_at = old.created_at;
        row.updated_at = Utc::now();
        self.record(ChangeType::Update, Table::Tasks, Some(&old), Some(&row));
        self.tasks[index] = row.clone();
        Ok(row.into_task())
    }

    fn delete_task(&mut self, id: &str) -> Result<(), RemoteError> {
        self.check()?;
        let index = self
            .owned_task(id)
            .ok_or_else(|| RemoteError::NotFound(format!("task {}", id)))?;
        let old = self.tasks.remove(index);
        self.record(ChangeType::Delete, Table::Tasks, Some(&old), None);
        Ok(())
    }

    fn reorder_tasks(&mut self, entries: &[OrderEntry]) -> Result<(), RemoteError> {
        self.check()?;
        let now = Utc::now();
        for entry in entries {
            // Unknown ids are skipped, matching a bulk update with no match
            let Some(index) = self.owned_task(&entry.id) else {
                continue;
            };
            let old = self.tasks[index].clone();
            self.tasks[index].order_index = entry.order;
            self.tasks[index].updated_at = now;
            let new = self.tasks[index].clone();
            self.record(ChangeType::Update, Table::Tasks, Some(&old), Some(&new));
        }
        Ok(())
    }

    fn fetch_lists(&mut self) -> Result<Vec<List>, RemoteError> {
        self.check()?;
        let mut rows: Vec<ListRow> = self
            .lists
            .iter()
            .filter(|r| r.user_id == self.owner)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.order_index);
        Ok(rows.into_iter().map(ListRow::into_list).collect())
    }

    fn create_list(&mut self, list: &List) -> Result<List, RemoteError> {
        self.check()?;
        if self.owned_list(&list.id).is_some() {
            return Err(RemoteError::Conflict(format!("list {} already exists", list.id)));
        }
        // List ids are kept so the reserved inbox id survives the round trip
        let row = ListRow::from_list(list, &self.owner);
        self.record(ChangeType::Insert, Table::Lists, None, Some(&row));
        self.lists.push(row.clone());
        Ok(row.into_list())
    }

    fn update_list(&mut self, list: &List) -> Result<List, RemoteError> {
        self.check()?;
        let index = self
            .owned_list(&list.id)
            .ok_or_else(|| RemoteError::NotFound(format!("list {}", list.id)))?;
        let old = self.lists[index].clone();
        let row = ListRow::from_list(list, &self.owner);
        self.record(ChangeType::Update, Table::Lists, Some(&old), Some(&row));
        self.lists[index] = row.clone();
        Ok(row.into_list())
    }

    fn delete_list(&mut self, id: &str) -> Result<(), RemoteError> {
        self.check()?;
        let index = self
            .owned_list(id)
            .ok_or_else(|| RemoteError::NotFound(format!("list {}", id)))?;
        let old = self.lists.remove(index);
        self.record(ChangeType::Delete, Table::Lists, Some(&old), None);
        Ok(())
    }

    fn fetch_notes(&mut self) -> Result<Vec<Note>, RemoteError> {
        self.check()?;
        Ok(self
            .notes
            .iter()
            .filter(|r| r.user_id == self.owner)
            .cloned()
            .map(NoteRow::into_note)
            .collect())
    }

    fn create_note(&mut self, note: &Note) -> Result<Note, RemoteError> {
        self.check()?;
        let row = NoteRow::from_note(note, &self.owner);
        self.record(ChangeType::Insert, Table::Notes, None, Some(&row));
        self.notes.push(row.clone());
        Ok(row.into_note())
    }

    fn update_note(&mut self, note: &Note) -> Result<Note, RemoteError> {
        self.check()?;
        let index = self
            .owned_note(&note.id)
            .ok_or_else(|| RemoteError::NotFound(format!("note {}", note.id)))?;
        let old = self.notes[index].clone();
        let row = NoteRow::from_note(note, &self.owner);
        self.record(ChangeType::Update, Table::Notes, Some(&old), Some(&row));
        self.notes[index] = row.clone();
        Ok(row.into_note())
    }

    fn delete_note(&mut self, id: &str) -> Result<(), RemoteError> {
        self.check()?;
        let index = self
            .owned_note(id)
            .ok_or_else(|| RemoteError::NotFound(format!("note {}", id)))?;
        let old = self.notes.remove(index);
        self.record(ChangeType::Delete, Table::Notes, Some(&old), None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::INBOX_LIST_ID;

    fn task(title: &str) -> Task {
        Task::new(title.into(), INBOX_LIST_ID.into(), Utc::now())
    }

    #[test]
    fn insert_assigns_server_id_and_emits_change() {
        let mut backend = MemoryBackend::new("u1");
        let local = task("Buy milk");
        let stored = backend.create_task(&local).unwrap();

        assert_ne!(stored.id, local.id);
        assert_eq!(stored.title, "Buy milk");
        let changes = backend.drain_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].event_type, ChangeType::Insert);
        assert_eq!(changes[0].new.as_ref().unwrap()["user_id"], "u1");
        assert!(backend.drain_changes().is_empty());
    }

    #[test]
    fn rows_of_other_owners_are_invisible() {
        let mut backend = MemoryBackend::new("u1");
        let mut foreign = TaskRow::from_task(&task("Not mine"), "u2");
        foreign.id = "foreign".into();
        backend.upsert_task_row(foreign);

        assert!(backend.fetch_tasks().unwrap().is_empty());
        assert!(backend.drain_changes().is_empty());
        let err = backend.delete_task("foreign").unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[test]
    fn injected_failure_is_one_shot() {
        let mut backend = MemoryBackend::new("u1");
        backend.fail_next(RemoteError::Network("timeout".into()));
        assert!(backend.create_task(&task("a")).is_err());
        assert!(backend.create_task(&task("b")).is_ok());
        assert_eq!(backend.task_rows().len(), 1);
    }

    #[test]
    fn reorder_updates_order_index() {
        let mut backend = MemoryBackend::new("u1");
        let a = backend.create_task(&task("a")).unwrap();
        let b = backend.create_task(&task("b")).unwrap();
        backend
            .reorder_tasks(&[
                OrderEntry { id: b.id.clone(), order: 0 },
                OrderEntry { id: a.id.clone(), order: 1 },
                OrderEntry { id: "missing".into(), order: 2 },
            ])
            .unwrap();
        let fetched = backend.fetch_tasks().unwrap();
        assert_eq!(fetched[0].id, b.id);
        assert_eq!(fetched[1].id, a.id);
    }

    #[test]
    fn duplicate_list_is_a_conflict() {
        let mut backend = MemoryBackend::new("u1");
        let inbox = List::inbox("Inbox".into());
        backend.create_list(&inbox).unwrap();
        assert!(matches!(backend.create_list(&inbox), Err(RemoteError::Conflict(_))));
    }
}
