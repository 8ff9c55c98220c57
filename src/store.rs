//! The task and list store.
//!
//! Every mutation follows the same path: validate, apply in memory, persist
//! locally, notify subscribers, then write to the remote. A failed remote
//! write restores the state captured before the mutation.

use std::str::FromStr;

use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::{INBOX_LIST_ID, List, ListDraft, ListPatch, Task, TaskDraft, TaskPatch};
use crate::remote::{ChangeEvent, OrderEntry, RemoteError, RemoteTasks, Table};
use crate::utils::Clock;
use crate::views::{self, ListRef};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// What changed. Delivered to subscribers after the in-memory state has been
/// updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TaskCreated { id: String },
    TaskUpdated { id: String },
    TaskDeleted { id: String },
    TaskMoved { id: String, list_id: String },
    TasksReordered { list_id: String },
    ListsChanged,
    SelectionChanged,
    /// The remote stored a write differently than it was sent (new id,
    /// server timestamps).
    Reconciled { local_id: String, remote_id: String },
    /// A remote write failed and the optimistic change was undone.
    RolledBack { reason: String },
    Refreshed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Before,
    After,
}

impl FromStr for DropPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(DropPosition::Before),
            "after" => Ok(DropPosition::After),
            other => Err(format!("expected 'before' or 'after', got '{}'", other)),
        }
    }
}

struct Snapshot {
    tasks: Vec<Task>,
    lists: Vec<List>,
    selected_task: Option<String>,
    active_list: ListRef,
}

type Subscriber = Box<dyn FnMut(&StoreEvent)>;

pub struct TaskStore<R> {
    remote: R,
    clock: Box<dyn Clock>,
    database: Option<Database>,
    default_list_name: String,
    tasks: Vec<Task>,
    lists: Vec<List>,
    active_list: ListRef,
    selected_task: Option<String>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl<R: RemoteTasks> TaskStore<R> {
    pub fn new(remote: R, clock: impl Clock + 'static) -> Self {
        Self {
            remote,
            clock: Box::new(clock),
            database: None,
            default_list_name: "Inbox".to_string(),
            tasks: Vec::new(),
            lists: Vec::new(),
            active_list: ListRef::Inbox,
            selected_task: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_default_list_name(mut self, name: impl Into<String>) -> Self {
        self.default_list_name = name.into();
        self
    }

    pub fn database(&self) -> Option<&Database> {
        self.database.as_ref()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    /// Read the persisted collections, replacing what is in memory.
    pub fn load(&mut self) -> Result<(), StoreError> {
        if let Some(db) = &self.database {
            self.tasks = db.load_tasks()?;
            self.lists = db.load_lists()?;
            tracing::debug!(tasks = self.tasks.len(), lists = self.lists.len(), "loaded store");
        }
        self.drop_dangling_selection();
        Ok(())
    }

    /// Drop all subscribers.
    pub fn shutdown(&mut self) {
        self.subscribers.clear();
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    // ---- reads ----

    pub fn list_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn list_lists(&self) -> &[List] {
        &self.lists
    }

    pub fn get_list(&self, id: &str) -> Option<&List> {
        self.lists.iter().find(|l| l.id == id)
    }

    /// The list flagged as default, else the first list.
    pub fn default_list(&self) -> Option<&List> {
        self.lists
            .iter()
            .find(|l| l.is_default)
            .or_else(|| self.lists.first())
    }

    pub fn tasks_in_list(&self, list_id: &str) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.list_id == list_id).collect();
        views::sort_by_order(&mut tasks);
        tasks
    }

    pub fn active_list(&self) -> &ListRef {
        &self.active_list
    }

    pub fn set_active_list(&mut self, list: ListRef) {
        if self.active_list != list {
            self.active_list = list;
            self.notify(&StoreEvent::SelectionChanged);
        }
    }

    /// Tasks of the active list as of now.
    pub fn active_tasks(&self) -> Vec<&Task> {
        views::filter_tasks(&self.tasks, &self.active_list, self.clock.local_now())
    }

    pub fn selected_task_id(&self) -> Option<&str> {
        self.selected_task.as_deref()
    }

    pub fn select_task(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        if let Some(id) = id {
            self.index_of(id)?;
        }
        self.selected_task = id.map(str::to_string);
        self.notify(&StoreEvent::SelectionChanged);
        Ok(())
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve_task_id(&self, input: &str) -> Result<String, StoreError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(StoreError::Validation("task id cannot be empty".to_string()));
        }
        if self.get_task(input).is_some() {
            return Ok(input.to_string());
        }
        let matches: Vec<&str> = self
            .tasks
            .iter()
            .filter(|t| t.id.starts_with(input))
            .map(|t| t.id.as_str())
            .collect();
        match matches.as_slice() {
            [] => Err(StoreError::NotFound(format!("task {}", input))),
            [only] => Ok(only.to_string()),
            many => Err(StoreError::Validation(format!(
                "task id '{}' is ambiguous ({} matches)",
                input,
                many.len()
            ))),
        }
    }

    // ---- task writes ----

    pub fn create_task(&mut self, draft: TaskDraft) -> Result<Task, StoreError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Validation("title is required".to_string()));
        }
        let requested = draft
            .list_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != INBOX_LIST_ID);
        if let Some(id) = requested {
            self.check_list_target(id)?;
        }

        let snapshot = self.snapshot();
        let (list_id, new_default) = match requested {
            Some(id) => (id.to_string(), None),
            None => self.ensure_default_list(),
        };

        let now = self.clock.now();
        let mut task = Task::new(title, list_id, now);
        task.due_date = draft.due_date;
        task.priority = draft.priority;
        task.tags = dedup_tags(draft.tags);
        task.subtasks = draft.subtasks;
        task.order = self.next_order(&task.list_id);

        self.tasks.push(task.clone());
        self.persist_or_restore(&snapshot)?;
        if new_default.is_some() {
            self.notify(&StoreEvent::ListsChanged);
        }
        self.notify(&StoreEvent::TaskCreated { id: task.id.clone() });
        tracing::debug!(task = %task.id, list = %task.list_id, "created task");

        let (stored_list, result) = self.remote_write(snapshot, |remote| {
            let stored_list = match &new_default {
                Some(list) => Some(remote.create_list(list)?),
                None => None,
            };
            let mut outgoing = task.clone();
            if let Some(list) = &stored_list {
                outgoing.list_id = list.id.clone();
            }
            Ok((stored_list, remote.create_task(&outgoing)?))
        })?;
        if let (Some(local), Some(stored)) = (&new_default, stored_list) {
            self.merge_list(&local.id, stored);
        }
        self.merge_task(&task, result)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let index = self.index_of(id)?;
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(StoreError::Validation("title is required".to_string()));
            }
        }
        if let Some(list_id) = &patch.list_id {
            self.check_list_target(list_id)?;
        }

        let snapshot = self.snapshot();
        let now = self.clock.now();
        let task = &mut self.tasks[index];
        if let Some(title) = patch.title {
            task.title = title.trim().to_string();
        }
        if let Some(completed) = patch.completed {
            task.set_completed(completed, now);
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(tags) = patch.tags {
            task.tags = dedup_tags(tags);
        }
        if let Some(list_id) = patch.list_id {
            task.list_id = list_id;
        }
        if let Some(subtasks) = patch.subtasks {
            task.subtasks = subtasks;
        }
        if let Some(order) = patch.order {
            task.order = order;
        }
        task.updated_at = now;
        let updated = task.clone();

        self.persist_or_restore(&snapshot)?;
        self.notify(&StoreEvent::TaskUpdated { id: updated.id.clone() });

        let result = self.remote_write(snapshot, |remote| remote.update_task(&updated))?;
        self.merge_task(&updated, result)
    }

    pub fn toggle_task(&mut self, id: &str) -> Result<Task, StoreError> {
        let completed = self
            .get_task(id)
            .map(|t| t.completed)
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;
        self.update_task(id, TaskPatch::completed(!completed))
    }

    pub fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        let snapshot = self.snapshot();

        let removed = self.tasks.remove(index);
        if self.selected_task.as_deref() == Some(id) {
            self.selected_task = None;
        }
        self.persist_or_restore(&snapshot)?;
        self.notify(&StoreEvent::TaskDeleted { id: removed.id.clone() });
        tracing::debug!(task = %removed.id, "deleted task");

        self.remote_write(snapshot, |remote| remote.delete_task(&removed.id))
    }

    /// Drop `dragged_id` next to `target_id`. Within one list this renumbers
    /// that list's `order` values from 0; across lists it moves the dragged
    /// task to the end of the target's list.
    pub fn reorder_task(
        &mut self,
        dragged_id: &str,
        target_id: &str,
        position: DropPosition,
    ) -> Result<(), StoreError> {
        let dragged_index = self.index_of(dragged_id)?;
        let target_index = self.index_of(target_id)?;
        if dragged_id == target_id {
            return Ok(());
        }

        let source_list = self.tasks[dragged_index].list_id.clone();
        let target_list = self.tasks[target_index].list_id.clone();
        if source_list != target_list {
            return self.move_to_end(dragged_index, &target_list);
        }

        let mut ordered: Vec<String> = self
            .tasks_in_list(&source_list)
            .into_iter()
            .filter(|t| t.id != dragged_id)
            .map(|t| t.id.clone())
            .collect();
        let target_pos = ordered
            .iter()
            .position(|id| id == target_id)
            .ok_or_else(|| StoreError::NotFound(format!("task {}", target_id)))?;
        let insert_at = match position {
            DropPosition::Before => target_pos,
            DropPosition::After => target_pos + 1,
        };
        ordered.insert(insert_at, dragged_id.to_string());

        let snapshot = self.snapshot();
        let now = self.clock.now();
        let mut entries = Vec::with_capacity(ordered.len());
        for (order, id) in ordered.iter().enumerate() {
            let order = order as i64;
            if let Some(task) = self.tasks.iter_mut().find(|t| t.id == *id) {
                if task.order != order {
                    task.order = order;
                    task.updated_at = now;
                }
            }
            entries.push(OrderEntry {
                id: id.clone(),
                order,
            });
        }

        self.persist_or_restore(&snapshot)?;
        self.notify(&StoreEvent::TasksReordered {
            list_id: source_list.clone(),
        });
        tracing::debug!(list = %source_list, count = entries.len(), "reordered tasks");

        self.remote_write(snapshot, |remote| remote.reorder_tasks(&entries))
    }

    /// Change a task's list. `order` is left alone.
    pub fn move_task_to_list(&mut self, task_id: &str, list_id: &str) -> Result<Task, StoreError> {
        let task = self.update_task(
            task_id,
            TaskPatch {
                list_id: Some(list_id.to_string()),
                ..TaskPatch::default()
            },
        )?;
        self.notify(&StoreEvent::TaskMoved {
            id: task.id.clone(),
            list_id: task.list_id.clone(),
        });
        Ok(task)
    }

    fn move_to_end(&mut self, index: usize, list_id: &str) -> Result<(), StoreError> {
        let snapshot = self.snapshot();
        let order = self.next_order(list_id);
        let now = self.clock.now();
        let task = &mut self.tasks[index];
        task.list_id = list_id.to_string();
        task.order = order;
        task.updated_at = now;
        let moved = task.clone();

        self.persist_or_restore(&snapshot)?;
        self.notify(&StoreEvent::TaskMoved {
            id: moved.id.clone(),
            list_id: moved.list_id.clone(),
        });

        let result = self.remote_write(snapshot, |remote| remote.update_task(&moved))?;
        self.merge_task(&moved, result).map(|_| ())
    }

    // ---- list writes ----

    pub fn create_list(&mut self, draft: ListDraft) -> Result<List, StoreError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::Validation("list name is required".to_string()));
        }
        if ListRef::parse(&name.to_lowercase()).is_smart() {
            return Err(StoreError::Validation(format!("'{}' is a reserved list name", name)));
        }

        let snapshot = self.snapshot();
        let mut list = List::new(name);
        list.color = draft.color;
        list.icon = draft.icon;
        list.order = self.lists.iter().map(|l| l.order + 1).max().unwrap_or(0);
        self.lists.push(list.clone());

        self.persist_or_restore(&snapshot)?;
        self.notify(&StoreEvent::ListsChanged);
        tracing::debug!(list = %list.id, "created list");

        let stored = self.remote_write(snapshot, |remote| remote.create_list(&list))?;
        Ok(self.merge_list(&list.id, stored))
    }

    pub fn update_list(&mut self, id: &str, patch: ListPatch) -> Result<List, StoreError> {
        let index = self
            .lists
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("list {}", id)))?;
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(StoreError::Validation("list name is required".to_string()));
            }
        }

        let snapshot = self.snapshot();
        let list = &mut self.lists[index];
        if let Some(name) = patch.name {
            list.name = name.trim().to_string();
        }
        if let Some(color) = patch.color {
            list.color = color;
        }
        if let Some(icon) = patch.icon {
            list.icon = icon;
        }
        if let Some(order) = patch.order {
            list.order = order;
        }
        let updated = list.clone();

        self.persist_or_restore(&snapshot)?;
        self.notify(&StoreEvent::ListsChanged);

        let stored = self.remote_write(snapshot, |remote| remote.update_list(&updated))?;
        Ok(self.merge_list(&updated.id, stored))
    }

    /// Delete a list, moving its tasks to the end of the default list. The
    /// default list itself cannot be deleted.
    pub fn delete_list(&mut self, id: &str) -> Result<(), StoreError> {
        let index = self
            .lists
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("list {}", id)))?;
        if self.lists[index].is_default || id == INBOX_LIST_ID {
            return Err(StoreError::Validation("the default list cannot be deleted".to_string()));
        }

        let snapshot = self.snapshot();
        self.lists.remove(index);
        let (default_id, new_default) = self.ensure_default_list();

        let now = self.clock.now();
        let mut next = self.next_order(&default_id);
        let ordered: Vec<String> = self.tasks_in_list(id).into_iter().map(|t| t.id.clone()).collect();
        let mut moved: Vec<Task> = Vec::with_capacity(ordered.len());
        for task_id in &ordered {
            let Some(task) = self.tasks.iter_mut().find(|t| t.id == *task_id) else {
                continue;
            };
            task.list_id = default_id.clone();
            task.order = next;
            task.updated_at = now;
            next += 1;
            moved.push(task.clone());
        }
        if self.active_list == ListRef::UserList(id.to_string()) {
            self.active_list = ListRef::Inbox;
        }

        self.persist_or_restore(&snapshot)?;
        self.notify(&StoreEvent::ListsChanged);
        tracing::info!(list = %id, reassigned = moved.len(), "deleted list");

        let (stored_list, stored) = self.remote_write(snapshot, |remote| {
            let stored_list = match &new_default {
                Some(list) => Some(remote.create_list(list)?),
                None => None,
            };
            let mut stored = Vec::with_capacity(moved.len());
            for task in &moved {
                let mut outgoing = task.clone();
                if let Some(list) = &stored_list {
                    outgoing.list_id = list.id.clone();
                }
                stored.push(remote.update_task(&outgoing)?);
            }
            remote.delete_list(id)?;
            Ok((stored_list, stored))
        })?;
        if let (Some(local), Some(list)) = (&new_default, stored_list) {
            self.merge_list(&local.id, list);
        }
        for (local, remote_copy) in moved.iter().zip(stored) {
            self.merge_task(local, remote_copy)?;
        }
        Ok(())
    }

    // ---- sync ----

    /// Refetch tasks and lists from the remote, replacing local state.
    pub fn refresh(&mut self) -> Result<(), StoreError> {
        if self.remote.is_offline() {
            return Ok(());
        }
        let lists = self.remote.fetch_lists()?;
        let tasks = self.remote.fetch_tasks()?;
        self.lists = lists;
        self.tasks = tasks;
        self.drop_dangling_selection();
        self.persist()?;
        tracing::info!(tasks = self.tasks.len(), lists = self.lists.len(), "refreshed from remote");
        self.notify(&StoreEvent::Refreshed);
        Ok(())
    }

    /// React to a row change pushed by the backend by refetching the
    /// affected collection.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> Result<(), StoreError> {
        tracing::debug!(table = ?event.table, kind = ?event.event_type, "remote change");
        match event.table {
            Table::Tasks => self.tasks = self.remote.fetch_tasks()?,
            Table::Lists => self.lists = self.remote.fetch_lists()?,
            // Notes live in NoteStore
            Table::Notes => return Ok(()),
        }
        self.drop_dangling_selection();
        self.persist()?;
        self.notify(&StoreEvent::Refreshed);
        Ok(())
    }

    // ---- internals ----

    fn index_of(&self, id: &str) -> Result<usize, StoreError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))
    }

    fn check_list_target(&self, list_id: &str) -> Result<(), StoreError> {
        let list_ref = ListRef::parse(list_id);
        if list_ref.is_smart() {
            return Err(StoreError::Validation(format!(
                "'{}' is a smart list and cannot own tasks",
                list_id
            )));
        }
        if self.get_list(list_id).is_none() {
            return Err(StoreError::NotFound(format!("list {}", list_id)));
        }
        Ok(())
    }

    fn next_order(&self, list_id: &str) -> i64 {
        self.tasks
            .iter()
            .filter(|t| t.list_id == list_id)
            .map(|t| t.order + 1)
            .max()
            .unwrap_or(0)
    }

    /// Id of the default list, creating it when there are no lists at all.
    /// The second value is the list if it was just created.
    fn ensure_default_list(&mut self) -> (String, Option<List>) {
        if let Some(list) = self.default_list() {
            return (list.id.clone(), None);
        }
        let list = List::inbox(self.default_list_name.clone());
        self.lists.push(list.clone());
        tracing::info!(list = %list.id, "created default list");
        (list.id.clone(), Some(list))
    }

    fn drop_dangling_selection(&mut self) {
        if let Some(id) = &self.selected_task {
            if !self.tasks.iter().any(|t| t.id == *id) {
                self.selected_task = None;
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks.clone(),
            lists: self.lists.clone(),
            selected_task: self.selected_task.clone(),
            active_list: self.active_list.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.tasks = snapshot.tasks;
        self.lists = snapshot.lists;
        self.selected_task = snapshot.selected_task;
        self.active_list = snapshot.active_list;
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(db) = &self.database {
            db.save_tasks(&self.tasks)?;
            db.save_lists(&self.lists)?;
        }
        Ok(())
    }

    fn persist_or_restore(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Err(e) = self.persist() {
            tracing::error!("failed to persist store: {}", e);
            self.tasks = snapshot.tasks.clone();
            self.lists = snapshot.lists.clone();
            self.selected_task = snapshot.selected_task.clone();
            self.active_list = snapshot.active_list.clone();
            return Err(e);
        }
        Ok(())
    }

    /// Run the remote half of a mutation, undoing the local half on failure.
    fn remote_write<T>(
        &mut self,
        snapshot: Snapshot,
        write: impl FnOnce(&mut R) -> Result<T, RemoteError>,
    ) -> Result<T, StoreError> {
        match write(&mut self.remote) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!("remote write failed, rolling back: {}", err);
                self.restore(snapshot);
                if let Err(e) = self.persist() {
                    tracing::error!("failed to persist rollback: {}", e);
                }
                self.notify(&StoreEvent::RolledBack {
                    reason: err.user_message(),
                });
                Err(StoreError::Remote(err))
            }
        }
    }

    /// Replace the optimistic copy of a task with what the remote stored.
    fn merge_task(&mut self, local: &Task, stored: Task) -> Result<Task, StoreError> {
        if stored == *local {
            return Ok(stored);
        }
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == local.id) {
            *slot = stored.clone();
        }
        if stored.id != local.id && self.selected_task.as_deref() == Some(local.id.as_str()) {
            self.selected_task = Some(stored.id.clone());
        }
        self.persist()?;
        tracing::debug!(local = %local.id, remote = %stored.id, "reconciled task");
        self.notify(&StoreEvent::Reconciled {
            local_id: local.id.clone(),
            remote_id: stored.id.clone(),
        });
        Ok(stored)
    }

    /// Replace the optimistic copy of a list with what the remote stored.
    /// A server-assigned id is carried over to the tasks and the active list.
    fn merge_list(&mut self, local_id: &str, stored: List) -> List {
        let Some(slot) = self.lists.iter_mut().find(|l| l.id == local_id) else {
            return stored;
        };
        if *slot == stored {
            return stored;
        }
        *slot = stored.clone();
        if stored.id != local_id {
            for task in self.tasks.iter_mut().filter(|t| t.list_id == local_id) {
                task.list_id = stored.id.clone();
            }
            if self.active_list == ListRef::UserList(local_id.to_string()) {
                self.active_list = ListRef::UserList(stored.id.clone());
            }
            tracing::debug!(local = %local_id, remote = %stored.id, "reconciled list");
        }
        if let Err(e) = self.persist() {
            tracing::error!("failed to persist reconciled list: {}", e);
        }
        self.notify(&StoreEvent::ListsChanged);
        stored
    }

    fn notify(&mut self, event: &StoreEvent) {
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(event);
        }
    }
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
