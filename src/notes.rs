use std::time::{Duration, Instant};

use crate::database::Database;
use crate::debounce::{Debouncer, WriteToken};
use crate::models::{Note, NotePatch};
use crate::remote::{ChangeEvent, RemoteError, RemoteTasks, Table};
use crate::store::StoreError;
use crate::utils::Clock;

/// Notes with debounced saving. Edits land in memory immediately; the write
/// to the database and the remote happens once a note has been quiet for the
/// configured delay, driven by [`NoteStore::poll`].
pub struct NoteStore<R> {
    remote: R,
    clock: Box<dyn Clock>,
    database: Option<Database>,
    notes: Vec<Note>,
    active_note: Option<String>,
    pending: Debouncer<String>,
}

impl<R: RemoteTasks> NoteStore<R> {
    pub fn new(remote: R, clock: impl Clock + 'static, delay: Duration) -> Self {
        Self {
            remote,
            clock: Box::new(clock),
            database: None,
            notes: Vec::new(),
            active_note: None,
            pending: Debouncer::new(delay),
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    pub fn load(&mut self) -> Result<(), StoreError> {
        if let Some(db) = &self.database {
            self.notes = db.load_notes()?;
        }
        Ok(())
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get_note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.active_note.as_deref().and_then(|id| self.get_note(id))
    }

    pub fn set_active_note(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        if let Some(id) = id {
            self.index_of(id)?;
        }
        self.active_note = id.map(str::to_string);
        Ok(())
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Create an empty note, make it active and save it right away.
    pub fn create_note(&mut self) -> Result<Note, StoreError> {
        let note = Note::new(self.clock.now());
        self.notes.insert(0, note.clone());
        self.persist()?;

        let stored = match self.remote.create_note(&note) {
            Ok(stored) => stored,
            Err(err) => {
                self.notes.retain(|n| n.id != note.id);
                self.persist_logged();
                return Err(err.into());
            }
        };
        if let Some(slot) = self.notes.iter_mut().find(|n| n.id == note.id) {
            *slot = stored.clone();
        }
        self.active_note = Some(stored.id.clone());
        self.persist()?;
        tracing::debug!(note = %stored.id, "created note");
        Ok(stored)
    }

    /// Apply an edit in memory and (re)schedule its save.
    pub fn update_note(&mut self, id: &str, patch: NotePatch, now: Instant) -> Result<WriteToken, StoreError> {
        let index = self.index_of(id)?;
        let updated_at = self.clock.now();
        let note = &mut self.notes[index];
        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(summary) = patch.summary {
            note.summary = summary;
        }
        note.updated_at = updated_at;
        Ok(self.pending.schedule(id.to_string(), now))
    }

    /// Whether `token` is still the latest scheduled save for the note.
    pub fn is_save_pending(&self, id: &str, token: WriteToken) -> bool {
        self.pending.is_current(&id.to_string(), token)
    }

    /// Save every note whose quiet period has elapsed. Returns the number of
    /// notes written. Notes whose remote write fails are scheduled again.
    pub fn poll(&mut self, now: Instant) -> Result<usize, StoreError> {
        let due = self.pending.take_due(now);
        self.write_notes(due, now)
    }

    /// Save everything still pending, regardless of timing.
    pub fn flush(&mut self) -> Result<usize, StoreError> {
        let all = self.pending.drain();
        self.write_notes(all, Instant::now())
    }

    pub fn delete_note(&mut self, id: &str) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        self.pending.cancel(&id.to_string());
        let removed = self.notes.remove(index);
        let was_active = self.active_note.as_deref() == Some(id);
        if was_active {
            self.active_note = None;
        }
        self.persist()?;

        if let Err(err) = self.remote.delete_note(id) {
            tracing::warn!(note = %id, "remote delete failed, restoring note: {}", err);
            self.notes.insert(index, removed);
            if was_active {
                self.active_note = Some(id.to_string());
            }
            self.persist_logged();
            return Err(err.into());
        }
        Ok(())
    }

    /// Replace the local notes with the remote copy. Notes with an unsaved
    /// edit keep their local version.
    pub fn refresh(&mut self) -> Result<(), StoreError> {
        if self.remote.is_offline() {
            return Ok(());
        }
        let fetched = self.remote.fetch_notes()?;
        let mut merged: Vec<Note> = Vec::with_capacity(fetched.len());
        for note in fetched {
            let local = self
                .get_note(&note.id)
                .filter(|local| self.pending.is_pending(&local.id));
            merged.push(local.cloned().unwrap_or(note));
        }
        for local in &self.notes {
            if self.pending.is_pending(&local.id) && !merged.iter().any(|n| n.id == local.id) {
                merged.push(local.clone());
            }
        }
        self.notes = merged;
        if self.active_note().is_none() {
            self.active_note = None;
        }
        self.persist()?;
        tracing::info!(notes = self.notes.len(), "refreshed notes from remote");
        Ok(())
    }

    /// React to a pushed row change. Only the notes table concerns this store.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> Result<(), StoreError> {
        match event.table {
            Table::Notes => {
                tracing::debug!(kind = ?event.event_type, "remote note change");
                self.refresh()
            }
            Table::Tasks | Table::Lists => Ok(()),
        }
    }

    fn write_notes(&mut self, ids: Vec<String>, now: Instant) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.persist() {
            for id in ids {
                self.pending.schedule(id, now);
            }
            return Err(e);
        }

        let mut written = 0;
        let mut first_error: Option<RemoteError> = None;
        for id in ids {
            let Some(note) = self.get_note(&id).cloned() else {
                continue;
            };
            match self.remote.update_note(&note) {
                Ok(stored) => {
                    if let Some(slot) = self.notes.iter_mut().find(|n| n.id == id) {
                        *slot = stored;
                    }
                    written += 1;
                }
                Err(err) => {
                    tracing::warn!(note = %id, "note save failed, retrying later: {}", err);
                    self.pending.schedule(id, now);
                    first_error.get_or_insert(err);
                }
            }
        }
        tracing::debug!(written, "saved notes");
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(written),
        }
    }

    fn index_of(&self, id: &str) -> Result<usize, StoreError> {
        self.notes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("note {}", id)))
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(db) = &self.database {
            db.save_notes(&self.notes)?;
        }
        Ok(())
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            tracing::error!("failed to persist notes: {}", e);
        }
    }
}
