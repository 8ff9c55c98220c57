use std::cell::RefCell;
use std::rc::Rc;

use chrono::{Duration, TimeZone, Utc};
use sage::database::Database;
use sage::models::{INBOX_LIST_ID, ListDraft, TaskDraft};
use sage::remote::{MemoryBackend, Offline, RemoteError, TaskRow};
use sage::store::{StoreError, StoreEvent, TaskStore};
use sage::utils::{Clock, FixedClock};
use sage::views::{self, ListRef};
use tempfile::TempDir;

fn clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap())
}

fn open(dir: &TempDir) -> Database {
    let path = dir.path().join("sage.db");
    Database::new(path.to_str().unwrap()).unwrap()
}

#[test]
fn task_due_today_in_a_user_list_shows_once_per_view() {
    let clock = clock();
    let mut store = TaskStore::new(Offline, clock.clone());
    let work = store.create_list(ListDraft::new("Work")).unwrap();
    let task = store
        .create_task(TaskDraft::new("Prepare demo").in_list(&work.id).due(clock.now()))
        .unwrap();
    store
        .create_task(TaskDraft::new("Someday").due(clock.now() + Duration::days(30)))
        .unwrap();

    let now = clock.local_now();
    for view in [ListRef::Today, ListRef::UserList(work.id.clone()), ListRef::Inbox] {
        let shown = views::filter_tasks(store.list_tasks(), &view, now);
        let hits = shown.iter().filter(|t| t.id == task.id).count();
        assert_eq!(hits, 1, "expected the task exactly once in {}", view);
    }
    assert!(
        views::filter_tasks(store.list_tasks(), &ListRef::Next7Days, now)
            .iter()
            .all(|t| t.title != "Someday")
    );
}

#[test]
fn deleting_a_list_moves_its_tasks_to_the_default_list() {
    let dir = TempDir::new().unwrap();
    let mut store = TaskStore::new(Offline, clock()).with_database(open(&dir));
    store.create_task(TaskDraft::new("Inbox item")).unwrap();
    let errands = store.create_list(ListDraft::new("Errands")).unwrap();
    store.create_task(TaskDraft::new("Buy milk").in_list(&errands.id)).unwrap();
    store.create_task(TaskDraft::new("Post letter").in_list(&errands.id)).unwrap();

    store.delete_list(&errands.id).unwrap();
    assert!(matches!(store.delete_list(INBOX_LIST_ID), Err(StoreError::Validation(_))));
    drop(store);

    let mut reopened = TaskStore::new(Offline, clock()).with_database(open(&dir));
    reopened.load().unwrap();
    assert!(reopened.get_list(&errands.id).is_none());
    let orders: Vec<i64> = reopened
        .tasks_in_list(INBOX_LIST_ID)
        .into_iter()
        .map(|t| t.order)
        .collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[test]
fn remote_failure_rolls_back_and_tells_subscribers() {
    let mut store = TaskStore::new(MemoryBackend::new("u1"), clock());
    store.create_task(TaskDraft::new("Kept")).unwrap();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    store.remote_mut().fail_next(RemoteError::Network("timeout".into()));
    let err = store.create_task(TaskDraft::new("Lost")).unwrap_err();

    assert!(matches!(err, StoreError::Remote(RemoteError::Network(_))));
    assert_eq!(store.list_tasks().len(), 1);
    assert_eq!(store.list_tasks()[0].title, "Kept");
    let events = events.borrow();
    assert!(matches!(events.first(), Some(StoreEvent::TaskCreated { .. })));
    assert_eq!(
        events.last(),
        Some(&StoreEvent::RolledBack {
            reason: "Network error, please try again".to_string()
        })
    );
}

#[test]
fn change_from_another_client_is_picked_up() {
    let clock = clock();
    let mut store = TaskStore::new(MemoryBackend::new("u1"), clock.clone());
    let mine = store.create_task(TaskDraft::new("Mine")).unwrap();
    store.remote_mut().drain_changes();

    let mut other = sage::Task::new("From phone".into(), mine.list_id.clone(), clock.now());
    other.order = 1;
    store.remote_mut().upsert_task_row(TaskRow::from_task(&other, "u1"));
    store.remote_mut().upsert_task_row(TaskRow::from_task(
        &sage::Task::new("Not mine".into(), mine.list_id.clone(), clock.now()),
        "u2",
    ));

    let changes = store.remote_mut().drain_changes();
    assert_eq!(changes.len(), 1);
    store.apply_change(&changes[0]).unwrap();

    let titles: Vec<&str> = store.list_tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Mine", "From phone"]);
}

#[test]
fn export_and_import_carry_tasks_between_databases() {
    let source_dir = TempDir::new().unwrap();
    let mut store = TaskStore::new(Offline, clock()).with_database(open(&source_dir));
    store.create_task(TaskDraft::new("Travel light")).unwrap();
    let bundle = store.database().unwrap().export_all().unwrap();

    let target_dir = TempDir::new().unwrap();
    let target = open(&target_dir);
    assert!(target.import_all(&bundle).unwrap() >= 2);

    let mut imported = TaskStore::new(Offline, clock()).with_database(target);
    imported.load().unwrap();
    assert_eq!(imported.list_tasks(), store.list_tasks());
    assert_eq!(imported.list_lists(), store.list_lists());
}
