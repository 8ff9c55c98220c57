use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::challenge::{ChallengeError, ChallengeStatus, ChallengeTracker};
use crate::config::Config;
use crate::database::{Database, DatabaseError};
use crate::models::{ListDraft, NotePatch, Priority, Task, TaskDraft};
use crate::notes::NoteStore;
use crate::remote::Offline;
use crate::store::{DropPosition, StoreError, TaskStore};
use crate::utils::{Clock, SystemClock, parse_date, parse_tags, start_of_local_day};
use crate::views::{self, ListRef, TagLogic};

#[derive(Parser)]
#[command(name = "sage")]
#[command(about = "Tasks, lists, notes and a daily habit challenge")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task
    AddTask {
        /// Task title
        title: String,
        /// List id (defaults to the inbox)
        #[arg(long)]
        list: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// none, low, medium or high
        #[arg(long)]
        priority: Option<Priority>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Show tasks in a list or smart list (inbox, today, next_7_days or a list id)
    Tasks {
        #[arg(default_value = "inbox")]
        list: String,
        /// Only tasks matching this text
        #[arg(long)]
        search: Option<String>,
        /// Comma-separated tag filter, `[untagged]` for tasks without tags
        #[arg(long)]
        tags: Option<String>,
        /// Require every tag instead of any
        #[arg(long)]
        all_tags: bool,
    },
    /// Flip a task between done and not done
    Toggle {
        /// Task id or unique prefix
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task id or unique prefix
        id: String,
    },
    /// Move a task to another list
    Move {
        /// Task id or unique prefix
        id: String,
        /// Target list id
        list: String,
    },
    /// Drop a task before or after another one
    Reorder {
        /// Task to move
        id: String,
        /// Task to drop next to
        target: String,
        #[arg(long, default_value = "before")]
        position: DropPosition,
    },
    /// Show all lists
    Lists,
    /// Create a list
    AddList {
        name: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Task statistics
    Stats,
    /// Add a note
    AddNote {
        title: String,
        #[arg(long)]
        content: Option<String>,
    },
    /// Show all notes
    Notes,
    /// Daily habit challenge
    Challenge {
        #[command(subcommand)]
        action: ChallengeCommand,
    },
    /// Write every stored document as one JSON bundle
    Export {
        /// Output file (stdout when omitted)
        path: Option<PathBuf>,
    },
    /// Load a bundle written by `export`
    Import { path: PathBuf },
}

#[derive(Subcommand)]
pub enum ChallengeCommand {
    /// Start a new challenge today, replacing the current one
    Start { name: Option<String> },
    /// Mark a habit done for a day
    Check {
        /// Habit id or name
        habit: String,
        /// Day number (defaults to today)
        #[arg(long)]
        day: Option<u32>,
        /// Mark the habit not done instead
        #[arg(long)]
        undo: bool,
    },
    /// Record a 1-5 mood
    Mood {
        value: u8,
        #[arg(long)]
        day: Option<u32>,
    },
    /// Save a reflection for a day
    Reflect {
        text: String,
        #[arg(long)]
        day: Option<u32>,
    },
    /// Show progress
    Status,
    /// End the challenge
    End,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run one command against the given database.
pub fn run(command: Commands, config: &Config, db: Database) -> Result<(), CliError> {
    match command {
        Commands::AddTask {
            title,
            list,
            due,
            priority,
            tags,
        } => handle_add_task(title, list, due, priority, tags, config, db),
        Commands::Tasks {
            list,
            search,
            tags,
            all_tags,
        } => handle_tasks(&list, search, tags, all_tags, config, db),
        Commands::Toggle { id } => {
            let mut store = open_store(config, db)?;
            let id = store.resolve_task_id(&id)?;
            let task = store.toggle_task(&id)?;
            println!("{}", format_task(&task));
            Ok(())
        }
        Commands::Delete { id } => {
            let mut store = open_store(config, db)?;
            let id = store.resolve_task_id(&id)?;
            store.delete_task(&id)?;
            println!("Task deleted (ID: {})", id);
            Ok(())
        }
        Commands::Move { id, list } => {
            let mut store = open_store(config, db)?;
            let id = store.resolve_task_id(&id)?;
            let task = store.move_task_to_list(&id, &list)?;
            println!("{}", format_task(&task));
            Ok(())
        }
        Commands::Reorder { id, target, position } => {
            let mut store = open_store(config, db)?;
            let id = store.resolve_task_id(&id)?;
            let target = store.resolve_task_id(&target)?;
            store.reorder_task(&id, &target, position)?;
            if let Some(task) = store.get_task(&id) {
                for task in store.tasks_in_list(&task.list_id) {
                    println!("{}", format_task(task));
                }
            }
            Ok(())
        }
        Commands::Lists => handle_lists(config, db),
        Commands::AddList { name, color, icon } => {
            let mut store = open_store(config, db)?;
            let list = store.create_list(ListDraft { name, color, icon })?;
            println!("List created successfully (ID: {})", list.id);
            Ok(())
        }
        Commands::Stats => handle_stats(config, db),
        Commands::AddNote { title, content } => handle_add_note(title, content, config, db),
        Commands::Notes => {
            let mut notes = NoteStore::new(Offline, SystemClock, config.note_autosave_delay()).with_database(db);
            notes.load()?;
            for note in notes.notes() {
                let title = if note.title.is_empty() { "(untitled)" } else { note.title.as_str() };
                println!("{}  {}  {}", short_id(&note.id), note.updated_at.format("%Y-%m-%d %H:%M"), title);
            }
            Ok(())
        }
        Commands::Challenge { action } => handle_challenge(action, config, db),
        Commands::Export { path } => {
            let bundle = db.export_all()?;
            match path {
                Some(path) => {
                    std::fs::write(&path, bundle)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{}", bundle),
            }
            Ok(())
        }
        Commands::Import { path } => {
            let json = std::fs::read_to_string(&path)?;
            let written = db.import_all(&json)?;
            println!("Imported {} documents", written);
            Ok(())
        }
    }
}

fn open_store(config: &Config, db: Database) -> Result<TaskStore<Offline>, CliError> {
    let mut store = TaskStore::new(Offline, SystemClock)
        .with_database(db)
        .with_default_list_name(config.default_list_name.clone());
    store.load()?;
    Ok(store)
}

/// Handle the add-task command
pub fn handle_add_task(
    title: String,
    list: Option<String>,
    due: Option<String>,
    priority: Option<Priority>,
    tags: Option<String>,
    config: &Config,
    db: Database,
) -> Result<(), CliError> {
    let due_date = match due {
        Some(due_str) => {
            let date = parse_date(&due_str)
                .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", due_str, e)))?;
            Some(start_of_local_day(date))
        }
        None => None,
    };

    let draft = TaskDraft {
        title,
        list_id: list,
        due_date,
        priority: priority.unwrap_or_default(),
        tags: parse_tags(tags.as_deref()),
        subtasks: Vec::new(),
    };
    let mut store = open_store(config, db)?;
    let task = store.create_task(draft)?;
    println!("Task created successfully (ID: {})", task.id);
    Ok(())
}

fn handle_tasks(
    list: &str,
    search: Option<String>,
    tags: Option<String>,
    all_tags: bool,
    config: &Config,
    db: Database,
) -> Result<(), CliError> {
    let store = open_store(config, db)?;
    let list = parse_list_arg(list);
    if let ListRef::UserList(id) = &list {
        if store.get_list(id).is_none() {
            return Err(CliError::InvalidArgument(format!("no list with id '{}'", id)));
        }
    }
    let logic = if all_tags { TagLogic::And } else { TagLogic::Or };
    let mut shown = views::filter_tasks(store.list_tasks(), &list, SystemClock.local_now());
    if let Some(query) = search.as_deref() {
        let matching: Vec<&str> = views::search_tasks(store.list_tasks(), query)
            .into_iter()
            .map(|t| t.id.as_str())
            .collect();
        shown.retain(|t| matching.contains(&t.id.as_str()));
    }
    if let Some(filter) = tags.as_deref() {
        shown.retain(|t| views::matches_tag_filter(t, filter, logic));
    }

    if shown.is_empty() {
        println!("No tasks in {}", list);
    }
    for task in shown {
        println!("{}", format_task(task));
    }
    Ok(())
}

/// Like [`ListRef::parse`], but also takes the dash-less and dashed forms of
/// the next-7-days list.
fn parse_list_arg(input: &str) -> ListRef {
    match input.trim().to_ascii_lowercase().as_str() {
        "next7days" | "next-7-days" => ListRef::Next7Days,
        _ => ListRef::parse(input.trim()),
    }
}

fn handle_lists(config: &Config, db: Database) -> Result<(), CliError> {
    let store = open_store(config, db)?;
    let counts = views::list_breakdown(store.list_tasks());
    for list in store.list_lists() {
        let (done, total) = counts
            .iter()
            .find(|c| c.list_id == list.id)
            .map(|c| (c.completed, c.total))
            .unwrap_or((0, 0));
        let marker = if list.is_default { " (default)" } else { "" };
        println!("{:<12} {}{}  {}/{}", short_id(&list.id), list.name, marker, done, total);
    }
    Ok(())
}

fn handle_stats(config: &Config, db: Database) -> Result<(), CliError> {
    let store = open_store(config, db)?;
    let tasks = store.list_tasks();
    let stats = views::task_stats(tasks, SystemClock.local_now());
    println!("Total:      {}", stats.total);
    println!("Completed:  {} ({}%)", stats.completed, stats.completion_rate);
    println!("Pending:    {}", stats.pending);
    println!("Overdue:    {}", stats.overdue);
    println!("This week:  {}", stats.completed_this_week);
    println!("This month: {}", stats.completed_this_month);

    let histogram = views::priority_histogram(tasks);
    let priorities: Vec<String> = Priority::ALL
        .iter()
        .map(|p| format!("{} {}", p, histogram.get(*p)))
        .collect();
    println!("Priority:   {}", priorities.join(", "));

    let tags: Vec<String> = views::tag_frequency(tasks)
        .into_iter()
        .take(5)
        .map(|t| format!("#{} {}", t.tag, t.count))
        .collect();
    if !tags.is_empty() {
        println!("Top tags:   {}", tags.join(", "));
    }
    Ok(())
}

/// Handle the add-note command
pub fn handle_add_note(title: String, content: Option<String>, config: &Config, db: Database) -> Result<(), CliError> {
    let mut notes = NoteStore::new(Offline, SystemClock, config.note_autosave_delay()).with_database(db);
    notes.load()?;
    let note = notes.create_note()?;
    let patch = NotePatch {
        title: Some(title),
        content,
        summary: None,
    };
    notes.update_note(&note.id, patch, std::time::Instant::now())?;
    notes.flush()?;
    println!("Note created successfully (ID: {})", note.id);
    Ok(())
}

fn handle_challenge(action: ChallengeCommand, config: &Config, db: Database) -> Result<(), CliError> {
    let tasks = db.load_tasks()?;
    let mut tracker = ChallengeTracker::new(SystemClock, config.challenge.total_days).with_database(db);
    tracker.load()?;

    match action {
        ChallengeCommand::Start { name } => {
            let name = name.unwrap_or_else(|| config.challenge.name.clone());
            let challenge = tracker.start_challenge(&name, Vec::new())?;
            println!("Started '{}' ({} days)", challenge.name, challenge.total_days);
        }
        ChallengeCommand::Check { habit, day, undo } => {
            let day = resolve_day(&tracker, day)?;
            let habit_id = resolve_habit(&tracker, &habit)?;
            let challenge = tracker.set_habit_completion(day, &habit_id, !undo)?;
            println!(
                "Day {}: {} (streak {}, best {})",
                day,
                if challenge.is_day_complete(day) { "complete" } else { "in progress" },
                challenge.streak_days,
                challenge.best_streak
            );
        }
        ChallengeCommand::Mood { value, day } => {
            let day = resolve_day(&tracker, day)?;
            tracker.set_mood(day, value)?;
            println!("Mood for day {} set to {}", day, value);
        }
        ChallengeCommand::Reflect { text, day } => {
            let day = resolve_day(&tracker, day)?;
            tracker.set_reflection(day, &text)?;
            println!("Reflection saved for day {}", day);
        }
        ChallengeCommand::Status => {
            if tracker.status() == ChallengeStatus::Active {
                tracker.sync_tasks_completed(&tasks)?;
            }
            print_challenge_status(&mut tracker)?;
        }
        ChallengeCommand::End => {
            tracker.end_challenge()?;
            println!("Challenge ended");
        }
    }
    Ok(())
}

fn print_challenge_status(tracker: &mut ChallengeTracker) -> Result<(), CliError> {
    let status = tracker.status();
    let Some(day) = tracker.current_day() else {
        println!("No challenge started. Run `sage challenge start`.");
        return Ok(());
    };
    if status == ChallengeStatus::Active {
        tracker.day_progress(day)?;
    }
    let Some(challenge) = tracker.challenge() else {
        return Ok(());
    };
    let state = match status {
        ChallengeStatus::Active => "active",
        ChallengeStatus::Ended => "ended",
        ChallengeStatus::NotStarted => "not started",
    };
    println!("{}: day {}/{} ({})", challenge.name, day, challenge.total_days, state);
    println!("Streak {} (best {})", challenge.streak_days, challenge.best_streak);
    if let Some(progress) = challenge.entry(day) {
        if progress.is_rest_day {
            println!("Rest day");
        }
        for habit in &challenge.habits {
            let done = progress.habits.iter().any(|e| e.habit_id == habit.id && e.completed);
            let required = if habit.is_required { "" } else { " (optional)" };
            println!("  [{}] {:<3} {}{}", if done { "x" } else { " " }, habit.id, habit.name, required);
        }
    }
    if let Some(stats) = tracker.completion_stats() {
        println!(
            "Completed days {}, habits {}/{} ({}%), average mood {:.1}",
            stats.completed_days, stats.completed_habits, stats.total_habits, stats.completion_rate, stats.average_mood
        );
    }
    Ok(())
}

fn resolve_day(tracker: &ChallengeTracker, day: Option<u32>) -> Result<u32, CliError> {
    match day {
        Some(day) => Ok(day),
        None => tracker.current_day().ok_or(CliError::Challenge(ChallengeError::NoChallenge)),
    }
}

fn resolve_habit(tracker: &ChallengeTracker, input: &str) -> Result<String, CliError> {
    let challenge = tracker.challenge().ok_or(ChallengeError::NoChallenge)?;
    challenge
        .habits
        .iter()
        .find(|h| h.id == input || h.name.eq_ignore_ascii_case(input))
        .map(|h| h.id.clone())
        .ok_or_else(|| CliError::InvalidArgument(format!("no habit named '{}'", input)))
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn format_task(task: &Task) -> String {
    let mut line = format!(
        "[{}] {}  {}",
        if task.completed { "x" } else { " " },
        short_id(&task.id),
        task.title
    );
    if task.priority != Priority::None {
        line.push_str(&format!("  !{}", task.priority));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {}", crate::utils::local_day(due)));
    }
    for tag in &task.tags {
        line.push_str(&format!(" #{}", tag));
    }
    line
}
