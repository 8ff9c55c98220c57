//! Read-only views over the task collection: smart lists, statistics,
//! search and tag filtering. Nothing here mutates its input, and `now` is
//! always passed in.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};
use std::collections::HashMap;
use std::fmt;

use crate::models::{INBOX_LIST_ID, Priority, Task};
use crate::utils::{local_day, start_of_local_day};

pub const TODAY_LIST_ID: &str = "today";
pub const NEXT_7_DAYS_LIST_ID: &str = "next_7_days";

/// Tag filter entry that matches tasks without tags.
pub const UNTAGGED_FILTER: &str = "[untagged]";

/// Which tasks a list view shows. The first three are computed from task
/// fields; `UserList` is explicit membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ListRef {
    #[default]
    Inbox,
    Today,
    Next7Days,
    UserList(String),
}

impl ListRef {
    pub fn parse(id: &str) -> Self {
        match id {
            INBOX_LIST_ID => ListRef::Inbox,
            TODAY_LIST_ID => ListRef::Today,
            NEXT_7_DAYS_LIST_ID => ListRef::Next7Days,
            other => ListRef::UserList(other.to_string()),
        }
    }

    pub fn as_id(&self) -> &str {
        match self {
            ListRef::Inbox => INBOX_LIST_ID,
            ListRef::Today => TODAY_LIST_ID,
            ListRef::Next7Days => NEXT_7_DAYS_LIST_ID,
            ListRef::UserList(id) => id,
        }
    }

    /// Smart lists never own tasks.
    pub fn is_smart(&self) -> bool {
        matches!(self, ListRef::Today | ListRef::Next7Days)
    }
}

impl fmt::Display for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_id())
    }
}

fn due_day(task: &Task) -> Option<NaiveDate> {
    task.due_date.map(local_day)
}

/// Order tasks by `order`, ties broken by creation time.
pub fn sort_by_order(tasks: &mut [&Task]) {
    tasks.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
}

/// Tasks visible in `list` at `now`, sorted by `order` then creation time.
pub fn filter_tasks<'a>(tasks: &'a [Task], list: &ListRef, now: DateTime<Local>) -> Vec<&'a Task> {
    let today = now.date_naive();
    let week_end = today + Duration::days(7);
    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|task| match list {
            ListRef::Inbox => true,
            ListRef::Today => due_day(task) == Some(today),
            ListRef::Next7Days => due_day(task).is_some_and(|day| day >= today && day <= week_end),
            ListRef::UserList(id) => task.list_id == *id,
        })
        .collect();
    sort_by_order(&mut visible);
    visible
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub completed_this_week: usize,
    pub completed_this_month: usize,
    /// Whole percent, 0 when there are no tasks.
    pub completion_rate: u32,
}

/// Sunday of the week containing `day`.
pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_sunday()))
}

pub fn task_stats(tasks: &[Task], now: DateTime<Local>) -> TaskStats {
    let today = now.date_naive();
    let week_start = start_of_local_day(start_of_week(today));
    let month_start = start_of_local_day(today.with_day(1).unwrap_or(today));
    let now_utc = now.to_utc();

    let mut stats = TaskStats {
        total: tasks.len(),
        ..TaskStats::default()
    };
    for task in tasks {
        if task.completed {
            stats.completed += 1;
        } else {
            stats.pending += 1;
        }
        if task.is_overdue(now_utc) {
            stats.overdue += 1;
        }
        if let Some(done) = task.completed_at {
            if done >= week_start {
                stats.completed_this_week += 1;
            }
            if done >= month_start {
                stats.completed_this_month += 1;
            }
        }
    }
    if stats.total > 0 {
        stats.completion_rate = ((stats.completed as f64 / stats.total as f64) * 100.0).round() as u32;
    }
    stats
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityHistogram {
    pub none: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl PriorityHistogram {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::None => self.none,
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
        }
    }
}

pub fn priority_histogram(tasks: &[Task]) -> PriorityHistogram {
    let mut histogram = PriorityHistogram::default();
    for task in tasks {
        match task.priority {
            Priority::None => histogram.none += 1,
            Priority::Low => histogram.low += 1,
            Priority::Medium => histogram.medium += 1,
            Priority::High => histogram.high += 1,
        }
    }
    histogram
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Count of tasks per tag, most used first. Equal counts keep the order in
/// which the tags were first seen.
pub fn tag_frequency(tasks: &[Task]) -> Vec<TagCount> {
    let mut counts: Vec<TagCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for task in tasks {
        let mut seen_in_task: Vec<&str> = Vec::new();
        for tag in &task.tags {
            if seen_in_task.contains(&tag.as_str()) {
                continue;
            }
            seen_in_task.push(tag);
            match index.get(tag.as_str()) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(tag, counts.len());
                    counts.push(TagCount {
                        tag: tag.clone(),
                        count: 1,
                    });
                }
            }
        }
    }
    // sort_by is stable, so first-seen order survives among equal counts
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCount {
    pub list_id: String,
    pub total: usize,
    pub completed: usize,
}

/// Per-list task totals in first-seen order.
pub fn list_breakdown(tasks: &[Task]) -> Vec<ListCount> {
    let mut breakdown: Vec<ListCount> = Vec::new();
    for task in tasks {
        let entry = match breakdown.iter().position(|c| c.list_id == task.list_id) {
            Some(i) => &mut breakdown[i],
            None => {
                breakdown.push(ListCount {
                    list_id: task.list_id.clone(),
                    total: 0,
                    completed: 0,
                });
                let last = breakdown.len() - 1;
                &mut breakdown[last]
            }
        };
        entry.total += 1;
        if task.completed {
            entry.completed += 1;
        }
    }
    breakdown
}

/// Tasks completed on the given local calendar day.
pub fn completed_on(tasks: &[Task], day: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| task.completed_at.map(local_day) == Some(day))
        .collect()
}

/// Case-insensitive match on title, tags and subtask titles. An empty query
/// matches everything.
pub fn search_tasks<'a>(tasks: &'a [Task], query: &str) -> Vec<&'a Task> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return tasks.iter().collect();
    }
    tasks
        .iter()
        .filter(|task| {
            task.title.to_lowercase().contains(&query)
                || task.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
                || task
                    .subtasks
                    .iter()
                    .any(|sub| sub.title.to_lowercase().contains(&query))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagLogic {
    #[default]
    And,
    Or,
}

/// Match `task` against a comma-separated tag filter. `[untagged]` stands for
/// "has no tags"; combined with other tags under `And` it never matches.
pub fn matches_tag_filter(task: &Task, filter: &str, logic: TagLogic) -> bool {
    let filter_tags: Vec<String> = filter
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if filter_tags.is_empty() {
        return true;
    }

    let is_untagged = task.tags.is_empty();
    let wants_untagged = filter_tags.iter().any(|tag| tag == UNTAGGED_FILTER);
    let regular: Vec<&String> = filter_tags.iter().filter(|tag| *tag != UNTAGGED_FILTER).collect();
    let task_tags: Vec<String> = task.tags.iter().map(|t| t.to_lowercase()).collect();

    match logic {
        TagLogic::And => {
            if wants_untagged {
                regular.is_empty() && is_untagged
            } else {
                regular.iter().all(|tag| task_tags.contains(tag))
            }
        }
        TagLogic::Or => {
            (wants_untagged && is_untagged) || regular.iter().any(|tag| task_tags.contains(tag))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn task(title: &str, list: &str, order: i64) -> Task {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut task = Task::new(title.into(), list.into(), created);
        task.order = order;
        task
    }

    fn due(mut task: Task, at: DateTime<Local>) -> Task {
        task.due_date = Some(at.to_utc());
        task
    }

    #[test]
    fn smart_lists_follow_local_due_day() {
        // Wednesday
        let now = local(2026, 4, 15, 10);
        let tasks = vec![
            due(task("today late", "work", 0), local(2026, 4, 15, 23)),
            due(task("in a week", "home", 1), local(2026, 4, 22, 9)),
            due(task("too far", "work", 2), local(2026, 4, 23, 9)),
            due(task("yesterday", "work", 3), local(2026, 4, 14, 9)),
            task("undated", "home", 4),
        ];

        let titles = |list: ListRef| -> Vec<String> {
            filter_tasks(&tasks, &list, now).iter().map(|t| t.title.clone()).collect()
        };
        assert_eq!(titles(ListRef::Today), vec!["today late"]);
        assert_eq!(titles(ListRef::Next7Days), vec!["today late", "in a week"]);
        assert_eq!(titles(ListRef::Inbox).len(), 5);
        assert_eq!(titles(ListRef::parse("home")), vec!["in a week", "undated"]);
    }

    #[test]
    fn filters_are_idempotent() {
        let now = local(2026, 4, 15, 10);
        let tasks = vec![
            due(task("a", "work", 1), local(2026, 4, 15, 8)),
            due(task("b", "work", 0), local(2026, 4, 16, 8)),
        ];
        let before = tasks.clone();
        for list in [ListRef::Today, ListRef::Next7Days] {
            assert_eq!(filter_tasks(&tasks, &list, now), filter_tasks(&tasks, &list, now));
        }
        assert_eq!(tasks, before);
    }

    #[test]
    fn equal_order_breaks_ties_by_creation() {
        let mut older = task("older", "work", 0);
        older.created_at = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        let newer = task("newer", "work", 0);
        let tasks = vec![newer, older];
        let sorted = filter_tasks(&tasks, &ListRef::UserList("work".into()), local(2026, 1, 2, 9));
        assert_eq!(sorted[0].title, "older");
    }

    #[test]
    fn list_ref_round_trips_ids() {
        for id in ["inbox", "today", "next_7_days", "groceries"] {
            assert_eq!(ListRef::parse(id).as_id(), id);
        }
        assert!(ListRef::Today.is_smart());
        assert!(!ListRef::Inbox.is_smart());
    }

    #[test]
    fn stats_bucket_by_sunday_week_and_month() {
        // Wednesday 2026-04-15; the week began Sunday 04-12
        let now = local(2026, 4, 15, 12);
        let mut this_week = task("this week", "work", 0);
        this_week.set_completed(true, local(2026, 4, 12, 0).to_utc());
        let mut last_week = task("last week", "work", 1);
        last_week.set_completed(true, local(2026, 4, 11, 23).to_utc());
        let mut last_month = task("last month", "work", 2);
        last_month.set_completed(true, local(2026, 3, 31, 12).to_utc());
        let overdue = due(task("overdue", "work", 3), local(2026, 4, 14, 9));

        let stats = task_stats(&[this_week, last_week, last_month, overdue], now);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.completed_this_week, 1);
        assert_eq!(stats.completed_this_month, 2);
        assert_eq!(stats.completion_rate, 75);
        assert_eq!(task_stats(&[], now).completion_rate, 0);
    }

    #[test]
    fn histogram_counts_each_priority() {
        let mut high = task("h", "w", 0);
        high.priority = Priority::High;
        let histogram = priority_histogram(&[high, task("n", "w", 1), task("n2", "w", 2)]);
        assert_eq!(histogram.get(Priority::High), 1);
        assert_eq!(histogram.get(Priority::None), 2);
        assert_eq!(histogram.low + histogram.medium, 0);
    }

    #[test]
    fn tag_frequency_ties_keep_first_seen_order() {
        let mut a = task("a", "w", 0);
        a.tags = vec!["home".into(), "errand".into()];
        let mut b = task("b", "w", 1);
        b.tags = vec!["work".into(), "errand".into()];
        let frequency = tag_frequency(&[a, b]);
        let tags: Vec<&str> = frequency.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, vec!["errand", "home", "work"]);
        assert_eq!(frequency[0].count, 2);
    }

    #[test]
    fn tag_filter_handles_untagged_marker() {
        let mut tagged = task("tagged", "w", 0);
        tagged.tags = vec!["Work".into(), "urgent".into()];
        let untagged = task("untagged", "w", 1);

        assert!(matches_tag_filter(&tagged, "work, urgent", TagLogic::And));
        assert!(!matches_tag_filter(&tagged, "work, home", TagLogic::And));
        assert!(matches_tag_filter(&tagged, "work, home", TagLogic::Or));
        assert!(matches_tag_filter(&untagged, "[Untagged]", TagLogic::And));
        assert!(!matches_tag_filter(&untagged, "[untagged], work", TagLogic::And));
        assert!(matches_tag_filter(&untagged, "[untagged], work", TagLogic::Or));
        assert!(matches_tag_filter(&untagged, " , ", TagLogic::And));
    }

    #[test]
    fn search_looks_at_tags_and_subtasks() {
        let mut a = task("Plan trip", "w", 0);
        a.subtasks.push(crate::models::SubTask::new("Book hotel"));
        let mut b = task("Groceries", "w", 1);
        b.tags = vec!["Errand".into()];
        let tasks = vec![a, b];
        assert_eq!(search_tasks(&tasks, "HOTEL")[0].title, "Plan trip");
        assert_eq!(search_tasks(&tasks, "errand")[0].title, "Groceries");
        assert_eq!(search_tasks(&tasks, "  ").len(), 2);
    }

    #[test]
    fn breakdown_and_completed_on() {
        let mut done = task("done", "work", 0);
        done.set_completed(true, local(2026, 4, 15, 9).to_utc());
        let tasks = vec![done, task("open", "work", 1), task("chores", "home", 0)];

        let breakdown = list_breakdown(&tasks);
        assert_eq!(breakdown[0], ListCount { list_id: "work".into(), total: 2, completed: 1 });
        assert_eq!(breakdown[1].list_id, "home");

        let day = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        assert_eq!(completed_on(&tasks, day).len(), 1);
        assert!(completed_on(&tasks, day.succ_opt().unwrap()).is_empty());
    }
}
