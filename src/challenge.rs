use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::{Database, DatabaseError, StorageKey};
use crate::models::{Task, new_id};
use crate::utils::Clock;
use crate::views;

pub const DEFAULT_CHALLENGE_DAYS: u32 = 50;
pub const DEFAULT_CHALLENGE_NAME: &str = "50-day reset";
/// Every day whose number is a multiple of this is a rest day.
pub const REST_DAY_INTERVAL: u32 = 7;

pub fn is_rest_day(day: u32) -> bool {
    day % REST_DAY_INTERVAL == 0
}

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("No challenge has been started")]
    NoChallenge,
    #[error("The challenge has ended")]
    Ended,
    #[error("Day {day} is not available (current day is {current})")]
    InvalidDay { day: u32, current: u32 },
    #[error("Mood must be between 1 and 5, got {0}")]
    InvalidMood(u8),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitCategory {
    Health,
    Mind,
    Productivity,
    Social,
    Growth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyHabit {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub category: HabitCategory,
    #[serde(default)]
    pub description: String,
    /// Required habits decide whether a day counts as complete.
    pub is_required: bool,
}

impl DailyHabit {
    pub fn new(id: &str, name: &str, category: HabitCategory, is_required: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: String::new(),
            category,
            description: String::new(),
            is_required,
        }
    }
}

fn habit(id: &str, name: &str, icon: &str, category: HabitCategory, description: &str, is_required: bool) -> DailyHabit {
    DailyHabit {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        category,
        description: description.to_string(),
        is_required,
    }
}

/// The stock habit set used when none has been saved.
pub fn default_habits() -> Vec<DailyHabit> {
    use HabitCategory::*;
    vec![
        habit("h1", "Up before 6:00", "sun", Health, "Start the day early", true),
        habit("h2", "Exercise 30 minutes", "dumbbell", Health, "Move every day", true),
        habit("h3", "Read 30 minutes", "book", Mind, "Keep learning", true),
        habit("h4", "Meditate 10 minutes", "brain", Mind, "Train focus", false),
        habit("h5", "Journal or reflect", "pen", Growth, "Write down what the day taught you", true),
        habit("h6", "Finish 3 tasks", "target", Productivity, "Close at least three important tasks", true),
        habit("h7", "4 pomodoros", "timer", Productivity, "Four focused work blocks", false),
        habit("h8", "Reach out to friends or family", "message", Social, "Stay in touch", false),
    ]
}

/// A 1..=5 mood rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Mood(u8);

impl Mood {
    pub fn new(value: u8) -> Result<Self, ChallengeError> {
        if (1..=5).contains(&value) {
            Ok(Mood(value))
        } else {
            Err(ChallengeError::InvalidMood(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Mood {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Mood::new(value).map_err(|e| e.to_string())
    }
}

impl From<Mood> for u8 {
    fn from(mood: Mood) -> u8 {
        mood.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitEntry {
    pub habit_id: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayProgress {
    pub day: u32,
    pub date: NaiveDate,
    pub habits: Vec<HabitEntry>,
    #[serde(default)]
    pub tasks_completed: u32,
    #[serde(default)]
    pub pomodoro_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    pub is_rest_day: bool,
}

impl DayProgress {
    fn new(day: u32, date: NaiveDate, habits: &[DailyHabit]) -> Self {
        Self {
            day,
            date,
            habits: habits
                .iter()
                .map(|h| HabitEntry {
                    habit_id: h.id.clone(),
                    completed: false,
                    completed_at: None,
                    note: None,
                })
                .collect(),
            tasks_completed: 0,
            pomodoro_minutes: 0,
            reflection: None,
            mood: None,
            is_rest_day: is_rest_day(day),
        }
    }

    fn entry_mut(&mut self, habit_id: &str) -> &mut HabitEntry {
        let index = match self.habits.iter().position(|e| e.habit_id == habit_id) {
            Some(i) => i,
            None => {
                // Habit added after this day was first opened
                self.habits.push(HabitEntry {
                    habit_id: habit_id.to_string(),
                    completed: false,
                    completed_at: None,
                    note: None,
                });
                self.habits.len() - 1
            }
        };
        &mut self.habits[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    NotStarted,
    Active,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub current_day: u32,
    #[serde(default = "default_total_days")]
    pub total_days: u32,
    pub is_active: bool,
    pub habits: Vec<DailyHabit>,
    /// Sorted by day.
    pub progress: Vec<DayProgress>,
    pub streak_days: u32,
    pub best_streak: u32,
    #[serde(default)]
    pub total_tasks_completed: u32,
    #[serde(default)]
    pub total_pomodoro_minutes: u32,
}

fn default_total_days() -> u32 {
    DEFAULT_CHALLENGE_DAYS
}

impl Challenge {
    /// Day number for `today`, clamped to `1..=total_days`.
    pub fn day_for(&self, today: NaiveDate) -> u32 {
        let elapsed = (today - self.start_date).num_days() + 1;
        elapsed.clamp(1, i64::from(self.total_days.max(1))) as u32
    }

    pub fn entry(&self, day: u32) -> Option<&DayProgress> {
        self.progress.iter().find(|p| p.day == day)
    }

    pub fn is_day_complete(&self, day: u32) -> bool {
        self.entry(day).is_some_and(|p| self.meets_required(p))
    }

    fn meets_required(&self, progress: &DayProgress) -> bool {
        self.habits.iter().filter(|h| h.is_required).all(|h| {
            progress
                .habits
                .iter()
                .any(|e| e.habit_id == h.id && e.completed)
        })
    }

    fn ensure_day(&mut self, day: u32) -> usize {
        if let Some(i) = self.progress.iter().position(|p| p.day == day) {
            return i;
        }
        let date = self.start_date + Duration::days(i64::from(day) - 1);
        let index = self.progress.partition_point(|p| p.day < day);
        self.progress.insert(index, DayProgress::new(day, date, &self.habits));
        index
    }

    /// Recompute `streak_days` and `best_streak` from the whole history.
    ///
    /// Rest days neither extend nor break a run. A non-rest day that is
    /// incomplete or has no entry breaks it, except that a missing entry for
    /// the current day does not. `best_streak` never decreases.
    pub fn recompute_streaks(&mut self) {
        let current = self.current_day;
        let mut run = 0u32;
        let mut best_run = 0u32;
        let mut last_day = 0u32;
        for progress in self.progress.iter().filter(|p| p.day <= current) {
            if missing_workday(last_day, progress.day) {
                run = 0;
            }
            last_day = progress.day;
            if progress.is_rest_day {
                continue;
            }
            if self.meets_required(progress) {
                run += 1;
                best_run = best_run.max(run);
            } else {
                run = 0;
            }
        }
        if missing_workday(last_day, current) {
            run = 0;
        }
        self.streak_days = run;
        self.best_streak = self.best_streak.max(best_run);
    }
}

/// Whether a non-rest day lies strictly between `after` and `before`.
fn missing_workday(after: u32, before: u32) -> bool {
    (after + 1..before).any(|day| !is_rest_day(day))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionStats {
    pub total_days: u32,
    pub completed_days: u32,
    pub total_habits: u32,
    pub completed_habits: u32,
    /// 3.0 when no mood has been recorded.
    pub average_mood: f64,
    /// Whole percent of habit entries completed.
    pub completion_rate: u32,
}

/// Owns the challenge and persists it after every write.
pub struct ChallengeTracker {
    clock: Box<dyn Clock>,
    database: Option<Database>,
    total_days: u32,
    challenge: Option<Challenge>,
}

impl ChallengeTracker {
    pub fn new(clock: impl Clock + 'static, total_days: u32) -> Self {
        Self {
            clock: Box::new(clock),
            database: None,
            total_days: total_days.max(1),
            challenge: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn load(&mut self) -> Result<(), ChallengeError> {
        if let Some(db) = &self.database {
            self.challenge = db.get_json(StorageKey::Challenge)?;
        }
        let today = self.clock.today();
        if let Some(challenge) = self.challenge.as_mut() {
            challenge.current_day = challenge.day_for(today);
        }
        Ok(())
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    pub fn status(&self) -> ChallengeStatus {
        match &self.challenge {
            None => ChallengeStatus::NotStarted,
            Some(c) if c.is_active => ChallengeStatus::Active,
            Some(_) => ChallengeStatus::Ended,
        }
    }

    /// Today's day number, computed from the clock.
    pub fn current_day(&self) -> Option<u32> {
        let today = self.clock.today();
        self.challenge.as_ref().map(|c| c.day_for(today))
    }

    /// The saved habit set, or the stock one.
    pub fn habits(&self) -> Result<Vec<DailyHabit>, ChallengeError> {
        let saved = match &self.database {
            Some(db) => db.get_json(StorageKey::ChallengeHabits)?,
            None => None,
        };
        Ok(saved.unwrap_or_else(default_habits))
    }

    /// Save the habit set and apply it to the current challenge.
    pub fn save_habits(&mut self, habits: Vec<DailyHabit>) -> Result<(), ChallengeError> {
        if let Some(db) = &self.database {
            db.set_json(StorageKey::ChallengeHabits, &habits)?;
        }
        if let Some(challenge) = self.challenge.as_mut() {
            challenge.habits = habits;
            challenge.recompute_streaks();
        }
        self.save()
    }

    /// Start a new challenge today, replacing any previous one. An empty
    /// habit set falls back to [`ChallengeTracker::habits`].
    pub fn start_challenge(&mut self, name: &str, habits: Vec<DailyHabit>) -> Result<&Challenge, ChallengeError> {
        let habits = if habits.is_empty() { self.habits()? } else { habits };
        let name = match name.trim() {
            "" => DEFAULT_CHALLENGE_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        let mut challenge = Challenge {
            id: new_id(),
            name,
            start_date: self.clock.today(),
            current_day: 1,
            total_days: self.total_days,
            is_active: true,
            habits,
            progress: Vec::new(),
            streak_days: 0,
            best_streak: 0,
            total_tasks_completed: 0,
            total_pomodoro_minutes: 0,
        };
        challenge.ensure_day(1);
        tracing::info!(challenge = %challenge.id, days = challenge.total_days, "started challenge");
        self.challenge = Some(challenge);
        self.save()?;
        self.require()
    }

    /// The entry for `day`, created on first access.
    pub fn day_progress(&mut self, day: u32) -> Result<&DayProgress, ChallengeError> {
        let today = self.clock.today();
        let challenge = self.challenge.as_mut().ok_or(ChallengeError::NoChallenge)?;
        challenge.current_day = challenge.day_for(today);
        check_day(challenge, day)?;
        let created = if challenge.entry(day).is_none() {
            if !challenge.is_active {
                return Err(ChallengeError::Ended);
            }
            challenge.ensure_day(day);
            challenge.recompute_streaks();
            true
        } else {
            false
        };
        if created {
            tracing::debug!(day, "opened challenge day");
            self.save()?;
        }
        let challenge = self.require()?;
        challenge.entry(day).ok_or(ChallengeError::InvalidDay {
            day,
            current: challenge.current_day,
        })
    }

    /// Mark a habit done or not done. Unknown habit ids are ignored.
    pub fn set_habit_completion(&mut self, day: u32, habit_id: &str, completed: bool) -> Result<&Challenge, ChallengeError> {
        let now = self.clock.now();
        let challenge = self.writable(day)?;
        if !challenge.habits.iter().any(|h| h.id == habit_id) {
            tracing::debug!(habit = %habit_id, "ignoring unknown habit");
            return self.require();
        }
        let index = challenge.ensure_day(day);
        let entry = challenge.progress[index].entry_mut(habit_id);
        entry.completed = completed;
        entry.completed_at = if completed { Some(now) } else { None };
        challenge.recompute_streaks();
        self.save()?;
        self.require()
    }

    pub fn set_habit_note(&mut self, day: u32, habit_id: &str, note: &str) -> Result<&Challenge, ChallengeError> {
        let challenge = self.writable(day)?;
        if !challenge.habits.iter().any(|h| h.id == habit_id) {
            return self.require();
        }
        let index = challenge.ensure_day(day);
        let note = note.trim();
        challenge.progress[index].entry_mut(habit_id).note = (!note.is_empty()).then(|| note.to_string());
        self.save()?;
        self.require()
    }

    pub fn set_mood(&mut self, day: u32, mood: u8) -> Result<&Challenge, ChallengeError> {
        let mood = Mood::new(mood)?;
        let challenge = self.writable(day)?;
        let index = challenge.ensure_day(day);
        challenge.progress[index].mood = Some(mood);
        self.save()?;
        self.require()
    }

    pub fn set_reflection(&mut self, day: u32, text: &str) -> Result<&Challenge, ChallengeError> {
        let challenge = self.writable(day)?;
        let index = challenge.ensure_day(day);
        let text = text.trim();
        challenge.progress[index].reflection = (!text.is_empty()).then(|| text.to_string());
        self.save()?;
        self.require()
    }

    /// Set the day's completed-task count, moving the running total by the
    /// difference.
    pub fn set_tasks_completed(&mut self, day: u32, count: u32) -> Result<&Challenge, ChallengeError> {
        let challenge = self.writable(day)?;
        let index = challenge.ensure_day(day);
        let previous = std::mem::replace(&mut challenge.progress[index].tasks_completed, count);
        challenge.total_tasks_completed = challenge.total_tasks_completed.saturating_sub(previous) + count;
        self.save()?;
        self.require()
    }

    pub fn set_pomodoro_minutes(&mut self, day: u32, minutes: u32) -> Result<&Challenge, ChallengeError> {
        let challenge = self.writable(day)?;
        let index = challenge.ensure_day(day);
        let previous = std::mem::replace(&mut challenge.progress[index].pomodoro_minutes, minutes);
        challenge.total_pomodoro_minutes = challenge.total_pomodoro_minutes.saturating_sub(previous) + minutes;
        self.save()?;
        self.require()
    }

    /// Record how many of `tasks` were completed today on the current day.
    pub fn sync_tasks_completed(&mut self, tasks: &[Task]) -> Result<u32, ChallengeError> {
        let today = self.clock.today();
        let count = views::completed_on(tasks, today).len() as u32;
        let day = self.current_day().ok_or(ChallengeError::NoChallenge)?;
        self.set_tasks_completed(day, count)?;
        Ok(count)
    }

    pub fn recompute_streaks(&mut self) -> Result<(), ChallengeError> {
        let today = self.clock.today();
        let challenge = self.challenge.as_mut().ok_or(ChallengeError::NoChallenge)?;
        challenge.current_day = challenge.day_for(today);
        challenge.recompute_streaks();
        self.save()
    }

    pub fn end_challenge(&mut self) -> Result<(), ChallengeError> {
        let challenge = self.challenge.as_mut().ok_or(ChallengeError::NoChallenge)?;
        challenge.is_active = false;
        tracing::info!(challenge = %challenge.id, "ended challenge");
        self.save()
    }

    /// Forget the challenge entirely.
    pub fn reset_challenge(&mut self) -> Result<(), ChallengeError> {
        if let Some(db) = &self.database {
            db.remove(StorageKey::Challenge)?;
        }
        self.challenge = None;
        Ok(())
    }

    pub fn is_day_complete(&self, day: u32) -> bool {
        self.challenge.as_ref().is_some_and(|c| c.is_day_complete(day))
    }

    pub fn is_today_completed(&self) -> bool {
        match (&self.challenge, self.current_day()) {
            (Some(c), Some(day)) => c.is_day_complete(day),
            _ => false,
        }
    }

    pub fn completion_stats(&self) -> Option<CompletionStats> {
        let challenge = self.challenge.as_ref()?;
        let mut stats = CompletionStats {
            total_days: self.current_day().unwrap_or(challenge.current_day),
            completed_days: 0,
            total_habits: 0,
            completed_habits: 0,
            average_mood: 3.0,
            completion_rate: 0,
        };
        let mut mood_sum = 0u32;
        let mut mood_count = 0u32;
        for progress in challenge.progress.iter().filter(|p| !p.is_rest_day) {
            if challenge.meets_required(progress) {
                stats.completed_days += 1;
            }
            stats.total_habits += progress.habits.len() as u32;
            stats.completed_habits += progress.habits.iter().filter(|e| e.completed).count() as u32;
            if let Some(mood) = progress.mood {
                mood_sum += u32::from(mood.value());
                mood_count += 1;
            }
        }
        if mood_count > 0 {
            stats.average_mood = f64::from(mood_sum) / f64::from(mood_count);
        }
        if stats.total_habits > 0 {
            stats.completion_rate =
                ((f64::from(stats.completed_habits) / f64::from(stats.total_habits)) * 100.0).round() as u32;
        }
        Some(stats)
    }

    fn require(&self) -> Result<&Challenge, ChallengeError> {
        self.challenge.as_ref().ok_or(ChallengeError::NoChallenge)
    }

    /// The challenge, if `day` may be written to right now.
    fn writable(&mut self, day: u32) -> Result<&mut Challenge, ChallengeError> {
        let today = self.clock.today();
        let challenge = self.challenge.as_mut().ok_or(ChallengeError::NoChallenge)?;
        challenge.current_day = challenge.day_for(today);
        if !challenge.is_active {
            return Err(ChallengeError::Ended);
        }
        check_day(challenge, day)?;
        Ok(challenge)
    }

    fn save(&self) -> Result<(), ChallengeError> {
        if let (Some(db), Some(challenge)) = (&self.database, &self.challenge) {
            db.set_json(StorageKey::Challenge, challenge)?;
        }
        Ok(())
    }
}

fn check_day(challenge: &Challenge, day: u32) -> Result<(), ChallengeError> {
    if day == 0 || day > challenge.current_day {
        return Err(ChallengeError::InvalidDay {
            day,
            current: challenge.current_day,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::FixedClock;
    use chrono::TimeZone;

    fn start() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap())
    }

    fn two_habits() -> Vec<DailyHabit> {
        vec![
            DailyHabit::new("h1", "Run", HabitCategory::Health, true),
            DailyHabit::new("h2", "Read", HabitCategory::Mind, false),
        ]
    }

    fn tracker(clock: &FixedClock) -> ChallengeTracker {
        ChallengeTracker::new(clock.clone(), DEFAULT_CHALLENGE_DAYS)
    }

    #[test]
    fn start_creates_day_one() {
        let clock = start();
        let mut tracker = tracker(&clock);
        let challenge = tracker.start_challenge("Spring", two_habits()).unwrap();
        assert_eq!(challenge.current_day, 1);
        assert_eq!(challenge.progress.len(), 1);
        assert!(!challenge.progress[0].is_rest_day);
        assert_eq!(challenge.progress[0].habits.len(), 2);
        assert_eq!(tracker.status(), ChallengeStatus::Active);
    }

    #[test]
    fn optional_habit_alone_does_not_complete_day() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        let challenge = tracker.set_habit_completion(1, "h2", true).unwrap();
        assert!(!challenge.is_day_complete(1));
        assert_eq!(challenge.streak_days, 0);
    }

    #[test]
    fn incomplete_next_day_resets_streak_but_not_best() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        tracker.set_habit_completion(1, "h1", true).unwrap();
        let challenge = tracker.set_habit_completion(1, "h2", true).unwrap();
        assert!(challenge.is_day_complete(1));
        assert_eq!(challenge.streak_days, 1);

        clock.advance(Duration::days(1));
        // A missing entry for today does not break the run
        tracker.recompute_streaks().unwrap();
        assert_eq!(tracker.challenge().unwrap().streak_days, 1);

        tracker.day_progress(2).unwrap();
        let challenge = tracker.challenge().unwrap();
        assert_eq!(challenge.current_day, 2);
        assert_eq!(challenge.streak_days, 0);
        assert_eq!(challenge.best_streak, 1);
    }

    #[test]
    fn best_streak_survives_retroactive_edits() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        let mut best = 0;
        for day in 1..=3 {
            if day > 1 {
                clock.advance(Duration::days(1));
            }
            let challenge = tracker.set_habit_completion(day, "h1", true).unwrap();
            assert!(challenge.best_streak >= best);
            best = challenge.best_streak;
        }
        assert_eq!(best, 3);

        for day in 1..=3 {
            let challenge = tracker.set_habit_completion(day, "h1", false).unwrap();
            assert!(challenge.best_streak >= best);
            best = challenge.best_streak;
        }
        assert_eq!(tracker.challenge().unwrap().streak_days, 0);
        assert_eq!(best, 3);
    }

    #[test]
    fn rest_days_neither_count_nor_break() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        for day in 1..=8 {
            if day > 1 {
                clock.advance(Duration::days(1));
            }
            if day != 7 {
                tracker.set_habit_completion(day, "h1", true).unwrap();
            }
        }
        let challenge = tracker.challenge().unwrap();
        assert!(challenge.entry(7).is_none());
        assert_eq!(challenge.streak_days, 7);

        let rest = tracker.day_progress(7).unwrap();
        assert!(rest.is_rest_day);
        assert_eq!(tracker.challenge().unwrap().streak_days, 7);
    }

    #[test]
    fn skipped_workday_breaks_streak() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        tracker.set_habit_completion(1, "h1", true).unwrap();
        clock.advance(Duration::days(2));
        let challenge = tracker.set_habit_completion(3, "h1", true).unwrap();
        assert_eq!(challenge.streak_days, 1);
        assert_eq!(challenge.best_streak, 1);
    }

    #[test]
    fn current_day_clamps_to_total() {
        let clock = start();
        let mut tracker = ChallengeTracker::new(clock.clone(), 10);
        tracker.start_challenge("Short", two_habits()).unwrap();
        clock.advance(Duration::days(40));
        assert_eq!(tracker.current_day(), Some(10));
        assert!(matches!(
            tracker.day_progress(11),
            Err(ChallengeError::InvalidDay { day: 11, current: 10 })
        ));
    }

    #[test]
    fn unknown_habit_is_a_no_op() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        let challenge = tracker.set_habit_completion(1, "nope", true).unwrap();
        assert!(challenge.progress[0].habits.iter().all(|e| !e.completed));
    }

    #[test]
    fn ended_challenge_rejects_writes_but_allows_reads() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        tracker.end_challenge().unwrap();

        assert_eq!(tracker.status(), ChallengeStatus::Ended);
        assert!(matches!(tracker.set_habit_completion(1, "h1", true), Err(ChallengeError::Ended)));
        assert!(matches!(tracker.set_mood(1, 4), Err(ChallengeError::Ended)));
        assert!(tracker.day_progress(1).is_ok());
    }

    #[test]
    fn mood_must_be_in_range() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        assert!(matches!(tracker.set_mood(1, 0), Err(ChallengeError::InvalidMood(0))));
        assert!(matches!(tracker.set_mood(1, 6), Err(ChallengeError::InvalidMood(6))));
        let challenge = tracker.set_mood(1, 5).unwrap();
        assert_eq!(challenge.progress[0].mood.map(Mood::value), Some(5));
    }

    #[test]
    fn counters_move_by_delta() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        tracker.set_tasks_completed(1, 4).unwrap();
        let challenge = tracker.set_tasks_completed(1, 2).unwrap();
        assert_eq!(challenge.total_tasks_completed, 2);
        tracker.set_pomodoro_minutes(1, 50).unwrap();
        let challenge = tracker.set_pomodoro_minutes(1, 75).unwrap();
        assert_eq!(challenge.total_pomodoro_minutes, 75);
    }

    #[test]
    fn sync_counts_tasks_completed_today() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        let mut done = Task::new("done".into(), "inbox".into(), clock.now());
        done.set_completed(true, clock.now());
        let open = Task::new("open".into(), "inbox".into(), clock.now());
        assert_eq!(tracker.sync_tasks_completed(&[done, open]).unwrap(), 1);
        assert_eq!(tracker.challenge().unwrap().progress[0].tasks_completed, 1);
    }

    #[test]
    fn stats_default_mood_and_rate() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();
        let stats = tracker.completion_stats().unwrap();
        assert_eq!(stats.average_mood, 3.0);
        assert_eq!(stats.completion_rate, 0);

        tracker.set_habit_completion(1, "h1", true).unwrap();
        tracker.set_mood(1, 4).unwrap();
        let stats = tracker.completion_stats().unwrap();
        assert_eq!(stats.completed_days, 1);
        assert_eq!(stats.completion_rate, 50);
        assert_eq!(stats.average_mood, 4.0);
        assert!(tracker.is_today_completed());
    }

    #[test]
    fn persists_and_reloads() {
        let clock = start();
        let db = Database::in_memory().unwrap();
        let mut tracker = tracker(&clock).with_database(db);
        tracker.start_challenge("", Vec::new()).unwrap();
        tracker.set_reflection(1, "  good start ").unwrap();
        let db = tracker.database.take().unwrap();

        let mut reloaded = ChallengeTracker::new(clock.clone(), DEFAULT_CHALLENGE_DAYS).with_database(db);
        reloaded.load().unwrap();
        let challenge = reloaded.challenge().unwrap();
        assert_eq!(challenge.name, DEFAULT_CHALLENGE_NAME);
        assert_eq!(challenge.habits.len(), 8);
        assert_eq!(challenge.progress[0].reflection.as_deref(), Some("good start"));

        reloaded.reset_challenge().unwrap();
        assert_eq!(reloaded.status(), ChallengeStatus::NotStarted);
    }

    #[test]
    fn saved_habits_apply_to_running_challenge() {
        let clock = start();
        let mut tracker = tracker(&clock).with_database(Database::in_memory().unwrap());
        assert_eq!(tracker.habits().unwrap(), default_habits());
        tracker.start_challenge("Spring", two_habits()).unwrap();
        let challenge = tracker.set_habit_completion(1, "h1", true).unwrap();
        assert_eq!(challenge.streak_days, 1);

        let mut stricter = two_habits();
        stricter[1].is_required = true;
        tracker.save_habits(stricter.clone()).unwrap();

        assert_eq!(tracker.habits().unwrap(), stricter);
        let challenge = tracker.challenge().unwrap();
        assert!(!challenge.is_day_complete(1));
        assert_eq!(challenge.streak_days, 0);
        assert_eq!(challenge.best_streak, 1);
    }

    #[test]
    fn habit_note_is_trimmed_and_clearable() {
        let clock = start();
        let mut tracker = tracker(&clock);
        tracker.start_challenge("Spring", two_habits()).unwrap();

        let challenge = tracker.set_habit_note(1, "h2", "  chapter 3 ").unwrap();
        let entry = challenge.progress[0].habits.iter().find(|e| e.habit_id == "h2").unwrap();
        assert_eq!(entry.note.as_deref(), Some("chapter 3"));
        assert!(!entry.completed);

        let challenge = tracker.set_habit_note(1, "h2", "   ").unwrap();
        assert!(challenge.progress[0].habits.iter().all(|e| e.note.is_none()));
        let challenge = tracker.set_habit_note(1, "missing", "x").unwrap();
        assert!(challenge.progress[0].habits.iter().all(|e| e.note.is_none()));
    }
}
