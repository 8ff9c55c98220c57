use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use directories::{BaseDirs, ProjectDirs};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "sage-dev",
            Profile::Prod => "sage",
        }
    }
}

/// Get the configuration directory path.
/// The dev profile uses "sage-dev" instead of "sage".
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "sage", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path.
/// The dev profile uses "sage-dev" instead of "sage".
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "sage", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
}

/// Parse tags from a comma-separated string.
/// Returns trimmed, non-empty tags in the order they were entered, without duplicates.
pub fn parse_tags(tags: Option<&str>) -> Vec<String> {
    let mut parsed: Vec<String> = Vec::new();
    if let Some(tags_str) = tags {
        for tag in tags_str.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !parsed.iter().any(|existing| existing == tag) {
                parsed.push(tag.to_string());
            }
        }
    }
    parsed
}

/// The instant at which a local calendar day begins.
pub fn start_of_local_day(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight skipped by a DST jump
        LocalResult::None => Utc.from_utc_datetime(&midnight),
    }
}

/// Local calendar day of an instant.
pub fn local_day(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

/// Source of wall-clock time. Stores and the challenge tracker read time only
/// through this so tests can pin it.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn local_now(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }

    fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_keep_entry_order_and_drop_duplicates() {
        assert_eq!(
            parse_tags(Some(" work, urgent ,,work, home")),
            vec!["work", "urgent", "home"]
        );
        assert!(parse_tags(None).is_empty());
        assert!(parse_tags(Some("  ")).is_empty());
    }

    #[test]
    fn expand_path_leaves_absolute_paths() {
        assert_eq!(expand_path("/tmp/sage.db"), PathBuf::from("/tmp/sage.db"));
    }

    #[test]
    fn start_of_day_maps_back_to_same_day() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 17).unwrap();
        assert_eq!(local_day(start_of_local_day(date)), date);
    }

    #[test]
    fn fixed_clock_clones_share_time() {
        let clock = FixedClock::new(Utc::now());
        let shared = clock.clone();
        let before = shared.now();
        clock.advance(chrono::Duration::days(1));
        assert_eq!(shared.now() - before, chrono::Duration::days(1));
    }
}
