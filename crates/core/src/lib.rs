pub mod stats;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub use stats::{
    Distribution, STOP_WORDS, count_words, is_stop_word, population_distribution, tokenize,
    top_words,
};

pub const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
pub const TOP_WORDS_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowError {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window start {} must be before end {}",
            format_timestamp(&self.start),
            format_timestamp(&self.end)
        )
    }
}

impl std::error::Error for WindowError {}

/// A `[start, end]` time range scoping an ingestion run or a query.
///
/// Bounds are truncated to whole seconds so that the persisted text form and
/// the in-memory value always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        let start = start.trunc_subsecs(0);
        let end = end.trunc_subsecs(0);
        if start >= end {
            return Err(WindowError { start, end });
        }
        Ok(Self { start, end })
    }

    /// One year back from `now`, ending yesterday, on midnight boundaries.
    pub fn trailing_year(now: DateTime<Utc>) -> Self {
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            start: midnight - Duration::days(365),
            end: midnight - Duration::days(1),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn covers(&self, other: &Window) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    pub fn start_text(&self) -> String {
        format_timestamp(&self.start)
    }

    pub fn end_text(&self) -> String {
        format_timestamp(&self.end)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_text(), self.end_text())
    }
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SSZ`, the storage and wire format.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(value.trim())?
        .with_timezone(&Utc)
        .trunc_subsecs(0))
}

/// Splits a raw commit message into its title line and optional body.
pub fn split_message(message: &str) -> (String, Option<String>) {
    let trimmed = message.trim();
    match trimmed.split_once('\n') {
        Some((title, body)) => {
            let title = title.trim_end_matches('\r').to_string();
            let body = body.to_string();
            if body.trim().is_empty() {
                (title, None)
            } else {
                (title, Some(body))
            }
        }
        None => (trimmed.to_string(), None),
    }
}

/// A non-merge commit as it is handed to the commit store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitFact {
    pub sha: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub author_date: DateTime<Utc>,
    pub message_title: String,
    pub message_body: Option<String>,
    pub additions: u64,
    pub deletions: u64,
    pub repository: String,
}

impl CommitFact {
    pub fn total_changes(&self) -> u64 {
        self.additions.saturating_add(self.deletions)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub author_date: DateTime<Utc>,
    pub message_title: String,
    pub message_body: Option<String>,
    pub additions: u64,
    pub deletions: u64,
    pub total_changes: u64,
    pub repository: String,
    pub ingested_at: DateTime<Utc>,
    pub z_score: Option<f64>,
}

impl Commit {
    pub fn message_text(&self) -> String {
        match &self.message_body {
            Some(body) => format!("{} {}", self.message_title, body),
            None => self.message_title.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerState {
    InProgress,
    Completed,
}

/// Fetch progress for one (repository, window) ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub repository: String,
    pub window: Window,
    pub last_cursor: Option<String>,
    pub completed: bool,
    pub last_updated: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn state(&self) -> LedgerState {
        if self.completed {
            LedgerState::Completed
        } else {
            LedgerState::InProgress
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrequency {
    pub word: String,
    pub frequency: u64,
}

/// Provider quota as last reported: calls left and the reset epoch (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBudgetReading {
    pub remaining: u64,
    pub reset_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeekMetric {
    Commits,
    Additions,
    Deletions,
    TotalChanges,
}

impl DayOfWeekMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commits => "commits",
            Self::Additions => "additions",
            Self::Deletions => "deletions",
            Self::TotalChanges => "total_changes",
        }
    }

    pub fn value_of(self, commit: &Commit) -> u64 {
        match self {
            Self::Commits => 1,
            Self::Additions => commit.additions,
            Self::Deletions => commit.deletions,
            Self::TotalChanges => commit.total_changes,
        }
    }
}

impl FromStr for DayOfWeekMetric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "commits" => Ok(Self::Commits),
            "additions" => Ok(Self::Additions),
            "deletions" => Ok(Self::Deletions),
            "total_changes" => Ok(Self::TotalChanges),
            other => Err(format!(
                "invalid metric '{other}', expected one of: commits, additions, deletions, total_changes"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayValue {
    pub day: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayActivity {
    pub metric: DayOfWeekMetric,
    pub author: Option<String>,
    pub days: Vec<DayValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommitStatistics {
    pub commit_count: usize,
    pub mean_changes: f64,
    pub std_changes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatisticsOutcome {
    Computed(CommitStatistics),
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WordFrequencyOutcome {
    Computed {
        distinct_words: usize,
        top: Vec<WordFrequency>,
    },
    NoData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn window_rejects_inverted_and_empty_bounds() {
        assert!(Window::new(ts(2024, 2, 1), ts(2024, 1, 1)).is_err());
        assert!(Window::new(ts(2024, 1, 1), ts(2024, 1, 1)).is_err());
        assert!(Window::new(ts(2024, 1, 1), ts(2024, 1, 2)).is_ok());
    }

    #[test]
    fn year_window_covers_sub_window() {
        let year = Window::new(ts(2024, 1, 1), ts(2024, 12, 31)).unwrap();
        let spring = Window::new(ts(2024, 3, 1), ts(2024, 6, 30)).unwrap();
        assert!(year.covers(&spring));
        assert!(!spring.covers(&year));
        assert!(year.covers(&year));
    }

    #[test]
    fn trailing_year_ends_yesterday_at_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 13, 45, 12).unwrap();
        let window = Window::trailing_year(now);
        assert_eq!(window.end_text(), "2024-06-14T00:00:00Z");
        assert_eq!(window.start_text(), "2023-06-16T00:00:00Z");
    }

    #[test]
    fn timestamps_round_trip_through_wire_format() {
        let parsed = parse_timestamp("2024-03-01T10:11:12+02:00").unwrap();
        assert_eq!(format_timestamp(&parsed), "2024-03-01T08:11:12Z");
    }

    #[test]
    fn split_message_separates_title_and_body() {
        let (title, body) = split_message("Fix the bug\nin the fix\n");
        assert_eq!(title, "Fix the bug");
        assert_eq!(body.as_deref(), Some("in the fix"));

        let (title, body) = split_message("Add parser\n\nHandles nested blocks.\n");
        assert_eq!(title, "Add parser");
        assert_eq!(body.as_deref(), Some("\nHandles nested blocks."));

        let (title, body) = split_message("Only a title\n\n   ");
        assert_eq!(title, "Only a title");
        assert_eq!(body, None);

        let (title, body) = split_message("  Single line  ");
        assert_eq!(title, "Single line");
        assert_eq!(body, None);
    }

    #[test]
    fn metric_parses_known_names() {
        assert_eq!(
            "total_changes".parse::<DayOfWeekMetric>(),
            Ok(DayOfWeekMetric::TotalChanges)
        );
        assert!("lines".parse::<DayOfWeekMetric>().is_err());
    }
}
