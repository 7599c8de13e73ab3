#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use ingest::{
    CommitPage, IngestError, IngestRequest, PageFetcher, PageRequest, RateBudget,
    RateLimitReadout, RawCommit, Result,
};
use pulse_core::RateBudgetReading;
use pulse_db::Db;
use tempfile::TempDir;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("ingest.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

/// Replays canned responses in order and records every cursor it was asked
/// for. Running out of responses fails the test.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: VecDeque<Result<CommitPage>>,
    pub requested: Vec<Option<String>>,
}

impl ScriptedFetcher {
    pub fn new(responses: Vec<Result<CommitPage>>) -> Self {
        Self {
            responses: responses.into(),
            requested: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl PageFetcher for ScriptedFetcher {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<CommitPage> {
        self.requested.push(request.after.clone());
        self.responses
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected fetch after {:?}", request.after))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Acquire,
    Fetch(Option<String>),
    Update(RateBudgetReading),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// Budget that never blocks and logs every call into a shared event log.
pub struct RecordingBudget {
    events: EventLog,
    reading: RateBudgetReading,
}

impl RecordingBudget {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            reading: RateBudgetReading {
                remaining: 5000,
                reset_at: 0,
            },
        }
    }
}

impl RateBudget for RecordingBudget {
    fn acquire(&mut self) {
        self.events.borrow_mut().push(Event::Acquire);
    }

    fn update(&mut self, reading: RateBudgetReading) {
        self.events.borrow_mut().push(Event::Update(reading));
        self.reading = reading;
    }

    fn reading(&self) -> RateBudgetReading {
        self.reading
    }
}

/// Wraps a fetcher so its calls land in the same log as the budget's.
pub struct LoggingFetcher<F> {
    inner: F,
    events: EventLog,
}

impl<F> LoggingFetcher<F> {
    pub fn new(inner: F, events: EventLog) -> Self {
        Self { inner, events }
    }
}

impl<F: PageFetcher> PageFetcher for LoggingFetcher<F> {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<CommitPage> {
        self.events
            .borrow_mut()
            .push(Event::Fetch(request.after.clone()));
        self.inner.fetch_page(request)
    }
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
}

pub fn request_2024(use_cache: bool) -> IngestRequest {
    IngestRequest::new(
        "OpenRA",
        "OpenRA",
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        use_cache,
    )
    .expect("valid window")
}

pub fn raw(sha: &str, date: DateTime<Utc>, additions: u64, deletions: u64) -> RawCommit {
    RawCommit {
        sha: sha.to_string(),
        message: format!("Update {sha}\n\nSome details"),
        author_name: "alice".to_string(),
        author_email: Some("alice@example.com".to_string()),
        author_date: date,
        additions,
        deletions,
        parent_count: 1,
    }
}

pub fn merge(sha: &str, date: DateTime<Utc>) -> RawCommit {
    RawCommit {
        message: format!("Merge pull request {sha}"),
        parent_count: 2,
        ..raw(sha, date, 10, 10)
    }
}

pub fn page(commits: Vec<RawCommit>, next_cursor: Option<&str>) -> Result<CommitPage> {
    Ok(CommitPage {
        commits,
        next_cursor: next_cursor.map(str::to_string),
        rate_limit: Some(RateLimitReadout {
            remaining: 4900,
            reset_at: 1_735_000_000,
        }),
    })
}

pub fn page_without_readout(commits: Vec<RawCommit>, next_cursor: Option<&str>) -> Result<CommitPage> {
    Ok(CommitPage {
        commits,
        next_cursor: next_cursor.map(str::to_string),
        rate_limit: None,
    })
}

pub fn transport_failure() -> Result<CommitPage> {
    Err(IngestError::Transport("connection reset by peer".to_string()))
}
