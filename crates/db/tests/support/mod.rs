#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use pulse_core::{CommitFact, Window};
use pulse_db::Db;
use tempfile::TempDir;

pub const REPO: &str = "OpenRA/OpenRA";

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Window {
    Window::new(start, end).expect("window")
}

pub fn year_2024() -> Window {
    window(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap(),
    )
}

pub fn make_fact(sha: &str, date: DateTime<Utc>, additions: u64, deletions: u64) -> CommitFact {
    CommitFact {
        sha: sha.to_string(),
        author_name: "alice".to_string(),
        author_email: Some("alice@example.com".to_string()),
        author_date: date,
        message_title: format!("Change {sha}"),
        message_body: None,
        additions,
        deletions,
        repository: REPO.to_string(),
    }
}

pub fn insert_facts(db: &mut Db, facts: &[CommitFact]) {
    db.upsert_commits(facts).expect("insert commits");
}
