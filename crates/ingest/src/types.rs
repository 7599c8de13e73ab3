use chrono::{DateTime, Utc};
use pulse_core::{Commit, CommitFact, Repository, Window, WindowError, split_message};
use serde::Serialize;

/// A commit exactly as the provider reported it, merges included.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommit {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub author_date: DateTime<Utc>,
    pub additions: u64,
    pub deletions: u64,
    pub parent_count: u32,
}

impl RawCommit {
    pub fn is_merge(&self) -> bool {
        self.parent_count > 1
    }

    pub fn into_fact(self, repository: &str) -> CommitFact {
        let (message_title, message_body) = split_message(&self.message);
        CommitFact {
            sha: self.sha,
            author_name: self.author_name,
            author_email: self.author_email,
            author_date: self.author_date,
            message_title,
            message_body,
            additions: self.additions,
            deletions: self.deletions,
            repository: repository.to_string(),
        }
    }
}

/// Rate-limit counters the provider attached to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitReadout {
    pub remaining: u64,
    pub reset_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitPage {
    pub commits: Vec<RawCommit>,
    /// `None` on the last page.
    pub next_cursor: Option<String>,
    pub rate_limit: Option<RateLimitReadout>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub repository: Repository,
    pub after: Option<String>,
    pub window: Window,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    pub repository: Repository,
    pub window: Window,
    pub use_cache: bool,
}

impl IngestRequest {
    pub fn new(
        owner: &str,
        name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        use_cache: bool,
    ) -> Result<Self> {
        let window = Window::new(start, end)?;
        Ok(Self {
            repository: Repository::new(owner, name),
            window,
            use_cache,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub pages_fetched: usize,
    pub commits_seen: usize,
    pub commits_inserted: usize,
    pub merges_skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub repository: String,
    pub window: Window,
    pub cache_used: bool,
    pub resumed: bool,
    pub stats: IngestStats,
    pub commits: Vec<Commit>,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("rate limit exceeded after retry")]
    RateLimitExceeded,
    #[error("invalid window: {0}")]
    InvalidWindow(#[from] WindowError),
    #[error("db error: {0}")]
    Db(#[from] pulse_db::DbError),
}

impl IngestError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimitExceeded)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
