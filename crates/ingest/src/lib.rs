mod budget;
mod fetcher;
mod graphql;
mod pipeline;
mod types;

pub use budget::{
    BudgetStore, DEFAULT_ALLOWANCE, DEFAULT_PROVIDER, DEFAULT_SAFETY_MARGIN, LocalRateBudget,
    RateBudget, SharedRateBudget, wait_for,
};
pub use fetcher::{
    DEFAULT_API_URL, DEFAULT_PAGE_SIZE, DEFAULT_RATE_LIMIT_BACKOFF, DEFAULT_REQUEST_TIMEOUT,
    GithubFetcher, GithubFetcherConfig, PageFetcher,
};
pub use pipeline::Ingestor;
pub use types::{
    CommitPage, IngestError, IngestOutcome, IngestRequest, IngestStats, PageRequest,
    RateLimitReadout, RawCommit, Result,
};
