pub mod app;
pub mod config;
pub mod error;
pub mod services;
pub mod startup;
pub mod util;

pub use app::AppState;
pub use config::{
    BudgetSettings, ConfigLoad, FetchParams, GithubSettings, PulseConfig, QueryParams,
    RepositorySettings,
};
pub use error::{ApiError, AppError, Result};
pub use services::{
    AppServices, DEFAULT_DEVIATION_THRESHOLD, FetchReport, RecomputeReport, WordFrequencies,
};
pub use startup::{AppPaths, ensure_app_dirs};
pub use util::time::{parse_bound, resolve_window};
