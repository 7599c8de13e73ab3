use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ingest::{
    DEFAULT_API_URL, DEFAULT_PAGE_SIZE, DEFAULT_PROVIDER, DEFAULT_RATE_LIMIT_BACKOFF,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SAFETY_MARGIN, GithubFetcherConfig,
};
use pulse_core::Repository;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const DB_FILE_NAME: &str = "repo-pulse.sqlite";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// Relative paths are resolved against the config file's directory.
    pub db_path: PathBuf,
    pub github: GithubSettings,
    pub repository: RepositorySettings,
    pub budget: BudgetSettings,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DB_FILE_NAME),
            github: GithubSettings::default(),
            repository: RepositorySettings::default(),
            budget: BudgetSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    pub api_url: String,
    /// Environment variable holding the API token.
    pub token_env: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub rate_limit_backoff_secs: u64,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            rate_limit_backoff_secs: DEFAULT_RATE_LIMIT_BACKOFF.as_secs(),
        }
    }
}

impl GithubSettings {
    pub fn fetcher_config(&self, token: Option<String>) -> GithubFetcherConfig {
        GithubFetcherConfig {
            api_url: self.api_url.clone(),
            token,
            page_size: self.page_size,
            timeout: Duration::from_secs(self.request_timeout_secs),
            rate_limit_backoff: Duration::from_secs(self.rate_limit_backoff_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    pub owner: String,
    pub name: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            owner: "OpenRA".to_string(),
            name: "OpenRA".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSettings {
    /// Share the rate budget with other processes through the database.
    pub shared: bool,
    pub provider: String,
    pub safety_margin_secs: u64,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            shared: true,
            provider: DEFAULT_PROVIDER.to_string(),
            safety_margin_secs: DEFAULT_SAFETY_MARGIN.as_secs(),
        }
    }
}

impl BudgetSettings {
    pub fn safety_margin(&self) -> Duration {
        Duration::from_secs(self.safety_margin_secs)
    }
}

impl PulseConfig {
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// `owner`/`name` from the caller, falling back to the configured
    /// repository for whichever is missing.
    pub fn repository(&self, owner: Option<&str>, name: Option<&str>) -> Result<Repository> {
        let owner = owner.unwrap_or(&self.repository.owner).trim();
        let name = name.unwrap_or(&self.repository.name).trim();
        if owner.is_empty() || name.is_empty() {
            return Err(AppError::InvalidInput(
                "repository owner and name must not be empty".to_string(),
            ));
        }
        Ok(Repository::new(owner, name))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: PulseConfig,
    pub path: PathBuf,
    pub created: bool,
}

/// Reads the TOML config at `path`, writing a default one first if the file
/// does not exist yet.
pub fn load_or_create(path: &Path) -> Result<ConfigLoad> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|err| AppError::Config(format!("create config dir {}: {}", dir.display(), err)))?;

    let (mut config, created) = if path.exists() {
        let contents = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("read config {}: {}", path.display(), err)))?;
        let config: PulseConfig = toml::from_str(&contents)
            .map_err(|err| AppError::Config(format!("parse config {}: {}", path.display(), err)))?;
        (config, false)
    } else {
        let config = PulseConfig::default();
        let contents = toml::to_string_pretty(&config)
            .map_err(|err| AppError::Config(format!("serialize config: {}", err)))?;
        fs::write(path, contents)
            .map_err(|err| AppError::Config(format!("write config {}: {}", path.display(), err)))?;
        (config, true)
    };

    if config.db_path.is_relative() {
        config.db_path = dir.join(&config.db_path);
    }
    Ok(ConfigLoad {
        config,
        path: path.to_path_buf(),
        created,
    })
}

/// Repository and window selection shared by every read.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct QueryParams {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FetchParams {
    #[serde(flatten)]
    pub query: QueryParams,
    /// Serve already-ingested windows from the store. On unless asked off.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self {
            query: QueryParams::default(),
            use_cache: default_use_cache(),
        }
    }
}

fn default_use_cache() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_default_config_then_reads_it_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");

        let first = load_or_create(&path).expect("create");
        assert!(first.created);
        assert!(path.exists());
        assert_eq!(first.config.db_path, dir.path().join("nested").join(DB_FILE_NAME));
        assert_eq!(first.config.github.page_size, 100);
        assert_eq!(first.config.github.rate_limit_backoff_secs, 60);

        let second = load_or_create(&path).expect("load");
        assert!(!second.created);
        assert_eq!(second.config, first.config);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "db_path = \"/tmp/pulse.sqlite\"\n\n[repository]\nowner = \"rust-lang\"\nname = \"rust\"\n",
        )
        .expect("write config");

        let loaded = load_or_create(&path).expect("load");
        assert_eq!(loaded.config.db_path, PathBuf::from("/tmp/pulse.sqlite"));
        assert_eq!(loaded.config.repository.owner, "rust-lang");
        assert_eq!(loaded.config.github.token_env, "GITHUB_TOKEN");
        assert!(loaded.config.budget.shared);
    }

    #[test]
    fn broken_config_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "page_size = [").expect("write config");
        assert!(matches!(load_or_create(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn fetch_params_use_cache_unless_told_otherwise() {
        let params: FetchParams =
            serde_json::from_str(r#"{"owner":"OpenRA","name":"OpenRA"}"#).expect("parse");
        assert!(params.use_cache);
        assert_eq!(params.query.owner.as_deref(), Some("OpenRA"));
        assert!(FetchParams::default().use_cache);

        let params: FetchParams =
            serde_json::from_str(r#"{"use_cache":false}"#).expect("parse");
        assert!(!params.use_cache);
    }

    #[test]
    fn repository_falls_back_to_configured_one() {
        let config = PulseConfig::default();
        let repo = config.repository(None, Some("OpenRA-Extras")).expect("repo");
        assert_eq!(repo.full_name(), "OpenRA/OpenRA-Extras");
        assert!(config.repository(Some(" "), None).is_err());
    }
}
