use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub governor: GovernorConfig,
    #[serde(default)]
    pub fanout: FanoutConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Operator surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("folio.db")
}

/// Where the crawl watermark lives.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkBackend {
    #[default]
    File,
    Sqlite,
}

/// Watermark persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatermarkConfig {
    #[serde(default)]
    pub backend: WatermarkBackend,
    /// Directory holding the watermark file (file backend only).
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            backend: WatermarkBackend::default(),
            state_dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

/// Remote catalog API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Locale tried first when picking a display title.
    #[serde(default = "default_locale")]
    pub preferred_locale: String,
    /// Chapter languages requested from the feed endpoint (empty = all).
    #[serde(default = "default_languages")]
    pub translated_languages: Vec<String>,
    #[serde(default = "default_catalog_page_size")]
    pub catalog_page_size: u32,
    #[serde(default = "default_child_page_size")]
    pub child_page_size: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            preferred_locale: default_locale(),
            translated_languages: default_languages(),
            catalog_page_size: default_catalog_page_size(),
            child_page_size: default_child_page_size(),
        }
    }
}

fn default_source_url() -> String {
    "https://api.mangadex.org".to_string()
}

fn default_user_agent() -> String {
    format!("folio/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u32 {
    30
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_catalog_page_size() -> u32 {
    10
}

fn default_child_page_size() -> u32 {
    500
}

/// Match index service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_url")]
    pub base_url: String,
    /// Source name stamped into every submission's metadata.
    #[serde(default = "default_source_name")]
    pub source_name: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: default_index_url(),
            source_name: default_source_name(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_index_url() -> String {
    "http://localhost:8888".to_string()
}

fn default_source_name() -> String {
    "mangadex".to_string()
}

/// Call-count cooldown applied to the crawl walk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GovernorConfig {
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

fn default_threshold() -> u32 {
    10
}

fn default_cooldown_ms() -> u64 {
    60_000
}

/// Fan-out indexing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FanoutConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    5
}

/// Per-job scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Pause between two runs of the job (0 = run back to back).
    #[serde(default)]
    pub delay_ms: u64,
    /// Items requested per run (refresher and reconciliation only).
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl JobConfig {
    fn with_delay(delay_ms: u64) -> Self {
        Self {
            enabled: default_enabled(),
            delay_ms,
            batch_size: default_batch_size(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_batch_size() -> u32 {
    100
}

/// The three scheduled jobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    #[serde(default = "default_crawler_job")]
    pub crawler: JobConfig,
    #[serde(default = "default_refresher_job")]
    pub refresher: JobConfig,
    #[serde(default = "default_reconciliation_job")]
    pub reconciliation: JobConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            crawler: default_crawler_job(),
            refresher: default_refresher_job(),
            reconciliation: default_reconciliation_job(),
        }
    }
}

fn default_crawler_job() -> JobConfig {
    JobConfig::with_delay(0)
}

fn default_refresher_job() -> JobConfig {
    JobConfig::with_delay(60_000) // 1 minute
}

fn default_reconciliation_job() -> JobConfig {
    JobConfig::with_delay(10 * 60_000) // 10 minutes
}

/// Sanitized config for the operator surface
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub watermark: WatermarkConfig,
    pub source_url: String,
    pub index_url: String,
    pub governor: GovernorConfig,
    pub fanout: FanoutConfig,
    pub jobs: JobsConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            watermark: config.watermark.clone(),
            source_url: strip_credentials(&config.source.base_url),
            index_url: strip_credentials(&config.index.base_url),
            governor: config.governor.clone(),
            fanout: config.fanout.clone(),
            jobs: config.jobs.clone(),
        }
    }
}

/// Drop `user:password@` from a URL before showing it.
fn strip_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}{}", &url[..scheme_end + 3], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
