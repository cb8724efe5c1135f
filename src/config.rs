use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Credentials for the Graph API and the webhook subscription.
/// Always read from the environment, never from the TOML file.
#[derive(Clone)]
pub struct Credentials {
    pub access_token: String,
    pub verify_token: String,
    pub user_id: String,
    pub app_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &preview(&self.access_token))
            .field("verify_token", &preview(&self.verify_token))
            .field("user_id", &self.user_id)
            .field("app_secret", &preview(&self.app_secret))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            access_token: required_env("ACCESS_TOKEN")?,
            verify_token: required_env("VERIFY_TOKEN")?,
            user_id: required_env("USER_ID")?,
            app_secret: required_env("APP_SECRET")?,
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("Missing required environment variable: {}", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("Environment variable {} is set but empty", name);
    }
    Ok(value)
}

fn preview(val: &str) -> String {
    let n = val.chars().take(4).map(char::len_utf8).sum::<usize>();
    format!("{}...({} chars)", &val[..n], val.chars().count())
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphConfig {
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GraphConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IntakeConfig {
    #[serde(default = "default_fetch_on_startup")]
    pub fetch_on_startup: bool,
    /// Six-field cron expression for the periodic mentions pull
    #[serde(default)]
    pub fetch_cron: Option<String>,
}

/// Non-secret tunables, loaded from TOML.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
    #[serde(default = "default_graph_config")]
    pub graph: GraphConfig,
    #[serde(default = "default_storage_config")]
    pub storage: StorageConfig,
    #[serde(default = "default_intake_config")]
    pub intake: IntakeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: default_server_config(),
            graph: default_graph_config(),
            storage: default_storage_config(),
            intake: default_intake_config(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub server: ServerConfig,
    pub graph: GraphConfig,
    pub storage: StorageConfig,
    pub intake: IntakeConfig,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("coupons.csv")
}

fn default_fetch_on_startup() -> bool {
    true
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind: default_bind(),
    }
}

fn default_graph_config() -> GraphConfig {
    GraphConfig {
        base_url: default_graph_base_url(),
        timeout_secs: default_timeout_secs(),
    }
}

fn default_storage_config() -> StorageConfig {
    StorageConfig {
        csv_path: default_csv_path(),
    }
}

fn default_intake_config() -> IntakeConfig {
    IntakeConfig {
        fetch_on_startup: default_fetch_on_startup(),
        fetch_cron: None,
    }
}

impl Settings {
    /// Parse settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "Settings file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        if settings.graph.timeout_secs == 0 {
            anyhow::bail!("graph.timeout_secs must be greater than zero");
        }
        Ok(settings)
    }
}

impl Config {
    /// Build the full configuration: secrets from the environment (a `.env`
    /// file is honoured if present), tunables from the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let credentials = Credentials::from_env()?;
        let settings = Settings::load(path)?;
        Ok(Self::from_parts(credentials, settings))
    }

    pub fn from_parts(credentials: Credentials, settings: Settings) -> Self {
        Self {
            credentials,
            server: settings.server,
            graph: settings.graph,
            storage: settings.storage,
            intake: settings.intake,
        }
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded successfully");
        info!("  Credentials: {:?}", self.credentials);
        info!("  Bind address: {}", self.server.bind);
        info!(
            "  Graph API: {} (timeout {}s)",
            self.graph.base_url, self.graph.timeout_secs
        );
        info!("  Coupon log: {}", self.storage.csv_path.display());
        info!(
            "  Fetch on startup: {}, cron: {}",
            self.intake.fetch_on_startup,
            self.intake.fetch_cron.as_deref().unwrap_or("<none>")
        );
    }
}
