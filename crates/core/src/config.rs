use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "/etc/github/private-key.pem";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_API_VERSION: &str = "2022-11-28";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { port: DEFAULT_PORT } }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Required; there is no sensible default for the app identifier.
    pub app_id: Option<u64>,
    pub private_key_path: PathBuf,
    pub api_url: Url,
    pub api_version: String,
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key_path: PathBuf::from(DEFAULT_PRIVATE_KEY_PATH),
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load the configuration from the process environment, optionally layered
    /// over the YAML file named by `CONFIG_FILE`.
    pub fn from_env() -> Result<Self> { Self::from_lookup(|key| std::env::var(key).ok()) }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup("CONFIG_FILE").filter(|s| !s.trim().is_empty()) {
            Some(path) => Self::from_file(Path::new(path.trim()))?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        if let Some(port) = var("PORT") {
            self.server.port =
                port.trim().parse().with_context(|| format!("Invalid PORT: {port}"))?;
        }
        if let Some(app_id) = var("GITHUB_APP_ID") {
            self.github.app_id = Some(
                app_id.trim().parse().with_context(|| format!("Invalid GITHUB_APP_ID: {app_id}"))?,
            );
        }
        if let Some(path) = var("GITHUB_APP_PRIVATE_KEY_PATH") {
            self.github.private_key_path = PathBuf::from(path.trim());
        }
        if let Some(url) = var("GITHUB_API_URL") {
            self.github.api_url =
                Url::parse(url.trim()).with_context(|| format!("Invalid GITHUB_API_URL: {url}"))?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = Some(level.trim().to_string());
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        match self.github.app_id {
            None => bail!("GITHUB_APP_ID environment variable is required"),
            Some(0) => bail!("Invalid GITHUB_APP_ID: must be a positive integer"),
            Some(_) => {}
        }
        if self.github.timeout_secs == 0 {
            bail!("Invalid GitHub timeout_secs: must be a positive integer");
        }
        if self.github.api_url.cannot_be_a_base() {
            return Err(anyhow!("Invalid GitHub API URL: {}", self.github.api_url));
        }
        Ok(())
    }

    /// The configured application identifier. Only valid after [`Config::from_lookup`].
    pub fn app_id(&self) -> u64 { self.github.app_id.unwrap_or_default() }

    pub fn debug_logging(&self) -> bool {
        self.log_level.as_deref().is_some_and(|l| l.eq_ignore_ascii_case("debug"))
    }
}
