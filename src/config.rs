//! # Configuration
//!
//! Layered configuration: built-in defaults, an optional TOML file and
//! `SCHOLAR_`-prefixed environment variables (`SCHOLAR_HTTP__MAX_RETRIES=5`).

use crate::retriever::ArticlesOrder;
use crate::{Error, Result};
use ::config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Largest page size the upstream article listing honours
pub const MAX_ARTICLE_PAGE_SIZE: u32 = 100;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scholar: ScholarConfig,
    pub http: HttpConfig,
    pub articles: ArticlesConfig,
    pub politeness: PolitenessConfig,
}

/// Upstream site settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScholarConfig {
    /// Scheme and host used to absolutize extracted links
    pub base_url: String,
    /// Path of the profile/citations endpoint
    pub citations_path: String,
    /// Default interface language (`hl` parameter)
    pub language: String,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: "https://scholar.google.com".to_string(),
            citations_path: "/citations".to_string(),
            language: "en".to_string(),
        }
    }
}

impl ScholarConfig {
    /// Parsed base URL
    pub fn base(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// Full endpoint URL for every retriever request
    pub fn endpoint(&self) -> Result<Url> {
        Ok(self.base()?.join(&self.citations_path)?)
    }
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_redirects: usize,
    /// Attempts per logical page fetch, including the first one
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub proxy: Option<String>,
    /// Pick a random browser header template on every attempt
    pub rotate_headers: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            proxy: None,
            rotate_headers: true,
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub const fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Article collection defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticlesConfig {
    pub page_size: u32,
    pub sort_by: ArticlesOrder,
}

impl Default for ArticlesConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_ARTICLE_PAGE_SIZE,
            sort_by: ArticlesOrder::CitedBy,
        }
    }
}

/// Caller-side pacing between consecutive fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolitenessConfig {
    pub delay_ms: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

impl PolitenessConfig {
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Command-line overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub language: Option<String>,
    pub proxy: Option<String>,
    pub max_retries: Option<u32>,
    pub delay_ms: Option<u64>,
}

impl Config {
    /// Default location of the configuration file
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scholar-retriever").join("config.toml"))
    }

    /// Load defaults, then the file (explicit or default location), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Self::default())?;
        let mut builder = ::config::Config::builder().add_source(defaults);

        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    debug!("Looking for configuration at {}", default_path.display());
                    builder = builder.add_source(
                        File::from(default_path)
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix("SCHOLAR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file only (no environment layer)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?)
            .add_source(File::from_str(&content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref base_url) = overrides.base_url {
            self.scholar.base_url.clone_from(base_url);
        }
        if let Some(ref language) = overrides.language {
            self.scholar.language.clone_from(language);
        }
        if overrides.proxy.is_some() {
            self.http.proxy.clone_from(&overrides.proxy);
        }
        if let Some(max_retries) = overrides.max_retries {
            self.http.max_retries = max_retries;
        }
        if let Some(delay_ms) = overrides.delay_ms {
            self.politeness.delay_ms = delay_ms;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scholar.base_url.trim().is_empty() {
            return Err(invalid("scholar.base_url", "base URL cannot be empty"));
        }
        self.scholar
            .endpoint()
            .map_err(|e| invalid("scholar.base_url", &e.to_string()))?;

        if self.scholar.language.trim().is_empty() {
            return Err(invalid("scholar.language", "language cannot be empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(invalid("http.timeout_secs", "timeout must be greater than 0"));
        }
        if self.http.max_retries == 0 {
            return Err(invalid(
                "http.max_retries",
                "at least one attempt per page is required",
            ));
        }
        if self.articles.page_size == 0 || self.articles.page_size > MAX_ARTICLE_PAGE_SIZE {
            return Err(invalid(
                "articles.page_size",
                &format!("page size must be between 1 and {MAX_ARTICLE_PAGE_SIZE}"),
            ));
        }
        if let Some(ref proxy) = self.http.proxy {
            Url::parse(proxy).map_err(|e| invalid("http.proxy", &e.to_string()))?;
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
