use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub aml: AmlConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self> {
        let configured_path = std::env::var("COMPLIANCE_API_CONFIG")
            .unwrap_or_else(|_| "config/compliance.toml".to_string());
        assert!(
            !configured_path.is_empty(),
            "Configuration path must be non-empty"
        );

        let mut builder = Config::builder()
            .add_source(File::new(&configured_path, FileFormat::Toml).required(true));

        if let Ok(env_override) = std::env::var("COMPLIANCE_API_ENV") {
            if !env_override.is_empty() {
                let env_file = format!("config/compliance.{}.toml", env_override);
                if Path::new(&env_file).exists() {
                    builder = builder.add_source(File::new(&env_file, FileFormat::Toml));
                }
            }
        }

        // COMPLIANCE__DATABASE__URL=... overrides database.url
        builder = builder.add_source(
            Environment::with_prefix("COMPLIANCE")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("workflow.allowed_networks")
                .with_list_parse_key("workflow.allowed_assets")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, &configured_path))?;
        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize API configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            bail!("Database URL must be specified");
        }
        if self.server.port == 0 {
            bail!("Server port must be greater than zero");
        }
        if self.database.max_connections < self.database.min_connections.unwrap_or(1) {
            bail!("Max connections must be >= min connections");
        }
        if self.database.max_connections > 128 {
            bail!("Connection pool oversized");
        }
        self.aml.ensure_bounds()?;
        self.workflow.ensure_bounds()?;
        self.cache.ensure_bounds()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(self.port != 0, "HTTP port cannot be zero");
        SocketAddr::new(host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AmlProviderKind {
    #[default]
    Mock,
    Http,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AmlConfig {
    #[serde(default)]
    pub provider: AmlProviderKind,
    pub http: Option<AmlHttpConfig>,
}

impl AmlConfig {
    fn ensure_bounds(&self) -> Result<()> {
        match (self.provider, &self.http) {
            (AmlProviderKind::Http, None) => {
                bail!("aml.http must be configured when aml.provider = \"http\"")
            }
            (_, Some(http)) => http.ensure_bounds(),
            (AmlProviderKind::Mock, None) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmlHttpConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
    #[serde(default = "AmlHttpConfig::default_check_path")]
    pub check_path: String,
}

impl AmlHttpConfig {
    pub fn timeout(&self) -> Duration {
        let millis = self.timeout_ms.unwrap_or(20_000);
        assert!(millis >= 100, "AML timeout must be at least 100ms");
        assert!(millis <= 120_000, "AML timeout cannot exceed two minutes");
        Duration::from_millis(millis)
    }

    /// Full URL of the check endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.check_path)
    }

    fn ensure_bounds(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!("aml.http.base_url must be an http(s) URL");
        }
        if !self.check_path.starts_with('/') {
            bail!("aml.http.check_path must start with '/'");
        }
        if let Some(millis) = self.timeout_ms {
            if !(100..=120_000).contains(&millis) {
                bail!("aml.http.timeout_ms must be within 100..=120000");
            }
        }
        Ok(())
    }

    fn default_check_path() -> String {
        "/check".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "WorkflowConfig::default_prefix")]
    pub request_no_prefix: String,
    #[serde(default = "WorkflowConfig::default_networks")]
    pub allowed_networks: Vec<String>,
    #[serde(default = "WorkflowConfig::default_assets")]
    pub allowed_assets: Vec<String>,
}

impl WorkflowConfig {
    fn ensure_bounds(&self) -> Result<()> {
        let prefix = self.request_no_prefix.trim();
        if prefix.is_empty() || prefix.len() > 12 {
            bail!("workflow.request_no_prefix must be 1..=12 characters");
        }
        if !prefix.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            bail!("workflow.request_no_prefix must be alphanumeric");
        }
        if self.allowed_networks.is_empty() {
            bail!("workflow.allowed_networks cannot be empty");
        }
        if self.allowed_assets.is_empty() {
            bail!("workflow.allowed_assets cannot be empty");
        }
        Ok(())
    }

    fn default_prefix() -> String {
        "PAY".to_string()
    }

    fn default_networks() -> Vec<String> {
        vec!["TRON".to_string()]
    }

    fn default_assets() -> Vec<String> {
        vec!["USDT".to_string()]
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            request_no_prefix: Self::default_prefix(),
            allowed_networks: Self::default_networks(),
            allowed_assets: Self::default_assets(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Trust `X-Actor-Id` / `X-Actor-Role` when no Telegram id is sent.
    #[serde(default = "AuthConfig::default_allow_header_actor")]
    pub allow_header_actor: bool,
}

impl AuthConfig {
    const fn default_allow_header_actor() -> bool {
        true
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_header_actor: Self::default_allow_header_actor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub wallet_checks_max_capacity: u64,
    pub wallet_checks_ttl_seconds: u64,
}

impl CacheConfig {
    fn ensure_bounds(&self) -> Result<()> {
        if self.wallet_checks_max_capacity < 100 {
            bail!("Wallet check cache capacity must be at least 100");
        }
        if self.wallet_checks_ttl_seconds == 0 || self.wallet_checks_ttl_seconds > 86_400 {
            bail!("Wallet check cache TTL must be within one day");
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            wallet_checks_max_capacity: 10_000,
            wallet_checks_ttl_seconds: 3_600,
        }
    }
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}
