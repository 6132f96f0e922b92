// src/core/config_manager.rs
//! Configuration loading: optional `config.yaml` with per-environment sections,
//! overridden by environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::sections::SectionPolicy;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ADDRESS: &str = "0.0.0.0";
const DEFAULT_DATABASE_PATH: &str = "data/leadlens.db";
const DEFAULT_ANALYSIS_API_URL: &str = "http://127.0.0.1:5555/api/v1/analyze-profile";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TRIAL_CREDITS: i64 = 3;

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: EnvironmentConfig,
    pub service: ServiceConfig,
    pub auth: AuthSettings,
    pub credits: CreditSettings,
    pub section_policy: SectionPolicy,
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub database_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub analysis_api_url: String,
    pub analysis_api_key: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub audience: Option<String>,
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CreditSettings {
    pub trial_credits: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    address: Option<String>,
    port: Option<u16>,
    database_path: Option<PathBuf>,
    analysis_api_url: Option<String>,
    analysis_api_key: Option<String>,
    analysis_timeout_seconds: Option<u64>,
    jwt_secret: Option<String>,
    jwt_audience: Option<String>,
    admin_emails: Vec<String>,
    trial_credits: Option<i64>,
    section_policy: Option<SectionPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    local: FileConfig,
    production: FileConfig,
}

impl ConfigManager {
    /// Load configuration from `LEADLENS_CONFIG` (or `config.yaml`) and the process environment
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("LEADLENS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let file_content = if config_path.exists() {
            info!("Loading configuration file: {}", config_path.display());
            Some(
                std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read {}", config_path.display()))?,
            )
        } else {
            info!(
                "No configuration file at {}, using defaults and environment",
                config_path.display()
            );
            None
        };

        let base_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::from_sources(file_content.as_deref(), |key| std::env::var(key).ok(), &base_dir)
    }

    /// Build configuration from raw YAML content and an environment lookup
    pub fn from_sources<F>(file_content: Option<&str>, env: F, base_dir: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment_name = env("ENVIRONMENT")
            .or_else(|| env("ENV"))
            .unwrap_or_else(|| "local".to_string());

        let file: ConfigFile = match file_content {
            Some(content) => {
                serde_yaml::from_str(content).context("Failed to parse configuration file")?
            }
            None => ConfigFile::default(),
        };

        let selected = match environment_name.as_str() {
            "production" => file.production,
            _ => file.local,
        };

        let port = match env("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number"))?,
            None => selected.port.unwrap_or(DEFAULT_PORT),
        };

        let database_path = env("DATABASE_PATH")
            .map(PathBuf::from)
            .or(selected.database_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let timeout_seconds = match env("ANALYSIS_TIMEOUT_SECONDS") {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("ANALYSIS_TIMEOUT_SECONDS must be a number"))?,
            None => selected
                .analysis_timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        let trial_credits = match env("TRIAL_CREDITS") {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| anyhow::anyhow!("TRIAL_CREDITS must be a number"))?,
            None => selected.trial_credits.unwrap_or(DEFAULT_TRIAL_CREDITS),
        };
        if trial_credits < 0 {
            anyhow::bail!("Trial credits cannot be negative: {}", trial_credits);
        }

        let section_policy = match env("SECTION_POLICY") {
            Some(value) => value.parse::<SectionPolicy>()?,
            None => selected.section_policy.unwrap_or_default(),
        };

        let mut admin_emails = selected.admin_emails;
        if let Some(extra) = env("ADMIN_EMAILS") {
            admin_emails.extend(
                extra
                    .split(',')
                    .map(|email| email.trim().to_string())
                    .filter(|email| !email.is_empty()),
            );
        }

        Ok(Self {
            environment: EnvironmentConfig {
                name: environment_name,
                address: env("ADDRESS")
                    .or(selected.address)
                    .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
                port,
                database_path: resolve_path(&database_path, base_dir),
            },
            service: ServiceConfig {
                analysis_api_url: env("ANALYSIS_API_URL")
                    .or(selected.analysis_api_url)
                    .unwrap_or_else(|| DEFAULT_ANALYSIS_API_URL.to_string()),
                analysis_api_key: env("ANALYSIS_API_KEY").or(selected.analysis_api_key),
                timeout_seconds,
            },
            auth: AuthSettings {
                jwt_secret: env("JWT_SECRET").or(selected.jwt_secret),
                audience: env("JWT_AUDIENCE").or(selected.jwt_audience),
                admin_emails,
            },
            credits: CreditSettings { trial_credits },
            section_policy,
        })
    }

    /// The server refuses to start without a token secret
    pub fn require_jwt_secret(&self) -> Result<&str> {
        self.auth
            .jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("JWT_SECRET is not configured. Server cannot verify sessions.")
            })
    }

    /// Ensure the database directory exists
    pub async fn ensure_directories(&self) -> Result<()> {
        if let Some(db_parent) = self.environment.database_path.parent() {
            tokio::fs::create_dir_all(db_parent)
                .await
                .with_context(|| {
                    format!(
                        "Failed to create database directory: {}",
                        db_parent.display()
                    )
                })?;
        }
        Ok(())
    }
}

fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
