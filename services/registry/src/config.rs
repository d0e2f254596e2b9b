use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::store::StoreConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogBackend {
    Memory,
    File,
}

impl std::str::FromStr for LogBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "memory" => Ok(LogBackend::Memory),
            "file" => Ok(LogBackend::File),
            other => anyhow::bail!("unknown log backend `{other}` (expected memory or file)"),
        }
    }
}

// Registry service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub metrics_bind: SocketAddr,
    pub log_backend: LogBackend,
    pub log_path: PathBuf,
    pub changes_limit: u64,
    pub change_retention: Option<u64>,
    pub replay_batch: usize,
}

#[derive(Debug, Deserialize)]
struct RegistryConfigOverride {
    metrics_bind: Option<String>,
    log_backend: Option<LogBackend>,
    log_path: Option<PathBuf>,
    changes_limit: Option<u64>,
    change_retention: Option<u64>,
    replay_batch: Option<usize>,
}

impl RegistryConfig {
    pub fn from_env() -> Result<Self> {
        let metrics_bind = std::env::var("REGISTRY_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse REGISTRY_METRICS_BIND")?;
        let log_backend = std::env::var("REGISTRY_LOG_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()
            .with_context(|| "parse REGISTRY_LOG_BACKEND")?;
        let log_path = std::env::var("REGISTRY_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/registry.log"));
        let changes_limit = std::env::var("REGISTRY_CHANGES_LIMIT")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .with_context(|| "parse REGISTRY_CHANGES_LIMIT")?;
        let change_retention = match std::env::var("REGISTRY_CHANGE_RETENTION") {
            Ok(value) => Some(
                value
                    .parse()
                    .with_context(|| "parse REGISTRY_CHANGE_RETENTION")?,
            ),
            Err(_) => Some(10_000),
        };
        let replay_batch = std::env::var("REGISTRY_REPLAY_BATCH")
            .unwrap_or_else(|_| "1024".to_string())
            .parse()
            .with_context(|| "parse REGISTRY_REPLAY_BATCH")?;
        Ok(Self {
            metrics_bind,
            log_backend,
            log_path,
            changes_limit,
            change_retention,
            replay_batch,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("REGISTRY_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read REGISTRY_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: RegistryConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse registry config yaml")?;
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.log_backend {
            self.log_backend = value;
        }
        if let Some(value) = override_cfg.log_path {
            self.log_path = value;
        }
        if let Some(value) = override_cfg.changes_limit {
            self.changes_limit = value;
        }
        if let Some(value) = override_cfg.change_retention {
            self.change_retention = Some(value);
        }
        if let Some(value) = override_cfg.replay_batch {
            self.replay_batch = value;
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            changes_limit: self.changes_limit,
            change_retention: self.change_retention,
            replay_batch: self.replay_batch,
        }
    }
}
