use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::ValueEnum;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::cache::{EntityKind, EntityTtl, TtlPolicy};
use crate::error::GatewayError;
use crate::fetcher::{DEFAULT_BASE_URL, RetryPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "bgg-gateway.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub ttl: HashMap<EntityKind, TtlOverride>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpstreamSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub min_spacing_ms: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub retry_delays_ms: Option<Vec<u64>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StorageSection {
    #[serde(default)]
    pub backend: Option<StorageKind>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct TtlOverride {
    #[serde(default)]
    pub l1_secs: Option<u64>,
    #[serde(default)]
    pub l2_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    None,
    File,
    Hosted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub kind: StorageKind,
    pub path: Utf8PathBuf,
    pub url: Option<String>,
    pub token: Option<String>,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_url: String,
    pub retry: RetryPolicy,
    pub storage: StorageSettings,
    pub ttl: TtlPolicy,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, GatewayError> {
        let mut config = Self::read(path)?;
        Self::apply_env(&mut config, |name| std::env::var(name).ok());
        Self::resolve_config(config)
    }

    pub fn read(path: Option<&str>) -> Result<GatewayConfig, GatewayError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(GatewayConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| GatewayError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| GatewayError::ConfigParse(err.to_string()))
    }

    pub fn apply_env<F>(config: &mut GatewayConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        if let Some(base_url) = var("BGG_GATEWAY_BASE_URL") {
            config.upstream.base_url = Some(base_url);
        }
        if let Some(backend) = var("BGG_GATEWAY_STORAGE") {
            match StorageKind::from_str(&backend, true) {
                Ok(kind) => config.storage.backend = Some(kind),
                Err(_) => tracing::warn!(backend, "ignoring unknown BGG_GATEWAY_STORAGE"),
            }
        }
        if let Some(url) = var("BGG_GATEWAY_KV_URL") {
            config.storage.url = Some(url);
        }
        if let Some(token) = var("BGG_GATEWAY_KV_TOKEN") {
            config.storage.token = Some(token);
        }
    }

    pub fn resolve_config(config: GatewayConfig) -> Result<ResolvedConfig, GatewayError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let defaults = RetryPolicy::default();

        let base_url = config
            .upstream
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(GatewayError::ConfigParse(format!(
                "upstream.base_url must be an http(s) URL: {base_url}"
            )));
        }

        let retry = RetryPolicy {
            min_spacing: config
                .upstream
                .min_spacing_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.min_spacing),
            request_timeout: config
                .upstream
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            retry_delays: config
                .upstream
                .retry_delays_ms
                .map(|delays| delays.into_iter().map(Duration::from_millis).collect())
                .unwrap_or(defaults.retry_delays),
        };

        let storage = StorageSettings {
            kind: config.storage.backend.unwrap_or_default(),
            path: config
                .storage
                .path
                .map(Utf8PathBuf::from)
                .unwrap_or_else(default_cache_path),
            url: config.storage.url,
            token: config.storage.token,
            namespace: config
                .storage
                .namespace
                .unwrap_or_else(|| "bgg-gateway".to_string()),
        };

        let mut ttl = TtlPolicy::default();
        for (kind, ttl_override) in config.ttl {
            let base = TtlPolicy::default_for(kind);
            ttl = ttl.with_override(
                kind,
                EntityTtl {
                    l1: ttl_override
                        .l1_secs
                        .map(Duration::from_secs)
                        .unwrap_or(base.l1),
                    l2: ttl_override
                        .l2_secs
                        .map(Duration::from_secs)
                        .unwrap_or(base.l2),
                },
            );
        }

        Ok(ResolvedConfig {
            schema_version,
            base_url,
            retry,
            storage,
            ttl,
        })
    }
}

pub fn default_cache_path() -> Utf8PathBuf {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(
                dirs.home_dir()
                    .join(".cache")
                    .join("bgg-gateway")
                    .join("cache.json"),
            )
            .ok()
        })
        .unwrap_or_else(|| Utf8PathBuf::from("bgg-gateway-cache.json"))
}
