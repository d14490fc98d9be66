use std::collections::BTreeMap;
use std::fs;
use std::io::Write;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::Builder;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::StorageBackend;
use crate::error::GatewayError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub data: Value,
    // Unix seconds; `None` never expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl StoredRecord {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|expires_at| now.timestamp() >= expires_at)
            .unwrap_or(false)
    }
}

pub struct FileStorage {
    path: Utf8PathBuf,
    records: Mutex<BTreeMap<String, StoredRecord>>,
}

impl FileStorage {
    pub fn open(path: Utf8PathBuf) -> Result<Self, GatewayError> {
        let records = if path.as_std_path().exists() {
            let content = fs::read_to_string(path.as_std_path())
                .map_err(|err| GatewayError::Storage(err.to_string()))?;
            match serde_json::from_str::<BTreeMap<String, StoredRecord>>(&content) {
                Ok(records) => records,
                Err(err) => {
                    warn!(path = %path, error = %err, "unreadable cache snapshot, starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            let empty = BTreeMap::new();
            write_snapshot(&path, &empty).map_err(|err| GatewayError::Storage(err.to_string()))?;
            info!(path = %path, "created cache snapshot");
            empty
        };

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    async fn persist(&self, records: &BTreeMap<String, StoredRecord>) -> Result<(), GatewayError> {
        let path = self.path.clone();
        let snapshot = records.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&path, &snapshot))
            .await
            .map_err(|err| GatewayError::Cache(err.to_string()))?
            .map_err(|err| {
                warn!(path = %self.path, error = %err, "failed to persist cache snapshot");
                err
            })
    }
}

fn write_snapshot(
    path: &Utf8Path,
    records: &BTreeMap<String, StoredRecord>,
) -> Result<(), GatewayError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path()).map_err(|err| GatewayError::Cache(err.to_string()))?;
    let content =
        serde_json::to_vec_pretty(records).map_err(|err| GatewayError::Cache(err.to_string()))?;
    let mut temp = Builder::new()
        .prefix("bgg-gateway-cache")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| GatewayError::Cache(err.to_string()))?;
    temp.write_all(&content)
        .map_err(|err| GatewayError::Cache(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| GatewayError::Cache(err.to_string()))?;
    Ok(())
}

#[async_trait]
impl StorageBackend for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn store(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), GatewayError> {
        let now = Utc::now();
        let expires_at = if ttl_seconds > 0 {
            let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
            Some(now.timestamp().saturating_add(ttl))
        } else {
            None
        };
        let mut records = self.records.lock().await;
        records.insert(
            key.to_string(),
            StoredRecord {
                data: value.clone(),
                expires_at,
                created_at: now,
            },
        );
        self.persist(&records).await?;
        debug!(key, "stored snapshot entry");
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Value>, GatewayError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.get(key) else {
            return Ok(None);
        };
        if !record.is_expired(Utc::now()) {
            return Ok(Some(record.data.clone()));
        }
        records.remove(key);
        self.persist(&records).await?;
        Ok(None)
    }

    async fn remove(&self, key: &str) -> Result<(), GatewayError> {
        let mut records = self.records.lock().await;
        if records.remove(key).is_some() {
            self.persist(&records).await?;
        }
        Ok(())
    }
}
