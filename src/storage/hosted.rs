use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::StorageBackend;
use crate::error::GatewayError;

#[derive(Clone)]
pub struct HostedKvStorage {
    client: Client,
    url: String,
    token: String,
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl HostedKvStorage {
    pub fn new(url: &str, token: &str, namespace: &str) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("bgg-gateway/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GatewayError::Storage(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|err| GatewayError::Storage(err.to_string()))?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            namespace: namespace.to_string(),
        })
    }

    pub fn namespaced(&self, key: &str) -> String {
        namespaced_key(&self.namespace, key)
    }

    async fn command(&self, args: Vec<String>) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .map_err(|err| GatewayError::Cache(err.to_string()))?;
        let status = response.status();
        let body: CommandResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::Cache(format!("status {status}: {err}")))?;
        if let Some(error) = body.error {
            return Err(GatewayError::Cache(error));
        }
        Ok(body.result)
    }
}

pub fn namespaced_key(namespace: &str, key: &str) -> String {
    if namespace.is_empty() {
        key.to_string()
    } else {
        format!("{namespace}:{key}")
    }
}

pub fn set_command(key: &str, payload: String, ttl_seconds: u64) -> Vec<String> {
    let mut args = vec!["SET".to_string(), key.to_string(), payload];
    if ttl_seconds > 0 {
        args.push("EX".to_string());
        args.push(ttl_seconds.to_string());
    }
    args
}

#[async_trait]
impl StorageBackend for HostedKvStorage {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn store(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), GatewayError> {
        let payload =
            serde_json::to_string(value).map_err(|err| GatewayError::Cache(err.to_string()))?;
        let key = self.namespaced(key);
        self.command(set_command(&key, payload, ttl_seconds)).await?;
        debug!(key = %key, ttl_seconds, "stored hosted entry");
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Value>, GatewayError> {
        let result = self
            .command(vec!["GET".to_string(), self.namespaced(key)])
            .await?;
        match result {
            Value::Null => Ok(None),
            Value::String(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|err| GatewayError::Cache(err.to_string())),
            other => Err(GatewayError::Cache(format!(
                "unexpected GET result: {other}"
            ))),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), GatewayError> {
        self.command(vec!["DEL".to_string(), self.namespaced(key)])
            .await?;
        Ok(())
    }
}
