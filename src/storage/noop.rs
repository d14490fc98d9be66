use async_trait::async_trait;
use serde_json::Value;

use super::StorageBackend;
use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

#[async_trait]
impl StorageBackend for NoopStorage {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn store(&self, _key: &str, _value: &Value, _ttl_seconds: u64) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn retrieve(&self, _key: &str) -> Result<Option<Value>, GatewayError> {
        Ok(None)
    }

    async fn remove(&self, _key: &str) -> Result<(), GatewayError> {
        Ok(())
    }
}
