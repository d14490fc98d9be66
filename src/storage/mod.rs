use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{StorageKind, StorageSettings};
use crate::error::GatewayError;

pub mod file;
pub mod hosted;
pub mod noop;

pub use file::FileStorage;
pub use hosted::HostedKvStorage;
pub use noop::NoopStorage;

// TTLs are seconds, 0 means no expiry. `remove` is idempotent.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn store(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), GatewayError>;

    async fn retrieve(&self, key: &str) -> Result<Option<Value>, GatewayError>;

    async fn remove(&self, key: &str) -> Result<(), GatewayError>;
}

pub fn build_storage(settings: &StorageSettings) -> Result<Arc<dyn StorageBackend>, GatewayError> {
    match settings.kind {
        StorageKind::None => Ok(Arc::new(NoopStorage)),
        StorageKind::File => {
            let storage = FileStorage::open(settings.path.clone())?;
            Ok(Arc::new(storage))
        }
        StorageKind::Hosted => {
            let url = settings.url.as_deref().ok_or_else(|| {
                GatewayError::Storage("hosted storage requires a url".to_string())
            })?;
            let token = settings.token.as_deref().ok_or_else(|| {
                GatewayError::Storage("hosted storage requires a token".to_string())
            })?;
            let storage = HostedKvStorage::new(url, token, &settings.namespace)?;
            Ok(Arc::new(storage))
        }
    }
}
