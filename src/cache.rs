use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::{CollectionSubtype, PlaysQuery, ThingType};
use crate::error::GatewayError;
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Thing,
    User,
    Collection,
    Plays,
    Geeklist,
    Geeklists,
    HotItems,
    Search,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Thing,
        EntityKind::User,
        EntityKind::Collection,
        EntityKind::Plays,
        EntityKind::Geeklist,
        EntityKind::Geeklists,
        EntityKind::HotItems,
        EntityKind::Search,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTtl {
    pub l1: Duration,
    pub l2: Duration,
}

impl EntityTtl {
    pub const fn from_secs(l1: u64, l2: u64) -> Self {
        Self {
            l1: Duration::from_secs(l1),
            l2: Duration::from_secs(l2),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TtlPolicy {
    overrides: HashMap<EntityKind, EntityTtl>,
}

impl TtlPolicy {
    pub fn default_for(kind: EntityKind) -> EntityTtl {
        match kind {
            EntityKind::Thing => EntityTtl::from_secs(300, 604_800),
            EntityKind::User => EntityTtl::from_secs(3600, 86_400),
            EntityKind::Collection => EntityTtl::from_secs(1800, 3600),
            EntityKind::Plays => EntityTtl::from_secs(900, 1800),
            EntityKind::Geeklist => EntityTtl::from_secs(3600, 86_400),
            EntityKind::Geeklists => EntityTtl::from_secs(1800, 3600),
            EntityKind::HotItems => EntityTtl::from_secs(1800, 3600),
            EntityKind::Search => EntityTtl::from_secs(1800, 3600),
        }
    }

    pub fn with_override(mut self, kind: EntityKind, ttl: EntityTtl) -> Self {
        self.overrides.insert(kind, ttl);
        self
    }

    pub fn ttl(&self, kind: EntityKind) -> EntityTtl {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| Self::default_for(kind))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: EntityKind,
    pub key: String,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    query: &'a str,
    thing_type: Option<ThingType>,
    exact: bool,
}

pub fn stable_hash<T: Serialize>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    let mut encoded = hex::encode(digest);
    encoded.truncate(16);
    encoded
}

fn user_segment(username: &str) -> String {
    username.trim().to_lowercase()
}

impl CacheKey {
    fn new(kind: EntityKind, key: String) -> Self {
        Self { kind, key }
    }

    pub fn thing(id: &str) -> Self {
        Self::new(EntityKind::Thing, format!("thing:{}", id.trim()))
    }

    pub fn things(ids: &[String]) -> Self {
        let joined = ids
            .iter()
            .map(|id| id.trim())
            .collect::<Vec<_>>()
            .join(",");
        Self::new(EntityKind::Thing, format!("things:{joined}"))
    }

    pub fn search(query: &str, thing_type: Option<ThingType>, exact: bool) -> Self {
        let params = SearchParams {
            query,
            thing_type,
            exact,
        };
        Self::new(EntityKind::Search, format!("search:{}", stable_hash(&params)))
    }

    pub fn user(username: &str) -> Self {
        Self::new(EntityKind::User, format!("user:{}", user_segment(username)))
    }

    pub fn collection(username: &str, subtype: Option<CollectionSubtype>) -> Self {
        let subtype = subtype
            .map(|subtype| subtype.as_upstream().to_string())
            .unwrap_or_else(|| "all".to_string());
        Self::new(
            EntityKind::Collection,
            format!("collection:{}:{subtype}", user_segment(username)),
        )
    }

    pub fn plays(username: &str, query: &PlaysQuery) -> Self {
        // Upstream serves page 1 when the page is omitted.
        let query = PlaysQuery {
            page: Some(query.page.unwrap_or(1).max(1)),
            ..query.clone()
        };
        Self::new(
            EntityKind::Plays,
            format!("plays:{}:{}", user_segment(username), stable_hash(&query)),
        )
    }

    pub fn geeklist(id: &str) -> Self {
        Self::new(EntityKind::Geeklist, format!("geeklist:{}", id.trim()))
    }

    pub fn geeklists(username: &str, page: u32) -> Self {
        Self::new(
            EntityKind::Geeklists,
            format!("geeklists:{}:{page}", user_segment(username)),
        )
    }

    pub fn hot_items(item_type: Option<&str>) -> Self {
        let item_type = item_type
            .map(|value| value.trim().to_lowercase())
            .unwrap_or_else(|| "all".to_string());
        Self::new(EntityKind::HotItems, format!("hot:{item_type}"))
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    created_at: Instant,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at
            .map(|expires_at| now >= expires_at)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.payload.clone()),
                Some(_) => {}
            }
        }
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .map(|entry| entry.is_expired(now))
            .unwrap_or(false)
        {
            entries.remove(key);
        }
        None
    }

    pub async fn age(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| now.saturating_duration_since(entry.created_at))
    }

    // Zero, or a TTL past the clock's range, never expires.
    pub async fn set(&self, key: &str, payload: Value, ttl: Option<Duration>) {
        let now = Instant::now();
        let entry = CacheEntry {
            payload,
            created_at: now,
            expires_at: ttl
                .filter(|ttl| !ttl.is_zero())
                .and_then(|ttl| now.checked_add(ttl)),
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    // Expired entries included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = self.purge_expired().await;
                if purged > 0 {
                    debug!(purged, "swept expired L1 entries");
                }
            }
        })
    }
}

pub struct CacheLayer {
    memory: Arc<MemoryCache>,
    storage: Arc<dyn StorageBackend>,
    ttl: TtlPolicy,
}

impl CacheLayer {
    pub fn new(storage: Arc<dyn StorageBackend>, ttl: TtlPolicy) -> Self {
        Self {
            memory: Arc::new(MemoryCache::new()),
            storage,
            ttl,
        }
    }

    pub fn memory(&self) -> &Arc<MemoryCache> {
        &self.memory
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if let Some(payload) = self.memory.get(&key.key).await {
            match serde_json::from_value(payload) {
                Ok(value) => {
                    debug!(key = %key.key, tier = "l1", "cache hit");
                    return Some(value);
                }
                Err(err) => {
                    warn!(key = %key.key, error = %err, "discarding undecodable L1 entry");
                    self.memory.remove(&key.key).await;
                }
            }
        }

        let payload = match self.storage.retrieve(&key.key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(key = %key.key, "cache miss");
                return None;
            }
            Err(err) => {
                warn!(
                    key = %key.key,
                    backend = self.storage.name(),
                    error = %err,
                    "L2 lookup failed, treating as miss"
                );
                return None;
            }
        };

        match serde_json::from_value::<T>(payload.clone()) {
            Ok(value) => {
                debug!(key = %key.key, tier = "l2", "cache hit");
                let ttl = self.ttl.ttl(key.kind);
                self.memory.set(&key.key, payload, Some(ttl.l1)).await;
                Some(value)
            }
            Err(err) => {
                warn!(key = %key.key, error = %err, "undecodable L2 entry, treating as miss");
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let payload = match serde_json::to_value(value) {
            Ok(Value::Null) => return,
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %key.key, error = %err, "failed to serialize cache entry");
                return;
            }
        };
        let ttl = self.ttl.ttl(key.kind);
        if let Err(err) = self
            .storage
            .store(&key.key, &payload, ttl.l2.as_secs())
            .await
        {
            warn!(
                key = %key.key,
                backend = self.storage.name(),
                error = %err,
                "L2 write failed"
            );
        }
        self.memory.set(&key.key, payload, Some(ttl.l1)).await;
    }

    pub async fn remove(&self, key: &str) {
        self.memory.remove(key).await;
        if let Err(err) = self.storage.remove(key).await {
            warn!(key, backend = self.storage.name(), error = %err, "L2 remove failed");
        }
    }

    pub async fn get_or_fetch<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T, GatewayError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }
        let value = fetch().await?;
        self.put(key, &value).await;
        Ok(value)
    }
}
