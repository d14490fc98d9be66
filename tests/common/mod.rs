#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use bgg_gateway::cache::{CacheLayer, TtlPolicy};
use bgg_gateway::error::GatewayError;
use bgg_gateway::fetcher::{
    Fetcher, RetryPolicy, Transport, TransportError, TransportErrorKind, TransportResponse,
};
use bgg_gateway::storage::StorageBackend;

pub const BASE_URL: &str = "https://bgg.test/xmlapi2";

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("fixture {path}: {err}"))
}

#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Status(u16),
    Fail(TransportErrorKind),
    Hang,
}

impl Reply {
    pub fn fixture(name: &str) -> Self {
        Reply::Body(fixture(name))
    }
}

struct Route {
    needle: String,
    replies: VecDeque<Reply>,
    last: Option<Reply>,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub at: Instant,
}

/// Upstream stand-in. Each route answers URLs containing its needle with the
/// scripted replies in order, repeating the last one once the script runs out.
/// Routes are matched in registration order; unmatched URLs get a 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, needle: &str, replies: Vec<Reply>) -> Self {
        self.routes.lock().unwrap().push(Route {
            needle: needle.to_string(),
            replies: replies.into(),
            last: None,
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.url).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes.iter_mut().find(|route| url.contains(&route.needle)) else {
            return Reply::Status(404);
        };
        match route.replies.pop_front() {
            Some(reply) => {
                route.last = Some(reply.clone());
                reply
            }
            None => route.last.clone().unwrap_or(Reply::Status(404)),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            at: Instant::now(),
        });
        match self.next_reply(url) {
            Reply::Body(body) => Ok(TransportResponse { status: 200, body }),
            Reply::Status(status) => Ok(TransportResponse {
                status,
                body: String::new(),
            }),
            Reply::Fail(kind) => Err(TransportError::new(kind, "mock transport failure")),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub fn fetcher(transport: &MockTransport) -> Fetcher {
    Fetcher::new(Box::new(transport.clone()), BASE_URL, RetryPolicy::default())
}

pub fn cache_with(storage: Arc<dyn StorageBackend>) -> CacheLayer {
    CacheLayer::new(storage, TtlPolicy::default())
}

/// A backend whose every operation fails, counting the attempts.
#[derive(Default)]
pub struct FailingStorage {
    pub calls: AtomicUsize,
}

impl FailingStorage {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> GatewayError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        GatewayError::Cache("backend unreachable".to_string())
    }
}

#[async_trait]
impl StorageBackend for FailingStorage {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn store(
        &self,
        _key: &str,
        _value: &Value,
        _ttl_seconds: u64,
    ) -> Result<(), GatewayError> {
        Err(self.fail())
    }

    async fn retrieve(&self, _key: &str) -> Result<Option<Value>, GatewayError> {
        Err(self.fail())
    }

    async fn remove(&self, _key: &str) -> Result<(), GatewayError> {
        Err(self.fail())
    }
}

/// In-memory backend that records the TTL passed with each write.
#[derive(Default)]
pub struct RecordingStorage {
    pub entries: Mutex<Vec<(String, Value, u64)>>,
}

impl RecordingStorage {
    pub fn writes(&self) -> Vec<(String, Value, u64)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageBackend for RecordingStorage {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn store(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), GatewayError> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|(existing, _, _)| existing != key);
        entries.push((key.to_string(), value.clone(), ttl_seconds));
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Value>, GatewayError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|(existing, _, _)| existing == key)
            .map(|(_, value, _)| value.clone()))
    }

    async fn remove(&self, key: &str) -> Result<(), GatewayError> {
        self.entries
            .lock()
            .unwrap()
            .retain(|(existing, _, _)| existing != key);
        Ok(())
    }
}
