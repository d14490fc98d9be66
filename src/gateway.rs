use std::sync::Arc;

use tracing::info;
use url::form_urlencoded::{Serializer, byte_serialize};

use crate::cache::{CacheKey, CacheLayer};
use crate::collection::CollectionAssembler;
use crate::config::ResolvedConfig;
use crate::domain::{
    Collection, CollectionSubtype, Geeklist, PlayPage, PlaysQuery, Thing, ThingType, User,
};
use crate::error::GatewayError;
use crate::fetcher::Fetcher;
use crate::normalize::{
    normalize_geeklist, normalize_geeklists, normalize_plays, normalize_things, normalize_user,
};
use crate::storage::build_storage;

pub struct BggGateway {
    fetcher: Arc<Fetcher>,
    cache: CacheLayer,
}

impl BggGateway {
    pub fn new(fetcher: Arc<Fetcher>, cache: CacheLayer) -> Self {
        Self { fetcher, cache }
    }

    pub fn from_config(config: &ResolvedConfig) -> Result<Self, GatewayError> {
        let fetcher = Fetcher::with_reqwest(&config.base_url, config.retry.clone())?;
        let storage = build_storage(&config.storage)?;
        info!(
            base_url = %config.base_url,
            backend = storage.name(),
            "initialized BGG gateway"
        );
        Ok(Self::new(
            Arc::new(fetcher),
            CacheLayer::new(storage, config.ttl.clone()),
        ))
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    pub async fn get_thing(&self, id: &str) -> Result<Option<Thing>, GatewayError> {
        let id = required("id", id)?;
        self.cache
            .get_or_fetch(&CacheKey::thing(id), || async {
                self.fetcher
                    .fetch(&thing_path(&[id]))
                    .await
                    .map(|document| normalize_things(&document).into_iter().next())
            })
            .await
    }

    pub async fn get_things(&self, ids: &[String]) -> Result<Vec<Thing>, GatewayError> {
        let ids: Vec<&str> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let key_ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        self.cache
            .get_or_fetch(&CacheKey::things(&key_ids), || async {
                self.fetcher
                    .fetch(&thing_path(&ids))
                    .await
                    .map(|document| normalize_things(&document))
            })
            .await
    }

    pub async fn search_things(
        &self,
        query: &str,
        thing_type: Option<ThingType>,
        exact: bool,
    ) -> Result<Vec<Thing>, GatewayError> {
        let query = required("query", query)?;
        self.cache
            .get_or_fetch(&CacheKey::search(query, thing_type, exact), || async {
                let path = search_path(query, thing_type, exact);
                self.fetcher
                    .fetch(&path)
                    .await
                    .map(|document| normalize_things(&document))
            })
            .await
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<User>, GatewayError> {
        let username = required("username", username)?;
        self.cache
            .get_or_fetch(&CacheKey::user(username), || async {
                self.fetcher
                    .fetch(&user_path(username))
                    .await
                    .map(|document| normalize_user(&document))
            })
            .await
    }

    pub async fn get_user_collection(
        &self,
        username: &str,
        subtype: Option<CollectionSubtype>,
    ) -> Result<Option<Collection>, GatewayError> {
        let username = required("username", username)?;
        self.cache
            .get_or_fetch(&CacheKey::collection(username, subtype), || async {
                CollectionAssembler::new(&self.fetcher)
                    .assemble(username, subtype)
                    .await
            })
            .await
    }

    pub async fn get_user_plays(
        &self,
        username: &str,
        query: &PlaysQuery,
    ) -> Result<PlayPage, GatewayError> {
        let username = required("username", username)?;
        self.cache
            .get_or_fetch(&CacheKey::plays(username, query), || async {
                self.fetcher
                    .fetch(&plays_path(username, query))
                    .await
                    .map(|document| {
                        normalize_plays(&document, username, query.page.unwrap_or(1).max(1))
                    })
            })
            .await
    }

    pub async fn get_geeklist(&self, id: &str) -> Result<Option<Geeklist>, GatewayError> {
        let id = required("id", id)?;
        self.cache
            .get_or_fetch(&CacheKey::geeklist(id), || async {
                self.fetcher
                    .fetch(&geeklist_path(id))
                    .await
                    .map(|document| normalize_geeklist(&document))
            })
            .await
    }

    pub async fn get_geeklists(
        &self,
        username: &str,
        page: u32,
    ) -> Result<Vec<Geeklist>, GatewayError> {
        let username = required("username", username)?;
        let page = page.max(1);
        self.cache
            .get_or_fetch(&CacheKey::geeklists(username, page), || async {
                self.fetcher
                    .fetch(&geeklists_path(username, page))
                    .await
                    .map(|document| normalize_geeklists(&document))
            })
            .await
    }

    pub async fn get_hot_items(&self, item_type: Option<&str>) -> Result<Vec<Thing>, GatewayError> {
        let item_type = item_type.map(str::trim).filter(|value| !value.is_empty());
        self.cache
            .get_or_fetch(&CacheKey::hot_items(item_type), || async {
                self.fetcher
                    .fetch(&hot_path(item_type))
                    .await
                    .map(|document| normalize_things(&document))
            })
            .await
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        self.cache.remove(&key.key).await;
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, GatewayError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GatewayError::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(value)
}

fn encode_segment(value: &str) -> String {
    byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

pub fn thing_path(ids: &[&str]) -> String {
    let mut query = Serializer::new(String::new());
    query.append_pair("id", &ids.join(","));
    query.append_pair("stats", "1");
    format!("/thing?{}", query.finish())
}

pub fn search_path(search: &str, thing_type: Option<ThingType>, exact: bool) -> String {
    let mut query = Serializer::new(String::new());
    query.append_pair("query", search);
    if let Some(thing_type) = thing_type {
        query.append_pair("type", thing_type.as_upstream());
    }
    if exact {
        query.append_pair("exact", "1");
    }
    format!("/search?{}", query.finish())
}

pub fn user_path(username: &str) -> String {
    let mut query = Serializer::new(String::new());
    query.append_pair("name", username);
    format!("/user?{}", query.finish())
}

pub fn plays_path(username: &str, filters: &PlaysQuery) -> String {
    let mut query = Serializer::new(String::new());
    query.append_pair("username", username);
    if let Some(id) = filters.id.as_deref().filter(|id| !id.is_empty()) {
        query.append_pair("id", id);
    }
    if let Some(min_date) = filters.min_date.as_deref().filter(|date| !date.is_empty()) {
        query.append_pair("mindate", min_date);
    }
    if let Some(max_date) = filters.max_date.as_deref().filter(|date| !date.is_empty()) {
        query.append_pair("maxdate", max_date);
    }
    if let Some(page) = filters.page.filter(|page| *page > 0) {
        query.append_pair("page", &page.to_string());
    }
    format!("/plays?{}", query.finish())
}

pub fn geeklist_path(id: &str) -> String {
    format!("/geeklist/{}", encode_segment(id))
}

pub fn geeklists_path(username: &str, page: u32) -> String {
    format!("/geeklists/user/{}?page={page}", encode_segment(username))
}

pub fn hot_path(item_type: Option<&str>) -> String {
    match item_type {
        Some(item_type) => {
            let mut query = Serializer::new(String::new());
            query.append_pair("type", item_type);
            format!("/hot?{}", query.finish())
        }
        None => "/hot".to_string(),
    }
}
