use tracing::{debug, warn};
use url::form_urlencoded::Serializer;

use crate::domain::{Collection, CollectionSubtype, EXPANSION_TYPE};
use crate::error::GatewayError;
use crate::fetcher::Fetcher;
use crate::normalize::normalize_collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtypeFilter<'a> {
    All,
    Only(&'a str),
    Excluding(&'a str),
}

pub fn collection_path(username: &str, filter: SubtypeFilter<'_>) -> String {
    let mut query = Serializer::new(String::new());
    query.append_pair("username", username);
    match filter {
        SubtypeFilter::All => {}
        SubtypeFilter::Only(subtype) => {
            query.append_pair("subtype", subtype);
        }
        SubtypeFilter::Excluding(subtype) => {
            query.append_pair("excludesubtype", subtype);
        }
    }
    query.append_pair("stats", "1");
    format!("/collection?{}", query.finish())
}

pub fn merge_collections(boardgames: Collection, expansions: Collection) -> Collection {
    let pub_date = if boardgames.pub_date.is_empty() {
        expansions.pub_date
    } else {
        boardgames.pub_date
    };
    let mut items = boardgames.items;
    items.extend(expansions.items);
    Collection {
        total_items: boardgames.total_items + expansions.total_items,
        pub_date,
        items,
    }
}

pub struct CollectionAssembler<'a> {
    fetcher: &'a Fetcher,
}

impl<'a> CollectionAssembler<'a> {
    pub fn new(fetcher: &'a Fetcher) -> Self {
        Self { fetcher }
    }

    pub async fn assemble(
        &self,
        username: &str,
        subtype: Option<CollectionSubtype>,
    ) -> Result<Option<Collection>, GatewayError> {
        match subtype {
            Some(CollectionSubtype::BoardGame) => self.assemble_split(username).await,
            Some(other) => {
                self.fetch_one(username, SubtypeFilter::Only(other.as_upstream()))
                    .await
            }
            None => self.fetch_one(username, SubtypeFilter::All).await,
        }
    }

    async fn assemble_split(&self, username: &str) -> Result<Option<Collection>, GatewayError> {
        let (boardgames, expansions) = tokio::join!(
            self.fetch_one(username, SubtypeFilter::Excluding(EXPANSION_TYPE)),
            self.fetch_one(username, SubtypeFilter::Only(EXPANSION_TYPE)),
        );

        match (boardgames, expansions) {
            (Ok(None), Ok(None)) => Ok(None),
            (Ok(boardgames), Ok(expansions)) => {
                let merged = merge_collections(
                    boardgames.unwrap_or_default(),
                    expansions.unwrap_or_default(),
                );
                debug!(
                    username,
                    total_items = merged.total_items,
                    "merged boardgame and expansion collections"
                );
                Ok(Some(merged))
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(
                    username,
                    error = %err,
                    "split collection fetch failed, falling back to unfiltered collection"
                );
                self.fetch_one(username, SubtypeFilter::All).await
            }
        }
    }

    async fn fetch_one(
        &self,
        username: &str,
        filter: SubtypeFilter<'_>,
    ) -> Result<Option<Collection>, GatewayError> {
        let document = self.fetcher.fetch(&collection_path(username, filter)).await?;
        Ok(normalize_collection(&document))
    }
}
