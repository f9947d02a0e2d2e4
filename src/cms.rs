//! CMS REST client.
//!
//! Reads rank-ordered pages and writes single-item ranks against the
//! content API:
//!
//! - `GET  {cms}/api/v1/{collection}?page=P&limit=L[&search=S][&category=C]`
//!   returns `{ "items": [...], "totalPages": n }`
//! - `PATCH {cms}/api/v1/{collection}/{id}` with `{ "<rank field>": n }`
//!
//! The rank field name comes from the collection's [`RankingPolicy`]; the
//! rest of each item is ignored.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CuratorConfig;
use crate::dispatch::WriteError;
use crate::ranking::{EntityKind, Item, ItemId, RankingPolicy};
use crate::store::{CollectionFetcher, FetchedPage, ListQuery, RankWriter};

/// CMS client errors.
#[derive(Error, Debug)]
pub enum CmsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CMS returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed item: {0}")]
    MalformedItem(String),
}

pub type Result<T> = std::result::Result<T, CmsError>;

/// List response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    items: Vec<Value>,
    #[serde(default)]
    total_pages: u32,
}

/// Client for one collection of the CMS.
#[derive(Debug, Clone)]
pub struct CmsClient {
    http: Client,
    base_url: String,
    collection: String,
    policy: RankingPolicy,
    api_token: Option<String>,
}

impl CmsClient {
    /// Client for one of the rankable entity kinds.
    pub fn new(config: &CuratorConfig, kind: EntityKind) -> Self {
        Self::for_collection(config, kind.collection(), kind.policy())
    }

    /// Client for an arbitrary collection path and rank policy.
    pub fn for_collection(
        config: &CuratorConfig,
        collection: impl Into<String>,
        policy: RankingPolicy,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: config.cms_url.trim_end_matches('/').to_string(),
            collection: collection.into(),
            policy,
            api_token: config.api_token.clone(),
        }
    }

    pub fn policy(&self) -> &RankingPolicy {
        &self.policy
    }

    fn collection_url(&self) -> String {
        format!("{}/api/v1/{}", self.base_url, self.collection)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Extract id and rank from a raw item.
    fn parse_item(&self, value: &Value) -> Result<Item> {
        let id = match value.get("id") {
            Some(Value::String(s)) => ItemId::new(s.as_str()),
            Some(Value::Number(n)) => ItemId::new(n.to_string()),
            _ => return Err(CmsError::MalformedItem(format!("missing id in {}", value))),
        };
        let rank = value
            .get(&self.policy.field_name)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                CmsError::MalformedItem(format!(
                    "item {} has no integer {}",
                    id, self.policy.field_name
                ))
            })?;
        Ok(Item::new(id, rank))
    }

    async fn fetch_page(&self, query: &ListQuery) -> Result<FetchedPage> {
        let url = self.collection_url();
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(search) = query.filter.search_text() {
            params.push(("search", search.to_string()));
        }
        if let Some(category) = query.filter.category.as_option() {
            params.push(("category", category.to_string()));
        }

        debug!(url = %url, page = query.page, limit = query.limit, "Fetching page from CMS");

        let response = self.authorize(self.http.get(&url).query(&params)).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CmsError::Status { status, body });
        }

        let list: ListResponse = response.json().await?;
        let items = list
            .items
            .iter()
            .map(|value| self.parse_item(value))
            .collect::<Result<Vec<_>>>()?;

        debug!(count = items.len(), total_pages = list.total_pages, "Fetched page from CMS");

        Ok(FetchedPage {
            items,
            total_pages: list.total_pages,
        })
    }

    async fn patch_rank(&self, id: &ItemId, rank: i64) -> Result<()> {
        let url = format!("{}/{}", self.collection_url(), id);
        let mut body = serde_json::Map::new();
        body.insert(self.policy.field_name.clone(), Value::from(rank));

        let response = self
            .authorize(self.http.patch(&url).json(&Value::Object(body)))
            .send()
            .await?;

        if response.status().is_success() {
            debug!(item = %id, rank, "Rank updated in CMS");
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(item = %id, status, body = %body, "CMS refused rank update");
            Err(CmsError::Status { status, body })
        }
    }
}

impl CollectionFetcher for CmsClient {
    type Error = CmsError;

    async fn list(&self, query: &ListQuery) -> Result<FetchedPage> {
        self.fetch_page(query).await
    }
}

impl RankWriter for CmsClient {
    async fn update_rank(&self, id: &ItemId, rank: i64) -> std::result::Result<(), WriteError> {
        self.patch_rank(id, rank)
            .await
            .map_err(|e| WriteError::Rejected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(kind: EntityKind) -> CmsClient {
        CmsClient::new(&CuratorConfig::new("http://cms.local/"), kind)
    }

    #[test]
    fn test_collection_url() {
        assert_eq!(
            client(EntityKind::PhotoCollection).collection_url(),
            "http://cms.local/api/v1/photo-collections"
        );
    }

    #[test]
    fn test_parse_item_uses_policy_field() {
        let c = client(EntityKind::Activity);
        let item = c
            .parse_item(&json!({"id": "kayak", "attraction_rank": 4, "title": "Kayaking"}))
            .unwrap();
        assert_eq!(item, Item::new("kayak", 4));

        let err = c
            .parse_item(&json!({"id": "kayak", "display_order": 4}))
            .unwrap_err();
        assert!(matches!(err, CmsError::MalformedItem(_)));
    }

    #[test]
    fn test_parse_item_numeric_id() {
        let item = client(EntityKind::Region)
            .parse_item(&json!({"id": 42, "display_order": 0}))
            .unwrap();
        assert_eq!(item.id.as_str(), "42");
    }

    #[test]
    fn test_parse_item_missing_id() {
        let err = client(EntityKind::Region)
            .parse_item(&json!({"display_order": 0}))
            .unwrap_err();
        assert!(err.to_string().contains("missing id"));
    }
}
