//! Minimal client for the prompt content API.
//!
//! This crate provides:
//! - The wire types shared by the content service and the sampling engine
//!   (categories, prompt items, output configs, group limits)
//! - A focused HTTP client for the read path (`/api/data`,
//!   `/api/output-configs`) and the admin mutation endpoint (`/api/admin`)
//!
//! The client reports failures and never retries; callers decide whether to
//! fall back to a default dataset or surface the error.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default base URL for a local dev server.
const DEFAULT_BASE: &str = "http://localhost:8788";

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "RNG_PROMPT_API_BASE";

/// Errors that can occur when talking to the content API.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

// ============================================================================
// Wire Types
// ============================================================================

/// How a category participates in sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// Always drawn.
    #[default]
    Required,
    /// Drawn only while checked.
    Optional,
    /// Drawn under a shared group budget.
    Group,
}

/// One candidate value within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptItem {
    /// Numeric identity, when the backing row has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Raw value used in the final output.
    pub value: String,

    /// Optional display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Inactive items are excluded from sampling but stay visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl PromptItem {
    /// Identity key for locking: the numeric id if present, else the raw value.
    pub fn key(&self) -> ItemKey {
        match self.id {
            Some(id) => ItemKey::Id(id),
            None => ItemKey::Value(self.value.clone()),
        }
    }

    /// Whether the item participates in sampling (missing flag means active).
    pub fn active(&self) -> bool {
        self.is_active != Some(false)
    }
}

/// Identity of an item for lock bookkeeping.
///
/// Persisted state stores these as plain JSON numbers or strings, so the
/// encoding is untagged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemKey {
    Id(i64),
    Value(String),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Id(id) => write!(f, "{id}"),
            ItemKey::Value(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for ItemKey {
    fn from(id: i64) -> Self {
        ItemKey::Id(id)
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        ItemKey::Value(value.to_string())
    }
}

/// A named pool of selectable items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub label: String,

    #[serde(rename = "type", default)]
    pub kind: CategoryKind,

    /// Group identifier; empty or absent means the general bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_group: Option<String>,

    /// Explicit optionality override; falls back to the kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_optional: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,

    #[serde(default)]
    pub items: Vec<PromptItem>,
}

/// One unit of a rendering template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputBlock {
    pub id: String,

    #[serde(flatten)]
    pub kind: BlockKind,
}

/// What an output block resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockKind {
    /// Literal text, subject to separator elision.
    Text {
        #[serde(default)]
        text: String,
    },
    /// The current draw of one category.
    Category {
        #[serde(rename = "categorySlug")]
        category_slug: String,
    },
    /// Every category of one group, in sort order.
    Group {
        #[serde(rename = "groupId")]
        group_id: String,
    },
}

/// A named, ordered block list. At most one config is active at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub blocks: Vec<OutputBlock>,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Budget on the total number of items drawn across a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLimit {
    pub min: u32,
    pub max: u32,
}

// ============================================================================
// Client
// ============================================================================

/// Content API client.
#[derive(Clone)]
pub struct ContentApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct OutputConfigsPayload {
    #[serde(default)]
    configs: Vec<OutputConfig>,
}

#[derive(Deserialize)]
struct CreatedPayload {
    #[serde(default)]
    id: Option<String>,
}

impl ContentApi {
    /// Create a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from the `RNG_PROMPT_API_BASE` environment variable,
    /// falling back to the local dev server address.
    pub fn from_env() -> Self {
        let base = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE.to_string());
        Self::new(base)
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the full category list (read path).
    pub async fn fetch_categories(&self) -> Result<Vec<Category>, Error> {
        let response = self
            .client
            .get(format!("{}/api/data", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        response
            .json::<Vec<Category>>()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }

    /// Fetch all saved output configs.
    pub async fn fetch_output_configs(&self) -> Result<Vec<OutputConfig>, Error> {
        let response = self
            .client
            .get(format!("{}/api/output-configs", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let payload: OutputConfigsPayload = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(payload.configs)
    }

    /// Create a new output config; returns the server-assigned id if any.
    pub async fn create_output_config(
        &self,
        name: &str,
        blocks: &[OutputBlock],
    ) -> Result<Option<String>, Error> {
        let body = serde_json::json!({
            "action": "create",
            "name": name,
            "blocks": blocks,
        });
        let response = self.post_json("/api/output-configs", &body).await?;
        let payload: CreatedPayload = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;
        Ok(payload.id)
    }

    /// Update an existing output config.
    pub async fn update_output_config(
        &self,
        id: &str,
        name: &str,
        blocks: &[OutputBlock],
    ) -> Result<(), Error> {
        let body = serde_json::json!({
            "action": "update",
            "id": id,
            "name": name,
            "blocks": blocks,
        });
        self.post_json("/api/output-configs", &body).await?;
        Ok(())
    }

    /// Delete an output config.
    pub async fn delete_output_config(&self, id: &str) -> Result<(), Error> {
        let body = serde_json::json!({
            "action": "delete",
            "id": id,
        });
        self.post_json("/api/output-configs", &body).await?;
        Ok(())
    }

    /// Mark one output config as the active one.
    pub async fn activate_output_config(&self, id: &str) -> Result<(), Error> {
        let body = serde_json::json!({
            "action": "set-active",
            "id": id,
        });
        self.post_json("/api/output-configs", &body).await?;
        Ok(())
    }

    /// Run a generic admin mutation (`{action, table, data}`).
    ///
    /// The caller only learns whether the mutation succeeded; failures are
    /// never retried here.
    pub async fn admin_mutation(
        &self,
        action: &str,
        table: &str,
        data: serde_json::Value,
    ) -> Result<(), Error> {
        let body = serde_json::json!({
            "action": action,
            "table": table,
            "data": data,
        });
        self.post_json("/api/admin", &body).await?;
        Ok(())
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_wire_format() {
        let json = r#"{
            "id": 4,
            "slug": "environment",
            "label": "Environment",
            "type": "group",
            "ui_group": "Scene",
            "min_count": 1,
            "max_count": 2,
            "sort_order": 3,
            "items": [
                { "id": 401, "value": "forest", "label": "Forest", "is_active": true },
                { "id": 402, "value": "city ruins" }
            ]
        }"#;

        let cat: Category = serde_json::from_str(json).unwrap();
        assert_eq!(cat.slug, "environment");
        assert_eq!(cat.kind, CategoryKind::Group);
        assert_eq!(cat.items.len(), 2);
        assert!(cat.items[1].active());
        assert_eq!(cat.items[1].key(), ItemKey::Id(402));
    }

    #[test]
    fn test_item_key_falls_back_to_value() {
        let item = PromptItem {
            id: None,
            value: "sunny day".to_string(),
            label: None,
            is_active: None,
        };
        assert_eq!(item.key(), ItemKey::Value("sunny day".to_string()));
    }

    #[test]
    fn test_item_key_untagged_roundtrip() {
        let keys = vec![ItemKey::Id(7), ItemKey::Value("girl".to_string())];
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"[7,"girl"]"#);

        let back: Vec<ItemKey> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, keys);
    }

    #[test]
    fn test_output_block_wire_format() {
        let json = r#"[
            { "id": "b1", "type": "text", "text": "A " },
            { "id": "b2", "type": "category", "categorySlug": "subject" },
            { "id": "b3", "type": "group", "groupId": "Scene" }
        ]"#;

        let blocks: Vec<OutputBlock> = serde_json::from_str(json).unwrap();
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[0].kind, BlockKind::Text { ref text } if text == "A "));
        assert!(matches!(
            blocks[1].kind,
            BlockKind::Category { ref category_slug } if category_slug == "subject"
        ));

        let back = serde_json::to_string(&blocks[2]).unwrap();
        assert!(back.contains(r#""type":"group""#));
        assert!(back.contains(r#""groupId":"Scene""#));
    }

    #[test]
    fn test_output_config_defaults() {
        let json = r#"{ "id": "cfg-1", "name": "Default" }"#;
        let config: OutputConfig = serde_json::from_str(json).unwrap();
        assert!(config.blocks.is_empty());
        assert!(!config.is_active);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let api = ContentApi::new("http://example.test/");
        assert_eq!(api.base_url(), "http://example.test");
    }
}
