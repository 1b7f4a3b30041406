//! CloudFormation custom-resource events as seen by provider-framework handlers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which handlers echo the crawler name in response `Data`.
pub const CRAWLER_NAME_KEY: &str = "CrawlerName";

/// Key under which `onEvent` records the start time (epoch milliseconds, as a
/// string) of the crawl that its own start superseded. Until a crawl with a
/// different start time is observed, the crawler still reports the old run.
pub const SUPERSEDED_CRAWL_KEY: &str = "SupersededCrawlStartedAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Properties declared on the `Custom::CrawlerStarter` resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerProperties {
    /// Declared as `crawlerName` by the stack; `CrawlerName` is accepted too.
    #[serde(
        rename = "CrawlerName",
        alias = "crawlerName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub crawler_name: Option<String>,
}

/// Event delivered to both `onEvent` and `isComplete` handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_resource_id: Option<String>,

    /// Absent on `Create` for `onEvent`; set on every `isComplete` call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,

    #[serde(default)]
    pub resource_properties: CrawlerProperties,

    /// Data returned by `onEvent`, forwarded to `isComplete`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl CustomResourceEvent {
    pub fn new(request_type: RequestType, crawler_name: impl Into<String>) -> Self {
        Self {
            request_type,
            request_id: None,
            logical_resource_id: None,
            physical_resource_id: None,
            resource_properties: CrawlerProperties {
                crawler_name: Some(crawler_name.into()),
            },
            data: Map::new(),
        }
    }

    /// Crawler named by the resource properties, or echoed back in `Data`.
    pub fn crawler_name(&self) -> Option<&str> {
        self.resource_properties
            .crawler_name
            .as_deref()
            .or_else(|| self.data.get(CRAWLER_NAME_KEY).and_then(Value::as_str))
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Physical id to report: the existing one, or one derived from the crawler.
    pub fn physical_resource_id_or(&self, crawler_name: Option<&str>) -> String {
        if let Some(id) = &self.physical_resource_id {
            return id.clone();
        }
        match crawler_name {
            Some(name) => physical_resource_id_for(name),
            None => self
                .logical_resource_id
                .clone()
                .unwrap_or_else(|| "crawler".to_string()),
        }
    }
}

/// Deterministic physical id, so a repeated `Create` maps to the same resource.
pub fn physical_resource_id_for(crawler_name: &str) -> String {
    format!("crawler/{}", crawler_name)
}

/// `onEvent` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OnEventResponse {
    pub physical_resource_id: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// `isComplete` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IsCompleteResponse {
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}
