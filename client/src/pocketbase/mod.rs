//! PocketBase record client.
//!
//! Talks to the `/api/collections/{collection}/records` endpoints over HTTP and
//! to `/api/realtime` for the change feed (see [`realtime`]).

mod realtime;

use std::sync::Arc;

use async_trait::async_trait;
use basket_engine::{Fields, ListOptions, Record};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::api::{EventSender, RecordApi, SubscriptionId};
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::realtime::{collection_topic, SubscriberRegistry};

use self::realtime::Session;

/// Page size used when fetching a full collection.
pub const DEFAULT_BATCH_SIZE: u32 = 500;

/// One page of a record listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub page: u32,
    pub per_page: u32,
    /// `-1` when the total was not requested
    #[serde(default)]
    pub total_items: i64,
    #[serde(default)]
    pub total_pages: i64,
    pub items: Vec<Record>,
}

/// Error body returned by the backend.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// HTTP client for a PocketBase instance.
///
/// Holds at most one realtime session, opened on the first subscription and
/// closed when the last one is removed.
pub struct PocketBaseClient {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
    batch_size: u32,
    registry: Arc<SubscriberRegistry>,
    session: Mutex<Option<Session>>,
}

impl PocketBaseClient {
    /// Create a client for the instance at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder().build()?;

        tracing::debug!(base_url = %parsed, "PocketBase client created");

        Ok(Self {
            http,
            base_url: parsed,
            auth_token: None,
            batch_size: DEFAULT_BATCH_SIZE,
            registry: Arc::new(SubscriberRegistry::new()),
            session: Mutex::new(None),
        })
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Self::new(&config.backend_url)?;
        Ok(match &config.auth_token {
            Some(token) => client.with_auth_token(token.clone()),
            None => client,
        })
    }

    /// Send `token` as the `Authorization` header on every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Page size for [`RecordApi::fetch_all`].
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch one page of a collection.
    ///
    /// Unlike [`RecordApi::fetch_all`] this also reports the total item and
    /// page counts.
    pub async fn list(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
        options: &ListOptions,
    ) -> Result<ListPage> {
        self.list_page(collection, page.max(1), per_page.max(1), options, false)
            .await
    }

    async fn list_page(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
        options: &ListOptions,
        skip_total: bool,
    ) -> Result<ListPage> {
        let url = self.records_url(collection, None)?;

        let mut query = vec![
            ("page", page.to_string()),
            ("perPage", per_page.to_string()),
            ("sort", options.effective_sort().to_string()),
        ];
        if let Some(filter) = options.filter() {
            query.push(("filter", filter.to_string()));
        }
        if let Some(expand) = options.expand() {
            query.push(("expand", expand.to_string()));
        }
        if skip_total {
            query.push(("skipTotal", "1".to_string()));
        }

        let response = self.request(Method::GET, url).query(&query).send().await?;
        read_json(response).await
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn records_url(&self, collection: &str, id: Option<&str>) -> Result<Url> {
        match id {
            Some(id) => self.url(&["api", "collections", collection, "records", id]),
            None => self.url(&["api", "collections", collection, "records"]),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.auth_token {
            Some(token) => builder.header(AUTHORIZATION, token),
            None => builder,
        }
    }
}

impl Drop for PocketBaseClient {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.close();
        }
    }
}

/// Turn a non-success response into an error.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: ApiErrorBody = response.json().await.unwrap_or_default();
    let message = if body.message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.message
    };

    if status == StatusCode::NOT_FOUND {
        Err(ClientError::NotFound(message))
    } else {
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl RecordApi for PocketBaseClient {
    async fn fetch_all(&self, collection: &str, options: &ListOptions) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let result = self
                .list_page(collection, page, self.batch_size, options, true)
                .await?;
            let count = result.items.len();
            records.extend(result.items);

            if count < self.batch_size as usize {
                break;
            }
            page += 1;
        }

        tracing::debug!(
            collection = %collection,
            count = records.len(),
            pages = page,
            "Fetched full record list"
        );

        Ok(records)
    }

    async fn fetch_one(&self, collection: &str, id: &str, expand: Option<&str>) -> Result<Record> {
        let url = self.records_url(collection, Some(id))?;
        let mut request = self.request(Method::GET, url);
        if let Some(expand) = expand.filter(|e| !e.is_empty()) {
            request = request.query(&[("expand", expand)]);
        }
        read_json(request.send().await?).await
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<Record> {
        let url = self.records_url(collection, None)?;
        let response = self.request(Method::POST, url).json(&fields).send().await?;
        read_json(response).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<Record> {
        let url = self.records_url(collection, Some(id))?;
        let response = self.request(Method::PATCH, url).json(&fields).send().await?;
        read_json(response).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let url = self.records_url(collection, Some(id))?;
        let response = self.request(Method::DELETE, url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn subscribe(&self, collection: &str, sender: EventSender) -> Result<SubscriptionId> {
        self.subscribe_topic(collection_topic(collection), sender)
            .await
    }

    async fn unsubscribe(&self, _collection: &str, id: &SubscriptionId) -> Result<()> {
        self.unsubscribe_id(id).await
    }
}
