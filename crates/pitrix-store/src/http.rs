//! HTTP resource store client
//!
//! Speaks the REST verbs of a Kubernetes-style API server for the
//! `application.kubesphere.io/v1alpha1` group:
//!
//! | Verb          | Request                                         |
//! |---------------|-------------------------------------------------|
//! | list          | `GET    /apis/{group}/{plural}?labelSelector=..` |
//! | get           | `GET    /apis/{group}/{plural}/{name}`           |
//! | create        | `POST   /apis/{group}/{plural}`                  |
//! | patch         | `PATCH  /apis/{group}/{plural}/{name}` (merge)   |
//! | update_status | `PUT    /apis/{group}/{plural}/{name}/status`    |

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use pitrix_import_types::constants::API_VERSION;
use pitrix_import_types::{ImportResult, LabelSelector, Resource, ResourceStore};

use crate::error::StoreError;

const MERGE_PATCH_CONTENT_TYPE: &str = "application/merge-patch+json";

/// Connection settings for the resource API
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    /// Bearer token, if the API requires one
    pub token: Option<String>,
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<R> {
    #[serde(default = "Vec::new")]
    items: Vec<R>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    message: String,
}

/// Shared HTTP connection to the resource API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: StoreConfig,
}

impl ApiClient {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn collection_url(&self, plural: &str) -> String {
        format!(
            "{}/apis/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            API_VERSION,
            plural
        )
    }

    fn request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode the body, mapping error statuses
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        target: &str,
    ) -> Result<T, StoreError> {
        let response = self.request(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StatusResponse>(&body)
                .map(|s| s.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or(body);

            return Err(match status.as_u16() {
                404 => StoreError::NotFound(target.to_string()),
                409 => StoreError::Conflict {
                    target: target.to_string(),
                    message,
                },
                _ => StoreError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Resource store client for one record kind
pub struct HttpResourceStore<R> {
    api: Arc<ApiClient>,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Resource> HttpResourceStore<R> {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            _kind: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        self.api.collection_url(R::PLURAL)
    }

    fn item_url(&self, name: &str) -> String {
        format!("{}/{}", self.collection_url(), name)
    }

    /// Serialize a record with the type fields the API expects
    fn to_wire(record: &R) -> Result<serde_json::Value, StoreError> {
        let mut value = serde_json::to_value(record)?;
        if let Some(object) = value.as_object_mut() {
            object.insert("apiVersion".to_string(), API_VERSION.into());
            object.insert("kind".to_string(), R::KIND.into());
        }
        Ok(value)
    }

    async fn list_records(&self, selector: &LabelSelector) -> Result<Vec<R>, StoreError> {
        debug!("LIST {} selector={}", R::PLURAL, selector);
        let mut request = self.api.client.get(self.collection_url());
        if !selector.is_empty() {
            request = request.query(&[("labelSelector", selector.to_string())]);
        }
        let list: ListResponse<R> = self.api.send(request, R::PLURAL).await?;
        Ok(list.items)
    }

    async fn get_record(&self, name: &str) -> Result<R, StoreError> {
        debug!("GET {}/{}", R::PLURAL, name);
        let request = self.api.client.get(self.item_url(name));
        self.api.send(request, name).await
    }

    async fn create_record(&self, record: &R) -> Result<R, StoreError> {
        debug!("CREATE {}/{}", R::PLURAL, record.name());
        let request = self
            .api
            .client
            .post(self.collection_url())
            .json(&Self::to_wire(record)?);
        self.api.send(request, record.name()).await
    }

    async fn patch_record(&self, name: &str, merge_patch: &[u8]) -> Result<R, StoreError> {
        debug!("PATCH {}/{}", R::PLURAL, name);
        let request = self
            .api
            .client
            .patch(self.item_url(name))
            .header(reqwest::header::CONTENT_TYPE, MERGE_PATCH_CONTENT_TYPE)
            .body(merge_patch.to_vec());
        self.api.send(request, name).await
    }

    async fn update_status_record(&self, record: &R) -> Result<R, StoreError> {
        debug!("UPDATE STATUS {}/{}", R::PLURAL, record.name());
        let request = self
            .api
            .client
            .put(format!("{}/status", self.item_url(record.name())))
            .json(&Self::to_wire(record)?);
        self.api.send(request, record.name()).await
    }
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for HttpResourceStore<R> {
    async fn list(&self, selector: &LabelSelector) -> ImportResult<Vec<R>> {
        Ok(self.list_records(selector).await?)
    }

    async fn get(&self, name: &str) -> ImportResult<R> {
        Ok(self.get_record(name).await?)
    }

    async fn create(&self, record: &R) -> ImportResult<R> {
        Ok(self.create_record(record).await?)
    }

    async fn patch(&self, name: &str, merge_patch: &[u8]) -> ImportResult<R> {
        Ok(self.patch_record(name, merge_patch).await?)
    }

    async fn update_status(&self, record: &R) -> ImportResult<R> {
        Ok(self.update_status_record(record).await?)
    }
}
