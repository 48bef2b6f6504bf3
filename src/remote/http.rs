//! REST record store over reqwest.

use std::{fmt::Display, marker::PhantomData, time::Duration};

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};

use crate::{record::Entity, types::RouteStyle};

use super::{RecordStore, StoreError, StoreResult};

/// Connection settings for [`HttpRecordStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// API root without trailing slash, e.g. `http://localhost:5000/api`.
    pub base_url: String,
    /// Per-request timeout. `None` leaves the transport default in place.
    pub timeout_ms: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_ms: None,
        }
    }
}

/// Resolved URLs for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    /// `GET` target returning the whole collection.
    pub list: String,
    /// `POST` target creating one record.
    pub create: String,
    /// Prefix for `PUT`/`DELETE` of one record; the key is appended.
    pub item_prefix: String,
}

impl Routes {
    /// Builds routes for `collection` under `base_url` in the given style.
    pub fn new(base_url: &str, collection: &str, style: RouteStyle) -> Self {
        let root = format!("{}/{}", base_url.trim_end_matches('/'), collection);
        let (list, create) = match style {
            RouteStyle::Conventional => (root.clone(), root.clone()),
            RouteStyle::Verbs => (format!("{root}/all"), format!("{root}/add")),
        };
        Self {
            list,
            create,
            item_prefix: root,
        }
    }

    /// Routes for entity `E` using its declared style.
    pub fn for_entity<E: Entity>(base_url: &str) -> Self {
        Self::new(base_url, E::COLLECTION, E::ROUTE_STYLE)
    }

    /// URL of the record stored under `key`, with the key percent-encoded
    /// as a single path segment.
    pub fn item(&self, key: &impl Display) -> StoreResult<Url> {
        let mut url = Url::parse(&self.item_prefix).map_err(|e| {
            StoreError::Message(format!("invalid base url {}: {e}", self.item_prefix))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::Message(format!("base url {} cannot hold a path", self.item_prefix))
            })?
            .pop_if_empty()
            .push(&key.to_string());
        Ok(url)
    }
}

/// Record store backed by a REST service.
pub struct HttpRecordStore<E: Entity> {
    client: Client,
    routes: Routes,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> HttpRecordStore<E> {
    /// Store for `E` at the routes its entity declares.
    pub fn new(config: &HttpConfig) -> StoreResult<Self> {
        Self::with_routes(config, Routes::for_entity::<E>(&config.base_url))
    }

    /// Store with explicit routes.
    pub fn with_routes(config: &HttpConfig, routes: Routes) -> StoreResult<Self> {
        let mut builder = Client::builder();
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        Ok(Self {
            client: builder.build()?,
            routes,
            _entity: PhantomData,
        })
    }

    /// Resolved routes.
    pub fn routes(&self) -> &Routes {
        &self.routes
    }
}

async fn check(resp: Response) -> StoreResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Decodes the echoed record, falling back to what was sent when the server
/// replies with something else (an acknowledgement message, an empty body).
async fn echoed_or<E: Entity>(resp: Response, sent: E) -> StoreResult<E> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice::<E>(&bytes).unwrap_or(sent))
}

#[async_trait]
impl<E: Entity> RecordStore<E> for HttpRecordStore<E> {
    async fn list_all(&self) -> StoreResult<Vec<E>> {
        debug!("GET {}", self.routes.list);
        let resp = check(self.client.get(&self.routes.list).send().await?).await?;
        Ok(resp.json::<Vec<E>>().await?)
    }

    async fn create(&self, record: E) -> StoreResult<E> {
        debug!("POST {}", self.routes.create);
        let resp = check(
            self.client
                .post(&self.routes.create)
                .json(&record)
                .send()
                .await?,
        )
        .await?;
        echoed_or(resp, record).await
    }

    async fn update(&self, key: &E::Key, record: E) -> StoreResult<E> {
        let url = self.routes.item(key)?;
        debug!("PUT {url}");
        let resp = check(self.client.put(url).json(&record).send().await?).await?;
        echoed_or(resp, record).await
    }

    async fn delete(&self, key: &E::Key) -> StoreResult<()> {
        let url = self.routes.item(key)?;
        debug!("DELETE {url}");
        check(self.client.delete(url).send().await?).await?;
        Ok(())
    }
}
