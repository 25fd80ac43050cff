use std::marker::PhantomData;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};

use crate::config::{PortalConfig, SectionConfig};
use crate::error::{FeedError, Result};
use crate::models::{Envelope, FeedEntry, Fetched};

/// Loads one entry by id. `None` means "nothing more to show", whatever the cause.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Entry: FeedEntry;

    async fn fetch(&self, id: i64) -> Option<Fetched<Self::Entry>>;
}

/// Posts `<id_field>=<id>` to a section endpoint and decodes the envelope.
pub struct HttpFetcher<E> {
    client: Client,
    endpoint: String,
    id_field: String,
    _entry: PhantomData<fn() -> E>,
}

impl<E: FeedEntry> HttpFetcher<E> {
    pub fn new(config: &PortalConfig, section: &SectionConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, section))
    }

    pub fn with_client(client: Client, section: &SectionConfig) -> Self {
        Self {
            client,
            endpoint: section.endpoint.clone(),
            id_field: section.id_field.clone(),
            _entry: PhantomData,
        }
    }

    async fn try_fetch(&self, id: i64) -> Result<Fetched<E>> {
        let id_value = id.to_string();
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[(self.id_field.as_str(), id_value.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FeedError::NotFound);
        }
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        decode_envelope(&bytes)
    }
}

/// Decode a response body into the entry and its cursor.
pub fn decode_envelope<E: FeedEntry>(body: &[u8]) -> Result<Fetched<E>> {
    let envelope: Envelope<E> = serde_json::from_slice(body)?;
    envelope.into_fetched()
}

/// The backend has been seen answering with a different id than asked for.
/// That is logged, and the entry is used anyway.
pub fn check_requested_id<E: FeedEntry>(requested: i64, fetched: &Fetched<E>) {
    if fetched.entry.id() != requested {
        warn!(
            "Requested entry {} but received entry {}",
            requested,
            fetched.entry.id()
        );
    }
}

#[async_trait]
impl<E: FeedEntry> Fetcher for HttpFetcher<E> {
    type Entry = E;

    async fn fetch(&self, id: i64) -> Option<Fetched<E>> {
        match self.try_fetch(id).await {
            Ok(fetched) => {
                check_requested_id(id, &fetched);
                debug!("Fetched entry {} (next: {:?})", fetched.entry.id(), fetched.next_id);
                Some(fetched)
            }
            Err(e) if e.is_not_found() => {
                debug!("Entry {} not found at {}", id, self.endpoint);
                None
            }
            Err(e) => {
                warn!("Failed to fetch entry {} from {}: {}", id, self.endpoint, e);
                None
            }
        }
    }
}
