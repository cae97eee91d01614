//! PostgREST-style HTTP event store client.
//!
//! Speaks the conventions of a Supabase-hosted table: `POST` to insert,
//! `GET ?select=*` to read, `DELETE ?id=eq.<label>` for the per-identity
//! delete. The service assigns `timestamp` on insert.

use crate::{EventStore, LocationRecord, StoreError};
use async_trait::async_trait;
use lookout_core::Location;
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct InsertRow<'a> {
    id: &'a str,
    location: Location,
}

/// Event store backed by a PostgREST-compatible endpoint.
pub struct RestEventStore {
    client: reqwest::Client,
    table_url: String,
    api_key: String,
}

impl RestEventStore {
    /// Build a client for `<base_url>/rest/v1/<table>`.
    ///
    /// `timeout` bounds every call so a slow store stalls one cycle, not
    /// the whole loop.
    pub fn new(
        base_url: &str,
        table: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, &self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl EventStore for RestEventStore {
    async fn insert(&self, label: &str, location: Location) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST)
            .json(&InsertRow {
                id: label,
                location,
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn select_all(&self) -> Result<Vec<LocationRecord>, StoreError> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "*")])
            .send()
            .await?;
        let rows = Self::check(response).await?.json().await?;
        Ok(rows)
    }

    async fn delete_where(&self, label: &str) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE)
            .query(&[("id", format!("eq.{label}"))])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
