//! HTTP client for remote commands against a running server.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

/// Client for the FacilityDesk API.
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

/// Query parameters for listing assets.
#[derive(Debug, Default)]
pub struct ListAssetsParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
}

/// Query parameters for listing tickets.
#[derive(Debug, Default)]
pub struct ListTicketsParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub page: Option<u32>,
}

/// A page of results as raw JSON rows.
#[derive(Debug, Deserialize)]
pub struct Page {
    pub data: Vec<Value>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl ApiClient {
    /// Creates a client for the given base URL, logging in with the
    /// provided credentials.
    pub async fn login(base_url: &str, username: &str, password: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .post(format!("{}/api/v1/auth/login", base_url))
            .json(&serde_json::json!({"username": username, "password": password}))
            .send()
            .await
            .context("Login request failed")?;

        if !response.status().is_success() {
            bail!("Login failed: {}", response.status());
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Service health, no login required.
    pub async fn health(base_url: &str) -> Result<Value> {
        let response = reqwest::get(format!("{}/health", base_url.trim_end_matches('/')))
            .await
            .context("Health request failed")?;

        response.json().await.context("Invalid health response")
    }

    /// Lists assets.
    pub async fn list_assets(&self, params: &ListAssetsParams) -> Result<Page> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(search) = &params.search {
            query.push(("search", search.clone()));
        }
        if let Some(status) = &params.status {
            query.push(("status", status.clone()));
        }
        if let Some(page) = params.page {
            query.push(("page", page.to_string()));
        }

        self.get_page("/api/v1/assets", &query).await
    }

    /// Lists tickets.
    pub async fn list_tickets(&self, params: &ListTicketsParams) -> Result<Page> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(status) = &params.status {
            query.push(("status", status.clone()));
        }
        if let Some(priority) = &params.priority {
            query.push(("priority", priority.clone()));
        }
        if let Some(page) = params.page {
            query.push(("page", page.to_string()));
        }

        self.get_page("/api/v1/tickets", &query).await
    }

    /// Fetches a ticket with its chat thread.
    pub async fn get_ticket(&self, id: Uuid) -> Result<(Value, Vec<Value>)> {
        let ticket: Value = self.get_json(&format!("/api/v1/tickets/{}", id)).await?;
        let messages: Vec<Value> = self
            .get_json(&format!("/api/v1/tickets/{}/messages", id))
            .await?;

        Ok((ticket, messages))
    }

    /// Items at or below their reorder level.
    pub async fn low_stock(&self) -> Result<Vec<Value>> {
        self.get_json("/api/v1/consumables/low-stock").await
    }

    /// Dashboard summary counters.
    pub async fn metrics_summary(&self) -> Result<Value> {
        self.get_json("/api/v1/metrics/summary").await
    }

    async fn get_page(&self, path: &str, query: &[(&str, String)]) -> Result<Page> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", path))?;

        if !response.status().is_success() {
            bail!("Request to {} failed: {}", path, response.status());
        }

        response.json().await.context("Invalid response body")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .with_context(|| format!("Request to {} failed", path))?;

        if !response.status().is_success() {
            bail!("Request to {} failed: {}", path, response.status());
        }

        response.json().await.context("Invalid response body")
    }
}
