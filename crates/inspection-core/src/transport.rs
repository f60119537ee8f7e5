//! SODA query parameters and the HTTP transport
//!
//! The fetcher talks to the dataset only through [`Transport`], so tests can
//! swap in a scripted fake without a network.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AppToken;
use crate::error::FetchError;

/// Query-string parameters understood by the SODA endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SodaQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SodaQuery {
    /// `$select=count(*)` over the predicate
    pub fn count(where_clause: Option<String>) -> Self {
        Self {
            select: Some("count(*)".to_string()),
            where_clause,
            ..Self::default()
        }
    }

    /// Newest-first rows over the predicate
    pub fn rows(where_clause: Option<String>, limit: usize) -> Self {
        Self {
            where_clause,
            order: Some("insp_date DESC".to_string()),
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Distinct city names
    pub fn distinct_cities(limit: usize) -> Self {
        Self {
            select: Some("restcity".to_string()),
            group: Some("restcity".to_string()),
            order: Some("restcity".to_string()),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn is_count(&self) -> bool {
        self.select.as_deref() == Some("count(*)")
    }

    pub fn is_city_list(&self) -> bool {
        self.group.as_deref() == Some("restcity")
    }

    /// `$`-prefixed query-string pairs, with the token appended last
    pub fn to_params(&self, token: Option<&AppToken>) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(select) = &self.select {
            params.push(("$select", select.clone()));
        }
        if let Some(where_clause) = &self.where_clause {
            params.push(("$where", where_clause.clone()));
        }
        if let Some(group) = &self.group {
            params.push(("$group", group.clone()));
        }
        if let Some(order) = &self.order {
            params.push(("$order", order.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("$limit", limit.to_string()));
        }
        if let Some(token) = token {
            params.push(("$$app_token", token.expose().to_string()));
        }
        params
    }
}

/// Something that can answer a SODA query with a JSON body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn query(&self, query: &SodaQuery, token: Option<&AppToken>) -> Result<Value, FetchError>;
}

/// reqwest-backed transport for the live endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("insightbites/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn query(&self, query: &SodaQuery, token: Option<&AppToken>) -> Result<Value, FetchError> {
        tracing::debug!(?query, "SODA request");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.to_params(token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}
