use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::types::Document;
use super::{SearchBackend, SearchError};

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

/// Google Custom Search JSON API.
pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    cx: String,
    num: u32,
}

impl GoogleSearch {
    pub fn new(api_key: String, cx: String, num: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create search HTTP client")?;

        Ok(Self {
            client,
            api_key,
            cx,
            // the API rejects anything outside 1..=10
            num: num.clamp(1, 10),
        })
    }
}

#[async_trait]
impl SearchBackend for GoogleSearch {
    fn name(&self) -> &str {
        "google_custom_search"
    }

    async fn search(&self, query: &str) -> Result<Vec<Document>, SearchError> {
        if self.api_key.is_empty() || self.cx.is_empty() {
            return Err(SearchError::NotConfigured("GOOGLE_CSE_API_KEY and GOOGLE_CSE_CX"));
        }

        let num = self.num.to_string();
        let resp = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body: CseResponse = resp.json().await?;
        Ok(body
            .items
            .into_iter()
            .map(|item| Document::new(&item.title, &item.snippet, &item.link, query))
            .collect())
    }
}
