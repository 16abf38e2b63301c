use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::pipeline::capture::{IssueSearch, SearchRequest};

const SEARCH_URL: &str = "https://api.github.com/search/issues";

pub struct GithubClient {
    client: reqwest::Client,
    search_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn from_env() -> Result<Self> {
        let token = dotenv::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        let search_url =
            dotenv::var("GITHUB_SEARCH_URL").unwrap_or_else(|_| SEARCH_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .user_agent(concat!("issue-sentinel/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            search_url,
            token,
        })
    }
}

#[async_trait]
impl IssueSearch for GithubClient {
    async fn search(&self, request: &SearchRequest) -> Result<serde_json::Value> {
        let per_page = request.per_page.to_string();
        let mut req = self
            .client
            .get(&self.search_url)
            .header("Accept", "application/vnd.github.v3+json")
            .query(&[
                ("q", request.query.as_str()),
                ("sort", request.sort.as_str()),
                ("order", request.order.as_str()),
                ("per_page", per_page.as_str()),
            ]);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("token {}", token));
        }

        let resp = req
            .send()
            .await
            .context("GitHub search request failed")?
            .error_for_status()
            .context("GitHub search returned an error status")?;
        let payload: serde_json::Value =
            resp.json().await.context("Failed to parse GitHub search JSON")?;

        debug!(query = %request.query, "GitHub search complete");
        Ok(payload)
    }
}
