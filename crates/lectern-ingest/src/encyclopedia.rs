//! Wikipedia search and plain-text article extraction.

use std::collections::HashMap;

use lectern_core::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::web::load_error;

pub const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// A fetched encyclopedia article.
#[derive(Debug, Clone)]
pub struct Article {
    pub page_id: u64,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    pageid: u64,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    title: Option<String>,
    extract: Option<String>,
}

/// Client for the MediaWiki query API.
#[derive(Debug, Clone)]
pub struct Encyclopedia {
    client: Client,
    api_url: String,
}

impl Encyclopedia {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            api_url: WIKIPEDIA_API_URL.to_string(),
        }
    }

    /// Point at another MediaWiki endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Fetch up to `max_docs` articles matching `query`.
    ///
    /// No match is not an error: the result is simply empty. So is
    /// `max_docs == 0`, which sends no request.
    pub async fn search(&self, query: &str, max_docs: usize) -> Result<Vec<Article>> {
        if max_docs == 0 {
            return Ok(Vec::new());
        }
        let limit = max_docs.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| load_error(&self.api_url, e))?;

        if !response.status().is_success() {
            return Err(Error::Load(format!(
                "encyclopedia search for '{}' returned HTTP {}",
                query,
                response.status()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Load(format!("bad search response for '{}': {}", query, e)))?;
        let hits = parsed.query.map(|q| q.search).unwrap_or_default();
        debug!("Encyclopedia query '{}' matched {} pages", query, hits.len());

        let mut articles = Vec::with_capacity(hits.len());
        for hit in hits.into_iter().take(max_docs) {
            if let Some(article) = self.fetch_extract(&hit).await? {
                articles.push(article);
            }
        }
        Ok(articles)
    }

    async fn fetch_extract(&self, hit: &SearchHit) -> Result<Option<Article>> {
        let page_id = hit.pageid.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("pageids", page_id.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| load_error(&self.api_url, e))?;

        if !response.status().is_success() {
            return Err(Error::Load(format!(
                "extract for page {} returned HTTP {}",
                hit.pageid,
                response.status()
            )));
        }

        let parsed: ExtractResponse = response
            .json()
            .await
            .map_err(|e| Error::Load(format!("bad extract response: {}", e)))?;

        let page = parsed
            .query
            .and_then(|mut q| q.pages.remove(&page_id));
        Ok(page.and_then(|p| {
            let text = p.extract.filter(|t| !t.trim().is_empty())?;
            Some(Article {
                page_id: hit.pageid,
                title: p.title.unwrap_or_else(|| hit.title.clone()),
                text,
            })
        }))
    }
}
