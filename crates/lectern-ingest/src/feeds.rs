//! External context feeds: latest news and current weather.
//!
//! Both return the provider's JSON untouched; callers embed it in a prompt.

use std::time::Duration;

use lectern_core::{require_env, Error, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::web::http_client;

pub const NEWS_API_URL: &str = "https://newsdata.io/api/1/latest";
pub const WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

const FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// GET `url` with `params` and decode the JSON body.
///
/// Network failures and timeouts are transport errors.
async fn get_json(client: &Client, url: &str, params: &[(&str, &str)]) -> Result<Value> {
    let response = client.get(url).query(params).send().await.map_err(|e| {
        if e.is_timeout() {
            Error::Transport(format!("timed out calling {}", url))
        } else {
            Error::Transport(format!("request to {} failed: {}", url, e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Transport(format!(
            "{} returned HTTP {}: {}",
            url, status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| Error::Transport(format!("invalid JSON from {}: {}", url, e)))
}

/// newsdata.io client.
#[derive(Debug, Clone)]
pub struct NewsFeed {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NewsFeed {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(FEED_TIMEOUT)?,
            api_key: api_key.into(),
            base_url: NEWS_API_URL.to_string(),
        })
    }

    /// Build from `NEWS_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(require_env("NEWS_API_KEY")?)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Latest articles matching `query`.
    pub async fn latest(&self, query: &str) -> Result<Value> {
        debug!("Fetching news for '{}'", query);
        get_json(
            &self.client,
            &self.base_url,
            &[("q", query), ("apikey", self.api_key.as_str())],
        )
        .await
    }
}

/// OpenWeatherMap current-conditions client.
#[derive(Debug, Clone)]
pub struct WeatherFeed {
    client: Client,
    api_key: String,
    base_url: String,
}

impl WeatherFeed {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(FEED_TIMEOUT)?,
            api_key: api_key.into(),
            base_url: WEATHER_API_URL.to_string(),
        })
    }

    /// Build from `WEATHER_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(require_env("WEATHER_API_KEY")?)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Current weather for `city`, metric units.
    pub async fn current(&self, city: &str) -> Result<Value> {
        debug!("Fetching weather for '{}'", city);
        get_json(
            &self.client,
            &self.base_url,
            &[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ],
        )
        .await
    }
}
