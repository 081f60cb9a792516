//! Web page fetching and HTML-to-text conversion.

use std::time::Duration;

use lectern_core::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

pub const USER_AGENT: &str = concat!("lectern/", env!("CARGO_PKG_VERSION"));

/// Text and title of a fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub text: String,
    pub title: Option<String>,
}

/// Build an HTTP client with a per-request deadline.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::Http(e.to_string()))
}

/// Convert a reqwest failure into a load error, naming timeouts explicitly.
pub(crate) fn load_error(url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Load(format!("timed out fetching {}", url))
    } else {
        Error::Load(format!("request to {} failed: {}", url, e))
    }
}

/// GET a page. Non-2xx statuses and timeouts are load errors.
pub async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage> {
    debug!("Fetching {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| load_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Load(format!("{} returned HTTP {}", url, status)));
    }

    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("html"))
        .unwrap_or(false);

    let body = response.text().await.map_err(|e| load_error(url, e))?;

    if is_html {
        Ok(FetchedPage {
            title: html_title(&body),
            text: html_to_text(&body),
        })
    } else {
        Ok(FetchedPage {
            text: body,
            title: None,
        })
    }
}

/// Convert HTML to Markdown-flavoured text, dropping scripts and styles.
pub fn html_to_text(html: &str) -> String {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript", "head"])
        .build();
    match converter.convert(html) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("HTML conversion failed, keeping raw markup: {}", e);
            html.to_string()
        }
    }
}

/// Contents of the first `<title>` element.
pub fn html_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let content_start = open + lower[open..].find('>')? + 1;
    let content_end = content_start + lower[content_start..].find("</title>")?;
    let title = html[content_start..content_end].trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}
