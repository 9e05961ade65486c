use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::markup::StructuredNode;
use crate::score::Score;

const FORMAT_PARAM: &str = "format";
const FORMAT_JSON: &str = "json";

/// Every way a retrieval can fail. None of them are retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("empty response body")]
    EmptyBody,
    #[error("response is markup, not structured data")]
    HtmlBody,
    #[error("malformed structured data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("document has no review object")]
    MissingReview,
}

/// Address of the structured representation of `page`: `format=json`
/// replaces any existing `format` parameter, other parameters are kept.
pub fn structured_url(page: &Url) -> Url {
    let kept: Vec<(String, String)> = page
        .query_pairs()
        .filter(|(k, _)| k != FORMAT_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = page.clone();
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(FORMAT_PARAM, FORMAT_JSON);
    url
}

pub struct ReviewFetcher {
    client: Client,
}

impl ReviewFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Reuse a client the host already configured.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Retrieve the structured document behind `page`. The outer shape is not
    /// checked here.
    pub async fn fetch_document(&self, page: &Url) -> Result<Value, FetchError> {
        let url = structured_url(page);
        debug!("Fetching structured review: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let text = response.text().await?;
        parse_document(&text)
    }

    /// Plain GET of an HTML page, for hosts that load the page themselves.
    pub async fn fetch_page_html(&self, page: &Url) -> Result<String, FetchError> {
        let response = self.client.get(page.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.text().await?)
    }
}

/// An HTML error page served with a success status starts with `<`.
pub fn parse_document(text: &str) -> Result<Value, FetchError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FetchError::EmptyBody);
    }
    if trimmed.starts_with('<') {
        return Err(FetchError::HtmlBody);
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[derive(Deserialize)]
struct Envelope {
    review: Option<ReviewFields>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewFields {
    #[serde(default)]
    body: Value,
    #[serde(default)]
    header_props: Value,
}

/// The two fields of a review document the pipeline uses.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPayload {
    /// `None` when `review.body` is missing or not a sequence.
    pub body: Option<Vec<StructuredNode>>,
    /// `None` when absent, non-numeric or out of range.
    pub score: Option<Score>,
}

impl ReviewPayload {
    pub fn from_document(document: &Value) -> Result<Self, PayloadError> {
        let envelope = Envelope::deserialize(document).map_err(|_| PayloadError::MissingReview)?;
        let review = envelope.review.ok_or(PayloadError::MissingReview)?;

        let body = review
            .body
            .as_array()
            .map(|nodes| StructuredNode::from_values(nodes));
        let score = review
            .header_props
            .pointer("/musicRating/score")
            .and_then(Value::as_f64)
            .and_then(Score::new);

        Ok(Self { body, score })
    }
}

// ── Tests ──
