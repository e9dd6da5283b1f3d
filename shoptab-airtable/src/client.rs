//! The Airtable REST client.
//!
//! Each call is a single synchronous round-trip from the caller's point of
//! view: no retries, no pagination (the bridge only ever inspects the first
//! match of a query). Requests carry a bounded timeout so a stalled remote
//! call fails instead of hanging the request that triggered it.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

/// Root of the Airtable records API. Note the trailing slash: table paths
/// are joined onto it.
pub const DEFAULT_BASE_URL: &str = "https://api.airtable.com/v0/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced by the Airtable client.
#[derive(Debug, thiserror::Error)]
pub enum AirtableError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Airtable returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the table path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// A record as returned by the records API.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RecordList {
    #[serde(default)]
    records: Vec<Record>,
}

/// Client for a single Airtable base.
#[derive(Debug, Clone)]
pub struct AirtableClient {
    http: Client,
    base_url: Url,
    base_id: String,
    token: String,
}

impl AirtableClient {
    /// Create a new client for the given base.
    ///
    /// * `token` – static bearer credential for the Airtable API.
    /// * `base_id` – the base (workspace) identifier, e.g. `appXXXXXXXXXXXXXX`.
    pub fn new(token: impl Into<String>, base_id: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("valid default base URL"),
            base_id: base_id.into(),
            token: token.into(),
        }
    }

    /// Replace the API root (e.g. to point at a local stub). The URL must
    /// end with a trailing slash.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure a proxy or a different timeout).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /{base}/{table}?filterByFormula=…` – list records matching a
    /// formula.
    pub async fn query(&self, table: &str, formula: &str) -> Result<Vec<Record>, AirtableError> {
        let url = self.table_url(table)?;
        tracing::debug!(table, formula, "querying airtable");

        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("filterByFormula", formula)])
            .send()
            .await?;

        let list: RecordList = parse_response(resp).await?;
        Ok(list.records)
    }

    /// Run a formula query and return the first matching record, if any.
    ///
    /// Airtable does not enforce uniqueness on the queried fields; when
    /// several records match, whichever the API lists first wins.
    pub async fn first_match(
        &self,
        table: &str,
        formula: &str,
    ) -> Result<Option<Record>, AirtableError> {
        Ok(self.query(table, formula).await?.into_iter().next())
    }

    /// `POST /{base}/{table}` – create a record from a field map.
    pub async fn create(
        &self,
        table: &str,
        fields: serde_json::Value,
    ) -> Result<Record, AirtableError> {
        let url = self.table_url(table)?;
        tracing::debug!(table, "creating airtable record");

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `PATCH /{base}/{table}/{record}` – update a subset of a record's
    /// fields; fields not named are left untouched.
    pub async fn update(
        &self,
        table: &str,
        record_id: &str,
        fields: serde_json::Value,
    ) -> Result<Record, AirtableError> {
        let url = self.record_url(table, record_id)?;
        tracing::debug!(table, record_id, "patching airtable record");

        let resp = self
            .http
            .patch(url)
            .bearer_auth(&self.token)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        parse_response(resp).await
    }

    fn table_url(&self, table: &str) -> Result<Url, AirtableError> {
        Ok(self.base_url.join(&format!("{}/{table}", self.base_id))?)
    }

    fn record_url(&self, table: &str, record_id: &str) -> Result<Url, AirtableError> {
        Ok(self
            .base_url
            .join(&format!("{}/{table}/{record_id}", self.base_id))?)
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, AirtableError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AirtableError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(AirtableError::Json)
}
