//! Data API client for the hosted movie collection

use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, instrument};
use url::Url;

use super::error::CatalogError;
use super::{Movie, MovieStore, SimilarMovie};
use crate::config::CatalogConfig;

/// Response envelope shared by every Data API command
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindData<D> {
    documents: Vec<D>,
    #[serde(rename = "nextPageState", default)]
    next_page_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindOneData<D> {
    document: Option<D>,
}

/// A collection reached through the Data API JSON protocol
///
/// Every operation is a single `POST` of a command document to
/// `{endpoint}/api/json/v1/{keyspace}/{collection}` authenticated with the
/// `Token` header.
#[derive(Clone)]
pub struct DataApiCollection {
    http: ReqwestClient,
    url: Url,
    token: String,
}

impl DataApiCollection {
    /// Connect to the collection described by `config`
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            CatalogError::Configuration(
                "ASTRA_DB_API_ENDPOINT environment variable is not set".to_string(),
            )
        })?;
        let token = config.token.clone().ok_or_else(|| {
            CatalogError::Configuration(
                "ASTRA_DB_APPLICATION_TOKEN environment variable is not set".to_string(),
            )
        })?;

        let url = Url::parse(&format!(
            "{}/api/json/v1/{}/{}",
            endpoint.trim_end_matches('/'),
            config.keyspace,
            config.collection
        ))
        .map_err(|e| CatalogError::Configuration(format!("Invalid endpoint URL: {}", e)))?;

        let http = ReqwestClient::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { http, url, token })
    }

    /// URL commands are posted to
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Post one command and unwrap its `data`
    #[instrument(skip(self, command), level = "debug")]
    async fn execute<T: DeserializeOwned>(&self, command: Value) -> Result<T, CatalogError> {
        debug!("Sending Data API command to {}", self.url);

        let response = self
            .http
            .post(self.url.clone())
            .header("Token", &self.token)
            .json(&command)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Data API error: {} - {}", status, body);
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body)
            .inspect_err(|e| error!("Failed to parse response: {}", e))?;

        if !envelope.errors.is_empty() {
            let message = envelope
                .errors
                .iter()
                .map(|e| match (&e.error_code, &e.message) {
                    (Some(code), Some(message)) => format!("{}: {}", code, message),
                    (None, Some(message)) => message.clone(),
                    (Some(code), None) => code.clone(),
                    (None, None) => "unknown error".to_string(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            error!("Data API rejected command: {}", message);
            return Err(CatalogError::Api { message });
        }

        envelope
            .data
            .ok_or_else(|| CatalogError::Decode("Response contained no data".to_string()))
    }

    async fn find<D: DeserializeOwned>(&self, find: Value) -> Result<FindData<D>, CatalogError> {
        self.execute(json!({ "find": find })).await
    }
}

impl MovieStore for DataApiCollection {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> Result<Option<Movie>, CatalogError> {
        let data: FindOneData<Movie> = self
            .execute(json!({ "findOne": { "filter": { "_id": id } } }))
            .await?;
        Ok(data.document)
    }

    #[instrument(skip(self, vector), fields(dimensions = vector.len()))]
    async fn find_similar(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarMovie>, CatalogError> {
        let data: FindData<SimilarMovie> = self
            .find(json!({
                "filter": {},
                "sort": { "$vector": vector },
                "projection": { "$vector": 0 },
                "options": { "limit": limit, "includeSimilarity": true }
            }))
            .await?;
        Ok(data.documents)
    }

    #[instrument(skip(self))]
    async fn find_by_genre(
        &self,
        genre: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<Movie>, CatalogError> {
        let data: FindData<Movie> = self
            .find(json!({
                "filter": {
                    "Genre": { "$regex": regex::escape(genre), "$options": "i" },
                    "_id": { "$ne": exclude_id }
                },
                "projection": { "$vector": 0 },
                "options": { "limit": limit }
            }))
            .await?;
        Ok(data.documents)
    }

    #[instrument(skip(self))]
    async fn search_text(&self, term: &str, limit: usize) -> Result<Vec<Movie>, CatalogError> {
        let data: FindData<Movie> = self
            .find(json!({
                "filter": {},
                "sort": { "$vectorize": term },
                "projection": { "$vector": 0 },
                "options": { "limit": limit }
            }))
            .await?;
        Ok(data.documents)
    }

    #[instrument(skip(self))]
    async fn list(&self, limit: Option<usize>) -> Result<Vec<Movie>, CatalogError> {
        let mut movies = Vec::new();
        let mut page_state: Option<String> = None;

        loop {
            let mut options = json!({});
            if let Some(state) = &page_state {
                options["pageState"] = json!(state);
            }

            let page: FindData<Movie> = self
                .find(json!({
                    "filter": {},
                    "projection": { "$vector": 0 },
                    "options": options
                }))
                .await?;
            movies.extend(page.documents);

            if limit.is_some_and(|limit| movies.len() >= limit) {
                break;
            }
            match page.next_page_state {
                Some(state) => page_state = Some(state),
                None => break,
            }
        }

        if let Some(limit) = limit {
            movies.truncate(limit);
        }
        debug!("Listed {} movies", movies.len());
        Ok(movies)
    }
}
