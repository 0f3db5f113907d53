use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::language::Language;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api";

#[derive(Serialize)]
struct QueryRequest<'a> {
    message: &'a str,
    language: &'a str,
}

#[derive(Serialize)]
struct LocationQueryRequest<'a> {
    latitude: f64,
    longitude: f64,
    language: &'a str,
}

/// A reply from the groundwater service, normalised for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply {
    pub reply_text: String,
    pub location: Option<String>,
}

impl BackendReply {
    /// Use `reply` when it is a string, otherwise show the whole body as JSON.
    pub fn from_value(body: Value) -> Self {
        let location = body
            .get("location")
            .and_then(Value::as_str)
            .filter(|loc| !loc.is_empty())
            .map(str::to_string);

        let reply_text = match body.get("reply") {
            Some(Value::String(reply)) => reply.clone(),
            _ => body.to_string(),
        };

        Self { reply_text, location }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn query(&self, message: &str, language: Language) -> ClientResult<BackendReply>;

    async fn query_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        language: Language,
    ) -> ClientResult<BackendReply>;

    fn report_url(&self, location: &str) -> ClientResult<Url>;

    /// Fetch the report for `location` and write it into `dir`, returning the file path.
    async fn download_report(&self, location: &str, dir: &Path) -> ClientResult<PathBuf>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        url: Url,
        body: &T,
    ) -> ClientResult<BackendReply> {
        info!(%url, "sending query");

        let response = self.client.post(url).json(body).send().await?;

        // Error statuses still carry a JSON body, which is shown as the reply
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "query answered with error status");
        }

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)?;
        debug!(%body, "query response");

        Ok(BackendReply::from_value(body))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn query(&self, message: &str, language: Language) -> ClientResult<BackendReply> {
        let url = self.endpoint(&["query"])?;
        let request = QueryRequest {
            message,
            language: language.code(),
        };
        self.post_json(url, &request).await
    }

    async fn query_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        language: Language,
    ) -> ClientResult<BackendReply> {
        let url = self.endpoint(&["query_by_location"])?;
        let request = LocationQueryRequest {
            latitude,
            longitude,
            language: language.code(),
        };
        self.post_json(url, &request).await
    }

    fn report_url(&self, location: &str) -> ClientResult<Url> {
        self.endpoint(&["report", location])
    }

    async fn download_report(&self, location: &str, dir: &Path) -> ClientResult<PathBuf> {
        let url = self.report_url(location)?;
        info!(%url, "downloading report");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(report_file_name(location));
        tokio::fs::write(&path, &bytes).await?;

        Ok(path)
    }
}

/// Matches the filename the service puts in its Content-Disposition header.
pub fn report_file_name(location: &str) -> String {
    let safe: String = location
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("groundwater_report_{}.xlsx", safe)
}
