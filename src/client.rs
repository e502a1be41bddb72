//! Typed HTTP client for the student API.
//!
//! Requests go to `{base}/api/v1/...`. Connection failures, timeouts, and
//! transient statuses are retried with exponential backoff; the envelope is
//! unwrapped so callers get the record types directly.

use crate::error::FieldError;
use crate::model::Student;
use crate::response::{Envelope, MetaCount, Page};
use reqwest::{Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_LIMIT: u32 = 2;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(300);
const RETRY_STATUSES: &[u16] = &[408, 413, 429, 500, 502, 503, 504];

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success status or `success: false` envelope.
    #[error("{status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
        errors: Vec<FieldError>,
    },
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            ClientError::Decode(_) | ClientError::InvalidUrl(_) => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Partial update; unset fields are left unchanged.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

#[derive(Clone, Debug)]
pub struct StudentClient {
    http: reqwest::Client,
    api: Url,
    retry_limit: u32,
}

impl StudentClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        let api = Url::parse(&format!("{}/api/v1", base_url.trim_end_matches('/')))
            .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if api.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(StudentClient {
            http,
            api,
            retry_limit: DEFAULT_RETRY_LIMIT,
        })
    }

    /// API url with `segments` appended; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.api.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.api.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    async fn send_with_retry<Q, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        let mut attempt = 0;
        loop {
            let mut req = self.http.request(method.clone(), url.clone());
            if let Some(q) = query {
                req = req.query(q);
            }
            if let Some(b) = body {
                req = req.json(b);
            }
            tracing::debug!(%method, %url, attempt, "request");
            match req.send().await {
                Ok(resp) if RETRY_STATUSES.contains(&resp.status().as_u16()) && attempt < self.retry_limit => {
                    tracing::warn!(%method, %url, status = %resp.status(), "retrying");
                }
                Ok(resp) => return Ok(resp),
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.retry_limit => {
                    tracing::warn!(%method, %url, error = %e, "retrying");
                }
                Err(e) => return Err(e.into()),
            }
            tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt)).await;
            attempt += 1;
        }
    }

    async fn call<T, Q, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let resp = self.send_with_retry(method, segments, query, body).await?;
        let status = resp.status();
        let text = resp.text().await?;
        let envelope: Envelope<Value> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Api {
                    status,
                    message: text,
                    errors: Vec::new(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        if !status.is_success() || !envelope.success {
            return Err(ClientError::Api {
                status,
                message: envelope.message,
                errors: envelope.errors.unwrap_or_default(),
            });
        }
        Ok(serde_json::from_value(envelope.data)?)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        self.call::<T, (), ()>(Method::GET, segments, None, None).await
    }

    pub async fn list(&self) -> Result<Vec<Student>, ClientError> {
        self.get(&["student", "list"]).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Student, ClientError> {
        self.get(&["student", &id.to_string()]).await
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Student, ClientError> {
        self.get(&["student", "code", code]).await
    }

    pub async fn create(&self, student: &NewStudent) -> Result<Student, ClientError> {
        self.call::<_, (), _>(Method::POST, &["student", "create"], None, Some(student))
            .await
    }

    /// Sends `{data: [...]}`; returns the number of rows created.
    pub async fn bulk_create(&self, students: &[NewStudent]) -> Result<u64, ClientError> {
        let body = serde_json::json!({ "data": students });
        let meta: MetaCount = self
            .call::<_, (), _>(Method::POST, &["student", "bulk"], None, Some(&body))
            .await?;
        Ok(meta.count)
    }

    pub async fn update(&self, id: i64, patch: &StudentPatch) -> Result<Student, ClientError> {
        self.call::<_, (), _>(Method::PUT, &["student", &id.to_string()], None, Some(patch))
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<Student, ClientError> {
        self.call::<_, (), ()>(Method::DELETE, &["student", &id.to_string()], None, None)
            .await
    }

    pub async fn search(&self, term: &str) -> Result<Vec<Student>, ClientError> {
        self.call::<_, _, ()>(Method::GET, &["student", "search"], Some(&[("q", term)]), None)
            .await
    }

    pub async fn paginated(&self, query: &PageQuery) -> Result<Page<Student>, ClientError> {
        self.call::<_, _, ()>(Method::GET, &["student", "paginated"], Some(query), None)
            .await
    }

    pub async fn count(&self) -> Result<u64, ClientError> {
        let meta: MetaCount = self.get(&["student", "count"]).await?;
        Ok(meta.count)
    }

    /// Plain-text liveness; `true` when the server answers `Ok`.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self.send_with_retry::<(), ()>(Method::GET, &["health"], None, None).await?;
        Ok(resp.status().is_success() && resp.text().await? == "Ok")
    }
}
