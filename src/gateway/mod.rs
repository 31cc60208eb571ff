//! Analysis gateway client
//!
//! Talks to the external recitation-analysis service: submit a voice sample
//! (for a fixed verse or for open-ended detection), fetch a submission by id,
//! list a user's history. Submissions are never mutated locally; the gateway
//! owns their lifecycle and we only re-fetch.

pub mod report;

use crate::text::Locator;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use report::{normalize, RawReport, Report};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle status as reported by the service.
///
/// "processing" is a real wire value distinct from "queued"; both render as
/// "still working" and trigger no different business logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl SubmissionStatus {
    pub fn decode(s: &str) -> Self {
        match s {
            "processing" => SubmissionStatus::Processing,
            "done" => SubmissionStatus::Done,
            "failed" => SubmissionStatus::Failed,
            _ => SubmissionStatus::Queued,
        }
    }

    pub fn in_flight(self) -> bool {
        matches!(self, SubmissionStatus::Queued | SubmissionStatus::Processing)
    }
}

/// One tracked analysis request.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub user: String,
    /// Six-digit verse locator, or empty for auto-detect submissions
    pub locator: String,
    pub status: SubmissionStatus,
    pub report: Option<Report>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Gateway error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Auth, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::NotFound, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidRequest, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::ServerError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unknown, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Network issues, timeouts
    Network,
    /// Authentication failed (401, 403)
    Auth,
    /// Submission id unknown to the service (404 or empty fetch)
    NotFound,
    /// Bad request (400)
    InvalidRequest,
    /// Server error (5xx)
    ServerError,
    /// Unknown error
    Unknown,
}

/// Client contract for the analysis service.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Submit a sample targeting one specific verse.
    async fn submit_fixed(
        &self,
        user: &str,
        locator: Locator,
        media: Vec<u8>,
    ) -> Result<Submission, GatewayError>;

    /// Submit a sample for open-ended detection, optionally hinting where the
    /// recitation is expected to start.
    async fn submit_auto(
        &self,
        user: &str,
        media: Vec<u8>,
        hint: Option<Locator>,
        min_similarity: Option<f64>,
    ) -> Result<Submission, GatewayError>;

    async fn get(&self, user: &str, submission_id: &str) -> Result<Submission, GatewayError>;

    /// Most recent first.
    async fn list(&self, user: &str, limit: usize) -> Result<Vec<Submission>, GatewayError>;
}

#[async_trait]
impl<T: AnalysisGateway + ?Sized> AnalysisGateway for Arc<T> {
    async fn submit_fixed(
        &self,
        user: &str,
        locator: Locator,
        media: Vec<u8>,
    ) -> Result<Submission, GatewayError> {
        (**self).submit_fixed(user, locator, media).await
    }

    async fn submit_auto(
        &self,
        user: &str,
        media: Vec<u8>,
        hint: Option<Locator>,
        min_similarity: Option<f64>,
    ) -> Result<Submission, GatewayError> {
        (**self).submit_auto(user, media, hint, min_similarity).await
    }

    async fn get(&self, user: &str, submission_id: &str) -> Result<Submission, GatewayError> {
        (**self).get(user, submission_id).await
    }

    async fn list(&self, user: &str, limit: usize) -> Result<Vec<Submission>, GatewayError> {
        (**self).list(user, limit).await
    }
}

/// HTTP implementation of the gateway contract.
pub struct HttpAnalysisGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpAnalysisGateway {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::unknown(format!("build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
        match status.as_u16() {
            401 | 403 => GatewayError::auth(format!("authentication failed: {body}")),
            404 => GatewayError::not_found(format!("not found: {body}")),
            400 => GatewayError::invalid_request(format!("invalid request: {body}")),
            500..=599 => GatewayError::server_error(format!("server error: {body}")),
            _ => GatewayError::unknown(format!("HTTP {status}: {body}")),
        }
    }

    fn send_error(e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::network(format!("request timeout: {e}"))
        } else if e.is_connect() {
            GatewayError::network(format!("connection failed: {e}"))
        } else {
            GatewayError::unknown(format!("request failed: {e}"))
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<String, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }
        Ok(body)
    }

    fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
        serde_json::from_str(body)
            .map_err(|e| GatewayError::unknown(format!("failed to parse response: {e} - body: {body}")))
    }

    fn media_part(media: Vec<u8>) -> reqwest::multipart::Part {
        reqwest::multipart::Part::bytes(media).file_name("sample.ogg")
    }
}

#[async_trait]
impl AnalysisGateway for HttpAnalysisGateway {
    async fn submit_fixed(
        &self,
        user: &str,
        locator: Locator,
        media: Vec<u8>,
    ) -> Result<Submission, GatewayError> {
        let url = format!(
            "{}/recordings?learner_id={}&ayah_id={}",
            self.base_url, user, locator
        );
        let form = reqwest::multipart::Form::new().part("file", Self::media_part(media));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(Self::send_error)?;

        let body = Self::read_body(response).await?;
        let accepted: SubmitAccepted = Self::parse(&body)?;

        Ok(Submission {
            id: accepted.recording_id,
            user: user.to_string(),
            locator: locator.to_string(),
            status: SubmissionStatus::decode(&accepted.status),
            report: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        })
    }

    async fn submit_auto(
        &self,
        user: &str,
        media: Vec<u8>,
        hint: Option<Locator>,
        min_similarity: Option<f64>,
    ) -> Result<Submission, GatewayError> {
        let url = format!("{}/recordings/auto-detect?learner_id={}", self.base_url, user);

        let mut form = reqwest::multipart::Form::new().part("file", Self::media_part(media));
        if let Some(hint) = hint {
            form = form.text("expected_start_ayah_id", hint.to_string());
        }
        if let Some(min) = min_similarity {
            form = form.text("min_similarity", format!("{min:.2}"));
        }

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(Self::send_error)?;

        let body = Self::read_body(response).await?;
        let accepted: SubmitAccepted = Self::parse(&body)?;

        Ok(Submission {
            id: accepted.recording_id,
            user: user.to_string(),
            locator: String::new(),
            status: SubmissionStatus::decode(&accepted.status),
            report: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        })
    }

    async fn get(&self, user: &str, submission_id: &str) -> Result<Submission, GatewayError> {
        let url = format!(
            "{}/recordings?learner_id={}&recording_ids={}",
            self.base_url, user, submission_id
        );

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(Self::send_error)?;

        let body = Self::read_body(response).await?;
        let fetched: FetchResponse = Self::parse(&body)?;

        fetched
            .recordings
            .into_iter()
            .next()
            .map(|wire| map_submission(wire, user))
            .ok_or_else(|| GatewayError::not_found(format!("submission {submission_id} not found")))
    }

    async fn list(&self, user: &str, limit: usize) -> Result<Vec<Submission>, GatewayError> {
        let url = format!("{}/recordings/{}?limit={}", self.base_url, user, limit);

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(Self::send_error)?;

        let body = Self::read_body(response).await?;
        let listed: ListResponse = Self::parse(&body)?;

        Ok(listed
            .items
            .into_iter()
            .map(|wire| map_submission(wire, user))
            .collect())
    }
}

// Service wire types

#[derive(Debug, Deserialize)]
struct SubmitAccepted {
    recording_id: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    recordings: Vec<WireSubmission>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<WireSubmission>,
}

#[derive(Debug, Default, Deserialize)]
struct WireSubmission {
    #[serde(default)]
    recording_id: String,
    #[serde(rename = "ayah_id", default)]
    locator: String,
    #[serde(default)]
    status: String,
    #[serde(rename = "createdAt", default)]
    created_at: String,
    #[serde(rename = "updatedAt", default)]
    updated_at: String,
    result: Option<RawReport>,
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn map_submission(wire: WireSubmission, user: &str) -> Submission {
    Submission {
        id: wire.recording_id,
        user: user.to_string(),
        locator: wire.locator,
        status: SubmissionStatus::decode(&wire.status),
        report: wire.result.as_ref().map(normalize),
        created_at: parse_timestamp(&wire.created_at),
        updated_at: parse_timestamp(&wire.updated_at),
    }
}
