//! Client for the remote lecturer registry.
//!
//! The engine only relies on the `RegistryClient` contract. The HTTP
//! implementation below is what a host wires in production; tests use
//! scripted in-process implementations.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use credreview_core::{
    LecturerId, LecturerSubmission, Mutation, MutationAction, SubjectId, SubjectKind,
};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::Config;

/// Acknowledgement returned by every registry mutation.
///
/// Only an explicit `true` counts as success. A missing flag is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationAck {
    #[serde(default)]
    pub success: Option<bool>,
}

impl MutationAck {
    pub fn succeeded() -> Self {
        Self {
            success: Some(true),
        }
    }

    pub fn refused() -> Self {
        Self {
            success: Some(false),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}

/// Operations the review engine needs from the registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch a lecturer's profile and attached credentials.
    async fn fetch_lecturer_submission(
        &self,
        lecturer_id: &LecturerId,
    ) -> Result<LecturerSubmission>;

    /// Fetch the IDs of lecturers awaiting review.
    async fn fetch_pending_lecturers(&self) -> Result<Vec<LecturerId>>;

    async fn approve_lecturer(&self, lecturer_id: &LecturerId) -> Result<MutationAck>;

    async fn reject_lecturer(&self, lecturer_id: &LecturerId, note: &str) -> Result<MutationAck>;

    async fn approve_degree(&self, degree_id: &SubjectId) -> Result<MutationAck>;

    async fn reject_degree(&self, degree_id: &SubjectId, note: &str) -> Result<MutationAck>;

    async fn approve_certification(&self, certificate_id: &SubjectId) -> Result<MutationAck>;

    async fn reject_certification(
        &self,
        certificate_id: &SubjectId,
        note: &str,
    ) -> Result<MutationAck>;
}

/// Issue the registry call matching a mutation.
pub async fn dispatch_mutation(
    registry: &dyn RegistryClient,
    mutation: &Mutation,
) -> Result<MutationAck> {
    let id = &mutation.subject.id;
    match (mutation.subject.kind, &mutation.action) {
        (SubjectKind::Lecturer, MutationAction::Approve) => {
            registry.approve_lecturer(&LecturerId(id.0.clone())).await
        }
        (SubjectKind::Lecturer, MutationAction::Reject { note }) => {
            registry
                .reject_lecturer(&LecturerId(id.0.clone()), note)
                .await
        }
        (SubjectKind::Degree, MutationAction::Approve) => registry.approve_degree(id).await,
        (SubjectKind::Degree, MutationAction::Reject { note }) => {
            registry.reject_degree(id, note).await
        }
        (SubjectKind::Certificate, MutationAction::Approve) => {
            registry.approve_certification(id).await
        }
        (SubjectKind::Certificate, MutationAction::Reject { note }) => {
            registry.reject_certification(id, note).await
        }
    }
}

#[derive(Debug, Serialize)]
struct RejectRequest<'a> {
    note: &'a str,
}

#[derive(Debug, Deserialize)]
struct PendingLecturersResponse {
    lecturers: Vec<LecturerId>,
}

/// HTTP implementation of `RegistryClient`.
#[derive(Clone)]
pub struct HttpRegistryClient {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpRegistryClient {
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid registry base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Registry base URL cannot carry a path: {}", base_url);
        }

        let client = Client::builder()
            .user_agent("credreview/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.registry_base_url, config.registry_api_token.clone())
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Registry base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;

        let response = self
            .authorize(self.client.get(url.clone()))
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send registry request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!("Registry API error for GET {}: {} - {}", url, status, error_text);
            bail!("Registry API error: {} - {}", status, error_text);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse registry response from {}", url))
    }

    async fn post_mutation(&self, segments: &[&str], note: Option<&str>) -> Result<MutationAck> {
        let url = self.endpoint(segments)?;

        let mut request_builder = self
            .authorize(self.client.post(url.clone()))
            .header("Accept", "application/json");
        if let Some(note) = note {
            request_builder = request_builder.json(&RejectRequest { note });
        }

        let response = request_builder
            .send()
            .await
            .with_context(|| format!("Failed to send registry mutation to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!(
                "Registry API error for POST {}: {} - {}",
                url, status, error_text
            );
            bail!("Registry API error: {} - {}", status, error_text);
        }

        response
            .json::<MutationAck>()
            .await
            .with_context(|| format!("Failed to parse mutation acknowledgement from {}", url))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn fetch_lecturer_submission(
        &self,
        lecturer_id: &LecturerId,
    ) -> Result<LecturerSubmission> {
        info!("Fetching submission for lecturer {}", lecturer_id);
        self.get_json(&["lecturers", &lecturer_id.0, "submission"])
            .await
    }

    async fn fetch_pending_lecturers(&self) -> Result<Vec<LecturerId>> {
        let response: PendingLecturersResponse =
            self.get_json(&["lecturers", "pending"]).await?;
        Ok(response.lecturers)
    }

    async fn approve_lecturer(&self, lecturer_id: &LecturerId) -> Result<MutationAck> {
        self.post_mutation(&["lecturers", &lecturer_id.0, "approve"], None)
            .await
    }

    async fn reject_lecturer(&self, lecturer_id: &LecturerId, note: &str) -> Result<MutationAck> {
        self.post_mutation(&["lecturers", &lecturer_id.0, "reject"], Some(note))
            .await
    }

    async fn approve_degree(&self, degree_id: &SubjectId) -> Result<MutationAck> {
        self.post_mutation(&["degrees", &degree_id.0, "approve"], None)
            .await
    }

    async fn reject_degree(&self, degree_id: &SubjectId, note: &str) -> Result<MutationAck> {
        self.post_mutation(&["degrees", &degree_id.0, "reject"], Some(note))
            .await
    }

    async fn approve_certification(&self, certificate_id: &SubjectId) -> Result<MutationAck> {
        self.post_mutation(&["certifications", &certificate_id.0, "approve"], None)
            .await
    }

    async fn reject_certification(
        &self,
        certificate_id: &SubjectId,
        note: &str,
    ) -> Result<MutationAck> {
        self.post_mutation(&["certifications", &certificate_id.0, "reject"], Some(note))
            .await
    }
}
