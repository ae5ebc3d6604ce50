use serde::Serialize;
use serde_json::Value;

use super::types::{
    ContentUpdate, Domain, ExportFormat, ExportRequest, GenerationResponse, Project, StatusSnapshot,
};
use crate::transport::{DownloadError, DownloadedFile, Envelope, Request, TimeoutPolicy, TransportClient};

/// The project endpoint family of one domain.
#[derive(Debug, Clone)]
pub struct ProjectsApi {
    client: TransportClient,
    domain: Domain,
}

impl ProjectsApi {
    pub fn new(client: TransportClient, domain: Domain) -> Self {
        Self { client, domain }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    fn path(&self, rest: &str) -> String {
        format!("{}{rest}", self.domain.prefix())
    }

    /// `POST /{domain}/generate`. Unbounded: it sits in the same family as generation.
    pub async fn generate<B: Serialize + ?Sized>(&self, body: &B) -> Envelope<GenerationResponse> {
        let req = Request::post(self.path("/generate"), TimeoutPolicy::Unbounded).json(body);
        self.client.request_json(req).await
    }

    /// `GET /{domain}/projects/{id}/status`.
    pub async fn status(&self, project_id: &str) -> Envelope<StatusSnapshot> {
        let req = Request::get(
            self.path(&format!("/projects/{project_id}/status")),
            self.client.bounded(),
        );
        self.client.request_json(req).await
    }

    /// `GET /{domain}/projects/{id}`.
    pub async fn project(&self, project_id: &str) -> Envelope<Project> {
        let req = Request::get(self.path(&format!("/projects/{project_id}")), self.client.bounded());
        self.client.request_json(req).await
    }

    /// `GET /{domain}/projects`.
    pub async fn list(&self) -> Envelope<Vec<Project>> {
        let req = Request::get(self.path("/projects"), self.client.bounded());
        self.client.request_json(req).await
    }

    /// `GET /{domain}/frameworks`. The shape differs per domain, so it stays untyped.
    pub async fn frameworks(&self) -> Envelope<Value> {
        let req = Request::get(self.path("/frameworks"), self.client.bounded());
        self.client.request_json(req).await
    }

    /// `PUT /{domain}/projects/{id}/content`. Replaces the generated text; policy generator only.
    pub async fn update_content(&self, project_id: &str, content: &str) -> Envelope<Project> {
        let req = Request::put(
            self.path(&format!("/projects/{project_id}/content")),
            self.client.bounded(),
        )
        .json(&ContentUpdate { content });
        self.client.request_json(req).await
    }

    /// `POST /{domain}/projects/{id}/export`: single attempt, raw bytes.
    pub async fn export(
        &self,
        project_id: &str,
        format: ExportFormat,
        include_metadata: bool,
    ) -> Result<DownloadedFile, DownloadError> {
        let body = ExportRequest {
            project_id: project_id.to_string(),
            format,
            include_metadata,
        };
        let req = Request::post(
            self.path(&format!("/projects/{project_id}/export")),
            TimeoutPolicy::Unbounded,
        )
        .json(&body);
        self.client.download(req).await
    }

    /// `DELETE /{domain}/projects/{id}`: single attempt.
    pub async fn delete(&self, project_id: &str) -> Envelope<Value> {
        let req = Request::delete(self.path(&format!("/projects/{project_id}")), self.client.bounded())
            .single_attempt();
        self.client.request_json(req).await
    }
}
