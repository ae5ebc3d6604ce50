//! Polling channels.
//!
//! The orchestrator reads job progress through a [`PollingChannel`]. The
//! primary [`StatusChannel`] uses the lightweight status endpoint and
//! reports the server's own progress. The fallback [`ResourceChannel`]
//! reads the full project and estimates progress with a fixed ramp, since
//! that endpoint carries no granular signal.

use super::api::ProjectsApi;
use super::types::ProjectStatus;
use crate::transport::Envelope;

/// One observation of a job through a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading {
    Working { percent: u8, message: String },
    Completed,
    Failed(String),
}

/// The channel itself could not be read (as opposed to the job failing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelError {
    pub status: u16,
    pub message: String,
}

impl<T> From<Envelope<T>> for ChannelError {
    fn from(envelope: Envelope<T>) -> Self {
        Self {
            message: envelope.error_message(),
            status: envelope.status,
        }
    }
}

// Channels are awaited on the orchestrator's own task, so the returned future needs no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait PollingChannel {
    fn name(&self) -> &'static str;

    /// Read the job once. `attempt` is the 1-based poll number.
    async fn read(&self, project_id: &str, attempt: u32) -> Result<Reading, ChannelError>;
}

/// Deterministic progress estimate: `min(baseline + attempt * step, ceiling)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRamp {
    pub baseline: u8,
    pub step: u8,
    pub ceiling: u8,
}

impl Default for ProgressRamp {
    fn default() -> Self {
        Self {
            baseline: 10,
            step: 2,
            ceiling: 90,
        }
    }
}

impl ProgressRamp {
    pub fn estimate(&self, attempt: u32) -> u8 {
        let raw = u32::from(self.baseline).saturating_add(attempt.saturating_mul(u32::from(self.step)));
        raw.min(u32::from(self.ceiling)) as u8
    }
}

/// Keeps reported progress from moving backwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressClamp {
    last: u8,
}

impl ProgressClamp {
    pub fn observe(&mut self, percent: u8) -> u8 {
        self.last = self.last.max(percent.min(100));
        self.last
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

/// Primary channel: `GET /{domain}/projects/{id}/status`.
pub struct StatusChannel<'a> {
    api: &'a ProjectsApi,
}

impl<'a> StatusChannel<'a> {
    pub fn new(api: &'a ProjectsApi) -> Self {
        Self { api }
    }
}

impl PollingChannel for StatusChannel<'_> {
    fn name(&self) -> &'static str {
        "status"
    }

    async fn read(&self, project_id: &str, _attempt: u32) -> Result<Reading, ChannelError> {
        let envelope = self.api.status(project_id).await;
        if !envelope.success {
            return Err(envelope.into());
        }
        let Some(snapshot) = envelope.data else {
            return Err(ChannelError {
                status: envelope.status,
                message: "Empty status response".into(),
            });
        };
        Ok(match snapshot.status {
            ProjectStatus::Completed => Reading::Completed,
            ProjectStatus::Failed => Reading::Failed(first_non_empty(
                &[snapshot.latest_details.as_str(), snapshot.latest_action.as_str()],
                "Generation failed",
            )),
            status => Reading::Working {
                percent: snapshot.progress_percent,
                message: describe(status, &snapshot.latest_action, &snapshot.latest_details),
            },
        })
    }
}

/// Fallback channel: `GET /{domain}/projects/{id}` with ramped progress.
pub struct ResourceChannel<'a> {
    api: &'a ProjectsApi,
    ramp: ProgressRamp,
}

impl<'a> ResourceChannel<'a> {
    pub fn new(api: &'a ProjectsApi, ramp: ProgressRamp) -> Self {
        Self { api, ramp }
    }
}

impl PollingChannel for ResourceChannel<'_> {
    fn name(&self) -> &'static str {
        "resource"
    }

    async fn read(&self, project_id: &str, attempt: u32) -> Result<Reading, ChannelError> {
        let envelope = self.api.project(project_id).await;
        if !envelope.success {
            return Err(envelope.into());
        }
        let Some(project) = envelope.data else {
            return Err(ChannelError {
                status: envelope.status,
                message: "Empty project response".into(),
            });
        };
        Ok(match project.status {
            ProjectStatus::Completed => Reading::Completed,
            ProjectStatus::Failed => Reading::Failed(
                project
                    .error_message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Generation failed".to_string()),
            ),
            status => Reading::Working {
                percent: self.ramp.estimate(attempt),
                message: format!("{status}..."),
            },
        })
    }
}

fn first_non_empty(candidates: &[&str], fallback: &str) -> String {
    candidates
        .iter()
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

fn describe(status: ProjectStatus, action: &str, details: &str) -> String {
    match (action.is_empty(), details.is_empty()) {
        (true, _) => format!("{status}..."),
        (false, true) => action.to_string(),
        (false, false) => format!("{action}: {details}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::jobs::types::Domain;
    use crate::session::Session;
    use crate::transport::TransportClient;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(base_url: &str) -> ProjectsApi {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        let client = TransportClient::new(&config, Session::default()).unwrap();
        ProjectsApi::new(client, Domain::PolicyGenerator)
    }

    #[test]
    fn ramp_is_capped() {
        let ramp = ProgressRamp::default();
        assert_eq!(ramp.estimate(0), 10);
        assert_eq!(ramp.estimate(5), 20);
        assert_eq!(ramp.estimate(40), 90);
        assert_eq!(ramp.estimate(500), 90);
        assert_eq!(ramp.estimate(u32::MAX), 90);
    }

    #[test]
    fn clamp_never_moves_backwards() {
        let mut clamp = ProgressClamp::default();
        assert_eq!(clamp.observe(10), 10);
        assert_eq!(clamp.observe(45), 45);
        assert_eq!(clamp.observe(30), 45);
        assert_eq!(clamp.observe(250), 100);
        assert_eq!(clamp.last(), 100);
    }

    #[test]
    fn describe_variants() {
        assert_eq!(describe(ProjectStatus::Generating, "", ""), "Generating...");
        assert_eq!(describe(ProjectStatus::Generating, "Drafting", ""), "Drafting");
        assert_eq!(
            describe(ProjectStatus::Generating, "Drafting", "section 2"),
            "Drafting: section 2"
        );
    }

    #[tokio::test]
    async fn status_channel_maps_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/policy-generator/projects/p-1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Failed", "progress_percent": 60,
                "latest_action": "Drafting", "latest_details": "LLM quota exceeded"
            })))
            .mount(&server)
            .await;

        let api = api(&server.uri());
        let reading = StatusChannel::new(&api).read("p-1", 1).await.unwrap();
        assert_eq!(reading, Reading::Failed("LLM quota exceeded".into()));
    }

    #[tokio::test]
    async fn status_channel_surfaces_endpoint_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/policy-generator/projects/p-1/status"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not Found"})))
            .mount(&server)
            .await;

        let api = api(&server.uri());
        let err = StatusChannel::new(&api).read("p-1", 1).await.unwrap_err();
        assert_eq!(err, ChannelError { status: 404, message: "Not Found".into() });
    }

    #[tokio::test]
    async fn resource_channel_ramps_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/policy-generator/projects/p-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p-1", "status": "Generating",
                "created_at": "2025-03-01T10:00:00Z", "updated_at": "2025-03-01T10:00:00Z"
            })))
            .mount(&server)
            .await;

        let api = api(&server.uri());
        let channel = ResourceChannel::new(&api, ProgressRamp::default());
        assert_eq!(channel.name(), "resource");
        assert_eq!(
            channel.read("p-1", 3).await.unwrap(),
            Reading::Working { percent: 16, message: "Generating...".into() }
        );
    }
}
