//! Job submission and polling.
//!
//! [`JobOrchestrator`] turns "start generation" into "wait until the
//! artifact is ready". It submits through [`ProjectsApi`], polls the status
//! channel at a fixed interval (falling back to the full resource when the
//! status endpoint itself fails), and after completion re-reads the
//! resource until it reflects the finished artifact.
//!
//! Each watched job ends with exactly one [`JobOutcome`].

use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::api::ProjectsApi;
use super::channel::{
    ChannelError, PollingChannel, ProgressClamp, ProgressRamp, Reading, ResourceChannel,
    StatusChannel,
};
use super::phase::{Phase, PhaseMachine};
use super::registry::{PollGuard, PollRegistry};
use super::types::{GeneratedPolicy, Project, ProjectStatus};
use crate::config::PollingSettings;
use crate::error::{ClientError, FailureKind};

pub const TIMED_OUT_MESSAGE: &str = "generation timed out";
const UNRESOLVED_MESSAGE: &str = "generation finished but the result could not be retrieved";

/// Timing and ceilings for the poll loop.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub grace_period: Duration,
    /// Extra resource reads after the first one when the read is stale.
    pub resolve_retries: u32,
    pub resolve_delay: Duration,
    pub ramp: ProgressRamp,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self::from(&PollingSettings::default())
    }
}

impl From<&PollingSettings> for PollingConfig {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            interval: settings.interval(),
            max_attempts: settings.max_attempts.max(1),
            grace_period: settings.grace_period(),
            resolve_retries: settings.resolve_retries,
            resolve_delay: settings.resolve_delay(),
            ramp: ProgressRamp {
                baseline: settings.ramp_baseline,
                step: settings.ramp_step,
                ceiling: settings.ramp_ceiling,
            },
        }
    }
}

/// Stops watching a job. The server-side job keeps running.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `fut` unless cancellation arrives first.
    async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Sleep; `false` if cancelled meanwhile.
    async fn pause(&self, duration: Duration) -> bool {
        self.guard(sleep(duration)).await.is_some()
    }
}

/// Externally visible progress of a watched job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub project_id: String,
    pub phase: Phase,
    /// Never lower than a previously reported value for the same job.
    pub percent: u8,
    pub message: String,
}

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate);
}

impl ProgressObserver for () {
    fn on_progress(&self, _update: &ProgressUpdate) {}
}

/// The single terminal result of a watched job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        project: Project,
        artifact: GeneratedPolicy,
    },
    Failed {
        message: String,
        kind: FailureKind,
        /// HTTP status when the failure came from a call rather than the job.
        status: Option<u16>,
    },
    TimedOut {
        attempts: u32,
    },
    /// The caller stopped watching.
    Cancelled,
}

impl JobOutcome {
    pub fn phase(&self) -> Phase {
        match self {
            JobOutcome::Completed { .. } => Phase::Completed,
            JobOutcome::Failed { .. } => Phase::Failed,
            JobOutcome::TimedOut { .. } => Phase::TimedOut,
            JobOutcome::Cancelled => Phase::Cancelled,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    fn from_channel(err: ChannelError) -> Self {
        JobOutcome::Failed {
            kind: FailureKind::from_status(err.status),
            status: Some(err.status),
            message: err.message,
        }
    }

    fn job_failed(message: String) -> Self {
        JobOutcome::Failed {
            message,
            kind: FailureKind::Terminal,
            status: None,
        }
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Completed { project, artifact } => write!(
                f,
                "project {} completed ({} words)",
                project.id, artifact.word_count
            ),
            JobOutcome::Failed {
                message,
                kind,
                status: Some(status),
            } => write!(f, "{kind} failure (status {status}): {message}"),
            JobOutcome::Failed { message, kind, .. } => write!(f, "{kind} failure: {message}"),
            JobOutcome::TimedOut { attempts } => {
                write!(f, "{TIMED_OUT_MESSAGE} after {attempts} attempts")
            }
            JobOutcome::Cancelled => write!(f, "stopped watching"),
        }
    }
}

/// Drives jobs from submission to a resolved artifact.
#[derive(Debug, Clone)]
pub struct JobOrchestrator {
    api: ProjectsApi,
    config: PollingConfig,
    registry: PollRegistry,
}

impl JobOrchestrator {
    pub fn new(api: ProjectsApi, config: PollingConfig) -> Self {
        Self {
            api,
            config,
            registry: PollRegistry::default(),
        }
    }

    pub fn api(&self) -> &ProjectsApi {
        &self.api
    }

    pub fn registry(&self) -> &PollRegistry {
        &self.registry
    }

    /// Submit a generation job and wait for its outcome.
    ///
    /// A failed submission is reported immediately; the transport client's
    /// own retries are the only ones applied to it.
    pub async fn run<B: Serialize + ?Sized>(
        &self,
        body: &B,
        cancel: &CancelHandle,
        observer: &dyn ProgressObserver,
    ) -> JobOutcome {
        let mut driver = Driver::new(self, String::new(), cancel.clone(), observer);
        driver.enter(Phase::Submitting);

        let Some(envelope) = cancel.guard(self.api.generate(body)).await else {
            return driver.finish(JobOutcome::Cancelled);
        };
        let response = match (envelope.success, envelope.data) {
            (true, Some(response)) => response,
            (_, _) => {
                let outcome = JobOutcome::Failed {
                    message: envelope.error.unwrap_or_else(|| format!("HTTP {}", envelope.status)),
                    kind: FailureKind::from_status(envelope.status),
                    status: Some(envelope.status),
                };
                return driver.finish(outcome);
            }
        };

        driver.project_id = response.project_id;
        info!(domain = %self.api.domain(), project_id = %driver.project_id, "job submitted");

        let _guard: PollGuard = match self.registry.claim(&driver.project_id) {
            Ok(guard) => guard,
            Err(e) => return driver.finish(JobOutcome::job_failed(e.to_string())),
        };
        driver.enter(Phase::Polling);
        driver.poll().await
    }

    /// Start watching a job that is already running server-side.
    ///
    /// Fails with [`ClientError::AlreadyWatching`] when another watch holds the id.
    pub fn watch(&self, project_id: &str) -> Result<JobWatch<'_>, ClientError> {
        let guard = self.registry.claim(project_id)?;
        Ok(JobWatch {
            orchestrator: self,
            guard,
            cancel: CancelHandle::new(),
        })
    }
}

/// An exclusive watch over one project id.
pub struct JobWatch<'a> {
    orchestrator: &'a JobOrchestrator,
    guard: PollGuard,
    cancel: CancelHandle,
}

impl JobWatch<'_> {
    pub fn project_id(&self) -> &str {
        self.guard.project_id()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Poll until a terminal outcome; releases the id afterwards.
    pub async fn wait(self, observer: &dyn ProgressObserver) -> JobOutcome {
        let mut driver = Driver::new(
            self.orchestrator,
            self.guard.project_id().to_string(),
            self.cancel.clone(),
            observer,
        );
        driver.enter(Phase::Polling);
        driver.poll().await
    }
}

/// Per-job loop state.
struct Driver<'a> {
    api: &'a ProjectsApi,
    config: &'a PollingConfig,
    project_id: String,
    cancel: CancelHandle,
    observer: &'a dyn ProgressObserver,
    machine: PhaseMachine,
    clamp: ProgressClamp,
}

impl<'a> Driver<'a> {
    fn new(
        orchestrator: &'a JobOrchestrator,
        project_id: String,
        cancel: CancelHandle,
        observer: &'a dyn ProgressObserver,
    ) -> Self {
        Self {
            api: &orchestrator.api,
            config: &orchestrator.config,
            project_id,
            cancel,
            observer,
            machine: PhaseMachine::default(),
            clamp: ProgressClamp::default(),
        }
    }

    fn enter(&mut self, phase: Phase) {
        let from = self.machine.phase();
        match self.machine.advance(phase) {
            Ok(()) => debug!(project_id = %self.project_id, %from, to = %phase, "phase change"),
            Err(e) => warn!(project_id = %self.project_id, "{e}"),
        }
    }

    fn report(&mut self, percent: u8, message: String) {
        let percent = self.clamp.observe(percent);
        self.observer.on_progress(&ProgressUpdate {
            project_id: self.project_id.clone(),
            phase: self.machine.phase(),
            percent,
            message,
        });
    }

    fn finish(&mut self, outcome: JobOutcome) -> JobOutcome {
        self.enter(outcome.phase());
        debug!(project_id = %self.project_id, path = ?self.machine.transitions(), "phase path");
        match &outcome {
            JobOutcome::Completed { .. } => info!(project_id = %self.project_id, "job completed"),
            JobOutcome::Cancelled => info!(project_id = %self.project_id, "stopped watching job"),
            other => warn!(project_id = %self.project_id, "job did not complete: {other}"),
        }
        outcome
    }

    async fn read_via<C: PollingChannel>(
        &self,
        channel: &C,
        attempt: u32,
    ) -> Option<Result<Reading, ChannelError>> {
        self.cancel.guard(channel.read(&self.project_id, attempt)).await
    }

    async fn poll(&mut self) -> JobOutcome {
        let api = self.api;
        let status_channel = StatusChannel::new(api);
        let resource_channel = ResourceChannel::new(api, self.config.ramp);
        let mut fallback = false;
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            if self.cancel.is_cancelled() {
                return self.finish(JobOutcome::Cancelled);
            }

            let mut result = if fallback {
                self.read_via(&resource_channel, attempt).await
            } else {
                self.read_via(&status_channel, attempt).await
            };

            if let Some(Err(err)) = &result {
                // 401 is an auth failure, not an unavailable channel; the session is already cleared.
                if !fallback && err.status != 401 {
                    warn!(
                        project_id = %self.project_id,
                        status = err.status,
                        channel = status_channel.name(),
                        "status channel unavailable, falling back to {}: {}",
                        resource_channel.name(),
                        err.message
                    );
                    fallback = true;
                    result = self.read_via(&resource_channel, attempt).await;
                }
            }

            let reading = match result {
                None => return self.finish(JobOutcome::Cancelled),
                Some(Err(err)) => return self.finish(JobOutcome::from_channel(err)),
                Some(Ok(reading)) => reading,
            };

            match reading {
                Reading::Completed => return self.resolve().await,
                Reading::Failed(message) => return self.finish(JobOutcome::job_failed(message)),
                Reading::Working { percent, message } => {
                    debug!(project_id = %self.project_id, attempt, max_attempts, percent, "still working");
                    self.report(percent, message);
                }
            }

            if attempt < max_attempts && !self.cancel.pause(self.config.interval).await {
                return self.finish(JobOutcome::Cancelled);
            }
        }

        self.finish(JobOutcome::TimedOut {
            attempts: max_attempts,
        })
    }

    /// Wait out the grace period, then re-read the resource until it shows the artifact.
    async fn resolve(&mut self) -> JobOutcome {
        self.enter(Phase::Resolving);
        self.report(100, "Finalizing...".to_string());

        if !self.cancel.pause(self.config.grace_period).await {
            return self.finish(JobOutcome::Cancelled);
        }

        let api = self.api;
        let reads = 1 + self.config.resolve_retries;
        for read in 1..=reads {
            let Some(envelope) = self.cancel.guard(api.project(&self.project_id)).await else {
                return self.finish(JobOutcome::Cancelled);
            };
            if !envelope.success {
                return self.finish(JobOutcome::from_channel(envelope.into()));
            }

            if let Some(project) = envelope.data {
                if project.status == ProjectStatus::Failed {
                    let message = project
                        .error_message
                        .unwrap_or_else(|| "Generation failed".to_string());
                    return self.finish(JobOutcome::job_failed(message));
                }
                if project.is_resolved() {
                    if let Some(artifact) = project.generated_policy.clone() {
                        return self.finish(JobOutcome::Completed { project, artifact });
                    }
                }
                debug!(
                    project_id = %self.project_id,
                    read,
                    status = %project.status,
                    "resource not yet consistent"
                );
            }

            if read < reads && !self.cancel.pause(self.config.resolve_delay).await {
                return self.finish(JobOutcome::Cancelled);
            }
        }

        self.finish(JobOutcome::job_failed(UNRESOLVED_MESSAGE.to_string()))
    }
}
