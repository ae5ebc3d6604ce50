pub mod api;
pub mod channel;
pub mod orchestrator;
pub mod phase;
pub mod registry;
pub mod types;

pub use api::ProjectsApi;
pub use channel::{PollingChannel, ProgressClamp, ProgressRamp, Reading, ResourceChannel, StatusChannel};
pub use orchestrator::{
    CancelHandle, JobOrchestrator, JobOutcome, JobWatch, PollingConfig, ProgressObserver,
    ProgressUpdate, TIMED_OUT_MESSAGE,
};
pub use phase::{Phase, PhaseMachine};
pub use registry::PollRegistry;
pub use types::{
    AuditGenerationRequest, ContentUpdate, Domain, ExportFormat, GeneratedPolicy,
    GenerationResponse, PolicyGenerationRequest, Project, ProjectStatus, StatusSnapshot,
};
