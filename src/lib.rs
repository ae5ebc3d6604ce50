//! Transport and job layer for the CompliAI compliance API.
//!
//! - [`transport`]: one retrying request client that always answers with an [`Envelope`],
//!   plus the single-attempt binary download path.
//! - [`session`]: the bearer token store and its invalidation notices.
//! - [`jobs`]: submission and polling of long-running generation jobs.

pub mod config;
pub mod error;
pub mod jobs;
pub mod session;
pub mod transport;
pub mod ui;

pub use config::ClientConfig;
pub use error::{ClientError, FailureKind};
pub use jobs::{CancelHandle, Domain, JobOrchestrator, JobOutcome, ProjectsApi};
pub use session::{Session, SessionEvent, TokenStore};
pub use transport::{Envelope, Request, TimeoutPolicy, TransportClient};
