pub mod client;
pub mod download;
pub mod envelope;
pub mod policy;
pub mod request;

pub use client::TransportClient;
pub use download::{DownloadError, DownloadedFile};
pub use envelope::{Envelope, Payload};
pub use policy::{RetryPolicy, TimeoutPolicy};
pub use request::{Request, RequestBody};
