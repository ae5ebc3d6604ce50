use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Project {0} is already being watched")]
    AlreadyWatching(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Classifies a failure so callers can tell "try again" from "this cannot complete".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// No response, timeout or server error (status 0, 408, 5xx).
    Transient,
    /// Rejected request, failed job or unresolvable result.
    Terminal,
}

impl FailureKind {
    /// Classify an HTTP status (0 meaning no response at all).
    pub fn from_status(status: u16) -> Self {
        if status == 0 || status == 408 || (500..600).contains(&status) {
            FailureKind::Transient
        } else {
            FailureKind::Terminal
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "Transient"),
            FailureKind::Terminal => write!(f, "Terminal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        for status in [0, 408, 500, 502, 503] {
            assert_eq!(FailureKind::from_status(status), FailureKind::Transient);
        }
        for status in [400, 401, 404, 413, 415, 200] {
            assert_eq!(FailureKind::from_status(status), FailureKind::Terminal);
        }
    }

    #[test]
    fn already_watching_display() {
        let err = ClientError::AlreadyWatching("p-1".into());
        assert_eq!(err.to_string(), "Project p-1 is already being watched");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
