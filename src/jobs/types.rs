//! Wire types for the job (project) endpoints.
//!
//! All structs derive `Serialize` and `Deserialize` and follow the API's
//! snake_case JSON field names.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Which generation service a job belongs to. Both share the same endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    PolicyGenerator,
    AuditPlanner,
}

impl Domain {
    /// Path prefix, e.g. `/policy-generator`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Domain::PolicyGenerator => "/policy-generator",
            Domain::AuditPlanner => "/audit-planner",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix().trim_start_matches('/'))
    }
}

/// Server-side lifecycle of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    Draft,
    Generating,
    /// Audit planner only; still in progress from the client's point of view.
    Review,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProjectStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProjectStatus::Draft => "Draft",
            ProjectStatus::Generating => "Generating",
            ProjectStatus::Review => "Review",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Failed => "Failed",
            ProjectStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// The generated document attached to a completed project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPolicy {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub word_count: u32,
    #[serde(deserialize_with = "utc_timestamp")]
    pub generated_at: DateTime<Utc>,
}

/// Full project resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub framework: Option<String>,
    pub status: ProjectStatus,
    #[serde(deserialize_with = "utc_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "utc_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub generated_policy: Option<GeneratedPolicy>,
}

impl Project {
    /// Completed and carrying its artifact.
    pub fn is_resolved(&self) -> bool {
        self.status == ProjectStatus::Completed && self.generated_policy.is_some()
    }
}

/// RFC 3339, or a naive ISO 8601 timestamp taken as UTC (the server stamps with `utcnow()`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc()))
        .ok()
}

fn utc_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

/// Lightweight progress read used by the primary polling channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: ProjectStatus,
    #[serde(default, alias = "progress")]
    pub progress_percent: u8,
    #[serde(default)]
    pub latest_action: String,
    #[serde(default)]
    pub latest_details: String,
}

/// Body for `POST /policy-generator/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyGenerationRequest {
    pub title: String,
    pub framework: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body for `POST /audit-planner/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditGenerationRequest {
    pub project_title: String,
    pub source_document_id: String,
    pub target_framework: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Reply to a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub project_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub policy_content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
    Txt,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Txt => "txt",
        }
    }
}

/// Body for `PUT /policy-generator/projects/{id}/content`.
#[derive(Debug, Clone, Serialize)]
pub struct ContentUpdate<'a> {
    pub content: &'a str,
}

/// Body for `POST /{domain}/projects/{id}/export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub project_id: String,
    pub format: ExportFormat,
    pub include_metadata: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_deserialize_from_api_format() {
        let json = r#"{
            "id": "p-1",
            "title": "Access Control Policy",
            "framework": "ISO27001",
            "prompt": "ignored extra field",
            "status": "Completed",
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-01T10:05:00Z",
            "user_id": "u-1",
            "generated_policy": {
                "id": "g-1",
                "content": "Policy text",
                "word_count": 2,
                "generated_at": "2025-03-01T10:05:00Z"
            }
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.status, ProjectStatus::Completed);
        assert!(project.is_resolved());
        assert_eq!(project.generated_policy.unwrap().content, "Policy text");
    }

    #[test]
    fn completed_without_artifact_is_not_resolved() {
        let json = r#"{"id":"p","status":"Completed","created_at":"2025-03-01T10:00:00Z","updated_at":"2025-03-01T10:00:00Z"}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert!(!project.is_resolved());
    }

    #[test]
    fn project_accepts_naive_server_timestamps() {
        let json = r#"{
            "id": "p-2",
            "status": "Completed",
            "created_at": "2025-03-01T10:00:00.123456",
            "updated_at": "2025-03-01T10:05:00",
            "generated_policy": {
                "id": "g-2",
                "content": "Policy text",
                "generated_at": "2025-03-01T10:05:00.5"
            }
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert!(project.is_resolved());
        assert_eq!(project.created_at.to_rfc3339(), "2025-03-01T10:00:00.123456+00:00");
        assert_eq!(project.updated_at.to_rfc3339(), "2025-03-01T10:05:00+00:00");
        assert_eq!(
            project.generated_policy.unwrap().generated_at.timestamp_millis(),
            project.updated_at.timestamp_millis() + 500
        );
    }

    #[test]
    fn timestamp_parsing() {
        let offset = parse_timestamp("2025-03-01T12:00:00+02:00").unwrap();
        assert_eq!(offset, parse_timestamp("2025-03-01T10:00:00").unwrap());
        assert!(parse_timestamp("yesterday").is_none());

        let bad = r#"{"id":"p","status":"Draft","created_at":"soon","updated_at":"2025-03-01T10:00:00"}"#;
        assert!(serde_json::from_str::<Project>(bad).is_err());
    }

    #[test]
    fn unknown_status_is_tolerated() {
        let status: ProjectStatus = serde_json::from_str(r#""Queued""#).unwrap();
        assert_eq!(status, ProjectStatus::Unknown);
        assert!(!status.is_terminal());
        let review: ProjectStatus = serde_json::from_str(r#""Review""#).unwrap();
        assert_eq!(review, ProjectStatus::Review);
    }

    #[test]
    fn snapshot_accepts_short_progress_key_and_defaults() {
        let snap: StatusSnapshot =
            serde_json::from_str(r#"{"status":"Generating","progress":45}"#).unwrap();
        assert_eq!(snap.progress_percent, 45);
        assert!(snap.latest_action.is_empty());
    }

    #[test]
    fn domain_prefix_and_display() {
        assert_eq!(Domain::AuditPlanner.prefix(), "/audit-planner");
        assert_eq!(Domain::PolicyGenerator.to_string(), "policy-generator");
    }

    #[test]
    fn export_request_wire_format() {
        let req = ExportRequest {
            project_id: "p-1".into(),
            format: ExportFormat::Docx,
            include_metadata: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["format"], "docx");
        assert_eq!(json["include_metadata"], false);
    }

    #[test]
    fn optional_description_is_omitted() {
        let req = PolicyGenerationRequest {
            title: "t".into(),
            framework: "SOC2".into(),
            prompt: "write an access policy".into(),
            description: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("description"));
    }
}
