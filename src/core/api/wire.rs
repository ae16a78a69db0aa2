use serde::{Deserialize, Serialize};

use crate::models::{ProjectDetails, ProjectSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
    pub author: String,
}

/// `{success, project?, message?, error?}` as returned by the project endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct ProjectEnvelope {
    pub success: bool,
    #[serde(default)]
    pub project: Option<ProjectDetails>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProjectEnvelope {
    pub fn failure_message(&self, fallback: &str) -> String {
        failure_message(self.error.as_deref(), self.message.as_deref(), fallback)
    }
}

/// The listing comes either bare or wrapped in `{projects: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ProjectListBody {
    Bare(Vec<ProjectSummary>),
    Wrapped { projects: Vec<ProjectSummary> },
}

impl ProjectListBody {
    pub fn into_projects(self) -> Vec<ProjectSummary> {
        match self {
            ProjectListBody::Bare(projects) | ProjectListBody::Wrapped { projects } => projects,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    pub fn failure_message(&self) -> String {
        failure_message(self.error.as_deref(), self.message.as_deref(), "upload failed")
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct FileListBody {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

/// A file entry as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    #[serde(alias = "name")]
    pub filename: String,
    #[serde(rename = "type", alias = "format", default)]
    pub file_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: String,
}

fn failure_message(error: Option<&str>, message: Option<&str>, fallback: &str) -> String {
    error
        .or(message)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_list_accepts_both_shapes() {
        let wrapped: ProjectListBody =
            serde_json::from_str(r#"{"projects": [{"name": "A", "description": "d"}]}"#).unwrap();
        let bare: ProjectListBody =
            serde_json::from_str(r#"[{"name": "A", "description": "d", "updated_at": "x"}]"#)
                .unwrap();
        assert_eq!(wrapped.into_projects()[0].name, "A");
        assert_eq!(bare.into_projects()[0].updated_at.as_deref(), Some("x"));
    }

    #[test]
    fn remote_file_accepts_listing_aliases() {
        let spec: RemoteFile = serde_json::from_str(r#"{"filename": "a.csv", "type": "met"}"#).unwrap();
        let legacy: RemoteFile = serde_json::from_str(r#"{"name": "a.csv", "format": "csv", "size": 3}"#).unwrap();
        assert_eq!(spec.file_type, "met");
        assert_eq!(legacy.filename, "a.csv");
        assert_eq!(legacy.file_type, "csv");
    }

    #[test]
    fn error_field_wins_over_message() {
        let envelope: ProjectEnvelope =
            serde_json::from_str(r#"{"success": false, "error": "exists", "message": "nope"}"#).unwrap();
        assert_eq!(envelope.failure_message("x"), "exists");
        let empty: ProjectEnvelope = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert_eq!(empty.failure_message("create failed"), "create failed");
    }
}
