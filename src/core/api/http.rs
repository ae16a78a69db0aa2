use reqwest::{
    Client, Response, StatusCode, Url,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{
    AnalysisApi, ApiResult,
    wire::{
        CreateProjectRequest, FileListBody, HealthReport, ProjectEnvelope, ProjectListBody,
        RemoteFile, UploadResponse,
    },
};
use crate::{
    analysis::AnalysisKind,
    config::ClientConfig,
    error::ApiError,
    models::{FileCategory, ProjectDetails, ProjectName, ProjectSummary, UploadFile},
};

/// [`AnalysisApi`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends percent-encoded `segments` to the base URL's path.
    fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }
    Ok(serde_json::from_slice(&body)?)
}

/// Best human-readable text in an error body: `detail`, `error`, `message`, then raw text.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        for key in ["detail", "error", "message"] {
            match value.get(key) {
                Some(Value::String(text)) => return text.clone(),
                Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        text
    }
}

impl AnalysisApi for HttpBackend {
    #[instrument(level = "debug", skip_all, fields(project = %request.name))]
    async fn create_project(&self, request: &CreateProjectRequest) -> ApiResult<()> {
        let url = self.endpoint(&["projects", "create"])?;
        let response = self.client.post(url).json(request).send().await?;
        let envelope: ProjectEnvelope = decode(response).await?;
        if !envelope.success {
            return Err(ApiError::Rejected(envelope.failure_message("project creation failed")));
        }
        debug!("project created");
        Ok(())
    }

    #[instrument(level = "debug", skip_all)]
    async fn list_projects(&self) -> ApiResult<Vec<ProjectSummary>> {
        let url = self.endpoint(&["projects", "list"])?;
        let response = self.client.get(url).send().await?;
        let body: ProjectListBody = decode(response).await?;
        let projects = body.into_projects();
        debug!(count = projects.len(), "listed projects");
        Ok(projects)
    }

    #[instrument(level = "debug", skip_all, fields(project = %name))]
    async fn get_project(&self, name: &ProjectName) -> ApiResult<ProjectDetails> {
        let url = self.endpoint(&["projects", name.as_str()])?;
        let response = self.client.get(url).send().await?;
        let envelope: ProjectEnvelope = decode(response).await?;
        if !envelope.success {
            return Err(ApiError::Rejected(envelope.failure_message("project not found")));
        }
        envelope
            .project
            .ok_or_else(|| ApiError::Malformed("response has no project".to_string()))
    }

    #[instrument(level = "debug", skip_all, fields(project = %project, file = %file.filename, %category))]
    async fn upload_file(
        &self,
        project: &ProjectName,
        category: FileCategory,
        file: UploadFile,
    ) -> ApiResult<()> {
        let url = self.endpoint(&["files", "upload"])?;
        let size = file.bytes.len();
        let part = Part::bytes(file.bytes).file_name(file.filename);
        let form = Form::new()
            .part("file", part)
            .text("project", project.as_str().to_string())
            .text("file_type", category.as_str());
        let response = self.client.post(url).multipart(form).send().await?;
        let body: UploadResponse = decode(response).await?;
        if !body.success {
            return Err(ApiError::Rejected(body.failure_message()));
        }
        debug!(size, "file uploaded");
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(project = %project))]
    async fn list_files(&self, project: &ProjectName) -> ApiResult<Vec<RemoteFile>> {
        let mut url = self.endpoint(&["files", "list"])?;
        url.query_pairs_mut().append_pair("project", project.as_str());
        let response = self.client.get(url).send().await?;
        let body: FileListBody = decode(response).await?;
        Ok(body.files)
    }

    #[instrument(level = "debug", skip_all, fields(%kind))]
    async fn run_analysis(&self, kind: AnalysisKind, payload: &Value) -> ApiResult<Value> {
        let url = self.endpoint(kind.path())?;
        let response = self.client.post(url).json(payload).send().await?;
        let body: Value = decode(response).await?;
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let message = ["error", "message", "detail"]
                .iter()
                .find_map(|key| body.get(*key).and_then(Value::as_str))
                .unwrap_or("analysis failed");
            return Err(ApiError::Rejected(message.to_string()));
        }
        Ok(body)
    }

    #[instrument(level = "trace", skip_all)]
    async fn health(&self) -> ApiResult<HealthReport> {
        let url = self.endpoint(&["health"])?;
        let response = self.client.get(url).send().await?;
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(&ClientConfig::new(base).unwrap()).unwrap()
    }

    #[test]
    fn endpoint_joins_and_encodes_segments() {
        let api = backend("http://localhost:8000");
        let url = api.endpoint(&["projects", "North Ridge/2"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/projects/North%20Ridge%2F2");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let api = backend("http://example.com/api/");
        let url = api.endpoint(AnalysisKind::McpNeural.path()).unwrap();
        assert_eq!(url.as_str(), "http://example.com/api/mcp/neural/train");
    }

    #[test]
    fn error_message_prefers_detail() {
        let msg = error_message(StatusCode::INTERNAL_SERVER_ERROR, br#"{"detail": "boom"}"#);
        assert_eq!(msg, "boom");
        let msg = error_message(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(msg, "Bad Gateway");
        let msg = error_message(StatusCode::BAD_REQUEST, b"plain text");
        assert_eq!(msg, "plain text");
    }
}
