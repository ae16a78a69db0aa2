use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    sync::Mutex,
};

use continuum::{
    AnalysisKind, ApiError, FileCategory, ProjectName, SessionController, UiEvent, UploadFile,
    core::{
        api::{AnalysisApi, ApiResult, CreateProjectRequest, HealthReport, RemoteFile},
        present::Level,
    },
    models::{ProjectDetails, ProjectSummary},
};
use serde_json::{Value, json};

/// Calls seen by [`FakeBackend`], in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateProject(String),
    ListProjects,
    GetProject(String),
    UploadStarted(String),
    UploadFinished(String),
    ListFiles(String),
    Analysis(AnalysisKind),
    Health,
}

#[derive(Default)]
struct FakeState {
    projects: BTreeMap<String, ProjectDetails>,
    files: BTreeMap<String, Vec<RemoteFile>>,
    calls: Vec<Call>,
    failing_uploads: HashSet<String>,
    health: VecDeque<ApiResult<HealthReport>>,
    analysis_body: Option<Value>,
    extension_listing: bool,
}

/// In-memory stand-in for the analysis API.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, name: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.projects.insert(name.to_string(), details(name));
            state.files.entry(name.to_string()).or_default();
        }
        self
    }

    pub fn with_remote_file(self, project: &str, filename: &str, file_type: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .files
            .entry(project.to_string())
            .or_default()
            .push(RemoteFile {
                filename: filename.to_string(),
                file_type: file_type.to_string(),
            });
        self
    }

    /// Uploads of `filename` are answered with `success: false`.
    pub fn fail_upload(self, filename: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(filename.to_string());
        self
    }

    /// Health answers handed out in order; once exhausted the backend is healthy.
    pub fn with_health(self, answers: impl IntoIterator<Item = ApiResult<HealthReport>>) -> Self {
        self.state.lock().unwrap().health.extend(answers);
        self
    }

    /// List files with their extension as the type, like the Python backend.
    pub fn list_extensions(self) -> Self {
        self.state.lock().unwrap().extension_listing = true;
        self
    }

    pub fn with_analysis_body(self, body: Value) -> Self {
        self.state.lock().unwrap().analysis_body = Some(body);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls other than health checks.
    pub fn network_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| *call != Call::Health)
            .collect()
    }

    pub fn upload_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::UploadStarted(_) | Call::UploadFinished(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn details(name: &str) -> ProjectDetails {
    ProjectDetails {
        name: name.to_string(),
        description: String::new(),
        author: String::new(),
        created_at: Some("2024-05-01T10:00:00".to_string()),
        updated_at: Some("2024-05-01T10:00:00".to_string()),
        met_sites_count: Some(0),
        turbines_count: Some(0),
        has_topography: Some(false),
        has_land_cover: Some(false),
    }
}

impl AnalysisApi for FakeBackend {
    async fn create_project(&self, request: &CreateProjectRequest) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateProject(request.name.clone()));
        if state.projects.contains_key(&request.name) {
            return Err(ApiError::Rejected(format!(
                "Project '{}' already exists",
                request.name
            )));
        }
        let mut project = details(&request.name);
        project.description = request.description.clone();
        project.author = request.author.clone();
        state.projects.insert(request.name.clone(), project);
        state.files.entry(request.name.clone()).or_default();
        Ok(())
    }

    async fn list_projects(&self) -> ApiResult<Vec<ProjectSummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListProjects);
        Ok(state
            .projects
            .values()
            .map(|p| ProjectSummary {
                name: p.name.clone(),
                description: p.description.clone(),
                author: p.author.clone(),
                created_at: p.created_at.clone(),
                updated_at: p.updated_at.clone(),
            })
            .collect())
    }

    async fn get_project(&self, name: &ProjectName) -> ApiResult<ProjectDetails> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetProject(name.to_string()));
        state
            .projects
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| ApiError::Rejected(format!("Project '{name}' does not exist")))
    }

    async fn upload_file(
        &self,
        project: &ProjectName,
        category: FileCategory,
        file: UploadFile,
    ) -> ApiResult<()> {
        self.record(Call::UploadStarted(file.filename.clone()));
        // give any concurrently issued request a chance to interleave
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UploadFinished(file.filename.clone()));
        if state.failing_uploads.contains(&file.filename) {
            return Err(ApiError::Rejected(format!(
                "Unsupported file format: {}",
                file.filename
            )));
        }
        state
            .files
            .entry(project.to_string())
            .or_default()
            .push(RemoteFile {
                filename: file.filename,
                file_type: category.as_str().to_string(),
            });
        Ok(())
    }

    async fn list_files(&self, project: &ProjectName) -> ApiResult<Vec<RemoteFile>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListFiles(project.to_string()));
        let files = state.files.get(project.as_str()).cloned().unwrap_or_default();
        if !state.extension_listing {
            return Ok(files);
        }
        Ok(files
            .into_iter()
            .map(|file| RemoteFile {
                file_type: file
                    .filename
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_string())
                    .unwrap_or_default(),
                filename: file.filename,
            })
            .collect())
    }

    async fn run_analysis(&self, kind: AnalysisKind, payload: &Value) -> ApiResult<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Analysis(kind));
        Ok(state
            .analysis_body
            .clone()
            .unwrap_or_else(|| json!({ "kind": kind.as_str(), "payload": payload })))
    }

    async fn health(&self) -> ApiResult<HealthReport> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Health);
        state.health.pop_front().unwrap_or_else(|| {
            Ok(HealthReport {
                status: "healthy".to_string(),
            })
        })
    }
}

pub type TestController = SessionController<FakeBackend, Vec<UiEvent>>;

pub fn controller(backend: FakeBackend) -> TestController {
    SessionController::new(backend, Vec::new())
}

pub fn sample_file(name: &str) -> UploadFile {
    UploadFile::new(name, format!("timestamp,wind_speed\n2024-01-01T00:00,{}\n", name.len()))
}

/// Messages of every error toast shown so far.
pub fn error_toasts(events: &[UiEvent]) -> Vec<String> {
    toasts(events, Level::Error)
}

pub fn success_toasts(events: &[UiEvent]) -> Vec<String> {
    toasts(events, Level::Success)
}

fn toasts(events: &[UiEvent], level: Level) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            UiEvent::Toast(n) if n.level == level => Some(n.message.clone()),
            _ => None,
        })
        .collect()
}
