//! The session controller: one open project, a mirror of its files, and every
//! call to the analysis backend.
//!
//! Operations take `&mut self` and await each backend call before touching
//! state again, so state changes happen one operation at a time. Every failure
//! is reported to the presenter once, as an error toast, and also returned.

mod state;

use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};

pub use state::{FileIndex, SessionState};

use crate::{
    analysis::{self, AnalysisKind, AnalysisRequest, LayoutResult},
    core::{
        api::{AnalysisApi, CreateProjectRequest, RemoteFile},
        health::{self, HealthState},
        present::{Notification, Presenter, UiEvent, View},
        store::LocalStore,
    },
    error::{ApiError, SessionError, ValidationError},
    models::{FileCategory, ProjectDetails, ProjectName, ProjectSummary, UploadFile, UploadedFile},
};

/// Outcome of one file in an upload batch.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub filename: String,
    pub result: Result<(), SessionError>,
}

/// Per-file results of [`SessionController::upload_files`], in upload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

pub struct SessionController<B, P> {
    backend: B,
    presenter: P,
    state: SessionState,
    store: Option<LocalStore>,
}

impl<B: AnalysisApi, P: Presenter> SessionController<B, P> {
    pub fn new(backend: B, presenter: P) -> Self {
        Self {
            backend,
            presenter,
            state: SessionState::default(),
            store: None,
        }
    }

    /// Remember the last opened project in `store`.
    pub fn with_store(mut self, store: LocalStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_project(&self) -> Option<&ProjectName> {
        self.state.current_project()
    }

    pub fn cached_files(&self, project: &ProjectName) -> Vec<UploadedFile> {
        self.state
            .files(project)
            .map(FileIndex::files)
            .unwrap_or_default()
    }

    pub fn cached_files_by_category(
        &self,
        project: &ProjectName,
        category: FileCategory,
    ) -> &[UploadedFile] {
        self.state
            .files(project)
            .map(|index| index.category(category))
            .unwrap_or_default()
    }

    pub async fn create_project(
        &mut self,
        name: &str,
        description: &str,
        author: &str,
    ) -> Result<ProjectName, SessionError> {
        let result = self.try_create_project(name, description, author).await;
        self.report(result)
    }

    async fn try_create_project(
        &mut self,
        name: &str,
        description: &str,
        author: &str,
    ) -> Result<ProjectName, SessionError> {
        let name = ProjectName::new(name)?;
        let request = CreateProjectRequest {
            name: name.as_str().to_string(),
            description: description.to_string(),
            author: author.to_string(),
        };
        self.backend
            .create_project(&request)
            .instrument(info_span!("create_project", project = %name))
            .await?;
        info!(project = %name, "project created");

        self.state.clear_files(&name);
        self.make_current(name.clone()).await;
        self.notify(Notification::success(format!("Project '{name}' created")));
        self.reload_files(&name).await;
        Ok(name)
    }

    pub async fn open_project(&mut self, name: &str) -> Result<ProjectDetails, SessionError> {
        let result = self.try_open_project(name).await;
        self.report(result)
    }

    async fn try_open_project(&mut self, name: &str) -> Result<ProjectDetails, SessionError> {
        let name = ProjectName::new(name)?;
        let details = self
            .backend
            .get_project(&name)
            .instrument(info_span!("open_project", project = %name))
            .await
            .map_err(|e| match e {
                ApiError::Rejected(message) => SessionError::NotFound {
                    name: name.to_string(),
                    message,
                },
                ApiError::Status { status: 404, message } => SessionError::NotFound {
                    name: name.to_string(),
                    message,
                },
                other => other.into(),
            })?;
        info!(project = %name, "project opened");

        self.make_current(name.clone()).await;
        self.notify(Notification::success(format!("Project '{name}' opened")));
        self.reload_files(&name).await;
        Ok(details)
    }

    /// Clears the current project. Nothing is sent to the backend.
    pub fn close_project(&mut self) {
        if let Some(name) = self.state.clear_current_project() {
            info!(project = %name, "project closed");
            self.presenter.present(UiEvent::ProjectChanged(None));
            self.presenter.present(UiEvent::SwitchView(View::Projects));
            self.notify(Notification::info(format!("Project '{name}' closed")));
        }
    }

    pub async fn list_projects(&mut self) -> Result<Vec<ProjectSummary>, SessionError> {
        let result = self
            .backend
            .list_projects()
            .instrument(info_span!("list_projects"))
            .await
            .map_err(SessionError::from);
        self.report(result)
    }

    /// Uploads `files` one after another into the current project.
    ///
    /// Only a missing project fails the call. Individual file failures are
    /// toasted, recorded in the report, and the batch carries on.
    pub async fn upload_files(
        &mut self,
        files: Vec<UploadFile>,
        category: FileCategory,
    ) -> Result<UploadReport, SessionError> {
        let project = match self.require_project() {
            Ok(project) => project,
            Err(e) => return self.report(Err(e)),
        };

        let total = files.len();
        let mut report = UploadReport::default();
        for (index, file) in files.into_iter().enumerate() {
            let filename = file.filename.clone();
            let span = info_span!("upload", project = %project, file = %filename, index, total);
            let result = self
                .backend
                .upload_file(&project, category, file)
                .instrument(span)
                .await
                .map_err(SessionError::from);

            match &result {
                Ok(()) => {
                    self.state.record_upload(
                        &project,
                        UploadedFile {
                            filename: filename.clone(),
                            category,
                        },
                    );
                    self.notify(Notification::success(format!("Uploaded {filename}")));
                }
                Err(e) => {
                    warn!(project = %project, file = %filename, error = %e, "upload failed");
                    self.notify(Notification::error(format!("{filename}: {e}")));
                }
            }
            report.outcomes.push(UploadOutcome { filename, result });
        }

        info!(
            project = %project,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "upload batch finished"
        );
        if report.succeeded() > 0 {
            self.reload_files(&project).await;
        }
        Ok(report)
    }

    /// Re-reads the backend's listing for `project` and replaces the cached copy.
    pub async fn refresh_file_list(
        &mut self,
        project: &ProjectName,
    ) -> Result<Vec<UploadedFile>, SessionError> {
        let result = self.try_refresh_file_list(project).await;
        self.report(result)
    }

    async fn try_refresh_file_list(
        &mut self,
        project: &ProjectName,
    ) -> Result<Vec<UploadedFile>, SessionError> {
        let remote = self
            .backend
            .list_files(project)
            .instrument(info_span!("list_files", project = %project))
            .await?;
        let known = self.state.files(project).cloned().unwrap_or_default();
        let index = FileIndex::from_files(
            remote
                .into_iter()
                .filter_map(|entry| to_uploaded_file(entry, &known)),
        );
        let files = index.files();
        debug!(project = %project, count = files.len(), "file list refreshed");

        self.state.replace_files(project.clone(), index);
        self.presenter.present(UiEvent::FileListChanged {
            project: project.clone(),
            files: files.clone(),
        });
        Ok(files)
    }

    pub async fn run_analysis(&mut self, request: &AnalysisRequest) -> Result<Value, SessionError> {
        let payload = match request.to_payload() {
            Ok(payload) => payload,
            Err(e) => return self.report(Err(e.into())),
        };
        self.run_analysis_raw(request.kind(), payload).await
    }

    /// Sends one analysis request and hands the body to the presenter unchanged.
    pub async fn run_analysis_raw(
        &mut self,
        kind: AnalysisKind,
        payload: Value,
    ) -> Result<Value, SessionError> {
        let result = self.try_run_analysis(kind, payload).await;
        self.report(result)
    }

    async fn try_run_analysis(
        &mut self,
        kind: AnalysisKind,
        payload: Value,
    ) -> Result<Value, SessionError> {
        if kind.requires_project() {
            self.require_project()?;
        }
        let empty = analysis::empty_series(kind, &payload);
        if !empty.is_empty() {
            warn!(%kind, fields = ?empty, "sending analysis with empty input series");
        }

        let body = self
            .backend
            .run_analysis(kind, &payload)
            .instrument(info_span!("analysis", %kind))
            .await?;
        info!(%kind, "analysis finished");

        self.presenter.present(UiEvent::SwitchView(kind.view()));
        self.presenter.present(UiEvent::AnalysisRendered {
            kind,
            body: body.clone(),
        });
        if kind.is_layout() {
            if let Some(layout) = LayoutResult::from_body(&body) {
                self.presenter.present(UiEvent::RedrawLayout(layout.turbines));
            }
        }
        Ok(body)
    }

    /// One health check. Reads nothing from and writes nothing to the session state.
    pub async fn check_health(&self) -> HealthState {
        health::check(&self.backend).await
    }

    /// Project remembered from an earlier session, if a store is attached.
    pub async fn recent_project(&self) -> Option<ProjectName> {
        let store = self.store.as_ref()?;
        match store.last_project().await {
            Ok(project) => project,
            Err(e) => {
                warn!(error = %e, "could not read recent project");
                None
            }
        }
    }

    /// Drops the remembered project so the next session starts without one.
    pub async fn forget_recent_project(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.forget_project().await {
                warn!(error = %e, "could not clear recent project");
            }
        }
    }

    fn require_project(&self) -> Result<ProjectName, SessionError> {
        self.state
            .current_project()
            .cloned()
            .ok_or_else(|| ValidationError::NoProjectOpen.into())
    }

    async fn make_current(&mut self, name: ProjectName) {
        self.state.set_current_project(name.clone());
        if let Some(store) = &self.store {
            if let Err(e) = store.remember_project(&name).await {
                warn!(project = %name, error = %e, "could not remember project");
            }
        }
        self.presenter.present(UiEvent::ProjectChanged(Some(name)));
        self.presenter.present(UiEvent::SwitchView(View::Files));
    }

    /// Refresh after a successful create/open/upload; a failure here is toasted only.
    async fn reload_files(&mut self, project: &ProjectName) {
        let result = self.try_refresh_file_list(project).await;
        let _ = self.report(result);
    }

    fn notify(&mut self, notification: Notification) {
        self.presenter.present(UiEvent::Toast(notification));
    }

    fn report<T>(&mut self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(e) = &result {
            debug!(error = %e, kind = ?e.kind(), "session operation failed");
            self.notify(Notification::error(e.to_string()));
        }
        result
    }
}

/// Listed types that are not a category (some backends report the file
/// extension instead) fall back to the category recorded for that filename.
fn to_uploaded_file(remote: RemoteFile, known: &FileIndex) -> Option<UploadedFile> {
    let category = remote
        .file_type
        .parse::<FileCategory>()
        .ok()
        .or_else(|| known.category_of(&remote.filename));
    match category {
        Some(category) => Some(UploadedFile {
            filename: remote.filename,
            category,
        }),
        None => {
            debug!(file = %remote.filename, file_type = %remote.file_type, "skipping uncategorised file");
            None
        }
    }
}
