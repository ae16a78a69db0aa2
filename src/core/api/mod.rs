//! The boundary between the session controller and the analysis backend.
//!
//! [`AnalysisApi`] is what the controller talks to. [`HttpBackend`] is the
//! production implementation; tests provide in-memory ones.

mod http;
mod wire;

use std::future::Future;

use serde_json::Value;

use crate::{
    analysis::AnalysisKind,
    error::ApiError,
    models::{FileCategory, ProjectDetails, ProjectName, ProjectSummary, UploadFile},
};

pub use http::HttpBackend;
pub use wire::{CreateProjectRequest, HealthReport, RemoteFile};

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations offered by the analysis backend.
///
/// Implementations report `success: false` answers as [`ApiError::Rejected`]
/// carrying the backend's own message.
pub trait AnalysisApi {
    fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> impl Future<Output = ApiResult<()>>;

    fn list_projects(&self) -> impl Future<Output = ApiResult<Vec<ProjectSummary>>>;

    fn get_project(&self, name: &ProjectName) -> impl Future<Output = ApiResult<ProjectDetails>>;

    /// Sends one file as a multipart request. The bytes are consumed.
    fn upload_file(
        &self,
        project: &ProjectName,
        category: FileCategory,
        file: UploadFile,
    ) -> impl Future<Output = ApiResult<()>>;

    fn list_files(&self, project: &ProjectName) -> impl Future<Output = ApiResult<Vec<RemoteFile>>>;

    /// POSTs `payload` to the endpoint for `kind` and returns the JSON body untouched.
    fn run_analysis(
        &self,
        kind: AnalysisKind,
        payload: &Value,
    ) -> impl Future<Output = ApiResult<Value>>;

    fn health(&self) -> impl Future<Output = ApiResult<HealthReport>>;
}
