#![allow(dead_code)]

mod fixtures;
mod mock_api;

pub use fixtures::*;
pub use mock_api::*;

// Re-export commonly used types from continuum for tests
pub use continuum::{
    AnalysisKind, AnalysisRequest, ErrorKind, FileCategory, GridSpec, HealthState, LocalStore,
    Notification, ProjectName, SessionController, SessionError, UiEvent, UploadFile,
    UploadedFile, ValidationError, View,
};
