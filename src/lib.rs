pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod layout;
pub mod models;
pub mod render;

pub use analysis::{AnalysisKind, AnalysisRequest, LayoutResult};
pub use config::ClientConfig;
pub use crate::core::{
    api::{AnalysisApi, HttpBackend},
    health::{HealthMonitor, HealthState},
    present::{Notification, Presenter, TerminalPresenter, UiEvent, View},
    session::{SessionController, UploadReport},
    store::LocalStore,
};
pub use error::{ApiError, ErrorKind, SessionError, ValidationError};
pub use layout::{GridSpec, create_grid, layout_metrics};
pub use models::{FileCategory, ProjectName, TurbinePosition, UploadFile, UploadedFile};
