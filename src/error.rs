use thiserror::Error;

/// Problems caught locally, before any request leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("project name must not be empty")]
    EmptyProjectName,

    #[error("no project is open")]
    NoProjectOpen,

    #[error("unknown file category '{0}'")]
    UnknownCategory(String),

    #[error("unknown analysis '{0}'")]
    UnknownAnalysis(String),

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("invalid request payload: {0}")]
    InvalidPayload(String),

    #[error("grid of {turbines} turbines exceeds the limit of {max}")]
    GridTooLarge { turbines: u64, max: u64 },
}

/// Errors produced by a backend implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    /// The backend answered but refused the request (`success: false`).
    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Transport("request timed out".to_string())
        } else if err.is_decode() {
            ApiError::Malformed(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Malformed(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Backend,
}

/// Everything a session operation can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Backend(String),

    #[error("project '{name}' not found: {message}")]
    NotFound { name: String, message: String },
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Validation(_) => ErrorKind::Validation,
            SessionError::Transport(_) => ErrorKind::Transport,
            SessionError::Backend(_) | SessionError::NotFound { .. } => ErrorKind::Backend,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Rejected(message) => SessionError::Backend(message),
            transport @ (ApiError::Transport(_)
            | ApiError::Status { .. }
            | ApiError::Malformed(_)) => SessionError::Transport(transport.to_string()),
        }
    }
}
