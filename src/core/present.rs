use serde_json::Value;
use tracing::debug;

use crate::{
    analysis::AnalysisKind,
    models::{ProjectName, TurbinePosition, UploadedFile},
};

/// Page of the front end an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Projects,
    Files,
    MetFilter,
    Mcp,
    Wake,
    Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

/// A transient, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    SwitchView(View),
    Toast(Notification),
    ProjectChanged(Option<ProjectName>),
    FileListChanged {
        project: ProjectName,
        files: Vec<UploadedFile>,
    },
    AnalysisRendered {
        kind: AnalysisKind,
        body: Value,
    },
    RedrawLayout(Vec<TurbinePosition>),
}

/// Receives the refreshes the session controller asks for.
pub trait Presenter {
    fn present(&mut self, event: UiEvent);
}

/// Collects events in order; handy for headless front ends.
impl Presenter for Vec<UiEvent> {
    fn present(&mut self, event: UiEvent) {
        self.push(event);
    }
}

/// Prints notifications and analysis results to the terminal.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    /// Print analysis bodies as indented JSON.
    pub pretty: bool,
}

impl TerminalPresenter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Presenter for TerminalPresenter {
    fn present(&mut self, event: UiEvent) {
        match event {
            UiEvent::Toast(Notification { level, message }) => match level {
                Level::Info => println!("  {message}"),
                Level::Success => println!("✓ {message}"),
                Level::Error => eprintln!("✗ {message}"),
            },
            UiEvent::AnalysisRendered { kind, body } => {
                let rendered = if self.pretty {
                    serde_json::to_string_pretty(&body)
                } else {
                    serde_json::to_string(&body)
                };
                match rendered {
                    Ok(text) => println!("{text}"),
                    Err(e) => eprintln!("✗ could not render {kind} result: {e}"),
                }
            }
            other => debug!(event = ?other, "ui event"),
        }
    }
}
