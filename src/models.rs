use std::{fmt, path::Path, str::FromStr};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::well_known::{Iso8601, Rfc3339},
};
use tokio::fs as async_fs;

use crate::error::ValidationError;

/// Name of a project. The backend treats it as the project's unique key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    /// Trims surrounding whitespace and rejects empty names.
    pub fn new(name: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyProjectName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProjectName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileCategory {
    #[serde(rename = "met", alias = "meteorological")]
    Meteorological,
    #[serde(rename = "turbines", alias = "turbine")]
    Turbine,
    #[serde(rename = "topography")]
    Topography,
    #[serde(rename = "landcover", alias = "land-cover", alias = "land_cover")]
    LandCover,
    #[serde(rename = "results")]
    Results,
}

impl FileCategory {
    pub const ALL: [FileCategory; 5] = [
        FileCategory::Meteorological,
        FileCategory::Turbine,
        FileCategory::Topography,
        FileCategory::LandCover,
        FileCategory::Results,
    ];

    /// Name used for the `file_type` form field and in file listings.
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Meteorological => "met",
            FileCategory::Turbine => "turbines",
            FileCategory::Topography => "topography",
            FileCategory::LandCover => "landcover",
            FileCategory::Results => "results",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "met" | "meteorological" => Ok(FileCategory::Meteorological),
            "turbines" | "turbine" => Ok(FileCategory::Turbine),
            "topography" => Ok(FileCategory::Topography),
            "landcover" | "land-cover" | "land_cover" => Ok(FileCategory::LandCover),
            "results" => Ok(FileCategory::Results),
            other => Err(ValidationError::UnknownCategory(other.to_string())),
        }
    }
}

/// Local mirror entry for a file stored on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub category: FileCategory,
}

/// A file waiting to be uploaded. The bytes are dropped once the request is sent.
#[derive(Clone)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .with_context(|| format!("Path {:?} has no usable file name", path))?;
        let bytes = async_fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        Ok(Self { filename, bytes })
    }
}

/// One row of the backend's project listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ProjectSummary {
    pub fn updated_at(&self) -> Option<PrimitiveDateTime> {
        self.updated_at.as_deref().and_then(parse_timestamp)
    }
}

/// Metadata returned when a single project is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub met_sites_count: Option<u64>,
    #[serde(default)]
    pub turbines_count: Option<u64>,
    #[serde(default)]
    pub has_topography: Option<bool>,
    #[serde(default)]
    pub has_land_cover: Option<bool>,
}

impl ProjectDetails {
    pub fn updated_at(&self) -> Option<PrimitiveDateTime> {
        self.updated_at.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbinePosition {
    #[serde(default)]
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl TurbinePosition {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
        }
    }
}

/// Parses backend timestamps. Accepts RFC 3339 and offset-less ISO 8601
/// (which is what the backend writes); offset values are normalised to UTC.
pub fn parse_timestamp(value: &str) -> Option<PrimitiveDateTime> {
    if let Ok(with_offset) = OffsetDateTime::parse(value, &Rfc3339) {
        let utc = with_offset.to_offset(UtcOffset::UTC);
        return Some(PrimitiveDateTime::new(utc.date(), utc.time()));
    }
    PrimitiveDateTime::parse(value, &Iso8601::PARSING).ok()
}
