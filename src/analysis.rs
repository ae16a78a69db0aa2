//! Analysis requests understood by the backend.
//!
//! Every analysis is one POST with a JSON body. The typed requests below
//! serialize to the body each endpoint expects; `AnalysisRequest::to_payload`
//! turns them into the raw JSON the session controller forwards.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    core::present::View,
    error::ValidationError,
    layout::GridSpec,
    models::TurbinePosition,
};

/// Time series rows, one JSON object per record (e.g. `wind_speed`, `wind_direction`).
pub type Records = Vec<Map<String, Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    MetFilter,
    Mcp,
    McpNeural,
    Wake,
    LayoutGrid,
    LayoutOptimize,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 6] = [
        AnalysisKind::MetFilter,
        AnalysisKind::Mcp,
        AnalysisKind::McpNeural,
        AnalysisKind::Wake,
        AnalysisKind::LayoutGrid,
        AnalysisKind::LayoutOptimize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::MetFilter => "met-filter",
            AnalysisKind::Mcp => "mcp",
            AnalysisKind::McpNeural => "mcp-neural",
            AnalysisKind::Wake => "wake",
            AnalysisKind::LayoutGrid => "layout-grid",
            AnalysisKind::LayoutOptimize => "layout-optimize",
        }
    }

    /// Path segments of the endpoint, relative to the API base URL.
    pub fn path(self) -> &'static [&'static str] {
        match self {
            AnalysisKind::MetFilter => &["met-filter", "filter"],
            AnalysisKind::Mcp => &["mcp", "analyze"],
            AnalysisKind::McpNeural => &["mcp", "neural", "train"],
            AnalysisKind::Wake => &["wake", "calculate"],
            AnalysisKind::LayoutGrid => &["layout", "grid"],
            AnalysisKind::LayoutOptimize => &["layout", "optimize"],
        }
    }

    /// Met filtering and MCP work on project data; wake and layout are standalone.
    pub fn requires_project(self) -> bool {
        matches!(
            self,
            AnalysisKind::MetFilter | AnalysisKind::Mcp | AnalysisKind::McpNeural
        )
    }

    pub fn is_layout(self) -> bool {
        matches!(self, AnalysisKind::LayoutGrid | AnalysisKind::LayoutOptimize)
    }

    pub fn view(self) -> View {
        match self {
            AnalysisKind::MetFilter => View::MetFilter,
            AnalysisKind::Mcp | AnalysisKind::McpNeural => View::Mcp,
            AnalysisKind::Wake => View::Wake,
            AnalysisKind::LayoutGrid | AnalysisKind::LayoutOptimize => View::Layout,
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnknownAnalysis(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetFilterRequest {
    pub data: Records,
    pub remove_tower_shadow: bool,
    pub remove_ice: bool,
    pub remove_high_std: bool,
    pub ref_height: f64,
    pub target_height: f64,
}

impl Default for MetFilterRequest {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            remove_tower_shadow: true,
            remove_ice: true,
            remove_high_std: true,
            ref_height: 10.0,
            target_height: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpMethod {
    #[default]
    Orthogonal,
    Bins,
    Matrix,
}

impl FromStr for McpMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orthogonal" => Ok(McpMethod::Orthogonal),
            "bins" => Ok(McpMethod::Bins),
            "matrix" => Ok(McpMethod::Matrix),
            other => Err(ValidationError::InvalidPayload(format!(
                "unknown MCP method '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct McpRequest {
    pub reference_data: Records,
    pub target_data: Records,
    pub method: McpMethod,
    pub sectors: u32,
    pub reference_name: String,
    pub target_name: String,
}

impl Default for McpRequest {
    fn default() -> Self {
        Self {
            reference_data: Vec::new(),
            target_data: Vec::new(),
            method: McpMethod::default(),
            sectors: 12,
            reference_name: "reference".to_string(),
            target_name: "target".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeuralMcpRequest {
    pub reference_data: Records,
    pub target_data: Records,
    pub hidden_layers: Vec<u32>,
    pub epochs: u32,
    pub learning_rate: f64,
}

impl Default for NeuralMcpRequest {
    fn default() -> Self {
        Self {
            reference_data: Vec::new(),
            target_data: Vec::new(),
            hidden_layers: vec![64, 32, 16],
            epochs: 500,
            learning_rate: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeTurbine {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub hub_height: f64,
    pub rotor_diameter: f64,
    #[serde(default = "default_thrust_coefficient")]
    pub ct: f64,
}

fn default_thrust_coefficient() -> f64 {
    0.8
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WakeRequest {
    pub turbines: Vec<WakeTurbine>,
    pub grid_resolution: u32,
    pub sectors: u32,
}

impl Default for WakeRequest {
    fn default() -> Self {
        Self {
            turbines: Vec::new(),
            grid_resolution: 50,
            sectors: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizeMethod {
    #[default]
    Ga,
    Grid,
    Random,
}

impl FromStr for OptimizeMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ga" => Ok(OptimizeMethod::Ga),
            "grid" => Ok(OptimizeMethod::Grid),
            "random" => Ok(OptimizeMethod::Random),
            other => Err(ValidationError::InvalidPayload(format!(
                "unknown optimisation method '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeLayoutRequest {
    pub n_turbines: u32,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub method: OptimizeMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisRequest {
    MetFilter(MetFilterRequest),
    Mcp(McpRequest),
    McpNeural(NeuralMcpRequest),
    Wake(WakeRequest),
    LayoutGrid(GridSpec),
    LayoutOptimize(OptimizeLayoutRequest),
}

impl AnalysisRequest {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisRequest::MetFilter(_) => AnalysisKind::MetFilter,
            AnalysisRequest::Mcp(_) => AnalysisKind::Mcp,
            AnalysisRequest::McpNeural(_) => AnalysisKind::McpNeural,
            AnalysisRequest::Wake(_) => AnalysisKind::Wake,
            AnalysisRequest::LayoutGrid(_) => AnalysisKind::LayoutGrid,
            AnalysisRequest::LayoutOptimize(_) => AnalysisKind::LayoutOptimize,
        }
    }

    pub fn to_payload(&self) -> Result<Value, ValidationError> {
        let payload = match self {
            AnalysisRequest::MetFilter(req) => serde_json::to_value(req),
            AnalysisRequest::Mcp(req) => serde_json::to_value(req),
            AnalysisRequest::McpNeural(req) => serde_json::to_value(req),
            AnalysisRequest::Wake(req) => serde_json::to_value(req),
            AnalysisRequest::LayoutGrid(req) => {
                req.validate()?;
                serde_json::to_value(req)
            }
            AnalysisRequest::LayoutOptimize(req) => serde_json::to_value(req),
        };
        payload.map_err(|e| ValidationError::InvalidPayload(e.to_string()))
    }
}

/// Names of array fields in `payload` that are present but empty.
pub fn empty_series(kind: AnalysisKind, payload: &Value) -> Vec<&'static str> {
    let fields: &[&'static str] = match kind {
        AnalysisKind::MetFilter => &["data"],
        AnalysisKind::Mcp | AnalysisKind::McpNeural => &["reference_data", "target_data"],
        AnalysisKind::Wake => &["turbines"],
        AnalysisKind::LayoutGrid | AnalysisKind::LayoutOptimize => &[],
    };
    fields
        .iter()
        .copied()
        .filter(|field| {
            payload
                .get(*field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.is_empty())
        })
        .collect()
}

/// Body returned by `/layout/grid` and `/layout/optimize`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayoutResult {
    #[serde(default)]
    pub name: String,
    pub turbines: Vec<TurbinePosition>,
    #[serde(default)]
    pub n_turbines: Option<u64>,
    #[serde(default)]
    pub metrics: Value,
    #[serde(default)]
    pub fitness: Option<f64>,
}

impl LayoutResult {
    /// Extracts the turbine coordinates, naming unnamed turbines `T1..Tn`.
    pub fn from_body(body: &Value) -> Option<Self> {
        let mut result: LayoutResult = serde_json::from_value(body.clone()).ok()?;
        for (index, turbine) in result.turbines.iter_mut().enumerate() {
            if turbine.name.is_empty() {
                turbine.name = format!("T{}", index + 1);
            }
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in AnalysisKind::ALL {
            assert_eq!(kind.as_str().parse::<AnalysisKind>(), Ok(kind));
        }
        assert!("wake-loss".parse::<AnalysisKind>().is_err());
    }

    #[test]
    fn only_data_analyses_require_a_project() {
        assert!(AnalysisKind::MetFilter.requires_project());
        assert!(AnalysisKind::McpNeural.requires_project());
        assert!(!AnalysisKind::Wake.requires_project());
        assert!(!AnalysisKind::LayoutOptimize.requires_project());
    }

    #[test]
    fn met_filter_payload_carries_flags() {
        let payload = AnalysisRequest::MetFilter(MetFilterRequest {
            remove_ice: false,
            ..Default::default()
        })
        .to_payload()
        .unwrap();
        assert_eq!(payload["remove_ice"], json!(false));
        assert_eq!(payload["remove_tower_shadow"], json!(true));
        assert_eq!(payload["data"], json!([]));
        assert_eq!(empty_series(AnalysisKind::MetFilter, &payload), vec!["data"]);
    }

    #[test]
    fn optimize_method_serializes_lowercase() {
        let payload = AnalysisRequest::LayoutOptimize(OptimizeLayoutRequest {
            n_turbines: 10,
            min_x: 0.0,
            max_x: 5000.0,
            min_y: 0.0,
            max_y: 3000.0,
            method: OptimizeMethod::Random,
        })
        .to_payload()
        .unwrap();
        assert_eq!(payload["method"], json!("random"));
        assert_eq!(payload["n_turbines"], json!(10));
    }

    #[test]
    fn layout_result_names_anonymous_turbines() {
        let body = json!({
            "name": "grid",
            "turbines": [{"x": 0.0, "y": 0.0}, {"x": 800.0, "y": 0.0}],
            "n_turbines": 2,
            "metrics": {},
            "fitness": 0.0
        });
        let result = LayoutResult::from_body(&body).unwrap();
        assert_eq!(result.turbines[1], TurbinePosition::new("T2", 800.0, 0.0));
        assert!(LayoutResult::from_body(&json!({"status": "ok"})).is_none());
    }
}
