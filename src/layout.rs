use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, models::TurbinePosition};

/// Largest grid `create_grid` will lay out.
pub const MAX_GRID_TURBINES: u64 = 100_000;

/// Regular turbine grid. Also the request body for `/layout/grid`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub n_rows: u32,
    pub n_cols: u32,
    pub spacing_x: f64,
    pub spacing_y: f64,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default)]
    pub staggered: bool,
}

impl GridSpec {
    pub fn new(n_rows: u32, n_cols: u32, spacing_x: f64, spacing_y: f64) -> Self {
        Self {
            n_rows,
            n_cols,
            spacing_x,
            spacing_y,
            offset_x: 0.0,
            offset_y: 0.0,
            staggered: false,
        }
    }

    pub fn with_offset(mut self, offset_x: f64, offset_y: f64) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    pub fn with_staggered(mut self, staggered: bool) -> Self {
        self.staggered = staggered;
        self
    }

    pub fn turbine_count(&self) -> u64 {
        u64::from(self.n_rows) * u64::from(self.n_cols)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let turbines = self.turbine_count();
        if turbines > MAX_GRID_TURBINES {
            return Err(ValidationError::GridTooLarge {
                turbines,
                max: MAX_GRID_TURBINES,
            });
        }
        Ok(())
    }
}

/// Lays turbines out row by row. Odd rows of a staggered grid shift by half a column.
pub fn create_grid(spec: &GridSpec) -> Result<Vec<TurbinePosition>, ValidationError> {
    spec.validate()?;
    let mut turbines = Vec::with_capacity(spec.turbine_count() as usize);
    for row in 0..spec.n_rows {
        let shift = if spec.staggered && row % 2 == 1 {
            spec.spacing_x / 2.0
        } else {
            0.0
        };
        for col in 0..spec.n_cols {
            turbines.push(TurbinePosition {
                name: format!("T{}", u64::from(row) * u64::from(spec.n_cols) + u64::from(col) + 1),
                x: spec.offset_x + col as f64 * spec.spacing_x + shift,
                y: spec.offset_y + row as f64 * spec.spacing_y,
            });
        }
    }
    Ok(turbines)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LayoutMetrics {
    pub n_turbines: usize,
    pub area_m2: f64,
    pub area_km2: f64,
    pub avg_distance_m: f64,
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    pub density_turbines_km2: f64,
}

/// Bounding-box area and pairwise spacing statistics. Undefined values are 0.
pub fn layout_metrics(turbines: &[TurbinePosition]) -> LayoutMetrics {
    let n = turbines.len();
    if n == 0 {
        return LayoutMetrics::default();
    }

    let (min_x, max_x, min_y, max_y) = bounds(turbines);
    let area_m2 = (max_x - min_x) * (max_y - min_y);

    let mut sum = 0.0;
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = 0.0f64;
    for (i, a) in turbines.iter().enumerate() {
        for b in &turbines[i + 1..] {
            let d = (a.x - b.x).hypot(a.y - b.y);
            sum += d;
            count += 1;
            min = min.min(d);
            max = max.max(d);
        }
    }

    let area_km2 = area_m2 / 1e6;
    LayoutMetrics {
        n_turbines: n,
        area_m2,
        area_km2,
        avg_distance_m: if count > 0 { sum / count as f64 } else { 0.0 },
        min_distance_m: if count > 0 { min } else { 0.0 },
        max_distance_m: max,
        density_turbines_km2: if area_m2 > 0.0 { n as f64 / area_km2 } else { 0.0 },
    }
}

/// `(min_x, max_x, min_y, max_y)` of a non-empty layout.
pub(crate) fn bounds(turbines: &[TurbinePosition]) -> (f64, f64, f64, f64) {
    turbines.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(min_x, max_x, min_y, max_y), t| {
            (min_x.min(t.x), max_x.max(t.x), min_y.min(t.y), max_y.max(t.y))
        },
    )
}
