use std::path::Path;

use anyhow::Context;
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_hollow_rect_mut},
    rect::Rect,
};

use crate::{layout::bounds, models::TurbinePosition};

const BACKGROUND: Rgb<u8> = Rgb([250, 250, 245]);
const FRAME: Rgb<u8> = Rgb([160, 160, 160]);
const TURBINE: Rgb<u8> = Rgb([30, 90, 200]);

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Padding between the frame and the outermost turbines, in pixels.
    pub margin: u32,
    pub radius: i32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            margin: 40,
            radius: 6,
        }
    }
}

/// Maps layout coordinates (metres, y pointing north) onto the canvas.
struct Projection {
    min_x: f64,
    min_y: f64,
    scale: f64,
    origin_x: f64,
    origin_y: f64,
    height: f64,
}

impl Projection {
    fn fit(turbines: &[TurbinePosition], options: &RenderOptions) -> Self {
        let (min_x, max_x, min_y, max_y) = bounds(turbines);
        let usable_w = options.width.saturating_sub(2 * options.margin).max(1) as f64;
        let usable_h = options.height.saturating_sub(2 * options.margin).max(1) as f64;
        let span_x = max_x - min_x;
        let span_y = max_y - min_y;

        let scale = match (span_x > 0.0, span_y > 0.0) {
            (true, true) => (usable_w / span_x).min(usable_h / span_y),
            (true, false) => usable_w / span_x,
            (false, true) => usable_h / span_y,
            (false, false) => 1.0,
        };

        // center the drawn extent inside the usable area
        let origin_x = options.margin as f64 + (usable_w - span_x * scale) / 2.0;
        let origin_y = options.margin as f64 + (usable_h - span_y * scale) / 2.0;

        Self {
            min_x,
            min_y,
            scale,
            origin_x,
            origin_y,
            height: options.height as f64,
        }
    }

    fn project(&self, turbine: &TurbinePosition) -> (i32, i32) {
        let px = self.origin_x + (turbine.x - self.min_x) * self.scale;
        let py = self.height - (self.origin_y + (turbine.y - self.min_y) * self.scale);
        (px.round() as i32, py.round() as i32)
    }
}

/// Draws one marker per turbine inside a frame.
pub fn render_layout(turbines: &[TurbinePosition], options: &RenderOptions) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(options.width.max(1), options.height.max(1), BACKGROUND);

    if options.width > 2 && options.height > 2 {
        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(0, 0).of_size(options.width, options.height),
            FRAME,
        );
    }

    if turbines.is_empty() {
        return canvas;
    }

    let projection = Projection::fit(turbines, options);
    for turbine in turbines {
        let center = projection.project(turbine);
        draw_filled_circle_mut(&mut canvas, center, options.radius, TURBINE);
    }
    canvas
}

pub fn save_layout_png<P: AsRef<Path>>(
    path: P,
    turbines: &[TurbinePosition],
    options: &RenderOptions,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    render_layout(turbines, options)
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write layout map {:?}", path))?;
    Ok(())
}
