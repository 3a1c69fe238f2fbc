//! Plotting infrastructure for chi-squared decision charts
//!
//! This module renders the reference chi-squared density for a completed
//! Kruskal-Wallis test, with the acceptance and rejection zones shaded and
//! vertical markers for the statistic and the critical value. Charts are
//! saved as SVG files with fixed 1000x700 resolution.

use crate::common::stats::{chi_squared, Decision, KruskalWallis};
use plotters::prelude::*;
use statrs::distribution::Continuous;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

type Result<T> = core::result::Result<T, PlotError>;

/// Headroom multiplier past the larger of statistic and critical value
const AXIS_HEADROOM: f64 = 1.3;

/// Minimum X-axis span so small statistics still show the distribution tail
const MIN_AXIS_SPAN: f64 = 8.0;

/// Number of density samples across the X-axis
const DENSITY_SAMPLES: usize = 400;

/// Creates the chi-squared decision chart for a completed test
///
/// The density of the reference chi-squared distribution is drawn over
/// `0..max(H, critical) * 1.3` (with a floor so the tail stays visible).
/// The region below the critical value is shaded as the acceptance zone,
/// the region above it as the rejection zone, and vertical markers show
/// where the statistic and the critical value fall. A text box summarizes
/// the numbers and the decision.
///
/// # Arguments
/// * `test` - A computed test result; markers must be finite and df >= 1
/// * `title` - Chart title displayed at the top of the plot
/// * `output_path` - Path where the SVG file should be saved
///
/// # Returns
/// * `Ok(())` - If the chart was successfully created and saved
/// * `Err(PlotError)` - If validation or an SVG drawing step failed
pub fn create_decision_plot(test: &KruskalWallis, title: &str, output_path: &Path) -> Result<()> {
    if !test.is_computed() {
        return Err(PlotError::InvalidData(
            "test result has no computed statistic".to_string(),
        ));
    }

    let distribution =
        chi_squared(test.degrees_of_freedom).map_err(|e| PlotError::InvalidData(e.to_string()))?;

    let x_max = (test.h.max(test.critical_value) * AXIS_HEADROOM).max(MIN_AXIS_SPAN);
    let step = x_max / DENSITY_SAMPLES as f64;
    // Start one step in: the df = 1 density diverges at zero
    let density: Vec<(f64, f64)> = (1..=DENSITY_SAMPLES)
        .map(|i| {
            let x = step * i as f64;
            (x, distribution.pdf(x))
        })
        .collect();
    let y_max = density.iter().map(|(_, y)| *y).fold(0.0, f64::max) * 1.08;

    let root = SVGBackend::new(output_path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Estadístico χ²")
        .y_desc("Densidad")
        .label_style(("sans-serif", 18))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    // Shaded decision zones on either side of the critical value
    let acceptance = density
        .iter()
        .copied()
        .filter(|(x, _)| *x <= test.critical_value);
    chart
        .draw_series(AreaSeries::new(acceptance, 0.0, &GREEN.mix(0.15)))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    let rejection = density
        .iter()
        .copied()
        .filter(|(x, _)| *x >= test.critical_value);
    chart
        .draw_series(AreaSeries::new(rejection, 0.0, &RED.mix(0.15)))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    // Density curve on top of the shading
    chart
        .draw_series(LineSeries::new(density.iter().copied(), &BLACK))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    // Vertical markers for the critical value and the observed statistic
    chart
        .draw_series(LineSeries::new(
            vec![(test.critical_value, 0.0), (test.critical_value, y_max)],
            ShapeStyle::from(&RED).stroke_width(2),
        ))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    chart
        .draw_series(LineSeries::new(
            vec![(test.h, 0.0), (test.h, y_max)],
            ShapeStyle::from(&BLUE).stroke_width(2),
        ))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    draw_summary_box(&root, test)?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    Ok(())
}

/// Writes the textual summary block in the upper right of the chart
fn draw_summary_box<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    test: &KruskalWallis,
) -> Result<()> {
    let decision = match test.decision {
        Decision::Reject => "Se rechaza H0",
        Decision::FailToReject => "No se rechaza H0",
        Decision::InsufficientGroups => "No computado",
    };
    let lines = [
        format!("H = {:.4}", test.h),
        format!("Valor crítico = {:.4}", test.critical_value),
        format!("p = {:.4}", test.p_value),
        format!("gl = {:.0}", test.degrees_of_freedom),
        decision.to_string(),
    ];

    for (index, line) in lines.iter().enumerate() {
        root.draw(&Text::new(
            line.clone(),
            (660, 80 + 24 * index as i32),
            ("sans-serif", 18),
        ))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }
    Ok(())
}

/// File name for a sheet's chart: the sheet name sanitized plus `.svg`
pub fn plot_file_name(sheet_name: &str) -> String {
    let sanitized: String = sheet_name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.svg", sanitized)
}
