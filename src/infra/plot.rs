// ============================================================
// Layer 6 — Loss Curve Plot
// ============================================================
// Renders training and validation loss against epoch index as
// an SVG file next to the checkpoint.

use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::path::Path;

use crate::infra::metrics::LossHistory;

pub fn plot_loss_curves(path: &Path, history: &LossHistory) -> Result<()> {
    if history.is_empty() {
        tracing::warn!("No epochs recorded, skipping loss plot");
        return Ok(());
    }

    let train = history.train_losses();
    let val   = history.val_losses();

    let finite = train.iter().chain(&val).copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return Err(anyhow!("loss history has no finite values to plot"));
    }
    let pad = ((hi - lo) * 0.1).max(1e-3);

    let root = SVGBackend::new(path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Loss per epoch", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(56)
        .build_cartesian_2d(0.5f64..(history.len() as f64 + 0.5), (lo - pad)..(hi + pad))?;

    chart.configure_mesh().x_desc("epoch").y_desc("loss").draw()?;

    let points = |series: &[f64]| -> Vec<(f64, f64)> {
        series.iter().enumerate().map(|(i, &v)| ((i + 1) as f64, v)).collect()
    };

    chart
        .draw_series(LineSeries::new(points(&train), &BLUE))?
        .label("training loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    chart
        .draw_series(LineSeries::new(points(&val), &RED))?
        .label("validation loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    tracing::debug!("Loss curve written to '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::metrics::EpochMetrics;

    #[test]
    fn test_writes_svg() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("loss_curve.svg");

        let mut h = LossHistory::new();
        h.push(EpochMetrics::new(1, 2.0, 2.5, 0.1, 0.1));
        h.push(EpochMetrics::new(2, 1.0, 1.8, 0.4, 0.3));
        h.push(EpochMetrics::new(3, 0.5, 1.6, 0.7, 0.4));
        plot_loss_curves(&path, &h).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_empty_history_writes_nothing() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("loss_curve.svg");
        plot_loss_curves(&path, &LossHistory::new()).unwrap();
        assert!(!path.exists());
    }
}
