//! Interactive waveform viewer.
//!
//! Renders named series against a shared time axis as a line plot in a
//! native window. [`TraceView::show`] blocks until the window is closed.

use anyhow::{ensure, Result};
use eframe::egui;
use egui_plot::{Legend, Line, Plot};
use wavebench::simulation::RealSignal;

#[derive(Debug)]
struct Series {
    name: String,
    points: Vec<[f64; 2]>,
}

#[derive(Debug)]
pub struct TraceView {
    title: String,
    x_label: String,
    y_label: String,
    series: Vec<Series>,
}

impl TraceView {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            series: Vec::new(),
        }
    }

    /// Adds a series sampled on the time axis `t`.
    pub fn with_series(
        mut self,
        name: impl Into<String>,
        t: &RealSignal,
        x: &RealSignal,
    ) -> Result<Self> {
        let name = name.into();
        ensure!(
            t.len() == x.len(),
            "series {name:?} has {} samples but the time axis has {}",
            x.len(),
            t.len()
        );
        let points = t
            .values
            .iter()
            .zip(x.values.iter())
            .map(|(&t, &x)| [t, x])
            .collect();
        self.series.push(Series { name, points });
        Ok(self)
    }

    /// Opens the plot window. Returns once the user closes it.
    pub fn show(self) -> Result<()> {
        ensure!(!self.series.is_empty(), "no series to plot");
        log::info!("showing {} trace(s): {:?}", self.series.len(), self.title);

        let title = self.title.clone();
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 500.0]),
            ..Default::default()
        };
        eframe::run_native(&title, options, Box::new(|_cc| Box::new(self)))
            .map_err(|e| anyhow::anyhow!("failed to open plot window: {e}"))
    }
}

impl eframe::App for TraceView {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(&self.title);
            Plot::new("trace_plot")
                .x_axis_label(self.x_label.as_str())
                .y_axis_label(self.y_label.as_str())
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    for series in &self.series {
                        plot_ui.line(Line::new(series.points.clone()).name(&series.name));
                    }
                });
        });
    }
}
