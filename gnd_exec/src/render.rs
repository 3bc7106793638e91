//! # Renderer
//!
//! Rendering is done in two stages. The display state is first formatted into a [`PanelView`],
//! the text of every widget on the panel, which is plain data and can be compared. The view is
//! then handed to a [`RenderTarget`] which puts it in front of the operator.
//!
//! A widget whose reading has never been received is `None` in the view, the target decides how
//! to show that.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use serde::Serialize;

use crate::{
    dispatcher::ControlId,
    reconciler::DisplayState,
    telemetry::{AirQualityScale, HistorySeries, SeriesStats},
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something that can display the panel.
pub trait RenderTarget {
    /// Show a new view of the panel.
    fn render(&mut self, view: &PanelView);

    /// Show or clear the pressed feedback of a control.
    fn set_pressed(&mut self, control: ControlId, pressed: bool);

    /// Show a summary of the telemetry history.
    fn render_history(&mut self, summary: &HistorySummary);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Text of every widget on the panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PanelView {
    /// Position of the power switch and toggle button, `None` if not yet known.
    pub power_on: Option<bool>,

    /// Power status label.
    pub power: String,

    /// Current mode label.
    pub mode: Option<String>,

    pub last_seen: Option<String>,
    pub forward_distance: Option<String>,
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub air_quality: Option<String>,
}

/// Summary of a telemetry history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    /// Number of samples.
    pub points: usize,

    pub first_label: Option<String>,
    pub last_label: Option<String>,

    pub temperature_c: Option<SeriesStats>,
    pub humidity_percent: Option<SeriesStats>,
    pub air_quality_raw: Option<SeriesStats>,

    /// Air quality statistics converted to parts per million.
    pub air_quality_ppm: Option<SeriesStats>,
}

/// Applies views to a target, skipping views identical to the last one shown.
#[derive(Debug)]
pub struct Renderer<R: RenderTarget> {
    target: R,
    last: Option<PanelView>,
}

/// Render target printing the panel through the logger.
///
/// Only the lines that changed since the last view are printed.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    last: Option<PanelView>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PanelView {
    /// Format a display state.
    pub fn of(display: &DisplayState) -> Self {
        let r = &display.readings;

        Self {
            power_on: display.power,
            power: match display.power {
                Some(true) => String::from("Rover Power: ON"),
                Some(false) => String::from("Rover Power: OFF"),
                None => String::from("Rover Power: --"),
            },
            mode: display
                .mode
                .as_ref()
                .map(|m| format!("Current Mode: {}", capitalise(m))),
            last_seen: display
                .last_seen
                .as_ref()
                .map(|s| format!("Last Seen: {}", s)),
            forward_distance: r.forward_distance_cm.as_ref().map(|d| format!("{} cm", d)),
            temperature: r.temperature_c.map(|t| format!("{:.2} °C", t)),
            humidity: r.humidity_percent.map(|h| format!("{:.2} %", h)),
            air_quality: r
                .air_quality
                .as_ref()
                .map(|aq| format!("{} ppm (raw {})", aq.ppm, aq.raw)),
        }
    }

    /// Every widget as a `(name, text)` pair, unknown readings shown as `--`.
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        let or_dash = |s: &Option<String>| s.clone().unwrap_or_else(|| String::from("--"));

        vec![
            ("power", self.power.clone()),
            ("mode", or_dash(&self.mode)),
            ("last_seen", or_dash(&self.last_seen)),
            ("forward_distance", or_dash(&self.forward_distance)),
            ("temperature", or_dash(&self.temperature)),
            ("humidity", or_dash(&self.humidity)),
            ("air_quality", or_dash(&self.air_quality)),
        ]
    }
}

impl HistorySummary {
    pub fn of(history: &HistorySeries, scale: &AirQualityScale) -> Self {
        let ppm: Vec<f64> = history
            .air_quality_raw
            .iter()
            .map(|raw| scale.to_ppm(*raw) as f64)
            .collect();

        Self {
            points: history.labels.len(),
            first_label: history.labels.first().cloned(),
            last_label: history.labels.last().cloned(),
            temperature_c: SeriesStats::of(&history.temperature_c),
            humidity_percent: SeriesStats::of(&history.humidity_percent),
            air_quality_raw: SeriesStats::of(&history.air_quality_raw),
            air_quality_ppm: SeriesStats::of(&ppm),
        }
    }

    /// The summary as printable lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![match (&self.first_label, &self.last_label) {
            (Some(first), Some(last)) => {
                format!("History: {} points from {} to {}", self.points, first, last)
            }
            _ => String::from("History: no data"),
        }];

        let stats = |name: &str, s: &Option<SeriesStats>, precision: usize, unit: &str| match s {
            Some(s) => format!(
                "  {}: min {:.p$}{u}, max {:.p$}{u}, latest {:.p$}{u}",
                name,
                s.min,
                s.max,
                s.latest,
                p = precision,
                u = unit
            ),
            None => format!("  {}: --", name),
        };

        lines.push(stats("Temperature", &self.temperature_c, 2, " °C"));
        lines.push(stats("Humidity", &self.humidity_percent, 2, " %"));
        lines.push(stats("Air quality", &self.air_quality_ppm, 0, " ppm"));
        lines.push(stats("Air quality (raw)", &self.air_quality_raw, 0, ""));

        lines
    }
}

impl<R: RenderTarget> Renderer<R> {
    pub fn new(target: R) -> Self {
        Self { target, last: None }
    }

    /// Render the display state, returning whether the target was updated.
    pub fn update(&mut self, display: &DisplayState) -> bool {
        let view = PanelView::of(display);

        if self.last.as_ref() == Some(&view) {
            return false;
        }

        self.target.render(&view);
        self.last = Some(view);
        true
    }

    pub fn set_pressed(&mut self, control: ControlId, pressed: bool) {
        self.target.set_pressed(control, pressed);
    }

    pub fn history(&mut self, summary: &HistorySummary) {
        self.target.render_history(summary);
    }

    /// The last view rendered.
    pub fn view(&self) -> Option<&PanelView> {
        self.last.as_ref()
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut R {
        &mut self.target
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderTarget for TerminalRenderer {
    fn render(&mut self, view: &PanelView) {
        let prev = self.last.as_ref().map(PanelView::lines);

        for (i, (_, text)) in view.lines().iter().enumerate() {
            let changed = match &prev {
                Some(p) => p.get(i).map(|(_, t)| t != text).unwrap_or(true),
                None => true,
            };

            if changed {
                info!("{}", text);
            }
        }

        self.last = Some(view.clone());
    }

    fn set_pressed(&mut self, control: ControlId, pressed: bool) {
        if pressed {
            info!("[{:?}]", control);
        }
    }

    fn render_history(&mut self, summary: &HistorySummary) {
        for line in summary.lines() {
            info!("{}", line);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Uppercase the first character.
fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::telemetry::{AirQuality, SensorReadings};
    use comms_if::tm::RawValue;

    #[derive(Default)]
    struct Recorder {
        views: Vec<PanelView>,
        histories: Vec<HistorySummary>,
    }

    impl RenderTarget for Recorder {
        fn render(&mut self, view: &PanelView) {
            self.views.push(view.clone());
        }

        fn set_pressed(&mut self, _: ControlId, _: bool) {}

        fn render_history(&mut self, summary: &HistorySummary) {
            self.histories.push(summary.clone());
        }
    }

    fn display() -> DisplayState {
        DisplayState {
            power: Some(true),
            mode: Some("autonomous".into()),
            last_seen: Some("2024-05-01 12:00:00".into()),
            readings: SensorReadings {
                forward_distance_cm: Some(RawValue::Number(120.0)),
                temperature_c: Some(23.6),
                humidity_percent: Some(45.0),
                air_quality: Some(AirQuality {
                    raw: RawValue::Number(16384.0),
                    ppm: 500,
                }),
            },
        }
    }

    #[test]
    fn test_view_text() {
        let v = PanelView::of(&display());

        assert_eq!(v.power, "Rover Power: ON");
        assert_eq!(v.mode.as_deref(), Some("Current Mode: Autonomous"));
        assert_eq!(v.last_seen.as_deref(), Some("Last Seen: 2024-05-01 12:00:00"));
        assert_eq!(v.forward_distance.as_deref(), Some("120 cm"));
        assert_eq!(v.temperature.as_deref(), Some("23.60 °C"));
        assert_eq!(v.humidity.as_deref(), Some("45.00 %"));
        assert_eq!(v.air_quality.as_deref(), Some("500 ppm (raw 16384)"));
    }

    #[test]
    fn test_unknown_state() {
        let v = PanelView::of(&DisplayState::default());

        assert_eq!(v.power_on, None);
        assert_eq!(v.power, "Rover Power: --");
        assert!(v.lines().iter().skip(1).all(|(_, t)| t == "--"));

        let off = DisplayState {
            power: Some(false),
            mode: Some("server_defined".into()),
            ..Default::default()
        };
        let v = PanelView::of(&off);
        assert_eq!(v.power, "Rover Power: OFF");
        assert_eq!(v.mode.as_deref(), Some("Current Mode: Server_defined"));
    }

    #[test]
    fn test_renderer_skips_unchanged_views() {
        let mut r = Renderer::new(Recorder::default());

        assert!(r.update(&display()));
        assert!(!r.update(&display()));

        let mut d = display();
        d.readings.temperature_c = Some(24.0);
        assert!(r.update(&d));

        assert_eq!(r.target().views.len(), 2);
    }

    #[test]
    fn test_history_summary() {
        let h = HistorySeries {
            labels: vec!["10:00".into(), "10:01".into(), "10:02".into()],
            temperature_c: vec![22.0, 23.5, 22.5],
            humidity_percent: vec![],
            air_quality_raw: vec![16384.0, 32767.0, 0.0],
        };
        let s = HistorySummary::of(&h, &AirQualityScale::default());

        assert_eq!(s.points, 3);
        assert_eq!(s.last_label.as_deref(), Some("10:02"));
        assert_eq!(s.humidity_percent, None);
        assert_eq!(
            s.air_quality_ppm,
            Some(SeriesStats {
                min: 0.0,
                max: 1000.0,
                latest: 0.0
            })
        );

        let lines = s.lines();
        assert_eq!(lines[0], "History: 3 points from 10:00 to 10:02");
        assert_eq!(lines[1], "  Temperature: min 22.00 °C, max 23.50 °C, latest 22.50 °C");
        assert_eq!(lines[2], "  Humidity: --");
        assert_eq!(lines[3], "  Air quality: min 0 ppm, max 1000 ppm, latest 0 ppm");

        let mut r = Renderer::new(Recorder::default());
        r.history(&s);
        assert_eq!(r.target().histories.len(), 1);
    }
}
