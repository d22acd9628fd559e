//! Spectrum waveform, target marker, peak markers and frequency scale

use tracing::debug;

use super::canvas::{Canvas, Color, Stroke, TextAlign, TextBaseline, TextStyle};
use crate::analysis::SpectrumSnapshot;
use crate::config::RenderConfig;

pub const FALLBACK_WIDTH: f64 = 400.0;
pub const FALLBACK_HEIGHT: f64 = 150.0;

const WAVEFORM_COLOR: Color = Color::rgb(255, 255, 255);
const WAVEFORM_WIDTH: f64 = 2.0;
const TARGET_COLOR: Color = Color::rgb(255, 179, 0);
const TARGET_WIDTH: f64 = 3.0;
const PEAK_COLOR: Color = Color::rgba(255, 255, 255, 0.6);
const PEAK_WIDTH: f64 = 2.0;
const LABEL_BACKGROUND: Color = Color::rgba(0, 0, 0, 0.6);
const SCALE_COLOR: Color = Color::rgba(255, 255, 255, 0.3);

const FONT_SIZE: f64 = 10.0;
const LABEL_Y: f64 = 30.0;
const LABEL_PADDING: f64 = 4.0;
const LABEL_HEIGHT: f64 = 16.0;
const SCALE_INSET: f64 = 4.0;
const SCALE_BOTTOM_OFFSET: f64 = 16.0;

/// Draws snapshots onto any [`Canvas`]
#[derive(Debug, Clone)]
pub struct WaveformRenderer {
    width: f64,
    height: f64,
    target_frequency: f64,
    max_frequency: f64,
}

impl WaveformRenderer {
    pub fn new(config: &RenderConfig, target_frequency: f64, max_frequency: f64) -> Self {
        let mut renderer = Self {
            width: FALLBACK_WIDTH,
            height: FALLBACK_HEIGHT,
            target_frequency,
            max_frequency,
        };
        renderer.resize(config.width, config.height);
        renderer
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn target_frequency(&self) -> f64 {
        self.target_frequency
    }

    pub fn set_target_frequency(&mut self, frequency: f64) {
        self.target_frequency = frequency;
    }

    /// Non-positive or non-finite dimensions fall back to 400x150
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = if width.is_finite() && width > 0.0 {
            width
        } else {
            FALLBACK_WIDTH
        };
        self.height = if height.is_finite() && height > 0.0 {
            height
        } else {
            FALLBACK_HEIGHT
        };
        debug!("Render surface {}x{}", self.width, self.height);
    }

    /// Draw one complete frame; a missing snapshot draws only the target and scale
    pub fn render(&self, canvas: &mut dyn Canvas, snapshot: Option<&SpectrumSnapshot>) {
        canvas.clear(self.width, self.height);

        if let Some(snapshot) = snapshot {
            self.draw_waveform(canvas, &snapshot.magnitudes);
        }
        self.draw_target_line(canvas);
        if let Some(snapshot) = snapshot {
            self.draw_peaks(canvas, &snapshot.magnitudes, &snapshot.peaks);
        }
        self.draw_frequency_scale(canvas);
    }

    fn y_for(&self, magnitude: f64) -> f64 {
        self.height - magnitude * self.height
    }

    fn draw_waveform(&self, canvas: &mut dyn Canvas, magnitudes: &[f64]) {
        if magnitudes.is_empty() {
            return;
        }

        let step = self.width / (magnitudes.len().saturating_sub(1).max(1)) as f64;
        let points: Vec<(f64, f64)> = magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| (i as f64 * step, self.y_for(m)))
            .collect();

        canvas.stroke_polyline(
            &points,
            &Stroke {
                color: WAVEFORM_COLOR,
                width: WAVEFORM_WIDTH,
                round: true,
            },
        );
    }

    fn draw_target_line(&self, canvas: &mut dyn Canvas) {
        let x = self.target_frequency / self.max_frequency * self.width;
        canvas.stroke_line(
            (x, 0.0),
            (x, self.height),
            &Stroke {
                color: TARGET_COLOR,
                width: TARGET_WIDTH,
                round: false,
            },
        );

        let label = format!("{} Hz", self.target_frequency.round());
        let text_width = canvas.measure_text(&label, FONT_SIZE);
        canvas.fill_rect(
            x - text_width / 2.0 - LABEL_PADDING,
            LABEL_Y - LABEL_HEIGHT / 2.0 - LABEL_PADDING,
            text_width + LABEL_PADDING * 2.0,
            LABEL_HEIGHT + LABEL_PADDING,
            LABEL_BACKGROUND,
        );
        canvas.fill_text(
            &label,
            x,
            LABEL_Y,
            &TextStyle {
                color: TARGET_COLOR,
                size: FONT_SIZE,
                align: TextAlign::Center,
                baseline: TextBaseline::Middle,
            },
        );
    }

    fn draw_peaks(&self, canvas: &mut dyn Canvas, magnitudes: &[f64], peaks: &[usize]) {
        if peaks.is_empty() || magnitudes.is_empty() {
            return;
        }

        let step = self.width / (magnitudes.len().saturating_sub(1).max(1)) as f64;
        let stroke = Stroke {
            color: PEAK_COLOR,
            width: PEAK_WIDTH,
            round: false,
        };

        for &peak in peaks {
            let Some(&magnitude) = magnitudes.get(peak) else {
                continue;
            };
            let x = peak as f64 * step;
            canvas.stroke_line((x, self.height), (x, self.y_for(magnitude)), &stroke);
        }
    }

    fn draw_frequency_scale(&self, canvas: &mut dyn Canvas) {
        let y = self.height - SCALE_BOTTOM_OFFSET;
        let labels = [
            ("0 Hz".to_string(), SCALE_INSET, TextAlign::Left),
            (
                format!("{} Hz", (self.max_frequency / 2.0).round()),
                self.width / 2.0,
                TextAlign::Center,
            ),
            (
                format!("{} Hz", self.max_frequency.round()),
                self.width - SCALE_INSET,
                TextAlign::Right,
            ),
        ];

        for (text, x, align) in labels {
            canvas.fill_text(
                &text,
                x,
                y,
                &TextStyle {
                    color: SCALE_COLOR,
                    size: FONT_SIZE,
                    align,
                    baseline: TextBaseline::Top,
                },
            );
        }
    }
}
