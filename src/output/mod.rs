//! Per-frame analysis reports for offline runs

pub mod formats;

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::analysis::FrameAnalysis;
use crate::config::ReportFormat;
use crate::feedback::Alignment;

pub use formats::{format_json, format_text};

/// What one analyzed frame looked like
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub time_ms: i64,
    /// Peak bin indices in the display spectrum
    pub peaks: Vec<usize>,
    /// Peak positions mapped onto `0..max_frequency`
    pub peaks_hz: Vec<f64>,
    pub third_peak_hz: Option<f64>,
    pub on_target: bool,
    pub cue: bool,
}

impl FrameReport {
    pub fn from_analysis(analysis: &FrameAnalysis, time_ms: i64, max_frequency: f64) -> Self {
        let bins = analysis.snapshot.magnitudes.len().max(1) as f64;
        let to_hz = |idx: usize| idx as f64 / bins * max_frequency;

        let third_peak_hz = match analysis.alignment {
            Alignment::NoTargetPeak => None,
            Alignment::OffTarget { position } | Alignment::OnTarget { position, .. } => {
                Some(position * max_frequency)
            }
        };

        Self {
            frame: analysis.snapshot.sequence,
            time_ms,
            peaks: analysis.snapshot.peaks.clone(),
            peaks_hz: analysis.snapshot.peaks.iter().map(|&i| to_hz(i)).collect(),
            third_peak_hz,
            on_target: analysis.alignment.is_hit(),
            cue: analysis.alignment.fired(),
        }
    }
}

/// Writes reports to the console and/or a file
pub struct ReportWriter {
    format: ReportFormat,
    console: bool,
    file: Option<File>,
    path: Option<PathBuf>,
    written: u64,
}

impl ReportWriter {
    pub fn new(format: ReportFormat, console: bool, path: Option<&Path>) -> io::Result<Self> {
        let file = if let Some(path) = path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            Some(
                OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)?,
            )
        } else {
            None
        };

        Ok(Self {
            format,
            console,
            file,
            path: path.map(Path::to_path_buf),
            written: 0,
        })
    }

    pub fn write(&mut self, report: &FrameReport) -> io::Result<()> {
        let line = self.format(report);

        if self.console {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", line)?;
        }

        if let Some(ref mut file) = self.file {
            writeln!(file, "{}", line)?;
        }

        self.written += 1;
        Ok(())
    }

    fn format(&self, report: &FrameReport) -> String {
        match self.format {
            ReportFormat::Text => format_text(report),
            ReportFormat::Json => format_json(report),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(ref mut file) = self.file {
            file.flush()?;
        }
        io::stdout().flush()
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Format milliseconds as HH:MM:SS.mmm
pub fn format_timestamp(ms: i64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = ms % 1000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
    }
}
