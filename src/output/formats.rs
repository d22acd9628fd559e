//! Report line formats

use super::{format_timestamp, FrameReport};

/// `[mm:ss.mmm] peaks=[..] F3=.. hit=..`
pub fn format_text(report: &FrameReport) -> String {
    let peaks = report
        .peaks_hz
        .iter()
        .map(|hz| format!("{:.0}", hz))
        .collect::<Vec<_>>()
        .join(", ");

    let third = match report.third_peak_hz {
        Some(hz) => format!("{:.0} Hz", hz),
        None => "-".to_string(),
    };

    let hit = match (report.on_target, report.cue) {
        (true, true) => "yes (cue)",
        (true, false) => "yes",
        (false, _) => "no",
    };

    format!(
        "[{}] peaks=[{}] F3={} hit={}",
        format_timestamp(report.time_ms),
        peaks,
        third,
        hit
    )
}

/// One JSON object per line
pub fn format_json(report: &FrameReport) -> String {
    serde_json::to_string(report)
        .unwrap_or_else(|_| format!("{{\"frame\": {}}}", report.frame))
}
