//! Integration tests for rhotic-feedback

use std::sync::Arc;
use std::time::{Duration, Instant};

use rhotic_feedback::audio::FrameSource;
use rhotic_feedback::render::{DrawCommand, RecordingCanvas};
use rhotic_feedback::{
    Alignment, ChannelHapticSink, Clock, Config, ConfigError, Frame, FrameReport, ManualClock,
    MemorySource, ProcessorState, Session, SessionState, SpectralProcessor, SpectrumDisplay,
    SvgCanvas, WaveformRenderer,
};

const SAMPLE_RATE: u32 = 44100;
const FRAME_SIZE: usize = 512;

/// Sum of sinusoids standing in for vocal-tract resonances
fn generate_tones(tones: &[(f32, f32)], duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            tones
                .iter()
                .map(|&(f, a)| a * (2.0 * std::f32::consts::PI * f * t).sin())
                .sum()
        })
        .collect()
}

fn processor(config: &Config) -> SpectralProcessor {
    SpectralProcessor::new(&config.analysis, &config.feedback, SAMPLE_RATE)
}

/// Display bin to Hz: 64 envelope bins over 0..4096 Hz, expanded 8x
fn bin_hz(bin: usize) -> f32 {
    bin as f32 * 4096.0 / 512.0
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
        [audio]
        sample_rate = 48000

        [analysis]
        sensitivity = 80.0

        [feedback]
        target_frequency = 2000.0
        debounce_ms = 250
    "#;

    let config: Config = toml::from_str(toml_str).expect("Failed to parse TOML");
    assert_eq!(config.audio.sample_rate, 48000);
    assert_eq!(config.audio.frame_size, 512);
    assert_eq!(config.analysis.sensitivity, 80.0);
    assert_eq!(config.analysis.lpc_order, 64);
    assert_eq!(config.feedback.target_frequency, 2000.0);
    assert_eq!(config.feedback.debounce(), Duration::from_millis(250));
    assert_eq!(config.render.width, 400.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_rejects_bad_values() {
    let config: Config = toml::from_str("[analysis]\nsensitivity = 150.0\n").unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { .. })
    ));

    let config: Config = toml::from_str("[audio]\nframe_size = 0\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_single_tone_peak_location() {
    let config = Config::default();
    let processor = processor(&config);
    let mut state = ProcessorState::new(&config.feedback);

    let samples = generate_tones(&[(1000.0, 0.5)], 0.05);
    let frame = Frame::new(samples[..FRAME_SIZE].to_vec(), SAMPLE_RATE);
    let result = processor.process(&frame, &mut state, Instant::now());

    let mags = &result.snapshot.magnitudes;
    let (max_bin, max_val) = mags
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        });

    assert!(max_val <= 1.0);
    assert!(
        (bin_hz(max_bin) - 1000.0).abs() < 100.0,
        "strongest bin at {} Hz",
        bin_hz(max_bin)
    );
    assert!(result.snapshot.peaks.contains(&max_bin));
}

#[test]
fn test_resonances_produce_peaks() {
    let config = Config::default();
    let processor = processor(&config);
    let mut state = ProcessorState::new(&config.feedback);

    let tones = [(500.0, 0.5), (1200.0, 0.4), (2600.0, 0.3)];
    let samples = generate_tones(&tones, 0.05);
    let frame = Frame::new(samples[..FRAME_SIZE].to_vec(), SAMPLE_RATE);
    let result = processor.process(&frame, &mut state, Instant::now());

    let peaks = &result.snapshot.peaks;
    assert!(peaks.len() >= 3, "peaks: {:?}", peaks);
    for w in peaks.windows(2) {
        assert!(w[0] < w[1]);
    }
    for &(freq, _) in &tones {
        assert!(
            peaks.iter().any(|&p| (bin_hz(p) - freq).abs() < 150.0),
            "no peak near {} Hz in {:?}",
            freq,
            peaks
        );
    }
}

#[test]
fn test_dc_and_silent_frames_are_flat() {
    let config = Config::default();
    let processor = processor(&config);
    let mut state = ProcessorState::new(&config.feedback);

    for value in [0.0f32, 0.25] {
        let frame = Frame::new(vec![value; FRAME_SIZE], SAMPLE_RATE);
        let result = processor.process(&frame, &mut state, Instant::now());
        assert!(result
            .snapshot
            .magnitudes
            .iter()
            .all(|v| v.is_finite() && v.abs() < 1e-9));
        assert!(result.snapshot.peaks.is_empty());
        assert_eq!(result.alignment, Alignment::NoTargetPeak);
    }
}

#[test]
fn test_offline_reports_follow_simulated_clock() {
    let config = Config::default();
    let processor = processor(&config);
    let mut state = ProcessorState::new(&config.feedback);
    let clock = ManualClock::new();
    let start = clock.now();
    let frame_duration = config.audio.frame_duration();

    let samples = generate_tones(&[(500.0, 0.5), (1500.0, 0.3)], 0.2);
    let source = MemorySource::from_samples(&samples, SAMPLE_RATE, FRAME_SIZE);
    let expected_frames = (samples.len() + FRAME_SIZE - 1) / FRAME_SIZE;
    assert_eq!(source.frames().len(), expected_frames);

    let mut reports = Vec::new();
    for frame in source.into_frames() {
        let now = clock.now();
        let analysis = processor.process(&frame, &mut state, now);
        let time_ms = now.duration_since(start).as_millis() as i64;
        reports.push(FrameReport::from_analysis(&analysis, time_ms, 4600.0));
        clock.advance(frame_duration);
    }

    assert_eq!(reports.len(), expected_frames);
    assert_eq!(reports[0].frame, 1);
    assert_eq!(reports[0].time_ms, 0);
    // 512 samples at 44.1 kHz is just over 11.6 ms
    assert_eq!(reports[10].time_ms, 116);
}

#[test]
fn test_session_over_wav_file() {
    let path = std::env::temp_dir().join(format!("rhotic-session-{}.wav", std::process::id()));
    // Same resonances as above at half level; LPC shape does not depend on gain
    let samples = generate_tones(&[(500.0, 0.25), (1200.0, 0.2), (2600.0, 0.15)], 0.25);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in &samples {
        writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();

    let source = MemorySource::from_wav(&path, FRAME_SIZE).unwrap();
    assert_eq!(source.sample_rate(), SAMPLE_RATE);
    let frame_count = source.frames().len() as u64;

    let config = Config::default();

    // Put the target on the first frame's third peak
    let first = processor(&config).process(
        &source.frames()[0],
        &mut ProcessorState::new(&config.feedback),
        Instant::now(),
    );
    let peaks = &first.snapshot.peaks;
    assert!(peaks.len() >= 3, "peaks: {:?}", peaks);
    let target =
        peaks[2] as f64 / first.snapshot.magnitudes.len() as f64 * config.feedback.max_frequency;

    let (sink, cues) = ChannelHapticSink::new(8);
    let mut session = Session::new(source, &config)
        .with_haptic_sink(Arc::new(sink))
        .with_clock(Arc::new(ManualClock::new()));
    session.set_target_frequency(target);
    let link = session.display_link();

    session.start().unwrap();
    session.wait();
    assert_eq!(session.stats().frames(), frame_count);
    // The clock never moves, so only the first aligned frame gets through
    assert_eq!(session.stats().cues(), 1);
    let delivered: Vec<_> = cues.try_iter().collect();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].pulse, Duration::from_millis(50));

    let display = SpectrumDisplay::new(
        WaveformRenderer::new(&config.render, 1700.0, 4600.0),
        link.clone(),
    );
    let mut canvas = SvgCanvas::new();
    assert!(display.tick(&mut canvas));
    let svg = canvas.to_svg();
    assert!(svg.contains("<polyline"));
    assert!(svg.contains("1700 Hz"));
    assert!(svg.contains("4600 Hz"));

    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(link.cell.latest().is_none());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_render_after_stop_shows_only_target() {
    let config = Config::default();
    let source = MemorySource::from_samples(
        &generate_tones(&[(700.0, 0.5)], 0.05),
        SAMPLE_RATE,
        FRAME_SIZE,
    );
    let mut session = Session::new(source, &config);
    let display = SpectrumDisplay::new(
        WaveformRenderer::new(&config.render, 2000.0, 4600.0),
        session.display_link(),
    );

    session.start().unwrap();
    session.wait();
    session.stop();

    let mut canvas = RecordingCanvas::new();
    display.render_now(&mut canvas);
    let lines = canvas
        .commands()
        .iter()
        .filter(|c| matches!(c, DrawCommand::Polyline { .. }))
        .count();
    // target line only: the spectrum was cleared with the session
    assert_eq!(lines, 1);
    assert_eq!(canvas.texts()[0], "2000 Hz");
}
