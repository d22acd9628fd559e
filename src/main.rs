//! Rhotic Feedback CLI Application

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

use rhotic_feedback::feedback::Clock;
use rhotic_feedback::output::format_timestamp;
use rhotic_feedback::{
    ChannelHapticSink, Config, FrameReport, FrameSource, ManualClock, MemorySource, MicrophoneSource,
    ProcessorState, ReportFormat, ReportWriter, Session, SpeakerSex, SpectralProcessor,
    SpectrumDisplay, SpectrumSnapshot, SvgCanvas, WaveformRenderer,
};

/// Capacity of the haptic cue queue between the worker and the CLI
const CUE_QUEUE_DEPTH: usize = 16;

/// Interval between live spectrum summaries in the log
const SUMMARY_INTERVAL: Duration = Duration::from_secs(1);

/// Rhotic "R" speech-therapy feedback
#[derive(Parser)]
#[command(name = "rhotic-feedback")]
#[command(about = "Real-time LPC spectral feedback for rhotic speech practice", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start live microphone feedback
    Run {
        /// Audio input device name (uses default if not specified)
        #[arg(short, long)]
        device: Option<String>,

        /// Speaker sex, selects the default target (male, female)
        #[arg(short, long)]
        sex: Option<SpeakerSex>,

        /// Target frequency in Hz (overrides --sex)
        #[arg(short, long)]
        target: Option<f64>,

        /// Display sensitivity (0-100)
        #[arg(long)]
        sensitivity: Option<f64>,

        /// Write the last spectrum as SVG on exit
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Analyze a WAV file frame by frame
    Analyze {
        /// Input WAV file path
        input: PathBuf,

        /// Report format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Report file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Speaker sex, selects the default target (male, female)
        #[arg(short, long)]
        sex: Option<SpeakerSex>,

        /// Target frequency in Hz (overrides --sex)
        #[arg(short, long)]
        target: Option<f64>,

        /// Write the final spectrum as SVG
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Disable console output
        #[arg(long)]
        no_console: bool,
    },

    /// List available audio input devices
    Devices,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging - quiet by default, use -v for more
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    // Load configuration
    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Run {
            device,
            sex,
            target,
            sensitivity,
            svg,
        } => {
            if let Some(device) = device {
                config.audio.device = Some(device);
            }
            apply_target(&mut config, sex, target);
            if let Some(sensitivity) = sensitivity {
                config.analysis.sensitivity = sensitivity;
            }
            config.validate().context("Invalid settings")?;
            run_live(config, svg.as_deref())
        }
        Commands::Analyze {
            input,
            format,
            output,
            sex,
            target,
            svg,
            no_console,
        } => {
            apply_target(&mut config, sex, target);
            config.validate().context("Invalid settings")?;
            let format = match format.as_str() {
                "json" => ReportFormat::Json,
                _ => ReportFormat::Text,
            };
            analyze_file(
                config,
                &input,
                format,
                output.as_deref(),
                svg.as_deref(),
                !no_console,
            )
        }
        Commands::Devices => list_devices(),
    }
}

fn apply_target(config: &mut Config, sex: Option<SpeakerSex>, target: Option<f64>) {
    if let Some(sex) = sex {
        config.feedback.target_frequency = sex.target_frequency();
    }
    if let Some(target) = target {
        config.feedback.target_frequency = target;
    }
}

fn write_svg(
    config: &Config,
    target_frequency: f64,
    snapshot: Option<&SpectrumSnapshot>,
    path: &Path,
) -> Result<()> {
    let renderer = WaveformRenderer::new(
        &config.render,
        target_frequency,
        config.feedback.max_frequency,
    );
    let mut canvas = SvgCanvas::new();
    renderer.render(&mut canvas, snapshot);

    std::fs::write(path, canvas.to_svg())
        .with_context(|| format!("Failed to write SVG to {}", path.display()))?;
    info!("Spectrum written to: {}", path.display());
    Ok(())
}

/// Run live feedback until Ctrl+C
fn run_live(config: Config, svg: Option<&Path>) -> Result<()> {
    info!("Starting live feedback");

    // Setup signal handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut source = MicrophoneSource::new(config.audio.clone());
    source.init().context("Failed to initialize audio capture")?;

    let (sink, cues) = ChannelHapticSink::new(CUE_QUEUE_DEPTH);
    let mut session = Session::new(source, &config).with_haptic_sink(Arc::new(sink));
    session.start().context("Failed to start recording")?;

    let display = SpectrumDisplay::new(
        WaveformRenderer::new(
            &config.render,
            session.target_frequency(),
            config.feedback.max_frequency,
        ),
        session.display_link(),
    );
    let link = session.display_link();
    let mut canvas = SvgCanvas::new();

    println!(
        "Listening (target {} Hz)... Press Ctrl+C to stop",
        session.target_frequency()
    );

    let started = Instant::now();
    let mut last_summary = Instant::now();
    let mut redrawn = false;

    while running.load(Ordering::SeqCst) {
        if !session.is_active() {
            warn!("Analysis stopped unexpectedly");
            break;
        }

        if let Ok(cue) = cues.recv_timeout(Duration::from_millis(50)) {
            let offset = cue.at.saturating_duration_since(started);
            println!(
                "[{}] on target ({} ms pulse)",
                format_timestamp(offset.as_millis() as i64),
                cue.pulse.as_millis()
            );
        }

        redrawn |= display.tick(&mut canvas);

        if last_summary.elapsed() >= SUMMARY_INTERVAL {
            if let Some(snapshot) = link.cell.latest() {
                debug!(
                    "Frame {}: peaks={:?}",
                    snapshot.sequence, snapshot.peaks
                );
            }
            if let (Some(path), true) = (svg, redrawn) {
                if let Err(e) = std::fs::write(path, canvas.to_svg()) {
                    warn!("Failed to refresh {}: {}", path.display(), e);
                }
                redrawn = false;
            }
            last_summary = Instant::now();
        }
    }

    // The canvas still holds the last spectrum; stop clears the shared one
    session.stop();
    display.stop_rendering();

    info!(
        "Session complete: {} frames, {} cues, duration: {:.1}s",
        session.stats().frames(),
        session.stats().cues(),
        started.elapsed().as_secs_f32()
    );

    if let Some(path) = svg {
        std::fs::write(path, canvas.to_svg())
            .with_context(|| format!("Failed to write SVG to {}", path.display()))?;
        info!("Spectrum written to: {}", path.display());
    }

    Ok(())
}

/// Analyze a WAV file with a simulated clock, one frame duration per frame
fn analyze_file(
    config: Config,
    input: &Path,
    format: ReportFormat,
    output: Option<&Path>,
    svg: Option<&Path>,
    console: bool,
) -> Result<()> {
    info!("Analyzing: {}", input.display());

    let source = MemorySource::from_wav(input, config.audio.frame_size)
        .with_context(|| format!("Failed to read WAV file {}", input.display()))?;
    let sample_rate = source.sample_rate();

    if sample_rate != config.audio.sample_rate {
        info!(
            "File sample rate {} Hz differs from configured {} Hz; analyzing at file rate",
            sample_rate, config.audio.sample_rate
        );
    }

    let processor = SpectralProcessor::new(&config.analysis, &config.feedback, sample_rate);
    let mut state = ProcessorState::new(&config.feedback);
    let clock = ManualClock::new();
    let start = clock.now();
    let frame_duration =
        Duration::from_secs_f64(config.audio.frame_size as f64 / sample_rate.max(1) as f64);

    let mut writer =
        ReportWriter::new(format, console, output).context("Failed to create report writer")?;

    let mut last = None;
    let mut cues = 0u64;
    for frame in source.into_frames() {
        let now = clock.now();
        let analysis = processor.process(&frame, &mut state, now);
        if analysis.alignment.fired() {
            cues += 1;
        }

        let time_ms = now.duration_since(start).as_millis() as i64;
        let report = FrameReport::from_analysis(&analysis, time_ms, config.feedback.max_frequency);
        writer.write(&report)?;

        last = Some(analysis.snapshot);
        clock.advance(frame_duration);
    }
    writer.flush()?;

    info!(
        "Analyzed {} frames ({:.2}s), {} cues",
        state.frames(),
        clock.now().duration_since(start).as_secs_f32(),
        cues
    );
    if let Some(path) = writer.output_path() {
        info!("Report written to: {}", path.display());
    }

    if let Some(path) = svg {
        write_svg(&config, config.feedback.target_frequency, last.as_ref(), path)?;
    }

    Ok(())
}

/// List available audio input devices
fn list_devices() -> Result<()> {
    let source = MicrophoneSource::new(rhotic_feedback::AudioConfig::default());
    let devices = source.list_devices()?;

    if devices.is_empty() {
        println!("No audio input devices found");
    } else {
        println!("Available audio input devices:");
        for (i, name) in devices.iter().enumerate() {
            println!("  {}. {}", i + 1, name);
        }
    }

    Ok(())
}
