use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use presence_core::acquisition::domain::device_selector::open_camera_pair;
use presence_core::acquisition::domain::frame_source::DeviceEnumerator;
use presence_core::acquisition::infrastructure::image_directory_source::ImageDirectoryEnumerator;
use presence_core::acquisition::infrastructure::pixel_format_converter::PixelFormatConverter;
use presence_core::detection::domain::object_detector::ObjectDetector;
use presence_core::detection::infrastructure::model_resolver::{self, ModelLocation};
use presence_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use presence_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use presence_core::pipeline::presence_app::{LoopConfig, PresenceApp, RunSummary};
use presence_core::rendering::domain::presenter::Presenter;
use presence_core::rendering::infrastructure::snapshot_presenter::SnapshotPresenter;
use presence_core::shared::constants::{KEY_POLL_DELAY_MS, YOLO_MODEL_NAME};
use presence_core::shared::settings::PresenceSettings;

/// Bundled model directory, relative to the working directory.
const BUNDLED_MODEL_DIR: &str = "models";

/// Iterations between heartbeat log lines.
const HEARTBEAT_ITERATIONS: usize = 100;

/// Real-time human presence detection across two Basler cameras.
#[derive(Parser, Debug)]
#[command(name = "presence-detect")]
struct Cli {
    /// JSON settings file; flags below override its values.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Serial number of the left camera.
    #[arg(long)]
    left_serial: Option<String>,

    /// Serial number of the right camera.
    #[arg(long)]
    right_serial: Option<String>,

    /// Per-camera frame retrieve timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u32>,

    /// Consecutive retrieve timeouts tolerated before giving up (0 = none).
    #[arg(long)]
    max_consecutive_timeouts: Option<u32>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f32>,

    /// YOLO ONNX model file.
    #[arg(long)]
    model: Option<PathBuf>,

    /// URL to download the model from when it is not found locally
    /// [default: the hosted yolo11n export].
    #[arg(long)]
    model_url: Option<String>,

    /// Display window width.
    #[arg(long)]
    display_width: Option<u32>,

    /// Display window height.
    #[arg(long)]
    display_height: Option<u32>,

    /// Stop after this many processed iterations.
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Replay images from this directory as the left camera.
    #[arg(long, requires = "replay_right")]
    replay_left: Option<PathBuf>,

    /// Replay images from this directory as the right camera.
    #[arg(long, requires = "replay_left")]
    replay_right: Option<PathBuf>,

    /// Write annotated images here instead of showing windows.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Font file for snapshot status text; a color swatch is drawn without one.
    #[arg(long, requires = "snapshot_dir")]
    font: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let settings = build_settings(&cli)?;

    let detector = build_detector(&settings)?;
    let presenter = build_presenter(&cli, &settings)?;

    let summary = match (&cli.replay_left, &cli.replay_right) {
        (Some(left), Some(right)) => {
            let enumerator = ImageDirectoryEnumerator::new(vec![left.clone(), right.clone()]);
            run_presence(&enumerator, &settings, detector, presenter)?
        }
        _ => run_cameras(&settings, detector, presenter)?,
    };

    log::info!(
        "Done: {} iterations processed, {} skipped",
        summary.processed,
        summary.skipped
    );
    Ok(())
}

#[cfg(feature = "pylon")]
fn run_cameras(
    settings: &PresenceSettings,
    detector: Box<dyn ObjectDetector>,
    presenter: Box<dyn Presenter>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    use presence_core::acquisition::infrastructure::pylon_camera::PylonEnumerator;

    let pylon = pylon_cxx::Pylon::new();
    let enumerator = PylonEnumerator::new(&pylon);
    run_presence(&enumerator, settings, detector, presenter)
}

#[cfg(not(feature = "pylon"))]
fn run_cameras(
    _settings: &PresenceSettings,
    _detector: Box<dyn ObjectDetector>,
    _presenter: Box<dyn Presenter>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    Err("Built without camera support; rebuild with --features pylon or use --replay-left/--replay-right".into())
}

fn run_presence(
    enumerator: &dyn DeviceEnumerator,
    settings: &PresenceSettings,
    detector: Box<dyn ObjectDetector>,
    presenter: Box<dyn Presenter>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let cameras = open_camera_pair(enumerator, &settings.left_serial, &settings.right_serial)?;

    let mut app = PresenceApp::new(
        cameras,
        Box::new(PixelFormatConverter::new()),
        detector,
        presenter,
        Box::new(StdoutPipelineLogger::new(HEARTBEAT_ITERATIONS)),
        loop_config(settings),
    );
    Ok(app.run()?)
}

fn loop_config(settings: &PresenceSettings) -> LoopConfig {
    LoopConfig {
        timeout: settings.retrieve_timeout(),
        max_consecutive_timeouts: settings.max_consecutive_timeouts,
        key_delay_ms: KEY_POLL_DELAY_MS,
        max_iterations: settings.max_iterations,
    }
}

fn build_detector(
    settings: &PresenceSettings,
) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let location = ModelLocation {
        explicit: settings.model_path.as_deref(),
        bundled_dir: Some(Path::new(BUNDLED_MODEL_DIR)),
        url: settings.model_url.as_deref(),
    };
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        location,
        Some(Box::new(download_progress)),
    )?;
    log::info!("Using model {}", model_path.display());

    Ok(Box::new(OnnxYoloDetector::new(
        &model_path,
        settings.confidence,
    )?))
}

fn build_snapshot_presenter(
    dir: &Path,
    cli: &Cli,
    settings: &PresenceSettings,
) -> Result<SnapshotPresenter, Box<dyn std::error::Error>> {
    let presenter = SnapshotPresenter::new(dir, settings.display_size())?;
    match &cli.font {
        Some(font) => presenter.with_font(font),
        None => Ok(presenter),
    }
}

#[cfg(feature = "highgui")]
fn build_presenter(
    cli: &Cli,
    settings: &PresenceSettings,
) -> Result<Box<dyn Presenter>, Box<dyn std::error::Error>> {
    use presence_core::rendering::infrastructure::highgui_presenter::HighguiPresenter;

    match &cli.snapshot_dir {
        Some(dir) => Ok(Box::new(build_snapshot_presenter(dir, cli, settings)?)),
        None => Ok(Box::new(HighguiPresenter::new(settings.display_size()))),
    }
}

#[cfg(not(feature = "highgui"))]
fn build_presenter(
    cli: &Cli,
    settings: &PresenceSettings,
) -> Result<Box<dyn Presenter>, Box<dyn std::error::Error>> {
    use presence_core::rendering::infrastructure::log_presenter::LogPresenter;

    match &cli.snapshot_dir {
        Some(dir) => Ok(Box::new(build_snapshot_presenter(dir, cli, settings)?)),
        None => {
            log::warn!("Built without display support; logging status only");
            Ok(Box::new(LogPresenter::new()))
        }
    }
}

/// Settings file (or defaults) with any command-line overrides applied.
fn build_settings(cli: &Cli) -> Result<PresenceSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.settings {
        Some(path) => PresenceSettings::load(path)?,
        None => PresenceSettings::default(),
    };

    if let Some(serial) = &cli.left_serial {
        settings.left_serial = serial.clone();
    }
    if let Some(serial) = &cli.right_serial {
        settings.right_serial = serial.clone();
    }
    // Replayed directories are enumerated under their own names.
    if let (Some(left), Some(right)) = (&cli.replay_left, &cli.replay_right) {
        settings.left_serial = ImageDirectoryEnumerator::serial_of(left);
        settings.right_serial = ImageDirectoryEnumerator::serial_of(right);
    }
    if let Some(ms) = cli.timeout_ms {
        settings.retrieve_timeout_ms = ms;
    }
    if let Some(n) = cli.max_consecutive_timeouts {
        settings.max_consecutive_timeouts = n;
    }
    if let Some(c) = cli.confidence {
        settings.confidence = c;
    }
    if let Some(model) = &cli.model {
        settings.model_path = Some(model.clone());
    }
    if let Some(url) = &cli.model_url {
        settings.model_url = Some(url.clone());
    }
    if let Some(w) = cli.display_width {
        settings.display_width = w;
    }
    if let Some(h) = cli.display_height {
        settings.display_height = h;
    }
    if cli.max_iterations.is_some() {
        settings.max_iterations = cli.max_iterations;
    }

    settings.validate()?;
    Ok(settings)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.settings {
        if !path.is_file() {
            return Err(format!("Settings file not found: {}", path.display()).into());
        }
    }
    for dir in [&cli.replay_left, &cli.replay_right].into_iter().flatten() {
        if !dir.is_dir() {
            return Err(format!("Replay directory not found: {}", dir.display()).into());
        }
    }
    if cli.replay_left.is_some() && (cli.left_serial.is_some() || cli.right_serial.is_some()) {
        return Err("--left-serial/--right-serial cannot be combined with replay directories".into());
    }
    if let Some(model) = &cli.model {
        if !model.is_file() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Some(font) = &cli.font {
        if !font.is_file() {
            return Err(format!("Font file not found: {}", font.display()).into());
        }
    }
    if cli.max_iterations == Some(0) {
        return Err("--max-iterations must be at least 1".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}
