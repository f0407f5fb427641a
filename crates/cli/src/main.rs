mod settings;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};

use rollcall_core::capture::infrastructure::image_file_source::ImageFileSource;
use rollcall_core::session::session_config::SessionConfig;
use rollcall_core::session::session_controller::SessionController;
use rollcall_core::session::session_error::{NotReadyReason, SessionError};
use rollcall_core::session::session_event::SessionEvent;
use rollcall_core::session::session_logger::LogSessionLogger;
use rollcall_core::shared::api_client::ApiClient;
use rollcall_core::submission::domain::commit_client::CommitReceipt;
use rollcall_core::workflow::capture_workflow::CaptureWorkflow;

use settings::Settings;

/// Live face verification against the attendance API.
#[derive(Parser)]
#[command(name = "rollcall")]
struct Cli {
    /// Image file, or directory of images cycled as a camera feed.
    frames: PathBuf,

    /// Workflow: instant, mark or register.
    #[arg(long)]
    workflow: Option<String>,

    /// Student ID sent with the frame (required for register).
    #[arg(long)]
    student_id: Option<String>,

    /// Base URL of the attendance API.
    #[arg(long)]
    api_url: Option<String>,

    /// Detection polling interval in milliseconds.
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Per-request timeout in milliseconds.
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Detection calls allowed in flight before ticks are skipped.
    #[arg(long)]
    max_pending: Option<usize>,

    /// Seconds to wait for a face before giving up.
    #[arg(long)]
    max_wait: Option<u64>,

    /// Settings file (defaults to the platform config directory).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the effective settings back to the settings file.
    #[arg(long)]
    save_settings: bool,
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
    let settings_path = cli.settings.clone().or_else(Settings::default_path);
    let stored = match &settings_path {
        Some(path) => Settings::load_from(path)?,
        None => Settings::default(),
    };
    let settings = apply_overrides(stored, &cli)?;
    validate(&settings, cli.student_id.as_deref())?;

    if cli.save_settings {
        let path = settings_path.ok_or(settings::SettingsError::NoConfigDir)?;
        settings.save_to(&path)?;
        log::info!("Saved settings to {}", path.display());
    }

    let api = Arc::new(ApiClient::new(
        &settings.api_url,
        Duration::from_millis(settings.request_timeout_ms),
    )?);
    let frames = ImageFileSource::open(&cli.frames)?;
    log::info!("Loaded {} frame(s) from {}", frames.len(), cli.frames.display());
    let config = SessionConfig::new(
        Duration::from_millis(settings.poll_interval_ms),
        settings.max_pending_detections,
    )?;

    let session = settings.workflow.build_session(
        api,
        Arc::new(frames),
        config,
        Box::new(LogSessionLogger::new()),
    );
    let events = session.subscribe();
    session.open()?;
    println!("{} session open, waiting for a face...", settings.workflow);

    let result = commit_when_ready(
        &session,
        &events,
        cli.student_id,
        Duration::from_secs(settings.max_wait_secs),
    );
    session.close();

    let receipt = result?;
    report(&receipt);
    Ok(())
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Result<Settings, String> {
    if let Some(name) = &cli.workflow {
        settings.workflow = CaptureWorkflow::from_name(name)
            .ok_or_else(|| format!("unknown workflow '{name}' (expected instant, mark or register)"))?;
    }
    if let Some(url) = &cli.api_url {
        settings.api_url = url.clone();
    }
    if let Some(ms) = cli.poll_interval_ms {
        settings.poll_interval_ms = ms;
    }
    if let Some(ms) = cli.request_timeout_ms {
        settings.request_timeout_ms = ms;
    }
    if let Some(n) = cli.max_pending {
        settings.max_pending_detections = n;
    }
    if let Some(secs) = cli.max_wait {
        settings.max_wait_secs = secs;
    }
    Ok(settings)
}

fn validate(settings: &Settings, student_id: Option<&str>) -> Result<(), String> {
    if settings.request_timeout_ms == 0 {
        return Err("--request-timeout-ms must be greater than 0".into());
    }
    if settings.max_wait_secs == 0 {
        return Err("--max-wait must be greater than 0".into());
    }
    if settings.workflow == CaptureWorkflow::Register
        && student_id.map_or(true, |id| id.trim().is_empty())
    {
        return Err("--student-id is required for the register workflow".into());
    }
    Ok(())
}

/// Waits for the commit gate to open, then commits once and waits for the
/// outcome.
fn commit_when_ready(
    session: &SessionController,
    events: &Receiver<SessionEvent>,
    student_id: Option<String>,
    max_wait: Duration,
) -> Result<CommitReceipt, Box<dyn std::error::Error>> {
    let deadline = Instant::now() + max_wait;
    let mut face_visible = false;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let sample = match events.recv_timeout(remaining) {
            Ok(SessionEvent::DetectionChanged(sample)) => sample,
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => {
                return Err(format!("no face detected within {}s", max_wait.as_secs()).into())
            }
            Err(RecvTimeoutError::Disconnected) => return Err("session ended".into()),
        };

        if sample.face_detected != face_visible {
            face_visible = sample.face_detected;
            match (face_visible, sample.confidence) {
                (true, Some(c)) => log::info!("Face detected (confidence {c:.2})"),
                (true, None) => log::info!("Face detected"),
                (false, _) => log::info!("Face lost"),
            }
        }

        match session.commit(student_id.clone()) {
            Ok(handle) => {
                let outcome = handle.wait().ok_or("submission was discarded")?;
                return Ok(outcome.result?);
            }
            Err(SessionError::NotReady(NotReadyReason::NoFaceDetected)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn report(receipt: &CommitReceipt) {
    match receipt.attendance() {
        Some(record) => {
            let who = record
                .student
                .as_ref()
                .map(|s| s.full_name())
                .unwrap_or_else(|| "student".into());
            println!("{who}: {} on {}", record.status, record.date);
            if let Some(time_in) = &record.time_in {
                println!("  time in: {time_in}");
            }
            if let Some(score) = record.confidence_score {
                println!("  match confidence: {score:.2}");
            }
        }
        None => println!(
            "{}",
            receipt.message.as_deref().unwrap_or("Submission accepted")
        ),
    }
}
