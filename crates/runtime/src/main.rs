//! ROI Guard - detection-gated motor control loop

use anyhow::{Context, Result};
use clap::Parser;
use motor_control::{
    MotorController, MotorLink, MotorStateMachine, RecordingLink, SerialLink, DEFAULT_SETTLE_MS,
};
use roi_mask::DetectionGate;
use roi_regions::{RegionDocument, RegionStore};
use runtime::{
    frame_interval, init_logging, run_replay, AppConfig, ControlSession, LogSnapshotSink,
    ReplayOptions, SessionSettings,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Stop a motor when detections enter regions of interest"
)]
struct Args {
    /// Configuration file (toml, json, yaml); defaults to ./roi-guard.*
    #[arg(long, env = "ROI_GUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Region document, overrides the configured path
    #[arg(long)]
    regions: Option<PathBuf>,

    /// Mask to select at startup
    #[arg(long)]
    mask: Option<String>,

    /// Serial device, overrides the configured port
    #[arg(long)]
    port: Option<String>,

    /// JSON-lines event stream; reads stdin when omitted
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Pace frames at this rate instead of as fast as they arrive
    #[arg(long)]
    fps: Option<f64>,

    /// Record commands in memory instead of opening the serial port
    #[arg(long)]
    dry_run: bool,

    /// Leave the motor in its last state when the stream ends
    #[arg(long)]
    no_stop_on_exit: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = &args.regions {
        config.regions_path = path.clone();
    }
    if let Some(mask) = &args.mask {
        config.mask = Some(mask.clone());
    }
    if let Some(port) = &args.port {
        config.serial_port = port.clone();
    }

    init_logging(&config.log_level, config.log_json)?;

    info!("=== ROI Guard v{} ===", env!("CARGO_PKG_VERSION"));

    // Running with unknown regions is not safe
    let document = match RegionStore::new(&config.regions_path).load() {
        Ok(document) => document,
        Err(e) => {
            error!(
                "Cannot load region document {}: {}",
                config.regions_path.display(),
                e
            );
            return Err(e).context("Region document is required at startup");
        }
    };

    if args.dry_run {
        info!("Dry run: commands are recorded, not sent");
        run(RecordingLink::new(), document, config, &args).await
    } else {
        let link = SerialLink::open(
            &config.serial_port,
            config.baud_rate,
            Duration::from_millis(DEFAULT_SETTLE_MS),
        )
        .await;
        run(link, document, config, &args).await
    }
}

async fn run<L: MotorLink>(
    link: L,
    document: RegionDocument,
    mut config: AppConfig,
    args: &Args,
) -> Result<()> {
    let settings = SessionSettings {
        frame_size: config.frame_size(),
        reference_size: config.reference_size(),
        mask_params: config.mask_params(),
        screenshots_dir: config.screenshots_dir.clone(),
    };
    let gate = DetectionGate::new(config.gate_config())?;
    let controller = MotorController::new(MotorStateMachine::new(config.motor_config()), link);

    let mut session = ControlSession::new(
        document,
        config.mask.as_deref(),
        settings,
        gate,
        controller,
        LogSnapshotSink,
    )
    .context("Failed to start control session")?;
    info!(
        "Gating against mask '{}'",
        session.selected_mask().unwrap_or("<none>")
    );

    let options = ReplayOptions {
        frame_interval: args.fps.map(frame_interval).transpose()?,
        persist_to: args.config.clone().filter(|p| is_json(p)),
        stop_on_exit: !args.no_stop_on_exit,
        ..ReplayOptions::from_config(&config)
    };

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.replay {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open replay {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let summary = run_replay(&mut session, &mut config, reader, &options).await?;
    if summary.link_failures > 0 {
        warn!(
            "{} command(s) could not be delivered to {}",
            summary.link_failures,
            session.controller().link().endpoint()
        );
    }
    Ok(())
}

/// Settings are only written back to JSON configuration files
fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
}
