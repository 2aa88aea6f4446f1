mod config;
mod exit_pose;
mod histogram;
mod lifecycle;
mod motor;
mod pipeline;
mod sampler;
mod sensor;
mod steering;
mod types;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use config::{Config, MotorConfig};
use motor::{DryRunLink, LinkKind, MotorLink, NxtLink};
use pipeline::{ExitReason, FrameProcessor, snapshot::SnapshotWriter};
use sensor::{FrameSource, ReplaySource};
use steering::SteeringMode;

/// Steer a brick robot with your arms, from recorded skeleton tracking.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recorded tracker frames, one JSON object per line.
    #[arg(long)]
    replay: PathBuf,

    /// Overrides the steering mode from the configuration.
    #[arg(long, value_enum)]
    steering: Option<SteeringMode>,
}

fn connect_motor(config: &MotorConfig) -> Result<Box<dyn MotorLink>> {
    match config.link {
        LinkKind::DryRun => {
            log::info!("motor link: dry run");
            Ok(Box::new(DryRunLink::new()))
        }
        LinkKind::Nxt => {
            let Some(device) = &config.device else {
                bail!("motor.device must be set for the nxt link");
            };
            let link = NxtLink::open(device, &config.program)
                .with_context(|| format!("failed to connect to brick on {}", device.display()))?;
            log::info!("motor link: nxt on {}", device.display());
            Ok(Box::new(link))
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(mode) = args.steering {
        config.steering.mode = mode;
    }

    let mut source = ReplaySource::open(&args.replay)
        .with_context(|| format!("failed to open replay {}", args.replay.display()))?;
    log::info!("{}", config.steering.mode.label());
    let motor = connect_motor(&config.motor)?;
    let mut processor = FrameProcessor::new(&config, motor);

    let snapshots = match &config.overlay.snapshot_dir {
        Some(dir) => Some(SnapshotWriter::start(dir, config.overlay.snapshot_every)?),
        None => None,
    };

    let result = pipeline::run(
        &mut source,
        &mut processor,
        &config.overlay,
        snapshots.as_ref(),
    );

    processor.shutdown();
    source.shutdown();
    if let Some(writer) = snapshots {
        writer.stop();
    }

    match result.context("tracking failed")? {
        ExitReason::ExitPose => log::info!("exit pose held, shutting down"),
        ExitReason::EndOfStream => log::info!("replay finished"),
    }
    Ok(())
}
