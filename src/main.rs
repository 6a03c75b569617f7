// src/main.rs

mod approach;
mod config;
mod detection;
mod pipeline;
mod replay;
mod types;

use anyhow::Result;
use approach::ApproachController;
use clap::Parser;
use detection::Detector;
use pipeline::{snapshot_cell, TickDriver};
use replay::Scenario;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use types::Config;

#[derive(Debug, Parser)]
#[command(name = "shuttlecock-approach", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(long, env = "APPROACH_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// JSON-lines recording of frames and poses to replay
    #[arg(long)]
    scenario: PathBuf,

    /// Override controller.timer_period
    #[arg(long)]
    period_ms: Option<u64>,

    /// Keep ticking this long after the recording ends
    #[arg(long, default_value_t = 500)]
    linger_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(ms) = cli.period_ms {
        config.controller.timer_period = ms as f64 / 1000.0;
        config.validate()?;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "shuttlecock_approach={},ort=warn",
            config.logging.level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("🏸 Approach controller starting");
    log_parameters(&config);

    let scenario = Scenario::load(&cli.scenario)?;
    if scenario.is_empty() {
        warn!("Scenario {} has no events", cli.scenario.display());
    }

    let detector = build_detector(&config, &scenario)?;
    run(config, scenario, detector, Duration::from_millis(cli.linger_ms)).await
}

fn log_parameters(config: &Config) {
    let c = &config.controller;
    let d = &config.detector;
    info!("Got param: timer_period {}", c.timer_period);
    info!("Got param: width_side {}", c.width_side);
    info!("Got param: width_front {}", c.width_front);
    info!("Got param: focal_length {}", c.focal_length);
    info!("Got param: prob_threshold {}", d.prob_threshold);
    info!("Got param: nms_threshold {}", d.nms_threshold);
    info!("Got param: target_size {}", d.target_size);
    info!("Got param: weights {}", d.weights);
    info!("Got param: num_threads {}", d.num_threads);
    info!("Got param: input_name {}", d.input_name);
    info!("Got param: goal frame {}", config.goal.frame_id);
}

/// Recorded detections win; a recording without any runs the model on its pixels.
#[cfg(feature = "onnx")]
fn build_detector(config: &Config, scenario: &Scenario) -> Result<Box<dyn Detector>> {
    if scenario.has_detections() {
        info!("Using recorded detections from scenario");
        return Ok(Box::new(scenario.detector()));
    }
    info!("Scenario has no recorded detections, running YOLO on frames");
    Ok(Box::new(detection::yolo::YoloDetector::new(&config.detector)?))
}

#[cfg(not(feature = "onnx"))]
fn build_detector(_config: &Config, scenario: &Scenario) -> Result<Box<dyn Detector>> {
    if !scenario.has_detections() {
        warn!("Scenario has no recorded detections and the onnx feature is off; nothing will be detected");
    }
    info!("Using recorded detections from scenario");
    Ok(Box::new(scenario.detector()))
}

async fn run(
    config: Config,
    scenario: Scenario,
    detector: Box<dyn Detector>,
    linger: Duration,
) -> Result<()> {
    let (frame_tx, frame_rx) = snapshot_cell();
    let (pose_tx, pose_rx) = snapshot_cell();
    let (goal_tx, mut goal_rx) = mpsc::unbounded_channel();

    let period = config.controller.period()?;
    let controller = ApproachController::new(&config, detector);
    let driver = TickDriver::new(controller, frame_rx, pose_rx, goal_tx, period);

    // Navigation consumer: goals go to stdout, one JSON object per line.
    let consumer = tokio::spawn(async move {
        while let Some(goal) = goal_rx.recv().await {
            match serde_json::to_string(&goal) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to serialize goal: {}", e),
            }
        }
    });

    let replay = scenario.play(frame_tx, pose_tx);
    let (replay_done_tx, replay_done_rx) = tokio::sync::oneshot::channel::<Result<()>>();
    tokio::spawn(async move {
        let _ = replay_done_tx.send(replay.await);
    });

    let shutdown = async move {
        tokio::select! {
            result = replay_done_rx => {
                match result {
                    Ok(Ok(())) => tokio::time::sleep(linger).await,
                    Ok(Err(e)) => error!("Replay failed: {:#}", e),
                    Err(_) => error!("Replay task ended unexpectedly"),
                }
            }
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        }
    };

    let driver = driver.run_until(shutdown).await;
    let summary = driver.metrics().summary();
    let last_goal = driver.controller().last_goal().cloned();
    drop(driver);
    consumer.await?;

    info!("\n========================================");
    info!("  Ticks: {} ({} waiting for input)", summary.ticks, summary.ticks_waiting);
    info!("  Failed ticks: {}", summary.ticks_failed);
    info!("  Overruns: {}", summary.overruns);
    info!("  Goals emitted: {}", summary.goals_emitted);
    if let Some(goal) = last_goal {
        info!(
            "  Last goal: ({:.3}, {:.3}) in '{}'",
            goal.position.x, goal.position.y, goal.frame_id
        );
    }
    info!("  Stalled approaches: {}", summary.approaches_stalled);
    info!(
        "  Detector latency: last {} µs, max {} µs",
        summary.last_detector_us, summary.max_detector_us
    );
    info!("========================================\n");

    Ok(())
}
