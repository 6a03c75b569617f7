// src/replay.rs
//
// Recorded camera + odometry session, one JSON object per line:
//   {"at_ms": 0,  "pose":  {"position": {...}, "orientation": {...}}}
//   {"at_ms": 40, "frame": {"id": 1, "width": 640, "height": 480,
//                           "detections": [...], "rgb_path": "f0001.rgb"}}
// Blank lines and lines starting with '#' are ignored.

use crate::detection::{Detection, ScriptedDetector};
use crate::pipeline::SnapshotWriter;
use crate::types::{Frame, PoseSnapshot};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
struct ScenarioLine {
    at_ms: u64,
    #[serde(default)]
    pose: Option<PoseSnapshot>,
    #[serde(default)]
    frame: Option<ScenarioFrame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFrame {
    pub id: u64,
    pub width: usize,
    pub height: usize,
    /// Pre-computed detector output for this frame, best first.
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// Raw RGB8 pixels, relative to the scenario file.
    #[serde(default)]
    pub rgb_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum ScenarioEvent {
    Pose(PoseSnapshot),
    Frame(ScenarioFrame),
}

#[derive(Debug, Clone)]
pub struct TimedEvent {
    pub at: Duration,
    pub event: ScenarioEvent,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    events: Vec<TimedEvent>,
    base_dir: PathBuf,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let scenario = Self::parse(&text, base_dir)?;
        info!(
            "Loaded scenario {} ({} events, {:?})",
            path.display(),
            scenario.len(),
            scenario.duration()
        );
        Ok(scenario)
    }

    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut events = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parsed: ScenarioLine = serde_json::from_str(line)
                .with_context(|| format!("Scenario line {} is not valid", idx + 1))?;

            let at = Duration::from_millis(parsed.at_ms);
            let event = match (parsed.pose, parsed.frame) {
                (Some(pose), None) => ScenarioEvent::Pose(pose),
                (None, Some(frame)) => ScenarioEvent::Frame(frame),
                _ => bail!(
                    "Scenario line {} must carry exactly one of 'pose' or 'frame'",
                    idx + 1
                ),
            };
            events.push(TimedEvent { at, event });
        }

        events.sort_by_key(|e| e.at);
        Ok(Self {
            events,
            base_dir: base_dir.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[cfg(test)]
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    /// Time of the last event.
    pub fn duration(&self) -> Duration {
        self.events.last().map(|e| e.at).unwrap_or_default()
    }

    /// Whether any recorded frame carries detector output.
    pub fn has_detections(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(&e.event, ScenarioEvent::Frame(f) if !f.detections.is_empty()))
    }

    /// Detector that answers with the recorded detections of each frame.
    pub fn detector(&self) -> ScriptedDetector {
        let mut detector = ScriptedDetector::new();
        for event in &self.events {
            if let ScenarioEvent::Frame(frame) = &event.event {
                detector.insert(frame.id, frame.detections.clone());
            }
        }
        detector
    }

    /// Publish every event into the snapshot cells on its recorded schedule.
    pub async fn play(
        self,
        frames: SnapshotWriter<Frame>,
        poses: SnapshotWriter<PoseSnapshot>,
    ) -> Result<()> {
        let start = Instant::now();

        for TimedEvent { at, event } in self.events {
            time::sleep_until(start + at).await;
            match event {
                ScenarioEvent::Pose(pose) => {
                    let p = pose.position;
                    let o = pose.orientation;
                    debug!("Position -> x: {:.3}, y: {:.3}, z: {:.3}", p.x, p.y, p.z);
                    debug!(
                        "Orientation -> x: {:.3}, y: {:.3}, z: {:.3}, w: {:.3}",
                        o.x, o.y, o.z, o.w
                    );
                    poses.publish(pose);
                }
                ScenarioEvent::Frame(scene) => {
                    let data = match &scene.rgb_path {
                        Some(rel) => {
                            let path = self.base_dir.join(rel);
                            tokio::fs::read(&path)
                                .await
                                .with_context(|| format!("Failed to read {}", path.display()))?
                        }
                        None => Vec::new(),
                    };
                    debug!("Frame {} ({}x{})", scene.id, scene.width, scene.height);
                    frames.publish(Frame {
                        id: scene.id,
                        data,
                        width: scene.width,
                        height: scene.height,
                        timestamp_ms: at.as_secs_f64() * 1000.0,
                    });
                }
            }
        }

        info!("Scenario replay finished after {:?}", start.elapsed());
        Ok(())
    }
}
