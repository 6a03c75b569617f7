// src/pipeline/tick_driver.rs
//
// Periodic clock for the controller. Ticks run one after another inside a
// single task, so a slow detector delays the next tick instead of overlapping
// it; missed periods are skipped, not replayed in a burst.

use super::event_bus::ControllerEvent;
use super::metrics::ControllerMetrics;
use super::snapshot::SnapshotReader;
use crate::approach::{ApproachController, TickReport};
use crate::detection::Detector;
use crate::types::{Frame, GoalPose, PoseSnapshot};
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub struct TickDriver<D> {
    controller: ApproachController<D>,
    frames: SnapshotReader<Frame>,
    poses: SnapshotReader<PoseSnapshot>,
    goals: mpsc::UnboundedSender<GoalPose>,
    metrics: ControllerMetrics,
    period: Duration,
}

impl<D: Detector> TickDriver<D> {
    pub fn new(
        controller: ApproachController<D>,
        frames: SnapshotReader<Frame>,
        poses: SnapshotReader<PoseSnapshot>,
        goals: mpsc::UnboundedSender<GoalPose>,
        period: Duration,
    ) -> Self {
        Self {
            controller,
            frames,
            poses,
            goals,
            metrics: ControllerMetrics::new(),
            period,
        }
    }

    pub fn controller(&self) -> &ApproachController<D> {
        &self.controller
    }

    pub fn metrics(&self) -> &ControllerMetrics {
        &self.metrics
    }

    /// Tick every period until `shutdown` resolves. Returns the driver so the
    /// caller can inspect final state and metrics.
    pub async fn run_until<F>(mut self, shutdown: F) -> Self
    where
        F: Future<Output = ()>,
    {
        info!("Tick driver started, period {:?}", self.period);
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = interval.tick() => self.tick_once(),
            }
        }

        let state = self.controller.state();
        info!(
            "Tick driver stopped in {} (tick {})",
            state.phase(),
            state.tick_counter()
        );
        self
    }

    pub fn tick_once(&mut self) {
        let started = Instant::now();
        let frame = self.frames.latest();
        let pose = self.poses.latest();

        self.metrics.inc(&self.metrics.ticks);
        match self
            .controller
            .tick(frame.as_deref(), pose.as_deref(), wall_clock_ms())
        {
            Ok(TickReport::Waiting {
                has_frame,
                has_pose,
            }) => {
                debug!("Waiting for input (frame: {}, pose: {})", has_frame, has_pose);
                self.metrics.inc(&self.metrics.ticks_waiting);
            }
            Ok(TickReport::Ran { detector_us, .. }) => {
                if let Some(us) = detector_us {
                    self.metrics.record_detector_time(us);
                }
            }
            Err(_) => self.metrics.inc(&self.metrics.ticks_failed),
        }

        for event in self.controller.drain_events() {
            self.route(event);
        }

        let elapsed = started.elapsed();
        if elapsed > self.period {
            warn!("Tick took {:?}, longer than period {:?}", elapsed, self.period);
            self.metrics.inc(&self.metrics.overruns);
        }
    }

    fn route(&self, event: ControllerEvent) {
        match event {
            ControllerEvent::GoalEmitted(goal) => {
                self.metrics.inc(&self.metrics.goals_emitted);
                if self.goals.send(goal).is_err() {
                    warn!("Goal consumer gone, goal dropped");
                }
            }
            ControllerEvent::ApproachStalled { .. } => {
                self.metrics.inc(&self.metrics.approaches_stalled);
            }
            ControllerEvent::PhaseChanged { from, to } => {
                debug!("Phase changed {} -> {}", from, to);
            }
            ControllerEvent::TargetLost | ControllerEvent::AwaitingArrival => {}
            ControllerEvent::TickFailed { reason } => {
                debug!("Tick failed: {}", reason);
            }
        }
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
