// src/approach/controller.rs

use super::goal_composer::GoalComposer;
use super::hooks::{ApproachHooks, NoopHooks};
use super::state_machine::{Action, ControllerState, Phase, Transition};
use crate::detection::{Detector, DistanceEstimate, DistanceEstimator, EstimateError};
use crate::pipeline::{ControllerEvent, EventBus};
use crate::types::{Config, Frame, GoalPose, PoseSnapshot};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum TickError {
    #[error("detector failed: {0:#}")]
    Detector(anyhow::Error),
    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    /// Nothing to work on until both a frame and a pose have arrived.
    Waiting { has_frame: bool, has_pose: bool },
    Ran {
        phase: Phase,
        /// `None` when the phase does not consume detections.
        estimate: Option<DistanceEstimate>,
        detector_us: Option<u64>,
    },
}

/// Owns the approach state and carries out the side effects of each
/// transition: running the detector, composing goals, calling hooks.
pub struct ApproachController<D> {
    state: ControllerState,
    estimator: DistanceEstimator,
    composer: GoalComposer,
    detector: D,
    hooks: Box<dyn ApproachHooks>,
    events: EventBus,
    last_goal: Option<GoalPose>,
}

impl<D: Detector> ApproachController<D> {
    pub fn new(config: &Config, detector: D) -> Self {
        Self {
            state: ControllerState::new(),
            estimator: DistanceEstimator::from_config(&config.controller),
            composer: GoalComposer::new(config.goal.frame_id.clone()),
            detector,
            hooks: Box::new(NoopHooks),
            events: EventBus::default(),
            last_goal: None,
        }
    }

    #[allow(dead_code)]
    pub fn with_hooks(mut self, hooks: impl ApproachHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn last_goal(&self) -> Option<&GoalPose> {
        self.last_goal.as_ref()
    }

    #[cfg(test)]
    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn drain_events(&mut self) -> Vec<ControllerEvent> {
        self.events.drain()
    }

    /// One control period.
    ///
    /// A failed detector or estimate still counts as a tick while
    /// approaching (with no distance), so the closing verdict is reached even
    /// when detection keeps failing. In DETECTING the state is left as it was.
    pub fn tick(
        &mut self,
        frame: Option<&Frame>,
        pose: Option<&PoseSnapshot>,
        stamp_ms: u64,
    ) -> Result<TickReport, TickError> {
        let (Some(frame), Some(pose)) = (frame, pose) else {
            return Ok(TickReport::Waiting {
                has_frame: frame.is_some(),
                has_pose: pose.is_some(),
            });
        };

        let from = self.state.phase();
        debug!(
            "{} tick={} origin={:?} closing={}",
            from,
            self.state.tick_counter(),
            self.state.origin_distance(),
            self.state.closing_flag()
        );

        let (estimate, detector_us) = if from.consumes_detections() {
            match self.estimate(frame) {
                Ok((estimate, us)) => (Some(estimate), Some(us)),
                Err(e) => {
                    error!("Tick failed in {}: {}", from, e);
                    self.events.publish(ControllerEvent::TickFailed {
                        reason: e.to_string(),
                    });
                    if from == Phase::Approaching {
                        let transition = self.state.step(DistanceEstimate::Invalid);
                        self.apply(from, transition, pose, stamp_ms);
                    }
                    return Err(e);
                }
            }
        } else {
            (None, None)
        };

        let transition = self
            .state
            .step(estimate.unwrap_or(DistanceEstimate::Invalid));
        self.apply(from, transition, pose, stamp_ms);

        Ok(TickReport::Ran {
            phase: self.state.phase(),
            estimate,
            detector_us,
        })
    }

    fn apply(&mut self, from: Phase, transition: Transition, pose: &PoseSnapshot, stamp_ms: u64) {
        self.state = transition.state;
        let to = self.state.phase();

        if from != to {
            info!("Phase {} -> {}", from, to);
            self.events.publish(ControllerEvent::PhaseChanged { from, to });
        }

        match transition.action {
            Action::None | Action::ApproachConfirmed => {}
            Action::StartApproach {
                distance,
                lateral_offset,
            } => {
                let goal = self.composer.compose(pose, distance, lateral_offset, stamp_ms);
                info!(
                    "Goal in '{}': x={:.3} y={:.3} z={:.3}",
                    goal.frame_id, goal.position.x, goal.position.y, goal.position.z
                );
                self.last_goal = Some(goal.clone());
                self.events.publish(ControllerEvent::GoalEmitted(goal));
            }
            Action::TargetLost => {
                self.hooks.target_lost();
                self.events.publish(ControllerEvent::TargetLost);
            }
            Action::ApproachStalled { origin_distance } => {
                info!("Distance did not close from {:.3}, re-detecting", origin_distance);
                self.hooks.approach_stalled(origin_distance);
                self.events
                    .publish(ControllerEvent::ApproachStalled { origin_distance });
            }
            Action::AwaitingArrival => {
                self.hooks.awaiting_arrival(self.last_goal.as_ref());
                self.events.publish(ControllerEvent::AwaitingArrival);
            }
        }
    }

    fn estimate(&mut self, frame: &Frame) -> Result<(DistanceEstimate, u64), TickError> {
        let started = Instant::now();
        let detections = self.detector.detect(frame).map_err(TickError::Detector)?;
        let detector_us = started.elapsed().as_micros() as u64;

        let estimate = self.estimator.estimate(&detections, frame.width)?;
        let (distance, lateral_offset) = estimate.as_pair();
        if estimate.is_valid() {
            info!("dist: {:.3} x: {:.3}", distance, lateral_offset);
        } else {
            debug!("dist: {} x: {} (no detection)", distance, lateral_offset);
        }
        Ok((estimate, detector_us))
    }
}
