// src/approach/goal_composer.rs

use crate::types::{GoalPose, PoseSnapshot, Position, Quaternion};

/// Planar heading from a unit quaternion. Roll and pitch are assumed
/// negligible.
pub fn yaw_from_quaternion(q: &Quaternion) -> f64 {
    (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z))
}

/// Rotate a robot-relative (forward, lateral) offset into the world frame.
/// Height is left untouched.
pub fn project_offset(pose: &PoseSnapshot, distance: f64, lateral_offset: f64) -> Position {
    let yaw = yaw_from_quaternion(&pose.orientation);
    let (sin, cos) = yaw.sin_cos();
    Position {
        x: pose.position.x + distance * cos - lateral_offset * sin,
        y: pose.position.y + distance * sin + lateral_offset * cos,
        z: pose.position.z,
    }
}

/// Builds world-frame goals in a fixed frame.
#[derive(Debug, Clone)]
pub struct GoalComposer {
    frame_id: String,
}

impl GoalComposer {
    pub fn new(frame_id: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
        }
    }

    /// The goal keeps the platform's current orientation: translate, don't turn.
    pub fn compose(
        &self,
        pose: &PoseSnapshot,
        distance: f64,
        lateral_offset: f64,
        stamp_ms: u64,
    ) -> GoalPose {
        GoalPose {
            frame_id: self.frame_id.clone(),
            stamp_ms,
            position: project_offset(pose, distance, lateral_offset),
            orientation: pose.orientation,
        }
    }
}
