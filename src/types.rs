// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerConfig,
    pub detector: DetectorConfig,
    pub goal: GoalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Tick period in seconds
    pub timer_period: f64,
    /// Physical target width used for label 0 (side profile)
    pub width_side: f64,
    /// Physical target width used for every other label (front profile)
    pub width_front: f64,
    pub focal_length: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timer_period: 0.05,
            width_side: 68.0,
            width_front: 95.0,
            focal_length: 3.15,
        }
    }
}

/// Consumed by the detector only; the controller never reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub weights: String,
    pub target_size: usize,
    pub prob_threshold: f32,
    pub nms_threshold: f32,
    pub num_threads: usize,
    pub input_name: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            weights: "weights/best100ep1inp.onnx".to_string(),
            target_size: 640,
            prob_threshold: 0.25,
            nms_threshold: 0.45,
            num_threads: 4,
            input_name: "images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    pub frame_id: String,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            frame_id: "map".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Packed RGB8 image as delivered by the camera collaborator.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: u64,
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    /// Pure rotation about the z axis.
    #[cfg(test)]
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw / 2.0;
        Self {
            x: 0.0,
            y: 0.0,
            z: half.sin(),
            w: half.cos(),
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Latest platform pose. Replaced wholesale on every odometry update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSnapshot {
    pub position: Position,
    pub orientation: Quaternion,
}

/// World-frame navigation goal handed to the navigation consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalPose {
    pub frame_id: String,
    pub stamp_ms: u64,
    pub position: Position,
    pub orientation: Quaternion,
}
