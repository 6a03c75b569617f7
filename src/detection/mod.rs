// src/detection/mod.rs

mod detector;
mod distance_estimator;
mod types;
pub mod yolo;

// Re-export public APIs
pub use detector::{Detector, ScriptedDetector};
pub use distance_estimator::{DistanceEstimate, DistanceEstimator, EstimateError};
pub use types::*;
