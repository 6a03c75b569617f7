// src/detection/distance_estimator.rs
//
// Inverse pinhole projection: known physical width + observed pixel width
// gives range; the box centre's pixel offset from the optical axis gives
// the lateral offset at that range.

use super::types::{Detection, TargetProfile};
use crate::types::ControllerConfig;
use thiserror::Error;
use tracing::debug;

/// Physical width of the camera sensor, same unit family as the focal length.
pub const SENSOR_WIDTH_MM: f64 = 3.6;

/// Value both fields take when no detection is available.
pub const INVALID_SENTINEL: f64 = -1.0;

#[derive(Debug, Error, PartialEq)]
pub enum EstimateError {
    #[error("degenerate bounding box width {width}")]
    DegenerateBoundingBox { width: f32 },
    #[error("image width must be positive")]
    EmptyImage,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceEstimate {
    /// Detector returned nothing this tick.
    Invalid,
    Valid {
        distance: f64,
        /// Positive when the target is right of the image centre.
        lateral_offset: f64,
    },
}

impl DistanceEstimate {
    pub fn is_valid(&self) -> bool {
        matches!(self, DistanceEstimate::Valid { .. })
    }

    pub fn distance(&self) -> Option<f64> {
        match self {
            DistanceEstimate::Valid { distance, .. } => Some(*distance),
            DistanceEstimate::Invalid => None,
        }
    }

    /// `(distance, lateral_offset)`, or `(-1, -1)` when invalid.
    pub fn as_pair(&self) -> (f64, f64) {
        match self {
            DistanceEstimate::Valid {
                distance,
                lateral_offset,
            } => (*distance, *lateral_offset),
            DistanceEstimate::Invalid => (INVALID_SENTINEL, INVALID_SENTINEL),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetWidths {
    pub side: f64,
    pub front: f64,
}

impl TargetWidths {
    pub fn for_profile(&self, profile: TargetProfile) -> f64 {
        match profile {
            TargetProfile::Side => self.side,
            TargetProfile::Front => self.front,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    focal_length: f64,
    widths: TargetWidths,
}

impl DistanceEstimator {
    pub fn new(focal_length: f64, widths: TargetWidths) -> Self {
        Self {
            focal_length,
            widths,
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(
            config.focal_length,
            TargetWidths {
                side: config.width_side,
                front: config.width_front,
            },
        )
    }

    /// Effective focal length in pixels for an image of the given width.
    pub fn focal_px(&self, image_width: usize) -> f64 {
        self.focal_length * image_width as f64 / SENSOR_WIDTH_MM
    }

    /// Estimate range and lateral offset from the top-ranked detection.
    /// Everything after index 0 is ignored.
    pub fn estimate(
        &self,
        detections: &[Detection],
        image_width: usize,
    ) -> Result<DistanceEstimate, EstimateError> {
        let Some(best) = detections.first() else {
            return Ok(DistanceEstimate::Invalid);
        };

        if image_width == 0 {
            return Err(EstimateError::EmptyImage);
        }
        let box_width = best.bbox.width;
        if !box_width.is_finite() || box_width <= 0.0 {
            return Err(EstimateError::DegenerateBoundingBox { width: box_width });
        }

        let image_width_px = image_width as f64;
        let focal_px = self.focal_px(image_width);
        let physical_width = self.widths.for_profile(TargetProfile::from_label(best.label));

        let distance = physical_width * focal_px / box_width as f64;
        let pixel_offset = best.bbox.center_x() as f64 - image_width_px / 2.0;
        let lateral_offset =
            distance / self.focal_length * (SENSOR_WIDTH_MM / image_width_px) * pixel_offset;

        debug!(
            "label={} box_w={:.1} focal_px={:.1} -> dist={:.3} x={:.3}",
            best.label, box_width, focal_px, distance, lateral_offset
        );

        Ok(DistanceEstimate::Valid {
            distance,
            lateral_offset,
        })
    }
}
