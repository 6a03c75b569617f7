// src/detection/types.rs
use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-image pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// One ranked detector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: i32,
    #[serde(default = "full_score")]
    pub score: f32,
    pub bbox: BoundingBox,
}

fn full_score() -> f32 {
    1.0
}

/// Which face of the target the detector saw. Selects the physical width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetProfile {
    Side,
    Front,
}

impl TargetProfile {
    pub fn from_label(label: i32) -> Self {
        if label == 0 {
            TargetProfile::Side
        } else {
            TargetProfile::Front
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_zero_is_side_everything_else_front() {
        assert_eq!(TargetProfile::from_label(0), TargetProfile::Side);
        assert_eq!(TargetProfile::from_label(1), TargetProfile::Front);
        assert_eq!(TargetProfile::from_label(7), TargetProfile::Front);
        assert_eq!(TargetProfile::from_label(-3), TargetProfile::Front);
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        let b = BoundingBox::new(100.0, 100.0, 20.0, 20.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::from_corners(5.0, 0.0, 15.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_detection_score_defaults_when_missing() {
        let det: Detection =
            serde_json::from_str(r#"{"label":1,"bbox":{"x":1.0,"y":2.0,"width":3.0,"height":4.0}}"#)
                .unwrap();
        assert_eq!(det.score, 1.0);
        assert_eq!(det.bbox.center_x(), 2.5);
    }
}
