// src/detection/detector.rs

use super::types::Detection;
use crate::types::Frame;
use anyhow::Result;
use std::collections::HashMap;

/// External object detector. Returns detections ranked best-first
/// (confidence ordering after NMS); callers only rely on index 0.
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }
}

/// Replays pre-recorded detections keyed by frame id, in the order they were
/// recorded. Frames without an entry produce an empty list.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    by_frame: HashMap<u64, Vec<Detection>>,
    calls: usize,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frame_id: u64, detections: Vec<Detection>) {
        self.by_frame.insert(frame_id, detections);
    }

    pub fn with(mut self, frame_id: u64, detections: Vec<Detection>) -> Self {
        self.insert(frame_id, detections);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        self.calls += 1;
        Ok(self.by_frame.get(&frame.id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::BoundingBox;

    fn frame(id: u64) -> Frame {
        Frame {
            id,
            data: Vec::new(),
            width: 640,
            height: 480,
            timestamp_ms: 0.0,
        }
    }

    fn det(label: i32, score: f32) -> Detection {
        Detection {
            label,
            score,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        }
    }

    #[test]
    fn test_unknown_frame_is_empty() {
        let mut detector = ScriptedDetector::new().with(1, vec![det(0, 0.9)]);
        assert!(detector.detect(&frame(2)).unwrap().is_empty());
        assert_eq!(detector.detect(&frame(1)).unwrap().len(), 1);
        assert_eq!(detector.calls(), 2);
    }

    #[test]
    fn test_recorded_ranking_is_kept() {
        // A lower score may still be the detector's top pick.
        let mut detector = ScriptedDetector::new().with(3, vec![det(1, 0.3), det(0, 0.8)]);
        let out = detector.detect(&frame(3)).unwrap();
        assert_eq!(out[0].label, 1);
        assert_eq!(out[1].label, 0);
    }

    #[test]
    fn test_boxed_detector_forwards() {
        let mut boxed: Box<dyn Detector> = Box::new(ScriptedDetector::new().with(5, vec![det(2, 0.5)]));
        assert_eq!(boxed.detect(&frame(5)).unwrap()[0].label, 2);
    }
}
