// src/detection/yolo.rs
//
// YOLOv7 front/back end: letterbox preprocessing, decoding of the
// `[1, N, 5 + classes]` head and class-aware NMS. The ONNX Runtime session
// itself is only compiled with the `onnx` feature.

#![cfg_attr(not(feature = "onnx"), allow(dead_code))]

use super::types::{BoundingBox, Detection};
use anyhow::{bail, Result};
use tracing::debug;

const LETTERBOX_FILL: u8 = 114;
/// cx, cy, w, h, objectness
const BOX_FIELDS: usize = 5;

/// Mapping between source-image pixels and the square network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    pub fn fit(src_w: usize, src_h: usize, target_size: usize) -> Self {
        let scale = (target_size as f32 / src_w as f32).min(target_size as f32 / src_h as f32);
        let scaled_w = (src_w as f32 * scale) as usize;
        let scaled_h = (src_h as f32 * scale) as usize;
        Self {
            scale,
            pad_x: target_size.saturating_sub(scaled_w) as f32 / 2.0,
            pad_y: target_size.saturating_sub(scaled_h) as f32 / 2.0,
        }
    }

    /// Network-space corners back to source-image pixels.
    pub fn unmap(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox::from_corners(
            (x1 - self.pad_x) / self.scale,
            (y1 - self.pad_y) / self.scale,
            (x2 - self.pad_x) / self.scale,
            (y2 - self.pad_y) / self.scale,
        )
    }
}

/// Letterbox an RGB8 frame into a normalized CHW tensor of side `target_size`.
pub fn preprocess(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    target_size: usize,
) -> Result<(Vec<f32>, Letterbox)> {
    if src_w == 0 || src_h == 0 || target_size == 0 {
        bail!("Cannot letterbox an empty image ({}x{})", src_w, src_h);
    }
    if src.len() != src_w * src_h * 3 {
        bail!(
            "Frame buffer holds {} bytes, expected {} for {}x{} RGB8",
            src.len(),
            src_w * src_h * 3,
            src_w,
            src_h
        );
    }

    let letterbox = Letterbox::fit(src_w, src_h, target_size);
    let scaled_w = ((src_w as f32 * letterbox.scale) as usize).max(1);
    let scaled_h = ((src_h as f32 * letterbox.scale) as usize).max(1);
    let resized = resize_bilinear(src, src_w, src_h, scaled_w, scaled_h);

    let mut canvas = vec![LETTERBOX_FILL; target_size * target_size * 3];
    let off_x = letterbox.pad_x as usize;
    let off_y = letterbox.pad_y as usize;
    for y in 0..scaled_h.min(target_size - off_y) {
        for x in 0..scaled_w.min(target_size - off_x) {
            let src_idx = (y * scaled_w + x) * 3;
            let dst_idx = ((y + off_y) * target_size + x + off_x) * 3;
            canvas[dst_idx..dst_idx + 3].copy_from_slice(&resized[src_idx..src_idx + 3]);
        }
    }

    // [0, 255] -> [0, 1], HWC -> CHW
    let plane = target_size * target_size;
    let mut input = vec![0.0f32; 3 * plane];
    for (i, px) in canvas.chunks_exact(3).enumerate() {
        for c in 0..3 {
            input[c * plane + i] = px[c] as f32 / 255.0;
        }
    }

    Ok((input, letterbox))
}

fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_h * dst_w * 3];
    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;
            let sx0 = (sx.floor() as usize).min(src_w - 1);
            let sy0 = (sy.floor() as usize).min(src_h - 1);
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);
            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            for c in 0..3 {
                let p00 = src[(sy0 * src_w + sx0) * 3 + c] as f32;
                let p10 = src[(sy0 * src_w + sx1) * 3 + c] as f32;
                let p01 = src[(sy1 * src_w + sx0) * 3 + c] as f32;
                let p11 = src[(sy1 * src_w + sx1) * 3 + c] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * 3 + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    dst
}

/// Decode raw head rows into source-image detections.
/// Score is objectness times the best class probability.
pub fn decode(
    output: &[f32],
    row_len: usize,
    letterbox: &Letterbox,
    prob_threshold: f32,
) -> Vec<Detection> {
    if row_len <= BOX_FIELDS {
        return Vec::new();
    }

    let mut detections = Vec::new();
    for row in output.chunks_exact(row_len) {
        let objectness = row[4];
        if objectness < prob_threshold {
            continue;
        }

        let (label, class_score) = row[BOX_FIELDS..]
            .iter()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best });

        let score = objectness * class_score;
        if score < prob_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        detections.push(Detection {
            label: label as i32,
            score,
            bbox: letterbox.unmap(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
        });
    }

    debug!("Decoded {} candidates above {:.2}", detections.len(), prob_threshold);
    detections
}

/// Class-aware non-maximum suppression. Output is sorted best-first.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.label == candidate.label && k.bbox.iou(&candidate.bbox) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(feature = "onnx")]
pub use onnx::YoloDetector;

#[cfg(feature = "onnx")]
mod onnx {
    use super::{decode, nms, preprocess};
    use crate::detection::{Detection, Detector};
    use crate::types::{DetectorConfig, Frame};
    use anyhow::{Context, Result};
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use tracing::{debug, info};

    pub struct YoloDetector {
        session: Session,
        config: DetectorConfig,
    }

    impl YoloDetector {
        pub fn new(config: &DetectorConfig) -> Result<Self> {
            info!("Loading YOLO model: {}", config.weights);

            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(config.num_threads)?
                .commit_from_file(&config.weights)
                .context("Failed to load model")?;

            info!("✓ YOLO detector initialized");
            Ok(Self {
                session,
                config: config.clone(),
            })
        }
    }

    impl Detector for YoloDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
            let size = self.config.target_size;
            let (input, letterbox) = preprocess(&frame.data, frame.width, frame.height, size)?;

            let shape = [1, 3, size, size];
            let input_value =
                ort::value::Value::from_array((shape.as_slice(), input.into_boxed_slice()))?;
            let outputs = self
                .session
                .run(ort::inputs![self.config.input_name.as_str() => input_value])?;

            let (output_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
            let row_len = output_shape
                .last()
                .copied()
                .context("Model output has no dimensions")? as usize;

            let candidates = decode(data, row_len, &letterbox, self.config.prob_threshold);
            let detections = nms(candidates, self.config.nms_threshold);
            debug!("Detected {} objects in frame {}", detections.len(), frame.id);
            Ok(detections)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, classes: &[f32]) -> Vec<f32> {
        let mut r = vec![cx, cy, w, h, obj];
        r.extend_from_slice(classes);
        r
    }

    #[test]
    fn test_letterbox_fit_landscape() {
        let lb = Letterbox::fit(1280, 720, 640);
        assert_eq!(lb.scale, 0.5);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 140.0);
    }

    #[test]
    fn test_unmap_reverses_letterbox() {
        let lb = Letterbox::fit(1280, 720, 640);
        let b = lb.unmap(100.0, 200.0, 150.0, 240.0);
        assert_eq!(b.x, 200.0);
        assert_eq!(b.y, 120.0);
        assert_eq!(b.width, 100.0);
        assert_eq!(b.height, 80.0);
    }

    #[test]
    fn test_preprocess_shape_and_padding() {
        let src = vec![255u8; 4 * 2 * 3];
        let (input, lb) = preprocess(&src, 4, 2, 8).unwrap();
        assert_eq!(input.len(), 3 * 8 * 8);
        assert_eq!(lb.pad_y, 2.0);
        // top-left pixel is padding, row 2 is image
        assert!((input[0] - 114.0 / 255.0).abs() < 1e-6);
        assert!((input[2 * 8] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_rejects_short_buffer() {
        assert!(preprocess(&[0u8; 5], 4, 2, 8).is_err());
        assert!(preprocess(&[], 0, 0, 8).is_err());
    }

    #[test]
    fn test_decode_filters_and_picks_best_class() {
        let lb = Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        let mut output = row(50.0, 50.0, 20.0, 10.0, 0.9, &[0.2, 0.8]);
        output.extend(row(10.0, 10.0, 4.0, 4.0, 0.1, &[0.9, 0.1]));
        output.extend(row(80.0, 80.0, 4.0, 4.0, 0.5, &[0.3, 0.2]));

        let dets = decode(&output, 7, &lb, 0.25);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, 1);
        assert!((dets[0].score - 0.72).abs() < 1e-6);
        assert_eq!(dets[0].bbox, BoundingBox::new(40.0, 45.0, 20.0, 10.0));
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap_only() {
        let a = Detection {
            label: 0,
            score: 0.9,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        };
        let b = Detection {
            label: 0,
            score: 0.8,
            bbox: BoundingBox::new(1.0, 0.0, 10.0, 10.0),
        };
        let c = Detection {
            label: 1,
            score: 0.7,
            bbox: BoundingBox::new(1.0, 0.0, 10.0, 10.0),
        };

        let kept = nms(vec![c.clone(), b, a.clone()], 0.45);
        assert_eq!(kept, vec![a, c]);
    }
}
