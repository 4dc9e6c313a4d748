//! YOLO output decoding.
//!
//! Anchor-free YOLO heads (v8 and later) emit one tensor of shape
//! `[1, 4 + C, N]`: for each of `N` proposals the box centre and size in
//! model-input pixels followed by `C` per-class scores. Some exports
//! transpose this to `[1, N, 4 + C]`; both layouts are accepted.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::detect::labels::ClassNames;
use crate::detect::result::{BoundingBox, Detection};

/// Post-processing thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YoloParams {
    /// Square model input size in pixels.
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// Candidate box in frame pixels, before integer rounding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with another candidate.
    pub fn iou(&self, other: &Candidate) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Truncate to integer pixel coordinates.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        )
    }
}

/// Decode a raw YOLO output tensor into frame-space candidates.
///
/// `shape` must be `[1, rows, cols]`. Coordinates are scaled from the
/// square model input to `frame_width` x `frame_height` and clamped to the
/// frame.
pub fn decode(
    data: &[f32],
    shape: &[usize],
    params: &YoloParams,
    frame_width: u32,
    frame_height: u32,
) -> Result<Vec<Candidate>> {
    let [batch, rows, cols] = shape else {
        return Err(anyhow!("expected a rank-3 YOLO output, got shape {:?}", shape));
    };
    if *batch != 1 {
        return Err(anyhow!("expected batch size 1, got {}", batch));
    }
    if data.len() != rows * cols {
        return Err(anyhow!(
            "YOLO output length {} does not match shape {:?}",
            data.len(),
            shape
        ));
    }

    // attributes-major unless the proposal axis is the short one
    let transposed = rows > cols;
    let (attrs, proposals) = if transposed {
        (*cols, *rows)
    } else {
        (*rows, *cols)
    };
    if attrs <= 4 {
        return Err(anyhow!("YOLO output has no class scores: shape {:?}", shape));
    }
    let num_classes = attrs - 4;
    let at = |attr: usize, proposal: usize| {
        if transposed {
            data[proposal * attrs + attr]
        } else {
            data[attr * proposals + proposal]
        }
    };

    let scale_x = frame_width as f32 / params.input_size as f32;
    let scale_y = frame_height as f32 / params.input_size as f32;
    let max_x = frame_width as f32;
    let max_y = frame_height as f32;

    let mut candidates = Vec::new();
    for i in 0..proposals {
        let mut best_class = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for c in 0..num_classes {
            let score = at(4 + c, i);
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }
        if !(best_score >= params.confidence_threshold) {
            continue;
        }

        let cx = at(0, i);
        let cy = at(1, i);
        let w = at(2, i);
        let h = at(3, i);

        candidates.push(Candidate {
            x1: ((cx - w / 2.0) * scale_x).clamp(0.0, max_x),
            y1: ((cy - h / 2.0) * scale_y).clamp(0.0, max_y),
            x2: ((cx + w / 2.0) * scale_x).clamp(0.0, max_x),
            y2: ((cy + h / 2.0) * scale_y).clamp(0.0, max_y),
            confidence: best_score,
            class_id: best_class,
        });
    }

    Ok(candidates)
}

/// Greedy class-aware NMS.
///
/// Output is ordered by descending confidence and capped at
/// `max_detections`.
pub fn nms(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if kept.len() >= max_detections {
            break;
        }
        if suppressed[i] {
            continue;
        }
        kept.push(candidates[i]);
        for j in (i + 1)..candidates.len() {
            if candidates[j].class_id == candidates[i].class_id
                && candidates[i].iou(&candidates[j]) > iou_threshold
            {
                suppressed[j] = true;
            }
        }
    }

    kept
}

/// Label surviving candidates.
pub fn into_detections(candidates: Vec<Candidate>, class_names: &ClassNames) -> Vec<Detection> {
    candidates
        .into_iter()
        .map(|c| {
            Detection::new(
                c.class_id,
                class_names.label(c.class_id),
                c.bounding_box(),
                c.confidence,
            )
        })
        .collect()
}
