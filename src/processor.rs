//! Frame processor: detection, distance estimation and annotation.

use anyhow::{Context, Result};
use std::path::Path;

use crate::annotate::Annotator;
use crate::detect::{BoundingBox, Detection, DetectorBackend};
use crate::error::{EstimateError, ReportError};
use crate::estimate::{bbox_center, CameraMatrix, DistanceEstimator};
use crate::frame::Frame;
use crate::report::{DetectedObject, ObjectReport};

/// Turns frames into object reports.
///
/// Every call is synchronous and independent of the previous one apart
/// from whatever state the detector backend keeps.
pub struct FrameProcessor {
    detector: Box<dyn DetectorBackend>,
    estimator: DistanceEstimator,
    annotator: Annotator,
}

impl FrameProcessor {
    /// `object_height_m` is the real-world height assumed for every
    /// detected object.
    pub fn new(
        detector: Box<dyn DetectorBackend>,
        camera_matrix: &CameraMatrix,
        object_height_m: f64,
    ) -> Result<Self, EstimateError> {
        Ok(Self {
            detector,
            estimator: DistanceEstimator::new(camera_matrix, object_height_m)?,
            annotator: Annotator::new(),
        })
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    pub fn estimator(&self) -> &DistanceEstimator {
        &self.estimator
    }

    /// Run the detector over `frame`.
    pub fn detect_objects(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let name = self.detector.name();
        self.detector
            .detect(frame)
            .with_context(|| format!("{} detector failed on frame {}", name, frame.sequence))
    }

    pub fn calculate_distance(&self, bbox: &BoundingBox) -> Result<f64, EstimateError> {
        self.estimator.distance(bbox)
    }

    pub fn get_center(&self, bbox: &BoundingBox) -> (i32, i32) {
        bbox_center(bbox)
    }

    pub fn draw_bounding_box(&self, frame: &mut Frame, bbox: &BoundingBox, label: &str) {
        self.annotator.draw(frame.image_mut(), bbox, label);
    }

    /// Label for a detection: the detector's own, or its class-name table
    /// entry when the detector left it blank.
    fn label_for(&self, detection: &Detection) -> String {
        if detection.class_label.is_empty() {
            self.detector.class_names().label(detection.class_id)
        } else {
            detection.class_label.clone()
        }
    }

    /// Detect, measure and annotate one frame.
    ///
    /// Objects keep the detector's order. Detections whose box has no
    /// vertical extent cannot be ranged; they are logged and left out of
    /// the report and the annotation.
    pub fn process_frame(&mut self, frame: &mut Frame) -> Result<ObjectReport> {
        let detections = self.detect_objects(frame)?;
        let mut report = ObjectReport::new();

        for detection in detections {
            let bbox = detection.bounding_box;
            let label = self.label_for(&detection);
            let distance = match self.calculate_distance(&bbox) {
                Ok(distance) => distance,
                Err(err) => {
                    log::warn!(
                        "FrameProcessor: frame {}: skipping {}: {}",
                        frame.sequence,
                        label,
                        err
                    );
                    continue;
                }
            };

            self.draw_bounding_box(frame, &bbox, &label);
            report.push(DetectedObject {
                center: self.get_center(&bbox),
                class_label: label,
                bounding_box: bbox,
                distance_meters: distance,
            });
        }

        log::debug!(
            "FrameProcessor: frame {} -> {} objects",
            frame.sequence,
            report.len()
        );
        Ok(report)
    }

    pub fn save_to_json(&self, path: &Path, report: &ObjectReport) -> Result<(), ReportError> {
        report.save_to_json(path)
    }
}
