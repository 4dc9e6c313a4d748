//! Vision rangefinder
//!
//! Captures frames from a camera, runs an object detector over each frame,
//! estimates the distance to every detected object from the height of its
//! bounding box, and writes the results as JSON.
//!
//! # Pipeline
//!
//! ```text
//! Camera::get_frame -> FrameProcessor::process_frame -> ObjectReport::save_to_json
//! ```
//!
//! Everything is synchronous and single-threaded. The camera owns its
//! device handle; the processor owns its detector.
//!
//! # Module Structure
//!
//! - `ingest`: camera source (V4L2 devices, synthetic `stub://` cameras)
//! - `detect`: detector backends (tract/ONNX YOLO, scripted) and YOLO decoding
//! - `estimate`: distance and center geometry
//! - `annotate`: drawing boxes and labels onto frames
//! - `processor`: ties detection, estimation and annotation together
//! - `report`: per-frame JSON reports
//! - `config`: file + environment configuration

pub mod annotate;
pub mod config;
pub mod detect;
pub mod error;
pub mod estimate;
pub mod frame;
pub mod ingest;
pub mod processor;
pub mod report;

pub use annotate::Annotator;
pub use detect::{BoundingBox, ClassNames, Detection, DetectorBackend, ScriptedBackend};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use error::{CameraError, EstimateError, ReportError};
pub use estimate::{bbox_center, estimate_distance, CameraMatrix, DistanceEstimator};
pub use frame::Frame;
pub use ingest::{Camera, CameraConfig, CameraStats};
pub use processor::FrameProcessor;
pub use report::{DetectedObject, ObjectReport};
