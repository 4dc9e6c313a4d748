//! Camera ingestion.
//!
//! This module provides the camera source that feeds the frame processor:
//! - USB/V4L2 devices (feature: ingest-v4l2)
//! - Synthetic `stub://` cameras (testing, dry runs)
//!
//! All backends produce packed RGB `Frame` instances. Device pixel formats
//! are normalized to RGB at capture time.
//!
//! Capture is pull-based and blocking: one `get_frame` call reads exactly
//! one frame from the device. Nothing is buffered, decimated or retried.

mod camera;
pub mod normalize;
mod synthetic;
#[cfg(feature = "ingest-v4l2")]
mod v4l2;

pub use camera::{Camera, CameraConfig, CameraStats};
