use thiserror::Error;

/// Errors raised by the camera source.
///
/// Both kinds are fatal to the calling operation and are never retried.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("unable to open camera {device}: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    #[error("capture failed: {0}")]
    Capture(String),
}

/// Errors raised by the distance/center geometry.
#[derive(Error, Debug, PartialEq)]
pub enum EstimateError {
    #[error("degenerate bounding box: pixel height {pixel_height} (y_min {y_min}, y_max {y_max})")]
    DegenerateBox {
        y_min: i32,
        y_max: i32,
        pixel_height: i64,
    },

    #[error("invalid estimation parameter: {0}")]
    InvalidParameter(String),
}

/// Errors raised while persisting or reloading an object report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
