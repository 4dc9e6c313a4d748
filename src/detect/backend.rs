use anyhow::Result;

use crate::detect::labels::ClassNames;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Object detector backend.
///
/// Backends are black boxes: a frame goes in, labelled bounding boxes come
/// out. Boxes are in pixel coordinates of the frame that was passed in.
/// The order of the returned detections is the backend's own and is kept
/// all the way through to the serialized report.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Class-id to label lookup table used by this backend.
    fn class_names(&self) -> &ClassNames;

    /// Run detection on a frame.
    ///
    /// Implementations must treat the frame as read-only.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
