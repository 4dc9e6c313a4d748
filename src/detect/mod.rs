mod backend;
pub mod backends;
mod labels;
mod result;
pub mod yolo;

pub use backend::DetectorBackend;
pub use backends::ScriptedBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use labels::ClassNames;
pub use result::{BoundingBox, Detection};
