use anyhow::Result;
use std::collections::VecDeque;

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::ClassNames;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Backend that replays canned detections instead of running a model.
///
/// Used for tests and for dry runs against a `stub://` camera.
pub struct ScriptedBackend {
    class_names: ClassNames,
    mode: Script,
    calls: u64,
}

enum Script {
    /// Same detections for every frame.
    Repeat(Vec<Detection>),
    /// One entry per frame; empty once exhausted.
    Sequence(VecDeque<Vec<Detection>>),
}

impl ScriptedBackend {
    pub fn repeating(class_names: ClassNames, detections: Vec<Detection>) -> Self {
        Self {
            class_names,
            mode: Script::Repeat(detections),
            calls: 0,
        }
    }

    pub fn sequence(class_names: ClassNames, frames: Vec<Vec<Detection>>) -> Self {
        Self {
            class_names,
            mode: Script::Sequence(frames.into()),
            calls: 0,
        }
    }

    /// Number of frames seen so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn class_names(&self) -> &ClassNames {
        &self.class_names
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        self.calls += 1;
        Ok(match &mut self.mode {
            Script::Repeat(detections) => detections.clone(),
            Script::Sequence(frames) => frames.pop_front().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;

    fn frame() -> Frame {
        Frame::from_rgb(vec![0u8; 12], 2, 2, 1).unwrap()
    }

    #[test]
    fn sequence_backend_drains_then_goes_quiet() -> Result<()> {
        let person = Detection::new(0, "person", BoundingBox::new(0, 0, 1, 1), 0.9);
        let mut backend =
            ScriptedBackend::sequence(ClassNames::coco(), vec![vec![person.clone()], vec![]]);

        assert_eq!(backend.detect(&frame())?, vec![person]);
        assert!(backend.detect(&frame())?.is_empty());
        assert!(backend.detect(&frame())?.is_empty());
        assert_eq!(backend.calls(), 3);
        Ok(())
    }

    #[test]
    fn repeating_backend_replays() -> Result<()> {
        let car = Detection::new(2, "car", BoundingBox::new(0, 0, 4, 4), 0.6);
        let mut backend = ScriptedBackend::repeating(ClassNames::coco(), vec![car.clone()]);
        assert_eq!(backend.detect(&frame())?, vec![car.clone()]);
        assert_eq!(backend.detect(&frame())?, vec![car]);
        assert_eq!(backend.name(), "scripted");
        Ok(())
    }
}
