#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::ClassNames;
use crate::detect::result::Detection;
use crate::detect::yolo::{self, YoloParams};
use crate::frame::Frame;

/// Tract-based backend for YOLO ONNX models.
///
/// This backend loads a local model file once and runs it on every frame.
/// Frames are stretched to the square model input; boxes are scaled back to
/// frame pixels before they are returned.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    params: YoloParams,
    class_names: ClassNames,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        params: YoloParams,
        class_names: ClassNames,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = params.input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "TractBackend: loaded {} ({}x{} input, {} classes)",
            model_path.display(),
            size,
            size,
            class_names.len()
        );

        Ok(Self {
            model,
            params,
            class_names,
        })
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let size = self.params.input_size;
        let resized = image::imageops::resize(frame.image(), size, size, FilterType::Triangle);
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, size as usize, size as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );
        input.into_tensor()
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn class_names(&self) -> &ClassNames {
        &self.class_names
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape().to_vec();
        let data: Vec<f32> = view.iter().copied().collect();

        let candidates = yolo::decode(&data, &shape, &self.params, frame.width(), frame.height())?;
        let kept = yolo::nms(
            candidates,
            self.params.iou_threshold,
            self.params.max_detections,
        );
        log::debug!(
            "TractBackend: frame {} -> {} detections",
            frame.sequence,
            kept.len()
        );
        Ok(yolo::into_detections(kept, &self.class_names))
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = self.params.input_size as usize;
        let input = tract_ndarray::Array4::<f32>::zeros((1, 3, size, size)).into_tensor();
        self.model
            .run(tvec!(input.into()))
            .context("ONNX warm-up failed")?;
        Ok(())
    }
}
