use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::yolo::YoloParams;
use crate::detect::{BoundingBox, ClassNames, Detection, DetectorBackend, ScriptedBackend};
use crate::estimate::CameraMatrix;
use crate::ingest::CameraConfig;

const DEFAULT_OUTPUT_PATH: &str = "detections.json";
const DEFAULT_OBJECT_HEIGHT_M: f64 = 1.7;
const DEFAULT_BACKEND: &str = "tract";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RangefinderConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    estimation: Option<EstimationConfigFile>,
    annotation: Option<AnnotationConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    max_detections: Option<usize>,
    scripted: Option<Vec<ScriptedDetectionFile>>,
}

#[derive(Debug, Deserialize, Clone)]
struct ScriptedDetectionFile {
    class_id: usize,
    bounding_box: BoundingBox,
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct EstimationConfigFile {
    object_height_m: Option<f64>,
    camera_matrix: Option<CameraMatrix>,
}

#[derive(Debug, Deserialize, Default)]
struct AnnotationConfigFile {
    font_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RangefinderConfig {
    pub camera: CameraConfig,
    pub detector: DetectorSettings,
    pub estimation: EstimationSettings,
    pub font_path: Option<PathBuf>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendKind {
    /// YOLO ONNX model run with tract.
    Tract,
    /// Canned detections, no model.
    Scripted,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: BackendKind,
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    /// Loaded once from `labels_path`, COCO otherwise.
    pub class_names: ClassNames,
    pub yolo: YoloParams,
    pub scripted: Vec<Detection>,
}

#[derive(Debug, Clone)]
pub struct EstimationSettings {
    pub object_height_m: f64,
    pub camera_matrix: CameraMatrix,
}

impl RangefinderConfig {
    /// Load from `RANGEFINDER_CONFIG` (JSON, or TOML by extension) with
    /// environment overrides applied on top.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("RANGEFINDER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a specific file, still honouring environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RangefinderConfigFile) -> Result<Self> {
        let camera_defaults = CameraConfig::default();
        let camera = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            device_id: camera.device.unwrap_or(camera_defaults.device_id),
            width: camera.width.unwrap_or(camera_defaults.width),
            height: camera.height.unwrap_or(camera_defaults.height),
            fps: camera.fps.unwrap_or(camera_defaults.fps),
        };

        let yolo_defaults = YoloParams::default();
        let detector = file.detector.unwrap_or_default();
        let backend = parse_backend(detector.backend.as_deref().unwrap_or(DEFAULT_BACKEND))?;
        let class_names = match &detector.labels_path {
            Some(path) => ClassNames::from_file(path)?,
            None => ClassNames::coco(),
        };
        let scripted = detector
            .scripted
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                Detection::new(
                    entry.class_id,
                    class_names.label(entry.class_id),
                    entry.bounding_box,
                    entry.confidence.unwrap_or(1.0),
                )
            })
            .collect();
        let detector = DetectorSettings {
            backend,
            model_path: detector.model_path,
            labels_path: detector.labels_path,
            class_names,
            yolo: YoloParams {
                input_size: detector.input_size.unwrap_or(yolo_defaults.input_size),
                confidence_threshold: detector
                    .confidence_threshold
                    .unwrap_or(yolo_defaults.confidence_threshold),
                iou_threshold: detector
                    .iou_threshold
                    .unwrap_or(yolo_defaults.iou_threshold),
                max_detections: detector
                    .max_detections
                    .unwrap_or(yolo_defaults.max_detections),
            },
            scripted,
        };

        let estimation = file.estimation.unwrap_or_default();
        let estimation = EstimationSettings {
            object_height_m: estimation
                .object_height_m
                .unwrap_or(DEFAULT_OBJECT_HEIGHT_M),
            camera_matrix: estimation.camera_matrix.unwrap_or_default(),
        };

        Ok(Self {
            camera,
            detector,
            estimation,
            font_path: file.annotation.and_then(|annotation| annotation.font_path),
            output_path: file
                .output
                .and_then(|output| output.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("RANGEFINDER_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device_id = device.trim().to_string();
            }
        }
        if let Ok(model) = std::env::var("RANGEFINDER_MODEL") {
            if !model.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(model));
            }
        }
        if let Ok(output) = std::env::var("RANGEFINDER_OUTPUT") {
            if !output.trim().is_empty() {
                self.output_path = PathBuf::from(output);
            }
        }
        if let Ok(height) = std::env::var("RANGEFINDER_OBJECT_HEIGHT") {
            self.estimation.object_height_m = height.trim().parse().map_err(|_| {
                anyhow!("RANGEFINDER_OBJECT_HEIGHT must be a number of metres")
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!(
                "camera resolution must be non-zero, got {}x{}",
                self.camera.width,
                self.camera.height
            ));
        }
        if self.camera.fps == 0 {
            return Err(anyhow!("camera fps must be greater than zero"));
        }
        if !(self.estimation.object_height_m > 0.0) {
            return Err(anyhow!("object height must be greater than zero"));
        }
        if !(self.estimation.camera_matrix.focal_length_y() > 0.0) {
            return Err(anyhow!("camera_matrix[1][1] (focal length) must be positive"));
        }
        let yolo = &self.detector.yolo;
        if yolo.input_size == 0 {
            return Err(anyhow!("detector input_size must be greater than zero"));
        }
        if yolo.max_detections == 0 {
            return Err(anyhow!("detector max_detections must be greater than zero"));
        }
        for (name, value) in [
            ("confidence_threshold", yolo.confidence_threshold),
            ("iou_threshold", yolo.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("detector {} must be within [0, 1], got {}", name, value));
            }
        }
        if self.detector.backend == BackendKind::Tract && self.detector.model_path.is_none() {
            return Err(anyhow!(
                "the tract backend needs detector.model_path (or RANGEFINDER_MODEL)"
            ));
        }
        Ok(())
    }

    /// Build the configured detector backend.
    pub fn build_detector(&self) -> Result<Box<dyn DetectorBackend>> {
        let class_names = self.detector.class_names.clone();
        match self.detector.backend {
            BackendKind::Scripted => Ok(Box::new(ScriptedBackend::repeating(
                class_names,
                self.detector.scripted.clone(),
            ))),
            BackendKind::Tract => self.build_tract(class_names),
        }
    }

    #[cfg(feature = "backend-tract")]
    fn build_tract(&self, class_names: ClassNames) -> Result<Box<dyn DetectorBackend>> {
        let model_path = self
            .detector
            .model_path
            .as_ref()
            .ok_or_else(|| anyhow!("tract backend requires a model path"))?;
        let backend =
            crate::detect::TractBackend::new(model_path, self.detector.yolo.clone(), class_names)?;
        Ok(Box::new(backend))
    }

    #[cfg(not(feature = "backend-tract"))]
    fn build_tract(&self, _class_names: ClassNames) -> Result<Box<dyn DetectorBackend>> {
        Err(anyhow!("the tract backend requires the backend-tract feature"))
    }
}

fn parse_backend(name: &str) -> Result<BackendKind> {
    match name.trim().to_ascii_lowercase().as_str() {
        "tract" => Ok(BackendKind::Tract),
        "scripted" | "stub" => Ok(BackendKind::Scripted),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

fn read_config_file(path: &Path) -> Result<RangefinderConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
