use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::Builder;

use vision_rangefinder::config::{BackendKind, RangefinderConfig};
use vision_rangefinder::CameraMatrix;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "RANGEFINDER_CONFIG",
        "RANGEFINDER_DEVICE",
        "RANGEFINDER_MODEL",
        "RANGEFINDER_OUTPUT",
        "RANGEFINDER_OBJECT_HEIGHT",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    let json = r#"{
        "camera": { "device": "2", "width": 1280, "height": 720, "fps": 30 },
        "detector": {
            "backend": "tract",
            "model_path": "weights/yolov8n.onnx",
            "input_size": 320,
            "confidence_threshold": 0.4,
            "iou_threshold": 0.6
        },
        "estimation": {
            "object_height_m": 1.8,
            "camera_matrix": [[910.0, 0.0, 640.0], [0.0, 905.5, 360.0], [0.0, 0.0, 1.0]]
        },
        "output": { "path": "out/objects.json" }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("RANGEFINDER_CONFIG", file.path());
    std::env::set_var("RANGEFINDER_DEVICE", "stub://bench");
    std::env::set_var("RANGEFINDER_OBJECT_HEIGHT", "0.5");

    let cfg = RangefinderConfig::load().expect("load config");

    assert_eq!(cfg.camera.device_id, "stub://bench");
    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.camera.height, 720);
    assert_eq!(cfg.camera.fps, 30);
    assert_eq!(cfg.detector.backend, BackendKind::Tract);
    assert_eq!(
        cfg.detector.model_path,
        Some(PathBuf::from("weights/yolov8n.onnx"))
    );
    assert_eq!(cfg.detector.yolo.input_size, 320);
    assert_eq!(cfg.detector.yolo.confidence_threshold, 0.4);
    assert_eq!(cfg.detector.yolo.iou_threshold, 0.6);
    assert_eq!(cfg.estimation.object_height_m, 0.5);
    assert_eq!(cfg.estimation.camera_matrix.focal_length_y(), 905.5);
    assert_eq!(cfg.output_path, PathBuf::from("out/objects.json"));

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
[camera]
device = "stub://front"
fps = 15

[detector]
backend = "scripted"
scripted = [{ class_id = 2, bounding_box = [10, 20, 110, 120], confidence = 0.7 }]

[estimation]
object_height_m = 1.5
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = RangefinderConfig::load_from(file.path()).expect("load config");

    assert_eq!(cfg.camera.device_id, "stub://front");
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.fps, 15);
    assert_eq!(cfg.detector.backend, BackendKind::Scripted);
    assert_eq!(cfg.detector.scripted.len(), 1);
    assert_eq!(cfg.detector.scripted[0].class_label, "car");
    assert_eq!(cfg.estimation.object_height_m, 1.5);
    assert_eq!(cfg.estimation.camera_matrix, CameraMatrix::default());

    clear_env();
}

#[test]
fn invalid_env_override_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    file.write_all(br#"{ "detector": { "backend": "scripted" } }"#)
        .expect("write config");
    std::env::set_var("RANGEFINDER_CONFIG", file.path());
    std::env::set_var("RANGEFINDER_OBJECT_HEIGHT", "tall");

    assert!(RangefinderConfig::load().is_err());

    std::env::set_var("RANGEFINDER_OBJECT_HEIGHT", "-1");
    assert!(RangefinderConfig::load().is_err());

    clear_env();
}

#[test]
fn tract_backend_requires_a_model() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let err = RangefinderConfig::load().unwrap_err();
    assert!(err.to_string().contains("model_path"));

    clear_env();
}
