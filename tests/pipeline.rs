use anyhow::Result;
use tempfile::tempdir;

use vision_rangefinder::{
    BoundingBox, Camera, CameraConfig, CameraError, CameraMatrix, ClassNames, Detection,
    FrameProcessor, ObjectReport, ScriptedBackend,
};

fn stub_camera(device: &str) -> Camera {
    Camera::new(CameraConfig {
        device_id: device.to_string(),
        width: 640,
        height: 480,
        fps: 30,
    })
}

fn reference_processor() -> FrameProcessor {
    let backend = ScriptedBackend::sequence(
        ClassNames::coco(),
        vec![
            vec![
                Detection::new(0, "person", BoundingBox::new(100, 50, 300, 250), 0.91),
                Detection::new(56, "chair", BoundingBox::new(400, 300, 480, 420), 0.55),
            ],
            vec![Detection::new(0, "person", BoundingBox::new(10, 10, 40, 10), 0.5)],
        ],
    );
    let matrix = CameraMatrix::from_intrinsics(800.0, 800.0, 320.0, 240.0);
    FrameProcessor::new(Box::new(backend), &matrix, 1.7).expect("valid estimator")
}

#[test]
fn camera_to_report_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("objects.json");

    let mut camera = stub_camera("stub://pipeline");
    camera.start()?;
    let mut processor = reference_processor();

    let mut frame = camera.get_frame()?;
    let report = processor.process_frame(&mut frame)?;
    processor.save_to_json(&output, &report)?;

    let reloaded = ObjectReport::load_from_json(&output)?;
    assert_eq!(reloaded, report);
    assert_eq!(reloaded.objects.len(), 2);

    let person = &reloaded.objects[0];
    assert_eq!(person.class_label, "person");
    assert!((person.distance_meters - 6.8).abs() < 1e-12);
    assert_eq!(person.center, (200, 150));

    let chair = &reloaded.objects[1];
    assert_eq!(chair.class_label, "chair");
    assert_eq!(chair.distance_meters, 1.7 * 800.0 / 120.0);
    assert_eq!(chair.center, (440, 360));

    let raw = std::fs::read_to_string(&output)?;
    assert!(raw.starts_with("{\n    \"objects\": [\n        {\n"));

    // second frame only has a zero-height box
    let mut frame = camera.get_frame()?;
    let report = processor.process_frame(&mut frame)?;
    assert!(report.is_empty());
    processor.save_to_json(&output, &report)?;
    assert!(ObjectReport::load_from_json(&output)?.is_empty());

    camera.stop();
    Ok(())
}

#[test]
fn unopened_camera_never_yields_frames() {
    let mut camera = stub_camera("stub://closed");
    assert!(matches!(camera.get_frame(), Err(CameraError::Capture(_))));

    camera.start().expect("stub camera opens");
    camera.stop();
    assert!(matches!(camera.get_frame(), Err(CameraError::Capture(_))));
}

#[test]
fn capture_failure_is_surfaced_not_retried() -> Result<()> {
    let mut camera = stub_camera("stub://flaky?frames=2");
    camera.start()?;
    camera.get_frame()?;
    camera.get_frame()?;
    assert!(matches!(camera.get_frame(), Err(CameraError::Capture(_))));
    assert_eq!(camera.stats().frames_captured, 2);
    Ok(())
}

#[test]
fn live_resolution_change_reaches_processor() -> Result<()> {
    let mut camera = stub_camera("stub://resize");
    camera.start()?;
    camera.set_resolution(320, 240)?;
    camera.set_fps(5)?;
    assert_eq!(camera.active_resolution(), Some((320, 240)));

    let mut processor = reference_processor();
    let mut frame = camera.get_frame()?;
    assert_eq!((frame.width(), frame.height()), (320, 240));
    // boxes partly outside the smaller frame are still ranged
    let report = processor.process_frame(&mut frame)?;
    assert_eq!(report.len(), 2);
    Ok(())
}
