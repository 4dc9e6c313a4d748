//! rangefinder - capture, detect and range objects from a camera
//!
//! This tool:
//! 1. Loads configuration (RANGEFINDER_CONFIG / --config, env overrides)
//! 2. Opens the camera
//! 3. Runs the detector on each frame and estimates object distances
//! 4. Writes the latest frame's report to the output JSON file
//! 5. Optionally saves annotated frames
//!
//! Stops after --frames frames, or on Ctrl-C when --frames is 0.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use vision_rangefinder::config::RangefinderConfig;
use vision_rangefinder::{Annotator, Camera, FrameProcessor};

#[derive(Parser, Debug)]
#[command(
    name = "rangefinder",
    about = "Detect objects in a camera feed and estimate their distance"
)]
struct Args {
    /// Config file (JSON, or TOML by extension). Defaults to $RANGEFINDER_CONFIG.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Camera device: index, device path or stub://name.
    #[arg(long, value_name = "ID")]
    device: Option<String>,

    /// Number of frames to process (0 = until Ctrl-C).
    #[arg(long, default_value_t = 1)]
    frames: u64,

    /// Report output path (overrides config).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Directory for annotated JPEG frames.
    #[arg(long, value_name = "DIR")]
    annotated_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => RangefinderConfig::load_from(path)?,
        None => RangefinderConfig::load()?,
    };
    if let Some(device) = args.device {
        cfg.camera.device_id = device;
    }
    if let Some(output) = args.output {
        cfg.output_path = output;
    }
    if let Some(dir) = &args.annotated_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating annotated frame directory {}", dir.display()))?;
    }

    let mut detector = cfg.build_detector()?;
    detector.warm_up()?;
    let mut annotator = Annotator::new();
    if let Some(font_path) = &cfg.font_path {
        annotator = annotator.with_font_file(font_path)?;
        log::info!("annotating with font {}", font_path.display());
    }
    let mut processor = FrameProcessor::new(
        detector,
        &cfg.estimation.camera_matrix,
        cfg.estimation.object_height_m,
    )?
    .with_annotator(annotator);

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut camera = Camera::new(cfg.camera.clone());
    camera.start()?;
    log::info!(
        "rangefinder running: device={} detector={} object_height={}m focal={}px output={}",
        cfg.camera.device_path(),
        processor.detector_name(),
        processor.estimator().object_height_m(),
        processor.estimator().focal_length_px(),
        cfg.output_path.display()
    );

    let mut processed = 0u64;
    let mut objects_total = 0usize;
    while running.load(Ordering::SeqCst) && (args.frames == 0 || processed < args.frames) {
        let mut frame = camera.get_frame()?;
        let report = processor.process_frame(&mut frame)?;
        processed += 1;
        objects_total += report.len();

        for object in &report.objects {
            log::info!(
                "frame {}: {} at {:.2}m center=({}, {})",
                frame.sequence,
                object.class_label,
                object.distance_meters,
                object.center.0,
                object.center.1
            );
        }

        processor
            .save_to_json(&cfg.output_path, &report)
            .with_context(|| format!("writing report to {}", cfg.output_path.display()))?;

        if let Some(dir) = &args.annotated_dir {
            let path = dir.join(format!("frame_{:06}.jpg", frame.sequence));
            frame
                .image()
                .save(&path)
                .with_context(|| format!("writing annotated frame {}", path.display()))?;
        }
    }

    camera.stop();

    println!("rangefinder summary:");
    println!("  frames processed: {}", processed);
    println!("  objects reported: {}", objects_total);
    println!("  last report: {}", cfg.output_path.display());
    Ok(())
}
