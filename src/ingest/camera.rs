//! Camera source.
//!
//! `Camera` owns at most one open device handle. The handle exists between
//! `start()` and `stop()` (or drop); every other operation either works on
//! the open handle or reports that there is none.

use serde::{Deserialize, Serialize};

use super::synthetic::SyntheticCamera;
#[cfg(feature = "ingest-v4l2")]
use super::v4l2::V4l2Camera;
use crate::error::CameraError;
use crate::frame::Frame;

const STUB_SCHEME: &str = "stub://";

/// Capture settings for a camera.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Device selector: `"0"` maps to `/dev/video0`, a path is used as-is,
    /// `stub://<name>` selects the synthetic camera.
    pub device_id: String,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Requested frames per second.
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: "0".to_string(),
            width: 640,
            height: 480,
            fps: 60,
        }
    }
}

impl CameraConfig {
    /// Resolve `device_id` to the device node or stub URL that gets opened.
    pub fn device_path(&self) -> String {
        let id = self.device_id.trim();
        if id.parse::<u32>().is_ok() {
            format!("/dev/video{}", id)
        } else {
            id.to_string()
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.device_id.trim().starts_with(STUB_SCHEME)
    }
}

/// Statistics for a camera.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    Device(V4l2Camera),
}

impl CameraBackend {
    fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        if config.is_synthetic() {
            return Ok(Self::Synthetic(SyntheticCamera::open(config)?));
        }

        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self::Device(V4l2Camera::open(config)?))
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(CameraError::DeviceUnavailable {
                device: config.device_path(),
                reason: "device capture requires the ingest-v4l2 feature".to_string(),
            })
        }
    }

    fn next_frame(&mut self, sequence: u64) -> Result<Frame, CameraError> {
        match self {
            Self::Synthetic(camera) => camera.next_frame(sequence),
            #[cfg(feature = "ingest-v4l2")]
            Self::Device(camera) => camera.next_frame(sequence),
        }
    }

    fn reconfigure(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        match self {
            Self::Synthetic(camera) => camera.reconfigure(config),
            #[cfg(feature = "ingest-v4l2")]
            Self::Device(camera) => camera.reconfigure(config),
        }
    }

    fn active_resolution(&self) -> (u32, u32) {
        match self {
            Self::Synthetic(camera) => camera.active_resolution(),
            #[cfg(feature = "ingest-v4l2")]
            Self::Device(camera) => camera.active_resolution(),
        }
    }
}

/// Pull-based camera source.
///
/// ```no_run
/// use vision_rangefinder::{Camera, CameraConfig};
///
/// let mut camera = Camera::new(CameraConfig::default());
/// camera.start()?;
/// let frame = camera.get_frame()?;
/// println!("{}x{}", frame.width(), frame.height());
/// camera.stop();
/// # Ok::<(), vision_rangefinder::CameraError>(())
/// ```
pub struct Camera {
    config: CameraConfig,
    backend: Option<CameraBackend>,
    frames_captured: u64,
}

impl Camera {
    /// Create a camera. The device is not touched until `start()`.
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            backend: None,
            frames_captured: 0,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Open the device and apply the configured resolution and frame rate.
    ///
    /// Starting an already-open camera does nothing.
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.backend.is_some() {
            return Ok(());
        }
        let backend = CameraBackend::open(&self.config)?;
        self.backend = Some(backend);
        self.frames_captured = 0;
        Ok(())
    }

    /// Capture a single frame.
    pub fn get_frame(&mut self) -> Result<Frame, CameraError> {
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| CameraError::Capture("camera is not opened".to_string()))?;
        let frame = backend.next_frame(self.frames_captured + 1)?;
        self.frames_captured += 1;
        Ok(frame)
    }

    /// Release the device. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.backend.take().is_some() {
            log::info!(
                "Camera: released {} after {} frames",
                self.config.device_path(),
                self.frames_captured
            );
        }
    }

    pub fn is_opened(&self) -> bool {
        self.backend.is_some()
    }

    /// Change the requested resolution.
    ///
    /// When the device is open the new mode is applied immediately. The
    /// device may grant a different mode; see `active_resolution()`. If
    /// reopening the device with the new mode fails, the camera is left
    /// closed and the error is returned.
    pub fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), CameraError> {
        self.config.width = width;
        self.config.height = height;
        self.apply_live()
    }

    /// Change the requested frame rate. Same live semantics as
    /// `set_resolution`.
    pub fn set_fps(&mut self, fps: u32) -> Result<(), CameraError> {
        self.config.fps = fps;
        self.apply_live()
    }

    /// Resolution the open device is actually delivering.
    pub fn active_resolution(&self) -> Option<(u32, u32)> {
        self.backend.as_ref().map(CameraBackend::active_resolution)
    }

    pub fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frames_captured,
            device: self.config.device_path(),
        }
    }

    fn apply_live(&mut self) -> Result<(), CameraError> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };
        if let Err(err) = backend.reconfigure(&self.config) {
            log::warn!(
                "Camera: reconfiguring {} failed, device closed: {}",
                self.config.device_path(),
                err
            );
            self.backend = None;
            return Err(err);
        }
        Ok(())
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device_id: "stub://test".to_string(),
            width: 64,
            height: 48,
            fps: 30,
        }
    }

    #[test]
    fn default_config_matches_first_device() {
        let config = CameraConfig::default();
        assert_eq!(config.device_path(), "/dev/video0");
        assert_eq!((config.width, config.height, config.fps), (640, 480, 60));
        assert!(!config.is_synthetic());
    }

    #[test]
    fn device_path_passes_through_paths() {
        let config = CameraConfig {
            device_id: "/dev/v4l/by-id/usb-cam".to_string(),
            ..CameraConfig::default()
        };
        assert_eq!(config.device_path(), "/dev/v4l/by-id/usb-cam");
    }

    #[test]
    fn get_frame_before_start_is_capture_error() {
        let mut camera = Camera::new(stub_config());
        assert!(!camera.is_opened());
        let err = camera.get_frame().unwrap_err();
        assert!(matches!(err, CameraError::Capture(_)));
    }

    #[test]
    fn start_stop_lifecycle() -> anyhow::Result<()> {
        let mut camera = Camera::new(stub_config());
        camera.start()?;
        assert!(camera.is_opened());
        // second start is a no-op
        camera.start()?;

        let frame = camera.get_frame()?;
        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert_eq!(frame.sequence, 1);
        assert_eq!(camera.get_frame()?.sequence, 2);
        assert_eq!(camera.stats().frames_captured, 2);

        camera.stop();
        assert!(!camera.is_opened());
        camera.stop();
        assert!(matches!(camera.get_frame(), Err(CameraError::Capture(_))));
        Ok(())
    }

    #[test]
    fn setters_on_closed_camera_only_update_config() -> anyhow::Result<()> {
        let mut camera = Camera::new(stub_config());
        camera.set_resolution(320, 240)?;
        camera.set_fps(15)?;
        assert_eq!(camera.config().width, 320);
        assert_eq!(camera.config().height, 240);
        assert_eq!(camera.config().fps, 15);
        assert!(camera.active_resolution().is_none());

        camera.start()?;
        assert_eq!(camera.active_resolution(), Some((320, 240)));
        Ok(())
    }

    #[test]
    fn set_resolution_applies_to_open_camera() -> anyhow::Result<()> {
        let mut camera = Camera::new(stub_config());
        camera.start()?;
        camera.set_resolution(32, 16)?;
        let frame = camera.get_frame()?;
        assert_eq!((frame.width(), frame.height()), (32, 16));
        assert!(camera.is_opened());
        Ok(())
    }

    #[test]
    fn invalid_live_resolution_closes_camera() -> anyhow::Result<()> {
        let mut camera = Camera::new(stub_config());
        camera.start()?;
        let err = camera.set_resolution(0, 16).unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable { .. }));
        assert!(!camera.is_opened());
        Ok(())
    }

    #[test]
    fn missing_device_is_unavailable() {
        let mut camera = Camera::new(CameraConfig {
            device_id: "/nonexistent/video-device".to_string(),
            ..CameraConfig::default()
        });
        let err = camera.start().unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable { .. }));
        assert!(!camera.is_opened());
    }

    #[test]
    fn exhausted_stub_reports_capture_error() -> anyhow::Result<()> {
        let mut camera = Camera::new(CameraConfig {
            device_id: "stub://short?frames=1".to_string(),
            ..stub_config()
        });
        camera.start()?;
        camera.get_frame()?;
        assert!(matches!(camera.get_frame(), Err(CameraError::Capture(_))));
        Ok(())
    }
}
