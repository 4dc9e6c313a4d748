use super::camera::CameraConfig;
use crate::error::CameraError;
use crate::frame::Frame;

// ----------------------------------------------------------------------------
// Synthetic camera (stub://) for tests and dry runs
// ----------------------------------------------------------------------------

/// In-memory camera that renders a moving gradient.
///
/// `stub://name?frames=N` stops delivering frames after N reads, which
/// simulates a device that drops off mid-stream.
pub(crate) struct SyntheticCamera {
    device: String,
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    frames_read: u64,
}

impl SyntheticCamera {
    pub(crate) fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let device = config.device_path();
        validate_mode(&device, config)?;
        let frame_limit = parse_frame_limit(&device)?;

        log::info!(
            "Camera: opened {} (synthetic, {}x{} @ {} fps)",
            device,
            config.width,
            config.height,
            config.fps
        );
        Ok(Self {
            device,
            width: config.width,
            height: config.height,
            frame_limit,
            frames_read: 0,
        })
    }

    pub(crate) fn next_frame(&mut self, sequence: u64) -> Result<Frame, CameraError> {
        if self.frame_limit.is_some_and(|limit| self.frames_read >= limit) {
            return Err(CameraError::Capture(format!(
                "failed to capture frame from {}: stream ended",
                self.device
            )));
        }
        self.frames_read += 1;

        let pixels = self.render(sequence);
        Frame::from_rgb(pixels, self.width, self.height, sequence)
            .map_err(|err| CameraError::Capture(err.to_string()))
    }

    pub(crate) fn reconfigure(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        validate_mode(&self.device, config)?;
        self.width = config.width;
        self.height = config.height;
        log::info!(
            "Camera: {} now {}x{} @ {} fps (synthetic)",
            self.device,
            self.width,
            self.height,
            config.fps
        );
        Ok(())
    }

    pub(crate) fn active_resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render(&self, sequence: u64) -> Vec<u8> {
        let pixel_count = self.width as usize * self.height as usize * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + sequence) % 256) as u8;
        }
        pixels
    }
}

fn validate_mode(device: &str, config: &CameraConfig) -> Result<(), CameraError> {
    if config.width == 0 || config.height == 0 {
        return Err(CameraError::DeviceUnavailable {
            device: device.to_string(),
            reason: format!("unsupported mode {}x{}", config.width, config.height),
        });
    }
    Ok(())
}

fn parse_frame_limit(device: &str) -> Result<Option<u64>, CameraError> {
    let Some((_, query)) = device.split_once('?') else {
        return Ok(None);
    };
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("frames=") {
            let limit = value.parse().map_err(|_| CameraError::DeviceUnavailable {
                device: device.to_string(),
                reason: format!("invalid frame limit '{}'", value),
            })?;
            return Ok(Some(limit));
        }
    }
    Ok(None)
}
