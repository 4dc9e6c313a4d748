//! V4L2 camera backend.
//!
//! Opens a local device node (e.g. /dev/video0), negotiates a capture mode
//! and streams frames through a memory-mapped buffer queue. Frames are
//! normalized to RGB before they leave this module.

use ouroboros::self_referencing;

use super::camera::CameraConfig;
use super::normalize::{normalize_to_rgb, pack_rows, PixelFormat};
use crate::error::CameraError;
use crate::frame::Frame;

const BUFFER_COUNT: u32 = 4;

pub(crate) struct V4l2Camera {
    device_path: String,
    state: Option<V4l2State>,
    pixel_format: PixelFormat,
    active_width: u32,
    active_height: u32,
    /// Bytes between row starts as granted by the driver.
    stride: u32,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Camera {
    pub(crate) fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let mut camera = Self {
            device_path: config.device_path(),
            state: None,
            pixel_format: PixelFormat::Rgb24,
            active_width: config.width,
            active_height: config.height,
            stride: 0,
        };
        camera.connect(config)?;
        Ok(camera)
    }

    /// Reopen the stream with a new mode. Drivers reject format changes
    /// while buffers are queued, so the stream is torn down first.
    pub(crate) fn reconfigure(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        self.state = None;
        self.connect(config)
    }

    pub(crate) fn active_resolution(&self) -> (u32, u32) {
        (self.active_width, self.active_height)
    }

    fn connect(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let unavailable = |reason: String| CameraError::DeviceUnavailable {
            device: self.device_path.clone(),
            reason,
        };

        let mut device = v4l::Device::with_path(&self.device_path)
            .map_err(|err| unavailable(format!("open: {}", err)))?;
        let mut format = device
            .format()
            .map_err(|err| unavailable(format!("read format: {}", err)))?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "Camera: failed to set format on {}: {}",
                    self.device_path,
                    err
                );
                device
                    .format()
                    .map_err(|err| unavailable(format!("read format after set failure: {}", err)))?
            }
        };

        let pixel_format = if format.fourcc == v4l::FourCC::new(b"RGB3") {
            PixelFormat::Rgb24
        } else if format.fourcc == v4l::FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if format.fourcc == v4l::FourCC::new(b"NV12") {
            PixelFormat::Nv12
        } else {
            return Err(unavailable(format!(
                "unsupported pixel format {}",
                format.fourcc
            )));
        };

        if config.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "Camera: failed to set fps on {}: {}",
                    self.device_path,
                    err
                );
            }
        }

        if format.width != config.width || format.height != config.height {
            log::warn!(
                "Camera: {} requested {}x{}, device granted {}x{}",
                self.device_path,
                config.width,
                config.height,
                format.width,
                format.height
            );
        }

        let state = V4l2StateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)
            },
        }
        .try_build()
        .map_err(|err| unavailable(format!("create buffer stream: {}", err)))?;

        self.state = Some(state);
        self.pixel_format = pixel_format;
        self.active_width = format.width;
        self.active_height = format.height;
        self.stride = format.stride;

        log::info!(
            "Camera: opened {} ({}x{} {:?})",
            self.device_path,
            self.active_width,
            self.active_height,
            self.pixel_format
        );
        Ok(())
    }

    pub(crate) fn next_frame(&mut self, sequence: u64) -> Result<Frame, CameraError> {
        use v4l::io::traits::CaptureStream;

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| CameraError::Capture("camera is not opened".to_string()))?;
        let row_bytes = self.pixel_format.row_bytes(self.active_width);
        let rows = self.pixel_format.row_count(self.active_height);
        let stride = self.stride as usize;
        let packed = state
            .with_mut(|fields| {
                fields.stream.next().map(|(buf, meta)| {
                    let used = meta.bytesused as usize;
                    let data = if used > 0 && used <= buf.len() {
                        &buf[..used]
                    } else {
                        buf
                    };
                    pack_rows(data, row_bytes, stride, rows)
                })
            })
            .map_err(|err| {
                CameraError::Capture(format!(
                    "failed to capture frame from {}: {}",
                    self.device_path, err
                ))
            })?
            .map_err(|err| CameraError::Capture(err.to_string()))?;

        let pixels = normalize_to_rgb(
            &packed,
            self.active_width,
            self.active_height,
            self.pixel_format,
        )
        .map_err(|err| CameraError::Capture(err.to_string()))?;

        Frame::from_rgb(pixels, self.active_width, self.active_height, sequence)
            .map_err(|err| CameraError::Capture(err.to_string()))
    }
}
