//! Camera seam.
//!
//! Opening a camera is a platform capability: it can be refused, the device
//! can vanish, and the stream only knows its resolution once metadata has
//! arrived. [`CameraProvider`] and [`CameraStream`] capture that contract;
//! [`VirtualCamera`] plays a still image (or a test pattern) as a live feed
//! on hosts without a capture backend.

use std::path::PathBuf;
use std::time::Instant;

use image::{Rgba, RgbaImage};

use crate::error::{CameraError, CaptureError};

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    User,
    /// Rear camera on phones; preferred for photos of the outside world.
    #[default]
    Environment,
}

pub trait CameraProvider {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// A live video feed. Stopping releases the device; it must be idempotent.
pub trait CameraStream {
    /// Native resolution, once the stream has reported it.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// A zero width or height counts as not reported yet.
    fn is_ready(&self) -> bool {
        matches!(self.dimensions(), Some((w, h)) if w > 0 && h > 0)
    }

    /// Grab the frame currently on screen.
    fn current_frame(&mut self) -> Result<RgbaImage, CaptureError>;

    fn stop(&mut self);
}

/// Streams a still image, or a moving test pattern when no file is set.
#[derive(Debug, Clone, Default)]
pub struct VirtualCamera {
    source: Option<PathBuf>,
}

impl VirtualCamera {
    pub fn new(source: Option<PathBuf>) -> Self {
        Self { source }
    }
}

impl CameraProvider for VirtualCamera {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn CameraStream>, CameraError> {
        log::info!("Opening virtual camera ({facing:?})");

        let still = match &self.source {
            Some(path) => {
                let img = image::open(path).map_err(|e| {
                    log::error!("Virtual camera source {}: {e}", path.display());
                    CameraError::Hardware(e.to_string())
                })?;
                Some(img.to_rgba8())
            }
            None => None,
        };

        Ok(Box::new(VirtualStream {
            still,
            started: Instant::now(),
            stopped: false,
        }))
    }
}

const PATTERN_SIZE: (u32, u32) = (640, 480);

struct VirtualStream {
    still: Option<RgbaImage>,
    started: Instant,
    stopped: bool,
}

impl CameraStream for VirtualStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        if self.stopped {
            return None;
        }
        Some(match &self.still {
            Some(img) => img.dimensions(),
            None => PATTERN_SIZE,
        })
    }

    fn current_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        if self.stopped {
            return Err(CaptureError::NoActiveCamera);
        }
        if let Some(img) = &self.still {
            return Ok(img.clone());
        }

        // Vertical gray ramp with a bar sweeping across once per two seconds.
        let (w, h) = PATTERN_SIZE;
        let phase = (self.started.elapsed().as_millis() % 2000) as u32;
        let bar_x = phase * w / 2000;
        Ok(RgbaImage::from_fn(w, h, |x, y| {
            if x.abs_diff(bar_x) < 12 {
                Rgba([255, 255, 255, 255])
            } else {
                let v = (y * 255 / h) as u8;
                Rgba([v, v, v, 255])
            }
        }))
    }

    fn stop(&mut self) {
        if !self.stopped {
            log::info!("Virtual camera stopped");
        }
        self.stopped = true;
    }
}
