//! Capture source ownership.
//!
//! At most one image source is active: an uploaded (or snapped) still held
//! behind a blob URL, or a live camera stream. Switching sources releases the
//! previous one first.

pub mod blob;

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;

pub use blob::{Blob, BlobStore, BlobUrl};

use crate::camera::{CameraProvider, CameraStream, FacingMode};
use crate::compositor::{self, EncodedImage, Tint};
use crate::config::FALLBACK_FRAME_SIZE;
use crate::error::{CameraError, CaptureError};

/// A decoded still together with the blob URL that owns its bytes.
#[derive(Debug, Clone)]
pub struct StillImage {
    pub url: BlobUrl,
    pub image: Arc<RgbaImage>,
}

pub enum CaptureState {
    Empty,
    UploadedImage(StillImage),
    LiveCamera(Box<dyn CameraStream>),
}

impl std::fmt::Debug for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureState::Empty => f.write_str("Empty"),
            CaptureState::UploadedImage(still) => {
                f.debug_tuple("UploadedImage").field(&still.url).finish()
            }
            CaptureState::LiveCamera(stream) => f
                .debug_tuple("LiveCamera")
                .field(&stream.dimensions())
                .finish(),
        }
    }
}

/// Which kind of source backs the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Empty,
    Still,
    Live,
}

#[derive(Debug)]
pub struct CaptureManager {
    state: CaptureState,
    blobs: BlobStore,
}

impl Default for CaptureManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureManager {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Empty,
            blobs: BlobStore::new(),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn kind(&self) -> CaptureKind {
        match self.state {
            CaptureState::Empty => CaptureKind::Empty,
            CaptureState::UploadedImage(_) => CaptureKind::Still,
            CaptureState::LiveCamera(_) => CaptureKind::Live,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind() == CaptureKind::Empty
    }

    pub fn still(&self) -> Option<&StillImage> {
        match &self.state {
            CaptureState::UploadedImage(still) => Some(still),
            _ => None,
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Snap is only offered once the stream knows its frame size.
    pub fn can_snap(&self) -> bool {
        matches!(&self.state, CaptureState::LiveCamera(stream) if stream.is_ready())
    }

    /// Take ownership of an uploaded file. Nothing changes if it does not
    /// decode.
    pub fn load_from_bytes(&mut self, bytes: Vec<u8>, mime: &str) -> Result<(), CaptureError> {
        let image = compositor::decode(&bytes).map_err(|e| CaptureError::Decode(e.to_string()))?;
        log::info!(
            "Loaded image {}x{} ({mime})",
            image.width(),
            image.height()
        );
        self.install_still(bytes, mime, image);
        Ok(())
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<(), CaptureError> {
        let bytes = std::fs::read(path).map_err(|e| CaptureError::Decode(e.to_string()))?;
        let mime = mime_for_path(path);
        self.load_from_bytes(bytes, mime)
    }

    /// Open the camera. On failure the current source is kept.
    pub fn start_camera(&mut self, provider: &mut dyn CameraProvider) -> Result<(), CameraError> {
        if matches!(self.state, CaptureState::LiveCamera(_)) {
            log::debug!("Camera already running");
            return Ok(());
        }

        let stream = provider.open(FacingMode::Environment).map_err(|e| {
            log::warn!("Camera unavailable: {e}");
            e
        })?;

        self.release();
        self.state = CaptureState::LiveCamera(stream);
        log::info!("Camera started");
        Ok(())
    }

    /// Stop the camera if it is running. Safe to call at any time.
    pub fn stop_camera(&mut self) {
        if matches!(self.state, CaptureState::LiveCamera(_)) {
            self.release();
        }
    }

    /// Latest camera frame, for the live preview.
    pub fn live_frame(&mut self) -> Option<RgbaImage> {
        match &mut self.state {
            CaptureState::LiveCamera(stream) if stream.is_ready() => match stream.current_frame() {
                Ok(frame) => Some(frame),
                Err(e) => {
                    log::warn!("Dropped camera frame: {e}");
                    None
                }
            },
            _ => None,
        }
    }

    /// Freeze the current camera frame into a still, tinted when `tint` is
    /// set. The camera is released and the still replaces it.
    pub fn take_photo(&mut self, tint: Option<&Tint>, quality: u8) -> Result<(), CaptureError> {
        let CaptureState::LiveCamera(stream) = &mut self.state else {
            return Err(CaptureError::NoActiveCamera);
        };

        let (w, h) = stream
            .dimensions()
            .filter(|&(w, h)| w > 0 && h > 0)
            .unwrap_or(FALLBACK_FRAME_SIZE);
        let mut frame = stream.current_frame()?;
        if frame.width() == 0 || frame.height() == 0 {
            return Err(CaptureError::Frame("camera delivered an empty frame".into()));
        }
        if frame.dimensions() != (w, h) {
            frame = image::imageops::resize(&frame, w, h, image::imageops::FilterType::Triangle);
        }

        let EncodedImage { bytes, .. } = compositor::compose(&frame, tint, quality)
            .map_err(|e| CaptureError::Frame(e.to_string()))?;
        let image = compositor::decode(&bytes).map_err(|e| CaptureError::Decode(e.to_string()))?;

        log::info!("Snapped {w}x{h} photo");
        self.install_still(bytes, EncodedImage::MIME, image);
        Ok(())
    }

    /// Drop whatever source is active.
    pub fn reset(&mut self) {
        self.release();
    }

    fn install_still(&mut self, bytes: Vec<u8>, mime: &str, image: RgbaImage) {
        self.release();
        let url = self.blobs.create(bytes, mime);
        self.state = CaptureState::UploadedImage(StillImage {
            url,
            image: Arc::new(image),
        });
    }

    fn release(&mut self) {
        match std::mem::replace(&mut self.state, CaptureState::Empty) {
            CaptureState::Empty => {}
            CaptureState::UploadedImage(still) => {
                self.blobs.revoke(&still.url);
            }
            CaptureState::LiveCamera(mut stream) => {
                stream.stop();
                log::info!("Camera released");
            }
        }
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.release();
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    match image::ImageFormat::from_path(path) {
        Ok(format) => format.to_mime_type(),
        Err(_) => "application/octet-stream",
    }
}
