use std::sync::Arc;

use image::RgbaImage;

use super::session::{FlowPhase, Session};
use crate::capture::CaptureKind;
use crate::color::HexColor;
use crate::compositor::{EncodedImage, Tint};
use crate::config::{BlendStrategy, MessageMode};
use crate::error::ComposeError;
use crate::results::{render_results, ResultsView};

#[derive(Debug, Clone, PartialEq)]
pub struct OptionButton {
    pub id: String,
    pub label: String,
    pub color: HexColor,
    pub pressed: bool,
}

impl OptionButton {
    pub fn caption(&self) -> String {
        format!("Color: {}", self.color)
    }
}

/// What the preview area should show.
#[derive(Debug, Clone)]
pub enum Preview {
    Empty,
    /// Live camera; the host pulls frames and lays the tint over them.
    Live { tint: Option<Tint> },
    /// Untouched still plus a tint the host paints as a multiply layer.
    Layered {
        image: Arc<RgbaImage>,
        tint: Option<Tint>,
    },
    /// Still with the tint already baked in.
    Raster(EncodedImage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraControls {
    pub available: bool,
    pub can_start: bool,
    pub can_snap: bool,
    pub can_stop: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageField {
    pub text: String,
    pub required: bool,
}

/// Everything a host needs to draw the widget.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub phase: FlowPhase,
    pub options: Vec<OptionButton>,
    pub filter_info: String,
    pub preview: Preview,
    pub camera: CameraControls,
    pub message: Option<MessageField>,
    pub confirm_enabled: bool,
    pub share_enabled: bool,
    pub results: ResultsView,
}

impl Session {
    pub fn view(&mut self) -> Result<SessionView, ComposeError> {
        let selected_id = self.selected().map(|o| o.id.clone());
        let options = self
            .options()
            .iter()
            .map(|o| OptionButton {
                id: o.id.clone(),
                label: o.label.clone(),
                color: o.color.clone(),
                pressed: selected_id.as_deref() == Some(o.id.as_str()),
            })
            .collect();

        let filter_info = self
            .selected()
            .map(|o| format!("Filter applied: {} ({})", o.label, o.color))
            .unwrap_or_default();

        let kind = self.capture().kind();
        let preview = match kind {
            CaptureKind::Empty => Preview::Empty,
            CaptureKind::Live => Preview::Live { tint: self.tint() },
            CaptureKind::Still => match self.config().blend_strategy {
                BlendStrategy::Layered => match self.capture().still() {
                    Some(still) => Preview::Layered {
                        image: still.image.clone(),
                        tint: self.tint(),
                    },
                    None => Preview::Empty,
                },
                BlendStrategy::Raster => match self.raster_preview()? {
                    Some(image) => Preview::Raster(image),
                    None => Preview::Empty,
                },
            },
        };

        let camera_available = self.config().camera_enabled;
        let camera = CameraControls {
            available: camera_available,
            can_start: camera_available && kind != CaptureKind::Live,
            can_snap: self.capture().can_snap(),
            can_stop: kind == CaptureKind::Live,
        };

        let message = match self.config().message {
            MessageMode::Disabled => None,
            mode => Some(MessageField {
                text: self.message().to_string(),
                required: mode == MessageMode::Required,
            }),
        };

        let voted_for = if self.has_voted() {
            selected_id.as_deref()
        } else {
            None
        };
        let results = render_results(self.options(), self.totals(), voted_for);

        Ok(SessionView {
            phase: self.phase(),
            options,
            filter_info,
            preview,
            camera,
            message,
            confirm_enabled: !self.is_submitting(),
            share_enabled: kind != CaptureKind::Empty,
            results,
        })
    }
}
