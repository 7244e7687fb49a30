use std::path::Path;

use crate::camera::CameraProvider;
use crate::capture::{CaptureKind, CaptureManager};
use crate::compositor::{self, EncodedImage, Tint};
use crate::config::{Config, MessageMode, PollOption};
use crate::error::{
    CameraError, CaptureError, ComposeError, FlowError, NetworkError, ShareError, ValidationError,
};
use crate::poll_client::{PollService, SaveResponse};
use crate::results::Totals;
use crate::share::{ShareFile, ShareTarget};

/// Where the visitor is in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    NoSelection,
    Selected,
    Captured,
    Submitted,
}

/// Proof that a vote passed validation. Hand it back to
/// [`Session::finish_vote`] with the service's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTicket {
    pub option_id: String,
    generation: u64,
    save: Option<SaveResponse>,
}

impl VoteTicket {
    /// Caption payload to post after the vote succeeds, if enabled.
    pub fn save_response(&self) -> Option<&SaveResponse> {
        self.save.as_ref()
    }

    /// Caption payload to post once `outcome` is known. Only a recorded vote
    /// posts one.
    pub fn save_after(&self, outcome: VoteOutcome) -> Option<&SaveResponse> {
        match outcome {
            VoteOutcome::Recorded => self.save_response(),
            VoteOutcome::Stale => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    /// The session was reset while the request was out.
    Stale,
}

pub struct Session {
    config: Config,
    selected: Option<String>,
    capture: CaptureManager,
    message: String,
    totals: Totals,
    has_voted: bool,
    submitting: bool,
    generation: u64,
    reported_phase: FlowPhase,
    raster_cache: Option<RasterCache>,
}

struct RasterCache {
    key: (String, Option<[u8; 3]>),
    image: EncodedImage,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let totals = Totals::zeroed(&config.options);
        Self {
            config,
            selected: None,
            capture: CaptureManager::new(),
            message: String::new(),
            totals,
            has_voted: false,
            submitting: false,
            generation: 0,
            reported_phase: FlowPhase::NoSelection,
            raster_cache: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &[PollOption] {
        &self.config.options
    }

    pub fn selected(&self) -> Option<&PollOption> {
        self.selected.as_deref().and_then(|id| self.config.option(id))
    }

    pub fn capture(&self) -> &CaptureManager {
        &self.capture
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn has_voted(&self) -> bool {
        self.has_voted
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn phase(&self) -> FlowPhase {
        if self.has_voted {
            FlowPhase::Submitted
        } else if self.selected.is_none() {
            FlowPhase::NoSelection
        } else if self.capture.is_empty() {
            FlowPhase::Selected
        } else {
            FlowPhase::Captured
        }
    }

    /// The phase, if it changed since the last call. Hosts run per-step side
    /// effects (focusing the caption entry, say) off this.
    pub fn take_phase_change(&mut self) -> Option<FlowPhase> {
        let phase = self.phase();
        if phase == self.reported_phase {
            return None;
        }
        self.reported_phase = phase;
        Some(phase)
    }

    /// Tint for the current selection.
    pub fn tint(&self) -> Option<Tint> {
        self.selected()
            .map(|o| Tint::new(o.color.clone(), self.config.filter_alpha))
    }

    /// Install totals from the service, filling in missing options.
    pub fn set_totals(&mut self, totals: Totals) {
        self.totals = totals.with_options(&self.config.options);
    }

    pub fn select(&mut self, option_id: &str) -> Result<(), ValidationError> {
        if self.config.option(option_id).is_none() {
            return Err(ValidationError::UnknownOption(option_id.to_string()));
        }
        log::debug!("Selected {option_id}");
        self.selected = Some(option_id.to_string());
        Ok(())
    }

    pub fn set_message(&mut self, text: &str) {
        self.message = text.to_string();
    }

    pub fn load_image(&mut self, bytes: Vec<u8>, mime: &str) -> Result<(), CaptureError> {
        self.capture.load_from_bytes(bytes, mime)
    }

    pub fn load_image_file(&mut self, path: &Path) -> Result<(), CaptureError> {
        self.capture.load_from_path(path)
    }

    pub fn start_camera(&mut self, provider: &mut dyn CameraProvider) -> Result<(), CameraError> {
        if !self.config.camera_enabled {
            return Err(CameraError::Unavailable);
        }
        self.capture.start_camera(provider)
    }

    pub fn stop_camera(&mut self) {
        self.capture.stop_camera();
    }

    pub fn take_photo(&mut self) -> Result<(), CaptureError> {
        let tint = self.tint();
        self.capture
            .take_photo(tint.as_ref(), self.config.preview_quality)
    }

    pub fn live_frame(&mut self) -> Option<image::RgbaImage> {
        self.capture.live_frame()
    }

    /// Check everything a vote needs and mark a submission as in flight.
    pub fn begin_vote(&mut self) -> Result<VoteTicket, ValidationError> {
        if self.submitting {
            return Err(ValidationError::SubmissionInFlight);
        }
        let option = self.selected().ok_or(ValidationError::NoSelection)?;
        if self.capture.is_empty() {
            return Err(ValidationError::NoImage);
        }
        let message = self.message.trim();
        if self.config.message == MessageMode::Required && message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        let save = self.config.save_responses.then(|| SaveResponse {
            color: option.color.to_string(),
            message: message.to_string(),
        });
        let ticket = VoteTicket {
            option_id: option.id.clone(),
            generation: self.generation,
            save,
        };

        self.submitting = true;
        Ok(ticket)
    }

    /// Apply the service's answer to a vote.
    ///
    /// On failure the session is left as it was before `begin_vote`.
    pub fn finish_vote(
        &mut self,
        ticket: &VoteTicket,
        result: Result<Totals, NetworkError>,
    ) -> Result<VoteOutcome, NetworkError> {
        if ticket.generation != self.generation {
            match result {
                Ok(totals) => {
                    log::info!("Late vote answer for {}, keeping totals only", ticket.option_id);
                    self.set_totals(totals);
                }
                Err(e) => log::warn!("Late vote failure ignored: {e}"),
            }
            return Ok(VoteOutcome::Stale);
        }

        self.submitting = false;
        let totals = result?;
        self.set_totals(totals);
        self.has_voted = true;
        log::info!("Vote recorded for {}", ticket.option_id);
        Ok(VoteOutcome::Recorded)
    }

    /// Validate, submit and apply in one go.
    pub async fn confirm_vote<S: PollService>(&mut self, service: &S) -> Result<VoteOutcome, FlowError> {
        let ticket = self.begin_vote()?;
        let result = service.submit_vote(&ticket.option_id).await;
        let outcome = self.finish_vote(&ticket, result)?;

        if let Some(payload) = ticket.save_after(outcome) {
            if let Err(e) = service.save_response(payload).await {
                log::warn!("Failed to save response: {e}");
            }
        }
        Ok(outcome)
    }

    /// Release the capture source and clear selection, caption and the voted
    /// flag. Totals are kept.
    pub fn reset(&mut self) {
        log::info!("Resetting session");
        self.capture.reset();
        self.selected = None;
        self.message.clear();
        self.has_voted = false;
        self.submitting = false;
        self.generation += 1;
        self.raster_cache = None;
    }

    /// Preview with the tint baked in, for hosts that cannot layer it.
    /// Re-encoded only when the still or the color changes.
    pub fn raster_preview(&mut self) -> Result<Option<EncodedImage>, ComposeError> {
        let Some(still) = self.capture.still() else {
            return Ok(None);
        };
        let tint = self.tint();
        let key = (
            still.url.as_str().to_string(),
            tint.as_ref().map(|t| t.color.rgb()),
        );

        if let Some(cache) = &self.raster_cache {
            if cache.key == key {
                return Ok(Some(cache.image.clone()));
            }
        }

        let image = compositor::compose(&still.image, tint.as_ref(), self.config.preview_quality)?;
        self.raster_cache = Some(RasterCache {
            key,
            image: image.clone(),
        });
        Ok(Some(image))
    }

    /// Build the final image to share. A running camera is snapped first.
    pub fn share_image(&mut self) -> Result<ShareFile, FlowError> {
        if self.capture.kind() == CaptureKind::Live {
            self.take_photo()?;
        }
        let still = self.capture.still().ok_or(ShareError::NoImage)?;
        let tint = self.tint();
        let image = compositor::compose(&still.image, tint.as_ref(), self.config.share_quality)?;
        Ok(ShareFile::vote_image(image.bytes))
    }

    /// Compose and hand the image to `target`.
    pub fn share(&mut self, target: &dyn ShareTarget) -> Result<(), FlowError> {
        let file = self.share_image()?;
        if !target.can_share_files() {
            return Err(ShareError::Unsupported.into());
        }
        target.share(&file)?;
        Ok(())
    }
}
