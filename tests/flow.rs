use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use image::{ImageFormat, Rgba, RgbaImage};

use poll_filter::camera::{CameraProvider, CameraStream, FacingMode};
use poll_filter::capture::CaptureKind;
use poll_filter::config::{BlendStrategy, Config, MessageMode};
use poll_filter::error::{
    CameraError, CaptureError, FlowError, NetworkError, ShareError, ValidationError,
};
use poll_filter::flow::{FlowPhase, Preview, Session, VoteOutcome};
use poll_filter::poll_client::{PollService, SaveResponse};
use poll_filter::share::{ShareFile, ShareTarget};
use poll_filter::Totals;

// ---- fakes ----

#[derive(Default)]
struct FakeService {
    votes: AtomicUsize,
    saves: Mutex<Vec<SaveResponse>>,
    fail: bool,
}

impl FakeService {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn vote_calls(&self) -> usize {
        self.votes.load(Ordering::SeqCst)
    }
}

impl PollService for FakeService {
    async fn fetch_totals(&self) -> Result<Totals, NetworkError> {
        Ok(Totals::default())
    }

    async fn submit_vote(&self, option_id: &str) -> Result<Totals, NetworkError> {
        self.votes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NetworkError::Status {
                endpoint: "/api/poll/vote",
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        Ok([(option_id, 1)].into_iter().collect())
    }

    async fn save_response(&self, payload: &SaveResponse) -> Result<(), NetworkError> {
        self.saves.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct CameraLog {
    opened: Rc<Cell<u32>>,
    stopped: Rc<Cell<u32>>,
}

struct FakeCamera {
    log: CameraLog,
    deny: bool,
    reported: Option<(u32, u32)>,
    frame: (u32, u32),
}

impl FakeCamera {
    fn new(log: &CameraLog) -> Self {
        Self {
            log: log.clone(),
            deny: false,
            reported: Some((4, 3)),
            frame: (4, 3),
        }
    }
}

impl CameraProvider for FakeCamera {
    fn open(&mut self, _facing: FacingMode) -> Result<Box<dyn CameraStream>, CameraError> {
        if self.deny {
            return Err(CameraError::PermissionDenied);
        }
        self.log.opened.set(self.log.opened.get() + 1);
        Ok(Box::new(FakeStream {
            log: self.log.clone(),
            reported: self.reported,
            frame: self.frame,
            live: true,
        }))
    }
}

struct FakeStream {
    log: CameraLog,
    reported: Option<(u32, u32)>,
    frame: (u32, u32),
    live: bool,
}

impl CameraStream for FakeStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.reported
    }

    fn current_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        let (w, h) = self.frame;
        Ok(RgbaImage::from_pixel(w, h, Rgba([200, 200, 200, 255])))
    }

    fn stop(&mut self) {
        if self.live {
            self.log.stopped.set(self.log.stopped.get() + 1);
        }
        self.live = false;
    }
}

#[derive(Default)]
struct FakeShare {
    supported: bool,
    shared: std::cell::RefCell<Vec<ShareFile>>,
}

impl ShareTarget for FakeShare {
    fn can_share_files(&self) -> bool {
        self.supported
    }

    fn share(&self, file: &ShareFile) -> Result<(), ShareError> {
        self.shared.borrow_mut().push(file.clone());
        Ok(())
    }
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(w, h, Rgba([120, 180, 240, 255]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn session() -> Session {
    Session::new(Config::default())
}

// ---- validation ----

#[tokio::test]
async fn confirm_without_selection_sends_nothing() {
    let service = FakeService::default();
    let mut s = session();
    s.load_image(png(2, 2), "image/png").unwrap();

    let err = s.confirm_vote(&service).await.unwrap_err();
    assert!(matches!(err, FlowError::Validation(ValidationError::NoSelection)));
    assert_eq!(service.vote_calls(), 0);
}

#[tokio::test]
async fn confirm_without_image_sends_nothing() {
    let service = FakeService::default();
    let mut s = session();
    s.select("op1").unwrap();

    let err = s.confirm_vote(&service).await.unwrap_err();
    assert!(matches!(err, FlowError::Validation(ValidationError::NoImage)));
    assert_eq!(service.vote_calls(), 0);
    assert!(!s.is_submitting());
}

#[tokio::test]
async fn required_message_blocks_until_written() {
    let service = FakeService::default();
    let mut s = Session::new(Config {
        message: MessageMode::Required,
        ..Config::default()
    });
    s.select("op2").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();
    s.set_message("   ");

    let err = s.confirm_vote(&service).await.unwrap_err();
    assert!(matches!(err, FlowError::Validation(ValidationError::EmptyMessage)));
    assert_eq!(service.vote_calls(), 0);

    s.set_message("for the blue team");
    assert_eq!(s.confirm_vote(&service).await.unwrap(), VoteOutcome::Recorded);
    assert_eq!(service.vote_calls(), 1);
}

#[test]
fn unknown_option_is_rejected() {
    let mut s = session();
    assert_eq!(
        s.select("op9"),
        Err(ValidationError::UnknownOption("op9".into()))
    );
    assert!(s.selected().is_none());
}

// ---- submission ----

#[tokio::test]
async fn successful_vote_updates_totals_and_emphasis() {
    let service = FakeService::default();
    let mut s = session();
    s.select("op3").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();

    assert_eq!(s.confirm_vote(&service).await.unwrap(), VoteOutcome::Recorded);
    assert!(s.has_voted());
    assert_eq!(s.phase(), FlowPhase::Submitted);
    assert_eq!(s.totals().get("op3"), 1);
    assert_eq!(s.totals().iter().count(), 4);

    let view = s.view().unwrap();
    assert_eq!(view.results.total, 1);
    let emphasized: Vec<_> = view
        .results
        .rows
        .iter()
        .filter(|r| r.emphasized)
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(emphasized, vec!["op3"]);
}

#[tokio::test]
async fn network_failure_leaves_state_untouched() {
    let service = FakeService::failing();
    let mut s = session();
    let before: Totals = [("op1", 4), ("op2", 2)].into_iter().collect();
    s.set_totals(before.clone());
    s.select("op1").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();

    let err = s.confirm_vote(&service).await.unwrap_err();
    assert!(matches!(err, FlowError::Network(_)));
    assert_eq!(service.vote_calls(), 1);
    assert!(!s.has_voted());
    assert_eq!(s.totals(), &before.with_options(s.options()));
    assert_eq!(s.phase(), FlowPhase::Captured);
    assert!(!s.is_submitting());
}

#[test]
fn second_confirm_is_blocked_while_first_is_out() {
    let mut s = session();
    s.select("op1").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();

    let ticket = s.begin_vote().unwrap();
    assert!(!s.view().unwrap().confirm_enabled);
    assert_eq!(s.begin_vote(), Err(ValidationError::SubmissionInFlight));

    let totals: Totals = [("op1", 1)].into_iter().collect();
    assert_eq!(s.finish_vote(&ticket, Ok(totals)).unwrap(), VoteOutcome::Recorded);
    assert!(s.begin_vote().is_ok());
}

#[test]
fn late_answer_after_reset_only_refreshes_totals() {
    let mut s = session();
    s.select("op2").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();
    let ticket = s.begin_vote().unwrap();

    s.reset();
    let totals: Totals = [("op2", 9)].into_iter().collect();
    assert_eq!(s.finish_vote(&ticket, Ok(totals)).unwrap(), VoteOutcome::Stale);
    assert!(!s.has_voted());
    assert!(s.selected().is_none());
    assert_eq!(s.totals().get("op2"), 9);

    let failed = NetworkError::Decode("late".into());
    assert_eq!(s.finish_vote(&ticket, Err(failed)).unwrap(), VoteOutcome::Stale);
}

#[tokio::test]
async fn caption_is_saved_after_vote_when_enabled() {
    let service = FakeService::default();
    let mut s = Session::new(Config {
        message: MessageMode::Optional,
        save_responses: true,
        ..Config::default()
    });
    s.select("op2").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();
    s.set_message(" hello ");

    s.confirm_vote(&service).await.unwrap();
    let saves = service.saves.lock().unwrap();
    assert_eq!(
        saves.as_slice(),
        &[SaveResponse {
            color: "#2563EB".into(),
            message: "hello".into(),
        }]
    );
}

#[test]
fn caption_follows_only_a_recorded_vote() {
    let mut s = Session::new(Config {
        message: MessageMode::Optional,
        save_responses: true,
        ..Config::default()
    });
    s.select("op1").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();
    s.set_message("rojo");

    let stale = s.begin_vote().unwrap();
    s.reset();
    let outcome = s.finish_vote(&stale, Ok(Totals::default())).unwrap();
    assert_eq!(outcome, VoteOutcome::Stale);
    assert!(stale.save_response().is_some());
    assert_eq!(stale.save_after(outcome), None);

    s.select("op1").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();
    s.set_message("rojo");
    let ticket = s.begin_vote().unwrap();
    let outcome = s.finish_vote(&ticket, Ok(Totals::default())).unwrap();
    assert_eq!(outcome, VoteOutcome::Recorded);
    assert_eq!(
        ticket.save_after(outcome),
        Some(&SaveResponse {
            color: "#E11D48".into(),
            message: "rojo".into(),
        })
    );
}

// ---- capture exclusivity and release ----

#[test]
fn camera_and_upload_replace_each_other() {
    let log = CameraLog::default();
    let mut camera = FakeCamera::new(&log);
    let mut s = session();

    s.load_image(png(2, 2), "image/png").unwrap();
    assert_eq!(s.capture().kind(), CaptureKind::Still);

    s.start_camera(&mut camera).unwrap();
    assert_eq!(s.capture().kind(), CaptureKind::Live);
    assert!(s.capture().still().is_none());
    assert_eq!(s.capture().blobs().revoked(), 1);
    assert!(matches!(s.view().unwrap().preview, Preview::Live { .. }));

    s.load_image(png(3, 3), "image/png").unwrap();
    assert_eq!(s.capture().kind(), CaptureKind::Still);
    assert_eq!(log.stopped.get(), 1);
    assert!(matches!(s.view().unwrap().preview, Preview::Layered { .. }));
}

#[test]
fn denied_camera_keeps_current_photo() {
    let log = CameraLog::default();
    let mut camera = FakeCamera::new(&log);
    camera.deny = true;
    let mut s = session();
    s.load_image(png(2, 2), "image/png").unwrap();

    assert_eq!(s.start_camera(&mut camera), Err(CameraError::PermissionDenied));
    assert_eq!(s.capture().kind(), CaptureKind::Still);
    assert_eq!(s.capture().blobs().revoked(), 0);
}

#[test]
fn undecodable_upload_is_ignored() {
    let mut s = session();
    s.load_image(png(2, 2), "image/png").unwrap();
    let url = s.capture().still().unwrap().url.clone();

    assert!(matches!(
        s.load_image(b"nope".to_vec(), "image/png"),
        Err(CaptureError::Decode(_))
    ));
    assert_eq!(s.capture().still().unwrap().url, url);
}

#[test]
fn stop_camera_is_idempotent() {
    let log = CameraLog::default();
    let mut camera = FakeCamera::new(&log);
    let mut s = session();

    s.stop_camera();
    s.start_camera(&mut camera).unwrap();
    s.stop_camera();
    s.stop_camera();
    assert_eq!(log.stopped.get(), 1);
    assert_eq!(s.capture().kind(), CaptureKind::Empty);
}

#[test]
fn snap_without_camera_fails() {
    let mut s = session();
    assert_eq!(s.take_photo(), Err(CaptureError::NoActiveCamera));
}

#[test]
fn snap_uses_fallback_size_until_stream_reports() {
    let log = CameraLog::default();
    let mut camera = FakeCamera::new(&log);
    camera.reported = None;
    let mut s = session();
    s.select("op1").unwrap();
    s.start_camera(&mut camera).unwrap();
    assert!(!s.view().unwrap().camera.can_snap);

    s.take_photo().unwrap();
    let still = s.capture().still().unwrap();
    assert_eq!(still.image.dimensions(), (1280, 720));
    assert_eq!(log.stopped.get(), 1);
    assert_eq!(s.phase(), FlowPhase::Captured);
}

#[test]
fn zero_sized_report_is_not_ready_and_snaps_at_fallback_size() {
    let log = CameraLog::default();
    let mut camera = FakeCamera::new(&log);
    camera.reported = Some((0, 0));
    let mut s = session();
    s.select("op2").unwrap();
    s.start_camera(&mut camera).unwrap();
    assert!(!s.capture().can_snap());
    assert!(!s.view().unwrap().camera.can_snap);

    s.take_photo().unwrap();
    let still = s.capture().still().unwrap();
    assert_eq!(still.image.dimensions(), (1280, 720));
    assert_eq!(s.phase(), FlowPhase::Captured);
}

#[test]
fn snap_bakes_in_the_selected_color() {
    let log = CameraLog::default();
    let mut camera = FakeCamera::new(&log);
    let mut s = session();
    s.select("op1").unwrap();
    s.start_camera(&mut camera).unwrap();
    assert!(s.view().unwrap().camera.can_snap);

    s.take_photo().unwrap();
    let px = s.capture().still().unwrap().image.get_pixel(1, 1).0;
    // #E11D48 multiplied over gray pulls green and blue well below red.
    assert!(px[0] > px[1] + 40, "{px:?}");
}

#[test]
fn reset_releases_each_resource_once() {
    let log = CameraLog::default();
    let mut camera = FakeCamera::new(&log);
    let mut s = session();

    s.select("op4").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();
    s.reset();
    assert!(s.selected().is_none());
    assert_eq!(s.capture().kind(), CaptureKind::Empty);
    assert!(!s.has_voted());
    assert_eq!(s.capture().blobs().revoked(), 1);
    assert_eq!(s.capture().blobs().live(), 0);

    s.start_camera(&mut camera).unwrap();
    s.reset();
    s.reset();
    assert_eq!(log.stopped.get(), 1);
    assert_eq!(s.capture().blobs().revoked(), 1);
    assert_eq!(s.phase(), FlowPhase::NoSelection);
}

#[tokio::test]
async fn reset_keeps_totals() {
    let service = FakeService::default();
    let mut s = session();
    s.select("op1").unwrap();
    s.load_image(png(2, 2), "image/png").unwrap();
    s.confirm_vote(&service).await.unwrap();

    s.reset();
    assert!(!s.has_voted());
    assert_eq!(s.totals().get("op1"), 1);
}

// ---- preview and share ----

#[test]
fn raster_strategy_bakes_preview() {
    let mut s = Session::new(Config {
        blend_strategy: BlendStrategy::Raster,
        ..Config::default()
    });
    s.load_image(png(5, 4), "image/png").unwrap();
    s.select("op2").unwrap();

    let view = s.view().unwrap();
    let Preview::Raster(first) = view.preview else {
        panic!("expected raster preview");
    };
    assert_eq!((first.width, first.height), (5, 4));
    assert_eq!(view.filter_info, "Filter applied: Option 2 (#2563EB)");

    let Preview::Raster(again) = s.view().unwrap().preview else {
        panic!("expected raster preview");
    };
    assert_eq!(first, again);
}

#[test]
fn share_on_unsupported_platform_reports_it() {
    let target = FakeShare::default();
    let mut s = session();
    s.load_image(png(2, 2), "image/png").unwrap();

    let err = s.share(&target).unwrap_err();
    assert!(matches!(err, FlowError::Share(ShareError::Unsupported)));
    assert!(target.shared.borrow().is_empty());
}

#[test]
fn share_without_image_fails() {
    let target = FakeShare {
        supported: true,
        ..FakeShare::default()
    };
    let mut s = session();
    let err = s.share(&target).unwrap_err();
    assert!(matches!(err, FlowError::Share(ShareError::NoImage)));
}

#[test]
fn share_snaps_a_running_camera_first() {
    let log = CameraLog::default();
    let mut camera = FakeCamera::new(&log);
    let target = FakeShare {
        supported: true,
        ..FakeShare::default()
    };
    let mut s = session();
    s.select("op3").unwrap();
    s.start_camera(&mut camera).unwrap();

    s.share(&target).unwrap();
    assert_eq!(s.capture().kind(), CaptureKind::Still);
    let shared = target.shared.borrow();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].name, "vote.jpg");
    assert_eq!(&shared[0].bytes[..2], &[0xFF, 0xD8]);
}

// ---- step hook ----

#[test]
fn phase_changes_are_reported_once() {
    let mut s = session();
    assert_eq!(s.take_phase_change(), None);

    s.select("op1").unwrap();
    assert_eq!(s.take_phase_change(), Some(FlowPhase::Selected));
    assert_eq!(s.take_phase_change(), None);

    s.load_image(png(2, 2), "image/png").unwrap();
    assert_eq!(s.take_phase_change(), Some(FlowPhase::Captured));

    s.select("op2").unwrap();
    assert_eq!(s.take_phase_change(), None);

    s.reset();
    assert_eq!(s.take_phase_change(), Some(FlowPhase::NoSelection));
}

#[test]
fn view_reflects_selection() {
    let mut s = session();
    s.select("op2").unwrap();
    let view = s.view().unwrap();
    let pressed: Vec<_> = view.options.iter().map(|o| o.pressed).collect();
    assert_eq!(pressed, vec![false, true, false, false]);
    assert_eq!(view.options[1].caption(), "Color: #2563EB");
    assert!(view.message.is_none());
    assert!(!view.share_enabled);
}
