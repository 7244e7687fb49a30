use std::path::PathBuf;
use std::time::Duration;

use gtk4::glib;
use image::RgbaImage;

use poll_filter::camera::VirtualCamera;
use poll_filter::error::NetworkError;
use poll_filter::flow::{Session, VoteTicket};
use poll_filter::poll_client::HttpPollClient;
use poll_filter::share::ClipboardShare;
use poll_filter::{Config, Totals};

use crate::ui::window::PollWindow;

/// Events delivered to the GTK main thread, from widgets and from network
/// tasks alike.
#[derive(Debug)]
pub enum BackendEvent {
    OptionPicked(String),
    FileChosen(PathBuf),
    StartCamera,
    StopCamera,
    Snap,
    MessageChanged(String),
    Confirm,
    Reset,
    Share,
    FrameTick,
    TotalsLoaded(Result<Totals, NetworkError>),
    VoteFinished(VoteTicket, Result<Totals, NetworkError>),
}

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub session: Session,
    pub client: HttpPollClient,
    pub camera: VirtualCamera,
    pub share_target: ClipboardShare,
    pub tokio_rt: tokio::runtime::Runtime,
    pub backend_sender: async_channel::Sender<BackendEvent>,

    // Live camera preview
    pub frame_source: Option<glib::SourceId>,
    pub live_frame: Option<RgbaImage>,

    // UI handles
    pub window: Option<PollWindow>,
}

impl AppState {
    pub fn new(
        config: Config,
        sender: async_channel::Sender<BackendEvent>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let client = HttpPollClient::new(
            &config.api_base,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let camera = VirtualCamera::new(config.virtual_camera_source.clone());
        let tokio_rt = tokio::runtime::Runtime::new()?;

        Ok(Self {
            session: Session::new(config),
            client,
            camera,
            share_target: ClipboardShare,
            tokio_rt,
            backend_sender: sender,
            frame_source: None,
            live_frame: None,
            window: None,
        })
    }
}
