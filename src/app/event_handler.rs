use std::cell::RefCell;
use std::rc::Rc;

use gtk4::glib;
use gtk4::prelude::*;

use poll_filter::capture::CaptureKind;
use poll_filter::error::FlowError;
use poll_filter::flow::{FlowPhase, VoteOutcome};
use poll_filter::Totals;

use super::pipeline::{dispatch_fetch_totals, dispatch_save_response, dispatch_vote};
use super::state::{AppState, BackendEvent};
use crate::ui;

/// Live preview refresh interval (~15fps).
const FRAME_INTERVAL_MS: u64 = 66;

/// Handle a backend event. This is the core state machine.
pub fn handle_backend_event(state: &Rc<RefCell<AppState>>, event: BackendEvent) {
    match event {
        BackendEvent::OptionPicked(id) => {
            if let Err(e) = state.borrow_mut().session.select(&id) {
                log::warn!("{e}");
            }
        }
        BackendEvent::FileChosen(path) => {
            log::info!("Loading {}", path.display());
            let result = state.borrow_mut().session.load_image_file(&path);
            match result {
                Ok(()) => stop_frame_timer(state),
                Err(e) => show_error(state, "Could not open the photo", &e.into()),
            }
        }
        BackendEvent::StartCamera => start_camera(state),
        BackendEvent::StopCamera => {
            state.borrow_mut().session.stop_camera();
            stop_frame_timer(state);
        }
        BackendEvent::Snap => {
            let result = state.borrow_mut().session.take_photo();
            match result {
                Ok(()) => stop_frame_timer(state),
                Err(e) => show_error(state, "Could not take the photo", &e.into()),
            }
        }
        BackendEvent::MessageChanged(text) => {
            let mut s = state.borrow_mut();
            if s.session.message() == text {
                return;
            }
            s.session.set_message(&text);
        }
        BackendEvent::Confirm => {
            let result = state.borrow_mut().session.begin_vote();
            match result {
                Ok(ticket) => dispatch_vote(state, ticket),
                Err(e) => show_error(state, "Cannot vote yet", &e.into()),
            }
        }
        BackendEvent::Reset => {
            state.borrow_mut().session.reset();
            stop_frame_timer(state);
        }
        BackendEvent::Share => share(state),
        BackendEvent::FrameTick => {
            let mut s = state.borrow_mut();
            let frame = s.session.live_frame();
            s.live_frame = frame;
        }
        BackendEvent::TotalsLoaded(result) => {
            let totals = match result {
                Ok(totals) => totals,
                Err(e) => {
                    log::warn!("Could not load totals, showing zeros: {e}");
                    Totals::default()
                }
            };
            state.borrow_mut().session.set_totals(totals);
        }
        BackendEvent::VoteFinished(ticket, result) => {
            let outcome = state.borrow_mut().session.finish_vote(&ticket, result);
            if let Ok(outcome) = &outcome {
                if let Some(payload) = ticket.save_after(*outcome) {
                    dispatch_save_response(state, payload.clone());
                }
            }
            match outcome {
                Ok(VoteOutcome::Recorded) => show_toast(state, "Vote recorded"),
                Ok(VoteOutcome::Stale) => {}
                Err(e) => {
                    log::error!("Vote failed: {e}");
                    show_error(
                        state,
                        "Your vote was not sent",
                        &FlowError::Network(e),
                    );
                }
            }
        }
    }

    render(state);
}

/// Draw the empty poll, then fetch totals for it.
pub fn load_initial_totals(state: &Rc<RefCell<AppState>>) {
    render(state);
    dispatch_fetch_totals(state);
}

fn start_camera(state: &Rc<RefCell<AppState>>) {
    let result = {
        let mut s = state.borrow_mut();
        let AppState {
            session, camera, ..
        } = &mut *s;
        session.start_camera(camera)
    };

    if let Err(e) = result {
        show_error(state, "Could not open the camera", &e.into());
        return;
    }
    if state.borrow().frame_source.is_some() {
        return;
    }

    let sender = state.borrow().backend_sender.clone();
    let source = glib::timeout_add_local(
        std::time::Duration::from_millis(FRAME_INTERVAL_MS),
        move || {
            let _ = sender.try_send(BackendEvent::FrameTick);
            glib::ControlFlow::Continue
        },
    );
    state.borrow_mut().frame_source = Some(source);
}

fn stop_frame_timer(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    if let Some(source) = s.frame_source.take() {
        source.remove();
    }
    s.live_frame = None;
}

fn share(state: &Rc<RefCell<AppState>>) {
    let result = {
        let mut s = state.borrow_mut();
        let target = s.share_target;
        s.session.share(&target)
    };
    // Sharing a live feed snaps it first.
    if state.borrow().session.capture().kind() != CaptureKind::Live {
        stop_frame_timer(state);
    }

    match result {
        Ok(()) => show_toast(state, "Image copied, paste it anywhere to share"),
        Err(e) => show_error(state, "Could not share", &e),
    }
}

/// Push the session's view onto the widgets.
fn render(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let view = match s.session.view() {
        Ok(view) => view,
        Err(e) => {
            log::error!("Preview failed: {e}");
            return;
        }
    };
    let phase_change = s.session.take_phase_change();

    if let Some(ref win) = s.window {
        ui::window::apply_view(win, &view, s.live_frame.as_ref());
        if phase_change == Some(FlowPhase::Captured) && view.message.is_some() {
            win.message_entry.grab_focus();
        }
    }
}

fn show_error(state: &Rc<RefCell<AppState>>, heading: &str, error: &FlowError) {
    log::warn!("{heading}: {error}");
    if let Some(ref win) = state.borrow().window {
        ui::dialogs::show_alert(&win.window, heading, &error.to_string());
    }
}

fn show_toast(state: &Rc<RefCell<AppState>>, text: &str) {
    if let Some(ref win) = state.borrow().window {
        let toast = libadwaita::Toast::new(text);
        toast.set_timeout(2);
        win.toast_overlay.add_toast(toast);
    }
}
