use std::cell::RefCell;
use std::rc::Rc;

use poll_filter::flow::VoteTicket;
use poll_filter::poll_client::{PollService, SaveResponse};

use super::state::{AppState, BackendEvent};

/// Fetch current totals on the tokio runtime.
pub fn dispatch_fetch_totals(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    let client = s.client.clone();
    let sender = s.backend_sender.clone();

    s.tokio_rt.spawn(async move {
        let result = client.fetch_totals().await;
        let _ = sender.send(BackendEvent::TotalsLoaded(result)).await;
    });
}

/// Submit a validated vote and post the answer back.
pub fn dispatch_vote(state: &Rc<RefCell<AppState>>, ticket: VoteTicket) {
    let s = state.borrow();
    let client = s.client.clone();
    let sender = s.backend_sender.clone();

    s.tokio_rt.spawn(async move {
        let result = client.submit_vote(&ticket.option_id).await;
        let _ = sender.send(BackendEvent::VoteFinished(ticket, result)).await;
    });
}

/// Post the caption for a recorded vote. Failures are only logged.
pub fn dispatch_save_response(state: &Rc<RefCell<AppState>>, payload: SaveResponse) {
    let s = state.borrow();
    let client = s.client.clone();

    s.tokio_rt.spawn(async move {
        if let Err(e) = client.save_response(&payload).await {
            log::warn!("Failed to save response: {e}");
        }
    });
}
