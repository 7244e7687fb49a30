//! Selection and vote flow.
//!
//! [`Session`] owns all per-visitor state: the picked option, the capture
//! source, the caption, the cached totals and whether this session has voted.
//! Hosts feed it user events and redraw from [`Session::view`].
//!
//! Submitting is split in two so the host can run the request wherever it
//! likes: [`Session::begin_vote`] validates and hands out a [`VoteTicket`],
//! [`Session::finish_vote`] applies the answer. A ticket issued before a reset
//! is stale; its answer refreshes totals but changes nothing else.

mod session;
mod view;

pub use session::{FlowPhase, Session, VoteOutcome, VoteTicket};
pub use view::{CameraControls, MessageField, OptionButton, Preview, SessionView};
