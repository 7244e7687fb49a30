mod event_handler;
mod pipeline;
mod state;

pub use event_handler::{handle_backend_event, load_initial_totals};
pub use state::{AppState, BackendEvent};
