//! Poll widget core: pick an option, tint a photo with the option's color,
//! vote against a remote counting service and share the composed image.
//!
//! Everything here is host independent. The GTK front end in `main.rs` only
//! maps [`flow::SessionView`] onto widgets and feeds user events back into
//! [`flow::Session`].

pub mod camera;
pub mod capture;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod flow;
pub mod poll_client;
pub mod results;
pub mod share;

pub use color::hex_to_rgba;
pub use config::{Config, PollOption};
pub use error::FlowError;
pub use flow::Session;
pub use results::{render_results, Totals};
