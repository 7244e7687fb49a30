mod app;
mod ui;

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use app::{AppState, BackendEvent};
use poll_filter::Config;

fn main() {
    env_logger::init();
    log::info!("Color Poll starting");

    let application = libadwaita::Application::builder()
        .application_id("com.github.tr4m0ryp.poll-filter")
        .build();

    application.connect_activate(on_activate);
    application.run();
}

fn on_activate(app: &libadwaita::Application) {
    let config = Config::load();
    log::info!(
        "Polling {} with {} options",
        config.api_base,
        config.options.len()
    );

    // Widgets and network tasks both talk to the main thread through this channel
    let (backend_tx, backend_rx) = async_channel::unbounded::<BackendEvent>();

    let window = ui::window::build_window(app, backend_tx.clone(), &config);

    let state = match AppState::new(config, backend_tx) {
        Ok(state) => Rc::new(RefCell::new(state)),
        Err(e) => {
            log::error!("Failed to start: {e}");
            app.quit();
            return;
        }
    };

    // Store UI handles in state
    {
        let mut s = state.borrow_mut();
        window.window.present();
        s.window = Some(window);
    }

    // Attach backend event handler
    {
        let state_clone = state.clone();
        gtk4::glib::spawn_future_local(async move {
            while let Ok(event) = backend_rx.recv().await {
                app::handle_backend_event(&state_clone, event);
            }
        });
    }

    app::load_initial_totals(&state);
}
