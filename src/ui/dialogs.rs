use gtk4::prelude::*;
use libadwaita::prelude::*;

/// Show a modal alert with a single OK button.
pub fn show_alert(parent: &libadwaita::ApplicationWindow, heading: &str, body: &str) {
    let dialog = libadwaita::AlertDialog::builder()
        .heading(heading)
        .body(body)
        .build();
    dialog.add_response("ok", "OK");
    dialog.set_default_response(Some("ok"));

    let parent_widget: Option<&gtk4::Widget> = Some(parent.upcast_ref());
    dialog.choose(parent_widget, None::<&gtk4::gio::Cancellable>, |_response_id| {});
}

/// Ask for an image file. `on_chosen` runs on the GTK main thread.
pub fn choose_image<F>(parent: &libadwaita::ApplicationWindow, on_chosen: F)
where
    F: Fn(std::path::PathBuf) + 'static,
{
    let filter = gtk4::FileFilter::new();
    filter.set_name(Some("Images"));
    filter.add_mime_type("image/*");

    let filters = gtk4::gio::ListStore::new::<gtk4::FileFilter>();
    filters.append(&filter);

    let dialog = gtk4::FileDialog::builder()
        .title("Choose a photo")
        .modal(true)
        .filters(&filters)
        .default_filter(&filter)
        .build();

    dialog.open(
        Some(parent),
        None::<&gtk4::gio::Cancellable>,
        move |result| match result {
            Ok(file) => match file.path() {
                Some(path) => on_chosen(path),
                None => log::warn!("Chosen file has no local path"),
            },
            Err(e) => log::debug!("File dialog closed: {e}"),
        },
    );
}
