use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use gtk4::gdk::prelude::GdkCairoContextExt;
use gtk4::gdk_pixbuf::{Colorspace, Pixbuf};
use gtk4::prelude::*;
use gtk4::{cairo, glib, Align};
use image::RgbaImage;

use poll_filter::compositor::{self, EncodedImage, Tint};
use poll_filter::flow::{Preview, SessionView};
use poll_filter::results::ResultsView;
use poll_filter::Config;

use crate::app::BackendEvent;
use crate::ui::dialogs;

const PREVIEW_WIDTH: i32 = 480;
const PREVIEW_HEIGHT: i32 = 360;

/// Handles returned from building the poll window.
pub struct PollWindow {
    pub window: libadwaita::ApplicationWindow,
    pub toast_overlay: libadwaita::ToastOverlay,
    pub option_buttons: Vec<(String, gtk4::Button)>,
    pub filter_info: gtk4::Label,
    pub preview: gtk4::DrawingArea,
    pub preview_paint: Rc<RefCell<PreviewPaint>>,
    pub upload_button: gtk4::Button,
    pub camera_box: gtk4::Box,
    pub open_camera_button: gtk4::Button,
    pub snap_button: gtk4::Button,
    pub close_camera_button: gtk4::Button,
    pub message_entry: gtk4::Entry,
    pub confirm_button: gtk4::Button,
    pub reset_button: gtk4::Button,
    pub share_button: gtk4::Button,
    pub results_box: gtk4::Box,
    pub total_label: gtk4::Label,
    /// Option ids in configured order; the position names the bar's CSS class.
    option_classes: Vec<String>,
}

/// What the preview draw func paints.
#[derive(Default)]
pub struct PreviewPaint {
    source: PaintSource,
    pixbuf: Option<Pixbuf>,
    tint: Option<(f64, f64, f64, f64)>,
}

#[derive(Default)]
enum PaintSource {
    #[default]
    None,
    Still(Arc<RgbaImage>),
    Raster(EncodedImage),
    Live,
}

/// Build the main poll window. Every control only posts a `BackendEvent`.
pub fn build_window(
    app: &libadwaita::Application,
    sender: async_channel::Sender<BackendEvent>,
    config: &Config,
) -> PollWindow {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("Color Poll")
        .default_width(560)
        .default_height(820)
        .build();

    load_css(config);

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();
    toolbar_view.add_top_bar(&header);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Options ---
    let options_group = libadwaita::PreferencesGroup::new();
    options_group.set_title("Pick a color");

    let options_row = gtk4::FlowBox::builder()
        .selection_mode(gtk4::SelectionMode::None)
        .column_spacing(8)
        .row_spacing(8)
        .max_children_per_line(4)
        .build();

    let mut option_buttons = Vec::with_capacity(config.options.len());
    for option in &config.options {
        let inner = gtk4::Box::new(gtk4::Orientation::Horizontal, 6);
        inner.append(&swatch(option.color.as_str()));
        inner.append(&gtk4::Label::new(Some(&option.label)));

        let button = gtk4::Button::builder()
            .child(&inner)
            .tooltip_text(format!("Color: {}", option.color))
            .build();

        let tx = sender.clone();
        let id = option.id.clone();
        button.connect_clicked(move |_| {
            let _ = tx.try_send(BackendEvent::OptionPicked(id.clone()));
        });

        options_row.insert(&button, -1);
        option_buttons.push((option.id.clone(), button));
    }
    options_group.add(&options_row);
    content.append(&options_group);

    let filter_info = gtk4::Label::new(None);
    filter_info.add_css_class("dim-label");
    filter_info.set_halign(Align::Start);
    content.append(&filter_info);

    // --- Preview ---
    let preview_paint = Rc::new(RefCell::new(PreviewPaint::default()));
    let preview = gtk4::DrawingArea::new();
    preview.set_content_width(PREVIEW_WIDTH);
    preview.set_content_height(PREVIEW_HEIGHT);
    preview.set_hexpand(true);
    preview.add_css_class("poll-preview");

    let paint_for_draw = preview_paint.clone();
    preview.set_draw_func(move |_area, cr, width, height| {
        draw_preview(cr, width, height, &paint_for_draw.borrow());
    });

    let drop_target =
        gtk4::DropTarget::new(gtk4::gio::File::static_type(), gtk4::gdk::DragAction::COPY);
    let tx = sender.clone();
    drop_target.connect_drop(move |_, value, _, _| {
        let Ok(file) = value.get::<gtk4::gio::File>() else {
            return false;
        };
        match file.path() {
            Some(path) => {
                let _ = tx.try_send(BackendEvent::FileChosen(path));
                true
            }
            None => false,
        }
    });
    preview.add_controller(drop_target);

    let frame = gtk4::Frame::new(None);
    frame.set_child(Some(&preview));
    content.append(&frame);

    // --- Capture controls ---
    let capture_row = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    capture_row.set_halign(Align::Center);

    let upload_button = gtk4::Button::with_label("Upload photo");
    {
        let tx = sender.clone();
        let parent = window.clone();
        upload_button.connect_clicked(move |_| {
            let tx = tx.clone();
            dialogs::choose_image(&parent, move |path| {
                let _ = tx.try_send(BackendEvent::FileChosen(path));
            });
        });
    }
    capture_row.append(&upload_button);

    let camera_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    let open_camera_button = event_button("Open camera", &sender, || BackendEvent::StartCamera);
    let snap_button = event_button("Take photo", &sender, || BackendEvent::Snap);
    snap_button.add_css_class("suggested-action");
    let close_camera_button = event_button("Close camera", &sender, || BackendEvent::StopCamera);
    camera_box.append(&open_camera_button);
    camera_box.append(&snap_button);
    camera_box.append(&close_camera_button);
    capture_row.append(&camera_box);
    content.append(&capture_row);

    // --- Message ---
    let message_entry = gtk4::Entry::builder()
        .placeholder_text("Add a message")
        .visible(false)
        .build();
    {
        let tx = sender.clone();
        message_entry.connect_changed(move |entry| {
            let _ = tx.try_send(BackendEvent::MessageChanged(entry.text().to_string()));
        });
    }
    {
        let tx = sender.clone();
        message_entry.connect_activate(move |_| {
            let _ = tx.try_send(BackendEvent::Confirm);
        });
    }
    content.append(&message_entry);

    // --- Actions ---
    let actions = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    actions.set_halign(Align::End);
    let reset_button = event_button("Start over", &sender, || BackendEvent::Reset);
    let share_button = event_button("Share", &sender, || BackendEvent::Share);
    let confirm_button = event_button("Confirm vote", &sender, || BackendEvent::Confirm);
    confirm_button.add_css_class("suggested-action");
    actions.append(&reset_button);
    actions.append(&share_button);
    actions.append(&confirm_button);
    content.append(&actions);

    content.append(&gtk4::Separator::new(gtk4::Orientation::Horizontal));

    // --- Results ---
    let results_group = libadwaita::PreferencesGroup::new();
    results_group.set_title("Results");
    let total_label = gtk4::Label::new(Some("Total votes: 0"));
    total_label.add_css_class("dim-label");
    results_group.set_header_suffix(Some(&total_label));

    let results_box = gtk4::Box::new(gtk4::Orientation::Vertical, 6);
    results_group.add(&results_box);
    content.append(&results_group);

    // Assemble
    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&content)
        .build();
    let toast_overlay = libadwaita::ToastOverlay::new();
    toast_overlay.set_child(Some(&scrolled));
    toolbar_view.set_content(Some(&toast_overlay));
    window.set_content(Some(&toolbar_view));

    PollWindow {
        window,
        toast_overlay,
        option_buttons,
        filter_info,
        preview,
        preview_paint,
        upload_button,
        camera_box,
        open_camera_button,
        snap_button,
        close_camera_button,
        message_entry,
        confirm_button,
        reset_button,
        share_button,
        results_box,
        total_label,
        option_classes: config.options.iter().map(|o| o.id.clone()).collect(),
    }
}

/// Push a session view onto the widgets.
pub fn apply_view(win: &PollWindow, view: &SessionView, live_frame: Option<&RgbaImage>) {
    for (id, button) in &win.option_buttons {
        let pressed = view.options.iter().any(|o| o.pressed && &o.id == id);
        if pressed {
            button.add_css_class("suggested-action");
        } else {
            button.remove_css_class("suggested-action");
        }
    }

    win.filter_info.set_text(&view.filter_info);
    win.filter_info.set_visible(!view.filter_info.is_empty());

    win.preview_paint
        .borrow_mut()
        .update(&view.preview, live_frame);
    win.preview.queue_draw();

    win.camera_box.set_visible(view.camera.available);
    win.open_camera_button.set_visible(view.camera.can_start);
    win.snap_button.set_visible(view.camera.can_stop);
    win.snap_button.set_sensitive(view.camera.can_snap);
    win.close_camera_button.set_visible(view.camera.can_stop);

    match &view.message {
        Some(field) => {
            win.message_entry.set_visible(true);
            win.message_entry.set_placeholder_text(Some(if field.required {
                "Add a message (required)"
            } else {
                "Add a message"
            }));
            if win.message_entry.text().as_str() != field.text {
                win.message_entry.set_text(&field.text);
            }
        }
        None => win.message_entry.set_visible(false),
    }

    win.confirm_button.set_sensitive(view.confirm_enabled);
    win.share_button.set_sensitive(view.share_enabled);

    apply_results(win, &view.results);
}

fn apply_results(win: &PollWindow, results: &ResultsView) {
    while let Some(child) = win.results_box.first_child() {
        win.results_box.remove(&child);
    }

    for row in &results.rows {
        let line = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);

        let name = gtk4::Label::new(Some(&row.label));
        name.set_width_chars(10);
        name.set_xalign(0.0);
        if row.emphasized {
            name.add_css_class("heading");
        }

        let bar = gtk4::ProgressBar::new();
        bar.set_fraction(row.fraction());
        bar.set_hexpand(true);
        bar.set_valign(Align::Center);
        if let Some(index) = win.option_classes.iter().position(|id| id == &row.id) {
            bar.add_css_class(&format!("poll-bar-{index}"));
        }

        let summary = gtk4::Label::new(Some(&row.summary()));
        summary.set_width_chars(9);
        summary.set_xalign(1.0);
        summary.add_css_class("numeric");

        line.append(&swatch(row.color.as_str()));
        line.append(&name);
        line.append(&bar);
        line.append(&summary);
        win.results_box.append(&line);
    }

    win.total_label.set_text(&results.total_label());
}

impl PreviewPaint {
    fn update(&mut self, preview: &Preview, live_frame: Option<&RgbaImage>) {
        match preview {
            Preview::Empty => {
                self.source = PaintSource::None;
                self.pixbuf = None;
                self.tint = None;
            }
            Preview::Live { tint } => {
                self.source = PaintSource::Live;
                self.pixbuf = live_frame.map(pixbuf_from_rgba);
                self.tint = tint.as_ref().map(unit_tint);
            }
            Preview::Layered { image, tint } => {
                let same = matches!(&self.source, PaintSource::Still(current) if Arc::ptr_eq(current, image));
                if !same {
                    self.pixbuf = Some(pixbuf_from_rgba(image));
                    self.source = PaintSource::Still(image.clone());
                }
                self.tint = tint.as_ref().map(unit_tint);
            }
            Preview::Raster(encoded) => {
                let same = matches!(&self.source, PaintSource::Raster(current) if current == encoded);
                if !same {
                    self.pixbuf = match compositor::decode(&encoded.bytes) {
                        Ok(image) => Some(pixbuf_from_rgba(&image)),
                        Err(e) => {
                            log::warn!("Could not decode preview: {e}");
                            None
                        }
                    };
                    self.source = PaintSource::Raster(encoded.clone());
                }
                self.tint = None;
            }
        }
    }
}

fn unit_tint(tint: &Tint) -> (f64, f64, f64, f64) {
    let (r, g, b) = tint.color.to_unit_rgb();
    (r, g, b, tint.alpha as f64)
}

fn pixbuf_from_rgba(image: &RgbaImage) -> Pixbuf {
    let (width, height) = image.dimensions();
    let bytes = glib::Bytes::from(image.as_raw().as_slice());
    Pixbuf::from_bytes(
        &bytes,
        Colorspace::Rgb,
        true,
        8,
        width as i32,
        height as i32,
        width as i32 * 4,
    )
}

fn draw_preview(cr: &cairo::Context, width: i32, height: i32, paint: &PreviewPaint) {
    let w = width as f64;
    let h = height as f64;

    let Some(ref pixbuf) = paint.pixbuf else {
        cr.set_source_rgba(0.5, 0.5, 0.5, 0.15);
        let _ = cr.rectangle(0.0, 0.0, w, h);
        let _ = cr.fill();
        return;
    };

    let pw = pixbuf.width() as f64;
    let ph = pixbuf.height() as f64;
    let scale = (w / pw).min(h / ph);
    let dx = (w - pw * scale) / 2.0;
    let dy = (h - ph * scale) / 2.0;

    let _ = cr.save();
    cr.translate(dx, dy);
    cr.scale(scale, scale);
    cr.set_source_pixbuf(pixbuf, 0.0, 0.0);
    let _ = cr.paint();

    if let Some((r, g, b, a)) = paint.tint {
        cr.set_operator(cairo::Operator::Multiply);
        cr.set_source_rgba(r, g, b, a);
        cr.rectangle(0.0, 0.0, pw, ph);
        let _ = cr.fill();
    }
    let _ = cr.restore();
}

fn event_button(
    label: &str,
    sender: &async_channel::Sender<BackendEvent>,
    event: fn() -> BackendEvent,
) -> gtk4::Button {
    let button = gtk4::Button::with_label(label);
    let tx = sender.clone();
    button.connect_clicked(move |_| {
        let _ = tx.try_send(event());
    });
    button
}

fn swatch(hex: &str) -> gtk4::Label {
    let label = gtk4::Label::new(None);
    label.set_markup(&format!(
        "<span foreground=\"{}\">\u{25CF}</span>",
        glib::markup_escape_text(hex)
    ));
    label
}

fn load_css(config: &Config) {
    let mut css = String::from(
        r#"
        .poll-preview {
            background-color: alpha(@window_fg_color, 0.05);
        }
        "#,
    );
    for (index, option) in config.options.iter().enumerate() {
        css.push_str(&format!(
            ".poll-bar-{index} progress {{ background-color: {}; }}\n",
            option.color
        ));
    }

    let Some(display) = gtk4::gdk::Display::default() else {
        log::warn!("No display, skipping styles");
        return;
    };
    let css_provider = gtk4::CssProvider::new();
    css_provider.load_from_string(&css);
    gtk4::style_context_add_provider_for_display(
        &display,
        &css_provider,
        gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );
}
