// src/ui.rs - Display sinks and theme
use eframe::egui::{self, Color32};
use image::{DynamicImage, RgbImage};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Where the session pushes what it wants on screen.
pub trait DisplaySink {
    fn show_frame(&mut self, frame: &DynamicImage);

    fn show_text(&mut self, text: &str);

    fn show_status(&mut self, level: StatusLevel, message: &str);

    /// Blank the frame and text areas.
    fn clear(&mut self);
}

/// Display changes not yet picked up by the GUI.
///
/// Newer values replace older ones, so at most one frame is ever pending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayUpdate {
    /// Frame and text were blanked before any of the values below arrived.
    pub cleared: bool,
    pub frame: Option<RgbImage>,
    pub text: Option<String>,
    pub status: Option<(StatusLevel, String)>,
}

impl DisplayUpdate {
    pub fn is_empty(&self) -> bool {
        !self.cleared && self.frame.is_none() && self.text.is_none() && self.status.is_none()
    }
}

#[derive(Default)]
struct Mailbox {
    pending: DisplayUpdate,
    repaint: Option<egui::Context>,
}

/// Latest-value handoff from the session thread to the GUI.
///
/// Clones share the same mailbox. A GUI that stops repainting costs one frame
/// of memory, not a growing queue.
#[derive(Clone, Default)]
pub struct DisplayMailbox {
    inner: Arc<Mutex<Mailbox>>,
}

impl DisplayMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake this egui context whenever something new is posted.
    pub fn set_repaint(&self, ctx: egui::Context) {
        self.lock().repaint = Some(ctx);
    }

    /// Everything posted since the last call.
    pub fn take(&self) -> DisplayUpdate {
        std::mem::take(&mut self.lock().pending)
    }

    fn lock(&self) -> MutexGuard<'_, Mailbox> {
        // A panicking writer leaves plain data behind; keep using it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn post(&self, apply: impl FnOnce(&mut DisplayUpdate)) {
        let repaint = {
            let mut mailbox = self.lock();
            apply(&mut mailbox.pending);
            mailbox.repaint.clone()
        };
        if let Some(ctx) = repaint {
            ctx.request_repaint();
        }
    }
}

impl DisplaySink for DisplayMailbox {
    fn show_frame(&mut self, frame: &DynamicImage) {
        let frame = frame.to_rgb8();
        self.post(|pending| {
            if pending.frame.is_some() {
                trace!("display behind, replacing undelivered frame");
            }
            pending.frame = Some(frame);
        });
    }

    fn show_text(&mut self, text: &str) {
        self.post(|pending| pending.text = Some(text.to_string()));
    }

    fn show_status(&mut self, level: StatusLevel, message: &str) {
        self.post(|pending| pending.status = Some((level, message.to_string())));
    }

    fn clear(&mut self) {
        self.post(|pending| {
            pending.cleared = true;
            pending.frame = None;
            pending.text = None;
        });
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub background: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(70, 130, 240),
            background: Color32::from_rgb(20, 20, 25),
            surface: Color32::from_rgb(30, 30, 35),
            error: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

impl Theme {
    pub fn status_color(&self, level: StatusLevel) -> Color32 {
        match level {
            StatusLevel::Info => self.primary,
            StatusLevel::Warning => self.warning,
            StatusLevel::Error => self.error,
        }
    }
}

pub fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(30, 30, 35);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(55, 55, 65);
    visuals.widgets.active.bg_fill = Color32::from_rgb(70, 130, 240);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals.window_rounding = egui::Rounding::same(12.0);
    visuals.menu_rounding = egui::Rounding::same(8.0);

    visuals
}

pub fn to_color_image(frame: &RgbImage) -> egui::ColorImage {
    let size = [frame.width() as usize, frame.height() as usize];
    egui::ColorImage::from_rgb(size, frame.as_raw())
}
