// src/app.rs
use crate::session::ControlSignal;
use crate::ui::{to_color_image, DisplayMailbox, StatusLevel, Theme};

use chrono::{DateTime, Local};
use eframe::egui;
use std::sync::mpsc::Sender;
use tracing::warn;

/// Width the camera feed is drawn at, in points.
const FEED_WIDTH: f32 = 500.0;

struct StatusLine {
    level: StatusLevel,
    message: String,
    at: DateTime<Local>,
}

pub struct GestureApp {
    control: Sender<ControlSignal>,
    display: DisplayMailbox,

    feed: Option<egui::TextureHandle>,
    prediction: Option<String>,
    status: Option<StatusLine>,

    theme: Theme,
}

impl GestureApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        control: Sender<ControlSignal>,
        display: DisplayMailbox,
    ) -> Self {
        cc.egui_ctx.set_visuals(crate::ui::create_visuals());

        Self {
            control,
            display,
            feed: None,
            prediction: None,
            status: None,
            theme: Theme::default(),
        }
    }

    fn send(&self, signal: ControlSignal) {
        if self.control.send(signal).is_err() {
            warn!(?signal, "Session thread is gone; control signal dropped");
        }
    }

    fn apply_pending(&mut self, ctx: &egui::Context) {
        let update = self.display.take();
        if update.is_empty() {
            return;
        }

        if update.cleared {
            self.feed = None;
            self.prediction = None;
        }

        if let Some(frame) = update.frame {
            let image = to_color_image(&frame);
            match self.feed.as_mut() {
                Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                None => {
                    self.feed = Some(ctx.load_texture(
                        "camera_feed",
                        image,
                        egui::TextureOptions::LINEAR,
                    ))
                }
            }
        }

        if let Some(text) = update.text {
            self.prediction = Some(text);
        }

        if let Some((level, message)) = update.status {
            self.status = Some(StatusLine {
                level,
                message,
                at: Local::now(),
            });
        }
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Controls").strong());
        ui.add_space(8.0);

        let width = ui.available_width();
        let start = egui::Button::new("Start Camera").fill(self.theme.success);
        if ui.add_sized([width, 32.0], start).clicked() {
            self.send(ControlSignal::Start);
        }
        let stop = egui::Button::new("Stop Camera").fill(self.theme.surface);
        if ui.add_sized([width, 32.0], stop).clicked() {
            self.send(ControlSignal::Stop);
        }
    }

    fn render_feed(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Camera Feed").strong());
        ui.add_space(8.0);

        match &self.feed {
            Some(texture) => {
                let [w, h] = texture.size();
                let width = FEED_WIDTH.min(ui.available_width());
                let size = egui::vec2(width, width * h as f32 / w.max(1) as f32);
                ui.image((texture.id(), size));
            }
            None => {
                ui.colored_label(self.theme.text_secondary, "No video feed available");
            }
        }

        if let Some(status) = &self.status {
            ui.add_space(8.0);
            ui.colored_label(
                self.theme.status_color(status.level),
                format!("[{}] {}", status.at.format("%H:%M:%S"), status.message),
            );
        }
    }

    fn render_prediction(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Prediction").strong());
        ui.add_space(8.0);

        if let Some(text) = &self.prediction {
            ui.label(
                egui::RichText::new(text)
                    .strong()
                    .size(18.0)
                    .color(self.theme.text_primary),
            );
        }
    }
}

impl eframe::App for GestureApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_pending(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).fill(self.theme.background))
            .show(ctx, |ui| {
                ui.heading("Hand Gesture Recognition");
                ui.separator();

                ui.columns(3, |columns| {
                    self.render_controls(&mut columns[0]);
                    self.render_feed(&mut columns[1]);
                    self.render_prediction(&mut columns[2]);
                });
            });
    }
}
