// src/main.rs
use anyhow::{anyhow, Context, Result};
use eframe::egui;
use hand_gesture::app::GestureApp;
use hand_gesture::mediapipe_bridge::{MediaPipeBridge, NullEstimator, PoseEstimator};
use hand_gesture::session::SessionHandle;
use hand_gesture::ui::DisplayMailbox;
use hand_gesture::video::NokhwaDevice;
use hand_gesture::{GestureClassifier, LandmarkExtractor, Session, Settings};
use tracing::{info, warn, Level};

fn main() -> Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;
    init_tracing(settings.debug);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        camera = settings.camera_index,
        width = settings.frame_width,
        height = settings.frame_height,
        "Starting {}",
        settings.app_name
    );

    let display = DisplayMailbox::new();
    let session = spawn_session(settings.clone(), display.clone())
        .context("failed to spawn session thread")?;
    let control = session.sender();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 620.0])
            .with_min_inner_size([800.0, 480.0]),
        centered: true,
        ..Default::default()
    };

    let result = eframe::run_native(
        &settings.app_name,
        options,
        Box::new(move |cc| {
            display.set_repaint(cc.egui_ctx.clone());
            Box::new(GestureApp::new(cc, control, display))
        }),
    );

    info!("Window closed, stopping session");
    if session.shutdown().is_err() {
        warn!("Session thread panicked");
    }

    result.map_err(|e| anyhow!("error running application: {}", e))
}

fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

/// Everything the camera loop touches is built on its own thread.
fn spawn_session(settings: Settings, display: DisplayMailbox) -> std::io::Result<SessionHandle> {
    SessionHandle::spawn(move || {
        let extractor = LandmarkExtractor::new(build_estimator(&settings), settings.pose_options());
        let classifier = GestureClassifier::from_path(&settings.model_path);
        Session::new(&settings, NokhwaDevice, extractor, classifier, display)
    })
}

fn build_estimator(settings: &Settings) -> Box<dyn PoseEstimator> {
    match MediaPipeBridge::spawn(&settings.pose_python, &settings.pose_script, &settings.pose_options()) {
        Ok(bridge) => Box::new(bridge),
        Err(e) => {
            warn!("MediaPipe hand landmarker unavailable: {:#}", e);
            warn!("Continuing without hand detection");
            Box::new(NullEstimator)
        }
    }
}
