//! Lookout Desktop: application entry.

mod app;

use eframe::egui;

fn main() -> eframe::Result<()> {
    app::install_logger();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 640.0])
            .with_min_inner_size([560.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Lookout",
        options,
        Box::new(|cc| Box::new(app::LookoutApp::new(cc))),
    )
}
