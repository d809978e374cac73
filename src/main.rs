mod app;

use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sanflow=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Sanflow",
        native_options,
        Box::new(|cc| Ok(Box::new(app::FlowApp::new(cc)))),
    )
}
