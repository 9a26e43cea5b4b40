#[cfg(not(target_arch = "wasm32"))]
use projects_map::{MapConfig, ProjectsMapApp};

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let config = MapConfig::from_env().unwrap_or_else(|err| {
        log::error!("Invalid configuration, using defaults: {err}");
        MapConfig::default()
    });

    eframe::run_native(
        "Community Projects Map",
        Default::default(),
        Box::new(|cc| Ok(Box::new(ProjectsMapApp::new(cc.egui_ctx.clone(), config)))),
    )
}

#[cfg(target_arch = "wasm32")]
fn main() {
    println!("This binary is not meant to be compiled for WASM.");
}
