#[cfg(target_arch = "wasm32")]
use futures::channel::mpsc::UnboundedSender;
#[cfg(target_arch = "wasm32")]
use projects_map::{MapConfig, MapEvent, ProjectsMapApp};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{JsCast as _, JsValue, closure::Closure};

#[cfg(target_arch = "wasm32")]
fn main() {
    // Redirect `log` message to `console.log` and friends:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    wasm_bindgen_futures::spawn_local(async {
        if let Err(err) = start().await {
            log::error!("Failed to start: {err:?}");
        }
    });
}

#[cfg(target_arch = "wasm32")]
async fn start() -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let canvas = document
        .get_element_by_id("the_canvas_id")
        .ok_or_else(|| JsValue::from_str("failed to find the_canvas_id"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()?;

    let (gpu_tx, gpu_rx) = futures::channel::mpsc::unbounded();
    forward_gpu_event(&canvas, "webglcontextlost", MapEvent::ContextLost, gpu_tx.clone())?;
    forward_gpu_event(&canvas, "webglcontextrestored", MapEvent::ContextRestored, gpu_tx)?;

    let config = MapConfig::from_env().unwrap_or_else(|err| {
        log::error!("Invalid configuration, using defaults: {err}");
        MapConfig::default()
    });

    eframe::WebRunner::new()
        .start(
            canvas,
            eframe::WebOptions::default(),
            Box::new(|cc| {
                Ok(Box::new(ProjectsMapApp::with_gpu_events(
                    cc.egui_ctx.clone(),
                    config,
                    gpu_rx,
                )))
            }),
        )
        .await
}

/// Send `event` to the map whenever the canvas emits `name`.
#[cfg(target_arch = "wasm32")]
fn forward_gpu_event(
    canvas: &web_sys::HtmlCanvasElement,
    name: &str,
    event: MapEvent,
    tx: UnboundedSender<MapEvent>,
) -> Result<(), JsValue> {
    let listener = Closure::<dyn FnMut(web_sys::Event)>::new(move |dom_event: web_sys::Event| {
        // Otherwise the browser will not try to restore the context.
        dom_event.prevent_default();
        tx.unbounded_send(event.clone()).ok();
    });

    canvas.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())?;

    // Listener lives as long as the page.
    listener.forget();
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    println!("This binary is only meant to be compiled for WASM.");
}
