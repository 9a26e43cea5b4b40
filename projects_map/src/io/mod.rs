//! Asynchronous tile IO: fetching, decoding and handing tiles over to the UI thread.

mod fetch;
pub mod http;
pub mod runtime;
pub mod tiles_io;

pub use fetch::{Fetch, HttpFetch, TileError, TileImage, TileOutcome};
pub use http::{HeaderValue, HttpOptions, MaxParallelDownloads};

/// Wakes the UI up when something arrived from the IO side.
pub trait Repaint: Send + Sync + 'static {
    fn request_repaint(&self);
}

impl Repaint for egui::Context {
    fn request_repaint(&self) {
        egui::Context::request_repaint(self);
    }
}

/// For headless use, where nothing needs to be woken up.
impl Repaint for () {
    fn request_repaint(&self) {}
}
