#![doc = include_str!("../README.md")]
#![deny(clippy::unwrap_used, rustdoc::broken_intra_doc_links)]

mod app;
pub mod config;
mod egui_map;
pub mod io;
pub mod layer;
pub mod mercator;
pub mod overlay;
pub mod page;
mod position;
pub mod sources;
pub mod style;
mod view;
pub mod widget;
mod zoom;

pub use app::ProjectsMapApp;
pub use config::{MapConfig, RenderMode, TileProvider, ViewportConfig};
pub use egui_map::{Camera, EguiBackend, EguiMap};
pub use mercator::TileId;
pub use position::{BoundingBox, Pixels, PixelsExt, Position, lon_lat};
pub use view::MapView;
pub use widget::{MapBackend, MapError, MapEvent, MapWidget};
pub use zoom::{InvalidZoom, Zoom};
