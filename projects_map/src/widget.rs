//! The seam between the map view and whatever actually draws the map.

use crate::{
    config::{ConfigError, ViewportConfig},
    io::TileError,
    layer::{TileLayer, TileLayerSpec},
    mercator::TileId,
    overlay::Overlay,
    sources::SourceError,
    style::MapStyle,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("invalid viewport: {0}")]
    Viewport(#[from] ConfigError),

    #[error("style refers to unknown source '{0}'")]
    UnknownSource(String),

    #[error("unusable tile source: {0}")]
    Source(#[from] SourceError),

    #[error("cannot create layer '{layer}': {reason}")]
    Layer { layer: String, reason: String },

    #[error("tile {tile_id:?} of '{source_id}' failed: {error}")]
    Tile {
        source_id: String,
        tile_id: TileId,
        error: TileError,
    },
}

/// Something that happened to the widget since it was last asked.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Style and the initial tiles are in.
    Load,
    Error(MapError),
    ContextLost,
    ContextRestored,
}

/// Zoom in and out buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationControl;

pub enum Control {
    Navigation(NavigationControl),
    Overlay(Overlay),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetOptions {
    pub style: MapStyle,
    pub viewport: ViewportConfig,
}

pub trait MapWidget {
    /// Controls are owned by the widget from now on.
    fn add_control(&mut self, control: Control, position: ControlPosition);

    /// Events since the last call, oldest first.
    fn poll_events(&mut self) -> Vec<MapEvent>;

    /// Release everything. No events are produced afterwards.
    fn remove(&mut self);
}

/// Creates map widgets and tile layers for them.
pub trait MapBackend {
    type Widget: MapWidget;

    fn create_widget(&mut self, options: WidgetOptions) -> Result<Self::Widget, MapError>;

    fn create_tile_layer(&mut self, spec: TileLayerSpec) -> Result<TileLayer, MapError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            "style refers to unknown source 'osm'",
            MapError::UnknownSource("osm".to_owned()).to_string()
        );
        assert_eq!(
            "tile TileId { x: 1, y: 2, zoom: 3 } of 'osm' failed: fetch failed: 404",
            MapError::Tile {
                source_id: "osm".to_owned(),
                tile_id: TileId { x: 1, y: 2, zoom: 3 },
                error: TileError::Fetch("404".to_owned()),
            }
            .to_string()
        );
    }

    #[test]
    fn config_errors_convert() {
        let error: MapError = ConfigError::RenderMode("webgl".to_owned()).into();
        assert!(matches!(error, MapError::Viewport(_)));
    }
}
