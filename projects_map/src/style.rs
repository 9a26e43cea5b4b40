//! Declarative description of what the map widget draws by itself, in the shape of a MapLibre
//! style document.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{sources::TileSourceConfig, widget::MapError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StyleSource {
    Raster(TileSourceConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleLayerKind {
    Raster,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleLayer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StyleLayerKind,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapStyle {
    pub version: u8,
    pub sources: BTreeMap<String, StyleSource>,
    pub layers: Vec<StyleLayer>,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self::empty()
    }
}

impl MapStyle {
    pub const VERSION: u8 = 8;

    /// Nothing to draw, everything comes from the overlay.
    pub fn empty() -> Self {
        Self {
            version: Self::VERSION,
            sources: BTreeMap::new(),
            layers: Vec::new(),
        }
    }

    /// Single raster source with a layer showing it.
    pub fn raster(id: &str, source: TileSourceConfig) -> Self {
        Self {
            version: Self::VERSION,
            sources: BTreeMap::from([(id.to_owned(), StyleSource::Raster(source))]),
            layers: vec![StyleLayer {
                id: format!("{id}-layer"),
                kind: StyleLayerKind::Raster,
                source: id.to_owned(),
            }],
        }
    }

    /// Layers in drawing order, together with their sources.
    pub fn raster_layers(&self) -> Result<Vec<(&StyleLayer, &TileSourceConfig)>, MapError> {
        self.layers
            .iter()
            .map(|layer| match self.sources.get(&layer.source) {
                Some(StyleSource::Raster(source)) => Ok((layer, source)),
                None => Err(MapError::UnknownSource(layer.source.clone())),
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::OpenStreetMap;

    #[test]
    fn empty_style() {
        assert_eq!(
            r#"{"version":8,"sources":{},"layers":[]}"#,
            MapStyle::empty().to_json().unwrap()
        );
        assert!(MapStyle::empty().raster_layers().unwrap().is_empty());
    }

    #[test]
    fn raster_style_pairs_source_and_layer() {
        let style = MapStyle::raster("osm", OpenStreetMap.config().unwrap());

        assert_eq!(
            serde_json::json!({
                "version": 8,
                "sources": {
                    "osm": {
                        "type": "raster",
                        "tiles": ["https://tile.openstreetmap.org/{z}/{x}/{y}.png"],
                        "tileSize": 256,
                        "attribution": "OpenStreetMap contributors",
                        "minzoom": 0,
                        "maxzoom": 19,
                    }
                },
                "layers": [{"id": "osm-layer", "type": "raster", "source": "osm"}],
            }),
            serde_json::to_value(&style).unwrap()
        );

        let layers = style.raster_layers().unwrap();
        assert_eq!(1, layers.len());
        assert_eq!(&OpenStreetMap.config().unwrap(), layers[0].1);
    }

    #[test]
    fn layer_with_unknown_source_is_an_error() {
        let mut style = MapStyle::raster("osm", OpenStreetMap.config().unwrap());
        style.layers[0].source = "nope".to_owned();

        assert!(matches!(
            style.raster_layers(),
            Err(MapError::UnknownSource(source)) if source == "nope"
        ));
    }
}
