//! Raster tile sources. Make sure you follow terms of usage of the particular source.

mod openstreetmap;
mod stadia;

use std::fmt;

use serde::{Serialize, Serializer};

use crate::mercator::{TILE_SIZE, TileId};
pub use openstreetmap::OpenStreetMap;
pub use stadia::{StadiaStyle, stadia};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub text: &'static str,
    pub url: &'static str,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("url template '{0}' lacks the {1} placeholder")]
    MissingPlaceholder(String, &'static str),

    #[error("tile size {0} is not a power-of-two multiple of 256")]
    InvalidTileSize(u32),

    #[error("zoom range {0}..={1} is invalid")]
    InvalidZoomRange(u8, u8),

    #[error("API key may only contain letters, digits, '-', '.', '_' and '~'")]
    InvalidApiKey,
}

/// Remote tile server definition.
pub trait TileSource {
    fn tile_url(&self, tile_id: TileId) -> String;
    fn attribution(&self) -> Attribution;

    /// Size of each tile, should be a multiple of 256.
    fn tile_size(&self) -> u32 {
        TILE_SIZE
    }

    fn min_zoom(&self) -> u8 {
        0
    }

    fn max_zoom(&self) -> u8 {
        18
    }
}

/// URL with `{z}`, `{x}` and `{y}` placeholders, e.g.
/// `https://tile.openstreetmap.org/{z}/{x}/{y}.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, SourceError> {
        let template = template.into();
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(SourceError::MissingPlaceholder(template, placeholder));
            }
        }
        Ok(Self(template))
    }

    pub fn expand(&self, tile_id: TileId) -> String {
        self.0
            .replace("{z}", &tile_id.zoom.to_string())
            .replace("{x}", &tile_id.x.to_string())
            .replace("{y}", &tile_id.y.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raster source described by data, serialized the way style descriptions declare their
/// sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileSourceConfig {
    #[serde(rename = "tiles", serialize_with = "template_list")]
    pub url_template: UrlTemplate,
    #[serde(rename = "tileSize")]
    pub tile_size: u32,
    #[serde(serialize_with = "attribution_text")]
    pub attribution: Attribution,
    #[serde(rename = "minzoom")]
    pub min_zoom: u8,
    #[serde(rename = "maxzoom")]
    pub max_zoom: u8,
}

impl TileSourceConfig {
    pub fn new(
        url_template: UrlTemplate,
        tile_size: u32,
        attribution: Attribution,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Result<Self, SourceError> {
        if tile_size < TILE_SIZE || !tile_size.is_power_of_two() {
            return Err(SourceError::InvalidTileSize(tile_size));
        }
        if min_zoom > max_zoom {
            return Err(SourceError::InvalidZoomRange(min_zoom, max_zoom));
        }
        Ok(Self {
            url_template,
            tile_size,
            attribution,
            min_zoom,
            max_zoom,
        })
    }
}

impl TileSource for TileSourceConfig {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.url_template.expand(tile_id)
    }

    fn attribution(&self) -> Attribution {
        self.attribution.clone()
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}

fn template_list<S: Serializer>(template: &UrlTemplate, serializer: S) -> Result<S::Ok, S::Error> {
    [template.as_str()].serialize(serializer)
}

fn attribution_text<S: Serializer>(
    attribution: &Attribution,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(attribution.text)
}
