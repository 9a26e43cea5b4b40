use super::{Attribution, SourceError, TileSource, TileSourceConfig, UrlTemplate};
use crate::TileId;

/// Public tile server of the OpenStreetMap project, used whenever no premium provider is
/// configured. <https://operations.osmfoundation.org/policies/tiles/>
pub struct OpenStreetMap;

impl OpenStreetMap {
    pub const URL_TEMPLATE: &'static str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

    pub fn config(&self) -> Result<TileSourceConfig, SourceError> {
        TileSourceConfig::new(
            UrlTemplate::new(Self::URL_TEMPLATE)?,
            self.tile_size(),
            self.attribution(),
            self.min_zoom(),
            self.max_zoom(),
        )
    }
}

impl TileSource for OpenStreetMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.openstreetmap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "OpenStreetMap contributors",
            url: "https://www.openstreetmap.org/copyright",
        }
    }

    fn max_zoom(&self) -> u8 {
        19
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_source_build_the_same_urls() {
        let tile_id = TileId { x: 3, y: 5, zoom: 4 };
        let config = OpenStreetMap.config().unwrap();
        assert_eq!(OpenStreetMap.tile_url(tile_id), config.tile_url(tile_id));
    }
}
