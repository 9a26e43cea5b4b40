use super::{Attribution, SourceError, TileSourceConfig, UrlTemplate};

/// Stamen styles hosted by Stadia Maps. An API key is required.
/// <https://docs.stadiamaps.com/themes/>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StadiaStyle {
    Watercolor,
    TonerLabels,
}

impl StadiaStyle {
    fn api_slug(&self) -> &'static str {
        match self {
            Self::Watercolor => "stamen_watercolor",
            Self::TonerLabels => "stamen_toner_labels",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Self::Watercolor => "jpg",
            Self::TonerLabels => "png",
        }
    }

    fn max_zoom(&self) -> u8 {
        match self {
            Self::Watercolor => 16,
            Self::TonerLabels => 20,
        }
    }
}

/// Raster source of the given Stadia style with `api_key` baked into the template.
pub fn stadia(style: StadiaStyle, api_key: &str) -> Result<TileSourceConfig, SourceError> {
    // The key goes into the query string verbatim.
    let url_safe = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~');
    if api_key.is_empty() || !api_key.chars().all(url_safe) {
        return Err(SourceError::InvalidApiKey);
    }

    let url_template = UrlTemplate::new(format!(
        "https://tiles.stadiamaps.com/tiles/{}/{{z}}/{{x}}/{{y}}.{}?api_key={}",
        style.api_slug(),
        style.extension(),
        api_key
    ))?;

    TileSourceConfig::new(
        url_template,
        256,
        Attribution {
            text: "© Stadia Maps © Stamen Design © OpenStreetMap contributors",
            url: "https://stadiamaps.com/attribution",
        },
        0,
        style.max_zoom(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TileId, sources::TileSource as _};

    #[test]
    fn key_is_interpolated() {
        let tile_id = TileId { x: 1, y: 2, zoom: 3 };

        assert_eq!(
            "https://tiles.stadiamaps.com/tiles/stamen_watercolor/3/1/2.jpg?api_key=secret",
            stadia(StadiaStyle::Watercolor, "secret").unwrap().tile_url(tile_id)
        );
        assert_eq!(
            "https://tiles.stadiamaps.com/tiles/stamen_toner_labels/3/1/2.png?api_key=secret",
            stadia(StadiaStyle::TonerLabels, "secret").unwrap().tile_url(tile_id)
        );
    }

    #[test]
    fn keys_that_would_break_the_url_are_rejected() {
        for key in ["a&b", "a#b", "{x}", "a b", "ключ", ""] {
            assert_eq!(
                Err(SourceError::InvalidApiKey),
                stadia(StadiaStyle::Watercolor, key),
                "{key}"
            );
        }
        assert!(stadia(StadiaStyle::TonerLabels, "0b1e5c7a-2f4d.k_e~y").is_ok());
    }
}
