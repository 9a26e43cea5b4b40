//! Configuration resolved once at startup.

use std::str::FromStr;

use crate::{
    io::HttpOptions,
    mercator::MAX_LATITUDE,
    position::{Position, lon_lat},
    sources::{OpenStreetMap, SourceError, StadiaStyle, TileSourceConfig, stadia},
};

/// API key of Stadia Maps. Without it, the public OpenStreetMap tiles are used.
pub const STADIA_API_KEY: &str = "STADIA_API_KEY";

/// `overlay` or `base-style`, see [`RenderMode`].
pub const RENDER_MODE: &str = "PROJECTS_MAP_RENDER_MODE";

/// When set, tiles are not cached on disk.
pub const NO_HTTP_CACHE: &str = "NO_HTTP_CACHE";

/// Highest zoom level a viewport may be configured with.
pub const MAX_ZOOM: f64 = 22.;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("zoom {zoom} is outside of {min_zoom}..={max_zoom}")]
    Zoom {
        zoom: f64,
        min_zoom: f64,
        max_zoom: f64,
    },

    #[error("center ({lon}, {lat}) cannot be shown on the map")]
    Center { lon: f64, lat: f64 },

    #[error("unknown render mode '{0}', expected 'overlay' or 'base-style'")]
    RenderMode(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Initial view of the map. Afterwards, only the user changes it, through the widget's own
/// controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportConfig {
    pub center: Position,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            center: lon_lat(-73.98994, 40.749844),
            zoom: 12.,
            min_zoom: 9.,
            max_zoom: 18.,
        }
    }
}

impl ViewportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zoom_ok = [self.zoom, self.min_zoom, self.max_zoom]
            .iter()
            .all(|zoom| zoom.is_finite())
            && 0. <= self.min_zoom
            && self.min_zoom <= self.zoom
            && self.zoom <= self.max_zoom
            && self.max_zoom <= MAX_ZOOM;

        if !zoom_ok {
            return Err(ConfigError::Zoom {
                zoom: self.zoom,
                min_zoom: self.min_zoom,
                max_zoom: self.max_zoom,
            });
        }

        let (lon, lat) = (self.center.x(), self.center.y());
        if !((-180. ..=180.).contains(&lon) && (-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat)) {
            return Err(ConfigError::Center { lon, lat });
        }

        Ok(())
    }
}

/// Where the decorative tiles come from. Resolved once, so that every layer agrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileProvider {
    Stadia { api_key: String },
    OpenStreetMap,
}

impl TileProvider {
    /// Blank keys count as no key at all.
    pub fn from_api_key(api_key: Option<&str>) -> Self {
        match api_key.map(str::trim) {
            Some(api_key) if !api_key.is_empty() => Self::Stadia {
                api_key: api_key.to_owned(),
            },
            _ => Self::OpenStreetMap,
        }
    }

    /// Runtime environment first, then whatever was present when the crate was built, which is
    /// the only option in the browser.
    pub fn from_env() -> Self {
        let api_key = std::env::var(STADIA_API_KEY)
            .ok()
            .or_else(|| option_env!("STADIA_API_KEY").map(str::to_owned));
        Self::from_api_key(api_key.as_deref())
    }

    pub fn basemap(&self) -> Result<TileSourceConfig, SourceError> {
        match self {
            Self::Stadia { api_key } => stadia(StadiaStyle::Watercolor, api_key),
            Self::OpenStreetMap => OpenStreetMap.config(),
        }
    }

    pub fn labels(&self) -> Result<TileSourceConfig, SourceError> {
        match self {
            Self::Stadia { api_key } => stadia(StadiaStyle::TonerLabels, api_key),
            Self::OpenStreetMap => OpenStreetMap.config(),
        }
    }
}

/// How the decorative tiles are put on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Empty style, with the basemap and the labels drawn by an overlay.
    #[default]
    Overlay,

    /// Basemap declared directly in the style, no overlay.
    BaseStyle,
}

impl FromStr for RenderMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overlay" => Ok(Self::Overlay),
            "base-style" | "base_style" => Ok(Self::BaseStyle),
            _ => Err(ConfigError::RenderMode(s.to_owned())),
        }
    }
}

/// Everything the map view needs to know before it is mounted.
#[derive(Clone)]
pub struct MapConfig {
    pub viewport: ViewportConfig,
    pub provider: TileProvider,
    pub render_mode: RenderMode,
    pub http: HttpOptions,

    /// Accessible name of the map region.
    pub label: String,

    /// Category titles listed in the legend.
    pub legend: Vec<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            provider: TileProvider::OpenStreetMap,
            render_mode: RenderMode::default(),
            http: HttpOptions::default(),
            label: "Community Projects Map".to_owned(),
            legend: Vec::new(),
        }
    }
}

impl MapConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let render_mode = match std::env::var(RENDER_MODE) {
            Ok(value) => value.parse()?,
            Err(_) => RenderMode::default(),
        };

        let http = HttpOptions {
            // Not sure where to put cache on Android, so it will be disabled for now.
            cache: if cfg!(any(target_os = "android", target_arch = "wasm32"))
                || std::env::var(NO_HTTP_CACHE).is_ok()
            {
                None
            } else {
                Some(".cache".into())
            },
            ..Default::default()
        };

        let provider = TileProvider::from_env();
        provider.basemap()?;
        provider.labels()?;

        let config = Self {
            provider,
            render_mode,
            http,
            ..Default::default()
        };

        log::info!(
            "Using {} tiles, rendered as {:?}.",
            match config.provider {
                TileProvider::Stadia { .. } => "Stadia Maps",
                TileProvider::OpenStreetMap => "OpenStreetMap",
            },
            config.render_mode
        );

        Ok(config)
    }
}
