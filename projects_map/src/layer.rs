//! Raster tile layers: which tiles to fetch, their cache, and how a fetched tile becomes a
//! bitmap placed on the map.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::{
    io::{
        Fetch, HttpFetch, HttpOptions, Repaint, TileError, TileImage,
        tiles_io::{Requested, Stats, TilesIo},
    },
    mercator::{TILE_SIZE, TileId},
    position::BoundingBox,
    sources::{Attribution, TileSourceConfig},
};

/// How many tiles each layer keeps around.
const CACHE_SIZE: usize = 256;

/// Declarative description of a tile layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerSpec {
    pub id: String,
    pub source: TileSourceConfig,
    pub opacity: f32,

    /// Below this zoom the layer is not shown at all.
    pub min_zoom: u8,

    /// Above this zoom, tiles of this zoom are stretched.
    pub max_zoom: u8,
}

impl TileLayerSpec {
    pub fn new(id: impl Into<String>, source: TileSourceConfig) -> Self {
        Self {
            id: id.into(),
            min_zoom: source.min_zoom,
            max_zoom: source.max_zoom,
            source,
            opacity: 1.,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0., 1.);
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }
}

/// A tile which could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFailure {
    pub layer_id: String,
    pub tile_id: TileId,
    pub error: TileError,
}

/// Tile image positioned by its geographical extent, ready for compositing.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub tile_id: TileId,
    pub image: TileImage,
    pub bounds: BoundingBox,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Missing,
    Pending,
    Ready,
    Failed,
}

enum TileSlot {
    Pending,
    Ready(TileImage),
    Failed,
}

type TileErrorHandler = Box<dyn FnMut(&TileFailure)>;

pub struct TileLayer {
    spec: TileLayerSpec,
    io: TilesIo,
    cache: LruCache<TileId, TileSlot>,
    on_tile_error: Option<TileErrorHandler>,
    failed: usize,
}

impl TileLayer {
    /// Layer fetching its tiles over HTTP on its own IO runtime.
    pub fn new(
        spec: TileLayerSpec,
        http_options: &HttpOptions,
        repaint: impl Repaint,
    ) -> std::io::Result<Self> {
        let fetch = HttpFetch::new(spec.source.clone(), http_options);
        Self::with_fetch(spec, fetch, repaint)
    }

    pub fn with_fetch(
        spec: TileLayerSpec,
        fetch: impl Fetch + Send + Sync + 'static,
        repaint: impl Repaint,
    ) -> std::io::Result<Self> {
        let io = TilesIo::spawn(&spec.id, fetch, repaint)?;
        Ok(Self::with_io(spec, io))
    }

    fn with_io(spec: TileLayerSpec, io: TilesIo) -> Self {
        Self {
            spec,
            io,
            cache: LruCache::new(NonZeroUsize::new(CACHE_SIZE).unwrap_or(NonZeroUsize::MIN)),
            on_tile_error: None,
            failed: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn manual(spec: TileLayerSpec) -> (Self, crate::io::tiles_io::ManualIo) {
        let (io, manual) = TilesIo::manual(16);
        (Self::with_io(spec, io), manual)
    }

    /// Called on the UI thread for every tile which failed to load.
    pub fn on_tile_error(mut self, handler: impl FnMut(&TileFailure) + 'static) -> Self {
        self.on_tile_error = Some(Box::new(handler));
        self
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &TileLayerSpec {
        &self.spec
    }

    pub fn attribution(&self) -> Attribution {
        self.spec.source.attribution.clone()
    }

    /// Zoom of the tiles to draw when the map is viewed at `view_zoom`, or `None` when the
    /// layer is hidden at that zoom.
    pub fn tile_zoom(&self, view_zoom: f64) -> Option<u8> {
        let zoom = view_zoom.round().max(0.) as u8;
        if zoom < self.spec.min_zoom.max(self.spec.source.min_zoom) {
            return None;
        }

        let zoom = zoom
            .min(self.spec.max_zoom)
            .min(self.spec.source.max_zoom);

        // Some sources provide larger tiles, effectively bundling e.g. 4 256px tiles in one
        // 512px one, so their zoom level is lower.
        let bundled = (self.spec.source.tile_size / TILE_SIZE).max(1).ilog2() as u8;
        Some(zoom.saturating_sub(bundled))
    }

    /// Put everything that arrived from the IO side in the cache. Failures are reported to the
    /// `on_tile_error` handler and returned.
    pub fn poll(&mut self) -> Vec<TileFailure> {
        let mut failures = Vec::new();

        for outcome in self.io.drain() {
            match outcome.result {
                Ok(image) => {
                    self.cache.put(outcome.tile_id, TileSlot::Ready(image));
                }
                Err(error) => {
                    self.cache.put(outcome.tile_id, TileSlot::Failed);
                    self.failed += 1;

                    let failure = TileFailure {
                        layer_id: self.spec.id.clone(),
                        tile_id: outcome.tile_id,
                        error,
                    };
                    if let Some(on_tile_error) = &mut self.on_tile_error {
                        on_tile_error(&failure);
                    }
                    failures.push(failure);
                }
            }
        }

        failures
    }

    /// Bitmap of the tile if it is already loaded, schedule a download otherwise. Failed tiles
    /// stay blank.
    pub fn tile(&mut self, tile_id: TileId) -> Option<Bitmap> {
        if !tile_id.valid() {
            return None;
        }

        match self.cache.get(&tile_id) {
            Some(TileSlot::Ready(image)) => {
                let image = image.clone();
                Some(self.render_sub_layer(tile_id, image))
            }
            Some(TileSlot::Pending | TileSlot::Failed) => None,
            None => {
                match self.io.request(tile_id) {
                    Requested::Queued => {
                        self.cache.put(tile_id, TileSlot::Pending);
                    }
                    Requested::QueueFull => {}
                    Requested::Disconnected => {
                        self.cache.put(tile_id, TileSlot::Failed);
                    }
                }
                None
            }
        }
    }

    /// Turn a fetched tile into a bitmap spanning the tile's bounding box.
    pub fn render_sub_layer(&self, tile_id: TileId, image: TileImage) -> Bitmap {
        Bitmap {
            tile_id,
            image,
            bounds: tile_id.bounding_box(),
            opacity: self.spec.opacity,
        }
    }

    pub fn state(&self, tile_id: TileId) -> TileState {
        match self.cache.peek(&tile_id) {
            None => TileState::Missing,
            Some(TileSlot::Pending) => TileState::Pending,
            Some(TileSlot::Ready(_)) => TileState::Ready,
            Some(TileSlot::Failed) => TileState::Failed,
        }
    }

    /// Whether all of the `tiles` are either loaded or failed.
    pub fn settled(&self, tiles: &[TileId]) -> bool {
        tiles
            .iter()
            .all(|tile_id| matches!(self.state(*tile_id), TileState::Ready | TileState::Failed))
    }

    pub fn stats(&self) -> LayerStats {
        LayerStats {
            io: self.io.stats(),
            failed: self.failed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerStats {
    pub io: Stats,

    /// Tiles which failed since the layer was created.
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        io::TileOutcome,
        sources::{OpenStreetMap, StadiaStyle, stadia},
    };
    use image::RgbaImage;
    use std::{cell::RefCell, rc::Rc, sync::Arc};

    const TILE: TileId = TileId {
        x: 1206,
        y: 1539,
        zoom: 12,
    };

    fn osm_layer(id: &str) -> (TileLayer, crate::io::tiles_io::ManualIo) {
        TileLayer::manual(TileLayerSpec::new(id, OpenStreetMap.config().unwrap()))
    }

    fn image() -> TileImage {
        Arc::new(RgbaImage::new(256, 256))
    }

    #[test]
    fn tile_is_requested_once_and_rendered_when_ready() {
        let (mut layer, mut io) = osm_layer("base");

        assert!(layer.tile(TILE).is_none());
        assert!(layer.tile(TILE).is_none());
        assert_eq!(vec![TILE], io.requested());
        assert_eq!(TileState::Pending, layer.state(TILE));

        io.complete(TileOutcome {
            tile_id: TILE,
            result: Ok(image()),
        });
        assert!(layer.poll().is_empty());

        let bitmap = layer.tile(TILE).unwrap();
        assert_eq!(TILE.bounding_box(), bitmap.bounds);
        assert_eq!(1., bitmap.opacity);
        assert!(layer.settled(&[TILE]));
    }

    #[test]
    fn invalid_tiles_are_not_requested() {
        let (mut layer, mut io) = osm_layer("base");

        assert!(layer.tile(TileId { x: 2, y: 2, zoom: 0 }).is_none());
        assert!(io.requested().is_empty());
    }

    #[test]
    fn failed_tile_stays_blank_and_is_reported() {
        let reported = Rc::new(RefCell::new(Vec::new()));
        let (layer, mut io) = osm_layer("labels");
        let mut layer = layer.on_tile_error({
            let reported = reported.clone();
            move |failure| reported.borrow_mut().push(failure.clone())
        });

        assert!(layer.tile(TILE).is_none());
        io.complete(TileOutcome {
            tile_id: TILE,
            result: Err(TileError::Fetch("404".to_owned())),
        });

        let failures = layer.poll();
        assert_eq!(1, failures.len());
        assert_eq!(failures, *reported.borrow());
        assert_eq!("labels", failures[0].layer_id);

        // Not retried, and considered settled.
        assert!(layer.tile(TILE).is_none());
        assert!(io.requested().is_empty());
        assert_eq!(TileState::Failed, layer.state(TILE));
        assert!(layer.settled(&[TILE]));
        assert_eq!(1, layer.stats().failed);
    }

    #[test]
    fn failure_in_one_layer_leaves_the_other_alone() {
        let provider_key = "k3y";
        let (mut watercolor, mut watercolor_io) = TileLayer::manual(TileLayerSpec::new(
            "watercolor",
            stadia(StadiaStyle::Watercolor, provider_key).unwrap(),
        ));
        let (mut labels, mut labels_io) = TileLayer::manual(
            TileLayerSpec::new(
                "toner-labels",
                stadia(StadiaStyle::TonerLabels, provider_key).unwrap(),
            )
            .with_opacity(0.5),
        );

        watercolor.tile(TILE);
        labels.tile(TILE);
        watercolor_io.complete(TileOutcome {
            tile_id: TILE,
            result: Err(TileError::Fetch("timeout".to_owned())),
        });
        labels_io.complete(TileOutcome {
            tile_id: TILE,
            result: Ok(image()),
        });

        assert_eq!(1, watercolor.poll().len());
        assert!(labels.poll().is_empty());

        assert!(watercolor.tile(TILE).is_none());
        assert_eq!(0.5, labels.tile(TILE).unwrap().opacity);
    }

    #[test]
    fn zoom_of_tiles_follows_the_layer_bounds() {
        let (layer, _io) = TileLayer::manual(
            TileLayerSpec::new("watercolor", stadia(StadiaStyle::Watercolor, "k").unwrap())
                .with_zoom_range(3, 18),
        );

        assert_eq!(None, layer.tile_zoom(2.));
        assert_eq!(Some(3), layer.tile_zoom(2.6));
        assert_eq!(Some(12), layer.tile_zoom(12.2));

        // Watercolor is served up to 16, then stretched.
        assert_eq!(Some(16), layer.tile_zoom(18.));
    }

    #[test]
    fn large_tiles_come_from_lower_zoom() {
        let mut source = OpenStreetMap.config().unwrap();
        source.tile_size = 512;
        let (layer, _io) = TileLayer::manual(TileLayerSpec::new("hi-dpi", source));

        assert_eq!(Some(11), layer.tile_zoom(12.));
        assert_eq!(Some(0), layer.tile_zoom(0.));
    }

    #[test]
    fn dropping_layer_with_outstanding_requests_is_fine() {
        let (mut layer, mut io) = osm_layer("base");
        layer.tile(TILE);
        drop(layer);

        // Late response has nobody to go to.
        assert!(
            io.outcomes
                .try_send(TileOutcome {
                    tile_id: TILE,
                    result: Ok(image()),
                })
                .is_err()
        );
    }
}
