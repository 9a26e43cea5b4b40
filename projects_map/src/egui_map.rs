//! Map widget drawn with egui, with tiles fetched over HTTP.

use std::num::NonZeroUsize;

use egui::{
    Align2, Color32, ColorImage, Context, EventFilter, Id, Key, LayerId, Order, Painter,
    PointerButton, Pos2, Rect, Response, RichText, Sense, TextureHandle, TextureOptions, Ui, Vec2,
    WidgetInfo, WidgetType, Window, pos2, vec2,
};
use futures::channel::mpsc::UnboundedReceiver;
use lru::LruCache;

use crate::{
    config::{ConfigError, ViewportConfig},
    io::HttpOptions,
    layer::{Bitmap, LayerStats, TileLayer, TileLayerSpec},
    mercator::{MAX_LATITUDE, TileId, project, unproject, visible_tiles},
    overlay::Overlay,
    page::Region,
    position::{Pixels, PixelsExt as _, Position, lon_lat},
    sources::Attribution,
    widget::{Control, ControlPosition, MapBackend, MapError, MapEvent, MapWidget, WidgetOptions},
    zoom::{InvalidZoom, Zoom},
};

/// How many textures are kept on the GPU, across all layers.
const TEXTURE_CACHE_SIZE: usize = 512;

/// How far arrow keys move the map, in pixels.
const PAN_STEP: f32 = 64.;

/// Distance of controls from the edges of the map.
const MARGIN: f32 = 10.;

/// Creates [`EguiMap`]s and tile layers repainting the given [`Context`].
pub struct EguiBackend {
    ctx: Context,
    http: HttpOptions,
    gpu_events: Option<UnboundedReceiver<MapEvent>>,
}

impl EguiBackend {
    pub fn new(ctx: Context, http: HttpOptions) -> Self {
        Self {
            ctx,
            http,
            gpu_events: None,
        }
    }

    /// GPU context events, coming from wherever the rendering surface lives. They are handed
    /// over to the next widget created.
    pub fn with_gpu_events(mut self, gpu_events: UnboundedReceiver<MapEvent>) -> Self {
        self.gpu_events = Some(gpu_events);
        self
    }
}

impl MapBackend for EguiBackend {
    type Widget = EguiMap;

    fn create_widget(&mut self, options: WidgetOptions) -> Result<EguiMap, MapError> {
        let camera = Camera::new(&options.viewport)?;

        match options.style.to_json() {
            Ok(style) => log::debug!("Creating map with style {style}"),
            Err(err) => log::warn!("Map style cannot be shown: {err}"),
        }

        let base_layers = options
            .style
            .raster_layers()?
            .into_iter()
            .map(|(layer, source)| {
                self.create_tile_layer(TileLayerSpec::new(layer.id.clone(), source.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Created map with {} base layer(s).", base_layers.len());
        Ok(EguiMap::new(camera, base_layers, self.gpu_events.take()))
    }

    fn create_tile_layer(&mut self, spec: TileLayerSpec) -> Result<TileLayer, MapError> {
        let layer = spec.id.clone();
        TileLayer::new(spec, &self.http, self.ctx.clone()).map_err(|err| MapError::Layer {
            layer,
            reason: err.to_string(),
        })
    }
}

/// What the map is looking at.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    center: Position,
    zoom: Zoom,
}

impl Camera {
    pub fn new(viewport: &ViewportConfig) -> Result<Self, MapError> {
        viewport.validate()?;

        let Ok(zoom) = Zoom::new(viewport.zoom, viewport.min_zoom, viewport.max_zoom) else {
            return Err(ConfigError::Zoom {
                zoom: viewport.zoom,
                min_zoom: viewport.min_zoom,
                max_zoom: viewport.max_zoom,
            }
            .into());
        };

        Ok(Self {
            center: viewport.center,
            zoom,
        })
    }

    pub fn center(&self) -> Position {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.value()
    }

    /// Move the map content by `delta` pixels, like dragging does.
    pub fn pan(&mut self, delta: Vec2) {
        let zoom = self.zoom.value();
        let center = project(self.center, zoom) - Pixels::from_vec2(delta);
        self.center = clamped(unproject(center, zoom));
    }

    /// Zoom by `delta` levels, keeping the point at `offset` from the center in place.
    pub fn zoom_around(&mut self, delta: f64, offset: Vec2) {
        let offset = Pixels::from_vec2(offset);
        let before = self.zoom.value();
        let anchor = unproject(project(self.center, before) + offset, before);

        self.zoom.zoom_by(delta);

        let after = self.zoom.value();
        self.center = clamped(unproject(project(anchor, after) - offset, after));
    }

    pub fn zoom_in(&mut self) -> Result<(), InvalidZoom> {
        self.zoom.zoom_in()
    }

    pub fn zoom_out(&mut self) -> Result<(), InvalidZoom> {
        self.zoom.zoom_out()
    }

    /// Where `position` lands on the screen, with the map filling `rect`.
    pub fn to_screen(&self, rect: Rect, position: Position) -> Pos2 {
        let zoom = self.zoom.value();
        rect.center() + (project(position, zoom) - project(self.center, zoom)).to_vec2()
    }

    /// Tiles of `layer` needed to fill a viewport of `size`, or `None` if the layer is hidden
    /// at the current zoom.
    pub fn visible_tiles(&self, layer: &TileLayer, size: Vec2) -> Option<Vec<TileId>> {
        let tile_zoom = layer.tile_zoom(self.zoom.value())?;
        Some(visible_tiles(
            self.center,
            self.zoom.value(),
            size.x as f64,
            size.y as f64,
            tile_zoom,
        ))
    }
}

fn clamped(position: Position) -> Position {
    lon_lat(
        position.x().clamp(-180., 180.),
        position.y().clamp(-MAX_LATITUDE, MAX_LATITUDE),
    )
}

/// Textures of the tiles, uploaded once and reused across frames.
struct Textures(LruCache<(String, TileId), TextureHandle>);

impl Textures {
    fn new() -> Self {
        Self(LruCache::new(
            NonZeroUsize::new(TEXTURE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
        ))
    }

    fn get(&mut self, ctx: &Context, layer_id: &str, bitmap: &Bitmap) -> TextureHandle {
        self.0
            .get_or_insert((layer_id.to_owned(), bitmap.tile_id), || {
                let image = ColorImage::from_rgba_unmultiplied(
                    [bitmap.image.width() as usize, bitmap.image.height() as usize],
                    bitmap.image.as_raw(),
                );
                ctx.load_texture(
                    format!("{layer_id}/{:?}", bitmap.tile_id),
                    image,
                    TextureOptions::LINEAR,
                )
            })
            .clone()
    }
}

/// Slippy map drawn with egui. It keeps its own camera, so after mounting only the user moves
/// it around.
pub struct EguiMap {
    camera: Camera,
    base_layers: Vec<TileLayer>,
    navigation: Option<ControlPosition>,
    overlay: Option<Overlay>,
    events: Vec<MapEvent>,
    gpu_events: Option<UnboundedReceiver<MapEvent>>,
    textures: Textures,
    loaded: bool,
    removed: bool,
}

impl EguiMap {
    pub(crate) fn new(
        camera: Camera,
        base_layers: Vec<TileLayer>,
        gpu_events: Option<UnboundedReceiver<MapEvent>>,
    ) -> Self {
        Self {
            camera,
            base_layers,
            navigation: None,
            overlay: None,
            events: Vec::new(),
            gpu_events,
            textures: Textures::new(),
            loaded: false,
            removed: false,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// Attributions of every layer, without repetitions.
    pub fn attributions(&self) -> Vec<Attribution> {
        let overlay_layers = self.overlay.iter().flat_map(|overlay| overlay.layers());

        let mut attributions: Vec<Attribution> = Vec::new();
        for layer in self.base_layers.iter().chain(overlay_layers) {
            let attribution = layer.attribution();
            if !attributions.contains(&attribution) {
                attributions.push(attribution);
            }
        }
        attributions
    }

    /// Downloads and failures of every layer, summed up.
    pub fn stats(&self) -> LayerStats {
        let overlay_layers = self.overlay.iter().flat_map(|overlay| overlay.layers());

        let mut total = LayerStats::default();
        for layer in self.base_layers.iter().chain(overlay_layers) {
            let stats = layer.stats();
            total.io.in_progress += stats.io.in_progress;
            total.failed += stats.failed;
        }
        total
    }

    /// Draw the map in the remaining space of `ui`. Tiles are requested even when the region is
    /// hidden, so that the map can finish loading before being revealed.
    pub fn show(&mut self, ui: &mut Ui, region: &Region) -> Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        let label = region.attributes.aria_label.clone().unwrap_or_default();
        response.widget_info(|| WidgetInfo::labeled(WidgetType::Other, ui.is_enabled(), &label));

        if self.removed {
            return response;
        }

        let visible = region.is_visible();
        if visible {
            self.handle_input(ui, &response, rect);
        }

        let painter = visible.then(|| ui.painter_at(rect));
        let settled = self.draw_layers(ui.ctx(), painter.as_ref(), rect);

        if settled && !self.loaded {
            log::debug!("All base tiles are in.");
            self.loaded = true;
            self.events.push(MapEvent::Load);
        }

        if visible {
            self.draw_controls(ui, rect);
        }

        response
    }

    fn handle_input(&mut self, ui: &Ui, response: &Response, rect: Rect) {
        if response.clicked() {
            response.request_focus();
        }

        let zoom_delta = ui.input(|input| {
            input.smooth_scroll_delta.y as f64 / 200. + (input.zoom_delta() as f64 - 1.) * 2.
        });

        // Zooming and dragging are exclusive, otherwise pinching would drag the map too.
        match response.hover_pos() {
            Some(pointer) if zoom_delta.abs() > f64::EPSILON => {
                self.camera.zoom_around(zoom_delta, pointer - rect.center());
            }
            _ => {
                if response.dragged_by(PointerButton::Primary) {
                    self.camera.pan(response.drag_delta());
                }
            }
        }

        if response.has_focus() {
            ui.memory_mut(|memory| {
                memory.set_focus_lock_filter(
                    response.id,
                    EventFilter {
                        horizontal_arrows: true,
                        vertical_arrows: true,
                        ..Default::default()
                    },
                );
            });

            let (zoom_in, zoom_out, pan) = ui.input(|input| {
                let pan = [
                    (Key::ArrowLeft, vec2(PAN_STEP, 0.)),
                    (Key::ArrowRight, vec2(-PAN_STEP, 0.)),
                    (Key::ArrowUp, vec2(0., PAN_STEP)),
                    (Key::ArrowDown, vec2(0., -PAN_STEP)),
                ]
                .into_iter()
                .filter(|(key, _)| input.key_pressed(*key))
                .fold(Vec2::ZERO, |pan, (_, step)| pan + step);

                (
                    input.key_pressed(Key::Plus) || input.key_pressed(Key::Equals),
                    input.key_pressed(Key::Minus),
                    pan,
                )
            });

            if zoom_in {
                self.zoom_in();
            }
            if zoom_out {
                self.zoom_out();
            }
            if pan != Vec2::ZERO {
                self.camera.pan(pan);
            }
        }
    }

    fn zoom_in(&mut self) {
        if let Err(err) = self.camera.zoom_in() {
            log::debug!("Cannot zoom in: {err}.");
        }
    }

    fn zoom_out(&mut self) {
        if let Err(err) = self.camera.zoom_out() {
            log::debug!("Cannot zoom out: {err}.");
        }
    }

    /// Returns whether the base layers have all their visible tiles settled.
    fn draw_layers(&mut self, ctx: &Context, painter: Option<&Painter>, rect: Rect) -> bool {
        let mut settled = true;
        for layer in &mut self.base_layers {
            settled &= draw_layer(layer, &self.camera, &mut self.textures, ctx, painter, rect);
        }

        if let Some(overlay) = &mut self.overlay {
            let foreground = painter.filter(|_| !overlay.interleaved()).map(|_| {
                Painter::new(
                    ctx.clone(),
                    LayerId::new(Order::Foreground, Id::new("projects_map_overlay")),
                    rect,
                )
            });
            let painter = foreground.as_ref().or(painter);

            for layer in overlay.layers_mut() {
                draw_layer(layer, &self.camera, &mut self.textures, ctx, painter, rect);
            }
        }

        settled
    }

    fn draw_controls(&mut self, ui: &Ui, rect: Rect) {
        if let Some(position) = self.navigation {
            let (pivot, corner) = anchor(position, rect);
            let mut zoom_in = false;
            let mut zoom_out = false;

            Window::new("Navigation")
                .collapsible(false)
                .resizable(false)
                .title_bar(false)
                .pivot(pivot)
                .fixed_pos(corner)
                .show(ui.ctx(), |ui| {
                    ui.vertical(|ui| {
                        zoom_in = ui
                            .button(RichText::new("➕").heading())
                            .on_hover_text("Zoom in")
                            .clicked();
                        zoom_out = ui
                            .button(RichText::new("➖").heading())
                            .on_hover_text("Zoom out")
                            .clicked();
                    });
                });

            if zoom_in {
                self.zoom_in();
            }
            if zoom_out {
                self.zoom_out();
            }
        }

        let attributions = self.attributions();
        let stats = self.stats();
        if !attributions.is_empty() || stats.io.in_progress > 0 {
            let (pivot, corner) = anchor(ControlPosition::BottomRight, rect);
            Window::new("Attribution")
                .collapsible(false)
                .resizable(false)
                .title_bar(false)
                .pivot(pivot)
                .fixed_pos(corner)
                .show(ui.ctx(), |ui| {
                    ui.horizontal(|ui| {
                        if stats.io.in_progress > 0 {
                            ui.spinner().on_hover_text(format!(
                                "Downloading {} tiles, {} failed so far",
                                stats.io.in_progress, stats.failed
                            ));
                        }
                        for attribution in attributions {
                            ui.hyperlink_to(attribution.text, attribution.url);
                        }
                    });
                });
        }
    }
}

/// Request the visible tiles of `layer`, and paint the ones which are ready. Returns whether
/// all of them are either loaded or failed.
fn draw_layer(
    layer: &mut TileLayer,
    camera: &Camera,
    textures: &mut Textures,
    ctx: &Context,
    painter: Option<&Painter>,
    rect: Rect,
) -> bool {
    let Some(tiles) = camera.visible_tiles(layer, rect.size()) else {
        return true;
    };

    for tile_id in &tiles {
        let Some(bitmap) = layer.tile(*tile_id) else {
            continue;
        };

        if let Some(painter) = painter {
            let texture = textures.get(ctx, layer.id(), &bitmap);
            let screen = Rect::from_min_max(
                camera.to_screen(rect, bitmap.bounds.north_west()),
                camera.to_screen(rect, bitmap.bounds.south_east()),
            );
            painter.image(
                texture.id(),
                screen,
                Rect::from_min_max(pos2(0., 0.), pos2(1., 1.)),
                Color32::WHITE.gamma_multiply(bitmap.opacity),
            );
        }
    }

    layer.settled(&tiles)
}

fn anchor(position: ControlPosition, rect: Rect) -> (Align2, Pos2) {
    match position {
        ControlPosition::TopLeft => (Align2::LEFT_TOP, rect.left_top() + vec2(MARGIN, MARGIN)),
        ControlPosition::TopRight => (Align2::RIGHT_TOP, rect.right_top() + vec2(-MARGIN, MARGIN)),
        ControlPosition::BottomLeft => {
            (Align2::LEFT_BOTTOM, rect.left_bottom() + vec2(MARGIN, -MARGIN))
        }
        ControlPosition::BottomRight => {
            (Align2::RIGHT_BOTTOM, rect.right_bottom() + vec2(-MARGIN, -MARGIN))
        }
    }
}

impl MapWidget for EguiMap {
    fn add_control(&mut self, control: Control, position: ControlPosition) {
        match control {
            Control::Navigation(_) => self.navigation = Some(position),
            Control::Overlay(overlay) => {
                if self.overlay.replace(overlay).is_some() {
                    log::warn!("Map already had an overlay, replacing it.");
                }
            }
        }
    }

    fn poll_events(&mut self) -> Vec<MapEvent> {
        if self.removed {
            return Vec::new();
        }

        for layer in &mut self.base_layers {
            for failure in layer.poll() {
                self.events.push(MapEvent::Error(MapError::Tile {
                    source_id: failure.layer_id,
                    tile_id: failure.tile_id,
                    error: failure.error,
                }));
            }
        }

        if let Some(overlay) = &mut self.overlay {
            overlay.poll();
        }

        if let Some(gpu_events) = &mut self.gpu_events {
            while let Ok(Some(event)) = gpu_events.try_next() {
                self.events.push(event);
            }
        }

        std::mem::take(&mut self.events)
    }

    fn remove(&mut self) {
        self.removed = true;
        self.navigation = None;
        self.overlay = None;
        self.base_layers.clear();
        self.textures.0.clear();
        self.gpu_events = None;
        self.events.clear();
    }
}
