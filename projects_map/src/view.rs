//! The map view: owns the widget while mounted and keeps the page in sync with it.

use crate::{
    config::{MapConfig, RenderMode, TileProvider},
    overlay::{DecorativeLayer, Overlay},
    page::{LoadState, Page},
    style::MapStyle,
    widget::{
        Control, ControlPosition, MapBackend, MapError, MapEvent, MapWidget, NavigationControl,
        WidgetOptions,
    },
};

/// Source id of the basemap when it is declared in the style.
const BASEMAP_SOURCE: &str = "basemap";

/// Map shown in its page region. Failures never leave it, they end up on the loader instead.
///
/// The widget is created by [`MapView::mount`] and released by [`MapView::unmount`], or when
/// the view is dropped.
pub struct MapView<B: MapBackend> {
    config: MapConfig,
    page: Page,
    state: LoadState,
    widget: Option<B::Widget>,
    overlay_attached: bool,

    /// Set when the current mount failed to build its widget or overlay. Later `Load` events
    /// do not hide that failure.
    construction_failed: bool,
}

impl<B: MapBackend> MapView<B> {
    pub fn new(config: MapConfig) -> Self {
        let page = Page::with_legend(config.legend.clone());
        Self {
            config,
            page,
            state: LoadState::default(),
            widget: None,
            overlay_attached: false,
            construction_failed: false,
        }
    }

    /// Create the widget and everything that goes with it. Does nothing if already mounted.
    pub fn mount(&mut self, backend: &mut B) {
        if self.widget.is_some() {
            log::debug!("Map is already mounted.");
            return;
        }

        // Every mount starts over from loading.
        self.state = LoadState::default();
        self.page = Page::with_legend(self.config.legend.clone());
        self.construction_failed = false;

        let created = base_style(&self.config).and_then(|style| {
            backend.create_widget(WidgetOptions {
                style,
                viewport: self.config.viewport.clone(),
            })
        });

        // Whatever happened, the region is there and should be reachable.
        self.page.map.attributes.tabindex = Some(0);
        self.page.map.attributes.aria_label = Some(self.config.label.clone());

        let mut widget = match created {
            Ok(widget) => widget,
            Err(err) => {
                log::error!("Failed to create the map: {err}");
                self.fail_construction(err);
                return;
            }
        };

        widget.add_control(
            Control::Navigation(NavigationControl),
            ControlPosition::TopRight,
        );

        if self.config.render_mode == RenderMode::Overlay {
            match decorative_overlay(backend, &self.config.provider) {
                Ok(overlay) => {
                    widget.add_control(Control::Overlay(overlay), ControlPosition::TopRight);
                    self.overlay_attached = true;
                }
                Err(err) => {
                    log::error!("Failed to create the overlay: {err}");
                    self.fail_construction(err);
                }
            }
        }

        self.widget = Some(widget);
    }

    /// Remove the widget. Safe to call any number of times.
    pub fn unmount(&mut self) {
        if let Some(mut widget) = self.widget.take() {
            log::debug!("Removing the map.");
            widget.remove();
        }
        self.overlay_attached = false;
    }

    /// Handle everything the widget reported since the last call.
    pub fn pump(&mut self) {
        let events = match &mut self.widget {
            Some(widget) => widget.poll_events(),
            None => return,
        };

        for event in events {
            self.handle_event(&event);
        }
    }

    pub fn handle_event(&mut self, event: &MapEvent) {
        match event {
            MapEvent::Load => log::info!("Map loaded."),
            MapEvent::Error(err) => log::error!("Map error: {err}"),
            MapEvent::ContextLost => log::warn!("WebGL context lost."),
            MapEvent::ContextRestored => log::info!("WebGL context restored."),
        }
        self.transition(event);
    }

    fn fail_construction(&mut self, err: MapError) {
        self.transition(&MapEvent::Error(err));
        self.construction_failed = true;
    }

    fn transition(&mut self, event: &MapEvent) {
        if self.construction_failed && matches!(event, MapEvent::Load) {
            log::debug!("Ignoring load, the map was not built completely.");
            return;
        }

        let state = self.state.on(event);
        if matches!(event, MapEvent::Load | MapEvent::Error(_)) {
            self.page.apply(state);
        }
        self.state = state;
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn is_mounted(&self) -> bool {
        self.widget.is_some()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay_attached
    }

    pub fn widget_mut(&mut self) -> Option<&mut B::Widget> {
        self.widget.as_mut()
    }

    /// Page and widget at once, which is what drawing needs.
    pub fn parts_mut(&mut self) -> (&Page, Option<&mut B::Widget>) {
        (&self.page, self.widget.as_mut())
    }
}

impl<B: MapBackend> Drop for MapView<B> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn base_style(config: &MapConfig) -> Result<MapStyle, MapError> {
    Ok(match config.render_mode {
        RenderMode::Overlay => MapStyle::empty(),
        RenderMode::BaseStyle => MapStyle::raster(BASEMAP_SOURCE, config.provider.basemap()?),
    })
}

/// Watercolor basemap with the labels on top. Failing tiles are logged, each layer on its own.
fn decorative_overlay<B: MapBackend>(
    backend: &mut B,
    provider: &TileProvider,
) -> Result<Overlay, MapError> {
    let layers = DecorativeLayer::ALL
        .iter()
        .map(|decorative| {
            let message = decorative.error_message();
            backend
                .create_tile_layer(decorative.spec(provider)?)
                .map(|layer| {
                    layer.on_tile_error(move |failure| {
                        log::error!("{message}: {} ({:?})", failure.error, failure.tile_id);
                    })
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Overlay::new(true, layers))
}
