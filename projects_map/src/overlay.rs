//! Compositing layer drawn on top of the map widget, in the same frame.

use crate::{
    config::TileProvider,
    layer::{TileLayer, TileLayerSpec},
    sources::SourceError,
};

/// Tile layers composited over the map. It is handed over to the widget as one of its
/// controls, so it lives exactly as long as the widget does.
pub struct Overlay {
    interleaved: bool,
    layers: Vec<TileLayer>,
}

impl Overlay {
    pub fn new(interleaved: bool, layers: Vec<TileLayer>) -> Self {
        Self {
            interleaved,
            layers,
        }
    }

    /// Whether the layers are drawn in the widget's own render pass, rather than on top of it.
    pub fn interleaved(&self) -> bool {
        self.interleaved
    }

    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [TileLayer] {
        &mut self.layers
    }

    pub fn layer(&self, id: &str) -> Option<&TileLayer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }

    /// Let every layer take what arrived. Tile failures only reach the layers' own handlers.
    pub fn poll(&mut self) {
        for layer in &mut self.layers {
            layer.poll();
        }
    }
}

/// Layers giving the map its hand-painted look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorativeLayer {
    Watercolor,
    TonerLabels,
}

impl DecorativeLayer {
    pub const ALL: [Self; 2] = [Self::Watercolor, Self::TonerLabels];

    pub fn spec(&self, provider: &TileProvider) -> Result<TileLayerSpec, SourceError> {
        let spec = match self {
            Self::Watercolor => TileLayerSpec::new("watercolor", provider.basemap()?),
            Self::TonerLabels => {
                TileLayerSpec::new("toner-labels", provider.labels()?).with_opacity(0.5)
            }
        };
        Ok(spec.with_zoom_range(0, 18))
    }

    /// What gets logged when one of the layer's tiles fails.
    pub fn error_message(&self) -> &'static str {
        match self {
            Self::Watercolor => "Tile loading error",
            Self::TonerLabels => "Tile labels loading error",
        }
    }
}
