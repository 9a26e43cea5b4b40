//! Page hosting the map, shared by the native and the web entry points.

use egui::{Align2, Color32, Context, RichText, Ui, Window};
use futures::channel::mpsc::UnboundedReceiver;

use crate::{
    config::MapConfig,
    egui_map::EguiBackend,
    page::{Legend, Loader, LoaderTone, Region},
    view::MapView,
    widget::MapEvent,
};

pub struct ProjectsMapApp {
    view: MapView<EguiBackend>,
    query: String,
}

impl ProjectsMapApp {
    pub fn new(ctx: Context, config: MapConfig) -> Self {
        let backend = EguiBackend::new(ctx, config.http.clone());
        Self::with_backend(backend, config)
    }

    /// Map whose GPU context events come from `gpu_events`.
    pub fn with_gpu_events(
        ctx: Context,
        config: MapConfig,
        gpu_events: UnboundedReceiver<MapEvent>,
    ) -> Self {
        let backend = EguiBackend::new(ctx, config.http.clone()).with_gpu_events(gpu_events);
        Self::with_backend(backend, config)
    }

    pub fn with_backend(mut backend: EguiBackend, config: MapConfig) -> Self {
        let mut view = MapView::new(config);
        view.mount(&mut backend);
        Self {
            view,
            query: String::new(),
        }
    }

    pub fn view(&self) -> &MapView<EguiBackend> {
        &self.view
    }
}

impl eframe::App for ProjectsMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.view.pump();

        let rimless = egui::Frame {
            fill: ctx.style().visuals.panel_fill,
            ..Default::default()
        };

        egui::CentralPanel::default()
            .frame(rimless)
            .show(ctx, |ui| {
                let (page, map) = self.view.parts_mut();

                if let Some(map) = map {
                    map.show(ui, &page.map);
                }

                loader(ui, &page.loader);
                legend(ui, &page.legend);
                search(ui, &page.search, &mut self.query);
            });
    }
}

fn loader_color(ui: &Ui, tone: LoaderTone) -> Color32 {
    match tone {
        LoaderTone::Normal => ui.visuals().text_color(),
        LoaderTone::Error => Color32::RED,
    }
}

fn loader(ui: &Ui, loader: &Loader) {
    if !loader.visible {
        return;
    }

    egui::Area::new(egui::Id::new("loader"))
        .anchor(Align2::CENTER_CENTER, [0., 0.])
        .show(ui.ctx(), |ui| {
            let color = loader_color(ui, loader.tone);
            ui.label(RichText::new(loader.text).heading().color(color));
        });
}

fn legend(ui: &Ui, legend: &Legend) {
    if !legend.region.is_visible() {
        return;
    }

    Window::new("Legend")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::LEFT_TOP, [10., 10.])
        .show(ui.ctx(), |ui| {
            if legend.titles.is_empty() {
                ui.weak("No categories yet.");
            }
            for title in &legend.titles {
                ui.label(title);
            }
        });
}

fn search(ui: &Ui, search: &Region, query: &mut String) {
    if !search.is_visible() {
        return;
    }

    Window::new("Search")
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(Align2::LEFT_BOTTOM, [10., -10.])
        .show(ui.ctx(), |ui| {
            let hint = search.attributes.aria_label.as_deref().unwrap_or_default();
            ui.add(egui::TextEdit::singleline(query).hint_text(hint));
        });
}
