//! Regions of the page surrounding the map, and the loading state driving their visibility.

use crate::widget::MapEvent;

pub const LOADING_TEXT: &str = "Loading map...";
pub const FAILED_TEXT: &str = "Failed to load map.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}

/// Accessibility attributes of a region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    /// `Some(0)` makes the region reachable with the keyboard.
    pub tabindex: Option<i32>,
    pub aria_label: Option<String>,
    pub role: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub id: &'static str,
    pub visibility: Visibility,
    pub attributes: Attributes,
}

impl Region {
    fn hidden(id: &'static str, role: Option<&'static str>, aria_label: Option<&str>) -> Self {
        Self {
            id,
            visibility: Visibility::Hidden,
            attributes: Attributes {
                tabindex: None,
                aria_label: aria_label.map(str::to_owned),
                role,
            },
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderTone {
    Normal,
    /// Drawn in red.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loader {
    pub visible: bool,
    pub text: &'static str,
    pub tone: LoaderTone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Legend {
    pub region: Region,

    /// Category titles, filled in by whoever owns the data.
    pub titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub loader: Loader,
    pub map: Region,
    pub legend: Legend,
    pub search: Region,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            loader: Loader {
                visible: true,
                text: LOADING_TEXT,
                tone: LoaderTone::Normal,
            },
            // Labelled once the map is mounted.
            map: Region::hidden("map", Some("application"), None),
            legend: Legend {
                region: Region::hidden("legend", Some("complementary"), Some("Map legend")),
                titles: Vec::new(),
            },
            search: Region::hidden("search", Some("search"), Some("Search projects")),
        }
    }
}

impl Page {
    /// Page as it looks before the map loads, with `titles` waiting in the legend.
    pub fn with_legend(titles: Vec<String>) -> Self {
        let mut page = Self::default();
        page.legend.titles = titles;
        page
    }

    pub fn show_ready(&mut self) {
        self.loader = Loader {
            visible: false,
            text: LOADING_TEXT,
            tone: LoaderTone::Normal,
        };
        self.map.visibility = Visibility::Visible;
        self.legend.region.visibility = Visibility::Visible;
        self.search.visibility = Visibility::Visible;
    }

    /// Regions are left as they are, only the loader changes.
    pub fn show_error(&mut self) {
        self.loader = Loader {
            visible: true,
            text: FAILED_TEXT,
            tone: LoaderTone::Error,
        };
    }

    pub fn apply(&mut self, state: LoadState) {
        match state {
            LoadState::Loading => {}
            LoadState::Ready => self.show_ready(),
            LoadState::Error => self.show_error(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    Error,
}

impl LoadState {
    /// State after `event`. A late `Load` still wins over a previous error, and GPU context
    /// events never change anything.
    pub fn on(self, event: &MapEvent) -> Self {
        match event {
            MapEvent::Load => Self::Ready,
            MapEvent::Error(_) => Self::Error,
            MapEvent::ContextLost | MapEvent::ContextRestored => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::MapError;

    fn error() -> MapEvent {
        MapEvent::Error(MapError::UnknownSource("osm".to_owned()))
    }

    #[test]
    fn page_starts_loading_with_everything_hidden() {
        let page = Page::default();

        assert!(page.loader.visible);
        assert_eq!(LOADING_TEXT, page.loader.text);
        assert_eq!(LoaderTone::Normal, page.loader.tone);
        assert!(!page.map.is_visible());
        assert!(!page.legend.region.is_visible());
        assert!(!page.search.is_visible());
        assert_eq!(Some("application"), page.map.attributes.role);
        assert_eq!(None, page.map.attributes.tabindex);
        assert_eq!(None, page.map.attributes.aria_label);
    }

    #[test]
    fn transitions() {
        use LoadState::*;

        assert_eq!(Ready, Loading.on(&MapEvent::Load));
        assert_eq!(Ready, Ready.on(&MapEvent::Load));
        assert_eq!(Ready, Error.on(&MapEvent::Load));

        assert_eq!(Error, Loading.on(&error()));
        assert_eq!(Error, Ready.on(&error()));
        assert_eq!(Error, Error.on(&error()));

        for state in [Loading, Ready, Error] {
            assert_eq!(state, state.on(&MapEvent::ContextLost));
            assert_eq!(state, state.on(&MapEvent::ContextRestored));
        }
    }

    #[test]
    fn ready_reveals_the_regions() {
        let mut page = Page::default();
        page.apply(LoadState::Ready);

        assert!(!page.loader.visible);
        assert!(page.map.is_visible());
        assert!(page.legend.region.is_visible());
        assert!(page.search.is_visible());
    }

    #[test]
    fn error_shows_the_loader_in_red() {
        let mut page = Page::default();
        page.show_ready();
        page.apply(LoadState::Error);

        assert!(page.loader.visible);
        assert_eq!(FAILED_TEXT, page.loader.text);
        assert_eq!(LoaderTone::Error, page.loader.tone);
    }

    #[test]
    fn ready_after_error_clears_the_failure() {
        let mut page = Page::default();
        page.apply(LoadState::Error);
        page.apply(LoadState::Ready);

        assert!(!page.loader.visible);
        assert_eq!(LOADING_TEXT, page.loader.text);
        assert_eq!(LoaderTone::Normal, page.loader.tone);
    }

    #[test]
    fn legend_titles_wait_hidden() {
        let page = Page::with_legend(vec!["Gardens".to_owned()]);

        assert_eq!(vec!["Gardens".to_owned()], page.legend.titles);
        assert!(!page.legend.region.is_visible());
        assert_eq!(Page::default().loader, page.loader);
    }
}
