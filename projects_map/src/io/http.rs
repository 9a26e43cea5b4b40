use std::path::PathBuf;

pub use reqwest::header::HeaderValue;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};

/// HTTP settings shared by every tile layer of the map.
#[derive(Clone)]
pub struct HttpOptions {
    /// Directory of the on-disk tile cache. `None` disables it.
    ///
    /// The cache honors `Expires` and `Cache-Control`, which the OpenStreetMap tile policy
    /// asks for. <https://operations.osmfoundation.org/policies/tiles/>
    /// Browsers keep their own cache, so the path is not used on wasm.
    pub cache: Option<PathBuf>,

    /// Sent with every tile request on native targets. Left `None` on wasm, where the browser
    /// sends its own.
    pub user_agent: Option<HeaderValue>,

    /// Each layer downloads at most this many tiles at once.
    pub max_parallel_downloads: MaxParallelDownloads,
}

impl Default for HttpOptions {
    fn default() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let user_agent = Some(HeaderValue::from_static(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION"),
        )));

        #[cfg(target_arch = "wasm32")]
        let user_agent = None;

        Self {
            cache: None,
            user_agent,
            max_parallel_downloads: MaxParallelDownloads::default(),
        }
    }
}

/// Limit of concurrent tile downloads of a single layer. Zero is treated as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxParallelDownloads(pub usize);

impl Default for MaxParallelDownloads {
    /// Six, as many as browsers open per host.
    fn default() -> Self {
        Self(6)
    }
}

impl MaxParallelDownloads {
    pub fn get(self) -> usize {
        self.0.max(1)
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn http_client(http_options: &HttpOptions) -> ClientWithMiddleware {
    use http_cache_reqwest::{CACacheManager, Cache, CacheMode, HttpCache, HttpCacheOptions};

    let builder = ClientBuilder::new(reqwest::Client::new());
    match &http_options.cache {
        Some(path) => {
            log::debug!("Caching tiles in {}.", path.display());
            builder
                .with(Cache(HttpCache {
                    mode: CacheMode::Default,
                    manager: CACacheManager::new(path.clone(), false),
                    options: HttpCacheOptions::default(),
                }))
                .build()
        }
        None => builder.build(),
    }
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn http_client(_http_options: &HttpOptions) -> ClientWithMiddleware {
    ClientBuilder::new(reqwest::Client::new()).build()
}
