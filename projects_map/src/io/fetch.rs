//! Asynchronous fetching loop.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::{
    SinkExt as _, StreamExt as _,
    channel::mpsc::{Receiver, Sender},
    future::{Either, select, select_all},
};
use image::RgbaImage;
use reqwest::header::USER_AGENT;
use reqwest_middleware::ClientWithMiddleware;

use crate::{
    TileId,
    io::{HeaderValue, HttpOptions, Repaint, http::http_client, tiles_io::Stats},
    sources::TileSource,
};

/// Decoded tile, ready to be turned into a texture.
pub type TileImage = Arc<RgbaImage>;

/// Why a single tile could not be loaded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("could not decode the image: {0}")]
    Decode(String),
}

/// Result of loading a single tile, sent from the IO side back to its layer.
#[derive(Debug)]
pub struct TileOutcome {
    pub tile_id: TileId,
    pub result: Result<TileImage, TileError>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("Tile request channel from the main thread was broken.")]
    RequestChannelBroken,

    #[error("Outcome channel to the main thread was closed.")]
    OutcomeChannelClosed,

    #[error("Outcome channel to the main thread was full.")]
    OutcomeChannelFull,

    #[error("Poison error.")]
    Poisoned,
}

impl From<futures::channel::mpsc::SendError> for Error {
    fn from(error: futures::channel::mpsc::SendError) -> Self {
        if error.is_disconnected() {
            Error::OutcomeChannelClosed
        } else {
            Error::OutcomeChannelFull
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::Poisoned
    }
}

pub trait Fetch {
    type Error: std::error::Error + Sync + Send;

    #[cfg(target_arch = "wasm32")]
    fn fetch(&self, tile_id: TileId) -> impl Future<Output = Result<Bytes, Self::Error>>;

    #[cfg(not(target_arch = "wasm32"))]
    fn fetch(&self, tile_id: TileId) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;

    fn max_concurrency(&self) -> usize;
}

#[derive(Debug, thiserror::Error)]
pub enum HttpFetchError {
    #[error(transparent)]
    Middleware(#[from] reqwest_middleware::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Fetches tiles of a [`TileSource`] over HTTP.
pub struct HttpFetch<S> {
    source: S,
    client: ClientWithMiddleware,
    user_agent: Option<HeaderValue>,
    max_parallel_downloads: usize,
}

impl<S: TileSource> HttpFetch<S> {
    pub fn new(source: S, http_options: &HttpOptions) -> Self {
        Self {
            source,
            client: http_client(http_options),
            user_agent: http_options.user_agent.clone(),
            max_parallel_downloads: http_options.max_parallel_downloads.get(),
        }
    }
}

impl<S: TileSource + Send + Sync> Fetch for HttpFetch<S> {
    type Error = HttpFetchError;

    async fn fetch(&self, tile_id: TileId) -> Result<Bytes, Self::Error> {
        let url = self.source.tile_url(tile_id);
        log::trace!("Fetching {url}.");

        let mut request = self.client.get(&url);
        if let Some(user_agent) = &self.user_agent {
            request = request.header(USER_AGENT, user_agent.clone());
        }

        let response = request.send().await?;
        log::trace!("Got {} for {url}.", response.status());
        Ok(response.error_for_status()?.bytes().await?)
    }

    fn max_concurrency(&self) -> usize {
        self.max_parallel_downloads
    }
}

fn decode(bytes: &[u8]) -> Result<TileImage, TileError> {
    let image = image::load_from_memory(bytes).map_err(|e| TileError::Decode(e.to_string()))?;
    Ok(Arc::new(image.to_rgba8()))
}

async fn fetch_and_decode(fetch: &impl Fetch, tile_id: TileId) -> TileOutcome {
    let result = match fetch.fetch(tile_id).await {
        Ok(bytes) => decode(&bytes),
        Err(error) => Err(TileError::Fetch(error.to_string())),
    };
    TileOutcome { tile_id, result }
}

async fn fetch_complete(
    outcome_tx: &mut Sender<TileOutcome>,
    repaint: &impl Repaint,
    outcome: TileOutcome,
) -> Result<(), Error> {
    if let Err(error) = &outcome.result {
        log::debug!("Tile {:?} failed: {error}.", outcome.tile_id);
    }
    outcome_tx.send(outcome).await?;
    repaint.request_repaint();
    Ok(())
}

async fn fetch_continuously_impl(
    fetch: impl Fetch,
    stats: Arc<Mutex<Stats>>,
    mut request_rx: Receiver<TileId>,
    mut outcome_tx: Sender<TileOutcome>,
    repaint: impl Repaint,
) -> Result<(), Error> {
    let mut outstanding = Vec::new();

    loop {
        if outstanding.is_empty() {
            // Only new downloads might be requested.
            let tile_id = request_rx.next().await.ok_or(Error::RequestChannelBroken)?;
            outstanding.push(Box::pin(fetch_and_decode(&fetch, tile_id)));
        } else if outstanding.len() < fetch.max_concurrency() {
            // New downloads might be requested or ongoing downloads might be completed.
            match select(request_rx.next(), select_all(outstanding.drain(..))).await {
                Either::Left((request, remaining)) => {
                    let tile_id = request.ok_or(Error::RequestChannelBroken)?;
                    outstanding = remaining.into_inner();
                    outstanding.push(Box::pin(fetch_and_decode(&fetch, tile_id)));
                }
                Either::Right(((outcome, _, remaining), _)) => {
                    fetch_complete(&mut outcome_tx, &repaint, outcome).await?;
                    outstanding = remaining;
                }
            }
        } else {
            // Only ongoing downloads might be completed.
            let (outcome, _, remaining) = select_all(outstanding.drain(..)).await;
            fetch_complete(&mut outcome_tx, &repaint, outcome).await?;
            outstanding = remaining;
        }

        stats.lock()?.in_progress = outstanding.len();
    }
}

/// Continuously fetch tiles requested via request channel, until either side of the channels
/// goes away.
pub(crate) async fn fetch_continuously(
    fetch: impl Fetch,
    stats: Arc<Mutex<Stats>>,
    request_rx: Receiver<TileId>,
    outcome_tx: Sender<TileOutcome>,
    repaint: impl Repaint,
) {
    match fetch_continuously_impl(fetch, stats, request_rx, outcome_tx, repaint).await {
        Ok(()) | Err(Error::OutcomeChannelClosed) | Err(Error::RequestChannelBroken) => {
            log::debug!("Tile fetch loop finished.");
        }
        Err(error) => {
            log::error!("Tile fetch loop failed: {error}.");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::channel::mpsc::channel;
    use std::io::Cursor;

    /// Encodes a single color tile as PNG.
    pub(crate) fn png_tile() -> Bytes {
        let image = RgbaImage::from_pixel(4, 4, image::Rgba([200, 100, 50, 255]));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        Bytes::from(bytes.into_inner())
    }

    #[derive(Debug, thiserror::Error)]
    #[error("tile server said no")]
    pub(crate) struct Refused;

    /// Serves a PNG for every tile except the ones with `x == refused_x`.
    pub(crate) struct FakeFetch {
        pub refused_x: u32,
        pub payload: Bytes,
    }

    impl Fetch for FakeFetch {
        type Error = Refused;

        async fn fetch(&self, tile_id: TileId) -> Result<Bytes, Self::Error> {
            if tile_id.x == self.refused_x {
                Err(Refused)
            } else {
                Ok(self.payload.clone())
            }
        }

        fn max_concurrency(&self) -> usize {
            2
        }
    }

    async fn run(fetch: FakeFetch, requests: &[TileId]) -> Vec<TileOutcome> {
        let (mut request_tx, request_rx) = channel(8);
        let (outcome_tx, mut outcome_rx) = channel(8);
        let stats = Arc::new(Mutex::new(Stats::default()));

        let task = tokio::spawn(fetch_continuously(fetch, stats, request_rx, outcome_tx, ()));

        for tile_id in requests {
            request_tx.send(*tile_id).await.unwrap();
        }

        let mut outcomes = Vec::new();
        while outcomes.len() < requests.len() {
            outcomes.push(outcome_rx.next().await.unwrap());
        }

        // Loop finishes once nobody asks for more tiles.
        drop(request_tx);
        task.await.unwrap();
        outcomes
    }

    #[tokio::test]
    async fn tiles_are_fetched_and_decoded() {
        let _ = env_logger::try_init();

        let tile_id = TileId { x: 1, y: 2, zoom: 3 };
        let fetch = FakeFetch {
            refused_x: 99,
            payload: png_tile(),
        };

        let outcomes = run(fetch, &[tile_id]).await;

        assert_eq!(tile_id, outcomes[0].tile_id);
        let image = outcomes[0].result.as_ref().unwrap();
        assert_eq!((4, 4), image.dimensions());
    }

    #[tokio::test]
    async fn failures_are_reported_next_to_successes() {
        let _ = env_logger::try_init();

        let refused = TileId { x: 7, y: 0, zoom: 3 };
        let fine = TileId { x: 1, y: 0, zoom: 3 };
        let fetch = FakeFetch {
            refused_x: 7,
            payload: png_tile(),
        };

        let outcomes = run(fetch, &[refused, fine]).await;

        let outcome_of = |tile_id| {
            outcomes
                .iter()
                .find(|outcome| outcome.tile_id == tile_id)
                .unwrap()
        };
        assert_eq!(
            Err(TileError::Fetch("tile server said no".to_owned())),
            outcome_of(refused).result.clone().map(|_| ())
        );
        assert!(outcome_of(fine).result.is_ok());
    }

    #[tokio::test]
    async fn garbage_is_a_decode_error() {
        let _ = env_logger::try_init();

        let fetch = FakeFetch {
            refused_x: 99,
            payload: Bytes::from_static(b"definitely not an image"),
        };

        let outcomes = run(fetch, &[TileId { x: 0, y: 0, zoom: 0 }]).await;

        assert!(matches!(outcomes[0].result, Err(TileError::Decode(_))));
    }

    #[tokio::test]
    async fn loop_ends_quietly_when_nobody_listens() {
        let _ = env_logger::try_init();

        let (mut request_tx, request_rx) = channel(8);
        let (outcome_tx, outcome_rx) = channel(8);
        let stats = Arc::new(Mutex::new(Stats::default()));
        let fetch = FakeFetch {
            refused_x: 99,
            payload: png_tile(),
        };

        // Layer is gone before the tile arrives.
        drop(outcome_rx);
        let task = tokio::spawn(fetch_continuously(fetch, stats, request_rx, outcome_tx, ()));
        request_tx.send(TileId { x: 0, y: 0, zoom: 0 }).await.unwrap();

        task.await.unwrap();
    }
}
