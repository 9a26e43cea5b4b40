use std::sync::{Arc, Mutex};

use futures::channel::mpsc::{Receiver, Sender, channel};

use crate::{
    TileId,
    io::{Fetch, Repaint, TileOutcome, fetch::fetch_continuously, runtime::Runtime},
};

/// Channels to the IO runtime of a single layer. Dropping it stops the runtime, and outcomes of
/// downloads still in flight are discarded.
pub struct TilesIo {
    /// Tiles to be fetched by the IO thread.
    request_tx: Sender<TileId>,

    /// Tiles that were fetched (or failed to) and should be put in the cache.
    outcome_rx: Receiver<TileOutcome>,

    stats: Arc<Mutex<Stats>>,

    #[allow(dead_code)] // Significant Drop
    runtime: Option<Runtime>,
}

/// What happened to a tile request.
#[derive(Debug, PartialEq, Eq)]
pub enum Requested {
    Queued,
    /// Trying to download too many tiles at once, try again next frame.
    QueueFull,
    /// IO runtime is gone.
    Disconnected,
}

impl TilesIo {
    pub fn spawn(
        name: &str,
        fetch: impl Fetch + Send + Sync + 'static,
        repaint: impl Repaint,
    ) -> std::io::Result<Self> {
        let stats = Arc::new(Mutex::new(Stats::default()));

        // This ensures that newer requests are prioritized.
        let channel_size = fetch.max_concurrency();

        let (request_tx, request_rx) = channel(channel_size);
        let (outcome_tx, outcome_rx) = channel(channel_size);

        let runtime = Runtime::spawn(
            name,
            fetch_continuously(fetch, stats.clone(), request_rx, outcome_tx, repaint),
        )?;

        Ok(Self {
            request_tx,
            outcome_rx,
            stats,
            runtime: Some(runtime),
        })
    }

    /// IO driven by hand, for tests.
    #[cfg(test)]
    pub(crate) fn manual(channel_size: usize) -> (Self, ManualIo) {
        let (request_tx, request_rx) = channel(channel_size);
        let (outcome_tx, outcome_rx) = channel(channel_size);
        let io = Self {
            request_tx,
            outcome_rx,
            stats: Arc::default(),
            runtime: None,
        };
        (
            io,
            ManualIo {
                requests: request_rx,
                outcomes: outcome_tx,
            },
        )
    }

    pub fn request(&mut self, tile_id: TileId) -> Requested {
        match self.request_tx.try_send(tile_id) {
            Ok(()) => {
                log::trace!("Requested tile: {tile_id:?}");
                Requested::Queued
            }
            Err(err) if err.is_full() => Requested::QueueFull,
            Err(err) => {
                log::warn!("Failed to request {tile_id:?}: {err}");
                Requested::Disconnected
            }
        }
    }

    /// Everything that arrived since the last call, never blocks.
    pub fn drain(&mut self) -> Vec<TileOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match self.outcome_rx.try_next() {
                Ok(Some(outcome)) => outcomes.push(outcome),
                // Nothing new arrived.
                Err(_) => break,
                Ok(None) => {
                    log::error!("IO thread is dead");
                    break;
                }
            }
        }
        outcomes
    }

    pub fn stats(&self) -> Stats {
        if let Ok(stats) = self.stats.lock() {
            stats.clone()
        } else {
            Stats::default()
        }
    }
}

/// Other end of [`TilesIo::manual`].
#[cfg(test)]
pub(crate) struct ManualIo {
    pub requests: Receiver<TileId>,
    pub outcomes: Sender<TileOutcome>,
}

#[cfg(test)]
impl ManualIo {
    pub fn requested(&mut self) -> Vec<TileId> {
        let mut requested = Vec::new();
        while let Ok(Some(tile_id)) = self.requests.try_next() {
            requested.push(tile_id);
        }
        requested
    }

    pub fn complete(&mut self, outcome: TileOutcome) {
        self.outcomes.try_send(outcome).unwrap();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of tiles that are currently being downloaded.
    pub in_progress: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fetch::tests::{FakeFetch, png_tile};
    use std::time::Duration;

    #[test]
    fn requests_beyond_channel_capacity_are_refused() {
        let (mut io, mut manual) = TilesIo::manual(1);

        // Bounded channel holds its buffer plus one slot per sender.
        assert_eq!(Requested::Queued, io.request(TileId { x: 0, y: 0, zoom: 1 }));
        assert_eq!(Requested::Queued, io.request(TileId { x: 1, y: 0, zoom: 1 }));
        assert_eq!(Requested::QueueFull, io.request(TileId { x: 0, y: 1, zoom: 1 }));

        assert_eq!(2, manual.requested().len());
    }

    #[test]
    fn requests_fail_once_io_is_gone() {
        let (mut io, manual) = TilesIo::manual(4);
        drop(manual);

        assert_eq!(Requested::Disconnected, io.request(TileId { x: 0, y: 0, zoom: 0 }));
    }

    #[test]
    fn spawned_runtime_delivers_outcomes() {
        let _ = env_logger::try_init();

        let fetch = FakeFetch {
            refused_x: 99,
            payload: png_tile(),
        };
        let mut io = TilesIo::spawn("test", fetch, ()).unwrap();
        let tile_id = TileId { x: 0, y: 0, zoom: 0 };
        assert_eq!(Requested::Queued, io.request(tile_id));

        let outcome = loop {
            if let Some(outcome) = io.drain().pop() {
                break outcome;
            }
            std::thread::sleep(Duration::from_millis(10));
        };

        assert_eq!(tile_id, outcome.tile_id);
        assert!(outcome.result.is_ok());
    }
}
