use std::collections::{HashMap, VecDeque};
use std::thread::JoinHandle;

use crossbeam::channel::{Receiver, Sender, bounded};

use crate::data::Bar;
use crate::error::EngineResult;

use super::DataFeed;

/// Pluggable producer for the live feed's background thread (e.g. REST
/// polling of a broker's quote endpoint). Runs on its own thread; the
/// scheduler thread is the sole consumer of the bars it emits (spec.md §5:
/// "Optional background thread only for the data feed's producer side...
/// producer hands bars to the loop via a bounded queue; the loop is the
/// sole consumer").
pub trait LivePoller: Send + 'static {
    /// Blocks until the next bar is ready, or returns `None` when the
    /// source is exhausted / disconnected.
    fn poll_next(&mut self) -> Option<Bar>;
}

/// Live bar feed backed by a bounded channel fed by a background producer
/// thread. Backpressure is explicit: a full queue blocks the producer
/// (`send`, not `try_send`) rather than silently dropping the oldest bar,
/// per spec.md §9 ("drop-oldest is forbidden; block or surface error").
pub struct LiveFeed {
    receiver: Receiver<Bar>,
    _producer_sender: Sender<Bar>,
    handle: Option<JoinHandle<()>>,
    buffers: HashMap<String, VecDeque<Bar>>,
    history: HashMap<String, Vec<Bar>>,
}

impl LiveFeed {
    /// Spawns the producer on a background thread with a bounded queue of
    /// `capacity` bars.
    pub fn spawn(mut poller: impl LivePoller, capacity: usize) -> Self {
        let (tx, rx) = bounded::<Bar>(capacity);
        let producer_tx = tx.clone();
        let handle = std::thread::spawn(move || {
            while let Some(bar) = poller.poll_next() {
                if tx.send(bar).is_err() {
                    break; // consumer dropped; stop producing
                }
            }
        });
        Self {
            receiver: rx,
            _producer_sender: producer_tx,
            handle: Some(handle),
            buffers: HashMap::new(),
            history: HashMap::new(),
        }
    }

    /// Drains everything currently queued on the channel into per-symbol
    /// buffers without blocking.
    fn drain_available(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(bar) => {
                    self.history
                        .entry(bar.symbol.clone())
                        .or_default()
                        .push(bar.clone());
                    self.buffers.entry(bar.symbol.clone()).or_default().push_back(bar);
                }
                Err(_) => break,
            }
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl DataFeed for LiveFeed {
    fn connect(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn subscribe(&mut self, symbols: &[String], _preload_bars: usize) -> EngineResult<()> {
        for symbol in symbols {
            self.buffers.entry(symbol.clone()).or_default();
        }
        Ok(())
    }

    fn get_next_bar(&mut self, symbol: &str) -> EngineResult<Option<Bar>> {
        self.drain_available();
        Ok(self.buffers.get_mut(symbol).and_then(|q| q.pop_front()))
    }

    fn get_latest_bars(&self, symbol: &str, _timeframe: &str, n: usize) -> Vec<Bar> {
        let bars = self.history.get(symbol).cloned().unwrap_or_default();
        let len = bars.len();
        if len > n {
            bars[len - n..].to_vec()
        } else {
            bars
        }
    }
}
