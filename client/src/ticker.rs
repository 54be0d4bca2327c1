//! Scheduling abstraction for timer-driven sync.
//!
//! The orchestrator's run loop only knows [`Ticker`]. Production code uses
//! [`IntervalTicker`]; tests and hosts with their own schedulers drive a
//! [`ChannelTicker`] by hand.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Source of periodic sync triggers.
pub trait Ticker: Send + 'static {
    /// Resolve at the next tick.
    fn tick(&mut self) -> impl Future<Output = ()> + Send;

    /// Change the period. Called when the config is replaced.
    fn reset(&mut self, _period: Duration) {}
}

/// Ticks every `period`, starting one period from now.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }

    fn reset(&mut self, period: Duration) {
        *self = Self::new(period);
    }
}

/// Ticker driven by an explicit [`TickHandle`].
///
/// Once every handle is dropped the ticker never fires again.
#[derive(Debug)]
pub struct ChannelTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Fires ticks on a [`ChannelTicker`].
#[derive(Debug, Clone)]
pub struct TickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ChannelTicker {
    pub fn new() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, TickHandle { tx })
    }
}

impl TickHandle {
    /// Deliver one tick. Returns false if the ticker is gone.
    pub fn tick(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

impl Ticker for ChannelTicker {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}
