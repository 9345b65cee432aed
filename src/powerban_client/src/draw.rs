use crate::backend::Backend;
use crate::config::ClientConf;
use crate::types::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const DRAWING_NOW: &str = "Drawing now!";

pub trait Clock {
    fn now(&self) -> Timestamp;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as Timestamp)
            .unwrap_or_default()
    }
}

/// Result of one countdown step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Not counting down; nothing to do.
    Idle,
    Remaining(Countdown),
    /// The boundary has passed and a new one must be fetched.
    Expired,
}

/// Mirrors the backend's draw schedule and keeps a countdown to the next draw.
///
/// The countdown starts in `Syncing` and then cycles
/// `CountingDown -> Drawing -> CountingDown`, staying in `Drawing` until a
/// future boundary has been fetched.
/// Remaining time is always derived from the clock, never decremented, so
/// missed ticks do not make it drift.
pub struct DrawSynchronizer<B, C = SystemClock> {
    backend: Rc<B>,
    clock: C,
    tick_interval: Duration,
    resync_delay: Duration,
    phase: Cell<DrawPhase>,
    time_left: RefCell<String>,
    current: RefCell<Option<CurrentDraw>>,
    previous: RefCell<Option<PreviousDraw>>,
}

impl<B: Backend, C: Clock> DrawSynchronizer<B, C> {
    pub fn new(conf: &ClientConf, backend: Rc<B>, clock: C) -> Self {
        DrawSynchronizer {
            backend,
            clock,
            tick_interval: conf.tick_interval(),
            resync_delay: conf.resync_delay(),
            phase: Cell::new(DrawPhase::Syncing),
            time_left: RefCell::new(String::new()),
            current: RefCell::new(None),
            previous: RefCell::new(None),
        }
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase.get()
    }

    /// Text for the "next draw in" line.
    pub fn time_left(&self) -> String {
        self.time_left.borrow().clone()
    }

    pub fn current_draw(&self) -> Option<CurrentDraw> {
        self.current.borrow().clone()
    }

    pub fn previous_draw(&self) -> Option<PreviousDraw> {
        self.previous.borrow().clone()
    }

    /// Fetches the next draw boundary. Returns false when the fetch fails or
    /// the backend still reports a past boundary; the phase is then left as
    /// it was (`Syncing` before the first boundary, `Drawing` after expiry).
    pub async fn sync_boundary(&self) -> bool {
        match self.backend.next_draw().await {
            Ok(boundary) if boundary > self.clock.now() => {
                debug!(boundary, "counting down to next draw");
                self.phase.set(DrawPhase::CountingDown { boundary });
                true
            }
            Ok(boundary) => {
                info!(boundary, "next draw not scheduled yet");
                false
            }
            Err(e) => {
                warn!(error = %e, "could not fetch next draw");
                false
            }
        }
    }

    /// Recomputes the remaining time. Crossing the boundary moves to `Drawing`.
    pub fn tick(&self) -> Tick {
        let DrawPhase::CountingDown { boundary } = self.phase.get() else {
            return Tick::Idle;
        };

        let remaining = boundary - self.clock.now();
        if remaining <= 0 {
            info!(boundary, "draw boundary reached");
            self.phase.set(DrawPhase::Drawing);
            *self.time_left.borrow_mut() = DRAWING_NOW.to_string();
            return Tick::Expired;
        }

        let countdown = Countdown::from_millis(remaining);
        *self.time_left.borrow_mut() = countdown.to_string();
        Tick::Remaining(countdown)
    }

    /// Drives the countdown forever: sync, tick until expiry, resync.
    pub async fn run(&self) {
        loop {
            while !self.sync_boundary().await {
                tokio::time::sleep(self.resync_delay).await;
            }

            let mut ticker = tokio::time::interval(self.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if self.tick() == Tick::Expired {
                    break;
                }
            }
            // ticker is dropped here, before the next sync starts another one
        }
    }

    /// Refreshes both snapshots. Each one is replaced only by a successful,
    /// available response; anything else keeps the last good copy.
    pub async fn refresh_snapshots(&self) {
        let (current, previous) =
            tokio::join!(self.backend.current_draw(), self.backend.previous_draw());

        match current {
            Ok(Some(draw)) => *self.current.borrow_mut() = Some(draw),
            Ok(None) => debug!("current draw not available"),
            Err(e) => warn!(error = %e, "current draw refresh failed"),
        }
        match previous {
            Ok(Some(draw)) => *self.previous.borrow_mut() = Some(draw),
            Ok(None) => debug!("no completed draw yet"),
            Err(e) => warn!(error = %e, "previous draw refresh failed"),
        }
    }
}

/// A running countdown loop. Dropping or cancelling it stops the loop.
///
/// Must be spawned from within a `tokio::task::LocalSet`.
pub struct CountdownTask {
    handle: JoinHandle<()>,
}

impl CountdownTask {
    pub fn spawn<B, C>(sync: Rc<DrawSynchronizer<B, C>>) -> Self
    where
        B: Backend + 'static,
        C: Clock + 'static,
    {
        CountdownTask {
            handle: tokio::task::spawn_local(async move { sync.run().await }),
        }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CountdownTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
