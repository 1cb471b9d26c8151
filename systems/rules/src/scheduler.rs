//! Background worker feeding snapshots through a [`RuleEngine`].

use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

use bomberland_core::{Snapshot, UnitAction};
use tracing::{debug, warn};

use crate::{
    cancel::LiveTick,
    engine::{RuleEngine, TickError},
    state::TickPhase,
};

/// Actions computed for one tick, ready for the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct TickDispatch {
    /// Tick the actions answer.
    pub tick: u32,
    /// Ordered actions; empty when the snapshot was malformed.
    pub actions: Vec<UnitAction>,
}

/// Runs the engine on its own thread, always working on the newest snapshot.
///
/// [`TickScheduler::submit`] publishes the snapshot's tick as live before
/// queueing it, so an in-flight computation for an older tick notices at its
/// next checkpoint and gives up. Results for superseded ticks are never sent.
#[derive(Debug)]
pub struct TickScheduler {
    live: LiveTick,
    snapshots: Option<Sender<Snapshot>>,
    dispatches: Receiver<TickDispatch>,
    worker: Option<JoinHandle<RuleEngine>>,
}

impl TickScheduler {
    /// Moves `engine` onto a worker thread.
    #[must_use]
    pub fn spawn(engine: RuleEngine) -> Self {
        let live = LiveTick::new();
        let (snapshot_tx, snapshot_rx) = mpsc::channel();
        let (dispatch_tx, dispatch_rx) = mpsc::channel();
        let worker_live = live.clone();
        let worker = thread::spawn(move || run_worker(engine, snapshot_rx, worker_live, dispatch_tx));
        Self {
            live,
            snapshots: Some(snapshot_tx),
            dispatches: dispatch_rx,
            worker: Some(worker),
        }
    }

    /// Counter the worker checks its computations against.
    #[must_use]
    pub fn live(&self) -> &LiveTick {
        &self.live
    }

    /// Makes `snapshot` the live tick and queues it. Returns `false` once the
    /// worker has stopped.
    pub fn submit(&self, snapshot: Snapshot) -> bool {
        self.live.advance(snapshot.tick);
        self.snapshots
            .as_ref()
            .is_some_and(|sender| sender.send(snapshot).is_ok())
    }

    /// Channel the worker sends finished ticks on.
    #[must_use]
    pub fn dispatches(&self) -> &Receiver<TickDispatch> {
        &self.dispatches
    }

    /// Stops accepting snapshots, waits for the worker and hands back its
    /// engine together with any dispatches not yet received.
    pub fn shutdown(mut self) -> (Option<RuleEngine>, Vec<TickDispatch>) {
        drop(self.snapshots.take());
        let engine = self.worker.take().and_then(|worker| worker.join().ok());
        let remaining = self.dispatches.try_iter().collect();
        (engine, remaining)
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        drop(self.snapshots.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(
    mut engine: RuleEngine,
    snapshots: Receiver<Snapshot>,
    live: LiveTick,
    dispatches: Sender<TickDispatch>,
) -> RuleEngine {
    while let Ok(snapshot) = snapshots.recv() {
        let snapshot = newest(snapshot, &snapshots);
        let guard = live.guard(snapshot.tick);
        let actions = match engine.tick(&snapshot, &guard) {
            Ok(outcome) => outcome.actions,
            Err(TickError::Cancelled(_)) => continue,
            Err(TickError::Snapshot(error)) => {
                warn!(tick = snapshot.tick, %error, "ignoring malformed snapshot");
                Vec::new()
            }
        };
        if let Err(cancelled) = guard.checkpoint(TickPhase::Dispatched) {
            debug!(%cancelled, "result arrived after a newer tick");
            continue;
        }
        let dispatch = TickDispatch {
            tick: snapshot.tick,
            actions,
        };
        if dispatches.send(dispatch).is_err() {
            break;
        }
    }
    engine
}

/// Drops every queued snapshot older than the last one.
fn newest(mut snapshot: Snapshot, queued: &Receiver<Snapshot>) -> Snapshot {
    while let Ok(newer) = queued.try_recv() {
        debug!(skipped = snapshot.tick, newer = newer.tick, "skipping stale snapshot");
        snapshot = newer;
    }
    snapshot
}
