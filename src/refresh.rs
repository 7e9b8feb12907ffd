//! Single-flight coordination for access-token refresh.
//!
//! DESIGN
//! ======
//! One refresh call may be outstanding per client. The first caller to find
//! the gate open takes a `RefreshLease` and performs the network call; every
//! caller arriving while the lease is held subscribes and is woken with the
//! lease's outcome. Subscribers fire in subscription order.
//!
//! The check-and-set on the in-flight flag happens under a plain mutex that
//! is never held across an `.await`, so it stays atomic on a multi-threaded
//! runtime. A lease dropped without `finish` (its future was cancelled)
//! releases the gate with a failure so subscribers never hang.

use std::sync::Mutex;

use tokio::sync::oneshot;

/// New access token, or a description of why none was obtained.
pub type RefreshOutcome = Result<String, String>;

type Subscriber = Box<dyn FnOnce(RefreshOutcome) + Send>;

const CANCELLED: &str = "token refresh was cancelled";

#[derive(Default)]
pub struct RefreshGate {
    state: Mutex<GateState>,
}

#[derive(Default)]
struct GateState {
    refreshing: bool,
    subscribers: Vec<Subscriber>,
}

/// Result of [`RefreshGate::join`].
pub enum Ticket<'a> {
    /// Caller must perform the refresh and `finish` the lease.
    Lead(RefreshLease<'a>),
    /// A refresh is already running; await its outcome.
    Wait(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Take the lease if no refresh is running. Never waits.
    #[must_use]
    pub fn try_lead(&self) -> Option<RefreshLease<'_>> {
        let mut state = self.lock();
        if state.refreshing {
            return None;
        }
        state.refreshing = true;
        Some(RefreshLease { gate: self, finished: false })
    }

    /// Take the lease, or subscribe to the refresh already running.
    #[must_use]
    pub fn join(&self) -> Ticket<'_> {
        let (tx, rx) = oneshot::channel();
        match self.lead_or_subscribe(move |outcome| {
            let _ = tx.send(outcome);
        }) {
            Some(lease) => Ticket::Lead(lease),
            None => Ticket::Wait(rx),
        }
    }

    /// Queue `callback` behind the running refresh, or take the lease when
    /// none is running. `callback` is dropped unused in the second case.
    pub(crate) fn lead_or_subscribe<F>(&self, callback: F) -> Option<RefreshLease<'_>>
    where
        F: FnOnce(RefreshOutcome) + Send + 'static,
    {
        let mut state = self.lock();
        if state.refreshing {
            state.subscribers.push(Box::new(callback));
            return None;
        }
        state.refreshing = true;
        Some(RefreshLease { gate: self, finished: false })
    }

    fn release(&self, outcome: &RefreshOutcome) {
        let subscribers = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.subscribers)
        };
        if !subscribers.is_empty() {
            tracing::debug!(count = subscribers.len(), ok = outcome.is_ok(), "draining refresh subscribers");
        }
        for subscriber in subscribers {
            subscriber(outcome.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Exclusive right to perform the current refresh.
pub struct RefreshLease<'a> {
    gate: &'a RefreshGate,
    finished: bool,
}

impl RefreshLease<'_> {
    /// Clear the in-flight flag and wake every subscriber with `outcome`.
    pub fn finish(mut self, outcome: RefreshOutcome) {
        self.finished = true;
        self.gate.release(&outcome);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("refresh lease dropped before completion");
            self.gate.release(&Err(CANCELLED.to_owned()));
        }
    }
}

/// Await the outcome of a refresh this caller subscribed to.
pub(crate) async fn wait_for(rx: oneshot::Receiver<RefreshOutcome>) -> RefreshOutcome {
    rx.await.unwrap_or_else(|_| Err(CANCELLED.to_owned()))
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
