//! Navigation seam for the forced login redirect.
//!
//! SYSTEM CONTEXT
//! ==============
//! Session teardown sends the user to the login route. The client never
//! touches a browser location directly; the host supplies a `Navigator`.

use std::sync::Mutex;

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

pub trait Navigator: Send + Sync {
    /// Route the user is currently on.
    fn current_route(&self) -> String;

    /// Replace the current route.
    fn navigate(&self, route: &str);
}

/// Navigator that only remembers where it was sent.
///
/// Hosts without a real router (CLIs, tests) use this and inspect
/// [`RouteTracker::history`] afterwards.
#[derive(Debug)]
pub struct RouteTracker {
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl RouteTracker {
    #[must_use]
    pub fn new(initial: &str) -> Self {
        Self { current: Mutex::new(initial.to_owned()), history: Mutex::new(Vec::new()) }
    }

    /// Every route passed to [`Navigator::navigate`], oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Default for RouteTracker {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for RouteTracker {
    fn current_route(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, route: &str) {
        tracing::info!(%route, "navigating");
        *self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = route.to_owned();
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(route.to_owned());
    }
}
