use std::sync::{PoisonError, RwLock};

use super::route_key;

/// Port over the location fragment. Lets the guard and the gateway redirect
/// without a real browser location.
pub trait NavigationPort: Send + Sync {
    fn current_route(&self) -> String;

    /// Programmatic move, e.g. the guard or an auth failure sending the user to login.
    fn redirect_to(&self, route: &str);

    /// User-initiated move, such as following a nav link.
    fn go_to(&self, route: &str) {
        self.redirect_to(route);
    }
}

/// In-memory location that records every redirect it receives.
#[derive(Debug)]
pub struct MemoryLocation {
    current: RwLock<String>,
    history: RwLock<Vec<String>>,
}

impl MemoryLocation {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(initial.into()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Moves the location as a user click would. Not recorded as a redirect.
    pub fn set(&self, route: impl Into<String>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = route.into();
    }

    /// Routes passed to `redirect_to`, oldest first.
    pub fn redirects(&self) -> Vec<String> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new("")
    }
}

impl NavigationPort for MemoryLocation {
    fn current_route(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn go_to(&self, route: &str) {
        self.set(route);
    }

    fn redirect_to(&self, route: &str) {
        self.history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.to_string());
        self.set(route);
    }
}

/// Redirects to `route` unless the location already points at it (query ignored).
/// Returns whether a redirect happened.
pub fn force_route(location: &dyn NavigationPort, route: &str) -> bool {
    if route_key(&location.current_route()) == route_key(route) {
        return false;
    }
    location.redirect_to(route);
    true
}
