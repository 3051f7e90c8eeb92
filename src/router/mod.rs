//! Navigation guard and router.
//!
//! Every navigation normalizes the location fragment, runs the guard against the
//! session, resolves the route table and renders then mounts the page. The guard
//! runs before any page code, so protected pages never start without a credential.

pub mod location;
pub mod page;
pub mod table;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::config::AppConfig;
use crate::gateway::RequestGateway;
use crate::session::SessionManager;

pub use location::{force_route, MemoryLocation, NavigationPort};
pub use page::{escape_html, MountContext, Page, PageContext, PlaceholderPage};
pub use table::{Resolved, RouteTable, RouteTableBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// Entry in the shell navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub label: String,
    pub href: String,
    pub active: bool,
}

impl NavEntry {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            active: false,
        }
    }
}

/// Result of one navigation.
#[derive(Debug, Clone, Serialize)]
pub struct Navigation {
    /// Fragment after the guard ran.
    pub fragment: String,
    /// Normalized route key that was resolved.
    pub route: String,
    pub title: String,
    pub markup: String,
    pub nav: Vec<NavEntry>,
    /// Label of the signed-in user for the shell header.
    pub identity: Option<String>,
    /// The guard forced the location to the login route.
    pub redirected: bool,
    pub placeholder: bool,
    pub mount_error: Option<String>,
    pub generation: u64,
}

/// Normalized route key: query suffix dropped, `#/` prefix, no trailing slash.
/// Empty for an empty fragment.
pub fn route_key(raw: &str) -> String {
    let without_query = raw.trim().split('?').next().unwrap_or_default();
    let path = without_query
        .trim_start_matches('#')
        .trim_start_matches('/')
        .trim_end_matches('/');

    if path.is_empty() {
        String::new()
    } else {
        format!("#/{}", path)
    }
}

/// Decoded query pairs of a fragment such as `#/students?grade=4`.
pub fn fragment_query(raw: &str) -> Vec<(String, String)> {
    match raw.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
        None => Vec::new(),
    }
}

pub struct NavigationGuard {
    session: Arc<SessionManager>,
    gateway: Arc<RequestGateway>,
    location: Arc<dyn NavigationPort>,
    routes: RouteTable,
    nav: RwLock<Vec<NavEntry>>,
    login_route: String,
    dashboard_route: String,
    generation: Arc<AtomicU64>,
}

impl NavigationGuard {
    pub fn new(
        config: &AppConfig,
        session: Arc<SessionManager>,
        gateway: Arc<RequestGateway>,
        location: Arc<dyn NavigationPort>,
        routes: RouteTable,
        nav: Vec<NavEntry>,
    ) -> Self {
        Self {
            session,
            gateway,
            location,
            routes,
            nav: RwLock::new(nav),
            login_route: route_key(&config.routes.login),
            dashboard_route: route_key(&config.routes.dashboard),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn auth_state(&self) -> AuthState {
        if self.session.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn dashboard_route(&self) -> &str {
        &self.dashboard_route
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Route key for a raw fragment. An empty fragment lands on the dashboard when
    /// signed in and on the login route otherwise.
    pub fn normalize(&self, raw: &str) -> String {
        let key = route_key(raw);
        if !key.is_empty() {
            return key;
        }
        match self.auth_state() {
            AuthState::Authenticated => self.dashboard_route.clone(),
            AuthState::Unauthenticated => self.login_route.clone(),
        }
    }

    /// Shell navigation entries with their current `active` flags.
    pub fn nav(&self) -> Vec<NavEntry> {
        self.nav.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Resolves and renders whatever the location currently points at.
    /// Safe to call redundantly; it never fails.
    ///
    /// When mounting moves the location (a terminal 401 forcing the login route) and
    /// no newer navigation has started, the new location is resolved once more so the
    /// result matches where the shell actually is.
    pub async fn navigate(&self) -> Navigation {
        let navigation = self.resolve_and_mount(false).await;
        if !self.moved_during_mount(&navigation) {
            return navigation;
        }

        tracing::debug!(route = %navigation.route, "Location changed while mounting, navigating again");
        self.resolve_and_mount(true).await
    }

    fn moved_during_mount(&self, navigation: &Navigation) -> bool {
        self.generation.load(Ordering::SeqCst) == navigation.generation
            && self.normalize(&self.location.current_route()) != navigation.route
    }

    async fn resolve_and_mount(&self, followed_redirect: bool) -> Navigation {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut fragment = self.location.current_route();
        let mut route = self.normalize(&fragment);
        let mut redirected = followed_redirect;

        if self.auth_state() == AuthState::Unauthenticated && route != self.login_route {
            tracing::debug!(route = %route, "Not signed in, sending to login");
            redirected |= force_route(self.location.as_ref(), &self.login_route);
            fragment = self.location.current_route();
            route = self.login_route.clone();
        }

        let Resolved { page, placeholder } = self.routes.resolve(&route);
        if placeholder {
            tracing::debug!(route = %route, "No page registered, rendering placeholder");
        }
        let nav = self.mark_active(&fragment, &route);

        let ctx = PageContext {
            route: route.clone(),
            fragment: fragment.clone(),
            query: fragment_query(&fragment),
            profile: self.session.profile(),
        };
        let mut markup = page.render(&ctx);

        let mount_ctx = MountContext::new(ctx, self.gateway.clone(), generation, self.generation.clone());
        let mount_error = match page.mount(&mount_ctx).await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(route = %route, "Page mount failed: {:#}", e);
                Some(e.to_string())
            }
        };
        for section in mount_ctx.take_sections() {
            markup.push_str(&section);
        }

        Navigation {
            fragment,
            route,
            title: page.title().to_string(),
            markup,
            nav,
            identity: self.session.profile().map(|p| p.label()),
            redirected,
            placeholder,
            mount_error,
            generation,
        }
    }

    /// Marks entries matching either the exact fragment or its route key.
    fn mark_active(&self, fragment: &str, route: &str) -> Vec<NavEntry> {
        let fragment = fragment.trim();
        let mut nav = self.nav.write().unwrap_or_else(PoisonError::into_inner);
        for entry in nav.iter_mut() {
            entry.active = entry.href == fragment || entry.href == route;
        }
        nav.clone()
    }
}
