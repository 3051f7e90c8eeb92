//! Console context: one session, one gateway and one guard wired together.
//!
//! Everything the pages and the shell share lives here instead of in globals, so
//! several isolated consoles can run side by side (tests do exactly that).

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{GatewayError, SessionError};
use crate::gateway::{DownloadSink, FileSink, RequestGateway};
use crate::notify::{LogNotifier, Notifier};
use crate::pages::{default_nav, default_routes};
use crate::router::{force_route, MemoryLocation, NavEntry, Navigation, NavigationGuard, NavigationPort, RouteTable};
use crate::session::{KeyValueStore, MemoryStore, SessionManager, SessionProfile};

pub struct Console {
    pub config: AppConfig,
    pub session: Arc<SessionManager>,
    pub gateway: Arc<RequestGateway>,
    pub guard: NavigationGuard,
    location: Arc<dyn NavigationPort>,
}

impl Console {
    pub fn builder(config: AppConfig) -> ConsoleBuilder {
        ConsoleBuilder::new(config)
    }

    pub fn location(&self) -> &Arc<dyn NavigationPort> {
        &self.location
    }

    /// Boot sequence: settle the session, then run the first navigation.
    ///
    /// With a stored credential, hydration is awaited before the guard resolves
    /// anything. A failed hydration clears the session first, so the guard sees a
    /// clean signed-out state instead of a half-authenticated one.
    pub async fn boot(&self) -> Navigation {
        if self.session.is_authenticated() {
            if let Err(e) = self.session.hydrate_session(self.gateway.as_ref()).await {
                tracing::warn!("Session hydration failed at boot, signing out: {}", e);
                self.session.clear_session();
            }
        }
        self.guard.navigate().await
    }

    /// Stores a freshly issued credential and lands on the dashboard.
    ///
    /// Hydration is best effort here: the credential alone passes the guard.
    pub async fn login(&self, credential: &str) -> Navigation {
        self.session.set_credential(credential);
        if let Err(e) = self.hydrate().await {
            tracing::warn!("Signed in without a profile: {}", e);
        }
        force_route(self.location.as_ref(), self.guard.dashboard_route());
        self.guard.navigate().await
    }

    pub async fn logout(&self) -> Navigation {
        self.session.clear_session();
        force_route(self.location.as_ref(), self.guard.login_route());
        self.guard.navigate().await
    }

    pub async fn hydrate(&self) -> Result<SessionProfile, SessionError> {
        self.session.hydrate_session(self.gateway.as_ref()).await
    }

    /// Moves the location as a user click would, then navigates.
    pub async fn open(&self, fragment: &str) -> Navigation {
        if self.location.current_route() != fragment {
            self.location.go_to(fragment);
        }
        self.guard.navigate().await
    }
}

pub struct ConsoleBuilder {
    config: AppConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    location: Option<Arc<dyn NavigationPort>>,
    notifier: Option<Arc<dyn Notifier>>,
    sink: Option<Arc<dyn DownloadSink>>,
    routes: Option<RouteTable>,
    nav: Option<Vec<NavEntry>>,
}

impl ConsoleBuilder {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: None,
            location: None,
            notifier: Some(Arc::new(LogNotifier)),
            sink: None,
            routes: None,
            nav: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn location(mut self, location: Arc<dyn NavigationPort>) -> Self {
        self.location = Some(location);
        self
    }

    /// Replaces the default log notifier; `None` disables notifications.
    pub fn notifier(mut self, notifier: Option<Arc<dyn Notifier>>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn download_sink(mut self, sink: Arc<dyn DownloadSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn routes(mut self, routes: RouteTable, nav: Vec<NavEntry>) -> Self {
        self.routes = Some(routes);
        self.nav = Some(nav);
        self
    }

    pub fn build(self) -> Result<Console, GatewayError> {
        let config = self.config;
        let store: Arc<dyn KeyValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let location: Arc<dyn NavigationPort> = match self.location {
            Some(location) => location,
            None => Arc::new(MemoryLocation::default()),
        };
        let sink: Arc<dyn DownloadSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(FileSink::new(config.storage.download_dir.clone())),
        };

        let session = Arc::new(SessionManager::new(
            store,
            config.api.identity_endpoints.clone(),
        ));
        let gateway = Arc::new(RequestGateway::new(
            &config,
            session.clone(),
            location.clone(),
            self.notifier,
            sink,
        )?);
        let guard = NavigationGuard::new(
            &config,
            session.clone(),
            gateway.clone(),
            location.clone(),
            self.routes.unwrap_or_else(default_routes),
            self.nav.unwrap_or_else(default_nav),
        );

        Ok(Console {
            config,
            session,
            gateway,
            guard,
            location,
        })
    }
}
