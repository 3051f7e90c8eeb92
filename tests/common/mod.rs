#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use schoolops_console::config::AppConfig;
use schoolops_console::gateway::FileSink;
use schoolops_console::notify::{Notifier, Severity};
use schoolops_console::router::{MemoryLocation, NavEntry, RouteTable};
use schoolops_console::session::MemoryStore;
use schoolops_console::Console;
use wiremock::MockServer;

/// Notifier that remembers every message it was given.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }
}

/// A console wired to a mock API, with every collaborator observable.
pub struct Harness {
    pub server: MockServer,
    pub console: Console,
    pub store: Arc<MemoryStore>,
    pub location: Arc<MemoryLocation>,
    pub notifier: Arc<RecordingNotifier>,
    pub download_dir: PathBuf,
}

impl Harness {
    pub async fn start(fragment: &str) -> Result<Self> {
        Self::start_with(fragment, None).await
    }

    pub async fn start_with_routes(fragment: &str, routes: RouteTable, nav: Vec<NavEntry>) -> Result<Self> {
        Self::start_with(fragment, Some((routes, nav))).await
    }

    async fn start_with(fragment: &str, routes: Option<(RouteTable, Vec<NavEntry>)>) -> Result<Self> {
        let server = MockServer::start().await;
        let config = AppConfig::for_base_url(server.uri());
        let store = Arc::new(MemoryStore::new());
        let location = Arc::new(MemoryLocation::new(fragment));
        let notifier = Arc::new(RecordingNotifier::default());
        let download_dir = scratch_dir("downloads");

        let mut builder = Console::builder(config)
            .store(store.clone())
            .location(location.clone())
            .notifier(Some(notifier.clone() as Arc<dyn Notifier>))
            .download_sink(Arc::new(FileSink::new(&download_dir)));
        if let Some((routes, nav)) = routes {
            builder = builder.routes(routes, nav);
        }
        let console = builder.build()?;

        Ok(Self {
            server,
            console,
            store,
            location,
            notifier,
            download_dir,
        })
    }

    /// Authorization headers of every request the mock server saw, in order.
    pub async fn authorizations(&self) -> Vec<Option<String>> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| {
                request
                    .headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .collect()
    }
}

pub fn scratch_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("schoolops-{}-{}", label, uuid::Uuid::new_v4().simple()))
}
