mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use schoolops_console::pages::LoginPage;
use schoolops_console::router::{MountContext, NavEntry, NavigationPort, Page, PageContext, RouteTable};
use serde_json::json;
use tokio::sync::Notify;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn signed_out_visit_to_protected_route_lands_on_login() -> Result<()> {
    let h = common::Harness::start("#/dashboard").await?;

    let nav = h.console.guard.navigate().await;

    assert!(nav.redirected);
    assert_eq!(nav.route, "#/login");
    assert_eq!(nav.fragment, "#/login");
    assert_eq!(nav.title, "Sign in");
    assert_eq!(h.location.redirects(), vec!["#/login".to_string()]);
    // The dashboard never mounted, so nothing was fetched
    assert!(h.server.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_route_renders_placeholder_without_redirect() -> Result<()> {
    let h = common::Harness::start("#/reports/annual").await?;
    h.console.session.set_credential("t1");

    let nav = h.console.guard.navigate().await;

    assert!(nav.placeholder);
    assert!(!nav.redirected);
    assert_eq!(nav.route, "#/reports/annual");
    assert_eq!(nav.title, "Not implemented");
    assert!(nav.markup.contains("#/reports/annual"));
    assert!(h.location.redirects().is_empty());
    Ok(())
}

#[tokio::test]
async fn signed_out_on_login_route_does_not_redirect() -> Result<()> {
    let h = common::Harness::start("#/login?next=%2Fpayments").await?;

    let first = h.console.guard.navigate().await;
    let second = h.console.guard.navigate().await;

    for nav in [&first, &second] {
        assert!(!nav.redirected);
        assert_eq!(nav.route, "#/login");
    }
    assert!(second.generation > first.generation);
    assert!(h.location.redirects().is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_fragment_depends_on_auth_state() -> Result<()> {
    let h = common::Harness::start("").await?;

    let signed_out = h.console.guard.navigate().await;
    assert_eq!(signed_out.route, "#/login");
    assert!(!signed_out.redirected);

    h.console.session.set_credential("t1");
    let signed_in = h.console.guard.navigate().await;
    assert_eq!(signed_in.route, "#/dashboard");
    assert_eq!(signed_in.title, "Dashboard");
    assert!(h.location.redirects().is_empty());
    Ok(())
}

#[tokio::test]
async fn nav_marks_route_and_exact_query_links_active() -> Result<()> {
    let h = common::Harness::start("#/attendance?view=today").await?;
    Mock::given(method("GET"))
        .and(path("/api/attendance"))
        .and(query_param("view", "today"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"name": "Class 5B"}, {"name": "Class 6A"}]
        })))
        .expect(1)
        .mount(&h.server)
        .await;
    h.console.session.set_credential("t1");

    let nav = h.console.guard.navigate().await;

    let active: Vec<&str> = nav
        .nav
        .iter()
        .filter(|entry| entry.active)
        .map(|entry| entry.href.as_str())
        .collect();
    assert_eq!(active, vec!["#/attendance", "#/attendance?view=today"]);
    assert!(nav.markup.contains("<li>Class 5B</li>"));
    assert!(nav.mount_error.is_none());
    Ok(())
}

#[tokio::test]
async fn failed_mount_still_returns_the_shell() -> Result<()> {
    let h = common::Harness::start("#/students").await?;
    Mock::given(method("GET"))
        .and(path("/api/students"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "database offline"})))
        .mount(&h.server)
        .await;
    h.console.session.set_credential("t1");

    let nav = h.console.guard.navigate().await;

    assert_eq!(nav.mount_error.as_deref(), Some("database offline"));
    assert!(nav.markup.contains("<h1>Students</h1>"));
    assert!(!nav.nav.is_empty());
    assert!(nav.nav.iter().any(|entry| entry.active && entry.href == "#/students"));
    Ok(())
}

#[tokio::test]
async fn auth_failure_during_mount_ends_on_login() -> Result<()> {
    let h = common::Harness::start("#/students").await?;
    Mock::given(method("GET"))
        .and(path("/api/students"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Session expired"})))
        .expect(1)
        .mount(&h.server)
        .await;
    h.console.session.set_credential("t1");

    let nav = h.console.guard.navigate().await;

    assert_eq!(nav.route, "#/login");
    assert_eq!(nav.fragment, "#/login");
    assert_eq!(nav.title, "Sign in");
    assert!(nav.redirected);
    assert!(nav.mount_error.is_none());
    assert!(!nav.markup.contains("<h1>Students</h1>"));
    assert!(!h.console.session.is_authenticated());
    assert_eq!(h.location.current_route(), "#/login");
    assert_eq!(h.location.redirects(), vec!["#/login".to_string()]);
    Ok(())
}

/// Page whose mount blocks until released, then reports whether its content landed.
struct GatedPage {
    started: Arc<Notify>,
    release: Arc<Notify>,
    filled: Arc<Mutex<Option<bool>>>,
}

#[async_trait]
impl Page for GatedPage {
    fn title(&self) -> &str {
        "Slow"
    }

    fn render(&self, _ctx: &PageContext) -> String {
        "<h1>Slow</h1>".to_string()
    }

    async fn mount(&self, ctx: &MountContext) -> anyhow::Result<()> {
        self.started.notify_one();
        self.release.notified().await;
        let landed = ctx.fill("<p>late data</p>");
        *self.filled.lock().unwrap() = Some(landed);
        Ok(())
    }
}

#[tokio::test]
async fn superseded_navigation_drops_late_content() -> Result<()> {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let filled = Arc::new(Mutex::new(None));
    let routes = RouteTable::builder()
        .route("#/login", LoginPage)
        .route(
            "#/slow",
            GatedPage {
                started: started.clone(),
                release: release.clone(),
                filled: filled.clone(),
            },
        )
        .build();
    let nav = vec![NavEntry::new("Slow", "#/slow")];
    let h = common::Harness::start_with_routes("#/slow", routes, nav).await?;
    h.console.session.set_credential("t1");

    let (slow, fast) = tokio::join!(h.console.guard.navigate(), async {
        started.notified().await;
        h.location.set("#/elsewhere");
        let fast = h.console.guard.navigate().await;
        release.notify_one();
        fast
    });

    assert_eq!(*filled.lock().unwrap(), Some(false));
    assert!(!slow.markup.contains("late data"));
    assert!(fast.generation > slow.generation);
    assert_eq!(fast.route, "#/elsewhere");
    assert!(fast.placeholder);
    assert_eq!(h.location.current_route(), "#/elsewhere");
    Ok(())
}
