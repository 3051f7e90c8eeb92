//! Built-in pages for the console shell.
//!
//! Entity pages are deliberately generic: they list whatever `/api/<entity>`
//! returns. Richer per-entity screens plug into the same route table.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;

use crate::gateway::RequestOptions;
use crate::router::{escape_html, MountContext, NavEntry, Page, PageContext, RouteTable};

/// Entities with a list page, as (route segment, title).
pub const ENTITIES: &[(&str, &str)] = &[
    ("students", "Students"),
    ("employees", "Employees"),
    ("schools", "Schools"),
    ("payments", "Payments"),
    ("timetables", "Timetables"),
    ("videos", "Videos"),
    ("attendance", "Attendance"),
];

/// Entities summarized on the dashboard.
const DASHBOARD_COUNTS: &[&str] = &["students", "employees", "schools"];

#[derive(Debug, Default, Clone, Copy)]
pub struct LoginPage;

impl Page for LoginPage {
    fn title(&self) -> &str {
        "Sign in"
    }

    fn render(&self, _ctx: &PageContext) -> String {
        concat!(
            "<section class=\"login\"><h1>Sign in</h1>",
            "<p>Run <code>schoolops auth login --token &lt;token&gt;</code> to start a session.</p>",
            "</section>"
        )
        .to_string()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DashboardPage;

#[async_trait]
impl Page for DashboardPage {
    fn title(&self) -> &str {
        "Dashboard"
    }

    fn render(&self, ctx: &PageContext) -> String {
        let greeting = match &ctx.profile {
            Some(profile) => format!("<p>Welcome, {}.</p>", escape_html(&profile.label())),
            None => String::new(),
        };
        format!("<section class=\"dashboard\"><h1>Dashboard</h1>{}</section>", greeting)
    }

    async fn mount(&self, ctx: &MountContext) -> anyhow::Result<()> {
        let fetches = DASHBOARD_COUNTS.iter().map(|entity| {
            let target = format!("/api/{}", entity);
            let options = RequestOptions::get().query("limit", 1u32);
            async move { (*entity, ctx.gateway.request(&target, options).await) }
        });

        let mut cards = String::from("<ul class=\"counts\">");
        for (entity, result) in join_all(fetches).await {
            let count = match result {
                Ok(payload) => total_of(&payload.into_json())
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                Err(e) => {
                    tracing::warn!("Dashboard count for {} failed: {}", entity, e);
                    "-".to_string()
                }
            };
            cards.push_str(&format!("<li>{}: {}</li>", entity, count));
        }
        cards.push_str("</ul>");

        ctx.fill(cards);
        Ok(())
    }
}

/// Generic list screen for one entity collection.
#[derive(Debug, Clone)]
pub struct EntityListPage {
    entity: String,
    title: String,
}

impl EntityListPage {
    pub fn new(entity: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            title: title.into(),
        }
    }
}

#[async_trait]
impl Page for EntityListPage {
    fn title(&self) -> &str {
        &self.title
    }

    fn render(&self, _ctx: &PageContext) -> String {
        format!(
            "<section class=\"list\" data-entity=\"{}\"><h1>{}</h1></section>",
            escape_html(&self.entity),
            escape_html(&self.title)
        )
    }

    async fn mount(&self, ctx: &MountContext) -> anyhow::Result<()> {
        let mut options = RequestOptions::get();
        for (key, value) in &ctx.page.query {
            options = options.query(key.as_str(), value.as_str());
        }

        let payload = ctx
            .gateway
            .request(&format!("/api/{}", self.entity), options)
            .await?;
        let items = items_of(payload.into_json());

        let mut list = String::from("<ul class=\"rows\">");
        if items.is_empty() {
            list.push_str("<li class=\"empty\">No records</li>");
        }
        for item in &items {
            list.push_str(&format!("<li>{}</li>", escape_html(&row_label(item))));
        }
        list.push_str("</ul>");

        ctx.fill(list);
        Ok(())
    }
}

/// Route table with the login, dashboard and entity list pages.
pub fn default_routes() -> RouteTable {
    let mut builder = RouteTable::builder()
        .route("#/login", LoginPage)
        .route("#/dashboard", DashboardPage);
    for (entity, title) in ENTITIES {
        builder = builder.route(&format!("#/{}", entity), EntityListPage::new(*entity, *title));
    }
    builder.build()
}

/// Shell navigation matching [`default_routes`].
pub fn default_nav() -> Vec<NavEntry> {
    let mut nav = vec![NavEntry::new("Dashboard", "#/dashboard")];
    for (entity, title) in ENTITIES {
        nav.push(NavEntry::new(*title, format!("#/{}", entity)));
    }
    nav.push(NavEntry::new("Today's attendance", "#/attendance?view=today"));
    nav
}

/// Collection items from a list payload: a bare array, or `data`/`items`/`results`.
fn items_of(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => ["data", "items", "results"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                Some(Value::Object(inner)) => match inner.get("items") {
                    Some(Value::Array(items)) => Some(items.clone()),
                    _ => None,
                },
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn total_of(value: &Value) -> Option<u64> {
    match value {
        Value::Array(items) => Some(items.len() as u64),
        Value::Object(map) => ["total", "count"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_u64))
            .or_else(|| map.get("data").and_then(total_of)),
        _ => None,
    }
}

fn row_label(item: &Value) -> String {
    match item {
        Value::Object(map) => ["name", "full_name", "title", "id"]
            .iter()
            .find_map(|key| match map.get(*key) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| item.to_string()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
