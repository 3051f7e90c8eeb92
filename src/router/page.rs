use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::gateway::RequestGateway;
use crate::session::SessionProfile;

/// What a page sees when it renders.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Normalized route key, e.g. `#/students`.
    pub route: String,
    /// Fragment as it stood in the location, query included.
    pub fragment: String,
    /// Decoded query pairs from the fragment.
    pub query: Vec<(String, String)>,
    pub profile: Option<SessionProfile>,
}

impl PageContext {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Handed to a page's mount step. Carries the gateway for data fetches and a
/// navigation generation so late results of a superseded navigation can be dropped.
pub struct MountContext {
    pub page: PageContext,
    pub gateway: Arc<RequestGateway>,
    generation: u64,
    latest: Arc<AtomicU64>,
    sections: Mutex<Vec<String>>,
}

impl MountContext {
    pub(crate) fn new(
        page: PageContext,
        gateway: Arc<RequestGateway>,
        generation: u64,
        latest: Arc<AtomicU64>,
    ) -> Self {
        Self {
            page,
            gateway,
            generation,
            latest,
            sections: Mutex::new(Vec::new()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// False once another navigation has started.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }

    /// Appends markup to the page. Ignored (and reported as `false`) when stale.
    pub fn fill(&self, markup: impl Into<String>) -> bool {
        if !self.is_current() {
            tracing::debug!(generation = self.generation, "Dropping stale page content");
            return false;
        }
        self.sections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(markup.into());
        true
    }

    pub(crate) fn take_sections(&self) -> Vec<String> {
        std::mem::take(&mut *self.sections.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// A page module plugged into the route table.
#[async_trait]
pub trait Page: Send + Sync {
    fn title(&self) -> &str;

    fn render(&self, ctx: &PageContext) -> String;

    /// Runs after render, typically fetching the page's data.
    async fn mount(&self, _ctx: &MountContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Rendered for every route without a registered page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderPage;

impl Page for PlaceholderPage {
    fn title(&self) -> &str {
        "Not implemented"
    }

    fn render(&self, ctx: &PageContext) -> String {
        format!(
            "<section class=\"placeholder\"><h1>Not implemented</h1><p>No page is available for {} yet.</p></section>",
            escape_html(&ctx.route)
        )
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_query_value_lookup() {
        let ctx = PageContext {
            route: "#/attendance".to_string(),
            fragment: "#/attendance?view=today".to_string(),
            query: vec![("view".to_string(), "today".to_string())],
            profile: None,
        };
        assert_eq!(ctx.query_value("view"), Some("today"));
        assert_eq!(ctx.query_value("grade"), None);
    }
}
