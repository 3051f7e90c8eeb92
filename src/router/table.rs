use std::collections::HashMap;
use std::sync::Arc;

use super::page::{Page, PlaceholderPage};
use super::route_key;

/// Static mapping from normalized route keys to pages. Immutable once built.
pub struct RouteTable {
    routes: HashMap<String, Arc<dyn Page>>,
    placeholder: Arc<dyn Page>,
}

/// Outcome of a lookup. Always holds a renderable page.
pub struct Resolved {
    pub page: Arc<dyn Page>,
    pub placeholder: bool,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Looks up any string; misses fall back to the placeholder page.
    pub fn resolve(&self, route: &str) -> Resolved {
        match self.routes.get(&route_key(route)) {
            Some(page) => Resolved {
                page: page.clone(),
                placeholder: false,
            },
            None => Resolved {
                page: self.placeholder.clone(),
                placeholder: true,
            },
        }
    }

    pub fn contains(&self, route: &str) -> bool {
        self.routes.contains_key(&route_key(route))
    }

    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

pub struct RouteTableBuilder {
    routes: HashMap<String, Arc<dyn Page>>,
    placeholder: Arc<dyn Page>,
}

impl Default for RouteTableBuilder {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            placeholder: Arc::new(PlaceholderPage),
        }
    }
}

impl RouteTableBuilder {
    pub fn route(mut self, route: &str, page: impl Page + 'static) -> Self {
        self.routes.insert(route_key(route), Arc::new(page));
        self
    }

    pub fn placeholder(mut self, page: impl Page + 'static) -> Self {
        self.placeholder = Arc::new(page);
        self
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            routes: self.routes,
            placeholder: self.placeholder,
        }
    }
}
