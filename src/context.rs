//! Render contexts handed to a page's data-loading hook.
//!
//! A hook receives either a page-level context or an application-level one
//! that wraps the page being rendered. [`InitialContext::page_mut`] is the one
//! place that tells them apart.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::fetch::Fetcher;
use crate::page::Page;

/// Where the current code is executing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Environment {
    #[default]
    Server,
    Browser,
}

impl Environment {
    /// Resolved at compile time: `wasm32` builds run in the browser.
    pub const fn current() -> Self {
        if cfg!(target_arch = "wasm32") { Self::Browser } else { Self::Server }
    }

    pub fn is_browser(self) -> bool {
        self == Self::Browser
    }
}

// ── PageContext ───────────────────────────────────────────────────────────────

/// Request-scoped values visible to one page's data-loading hook.
#[derive(Clone, Debug)]
pub struct PageContext {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub params: HashMap<String, String>,
    pub headers: Vec<(String, String)>,
    pub environment: Environment,
    /// Installed by the instrumentation wrapper before the hook runs.
    pub fetch: Option<Fetcher>,
}

impl PageContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            params: HashMap::new(),
            headers: Vec::new(),
            environment: Environment::current(),
            fetch: None,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_fetch(mut self, fetch: Fetcher) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn fetcher(&self) -> Option<&Fetcher> {
        self.fetch.as_ref()
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named route parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

// ── AppContext ────────────────────────────────────────────────────────────────

/// Context of an application shell: the page component it is about to render
/// plus that page's own context.
#[derive(Clone)]
pub struct AppContext {
    pub component: Arc<dyn Page>,
    pub ctx: PageContext,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("component", &self.component.name())
            .field("ctx", &self.ctx)
            .finish()
    }
}

// ── InitialContext ────────────────────────────────────────────────────────────

/// What a data-loading hook receives.
#[derive(Clone, Debug)]
pub enum InitialContext {
    Page(PageContext),
    App(AppContext),
}

impl InitialContext {
    /// The innermost page-level context.
    pub fn page(&self) -> &PageContext {
        match self {
            Self::Page(ctx) => ctx,
            Self::App(app) => &app.ctx,
        }
    }

    pub fn page_mut(&mut self) -> &mut PageContext {
        match self {
            Self::Page(ctx) => ctx,
            Self::App(app) => &mut app.ctx,
        }
    }

    pub fn is_app(&self) -> bool {
        matches!(self, Self::App(_))
    }
}

impl From<PageContext> for InitialContext {
    fn from(ctx: PageContext) -> Self {
        Self::Page(ctx)
    }
}

impl From<AppContext> for InitialContext {
    fn from(app: AppContext) -> Self {
        Self::App(app)
    }
}
