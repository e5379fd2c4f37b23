//! Radix-tree page router.
//!
//! One tree, O(path-length) lookup. You register a path, you get a page.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::page::Page;

/// Maps request paths to pages. Build it once at startup and hand it to
/// [`App::new`](crate::App::new).
pub struct Router {
    pages: MatchitRouter<Arc<dyn Page>>,
}

impl Router {
    pub fn new() -> Self {
        Self { pages: MatchitRouter::new() }
    }

    /// Registers `page` at `path`. Returns `self` for chaining.
    ///
    /// Route parameters use `{name}` syntax and show up in
    /// [`PageContext::param`](crate::PageContext::param).
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered. Routes are fixed at startup, so this is a programming error.
    pub fn page(mut self, path: &str, page: impl Page) -> Self {
        self.pages
            .insert(path, Arc::new(page))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(&self, path: &str) -> Option<(Arc<dyn Page>, HashMap<String, String>)> {
        let matched = self.pages.at(path).ok()?;
        let page = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((page, params))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
