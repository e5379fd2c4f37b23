//! Decides whether a render pass gets the instrumented fetcher.

use std::fmt;
use std::sync::Arc;

use crate::config::Mode;
use crate::context::PageContext;
use crate::error::{BoxError, Error};

pub type Predicate = Arc<dyn Fn(&PageContext) -> Result<bool, BoxError> + Send + Sync>;

/// Whether to instrument: a fixed flag, or a predicate evaluated per render.
#[derive(Clone)]
pub enum Enabled {
    Flag(bool),
    When(Predicate),
}

impl Enabled {
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&PageContext) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self::When(Arc::new(predicate))
    }

    /// On everywhere except production.
    pub fn for_mode(mode: Mode) -> Self {
        Self::Flag(!mode.is_production())
    }
}

impl Default for Enabled {
    fn default() -> Self {
        Self::for_mode(Mode::current())
    }
}

impl From<bool> for Enabled {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl fmt::Debug for Enabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => f.debug_tuple("Flag").field(flag).finish(),
            Self::When(_) => f.write_str("When(..)"),
        }
    }
}

/// Evaluates `enabled` for `ctx`.
///
/// The predicate runs first and its failure is returned as-is, even in the
/// browser. A browser context then always yields `false`: archives only
/// capture server-side traffic.
pub fn should_instrument(enabled: &Enabled, ctx: &PageContext) -> Result<bool, Error> {
    let wanted = match enabled {
        Enabled::Flag(flag) => *flag,
        Enabled::When(predicate) => predicate(ctx).map_err(Error::Predicate)?,
    };
    Ok(wanted && !ctx.environment.is_browser())
}
