//! The instrumentation wrapper.
//!
//! [`with_fetch_har`] decorates a page (or application shell) in two places,
//! kept as separate functions and composed by [`WithFetchHar`]:
//!
//! - [`load_initial_props`] around the data-loading hook: installs the plain
//!   or the recording fetcher into the context, awaits the hook, and attaches
//!   the finished archive to the props.
//! - [`render_with_notice`] around render: renders the page without the
//!   archive prop and appends the [`Notice`].
//!
//! Because `WithFetchHar<P>` is itself a [`Page`], wrapped pages nest.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::context::InitialContext;
use crate::error::{BoxError, Error};
use crate::fetch::Fetcher;
use crate::har::Har;
use crate::notice::{ArtifactStore, DataUrlStore, Notice};
use crate::page::{Page, Props};
use crate::recorder::{self, HarLog, RecorderOptions};
use crate::selector::{self, Enabled};

/// Props key holding the archive.
pub const HAR_KEY: &str = "har";

/// Configuration of [`with_fetch_har`].
///
/// The base fetcher has no default and must be injected by the caller.
#[derive(Clone)]
pub struct FetchHarConfig {
    pub fetch: Fetcher,
    pub enabled: Enabled,
    pub recorder: RecorderOptions,
    pub artifacts: Arc<dyn ArtifactStore>,
}

impl FetchHarConfig {
    /// Instrumentation on outside production, archives offered as `data:` URLs.
    pub fn new(fetch: Fetcher) -> Self {
        Self {
            fetch,
            enabled: Enabled::default(),
            recorder: RecorderOptions::default(),
            artifacts: Arc::new(DataUrlStore),
        }
    }

    pub fn enabled(mut self, enabled: impl Into<Enabled>) -> Self {
        self.enabled = enabled.into();
        self
    }

    pub fn recorder(mut self, options: RecorderOptions) -> Self {
        self.recorder = options;
        self
    }

    pub fn artifacts(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = store;
        self
    }
}

/// Wraps `page` so its data-loading hook runs with an instrumented fetcher.
pub fn with_fetch_har<P: Page>(page: P, config: FetchHarConfig) -> WithFetchHar<P> {
    let name = format!("with_fetch_har({})", page.name());
    WithFetchHar { inner: page, config, name }
}

pub struct WithFetchHar<P> {
    inner: P,
    config: FetchHarConfig,
    name: String,
}

impl<P> WithFetchHar<P> {
    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn config(&self) -> &FetchHarConfig {
        &self.config
    }
}

#[async_trait]
impl<P: Page> Page for WithFetchHar<P> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initial_props(&self, ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        load_initial_props(&self.inner, &self.config, ctx).await.map(Some)
    }

    fn render(&self, props: &Props, component: Option<&dyn Page>) -> String {
        render_with_notice(&self.inner, self.config.artifacts.clone(), props, component)
    }
}

// ── Data-loading decoration ───────────────────────────────────────────────────

/// Runs `page`'s hook with the fetcher chosen for this render and returns its
/// props, plus the archive under [`HAR_KEY`] when instrumentation was on.
///
/// Setup failures (predicate, recorder) are [`Error`]s. A failure of the hook
/// itself is returned as the very same value the hook produced.
pub async fn load_initial_props<P: Page + ?Sized>(
    page: &P,
    config: &FetchHarConfig,
    ctx: &mut InitialContext,
) -> Result<Props, BoxError> {
    let log = install_fetch(config, ctx)?;

    let mut props = page.initial_props(ctx).await?.unwrap_or_default();

    if let Some(log) = log {
        let har = log.finish();
        debug!(page = page.name(), entries = har.entries().len(), "archive attached");
        props.insert(HAR_KEY.to_owned(), serde_json::to_value(&har).map_err(Error::from)?);
    }
    Ok(props)
}

/// Installs the plain or recording fetcher into the innermost page context.
/// Returns the log being recorded into, if any.
///
/// A fetcher already in the context (put there by an enclosing wrapper) is
/// the base this wrapper builds on, so calls keep reaching every outer log.
fn install_fetch(
    config: &FetchHarConfig,
    ctx: &mut InitialContext,
) -> Result<Option<HarLog>, Error> {
    let page_ctx = ctx.page_mut();
    let instrument = selector::should_instrument(&config.enabled, page_ctx)?;
    debug!(path = %page_ctx.path, instrument, "fetch selected");

    let base = page_ctx.fetch.clone().unwrap_or_else(|| config.fetch.clone());
    if !instrument {
        page_ctx.fetch = Some(base);
        return Ok(None);
    }

    let log = match &config.recorder.creator {
        Some(creator) => HarLog::with_creator(creator.clone()),
        None => HarLog::new(),
    };
    let fetch = recorder::with_har(base, &log, config.recorder.clone())?;
    page_ctx.fetch = Some(fetch);
    Ok(Some(log))
}

// ── Render decoration ─────────────────────────────────────────────────────────

/// Renders `page` without the archive prop, followed by the notice for it.
pub fn render_with_notice<P: Page + ?Sized>(
    page: &P,
    artifacts: Arc<dyn ArtifactStore>,
    props: &Props,
    component: Option<&dyn Page>,
) -> String {
    let mut props = props.clone();
    let har = archive_from(props.remove(HAR_KEY));

    let mut html = page.render(&props, component);

    let mut notice = Notice::new(artifacts);
    notice.update(har);
    if let Some(dialog) = notice.render() {
        html.push_str(&dialog);
    }
    html
}

/// Decodes the archive prop. Anything other than a well-formed archive counts
/// as no archive.
pub fn archive_from(value: Option<Value>) -> Option<Arc<Har>> {
    match value? {
        Value::Null => None,
        value => match serde_json::from_value::<Har>(value) {
            Ok(har) => Some(Arc::new(har)),
            Err(e) => {
                debug!(error = %e, "malformed archive prop ignored");
                None
            }
        },
    }
}
