//! Pages, props, and the default application shell.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::InitialContext;
use crate::error::BoxError;

/// Data a page's hook computes for its render.
pub type Props = serde_json::Map<String, Value>;

/// Key under which a shell stores the props of the page it wraps.
pub const PAGE_PROPS_KEY: &str = "pageProps";

/// A renderable page (or application shell) with an optional async
/// data-loading hook.
///
/// ```rust
/// use async_trait::async_trait;
/// use fetch_har::{BoxError, InitialContext, Page, Props};
///
/// struct PageB;
///
/// #[async_trait]
/// impl Page for PageB {
///     fn name(&self) -> &str {
///         "PageB"
///     }
///
///     async fn initial_props(
///         &self,
///         _ctx: &mut InitialContext,
///     ) -> Result<Option<Props>, BoxError> {
///         let mut props = Props::new();
///         props.insert("value".into(), 5.into());
///         Ok(Some(props))
///     }
///
///     fn render(&self, props: &Props, _component: Option<&dyn Page>) -> String {
///         format!("<h1>Made it! {}</h1>", props["value"])
///     }
/// }
/// ```
#[async_trait]
pub trait Page: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Runs once per render pass, before [`render`](Page::render).
    ///
    /// `Ok(None)` means the page has no hook. The default implementation is
    /// exactly that.
    async fn initial_props(&self, _ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        Ok(None)
    }

    /// Renders HTML. `component` is the page an application shell should
    /// render inside itself; plain pages ignore it.
    fn render(&self, props: &Props, component: Option<&dyn Page>) -> String;
}

// ── DefaultApp ────────────────────────────────────────────────────────────────

/// The application shell used when an app does not define its own: loads the
/// wrapped page's props into `pageProps` and renders the page with them.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultApp;

#[async_trait]
impl Page for DefaultApp {
    fn name(&self) -> &str {
        "App"
    }

    async fn initial_props(&self, ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        let page_props = match ctx {
            InitialContext::App(app) => {
                let mut inner = InitialContext::Page(app.ctx.clone());
                app.component.initial_props(&mut inner).await?.unwrap_or_default()
            }
            InitialContext::Page(_) => Props::new(),
        };

        let mut props = Props::new();
        props.insert(PAGE_PROPS_KEY.to_owned(), Value::Object(page_props));
        Ok(Some(props))
    }

    fn render(&self, props: &Props, component: Option<&dyn Page>) -> String {
        let page_props = props.get(PAGE_PROPS_KEY)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        component.map(|page| page.render(&page_props, None)).unwrap_or_default()
    }
}
