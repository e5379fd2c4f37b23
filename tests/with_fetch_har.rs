//! Data-loading and render behaviour of wrapped pages.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use fetch_har::fetch::{FetchError, FetchRequest, FetchResponse};
use fetch_har::har::Creator;
use fetch_har::notice::NoArtifacts;
use fetch_har::{
    AppContext, BoxError, DefaultApp, Enabled, Environment, Error, FetchHarConfig, Fetcher, HAR_KEY,
    Har, InitialContext, PAGE_PROPS_KEY, Page, PageContext, Props, RecorderOptions, with_fetch_har,
};
use serde_json::{Value, json};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn echo_fetcher(calls: Arc<AtomicUsize>) -> Fetcher {
    Fetcher::new(move |req: FetchRequest| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, FetchError>(
                FetchResponse::new(200, format!(r#"{{"url":"{}"}}"#, req.url()))
                    .with_header("content-type", "application/json"),
            )
        }
    })
}

fn config(enabled: impl Into<Enabled>) -> FetchHarConfig {
    FetchHarConfig::new(echo_fetcher(Arc::default())).enabled(enabled)
}

fn page_ctx() -> InitialContext {
    InitialContext::Page(PageContext::new("/"))
}

fn archive(props: &Props) -> Har {
    serde_json::from_value(props[HAR_KEY].clone()).unwrap()
}

/// Returns `{value: 5}` without fetching.
struct Valued;

#[async_trait]
impl Page for Valued {
    fn name(&self) -> &str {
        "Valued"
    }

    async fn initial_props(&self, _ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        let mut props = Props::new();
        props.insert("value".into(), 5.into());
        Ok(Some(props))
    }

    fn render(&self, props: &Props, _component: Option<&dyn Page>) -> String {
        format!("<h1>{}</h1>", props.get("value").cloned().unwrap_or_default())
    }
}

/// Issues one GET per URL through the context fetcher, sequentially.
struct Fetching(Vec<&'static str>);

#[async_trait]
impl Page for Fetching {
    fn name(&self) -> &str {
        "Fetching"
    }

    async fn initial_props(&self, ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        let fetch = ctx.page().fetcher().cloned().ok_or("no fetcher")?;
        for url in &self.0 {
            fetch.fetch(FetchRequest::get(*url)).await?;
        }
        Ok(Some(Props::new()))
    }

    fn render(&self, props: &Props, _component: Option<&dyn Page>) -> String {
        format!("<p>{} props</p>", props.len())
    }
}

struct NoHook;

impl Page for NoHook {
    fn name(&self) -> &str {
        "NoHook"
    }
    fn render(&self, _props: &Props, _component: Option<&dyn Page>) -> String {
        "<p>plain</p>".into()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("upstream exploded")]
struct Exploded;

struct Failing;

#[async_trait]
impl Page for Failing {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn initial_props(&self, ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        let fetch = ctx.page().fetcher().cloned().ok_or("no fetcher")?;
        fetch.fetch(FetchRequest::get("http://x.test/before-failure")).await?;
        Err(Exploded.into())
    }

    fn render(&self, _props: &Props, _component: Option<&dyn Page>) -> String {
        String::new()
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn disabled_leaves_props_untouched() {
    let page = with_fetch_har(Valued, config(false));
    let mut ctx = page_ctx();

    let props = page.initial_props(&mut ctx).await.unwrap().unwrap();
    assert_eq!(Value::Object(props.clone()), json!({ "value": 5 }));

    let html = page.render(&props, None);
    assert_eq!(html, "<h1>5</h1>");
    assert!(!html.contains("dialog"));
}

#[tokio::test]
async fn enabled_records_every_request() {
    let urls = vec!["http://x.test/one", "http://x.test/two?q=1"];
    let page = with_fetch_har(Fetching(urls), config(true));
    let mut ctx = page_ctx();

    let props = page.initial_props(&mut ctx).await.unwrap().unwrap();
    assert_eq!(props.len(), 1);

    let har = archive(&props);
    let urls: Vec<_> = har.entries().iter().map(|e| e.request.url.as_str()).collect();
    assert_eq!(urls, ["http://x.test/one", "http://x.test/two?q=1"]);
    assert_eq!(har.entries()[1].request.query_string[0].value, "1");
    assert_eq!(har.entries()[0].response.content.mime_type, "application/json");

    let html = page.render(&props, None);
    assert!(html.starts_with("<p>0 props</p>"));
    assert!(html.contains(r#"role="dialog""#));
    assert!(html.contains(r#"download="server-fetch.har""#));
    assert!(html.contains(">Hide</button>"));
}

#[tokio::test]
async fn download_link_carries_the_whole_archive() {
    let page = with_fetch_har(Fetching(vec!["http://x.test/one"]), config(true));
    let props = page.initial_props(&mut page_ctx()).await.unwrap().unwrap();

    let html = page.render(&props, None);
    let prefix = r#"href="data:application/json;base64,"#;
    let start = html.find(prefix).unwrap() + prefix.len();
    let encoded = &html[start..start + html[start..].find('"').unwrap()];

    let body = STANDARD.decode(encoded).unwrap();
    let downloaded: Har = serde_json::from_slice(&body).unwrap();
    assert_eq!(downloaded, archive(&props));
}

#[tokio::test]
async fn enabled_without_requests_attaches_empty_archive_and_no_notice() {
    let page = with_fetch_har(Valued, config(true));
    let mut ctx = page_ctx();

    let props = page.initial_props(&mut ctx).await.unwrap().unwrap();
    assert_eq!(props["value"], 5);
    assert!(archive(&props).is_empty());
    assert_eq!(page.render(&props, None), "<h1>5</h1>");
}

#[tokio::test]
async fn missing_hook_still_yields_props() {
    let page = with_fetch_har(NoHook, config(true));
    let mut ctx = page_ctx();

    let props = page.initial_props(&mut ctx).await.unwrap().unwrap();
    assert_eq!(props.len(), 1);
    assert!(archive(&props).is_empty());

    let off = with_fetch_har(NoHook, config(false));
    let props = off.initial_props(&mut page_ctx()).await.unwrap().unwrap();
    assert!(props.is_empty());
}

#[tokio::test]
async fn hook_failure_passes_through_unchanged() {
    let page = with_fetch_har(Failing, config(true));
    let mut ctx = page_ctx();

    let err = page.initial_props(&mut ctx).await.unwrap_err();
    assert!(err.downcast_ref::<Exploded>().is_some());
    assert_eq!(err.to_string(), "upstream exploded");
}

#[tokio::test]
async fn predicate_failure_aborts_before_install() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = FetchHarConfig::new(echo_fetcher(Arc::clone(&calls)))
        .enabled(Enabled::when(|_| Err("cannot decide".into())));
    let page = with_fetch_har(Fetching(vec!["http://x.test/"]), config);
    let mut ctx = page_ctx();

    let err = page.initial_props(&mut ctx).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Predicate(_))));
    assert!(ctx.page().fetcher().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn browser_context_gets_plain_fetcher() {
    let calls = Arc::new(AtomicUsize::new(0));
    let base = echo_fetcher(Arc::clone(&calls));
    let config = FetchHarConfig::new(base.clone()).enabled(true);
    let page = with_fetch_har(Fetching(vec!["http://x.test/"]), config);
    let browser = PageContext::new("/").with_environment(Environment::Browser);
    let mut ctx = InitialContext::Page(browser);

    let props = page.initial_props(&mut ctx).await.unwrap().unwrap();
    assert!(props.get(HAR_KEY).is_none());
    assert!(ctx.page().fetcher().unwrap().same_as(&base));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn predicate_decides_per_render() {
    let config = config(Enabled::when(|ctx| Ok(ctx.path.starts_with("/debug"))));
    let page = with_fetch_har(Fetching(vec!["http://x.test/"]), config);

    let mut plain = InitialContext::Page(PageContext::new("/shop"));
    assert!(page.initial_props(&mut plain).await.unwrap().unwrap().get(HAR_KEY).is_none());

    let mut debug = InitialContext::Page(PageContext::new("/debug/shop"));
    let props = page.initial_props(&mut debug).await.unwrap().unwrap();
    assert_eq!(archive(&props).entries().len(), 1);
}

#[tokio::test]
async fn app_context_is_normalized_to_the_page() {
    let app = with_fetch_har(DefaultApp, config(true));
    let mut ctx = InitialContext::App(AppContext {
        component: Arc::new(Fetching(vec!["http://x.test/a", "http://x.test/b"])),
        ctx: PageContext::new("/"),
    });

    let props = app.initial_props(&mut ctx).await.unwrap().unwrap();
    assert_eq!(props[PAGE_PROPS_KEY], json!({}));
    assert_eq!(archive(&props).entries().len(), 2);
    assert!(ctx.page().fetcher().is_some());

    let html = app.render(&props, Some(&Fetching(vec![])));
    assert!(html.starts_with("<p>0 props</p>"));
    assert!(html.contains(r#"role="dialog""#));
}

#[tokio::test]
async fn concurrent_requests_are_all_recorded() {
    struct Parallel;

    #[async_trait]
    impl Page for Parallel {
        fn name(&self) -> &str {
            "Parallel"
        }

        async fn initial_props(&self, ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
            let fetch = ctx.page().fetcher().cloned().ok_or("no fetcher")?;
            let mut tasks = tokio::task::JoinSet::new();
            for i in 0..8 {
                let fetch = fetch.clone();
                let req = FetchRequest::get(format!("http://x.test/{i}"));
                tasks.spawn(async move { fetch.fetch(req).await });
            }
            while let Some(res) = tasks.join_next().await {
                res??;
            }
            Ok(None)
        }

        fn render(&self, _props: &Props, _component: Option<&dyn Page>) -> String {
            String::new()
        }
    }

    let page = with_fetch_har(Parallel, config(true));
    let props = page.initial_props(&mut page_ctx()).await.unwrap().unwrap();

    let har = archive(&props);
    assert_eq!(har.entries().len(), 8);
    let mut urls: Vec<_> = har.entries().iter().map(|e| e.request.url.clone()).collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 8);
}

#[tokio::test(start_paused = true)]
async fn requests_finishing_after_the_hook_are_excluded() {
    struct Detached;

    #[async_trait]
    impl Page for Detached {
        fn name(&self) -> &str {
            "Detached"
        }

        async fn initial_props(&self, ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
            let fetch = ctx.page().fetcher().cloned().ok_or("no fetcher")?;
            fetch.fetch(FetchRequest::get("http://x.test/awaited")).await?;
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let _ = fetch.fetch(FetchRequest::get("http://x.test/late")).await;
            });
            Ok(None)
        }

        fn render(&self, _props: &Props, _component: Option<&dyn Page>) -> String {
            String::new()
        }
    }

    let page = with_fetch_har(Detached, config(true));
    let props = page.initial_props(&mut page_ctx()).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let har = archive(&props);
    assert_eq!(har.entries().len(), 1);
    assert_eq!(har.entries()[0].request.url, "http://x.test/awaited");
}

#[tokio::test]
async fn nested_wrappers_compose() {
    let inner = with_fetch_har(Valued, config(false));
    let outer = with_fetch_har(inner, config(true));
    assert_eq!(outer.name(), "with_fetch_har(with_fetch_har(Valued))");

    let props = outer.initial_props(&mut page_ctx()).await.unwrap().unwrap();
    assert_eq!(props["value"], 5);
    assert!(archive(&props).is_empty());
    assert_eq!(outer.render(&props, None), "<h1>5</h1>");
}

#[tokio::test]
async fn nested_enabled_wrappers_keep_every_entry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = with_fetch_har(
        Fetching(vec!["http://x.test/one", "http://x.test/two"]),
        FetchHarConfig::new(echo_fetcher(Arc::clone(&calls))).enabled(true),
    );
    let outer = with_fetch_har(inner, config(true));

    let props = outer.initial_props(&mut page_ctx()).await.unwrap().unwrap();
    let urls: Vec<_> = archive(&props).entries().iter().map(|e| e.request.url.clone()).collect();
    assert_eq!(urls, ["http://x.test/one", "http://x.test/two"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let html = outer.render(&props, None);
    assert_eq!(html.matches(r#"role="dialog""#).count(), 1);
}

#[tokio::test]
async fn disabled_inner_wrapper_keeps_the_outer_recorder() {
    let inner = with_fetch_har(Fetching(vec!["http://x.test/"]), config(false));
    let outer = with_fetch_har(inner, config(true));

    let props = outer.initial_props(&mut page_ctx()).await.unwrap().unwrap();
    assert_eq!(archive(&props).entries().len(), 1);
    assert!(outer.render(&props, None).contains(r#"role="dialog""#));
}

#[tokio::test]
async fn recorder_options_are_forwarded() {
    let creator = Creator { name: "storefront".into(), version: "9.9.9".into() };
    let config = config(true).recorder(RecorderOptions {
        page_ref: Some("page_home".into()),
        creator: Some(creator.clone()),
        ..Default::default()
    });
    let page = with_fetch_har(Fetching(vec!["http://x.test/"]), config);

    let props = page.initial_props(&mut page_ctx()).await.unwrap().unwrap();
    let har = archive(&props);
    assert_eq!(har.log.creator, creator);
    assert_eq!(har.entries()[0].pageref.as_deref(), Some("page_home"));
}

#[tokio::test]
async fn blank_page_ref_is_a_setup_error() {
    let config = config(true).recorder(RecorderOptions {
        page_ref: Some("  ".into()),
        ..Default::default()
    });
    let page = with_fetch_har(Fetching(vec![]), config);

    let err = page.initial_props(&mut page_ctx()).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Recorder(_))));
}

#[tokio::test]
async fn notice_hidden_when_artifacts_unavailable() {
    let config = config(true).artifacts(Arc::new(NoArtifacts));
    let page = with_fetch_har(Fetching(vec!["http://x.test/"]), config);

    let props = page.initial_props(&mut page_ctx()).await.unwrap().unwrap();
    assert_eq!(archive(&props).entries().len(), 1);
    assert_eq!(page.render(&props, None), "<p>0 props</p>");
}
