//! Full request rendering through the host `App`.

use async_trait::async_trait;
use fetch_har::fetch::{FetchError, FetchRequest, FetchResponse};
use fetch_har::{
    App, BoxError, DefaultApp, FetchHarConfig, Fetcher, InitialContext, Page, Props, Router,
    with_fetch_har,
};
use http::{Method, StatusCode};

fn stub() -> Fetcher {
    Fetcher::new(|_req: FetchRequest| async move {
        Ok::<_, FetchError>(FetchResponse::new(200, "{}"))
    })
}

struct Home;

#[async_trait]
impl Page for Home {
    fn name(&self) -> &str {
        "Home"
    }

    async fn initial_props(&self, ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        let fetch = ctx.page().fetcher().cloned().ok_or("no fetcher")?;
        fetch.fetch(FetchRequest::get("https://postman-echo.com/get?foo1=bar1")).await?;
        let mut props = Props::new();
        let who = ctx.page().param("who").unwrap_or("you");
        props.insert("greeting".into(), format!("hello {who}").into());
        Ok(Some(props))
    }

    fn render(&self, props: &Props, _component: Option<&dyn Page>) -> String {
        format!("<h1>{}</h1>", props["greeting"].as_str().unwrap_or_default())
    }
}

struct Broken;

#[async_trait]
impl Page for Broken {
    fn name(&self) -> &str {
        "Broken"
    }

    async fn initial_props(&self, _ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        Err("database unavailable".into())
    }

    fn render(&self, _props: &Props, _component: Option<&dyn Page>) -> String {
        String::new()
    }
}

fn app(enabled: bool) -> App {
    let router = Router::new()
        .page("/", Home)
        .page("/hi/{who}", Home)
        .page("/broken", Broken);
    App::new(router, with_fetch_har(DefaultApp, FetchHarConfig::new(stub()).enabled(enabled)))
}

#[tokio::test]
async fn renders_page_notice_and_embedded_props() {
    let res = app(true).handle(&Method::GET, "/hi/ana?x=1", vec![]).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
    let html = res.text();
    assert!(html.contains("<h1>hello ana</h1>"));
    assert!(html.contains(r#"aria-label="Server HTTP Archive""#));
    assert!(html.contains(r#"<script id="__PROPS__" type="application/json">"#));
    assert!(html.contains(r#""pageProps":{"greeting":"hello ana"}"#));
    assert!(html.contains("postman-echo.com"));
}

#[tokio::test]
async fn disabled_app_renders_without_notice() {
    let html = app(false).handle(&Method::GET, "/", vec![]).await.text();

    assert!(html.contains("<h1>hello you</h1>"));
    assert!(!html.contains("role=\"dialog\""));
    assert!(!html.contains("\"har\""));
}

#[tokio::test]
async fn error_statuses() {
    let app = app(true);
    let status = |res: fetch_har::Response| res.status_code();

    let missing = app.handle(&Method::GET, "/nope", vec![]).await;
    assert_eq!(status(missing), StatusCode::NOT_FOUND);
    let posted = app.handle(&Method::POST, "/", vec![]).await;
    assert_eq!(status(posted), StatusCode::METHOD_NOT_ALLOWED);
    let broken = app.handle(&Method::GET, "/broken", vec![]).await;
    assert_eq!(status(broken), StatusCode::INTERNAL_SERVER_ERROR);
}
