//! Three pages behind an instrumented application shell.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example pages
//!
//! Then open:
//!   http://localhost:3000/     ← issues two requests, shows the HAR notice
//!   http://localhost:3000/b    ← no requests, value 5
//!   http://localhost:3000/c    ← no data-loading hook at all
//!
//! `APP_ENV=production` turns recording off. A settings file can be passed as
//! the first argument (see `fetch_har::config`).

use std::path::PathBuf;

use async_trait::async_trait;
use fetch_har::fetch::{FetchRequest, HttpFetch};
use fetch_har::{
    App, BoxError, DefaultApp, InitialContext, Page, Props, Router, Server, Settings, logging,
    with_fetch_har,
};
use http::Method;

#[tokio::main]
async fn main() -> Result<(), fetch_har::Error> {
    logging::init();

    let settings_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(settings_path.as_deref())?;

    // The only place a network-backed fetcher is chosen.
    let config = settings.fetch_har_config(HttpFetch::new().into_fetcher());

    let router = Router::new()
        .page("/",  HomePage)
        .page("/b", PageB)
        .page("/c", PageC);

    Server::bind(&settings.addr)?
        .serve(App::new(router, with_fetch_har(DefaultApp, config)))
        .await
}

const NAV: &str = r#"<nav><ul><li><a href="/b">Home</a></li><li><a href="/b">About</a></li><li><a href="/b">Products</a></li><li><a href="/c">Help</a></li></ul></nav>"#;

const INTROSPECTION: &str = "query IntrospectionQuery { __schema { queryType { name } mutationType { name } types { kind name } } }";

struct HomePage;

#[async_trait]
impl Page for HomePage {
    fn name(&self) -> &str {
        "HomePage"
    }

    async fn initial_props(&self, ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        let fetch = ctx.page().fetcher().cloned().ok_or("no fetcher installed")?;

        fetch.fetch(FetchRequest::get("https://postman-echo.com/get?foo1=bar1&foo2=bar2")).await?;

        let body = serde_json::to_vec(&serde_json::json!({ "query": INTROSPECTION }))?;
        let endpoint = "https://countries.trevorblades.com/graphql";
        fetch.fetch(FetchRequest::builder(Method::POST, endpoint).json(body)).await?;

        Ok(Some(Props::new()))
    }

    fn render(&self, _props: &Props, _component: Option<&dyn Page>) -> String {
        format!(
            r#"<main><header><h1>My Delightful, Debuggable Page</h1></header>{NAV}</main>"#
        )
    }
}

struct PageB;

#[async_trait]
impl Page for PageB {
    fn name(&self) -> &str {
        "PageB"
    }

    async fn initial_props(&self, _ctx: &mut InitialContext) -> Result<Option<Props>, BoxError> {
        let mut props = Props::new();
        props.insert("value".into(), 5.into());
        Ok(Some(props))
    }

    fn render(&self, props: &Props, _component: Option<&dyn Page>) -> String {
        let value = props.get("value").cloned().unwrap_or_default();
        format!(r#"<main><h1>Made it! {value}</h1><a href="/">Link to home page</a></main>"#)
    }
}

struct PageC;

impl Page for PageC {
    fn name(&self) -> &str {
        "PageC"
    }

    fn render(&self, _props: &Props, _component: Option<&dyn Page>) -> String {
        r#"<main><h1>No initial props!</h1><a href="/">Link to home page</a></main>"#.to_owned()
    }
}
