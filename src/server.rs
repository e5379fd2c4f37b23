//! Host server: renders pages through an application shell.
//!
//! For every request the server:
//! 1. Looks up the page for the path.
//! 2. Runs the shell's data-loading hook with an app-level context wrapping
//!    that page.
//! 3. Renders the shell, and embeds the final props as JSON in the document
//!    (`<script id="__PROPS__">`) for the client to pick up.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting connections, lets every
//! in-flight connection finish, then returns from [`Server::serve`].

use std::net::SocketAddr;
use std::sync::Arc;

use http::{Method, StatusCode};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::{AppContext, InitialContext, PageContext};
use crate::error::Error;
use crate::notice::escape_attr;
use crate::page::{Page, Props};
use crate::response::Response;
use crate::router::Router;

// ── App ───────────────────────────────────────────────────────────────────────

/// A router plus the application shell every page is rendered through.
pub struct App {
    router: Router,
    shell: Arc<dyn Page>,
}

impl App {
    pub fn new(router: Router, shell: impl Page) -> Self {
        Self { router, shell: Arc::new(shell) }
    }

    /// Renders the page at `path_and_query` (e.g. `/b?x=1`).
    ///
    /// `404` for unknown paths, `405` for anything but `GET`/`HEAD`, `500` when
    /// the shell's data-loading hook fails.
    pub async fn handle(
        &self,
        method: &Method,
        path_and_query: &str,
        headers: Vec<(String, String)>,
    ) -> Response {
        if method != Method::GET && method != Method::HEAD {
            return Response::status(StatusCode::METHOD_NOT_ALLOWED);
        }

        let (path, query) = path_and_query.split_once('?').unwrap_or((path_and_query, ""));
        let Some((page, params)) = self.router.lookup(path) else {
            return Response::status(StatusCode::NOT_FOUND);
        };

        let mut page_ctx = PageContext::new(path).with_query(
            url::form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
        );
        page_ctx.params = params;
        page_ctx.headers = headers;

        let mut ctx = InitialContext::App(AppContext {
            component: Arc::clone(&page),
            ctx: page_ctx,
        });
        let props = match self.shell.initial_props(&mut ctx).await {
            Ok(props) => props.unwrap_or_default(),
            Err(e) => {
                error!(%path, page = page.name(), error = %e, "initial props failed");
                return Response::status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let body = self.shell.render(&props, Some(page.as_ref()));
        match document(page.name(), &body, &props) {
            Ok(html) => Response::builder().header("cache-control", "no-store").html(html),
            Err(e) => {
                error!(%path, error = %e, "props not serializable");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// The full HTML document with props embedded for the client.
fn document(title: &str, body: &str, props: &Props) -> Result<String, serde_json::Error> {
    // `</script>` inside a JSON string must not close the tag.
    let data = serde_json::to_string(props)?.replace("</", "<\\/");
    Ok(format!(
        concat!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>",
            "<body><div id=\"__app\">{body}</div>",
            "<script id=\"__PROPS__\" type=\"application/json\">{data}</script>",
            "</body></html>",
        ),
        title = escape_attr(title),
        body = body,
        data = data,
    ))
}

// ── Server ────────────────────────────────────────────────────────────────────

pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` (`host:port`) when
    /// [`serve`](Server::serve) is called.
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse()
            .map_err(|e| Error::Config(format!("invalid socket address `{addr}`: {e}")))?;
        Ok(Self { addr })
    }

    /// Accepts connections and renders pages through `app` until a shutdown
    /// signal arrives and all in-flight requests are done.
    pub async fn serve(self, app: App) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let app = Arc::new(app);
        let mut connections = JoinSet::new();
        info!(addr = %self.addr, "fetch-har listening");

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(Arc::clone(&app), stream, peer));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(in_flight = connections.len(), "shutting down, draining connections");
        while connections.join_next().await.is_some() {}
        info!("fetch-har stopped");
        Ok(())
    }
}

/// Drives one HTTP/1 or HTTP/2 connection to completion.
async fn serve_connection(app: Arc<App>, stream: TcpStream, peer: SocketAddr) {
    let svc = service_fn(move |req| dispatch(Arc::clone(&app), req));
    let conn = ConnBuilder::new(TokioExecutor::new());
    if let Err(e) = conn.serve_connection(TokioIo::new(stream), svc).await {
        debug!(%peer, error = %e, "connection closed with error");
    }
}

/// Renders one request. Failures become status codes, so hyper never sees an
/// error.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>, std::convert::Infallible> {
    let path_and_query = req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| "/".to_owned());
    let headers = req.headers().iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();

    let response = app.handle(req.method(), &path_and_query, headers).await;
    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM or SIGINT (Ctrl-C); only Ctrl-C on non-Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
