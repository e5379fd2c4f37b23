//! # fetch-har
//!
//! Records the HTTP calls a page makes while its initial data is loaded on the
//! server, and offers them as a downloadable HTTP Archive (HAR).
//!
//! Server-side requests never show up in the browser's network panel. Wrap a
//! page or application shell with [`with_fetch_har`] and every request its
//! data-loading hook issues through the context's fetcher lands in a HAR log;
//! the rendered page then carries a small notice with a **Download** link.
//!
//! ## The contract
//!
//! - The base fetcher is always injected explicitly. Nothing reads a global.
//! - Instrumentation is on outside production (`APP_ENV=production` turns it
//!   off), or per render through a predicate. Browser builds never record.
//! - The archive is sealed when the hook finishes: it holds every request that
//!   completed during the hook and nothing after.
//! - Hook failures pass through untouched. Notice failures just hide the
//!   notice.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fetch_har::fetch::HttpFetch;
//! use fetch_har::{App, DefaultApp, FetchHarConfig, Router, Server, with_fetch_har};
//! # use fetch_har::{Page, Props};
//! # struct Home;
//! # impl Page for Home {
//! #     fn name(&self) -> &str {
//! #         "Home"
//! #     }
//! #     fn render(&self, _: &Props, _: Option<&dyn Page>) -> String {
//! #         String::new()
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fetch_har::Error> {
//!     let config = FetchHarConfig::new(HttpFetch::new().into_fetcher());
//!     let app = App::new(Router::new().page("/", Home), with_fetch_har(DefaultApp, config));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//! ```

mod context;
mod error;
mod page;
mod response;
mod router;
mod server;

pub mod config;
pub mod fetch;
pub mod har;
pub mod logging;
pub mod notice;
pub mod recorder;
pub mod selector;
pub mod wrapper;

pub use config::{Mode, Settings};
pub use context::{AppContext, Environment, InitialContext, PageContext};
pub use error::{BoxError, Error};
pub use fetch::Fetcher;
pub use har::Har;
pub use notice::{Notice, NoticeState};
pub use page::{DefaultApp, PAGE_PROPS_KEY, Page, Props};
pub use recorder::{HarLog, RecorderOptions, with_har};
pub use response::{Response, ResponseBuilder};
pub use router::Router;
pub use selector::Enabled;
pub use server::{App, Server};
pub use wrapper::{FetchHarConfig, HAR_KEY, WithFetchHar, with_fetch_har};
