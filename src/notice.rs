//! The dismissible "server requests were recorded" notice.
//!
//! # States
//!
//! ```text
//! NotYetReady ──(archive has entries + artifact created)──▶ ReadyVisible
//!      │                                                        │
//!      └──────────────────(dismiss)──────────▶ Dismissed ◀──────┘
//! ```
//!
//! `Dismissed` is terminal. Only `ReadyVisible` renders anything.
//!
//! The download link points at an [`Artifact`]: a reference created by an
//! [`ArtifactStore`] from the archive's JSON. The artifact belongs to the
//! archive instance it was made from and is released when that archive is
//! superseded, when the notice is dismissed, and when the notice is dropped.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use tracing::debug;

use crate::error::Error;
use crate::har::Har;

/// Suggested filename of the downloaded archive.
pub const ARCHIVE_FILENAME: &str = "server-fetch.har";
pub const ARCHIVE_MEDIA_TYPE: &str = "application/json";

// ── Artifact stores ───────────────────────────────────────────────────────────

/// Creates and releases downloadable references.
pub trait ArtifactStore: Send + Sync {
    /// Returns a URL a download link can point at.
    fn create(&self, body: Bytes, media_type: &str) -> Result<String, Error>;

    /// Called exactly once for every URL returned by `create`.
    fn release(&self, url: &str);
}

/// Inlines the body into a `data:` URL. Nothing to release.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataUrlStore;

impl ArtifactStore for DataUrlStore {
    fn create(&self, body: Bytes, media_type: &str) -> Result<String, Error> {
        Ok(format!("data:{media_type};base64,{}", STANDARD.encode(&body)))
    }

    fn release(&self, _url: &str) {}
}

/// For environments that cannot create downloadable references.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoArtifacts;

impl ArtifactStore for NoArtifacts {
    fn create(&self, _body: Bytes, _media_type: &str) -> Result<String, Error> {
        Err(Error::Artifact("downloadable references are not supported here".to_owned()))
    }

    fn release(&self, _url: &str) {}
}

// ── Artifact ──────────────────────────────────────────────────────────────────

/// A created reference; released on drop.
pub struct Artifact {
    url: String,
    store: Arc<dyn ArtifactStore>,
}

impl Artifact {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        self.store.release(&self.url);
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact").field("url", &self.url).finish()
    }
}

fn materialize(store: &Arc<dyn ArtifactStore>, har: &Har) -> Option<Artifact> {
    if har.is_empty() {
        return None;
    }
    let body = match serde_json::to_vec(har) {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "archive not serializable, notice stays hidden");
            return None;
        }
    };
    match store.create(body.into(), ARCHIVE_MEDIA_TYPE) {
        Ok(url) => Some(Artifact { url, store: Arc::clone(store) }),
        Err(e) => {
            debug!(error = %e, "could not create archive download, notice stays hidden");
            None
        }
    }
}

// ── Notice ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeState {
    NotYetReady,
    ReadyVisible,
    Dismissed,
}

pub struct Notice {
    store: Arc<dyn ArtifactStore>,
    har: Option<Arc<Har>>,
    artifact: Option<Artifact>,
    dismissed: bool,
}

impl Notice {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store, har: None, artifact: None, dismissed: false }
    }

    /// Feeds the current archive. The same archive instance is a no-op; a
    /// different one releases the previous artifact first.
    pub fn update(&mut self, har: Option<Arc<Har>>) {
        let same = match (&self.har, &har) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }

        self.artifact = None;
        self.har = har;
        if !self.dismissed {
            self.artifact = self.har.as_deref().and_then(|har| materialize(&self.store, har));
        }
    }

    pub fn dismiss(&mut self) {
        self.dismissed = true;
        self.artifact = None;
    }

    pub fn state(&self) -> NoticeState {
        if self.dismissed {
            NoticeState::Dismissed
        } else if self.artifact.is_some() {
            NoticeState::ReadyVisible
        } else {
            NoticeState::NotYetReady
        }
    }

    pub fn download_url(&self) -> Option<&str> {
        self.artifact.as_ref().map(Artifact::url)
    }

    /// HTML for the dialog, or `None` unless ready and visible.
    pub fn render(&self) -> Option<String> {
        if self.state() != NoticeState::ReadyVisible {
            return None;
        }
        let url = escape_attr(self.download_url()?);
        Some(format!(
            concat!(
                r#"<div role="dialog" aria-label="Server HTTP Archive" style="{dialog}">"#,
                r#"<p style="{message}">Server-side requests were recorded in an HTTP Archive.</p>"#,
                r#"<div role="group" style="{group}">"#,
                r#"<a href="{url}" download="{file}" style="{button}">Download</a>"#,
                r#"<button type="button" onclick="this.closest('[role=dialog]').remove()" style="{button}">Hide</button>"#,
                r#"</div></div>"#,
            ),
            dialog = DIALOG_STYLE,
            message = MESSAGE_STYLE,
            group = GROUP_STYLE,
            button = BUTTON_STYLE,
            url = url,
            file = ARCHIVE_FILENAME,
        ))
    }
}

impl fmt::Debug for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notice")
            .field("state", &self.state())
            .field("artifact", &self.artifact)
            .finish()
    }
}

const DIALOG_STYLE: &str = "display:flex;flex-wrap:wrap;align-items:center;justify-content:center;\
padding:8px 0 0 0;font-family:sans-serif;font-size:13px;text-align:center;background:#feb;color:#000";
const MESSAGE_STYLE: &str = "margin:0;padding:0 8px 8px 8px;font-size:1em;line-height:1.385";
const GROUP_STYLE: &str = "display:flex;align-items:center;padding:0 0 8px 0";
const BUTTON_STYLE: &str = "display:inline-block;vertical-align:top;margin:0 3px;border:1px solid black;\
border-radius:3px;padding:3px 10px;font-size:11px;font-family:inherit;line-height:1;\
text-decoration:none;background:#111;color:#fff";

pub(crate) fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
