//! Archive recorder.
//!
//! Two capabilities: create an empty log ([`HarLog::new`]) and wrap a fetcher
//! so every completed call is appended to that log ([`with_har`]).
//!
//! The log is shared behind an `Arc<Mutex<…>>`; the instrumented fetcher may
//! be cloned into concurrently running tasks, and entries land in completion
//! order. Once [`HarLog::finish`] seals the log, calls that complete later are
//! dropped instead of appended.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Error;
use crate::fetch::{FetchRequest, FetchResponse, Fetcher};
use crate::har::{self, Cache, Creator, Entry, Har, Header, PostData, QueryParam, Timings};

/// Callback invoked with every entry as it is recorded.
pub type EntryHook = Arc<dyn Fn(&Entry) + Send + Sync>;

/// Options forwarded verbatim from the wrapper configuration to the recorder.
#[derive(Clone, Default)]
pub struct RecorderOptions {
    /// Written into each entry's `pageref`.
    pub page_ref: Option<String>,
    /// Observes each entry right before it is appended.
    pub on_entry: Option<EntryHook>,
    /// Overrides the `log.creator` of archives created by the wrapper.
    pub creator: Option<Creator>,
}

impl fmt::Debug for RecorderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecorderOptions")
            .field("page_ref", &self.page_ref)
            .field("on_entry", &self.on_entry.as_ref().map(|_| ".."))
            .field("creator", &self.creator)
            .finish()
    }
}

// ── HarLog ────────────────────────────────────────────────────────────────────

/// A shared, append-only archive being filled by one render pass.
#[derive(Clone)]
pub struct HarLog {
    inner: Arc<Mutex<LogState>>,
}

struct LogState {
    har: Har,
    sealed: bool,
}

impl HarLog {
    pub fn new() -> Self {
        Self::with_creator(Creator::default())
    }

    pub fn with_creator(creator: Creator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogState { har: Har::empty(creator), sealed: false })),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().har.log.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.lock().sealed
    }

    /// Seals the log and returns the archive as recorded so far.
    ///
    /// Calling it again returns the same archive; nothing is appended after the
    /// first call.
    pub fn finish(&self) -> Har {
        let mut state = self.inner.lock();
        state.sealed = true;
        state.har.clone()
    }

    /// Returns `false` (and drops the entry) when the log is already sealed.
    fn push(&self, entry: Entry) -> bool {
        let mut state = self.inner.lock();
        if state.sealed {
            return false;
        }
        state.har.log.entries.push(entry);
        true
    }
}

impl Default for HarLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HarLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("HarLog")
            .field("entries", &state.har.log.entries.len())
            .field("sealed", &state.sealed)
            .finish()
    }
}

// ── with_har ──────────────────────────────────────────────────────────────────

/// Wraps `base` so every call that yields a response is recorded into `log`.
///
/// Calls that fail at the transport level produce no entry; the error is
/// returned to the caller unchanged.
pub fn with_har(base: Fetcher, log: &HarLog, options: RecorderOptions) -> Result<Fetcher, Error> {
    if log.is_sealed() {
        return Err(Error::Recorder("archive is already finalized".to_owned()));
    }
    if options.page_ref.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err(Error::Recorder("page_ref must not be blank".to_owned()));
    }

    let log = log.clone();
    let options = Arc::new(options);

    Ok(Fetcher::new(move |req: FetchRequest| {
        let base = base.clone();
        let log = log.clone();
        let options = Arc::clone(&options);
        async move {
            let started = Utc::now();
            let clock = Instant::now();
            let request = har_request(&req);

            let res = match base.fetch(req).await {
                Ok(res) => res,
                Err(e) => {
                    debug!(url = %request.url, error = %e, "fetch failed, nothing recorded");
                    return Err(e);
                }
            };

            let elapsed = clock.elapsed().as_secs_f64() * 1000.0;
            let entry = Entry {
                pageref: options.page_ref.clone(),
                started_date_time: started.to_rfc3339_opts(SecondsFormat::Millis, true),
                time: elapsed,
                request,
                response: har_response(&res),
                cache: Cache::default(),
                timings: Timings::waited(elapsed),
            };

            if let Some(hook) = &options.on_entry {
                hook(&entry);
            }
            let method = entry.request.method.clone();
            let url = entry.request.url.clone();
            let status = entry.response.status;
            if log.push(entry) {
                debug!(%method, %url, status, "recorded fetch");
            } else {
                debug!(%method, %url, "fetch completed after archive was finalized, dropped");
            }
            Ok(res)
        }
    }))
}

// ── Conversion into HAR records ───────────────────────────────────────────────

fn headers(pairs: &[(String, String)]) -> Vec<Header> {
    pairs.iter()
        .map(|(name, value)| Header { name: name.clone(), value: value.clone() })
        .collect()
}

fn query_string(raw: &str) -> Vec<QueryParam> {
    match url::Url::parse(raw) {
        Ok(url) => url.query_pairs()
            .map(|(name, value)| QueryParam { name: name.into_owned(), value: value.into_owned() })
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn har_request(req: &FetchRequest) -> har::Request {
    let post_data = (!req.body().is_empty()).then(|| PostData {
        mime_type: req.header("content-type").unwrap_or("application/octet-stream").to_owned(),
        text: String::from_utf8_lossy(req.body()).into_owned(),
    });

    har::Request {
        method: req.method().as_str().to_owned(),
        url: req.url().to_owned(),
        http_version: "HTTP/1.1".to_owned(),
        cookies: Vec::new(),
        headers: headers(req.headers()),
        query_string: query_string(req.url()),
        post_data,
        headers_size: -1,
        body_size: req.body().len() as i64,
    }
}

fn har_response(res: &FetchResponse) -> har::Response {
    let (text, encoding) = match std::str::from_utf8(res.body()) {
        Ok(s) => (s.to_owned(), None),
        Err(_) => (STANDARD.encode(res.body()), Some("base64".to_owned())),
    };

    har::Response {
        status: res.status(),
        status_text: res.status_text().to_owned(),
        http_version: res.http_version().to_owned(),
        cookies: Vec::new(),
        headers: headers(res.headers()),
        content: har::Content {
            size: res.body().len() as i64,
            mime_type: res.header("content-type").unwrap_or_default().to_owned(),
            text: Some(text),
            encoding,
        },
        redirect_url: res.header("location").unwrap_or_default().to_owned(),
        headers_size: -1,
        body_size: res.body().len() as i64,
    }
}
