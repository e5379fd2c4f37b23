//! Network-backed base fetcher.
//!
//! This is what a host application injects as the base capability at its
//! outermost composition boundary. Nothing inside the crate falls back to it.

use super::{FetchError, FetchRequest, FetchResponse, Fetcher};

/// Issues requests over the network with a shared `reqwest` client.
#[derive(Clone, Debug, Default)]
pub struct HttpFetch {
    client: reqwest::Client,
}

impl HttpFetch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an already configured client (timeouts, proxies, TLS roots…).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn send(&self, req: FetchRequest) -> Result<FetchResponse, FetchError> {
        let mut builder = self.client.request(req.method.clone(), req.url.as_str());
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        let res = builder.send().await?;
        let status = res.status().as_u16();
        let http_version = format!("{:?}", res.version());
        let headers = res
            .headers()
            .iter()
            .map(|(k, v)| {
                let value = String::from_utf8_lossy(v.as_bytes()).into_owned();
                (k.as_str().to_owned(), value)
            })
            .collect();
        let body = res.bytes().await?;

        let mut out = FetchResponse::new(status, body).with_http_version(http_version);
        out.headers = headers;
        Ok(out)
    }

    pub fn into_fetcher(self) -> Fetcher {
        Fetcher::new(move |req: FetchRequest| {
            let http = self.clone();
            async move { http.send(req).await }
        })
    }
}
