use bytes::Bytes;
use futures_util::StreamExt;
use http::StatusCode;
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::config::HttpCfg;
use crate::error::{CoreResult, OrganizerError};
use crate::model::GatewayErrorBody;

/// A boxed stream of raw body chunks, transport errors already mapped.
pub type ByteStream =
    std::pin::Pin<Box<dyn futures_util::stream::Stream<Item = CoreResult<Bytes>> + Send>>;

/// Thin wrapper around reqwest::Client with defaults and helpers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(cfg: &HttpCfg) -> CoreResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(std::time::Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(std::time::Duration::from_millis(cfg.request_timeout_ms));
        if let Some(cap) = cfg.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(cap);
        }
        let inner = builder
            .build()
            .map_err(|e| OrganizerError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            user_agent: "prompt-organizer/0.1".to_string(),
        })
    }

    pub fn new_default() -> CoreResult<Self> {
        Self::new(&HttpCfg::default())
    }

    /// POST JSON and return the raw body as a chunk stream.
    ///
    /// Non-2xx statuses are mapped before any byte is yielded: 429 becomes
    /// `RateLimited`, 402 becomes `QuotaExceeded`, everything else becomes
    /// `Gateway` carrying the body's `error` field when it has one. A 2xx
    /// response that is not an event stream maps to `MissingBody`.
    pub async fn post_sse<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<ByteStream> {
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/event-stream");
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| OrganizerError::Transport(e.to_string()))?;

        let status = resp.status();
        let resp_headers = resp.headers().clone();
        if !status.is_success() {
            let ra = parse_retry_after(&resp_headers);
            let body = resp.text().await.unwrap_or_default();
            return Err(map_http_error(status, ra, &body));
        }
        if let Some(rid) = extract_request_id(&resp_headers) {
            debug!(request_id = %rid, "gateway accepted stream request");
        }
        if !is_event_stream(&resp_headers) {
            return Err(OrganizerError::MissingBody);
        }

        let stream = resp
            .bytes_stream()
            .map(|item| item.map_err(|e| OrganizerError::Transport(e.to_string())));
        Ok(Box::pin(stream))
    }

    pub async fn get_json<R: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> CoreResult<R> {
        let mut req = self.inner.get(url).header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| OrganizerError::Transport(e.to_string()))?;
        decode_json(resp).await
    }

    pub async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<R> {
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| OrganizerError::Transport(e.to_string()))?;
        decode_json(resp).await
    }

    pub async fn delete(&self, url: &str, headers: &[(&str, &str)]) -> CoreResult<()> {
        let mut req = self.inner.delete(url).header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| OrganizerError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let ra = parse_retry_after(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            return Err(map_http_error(status, ra, &body));
        }
        Ok(())
    }
}

async fn decode_json<R: DeserializeOwned>(resp: reqwest::Response) -> CoreResult<R> {
    let status = resp.status();
    if !status.is_success() {
        let ra = parse_retry_after(resp.headers());
        let body = resp.text().await.unwrap_or_default();
        return Err(map_http_error(status, ra, &body));
    }
    resp.json::<R>().await.map_err(|e| OrganizerError::Gateway {
        code: status.as_u16(),
        message: format!("json decode error: {e}"),
    })
}

fn is_event_stream(headers: &reqwest::header::HeaderMap) -> bool {
    headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("text/event-stream"))
        .unwrap_or(false)
}

fn extract_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    static CANDIDATES: [&str; 3] = ["x-request-id", "request-id", "x-cdn-request-id"];
    for k in CANDIDATES {
        if let Some(v) = headers.get(k)
            && let Ok(s) = v.to_str()
        {
            return Some(s.to_string());
        }
    }
    None
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    if let Some(v) = headers.get("retry-after")
        && let Ok(s) = v.to_str()
        && let Ok(secs) = s.trim().parse::<u64>()
    {
        return Some(secs);
    }
    // Non-numeric (HTTP-date) forms are ignored.
    None
}

fn map_http_error(status: StatusCode, retry_after: Option<u64>, body: &str) -> OrganizerError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => OrganizerError::RateLimited { retry_after },
        StatusCode::PAYMENT_REQUIRED => OrganizerError::QuotaExceeded,
        s => OrganizerError::Gateway {
            code: s.as_u16(),
            message: error_message(body),
        },
    }
}

/// Prefer the JSON `error` field the gateway uses; fall back to a truncated
/// body snippet.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<GatewayErrorBody>(body)
        && let Some(msg) = parsed.error
    {
        return msg;
    }
    truncate(body, 300)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        let mut t = s[..max].to_string();
        t.push_str("...");
        t
    } else {
        s.to_string()
    }
}
