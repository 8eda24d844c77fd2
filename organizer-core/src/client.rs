//! The one operation this crate exposes to applications: take free-form
//! text, stream the gateway's response, hand back the cleaned document.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CoreResult, OrganizerError};
use crate::http_client::HttpClient;
use crate::model::OrganizeRequest;
use crate::normalizer::clean_input;
use crate::pipeline::collect_stream;

pub struct Organizer {
    http: HttpClient,
    url: String,
    api_key: SecretString,
    idle_timeout: Option<Duration>,
}

impl Organizer {
    pub fn new(http: HttpClient, url: String, api_key: SecretString) -> Self {
        Self {
            http,
            url,
            api_key,
            idle_timeout: Some(Duration::from_millis(30_000)),
        }
    }

    /// Builds a client from config, reading the API key from the environment
    /// variable the config names. `idle_timeout_ms = 0` disables the idle
    /// watchdog and a stalled gateway will block until the request timeout.
    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        let key = std::env::var(&cfg.gateway.api_key_env).map_err(|_| {
            OrganizerError::Validation(format!(
                "environment variable {} is not set",
                cfg.gateway.api_key_env
            ))
        })?;
        let http = HttpClient::new(&cfg.http)?;
        let mut client = Self::new(http, cfg.gateway.url.clone(), SecretString::from(key));
        client.idle_timeout = match cfg.http.idle_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Ok(client)
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[cfg(test)]
    pub fn new_for_tests(url: String) -> Self {
        Self::new(
            HttpClient::new_default().unwrap(),
            url,
            SecretString::from("test-key".to_string()),
        )
    }

    /// Runs one organize request to completion and returns the sanitized
    /// output. See [`run_with`](Self::run_with) for the incremental variant.
    pub async fn run(&self, input: &str) -> CoreResult<String> {
        self.run_with(input, |_| {}).await
    }

    /// Like [`run`](Self::run), additionally invoking `on_partial` with the
    /// full accumulated text after every delta, so a UI can render progress
    /// as tokens arrive. Dropping the returned future cancels the transport
    /// read; whatever was already handed to `on_partial` stays valid.
    pub async fn run_with<F>(&self, input: &str, mut on_partial: F) -> CoreResult<String>
    where
        F: FnMut(&str),
    {
        let input = clean_input(input);
        if input.is_empty() {
            debug!("empty input after cleaning, skipping request");
            return Ok(String::new());
        }

        let body = OrganizeRequest { input };
        let auth = format!("Bearer {}", self.api_key.expose_secret());
        let headers: [(&str, &str); 1] = [("Authorization", &auth)];

        info!(url = %self.url, "starting organize stream");
        let stream = self.http.post_sse(&self.url, &body, &headers).await?;
        let output = collect_stream(stream, self.idle_timeout, &mut on_partial).await?;
        info!(chars = output.len(), "organize stream finished");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    const SSE_BODY: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n",
        "\n",
        "data: [DONE]\n"
    );

    fn organize_url(server: &MockServer) -> String {
        format!("{}/functions/v1/organize-prompt", server.base_url())
    }

    #[tokio::test]
    async fn run_returns_concatenated_deltas() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/functions/v1/organize-prompt")
                .header("Authorization", "Bearer test-key")
                .json_body(serde_json::json!({"input":"make me an app"}));
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(SSE_BODY);
        });

        let client = Organizer::new_for_tests(organize_url(&server));
        let out = client.run("  make me an app  ").await.unwrap();
        assert_eq!(out, "Hello world");
        m.assert();
    }

    #[tokio::test]
    async fn run_with_publishes_growing_partials() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/functions/v1/organize-prompt");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(SSE_BODY);
        });

        let client = Organizer::new_for_tests(organize_url(&server));
        let mut partials = Vec::new();
        let out = client
            .run_with("x", |p| partials.push(p.to_string()))
            .await
            .unwrap();
        assert_eq!(out, "Hello world");
        assert_eq!(partials, vec!["Hello", "Hello world"]);
    }

    #[tokio::test]
    async fn fenced_output_is_sanitized() {
        let server = MockServer::start();
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"```json\\n{\\\"a\\\":1}\\n```\"}}]}\n",
            "data: [DONE]\n"
        );
        let _m = server.mock(|when, then| {
            when.method(POST).path("/functions/v1/organize-prompt");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(body);
        });

        let client = Organizer::new_for_tests(organize_url(&server));
        assert_eq!(client.run("x").await.unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn empty_input_short_circuits_without_request() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST).path("/functions/v1/organize-prompt");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body("");
        });

        let client = Organizer::new_for_tests(organize_url(&server));
        assert_eq!(client.run("   \r\n ").await.unwrap(), "");
        m.assert_hits(0);
    }

    #[tokio::test]
    async fn rate_limit_is_distinct_and_keeps_no_final_output() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/functions/v1/organize-prompt");
            then.status(429).body("limit");
        });

        let client = Organizer::new_for_tests(organize_url(&server));
        let mut partials = Vec::new();
        let err = client
            .run_with("x", |p| partials.push(p.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizerError::RateLimited { .. }));
        assert!(partials.is_empty());
    }

    #[tokio::test]
    async fn quota_exhaustion_maps_to_quota_exceeded() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/functions/v1/organize-prompt");
            then.status(402)
                .body(r#"{"error":"Usage limit reached. Please add credits to continue."}"#);
        });

        let client = Organizer::new_for_tests(organize_url(&server));
        let err = client.run("x").await.unwrap_err();
        assert!(matches!(err, OrganizerError::QuotaExceeded));
    }

    #[tokio::test]
    async fn non_stream_response_is_missing_body() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/functions/v1/organize-prompt");
            then.status(200)
                .header("content-type", "application/json")
                .body("{}");
        });

        let client = Organizer::new_for_tests(organize_url(&server));
        let err = client.run("x").await.unwrap_err();
        assert!(matches!(err, OrganizerError::MissingBody));
    }
}
