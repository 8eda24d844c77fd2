//! PostgREST-style history backend (`prompt_history` table).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::HistoryCfg;
use crate::error::{CoreResult, OrganizerError};
use crate::http_client::HttpClient;
use crate::model::HistoryRecord;

use super::HistoryStore;

const TABLE: &str = "prompt_history";

pub struct RestHistory {
    http: HttpClient,
    base: String,
    api_key: SecretString,
    page_size: u32,
}

impl RestHistory {
    pub fn new(http: HttpClient, base: String, api_key: SecretString, page_size: u32) -> Self {
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            api_key,
            page_size,
        }
    }

    /// Builds a store from config, reading the API key from the environment
    /// variable the config names.
    pub fn from_config(http: HttpClient, cfg: &HistoryCfg) -> CoreResult<Self> {
        let key = std::env::var(&cfg.api_key_env).map_err(|_| {
            OrganizerError::Validation(format!("environment variable {} is not set", cfg.api_key_env))
        })?;
        Ok(Self::new(
            http,
            cfg.base_url.clone(),
            SecretString::from(key),
            cfg.page_size,
        ))
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("apikey".to_string(), self.api_key.expose_secret().to_string()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key.expose_secret()),
            ),
        ]
    }
}

#[derive(Serialize)]
struct NewRecord<'a> {
    input: &'a str,
    output: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

#[async_trait]
impl HistoryStore for RestHistory {
    async fn save(
        &self,
        input: &str,
        output: &str,
        user_id: Option<&str>,
    ) -> CoreResult<HistoryRecord> {
        let url = format!("{}/{}", self.base, TABLE);
        let owned = self.headers();
        let mut hdrs: Vec<(&str, &str)> = owned
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        hdrs.push(("Prefer", "return=representation"));

        let body = NewRecord {
            input,
            output,
            user_id,
        };
        let mut inserted: Vec<HistoryRecord> = self.http.post_json(&url, &body, &hdrs).await?;
        inserted.pop().ok_or_else(|| {
            OrganizerError::Other(anyhow::anyhow!("history insert returned no representation"))
        })
    }

    async fn recent(&self) -> CoreResult<Vec<HistoryRecord>> {
        let url = format!(
            "{}/{}?select=*&order=created_at.desc&limit={}",
            self.base, TABLE, self.page_size
        );
        let owned = self.headers();
        let hdrs: Vec<(&str, &str)> = owned
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.http.get_json(&url, &hdrs).await
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        // ids are uuids; anything else would corrupt the filter expression
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(OrganizerError::Validation(format!(
                "{id:?} is not a valid history record id"
            )));
        }
        let url = format!("{}/{}?id=eq.{}", self.base, TABLE, id);
        let owned = self.headers();
        let hdrs: Vec<(&str, &str)> = owned
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.http.delete(&url, &hdrs).await
    }
}
