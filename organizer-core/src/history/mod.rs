//! Persistence collaborator for organize runs.
//!
//! Listings are newest-first and capped at the store's page size; the
//! streaming core does not depend on any of this.

pub mod rest;

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::model::HistoryRecord;

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save(
        &self,
        input: &str,
        output: &str,
        user_id: Option<&str>,
    ) -> CoreResult<HistoryRecord>;

    /// Most recent records first, at most one page.
    async fn recent(&self) -> CoreResult<Vec<HistoryRecord>>;

    async fn delete(&self, id: &str) -> CoreResult<()>;
}

/// In-process store. Default backend for the CLI when no REST history is
/// configured, and the stand-in for tests.
pub struct MemoryHistory {
    records: Mutex<Vec<HistoryRecord>>,
    page_size: usize,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            page_size,
        }
    }

    fn now_ms() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn save(
        &self,
        input: &str,
        output: &str,
        user_id: Option<&str>,
    ) -> CoreResult<HistoryRecord> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("history lock poisoned"))?;
        let record = HistoryRecord {
            id: format!("mem-{}", records.len() + 1),
            input: input.to_string(),
            output: output.to_string(),
            user_id: user_id.map(str::to_string),
            created_at: Self::now_ms().to_string(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn recent(&self) -> CoreResult<Vec<HistoryRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("history lock poisoned"))?;
        Ok(records.iter().rev().take(self.page_size).cloned().collect())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("history lock poisoned"))?;
        records.retain(|r| r.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recent_is_newest_first_and_capped() {
        let store = MemoryHistory::with_page_size(2);
        store.save("a", "1", None).await.unwrap();
        store.save("b", "2", None).await.unwrap();
        store.save("c", "3", Some("u1")).await.unwrap();

        let recent = store.recent().await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].input, "c");
        assert_eq!(recent[0].user_id.as_deref(), Some("u1"));
        assert_eq!(recent[1].input, "b");
    }

    #[tokio::test]
    async fn delete_removes_by_id() {
        let store = MemoryHistory::new();
        let kept = store.save("keep", "o", None).await.unwrap();
        let gone = store.save("drop", "o", None).await.unwrap();
        store.delete(&gone.id).await.unwrap();

        let recent = store.recent().await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, kept.id);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_a_noop() {
        let store = MemoryHistory::new();
        store.save("x", "y", None).await.unwrap();
        store.delete("missing").await.unwrap();
        assert_eq!(store.recent().await.unwrap().len(), 1);
    }
}
