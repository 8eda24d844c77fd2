use serde::{Deserialize, Serialize};

/// Body posted to the organize endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OrganizeRequest {
    pub input: String,
}

/// One saved organize run, as stored by the history collaborator.
/// `created_at` is whatever the store produced (RFC 3339 from a REST
/// backend, epoch milliseconds from the in-memory store).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: String,
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: String,
}

/// Error body a non-2xx gateway response may carry.
#[derive(Debug, Deserialize)]
pub struct GatewayErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
