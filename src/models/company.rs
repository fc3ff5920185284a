use serde::Serialize;

/// Cached registry document for a CNPJ.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyCacheEntry {
    pub cnpj: String,
    pub data: serde_json::Value,
    /// RFC 3339 timestamp of the last refresh.
    pub updated_at: String,
}
