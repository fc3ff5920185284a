use serde::{Deserialize, Serialize};

use super::purchase_record::non_blank;
use crate::error::ValidationError;
use crate::validate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Market {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: String,
    pub name: String,
    pub address: Option<String>,
    /// Digits only, checksum-valid.
    pub cnpj: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketDraft {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub cnpj: Option<String>,
}

impl Market {
    pub fn from_draft(draft: MarketDraft) -> Result<Self, ValidationError> {
        let user_id = validate::required_text(draft.user_id.as_deref(), "user_id")?;
        let name = validate::required_text(draft.name.as_deref(), "name")?;
        let cnpj = match non_blank(draft.cnpj) {
            Some(raw) => Some(validate::validate_cnpj(&raw)?),
            None => None,
        };

        Ok(Self {
            id: None,
            user_id,
            name,
            address: non_blank(draft.address),
            cnpj,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}
