use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::validate;

/// A stored purchase. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: String,
    pub amount: Decimal,
    pub category: String,
    /// Format: "YYYY-MM-DD"
    pub purchase_date: String,
    pub market: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// Incoming purchase payload, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseRecordDraft {
    pub user_id: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub purchase_date: Option<String>,
    pub market: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
}

impl PurchaseRecord {
    /// Validate a draft and normalize it into a record ready for storage.
    pub fn from_draft(draft: PurchaseRecordDraft, today: NaiveDate) -> Result<Self, ValidationError> {
        validate::validate_record(&draft)?;

        let user_id = draft
            .user_id
            .ok_or(ValidationError::MissingField("user_id"))?;
        let amount = draft.amount.ok_or(ValidationError::MissingField("amount"))?;
        let category = draft
            .category
            .ok_or(ValidationError::MissingField("category"))?;

        Ok(Self {
            id: None,
            user_id: user_id.trim().to_string(),
            amount: amount.normalize(),
            category: category.trim().to_string(),
            purchase_date: draft
                .purchase_date
                .unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
            market: non_blank(draft.market),
            description: non_blank(draft.description),
            source: non_blank(draft.source),
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// One (category, amount) pair as read back for spend aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpend {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSummary {
    pub total_spent: Decimal,
    pub category_totals: BTreeMap<String, Decimal>,
    pub transaction_count: usize,
    pub average_transaction: Decimal,
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
