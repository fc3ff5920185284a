use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::purchase_record::non_blank;
use crate::error::ValidationError;
use crate::validate;

pub const DEFAULT_UNIT: &str = "unidade";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub price: Option<Decimal>,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub market_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductDraft {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub price: Option<Decimal>,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub market_id: Option<i64>,
}

impl Product {
    pub fn from_draft(draft: ProductDraft) -> Result<Self, ValidationError> {
        let user_id = validate::required_text(draft.user_id.as_deref(), "user_id")?;
        let name = validate::required_text(draft.name.as_deref(), "name")?;
        let category = validate::required_text(draft.category.as_deref(), "category")?;

        if draft.price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(ValidationError::NonPositivePrice);
        }
        let barcode = match non_blank(draft.barcode) {
            Some(raw) => Some(validate::validate_barcode(&raw)?),
            None => None,
        };

        Ok(Self {
            id: None,
            user_id,
            name,
            category,
            unit: non_blank(draft.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            price: draft.price.map(|p| p.normalize()),
            barcode,
            brand: non_blank(draft.brand),
            market_id: draft.market_id,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Cheapest registered offer for one product name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deal {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub market_id: Option<i64>,
    pub market_name: Option<String>,
    /// How many priced entries share this product name.
    pub offers: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DealFilter {
    pub category: Option<String>,
    pub market_id: Option<i64>,
    pub max_price: Option<Decimal>,
}
