use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: String,
    pub category: String,
    /// Format: "YYYY-MM"
    pub month: String,
    #[serde(rename = "limit")]
    pub limit_amount: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetDraft {
    pub user_id: Option<String>,
    pub category: Option<String>,
    pub limit: Option<Decimal>,
    pub month: Option<String>,
}

impl Budget {
    pub fn new(user_id: String, category: String, month: String, limit_amount: Decimal) -> Self {
        Self {
            id: None,
            user_id,
            category,
            month,
            limit_amount,
        }
    }

    pub fn from_draft(draft: BudgetDraft, today: NaiveDate) -> Result<Self, ValidationError> {
        validate::validate_budget(&draft)?;

        let user_id = draft
            .user_id
            .ok_or(ValidationError::MissingField("user_id"))?;
        let category = draft
            .category
            .ok_or(ValidationError::MissingField("category"))?;
        let limit = draft.limit.ok_or(ValidationError::MissingField("limit"))?;
        let month = draft
            .month
            .unwrap_or_else(|| today.format("%Y-%m").to_string());

        Ok(Self::new(
            user_id.trim().to_string(),
            category.trim().to_string(),
            month,
            limit.normalize(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BudgetAlert {
    #[serde(rename = "near limit")]
    NearLimit,
    #[serde(rename = "limit exceeded")]
    LimitExceeded,
}

impl BudgetAlert {
    const NEAR_LIMIT_PERCENT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

    /// Alert for an unrounded percentage of the limit already spent.
    pub fn from_percentage(percentage: Decimal) -> Option<Self> {
        if percentage >= Decimal::ONE_HUNDRED {
            Some(Self::LimitExceeded)
        } else if percentage >= Self::NEAR_LIMIT_PERCENT {
            Some(Self::NearLimit)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NearLimit => "near limit",
            Self::LimitExceeded => "limit exceeded",
        }
    }
}

impl std::fmt::Display for BudgetAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived per-category view of a budget. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub category: String,
    pub limit: Decimal,
    pub spent: Decimal,
    pub percentage: Decimal,
    pub alert: Option<BudgetAlert>,
    pub remaining: Decimal,
}

impl BudgetStatus {
    /// A ratio too large for `Decimal` saturates at `Decimal::MAX`, which
    /// still reads as an exceeded limit.
    pub fn compute(category: String, limit: Decimal, spent: Decimal) -> Self {
        let percentage = if limit > Decimal::ZERO {
            spent
                .checked_div(limit)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::MAX)
        } else {
            Decimal::ZERO
        };

        Self {
            category,
            limit,
            spent,
            percentage: percentage
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
            alert: BudgetAlert::from_percentage(percentage),
            remaining: (limit - spent).max(Decimal::ZERO),
        }
    }

    /// Human-readable hint shown next to a budget bar.
    pub fn alert_message(&self) -> Option<String> {
        match self.alert? {
            BudgetAlert::LimitExceeded => Some(format!(
                "Limite excedido em {}",
                crate::format::format_brl(self.spent - self.limit)
            )),
            BudgetAlert::NearLimit => Some(format!(
                "Próximo do limite. Restam {}",
                crate::format::format_brl(self.remaining)
            )),
        }
    }
}
