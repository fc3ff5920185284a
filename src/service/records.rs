use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

use crate::db::Store;
use crate::error::AppResult;
use crate::models::{PurchaseRecord, PurchaseRecordDraft, SpendingSummary};
use crate::validate;

pub(crate) const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Validate, normalize and store one purchase. Storage errors pass through.
pub(crate) fn insert_purchase_record(
    store: &mut impl Store,
    draft: PurchaseRecordDraft,
) -> AppResult<PurchaseRecord> {
    let record = PurchaseRecord::from_draft(draft, super::today())?;
    let stored = store.insert_purchase_record(&record)?;
    log::info!(
        "Recorded purchase {} for {}: {} in {}",
        stored.id.unwrap_or_default(),
        stored.user_id,
        stored.amount,
        stored.category
    );
    Ok(stored)
}

pub(crate) fn purchase_records(
    store: &impl Store,
    user_id: &str,
    limit: u32,
    offset: i64,
) -> AppResult<Vec<PurchaseRecord>> {
    validate::require_user_id(user_id)?;
    validate::validate_page(limit, offset)?;
    let offset = u32::try_from(offset).unwrap_or(u32::MAX);
    Ok(store.fetch_purchase_records(user_id, limit, offset)?)
}

pub(crate) fn spending_summary(
    store: &impl Store,
    user_id: &str,
    month: Option<&str>,
) -> AppResult<SpendingSummary> {
    validate::require_user_id(user_id)?;
    if let Some(m) = month {
        validate::validate_month(m)?;
    }

    let spent = store.fetch_total_spent(user_id, month)?;
    let mut category_totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for rec in &spent {
        let total = category_totals.entry(rec.category.clone()).or_default();
        *total = total.saturating_add(rec.amount);
    }
    // Sums saturate at `Decimal::MAX` rather than overflow.
    let total_spent = spent
        .iter()
        .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.amount));
    let average_transaction = if spent.is_empty() {
        Decimal::ZERO
    } else {
        (total_spent / Decimal::from(spent.len()))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };

    Ok(SpendingSummary {
        total_spent,
        category_totals,
        transaction_count: spent.len(),
        average_transaction,
    })
}
