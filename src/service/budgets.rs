use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::db::Store;
use crate::error::AppResult;
use crate::models::{Budget, BudgetDraft, BudgetStatus};
use crate::validate;

/// Insert or replace the limit for `(user, category, month)`. Last write wins.
pub(crate) fn set_budget(store: &mut impl Store, draft: BudgetDraft) -> AppResult<Budget> {
    let budget = Budget::from_draft(draft, super::today())?;
    let stored = store.upsert_budget(&budget)?;
    log::info!(
        "Budget for {} / {} / {} set to {}",
        stored.user_id,
        stored.category,
        stored.month,
        stored.limit_amount
    );
    Ok(stored)
}

/// Join the user's budgets against what was spent per category.
///
/// One status per budget, in the order the store returned them. Spending in a
/// category without a budget is left out. With a `month`, both budgets and
/// purchases are restricted to it.
pub(crate) fn budget_status(
    store: &impl Store,
    user_id: &str,
    month: Option<&str>,
) -> AppResult<Vec<BudgetStatus>> {
    validate::require_user_id(user_id)?;
    if let Some(m) = month {
        validate::validate_month(m)?;
    }

    let budgets = store.fetch_budgets(user_id, month)?;
    let spent = store.fetch_total_spent(user_id, month)?;
    log::debug!(
        "Budget status for {user_id}: {} budgets, {} purchases",
        budgets.len(),
        spent.len()
    );

    let mut totals: HashMap<&str, Decimal> = HashMap::new();
    for rec in &spent {
        let total = totals.entry(rec.category.as_str()).or_default();
        *total = total.saturating_add(rec.amount);
    }

    Ok(budgets
        .into_iter()
        .map(|budget| {
            let spent_in_category = totals
                .get(budget.category.as_str())
                .copied()
                .unwrap_or_default();
            BudgetStatus::compute(budget.category, budget.limit_amount, spent_in_category)
        })
        .collect())
}
