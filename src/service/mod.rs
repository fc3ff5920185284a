//! Business rules over an injected [`Store`](crate::db::Store).

mod budgets;
mod catalog;
mod categories;
mod company;
mod records;

pub(crate) use budgets::{budget_status, set_budget};
pub(crate) use catalog::{best_deals, create_market, create_product, list_markets, list_products};
pub(crate) use categories::purchase_categories;
pub(crate) use company::lookup_company;
pub(crate) use records::{insert_purchase_record, purchase_records, spending_summary, DEFAULT_PAGE_LIMIT};

pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests;
