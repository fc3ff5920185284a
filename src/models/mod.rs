mod budget;
mod category;
mod company;
mod market;
mod product;
mod purchase_record;

pub use budget::{Budget, BudgetAlert, BudgetDraft, BudgetStatus};
pub use category::{Category, DEFAULT_CATEGORIES};
pub use company::CompanyCacheEntry;
pub use market::{Market, MarketDraft};
pub use product::{Deal, DealFilter, Product, ProductDraft, DEFAULT_UNIT};
pub use purchase_record::{CategorySpend, PurchaseRecord, PurchaseRecordDraft, SpendingSummary};
