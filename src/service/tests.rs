#![allow(clippy::unwrap_used)]

use super::*;
use super::company::CACHE_TTL_HOURS;
use crate::db::{Database, Store};
use crate::error::{AppError, ValidationError};
use crate::models::*;
use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Store whose every call fails the way a broken backend would.
struct FailingStore;

impl Store for FailingStore {
    fn insert_purchase_record(&mut self, _: &PurchaseRecord) -> Result<PurchaseRecord> {
        Err(anyhow!("connection refused"))
    }
    fn fetch_purchase_records(&self, _: &str, _: u32, _: u32) -> Result<Vec<PurchaseRecord>> {
        Err(anyhow!("connection refused"))
    }
    fn fetch_total_spent(&self, _: &str, _: Option<&str>) -> Result<Vec<CategorySpend>> {
        Err(anyhow!("connection refused"))
    }
    fn fetch_budgets(&self, _: &str, _: Option<&str>) -> Result<Vec<Budget>> {
        Err(anyhow!("connection refused"))
    }
    fn upsert_budget(&mut self, _: &Budget) -> Result<Budget> {
        Err(anyhow!("connection refused"))
    }
    fn fetch_purchase_categories(&self, _: &str) -> Result<Vec<Category>> {
        Err(anyhow!("connection refused"))
    }
    fn seed_default_categories(&mut self, _: &str) -> Result<Vec<Category>> {
        Err(anyhow!("connection refused"))
    }
    fn insert_market(&mut self, _: &Market) -> Result<Market> {
        Err(anyhow!("connection refused"))
    }
    fn fetch_markets(&self, _: &str) -> Result<Vec<Market>> {
        Err(anyhow!("connection refused"))
    }
    fn insert_product(&mut self, _: &Product) -> Result<Product> {
        Err(anyhow!("connection refused"))
    }
    fn fetch_products(&self, _: &str) -> Result<Vec<Product>> {
        Err(anyhow!("connection refused"))
    }
    fn cached_company(&self, _: &str) -> Result<Option<CompanyCacheEntry>> {
        Err(anyhow!("connection refused"))
    }
    fn store_company(&mut self, _: &CompanyCacheEntry) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
}

fn purchase(user_id: &str, amount: Decimal, category: &str) -> PurchaseRecordDraft {
    PurchaseRecordDraft {
        user_id: Some(user_id.into()),
        amount: Some(amount),
        category: Some(category.into()),
        ..Default::default()
    }
}

fn budget(user_id: &str, category: &str, limit: Decimal) -> BudgetDraft {
    BudgetDraft {
        user_id: Some(user_id.into()),
        category: Some(category.into()),
        limit: Some(limit),
        month: None,
    }
}

// ── Ingestion ─────────────────────────────────────────────────

#[test]
fn test_insert_normalizes_and_defaults() {
    let mut db = Database::open_in_memory().unwrap();
    let draft = PurchaseRecordDraft {
        market: Some("  Feira Livre ".into()),
        description: Some("   ".into()),
        ..purchase("alice", dec!(12.50), "  Padaria  ")
    };
    let stored = insert_purchase_record(&mut db, draft).unwrap();

    assert!(stored.id.is_some());
    assert_eq!(stored.category, "Padaria");
    assert_eq!(stored.amount, dec!(12.5));
    assert_eq!(stored.market.as_deref(), Some("Feira Livre"));
    assert_eq!(stored.description, None);
    assert_eq!(stored.purchase_date, today().format("%Y-%m-%d").to_string());
}

#[test]
fn test_insert_keeps_given_date() {
    let mut db = Database::open_in_memory().unwrap();
    let draft = PurchaseRecordDraft {
        purchase_date: Some("2024-03-09".into()),
        ..purchase("alice", dec!(1), "Bebidas")
    };
    let stored = insert_purchase_record(&mut db, draft).unwrap();
    assert_eq!(stored.purchase_date, "2024-03-09");
}

#[test]
fn test_insert_missing_user_id_touches_nothing() {
    let mut db = Database::open_in_memory().unwrap();
    let draft = PurchaseRecordDraft {
        user_id: None,
        ..purchase("alice", dec!(10), "food")
    };
    let err = insert_purchase_record(&mut db, draft).unwrap_err();
    assert_eq!(err.to_string(), "Missing field: user_id");
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::MissingField("user_id"))
    ));
}

#[test]
fn test_insert_rejects_non_positive_amount() {
    // Validation runs before storage: the failing store is never reached
    let err = insert_purchase_record(&mut FailingStore, purchase("alice", dec!(0), "food")).unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::NonPositiveAmount)
    ));
}

#[test]
fn test_insert_storage_error_passes_through() {
    let err = insert_purchase_record(&mut FailingStore, purchase("alice", dec!(5), "food")).unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
    assert_eq!(err.to_string(), "connection refused");
}

// ── Budget status ─────────────────────────────────────────────

#[test]
fn test_status_near_limit_scenario() {
    let mut db = Database::open_in_memory().unwrap();
    set_budget(&mut db, budget("alice", "food", dec!(100))).unwrap();
    insert_purchase_record(&mut db, purchase("alice", dec!(90), "food")).unwrap();

    let status = budget_status(&db, "alice", None).unwrap();
    assert_eq!(
        status,
        vec![BudgetStatus {
            category: "food".into(),
            limit: dec!(100),
            spent: dec!(90),
            percentage: dec!(90),
            alert: Some(BudgetAlert::NearLimit),
            remaining: dec!(10),
        }]
    );
}

#[test]
fn test_status_roundtrip_under_threshold() {
    let mut db = Database::open_in_memory().unwrap();
    set_budget(&mut db, budget("alice", "food", dec!(100))).unwrap();
    insert_purchase_record(&mut db, purchase("alice", dec!(40), "food")).unwrap();

    let status = budget_status(&db, "alice", None).unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].category, "food");
    assert_eq!(status[0].limit, dec!(100));
    assert_eq!(status[0].spent, dec!(40));
    assert_eq!(status[0].percentage, dec!(40));
    assert_eq!(status[0].alert, None);
}

#[test]
fn test_status_sums_per_category() {
    let mut db = Database::open_in_memory().unwrap();
    set_budget(&mut db, budget("alice", "food", dec!(50))).unwrap();
    for amount in [dec!(20), dec!(25), dec!(10)] {
        insert_purchase_record(&mut db, purchase("alice", amount, "food")).unwrap();
    }
    insert_purchase_record(&mut db, purchase("alice", dec!(999), "other")).unwrap();

    let status = budget_status(&db, "alice", None).unwrap();
    assert_eq!(status[0].spent, dec!(55));
    assert_eq!(status[0].percentage, dec!(110));
    assert_eq!(status[0].alert, Some(BudgetAlert::LimitExceeded));
    assert_eq!(status[0].remaining, dec!(0));
}

#[test]
fn test_status_excludes_unbudgeted_spending() {
    let mut db = Database::open_in_memory().unwrap();
    set_budget(&mut db, budget("alice", "food", dec!(100))).unwrap();
    insert_purchase_record(&mut db, purchase("alice", dec!(30), "drinks")).unwrap();

    let status = budget_status(&db, "alice", None).unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].category, "food");
    assert_eq!(status[0].spent, dec!(0));
    assert_eq!(status[0].percentage, dec!(0));
}

#[test]
fn test_status_keeps_store_order() {
    let mut db = Database::open_in_memory().unwrap();
    for cat in ["zeta", "alpha", "mid"] {
        set_budget(&mut db, budget("alice", cat, dec!(10))).unwrap();
    }
    let order: Vec<String> = budget_status(&db, "alice", None)
        .unwrap()
        .into_iter()
        .map(|s| s.category)
        .collect();
    assert_eq!(order, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_status_no_budgets_is_empty() {
    let mut db = Database::open_in_memory().unwrap();
    insert_purchase_record(&mut db, purchase("alice", dec!(30), "food")).unwrap();
    assert!(budget_status(&db, "alice", None).unwrap().is_empty());
}

#[test]
fn test_status_month_scope() {
    let mut db = Database::open_in_memory().unwrap();
    set_budget(
        &mut db,
        BudgetDraft {
            month: Some("2024-01".into()),
            ..budget("alice", "food", dec!(100))
        },
    )
    .unwrap();
    set_budget(
        &mut db,
        BudgetDraft {
            month: Some("2024-02".into()),
            ..budget("alice", "food", dec!(200))
        },
    )
    .unwrap();
    for (date, amount) in [("2024-01-05", dec!(30)), ("2024-02-10", dec!(50))] {
        insert_purchase_record(
            &mut db,
            PurchaseRecordDraft {
                purchase_date: Some(date.into()),
                ..purchase("alice", amount, "food")
            },
        )
        .unwrap();
    }

    let jan = budget_status(&db, "alice", Some("2024-01")).unwrap();
    assert_eq!(jan.len(), 1);
    assert_eq!(jan[0].limit, dec!(100));
    assert_eq!(jan[0].spent, dec!(30));

    let feb = budget_status(&db, "alice", Some("2024-02")).unwrap();
    assert_eq!(feb[0].spent, dec!(50));
    assert_eq!(feb[0].percentage, dec!(25));
}

#[test]
fn test_status_requires_user_id() {
    let db = Database::open_in_memory().unwrap();
    let err = budget_status(&db, "", None).unwrap_err();
    assert_eq!(err.to_string(), "User ID is required");
}

#[test]
fn test_status_storage_error_passes_through() {
    let err = budget_status(&FailingStore, "alice", None).unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
}

// ── Budget arithmetic ─────────────────────────────────────────

#[test]
fn test_zero_limit_percentage_is_zero() {
    let status = BudgetStatus::compute("food".into(), dec!(0), dec!(50));
    assert_eq!(status.percentage, Decimal::ZERO);
    assert_eq!(status.alert, None);
    assert_eq!(status.remaining, Decimal::ZERO);
}

#[test]
fn test_alert_boundaries() {
    let at_80 = BudgetStatus::compute("food".into(), dec!(100), dec!(80));
    assert_eq!(at_80.alert, Some(BudgetAlert::NearLimit));

    let just_under = BudgetStatus::compute("food".into(), dec!(100), dec!(79.99));
    assert_eq!(just_under.alert, None);

    let at_100 = BudgetStatus::compute("food".into(), dec!(100), dec!(100));
    assert_eq!(at_100.alert, Some(BudgetAlert::LimitExceeded));

    let near_100 = BudgetStatus::compute("food".into(), dec!(100), dec!(99.999));
    assert_eq!(near_100.alert, Some(BudgetAlert::NearLimit));
}

#[test]
fn test_alert_uses_unrounded_percentage() {
    // 79.996% rounds to 80.00 for display but is still under the threshold
    let status = BudgetStatus::compute("food".into(), dec!(100000), dec!(79996));
    assert_eq!(status.percentage, dec!(80));
    assert_eq!(status.alert, None);
}

#[test]
fn test_percentage_rounded_to_two_places() {
    let status = BudgetStatus::compute("food".into(), dec!(3), dec!(1));
    assert_eq!(status.percentage, dec!(33.33));
    assert_eq!(status.remaining, dec!(2));

    let midpoint = BudgetStatus::compute("food".into(), dec!(100), dec!(12.345));
    assert_eq!(midpoint.percentage, dec!(12.35));
}

#[test]
fn test_percentage_saturates_on_tiny_limit() {
    let status = BudgetStatus::compute("food".into(), dec!(0.0001), dec!(10000000000000000000000000));
    assert_eq!(status.alert, Some(BudgetAlert::LimitExceeded));
    assert_eq!(status.percentage, Decimal::MAX);
    assert_eq!(status.remaining, Decimal::ZERO);
}

#[test]
fn test_alert_messages() {
    let exceeded = BudgetStatus::compute("food".into(), dec!(100), dec!(130));
    assert_eq!(
        exceeded.alert_message().unwrap(),
        "Limite excedido em R$ 30,00"
    );
    let near = BudgetStatus::compute("food".into(), dec!(100), dec!(85));
    assert_eq!(
        near.alert_message().unwrap(),
        "Próximo do limite. Restam R$ 15,00"
    );
    let fine = BudgetStatus::compute("food".into(), dec!(100), dec!(10));
    assert!(fine.alert_message().is_none());
}

// ── Budget upsert ─────────────────────────────────────────────

#[test]
fn test_set_budget_twice_overwrites() {
    let mut db = Database::open_in_memory().unwrap();
    set_budget(&mut db, budget("alice", "food", dec!(100))).unwrap();
    let second = set_budget(&mut db, budget("alice", "food", dec!(300))).unwrap();
    assert_eq!(second.limit_amount, dec!(300));

    let status = budget_status(&db, "alice", None).unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].limit, dec!(300));
}

#[test]
fn test_set_budget_defaults_current_month() {
    let mut db = Database::open_in_memory().unwrap();
    let stored = set_budget(&mut db, budget("alice", " food ", dec!(100))).unwrap();
    assert_eq!(stored.month, today().format("%Y-%m").to_string());
    assert_eq!(stored.category, "food");
}

#[test]
fn test_set_budget_validation() {
    let mut db = Database::open_in_memory().unwrap();
    let err = set_budget(&mut db, budget("alice", "food", dec!(-5))).unwrap_err();
    assert_eq!(err.to_string(), "Budget limit must be greater than zero");

    let err = set_budget(
        &mut db,
        BudgetDraft {
            user_id: None,
            ..budget("alice", "food", dec!(5))
        },
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Missing field: user_id");
    assert!(db.fetch_budgets("alice", None).unwrap().is_empty());
}

// ── Categories ────────────────────────────────────────────────

#[test]
fn test_categories_seeded_once() {
    let mut db = Database::open_in_memory().unwrap();
    let first = purchase_categories(&mut db, "alice").unwrap();
    let second = purchase_categories(&mut db, "alice").unwrap();

    assert_eq!(first.len(), DEFAULT_CATEGORIES.len());
    assert_eq!(first, second);

    let names: Vec<&str> = first.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, DEFAULT_CATEGORIES);
}

#[test]
fn test_categories_existing_list_not_reseeded() {
    let mut db = Database::open_in_memory().unwrap();
    db.seed_default_categories("alice").unwrap();
    let count_before = db.fetch_purchase_categories("alice").unwrap().len();
    purchase_categories(&mut db, "alice").unwrap();
    assert_eq!(db.fetch_purchase_categories("alice").unwrap().len(), count_before);
}

#[test]
fn test_categories_storage_error() {
    let err = purchase_categories(&mut FailingStore, "alice").unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
}

// ── Listing & summary ─────────────────────────────────────────

#[test]
fn test_purchase_records_pagination_rules() {
    let mut db = Database::open_in_memory().unwrap();
    for i in 1..=3 {
        insert_purchase_record(&mut db, purchase("alice", Decimal::from(i), "food")).unwrap();
    }
    assert_eq!(purchase_records(&db, "alice", 2, 0).unwrap().len(), 2);
    assert_eq!(purchase_records(&db, "alice", DEFAULT_PAGE_LIMIT, 2).unwrap().len(), 1);

    let err = purchase_records(&db, "alice", 101, 0).unwrap_err();
    assert_eq!(err.to_string(), "Limit must be a number between 1 and 100");
    let err = purchase_records(&db, "alice", 10, -1).unwrap_err();
    assert_eq!(err.to_string(), "Offset must be a non-negative number");
    let err = purchase_records(&db, "", 10, 0).unwrap_err();
    assert_eq!(err.to_string(), "User ID is required");
}

#[test]
fn test_spending_summary() {
    let mut db = Database::open_in_memory().unwrap();
    insert_purchase_record(&mut db, purchase("alice", dec!(10), "food")).unwrap();
    insert_purchase_record(&mut db, purchase("alice", dec!(20), "food")).unwrap();
    insert_purchase_record(&mut db, purchase("alice", dec!(5), "drinks")).unwrap();

    let summary = spending_summary(&db, "alice", None).unwrap();
    assert_eq!(summary.total_spent, dec!(35));
    assert_eq!(summary.transaction_count, 3);
    assert_eq!(summary.average_transaction, dec!(11.67));
    assert_eq!(summary.category_totals["food"], dec!(30));
    assert_eq!(summary.category_totals["drinks"], dec!(5));
}

#[test]
fn test_huge_stored_amounts_saturate() {
    let mut db = Database::open_in_memory().unwrap();
    set_budget(&mut db, budget("alice", "food", dec!(100))).unwrap();
    for _ in 0..2 {
        db.insert_purchase_record(&PurchaseRecord {
            id: None,
            user_id: "alice".into(),
            amount: dec!(50000000000000000000000000000),
            category: "food".into(),
            purchase_date: "2024-03-01".into(),
            market: None,
            description: None,
            source: None,
            created_at: "2024-03-01T00:00:00Z".into(),
        })
        .unwrap();
    }

    let status = budget_status(&db, "alice", None).unwrap();
    assert_eq!(status[0].spent, Decimal::MAX);
    assert_eq!(status[0].alert, Some(BudgetAlert::LimitExceeded));

    let summary = spending_summary(&db, "alice", None).unwrap();
    assert_eq!(summary.total_spent, Decimal::MAX);
    assert_eq!(summary.category_totals["food"], Decimal::MAX);
    assert_eq!(summary.transaction_count, 2);
}

#[test]
fn test_insert_rejects_amount_above_cap() {
    let mut db = Database::open_in_memory().unwrap();
    let err = insert_purchase_record(&mut db, purchase("alice", dec!(50000000000000000000000000000), "food"))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ValidationError::AmountTooLarge)));
    assert!(db.fetch_purchase_records("alice", 10, 0).unwrap().is_empty());
}

#[test]
fn test_spending_summary_empty() {
    let db = Database::open_in_memory().unwrap();
    let summary = spending_summary(&db, "alice", None).unwrap();
    assert_eq!(summary.total_spent, Decimal::ZERO);
    assert_eq!(summary.transaction_count, 0);
    assert_eq!(summary.average_transaction, Decimal::ZERO);
    assert!(summary.category_totals.is_empty());
}

// ── Markets, products, deals ──────────────────────────────────

fn market(db: &mut Database, name: &str) -> i64 {
    create_market(
        db,
        MarketDraft {
            user_id: Some("alice".into()),
            name: Some(name.into()),
            ..Default::default()
        },
    )
    .unwrap()
    .id
    .unwrap()
}

fn product(db: &mut Database, name: &str, category: &str, price: Option<Decimal>, market_id: i64) {
    create_product(
        db,
        ProductDraft {
            user_id: Some("alice".into()),
            name: Some(name.into()),
            category: Some(category.into()),
            price,
            market_id: Some(market_id),
            ..Default::default()
        },
    )
    .unwrap();
}

#[test]
fn test_create_market_validates_cnpj() {
    let mut db = Database::open_in_memory().unwrap();
    let ok = create_market(
        &mut db,
        MarketDraft {
            user_id: Some("alice".into()),
            name: Some("Mercado Central".into()),
            address: Some("Rua A, 10".into()),
            cnpj: Some("11.222.333/0001-81".into()),
        },
    )
    .unwrap();
    assert_eq!(ok.cnpj.as_deref(), Some("11222333000181"));

    let err = create_market(
        &mut db,
        MarketDraft {
            user_id: Some("alice".into()),
            name: Some("Mercado Falso".into()),
            address: None,
            cnpj: Some("11.222.333/0001-82".into()),
        },
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid CNPJ: checksum is invalid");
    assert_eq!(list_markets(&db, "alice").unwrap().len(), 1);
}

#[test]
fn test_create_product_defaults_and_validation() {
    let mut db = Database::open_in_memory().unwrap();
    let stored = create_product(
        &mut db,
        ProductDraft {
            user_id: Some("alice".into()),
            name: Some("Feijão".into()),
            category: Some("Alimentação".into()),
            barcode: Some("7896006716112".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(stored.unit, DEFAULT_UNIT);
    assert_eq!(stored.price, None);

    let err = create_product(
        &mut db,
        ProductDraft {
            user_id: Some("alice".into()),
            name: Some("Feijão".into()),
            category: None,
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Missing field: category");

    let err = create_product(
        &mut db,
        ProductDraft {
            user_id: Some("alice".into()),
            name: Some("Feijão".into()),
            category: Some("Alimentação".into()),
            barcode: Some("123".into()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Barcode must be between 8 and 14 digits");
    assert_eq!(list_products(&db, "alice").unwrap().len(), 1);
}

#[test]
fn test_best_deals_picks_cheapest_market() {
    let mut db = Database::open_in_memory().unwrap();
    let central = market(&mut db, "Central");
    let bairro = market(&mut db, "Bairro");

    product(&mut db, "Arroz 5kg", "Alimentação", Some(dec!(27.90)), central);
    product(&mut db, "arroz 5kg", "Alimentação", Some(dec!(24.50)), bairro);
    product(&mut db, "Sabão", "Limpeza", Some(dec!(8)), central);
    product(&mut db, "Café", "Alimentação", None, central);

    let deals = best_deals(&db, "alice", &DealFilter::default()).unwrap();
    assert_eq!(deals.len(), 2);

    let arroz = &deals[0];
    assert_eq!(arroz.price, dec!(24.50));
    assert_eq!(arroz.market_id, Some(bairro));
    assert_eq!(arroz.market_name.as_deref(), Some("Bairro"));
    assert_eq!(arroz.offers, 2);

    assert_eq!(deals[1].name, "Sabão");
}

#[test]
fn test_best_deals_filters() {
    let mut db = Database::open_in_memory().unwrap();
    let central = market(&mut db, "Central");
    let bairro = market(&mut db, "Bairro");
    product(&mut db, "Arroz", "Alimentação", Some(dec!(27.90)), central);
    product(&mut db, "Arroz", "Alimentação", Some(dec!(24.50)), bairro);
    product(&mut db, "Sabão", "Limpeza", Some(dec!(8)), central);

    let only_central = best_deals(
        &db,
        "alice",
        &DealFilter {
            market_id: Some(central),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(only_central.len(), 2);
    assert_eq!(only_central[0].price, dec!(27.90));

    let cleaning = best_deals(
        &db,
        "alice",
        &DealFilter {
            category: Some("limpeza".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(cleaning.len(), 1);
    assert_eq!(cleaning[0].name, "Sabão");

    let cheap = best_deals(
        &db,
        "alice",
        &DealFilter {
            max_price: Some(dec!(10)),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(cheap.len(), 1);
    assert_eq!(cheap[0].name, "Sabão");
}

// ── Company cache ─────────────────────────────────────────────

#[test]
fn test_lookup_company_caches_for_a_day() {
    let mut db = Database::open_in_memory().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut calls = 0;

    let doc = lookup_company(&mut db, "11.222.333/0001-81", now, |cnpj| {
        calls += 1;
        Ok(serde_json::json!({ "cnpj": cnpj, "nome": "Mercado Central" }))
    })
    .unwrap();
    assert_eq!(doc["cnpj"], "11222333000181");

    let later = now + chrono::Duration::hours(CACHE_TTL_HOURS - 1);
    let cached = lookup_company(&mut db, "11222333000181", later, |_| {
        calls += 1;
        Ok(serde_json::json!({}))
    })
    .unwrap();
    assert_eq!(cached["nome"], "Mercado Central");
    assert_eq!(calls, 1);
}

#[test]
fn test_lookup_company_refreshes_stale_entry() {
    let mut db = Database::open_in_memory().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    lookup_company(&mut db, "11222333000181", now, |_| Ok(serde_json::json!({ "v": 1 }))).unwrap();

    let stale = now + chrono::Duration::hours(CACHE_TTL_HOURS);
    let refreshed =
        lookup_company(&mut db, "11222333000181", stale, |_| Ok(serde_json::json!({ "v": 2 }))).unwrap();
    assert_eq!(refreshed["v"], 2);

    let entry = db.cached_company("11222333000181").unwrap().unwrap();
    assert_eq!(entry.data["v"], 2);
}

#[test]
fn test_lookup_company_rejects_short_cnpj() {
    let mut db = Database::open_in_memory().unwrap();
    let err = lookup_company(&mut db, "1234", Utc::now(), |_| Ok(serde_json::json!({}))).unwrap_err();
    assert!(matches!(err, AppError::Validation(ValidationError::InvalidCnpj(_))));
}

#[test]
fn test_lookup_company_fetch_error_not_cached() {
    let mut db = Database::open_in_memory().unwrap();
    let err = lookup_company(&mut db, "11222333000181", Utc::now(), |_| {
        Err(anyhow!("registry unavailable"))
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "registry unavailable");
    assert!(db.cached_company("11222333000181").unwrap().is_none());
}
