mod schema;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::models::*;

/// Storage collaborator used by the service layer.
///
/// Every method fails with an error carrying the backend's own message.
/// Empty results are empty collections, never errors.
pub(crate) trait Store {
    fn insert_purchase_record(&mut self, record: &PurchaseRecord) -> Result<PurchaseRecord>;
    /// Newest purchase first.
    fn fetch_purchase_records(&self, user_id: &str, limit: u32, offset: u32) -> Result<Vec<PurchaseRecord>>;
    /// `(category, amount)` of every purchase, optionally restricted to a `YYYY-MM` month.
    fn fetch_total_spent(&self, user_id: &str, month: Option<&str>) -> Result<Vec<CategorySpend>>;
    /// Budgets in storage order, optionally restricted to a `YYYY-MM` month.
    fn fetch_budgets(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>>;
    /// Insert or replace the limit for `(user, category, month)`.
    fn upsert_budget(&mut self, budget: &Budget) -> Result<Budget>;
    fn fetch_purchase_categories(&self, user_id: &str) -> Result<Vec<Category>>;
    fn seed_default_categories(&mut self, user_id: &str) -> Result<Vec<Category>>;
    fn insert_market(&mut self, market: &Market) -> Result<Market>;
    fn fetch_markets(&self, user_id: &str) -> Result<Vec<Market>>;
    fn insert_product(&mut self, product: &Product) -> Result<Product>;
    fn fetch_products(&self, user_id: &str) -> Result<Vec<Product>>;
    fn cached_company(&self, cnpj: &str) -> Result<Option<CompanyCacheEntry>>;
    fn store_company(&mut self, entry: &CompanyCacheEntry) -> Result<()>;
}

pub(crate) struct Database {
    conn: Connection,
}

const RECORD_COLUMNS: &str =
    "id, user_id, amount, category, purchase_date, market, description, source, created_at";
const PRODUCT_COLUMNS: &str =
    "id, user_id, name, category, unit, price, barcode, brand, market_id, created_at";

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        let current: i32 = if has_version_table {
            self.conn
                .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                    row.get(0)
                })
                .optional()?
                .unwrap_or(0)
        } else {
            // Fresh database: base schema, then every migration below
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn
                .execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
            1
        };

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
            log::debug!(
                "Migrated schema from version {current} to {}",
                schema::CURRENT_VERSION
            );
        }

        Ok(())
    }

    /// Every purchase of a user, oldest first, for CSV export.
    pub(crate) fn get_purchase_records_for_export(
        &self,
        user_id: &str,
        month: Option<&str>,
    ) -> Result<Vec<PurchaseRecord>> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM purchase_records WHERE user_id = ?1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(user_id.to_string())];
        if let Some(m) = month {
            sql.push_str(" AND purchase_date LIKE ?2");
            param_values.push(Box::new(format!("{m}%")));
        }
        sql.push_str(" ORDER BY purchase_date ASC, id ASC");

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), record_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn get_budget(&self, user_id: &str, category: &str, month: &str) -> Result<Budget> {
        Ok(self.conn.query_row(
            "SELECT id, user_id, category, month, limit_amount FROM budgets
             WHERE user_id = ?1 AND category = ?2 AND month = ?3",
            params![user_id, category, month],
            budget_from_row,
        )?)
    }
}

impl Store for Database {
    // ── Purchase records ──────────────────────────────────────

    fn insert_purchase_record(&mut self, record: &PurchaseRecord) -> Result<PurchaseRecord> {
        self.conn.execute(
            "INSERT INTO purchase_records (user_id, amount, category, purchase_date, market, description, source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.user_id,
                record.amount.to_string(),
                record.category,
                record.purchase_date,
                record.market,
                record.description,
                record.source,
                record.created_at,
            ],
        )?;
        Ok(PurchaseRecord {
            id: Some(self.conn.last_insert_rowid()),
            ..record.clone()
        })
    }

    fn fetch_purchase_records(&self, user_id: &str, limit: u32, offset: u32) -> Result<Vec<PurchaseRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM purchase_records
             WHERE user_id = ?1
             ORDER BY purchase_date DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(params![user_id, limit, offset], record_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn fetch_total_spent(&self, user_id: &str, month: Option<&str>) -> Result<Vec<CategorySpend>> {
        let mut sql = String::from("SELECT category, amount FROM purchase_records WHERE user_id = ?1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(user_id.to_string())];
        if let Some(m) = month {
            sql.push_str(" AND purchase_date LIKE ?2");
            param_values.push(Box::new(format!("{m}%")));
        }
        sql.push_str(" ORDER BY id");

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), |row| {
            Ok(CategorySpend {
                category: row.get(0)?,
                amount: decimal_column(row, 1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ── Budgets ───────────────────────────────────────────────

    fn fetch_budgets(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>> {
        let mut sql = String::from(
            "SELECT id, user_id, category, month, limit_amount FROM budgets WHERE user_id = ?1",
        );
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(user_id.to_string())];
        if let Some(m) = month {
            sql.push_str(" AND month = ?2");
            param_values.push(Box::new(m.to_string()));
        }
        sql.push_str(" ORDER BY id");

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), budget_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn upsert_budget(&mut self, budget: &Budget) -> Result<Budget> {
        self.conn.execute(
            "INSERT INTO budgets (user_id, category, month, limit_amount)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, category, month) DO UPDATE SET limit_amount = ?4",
            params![
                budget.user_id,
                budget.category,
                budget.month,
                budget.limit_amount.to_string(),
            ],
        )?;
        self.get_budget(&budget.user_id, &budget.category, &budget.month)
    }

    // ── Categories ────────────────────────────────────────────

    fn fetch_purchase_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, user_id, name FROM categories WHERE user_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                user_id: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn seed_default_categories(&mut self, user_id: &str) -> Result<Vec<Category>> {
        let tx = self.conn.transaction()?;
        for name in DEFAULT_CATEGORIES {
            tx.execute(
                "INSERT OR IGNORE INTO categories (user_id, name) VALUES (?1, ?2)",
                params![user_id, name],
            )?;
        }
        tx.commit()?;
        self.fetch_purchase_categories(user_id)
    }

    // ── Markets & products ────────────────────────────────────

    fn insert_market(&mut self, market: &Market) -> Result<Market> {
        self.conn.execute(
            "INSERT INTO markets (user_id, name, address, cnpj, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                market.user_id,
                market.name,
                market.address,
                market.cnpj,
                market.created_at,
            ],
        )?;
        Ok(Market {
            id: Some(self.conn.last_insert_rowid()),
            ..market.clone()
        })
    }

    fn fetch_markets(&self, user_id: &str) -> Result<Vec<Market>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, address, cnpj, created_at FROM markets
             WHERE user_id = ?1 ORDER BY name, id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Market {
                id: Some(row.get(0)?),
                user_id: row.get(1)?,
                name: row.get(2)?,
                address: row.get(3)?,
                cnpj: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn insert_product(&mut self, product: &Product) -> Result<Product> {
        self.conn.execute(
            "INSERT INTO products (user_id, name, category, unit, price, barcode, brand, market_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                product.user_id,
                product.name,
                product.category,
                product.unit,
                product.price.map(|p| p.to_string()),
                product.barcode,
                product.brand,
                product.market_id,
                product.created_at,
            ],
        )?;
        Ok(Product {
            id: Some(self.conn.last_insert_rowid()),
            ..product.clone()
        })
    }

    fn fetch_products(&self, user_id: &str) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = ?1 ORDER BY name, id"
        ))?;
        let rows = stmt.query_map(params![user_id], |row| {
            let price: Option<String> = row.get(5)?;
            Ok(Product {
                id: Some(row.get(0)?),
                user_id: row.get(1)?,
                name: row.get(2)?,
                category: row.get(3)?,
                unit: row.get(4)?,
                price: price.and_then(|p| Decimal::from_str(&p).ok()),
                barcode: row.get(6)?,
                brand: row.get(7)?,
                market_id: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ── Company cache ─────────────────────────────────────────

    fn cached_company(&self, cnpj: &str) -> Result<Option<CompanyCacheEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT cnpj, data, updated_at FROM company_cache WHERE cnpj = ?1",
                params![cnpj],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((cnpj, data, updated_at)) => Ok(Some(CompanyCacheEntry {
                data: serde_json::from_str(&data)
                    .with_context(|| format!("Corrupt cache entry for CNPJ {cnpj}"))?,
                cnpj,
                updated_at,
            })),
            None => Ok(None),
        }
    }

    fn store_company(&mut self, entry: &CompanyCacheEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO company_cache (cnpj, data, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(cnpj) DO UPDATE SET data = ?2, updated_at = ?3",
            params![entry.cnpj, entry.data.to_string(), entry.updated_at],
        )?;
        Ok(())
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<PurchaseRecord> {
    Ok(PurchaseRecord {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        amount: decimal_column(row, 2)?,
        category: row.get(3)?,
        purchase_date: row.get(4)?,
        market: row.get(5)?,
        description: row.get(6)?,
        source: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        category: row.get(2)?,
        month: row.get(3)?,
        limit_amount: decimal_column(row, 4)?,
    })
}

/// Amounts are stored as TEXT; an unreadable one fails the row instead of
/// counting as zero.
fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
