pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS purchase_records (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        TEXT NOT NULL,
    amount         TEXT NOT NULL,
    category       TEXT NOT NULL,
    purchase_date  TEXT NOT NULL,
    market         TEXT,
    description    TEXT,
    source         TEXT,
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_purchase_records_user ON purchase_records(user_id);
CREATE INDEX IF NOT EXISTS idx_purchase_records_date ON purchase_records(purchase_date);

CREATE TABLE IF NOT EXISTS budgets (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id       TEXT NOT NULL,
    category      TEXT NOT NULL,
    month         TEXT NOT NULL,
    limit_amount  TEXT NOT NULL,
    UNIQUE(user_id, category, month)
);

CREATE TABLE IF NOT EXISTS categories (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id  TEXT NOT NULL,
    name     TEXT NOT NULL,
    UNIQUE(user_id, name)
);

"#;

/// Reference data: markets, products and the CNPJ lookup cache.
pub(crate) const SCHEMA_V2: &str = r#"
CREATE TABLE IF NOT EXISTS markets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     TEXT NOT NULL,
    name        TEXT NOT NULL,
    address     TEXT,
    cnpj        TEXT,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_markets_user ON markets(user_id);

CREATE TABLE IF NOT EXISTS products (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     TEXT NOT NULL,
    name        TEXT NOT NULL,
    category    TEXT NOT NULL,
    unit        TEXT NOT NULL DEFAULT 'unidade',
    price       TEXT,
    barcode     TEXT,
    brand       TEXT,
    market_id   INTEGER REFERENCES markets(id),
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_user ON products(user_id);

CREATE TABLE IF NOT EXISTS company_cache (
    cnpj        TEXT PRIMARY KEY,
    data        TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
"#;

pub(crate) const CURRENT_VERSION: i32 = 2;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[(1, SCHEMA_V2)];
