use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Error, Result};
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Value, json};

use crate::table::{Cell, LabeledTable};

pub const CUSTOMERS_TABLE: &str = "customers";
pub const ORDERS_TABLE: &str = "orders";
pub const ORDER_ITEMS_TABLE: &str = "order_items";
pub const PAYMENTS_TABLE: &str = "payments";
pub const PRODUCTS_TABLE: &str = "products";
pub const SELLERS_TABLE: &str = "sellers";

const CREATE_CUSTOMERS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    customer_id TEXT NOT NULL PRIMARY KEY,
    customer_city TEXT,
    customer_state TEXT
);
"#;

const CREATE_ORDERS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    order_id TEXT NOT NULL PRIMARY KEY,
    customer_id TEXT NOT NULL,
    order_purchase_timestamp TEXT NOT NULL
);
"#;

const CREATE_ORDER_ITEMS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS order_items (
    order_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    seller_id TEXT NOT NULL,
    price REAL NOT NULL
);
"#;

const CREATE_PAYMENTS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS payments (
    order_id TEXT NOT NULL,
    payment_value REAL NOT NULL,
    payment_installments INTEGER NOT NULL DEFAULT 1
);
"#;

const CREATE_PRODUCTS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    product_id TEXT NOT NULL PRIMARY KEY,
    product_category TEXT
);
"#;

const CREATE_SELLERS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sellers (
    seller_id TEXT NOT NULL PRIMARY KEY
);
"#;

const CREATE_INDEX_ORDERS_CUSTOMER_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_orders_customer_time
ON orders (customer_id, order_purchase_timestamp);
"#;

const CREATE_INDEX_ORDER_ITEMS_ORDER_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_order_items_order
ON order_items (order_id);
"#;

const CREATE_INDEX_PAYMENTS_ORDER_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_payments_order
ON payments (order_id);
"#;

#[must_use]
pub fn schema_statements() -> &'static [&'static str] {
    &[
        CREATE_CUSTOMERS_TABLE_SQL,
        CREATE_ORDERS_TABLE_SQL,
        CREATE_ORDER_ITEMS_TABLE_SQL,
        CREATE_PAYMENTS_TABLE_SQL,
        CREATE_PRODUCTS_TABLE_SQL,
        CREATE_SELLERS_TABLE_SQL,
        CREATE_INDEX_ORDERS_CUSTOMER_SQL,
        CREATE_INDEX_ORDER_ITEMS_ORDER_SQL,
        CREATE_INDEX_PAYMENTS_ORDER_SQL,
    ]
}

#[must_use]
pub fn create_schema_sql() -> String {
    schema_statements().join("\n")
}

/// Opens an existing store for reporting. Report steps never write, so the
/// handle is read-only and a missing file is an error rather than a fresh
/// empty database.
pub fn open_store_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open store database: {}", path.display()))
}

pub fn open_store_read_write(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create store parent directory: {}",
                parent.display()
            )
        })?;
    }

    Connection::open(path)
        .with_context(|| format!("failed to open store database: {}", path.display()))
}

pub fn ensure_store_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(&create_schema_sql())
        .context("failed to create store schema")
}

/// Runs one statement and collects every row, labeled by the statement's
/// projection names.
pub fn fetch_table(connection: &Connection, sql: &str) -> Result<LabeledTable> {
    let fetched = fetch_table_capped(connection, sql, usize::MAX)?;
    Ok(fetched.table)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTable {
    pub table: LabeledTable,
    pub truncated: bool,
}

pub fn fetch_table_capped(
    connection: &Connection,
    sql: &str,
    row_cap: usize,
) -> Result<FetchedTable> {
    let mut statement = connection
        .prepare(sql)
        .map_err(|error| Error::new(error).context("failed to prepare query"))?;
    let column_names = statement
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    let column_count = column_names.len();

    let mut table = LabeledTable::new(column_names);
    let mut truncated = false;
    let mut rows = statement
        .query([])
        .map_err(|error| Error::new(error).context("failed to execute query"))?;
    while let Some(row) = rows
        .next()
        .map_err(|error| Error::new(error).context("failed to fetch query row"))?
    {
        if table.len() >= row_cap {
            truncated = true;
            break;
        }

        let mut cells = Vec::with_capacity(column_count);
        for index in 0..column_count {
            let value = row
                .get::<usize, SqlValue>(index)
                .map_err(|error| Error::new(error).context("failed to decode query column"))?;
            cells.push(Cell::from(value));
        }
        table.push_row(cells)?;
    }

    Ok(FetchedTable { table, truncated })
}

#[derive(Debug, Clone)]
pub struct SqlGuardrailViolation {
    pub message: String,
    pub details: Value,
}

impl std::fmt::Display for SqlGuardrailViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sql guardrail violation: {}", self.message)
    }
}

impl std::error::Error for SqlGuardrailViolation {}

static MUTATING_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(insert|update|delete|create|alter|drop|replace|truncate|attach|detach|pragma|vacuum|reindex|analyze|begin|commit|rollback)\b",
    )
    .expect("mutating keyword pattern is valid")
});

static READ_ONLY_LEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(select|with|explain\s+(query\s+plan\s+)?select)\b")
        .expect("read-only leader pattern is valid")
});

/// Accepts exactly one `SELECT`, `WITH ... SELECT` or `EXPLAIN [QUERY PLAN]
/// SELECT` statement with no mutating keyword anywhere in it.
pub fn validate_read_only_sql(raw_sql: &str) -> std::result::Result<(), SqlGuardrailViolation> {
    let candidate = strip_trailing_semicolons(raw_sql);
    if candidate.is_empty() {
        return Err(guardrail_violation(
            "SQL query is empty; provide a SELECT/CTE/EXPLAIN-SELECT statement",
            json!({"reason": "empty_statement"}),
        ));
    }

    if candidate.contains(';') {
        return Err(guardrail_violation(
            "Multi-statement SQL is not allowed; submit exactly one read-only statement",
            json!({"reason": "multi_statement"}),
        ));
    }

    if let Some(found) = MUTATING_KEYWORD.find(candidate) {
        let keyword = found.as_str().to_ascii_lowercase();
        return Err(guardrail_violation(
            format!("Mutating SQL keyword `{keyword}` is not allowed"),
            json!({"reason": "mutating_statement", "detected_keyword": keyword}),
        ));
    }

    if !READ_ONLY_LEADER.is_match(candidate) {
        let leading_keyword = candidate
            .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
            .find(|token| !token.is_empty())
            .unwrap_or("unknown")
            .to_ascii_lowercase();
        return Err(guardrail_violation(
            "Only SELECT, WITH ... SELECT, and EXPLAIN ... SELECT statements are allowed",
            json!({"reason": "unsupported_statement", "leading_keyword": leading_keyword}),
        ));
    }

    Ok(())
}

fn strip_trailing_semicolons(raw_sql: &str) -> &str {
    let mut candidate = raw_sql.trim();
    while let Some(stripped) = candidate.strip_suffix(';') {
        candidate = stripped.trim_end();
    }
    candidate
}

fn guardrail_violation(message: impl Into<String>, details: Value) -> SqlGuardrailViolation {
    SqlGuardrailViolation {
        message: message.into(),
        details: json!({
            "allowed_forms": [
                "SELECT ...",
                "WITH ... SELECT ...",
                "EXPLAIN SELECT ...",
                "EXPLAIN QUERY PLAN SELECT ..."
            ],
            "guardrail": "read_only_sql_single_statement",
            "violation": details
        }),
    }
}
