use anyhow::Result;
use rusqlite::Connection;

use crate::chart::BarChart;
use crate::models::{ScalarSummary, StepOutput};
use crate::store::fetch_table;

pub const SQL_DISTINCT_CITIES: &str = r#"
SELECT DISTINCT customer_city
FROM customers
ORDER BY customer_city
"#;

pub const SQL_ORDERS_IN_2017: &str = r#"
SELECT COUNT(order_id) AS order_count
FROM orders
WHERE date(order_purchase_timestamp) BETWEEN '2017-01-01' AND '2017-12-31'
"#;

pub const SQL_PRODUCTS_PER_CATEGORY: &str = r#"
SELECT product_category,
       COUNT(product_id) AS number_of_products
FROM products
GROUP BY product_category
ORDER BY product_category
"#;

// Every installment count >= 1 qualifies, including single payments.
pub const SQL_INSTALLMENT_SHARE: &str = r#"
SELECT ROUND(
           100.0 * SUM(CASE WHEN payment_installments >= 1 THEN 1 ELSE 0 END) / COUNT(*),
           3
       ) AS installment_share_pct
FROM payments
"#;

pub const SQL_CUSTOMERS_PER_STATE: &str = r#"
SELECT customer_state AS state,
       COUNT(customer_id) AS customer_count
FROM customers
GROUP BY customer_state
ORDER BY customer_state
"#;

pub fn distinct_cities(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_DISTINCT_CITIES)?;
    Ok(StepOutput::Table { table })
}

pub fn orders_in_year(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_ORDERS_IN_2017)?;
    Ok(StepOutput::Scalar {
        scalar: ScalarSummary::new("Number of orders placed in 2017", table.scalar()?.clone()),
    })
}

pub fn products_per_category(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_PRODUCTS_PER_CATEGORY)?;
    Ok(StepOutput::Table { table })
}

pub fn installment_share(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_INSTALLMENT_SHARE)?;
    Ok(StepOutput::Scalar {
        scalar: ScalarSummary::new(
            "Percentage of orders paid in installments",
            table.scalar()?.clone(),
        ),
    })
}

pub fn customers_per_state(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_CUSTOMERS_PER_STATE)?
        .sort_by_column("customer_count", true)?;
    let chart = BarChart::from_table(
        &table,
        "state",
        "customer_count",
        "Count of Customers by States",
        "states",
        "customer_count",
    )?
    .with_tick_rotation(90);
    Ok(StepOutput::Chart { table, chart })
}
