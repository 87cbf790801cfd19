use anyhow::Result;
use rusqlite::Connection;

use crate::chart::BarChart;
use crate::models::{ScalarSummary, StepOutput};
use crate::store::fetch_table;

/// Trailing three-row window: the current payment and up to two before it.
pub const SQL_CUSTOMER_PAYMENT_MOVING_AVERAGE: &str = r#"
SELECT customer_id,
       order_purchase_timestamp,
       payment,
       AVG(payment) OVER (
           PARTITION BY customer_id
           ORDER BY order_purchase_timestamp, order_id, payment
           ROWS BETWEEN 2 PRECEDING AND CURRENT ROW
       ) AS mov_avg
FROM (
    SELECT o.customer_id,
           o.order_purchase_timestamp,
           p.order_id,
           p.payment_value AS payment
    FROM payments p
    JOIN orders o ON p.order_id = o.order_id
) AS customer_payments
ORDER BY customer_id, order_purchase_timestamp, order_id, payment
"#;

pub const SQL_YEARLY_SALES_GROWTH: &str = r#"
WITH yearly_sales AS (
    SELECT CAST(strftime('%Y', o.order_purchase_timestamp) AS INTEGER) AS years,
           ROUND(SUM(p.payment_value), 2) AS payment
    FROM orders o
    JOIN payments p ON o.order_id = p.order_id
    GROUP BY years
)
SELECT years AS year,
       ROUND(
           (payment - LAG(payment, 1) OVER (ORDER BY years)) * 100.0
               / LAG(payment, 1) OVER (ORDER BY years),
           2
       ) AS yoy_growth_pct
FROM yearly_sales
ORDER BY years
"#;

// A repeat purchase lies strictly after the first purchase and strictly
// before the first purchase plus six calendar months. `floor` clamps a
// month-end start to the last day of the target month.
pub const SQL_SIX_MONTH_RETENTION: &str = r#"
WITH first_orders AS (
    SELECT c.customer_id,
           MIN(datetime(o.order_purchase_timestamp)) AS first_order
    FROM customers c
    JOIN orders o ON c.customer_id = o.customer_id
    GROUP BY c.customer_id
),
repeat_customers AS (
    SELECT f.customer_id,
           COUNT(DISTINCT o.order_purchase_timestamp) AS next_orders
    FROM first_orders f
    JOIN orders o
      ON o.customer_id = f.customer_id
     AND datetime(o.order_purchase_timestamp) > f.first_order
     AND datetime(o.order_purchase_timestamp) < datetime(f.first_order, '+6 months', 'floor')
    GROUP BY f.customer_id
)
SELECT ROUND(
           100.0 * COUNT(DISTINCT r.customer_id) / COUNT(DISTINCT f.customer_id),
           2
       ) AS retention_rate_pct
FROM first_orders f
LEFT JOIN repeat_customers r ON f.customer_id = r.customer_id
"#;

pub const SQL_TOP_CUSTOMERS_PER_YEAR: &str = r#"
WITH yearly_customer_payments AS (
    SELECT CAST(strftime('%Y', o.order_purchase_timestamp) AS INTEGER) AS year,
           c.customer_id,
           ROUND(SUM(p.payment_value), 2) AS payment
    FROM customers c
    JOIN orders o ON c.customer_id = o.customer_id
    JOIN payments p ON o.order_id = p.order_id
    GROUP BY year, c.customer_id
),
ranked AS (
    SELECT year,
           customer_id,
           payment,
           DENSE_RANK() OVER (PARTITION BY year ORDER BY payment DESC) AS payment_rank
    FROM yearly_customer_payments
)
SELECT year, customer_id, payment, payment_rank
FROM ranked
WHERE payment_rank <= 3
ORDER BY year ASC, payment DESC, customer_id
"#;

pub fn customer_payment_moving_average(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_CUSTOMER_PAYMENT_MOVING_AVERAGE)?;
    Ok(StepOutput::Table { table })
}

/// Growth of each year's total against the previous year present in the
/// data. The earliest year has no predecessor and reports null.
pub fn yearly_sales_growth(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_YEARLY_SALES_GROWTH)?;
    Ok(StepOutput::Table { table })
}

pub fn six_month_retention(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_SIX_MONTH_RETENTION)?;
    Ok(StepOutput::Scalar {
        scalar: ScalarSummary::new(
            "Customers purchasing again within 6 months (%)",
            table.scalar()?.clone(),
        ),
    })
}

pub fn top_customers_per_year(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_TOP_CUSTOMERS_PER_YEAR)?;
    let chart = BarChart::grouped_from_table(
        &table,
        "customer_id",
        "year",
        "payment",
        "Top 3 Customers in each year",
        "customer_id",
        "payment",
    )?
    .with_tick_rotation(90);
    Ok(StepOutput::Chart { table, chart })
}
