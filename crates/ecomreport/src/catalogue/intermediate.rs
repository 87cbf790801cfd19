use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::catalogue::TOP_SELLERS_CHARTED;
use crate::chart::BarChart;
use crate::models::{ScalarSummary, StepOutput};
use crate::store::fetch_table;
use crate::table::{Cell, LabeledTable};
use crate::utils::stats::pearson_correlation;
use crate::utils::time::{month_from_sql, month_position};

pub const SQL_ORDERS_PER_MONTH_2018: &str = r#"
SELECT strftime('%m', order_purchase_timestamp) AS month_number,
       COUNT(order_id) AS number_of_orders
FROM orders
WHERE date(order_purchase_timestamp) BETWEEN '2018-01-01' AND '2018-12-31'
GROUP BY month_number
"#;

pub const SQL_AVG_ITEMS_PER_ORDER_BY_CITY: &str = r#"
WITH count_of_orders AS (
    SELECT o.order_id,
           o.customer_id,
           COUNT(oi.order_id) AS order_count
    FROM orders o
    INNER JOIN order_items oi ON o.order_id = oi.order_id
    GROUP BY o.order_id, o.customer_id
)
SELECT c.customer_city,
       ROUND(AVG(co.order_count), 2) AS average_products
FROM customers c
JOIN count_of_orders co ON c.customer_id = co.customer_id
GROUP BY c.customer_city
ORDER BY average_products DESC, c.customer_city
"#;

// Payments join every item of their order, so an order with several items
// contributes its payment once per item.
pub const SQL_CATEGORY_REVENUE_SHARE: &str = r#"
SELECT UPPER(p.product_category) AS category,
       ROUND(
           SUM(pay.payment_value) * 100.0 / (SELECT SUM(payment_value) FROM payments),
           2
       ) AS sales_percentage
FROM products p
JOIN order_items oi ON p.product_id = oi.product_id
JOIN payments pay ON pay.order_id = oi.order_id
GROUP BY category
ORDER BY sales_percentage DESC, category
"#;

pub const SQL_CATEGORY_PRICE_VOLUME: &str = r#"
SELECT p.product_category,
       COUNT(oi.product_id) AS order_count,
       ROUND(AVG(oi.price), 2) AS price
FROM products p
JOIN order_items oi ON p.product_id = oi.product_id
GROUP BY p.product_category
ORDER BY p.product_category
"#;

pub const SQL_SELLER_REVENUE_RANK: &str = r#"
WITH total_revenue AS (
    SELECT s.seller_id,
           p.payment_value AS revenue
    FROM sellers s
    JOIN order_items oi ON s.seller_id = oi.seller_id
    JOIN payments p ON p.order_id = oi.order_id
)
SELECT seller_id,
       ROUND(SUM(revenue), 2) AS revenue,
       RANK() OVER (ORDER BY SUM(revenue) DESC) AS revenue_rank
FROM total_revenue
GROUP BY seller_id
ORDER BY revenue_rank, seller_id
"#;

/// Orders per month in 2018, relabeled with month names and placed in
/// calendar order. Months without orders are absent.
pub fn orders_per_month(connection: &Connection) -> Result<StepOutput> {
    let raw = fetch_table(connection, SQL_ORDERS_PER_MONTH_2018)?;
    let month_numbers = raw.text_column("month_number")?;
    let counts = raw.column("number_of_orders")?;

    let mut months = month_numbers
        .iter()
        .zip(counts)
        .map(|(number, count)| Ok((month_from_sql(number)?, count.clone())))
        .collect::<Result<Vec<_>>>()
        .context("failed to map month numbers onto calendar months")?;
    months.sort_by_key(|(month, _)| month_position(*month));

    let mut table = LabeledTable::new(["month", "number_of_orders"]);
    for (month, count) in months {
        table.push_row(vec![Cell::Text(month.to_string()), count])?;
    }

    let chart = BarChart::from_table(
        &table,
        "month",
        "number_of_orders",
        "Count of Orders by Months in 2018",
        "month",
        "Number of orders",
    )?
    .with_tick_rotation(45)
    .with_value_labels();
    Ok(StepOutput::Chart { table, chart })
}

pub fn avg_items_per_order_by_city(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_AVG_ITEMS_PER_ORDER_BY_CITY)?;
    Ok(StepOutput::Table { table })
}

pub fn category_revenue_share(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_CATEGORY_REVENUE_SHARE)?;
    Ok(StepOutput::Table { table })
}

/// Pearson correlation between per-category purchase count and average
/// price. Null when fewer than two categories have both values, or one of
/// the series is constant.
pub fn price_volume_correlation(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_CATEGORY_PRICE_VOLUME)?;
    let (counts, prices): (Vec<f64>, Vec<f64>) = table
        .numeric_column("order_count")?
        .into_iter()
        .zip(table.numeric_column("price")?)
        .filter_map(|(count, price)| Some((count?, price?)))
        .unzip();

    let value = pearson_correlation(&counts, &prices).map_or(Cell::Null, Cell::Real);
    Ok(StepOutput::Scalar {
        scalar: ScalarSummary::new("The correlation of number of products to price", value),
    })
}

/// Full seller ranking in the table; only the leading sellers are charted.
pub fn seller_revenue_rank(connection: &Connection) -> Result<StepOutput> {
    let table = fetch_table(connection, SQL_SELLER_REVENUE_RANK)?;
    let top = table.clone().head(TOP_SELLERS_CHARTED);
    let chart = BarChart::from_table(
        &top,
        "seller_id",
        "revenue",
        "Total Revenue Generated by top 5 sellers",
        "seller_id",
        "revenue",
    )?
    .with_tick_rotation(90);
    Ok(StepOutput::Chart { table, chart })
}
