//! The fixed catalogue of analytical report steps.
//!
//! Every step is a pure function of the store connection: it issues its
//! statement, post-processes the rows, and returns a [`StepOutput`]. Steps
//! share nothing but the connection, so each one can be exercised alone
//! against a fixture database.

pub mod advanced;
pub mod basic;
pub mod intermediate;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::ValueEnum;
use rusqlite::Connection;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::{OutputMode, StepOutput};

/// Sellers drawn in the revenue chart; the table keeps the full ranking.
pub const TOP_SELLERS_CHARTED: usize = 5;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    DistinctCities,
    #[value(name = "orders-2017")]
    #[serde(rename = "orders-2017")]
    Orders2017,
    ProductsPerCategory,
    InstallmentShare,
    CustomersPerState,
    #[value(name = "orders-per-month-2018")]
    #[serde(rename = "orders-per-month-2018")]
    OrdersPerMonth2018,
    AvgItemsPerOrderByCity,
    CategoryRevenueShare,
    PriceVolumeCorrelation,
    SellerRevenueRank,
    CustomerPaymentMovingAverage,
    YearlySalesGrowth,
    SixMonthRetention,
    TopCustomersPerYear,
}

impl StepId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DistinctCities => "distinct-cities",
            Self::Orders2017 => "orders-2017",
            Self::ProductsPerCategory => "products-per-category",
            Self::InstallmentShare => "installment-share",
            Self::CustomersPerState => "customers-per-state",
            Self::OrdersPerMonth2018 => "orders-per-month-2018",
            Self::AvgItemsPerOrderByCity => "avg-items-per-order-by-city",
            Self::CategoryRevenueShare => "category-revenue-share",
            Self::PriceVolumeCorrelation => "price-volume-correlation",
            Self::SellerRevenueRank => "seller-revenue-rank",
            Self::CustomerPaymentMovingAverage => "customer-payment-moving-average",
            Self::YearlySalesGrowth => "yearly-sales-growth",
            Self::SixMonthRetention => "six-month-retention",
            Self::TopCustomersPerYear => "top-customers-per-year",
        }
    }
}

pub type StepFn = fn(&Connection) -> Result<StepOutput>;

#[derive(Debug, Clone, Copy)]
pub struct StepDescriptor {
    pub id: StepId,
    pub title: &'static str,
    pub mode: OutputMode,
    pub run: StepFn,
}

const CATALOGUE: &[StepDescriptor] = &[
    StepDescriptor {
        id: StepId::DistinctCities,
        title: "Unique cities where customers are located",
        mode: OutputMode::Table,
        run: basic::distinct_cities,
    },
    StepDescriptor {
        id: StepId::Orders2017,
        title: "Number of orders placed in 2017",
        mode: OutputMode::Scalar,
        run: basic::orders_in_year,
    },
    StepDescriptor {
        id: StepId::ProductsPerCategory,
        title: "Number of products per category",
        mode: OutputMode::Table,
        run: basic::products_per_category,
    },
    StepDescriptor {
        id: StepId::InstallmentShare,
        title: "Percentage of payments made in installments",
        mode: OutputMode::Scalar,
        run: basic::installment_share,
    },
    StepDescriptor {
        id: StepId::CustomersPerState,
        title: "Count of customers by state",
        mode: OutputMode::Chart,
        run: basic::customers_per_state,
    },
    StepDescriptor {
        id: StepId::OrdersPerMonth2018,
        title: "Count of orders by month in 2018",
        mode: OutputMode::Chart,
        run: intermediate::orders_per_month,
    },
    StepDescriptor {
        id: StepId::AvgItemsPerOrderByCity,
        title: "Average number of products per order by customer city",
        mode: OutputMode::Table,
        run: intermediate::avg_items_per_order_by_city,
    },
    StepDescriptor {
        id: StepId::CategoryRevenueShare,
        title: "Share of total revenue by product category",
        mode: OutputMode::Table,
        run: intermediate::category_revenue_share,
    },
    StepDescriptor {
        id: StepId::PriceVolumeCorrelation,
        title: "Correlation between product price and purchase count",
        mode: OutputMode::Scalar,
        run: intermediate::price_volume_correlation,
    },
    StepDescriptor {
        id: StepId::SellerRevenueRank,
        title: "Total revenue by seller, ranked",
        mode: OutputMode::Chart,
        run: intermediate::seller_revenue_rank,
    },
    StepDescriptor {
        id: StepId::CustomerPaymentMovingAverage,
        title: "Moving average of order value per customer",
        mode: OutputMode::Table,
        run: advanced::customer_payment_moving_average,
    },
    StepDescriptor {
        id: StepId::YearlySalesGrowth,
        title: "Year-over-year growth of total sales",
        mode: OutputMode::Table,
        run: advanced::yearly_sales_growth,
    },
    StepDescriptor {
        id: StepId::SixMonthRetention,
        title: "Customers purchasing again within 6 months of their first purchase",
        mode: OutputMode::Scalar,
        run: advanced::six_month_retention,
    },
    StepDescriptor {
        id: StepId::TopCustomersPerYear,
        title: "Top 3 customers by spend in each year",
        mode: OutputMode::Chart,
        run: advanced::top_customers_per_year,
    },
];

/// All steps in execution order.
#[must_use]
pub fn catalogue() -> &'static [StepDescriptor] {
    CATALOGUE
}

#[must_use]
pub fn descriptor(id: StepId) -> &'static StepDescriptor {
    CATALOGUE
        .iter()
        .find(|descriptor| descriptor.id == id)
        .unwrap_or_else(|| unreachable!("every step id has a catalogue entry"))
}

/// Catalogue entries for the requested ids, in catalogue order. An empty
/// selection means the whole catalogue.
#[must_use]
pub fn select(ids: &[StepId]) -> Vec<&'static StepDescriptor> {
    CATALOGUE
        .iter()
        .filter(|descriptor| ids.is_empty() || ids.contains(&descriptor.id))
        .collect()
}

pub fn run_step(connection: &Connection, id: StepId) -> Result<StepOutput> {
    (descriptor(id).run)(connection).with_context(|| format!("step `{}` failed", id.as_str()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedStep {
    pub output: StepOutput,
    pub duration_ms: u64,
}

pub fn run_step_timed(connection: &Connection, id: StepId) -> Result<TimedStep> {
    tracing::info!(step = id.as_str(), "step started");
    let started = Instant::now();
    let output = run_step(connection, id)?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        step = id.as_str(),
        mode = output.mode().as_str(),
        rows = output.row_count(),
        duration_ms,
        "step finished"
    );
    Ok(TimedStep {
        output,
        duration_ms,
    })
}
