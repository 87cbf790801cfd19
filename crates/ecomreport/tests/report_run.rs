use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use ecomreport::catalogue::{StepId, catalogue};
use ecomreport::cli::commands::run::{execute_report, write_report_artifact};
use ecomreport::models::{OutputMode, REPORT_SCHEMA_VERSION, ReportEnvelope};
use ecomreport::store::{ensure_store_schema, open_store_read_only, open_store_read_write};
use rusqlite::{Connection, params};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{nanos}"))
}

fn seed_store(path: &Path) {
    let connection = open_store_read_write(path).expect("store should open read-write");
    ensure_store_schema(&connection).expect("store schema should be created");

    let customers = [("c-1", "campinas", "SP"), ("c-2", "niteroi", "RJ")];
    for (customer_id, city, state) in customers {
        connection
            .execute(
                "INSERT INTO customers (customer_id, customer_city, customer_state) VALUES (?1, ?2, ?3)",
                params![customer_id, city, state],
            )
            .expect("customer should insert");
    }
    connection
        .execute(
            "INSERT INTO sellers (seller_id) VALUES ('s-1'), ('s-2')",
            [],
        )
        .expect("sellers should insert");
    connection
        .execute(
            "INSERT INTO products (product_id, product_category) VALUES ('p-1', 'toys'), ('p-2', 'tools')",
            [],
        )
        .expect("products should insert");

    let orders = [
        ("o-1", "c-1", "2017-06-01 10:00:00", "p-1", "s-1", 20.0, 25.0, 2),
        ("o-2", "c-1", "2018-02-01 10:00:00", "p-2", "s-2", 40.0, 45.0, 1),
        ("o-3", "c-2", "2018-05-01 10:00:00", "p-1", "s-1", 20.0, 22.0, 0),
    ];
    for (order_id, customer_id, purchased_at, product_id, seller_id, price, payment, installments) in
        orders
    {
        connection
            .execute(
                "INSERT INTO orders (order_id, customer_id, order_purchase_timestamp) VALUES (?1, ?2, ?3)",
                params![order_id, customer_id, purchased_at],
            )
            .expect("order should insert");
        connection
            .execute(
                "INSERT INTO order_items (order_id, product_id, seller_id, price) VALUES (?1, ?2, ?3, ?4)",
                params![order_id, product_id, seller_id, price],
            )
            .expect("order item should insert");
        connection
            .execute(
                "INSERT INTO payments (order_id, payment_value, payment_installments) VALUES (?1, ?2, ?3)",
                params![order_id, payment, installments],
            )
            .expect("payment should insert");
    }
}

#[test]
fn full_run_produces_every_step_in_catalogue_order() {
    let temp = unique_temp_dir("ecomreport-full-run");
    let database = temp.join("store.sqlite");
    let charts_dir = temp.join("out").join("charts");
    seed_store(&database);

    let connection = open_store_read_only(&database).expect("store should open read-only");
    let mut seen = Vec::new();
    let envelope = execute_report(&connection, &[], Some(&charts_dir), "store.sqlite", |record| {
        seen.push(record.id.clone())
    })
    .expect("report should run");

    let expected = catalogue()
        .iter()
        .map(|descriptor| descriptor.id.as_str().to_string())
        .collect::<Vec<_>>();
    assert_eq!(envelope.steps.len(), 14);
    assert_eq!(seen, expected);
    assert_eq!(envelope.schema_version, REPORT_SCHEMA_VERSION);
    assert_eq!(envelope.database, "store.sqlite");

    for (record, descriptor) in envelope.steps.iter().zip(catalogue()) {
        assert_eq!(record.output.mode(), descriptor.mode, "step {}", record.id);
        assert_eq!(
            record.chart_path.is_some(),
            descriptor.mode == OutputMode::Chart,
            "step {}",
            record.id
        );
    }

    let svg_count = std::fs::read_dir(&charts_dir)
        .expect("charts dir should exist")
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "svg"))
        .count();
    assert_eq!(svg_count, 4);

    let svg = std::fs::read_to_string(charts_dir.join("customers-per-state.svg"))
        .expect("customers chart should be written");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Count of Customers by States"));
}

#[test]
fn selected_steps_keep_catalogue_order_and_skip_charts_without_dir() {
    let temp = unique_temp_dir("ecomreport-selected-run");
    let database = temp.join("store.sqlite");
    seed_store(&database);

    let connection = open_store_read_only(&database).expect("store should open read-only");
    let envelope = execute_report(
        &connection,
        &[StepId::TopCustomersPerYear, StepId::Orders2017],
        None,
        "store.sqlite",
        |_| {},
    )
    .expect("report should run");

    let ids = envelope
        .steps
        .iter()
        .map(|record| record.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["orders-2017", "top-customers-per-year"]);
    assert!(envelope.steps.iter().all(|record| record.chart_path.is_none()));

    let orders = envelope.step("orders-2017").expect("orders step should exist");
    assert_eq!(
        orders.output.scalar().expect("scalar output").value.as_i64(),
        Some(1)
    );
}

#[test]
fn report_artifact_round_trips_through_json() {
    let temp = unique_temp_dir("ecomreport-artifact");
    let database = temp.join("store.sqlite");
    seed_store(&database);

    let connection = open_store_read_only(&database).expect("store should open read-only");
    let envelope = execute_report(
        &connection,
        &[StepId::DistinctCities, StepId::InstallmentShare],
        None,
        "store.sqlite",
        |_| {},
    )
    .expect("report should run");

    let path = temp.join("out").join("report.json");
    write_report_artifact(&path, &envelope).expect("artifact should be written");

    let content = std::fs::read_to_string(&path).expect("artifact should be readable");
    let decoded: ReportEnvelope =
        serde_json::from_str(&content).expect("artifact should decode into an envelope");
    assert_eq!(decoded, envelope);
}

#[test]
fn first_failing_step_aborts_the_run() {
    let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
    let mut completed = 0usize;

    let error = execute_report(&connection, &[], None, ":memory:", |_| completed += 1)
        .expect_err("run without tables should fail");

    assert_eq!(completed, 0);
    assert!(
        format!("{error:#}").contains("step `distinct-cities` failed"),
        "unexpected error: {error:#}"
    );
}

#[test]
fn read_only_open_rejects_a_missing_store() {
    let temp = unique_temp_dir("ecomreport-missing-store");
    let error = open_store_read_only(&temp.join("absent.sqlite"))
        .expect_err("missing store should not be created");

    assert!(format!("{error:#}").contains("failed to open store database"));
    assert!(!temp.join("absent.sqlite").exists());
}
