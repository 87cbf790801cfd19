use ecomreport::catalogue::{StepId, basic, run_step};
use ecomreport::models::OutputMode;
use ecomreport::store::ensure_store_schema;
use ecomreport::table::Cell;
use rusqlite::{Connection, params};

fn fixture_store() -> Connection {
    let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
    ensure_store_schema(&connection).expect("store schema should be created");
    connection
}

fn insert_customer(connection: &Connection, customer_id: &str, city: &str, state: &str) {
    connection
        .execute(
            "INSERT INTO customers (customer_id, customer_city, customer_state) VALUES (?1, ?2, ?3)",
            params![customer_id, city, state],
        )
        .expect("customer should insert");
}

fn insert_order(connection: &Connection, order_id: &str, customer_id: &str, purchased_at: &str) {
    connection
        .execute(
            "INSERT INTO orders (order_id, customer_id, order_purchase_timestamp) VALUES (?1, ?2, ?3)",
            params![order_id, customer_id, purchased_at],
        )
        .expect("order should insert");
}

fn insert_payment(connection: &Connection, order_id: &str, value: f64, installments: i64) {
    connection
        .execute(
            "INSERT INTO payments (order_id, payment_value, payment_installments) VALUES (?1, ?2, ?3)",
            params![order_id, value, installments],
        )
        .expect("payment should insert");
}

fn insert_product(connection: &Connection, product_id: &str, category: &str) {
    connection
        .execute(
            "INSERT INTO products (product_id, product_category) VALUES (?1, ?2)",
            params![product_id, category],
        )
        .expect("product should insert");
}

#[test]
fn distinct_cities_returns_each_city_once() {
    let connection = fixture_store();
    insert_customer(&connection, "c-1", "A", "SP");
    insert_customer(&connection, "c-2", "B", "RJ");
    insert_customer(&connection, "c-3", "A", "SP");

    let output = basic::distinct_cities(&connection).expect("step should run");
    assert_eq!(output.mode(), OutputMode::Table);
    let table = output.table().expect("table output");
    assert_eq!(table.columns(), ["customer_city"]);
    assert_eq!(
        table.text_column("customer_city").expect("column"),
        vec!["A", "B"]
    );
}

#[test]
fn order_count_only_includes_purchases_inside_2017() {
    let connection = fixture_store();
    insert_order(&connection, "o-1", "c-1", "2016-12-31 23:59:59");
    insert_order(&connection, "o-2", "c-1", "2017-03-04 10:00:00");
    insert_order(&connection, "o-3", "c-2", "2017-12-31 23:59:59");
    insert_order(&connection, "o-4", "c-2", "2018-01-01 00:00:00");

    let output = run_step(&connection, StepId::Orders2017).expect("step should run");
    let scalar = output.scalar().expect("scalar output");
    assert_eq!(scalar.value, Cell::Integer(2));
    assert_eq!(
        output.render_text(10),
        "Number of orders placed in 2017: 2"
    );
}

#[test]
fn installment_share_counts_rows_with_at_least_one_installment() {
    let connection = fixture_store();
    for (index, installments) in [1, 2, 0, 3].into_iter().enumerate() {
        insert_payment(&connection, &format!("o-{index}"), 10.0, installments);
    }

    let output = basic::installment_share(&connection).expect("step should run");
    let value = output.scalar().expect("scalar output").value.as_f64();
    assert_eq!(value, Some(75.0));
    assert_eq!(
        output.render_text(10),
        "Percentage of orders paid in installments: 75.0"
    );
}

#[test]
fn installment_share_is_null_without_payments() {
    let connection = fixture_store();
    let output = basic::installment_share(&connection).expect("step should run");
    assert_eq!(output.scalar().expect("scalar output").value, Cell::Null);
}

#[test]
fn installment_share_rounds_to_three_places() {
    let connection = fixture_store();
    insert_payment(&connection, "o-1", 10.0, 1);
    insert_payment(&connection, "o-2", 10.0, 0);
    insert_payment(&connection, "o-3", 10.0, 0);

    let output = basic::installment_share(&connection).expect("step should run");
    let value = output.scalar().expect("scalar output").value.as_f64();
    assert_eq!(value, Some(33.333));
}

#[test]
fn products_are_counted_per_category() {
    let connection = fixture_store();
    insert_product(&connection, "p-1", "toys");
    insert_product(&connection, "p-2", "tools");
    insert_product(&connection, "p-3", "toys");

    let output = basic::products_per_category(&connection).expect("step should run");
    let table = output.table().expect("table output");
    assert_eq!(table.columns(), ["product_category", "number_of_products"]);
    assert_eq!(
        table.text_column("product_category").expect("column"),
        vec!["tools", "toys"]
    );
    assert_eq!(
        table.numeric_column("number_of_products").expect("column"),
        vec![Some(1.0), Some(2.0)]
    );
}

#[test]
fn customers_per_state_chart_is_sorted_descending() {
    let connection = fixture_store();
    insert_customer(&connection, "c-1", "x", "RJ");
    insert_customer(&connection, "c-2", "x", "SP");
    insert_customer(&connection, "c-3", "x", "SP");
    insert_customer(&connection, "c-4", "x", "SP");
    insert_customer(&connection, "c-5", "x", "MG");
    insert_customer(&connection, "c-6", "x", "MG");

    let output = basic::customers_per_state(&connection).expect("step should run");
    assert_eq!(output.mode(), OutputMode::Chart);
    let chart = output.chart().expect("chart output");
    assert_eq!(chart.title, "Count of Customers by States");
    assert_eq!(chart.categories, vec!["SP", "MG", "RJ"]);
    assert_eq!(chart.series[0].values, vec![3.0, 2.0, 1.0]);
    assert_eq!(chart.tick_rotation_degrees, 90);

    let table = output.table().expect("table output");
    assert_eq!(table.columns(), ["state", "customer_count"]);
}

#[test]
fn customers_per_state_ties_are_ordered_by_state() {
    let connection = fixture_store();
    for (index, state) in ["SP", "RJ", "AC", "MG", "SP"].into_iter().enumerate() {
        insert_customer(&connection, &format!("c-{index}"), "x", state);
    }

    let output = basic::customers_per_state(&connection).expect("step should run");
    let chart = output.chart().expect("chart output");
    assert_eq!(chart.categories, vec!["SP", "AC", "MG", "RJ"]);
    assert_eq!(chart.series[0].values, vec![2.0, 1.0, 1.0, 1.0]);
}
