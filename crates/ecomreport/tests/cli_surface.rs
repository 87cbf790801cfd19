use std::path::Path;

use clap::Parser;
use ecomreport::catalogue::StepId;
use ecomreport::cli::app::{Cli, Command};

#[test]
fn parses_global_runtime_flags_for_run() {
    let cli = Cli::parse_from([
        "ecomreport",
        "--home-dir",
        "/home/tester",
        "--cwd",
        "/work/reports",
        "--out-dir",
        "/tmp/ecomreport-out",
        "--database",
        "/data/store.sqlite",
        "run",
    ]);

    assert_eq!(
        cli.runtime.home_dir.as_deref(),
        Some(Path::new("/home/tester"))
    );
    assert_eq!(cli.runtime.cwd.as_deref(), Some(Path::new("/work/reports")));
    assert_eq!(
        cli.runtime.out_dir.as_deref(),
        Some(Path::new("/tmp/ecomreport-out"))
    );
    assert_eq!(
        cli.runtime.database.as_deref(),
        Some(Path::new("/data/store.sqlite"))
    );

    match cli.command {
        Command::Run(args) => {
            assert!(args.steps.is_empty());
            assert!(!args.json);
            assert!(!args.no_charts);
            assert_eq!(args.preview_rows, 10);
        }
        other => panic!("expected run command, got {other:?}"),
    }
}

#[test]
fn parses_repeated_step_selection() {
    let cli = Cli::parse_from([
        "ecomreport",
        "run",
        "--step",
        "orders-per-month-2018",
        "--step",
        "orders-2017",
        "--step",
        "six-month-retention",
        "--json",
        "--no-charts",
        "--preview-rows",
        "3",
    ]);

    match cli.command {
        Command::Run(args) => {
            assert_eq!(
                args.steps,
                vec![
                    StepId::OrdersPerMonth2018,
                    StepId::Orders2017,
                    StepId::SixMonthRetention
                ]
            );
            assert!(args.json);
            assert!(args.no_charts);
            assert_eq!(args.preview_rows, 3);
        }
        other => panic!("expected run command, got {other:?}"),
    }
}

#[test]
fn rejects_unknown_step_ids() {
    let result = Cli::try_parse_from(["ecomreport", "run", "--step", "not-a-step"]);
    assert!(result.is_err());
}

#[test]
fn parses_sql_statement_and_row_cap() {
    let cli = Cli::parse_from([
        "ecomreport",
        "sql",
        "SELECT COUNT(*) FROM orders",
        "--row-cap",
        "25",
        "--json",
    ]);

    match cli.command {
        Command::Sql(args) => {
            assert_eq!(args.sql, "SELECT COUNT(*) FROM orders");
            assert_eq!(args.row_cap, 25);
            assert!(args.json);
        }
        other => panic!("expected sql command, got {other:?}"),
    }
}

#[test]
fn global_database_flag_is_accepted_after_the_subcommand() {
    let cli = Cli::parse_from(["ecomreport", "init", "--database", "store.sqlite"]);

    assert!(matches!(cli.command, Command::Init(_)));
    assert_eq!(
        cli.runtime.database.as_deref(),
        Some(Path::new("store.sqlite"))
    );
}

#[test]
fn parses_list_json_flag() {
    let cli = Cli::parse_from(["ecomreport", "list", "--json"]);

    match cli.command {
        Command::List(args) => assert!(args.json),
        other => panic!("expected list command, got {other:?}"),
    }
}
