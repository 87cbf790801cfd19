#![forbid(unsafe_code)]

pub mod catalogue;
pub mod chart;
pub mod cli;
pub mod config;
pub mod models;
pub mod store;
pub mod table;
pub mod utils;

pub use cli::app::{Cli, Command};
