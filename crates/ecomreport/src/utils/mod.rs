pub mod stats;
pub mod time;
