pub mod config;
pub mod pay;
