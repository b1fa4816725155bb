pub mod config;
pub mod crash;
pub mod reports;
