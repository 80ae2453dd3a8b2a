pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod exchange;
pub mod models;
pub mod response;
#[cfg(test)]
pub mod test_helpers;
