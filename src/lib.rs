//! botdash: control and watch a trading bot.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod client;
pub mod cache;
