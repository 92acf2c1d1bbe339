//! Order-fulfillment dashboard for food-stand events.
//!
//! Polls an order backend, aggregates ordered quantities per kitchen
//! counter, compares them with what the kitchen has cooked, and shows the
//! result in a terminal or a browser.

pub mod aggregator;
pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod journal;
pub mod model;
pub mod refresh;
pub mod runtime;
pub mod store;
pub mod web;
