//! Core domain + application logic for the WhatsApp to Telegram exporter.
//!
//! This crate is intentionally framework-agnostic. The WhatsApp transport and the
//! Telegram Bot API live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod destination;
pub mod domain;
pub mod errors;
pub mod exporter;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod pacing;
pub mod source;

pub use errors::{Error, Result, ValidationError};
