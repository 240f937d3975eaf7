//! WhatsApp source client.
//!
//! The wire protocol lives behind [`connection::Connector`]; this crate owns the
//! connect/login/restore state machine and the persisted session blob.

pub mod client;
pub mod connection;
pub mod session;
pub mod web;

pub use client::WhatsAppClient;
pub use session::{Session, SessionStore};
pub use web::WebConnector;
