//! hublink — Integration Gateway Core.
//!
//! Shared machinery under the per-vendor SaaS connectors:
//! - [`store`] — connection records and the corruption-safe credential store
//! - [`lifecycle`] — per-service lazy initialization state machine
//! - [`dispatch`] — worker-subprocess transport with direct-HTTP fallback
//! - [`mock`] — transparent deterministic mock routing
//! - [`clients`] — representative vendor client built on the above

pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod lifecycle;
pub mod mock;
pub mod models;
pub mod store;
