//! Vendor clients built on the gateway core.
//!
//! Each client composes the same three pieces: a [`ServiceSpec`] plugged
//! into a lifecycle manager, a dispatcher with the vendor's direct-API
//! fallback, and the mock router wrapped around the whole entry point.
//! `github` is the representative implementation; the other vendors follow
//! the identical shape.
//!
//! [`ServiceSpec`]: crate::lifecycle::ServiceSpec

pub mod github;

pub use github::GithubClient;
