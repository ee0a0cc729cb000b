//! Parley core crate - shared error type and configuration.
//!
//! Every other Parley crate depends on this one for the top-level
//! [`error::CoreError`] and the TOML-backed [`config::ParleyConfig`].

pub mod config;
pub mod error;
