//! Internal implementation modules for `vpnconf-core`.
//!
//! Most callers should go through `vpnconf_core::api` rather than importing
//! these modules directly.

pub mod access;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod effects;
pub mod identity;
pub mod import;
pub mod lifecycle;
pub mod service;
pub mod tooling;
