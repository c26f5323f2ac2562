#![deny(clippy::all)]

mod core;

pub mod api;

pub use vpnconf_domain as domain;

pub use crate::api::*;
