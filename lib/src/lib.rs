//! # Helpers for OSM Kubernetes charms
//!
//! This crate collects the pieces every OSM charm needs to turn its
//! configuration and relation data into a version 3 pod spec:
//!
//! - [`validator`] checks untyped configuration against a declared field table
//! - [`builder`] assembles containers, files, ingress resources and pod specs
//! - [`interfaces`] reads and publishes data on well known relations
//! - [`charm`] runs the reconcile pass against a [`host::Host`]

// See https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![forbid(unused_must_use)]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]

pub mod builder;
pub mod charm;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "internal-testing-api"))]
pub mod harness;
pub mod host;
pub mod interfaces;
pub mod pod_spec;
pub mod validator;

pub use error::{Error, Result};
