//! # Relation interfaces
//!
//! Each interface is a [`RelationProtocol`]: the fields it carries and
//! whether they live in unit or application data. Typed clients and servers
//! wrap the generic [`RelationClient`] and [`RelationServer`].

mod common;
pub mod kafka;
pub mod keystone;
pub mod prometheus;

pub use common::{RelationClient, RelationProtocol, RelationServer, Resolution};
