//! # Platform Contracts
//!
//! Shared vocabulary for every tier of the system: the closed error-kind
//! enumeration surfaced at service boundaries, the entity lifecycle status
//! carried by every persisted record, and the tagged [`Value`] type used for
//! SQL parameter binding and row reads.
//!
//! This crate sits at the bottom of the dependency graph so that platform and
//! feature crates can agree on these types without depending on each other.

mod error;
mod status;
mod value;

pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use status::{EntityStatus, LogSeverity};
pub use value::{value_map_from_json, value_map_to_json, Value, ValueMap};
