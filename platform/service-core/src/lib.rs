//! # Service Core
//!
//! The recipe every mutating feature operation follows:
//!
//! ```text
//! check_permission(...)?            // Forbidden on deny
//! validate inputs                   // InvalidInput / NotFound before any write
//! fetch old state (update/delete)
//! let ok = execute_transaction(|conn| { repository writes via conn; Ok(true) })?;
//! if ok { publish(event); record_audit(entry); }
//! ```
//!
//! Read operations reuse the permission check and skip the transaction,
//! audit, and event steps.
//!
//! [`ServiceContext`] bundles the four shared dependencies (authorization
//! engine, audit recorder, connection pool, event bus) plus the user
//! directory, replacing the service-base-class pattern: feature services hold
//! a context and their repositories, nothing more.

mod context;

pub use context::ServiceContext;
