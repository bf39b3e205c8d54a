//! # Event Bus
//!
//! Process-local, synchronous publish/subscribe of tagged domain events.
//!
//! The bus lets orthogonal concerns (cache invalidation, notifications,
//! projections) react to committed mutations without coupling the producing
//! service to them. Delivery is deliberately simple: subscribers run on the
//! publishing thread, in registration order, after the producing transaction
//! has committed. A panicking subscriber is logged and skipped; it never
//! aborts delivery to the rest.
//!
//! The bus is an owned value constructed once in the composition root and
//! shared by `Arc` — there is no global instance.

mod bus;
mod envelope;

pub use bus::{EventBus, SubscriberId};
pub use envelope::{DomainEvent, EventKind};
