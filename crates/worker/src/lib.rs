//! Offline-caching worker runtime.
//!
//! This crate is the control layer sitting between the hosting application
//! and the network: every outbound resource request is classified, resolved
//! through a cache-first or network-first strategy against the versioned
//! store, and the install/activate lifecycle, control channel, and
//! notification triggers all share the same store.

pub mod classify;
pub mod control;
pub mod events;
pub mod lifecycle;
pub mod notify;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use classify::{Policy, Route, classify};
pub use control::{ControlChannel, ControlEnvelope, ControlMessage, ControlReply};
pub use events::{Event, Outcome};
pub use lifecycle::{LifecycleController, LifecycleState};
pub use notify::{Notification, NotificationBridge};
pub use strategy::{FetchOutcome, ResolvedResponse, ResponseSource, Strategies};
pub use worker::Worker;
