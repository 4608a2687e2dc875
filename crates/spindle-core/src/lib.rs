//! spindle-core
//!
//! Background-work building blocks for a multi-instance service.
//!
//! # Modules
//! - **domain**: ids, task types, pending tasks, work items, errors
//! - **ports**: lock store, pending-task store, broker, work records, clock, ids
//! - **lock**: distributed lock manager (acquire-or-renew, owner-checked release)
//! - **typed**: typed handler API and the handler registry
//! - **app**: poller, deferrer, dispatcher, exclusive scheduler, builder
//! - **impls**: in-memory ports for development and tests
//! - **config**: environment configuration
//! - **observability**: tick reports and status counts

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod lock;
pub mod observability;
pub mod ports;
pub mod typed;

#[cfg(test)]
mod test_support;

pub use self::app::{App, AppBuilder, AppPorts};
pub use self::config::SpindleConfig;
pub use self::domain::SpindleError;
pub use self::lock::LockManager;
