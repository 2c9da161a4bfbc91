//! Stayline persistence abstractions.
//!
//! This crate defines the storage contract shared by the approval engine:
//! - append-only, hash-linked audit history of applied operations
//! - published approval requests and the decisions recorded against them
//!
//! Design stance:
//! - SQLite is the durable source of truth for deployments that need one.
//! - The in-memory adapter is deterministic and carries the same semantics,
//!   so engine behavior does not depend on which backend is wired in.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
#[cfg(feature = "sqlite")]
pub mod sqlite;
mod traits;

pub use error::{StoreError, StoreResult};
pub use model::{AuditEntry, NewAuditEntry, RegistryEntry};
pub use traits::{ApprovalRegistry, AuditStore, QueryWindow, StaylineStore};
