//! # proconnect-store
//!
//! Access to the realtime JSON tree behind the ProConnect marketplace.
//!
//! The client core only ever talks to the [`RealtimeStore`] trait.  Two
//! implementations ship here: [`RestStore`] for the hosted database (REST
//! requests plus server-sent event streams) and [`MemoryStore`], an
//! in-process tree with the same pruning and notification semantics.

pub mod memory;
pub mod path;
pub mod push_key;
pub mod rest;
pub mod sse;
pub mod store;
pub mod tree;

mod error;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use path::StorePath;
pub use push_key::PushKeyGenerator;
pub use rest::{RestConfig, RestStore};
pub use store::{ChangeEvent, RealtimeStore, Subscription, SubscriptionId};
