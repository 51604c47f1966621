//! Workflow config reads for clickdag.
//!
//! Provides the [`ConfigStore`] trait, the fixed denormalizing aggregation
//! in [`aggregation`], a [`MongoConfigStore`] backed by the MongoDB driver
//! and a [`MemoryConfigStore`] that evaluates the same join in process.

#![warn(clippy::pedantic)]

pub mod aggregation;
pub mod backend;
pub mod error;
pub mod memory;
pub mod mongo;

pub use backend::{ConfigCollection, ConfigStore, StoreSettings};
pub use error::StoreError;
pub use memory::MemoryConfigStore;
pub use mongo::MongoConfigStore;
