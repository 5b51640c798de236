//! Ledger store boundary.
//!
//! The store holds the durable, ordered collection of movements. Writes go
//! through [`LedgerStore::apply`] as an all-or-nothing batch so a unit of
//! work never leaves a partial footprint; reads are a point lookup and a
//! participant query ordered by creation time descending.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, LedgerStoreError, MovementWrite};
