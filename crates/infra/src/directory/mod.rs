//! Account directory boundary.
//!
//! The directory owns account balances. It is specified only at its
//! interface: lookup and atomic per-row balance adjustment that fails before
//! anything changes if the result would overdraw the account. The in-memory
//! implementation backs tests and single-process deployments.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryDirectory;
pub use r#trait::{AccountDirectory, AccountRecord, DirectoryError};
