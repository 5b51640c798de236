//! Infrastructure layer: storage boundaries, account locks, and the
//! transaction engine.

pub mod directory;
pub mod engine;
pub mod ledger_store;
pub mod locks;


pub use directory::{AccountDirectory, AccountRecord, DirectoryError, InMemoryDirectory};
pub use engine::{MovementDetail, TransactionEngine};
pub use ledger_store::{InMemoryLedgerStore, LedgerStore, LedgerStoreError, MovementWrite};
pub use locks::AccountLockTable;
