//! Store Module
//!
//! In-memory key-value map, rebuilt from the transaction log at startup.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Many concurrent readers, one exclusive writer
//! - Notify the transaction logger after each client mutation
//! - Apply replayed events without producing new log entries
//!
//! ## Data Structure Choice
//! `HashMap` wrapped in a `parking_lot::RwLock`: the store never iterates in
//! key order, and the lock is held only for the map mutation itself.

mod table;

pub use table::Store;
