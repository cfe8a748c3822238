//! Store adapter implementations
//!
//! Concrete [`StoreAdapter`](bridge_traits::store::StoreAdapter) implementations
//! that live inside the library crate. Persistent hosts use
//! `bridge_desktop::SqliteRecordStore` instead.

pub mod memory;

pub use memory::MemoryStore;
