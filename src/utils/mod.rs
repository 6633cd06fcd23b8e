//! Utility Module
//!
//! - [`interner`]: string interning for type identity keys. Interned strings
//!   ([`Symbol`]s) compare in O(1).

pub mod interner;

pub use interner::Symbol;
