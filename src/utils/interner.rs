//! String Interner
//!
//! Process-wide interning of identity keys. Type descriptors compute a
//! structural key once at construction and keep only its [`Symbol`], so type
//! equality and hashing become integer comparisons.

use std::sync::LazyLock;

use lasso::{Key, Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// A compact interned-string identifier.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol if already present.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Small stable integer for a symbol, used to derive generated identifiers.
#[inline]
#[must_use]
pub fn ordinal(sym: Symbol) -> usize {
    sym.into_usize()
}
