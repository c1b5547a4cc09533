//! Interned identifiers used as parameter keys.

use rustc_hash::FxHashMap;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// An identifier naming a parameter or a registered generator.
///
/// Symbols compare and hash by their text, so a symbol built from the
/// same string anywhere else is an equal key. Cloning is a reference
/// count bump.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// Hands out one shared allocation per distinct identifier.
#[derive(Debug, Default)]
pub struct Interner {
    symbols: FxHashMap<Arc<str>, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(symbol) = self.symbols.get(name) {
            return symbol.clone();
        }
        let symbol = Symbol::new(name);
        self.symbols.insert(Arc::clone(&symbol.0), symbol.clone());
        symbol
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_symbols_share_allocation() {
        let mut interner = Interner::new();
        let a = interner.intern("name");
        let b = interner.intern("name");
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn symbols_compare_by_text() {
        let mut interner = Interner::new();
        assert_eq!(interner.intern("color"), Symbol::new("color"));
        assert_ne!(Symbol::new("color"), Symbol::new("colour"));
    }

    #[test]
    fn lookup_by_str() {
        let mut map = FxHashMap::default();
        map.insert(Symbol::new("greeting"), 1);
        assert_eq!(map.get("greeting"), Some(&1));
    }
}
