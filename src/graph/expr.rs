// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Opaque symbolic values carried by behavior-graph nodes.
//!
//! The engine never interprets these beyond equality, bit width, and
//! resolving an expression to the address of an abstract object.
//!
//! # Examples
//!
//! ```
//! use epsynth::graph::{Addr, Expr};
//!
//! let key = Expr::concat(vec![Expr::opaque("src_ip", 32), Expr::opaque("dst_ip", 32)]);
//! assert_eq!(key.width(), 64);
//! assert_eq!(key.parts().len(), 2);
//! assert_eq!(Expr::addr(0x10).resolve_addr(), Some(Addr(0x10)));
//! ```

use serde::Serialize;
use std::fmt;

/// Address of an abstract stateful object (map, vector, dchain, sketch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Addr(pub u64);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A named, sized symbolic value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Symbol {
    pub name: String,
    pub width: u32,
}

impl Symbol {
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.width)
    }
}

/// Symbolic expression attached to calls and branches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Expr {
    Const { value: u64, width: u32 },
    Addr(Addr),
    Symbol(Symbol),
    Concat(Vec<Expr>),
    Opaque { text: String, width: u32 },
}

impl Expr {
    pub fn constant(value: u64, width: u32) -> Self {
        Expr::Const { value, width }
    }

    pub fn addr(addr: u64) -> Self {
        Expr::Addr(Addr(addr))
    }

    pub fn symbol(name: impl Into<String>, width: u32) -> Self {
        Expr::Symbol(Symbol::new(name, width))
    }

    pub fn opaque(text: impl Into<String>, width: u32) -> Self {
        Expr::Opaque {
            text: text.into(),
            width,
        }
    }

    pub fn concat(parts: Vec<Expr>) -> Self {
        Expr::Concat(parts)
    }

    /// Resolve this expression to an object address, if it denotes one.
    pub fn resolve_addr(&self) -> Option<Addr> {
        match self {
            Expr::Addr(addr) => Some(*addr),
            Expr::Const { value, width: 64 } => Some(Addr(*value)),
            _ => None,
        }
    }

    /// Constant value, if this expression is a constant.
    pub fn as_const(&self) -> Option<u64> {
        match self {
            Expr::Const { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Width in bits.
    pub fn width(&self) -> u32 {
        match self {
            Expr::Const { width, .. } | Expr::Opaque { width, .. } => *width,
            Expr::Addr(_) => 64,
            Expr::Symbol(symbol) => symbol.width,
            Expr::Concat(parts) => parts.iter().map(Expr::width).sum(),
        }
    }

    /// Flattened components of a concatenation (a single-element list otherwise).
    pub fn parts(&self) -> Vec<&Expr> {
        match self {
            Expr::Concat(parts) => parts.iter().flat_map(Expr::parts).collect(),
            other => vec![other],
        }
    }
}

/// Source of fresh symbols for values a module introduces.
///
/// Each minted name is unique for the lifetime of the source.
#[derive(Debug, Default)]
pub struct SymbolSource {
    next: u64,
}

impl SymbolSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, base: &str, width: u32) -> Symbol {
        let symbol = Symbol::new(format!("{}_{}", base, self.next), width);
        self.next += 1;
        symbol
    }

    /// Number of symbols minted so far.
    pub fn minted(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_addr() {
        assert_eq!(Expr::addr(7).resolve_addr(), Some(Addr(7)));
        assert_eq!(Expr::constant(7, 64).resolve_addr(), Some(Addr(7)));
        assert_eq!(Expr::constant(7, 32).resolve_addr(), None);
        assert_eq!(Expr::opaque("x", 64).resolve_addr(), None);
    }

    #[test]
    fn test_nested_concat_flattens() {
        let inner = Expr::concat(vec![Expr::opaque("a", 32), Expr::opaque("b", 16)]);
        let outer = Expr::concat(vec![inner, Expr::opaque("c", 8)]);
        let widths: Vec<u32> = outer.parts().iter().map(|p| p.width()).collect();
        assert_eq!(widths, vec![32, 16, 8]);
        assert_eq!(outer.width(), 56);
    }

    #[test]
    fn test_symbol_source_is_unique() {
        let mut source = SymbolSource::new();
        let a = source.fresh("cpu_code", 16);
        let b = source.fresh("cpu_code", 16);
        assert_ne!(a, b);
        assert_eq!(a.width, 16);
        assert_eq!(source.minted(), 2);
    }
}
