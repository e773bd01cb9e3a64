//! Impls - in-process implementations of the ports.

pub mod inmem_symbols;

pub use self::inmem_symbols::InMemorySymbolManager;
