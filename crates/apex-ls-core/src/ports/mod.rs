//! Ports - traits for the collaborators this crate does not own.
//!
//! - **ClientConnection**: the editor on the other end of the LSP connection
//! - **SymbolManager**: the shared symbol store
//! - **Clock** / **IdGenerator**: injected so tests can pin time and ids

pub mod client;
pub mod clock;
pub mod id_generator;
pub mod symbol_manager;

pub use self::client::ClientConnection;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::symbol_manager::SymbolManager;
