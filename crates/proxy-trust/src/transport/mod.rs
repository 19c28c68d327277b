//! Transport negotiation: matching candidate connections to constraints.
//!
//! The transport module provides:
//! - Cipher suite property derivation
//! - Per-connection constraint resolution with derived obligations
//!   (integrity, connection deadline, satisfied preferences)
//! - Ranking of viable connections

pub mod cipher_suite;
pub mod context;

pub use cipher_suite::CipherSuite;
pub use context::{ConnectionContext, Support};
