//! Session establishment for the Signal (Axolotl) protocol.
//!
//! [`protocol::SessionBuilder`] turns one of three handshake inputs (a received
//! [`protocol::PreKeySignalMessage`], a fetched [`protocol::PreKeyBundle`], or a
//! synchronous [`protocol::KeyExchangeMessage`]) into a ready-to-use
//! [`protocol::SessionState`], after checking identity trust and signatures.

#![warn(clippy::unwrap_used)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod protocol;
pub mod store;
pub mod util;

pub use config::{StoreConfig, TrustPolicy};
