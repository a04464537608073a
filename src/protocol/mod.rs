//
// Copyright 2020-2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Session establishment for the **[Signal Protocol]**.
//!
//! In particular, this module implements the session-setup half of:
//! - the **[X3DH]** key agreement protocol, in its signed pre-key (version 3) and legacy
//!   one-time pre-key (version 2) forms,
//! - the synchronous key exchange used when both parties are online,
//!
//! producing the initial state of a **[Double Ratchet]** session.
//!
//! [Signal Protocol]: https://signal.org/
//! [X3DH]: https://signal.org/docs/specifications/x3dh/
//! [Double Ratchet]: https://signal.org/docs/specifications/doubleratchet/

pub mod consts;
pub mod error;
mod identity_key;
pub mod proto;
#[allow(clippy::module_inception)]
mod protocol;
mod ratchet;
pub mod session;
mod state;
mod storage;

pub use crate::core::curve::{CurveError, KeyPair, PrivateKey, PublicKey};
pub use crate::core::{DeviceId, ProtocolAddress};
pub use error::{Result, SignalProtocolError};
pub use identity_key::{IdentityKey, IdentityKeyPair};
pub use protocol::{KeyExchangeMessage, PreKeySignalMessage};
pub use ratchet::{
    AliceSignalProtocolParameters, BobSignalProtocolParameters, ChainKey, RootKey,
    SymmetricSignalProtocolParameters, derive_keys, initialize_alice_session,
    initialize_bob_session, initialize_symmetric_session,
};
pub use session::SessionBuilder;
pub use state::{
    PendingKeyExchange, PreKeyBundle, PreKeyBundleContent, PreKeyId, PreKeyRecord,
    SessionRecord, SessionState, SignedPreKeyId, SignedPreKeyRecord,
    UnacknowledgedPreKeyMessageItems,
};
pub use storage::{
    Direction, IdentityChange, IdentityKeyStore, PreKeyStore, ProtocolStore, SessionStore,
    SignedPreKeyStore,
};
