//
// Copyright 2020-2022 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Interfaces for the mutable stores a [`crate::protocol::SessionBuilder`] reads and writes.
//!
//! All methods take `&self`: implementations are shared between builders and must
//! synchronize internally. A session store in particular should make load-then-store for
//! one address effectively atomic, or concurrent handshakes with the same peer can
//! overwrite each other's derived state.

#![warn(missing_docs)]

use async_trait::async_trait;

use crate::protocol::{
    IdentityKey, IdentityKeyPair, PreKeyId, PreKeyRecord, ProtocolAddress, Result,
    SessionRecord, SignedPreKeyId, SignedPreKeyRecord,
};

/// Whether a trust decision is for a message we are about to send or one we received.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Direction {
    /// We are starting the exchange (bundle, self-initiated key exchange).
    Sending,
    /// The peer started the exchange (pre-key message).
    Receiving,
}

/// The result of saving a new identity key for a protocol address.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IdentityChange {
    /// The protocol address didn't have an identity before, or it matched the new one.
    NewOrUnchanged,
    /// The new identity replaced a different previous one.
    ReplacedExisting,
}

impl IdentityChange {
    /// Convenience constructor from whether an existing identity was replaced.
    pub fn from_changed(changed: bool) -> Self {
        if changed {
            Self::ReplacedExisting
        } else {
            Self::NewOrUnchanged
        }
    }
}

/// Interface defining the identity store, which may be in-memory, on-disk, etc.
///
/// Signal clients usually use the identity store in a [TOFU] manner, but this is not required.
///
/// [TOFU]: https://en.wikipedia.org/wiki/Trust_on_first_use
#[async_trait]
pub trait IdentityKeyStore: Send + Sync {
    /// Return the single specific identity the store is assumed to represent, with private key.
    async fn get_identity_key_pair(&self) -> Result<IdentityKeyPair>;

    /// Return a [u32] specific to this store instance.
    ///
    /// The registration id is published alongside pre-keys and copied into every session
    /// this store helps create.
    async fn get_local_registration_id(&self) -> Result<u32>;

    /// Record an identity for the peer `name` into the store. The identity is then
    /// considered "trusted".
    ///
    /// Identities belong to a peer, not to one of its devices: `name` is
    /// [`ProtocolAddress::name`](crate::protocol::ProtocolAddress::name).
    async fn save_identity(&self, name: &str, identity: &IdentityKey) -> Result<IdentityChange>;

    /// Return whether an identity is trusted for the peer `name` in the role specified by
    /// `direction`.
    async fn is_trusted_identity(
        &self,
        name: &str,
        identity: &IdentityKey,
        direction: Direction,
    ) -> Result<bool>;

    /// Return the public identity for the peer `name`, if known.
    async fn get_identity(&self, name: &str) -> Result<Option<IdentityKey>>;
}

/// Interface for storing one-time pre-keys.
#[async_trait]
pub trait PreKeyStore: Send + Sync {
    /// Look up the pre-key corresponding to `prekey_id`.
    ///
    /// Fails with [`crate::protocol::SignalProtocolError::InvalidKeyId`] when absent.
    async fn get_pre_key(&self, prekey_id: PreKeyId) -> Result<PreKeyRecord>;

    /// Whether a pre-key with this id is held.
    async fn contains_pre_key(&self, prekey_id: PreKeyId) -> Result<bool>;

    /// Set the entry for `prekey_id` to the value of `record`.
    async fn save_pre_key(&self, prekey_id: PreKeyId, record: &PreKeyRecord) -> Result<()>;

    /// Remove the entry for `prekey_id`.
    async fn remove_pre_key(&self, prekey_id: PreKeyId) -> Result<()>;
}

/// Interface for storing signed pre-keys.
#[async_trait]
pub trait SignedPreKeyStore: Send + Sync {
    /// Look up the signed pre-key corresponding to `signed_prekey_id`.
    ///
    /// Fails with [`crate::protocol::SignalProtocolError::InvalidKeyId`] when absent.
    async fn get_signed_pre_key(
        &self,
        signed_prekey_id: SignedPreKeyId,
    ) -> Result<SignedPreKeyRecord>;

    /// Set the entry for `signed_prekey_id` to the value of `record`.
    async fn save_signed_pre_key(
        &self,
        signed_prekey_id: SignedPreKeyId,
        record: &SignedPreKeyRecord,
    ) -> Result<()>;
}

/// Interface for a Signal client instance to store a session associated with another particular
/// separate Signal client instance.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up the session corresponding to `address`.
    async fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>>;

    /// Set the entry for `address` to the value of `record`.
    async fn store_session(&self, address: &ProtocolAddress, record: &SessionRecord)
    -> Result<()>;

    /// Whether a session is stored for `address`.
    async fn contains_session(&self, address: &ProtocolAddress) -> Result<bool>;
}

/// Mixes in all the store interfaces defined in this module.
pub trait ProtocolStore: SessionStore + PreKeyStore + SignedPreKeyStore + IdentityKeyStore {}

impl<T: SessionStore + PreKeyStore + SignedPreKeyStore + IdentityKeyStore> ProtocolStore for T {}
