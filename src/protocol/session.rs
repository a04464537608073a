//
// Copyright 2020-2022 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Building sessions from pre-key bundles, pre-key messages and synchronous key exchanges.

use std::sync::Arc;

use rand::{CryptoRng, Rng};

use crate::protocol::consts::{
    CIPHERTEXT_MESSAGE_CURRENT_VERSION, CIPHERTEXT_MESSAGE_LEGACY_VERSION,
};
use crate::protocol::{
    AliceSignalProtocolParameters, BobSignalProtocolParameters, Direction, IdentityChange,
    IdentityKey, IdentityKeyStore, KeyExchangeMessage, KeyPair, PendingKeyExchange,
    PreKeyBundle, PreKeyId, PreKeySignalMessage, PreKeyStore, ProtocolAddress, ProtocolStore,
    Result, SessionRecord, SessionStore, SignalProtocolError, SignedPreKeyStore,
    SymmetricSignalProtocolParameters, initialize_alice_session, initialize_bob_session,
    initialize_symmetric_session,
};
use crate::util::keyhelper;

/// Establishes sessions with a single remote address.
///
/// The builder holds nothing but its store handles; every call loads what it needs,
/// and a failed call never writes to the session or identity store.
#[derive(Clone)]
pub struct SessionBuilder {
    session_store: Arc<dyn SessionStore>,
    pre_key_store: Arc<dyn PreKeyStore>,
    signed_pre_key_store: Arc<dyn SignedPreKeyStore>,
    identity_store: Arc<dyn IdentityKeyStore>,
    remote_address: ProtocolAddress,
}

impl SessionBuilder {
    pub fn new(
        session_store: Arc<dyn SessionStore>,
        pre_key_store: Arc<dyn PreKeyStore>,
        signed_pre_key_store: Arc<dyn SignedPreKeyStore>,
        identity_store: Arc<dyn IdentityKeyStore>,
        remote_address: ProtocolAddress,
    ) -> Self {
        Self {
            session_store,
            pre_key_store,
            signed_pre_key_store,
            identity_store,
            remote_address,
        }
    }

    /// Uses one store for all four roles.
    pub fn from_protocol_store<S: ProtocolStore + 'static>(
        store: Arc<S>,
        remote_address: ProtocolAddress,
    ) -> Self {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            remote_address,
        )
    }

    pub fn remote_address(&self) -> &ProtocolAddress {
        &self.remote_address
    }

    async fn check_trust(&self, identity: &IdentityKey, direction: Direction) -> Result<()> {
        if !self
            .identity_store
            .is_trusted_identity(self.remote_address.name(), identity, direction)
            .await?
        {
            log::warn!(
                "untrusted identity for {} ({:?})",
                self.remote_address,
                direction
            );
            return Err(SignalProtocolError::UntrustedIdentity(
                self.remote_address.clone(),
            ));
        }
        Ok(())
    }

    async fn save_identity(&self, identity: &IdentityKey) -> Result<()> {
        if self
            .identity_store
            .save_identity(self.remote_address.name(), identity)
            .await?
            == IdentityChange::ReplacedExisting
        {
            log::info!("replaced identity key for {}", self.remote_address.name());
        }
        Ok(())
    }

    async fn load_session_record(&self) -> Result<SessionRecord> {
        Ok(self
            .session_store
            .load_session(&self.remote_address)
            .await?
            .unwrap_or_else(SessionRecord::new_fresh))
    }

    /// Builds a new session from a received pre-key message.
    ///
    /// The derived state is promoted on `session_record`, which the caller persists.
    /// Returns the one-time pre-key the message consumed, so the caller can remove it
    /// from the pre-key store, or `None` when no pre-key was used or the message was
    /// already processed.
    pub async fn process_prekey_message(
        &self,
        session_record: &mut SessionRecord,
        message: &PreKeySignalMessage,
    ) -> Result<Option<PreKeyId>> {
        let their_identity_key = message.identity_key();
        self.check_trust(their_identity_key, Direction::Receiving)
            .await?;

        let unsigned_pre_key_id = match message.message_version() {
            CIPHERTEXT_MESSAGE_CURRENT_VERSION => {
                self.process_prekey_message_v3(session_record, message)
                    .await?
            }
            CIPHERTEXT_MESSAGE_LEGACY_VERSION => {
                self.process_prekey_message_v2(session_record, message)
                    .await?
            }
            version => {
                return Err(SignalProtocolError::InvalidMessage(format!(
                    "unknown pre-key message version {version}"
                )));
            }
        };

        self.save_identity(their_identity_key).await?;

        Ok(unsigned_pre_key_id)
    }

    async fn process_prekey_message_v3(
        &self,
        session_record: &mut SessionRecord,
        message: &PreKeySignalMessage,
    ) -> Result<Option<PreKeyId>> {
        if session_record.has_session_state(
            message.message_version(),
            &message.base_key().serialize(),
        )? {
            log::debug!(
                "pre-key message from {} already processed, ignoring",
                self.remote_address
            );
            return Ok(None);
        }

        let our_signed_pre_key_pair = self
            .signed_pre_key_store
            .get_signed_pre_key(message.signed_pre_key_id())
            .await?
            .key_pair()
            .clone();

        let our_one_time_pre_key_pair = match message.pre_key_id() {
            Some(pre_key_id) => {
                log::debug!(
                    "processing pre-key message from {} with one-time pre-key {pre_key_id}",
                    self.remote_address
                );
                Some(
                    self.pre_key_store
                        .get_pre_key(pre_key_id)
                        .await?
                        .key_pair()
                        .clone(),
                )
            }
            None => {
                log::debug!(
                    "processing pre-key message from {} with signed pre-key only",
                    self.remote_address
                );
                None
            }
        };

        let parameters = BobSignalProtocolParameters::new(
            self.identity_store.get_identity_key_pair().await?,
            our_signed_pre_key_pair.clone(),
            our_one_time_pre_key_pair,
            our_signed_pre_key_pair,
            *message.identity_key(),
            *message.base_key(),
        );
        let local_registration_id = self.identity_store.get_local_registration_id().await?;

        let mut new_session =
            initialize_bob_session(CIPHERTEXT_MESSAGE_CURRENT_VERSION, &parameters)?;
        new_session.set_local_registration_id(local_registration_id);
        new_session.set_remote_registration_id(message.registration_id());
        new_session.set_alice_base_key(message.base_key());

        session_record.promote_state(new_session);
        log::info!("derived v3 session with {}", self.remote_address);

        Ok(message.pre_key_id())
    }

    async fn process_prekey_message_v2(
        &self,
        session_record: &mut SessionRecord,
        message: &PreKeySignalMessage,
    ) -> Result<Option<PreKeyId>> {
        let Some(pre_key_id) = message.pre_key_id() else {
            return Err(SignalProtocolError::InvalidKeyId(
                "v2 pre-key message without a pre-key id".to_owned(),
            ));
        };

        if !self.pre_key_store.contains_pre_key(pre_key_id).await?
            && self
                .session_store
                .contains_session(&self.remote_address)
                .await?
        {
            log::debug!(
                "pre-key {pre_key_id} already consumed for {}, ignoring",
                self.remote_address
            );
            return Ok(None);
        }

        let our_pre_key_pair = self
            .pre_key_store
            .get_pre_key(pre_key_id)
            .await?
            .key_pair()
            .clone();

        let parameters = BobSignalProtocolParameters::new(
            self.identity_store.get_identity_key_pair().await?,
            our_pre_key_pair.clone(),
            None,
            our_pre_key_pair,
            *message.identity_key(),
            *message.base_key(),
        );
        let local_registration_id = self.identity_store.get_local_registration_id().await?;

        let mut new_session =
            initialize_bob_session(CIPHERTEXT_MESSAGE_LEGACY_VERSION, &parameters)?;
        new_session.set_local_registration_id(local_registration_id);
        new_session.set_remote_registration_id(message.registration_id());
        new_session.set_alice_base_key(message.base_key());

        session_record.promote_state(new_session);
        log::info!("derived v2 session with {}", self.remote_address);

        Ok(Some(pre_key_id))
    }

    /// Builds a new session from a pre-key bundle fetched for the remote address, and
    /// persists it along with the bundle's identity.
    pub async fn process_prekey_bundle<R: Rng + CryptoRng>(
        &self,
        bundle: &PreKeyBundle,
        csprng: &mut R,
    ) -> Result<()> {
        let their_identity_key = bundle.identity_key();
        self.check_trust(their_identity_key, Direction::Sending)
            .await?;

        let their_signed_pre_key = bundle.signed_pre_key_public();
        if let Some(signed_pre_key) = &their_signed_pre_key
            && !their_identity_key.public_key().verify_signature(
                &signed_pre_key.serialize(),
                bundle.signed_pre_key_signature().unwrap_or_default(),
            )
        {
            log::warn!(
                "signed pre-key signature from {} did not verify",
                self.remote_address
            );
            return Err(SignalProtocolError::InvalidKey(
                "signature on signed pre-key is not valid",
            ));
        }

        let their_one_time_pre_key = bundle.pre_key_public();
        let (version, their_target_key) = match (their_signed_pre_key, their_one_time_pre_key) {
            (Some(signed_pre_key), _) => (CIPHERTEXT_MESSAGE_CURRENT_VERSION, signed_pre_key),
            (None, Some(one_time_pre_key)) => (CIPHERTEXT_MESSAGE_LEGACY_VERSION, one_time_pre_key),
            (None, None) => {
                return Err(SignalProtocolError::InvalidKey(
                    "bundle has neither a signed pre-key nor a one-time pre-key",
                ));
            }
        };

        let mut session_record = self.load_session_record().await?;
        let our_identity_key_pair = self.identity_store.get_identity_key_pair().await?;
        let local_registration_id = self.identity_store.get_local_registration_id().await?;

        let our_base_key_pair = KeyPair::generate(csprng);
        let our_base_public_key = our_base_key_pair.public_key;

        let mut parameters = AliceSignalProtocolParameters::new(
            our_identity_key_pair,
            our_base_key_pair,
            *their_identity_key,
            their_target_key,
            their_target_key,
        );
        if version == CIPHERTEXT_MESSAGE_CURRENT_VERSION
            && let Some(one_time_pre_key) = their_one_time_pre_key
        {
            parameters = parameters.with_their_one_time_pre_key(one_time_pre_key);
        }

        let mut session = initialize_alice_session(version, &parameters, csprng)?;

        let their_signed_pre_key_id = if version == CIPHERTEXT_MESSAGE_CURRENT_VERSION {
            bundle.signed_pre_key_id()
        } else {
            None
        };
        session.set_unacknowledged_pre_key_message(
            bundle.pre_key_id(),
            their_signed_pre_key_id,
            &our_base_public_key,
        );
        session.set_local_registration_id(local_registration_id);
        session.set_remote_registration_id(bundle.registration_id());
        session.set_alice_base_key(&our_base_public_key);

        session_record.promote_state(session);
        log::info!(
            "derived v{version} session with {} from bundle (one-time pre-key {})",
            self.remote_address,
            bundle
                .pre_key_id()
                .map_or_else(|| "<none>".to_owned(), |id| id.to_string())
        );

        self.session_store
            .store_session(&self.remote_address, &session_record)
            .await?;
        self.save_identity(their_identity_key).await?;

        Ok(())
    }

    /// Starts a synchronous key exchange.
    ///
    /// The generated keys are stashed as a pending exchange on the session record until
    /// the peer's response arrives; no session keys are derived yet.
    pub async fn initiate_key_exchange<R: Rng + CryptoRng>(
        &self,
        csprng: &mut R,
    ) -> Result<KeyExchangeMessage> {
        let sequence = keyhelper::generate_sequence(csprng);
        let base_key_pair = KeyPair::generate(csprng);
        let ratchet_key_pair = KeyPair::generate(csprng);
        let identity_key_pair = self.identity_store.get_identity_key_pair().await?;
        let base_key_signature =
            identity_key_pair.sign(&base_key_pair.public_key.serialize(), csprng);

        // Declared as v3 rather than v2 so that peers always verify the base key signature.
        let message = KeyExchangeMessage::new(
            CIPHERTEXT_MESSAGE_CURRENT_VERSION,
            CIPHERTEXT_MESSAGE_CURRENT_VERSION,
            sequence,
            KeyExchangeMessage::INITIATE_FLAG,
            base_key_pair.public_key,
            &base_key_signature,
            ratchet_key_pair.public_key,
            *identity_key_pair.identity_key(),
        );

        let mut session_record = self.load_session_record().await?;
        session_record
            .session_state_or_placeholder_mut()
            .set_pending_key_exchange(PendingKeyExchange::new(
                sequence,
                base_key_pair,
                ratchet_key_pair,
                identity_key_pair,
            ));
        self.session_store
            .store_session(&self.remote_address, &session_record)
            .await?;

        log::info!(
            "initiated key exchange {sequence} with {}",
            self.remote_address
        );
        Ok(message)
    }

    /// Processes a key exchange message from the remote address.
    ///
    /// An INITIATE message yields the response to send back. A RESPONSE completes our
    /// own pending exchange and yields `None`.
    pub async fn process_key_exchange_message<R: Rng + CryptoRng>(
        &self,
        message: &KeyExchangeMessage,
        csprng: &mut R,
    ) -> Result<Option<KeyExchangeMessage>> {
        self.check_trust(message.identity_key(), Direction::Receiving)
            .await?;

        if message.is_initiate() {
            self.process_initiate(message, csprng).await.map(Some)
        } else {
            self.process_response(message, csprng).await?;
            Ok(None)
        }
    }

    async fn process_initiate<R: Rng + CryptoRng>(
        &self,
        message: &KeyExchangeMessage,
        csprng: &mut R,
    ) -> Result<KeyExchangeMessage> {
        if message.version() >= CIPHERTEXT_MESSAGE_CURRENT_VERSION {
            verify_base_key_signature(message)?;
        }

        let mut session_record = self.load_session_record().await?;
        let pending = match session_record.session_state() {
            Some(state) => state.pending_key_exchange()?,
            None => None,
        };

        let mut flags = KeyExchangeMessage::RESPONSE_FLAG;
        let (base_key_pair, ratchet_key_pair, identity_key_pair) = match pending {
            Some(pending) => {
                log::debug!(
                    "simultaneous key exchange with {}, reusing pending keys",
                    self.remote_address
                );
                flags |= KeyExchangeMessage::SIMULTANEOUS_INITIATE_FLAG;
                (
                    pending.local_base_key_pair().clone(),
                    pending.local_ratchet_key_pair().clone(),
                    pending.local_identity_key_pair().clone(),
                )
            }
            None => (
                KeyPair::generate(csprng),
                KeyPair::generate(csprng),
                self.identity_store.get_identity_key_pair().await?,
            ),
        };

        let version = message.max_version().min(CIPHERTEXT_MESSAGE_CURRENT_VERSION);
        let parameters = SymmetricSignalProtocolParameters::new(
            identity_key_pair.clone(),
            base_key_pair.clone(),
            ratchet_key_pair.clone(),
            *message.identity_key(),
            *message.base_key(),
            *message.ratchet_key(),
        );
        let session = initialize_symmetric_session(version, &parameters, &mut *csprng)?;
        session_record.promote_state(session);

        self.session_store
            .store_session(&self.remote_address, &session_record)
            .await?;
        self.save_identity(message.identity_key()).await?;

        let base_key_signature =
            identity_key_pair.sign(&base_key_pair.public_key.serialize(), csprng);
        log::info!(
            "derived v{version} session with {} from key exchange {}",
            self.remote_address,
            message.sequence()
        );

        Ok(KeyExchangeMessage::new(
            version,
            CIPHERTEXT_MESSAGE_CURRENT_VERSION,
            message.sequence(),
            flags,
            base_key_pair.public_key,
            &base_key_signature,
            ratchet_key_pair.public_key,
            *identity_key_pair.identity_key(),
        ))
    }

    async fn process_response<R: Rng + CryptoRng>(
        &self,
        message: &KeyExchangeMessage,
        csprng: &mut R,
    ) -> Result<()> {
        let mut session_record = self.load_session_record().await?;
        let pending = match session_record.session_state() {
            Some(state) => state.pending_key_exchange()?,
            None => None,
        };

        let pending = match pending {
            Some(pending) if pending.sequence() == message.sequence() => pending,
            _ if message.is_response_for_simultaneous_initiate() => {
                log::debug!(
                    "ignoring simultaneous-initiate response {} from {}",
                    message.sequence(),
                    self.remote_address
                );
                return Ok(());
            }
            _ => {
                log::warn!(
                    "stale key exchange response {} from {}",
                    message.sequence(),
                    self.remote_address
                );
                return Err(SignalProtocolError::StaleKeyExchange(message.sequence()));
            }
        };

        let version = message.max_version().min(CIPHERTEXT_MESSAGE_CURRENT_VERSION);
        if version >= CIPHERTEXT_MESSAGE_CURRENT_VERSION {
            verify_base_key_signature(message)?;
        }

        let parameters = SymmetricSignalProtocolParameters::new(
            pending.local_identity_key_pair().clone(),
            pending.local_base_key_pair().clone(),
            pending.local_ratchet_key_pair().clone(),
            *message.identity_key(),
            *message.base_key(),
            *message.ratchet_key(),
        );
        let session = initialize_symmetric_session(version, &parameters, csprng)?;
        session_record.promote_state(session);

        self.session_store
            .store_session(&self.remote_address, &session_record)
            .await?;
        self.save_identity(message.identity_key()).await?;

        log::info!(
            "completed key exchange {} with {}",
            message.sequence(),
            self.remote_address
        );
        Ok(())
    }
}

fn verify_base_key_signature(message: &KeyExchangeMessage) -> Result<()> {
    if !message.identity_key().public_key().verify_signature(
        &message.base_key().serialize(),
        message.base_key_signature(),
    ) {
        log::warn!(
            "base key signature on key exchange {} did not verify",
            message.sequence()
        );
        return Err(SignalProtocolError::InvalidKey(
            "base key signature is not valid",
        ));
    }
    Ok(())
}
