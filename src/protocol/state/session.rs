//
// Copyright 2020-2022 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::result::Result;

use prost::Message;
use subtle::ConstantTimeEq;

use crate::protocol::proto::session_structure::{self};
use crate::protocol::proto::{RecordStructure, SessionStructure};
use crate::protocol::ratchet::{ChainKey, RootKey};
use crate::protocol::state::{PreKeyId, SignedPreKeyId};
use crate::protocol::{
    IdentityKey, IdentityKeyPair, KeyPair, PrivateKey, PublicKey, SignalProtocolError, consts,
};

/// A distinct error type to keep from accidentally propagating deserialization errors.
#[derive(Debug)]
pub struct InvalidSessionError(&'static str);

impl std::fmt::Display for InvalidSessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<InvalidSessionError> for SignalProtocolError {
    fn from(e: InvalidSessionError) -> Self {
        Self::InvalidSessionStructure(e.0)
    }
}

#[derive(Debug, Clone)]
pub struct UnacknowledgedPreKeyMessageItems {
    pre_key_id: Option<PreKeyId>,
    signed_pre_key_id: Option<SignedPreKeyId>,
    base_key: PublicKey,
}

impl UnacknowledgedPreKeyMessageItems {
    pub fn pre_key_id(&self) -> Option<PreKeyId> {
        self.pre_key_id
    }

    /// Absent for sessions built from a legacy bundle.
    pub fn signed_pre_key_id(&self) -> Option<SignedPreKeyId> {
        self.signed_pre_key_id
    }

    pub fn base_key(&self) -> &PublicKey {
        &self.base_key
    }
}

/// Our half of a synchronous key exchange that is waiting for the peer's response.
#[derive(Clone, Debug)]
pub struct PendingKeyExchange {
    sequence: u32,
    local_base_key_pair: KeyPair,
    local_ratchet_key_pair: KeyPair,
    local_identity_key_pair: IdentityKeyPair,
}

impl PendingKeyExchange {
    pub fn new(
        sequence: u32,
        local_base_key_pair: KeyPair,
        local_ratchet_key_pair: KeyPair,
        local_identity_key_pair: IdentityKeyPair,
    ) -> Self {
        Self {
            sequence,
            local_base_key_pair,
            local_ratchet_key_pair,
            local_identity_key_pair,
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn local_base_key_pair(&self) -> &KeyPair {
        &self.local_base_key_pair
    }

    pub fn local_ratchet_key_pair(&self) -> &KeyPair {
        &self.local_ratchet_key_pair
    }

    pub fn local_identity_key_pair(&self) -> &IdentityKeyPair {
        &self.local_identity_key_pair
    }

    fn into_pb(self) -> session_structure::PendingKeyExchange {
        session_structure::PendingKeyExchange {
            sequence: Some(self.sequence),
            local_base_key: Some(self.local_base_key_pair.public_key.serialize().to_vec()),
            local_base_key_private: Some(
                self.local_base_key_pair.private_key.serialize().to_vec(),
            ),
            local_ratchet_key: Some(self.local_ratchet_key_pair.public_key.serialize().to_vec()),
            local_ratchet_key_private: Some(
                self.local_ratchet_key_pair.private_key.serialize().to_vec(),
            ),
            local_identity_key: Some(self.local_identity_key_pair.identity_key().serialize().to_vec()),
            local_identity_key_private: Some(
                self.local_identity_key_pair.private_key().serialize().to_vec(),
            ),
        }
    }

    fn from_pb(pb: &session_structure::PendingKeyExchange) -> Result<Self, InvalidSessionError> {
        fn key_pair(
            public: &Option<Vec<u8>>,
            private: &Option<Vec<u8>>,
            what: &'static str,
        ) -> Result<KeyPair, InvalidSessionError> {
            KeyPair::from_public_and_private(
                public.as_deref().unwrap_or(&[]),
                private.as_deref().unwrap_or(&[]),
            )
            .map_err(|_| InvalidSessionError(what))
        }

        let identity = key_pair(
            &pb.local_identity_key,
            &pb.local_identity_key_private,
            "invalid pending key exchange identity key",
        )?;
        Ok(Self {
            sequence: pb
                .sequence
                .ok_or(InvalidSessionError("missing pending key exchange sequence"))?,
            local_base_key_pair: key_pair(
                &pb.local_base_key,
                &pb.local_base_key_private,
                "invalid pending key exchange base key",
            )?,
            local_ratchet_key_pair: key_pair(
                &pb.local_ratchet_key,
                &pb.local_ratchet_key_private,
                "invalid pending key exchange ratchet key",
            )?,
            local_identity_key_pair: identity.into(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct SessionState {
    session: SessionStructure,
}

impl SessionState {
    pub fn from_session_structure(session: SessionStructure) -> Self {
        Self { session }
    }

    pub fn new(
        version: u8,
        our_identity: &IdentityKey,
        their_identity: &IdentityKey,
        root_key: &RootKey,
        alice_base_key: &PublicKey,
    ) -> Self {
        Self {
            session: SessionStructure {
                session_version: Some(version as u32),
                local_identity_public: Some(our_identity.serialize().to_vec()),
                remote_identity_public: Some(their_identity.serialize().to_vec()),
                root_key: Some(root_key.key().to_vec()),
                previous_counter: Some(0),
                sender_chain: None,
                receiver_chains: vec![],
                pending_key_exchange: None,
                pending_pre_key: None,
                remote_registration_id: Some(0),
                local_registration_id: Some(0),
                alice_base_key: Some(alice_base_key.serialize().to_vec()),
            },
        }
    }

    /// A state with no derived keys, used to hold a pending key exchange before any
    /// session exists.
    pub fn placeholder() -> Self {
        Self {
            session: SessionStructure::default(),
        }
    }

    pub fn alice_base_key(&self) -> &[u8] {
        self.session.alice_base_key.as_deref().unwrap_or(&[])
    }

    pub fn set_alice_base_key(&mut self, base_key: &PublicKey) {
        self.session.alice_base_key = Some(base_key.serialize().to_vec());
    }

    /// Unset versions predate version tagging and are treated as version 2.
    pub fn session_version(&self) -> Result<u8, InvalidSessionError> {
        match self.session.session_version.unwrap_or(0) {
            0 => Ok(consts::CIPHERTEXT_MESSAGE_LEGACY_VERSION),
            v => u8::try_from(v).map_err(|_| InvalidSessionError("invalid session version")),
        }
    }

    pub fn remote_identity_key(&self) -> Result<Option<IdentityKey>, InvalidSessionError> {
        let bytes = self
            .session
            .remote_identity_public
            .as_deref()
            .unwrap_or(&[]);
        match bytes.len() {
            0 => Ok(None),
            _ => Ok(Some(IdentityKey::decode(bytes).map_err(|_| {
                InvalidSessionError("invalid remote identity key")
            })?)),
        }
    }

    pub fn local_identity_key(&self) -> Result<IdentityKey, InvalidSessionError> {
        let bytes = self.session.local_identity_public.as_deref().unwrap_or(&[]);
        IdentityKey::decode(bytes).map_err(|_| InvalidSessionError("invalid local identity key"))
    }

    pub fn root_key(&self) -> Result<RootKey, InvalidSessionError> {
        let root_key_bytes = self.session.root_key.as_deref().unwrap_or(&[]);
        let root_key_bytes = root_key_bytes
            .try_into()
            .map_err(|_| InvalidSessionError("invalid root key"))?;
        Ok(RootKey::new(root_key_bytes))
    }

    /// Whether ratchet keys have been derived into this state.
    pub fn has_sender_chain(&self) -> bool {
        self.session.sender_chain.is_some()
    }

    pub fn sender_ratchet_key(&self) -> Result<PublicKey, InvalidSessionError> {
        let chain = self
            .session
            .sender_chain
            .as_ref()
            .ok_or(InvalidSessionError("missing sender chain"))?;
        let key_bytes = chain
            .sender_ratchet_key
            .as_ref()
            .ok_or(InvalidSessionError("missing sender ratchet key"))?;
        PublicKey::deserialize(key_bytes)
            .map_err(|_| InvalidSessionError("invalid sender chain ratchet key"))
    }

    pub fn sender_ratchet_private_key(&self) -> Result<PrivateKey, InvalidSessionError> {
        let chain = self
            .session
            .sender_chain
            .as_ref()
            .ok_or(InvalidSessionError("missing sender chain"))?;
        let key_bytes = chain
            .sender_ratchet_key_private
            .as_ref()
            .ok_or(InvalidSessionError("missing sender ratchet private key"))?;
        PrivateKey::deserialize(key_bytes)
            .map_err(|_| InvalidSessionError("invalid sender chain private ratchet key"))
    }

    fn chain_key_from_pb(
        chain: &session_structure::Chain,
    ) -> Result<ChainKey, InvalidSessionError> {
        let chain_key = chain
            .chain_key
            .as_ref()
            .ok_or(InvalidSessionError("missing chain key"))?;
        let key_bytes = chain_key
            .key
            .as_deref()
            .ok_or(InvalidSessionError("missing chain key bytes"))?
            .try_into()
            .map_err(|_| InvalidSessionError("invalid chain key"))?;
        let index = chain_key
            .index
            .ok_or(InvalidSessionError("missing chain key index"))?;
        Ok(ChainKey::new(key_bytes, index))
    }

    fn chain_to_pb(
        ratchet_key: &PublicKey,
        ratchet_private_key: Option<&PrivateKey>,
        chain_key: &ChainKey,
    ) -> session_structure::Chain {
        session_structure::Chain {
            sender_ratchet_key: Some(ratchet_key.serialize().to_vec()),
            sender_ratchet_key_private: Some(
                ratchet_private_key.map_or_else(Vec::new, |k| k.serialize().to_vec()),
            ),
            chain_key: Some(session_structure::chain::ChainKey {
                index: Some(chain_key.index()),
                key: Some(chain_key.key().to_vec()),
            }),
        }
    }

    pub fn sender_chain_key(&self) -> Result<ChainKey, InvalidSessionError> {
        let chain = self
            .session
            .sender_chain
            .as_ref()
            .ok_or(InvalidSessionError("missing sender chain"))?;
        Self::chain_key_from_pb(chain)
    }

    pub fn receiver_chain_key(
        &self,
        sender: &PublicKey,
    ) -> Result<Option<ChainKey>, InvalidSessionError> {
        let sender_bytes = sender.serialize();
        for chain in &self.session.receiver_chains {
            let key_bytes = chain
                .sender_ratchet_key
                .as_ref()
                .ok_or(InvalidSessionError("missing receiver chain ratchet key"))?;
            if key_bytes.as_slice() == sender_bytes.as_slice() {
                return Self::chain_key_from_pb(chain).map(Some);
            }
        }
        Ok(None)
    }

    pub fn add_receiver_chain(&mut self, sender: &PublicKey, chain_key: &ChainKey) {
        self.session
            .receiver_chains
            .push(Self::chain_to_pb(sender, None, chain_key));

        let len = self.session.receiver_chains.len();
        if len > consts::MAX_RECEIVER_CHAINS {
            log::info!("Trimming excessive receiver_chain, chain count: {len}");
            self.session
                .receiver_chains
                .drain(..len - consts::MAX_RECEIVER_CHAINS);
        }
    }

    pub fn with_receiver_chain(mut self, sender: &PublicKey, chain_key: &ChainKey) -> Self {
        self.add_receiver_chain(sender, chain_key);
        self
    }

    pub fn set_sender_chain(&mut self, sender: &KeyPair, next_chain_key: &ChainKey) {
        self.session.sender_chain = Some(Self::chain_to_pb(
            &sender.public_key,
            Some(&sender.private_key),
            next_chain_key,
        ));
    }

    pub fn with_sender_chain(mut self, sender: &KeyPair, next_chain_key: &ChainKey) -> Self {
        self.set_sender_chain(sender, next_chain_key);
        self
    }

    pub fn set_unacknowledged_pre_key_message(
        &mut self,
        pre_key_id: Option<PreKeyId>,
        signed_pre_key_id: Option<SignedPreKeyId>,
        base_key: &PublicKey,
    ) {
        self.session.pending_pre_key = Some(session_structure::PendingPreKey {
            pre_key_id: pre_key_id.map(PreKeyId::into),
            signed_pre_key_id: signed_pre_key_id.map(|id| u32::from(id) as i32),
            base_key: Some(base_key.serialize().to_vec()),
        });
    }

    pub fn has_unacknowledged_pre_key_message(&self) -> bool {
        self.session.pending_pre_key.is_some()
    }

    pub fn unacknowledged_pre_key_message_items(
        &self,
    ) -> Result<Option<UnacknowledgedPreKeyMessageItems>, InvalidSessionError> {
        let Some(ref pending_pre_key) = self.session.pending_pre_key else {
            return Ok(None);
        };
        Ok(Some(UnacknowledgedPreKeyMessageItems {
            pre_key_id: pending_pre_key.pre_key_id.map(Into::into),
            signed_pre_key_id: pending_pre_key
                .signed_pre_key_id
                .map(|id| (id as u32).into()),
            base_key: PublicKey::deserialize(
                pending_pre_key
                    .base_key
                    .as_ref()
                    .ok_or(InvalidSessionError("missing base key"))?,
            )
            .map_err(|_| InvalidSessionError("invalid pending PreKey message base key"))?,
        }))
    }

    pub fn clear_unacknowledged_pre_key_message(&mut self) {
        self.session.pending_pre_key = None;
    }

    pub fn set_pending_key_exchange(&mut self, pending: PendingKeyExchange) {
        self.session.pending_key_exchange = Some(pending.into_pb());
    }

    pub fn has_pending_key_exchange(&self) -> bool {
        self.session.pending_key_exchange.is_some()
    }

    pub fn pending_key_exchange(&self) -> Result<Option<PendingKeyExchange>, InvalidSessionError> {
        self.session
            .pending_key_exchange
            .as_ref()
            .map(PendingKeyExchange::from_pb)
            .transpose()
    }

    pub fn clear_pending_key_exchange(&mut self) {
        self.session.pending_key_exchange = None;
    }

    pub fn set_remote_registration_id(&mut self, registration_id: u32) {
        self.session.remote_registration_id = Some(registration_id);
    }

    pub fn remote_registration_id(&self) -> u32 {
        self.session.remote_registration_id.unwrap_or(0)
    }

    pub fn set_local_registration_id(&mut self, registration_id: u32) {
        self.session.local_registration_id = Some(registration_id);
    }

    pub fn local_registration_id(&self) -> u32 {
        self.session.local_registration_id.unwrap_or(0)
    }

    fn matches(&self, version: u8, alice_base_key: &[u8]) -> Result<bool, InvalidSessionError> {
        Ok(self.session_version()? == version
            && bool::from(alice_base_key.ct_eq(self.alice_base_key())))
    }
}

impl From<SessionStructure> for SessionState {
    fn from(value: SessionStructure) -> SessionState {
        SessionState::from_session_structure(value)
    }
}

impl From<SessionState> for SessionStructure {
    fn from(value: SessionState) -> SessionStructure {
        value.session
    }
}

impl From<&SessionState> for SessionStructure {
    fn from(value: &SessionState) -> SessionStructure {
        value.session.clone()
    }
}

/// The current session with a peer plus the archived states that may still
/// receive in-flight messages.
#[derive(Clone, Debug)]
pub struct SessionRecord {
    current_session: Option<SessionState>,
    previous_sessions: Vec<SessionStructure>,
}

impl SessionRecord {
    pub fn new_fresh() -> Self {
        Self {
            current_session: None,
            previous_sessions: Vec::new(),
        }
    }

    pub fn new(state: SessionState) -> Self {
        Self {
            current_session: Some(state),
            previous_sessions: Vec::new(),
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, SignalProtocolError> {
        let mut record = RecordStructure::decode(bytes)
            .map_err(|_| InvalidSessionError("failed to decode session record protobuf"))?;

        record
            .previous_sessions
            .truncate(consts::ARCHIVED_STATES_MAX_LENGTH);

        Ok(Self {
            current_session: record.current_session.map(|s| s.into()),
            previous_sessions: record.previous_sessions,
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>, SignalProtocolError> {
        let record = RecordStructure {
            current_session: self.current_session.as_ref().map(|s| s.into()),
            previous_sessions: self.previous_sessions.clone(),
        };
        Ok(record.encode_to_vec())
    }

    /// True until a state with derived ratchet keys has been installed.
    ///
    /// A placeholder that only carries a pending key exchange still counts as fresh.
    pub fn is_fresh(&self) -> bool {
        self.current_session
            .as_ref()
            .is_none_or(|state| !state.has_sender_chain())
    }

    /// Whether the current or any archived state was derived from the given version and
    /// base key. Does not reorder states.
    pub fn has_session_state(
        &self,
        version: u8,
        alice_base_key: &[u8],
    ) -> Result<bool, InvalidSessionError> {
        if let Some(current_session) = &self.current_session
            && current_session.matches(version, alice_base_key)?
        {
            return Ok(true);
        }

        for previous in self.previous_session_states() {
            if previous?.matches(version, alice_base_key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn session_state(&self) -> Option<&SessionState> {
        self.current_session.as_ref()
    }

    pub fn session_state_mut(&mut self) -> Option<&mut SessionState> {
        self.current_session.as_mut()
    }

    /// The current state, installing a placeholder first if there is none.
    pub fn session_state_or_placeholder_mut(&mut self) -> &mut SessionState {
        self.current_session.get_or_insert_with(SessionState::placeholder)
    }

    pub fn set_session_state(&mut self, session: SessionState) {
        self.current_session = Some(session);
    }

    pub fn previous_session_count(&self) -> usize {
        self.previous_sessions.len()
    }

    pub fn previous_session_states(
        &self,
    ) -> impl ExactSizeIterator<Item = Result<SessionState, InvalidSessionError>> + '_ {
        self.previous_sessions
            .iter()
            .map(|structure| Ok(structure.clone().into()))
    }

    /// Archives the current state (if established) and installs `new_state`.
    pub fn promote_state(&mut self, new_state: SessionState) {
        self.archive_current_state();
        self.current_session = Some(new_state);
    }

    /// Moves an established current state to the front of the archive, dropping the oldest
    /// archived state past [`consts::ARCHIVED_STATES_MAX_LENGTH`]. A placeholder is discarded.
    pub fn archive_current_state(&mut self) {
        if self.is_fresh() {
            log::info!("Skipping archive, current session state is fresh");
            self.current_session = None;
            return;
        }
        if let Some(mut current_session) = self.current_session.take() {
            if self.previous_sessions.len() >= consts::ARCHIVED_STATES_MAX_LENGTH {
                self.previous_sessions.pop();
            }
            current_session.clear_unacknowledged_pre_key_message();
            current_session.clear_pending_key_exchange();
            self.previous_sessions.insert(0, current_session.session);
        }
    }

    pub fn session_version(&self) -> Result<u8, SignalProtocolError> {
        Ok(self
            .session_state()
            .ok_or_else(|| {
                SignalProtocolError::InvalidState("session_version", "No current session".into())
            })?
            .session_version()?)
    }

    pub fn remote_registration_id(&self) -> Result<u32, SignalProtocolError> {
        Ok(self
            .session_state()
            .ok_or_else(|| {
                SignalProtocolError::InvalidState(
                    "remote_registration_id",
                    "No current session".into(),
                )
            })?
            .remote_registration_id())
    }

    pub fn local_registration_id(&self) -> Result<u32, SignalProtocolError> {
        Ok(self
            .session_state()
            .ok_or_else(|| {
                SignalProtocolError::InvalidState(
                    "local_registration_id",
                    "No current session".into(),
                )
            })?
            .local_registration_id())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rng() -> impl rand::CryptoRng + rand::Rng {
        rand::rng()
    }

    /// Creates a minimal established SessionState for testing.
    fn create_test_session_state(version: u8, base_key: &PublicKey) -> SessionState {
        let mut csprng = rng();
        let their_identity = IdentityKey::new(KeyPair::generate(&mut csprng).public_key);
        let our_identity = IdentityKey::new(KeyPair::generate(&mut csprng).public_key);
        let root_key = RootKey::new([0u8; 32]);

        let mut state =
            SessionState::new(version, &our_identity, &their_identity, &root_key, base_key);
        state.set_sender_chain(&KeyPair::generate(&mut csprng), &ChainKey::new([1u8; 32], 0));
        state
    }

    fn create_pending_exchange(sequence: u32) -> PendingKeyExchange {
        let mut csprng = rng();
        PendingKeyExchange::new(
            sequence,
            KeyPair::generate(&mut csprng),
            KeyPair::generate(&mut csprng),
            IdentityKeyPair::generate(&mut csprng),
        )
    }

    #[test]
    fn test_fresh_record_and_placeholder() {
        let mut record = SessionRecord::new_fresh();
        assert!(record.is_fresh());

        record
            .session_state_or_placeholder_mut()
            .set_pending_key_exchange(create_pending_exchange(9));
        assert!(record.is_fresh());
        assert!(record.session_state().unwrap().has_pending_key_exchange());

        // Archiving a placeholder drops it rather than keeping it around.
        record.archive_current_state();
        assert!(record.session_state().is_none());
        assert_eq!(record.previous_session_count(), 0);
    }

    #[test]
    fn test_pending_key_exchange_survives_serialization() {
        let pending = create_pending_exchange(0x1234);
        let mut record = SessionRecord::new_fresh();
        record
            .session_state_or_placeholder_mut()
            .set_pending_key_exchange(pending.clone());

        let restored = SessionRecord::deserialize(&record.serialize().unwrap()).unwrap();
        let loaded = restored
            .session_state()
            .unwrap()
            .pending_key_exchange()
            .unwrap()
            .unwrap();
        assert_eq!(loaded.sequence(), 0x1234);
        assert_eq!(loaded.local_base_key_pair(), pending.local_base_key_pair());
        assert_eq!(loaded.local_ratchet_key_pair(), pending.local_ratchet_key_pair());
        assert_eq!(loaded.local_identity_key_pair(), pending.local_identity_key_pair());
    }

    #[test]
    fn test_archive_clears_pending_markers() {
        let base_key = KeyPair::generate(&mut rng()).public_key;
        let mut state = create_test_session_state(3, &base_key);
        state.set_unacknowledged_pre_key_message(Some(4.into()), Some(7.into()), &base_key);
        state.set_pending_key_exchange(create_pending_exchange(1));
        let mut record = SessionRecord::new(state);
        assert!(!record.is_fresh());

        let replacement = create_test_session_state(3, &KeyPair::generate(&mut rng()).public_key);
        record.promote_state(replacement);

        let archived = record.previous_session_states().next().unwrap().unwrap();
        assert!(!archived.has_unacknowledged_pre_key_message());
        assert!(!archived.has_pending_key_exchange());
        assert_eq!(archived.alice_base_key(), base_key.serialize().as_slice());
    }

    #[test]
    fn test_archive_is_capped() {
        let mut record = SessionRecord::new_fresh();
        for _ in 0..(consts::ARCHIVED_STATES_MAX_LENGTH + 5) {
            let base_key = KeyPair::generate(&mut rng()).public_key;
            record.promote_state(create_test_session_state(3, &base_key));
        }
        assert_eq!(
            record.previous_session_count(),
            consts::ARCHIVED_STATES_MAX_LENGTH
        );
    }

    #[test]
    fn test_has_session_state_searches_without_reordering() {
        let mut record = SessionRecord::new_fresh();
        let keys: Vec<PublicKey> = (0..4)
            .map(|_| KeyPair::generate(&mut rng()).public_key)
            .collect();
        for key in &keys {
            record.promote_state(create_test_session_state(3, key));
        }
        let before = record.serialize().unwrap();

        assert!(record.has_session_state(3, &keys[1].serialize()).unwrap());
        assert!(record.has_session_state(3, &keys[3].serialize()).unwrap());
        assert!(!record.has_session_state(2, &keys[1].serialize()).unwrap());
        let unknown = KeyPair::generate(&mut rng()).public_key;
        assert!(!record.has_session_state(3, &unknown.serialize()).unwrap());

        assert_eq!(record.serialize().unwrap(), before);
    }

    #[test]
    fn test_unacknowledged_pre_key_message_round_trip() {
        let base_key = KeyPair::generate(&mut rng()).public_key;
        let mut state = create_test_session_state(2, &base_key);
        state.set_unacknowledged_pre_key_message(Some(31.into()), None, &base_key);

        let items = state.unacknowledged_pre_key_message_items().unwrap().unwrap();
        assert_eq!(items.pre_key_id(), Some(31.into()));
        assert_eq!(items.signed_pre_key_id(), None);
        assert_eq!(items.base_key(), &base_key);

        state.clear_unacknowledged_pre_key_message();
        assert!(state.unacknowledged_pre_key_message_items().unwrap().is_none());
    }

    #[test]
    fn test_unset_version_reads_as_legacy() {
        assert_eq!(SessionState::placeholder().session_version().unwrap(), 2);
    }

    #[test]
    fn test_session_record_truncates_on_deserialize() {
        let structure: SessionStructure =
            create_test_session_state(3, &KeyPair::generate(&mut rng()).public_key).into();
        let oversized = RecordStructure {
            current_session: None,
            previous_sessions: vec![structure; consts::ARCHIVED_STATES_MAX_LENGTH + 10],
        };

        let restored = SessionRecord::deserialize(&oversized.encode_to_vec()).unwrap();
        assert_eq!(
            restored.previous_session_count(),
            consts::ARCHIVED_STATES_MAX_LENGTH
        );
    }
}
