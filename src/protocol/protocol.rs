//
// Copyright 2020-2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use prost::Message;

use crate::protocol::consts::{
    CIPHERTEXT_MESSAGE_CURRENT_VERSION, CIPHERTEXT_MESSAGE_LEGACY_VERSION,
};
use crate::protocol::proto::KeyExchangeMessageStructure;
use crate::protocol::state::{PreKeyId, SignedPreKeyId};
use crate::protocol::{IdentityKey, PublicKey, Result, SignalProtocolError};

/// The key-agreement header of an incoming pre-key message.
///
/// The embedded ciphertext is not carried here; session setup only needs the keys.
#[derive(Debug, Clone)]
pub struct PreKeySignalMessage {
    message_version: u8,
    registration_id: u32,
    pre_key_id: Option<PreKeyId>,
    signed_pre_key_id: SignedPreKeyId,
    base_key: PublicKey,
    identity_key: IdentityKey,
}

impl PreKeySignalMessage {
    pub fn new(
        message_version: u8,
        registration_id: u32,
        pre_key_id: Option<PreKeyId>,
        signed_pre_key_id: SignedPreKeyId,
        base_key: PublicKey,
        identity_key: IdentityKey,
    ) -> Self {
        Self {
            message_version,
            registration_id,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            identity_key,
        }
    }

    #[inline]
    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    #[inline]
    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    #[inline]
    pub fn pre_key_id(&self) -> Option<PreKeyId> {
        self.pre_key_id
    }

    #[inline]
    pub fn signed_pre_key_id(&self) -> SignedPreKeyId {
        self.signed_pre_key_id
    }

    #[inline]
    pub fn base_key(&self) -> &PublicKey {
        &self.base_key
    }

    #[inline]
    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }
}

/// A synchronous handshake message, exchanged when both parties are online.
#[derive(Debug, Clone)]
pub struct KeyExchangeMessage {
    version: u8,
    max_version: u8,
    sequence: u32,
    flags: u32,
    base_key: PublicKey,
    base_key_signature: Box<[u8]>,
    ratchet_key: PublicKey,
    identity_key: IdentityKey,
    serialized: Box<[u8]>,
}

impl KeyExchangeMessage {
    pub const INITIATE_FLAG: u32 = 0x01;
    pub const RESPONSE_FLAG: u32 = 0x02;
    pub const SIMULTANEOUS_INITIATE_FLAG: u32 = 0x04;

    /// Low bits of the `id` field hold the flags, the rest hold the sequence.
    const FLAG_BITS: u32 = 5;
    /// Largest sequence number that fits beside the flags in the `id` field.
    pub const MAX_SEQUENCE: u32 = u32::MAX >> Self::FLAG_BITS;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: u8,
        max_version: u8,
        sequence: u32,
        flags: u32,
        base_key: PublicKey,
        base_key_signature: &[u8],
        ratchet_key: PublicKey,
        identity_key: IdentityKey,
    ) -> Self {
        debug_assert!(
            sequence <= Self::MAX_SEQUENCE,
            "sequence {sequence} does not fit beside the flag bits"
        );
        let proto_message = KeyExchangeMessageStructure {
            id: Some((sequence << Self::FLAG_BITS) | flags),
            base_key: Some(base_key.serialize().to_vec()),
            ratchet_key: Some(ratchet_key.serialize().to_vec()),
            identity_key: Some(identity_key.serialize().to_vec()),
            base_key_signature: Some(base_key_signature.to_vec()),
        };
        let mut serialized = Vec::with_capacity(1 + proto_message.encoded_len());
        serialized.push(((version & 0xF) << 4) | (max_version & 0xF));
        proto_message
            .encode(&mut serialized)
            .expect("can always append to a Vec");

        Self {
            version,
            max_version,
            sequence,
            flags,
            base_key,
            base_key_signature: base_key_signature.into(),
            ratchet_key,
            identity_key,
            serialized: serialized.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    #[inline]
    pub fn max_version(&self) -> u8 {
        self.max_version
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[inline]
    pub fn base_key(&self) -> &PublicKey {
        &self.base_key
    }

    #[inline]
    pub fn base_key_signature(&self) -> &[u8] {
        &self.base_key_signature
    }

    #[inline]
    pub fn ratchet_key(&self) -> &PublicKey {
        &self.ratchet_key
    }

    #[inline]
    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    #[inline]
    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }

    pub fn is_initiate(&self) -> bool {
        self.flags & Self::INITIATE_FLAG != 0
    }

    pub fn is_response(&self) -> bool {
        self.flags & Self::RESPONSE_FLAG != 0
    }

    pub fn is_response_for_simultaneous_initiate(&self) -> bool {
        self.flags & Self::SIMULTANEOUS_INITIATE_FLAG != 0
    }
}

impl AsRef<[u8]> for KeyExchangeMessage {
    fn as_ref(&self) -> &[u8] {
        &self.serialized
    }
}

impl TryFrom<&[u8]> for KeyExchangeMessage {
    type Error = SignalProtocolError;

    fn try_from(value: &[u8]) -> Result<Self> {
        let Some((&version_byte, body)) = value.split_first() else {
            return Err(SignalProtocolError::InvalidMessage(
                "empty key exchange message".to_string(),
            ));
        };

        let version = version_byte >> 4;
        let max_version = version_byte & 0xF;
        if version < CIPHERTEXT_MESSAGE_LEGACY_VERSION {
            return Err(SignalProtocolError::InvalidMessage(format!(
                "legacy key exchange version {version}"
            )));
        }
        if version > CIPHERTEXT_MESSAGE_CURRENT_VERSION {
            return Err(SignalProtocolError::InvalidMessage(format!(
                "unknown key exchange version {version}"
            )));
        }

        let proto_structure = KeyExchangeMessageStructure::decode(body)
            .map_err(|_| SignalProtocolError::InvalidProtobufEncoding)?;

        let (Some(id), Some(base_key), Some(ratchet_key), Some(identity_key), Some(signature)) = (
            proto_structure.id,
            proto_structure.base_key,
            proto_structure.ratchet_key,
            proto_structure.identity_key,
            proto_structure.base_key_signature,
        ) else {
            return Err(SignalProtocolError::InvalidMessage(
                "key exchange message is missing required fields".to_string(),
            ));
        };

        Ok(Self {
            version,
            max_version,
            sequence: id >> Self::FLAG_BITS,
            flags: id & ((1 << Self::FLAG_BITS) - 1),
            base_key: PublicKey::deserialize(&base_key)?,
            base_key_signature: signature.into_boxed_slice(),
            ratchet_key: PublicKey::deserialize(&ratchet_key)?,
            identity_key: IdentityKey::decode(&identity_key)?,
            serialized: Box::from(value),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::protocol::{IdentityKeyPair, KeyPair};

    fn sample(version: u8, flags: u32) -> KeyExchangeMessage {
        let mut csprng = rand::rng();
        let identity = IdentityKeyPair::generate(&mut csprng);
        let base = KeyPair::generate(&mut csprng);
        let ratchet = KeyPair::generate(&mut csprng);
        let signature = identity.sign(&base.public_key.serialize(), &mut csprng);
        KeyExchangeMessage::new(
            version,
            CIPHERTEXT_MESSAGE_CURRENT_VERSION,
            0xBEEF,
            flags,
            base.public_key,
            &signature,
            ratchet.public_key,
            *identity.identity_key(),
        )
    }

    #[test]
    fn test_key_exchange_message_wire_form() {
        let message = sample(
            3,
            KeyExchangeMessage::RESPONSE_FLAG | KeyExchangeMessage::SIMULTANEOUS_INITIATE_FLAG,
        );
        assert_eq!(message.serialized()[0], 0x33);

        let parsed = KeyExchangeMessage::try_from(message.serialized()).unwrap();
        assert_eq!(parsed.version(), 3);
        assert_eq!(parsed.max_version(), 3);
        assert_eq!(parsed.sequence(), 0xBEEF);
        assert!(parsed.is_response());
        assert!(parsed.is_response_for_simultaneous_initiate());
        assert!(!parsed.is_initiate());
        assert_eq!(parsed.base_key(), message.base_key());
        assert_eq!(parsed.base_key_signature(), message.base_key_signature());
        assert_eq!(parsed.identity_key(), message.identity_key());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "does not fit beside the flag bits")]
    fn test_key_exchange_message_rejects_oversized_sequence() {
        let mut csprng = rand::rng();
        let identity = IdentityKeyPair::generate(&mut csprng);
        let base = KeyPair::generate(&mut csprng);
        KeyExchangeMessage::new(
            3,
            3,
            KeyExchangeMessage::MAX_SEQUENCE + 1,
            KeyExchangeMessage::INITIATE_FLAG,
            base.public_key,
            &[0u8; 64],
            base.public_key,
            *identity.identity_key(),
        );
    }

    #[test]
    fn test_key_exchange_message_rejects_versions() {
        let mut bytes = sample(3, KeyExchangeMessage::INITIATE_FLAG).serialized().to_vec();

        bytes[0] = 0x13;
        assert!(matches!(
            KeyExchangeMessage::try_from(bytes.as_slice()),
            Err(SignalProtocolError::InvalidMessage(_))
        ));

        bytes[0] = 0x43;
        assert!(matches!(
            KeyExchangeMessage::try_from(bytes.as_slice()),
            Err(SignalProtocolError::InvalidMessage(_))
        ));

        assert!(KeyExchangeMessage::try_from(&[][..]).is_err());
    }

    #[test]
    fn test_key_exchange_message_requires_all_fields() {
        let partial = KeyExchangeMessageStructure {
            id: Some((1 << 5) | KeyExchangeMessage::INITIATE_FLAG),
            ..Default::default()
        };
        let mut bytes = vec![0x33];
        bytes.extend(partial.encode_to_vec());
        assert!(matches!(
            KeyExchangeMessage::try_from(bytes.as_slice()),
            Err(SignalProtocolError::InvalidMessage(_))
        ));
    }
}
