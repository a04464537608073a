//
// Copyright 2020 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use crate::protocol::state::{PreKeyId, SignedPreKeyId};
use crate::protocol::{DeviceId, IdentityKey, PublicKey, Result, SignalProtocolError};

#[derive(Clone, Debug)]
struct SignedPreKey {
    id: SignedPreKeyId,
    public_key: PublicKey,
    signature: Vec<u8>,
}

// Represents the raw contents of the pre-key bundle without any notion of required/optional
// fields.
// Can be used as a "builder" for PreKeyBundle, in which case all the validation will happen in
// the TryFrom impl.
#[derive(Default)]
pub struct PreKeyBundleContent {
    pub registration_id: Option<u32>,
    pub device_id: Option<DeviceId>,
    pub pre_key_id: Option<PreKeyId>,
    pub pre_key_public: Option<PublicKey>,
    pub signed_pre_key_id: Option<SignedPreKeyId>,
    pub signed_pre_key_public: Option<PublicKey>,
    pub signed_pre_key_signature: Option<Vec<u8>>,
    pub identity_key: Option<IdentityKey>,
}

impl From<PreKeyBundle> for PreKeyBundleContent {
    fn from(bundle: PreKeyBundle) -> Self {
        let (signed_pre_key_id, signed_pre_key_public, signed_pre_key_signature) =
            match bundle.signed_pre_key {
                Some(spk) => (Some(spk.id), Some(spk.public_key), Some(spk.signature)),
                None => (None, None, None),
            };
        Self {
            registration_id: Some(bundle.registration_id),
            device_id: Some(bundle.device_id),
            pre_key_id: bundle.pre_key_id,
            pre_key_public: bundle.pre_key_public,
            signed_pre_key_id,
            signed_pre_key_public,
            signed_pre_key_signature,
            identity_key: Some(bundle.identity_key),
        }
    }
}

impl TryFrom<PreKeyBundleContent> for PreKeyBundle {
    type Error = SignalProtocolError;

    fn try_from(content: PreKeyBundleContent) -> Result<Self> {
        // A signed pre-key needs all three parts or none of them.
        let signed_pre_key = match (
            content.signed_pre_key_id,
            content.signed_pre_key_public,
            content.signed_pre_key_signature,
        ) {
            (Some(id), Some(public), Some(signature)) => Some((id, public, signature)),
            (None, None, None) => None,
            _ => {
                return Err(SignalProtocolError::InvalidArgument(
                    "signed pre-key requires id, public key and signature".to_string(),
                ));
            }
        };

        Ok(PreKeyBundle::new(
            content.registration_id.ok_or_else(|| {
                SignalProtocolError::InvalidArgument("registration_id is required".to_string())
            })?,
            content.device_id.ok_or_else(|| {
                SignalProtocolError::InvalidArgument("device_id is required".to_string())
            })?,
            content
                .pre_key_id
                .and_then(|id| content.pre_key_public.map(|public| (id, public))),
            signed_pre_key,
            content.identity_key.ok_or_else(|| {
                SignalProtocolError::InvalidArgument("identity_key is required".to_string())
            })?,
        ))
    }
}

/// A publishable snapshot of a peer's identity and pre-keys.
///
/// Either pre-key may be absent; [`crate::protocol::SessionBuilder::process_prekey_bundle`]
/// rejects a bundle that carries neither.
#[derive(Clone, Debug)]
pub struct PreKeyBundle {
    registration_id: u32,
    device_id: DeviceId,
    pre_key_id: Option<PreKeyId>,
    pre_key_public: Option<PublicKey>,
    signed_pre_key: Option<SignedPreKey>,
    identity_key: IdentityKey,
}

impl PreKeyBundle {
    pub fn new(
        registration_id: u32,
        device_id: DeviceId,
        pre_key: Option<(PreKeyId, PublicKey)>,
        signed_pre_key: Option<(SignedPreKeyId, PublicKey, Vec<u8>)>,
        identity_key: IdentityKey,
    ) -> Self {
        let (pre_key_id, pre_key_public) = match pre_key {
            None => (None, None),
            Some((id, key)) => (Some(id), Some(key)),
        };

        Self {
            registration_id,
            device_id,
            pre_key_id,
            pre_key_public,
            signed_pre_key: signed_pre_key.map(|(id, public_key, signature)| SignedPreKey {
                id,
                public_key,
                signature,
            }),
            identity_key,
        }
    }

    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn pre_key_id(&self) -> Option<PreKeyId> {
        self.pre_key_id
    }

    pub fn pre_key_public(&self) -> Option<PublicKey> {
        self.pre_key_public
    }

    pub fn signed_pre_key_id(&self) -> Option<SignedPreKeyId> {
        self.signed_pre_key.as_ref().map(|spk| spk.id)
    }

    pub fn signed_pre_key_public(&self) -> Option<PublicKey> {
        self.signed_pre_key.as_ref().map(|spk| spk.public_key)
    }

    pub fn signed_pre_key_signature(&self) -> Option<&[u8]> {
        self.signed_pre_key.as_ref().map(|spk| spk.signature.as_ref())
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    pub fn modify<F>(self, modify: F) -> Result<Self>
    where
        F: FnOnce(&mut PreKeyBundleContent),
    {
        let mut content = self.into();
        modify(&mut content);
        content.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{IdentityKeyPair, KeyPair};

    fn sample_bundle() -> PreKeyBundle {
        let mut csprng = rand::rng();
        let identity = IdentityKeyPair::generate(&mut csprng);
        let signed = KeyPair::generate(&mut csprng);
        let one_time = KeyPair::generate(&mut csprng);
        PreKeyBundle::new(
            77,
            1.into(),
            Some((5.into(), one_time.public_key)),
            Some((9.into(), signed.public_key, vec![0u8; 64])),
            *identity.identity_key(),
        )
    }

    #[test]
    fn test_modify_removes_pre_keys() {
        let bundle = sample_bundle()
            .modify(|content| {
                content.pre_key_id = None;
                content.pre_key_public = None;
            })
            .unwrap();
        assert_eq!(bundle.pre_key_id(), None);
        assert_eq!(bundle.signed_pre_key_id(), Some(9.into()));

        let bundle = bundle
            .modify(|content| {
                content.signed_pre_key_id = None;
                content.signed_pre_key_public = None;
                content.signed_pre_key_signature = None;
            })
            .unwrap();
        assert!(bundle.signed_pre_key_public().is_none());
        assert_eq!(bundle.registration_id(), 77);
    }

    #[test]
    fn test_partial_signed_pre_key_is_rejected() {
        let result = sample_bundle().modify(|content| content.signed_pre_key_signature = None);
        assert!(matches!(
            result,
            Err(SignalProtocolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_missing_identity_is_rejected() {
        let result = sample_bundle().modify(|content| content.identity_key = None);
        assert!(result.is_err());
    }
}
