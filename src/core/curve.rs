//
// Copyright 2020-2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

mod curve25519;
mod utils;

use std::cmp::Ordering;
use std::fmt;

use curve25519_dalek::scalar;
use rand::{CryptoRng, Rng};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use curve25519::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Length of a serialized public key: one type byte plus the key.
pub const SERIALIZED_PUBLIC_KEY_LENGTH: usize = PUBLIC_KEY_LENGTH + 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyType {
    Djb,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl KeyType {
    fn value(&self) -> u8 {
        match &self {
            KeyType::Djb => 0x05u8,
        }
    }
}

#[derive(Debug, displaydoc::Display)]
pub enum CurveError {
    /// no key type identifier
    NoKeyTypeIdentifier,
    /// bad key type <{0:#04x}>
    BadKeyType(u8),
    /// bad key length <{1}> for key with type <{0}>
    BadKeyLength(KeyType, usize),
}

impl std::error::Error for CurveError {}

impl TryFrom<u8> for KeyType {
    type Error = CurveError;

    fn try_from(x: u8) -> Result<Self, CurveError> {
        match x {
            0x05u8 => Ok(KeyType::Djb),
            t => Err(CurveError::BadKeyType(t)),
        }
    }
}

/// A Curve25519 public key. Serialized form is `0x05 || key`.
#[derive(Clone, Copy, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    pub fn deserialize(value: &[u8]) -> Result<Self, CurveError> {
        let Some((&type_byte, rest)) = value.split_first() else {
            return Err(CurveError::NoKeyTypeIdentifier);
        };
        match KeyType::try_from(type_byte)? {
            KeyType::Djb => {
                if rest.len() != PUBLIC_KEY_LENGTH {
                    return Err(CurveError::BadKeyLength(KeyType::Djb, value.len()));
                }
                Self::from_djb_public_key_bytes(rest)
            }
        }
    }

    pub fn from_djb_public_key_bytes(bytes: &[u8]) -> Result<Self, CurveError> {
        match <[u8; PUBLIC_KEY_LENGTH]>::try_from(bytes) {
            Err(_) => Err(CurveError::BadKeyLength(KeyType::Djb, bytes.len())),
            Ok(key) => Ok(PublicKey(key)),
        }
    }

    pub fn public_key_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn serialize(&self) -> [u8; SERIALIZED_PUBLIC_KEY_LENGTH] {
        let mut result = [0u8; SERIALIZED_PUBLIC_KEY_LENGTH];
        result[0] = self.key_type().value();
        result[1..].copy_from_slice(&self.0);
        result
    }

    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> bool {
        self.verify_signature_for_multipart_message(&[message], signature)
    }

    pub fn verify_signature_for_multipart_message(
        &self,
        message: &[&[u8]],
        signature: &[u8],
    ) -> bool {
        let Ok(signature) = signature.try_into() else {
            return false;
        };
        curve25519::PrivateKey::verify_signature(&self.0, message, signature)
    }

    pub fn key_type(&self) -> KeyType {
        KeyType::Djb
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = CurveError;

    fn try_from(value: &[u8]) -> Result<Self, CurveError> {
        Self::deserialize(value)
    }
}

impl ConstantTimeEq for PublicKey {
    fn ct_eq(&self, other: &PublicKey) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &PublicKey) -> bool {
        bool::from(self.ct_eq(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        utils::constant_time_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &PublicKey) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// A Curve25519 private key. The bytes are wiped when the key is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; curve25519::PRIVATE_KEY_LENGTH]);

impl PrivateKey {
    pub fn deserialize(value: &[u8]) -> Result<Self, CurveError> {
        let key = <[u8; curve25519::PRIVATE_KEY_LENGTH]>::try_from(value)
            .map_err(|_| CurveError::BadKeyLength(KeyType::Djb, value.len()))?;
        Ok(Self(scalar::clamp_integer(key)))
    }

    pub fn serialize(&self) -> &[u8; curve25519::PRIVATE_KEY_LENGTH] {
        &self.0
    }

    fn as_dalek(&self) -> curve25519::PrivateKey {
        curve25519::PrivateKey::from(self.0)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.as_dalek().derive_public_key_bytes())
    }

    pub fn key_type(&self) -> KeyType {
        KeyType::Djb
    }

    pub fn calculate_signature<R: CryptoRng + Rng>(
        &self,
        message: &[u8],
        csprng: &mut R,
    ) -> [u8; SIGNATURE_LENGTH] {
        self.as_dalek().calculate_signature(csprng, &[message])
    }

    pub fn calculate_agreement(&self, their_key: &PublicKey) -> [u8; 32] {
        self.as_dalek().calculate_agreement(their_key.public_key_bytes())
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.0.ct_eq(&other.0))
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

impl TryFrom<&[u8]> for PrivateKey {
    type Error = CurveError;

    fn try_from(value: &[u8]) -> Result<Self, CurveError> {
        Self::deserialize(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    pub fn generate<R: Rng + CryptoRng>(csprng: &mut R) -> Self {
        let secret = curve25519::PrivateKey::new(csprng);
        Self {
            public_key: PublicKey(secret.derive_public_key_bytes()),
            private_key: PrivateKey(secret.private_key_bytes()),
        }
    }

    pub fn new(public_key: PublicKey, private_key: PrivateKey) -> Self {
        Self {
            public_key,
            private_key,
        }
    }

    pub fn from_public_and_private(
        public_key: &[u8],
        private_key: &[u8],
    ) -> Result<Self, CurveError> {
        Ok(Self {
            public_key: PublicKey::try_from(public_key)?,
            private_key: PrivateKey::try_from(private_key)?,
        })
    }

    pub fn calculate_signature<R: CryptoRng + Rng>(
        &self,
        message: &[u8],
        csprng: &mut R,
    ) -> [u8; SIGNATURE_LENGTH] {
        self.private_key.calculate_signature(message, csprng)
    }

    pub fn calculate_agreement(&self, their_key: &PublicKey) -> [u8; 32] {
        self.private_key.calculate_agreement(their_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_serialization() {
        let mut csprng = rand::rng();
        let key_pair = KeyPair::generate(&mut csprng);

        let serialized = key_pair.public_key.serialize();
        assert_eq!(serialized[0], 0x05);
        assert_eq!(PublicKey::deserialize(&serialized).unwrap(), key_pair.public_key);
    }

    #[test]
    fn test_public_key_rejects_bad_input() {
        assert!(matches!(
            PublicKey::deserialize(&[]),
            Err(CurveError::NoKeyTypeIdentifier)
        ));

        let mut wrong_type = [0u8; SERIALIZED_PUBLIC_KEY_LENGTH];
        wrong_type[0] = 0x06;
        assert!(matches!(
            PublicKey::deserialize(&wrong_type),
            Err(CurveError::BadKeyType(0x06))
        ));

        let mut short = [0u8; 20];
        short[0] = 0x05;
        assert!(matches!(
            PublicKey::deserialize(&short),
            Err(CurveError::BadKeyLength(KeyType::Djb, 20))
        ));
    }

    #[test]
    fn test_private_key_derives_matching_public() {
        let mut csprng = rand::rng();
        let key_pair = KeyPair::generate(&mut csprng);
        let restored = PrivateKey::deserialize(key_pair.private_key.serialize()).unwrap();
        assert_eq!(restored.public_key(), key_pair.public_key);
    }

    #[test]
    fn test_key_pair_signature() {
        let mut csprng = rand::rng();
        let identity = KeyPair::generate(&mut csprng);
        let signed = KeyPair::generate(&mut csprng);
        let message = signed.public_key.serialize();

        let signature = identity.calculate_signature(&message, &mut csprng);
        assert!(identity.public_key.verify_signature(&message, &signature));
        assert!(!signed.public_key.verify_signature(&message, &signature));
        assert!(!identity.public_key.verify_signature(&message, &signature[..63]));
    }

    #[test]
    fn test_public_key_ordering() {
        let low = PublicKey::from_djb_public_key_bytes(&[0x01; 32]).unwrap();
        let high = PublicKey::from_djb_public_key_bytes(&[0x02; 32]).unwrap();
        assert!(low < high);
        assert_eq!(low.cmp(&low), Ordering::Equal);
    }
}
