// Key generation for install time and for publishing pre-keys.

use chrono::Utc;
use rand::{CryptoRng, Rng};

use crate::protocol::{
    IdentityKeyPair, KeyPair, PreKeyId, PreKeyRecord, SignedPreKeyId, SignedPreKeyRecord,
};

/// Pre-key ids are 24-bit on the wire.
pub const PRE_KEY_MEDIUM_MAX_VALUE: u32 = 0xFF_FFFF;

pub fn generate_identity_key_pair<R: Rng + CryptoRng>(csprng: &mut R) -> IdentityKeyPair {
    IdentityKeyPair::generate(csprng)
}

/// Generates a registration ID. Clients should only do this once, at install time.
pub fn generate_registration_id<R: Rng + CryptoRng>(csprng: &mut R) -> u32 {
    // The valid range is 1-16380
    csprng.random_range(1..=16380)
}

/// Generates `count` one-time pre-keys with ids starting at `start`.
///
/// Ids wrap around within `1..PRE_KEY_MEDIUM_MAX_VALUE`, so `0` is never handed out.
pub fn generate_pre_keys<R: Rng + CryptoRng>(
    csprng: &mut R,
    start: u32,
    count: u32,
) -> Vec<PreKeyRecord> {
    (0..count)
        .map(|i| {
            let id = (start.wrapping_add(i) % (PRE_KEY_MEDIUM_MAX_VALUE - 1)) + 1;
            PreKeyRecord::new(PreKeyId::from(id), KeyPair::generate(csprng))
        })
        .collect()
}

/// Generates a signed pre-key whose public half is signed with `identity_key_pair`.
pub fn generate_signed_pre_key<R: Rng + CryptoRng>(
    csprng: &mut R,
    identity_key_pair: &IdentityKeyPair,
    signed_pre_key_id: SignedPreKeyId,
) -> SignedPreKeyRecord {
    let key_pair = KeyPair::generate(csprng);
    let signature = identity_key_pair.sign(&key_pair.public_key.serialize(), csprng);
    SignedPreKeyRecord::new(signed_pre_key_id, Utc::now(), key_pair, signature)
}

/// A random 16-bit sequence number for a synchronous key exchange.
pub fn generate_sequence<R: Rng + CryptoRng>(csprng: &mut R) -> u32 {
    u32::from(csprng.random::<u16>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_id_range() {
        let mut csprng = rand::rng();
        for _ in 0..1000 {
            let id = generate_registration_id(&mut csprng);
            assert!((1..=16380).contains(&id));
        }
    }

    #[test]
    fn test_pre_key_ids_wrap_and_skip_zero() {
        let mut csprng = rand::rng();
        let ids: Vec<u32> = generate_pre_keys(&mut csprng, PRE_KEY_MEDIUM_MAX_VALUE - 3, 4)
            .iter()
            .map(|record| record.id().into())
            .collect();
        assert_eq!(
            ids,
            vec![
                PRE_KEY_MEDIUM_MAX_VALUE - 1,
                1,
                2,
                3,
            ]
        );
    }

    #[test]
    fn test_signed_pre_key_signature_verifies() {
        let mut csprng = rand::rng();
        let identity = generate_identity_key_pair(&mut csprng);
        let signed = generate_signed_pre_key(&mut csprng, &identity, 5.into());
        assert_eq!(signed.id(), 5.into());
        assert!(
            identity
                .public_key()
                .verify_signature(&signed.public_key().serialize(), signed.signature())
        );
    }

    #[test]
    fn test_sequence_fits_in_sixteen_bits() {
        let mut csprng = rand::rng();
        assert!(generate_sequence(&mut csprng) <= u32::from(u16::MAX));
    }
}
