//
// Copyright 2020 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use arrayref::array_ref;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::protocol::consts::CIPHERTEXT_MESSAGE_LEGACY_VERSION;
use crate::protocol::{PrivateKey, PublicKey};

const HASH_OUTPUT_SIZE: usize = 32;

fn hmac_sha256(key: &[u8], input: &[&[u8]]) -> [u8; HASH_OUTPUT_SIZE] {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
    for piece in input {
        mac.update(piece);
    }
    mac.finalize().into_bytes().into()
}

/// HKDF-SHA256 as used by the given protocol version.
///
/// Version 3 is RFC 5869. Version 2 peers number the expansion blocks from 0
/// instead of 1, so their output differs from the first block on.
pub(crate) fn derive_secrets(
    version: u8,
    salt: Option<&[u8]>,
    input_key_material: &[u8],
    info: &[u8],
    output: &mut [u8],
) {
    if version > CIPHERTEXT_MESSAGE_LEGACY_VERSION {
        hkdf::Hkdf::<Sha256>::new(salt, input_key_material)
            .expand(info, output)
            .expect("valid output length");
        return;
    }

    let prk = Zeroizing::new(hmac_sha256(
        salt.unwrap_or(&[0u8; HASH_OUTPUT_SIZE]),
        &[input_key_material],
    ));
    let mut previous = Zeroizing::new([0u8; HASH_OUTPUT_SIZE]);
    for (counter, chunk) in output.chunks_mut(HASH_OUTPUT_SIZE).enumerate() {
        let block_input: &[u8] = if counter == 0 { &[] } else { &previous[..] };
        *previous = hmac_sha256(&prk[..], &[block_input, info, &[counter as u8]]);
        chunk.copy_from_slice(&previous[..chunk.len()]);
    }
}

#[derive(Clone, Debug)]
pub struct ChainKey {
    key: [u8; 32],
    index: u32,
}

impl ChainKey {
    const CHAIN_KEY_SEED: [u8; 1] = [0x02u8];

    pub fn new(key: [u8; 32], index: u32) -> Self {
        Self { key, index }
    }

    #[inline]
    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn next_chain_key(&self) -> Self {
        Self {
            key: hmac_sha256(&self.key, &[&Self::CHAIN_KEY_SEED]),
            index: self.index + 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RootKey {
    key: [u8; 32],
}

impl RootKey {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// Steps the root key with a fresh DH output, yielding the next root key and a new chain.
    pub fn create_chain(
        &self,
        version: u8,
        their_ratchet_key: &PublicKey,
        our_ratchet_key: &PrivateKey,
    ) -> (RootKey, ChainKey) {
        let shared_secret = Zeroizing::new(our_ratchet_key.calculate_agreement(their_ratchet_key));
        let mut derived_secret_bytes = Zeroizing::new([0u8; 64]);
        derive_secrets(
            version,
            Some(&self.key),
            &shared_secret[..],
            b"WhisperRatchet",
            &mut derived_secret_bytes[..],
        );

        (
            RootKey {
                key: *array_ref![derived_secret_bytes, 0, 32],
            },
            ChainKey {
                key: *array_ref![derived_secret_bytes, 32, 32],
                index: 0,
            },
        )
    }
}
