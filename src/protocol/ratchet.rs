//
// Copyright 2020 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

pub mod keys;
mod params;

use arrayref::array_ref;
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

pub use self::keys::{ChainKey, RootKey};
pub use self::params::{
    AliceSignalProtocolParameters, BobSignalProtocolParameters, SymmetricSignalProtocolParameters,
};
use crate::protocol::consts::{
    CIPHERTEXT_MESSAGE_CURRENT_VERSION, CIPHERTEXT_MESSAGE_LEGACY_VERSION,
};
use crate::protocol::state::SessionState;
use crate::protocol::{KeyPair, Result, SignalProtocolError};

/// Room for the discontinuity bytes plus four agreements.
const MAX_SECRETS_LEN: usize = 32 * 5;

pub fn derive_keys(version: u8, secret_input: &[u8]) -> (RootKey, ChainKey) {
    let mut secrets = Zeroizing::new([0u8; 64]);
    keys::derive_secrets(version, None, secret_input, b"WhisperText", &mut secrets[..]);

    (
        RootKey::new(*array_ref![secrets, 0, 32]),
        ChainKey::new(*array_ref![secrets, 32, 32], 0),
    )
}

fn check_version(version: u8) -> Result<()> {
    if !(CIPHERTEXT_MESSAGE_LEGACY_VERSION..=CIPHERTEXT_MESSAGE_CURRENT_VERSION).contains(&version) {
        return Err(SignalProtocolError::InvalidArgument(format!(
            "cannot initialize a version {version} session"
        )));
    }
    Ok(())
}

/// Accumulates the concatenated DH outputs that feed [`derive_keys`].
struct SecretInput {
    buf: Zeroizing<[u8; MAX_SECRETS_LEN]>,
    len: usize,
}

impl SecretInput {
    fn new(version: u8) -> Self {
        let mut input = Self {
            buf: Zeroizing::new([0u8; MAX_SECRETS_LEN]),
            len: 0,
        };
        if version >= CIPHERTEXT_MESSAGE_CURRENT_VERSION {
            // "discontinuity bytes"
            input.push(&[0xFFu8; 32]);
        }
        input
    }

    fn push(&mut self, agreement: &[u8; 32]) {
        self.buf[self.len..self.len + 32].copy_from_slice(agreement);
        self.len += 32;
    }

    fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

pub fn initialize_alice_session<R: Rng + CryptoRng>(
    version: u8,
    parameters: &AliceSignalProtocolParameters,
    csprng: &mut R,
) -> Result<SessionState> {
    check_version(version)?;
    let local_identity = parameters.our_identity_key_pair().identity_key();
    let our_base_private_key = &parameters.our_base_key_pair().private_key;

    let sending_ratchet_key = KeyPair::generate(csprng);

    let mut secrets = SecretInput::new(version);
    secrets.push(
        &parameters
            .our_identity_key_pair()
            .private_key()
            .calculate_agreement(parameters.their_signed_pre_key()),
    );
    secrets.push(
        &our_base_private_key.calculate_agreement(parameters.their_identity_key().public_key()),
    );
    secrets.push(&our_base_private_key.calculate_agreement(parameters.their_signed_pre_key()));

    if version >= CIPHERTEXT_MESSAGE_CURRENT_VERSION
        && let Some(their_one_time_prekey) = parameters.their_one_time_pre_key()
    {
        secrets.push(&our_base_private_key.calculate_agreement(their_one_time_prekey));
    }

    let (root_key, chain_key) = derive_keys(version, secrets.as_slice());

    let (sending_chain_root_key, sending_chain_chain_key) = root_key.create_chain(
        version,
        parameters.their_ratchet_key(),
        &sending_ratchet_key.private_key,
    );

    let session = SessionState::new(
        version,
        local_identity,
        parameters.their_identity_key(),
        &sending_chain_root_key,
        &parameters.our_base_key_pair().public_key,
    )
    .with_receiver_chain(parameters.their_ratchet_key(), &chain_key)
    .with_sender_chain(&sending_ratchet_key, &sending_chain_chain_key);

    Ok(session)
}

pub fn initialize_bob_session(
    version: u8,
    parameters: &BobSignalProtocolParameters,
) -> Result<SessionState> {
    check_version(version)?;
    let local_identity = parameters.our_identity_key_pair().identity_key();
    let our_signed_pre_key = &parameters.our_signed_pre_key_pair().private_key;

    let mut secrets = SecretInput::new(version);
    secrets.push(
        &our_signed_pre_key.calculate_agreement(parameters.their_identity_key().public_key()),
    );
    secrets.push(
        &parameters
            .our_identity_key_pair()
            .private_key()
            .calculate_agreement(parameters.their_base_key()),
    );
    secrets.push(&our_signed_pre_key.calculate_agreement(parameters.their_base_key()));

    if version >= CIPHERTEXT_MESSAGE_CURRENT_VERSION
        && let Some(our_one_time_pre_key_pair) = parameters.our_one_time_pre_key_pair()
    {
        secrets.push(
            &our_one_time_pre_key_pair
                .private_key
                .calculate_agreement(parameters.their_base_key()),
        );
    }

    let (root_key, chain_key) = derive_keys(version, secrets.as_slice());

    let session = SessionState::new(
        version,
        local_identity,
        parameters.their_identity_key(),
        &root_key,
        parameters.their_base_key(),
    )
    .with_sender_chain(parameters.our_ratchet_key_pair(), &chain_key);

    Ok(session)
}

/// Derives a session from a key exchange, taking the Alice or Bob role by base key order.
pub fn initialize_symmetric_session<R: Rng + CryptoRng>(
    version: u8,
    parameters: &SymmetricSignalProtocolParameters,
    csprng: &mut R,
) -> Result<SessionState> {
    if parameters.is_alice() {
        let alice = AliceSignalProtocolParameters::new(
            parameters.our_identity_key_pair().clone(),
            parameters.our_base_key_pair().clone(),
            *parameters.their_identity_key(),
            *parameters.their_base_key(),
            *parameters.their_ratchet_key(),
        );
        initialize_alice_session(version, &alice, csprng)
    } else {
        let bob = BobSignalProtocolParameters::new(
            parameters.our_identity_key_pair().clone(),
            parameters.our_base_key_pair().clone(),
            None,
            parameters.our_ratchet_key_pair().clone(),
            *parameters.their_identity_key(),
            *parameters.their_base_key(),
        );
        initialize_bob_session(version, &bob)
    }
}
