//
// Copyright 2020-2022 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use chrono::{DateTime, Utc};

use crate::protocol::state::{PreKeyId, SignedPreKeyId};
use crate::protocol::{KeyPair, PublicKey};

/// A locally held one-time pre-key.
#[derive(Clone, Debug)]
pub struct PreKeyRecord {
    id: PreKeyId,
    key_pair: KeyPair,
}

impl PreKeyRecord {
    pub fn new(id: PreKeyId, key_pair: KeyPair) -> Self {
        Self { id, key_pair }
    }

    pub fn id(&self) -> PreKeyId {
        self.id
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn public_key(&self) -> PublicKey {
        self.key_pair.public_key
    }
}

/// A locally held signed pre-key, with the identity signature published alongside it.
#[derive(Clone, Debug)]
pub struct SignedPreKeyRecord {
    id: SignedPreKeyId,
    timestamp: DateTime<Utc>,
    key_pair: KeyPair,
    signature: [u8; 64],
}

impl SignedPreKeyRecord {
    pub fn new(
        id: SignedPreKeyId,
        timestamp: DateTime<Utc>,
        key_pair: KeyPair,
        signature: [u8; 64],
    ) -> Self {
        Self {
            id,
            timestamp,
            key_pair,
            signature,
        }
    }

    pub fn id(&self) -> SignedPreKeyId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn public_key(&self) -> PublicKey {
        self.key_pair.public_key
    }

    pub fn signature(&self) -> &[u8; 64] {
        &self.signature
    }
}
