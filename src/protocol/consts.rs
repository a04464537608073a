//
// Copyright 2020 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

/// Protocol version negotiated by current peers (signed pre-keys).
pub const CIPHERTEXT_MESSAGE_CURRENT_VERSION: u8 = 3;
/// Legacy protocol version (one-time pre-keys only).
pub const CIPHERTEXT_MESSAGE_LEGACY_VERSION: u8 = 2;

pub const MAX_RECEIVER_CHAINS: usize = 5;
pub const ARCHIVED_STATES_MAX_LENGTH: usize = 40;
