//
// Copyright 2020-2022 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

mod bundle;
mod prekey;
mod session;

use std::fmt;

pub use bundle::{PreKeyBundle, PreKeyBundleContent};
pub use prekey::{PreKeyRecord, SignedPreKeyRecord};
pub use session::{PendingKeyExchange, SessionRecord, SessionState, UnacknowledgedPreKeyMessageItems};

/// Identifier of a one-time pre-key.
#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, derive_more::From, derive_more::Into,
)]
pub struct PreKeyId(u32);

impl fmt::Display for PreKeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a signed pre-key.
#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, derive_more::From, derive_more::Into,
)]
pub struct SignedPreKeyId(u32);

impl fmt::Display for SignedPreKeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
