//
// Copyright 2020-2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::panic::UnwindSafe;

use crate::core::{
    ProtocolAddress,
    curve::{CurveError, KeyType},
};
use displaydoc::Display;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignalProtocolError>;

#[derive(Debug, Display, Error)]
pub enum SignalProtocolError {
    /// invalid argument: {0}
    InvalidArgument(String),
    /// invalid state for call to {0} to succeed: {1}
    InvalidState(&'static str, String),

    /// protobuf encoding was invalid
    InvalidProtobufEncoding,

    /// no key type identifier
    NoKeyTypeIdentifier,
    /// bad key type <{0:#04x}>
    BadKeyType(u8),
    /// bad key length <{1}> for key with type <{0}>
    BadKeyLength(KeyType, usize),

    /// untrusted identity for address {0}
    UntrustedIdentity(ProtocolAddress),
    /// invalid key: {0}
    InvalidKey(&'static str),
    /// invalid key id: {0}
    InvalidKeyId(String),
    /// invalid message: {0}
    InvalidMessage(String),
    /// received response for unknown key exchange with sequence {0}
    StaleKeyExchange(u32),

    /// session with {0} not found
    NoSession(ProtocolAddress),
    /// invalid session: {0}
    InvalidSessionStructure(&'static str),
    /// duplicate message: {0}
    DuplicateMessage(String),

    /// error in method call '{0}': {1}
    ApplicationCallbackError(
        &'static str,
        #[source] Box<dyn std::error::Error + Send + Sync + UnwindSafe + 'static>,
    ),
}

impl SignalProtocolError {
    /// Convenience factory for [`SignalProtocolError::ApplicationCallbackError`].
    #[inline]
    pub fn for_application_callback<E: std::error::Error + Send + Sync + UnwindSafe + 'static>(
        method: &'static str,
    ) -> impl FnOnce(E) -> Self {
        move |error| Self::ApplicationCallbackError(method, Box::new(error))
    }
}

impl From<CurveError> for SignalProtocolError {
    fn from(e: CurveError) -> Self {
        match e {
            CurveError::NoKeyTypeIdentifier => Self::NoKeyTypeIdentifier,
            CurveError::BadKeyType(raw) => Self::BadKeyType(raw),
            CurveError::BadKeyLength(key_type, len) => Self::BadKeyLength(key_type, len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn test_error_messages() {
        let address = ProtocolAddress::new("bob".to_string(), 1.into());
        assert_eq!(
            SignalProtocolError::UntrustedIdentity(address).to_string(),
            "untrusted identity for address bob.1"
        );
        assert_eq!(
            SignalProtocolError::StaleKeyExchange(42).to_string(),
            "received response for unknown key exchange with sequence 42"
        );
    }

    #[test]
    fn test_application_callback_keeps_source() {
        let err = SignalProtocolError::for_application_callback("store_session")(DiskFull);
        assert_eq!(err.to_string(), "error in method call 'store_session': disk full");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_curve_error_conversion() {
        let err: SignalProtocolError = CurveError::BadKeyType(0x07).into();
        assert!(matches!(err, SignalProtocolError::BadKeyType(0x07)));
    }
}
