pub mod address;
pub mod curve;

pub use address::{DeviceId, ProtocolAddress};
pub use curve::{CurveError, KeyPair, KeyType, PrivateKey, PublicKey};
