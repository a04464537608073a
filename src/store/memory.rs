use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::config::{StoreConfig, TrustPolicy};
use crate::protocol::{
    Direction, IdentityChange, IdentityKey, IdentityKeyPair, IdentityKeyStore, PreKeyId,
    PreKeyRecord, PreKeyStore, ProtocolAddress, Result, SessionRecord,
    SessionStore, SignalProtocolError, SignedPreKeyId, SignedPreKeyRecord, SignedPreKeyStore,
};
use crate::store::generic::GenericMemoryStore;
use crate::util::keyhelper;

/// Pinned identities, keyed by peer name so every device of a peer shares one pin.
type IdentityMap = GenericMemoryStore<String, IdentityKey>;
type SessionMap = GenericMemoryStore<ProtocolAddress, Vec<u8>>;
type PreKeyMap = GenericMemoryStore<PreKeyId, PreKeyRecord>;
type SignedPreKeyMap = GenericMemoryStore<SignedPreKeyId, SignedPreKeyRecord>;

/// Reference implementation of every store a session builder needs, kept in memory.
///
/// Sessions are held serialized, so a record read back is always a fresh copy.
pub struct MemoryStore {
    identity_key_pair: IdentityKeyPair,
    registration_id: u32,
    trust_policy: TrustPolicy,
    identities: IdentityMap,
    sessions: SessionMap,
    pre_keys: PreKeyMap,
    signed_pre_keys: SignedPreKeyMap,
    write_count: AtomicU32,
}

impl MemoryStore {
    pub fn new(identity_key_pair: IdentityKeyPair, config: StoreConfig) -> Self {
        let registration_id = config
            .registration_id
            .unwrap_or_else(|| keyhelper::generate_registration_id(&mut rand::rng()));
        Self {
            identity_key_pair,
            registration_id,
            trust_policy: config.trust_policy,
            identities: IdentityMap::new(),
            sessions: SessionMap::new(),
            pre_keys: PreKeyMap::new(),
            signed_pre_keys: SignedPreKeyMap::new(),
            write_count: AtomicU32::new(0),
        }
    }

    /// A store with a freshly generated identity and the default configuration.
    pub fn generate() -> Self {
        let identity_key_pair = keyhelper::generate_identity_key_pair(&mut rand::rng());
        Self::new(identity_key_pair, StoreConfig::default())
    }

    /// Number of writes performed through any of the store traits.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.write_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityKeyStore for MemoryStore {
    async fn get_identity_key_pair(&self) -> Result<IdentityKeyPair> {
        Ok(self.identity_key_pair.clone())
    }

    async fn get_local_registration_id(&self) -> Result<u32> {
        Ok(self.registration_id)
    }

    async fn save_identity(&self, name: &str, identity: &IdentityKey) -> Result<IdentityChange> {
        self.record_write();
        let previous = self.identities.put(name.to_owned(), *identity).await;
        Ok(IdentityChange::from_changed(
            previous.is_some_and(|previous| previous != *identity),
        ))
    }

    async fn is_trusted_identity(
        &self,
        name: &str,
        identity: &IdentityKey,
        _direction: Direction,
    ) -> Result<bool> {
        match self.trust_policy {
            TrustPolicy::TrustAll => Ok(true),
            TrustPolicy::TrustOnFirstUse => Ok(self
                .identities
                .get(&name.to_owned())
                .await
                .is_none_or(|pinned| pinned == *identity)),
        }
    }

    async fn get_identity(&self, name: &str) -> Result<Option<IdentityKey>> {
        Ok(self.identities.get(&name.to_owned()).await)
    }
}

#[async_trait]
impl PreKeyStore for MemoryStore {
    async fn get_pre_key(&self, prekey_id: PreKeyId) -> Result<PreKeyRecord> {
        self.pre_keys
            .get(&prekey_id)
            .await
            .ok_or_else(|| SignalProtocolError::InvalidKeyId(format!("no pre-key {prekey_id}")))
    }

    async fn contains_pre_key(&self, prekey_id: PreKeyId) -> Result<bool> {
        Ok(self.pre_keys.contains(&prekey_id).await)
    }

    async fn save_pre_key(&self, prekey_id: PreKeyId, record: &PreKeyRecord) -> Result<()> {
        self.record_write();
        self.pre_keys.put(prekey_id, record.clone()).await;
        Ok(())
    }

    async fn remove_pre_key(&self, prekey_id: PreKeyId) -> Result<()> {
        self.record_write();
        self.pre_keys.remove(&prekey_id).await;
        Ok(())
    }
}

#[async_trait]
impl SignedPreKeyStore for MemoryStore {
    async fn get_signed_pre_key(
        &self,
        signed_prekey_id: SignedPreKeyId,
    ) -> Result<SignedPreKeyRecord> {
        self.signed_pre_keys
            .get(&signed_prekey_id)
            .await
            .ok_or_else(|| {
                SignalProtocolError::InvalidKeyId(format!(
                    "no signed pre-key {signed_prekey_id}"
                ))
            })
    }

    async fn save_signed_pre_key(
        &self,
        signed_prekey_id: SignedPreKeyId,
        record: &SignedPreKeyRecord,
    ) -> Result<()> {
        self.record_write();
        self.signed_pre_keys
            .put(signed_prekey_id, record.clone())
            .await;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>> {
        match self.sessions.get(address).await {
            Some(bytes) => Ok(Some(SessionRecord::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn store_session(
        &self,
        address: &ProtocolAddress,
        record: &SessionRecord,
    ) -> Result<()> {
        self.record_write();
        self.sessions.put(address.clone(), record.serialize()?).await;
        Ok(())
    }

    async fn contains_session(&self, address: &ProtocolAddress) -> Result<bool> {
        Ok(self.sessions.contains(address).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::protocol::KeyPair;

    fn address() -> ProtocolAddress {
        ProtocolAddress::new("+14152222222".to_string(), 1.into())
    }

    #[tokio::test]
    async fn test_registration_id_from_config() {
        let identity = keyhelper::generate_identity_key_pair(&mut rand::rng());
        let store = MemoryStore::new(
            identity,
            StoreConfig {
                registration_id: Some(1234),
                ..Default::default()
            },
        );
        assert_eq!(store.get_local_registration_id().await.unwrap(), 1234);
    }

    #[tokio::test]
    async fn test_trust_on_first_use_pins_identity() {
        let store = MemoryStore::generate();
        let mut csprng = rand::rng();
        let first = *IdentityKeyPair::generate(&mut csprng).identity_key();
        let second = *IdentityKeyPair::generate(&mut csprng).identity_key();

        assert!(
            store
                .is_trusted_identity(address().name(), &second, Direction::Receiving)
                .await
                .unwrap()
        );
        assert_eq!(
            store.save_identity(address().name(), &first).await.unwrap(),
            IdentityChange::NewOrUnchanged
        );
        assert!(
            store
                .is_trusted_identity(address().name(), &first, Direction::Sending)
                .await
                .unwrap()
        );
        assert!(
            !store
                .is_trusted_identity(address().name(), &second, Direction::Sending)
                .await
                .unwrap()
        );
        assert_eq!(
            store.save_identity(address().name(), &second).await.unwrap(),
            IdentityChange::ReplacedExisting
        );
    }

    #[tokio::test]
    async fn test_pin_covers_every_device_of_a_peer() {
        let store = MemoryStore::generate();
        let mut csprng = rand::rng();
        let pinned = *IdentityKeyPair::generate(&mut csprng).identity_key();
        let other = *IdentityKeyPair::generate(&mut csprng).identity_key();
        let first_device = ProtocolAddress::new("+14152222222".to_string(), 1.into());
        let second_device = ProtocolAddress::new("+14152222222".to_string(), 2.into());

        store
            .save_identity(first_device.name(), &pinned)
            .await
            .unwrap();
        assert!(
            !store
                .is_trusted_identity(second_device.name(), &other, Direction::Sending)
                .await
                .unwrap()
        );
        assert_eq!(
            store.get_identity(second_device.name()).await.unwrap(),
            Some(pinned)
        );
    }

    #[tokio::test]
    async fn test_trust_all_accepts_changed_identity() {
        let mut csprng = rand::rng();
        let store = MemoryStore::new(
            IdentityKeyPair::generate(&mut csprng),
            StoreConfig {
                trust_policy: TrustPolicy::TrustAll,
                ..Default::default()
            },
        );
        let first = *IdentityKeyPair::generate(&mut csprng).identity_key();
        let second = *IdentityKeyPair::generate(&mut csprng).identity_key();
        store.save_identity(address().name(), &first).await.unwrap();
        assert!(
            store
                .is_trusted_identity(address().name(), &second, Direction::Receiving)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_pre_keys_are_invalid_key_ids() {
        let store = MemoryStore::generate();
        assert!(matches!(
            store.get_pre_key(9.into()).await,
            Err(SignalProtocolError::InvalidKeyId(_))
        ));
        assert!(matches!(
            store.get_signed_pre_key(9.into()).await,
            Err(SignalProtocolError::InvalidKeyId(_))
        ));
    }

    #[tokio::test]
    async fn test_pre_key_lifecycle_counts_writes() {
        let store = MemoryStore::generate();
        let record = PreKeyRecord::new(3.into(), KeyPair::generate(&mut rand::rng()));

        store.save_pre_key(3.into(), &record).await.unwrap();
        assert!(store.contains_pre_key(3.into()).await.unwrap());
        assert_eq!(
            store.get_pre_key(3.into()).await.unwrap().public_key(),
            record.public_key()
        );

        store.remove_pre_key(3.into()).await.unwrap();
        assert!(!store.contains_pre_key(3.into()).await.unwrap());
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_session_round_trips_through_serialized_form() {
        let store = MemoryStore::generate();
        assert!(store.load_session(&address()).await.unwrap().is_none());
        assert!(!store.contains_session(&address()).await.unwrap());

        let record = SessionRecord::new_fresh();
        store.store_session(&address(), &record).await.unwrap();
        assert!(store.contains_session(&address()).await.unwrap());
        let loaded = store.load_session(&address()).await.unwrap().unwrap();
        assert_eq!(loaded.serialize().unwrap(), record.serialize().unwrap());
    }
}
