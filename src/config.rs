/// How the in-memory identity store answers trust queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Accept an unknown identity, then require it to match on every later contact.
    #[default]
    TrustOnFirstUse,
    /// Accept every identity, pinned or not.
    TrustAll,
}

#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    pub trust_policy: TrustPolicy,
    /// Generated at construction when absent.
    pub registration_id: Option<u32>,
}
