//
// Copyright 2020-2022 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Protobuf structures for persisted session records and key-exchange messages.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionStructure {
    #[prost(uint32, optional, tag = "1")]
    pub session_version: ::core::option::Option<u32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub local_identity_public: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub remote_identity_public: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub root_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(uint32, optional, tag = "5")]
    pub previous_counter: ::core::option::Option<u32>,
    #[prost(message, optional, tag = "6")]
    pub sender_chain: ::core::option::Option<session_structure::Chain>,
    #[prost(message, repeated, tag = "7")]
    pub receiver_chains: ::prost::alloc::vec::Vec<session_structure::Chain>,
    #[prost(message, optional, tag = "8")]
    pub pending_key_exchange: ::core::option::Option<session_structure::PendingKeyExchange>,
    #[prost(message, optional, tag = "9")]
    pub pending_pre_key: ::core::option::Option<session_structure::PendingPreKey>,
    #[prost(uint32, optional, tag = "10")]
    pub remote_registration_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "11")]
    pub local_registration_id: ::core::option::Option<u32>,
    #[prost(bytes = "vec", optional, tag = "13")]
    pub alice_base_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

/// Nested message types of [`SessionStructure`].
pub mod session_structure {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Chain {
        #[prost(bytes = "vec", optional, tag = "1")]
        pub sender_ratchet_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "2")]
        pub sender_ratchet_key_private: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
        #[prost(message, optional, tag = "3")]
        pub chain_key: ::core::option::Option<chain::ChainKey>,
    }

    pub mod chain {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ChainKey {
            #[prost(uint32, optional, tag = "1")]
            pub index: ::core::option::Option<u32>,
            #[prost(bytes = "vec", optional, tag = "2")]
            pub key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
        }
    }

    /// Key material held between sending a key-exchange INITIATE and receiving the response.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PendingKeyExchange {
        #[prost(uint32, optional, tag = "1")]
        pub sequence: ::core::option::Option<u32>,
        #[prost(bytes = "vec", optional, tag = "2")]
        pub local_base_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "3")]
        pub local_base_key_private: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "4")]
        pub local_ratchet_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "5")]
        pub local_ratchet_key_private: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "7")]
        pub local_identity_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "8")]
        pub local_identity_key_private: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    }

    /// Marks a session created from a pre-key bundle that the peer has not yet acknowledged.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PendingPreKey {
        #[prost(uint32, optional, tag = "1")]
        pub pre_key_id: ::core::option::Option<u32>,
        #[prost(int32, optional, tag = "3")]
        pub signed_pre_key_id: ::core::option::Option<i32>,
        #[prost(bytes = "vec", optional, tag = "2")]
        pub base_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecordStructure {
    #[prost(message, optional, tag = "1")]
    pub current_session: ::core::option::Option<SessionStructure>,
    #[prost(message, repeated, tag = "2")]
    pub previous_sessions: ::prost::alloc::vec::Vec<SessionStructure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyExchangeMessageStructure {
    /// `(sequence << 5) | flags`
    #[prost(uint32, optional, tag = "1")]
    pub id: ::core::option::Option<u32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub base_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub ratchet_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub identity_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub base_key_signature: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}
