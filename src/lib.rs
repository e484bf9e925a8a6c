#![no_std]
#![deny(missing_docs, unsafe_code)]
#![deny(dead_code, keyword_idents, macro_use_extern_crate, meta_variable_misuse, missing_abi)]
#![deny(non_ascii_idents, trivial_casts, trivial_numeric_casts)]
#![deny(unused_extern_crates, unused_import_braces, unused_lifetimes, unused_macro_rules)]
//
#![doc = include_str!("../README.md")]

// Implements the Hierarchical Key Distribution System (HKDS): a symmetric
// key-distribution protocol for terminal fleets, built entirely on SHAKE
// (FIPS 202) and KMAC (NIST SP 800-185).
//
// Functionality map
//
// SHAKE / KMAC, scalar short and long form          --> keccak.rs
// SHAKE / KMAC, 4- and 8-way batched                --> parallel.rs
// EDK / CTOK / TOKEN / TMS derivations              --> key_schedule.rs
// client engine (token unwrap, cache, encrypt)      --> client.rs
// server engine (scalar, x8 batch, x64 fan-out)     --> server.rs
// wire packet shapes                                --> packet.rs
//
// The three parameter sets are modules in this file with injected macro code
// that connects them into the generic engines. Array sizes that depend on
// the security parameter are passed as const generics from the macro
// expansion sites, where every length is a concrete constant.

/// The `rand_core` types are re-exported so that users of hkds do not have
/// to worry about using the exact correct version of `rand_core`.
pub use rand_core::{CryptoRng, Error as RngError, RngCore};

pub use crate::types::AuthenticationMode;
use thiserror::Error;

mod client;
mod helpers;
mod key_schedule;
mod server;
mod types;

pub mod keccak;
pub mod packet;
pub mod parallel;
pub mod traits;

// Relevant to all parameter sets (byte counts)

/// Plaintext / ciphertext block size of a protocol message.
pub const MESSAGE_LEN: usize = 16;
/// KMAC authentication tag size.
pub const TAG_LEN: usize = 16;
/// Wire packet header size.
pub const HEADER_LEN: usize = 4;
/// Master key identity size.
pub const KID_LEN: usize = 4;
/// Device identity size.
pub const DID_LEN: usize = 12;
/// Key serial number size (device identity plus transaction counter).
pub const KSN_LEN: usize = 16;
/// Transaction key counter size (big-endian, inside the KSN).
pub const TKC_LEN: usize = 4;
/// Token customization string size.
pub const CTOK_LEN: usize = 23;
/// Formal algorithm name size.
pub const NAME_LEN: usize = 7;
/// Token MAC customization string size (KSN plus name).
pub const TMS_LEN: usize = KSN_LEN + NAME_LEN;
/// Administrative message payload size.
pub const ADMIN_LEN: usize = 2;
/// Error message payload size.
pub const ERROR_LEN: usize = 16;

/// Transaction key cache multiplier; the cache holds
/// `CACHE_MULTIPLIER * rate / MESSAGE_LEN` one-time keys. Must be even;
/// allowed values are 2, 4, 6, 8, 10, and 12. A larger multiplier means
/// fewer token exchanges but a slower server-side decrypt and a larger
/// client cache.
pub const CACHE_MULTIPLIER: usize = 4;

/// Lane count of the batched (x8) server engine.
pub const BATCH_WIDTH: usize = 8;
/// Number of x8 engines driven by one x64 call.
pub const PARALLEL_DEPTH: usize = 8;

/// Keccak permutation rounds: 24 by default; 48 with the
/// `keccak-double-rounds` feature, 12 with `keccak-half-rounds`.
pub const KECCAK_PERMUTATION_ROUNDS: usize = if cfg!(feature = "keccak-double-rounds") {
    48
} else if cfg!(feature = "keccak-half-rounds") {
    12
} else {
    24
};

/// True when the configured permutation is standard Keccak-f\[1600\] and the
/// SHAKE / KMAC outputs interoperate with FIPS 202 / SP 800-185
/// implementations.
pub const FIPS_INTEROPERABLE: bool = KECCAK_PERMUTATION_ROUNDS == 24;


/// The error taxonomy of the protocol core. All failures are surfaced as
/// explicit values; nothing is retried internally, and no error path leaks
/// plaintext or key material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HkdsError {
    /// A KMAC tag did not verify (token or authenticated message). The
    /// caller may retry with a fresh token; no cache or plaintext was
    /// produced.
    #[error("authentication tag did not verify")]
    AuthFailure,
    /// A client encrypt was invoked with an empty (or insufficient)
    /// transaction key cache; issue a fresh token request.
    #[error("transaction key cache is exhausted")]
    CacheExhausted,
    /// A packet's length or protocol id is inconsistent with its declared
    /// flag.
    #[error("packet format is invalid")]
    InvalidFormat,
    /// The entropy source failed; any partially generated master key was
    /// erased.
    #[error("entropy source failure")]
    EntropyFailure,
    /// The transaction counter would wrap past 2^32 - 1; the device has
    /// reached end of life.
    #[error("transaction counter overflow")]
    CounterOverflow,
}


// This common functionality is injected into each parameter set module
macro_rules! functionality {
    () => {
        use crate::traits::{MasterKeyGen, SerDes};
        use crate::HkdsError;
        use rand_core::CryptoRngCore;
        use zeroize::Zeroize;

        const DK_LEN: usize = crate::DID_LEN + BDK_LEN;
        const TK_LEN: usize = crate::CTOK_LEN + BDK_LEN;
        const KK_LEN: usize = 2 * BDK_LEN;
        const CACHE_BYTES: usize = CACHE_LEN * crate::MESSAGE_LEN;
        const SK_LEN: usize = CACHE_BYTES + PRF_RATE;


        /// Correctly sized master key hierarchy specific to the target
        /// security parameter set.
        pub type MasterKey = crate::types::MasterKey<BDK_LEN>;

        /// Correctly sized embedded device key specific to the target
        /// security parameter set.
        pub type EmbeddedDeviceKey = crate::types::EmbeddedDeviceKey<EDK_LEN>;

        /// Correctly sized session token specific to the target security
        /// parameter set.
        pub type Token = crate::types::Token<STK_LEN>;

        /// Client token request packet for this parameter set.
        pub type TokenRequest = crate::packet::TokenRequest<PROTOCOL_ID>;

        /// Server token response packet for this parameter set.
        pub type TokenResponse =
            crate::packet::TokenResponse<PROTOCOL_ID, ETOK_LEN, { crate::HEADER_LEN + ETOK_LEN }>;

        /// Client message request packet for this parameter set.
        pub type MessageRequest = crate::packet::MessageRequest<PROTOCOL_ID>;

        /// Server message response packet for this parameter set.
        pub type MessageResponse = crate::packet::MessageResponse<PROTOCOL_ID>;

        /// Administrative message packet for this parameter set.
        pub type AdminMessage = crate::packet::AdminMessage<PROTOCOL_ID>;

        /// Error message packet for this parameter set.
        pub type ErrorMessage = crate::packet::ErrorMessage<PROTOCOL_ID>;


        /// Supports the `MasterKeyGen` trait, allowing master key generation
        pub struct MdkGen();

        impl MasterKeyGen for MdkGen {
            type MasterKey = MasterKey;

            fn try_generate_with_rng(
                rng: &mut impl CryptoRngCore, kid: &[u8; crate::KID_LEN],
            ) -> Result<MasterKey, HkdsError> {
                crate::server::generate_mdk::<BDK_LEN, { 2 * BDK_LEN }>(rng, kid)
            }
        }


        /// Derives the embedded device key provisioned into the device
        /// identified by `did`.
        #[must_use]
        pub fn generate_edk(mdk: &MasterKey, did: &[u8; crate::DID_LEN]) -> EmbeddedDeviceKey {
            crate::types::EmbeddedDeviceKey::new(
                crate::key_schedule::derive_device_key::<BDK_LEN, DK_LEN>(RATE, &mdk.bdk, did),
            )
        }

        /// Derives eight embedded device keys through the batched SHAKE;
        /// lane `i` equals `generate_edk` over `dids[i]`.
        #[must_use]
        pub fn generate_edk_x8(
            mdk: &MasterKey, dids: &[[u8; crate::DID_LEN]; crate::BATCH_WIDTH],
        ) -> [EmbeddedDeviceKey; crate::BATCH_WIDTH] {
            let mut keys = crate::server::derive_edk_batch::<BDK_LEN, DK_LEN>(RATE, &mdk.bdk, dids);
            let out = core::array::from_fn(|i| crate::types::EmbeddedDeviceKey::new(keys[i]));
            keys.zeroize();
            out
        }

        /// Derives embedded device keys for 64 devices as eight batched
        /// lanes; a provisioning-time convenience over [`generate_edk_x8`].
        #[must_use]
        pub fn generate_edk_x64(
            mdk: &MasterKey,
            dids: &[[[u8; crate::DID_LEN]; crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH],
        ) -> [[EmbeddedDeviceKey; crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH] {
            core::array::from_fn(|i| generate_edk_x8(mdk, &dids[i]))
        }


        /// Client (terminal) session state: embedded device key, KSN, and
        /// the transaction key cache.
        pub struct Client(crate::client::ClientEngine<EDK_LEN, CACHE_LEN>);

        impl Client {
            /// Initializes a client from its provisioned key and device
            /// identity; the KSN counter starts at zero and the cache is
            /// empty until a token is installed.
            #[must_use]
            pub fn new(edk: &EmbeddedDeviceKey, did: &[u8; crate::DID_LEN]) -> Self {
                Self(crate::client::ClientEngine::new(&edk.0, did))
            }

            /// The current key serial number. A message request carries the
            /// KSN captured *before* the encrypt call that produced it.
            #[must_use]
            pub fn ksn(&self) -> [u8; crate::KSN_LEN] { *self.0.ksn() }

            /// The current transaction counter.
            #[must_use]
            pub fn transaction_counter(&self) -> u32 { self.0.counter() }

            /// True when every cache slot has been consumed and the client
            /// must exchange a fresh token before encrypting.
            #[must_use]
            pub fn cache_empty(&self) -> bool { self.0.cache_empty() }

            /// Builds the token request packet for the current KSN.
            #[must_use]
            pub fn token_request(&self) -> TokenRequest { TokenRequest::new(self.0.ksn()) }

            /// Authenticates and unwraps a server token response.
            /// # Errors
            /// [`HkdsError::AuthFailure`] when the token tag does not
            /// verify; the cache is not touched.
            pub fn decrypt_token(&self, etok: &[u8; ETOK_LEN]) -> Result<Token, HkdsError> {
                self.0
                    .decrypt_token::<TK_LEN>(RATE, &FORMAL_NAME, &MAC_NAME, etok)
                    .map(crate::types::Token::new)
            }

            /// Expands an unwrapped token into a full transaction key cache.
            pub fn generate_cache(&mut self, token: &Token) {
                self.0.generate_cache::<KK_LEN, CACHE_BYTES>(RATE, &token.0);
            }

            /// Encrypts one 16-byte message with the next one-time key; the
            /// consumed slot is erased and the KSN counter advances by one.
            /// # Errors
            /// [`HkdsError::CacheExhausted`] when no slot remains,
            /// [`HkdsError::CounterOverflow`] at device end of life; the
            /// session state is unchanged on error.
            pub fn encrypt_message(
                &mut self, plaintext: &[u8; crate::MESSAGE_LEN],
            ) -> Result<[u8; crate::MESSAGE_LEN], HkdsError> {
                self.0.encrypt_message(plaintext)
            }

            /// Encrypts one 16-byte message and appends a KMAC tag keyed by
            /// the following cache slot, binding `data` as associated data.
            /// Consumes two slots as a unit and advances the counter by two.
            /// # Errors
            /// [`HkdsError::CacheExhausted`] when fewer than two slots
            /// remain, [`HkdsError::CounterOverflow`] at device end of
            /// life; the session state is unchanged on error.
            pub fn encrypt_authenticate_message(
                &mut self, plaintext: &[u8; crate::MESSAGE_LEN], data: &[u8],
            ) -> Result<[u8; crate::MESSAGE_LEN + crate::TAG_LEN], HkdsError> {
                self.0.encrypt_authenticate_message(RATE, plaintext, data)
            }
        }


        /// Ephemeral server-side session state, constructed per inbound
        /// packet from the shared master key and the packet's KSN.
        pub struct Server<'a>(crate::server::ServerEngine<'a, BDK_LEN>);

        impl<'a> Server<'a> {
            /// Binds a session to the master key hierarchy and a client KSN.
            #[must_use]
            pub fn new(mdk: &'a MasterKey, ksn: &[u8; crate::KSN_LEN]) -> Self {
                Self(crate::server::ServerEngine::new(mdk, ksn, RATE))
            }

            /// Wraps the session token for this KSN's cache epoch. The
            /// output is deterministic: re-issuing a token for the same KSN
            /// epoch under the same master key yields identical bytes.
            #[must_use]
            pub fn encrypt_token(&self) -> [u8; ETOK_LEN] {
                self.0.encrypt_token::<DK_LEN, TK_LEN, ETOK_LEN>(
                    &FORMAL_NAME,
                    &MAC_NAME,
                    CACHE_LEN as u32,
                )
            }

            /// Builds the token response packet for this session.
            #[must_use]
            pub fn token_response(&self) -> TokenResponse {
                TokenResponse::new(&self.encrypt_token())
            }

            /// Decrypts an unauthenticated 16-byte client message.
            #[must_use]
            pub fn decrypt_message(
                &self, ciphertext: &[u8; crate::MESSAGE_LEN],
            ) -> [u8; crate::MESSAGE_LEN] {
                self.0.decrypt_message::<DK_LEN, TK_LEN, KK_LEN, SK_LEN>(
                    &FORMAL_NAME,
                    CACHE_LEN as u32,
                    ciphertext,
                )
            }

            /// Verifies and decrypts an authenticated client message.
            /// # Errors
            /// [`HkdsError::AuthFailure`] when the tag does not verify; no
            /// plaintext is produced.
            pub fn decrypt_verify_message(
                &self, ciphertext: &[u8; crate::MESSAGE_LEN + crate::TAG_LEN], data: &[u8],
            ) -> Result<[u8; crate::MESSAGE_LEN], HkdsError> {
                self.0.decrypt_verify_message::<DK_LEN, TK_LEN, KK_LEN, SK_LEN>(
                    &FORMAL_NAME,
                    CACHE_LEN as u32,
                    ciphertext,
                    data,
                )
            }
        }


        /// Ephemeral server state over eight independent sessions, driven
        /// through the batched SHAKE / KMAC forms. Lane `i` of every output
        /// is bit-identical to the scalar [`Server`] over `ksn[i]`.
        pub struct ServerX8<'a>(crate::server::BatchEngine<'a, BDK_LEN>);

        impl<'a> ServerX8<'a> {
            /// Binds eight sessions to the shared master key hierarchy.
            #[must_use]
            pub fn new(
                mdk: &'a MasterKey, ksn: &[[u8; crate::KSN_LEN]; crate::BATCH_WIDTH],
            ) -> Self {
                Self(crate::server::BatchEngine::new(mdk, ksn, RATE))
            }

            /// Wraps eight session tokens.
            #[must_use]
            pub fn encrypt_token_x8(&self) -> [[u8; ETOK_LEN]; crate::BATCH_WIDTH] {
                self.0.encrypt_token_x8::<DK_LEN, TK_LEN, ETOK_LEN>(
                    &FORMAL_NAME,
                    &MAC_NAME,
                    CACHE_LEN as u32,
                )
            }

            /// Decrypts eight unauthenticated messages.
            #[must_use]
            pub fn decrypt_message_x8(
                &self, ciphertext: &[[u8; crate::MESSAGE_LEN]; crate::BATCH_WIDTH],
            ) -> [[u8; crate::MESSAGE_LEN]; crate::BATCH_WIDTH] {
                self.0.decrypt_message_x8::<DK_LEN, TK_LEN, KK_LEN, SK_LEN>(
                    &FORMAL_NAME,
                    CACHE_LEN as u32,
                    ciphertext,
                )
            }

            /// Verifies and decrypts eight authenticated messages; each
            /// lane fails or succeeds independently.
            #[must_use]
            pub fn decrypt_verify_message_x8(
                &self,
                ciphertext: &[[u8; crate::MESSAGE_LEN + crate::TAG_LEN]; crate::BATCH_WIDTH],
                data: &[&[u8]; crate::BATCH_WIDTH],
            ) -> [Result<[u8; crate::MESSAGE_LEN], HkdsError>; crate::BATCH_WIDTH] {
                self.0.decrypt_verify_message_x8::<DK_LEN, TK_LEN, KK_LEN, SK_LEN>(
                    &FORMAL_NAME,
                    CACHE_LEN as u32,
                    ciphertext,
                    data,
                )
            }
        }


        /// Wraps tokens for 64 sessions as eight data-parallel x8 batches;
        /// returns only after every lane has completed.
        #[must_use]
        pub fn encrypt_token_x64(
            servers: &[ServerX8<'_>; crate::PARALLEL_DEPTH],
        ) -> [[[u8; ETOK_LEN]; crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH] {
            let mut etok = [[[0u8; ETOK_LEN]; crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH];
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                etok.par_iter_mut().enumerate().for_each(|(i, lanes)| {
                    *lanes = servers[i].encrypt_token_x8();
                });
            }
            #[cfg(not(feature = "parallel"))]
            for (i, lanes) in etok.iter_mut().enumerate() {
                *lanes = servers[i].encrypt_token_x8();
            }
            etok
        }

        /// Decrypts 64 unauthenticated messages as eight data-parallel x8
        /// batches; returns only after every lane has completed.
        #[must_use]
        pub fn decrypt_message_x64(
            servers: &[ServerX8<'_>; crate::PARALLEL_DEPTH],
            ciphertext: &[[[u8; crate::MESSAGE_LEN]; crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH],
        ) -> [[[u8; crate::MESSAGE_LEN]; crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH] {
            let mut plaintext =
                [[[0u8; crate::MESSAGE_LEN]; crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH];
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                plaintext.par_iter_mut().enumerate().for_each(|(i, lanes)| {
                    *lanes = servers[i].decrypt_message_x8(&ciphertext[i]);
                });
            }
            #[cfg(not(feature = "parallel"))]
            for (i, lanes) in plaintext.iter_mut().enumerate() {
                *lanes = servers[i].decrypt_message_x8(&ciphertext[i]);
            }
            plaintext
        }

        /// Verifies and decrypts 64 authenticated messages as eight
        /// data-parallel x8 batches; returns only after every lane has
        /// completed, each lane failing or succeeding independently.
        #[must_use]
        pub fn decrypt_verify_message_x64(
            servers: &[ServerX8<'_>; crate::PARALLEL_DEPTH],
            ciphertext: &[[[u8; crate::MESSAGE_LEN + crate::TAG_LEN]; crate::BATCH_WIDTH];
                 crate::PARALLEL_DEPTH],
            data: &[[&[u8]; crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH],
        ) -> [[Result<[u8; crate::MESSAGE_LEN], HkdsError>; crate::BATCH_WIDTH];
               crate::PARALLEL_DEPTH] {
            let mut plaintext: [[Result<[u8; crate::MESSAGE_LEN], HkdsError>;
                crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH] =
                [[Ok([0u8; crate::MESSAGE_LEN]); crate::BATCH_WIDTH]; crate::PARALLEL_DEPTH];
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                plaintext.par_iter_mut().enumerate().for_each(|(i, lanes)| {
                    *lanes = servers[i].decrypt_verify_message_x8(&ciphertext[i], &data[i]);
                });
            }
            #[cfg(not(feature = "parallel"))]
            for (i, lanes) in plaintext.iter_mut().enumerate() {
                *lanes = servers[i].decrypt_verify_message_x8(&ciphertext[i], &data[i]);
            }
            plaintext
        }


        impl SerDes for MasterKey {
            type ByteArray = [u8; 2 * BDK_LEN + crate::KID_LEN];

            fn into_bytes(self) -> Self::ByteArray {
                let mut out = [0u8; 2 * BDK_LEN + crate::KID_LEN];
                out[..BDK_LEN].copy_from_slice(&self.bdk);
                out[BDK_LEN..2 * BDK_LEN].copy_from_slice(&self.stk);
                out[2 * BDK_LEN..].copy_from_slice(&self.kid);
                out
            }

            fn try_from_bytes(ba: Self::ByteArray) -> Result<Self, HkdsError> {
                // No structural validation is possible on uniformly random
                // key bytes; a Result is used for symmetry across the API.
                let mut bdk = [0u8; BDK_LEN];
                let mut stk = [0u8; BDK_LEN];
                let mut kid = [0u8; crate::KID_LEN];
                bdk.copy_from_slice(&ba[..BDK_LEN]);
                stk.copy_from_slice(&ba[BDK_LEN..2 * BDK_LEN]);
                kid.copy_from_slice(&ba[2 * BDK_LEN..]);
                Ok(crate::types::MasterKey::new(bdk, stk, kid))
            }
        }


        impl SerDes for EmbeddedDeviceKey {
            type ByteArray = [u8; EDK_LEN];

            fn into_bytes(self) -> Self::ByteArray { self.0 }

            fn try_from_bytes(ba: Self::ByteArray) -> Result<Self, HkdsError> {
                Ok(crate::types::EmbeddedDeviceKey::new(ba))
            }
        }


    };
}


/// Functionality for the HKDS SHAKE-128 parameter set.
#[cfg(feature = "hkds-128")]
pub mod hkds_128 {
    //!
    //! Typical usage flow entails:
    //! 1. The server runs `MdkGen::try_generate()` once to create the master
    //!    key hierarchy, and `generate_edk()` per device at provisioning.
    //! 2. The device initializes a `Client` from its embedded key and
    //!    identity, and sends a token request carrying its KSN.
    //! 3. The server builds a `Server` session from the request KSN and
    //!    returns `encrypt_token()`.
    //! 4. The device unwraps it with `decrypt_token()` and fills its cache
    //!    with `generate_cache()`.
    //! 5. Each transaction is `encrypt_message()` (one cache slot) or
    //!    `encrypt_authenticate_message()` (two slots); the server recovers
    //!    it with `decrypt_message()` / `decrypt_verify_message()`.
    //! 6. When the cache is exhausted, the device requests a fresh token.
    //!
    //! **--> See [`crate::traits`] for key generation and serialization.**

    /// The base derivation key length in bytes.
    pub const BDK_LEN: usize = 16;
    /// The embedded device key length in bytes.
    pub const EDK_LEN: usize = BDK_LEN;
    /// The secret token key length in bytes.
    pub const STK_LEN: usize = BDK_LEN;
    /// The encrypted token length in bytes (token plus MAC tag).
    pub const ETOK_LEN: usize = BDK_LEN + crate::TAG_LEN;
    /// The SHAKE-128 absorption rate in bytes.
    pub const PRF_RATE: usize = 168;
    /// The transaction key cache depth in slots.
    pub const CACHE_LEN: usize = (crate::CACHE_MULTIPLIER * PRF_RATE) / crate::MESSAGE_LEN;
    /// The wire protocol identifier for this parameter set.
    pub const PROTOCOL_ID: u8 = 0x09;

    const RATE: crate::keccak::KeccakRate = crate::keccak::KeccakRate::Shake128;
    const FORMAL_NAME: [u8; crate::NAME_LEN] = *b"HKDS128";
    const MAC_NAME: [u8; crate::NAME_LEN] = *b"uKwe128";

    functionality!();
}


/// Functionality for the HKDS SHAKE-256 parameter set (the recommended
/// default).
#[cfg(feature = "hkds-256")]
pub mod hkds_256 {
    //!
    //! Typical usage flow entails:
    //! 1. The server runs `MdkGen::try_generate()` once to create the master
    //!    key hierarchy, and `generate_edk()` per device at provisioning.
    //! 2. The device initializes a `Client` from its embedded key and
    //!    identity, and sends a token request carrying its KSN.
    //! 3. The server builds a `Server` session from the request KSN and
    //!    returns `encrypt_token()`.
    //! 4. The device unwraps it with `decrypt_token()` and fills its cache
    //!    with `generate_cache()`.
    //! 5. Each transaction is `encrypt_message()` (one cache slot) or
    //!    `encrypt_authenticate_message()` (two slots); the server recovers
    //!    it with `decrypt_message()` / `decrypt_verify_message()`.
    //! 6. When the cache is exhausted, the device requests a fresh token.
    //!
    //! **--> See [`crate::traits`] for key generation and serialization.**

    /// The base derivation key length in bytes.
    pub const BDK_LEN: usize = 32;
    /// The embedded device key length in bytes.
    pub const EDK_LEN: usize = BDK_LEN;
    /// The secret token key length in bytes.
    pub const STK_LEN: usize = BDK_LEN;
    /// The encrypted token length in bytes (token plus MAC tag).
    pub const ETOK_LEN: usize = BDK_LEN + crate::TAG_LEN;
    /// The SHAKE-256 absorption rate in bytes.
    pub const PRF_RATE: usize = 136;
    /// The transaction key cache depth in slots.
    pub const CACHE_LEN: usize = (crate::CACHE_MULTIPLIER * PRF_RATE) / crate::MESSAGE_LEN;
    /// The wire protocol identifier for this parameter set.
    pub const PROTOCOL_ID: u8 = 0x0A;

    const RATE: crate::keccak::KeccakRate = crate::keccak::KeccakRate::Shake256;
    const FORMAL_NAME: [u8; crate::NAME_LEN] = *b"HKDS256";
    const MAC_NAME: [u8; crate::NAME_LEN] = *b"uKwe256";

    functionality!();
}


/// Functionality for the HKDS SHAKE-512 parameter set.
#[cfg(feature = "hkds-512")]
pub mod hkds_512 {
    //!
    //! Typical usage flow entails:
    //! 1. The server runs `MdkGen::try_generate()` once to create the master
    //!    key hierarchy, and `generate_edk()` per device at provisioning.
    //! 2. The device initializes a `Client` from its embedded key and
    //!    identity, and sends a token request carrying its KSN.
    //! 3. The server builds a `Server` session from the request KSN and
    //!    returns `encrypt_token()`.
    //! 4. The device unwraps it with `decrypt_token()` and fills its cache
    //!    with `generate_cache()`.
    //! 5. Each transaction is `encrypt_message()` (one cache slot) or
    //!    `encrypt_authenticate_message()` (two slots); the server recovers
    //!    it with `decrypt_message()` / `decrypt_verify_message()`.
    //! 6. When the cache is exhausted, the device requests a fresh token.
    //!
    //! **--> See [`crate::traits`] for key generation and serialization.**

    /// The base derivation key length in bytes.
    pub const BDK_LEN: usize = 64;
    /// The embedded device key length in bytes.
    pub const EDK_LEN: usize = BDK_LEN;
    /// The secret token key length in bytes.
    pub const STK_LEN: usize = BDK_LEN;
    /// The encrypted token length in bytes (token plus MAC tag).
    pub const ETOK_LEN: usize = BDK_LEN + crate::TAG_LEN;
    /// The SHAKE-512 absorption rate in bytes.
    pub const PRF_RATE: usize = 72;
    /// The transaction key cache depth in slots.
    pub const CACHE_LEN: usize = (crate::CACHE_MULTIPLIER * PRF_RATE) / crate::MESSAGE_LEN;
    /// The wire protocol identifier for this parameter set.
    pub const PROTOCOL_ID: u8 = 0x0B;

    const RATE: crate::keccak::KeccakRate = crate::keccak::KeccakRate::Shake512;
    const FORMAL_NAME: [u8; crate::NAME_LEN] = *b"HKDS512";
    const MAC_NAME: [u8; crate::NAME_LEN] = *b"uKwe512";

    functionality!();
}
