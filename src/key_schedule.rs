//! The key-derivation algebra binding master keys, device identities, and
//! transaction counters together.
//!
//! Every derivation is a single SHAKE call over a fixed concatenation, so
//! the byte layout of the inputs is the interoperability contract:
//!
//! * `EDK  = SHAKE(DID ‖ BDK, K)`
//! * `CTOK = be32(tkc / cache) ‖ formal-name ‖ DID` (23 bytes)
//! * `TOKEN = SHAKE(CTOK ‖ STK, K)`
//! * `TMS  = KSN ‖ mac-name` (23 bytes)
//! * token wrap: `ETOK = (TOKEN ⊕ SHAKE(CTOK ‖ EDK, K)) ‖ KMAC(body, EDK, TMS)`

use crate::keccak::{self, KeccakRate};
use crate::{CTOK_LEN, DID_LEN, KSN_LEN, NAME_LEN, TAG_LEN, TKC_LEN, TMS_LEN};
use zeroize::Zeroize;


/// Derives the embedded device key for `did` from the base derivation key.
pub(crate) fn derive_device_key<const K: usize, const DK_LEN: usize>(
    rate: KeccakRate, bdk: &[u8; K], did: &[u8; DID_LEN],
) -> [u8; K] {
    debug_assert_eq!(DK_LEN, DID_LEN + K);
    let mut dkey = [0u8; DK_LEN];
    dkey[..DID_LEN].copy_from_slice(did);
    dkey[DID_LEN..].copy_from_slice(bdk);
    let mut edk = [0u8; K];
    keccak::shake(rate, &mut edk, &dkey);
    dkey.zeroize();
    edk
}


/// Builds the 23-byte token customization string for a device at a given
/// transaction counter: the cache-epoch index, the formal algorithm name,
/// and the device identity.
pub(crate) fn token_customization(
    counter: u32, cache_len: u32, formal_name: &[u8; NAME_LEN], ksn: &[u8; KSN_LEN],
) -> [u8; CTOK_LEN] {
    let mut ctok = [0u8; CTOK_LEN];
    ctok[..TKC_LEN].copy_from_slice(&(counter / cache_len).to_be_bytes());
    ctok[TKC_LEN..TKC_LEN + NAME_LEN].copy_from_slice(formal_name);
    ctok[TKC_LEN + NAME_LEN..].copy_from_slice(&ksn[..DID_LEN]);
    ctok
}


/// Builds the 23-byte token MAC customization string: the full KSN followed
/// by the MAC algorithm name.
pub(crate) fn token_mac_string(ksn: &[u8; KSN_LEN], mac_name: &[u8; NAME_LEN]) -> [u8; TMS_LEN] {
    let mut tms = [0u8; TMS_LEN];
    tms[..KSN_LEN].copy_from_slice(ksn);
    tms[KSN_LEN..].copy_from_slice(mac_name);
    tms
}


/// Derives the session token from the secret token key and a customization
/// string.
pub(crate) fn derive_token<const K: usize, const TK_LEN: usize>(
    rate: KeccakRate, stk: &[u8; K], ctok: &[u8; CTOK_LEN],
) -> [u8; K] {
    debug_assert_eq!(TK_LEN, CTOK_LEN + K);
    let mut tkey = [0u8; TK_LEN];
    tkey[..CTOK_LEN].copy_from_slice(ctok);
    tkey[CTOK_LEN..].copy_from_slice(stk);
    let mut token = [0u8; K];
    keccak::shake(rate, &mut token, &tkey);
    tkey.zeroize();
    token
}


/// Derives the keystream that encrypts a token on the wire.
pub(crate) fn token_mask<const K: usize, const TK_LEN: usize>(
    rate: KeccakRate, ctok: &[u8; CTOK_LEN], edk: &[u8; K],
) -> [u8; K] {
    debug_assert_eq!(TK_LEN, CTOK_LEN + K);
    let mut tkey = [0u8; TK_LEN];
    tkey[..CTOK_LEN].copy_from_slice(ctok);
    tkey[CTOK_LEN..].copy_from_slice(edk);
    let mut mask = [0u8; K];
    keccak::shake(rate, &mut mask, &tkey);
    tkey.zeroize();
    mask
}


/// Computes the authentication tag over an encrypted token body.
pub(crate) fn token_mac<const K: usize>(
    rate: KeccakRate, body: &[u8], edk: &[u8; K], tms: &[u8; TMS_LEN],
) -> [u8; TAG_LEN] {
    let mut tag = [0u8; TAG_LEN];
    keccak::kmac(rate, &mut tag, body, edk, tms);
    tag
}
