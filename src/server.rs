//! The transaction-server engines.
//!
//! The scalar engine serves one inbound packet: it rebuilds the device's key
//! material from the master key hierarchy and the KSN carried on the wire,
//! so no per-device state is stored server side. The batch engine does the
//! same for eight independent sessions at once through the 8-way SHAKE and
//! KMAC forms; its per-lane output is bit-identical to the scalar engine.

use crate::helpers;
use crate::keccak::{self, KeccakRate, KeccakState};
use crate::key_schedule;
use crate::parallel::{self, KeccakStateX8};
use crate::types::MasterKey;
use crate::{
    HkdsError, BATCH_WIDTH, DID_LEN, KID_LEN, KSN_LEN, MESSAGE_LEN, NAME_LEN, TAG_LEN,
};
use rand_core::CryptoRngCore;
use zeroize::Zeroize;


/// Draws fresh BDK and STK material from the caller's entropy source. A
/// failing source yields [`HkdsError::EntropyFailure`] with every byte of
/// seed scratch erased.
pub(crate) fn generate_mdk<const K: usize, const SEED_LEN: usize>(
    rng: &mut impl CryptoRngCore, kid: &[u8; KID_LEN],
) -> Result<MasterKey<K>, HkdsError> {
    debug_assert_eq!(SEED_LEN, 2 * K);
    let mut tmpr = [0u8; SEED_LEN];
    if rng.try_fill_bytes(&mut tmpr).is_err() {
        tmpr.zeroize();
        return Err(HkdsError::EntropyFailure);
    }
    let mut bdk = [0u8; K];
    let mut stk = [0u8; K];
    bdk.copy_from_slice(&tmpr[..K]);
    stk.copy_from_slice(&tmpr[K..]);
    tmpr.zeroize();
    let mdk = MasterKey::new(bdk, stk, *kid);
    bdk.zeroize();
    stk.zeroize();
    Ok(mdk)
}


/// The number of whole squeeze blocks covering `total` bytes of keystream.
fn min_blocks(total: usize, rate: KeccakRate) -> usize {
    let mut nblocks = total / rate.bytes();
    if nblocks * rate.bytes() < total {
        nblocks += 1;
    }
    nblocks
}


/// Ephemeral per-packet server state.
pub(crate) struct ServerEngine<'a, const K: usize> {
    ksn: [u8; KSN_LEN],
    mdk: &'a MasterKey<K>,
    count: u32,
    rate: KeccakRate,
}

impl<'a, const K: usize> ServerEngine<'a, K> {
    pub(crate) fn new(mdk: &'a MasterKey<K>, ksn: &[u8; KSN_LEN], rate: KeccakRate) -> Self {
        Self { ksn: *ksn, mdk, count: helpers::transaction_counter(ksn), rate }
    }

    fn did(&self) -> [u8; DID_LEN] {
        self.ksn[..DID_LEN].try_into().expect("did fail")
    }

    /// Wraps a fresh token for the device identified by this state's KSN:
    /// mask the derived token with SHAKE(CTOK ‖ EDK) and append the KMAC tag
    /// computed under the device key. Deterministic in the KSN's cache epoch.
    pub(crate) fn encrypt_token<const DK_LEN: usize, const TK_LEN: usize, const ETOK: usize>(
        &self, formal_name: &[u8; NAME_LEN], mac_name: &[u8; NAME_LEN], cache_len: u32,
    ) -> [u8; ETOK] {
        debug_assert_eq!(ETOK, K + TAG_LEN);

        let mut edk = key_schedule::derive_device_key::<K, DK_LEN>(
            self.rate,
            &self.mdk.bdk,
            &self.did(),
        );
        let ctok =
            key_schedule::token_customization(self.count, cache_len, formal_name, &self.ksn);
        let mut tok = key_schedule::derive_token::<K, TK_LEN>(self.rate, &self.mdk.stk, &ctok);
        let mut mask = key_schedule::token_mask::<K, TK_LEN>(self.rate, &ctok, &edk);

        let mut etok = [0u8; ETOK];
        for i in 0..K {
            etok[i] = tok[i] ^ mask[i];
        }
        let tms = key_schedule::token_mac_string(&self.ksn, mac_name);
        let tag = key_schedule::token_mac(self.rate, &etok[..K], &edk, &tms);
        etok[K..].copy_from_slice(&tag);

        edk.zeroize();
        tok.zeroize();
        mask.zeroize();
        etok
    }

    /// Rebuilds the client's keystream for the current transaction counter
    /// and copies `out.len()` bytes starting at the counter's cache slot,
    /// squeezing only as many blocks as that offset requires.
    fn transaction_key<
        const DK_LEN: usize,
        const TK_LEN: usize,
        const KK_LEN: usize,
        const SK_LEN: usize,
    >(
        &self, formal_name: &[u8; NAME_LEN], cache_len: u32, out: &mut [u8],
    ) {
        debug_assert_eq!(KK_LEN, K + K);
        let index = (self.count % cache_len) as usize;

        let mut edk = key_schedule::derive_device_key::<K, DK_LEN>(
            self.rate,
            &self.mdk.bdk,
            &self.did(),
        );
        let ctok =
            key_schedule::token_customization(self.count, cache_len, formal_name, &self.ksn);
        let mut tok = key_schedule::derive_token::<K, TK_LEN>(self.rate, &self.mdk.stk, &ctok);

        let mut tmpk = [0u8; KK_LEN];
        tmpk[..K].copy_from_slice(&tok);
        tmpk[K..].copy_from_slice(&edk);

        let nblocks = min_blocks(index * MESSAGE_LEN + out.len(), self.rate);
        let mut skey = [0u8; SK_LEN];
        debug_assert!(nblocks * self.rate.bytes() <= SK_LEN);
        let mut ctx = KeccakState::new();
        ctx.shake_initialize(self.rate, &tmpk);
        ctx.squeeze_blocks(self.rate, &mut skey, nblocks);
        ctx.dispose();

        out.copy_from_slice(&skey[index * MESSAGE_LEN..index * MESSAGE_LEN + out.len()]);

        edk.zeroize();
        tok.zeroize();
        tmpk.zeroize();
        skey.zeroize();
    }

    /// Decrypts an unauthenticated 16-byte client message.
    pub(crate) fn decrypt_message<
        const DK_LEN: usize,
        const TK_LEN: usize,
        const KK_LEN: usize,
        const SK_LEN: usize,
    >(
        &self, formal_name: &[u8; NAME_LEN], cache_len: u32, ciphertext: &[u8; MESSAGE_LEN],
    ) -> [u8; MESSAGE_LEN] {
        let mut plaintext = [0u8; MESSAGE_LEN];
        self.transaction_key::<DK_LEN, TK_LEN, KK_LEN, SK_LEN>(
            formal_name,
            cache_len,
            &mut plaintext,
        );
        for (byte, ct) in plaintext.iter_mut().zip(ciphertext.iter()) {
            *byte ^= ct;
        }
        plaintext
    }

    /// Verifies and decrypts an authenticated client message. The two cache
    /// slots the client consumed are rederived; the tag is checked in
    /// constant time before any plaintext is produced, and the key material
    /// is erased on every path.
    pub(crate) fn decrypt_verify_message<
        const DK_LEN: usize,
        const TK_LEN: usize,
        const KK_LEN: usize,
        const SK_LEN: usize,
    >(
        &self, formal_name: &[u8; NAME_LEN], cache_len: u32,
        ciphertext: &[u8; MESSAGE_LEN + TAG_LEN], data: &[u8],
    ) -> Result<[u8; MESSAGE_LEN], HkdsError> {
        let mut dkey = [0u8; 2 * MESSAGE_LEN];
        self.transaction_key::<DK_LEN, TK_LEN, KK_LEN, SK_LEN>(formal_name, cache_len, &mut dkey);

        let mut code = [0u8; TAG_LEN];
        keccak::kmac(
            self.rate,
            &mut code,
            &ciphertext[..MESSAGE_LEN],
            &dkey[MESSAGE_LEN..],
            data,
        );
        let verified = helpers::verify_tag(&code, &ciphertext[MESSAGE_LEN..]);
        if verified.is_err() {
            dkey.zeroize();
            return Err(HkdsError::AuthFailure);
        }

        let mut plaintext = [0u8; MESSAGE_LEN];
        for i in 0..MESSAGE_LEN {
            plaintext[i] = ciphertext[i] ^ dkey[i];
        }
        dkey.zeroize();
        Ok(plaintext)
    }
}


/// Derives eight embedded device keys in one batched SHAKE pass.
pub(crate) fn derive_edk_batch<const K: usize, const DK_LEN: usize>(
    rate: KeccakRate, bdk: &[u8; K], dids: &[[u8; DID_LEN]; BATCH_WIDTH],
) -> [[u8; K]; BATCH_WIDTH] {
    debug_assert_eq!(DK_LEN, DID_LEN + K);
    let mut dkey = [[0u8; DK_LEN]; BATCH_WIDTH];
    for (key, did) in dkey.iter_mut().zip(dids.iter()) {
        key[..DID_LEN].copy_from_slice(did);
        key[DID_LEN..].copy_from_slice(bdk);
    }
    let inputs: [&[u8]; BATCH_WIDTH] = core::array::from_fn(|i| &dkey[i][..]);
    let mut edk = [[0u8; K]; BATCH_WIDTH];
    parallel::shake_lanes(rate, &mut edk, &inputs);
    dkey.zeroize();
    edk
}


/// Ephemeral server state over eight independent sessions.
pub(crate) struct BatchEngine<'a, const K: usize> {
    ksn: [[u8; KSN_LEN]; BATCH_WIDTH],
    mdk: &'a MasterKey<K>,
    rate: KeccakRate,
}

impl<'a, const K: usize> BatchEngine<'a, K> {
    pub(crate) fn new(
        mdk: &'a MasterKey<K>, ksn: &[[u8; KSN_LEN]; BATCH_WIDTH], rate: KeccakRate,
    ) -> Self {
        Self { ksn: *ksn, mdk, rate }
    }

    fn dids(&self) -> [[u8; DID_LEN]; BATCH_WIDTH] {
        core::array::from_fn(|i| self.ksn[i][..DID_LEN].try_into().expect("did fail"))
    }

    fn counters(&self) -> [u32; BATCH_WIDTH] {
        core::array::from_fn(|i| helpers::transaction_counter(&self.ksn[i]))
    }

    fn customizations(
        &self, formal_name: &[u8; NAME_LEN], cache_len: u32,
    ) -> [[u8; crate::CTOK_LEN]; BATCH_WIDTH] {
        let counters = self.counters();
        core::array::from_fn(|i| {
            key_schedule::token_customization(counters[i], cache_len, formal_name, &self.ksn[i])
        })
    }

    /// Eight session tokens via one batched SHAKE over `CTOK ‖ STK`.
    fn tokens<const TK_LEN: usize>(
        &self, ctoks: &[[u8; crate::CTOK_LEN]; BATCH_WIDTH],
    ) -> [[u8; K]; BATCH_WIDTH] {
        debug_assert_eq!(TK_LEN, crate::CTOK_LEN + K);
        let mut tkey = [[0u8; TK_LEN]; BATCH_WIDTH];
        for (key, ctok) in tkey.iter_mut().zip(ctoks.iter()) {
            key[..crate::CTOK_LEN].copy_from_slice(ctok);
            key[crate::CTOK_LEN..].copy_from_slice(&self.mdk.stk);
        }
        let inputs: [&[u8]; BATCH_WIDTH] = core::array::from_fn(|i| &tkey[i][..]);
        let mut tok = [[0u8; K]; BATCH_WIDTH];
        parallel::shake_lanes(self.rate, &mut tok, &inputs);
        tkey.zeroize();
        tok
    }

    /// Wraps eight tokens; the mask and token derivations run through the
    /// 8-way SHAKE, the per-lane tags through scalar KMAC.
    pub(crate) fn encrypt_token_x8<
        const DK_LEN: usize,
        const TK_LEN: usize,
        const ETOK: usize,
    >(
        &self, formal_name: &[u8; NAME_LEN], mac_name: &[u8; NAME_LEN], cache_len: u32,
    ) -> [[u8; ETOK]; BATCH_WIDTH] {
        debug_assert_eq!(ETOK, K + TAG_LEN);

        let mut edk = derive_edk_batch::<K, DK_LEN>(self.rate, &self.mdk.bdk, &self.dids());
        let ctoks = self.customizations(formal_name, cache_len);
        let mut tok = self.tokens::<TK_LEN>(&ctoks);

        let mut tmpk = [[0u8; TK_LEN]; BATCH_WIDTH];
        for ((key, ctok), lane_edk) in tmpk.iter_mut().zip(ctoks.iter()).zip(edk.iter()) {
            key[..crate::CTOK_LEN].copy_from_slice(ctok);
            key[crate::CTOK_LEN..].copy_from_slice(lane_edk);
        }
        let inputs: [&[u8]; BATCH_WIDTH] = core::array::from_fn(|i| &tmpk[i][..]);
        let mut mask = [[0u8; K]; BATCH_WIDTH];
        parallel::shake_lanes(self.rate, &mut mask, &inputs);

        let mut etok = [[0u8; ETOK]; BATCH_WIDTH];
        for l in 0..BATCH_WIDTH {
            for i in 0..K {
                etok[l][i] = tok[l][i] ^ mask[l][i];
            }
            let tms = key_schedule::token_mac_string(&self.ksn[l], mac_name);
            let tag = key_schedule::token_mac(self.rate, &etok[l][..K], &edk[l], &tms);
            etok[l][K..].copy_from_slice(&tag);
        }

        edk.zeroize();
        tok.zeroize();
        tmpk.zeroize();
        mask.zeroize();
        etok
    }

    /// Rebuilds the first `keylen` keystream bytes of each lane's current
    /// cache slot. Lanes may sit at different slots; the batch squeezes the
    /// deepest lane's minimal block count and discards the excess elsewhere.
    fn transaction_keys<
        const DK_LEN: usize,
        const TK_LEN: usize,
        const KK_LEN: usize,
        const SK_LEN: usize,
    >(
        &self, formal_name: &[u8; NAME_LEN], cache_len: u32, keylen: usize,
    ) -> [[u8; 2 * MESSAGE_LEN]; BATCH_WIDTH] {
        debug_assert_eq!(KK_LEN, K + K);
        debug_assert!(keylen <= 2 * MESSAGE_LEN);

        let counters = self.counters();
        let index: [usize; BATCH_WIDTH] =
            core::array::from_fn(|i| (counters[i] % cache_len) as usize);

        let mut edk = derive_edk_batch::<K, DK_LEN>(self.rate, &self.mdk.bdk, &self.dids());
        let ctoks = self.customizations(formal_name, cache_len);
        let mut tok = self.tokens::<TK_LEN>(&ctoks);

        let mut tmpk = [[0u8; KK_LEN]; BATCH_WIDTH];
        for ((key, lane_tok), lane_edk) in tmpk.iter_mut().zip(tok.iter()).zip(edk.iter()) {
            key[..K].copy_from_slice(lane_tok);
            key[K..].copy_from_slice(lane_edk);
        }

        let deepest = index.iter().max().copied().unwrap_or(0);
        let nblocks = min_blocks(deepest * MESSAGE_LEN + keylen, self.rate);
        let mut skey = [[0u8; SK_LEN]; BATCH_WIDTH];
        debug_assert!(nblocks * self.rate.bytes() <= SK_LEN);

        let inputs: [&[u8]; BATCH_WIDTH] = core::array::from_fn(|i| &tmpk[i][..]);
        let mut ctx = KeccakStateX8::new();
        ctx.shake_initialize(self.rate, &inputs);
        ctx.squeeze_blocks(self.rate, &mut skey, nblocks);
        ctx.dispose();

        let mut tkey = [[0u8; 2 * MESSAGE_LEN]; BATCH_WIDTH];
        for l in 0..BATCH_WIDTH {
            let oft = index[l] * MESSAGE_LEN;
            tkey[l][..keylen].copy_from_slice(&skey[l][oft..oft + keylen]);
        }

        edk.zeroize();
        tok.zeroize();
        tmpk.zeroize();
        skey.zeroize();
        tkey
    }

    /// Decrypts eight unauthenticated messages.
    pub(crate) fn decrypt_message_x8<
        const DK_LEN: usize,
        const TK_LEN: usize,
        const KK_LEN: usize,
        const SK_LEN: usize,
    >(
        &self, formal_name: &[u8; NAME_LEN], cache_len: u32,
        ciphertext: &[[u8; MESSAGE_LEN]; BATCH_WIDTH],
    ) -> [[u8; MESSAGE_LEN]; BATCH_WIDTH] {
        let mut dkey = self.transaction_keys::<DK_LEN, TK_LEN, KK_LEN, SK_LEN>(
            formal_name,
            cache_len,
            MESSAGE_LEN,
        );
        let mut plaintext = [[0u8; MESSAGE_LEN]; BATCH_WIDTH];
        for l in 0..BATCH_WIDTH {
            for i in 0..MESSAGE_LEN {
                plaintext[l][i] = ciphertext[l][i] ^ dkey[l][i];
            }
        }
        dkey.zeroize();
        plaintext
    }

    /// Verifies and decrypts eight authenticated messages; the tags are
    /// computed through the 8-way KMAC. Each lane fails or succeeds on its
    /// own, and all rederived key material is erased either way.
    pub(crate) fn decrypt_verify_message_x8<
        const DK_LEN: usize,
        const TK_LEN: usize,
        const KK_LEN: usize,
        const SK_LEN: usize,
    >(
        &self, formal_name: &[u8; NAME_LEN], cache_len: u32,
        ciphertext: &[[u8; MESSAGE_LEN + TAG_LEN]; BATCH_WIDTH], data: &[&[u8]; BATCH_WIDTH],
    ) -> [Result<[u8; MESSAGE_LEN], HkdsError>; BATCH_WIDTH] {
        let mut dkey = self.transaction_keys::<DK_LEN, TK_LEN, KK_LEN, SK_LEN>(
            formal_name,
            cache_len,
            2 * MESSAGE_LEN,
        );

        let messages: [&[u8]; BATCH_WIDTH] =
            core::array::from_fn(|i| &ciphertext[i][..MESSAGE_LEN]);
        let keys: [&[u8]; BATCH_WIDTH] = core::array::from_fn(|i| &dkey[i][MESSAGE_LEN..]);
        let mut code = [[0u8; TAG_LEN]; BATCH_WIDTH];
        parallel::kmac_lanes(self.rate, &mut code, &messages, &keys, data);

        let out = core::array::from_fn(|l| {
            helpers::verify_tag(&code[l], &ciphertext[l][MESSAGE_LEN..]).map(|()| {
                let mut plaintext = [0u8; MESSAGE_LEN];
                for i in 0..MESSAGE_LEN {
                    plaintext[i] = ciphertext[l][i] ^ dkey[l][i];
                }
                plaintext
            })
        });
        dkey.zeroize();
        out
    }
}
