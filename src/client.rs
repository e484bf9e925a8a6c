//! The client (terminal) engine: token unwrap, cache generation, and the
//! one-time-key message transforms.
//!
//! Every public operation is atomic with respect to the session state: it
//! either completes and the KSN counter / cache advance together, or it
//! returns an error and the state is untouched.

use crate::helpers::{self, ensure};
use crate::keccak::{self, KeccakRate};
use crate::key_schedule;
use crate::{HkdsError, DID_LEN, KSN_LEN, MESSAGE_LEN, NAME_LEN, TAG_LEN};
use zeroize::{Zeroize, ZeroizeOnDrop};


/// Client session state: the provisioned device key, the KSN (device
/// identity plus transaction counter), and the transaction key cache.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct ClientEngine<const K: usize, const CACHE: usize> {
    edk: [u8; K],
    ksn: [u8; KSN_LEN],
    tkc: [[u8; MESSAGE_LEN]; CACHE],
    cache_empty: bool,
}

impl<const K: usize, const CACHE: usize> ClientEngine<K, CACHE> {
    pub(crate) fn new(edk: &[u8; K], did: &[u8; DID_LEN]) -> Self {
        let mut ksn = [0u8; KSN_LEN];
        ksn[..DID_LEN].copy_from_slice(did);
        Self { edk: *edk, ksn, tkc: [[0u8; MESSAGE_LEN]; CACHE], cache_empty: true }
    }

    pub(crate) fn ksn(&self) -> &[u8; KSN_LEN] { &self.ksn }

    pub(crate) fn counter(&self) -> u32 { helpers::transaction_counter(&self.ksn) }

    pub(crate) fn cache_empty(&self) -> bool { self.cache_empty }

    /// Authenticates and unmasks a server token response. On a tag mismatch
    /// nothing is derived and the cache is left alone.
    pub(crate) fn decrypt_token<const TK_LEN: usize>(
        &self, rate: KeccakRate, formal_name: &[u8; NAME_LEN], mac_name: &[u8; NAME_LEN],
        etok: &[u8],
    ) -> Result<[u8; K], HkdsError> {
        debug_assert_eq!(etok.len(), K + TAG_LEN);

        let cache_len = CACHE as u32;
        let ctok =
            key_schedule::token_customization(self.counter(), cache_len, formal_name, &self.ksn);
        let tms = key_schedule::token_mac_string(&self.ksn, mac_name);

        let mut mtk = key_schedule::token_mac(rate, &etok[..K], &self.edk, &tms);
        let verified = helpers::verify_tag(&mtk, &etok[K..]);
        mtk.zeroize();
        verified?;

        let mut token = key_schedule::token_mask::<K, TK_LEN>(rate, &ctok, &self.edk);
        for (byte, masked) in token.iter_mut().zip(etok.iter()) {
            *byte ^= masked;
        }
        Ok(token)
    }

    /// Expands an unwrapped token into the transaction key cache.
    pub(crate) fn generate_cache<const KK_LEN: usize, const SK_LEN: usize>(
        &mut self, rate: KeccakRate, token: &[u8; K],
    ) {
        debug_assert_eq!(KK_LEN, K + K);
        debug_assert_eq!(SK_LEN, CACHE * MESSAGE_LEN);

        let mut tmpk = [0u8; KK_LEN];
        tmpk[..K].copy_from_slice(token);
        tmpk[K..].copy_from_slice(&self.edk);

        let mut skey = [0u8; SK_LEN];
        keccak::shake(rate, &mut skey, &tmpk);
        for (slot, chunk) in self.tkc.iter_mut().zip(skey.chunks_exact(MESSAGE_LEN)) {
            slot.copy_from_slice(chunk);
        }

        tmpk.zeroize();
        skey.zeroize();
        self.cache_empty = false;
    }

    /// Encrypts one 16-byte message, consuming one cache slot. The consumed
    /// slot is erased and the KSN counter advances by one.
    pub(crate) fn encrypt_message(
        &mut self, plaintext: &[u8; MESSAGE_LEN],
    ) -> Result<[u8; MESSAGE_LEN], HkdsError> {
        ensure!(!self.cache_empty, HkdsError::CacheExhausted);
        let counter = self.counter();
        let next = counter.checked_add(1).ok_or(HkdsError::CounterOverflow)?;
        let idx = (counter as usize) % CACHE;

        let mut ciphertext = self.tkc[idx];
        for (byte, pt) in ciphertext.iter_mut().zip(plaintext.iter()) {
            *byte ^= pt;
        }

        self.tkc[idx].zeroize();
        helpers::set_transaction_counter(&mut self.ksn, next);
        if idx == CACHE - 1 {
            self.cache_empty = true;
        }
        Ok(ciphertext)
    }

    /// Encrypts and authenticates one 16-byte message, consuming two cache
    /// slots (cipher key, then MAC key) as a unit: if fewer than two slots
    /// remain, nothing is consumed.
    pub(crate) fn encrypt_authenticate_message(
        &mut self, rate: KeccakRate, plaintext: &[u8; MESSAGE_LEN], data: &[u8],
    ) -> Result<[u8; MESSAGE_LEN + TAG_LEN], HkdsError> {
        ensure!(!self.cache_empty, HkdsError::CacheExhausted);
        let counter = self.counter();
        let idx = (counter as usize) % CACHE;
        ensure!(idx < CACHE - 1, HkdsError::CacheExhausted);
        let next = counter.checked_add(2).ok_or(HkdsError::CounterOverflow)?;

        let mut ctxt = self.tkc[idx];
        for (byte, pt) in ctxt.iter_mut().zip(plaintext.iter()) {
            *byte ^= pt;
        }
        let mut hkey = self.tkc[idx + 1];
        let mut code = [0u8; TAG_LEN];
        keccak::kmac(rate, &mut code, &ctxt, &hkey, data);
        hkey.zeroize();

        let mut ciphertext = [0u8; MESSAGE_LEN + TAG_LEN];
        ciphertext[..MESSAGE_LEN].copy_from_slice(&ctxt);
        ciphertext[MESSAGE_LEN..].copy_from_slice(&code);

        self.tkc[idx].zeroize();
        self.tkc[idx + 1].zeroize();
        helpers::set_transaction_counter(&mut self.ksn, next);
        if idx + 1 == CACHE - 1 {
            self.cache_empty = true;
        }
        Ok(ciphertext)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const K: usize = 32;
    const CACHE: usize = 34;

    fn active_client() -> ClientEngine<K, CACHE> {
        let edk = [0x42u8; K];
        let did = [0x01u8; DID_LEN];
        let mut client = ClientEngine::<K, CACHE>::new(&edk, &did);
        let token = [0x24u8; K];
        client.generate_cache::<{ K + K }, { CACHE * MESSAGE_LEN }>(
            KeccakRate::Shake256,
            &token,
        );
        client
    }

    #[test]
    fn consumed_slot_reads_as_zero() {
        let mut client = active_client();
        assert_ne!(client.tkc[0], [0u8; MESSAGE_LEN]);
        client.encrypt_message(&[0u8; MESSAGE_LEN]).unwrap();
        assert_eq!(client.tkc[0], [0u8; MESSAGE_LEN]);
        assert_ne!(client.tkc[1], [0u8; MESSAGE_LEN]);
    }

    #[test]
    fn counter_advances_by_consumed_slots() {
        let mut client = active_client();
        client.encrypt_message(&[0u8; MESSAGE_LEN]).unwrap();
        assert_eq!(client.counter(), 1);
        client
            .encrypt_authenticate_message(KeccakRate::Shake256, &[0u8; MESSAGE_LEN], &[])
            .unwrap();
        assert_eq!(client.counter(), 3);
    }

    #[test]
    fn empty_cache_refuses_to_encrypt() {
        let mut client = active_client();
        for _ in 0..CACHE {
            client.encrypt_message(&[0u8; MESSAGE_LEN]).unwrap();
        }
        assert!(client.cache_empty());
        assert_eq!(
            client.encrypt_message(&[0u8; MESSAGE_LEN]),
            Err(HkdsError::CacheExhausted)
        );
    }

    #[test]
    fn authenticated_encrypt_refuses_unpaired_last_slot() {
        let mut client = active_client();
        for _ in 0..CACHE - 1 {
            client.encrypt_message(&[0u8; MESSAGE_LEN]).unwrap();
        }
        // one slot left: the two-slot operation must refuse without consuming it
        let before = client.counter();
        let last = client.tkc[CACHE - 1];
        assert_eq!(
            client.encrypt_authenticate_message(KeccakRate::Shake256, &[0u8; MESSAGE_LEN], &[]),
            Err(HkdsError::CacheExhausted)
        );
        assert_eq!(client.counter(), before);
        assert_eq!(client.tkc[CACHE - 1], last);
        assert!(!client.cache_empty());
        // the single-slot operation still works
        client.encrypt_message(&[0u8; MESSAGE_LEN]).unwrap();
        assert!(client.cache_empty());
    }

    #[test]
    fn authenticated_encrypt_consumes_final_pair() {
        let mut client = active_client();
        for _ in 0..CACHE - 2 {
            client.encrypt_message(&[0u8; MESSAGE_LEN]).unwrap();
        }
        // exactly two slots left: the operation completes atomically,
        // consuming both and exhausting the cache
        let before = client.counter();
        client
            .encrypt_authenticate_message(KeccakRate::Shake256, &[0u8; MESSAGE_LEN], &[])
            .unwrap();
        assert_eq!(client.counter(), before + 2);
        assert_eq!(client.tkc[CACHE - 2], [0u8; MESSAGE_LEN]);
        assert_eq!(client.tkc[CACHE - 1], [0u8; MESSAGE_LEN]);
        assert!(client.cache_empty());
        assert_eq!(
            client.encrypt_message(&[0u8; MESSAGE_LEN]),
            Err(HkdsError::CacheExhausted)
        );
    }

    #[test]
    fn counter_overflow_is_refused() {
        let mut client = active_client();
        helpers::set_transaction_counter(&mut client.ksn, u32::MAX);
        assert_eq!(
            client.encrypt_message(&[0u8; MESSAGE_LEN]),
            Err(HkdsError::CounterOverflow)
        );
        helpers::set_transaction_counter(&mut client.ksn, u32::MAX - 1);
        assert_eq!(
            client
                .encrypt_authenticate_message(KeccakRate::Shake256, &[0u8; MESSAGE_LEN], &[])
                .unwrap_err(),
            HkdsError::CounterOverflow
        );
    }
}
