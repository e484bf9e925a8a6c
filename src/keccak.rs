//! Keccak-f\[1600\] and the SHAKE / KMAC constructions used by the protocol.
//!
//! The XOF is FIPS 202 SHAKE (domain `0x1F`); the MAC is NIST SP 800-185 KMAC
//! (function name `"KMAC"`, domain `0x04` on finalize). Both short
//! (one-shot) and long (initialize / update / squeeze / finalize) forms are
//! provided. The permutation round count follows
//! [`KECCAK_PERMUTATION_ROUNDS`](crate::KECCAK_PERMUTATION_ROUNDS); anything
//! other than 24 rounds is not FIPS interoperable, see
//! [`FIPS_INTEROPERABLE`](crate::FIPS_INTEROPERABLE).

use crate::KECCAK_PERMUTATION_ROUNDS;
use zeroize::{Zeroize, ZeroizeOnDrop};


/// Number of 64-bit lanes in the Keccak state.
pub const KECCAK_STATE_WORDS: usize = 25;

/// Size of the Keccak state in bytes.
pub const KECCAK_STATE_BYTES: usize = 200;

pub(crate) const SHAKE_DOMAIN: u8 = 0x1F;
pub(crate) const KMAC_DOMAIN: u8 = 0x04;
pub(crate) const KMAC_NAME: [u8; 4] = *b"KMAC";

// Round constants for up to 48 rounds; the first 24 are the FIPS 202 set.
pub(crate) const KECCAK_ROUND_CONSTANTS: [u64; 48] = [
    0x0000_0000_0000_0001,
    0x0000_0000_0000_8082,
    0x8000_0000_0000_808A,
    0x8000_0000_8000_8000,
    0x0000_0000_0000_808B,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8009,
    0x0000_0000_0000_008A,
    0x0000_0000_0000_0088,
    0x0000_0000_8000_8009,
    0x0000_0000_8000_000A,
    0x0000_0000_8000_808B,
    0x8000_0000_0000_008B,
    0x8000_0000_0000_8089,
    0x8000_0000_0000_8003,
    0x8000_0000_0000_8002,
    0x8000_0000_0000_0080,
    0x0000_0000_0000_800A,
    0x8000_0000_8000_000A,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8080,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8008,
    0x8000_0000_8000_8082,
    0x8000_0000_8000_800A,
    0x8000_0000_0000_0003,
    0x8000_0000_8000_0009,
    0x8000_0000_0000_8082,
    0x0000_0000_0000_8009,
    0x8000_0000_0000_0080,
    0x0000_0000_0000_8083,
    0x8000_0000_0000_0081,
    0x0000_0000_0000_0001,
    0x0000_0000_0000_800B,
    0x8000_0000_8000_8001,
    0x0000_0000_0000_0080,
    0x8000_0000_0000_8000,
    0x8000_0000_8000_8001,
    0x0000_0000_0000_0009,
    0x8000_0000_8000_808B,
    0x0000_0000_0000_0081,
    0x8000_0000_0000_0082,
    0x0000_0000_8000_008B,
    0x8000_0000_8000_8009,
    0x8000_0000_8000_0000,
    0x0000_0000_8000_0080,
    0x0000_0000_8000_8003,
];

// Rho rotation offsets and pi lane permutation, in application order.
pub(crate) const RHO: [u32; 24] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 2, 14, 27, 41, 56, 8, 25, 43, 62, 18, 39, 61, 20, 44,
];
pub(crate) const PI: [usize; 24] = [
    10, 7, 11, 17, 18, 3, 5, 16, 8, 21, 24, 4, 15, 23, 19, 13, 12, 2, 20, 14, 22, 9, 6, 1,
];


/// The Keccak absorption rate, one per SHAKE strength. The rate (with the
/// associated name constants of each parameter-set module) is the only thing
/// distinguishing the three strengths; all size constants derive from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeccakRate {
    /// SHAKE-128, 168-byte rate.
    Shake128 = 168,
    /// SHAKE-256, 136-byte rate.
    Shake256 = 136,
    /// SHAKE-512, 72-byte rate.
    Shake512 = 72,
}

impl KeccakRate {
    /// The rate in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize { self as usize }
}


/// Applies the Keccak-f\[1600\] permutation for the given number of rounds.
///
/// Round constants are taken from the head of the 48-entry table, so 24
/// rounds is exactly FIPS 202 Keccak-f\[1600\].
pub fn permute(state: &mut [u64; KECCAK_STATE_WORDS], rounds: usize) {
    debug_assert!(rounds % 2 == 0 && rounds <= KECCAK_ROUND_CONSTANTS.len());

    for rc in &KECCAK_ROUND_CONSTANTS[..rounds] {
        // theta
        let mut c = [0u64; 5];
        for x in 0..5 {
            c[x] = state[x] ^ state[x + 5] ^ state[x + 10] ^ state[x + 15] ^ state[x + 20];
        }
        for x in 0..5 {
            let d = c[(x + 4) % 5] ^ c[(x + 1) % 5].rotate_left(1);
            for y in 0..5 {
                state[x + 5 * y] ^= d;
            }
        }
        // rho and pi
        let mut last = state[1];
        for (offset, lane) in RHO.iter().zip(PI.iter()) {
            let tmp = state[*lane];
            state[*lane] = last.rotate_left(*offset);
            last = tmp;
        }
        // chi
        for y in 0..5 {
            let mut row = [0u64; 5];
            row.copy_from_slice(&state[5 * y..5 * y + 5]);
            for x in 0..5 {
                state[5 * y + x] = row[x] ^ (!row[(x + 1) % 5] & row[(x + 2) % 5]);
            }
        }
        // iota
        state[0] ^= rc;
    }
}


/// XOR a message fragment into the state as little-endian 64-bit lanes.
/// The fragment need not be lane aligned; the tail is zero extended.
fn fast_absorb(state: &mut [u64; KECCAK_STATE_WORDS], message: &[u8]) {
    debug_assert!(message.len() <= KECCAK_STATE_BYTES);
    let mut chunks = message.chunks_exact(8);
    for (lane, chunk) in state.iter_mut().zip(chunks.by_ref()) {
        *lane ^= u64::from_le_bytes(chunk.try_into().expect("lane fail"));
    }
    let rem = chunks.remainder();
    if !rem.is_empty() {
        let mut word = [0u8; 8];
        word[..rem.len()].copy_from_slice(rem);
        state[message.len() / 8] ^= u64::from_le_bytes(word);
    }
}


/// Copy `len` bytes of the state out as little-endian 64-bit lanes.
fn store_state(state: &[u64; KECCAK_STATE_WORDS], output: &mut [u8]) {
    for (chunk, lane) in output.chunks_mut(8).zip(state.iter()) {
        chunk.copy_from_slice(&lane.to_le_bytes()[..chunk.len()]);
    }
}


/// SP 800-185 `left_encode`; returns the number of bytes written.
pub(crate) fn left_encode(buffer: &mut [u8], value: usize) -> usize {
    let mut v = value;
    let mut n = 0;
    while v != 0 && n < core::mem::size_of::<usize>() {
        n += 1;
        v >>= 8;
    }
    if n == 0 {
        n = 1;
    }
    for i in 1..=n {
        buffer[i] = (value >> (8 * (n - i))) as u8;
    }
    buffer[0] = n as u8;
    n + 1
}


/// SP 800-185 `right_encode`; returns the number of bytes written.
pub(crate) fn right_encode(buffer: &mut [u8], value: usize) -> usize {
    let mut v = value;
    let mut n = 0;
    while v != 0 && n < core::mem::size_of::<usize>() {
        n += 1;
        v >>= 8;
    }
    if n == 0 {
        n = 1;
    }
    for i in 1..=n {
        buffer[i - 1] = (value >> (8 * (n - i))) as u8;
    }
    buffer[n] = n as u8;
    n + 1
}


/// An incremental Keccak sponge. All buffered content and the state itself
/// are erased on drop, by [`dispose`](Self::dispose), and at the end of
/// `finalize`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeccakState {
    state: [u64; KECCAK_STATE_WORDS],
    buffer: [u8; KECCAK_STATE_BYTES],
    position: usize,
}

impl Default for KeccakState {
    fn default() -> Self { Self::new() }
}

impl KeccakState {
    /// Creates a zeroed sponge state.
    #[must_use]
    pub fn new() -> Self {
        Self { state: [0u64; KECCAK_STATE_WORDS], buffer: [0u8; KECCAK_STATE_BYTES], position: 0 }
    }

    /// Erases the state, the byte buffer, and the buffer position.
    pub fn dispose(&mut self) { self.zeroize(); }

    /// One-shot absorb of a complete message: whole blocks are processed
    /// directly, the final partial block is padded with the domain byte and
    /// the `0x80` terminator. The finishing permutation is deferred to the
    /// first squeeze.
    pub(crate) fn absorb(&mut self, rate: KeccakRate, message: &[u8], domain: u8) {
        let r = rate.bytes();
        let mut msg = message;
        while msg.len() >= r {
            fast_absorb(&mut self.state, &msg[..r]);
            permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            msg = &msg[r..];
        }
        let mut pad = [0u8; KECCAK_STATE_BYTES];
        pad[..msg.len()].copy_from_slice(msg);
        pad[msg.len()] = domain;
        pad[r - 1] |= 0x80;
        fast_absorb(&mut self.state, &pad[..r]);
        pad.zeroize();
    }

    /// Absorbs the KMAC prefix: the bytepadded function name / customization
    /// stage followed by the bytepadded key stage (SP 800-185).
    pub(crate) fn absorb_key_custom(&mut self, rate: KeccakRate, key: &[u8], custom: &[u8]) {
        let r = rate.bytes();
        self.zeroize();

        // stage 1: function name and customization string
        let mut pad = [0u8; KECCAK_STATE_BYTES];
        let mut oft = left_encode(&mut pad, r);
        oft += left_encode(&mut pad[oft..], KMAC_NAME.len() * 8);
        pad[oft..oft + KMAC_NAME.len()].copy_from_slice(&KMAC_NAME);
        oft += KMAC_NAME.len();
        oft += left_encode(&mut pad[oft..], custom.len() * 8);
        for byte in custom {
            if oft == r {
                fast_absorb(&mut self.state, &pad[..r]);
                permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
                pad = [0u8; KECCAK_STATE_BYTES];
                oft = 0;
            }
            pad[oft] = *byte;
            oft += 1;
        }
        fast_absorb(&mut self.state, &pad[..r]);
        permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);

        // stage 2: key
        pad = [0u8; KECCAK_STATE_BYTES];
        oft = left_encode(&mut pad, r);
        oft += left_encode(&mut pad[oft..], key.len() * 8);
        for byte in key {
            if oft == r {
                fast_absorb(&mut self.state, &pad[..r]);
                permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
                pad = [0u8; KECCAK_STATE_BYTES];
                oft = 0;
            }
            pad[oft] = *byte;
            oft += 1;
        }
        fast_absorb(&mut self.state, &pad[..r]);
        permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
        pad.zeroize();
    }

    /// Buffered absorb; bytes are held back until a full rate block is
    /// available.
    pub(crate) fn update(&mut self, rate: KeccakRate, message: &[u8]) {
        let r = rate.bytes();
        let mut msg = message;
        if msg.is_empty() {
            return;
        }
        if self.position != 0 && self.position + msg.len() >= r {
            let rmd = r - self.position;
            self.buffer[self.position..r].copy_from_slice(&msg[..rmd]);
            fast_absorb(&mut self.state, &self.buffer[..r]);
            permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            self.position = 0;
            msg = &msg[rmd..];
        }
        while msg.len() >= r {
            fast_absorb(&mut self.state, &msg[..r]);
            permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            msg = &msg[r..];
        }
        if !msg.is_empty() {
            self.buffer[self.position..self.position + msg.len()].copy_from_slice(msg);
            self.position += msg.len();
        }
    }

    /// Flushes any buffered input with the `right_encode(outlen)` suffix and
    /// the domain byte, then squeezes `output.len()` bytes. The whole sponge
    /// state reads as zero afterwards.
    pub(crate) fn finalize(&mut self, rate: KeccakRate, output: &mut [u8], domain: u8) {
        let r = rate.bytes();
        let mut pad = [0u8; KECCAK_STATE_BYTES];
        pad[..self.position].copy_from_slice(&self.buffer[..self.position]);

        let mut enc = [0u8; core::mem::size_of::<usize>() + 1];
        let enclen = right_encode(&mut enc, output.len() * 8);

        if self.position + enclen >= r {
            fast_absorb(&mut self.state, &pad[..self.position]);
            permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            pad = [0u8; KECCAK_STATE_BYTES];
            self.position = 0;
        }

        pad[self.position..self.position + enclen].copy_from_slice(&enc[..enclen]);
        pad[self.position + enclen] = domain;
        pad[r - 1] |= 0x80;
        fast_absorb(&mut self.state, &pad[..r]);

        let total = output.len();
        let mut oft = 0;
        while total - oft >= r {
            permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            store_state(&self.state, &mut output[oft..oft + r]);
            oft += r;
        }
        if oft < total {
            permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            let mut block = [0u8; KECCAK_STATE_BYTES];
            store_state(&self.state, &mut block[..r]);
            output[oft..].copy_from_slice(&block[..total - oft]);
            block.zeroize();
        }

        pad.zeroize();
        self.zeroize();
    }

    /// Squeezes whole rate-sized blocks; each block applies the permutation
    /// before the state is copied out.
    pub fn squeeze_blocks(&mut self, rate: KeccakRate, output: &mut [u8], nblocks: usize) {
        let r = rate.bytes();
        debug_assert!(output.len() >= nblocks * r);
        for block in output.chunks_exact_mut(r).take(nblocks) {
            permute(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            store_state(&self.state, block);
        }
    }

    /// Initializes the sponge as a SHAKE XOF over `input`; squeeze with
    /// [`squeeze_blocks`](Self::squeeze_blocks).
    pub fn shake_initialize(&mut self, rate: KeccakRate, input: &[u8]) {
        self.zeroize();
        self.absorb(rate, input, SHAKE_DOMAIN);
    }

    /// Keys the sponge for incremental KMAC; feed the message with
    /// [`kmac_update`](Self::kmac_update) and extract the tag with
    /// [`kmac_finalize`](Self::kmac_finalize).
    pub fn kmac_initialize(&mut self, rate: KeccakRate, key: &[u8], custom: &[u8]) {
        self.absorb_key_custom(rate, key, custom);
    }

    /// Absorbs message bytes into an initialized KMAC sponge.
    pub fn kmac_update(&mut self, rate: KeccakRate, message: &[u8]) {
        self.update(rate, message);
    }

    /// Completes the KMAC computation, writing `output.len()` tag bytes.
    pub fn kmac_finalize(&mut self, rate: KeccakRate, output: &mut [u8]) {
        self.finalize(rate, output, KMAC_DOMAIN);
    }
}


/// One-shot SHAKE at an explicit rate; fills the whole of `output`.
pub fn shake(rate: KeccakRate, output: &mut [u8], input: &[u8]) {
    let r = rate.bytes();
    let nblocks = output.len() / r;
    let mut ctx = KeccakState::new();
    ctx.shake_initialize(rate, input);
    ctx.squeeze_blocks(rate, output, nblocks);
    let tail = output.len() - nblocks * r;
    if tail != 0 {
        let mut block = [0u8; KECCAK_STATE_BYTES];
        ctx.squeeze_blocks(rate, &mut block[..r], 1);
        output[nblocks * r..].copy_from_slice(&block[..tail]);
        block.zeroize();
    }
    ctx.dispose();
}


/// One-shot KMAC at an explicit rate; the tag length is `output.len()`.
pub fn kmac(rate: KeccakRate, output: &mut [u8], message: &[u8], key: &[u8], custom: &[u8]) {
    let mut ctx = KeccakState::new();
    ctx.kmac_initialize(rate, key, custom);
    ctx.kmac_update(rate, message);
    ctx.kmac_finalize(rate, output);
}


/// SHAKE-128 XOF.
pub fn shake128(output: &mut [u8], input: &[u8]) { shake(KeccakRate::Shake128, output, input); }

/// SHAKE-256 XOF.
pub fn shake256(output: &mut [u8], input: &[u8]) { shake(KeccakRate::Shake256, output, input); }

/// SHAKE-512 XOF (Keccak with a 72-byte rate; not part of FIPS 202).
pub fn shake512(output: &mut [u8], input: &[u8]) { shake(KeccakRate::Shake512, output, input); }

/// KMAC-128 per SP 800-185.
pub fn kmac128(output: &mut [u8], message: &[u8], key: &[u8], custom: &[u8]) {
    kmac(KeccakRate::Shake128, output, message, key, custom);
}

/// KMAC-256 per SP 800-185.
pub fn kmac256(output: &mut [u8], message: &[u8], key: &[u8], custom: &[u8]) {
    kmac(KeccakRate::Shake256, output, message, key, custom);
}

/// KMAC-512 (Keccak with a 72-byte rate; not part of SP 800-185).
pub fn kmac512(output: &mut [u8], message: &[u8], key: &[u8], custom: &[u8]) {
    kmac(KeccakRate::Shake512, output, message, key, custom);
}
