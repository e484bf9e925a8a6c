//! Batched 4- and 8-way SHAKE and KMAC.
//!
//! Each [`KeccakStateX`] interleaves `N` independent sponge states lane by
//! lane, so one pass of the permutation advances all `N` of them. The inputs
//! of a batch must share one length (every protocol call site does), and the
//! output of lane `i` is bit-identical to running the scalar construction
//! over lane `i`'s input alone. The lane-sliced permutation is the portable
//! dispatch point: [`permute_x4`] / [`permute_x8`] are the batched
//! counterparts of [`crate::keccak::permute`], and the scalar path is always
//! available as the fallback.

use crate::keccak::{
    left_encode, right_encode, KeccakRate, KECCAK_ROUND_CONSTANTS, KECCAK_STATE_BYTES,
    KECCAK_STATE_WORDS, KMAC_DOMAIN, KMAC_NAME, PI, RHO, SHAKE_DOMAIN,
};
use crate::KECCAK_PERMUTATION_ROUNDS;
use zeroize::{Zeroize, ZeroizeOnDrop};


#[inline(always)]
fn vxor<const N: usize>(a: [u64; N], b: [u64; N]) -> [u64; N] {
    core::array::from_fn(|i| a[i] ^ b[i])
}

#[inline(always)]
fn vrotl<const N: usize>(a: [u64; N], r: u32) -> [u64; N] {
    core::array::from_fn(|i| a[i].rotate_left(r))
}

#[inline(always)]
fn vchi<const N: usize>(a: [u64; N], b: [u64; N], c: [u64; N]) -> [u64; N] {
    core::array::from_fn(|i| a[i] ^ (!b[i] & c[i]))
}


/// Keccak-f\[1600\] across `N` interleaved states; elementwise over the lane
/// dimension so the optimizer can widen it to vector registers.
pub(crate) fn permute_lanes<const N: usize>(state: &mut [[u64; N]; KECCAK_STATE_WORDS], rounds: usize) {
    debug_assert!(rounds % 2 == 0 && rounds <= KECCAK_ROUND_CONSTANTS.len());

    for rc in &KECCAK_ROUND_CONSTANTS[..rounds] {
        // theta
        let mut c = [[0u64; N]; 5];
        for x in 0..5 {
            c[x] = vxor(
                vxor(vxor(state[x], state[x + 5]), vxor(state[x + 10], state[x + 15])),
                state[x + 20],
            );
        }
        for x in 0..5 {
            let d = vxor(c[(x + 4) % 5], vrotl(c[(x + 1) % 5], 1));
            for y in 0..5 {
                state[x + 5 * y] = vxor(state[x + 5 * y], d);
            }
        }
        // rho and pi
        let mut last = state[1];
        for (offset, lane) in RHO.iter().zip(PI.iter()) {
            let tmp = state[*lane];
            state[*lane] = vrotl(last, *offset);
            last = tmp;
        }
        // chi
        for y in 0..5 {
            let mut row = [[0u64; N]; 5];
            row.copy_from_slice(&state[5 * y..5 * y + 5]);
            for x in 0..5 {
                state[5 * y + x] = vchi(row[x], row[(x + 1) % 5], row[(x + 2) % 5]);
            }
        }
        // iota
        for lane in &mut state[0] {
            *lane ^= rc;
        }
    }
}


/// Four-way batched Keccak-f\[1600\].
pub fn permute_x4(state: &mut [[u64; 4]; KECCAK_STATE_WORDS], rounds: usize) {
    permute_lanes(state, rounds);
}

/// Eight-way batched Keccak-f\[1600\].
pub fn permute_x8(state: &mut [[u64; 8]; KECCAK_STATE_WORDS], rounds: usize) {
    permute_lanes(state, rounds);
}


/// `N` interleaved sponge states sharing a single buffered position (inputs
/// of one batch must have identical lengths). Erased on drop and after
/// finalize, like the scalar [`crate::keccak::KeccakState`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeccakStateX<const N: usize> {
    state: [[u64; N]; KECCAK_STATE_WORDS],
    buffer: [[u8; KECCAK_STATE_BYTES]; N],
    position: usize,
}

/// Four interleaved sponge states.
pub type KeccakStateX4 = KeccakStateX<4>;

/// Eight interleaved sponge states.
pub type KeccakStateX8 = KeccakStateX<8>;

impl<const N: usize> Default for KeccakStateX<N> {
    fn default() -> Self { Self::new() }
}

impl<const N: usize> KeccakStateX<N> {
    /// Creates `N` zeroed sponge states.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: [[0u64; N]; KECCAK_STATE_WORDS],
            buffer: [[0u8; KECCAK_STATE_BYTES]; N],
            position: 0,
        }
    }

    /// Erases all lanes, buffers, and the shared position.
    pub fn dispose(&mut self) { self.zeroize(); }

    /// XOR one rate-sized block per lane into the interleaved state.
    fn xor_blocks(&mut self, r: usize, inputs: &[&[u8]; N], oft: usize) {
        for w in 0..r / 8 {
            for l in 0..N {
                let chunk = &inputs[l][oft + 8 * w..oft + 8 * w + 8];
                self.state[w][l] ^= u64::from_le_bytes(chunk.try_into().expect("lane fail"));
            }
        }
    }

    /// XOR per-lane pad buffers (first `r` bytes of each) into the state.
    fn xor_pads(&mut self, r: usize, pads: &[[u8; KECCAK_STATE_BYTES]; N]) {
        Self::xor_pads_into(&mut self.state, r, pads);
    }

    fn xor_pads_into(
        state: &mut [[u64; N]; KECCAK_STATE_WORDS], r: usize,
        pads: &[[u8; KECCAK_STATE_BYTES]; N],
    ) {
        for w in 0..r / 8 {
            for l in 0..N {
                let chunk = &pads[l][8 * w..8 * w + 8];
                state[w][l] ^= u64::from_le_bytes(chunk.try_into().expect("lane fail"));
            }
        }
    }

    /// Copy `r` state bytes of every lane to `outputs[lane][oft..]`.
    fn store_blocks<const CAP: usize>(&self, r: usize, outputs: &mut [[u8; CAP]; N], oft: usize) {
        for w in 0..r / 8 {
            for l in 0..N {
                outputs[l][oft + 8 * w..oft + 8 * w + 8]
                    .copy_from_slice(&self.state[w][l].to_le_bytes());
            }
        }
    }

    /// One-shot absorb of `N` equal-length messages with the given domain.
    fn absorb(&mut self, rate: KeccakRate, inputs: &[&[u8]; N], domain: u8) {
        let r = rate.bytes();
        let len = inputs[0].len();
        debug_assert!(inputs.iter().all(|input| input.len() == len));

        let mut oft = 0;
        while len - oft >= r {
            self.xor_blocks(r, inputs, oft);
            permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            oft += r;
        }
        let mut pads = [[0u8; KECCAK_STATE_BYTES]; N];
        for (pad, input) in pads.iter_mut().zip(inputs.iter()) {
            pad[..len - oft].copy_from_slice(&input[oft..]);
            pad[len - oft] = domain;
            pad[r - 1] |= 0x80;
        }
        self.xor_pads(r, &pads);
        pads.zeroize();
    }

    /// Absorbs the KMAC prefix for all lanes: the bytepadded name and
    /// customization stage, then the bytepadded key stage.
    fn absorb_key_custom(&mut self, rate: KeccakRate, keys: &[&[u8]; N], customs: &[&[u8]; N]) {
        let r = rate.bytes();
        debug_assert!(keys.iter().all(|key| key.len() == keys[0].len()));
        debug_assert!(customs.iter().all(|custom| custom.len() == customs[0].len()));
        self.zeroize();

        // stage 1: function name and customization string
        let mut pads = [[0u8; KECCAK_STATE_BYTES]; N];
        let mut head = [0u8; KECCAK_STATE_BYTES];
        let mut oft = left_encode(&mut head, r);
        oft += left_encode(&mut head[oft..], KMAC_NAME.len() * 8);
        head[oft..oft + KMAC_NAME.len()].copy_from_slice(&KMAC_NAME);
        oft += KMAC_NAME.len();
        oft += left_encode(&mut head[oft..], customs[0].len() * 8);
        for pad in &mut pads {
            pad[..oft].copy_from_slice(&head[..oft]);
        }
        for i in 0..customs[0].len() {
            if oft == r {
                self.xor_pads(r, &pads);
                permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
                pads = [[0u8; KECCAK_STATE_BYTES]; N];
                oft = 0;
            }
            for (pad, custom) in pads.iter_mut().zip(customs.iter()) {
                pad[oft] = custom[i];
            }
            oft += 1;
        }
        self.xor_pads(r, &pads);
        permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);

        // stage 2: key
        pads = [[0u8; KECCAK_STATE_BYTES]; N];
        head = [0u8; KECCAK_STATE_BYTES];
        oft = left_encode(&mut head, r);
        oft += left_encode(&mut head[oft..], keys[0].len() * 8);
        for pad in &mut pads {
            pad[..oft].copy_from_slice(&head[..oft]);
        }
        for i in 0..keys[0].len() {
            if oft == r {
                self.xor_pads(r, &pads);
                permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
                pads = [[0u8; KECCAK_STATE_BYTES]; N];
                oft = 0;
            }
            for (pad, key) in pads.iter_mut().zip(keys.iter()) {
                pad[oft] = key[i];
            }
            oft += 1;
        }
        self.xor_pads(r, &pads);
        permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
        pads.zeroize();
    }

    /// Buffered absorb of `N` equal-length message fragments.
    fn update(&mut self, rate: KeccakRate, messages: &[&[u8]; N]) {
        let r = rate.bytes();
        let len = messages[0].len();
        debug_assert!(messages.iter().all(|message| message.len() == len));
        if len == 0 {
            return;
        }

        let mut oft = 0;
        if self.position != 0 && self.position + len >= r {
            let rmd = r - self.position;
            for (buffer, message) in self.buffer.iter_mut().zip(messages.iter()) {
                buffer[self.position..r].copy_from_slice(&message[..rmd]);
            }
            Self::xor_pads_into(&mut self.state, r, &self.buffer);
            permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            self.position = 0;
            oft = rmd;
        }
        while len - oft >= r {
            self.xor_blocks(r, messages, oft);
            permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            oft += r;
        }
        if oft < len {
            for (buffer, message) in self.buffer.iter_mut().zip(messages.iter()) {
                buffer[self.position..self.position + len - oft].copy_from_slice(&message[oft..]);
            }
            self.position += len - oft;
        }
    }

    /// Flushes the buffered input with the `right_encode(outlen)` suffix and
    /// domain byte, then squeezes `OUT` bytes per lane. All lanes read as
    /// zero afterwards.
    fn finalize<const OUT: usize>(
        &mut self, rate: KeccakRate, outputs: &mut [[u8; OUT]; N], domain: u8,
    ) {
        let r = rate.bytes();
        let mut pads = [[0u8; KECCAK_STATE_BYTES]; N];
        for (pad, buffer) in pads.iter_mut().zip(self.buffer.iter()) {
            pad[..self.position].copy_from_slice(&buffer[..self.position]);
        }

        let mut enc = [0u8; core::mem::size_of::<usize>() + 1];
        let enclen = right_encode(&mut enc, OUT * 8);

        if self.position + enclen >= r {
            // absorb the partial lanes, then start a fresh block
            let partial = self.position;
            for w in 0..(partial + 7) / 8 {
                for l in 0..N {
                    let mut word = [0u8; 8];
                    let take = core::cmp::min(8, partial - 8 * w);
                    word[..take].copy_from_slice(&pads[l][8 * w..8 * w + take]);
                    self.state[w][l] ^= u64::from_le_bytes(word);
                }
            }
            permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            pads = [[0u8; KECCAK_STATE_BYTES]; N];
            self.position = 0;
        }

        for pad in &mut pads {
            pad[self.position..self.position + enclen].copy_from_slice(&enc[..enclen]);
            pad[self.position + enclen] = domain;
            pad[r - 1] |= 0x80;
        }
        self.xor_pads(r, &pads);

        let mut oft = 0;
        while OUT - oft >= r {
            permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            self.store_blocks(r, outputs, oft);
            oft += r;
        }
        if oft < OUT {
            permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            let mut blocks = [[0u8; KECCAK_STATE_BYTES]; N];
            self.store_blocks(r, &mut blocks, 0);
            for (output, block) in outputs.iter_mut().zip(blocks.iter()) {
                output[oft..].copy_from_slice(&block[..OUT - oft]);
            }
            blocks.zeroize();
        }

        pads.zeroize();
        self.zeroize();
    }

    /// Initializes all lanes as SHAKE XOFs over `N` equal-length inputs.
    pub fn shake_initialize(&mut self, rate: KeccakRate, inputs: &[&[u8]; N]) {
        self.zeroize();
        self.absorb(rate, inputs, SHAKE_DOMAIN);
    }

    /// Squeezes `nblocks` rate-sized blocks into the head of every lane's
    /// output buffer.
    pub fn squeeze_blocks<const CAP: usize>(
        &mut self, rate: KeccakRate, outputs: &mut [[u8; CAP]; N], nblocks: usize,
    ) {
        let r = rate.bytes();
        debug_assert!(nblocks * r <= CAP);
        for block in 0..nblocks {
            permute_lanes(&mut self.state, KECCAK_PERMUTATION_ROUNDS);
            self.store_blocks(r, outputs, block * r);
        }
    }

    /// Keys all lanes for incremental KMAC.
    pub fn kmac_initialize(&mut self, rate: KeccakRate, keys: &[&[u8]; N], customs: &[&[u8]; N]) {
        self.absorb_key_custom(rate, keys, customs);
    }

    /// Absorbs `N` equal-length message fragments into keyed lanes.
    pub fn kmac_update(&mut self, rate: KeccakRate, messages: &[&[u8]; N]) {
        self.update(rate, messages);
    }

    /// Completes the batched KMAC, producing one `OUT`-byte tag per lane.
    pub fn kmac_finalize<const OUT: usize>(
        &mut self, rate: KeccakRate, outputs: &mut [[u8; OUT]; N],
    ) {
        self.finalize(rate, outputs, KMAC_DOMAIN);
    }
}


/// One-shot batched SHAKE over `N` equal-length inputs.
pub(crate) fn shake_lanes<const N: usize, const OUT: usize>(
    rate: KeccakRate, outputs: &mut [[u8; OUT]; N], inputs: &[&[u8]; N],
) {
    let r = rate.bytes();
    let mut ctx = KeccakStateX::<N>::new();
    ctx.shake_initialize(rate, inputs);
    let nblocks = OUT / r;
    ctx.squeeze_blocks(rate, outputs, nblocks);
    let tail = OUT - nblocks * r;
    if tail != 0 {
        let mut blocks = [[0u8; KECCAK_STATE_BYTES]; N];
        permute_lanes(&mut ctx.state, KECCAK_PERMUTATION_ROUNDS);
        ctx.store_blocks(r, &mut blocks, 0);
        for (output, block) in outputs.iter_mut().zip(blocks.iter()) {
            output[nblocks * r..].copy_from_slice(&block[..tail]);
        }
        blocks.zeroize();
    }
    ctx.dispose();
}


/// One-shot batched KMAC over `N` equal-length messages, keys, and
/// customization strings.
pub(crate) fn kmac_lanes<const N: usize, const OUT: usize>(
    rate: KeccakRate, outputs: &mut [[u8; OUT]; N], messages: &[&[u8]; N], keys: &[&[u8]; N],
    customs: &[&[u8]; N],
) {
    let mut ctx = KeccakStateX::<N>::new();
    ctx.kmac_initialize(rate, keys, customs);
    ctx.kmac_update(rate, messages);
    ctx.kmac_finalize(rate, outputs);
}


/// Four SHAKE-128 instances in one pass.
pub fn shake128_x4<const OUT: usize>(outputs: &mut [[u8; OUT]; 4], inputs: &[&[u8]; 4]) {
    shake_lanes(KeccakRate::Shake128, outputs, inputs);
}

/// Four SHAKE-256 instances in one pass.
pub fn shake256_x4<const OUT: usize>(outputs: &mut [[u8; OUT]; 4], inputs: &[&[u8]; 4]) {
    shake_lanes(KeccakRate::Shake256, outputs, inputs);
}

/// Four SHAKE-512 instances in one pass.
pub fn shake512_x4<const OUT: usize>(outputs: &mut [[u8; OUT]; 4], inputs: &[&[u8]; 4]) {
    shake_lanes(KeccakRate::Shake512, outputs, inputs);
}

/// Eight SHAKE-128 instances in one pass.
pub fn shake128_x8<const OUT: usize>(outputs: &mut [[u8; OUT]; 8], inputs: &[&[u8]; 8]) {
    shake_lanes(KeccakRate::Shake128, outputs, inputs);
}

/// Eight SHAKE-256 instances in one pass.
pub fn shake256_x8<const OUT: usize>(outputs: &mut [[u8; OUT]; 8], inputs: &[&[u8]; 8]) {
    shake_lanes(KeccakRate::Shake256, outputs, inputs);
}

/// Eight SHAKE-512 instances in one pass.
pub fn shake512_x8<const OUT: usize>(outputs: &mut [[u8; OUT]; 8], inputs: &[&[u8]; 8]) {
    shake_lanes(KeccakRate::Shake512, outputs, inputs);
}

/// Four KMAC-128 instances in one pass.
pub fn kmac128_x4<const OUT: usize>(
    outputs: &mut [[u8; OUT]; 4], messages: &[&[u8]; 4], keys: &[&[u8]; 4], customs: &[&[u8]; 4],
) {
    kmac_lanes(KeccakRate::Shake128, outputs, messages, keys, customs);
}

/// Four KMAC-256 instances in one pass.
pub fn kmac256_x4<const OUT: usize>(
    outputs: &mut [[u8; OUT]; 4], messages: &[&[u8]; 4], keys: &[&[u8]; 4], customs: &[&[u8]; 4],
) {
    kmac_lanes(KeccakRate::Shake256, outputs, messages, keys, customs);
}

/// Four KMAC-512 instances in one pass.
pub fn kmac512_x4<const OUT: usize>(
    outputs: &mut [[u8; OUT]; 4], messages: &[&[u8]; 4], keys: &[&[u8]; 4], customs: &[&[u8]; 4],
) {
    kmac_lanes(KeccakRate::Shake512, outputs, messages, keys, customs);
}

/// Eight KMAC-128 instances in one pass.
pub fn kmac128_x8<const OUT: usize>(
    outputs: &mut [[u8; OUT]; 8], messages: &[&[u8]; 8], keys: &[&[u8]; 8], customs: &[&[u8]; 8],
) {
    kmac_lanes(KeccakRate::Shake128, outputs, messages, keys, customs);
}

/// Eight KMAC-256 instances in one pass.
pub fn kmac256_x8<const OUT: usize>(
    outputs: &mut [[u8; OUT]; 8], messages: &[&[u8]; 8], keys: &[&[u8]; 8], customs: &[&[u8]; 8],
) {
    kmac_lanes(KeccakRate::Shake256, outputs, messages, keys, customs);
}

/// Eight KMAC-512 instances in one pass.
pub fn kmac512_x8<const OUT: usize>(
    outputs: &mut [[u8; OUT]; 8], messages: &[&[u8]; 8], keys: &[&[u8]; 8], customs: &[&[u8]; 8],
) {
    kmac_lanes(KeccakRate::Shake512, outputs, messages, keys, customs);
}
