//! The sponge state and its absorb/digest/squeeze pipelines.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::permutation::{keccak_p, LANE_TRANSPOSE};
use crate::spec::{Spec, SpecError};

/// The state of a Keccak-family sponge.
///
/// A state is created from a [`Spec`], fed with [`update`](Self::update) (or
/// one of its variants), finalised with [`digest`](Self::digest), and can
/// then keep producing output with [`squeeze`](Self::squeeze). Cloning
/// yields a fully independent state; dropping wipes all owned material.
#[derive(Clone, Debug, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct KeccakState {
    /// The 25 lanes; only the low `w` bits of each are in use.
    pub(crate) s: [u64; 25],
    /// Bitrate in bits.
    pub(crate) r: usize,
    /// Capacity in bits.
    pub(crate) c: usize,
    /// Output size in bits.
    pub(crate) n: usize,
    /// State size in bits.
    pub(crate) b: usize,
    /// Lane width in bits.
    pub(crate) w: usize,
    /// Mask selecting the low `w` bits of a lane.
    pub(crate) wmask: u64,
    /// log2 of the lane width.
    pub(crate) l: usize,
    /// Rounds per permutation.
    pub(crate) nr: usize,
    /// Message bytes waiting for a whole block to accumulate.
    pub(crate) m: Vec<u8>,
}

impl KeccakState {
    /// Create a state for the given hashing parameters.
    pub fn new(spec: &Spec) -> Result<Self, SpecError> {
        spec.check()?;
        let r = spec.bitrate as usize;
        let c = spec.capacity as usize;
        let n = spec.output as usize;
        let b = r + c;
        let w = b / 25;
        let l = w.trailing_zeros() as usize;
        Ok(KeccakState {
            s: [0; 25],
            r,
            c,
            n,
            b,
            w,
            wmask: if w == 64 { u64::MAX } else { (1 << w) - 1 },
            l,
            nr: 12 + 2 * l,
            m: Vec::with_capacity(r * b / 4),
        })
    }

    /// The bitrate, in bits.
    pub fn bitrate(&self) -> usize {
        self.r
    }

    /// The capacity, in bits.
    pub fn capacity(&self) -> usize {
        self.c
    }

    /// The output size, in bits.
    pub fn output(&self) -> usize {
        self.n
    }

    /// The state size, in bits.
    pub fn state_size(&self) -> usize {
        self.b
    }

    /// The lane width, in bits.
    pub fn word_size(&self) -> usize {
        self.w
    }

    /// Restore the state to its just-created condition, reusing the message
    /// buffer allocation.
    pub fn reset(&mut self) {
        self.s = [0; 25];
        self.m.clear();
    }

    /// Overwrite the pending message bytes with zeros, without discarding
    /// them.
    pub fn wipe_message(&mut self) {
        self.m.as_mut_slice().zeroize();
    }

    /// Overwrite the lane array with zeros.
    pub fn wipe_sponge(&mut self) {
        self.s.zeroize();
    }

    /// Overwrite all sensitive data with zeros, without freeing anything.
    pub fn wipe(&mut self) {
        self.wipe_message();
        self.wipe_sponge();
    }

    /// The buffer granularity required by [`zerocopy_update`](Self::zerocopy_update):
    /// one block, in bytes.
    pub fn zerocopy_chunksize(&self) -> usize {
        self.r / 8
    }

    /// Absorb more of the message, wiping the old buffer if a larger one has
    /// to replace it.
    pub fn update(&mut self, msg: &[u8]) {
        self.reserve_secure(msg.len());
        self.m.extend_from_slice(msg);
        self.absorb_pending();
    }

    /// Absorb more of the message without wiping relocated buffers.
    pub fn fast_update(&mut self, msg: &[u8]) {
        self.m.reserve(msg.len());
        self.m.extend_from_slice(msg);
        self.absorb_pending();
    }

    /// Absorb whole blocks straight from the caller's buffer, bypassing the
    /// internal message buffer.
    ///
    /// Safe to use before the buffered functions, but not after them, since
    /// bytes they have buffered would be reordered behind `msg`.
    ///
    /// # Panics
    ///
    /// If `msg.len()` is not a multiple of
    /// [`zerocopy_chunksize`](Self::zerocopy_chunksize).
    pub fn zerocopy_update(&mut self, msg: &[u8]) {
        assert_eq!(
            msg.len() % self.zerocopy_chunksize(),
            0,
            "zero-copy input must be a whole number of blocks",
        );
        absorption_phase(&mut self.s, self.w, self.wmask, self.nr, self.r / 8, msg);
    }

    /// Absorb the last part of the message, wiping buffered data afterwards,
    /// and squeeze the first digest into `hashsum`.
    ///
    /// `bits` is the number of bits in the final byte of `msg` that are part
    /// of the message (0 for a whole-byte message), and `suffix` is the
    /// domain-separation bit string (of ASCII `'0'`/`'1'`) appended before
    /// padding. With `hashsum` absent the sponge is advanced so that
    /// [`squeeze`](Self::squeeze) continues the same output stream.
    pub fn digest(&mut self, msg: &[u8], bits: usize, suffix: &str, hashsum: Option<&mut [u8]>) {
        self.digest_inner(msg, bits, suffix, hashsum, true);
    }

    /// Like [`digest`](Self::digest), but without wiping buffered data.
    pub fn fast_digest(
        &mut self,
        msg: &[u8],
        bits: usize,
        suffix: &str,
        hashsum: Option<&mut [u8]>,
    ) {
        self.digest_inner(msg, bits, suffix, hashsum, false);
    }

    /// Finalise using the caller's buffer for suffix and padding, bypassing
    /// the internal message buffer. `msg` is extended in place with the
    /// suffix and the pad; the same zero-copy ordering caveat as for
    /// [`zerocopy_update`](Self::zerocopy_update) applies.
    pub fn zerocopy_digest(
        &mut self,
        msg: &mut Vec<u8>,
        bits: usize,
        suffix: &str,
        hashsum: Option<&mut [u8]>,
    ) {
        debug_assert!(bits < 8);
        let mut bits = if msg.is_empty() { 0 } else { bits };
        if bits != 0 {
            let last = msg.len() - 1;
            msg[last] &= (1 << bits) - 1;
        }
        merge_suffix(msg, &mut bits, suffix);
        pad10star1(self.r, msg, bits);
        absorption_phase(&mut self.s, self.w, self.wmask, self.nr, self.r / 8, msg);
        self.finish_squeeze(hashsum);
    }

    /// Run `times` extra permutations without producing output.
    pub fn simple_squeeze(&mut self, times: usize) {
        for _ in 0..times {
            keccak_p(&mut self.s, self.w, self.wmask, self.nr);
        }
    }

    /// Advance the sponge as if `times` digests had been squeezed out and
    /// discarded.
    pub fn fast_squeeze(&mut self, times: usize) {
        let per_digest = (self.n - 1) / self.r + 1;
        self.simple_squeeze(times * per_digest);
    }

    /// Squeeze out another digest: ⌈n/8⌉ bytes into `hashsum`, which must be
    /// at least that large.
    pub fn squeeze(&mut self, hashsum: &mut [u8]) {
        keccak_p(&mut self.s, self.w, self.wmask, self.nr);
        self.squeezing_phase(hashsum);
    }

    fn digest_inner(
        &mut self,
        msg: &[u8],
        bits: usize,
        suffix: &str,
        hashsum: Option<&mut [u8]>,
        secure: bool,
    ) {
        debug_assert!(bits < 8);
        let bits = if msg.is_empty() { 0 } else { bits };
        let rr = self.r / 8;
        let ext = msg.len() + (bits + suffix.len() + 7) / 8 + rr;
        if secure {
            self.reserve_secure(ext);
        } else {
            self.m.reserve(ext);
        }

        let whole = msg.len() - usize::from(bits != 0);
        self.m.extend_from_slice(&msg[..whole]);
        let mut bits = bits;
        if bits != 0 {
            self.m.push(msg[whole] & ((1 << bits) - 1));
        }
        merge_suffix(&mut self.m, &mut bits, suffix);
        pad10star1(self.r, &mut self.m, bits);

        absorption_phase(&mut self.s, self.w, self.wmask, self.nr, rr, &self.m);
        if secure {
            self.m.zeroize();
        } else {
            self.m.clear();
        }

        self.finish_squeeze(hashsum);
    }

    fn finish_squeeze(&mut self, hashsum: Option<&mut [u8]>) {
        match hashsum {
            Some(out) => self.squeezing_phase(out),
            // advance through the permutations the squeezing would have done,
            // so a following squeeze() call picks up in phase
            None => self.simple_squeeze((self.n - 1) / self.r),
        }
    }

    fn squeezing_phase(&mut self, hashsum: &mut [u8]) {
        let rr = self.r / 8;
        let ww = self.w / 8;
        let nn = (self.n + 7) / 8;
        let hashsum = &mut hashsum[..nn];

        let mut olen = self.n;
        let mut j = 0;
        loop {
            let mut lane = 0;
            let mut within = 0;
            while within < rr && j < nn {
                let mut v = self.s[LANE_TRANSPOSE[lane]];
                let mut k = 0;
                while k < ww && within < rr && j < nn {
                    hashsum[j] = v as u8;
                    v >>= 8;
                    j += 1;
                    within += 1;
                    k += 1;
                }
                lane += 1;
            }
            if olen <= self.r {
                break;
            }
            olen -= self.r;
            keccak_p(&mut self.s, self.w, self.wmask, self.nr);
        }

        if self.n % 8 != 0 {
            hashsum[nn - 1] &= (1 << (self.n % 8)) - 1;
        }
    }

    /// Make room for `additional` more pending bytes. Growth never reuses
    /// the old allocation: the data moves to a fresh one and the old bytes
    /// are zeroed before the allocation is returned.
    fn reserve_secure(&mut self, additional: usize) {
        if self.m.len() + additional > self.m.capacity() {
            let mut grown = Vec::with_capacity(self.m.len() + additional);
            grown.extend_from_slice(&self.m);
            let mut old = std::mem::replace(&mut self.m, grown);
            old.zeroize();
        }
    }

    /// Absorb every whole block waiting in the message buffer and move the
    /// remainder to the front.
    fn absorb_pending(&mut self) {
        let rr = self.r / 8;
        let whole = self.m.len() - self.m.len() % rr;
        if whole == 0 {
            return;
        }
        absorption_phase(&mut self.s, self.w, self.wmask, self.nr, rr, &self.m[..whole]);
        self.m.copy_within(whole.., 0);
        self.m.truncate(self.m.len() - whole);
    }
}

/// XOR whole blocks into the state, one permutation per block. `msg.len()`
/// must be a multiple of `rr`.
fn absorption_phase(s: &mut [u64; 25], w: usize, wmask: u64, nr: usize, rr: usize, msg: &[u8]) {
    let ww = w / 8;
    if ww == 8 {
        for block in msg.chunks_exact(rr) {
            for (i, &t) in LANE_TRANSPOSE.iter().enumerate() {
                s[i] ^= to_lane64(block, t * 8);
            }
            keccak_p(s, w, wmask, nr);
        }
    } else {
        for block in msg.chunks_exact(rr) {
            for (i, &t) in LANE_TRANSPOSE.iter().enumerate() {
                s[i] ^= to_lane(block, ww, t * ww);
            }
            keccak_p(s, w, wmask, nr);
        }
    }
}

/// Read one 64-bit little-endian lane at `off`; bytes past the end of the
/// block read as zero.
#[inline(always)]
fn to_lane64(block: &[u8], off: usize) -> u64 {
    if off + 8 <= block.len() {
        u64::from_le_bytes(block[off..off + 8].try_into().unwrap())
    } else {
        to_lane(block, 8, off)
    }
}

/// Read one `ww`-byte little-endian lane at `off`; bytes past the end of
/// the block read as zero.
#[inline(always)]
fn to_lane(block: &[u8], ww: usize, off: usize) -> u64 {
    let mut lane = 0;
    if off < block.len() {
        for (i, &byte) in block[off..].iter().take(ww).enumerate() {
            lane |= u64::from(byte) << (8 * i);
        }
    }
    lane
}

/// Append an ASCII `'0'`/`'1'` bit string after the trailing `bits` bits of
/// the buffer, updating `bits` to the new trailing-bit count. The buffer's
/// final byte holds the trailing bits whenever `bits` is non-zero on entry
/// or exit.
pub(crate) fn merge_suffix(m: &mut Vec<u8>, bits: &mut usize, suffix: &str) {
    if suffix.is_empty() {
        return;
    }
    if *bits == 0 {
        m.push(0);
    }
    for ch in suffix.bytes() {
        *m.last_mut().unwrap() |= (ch & 1) << *bits;
        *bits += 1;
        if *bits == 8 {
            *bits = 0;
            m.push(0);
        }
    }
    if *bits == 0 {
        m.pop();
    }
}

/// Right-pad the buffer with a 10*1 pad so its bit length becomes a
/// multiple of `r`. The buffer's final byte holds `bits` trailing message
/// bits when `bits` is non-zero.
pub(crate) fn pad10star1(r: usize, m: &mut Vec<u8>, bits: usize) {
    let nrf = m.len() - usize::from(bits != 0);
    let ll = ((nrf << 3) | bits) % r;
    let first = if bits != 0 { m[nrf] | (1 << bits) } else { 1 };

    m.truncate(nrf);
    if r - 8 <= ll && ll <= r - 2 {
        // both pad bits fit in the final byte of the block
        m.push(first ^ 0x80);
    } else {
        m.push(first);
        let total = m.len() << 3;
        let last = (total - total % r + (r - 8)) >> 3;
        m.resize(last, 0);
        m.push(0x80);
    }
}
