//! HMAC over any Keccak-family hash.
//!
//! The construction is the standard `H((K ⊕ opad) ‖ H((K ⊕ ipad) ‖ m))`,
//! with the key padded with zero bits up to the bitrate when shorter (longer
//! keys are used as-is, unhashed). Keys may have a bit length that is not a
//! whole number of bytes, in which case every absorbed message is shifted by
//! the key's trailing-bit count.

use std::mem;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::marshal::UnmarshalError;
use crate::spec::{Spec, SpecError};
use crate::sponge::KeccakState;

/// The byte XORed into the key for the outer hash.
pub const HMAC_OUTER_PAD: u8 = 0x5c;

/// The byte XORed into the key for the inner hash.
pub const HMAC_INNER_PAD: u8 = 0x36;

/// The two halves of the derived-key pair.
#[derive(Clone, Copy)]
enum Pad {
    Outer,
    Inner,
}

/// The state of an HMAC computation.
///
/// The usual round is [`update`](Self::update) zero or more times followed
/// by [`digest`](Self::digest); [`reset`](Self::reset) rearms the state for
/// another MAC under the same key. Dropping wipes all key material.
#[derive(Clone, Debug, Zeroize, ZeroizeOnDrop)]
pub struct HmacState {
    sponge: KeccakState,
    /// One allocation holding `key ⊕ opad` followed by `key ⊕ ipad`, each
    /// ⌈key_length/8⌉ bytes.
    key_pads: Vec<u8>,
    /// Effective key length in bits, at least the bitrate.
    key_length: usize,
    /// Whether the inner key prefix still has to be absorbed. Armed on
    /// creation and after every reset, disarmed by the first absorption.
    ipad_armed: bool,
    /// Scratch for the shifted message when the key length is not a whole
    /// number of bytes.
    buffer: Vec<u8>,
    /// The bits of the last absorbed byte that did not fit, when shifting.
    leftover: u8,
}

impl HmacState {
    /// Create an HMAC state with the given hashing parameters and key. The
    /// key length is given in bits; the key slice carries ⌈bits/8⌉ bytes.
    pub fn new(spec: &Spec, key: &[u8], key_length: usize) -> Result<Self, SpecError> {
        let mut state = HmacState {
            sponge: KeccakState::new(spec)?,
            key_pads: Vec::new(),
            key_length: 0,
            ipad_armed: false,
            buffer: Vec::new(),
            leftover: 0,
        };
        state.set_key(key, key_length);
        Ok(state)
    }

    /// The output size of the MAC, in bits.
    pub fn output(&self) -> usize {
        self.sponge.output()
    }

    /// Install a new key and arm the state for a fresh MAC computation.
    /// Does not reset the sponge; pair with [`reset`](Self::reset) when a
    /// computation is already under way.
    pub fn set_key(&mut self, key: &[u8], key_length: usize) {
        debug_assert!(key.len() * 8 >= key_length);
        let padded = self.sponge.bitrate().max(key_length);
        let size = (padded + 7) / 8;
        let key_bytes = (key_length + 7) / 8;

        let mut pads = vec![0u8; 2 * size];
        pads[..key_bytes].copy_from_slice(&key[..key_bytes]);
        if key_length % 8 != 0 {
            pads[key_bytes - 1] &= (1 << (key_length % 8)) - 1;
        }
        for i in 0..size {
            pads[size + i] = pads[i] ^ HMAC_INNER_PAD;
            pads[i] ^= HMAC_OUTER_PAD;
        }

        let mut old = mem::replace(&mut self.key_pads, pads);
        old.zeroize();
        self.key_length = padded;
        self.ipad_armed = true;
    }

    /// Rearm the state for another MAC under the current key.
    pub fn reset(&mut self) {
        self.sponge.reset();
        self.ipad_armed = true;
        self.leftover = 0;
    }

    /// Overwrite all sensitive data with zeros, without freeing anything.
    pub fn wipe(&mut self) {
        self.sponge.wipe();
        self.key_pads.as_mut_slice().zeroize();
        self.buffer.as_mut_slice().zeroize();
        self.leftover = 0;
    }

    /// Absorb more of the message, wiping intermediate buffers.
    pub fn update(&mut self, msg: &[u8]) {
        self.update_inner(msg, true);
    }

    /// Absorb more of the message without wiping intermediate buffers.
    pub fn fast_update(&mut self, msg: &[u8]) {
        self.update_inner(msg, false);
    }

    /// Absorb the last part of the message and produce the MAC, wiping
    /// intermediate buffers.
    ///
    /// Parameters are as for [`KeccakState::digest`]; `suffix` selects the
    /// underlying hash's domain. With `hashsum` absent the outer sponge is
    /// advanced so [`squeeze`](Self::squeeze) continues the stream.
    pub fn digest(&mut self, msg: &[u8], bits: usize, suffix: &str, hashsum: Option<&mut [u8]>) {
        self.digest_inner(msg, bits, suffix, hashsum, true);
    }

    /// Like [`digest`](Self::digest), but without wiping intermediate
    /// buffers.
    pub fn fast_digest(
        &mut self,
        msg: &[u8],
        bits: usize,
        suffix: &str,
        hashsum: Option<&mut [u8]>,
    ) {
        self.digest_inner(msg, bits, suffix, hashsum, false);
    }

    /// Squeeze more output out of a finalised MAC.
    pub fn squeeze(&mut self, hashsum: &mut [u8]) {
        self.sponge.squeeze(hashsum);
    }

    /// Compute the MAC of `msg` and compare it against `expected` in
    /// constant time. `expected` must be the full ⌈n/8⌉ bytes.
    #[must_use]
    pub fn verify(&mut self, msg: &[u8], bits: usize, suffix: &str, expected: &[u8]) -> bool {
        let mut hashsum = vec![0u8; (self.sponge.output() + 7) / 8];
        self.digest(msg, bits, suffix, Some(&mut hashsum));
        let good = hashsum.ct_eq(expected).into();
        hashsum.zeroize();
        good
    }

    /// The number of bytes [`marshal`](Self::marshal) will produce.
    pub fn marshal_size(&self) -> usize {
        self.sponge.marshal_size() + 8 + (self.key_length + 7) / 8 + 2
    }

    /// Serialise the state into a byte buffer. The scratch buffer and its
    /// pending shift are not part of the stored state beyond `leftover`.
    pub fn marshal(&self) -> Vec<u8> {
        let size = (self.key_length + 7) / 8;
        let mut data = self.sponge.marshal();
        data.reserve(8 + size + 2);
        data.extend_from_slice(&(self.key_length as u64).to_le_bytes());
        data.extend_from_slice(&self.key_pads[..size]);
        data.push(u8::from(self.ipad_armed));
        data.push(self.leftover);
        data
    }

    /// Restore a state from the beginning of `data`, returning it together
    /// with the number of bytes consumed.
    pub fn unmarshal(data: &[u8]) -> Result<(Self, usize), UnmarshalError> {
        let (sponge, parsed) = KeccakState::unmarshal(data)?;
        let rest = &data[parsed..];
        if rest.len() < 8 {
            return Err(UnmarshalError::Truncated);
        }
        let key_length = u64::from_le_bytes(rest[..8].try_into().unwrap()) as usize;
        let size = (key_length + 7) / 8;
        if rest.len() < 8 + size + 2 {
            return Err(UnmarshalError::Truncated);
        }

        let opad = &rest[8..8 + size];
        let mut key_pads = vec![0u8; 2 * size];
        key_pads[..size].copy_from_slice(opad);
        for i in 0..size {
            key_pads[size + i] = opad[i] ^ (HMAC_OUTER_PAD ^ HMAC_INNER_PAD);
        }

        Ok((
            HmacState {
                sponge,
                key_pads,
                key_length,
                ipad_armed: rest[8 + size] != 0,
                buffer: Vec::new(),
                leftover: rest[8 + size + 1],
            },
            parsed + 8 + size + 2,
        ))
    }

    fn update_inner(&mut self, msg: &[u8], secure: bool) {
        if self.ipad_armed {
            self.absorb_pad(Pad::Inner, secure);
            self.ipad_armed = false;
        }
        if msg.is_empty() {
            return;
        }
        if self.key_length % 8 == 0 {
            if secure {
                self.sponge.update(msg);
            } else {
                self.sponge.fast_update(msg);
            }
            return;
        }

        // shift the message left by the key's trailing-bit count, pulling in
        // the bits the previous block left behind
        let shift = self.key_length % 8;
        let unshift = 8 - shift;
        self.buffer.clear();
        self.buffer.resize(msg.len(), 0);
        self.buffer[0] = (self.leftover & ((1 << shift) - 1)) | (msg[0] << shift);
        for i in 1..msg.len() {
            self.buffer[i] = (msg[i - 1] >> unshift) | (msg[i] << shift);
        }
        self.leftover = msg[msg.len() - 1] >> unshift;

        if secure {
            self.sponge.update(&self.buffer);
            self.buffer.as_mut_slice().zeroize();
        } else {
            self.sponge.fast_update(&self.buffer);
        }
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
        let mut inner = vec![0u8; (self.sponge.output() + 7) / 8];
        self.finalise_into(msg, bits, suffix, Some(&mut inner), secure);

        let inner_bits = self.sponge.output() % 8;
        self.sponge.reset();
        self.absorb_pad(Pad::Outer, secure);
        self.finalise_into(&inner, inner_bits, suffix, hashsum, secure);

        if secure {
            inner.zeroize();
        }
    }

    /// Absorb the message tail and finalise the current (inner or outer)
    /// hash. The armed inner prefix is absorbed first if still pending.
    fn finalise_into(
        &mut self,
        msg: &[u8],
        bits: usize,
        suffix: &str,
        hashsum: Option<&mut [u8]>,
        secure: bool,
    ) {
        let bits = if msg.is_empty() { 0 } else { bits };
        if self.ipad_armed {
            self.absorb_pad(Pad::Inner, secure);
            self.ipad_armed = false;
        }
        if self.key_length % 8 == 0 {
            if secure {
                self.sponge.digest(msg, bits, suffix, hashsum);
            } else {
                self.sponge.fast_digest(msg, bits, suffix, hashsum);
            }
            return;
        }

        // feed the whole bytes through the shifting path, then flush the
        // leftover bits together with the message's trailing bits
        let whole = msg.len() - usize::from(bits != 0);
        self.update_inner(&msg[..whole], secure);

        let shift = self.key_length % 8;
        let mut tail = [self.leftover & ((1 << shift) - 1), 0];
        let mut tail_bits = shift;
        if bits != 0 {
            let partial = msg[whole] & ((1 << bits) - 1);
            tail[0] |= partial << shift;
            tail[1] = partial >> (8 - shift);
            tail_bits += bits;
        }
        let tail_len = tail_bits / 8 + usize::from(tail_bits % 8 != 0);
        if secure {
            self.sponge.digest(&tail[..tail_len], tail_bits % 8, suffix, hashsum);
        } else {
            self.sponge.fast_digest(&tail[..tail_len], tail_bits % 8, suffix, hashsum);
        }
    }

    /// Absorb ⌊key_length/8⌋ bytes of the selected key pad, keeping any
    /// trailing partial byte as the pending shift bits.
    fn absorb_pad(&mut self, pad: Pad, secure: bool) {
        let size = self.key_pads.len() / 2;
        let start = match pad {
            Pad::Outer => 0,
            Pad::Inner => size,
        };
        let view = &self.key_pads[start..start + size];
        let whole = self.key_length / 8;
        if secure {
            self.sponge.update(&view[..whole]);
        } else {
            self.sponge.fast_update(&view[..whole]);
        }
        if self.key_length % 8 != 0 {
            self.leftover = view[whole];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::behex_lower;
    use crate::spec::SHA3_SUFFIX;

    fn hmac_hex(spec: &Spec, key: &[u8], msg: &[u8]) -> String {
        let mut state = HmacState::new(spec, key, key.len() * 8).unwrap();
        let mut hashsum = vec![0u8; (state.output() + 7) / 8];
        state.digest(msg, 0, SHA3_SUFFIX, Some(&mut hashsum));
        behex_lower(&hashsum)
    }

    /// The construction spelled out with two plain sponges.
    fn hmac_by_hand(spec: &Spec, key: &[u8], msg: &[u8]) -> String {
        let rate_bytes = (spec.bitrate as usize) / 8;
        let size = rate_bytes.max(key.len());
        let mut opad = vec![0u8; size];
        let mut ipad = vec![0u8; size];
        opad[..key.len()].copy_from_slice(key);
        ipad[..key.len()].copy_from_slice(key);
        for i in 0..size {
            opad[i] ^= HMAC_OUTER_PAD;
            ipad[i] ^= HMAC_INNER_PAD;
        }

        let mut inner = KeccakState::new(spec).unwrap();
        inner.update(&ipad);
        let mut inner_sum = vec![0u8; (spec.output as usize + 7) / 8];
        inner.digest(msg, 0, SHA3_SUFFIX, Some(&mut inner_sum));

        let mut outer = KeccakState::new(spec).unwrap();
        outer.update(&opad);
        let mut hashsum = vec![0u8; (spec.output as usize + 7) / 8];
        outer.digest(&inner_sum, 0, SHA3_SUFFIX, Some(&mut hashsum));
        behex_lower(&hashsum)
    }

    #[test]
    fn hmac_sha3_256_sample() {
        let key: Vec<u8> = (0u8..32).collect();
        assert_eq!(
            hmac_hex(&Spec::sha3(256), &key, b"Sample message for keylen<blocklen"),
            "4fe8e202c4f058e8dddc23d8c34e467343e23555e24fc2f025d598f558f67205"
        );
    }

    #[test]
    fn matches_the_spelled_out_construction() {
        let spec = Spec::sha3(256);
        let short_key: Vec<u8> = (0u8..32).collect();
        let rate_key: Vec<u8> = (0u8..136).collect();
        let long_key: Vec<u8> = (0u8..=199).collect();
        let msg: &[u8] = b"chevalier slat's spindel representations";

        for key in [&short_key, &rate_key, &long_key] {
            assert_eq!(hmac_hex(&spec, key, msg), hmac_by_hand(&spec, key, msg));
        }
        assert_eq!(
            hmac_hex(&Spec::sha3(512), &short_key, msg),
            hmac_by_hand(&Spec::sha3(512), &short_key, msg)
        );
    }

    #[test]
    fn streaming_matches_one_shot() {
        let spec = Spec::sha3(256);
        let key = [0x0b; 20];
        let msg = b"archery lexicographical equine veered";
        let expected = hmac_hex(&spec, &key, msg);

        for split in [0, 1, msg.len() / 2, msg.len()] {
            let mut state = HmacState::new(&spec, &key, key.len() * 8).unwrap();
            state.update(&msg[..split]);
            let mut hashsum = [0u8; 32];
            state.digest(&msg[split..], 0, SHA3_SUFFIX, Some(&mut hashsum));
            assert_eq!(behex_lower(&hashsum), expected, "split at {split}");
        }
    }

    #[test]
    fn reset_reuses_the_key() {
        let spec = Spec::sha3(256);
        let key = [0xaa; 16];
        let mut state = HmacState::new(&spec, &key, 128).unwrap();

        let mut first = [0u8; 32];
        state.digest(b"one", 0, SHA3_SUFFIX, Some(&mut first));
        state.reset();
        let mut second = [0u8; 32];
        state.digest(b"one", 0, SHA3_SUFFIX, Some(&mut second));
        assert_eq!(first, second);

        state.reset();
        let mut third = [0u8; 32];
        state.digest(b"two", 0, SHA3_SUFFIX, Some(&mut third));
        assert_ne!(first, third);
    }

    #[test]
    fn set_key_changes_the_mac() {
        let spec = Spec::sha3(256);
        let mut state = HmacState::new(&spec, &[0x11; 16], 128).unwrap();
        let mut a = [0u8; 32];
        state.digest(b"msg", 0, SHA3_SUFFIX, Some(&mut a));

        state.reset();
        state.set_key(&[0x22; 16], 128);
        let mut b = [0u8; 32];
        state.digest(b"msg", 0, SHA3_SUFFIX, Some(&mut b));
        assert_ne!(a, b);
        assert_eq!(behex_lower(&b), hmac_hex(&spec, &[0x22; 16], b"msg"));
    }

    #[test]
    fn short_bit_length_keys_are_padded_to_the_rate() {
        let spec = Spec::sha3(256);
        // 13-bit key, padded with zero bits up to the 1088-bit rate
        let mut state = HmacState::new(&spec, &[0xab, 0x15], 13).unwrap();
        let mut a = [0u8; 32];
        state.digest(b"payload bytes", 0, SHA3_SUFFIX, Some(&mut a));

        // the high bits of the partial key byte are ignored
        let mut state = HmacState::new(&spec, &[0xab, 0xf5], 13).unwrap();
        let mut b = [0u8; 32];
        state.digest(b"payload bytes", 0, SHA3_SUFFIX, Some(&mut b));
        assert_eq!(a, b);

        // but the covered bits are not
        let mut state = HmacState::new(&spec, &[0xab, 0x0a], 13).unwrap();
        let mut c = [0u8; 32];
        state.digest(b"payload bytes", 0, SHA3_SUFFIX, Some(&mut c));
        assert_ne!(a, c);
    }

    #[test]
    fn oversized_bit_length_keys_shift_the_message() {
        let spec = Spec::sha3(256);
        // 1093-bit key: longer than the 1088-bit rate and off a byte
        // boundary, so every absorbed message byte gets shifted
        let key: Vec<u8> = (0..137).map(|i| i as u8).collect();

        let mut one_shot = HmacState::new(&spec, &key, 1093).unwrap();
        let mut a = [0u8; 32];
        one_shot.digest(b"payload bytes", 0, SHA3_SUFFIX, Some(&mut a));

        for split in [0, 1, 7, 13] {
            let mut streamed = HmacState::new(&spec, &key, 1093).unwrap();
            streamed.update(&b"payload bytes"[..split]);
            let mut b = [0u8; 32];
            streamed.digest(&b"payload bytes"[split..], 0, SHA3_SUFFIX, Some(&mut b));
            assert_eq!(a, b, "split at {split}");
        }

        // reset and repeat under the same key
        one_shot.reset();
        let mut again = [0u8; 32];
        one_shot.digest(b"payload bytes", 0, SHA3_SUFFIX, Some(&mut again));
        assert_eq!(a, again);

        // a trailing-bit message through the shifted path
        let mut with_bits = HmacState::new(&spec, &key, 1093).unwrap();
        let mut d = [0u8; 32];
        with_bits.digest(&[0x53, 0x58, 0x7b, 0x19], 6, SHA3_SUFFIX, Some(&mut d));
        let mut with_bits = HmacState::new(&spec, &key, 1093).unwrap();
        let mut e = [0u8; 32];
        with_bits.update(&[0x53, 0x58]);
        with_bits.digest(&[0x7b, 0x19], 6, SHA3_SUFFIX, Some(&mut e));
        assert_eq!(d, e);
    }

    #[test]
    fn verify_accepts_only_the_right_mac() {
        let spec = Spec::sha3(256);
        let key = [0x07; 32];
        let mut state = HmacState::new(&spec, &key, 256).unwrap();
        let mut mac = [0u8; 32];
        state.digest(b"transactional", 0, SHA3_SUFFIX, Some(&mut mac));

        state.reset();
        assert!(state.verify(b"transactional", 0, SHA3_SUFFIX, &mac));
        state.reset();
        let mut wrong = mac;
        wrong[31] ^= 1;
        assert!(!state.verify(b"transactional", 0, SHA3_SUFFIX, &wrong));
    }

    #[test]
    fn marshal_round_trips_mid_stream() {
        let spec = Spec::sha3(256);
        let key = [0x42; 64];
        let mut state = HmacState::new(&spec, &key, 512).unwrap();
        state.update(b"the first instalment of the message");

        let data = state.marshal();
        assert_eq!(data.len(), state.marshal_size());
        let (mut restored, consumed) = HmacState::unmarshal(&data).unwrap();
        assert_eq!(consumed, data.len());

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        state.digest(b" and the second", 0, SHA3_SUFFIX, Some(&mut a));
        restored.digest(b" and the second", 0, SHA3_SUFFIX, Some(&mut b));
        assert_eq!(a, b);
    }

    #[test]
    fn marshal_preserves_the_armed_flag() {
        let spec = Spec::sha3(256);
        let key = [0x42; 16];

        // armed: nothing absorbed yet
        let state = HmacState::new(&spec, &key, 128).unwrap();
        let (mut restored, _) = HmacState::unmarshal(&state.marshal()).unwrap();
        let mut a = [0u8; 32];
        restored.digest(b"m", 0, SHA3_SUFFIX, Some(&mut a));
        assert_eq!(behex_lower(&a), hmac_hex(&spec, &key, b"m"));

        // disarmed: prefix already absorbed, must not be absorbed twice
        let mut state = HmacState::new(&spec, &key, 128).unwrap();
        state.update(b"");
        let (mut restored, _) = HmacState::unmarshal(&state.marshal()).unwrap();
        let mut b = [0u8; 32];
        restored.digest(b"m", 0, SHA3_SUFFIX, Some(&mut b));
        assert_eq!(a, b);
    }

    #[test]
    fn wipe_clears_key_material() {
        let mut state = HmacState::new(&Spec::sha3(256), &[0x99; 32], 256).unwrap();
        state.update(b"half a message");
        state.wipe();
        assert!(state.key_pads.iter().all(|&byte| byte == 0));
        assert!(state.buffer.iter().all(|&byte| byte == 0));
        assert_eq!(state.leftover, 0);
    }

    #[test]
    fn clones_are_independent() {
        let spec = Spec::sha3(256);
        let mut original = HmacState::new(&spec, &[0x33; 32], 256).unwrap();
        original.update(b"prefix ");
        let mut copy = original.clone();

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        original.digest(b"left", 0, SHA3_SUFFIX, Some(&mut a));
        copy.digest(b"right", 0, SHA3_SUFFIX, Some(&mut b));
        assert_ne!(a, b);
    }
}
