//! The cSHAKE initialisation prelude.
//!
//! Before the message proper, cSHAKE absorbs
//! `bytepad(encode_string(N) || encode_string(S), r/8)` where `N` is the
//! function-name bit-string and `S` the customisation bit-string. Both may
//! end off a byte boundary, so every encoding step exists twice: a
//! byte-aligned fast version and a shifted version used once the running bit
//! offset becomes non-zero.

use crate::sponge::KeccakState;

impl KeccakState {
    /// Absorb the cSHAKE initialisation blocks for the function-name string
    /// `n` and customisation string `s`.
    ///
    /// For each string, `bits` is the number of bits of the final byte that
    /// are part of the string (0 for whole-byte strings) and `suffix` is an
    /// ASCII `'0'`/`'1'` bit string appended after it. A state absorbs this
    /// prelude at most once, before any message input; when every part is
    /// empty nothing is absorbed and the state is left a plain SHAKE.
    pub fn cshake_initialise(
        &mut self,
        n: &[u8],
        n_bits: usize,
        n_suffix: &str,
        s: &[u8],
        s_bits: usize,
        s_suffix: &str,
    ) {
        debug_assert!(n_bits < 8 && s_bits < 8);
        if n.is_empty() && s.is_empty() && n_suffix.is_empty() && s_suffix.is_empty() {
            return;
        }

        let rr = self.zerocopy_chunksize();
        let mut block = vec![0u8; rr];
        let n_len = n.len() - usize::from(n_bits != 0);
        let s_len = s.len() - usize::from(s_bits != 0);

        let mut off = self.encode_left(&mut block, rr);
        off = self.encode_left_at(&mut block, (n_len << 3) + n_bits + n_suffix.len(), off);
        let (mut off, mut bitoff) = self.feed_text(&mut block, n, n_len, n_bits, n_suffix, off);

        if bitoff == 0 {
            off = self.encode_left_at(&mut block, (s_len << 3) + s_bits + s_suffix.len(), off);
            (off, bitoff) = self.feed_text(&mut block, s, s_len, s_bits, s_suffix, off);
        } else {
            off = self.encode_left_shifted(
                &mut block,
                (s_len << 3) + s_bits + s_suffix.len(),
                off,
                bitoff,
            );
            (off, bitoff) =
                self.feed_text_shifted(&mut block, s, s_len, s_bits, s_suffix, off, bitoff);
        }

        if bitoff != 0 {
            off += 1;
        }
        if off != 0 {
            block[off..].fill(0);
            self.zerocopy_update(&block);
        }
    }

    fn encode_left(&mut self, block: &mut [u8], value: usize) -> usize {
        self.encode_left_at(block, value, 0)
    }

    /// Write `value` at byte offset `off` as a length byte followed by that
    /// many big-endian value bytes, flushing `block` whenever it fills.
    fn encode_left_at(&mut self, block: &mut [u8], value: usize, mut off: usize) -> usize {
        let n = encoded_width(value);
        block[off] = n as u8;
        off = self.bump(block, off);
        for j in (0..n).rev() {
            block[off] = (value >> (8 * j)) as u8;
            off = self.bump(block, off);
        }
        off
    }

    /// `encode_left_at` with every byte shifted left by the running bit
    /// offset, carrying overflow bits into the next byte.
    fn encode_left_shifted(
        &mut self,
        block: &mut [u8],
        value: usize,
        mut off: usize,
        bitoff: usize,
    ) -> usize {
        let n = encoded_width(value);
        let v = (n as u16) << bitoff;
        block[off] |= v as u8;
        off = self.bump(block, off);
        block[off] = (v >> 8) as u8;
        for j in (0..n).rev() {
            let v = (((value >> (8 * j)) as u16) & 0xff) << bitoff;
            block[off] |= v as u8;
            off = self.bump(block, off);
            block[off] = (v >> 8) as u8;
        }
        off
    }

    /// Feed a byte-aligned text, its trailing bits, and its bit-string
    /// suffix. Returns the new byte offset and the trailing bit offset.
    fn feed_text(
        &mut self,
        block: &mut [u8],
        text: &[u8],
        mut bytes: usize,
        bits: usize,
        suffix: &str,
        mut off: usize,
    ) -> (usize, usize) {
        let rr = block.len();
        let mut text = text;
        if off != 0 {
            let take = bytes.min(rr - off);
            block[off..off + take].copy_from_slice(&text[..take]);
            off += take;
            if off == rr {
                self.zerocopy_update(block);
                off = 0;
            }
            text = &text[take..];
            bytes -= take;
        }
        if bytes != 0 {
            let whole = bytes - bytes % rr;
            self.zerocopy_update(&text[..whole]);
            text = &text[whole..];
            bytes %= rr;
        }
        block[off..off + bytes].copy_from_slice(&text[..bytes]);
        off += bytes;

        let bitoff = bits;
        block[off] = if bitoff != 0 {
            text[bytes] & ((1 << bits) - 1)
        } else {
            0
        };
        self.feed_suffix(block, suffix, off, bitoff)
    }

    /// `feed_text` once the running bit offset is non-zero: every byte is
    /// split across two output bytes.
    fn feed_text_shifted(
        &mut self,
        block: &mut [u8],
        text: &[u8],
        bytes: usize,
        bits: usize,
        suffix: &str,
        mut off: usize,
        mut bitoff: usize,
    ) -> (usize, usize) {
        for &byte in &text[..bytes] {
            let v = u16::from(byte) << bitoff;
            block[off] |= v as u8;
            off = self.bump(block, off);
            block[off] = (v >> 8) as u8;
        }
        if bits != 0 {
            let v = u16::from(text[bytes] & ((1 << bits) - 1)) << bitoff;
            block[off] |= v as u8;
            bitoff += bits;
            if bitoff >= 8 {
                off = self.bump(block, off);
                bitoff &= 7;
                block[off] = (v >> 8) as u8;
            }
        }
        if bitoff == 0 {
            block[off] = 0;
        }
        self.feed_suffix(block, suffix, off, bitoff)
    }

    fn feed_suffix(
        &mut self,
        block: &mut [u8],
        suffix: &str,
        mut off: usize,
        mut bitoff: usize,
    ) -> (usize, usize) {
        for ch in suffix.bytes() {
            block[off] |= (ch & 1) << bitoff;
            bitoff += 1;
            if bitoff == 8 {
                off = self.bump(block, off);
                bitoff = 0;
                block[off] = 0;
            }
        }
        (off, bitoff)
    }

    /// Advance the byte offset, absorbing and restarting the block when it
    /// fills up.
    fn bump(&mut self, block: &mut [u8], off: usize) -> usize {
        if off + 1 == block.len() {
            self.zerocopy_update(block);
            0
        } else {
            off + 1
        }
    }
}

/// The number of bytes `encode_left` spends on the value itself, at least 1.
fn encoded_width(value: usize) -> usize {
    let mut n = 0;
    let mut x = value;
    while x != 0 {
        n += 1;
        x >>= 8;
    }
    n.max(1)
}
