//! Opaque serialisation of sponge states.
//!
//! The format is little-endian and versionless: the only contract is that
//! [`KeccakState::unmarshal`] restores what [`KeccakState::marshal`] wrote on
//! the same host with the same library version.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::sponge::KeccakState;

/// Fixed-size prefix of a marshalled state: eight parameter words, the 25
/// lanes, and the two message-buffer lengths.
pub(crate) const STATE_HEADER_LEN: usize = 8 * 8 + 25 * 8 + 2 * 8;

/// A marshalled state could not be restored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum UnmarshalError {
    #[error("the buffer ends before the marshalled state does")]
    Truncated,
    #[error("the buffer does not hold a marshalled state")]
    Invalid,
}

impl KeccakState {
    /// The number of bytes [`marshal`](Self::marshal) will produce for this
    /// state.
    pub fn marshal_size(&self) -> usize {
        STATE_HEADER_LEN + self.m.len()
    }

    /// Serialise the state into a byte buffer.
    pub fn marshal(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.marshal_size()];
        let params = [
            self.r as u64,
            self.c as u64,
            self.n as u64,
            self.b as u64,
            self.w as u64,
            self.wmask,
            self.l as u64,
            self.nr as u64,
        ];
        LittleEndian::write_u64_into(&params, &mut data[..64]);
        LittleEndian::write_u64_into(&self.s, &mut data[64..264]);
        LittleEndian::write_u64(&mut data[264..272], self.m.len() as u64);
        LittleEndian::write_u64(&mut data[272..280], self.m.capacity() as u64);
        data[STATE_HEADER_LEN..].copy_from_slice(&self.m);
        data
    }

    /// Restore a state from the beginning of `data`, returning it together
    /// with the number of bytes consumed.
    pub fn unmarshal(data: &[u8]) -> Result<(Self, usize), UnmarshalError> {
        if data.len() < STATE_HEADER_LEN {
            return Err(UnmarshalError::Truncated);
        }
        let mut params = [0u64; 8];
        LittleEndian::read_u64_into(&data[..64], &mut params);
        let wmask = params[5];
        let [r, c, n, b, w, _, l, nr] = params.map(|v| v as usize);

        if b != r + c
            || b > 1600
            || b % 25 != 0
            || r % 8 != 0
            || c % 8 != 0
            || w != b / 25
            || !w.is_power_of_two()
            || l != w.trailing_zeros() as usize
            || nr != 12 + 2 * l
            || wmask != if w == 64 { u64::MAX } else { (1 << w) - 1 }
            || n == 0
        {
            return Err(UnmarshalError::Invalid);
        }

        let mut s = [0u64; 25];
        LittleEndian::read_u64_into(&data[64..264], &mut s);
        let mptr = LittleEndian::read_u64(&data[264..272]) as usize;
        let mlen = LittleEndian::read_u64(&data[272..280]) as usize;
        if mlen < mptr {
            return Err(UnmarshalError::Invalid);
        }
        if data.len() < STATE_HEADER_LEN + mptr {
            return Err(UnmarshalError::Truncated);
        }

        let mut m = Vec::with_capacity(mlen);
        m.extend_from_slice(&data[STATE_HEADER_LEN..STATE_HEADER_LEN + mptr]);

        Ok((
            KeccakState { s, r, c, n, b, w, wmask, l, nr, m },
            STATE_HEADER_LEN + mptr,
        ))
    }

    /// The total size of the marshalled state at the beginning of `data`,
    /// without restoring it.
    pub fn unmarshal_skip(data: &[u8]) -> Result<usize, UnmarshalError> {
        if data.len() < STATE_HEADER_LEN {
            return Err(UnmarshalError::Truncated);
        }
        let mptr = LittleEndian::read_u64(&data[264..272]) as usize;
        Ok(STATE_HEADER_LEN + mptr)
    }
}
