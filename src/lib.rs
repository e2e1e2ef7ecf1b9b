//! A Keccak-family hashing library built around a generalised sponge engine.
//!
//! The core is a [`KeccakState`]: a sponge over the Keccak-p permutation,
//! parameterised by a [`Spec`] with an arbitrary bitrate/capacity split,
//! state sizes from 200 up to 1600 bits, and any output length (including
//! output lengths that are not a whole number of bytes). Every hashing mode
//! of the family is the same engine with a different domain suffix:
//!
//! | Mode               | Spec                    | Suffix              |
//! |--------------------|-------------------------|---------------------|
//! | Keccak (pre-SHA-3) | any                     | [`KECCAK_SUFFIX`]   |
//! | SHA-3              | [`Spec::sha3`]          | [`SHA3_SUFFIX`]     |
//! | RawSHAKE           | [`Spec::rawshake`]      | [`RAWSHAKE_SUFFIX`] |
//! | SHAKE              | [`Spec::shake`]         | [`SHAKE_SUFFIX`]    |
//! | cSHAKE             | [`Spec::cshake`]        | [`cshake_suffix`]   |
//!
//! States support incremental [`update`](KeccakState::update), messages and
//! keys with bit-level lengths, continued squeezing past the first digest,
//! cloning, wiping, and opaque serialisation with
//! [`marshal`](KeccakState::marshal)/[`unmarshal`](KeccakState::unmarshal).
//! [`HmacState`] wraps any of the modes in HMAC, and the `*sum_fd` helpers
//! hash whole files.
//!
//! ```
//! use keccak_sponge::{KeccakState, Spec, SHA3_SUFFIX};
//!
//! let mut state = KeccakState::new(&Spec::sha3(256))?;
//! state.update(b"hello ");
//! let mut hashsum = [0u8; 32];
//! state.digest(b"world", 0, SHA3_SUFFIX, Some(&mut hashsum));
//! # Ok::<(), keccak_sponge::SpecError>(())
//! ```

mod cshake;
mod files;
mod fuzzing;
mod hex;
mod hmac;
mod marshal;
mod permutation;
mod spec;
mod sponge;

pub use crate::files::{
    generalised_sum_fd, keccaksum_fd, rawshakesum_fd, sha3sum_fd, shakesum_fd, SumError,
};
pub use crate::hex::{behex_lower, behex_upper, unhex};
pub use crate::hmac::{HmacState, HMAC_INNER_PAD, HMAC_OUTER_PAD};
pub use crate::marshal::UnmarshalError;
pub use crate::spec::{
    cshake_suffix, GeneralisedSpec, GeneralisedSpecError, Spec, SpecError, AUTOMATIC,
    CSHAKE_SUFFIX, KECCAK_SUFFIX, RAWSHAKE_SUFFIX, SHA3_SUFFIX, SHAKE_SUFFIX,
};
pub use crate::sponge::KeccakState;
