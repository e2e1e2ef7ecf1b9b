//! Hashing-algorithm parameters and their validation.
//!
//! A [`Spec`] is the concrete `(bitrate, capacity, output)` triple a sponge
//! state is built from. A [`GeneralisedSpec`] additionally carries the state
//! size and word size and lets any field be set to [`AUTOMATIC`]; it is
//! resolved to a concrete [`Spec`] with [`GeneralisedSpec::degeneralise`].

use thiserror::Error;

/// Message suffix for SHA-3 hashing.
pub const SHA3_SUFFIX: &str = "01";

/// Message suffix for RawSHAKE hashing.
pub const RAWSHAKE_SUFFIX: &str = "11";

/// Message suffix for SHAKE hashing.
pub const SHAKE_SUFFIX: &str = "1111";

/// Message suffix for cSHAKE hashing, applicable when the function-name or
/// customisation string is non-empty.
pub const CSHAKE_SUFFIX: &str = "00";

/// Message suffix for the original, pre-SHA-3 Keccak hashing.
pub const KECCAK_SUFFIX: &str = "";

/// Value for a [`GeneralisedSpec`] field that selects the value
/// automatically.
pub const AUTOMATIC: i64 = -65536;

/// The message suffix for a cSHAKE hashing given the lengths (in whatever
/// unit, only zero vs non-zero matters) of the function-name and
/// customisation strings. cSHAKE with both strings empty degenerates to
/// plain SHAKE, suffix included.
pub const fn cshake_suffix(n_len: usize, s_len: usize) -> &'static str {
    if n_len > 0 || s_len > 0 {
        CSHAKE_SUFFIX
    } else {
        SHAKE_SUFFIX
    }
}

/// A reason a [`Spec`] is unusable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum SpecError {
    #[error("the bitrate is non-positive")]
    BitrateNonPositive,
    #[error("the bitrate is not a multiple of 8")]
    BitrateMod8,
    #[error("the capacity is non-positive")]
    CapacityNonPositive,
    #[error("the capacity is not a multiple of 8")]
    CapacityMod8,
    #[error("the output size is non-positive")]
    OutputNonPositive,
    #[error("the state size exceeds 1600 bits")]
    StateTooLarge,
    #[error("the state size is not a multiple of 25")]
    StateMod25,
    #[error("the word size is not a multiple of 8")]
    WordMod8,
    #[error("the word size is not a power of two")]
    WordNonPowerOfTwo,
}

/// A reason a [`GeneralisedSpec`] cannot be resolved.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum GeneralisedSpecError {
    #[error("the state size is non-positive")]
    StateNonPositive,
    #[error("the state size exceeds 1600 bits")]
    StateTooLarge,
    #[error("the state size is not a multiple of 25")]
    StateMod25,
    #[error("the word size is non-positive")]
    WordNonPositive,
    #[error("the word size exceeds 64 bits")]
    WordTooLarge,
    #[error("the state size and word size contradict each other")]
    StateWordIncoherent,
    #[error("the capacity is non-positive")]
    CapacityNonPositive,
    #[error("the capacity is not a multiple of 8")]
    CapacityMod8,
    #[error("the bitrate is non-positive")]
    BitrateNonPositive,
    #[error("the bitrate is not a multiple of 8")]
    BitrateMod8,
    #[error("the output size is non-positive")]
    OutputNonPositive,
}

/// Concrete parameters for a sponge state. All values are in bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Spec {
    /// The bitrate: how many bits of the state each message block touches.
    pub bitrate: i64,
    /// The capacity: the part of the state input and output never touch.
    pub capacity: i64,
    /// The output size.
    pub output: i64,
}

impl Spec {
    /// Parameters for SHA3-`x` (for example `Spec::sha3(256)`).
    pub const fn sha3(x: i64) -> Self {
        Spec { bitrate: 1600 - 2 * x, capacity: 2 * x, output: x }
    }

    /// Parameters for RawSHAKE-`x` with a `d`-bit output.
    pub const fn rawshake(x: i64, d: i64) -> Self {
        Spec { bitrate: 1600 - 2 * x, capacity: 2 * x, output: d }
    }

    /// Parameters for SHAKE-`x` with a `d`-bit output.
    pub const fn shake(x: i64, d: i64) -> Self {
        Self::rawshake(x, d)
    }

    /// Parameters for cSHAKE-`x` with a `d`-bit output.
    pub const fn cshake(x: i64, d: i64) -> Self {
        Self::rawshake(x, d)
    }

    /// Check that the parameters describe a supported sponge.
    pub fn check(&self) -> Result<(), SpecError> {
        let state_size = self.capacity + self.bitrate;
        let word_size = state_size / 25;

        if self.bitrate <= 0 {
            return Err(SpecError::BitrateNonPositive);
        }
        if self.bitrate % 8 != 0 {
            return Err(SpecError::BitrateMod8);
        }
        if self.capacity <= 0 {
            return Err(SpecError::CapacityNonPositive);
        }
        if self.capacity % 8 != 0 {
            return Err(SpecError::CapacityMod8);
        }
        if self.output <= 0 {
            return Err(SpecError::OutputNonPositive);
        }
        if state_size > 1600 {
            return Err(SpecError::StateTooLarge);
        }
        if state_size % 25 != 0 {
            return Err(SpecError::StateMod25);
        }
        if word_size % 8 != 0 {
            return Err(SpecError::WordMod8);
        }
        if word_size & (word_size - 1) != 0 {
            return Err(SpecError::WordNonPowerOfTwo);
        }
        Ok(())
    }
}

/// Partially specified sponge parameters. Any field set to [`AUTOMATIC`] is
/// derived from the others by [`GeneralisedSpec::degeneralise`]. All values
/// are in bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GeneralisedSpec {
    pub bitrate: i64,
    pub capacity: i64,
    pub output: i64,
    pub state_size: i64,
    pub word_size: i64,
}

impl Default for GeneralisedSpec {
    fn default() -> Self {
        GeneralisedSpec {
            bitrate: AUTOMATIC,
            capacity: AUTOMATIC,
            output: AUTOMATIC,
            state_size: AUTOMATIC,
            word_size: AUTOMATIC,
        }
    }
}

impl GeneralisedSpec {
    /// Resolve every [`AUTOMATIC`] field and return the concrete
    /// specification. The resolved values are also written back into `self`.
    ///
    /// A successful resolution is not necessarily a valid specification;
    /// callers interested in the full set of constraints should still run
    /// [`Spec::check`] on the result.
    pub fn degeneralise(&mut self) -> Result<Spec, GeneralisedSpecError> {
        let have_state_size = self.state_size != AUTOMATIC;
        let have_word_size = self.word_size != AUTOMATIC;
        let have_capacity = self.capacity != AUTOMATIC;
        let have_bitrate = self.bitrate != AUTOMATIC;
        let have_output = self.output != AUTOMATIC;

        let mut state_size = self.state_size;
        let mut capacity = self.capacity;
        let mut bitrate = self.bitrate;
        let mut output = self.output;

        if have_state_size {
            if state_size <= 0 {
                return Err(GeneralisedSpecError::StateNonPositive);
            }
            if state_size > 1600 {
                return Err(GeneralisedSpecError::StateTooLarge);
            }
            if state_size % 25 != 0 {
                return Err(GeneralisedSpecError::StateMod25);
            }
        }

        if have_word_size {
            let word_size = self.word_size;
            if word_size <= 0 {
                return Err(GeneralisedSpecError::WordNonPositive);
            }
            if word_size > 64 {
                return Err(GeneralisedSpecError::WordTooLarge);
            }
            if have_state_size && state_size != word_size * 25 {
                return Err(GeneralisedSpecError::StateWordIncoherent);
            }
            if !have_state_size {
                state_size = word_size * 25;
            }
        }

        if have_capacity {
            if capacity <= 0 {
                return Err(GeneralisedSpecError::CapacityNonPositive);
            }
            if capacity % 8 != 0 {
                return Err(GeneralisedSpecError::CapacityMod8);
            }
        }

        if have_bitrate {
            if bitrate <= 0 {
                return Err(GeneralisedSpecError::BitrateNonPositive);
            }
            if bitrate % 8 != 0 {
                return Err(GeneralisedSpecError::BitrateMod8);
            }
        }

        if have_output && output <= 0 {
            return Err(GeneralisedSpecError::OutputNonPositive);
        }

        let have_resolved_state = have_state_size || have_word_size;
        if !have_bitrate && !have_capacity && !have_output {
            if !have_resolved_state {
                state_size = 1600;
            }
            output = ((state_size << 5) / 100 + 7) & !0x07;
            bitrate = output << 1;
            capacity = state_size - bitrate;
            output = output.max(8);
        } else if !have_bitrate && !have_capacity {
            bitrate = 1024;
            capacity = 1600 - 1024;
            if !have_resolved_state {
                state_size = bitrate + capacity;
            }
        } else if !have_bitrate {
            if !have_resolved_state {
                state_size = 1600;
            }
            bitrate = state_size - capacity;
            if !have_output {
                output = if capacity == 8 { 8 } else { capacity << 1 };
            }
        } else if !have_capacity {
            if !have_resolved_state {
                state_size = 1600;
            }
            capacity = state_size - bitrate;
            if !have_output {
                output = if capacity == 8 { 8 } else { capacity << 1 };
            }
        } else {
            if !have_resolved_state {
                state_size = bitrate + capacity;
            }
            if !have_output {
                output = if capacity == 8 { 8 } else { capacity << 1 };
            }
        }

        self.capacity = capacity;
        self.bitrate = bitrate;
        self.output = output;
        self.state_size = state_size;
        self.word_size = state_size / 25;

        Ok(Spec { bitrate, capacity, output })
    }
}
