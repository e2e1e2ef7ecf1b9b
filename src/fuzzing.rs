#![cfg(test)]

use proptest::collection::vec;
use proptest::prelude::*;

use crate::hex::{behex_lower, behex_upper, unhex};
use crate::hmac::HmacState;
use crate::spec::{Spec, SHA3_SUFFIX, SHAKE_SUFFIX};
use crate::sponge::KeccakState;

fn arb_data() -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), 0..400)
}

fn digest_streamed(spec: &Spec, suffix: &str, pieces: &[Vec<u8>]) -> Vec<u8> {
    let mut state = KeccakState::new(spec).unwrap();
    for piece in pieces {
        state.update(piece);
    }
    let mut hashsum = vec![0u8; (state.output() + 7) / 8];
    state.digest(&[], 0, suffix, Some(&mut hashsum));
    hashsum
}

proptest! {
    #[test]
    fn update_splits_do_not_matter(pieces in vec(arb_data(), 0..8)) {
        let spec = Spec::sha3(256);
        let streamed = digest_streamed(&spec, SHA3_SUFFIX, &pieces);

        let whole: Vec<u8> = pieces.concat();
        let mut state = KeccakState::new(&spec).unwrap();
        let mut one_shot = [0u8; 32];
        state.digest(&whole, 0, SHA3_SUFFIX, Some(&mut one_shot));

        prop_assert_eq!(streamed, one_shot.to_vec());
    }

    #[test]
    fn secure_and_fast_variants_agree(msg in arb_data(), split in 0usize..400) {
        let split = split.min(msg.len());
        let spec = Spec::shake(128, 333);

        let mut secure = KeccakState::new(&spec).unwrap();
        secure.update(&msg[..split]);
        let mut a = vec![0u8; 42];
        secure.digest(&msg[split..], 0, SHAKE_SUFFIX, Some(&mut a));

        let mut fast = KeccakState::new(&spec).unwrap();
        fast.fast_update(&msg[..split]);
        let mut b = vec![0u8; 42];
        fast.fast_digest(&msg[split..], 0, SHAKE_SUFFIX, Some(&mut b));

        prop_assert_eq!(a, b);
    }

    #[test]
    fn marshal_round_trip_preserves_behaviour(
        before in arb_data(),
        after in arb_data(),
    ) {
        let spec = Spec::sha3(384);
        let mut state = KeccakState::new(&spec).unwrap();
        state.update(&before);

        let (mut restored, consumed) = KeccakState::unmarshal(&state.marshal()).unwrap();
        prop_assert_eq!(consumed, state.marshal_size());

        let mut a = [0u8; 48];
        let mut b = [0u8; 48];
        state.digest(&after, 0, SHA3_SUFFIX, Some(&mut a));
        restored.digest(&after, 0, SHA3_SUFFIX, Some(&mut b));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn clones_diverge_independently(prefix in arb_data(), tail in arb_data()) {
        let spec = Spec::sha3(256);
        let mut original = KeccakState::new(&spec).unwrap();
        original.update(&prefix);
        let mut copy = original.clone();

        let mut a = [0u8; 32];
        original.digest(&tail, 0, SHA3_SUFFIX, Some(&mut a));
        // the clone must be unaffected by the original's digest
        let mut b = [0u8; 32];
        copy.digest(&tail, 0, SHA3_SUFFIX, Some(&mut b));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn hex_round_trips(bytes in arb_data()) {
        prop_assert_eq!(unhex(&behex_lower(&bytes)), bytes.clone());
        prop_assert_eq!(unhex(&behex_upper(&bytes)), bytes);
    }

    #[test]
    fn hmac_splits_do_not_matter(
        key in vec(any::<u8>(), 1..64),
        msg in arb_data(),
        split in 0usize..400,
    ) {
        let split = split.min(msg.len());
        let spec = Spec::sha3(256);

        let mut streamed = HmacState::new(&spec, &key, key.len() * 8).unwrap();
        streamed.update(&msg[..split]);
        let mut a = [0u8; 32];
        streamed.digest(&msg[split..], 0, SHA3_SUFFIX, Some(&mut a));

        let mut one_shot = HmacState::new(&spec, &key, key.len() * 8).unwrap();
        let mut b = [0u8; 32];
        one_shot.digest(&msg, 0, SHA3_SUFFIX, Some(&mut b));

        prop_assert_eq!(a, b);
    }
}
