use git_pack::delta::apply::apply_delta;
use git_pack::delta::compute::{compute_delta, compute_delta_bytes};
use proptest::prelude::*;

proptest! {
    #[test]
    fn apply_undoes_compute_for_arbitrary_inputs(
        base in proptest::collection::vec(any::<u8>(), 0..512),
        target in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        // Raw codec: must round-trip for any pair of inputs, whether or
        // not the resulting delta would actually be worth using.
        let delta = compute_delta_bytes(&base, &target);
        let reconstructed = apply_delta(&base, &delta).unwrap();
        prop_assert_eq!(reconstructed, target);
    }

    #[test]
    fn apply_undoes_compute_for_similar_inputs(
        base in proptest::collection::vec(any::<u8>(), 32..256),
        insert_at in 0usize..32,
        insert_len in 0usize..32,
    ) {
        let insert_at = insert_at.min(base.len());
        let mut target = base.clone();
        let filler = vec![b'z'; insert_len];
        target.splice(insert_at..insert_at, filler);

        let delta = compute_delta_bytes(&base, &target);
        let reconstructed = apply_delta(&base, &delta).unwrap();
        prop_assert_eq!(reconstructed, target);
    }

    #[test]
    fn delta_against_identical_input_is_small(
        data in proptest::collection::vec(any::<u8>(), 64..1024),
    ) {
        let computed = compute_delta(&data, &data).expect("identical input is always worth deltifying");
        let reconstructed = apply_delta(&data, &computed.delta).unwrap();
        prop_assert_eq!(reconstructed, data.clone());
        // A target identical to its base should compress to a handful of
        // copy instructions, never ballooning past the raw size.
        prop_assert!(computed.delta.len() < data.len().max(32));
        prop_assert!(computed.savings > 0);
        prop_assert!(computed.ratio >= 1.0);
    }
}
