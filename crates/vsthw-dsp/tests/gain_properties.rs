use proptest::prelude::*;
use vsthw_dsp::{apply_gain, db_to_linear};

proptest! {
    #[test]
    fn linear_gain_matches_formula(db in -60.0f32..=0.0) {
        let expected = 10.0f32.powf(db / 20.0);
        prop_assert_eq!(db_to_linear(db), expected);
    }

    #[test]
    fn linear_gain_is_monotonic(a in -60.0f32..=0.0, b in -60.0f32..=0.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(db_to_linear(lo) <= db_to_linear(hi));
    }

    #[test]
    fn block_is_scaled_without_changing_shape(
        db in -60.0f32..=0.0,
        samples in prop::collection::vec(-1.0f32..=1.0, 1..256),
        channels in 1usize..=2,
    ) {
        let original = vec![samples.clone(); channels];
        let mut block = original.clone();
        apply_gain(&mut block, channels, db);

        let linear = db_to_linear(db);
        prop_assert_eq!(block.len(), channels);
        for (scaled, source) in block.iter().zip(original.iter()) {
            prop_assert_eq!(scaled.len(), source.len());
            for (s, o) in scaled.iter().zip(source.iter()) {
                prop_assert_eq!(*s, *o * linear);
            }
        }
    }
}

#[test]
fn unity_at_zero_db() {
    assert_eq!(db_to_linear(0.0), 1.0);
}
