//! Property Tests: Distributed Point Function
//!
//! The whole oblivious-search construction rests on one identity: the XOR
//! of the two parties' evaluations equals the point function, everywhere.

use odory_fss::dpf;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

proptest! {
    #[test]
    fn xor_of_evaluations_is_the_point_function(
        rng_seed in any::<u64>(),
        alpha in 0u64..256,
        probe in 0u64..256,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
        let n = dpf::domain_bits_for(255);
        let (key_a, key_b) = dpf::gen(alpha, n, &mut rng);
        let combined = dpf::eval(0, &key_a, probe) ^ dpf::eval(1, &key_b, probe);
        prop_assert_eq!(combined, u8::from(probe == alpha));
    }

    #[test]
    fn full_domain_sweep_fires_exactly_once(
        rng_seed in any::<u64>(),
        alpha in 0u64..64,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
        let n = dpf::domain_bits_for(63);
        let (key_a, key_b) = dpf::gen(alpha, n, &mut rng);
        let fired: u32 = (0..64u64)
            .map(|x| u32::from(dpf::eval(0, &key_a, x) ^ dpf::eval(1, &key_b, x)))
            .sum();
        prop_assert_eq!(fired, 1);
    }
}
