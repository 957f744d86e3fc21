//! Two-party distributed point function
//!
//! Tree-based DPF in the Boyle-Gilboa-Ishai style with single-bit output.
//! `gen(alpha, n)` splits the point function `f(x) = [x == alpha]` over the
//! domain `[0, 2^n)` into two key halves; each party's `eval` at any `x`
//! yields one bit, and the XOR of the two parties' bits equals `f(x)`.
//! Neither half alone reveals `alpha`.
//!
//! Seeds are 32 bytes and the level PRG is a domain-separated BLAKE3 XOF.
//! Both parties share the per-level correction words; only the root seeds
//! differ.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Context prefix for the per-level seed expansion
const EXPAND_CONTEXT: &[u8] = b"odory.dpf.expand.v1";
/// Context prefix for the leaf conversion
const CONVERT_CONTEXT: &[u8] = b"odory.dpf.convert.v1";

/// One level's correction word, shared by both key halves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionWord {
    /// Seed correction applied when the control bit is set
    pub seed: [u8; 32],
    /// Control-bit correction for the left child
    pub t_left: u8,
    /// Control-bit correction for the right child
    pub t_right: u8,
}

/// One party's half of a DPF key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpfKey {
    /// Domain bit-length `n`; inputs live in `[0, 2^n)`
    pub domain_bits: u32,
    /// Root seed, the only field that differs between the two halves
    pub seed: [u8; 32],
    /// Per-level correction words, `domain_bits` of them
    pub correction_words: Vec<CorrectionWord>,
    /// Output correction folded in at the leaf
    pub final_correction: u8,
}

/// PRG expansion of one seed into two child seeds and control bits
fn expand(seed: &[u8; 32]) -> ([u8; 32], u8, [u8; 32], u8) {
    let mut hasher = blake3::Hasher::new();
    hasher.update(EXPAND_CONTEXT);
    hasher.update(seed);
    let mut stream = [0u8; 66];
    hasher.finalize_xof().fill(&mut stream);

    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&stream[0..32]);
    right.copy_from_slice(&stream[32..64]);
    (left, stream[64] & 1, right, stream[65] & 1)
}

/// Leaf conversion of a final seed into the output group (one bit)
fn convert(seed: &[u8; 32]) -> u8 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CONVERT_CONTEXT);
    hasher.update(seed);
    hasher.finalize().as_bytes()[0] & 1
}

#[inline]
fn xor_seeds(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a[i] ^ b[i];
    }
    out
}

/// Bit `i` of `x` over an `n`-bit domain, most significant first
#[inline]
fn domain_bit(x: u64, i: u32, n: u32) -> u8 {
    ((x >> (n - 1 - i)) & 1) as u8
}

/// Smallest domain bit-length whose domain contains `max_value`
pub fn domain_bits_for(max_value: u64) -> u32 {
    (64 - max_value.leading_zeros()).max(1)
}

/// Split `f(x) = [x == alpha]` over `[0, 2^n)` into two key halves
///
/// `alpha` must fit in the domain; the caller sizes `domain_bits` with
/// [`domain_bits_for`].
pub fn gen<R: Rng>(alpha: u64, domain_bits: u32, rng: &mut R) -> (DpfKey, DpfKey) {
    let n = domain_bits;

    let mut seed_0 = [0u8; 32];
    let mut seed_1 = [0u8; 32];
    rng.fill_bytes(&mut seed_0);
    rng.fill_bytes(&mut seed_1);
    let root_0 = seed_0;
    let root_1 = seed_1;

    let mut t_0: u8 = 0;
    let mut t_1: u8 = 1;
    let mut correction_words = Vec::with_capacity(n as usize);

    for i in 0..n {
        let (s0_left, t0_left, s0_right, t0_right) = expand(&seed_0);
        let (s1_left, t1_left, s1_right, t1_right) = expand(&seed_1);

        let alpha_bit = domain_bit(alpha, i, n);

        // The branch alpha takes is kept pseudorandom; the other branch is
        // corrected so both parties' seeds collapse to equality off-path.
        let (keep_s0, keep_t0, lose_s0) = if alpha_bit == 1 {
            (s0_right, t0_right, s0_left)
        } else {
            (s0_left, t0_left, s0_right)
        };
        let (keep_s1, keep_t1, lose_s1) = if alpha_bit == 1 {
            (s1_right, t1_right, s1_left)
        } else {
            (s1_left, t1_left, s1_right)
        };

        let cw_seed = xor_seeds(&lose_s0, &lose_s1);
        let t_left = t0_left ^ t1_left ^ alpha_bit ^ 1;
        let t_right = t0_right ^ t1_right ^ alpha_bit;
        let t_keep = if alpha_bit == 1 { t_right } else { t_left };

        seed_0 = if t_0 == 1 {
            xor_seeds(&keep_s0, &cw_seed)
        } else {
            keep_s0
        };
        seed_1 = if t_1 == 1 {
            xor_seeds(&keep_s1, &cw_seed)
        } else {
            keep_s1
        };

        let next_t0 = keep_t0 ^ (t_0 & t_keep);
        let next_t1 = keep_t1 ^ (t_1 & t_keep);
        t_0 = next_t0;
        t_1 = next_t1;

        correction_words.push(CorrectionWord {
            seed: cw_seed,
            t_left,
            t_right,
        });
    }

    // Output group is Z_2 with beta = 1.
    let final_correction = convert(&seed_0) ^ convert(&seed_1) ^ 1;

    (
        DpfKey {
            domain_bits: n,
            seed: root_0,
            correction_words: correction_words.clone(),
            final_correction,
        },
        DpfKey {
            domain_bits: n,
            seed: root_1,
            correction_words,
            final_correction,
        },
    )
}

/// Evaluate one key half at `x`; XOR with the other party's bit gives
/// `[x == alpha]`
pub fn eval(party: u8, key: &DpfKey, x: u64) -> u8 {
    let n = key.domain_bits;
    let mut seed = key.seed;
    let mut t = party & 1;

    for (i, cw) in key.correction_words.iter().enumerate() {
        let (mut s_left, mut t_left, mut s_right, mut t_right) = expand(&seed);
        if t == 1 {
            s_left = xor_seeds(&s_left, &cw.seed);
            s_right = xor_seeds(&s_right, &cw.seed);
            t_left ^= cw.t_left;
            t_right ^= cw.t_right;
        }
        if domain_bit(x, i as u32, n) == 1 {
            seed = s_right;
            t = t_right;
        } else {
            seed = s_left;
            t = t_left;
        }
    }

    convert(&seed) ^ (t & key.final_correction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_point_function_reconstructs() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let n = domain_bits_for(15);
        let (key_a, key_b) = gen(9, n, &mut rng);
        for x in 0..16u64 {
            let combined = eval(0, &key_a, x) ^ eval(1, &key_b, x);
            assert_eq!(combined, u8::from(x == 9), "x = {x}");
        }
    }

    #[test]
    fn test_alpha_zero_and_max() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let n = domain_bits_for(31);
        for alpha in [0u64, 31] {
            let (key_a, key_b) = gen(alpha, n, &mut rng);
            for x in 0..32u64 {
                let combined = eval(0, &key_a, x) ^ eval(1, &key_b, x);
                assert_eq!(combined, u8::from(x == alpha));
            }
        }
    }

    #[test]
    fn test_single_bit_domain() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let (key_a, key_b) = gen(1, 1, &mut rng);
        assert_eq!(eval(0, &key_a, 0) ^ eval(1, &key_b, 0), 0);
        assert_eq!(eval(0, &key_a, 1) ^ eval(1, &key_b, 1), 1);
    }

    #[test]
    fn test_halves_differ_only_in_root_seed() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let (key_a, key_b) = gen(5, 4, &mut rng);
        assert_ne!(key_a.seed, key_b.seed);
        assert_eq!(key_a.correction_words, key_b.correction_words);
        assert_eq!(key_a.final_correction, key_b.final_correction);
    }

    #[test]
    fn test_domain_bits_for() {
        assert_eq!(domain_bits_for(0), 1);
        assert_eq!(domain_bits_for(1), 1);
        assert_eq!(domain_bits_for(2), 2);
        assert_eq!(domain_bits_for(255), 8);
        assert_eq!(domain_bits_for(256), 9);
    }
}
