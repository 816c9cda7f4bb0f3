//! # Deterministic Pseudo-Random Source
//!
//! All input generation in this crate goes through a single seeded,
//! non-cryptographic PRNG so that a run is fully reproducible given a seed
//! and a configuration. Per the concurrency model, this PRNG is consumed
//! only from the coordinating thread before jobs are dispatched to the
//! worker pool; workers never touch it.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// A seeded, non-cryptographic source of randomness for test-input
/// generation. Not suitable for generating real key material — see the
/// Miller-Rabin round-count caveat in the RSA exponent generator, which
/// draws from this same source.
pub struct Prng {
    rng: StdRng,
}

impl Prng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fills `len` bytes of randomness and returns them hex-encoded, matching
    /// the `randomHex` helper used throughout the plans for message and key
    /// generation.
    pub fn random_hex(&mut self, len: usize) -> String {
        let mut bytes = vec![0u8; len];
        self.rng.fill_bytes(&mut bytes);
        crate::bigint::encode_hex(&bytes)
    }

    /// Returns a uniformly random integer in `[low, high]` inclusive.
    pub fn gen_range_inclusive(&mut self, low: usize, high: usize) -> usize {
        if low >= high {
            low
        } else {
            self.rng.gen_range(low..=high)
        }
    }

    /// Returns a random boolean, used to classify inputs arbitrarily when a
    /// plan needs an unbiased coin (e.g. choosing which of two prepared
    /// messages gets class 0 vs class 1).
    pub fn gen_bool(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// Draws a random odd `bit_len`-bit big-endian byte buffer suitable as a
    /// primality-test candidate: the top bit (bit `bit_len - 1`) is forced to
    /// 1 so the value has exactly `bit_len` bits, any higher bits in the
    /// leading byte are masked off, and the bottom bit is forced to 1 so the
    /// value is odd.
    pub fn random_odd_of_bitlen(&mut self, bit_len: usize) -> Vec<u8> {
        assert!(bit_len > 0);
        let byte_len = (bit_len + 7) / 8;
        let mut bytes = vec![0u8; byte_len];
        self.rng.fill_bytes(&mut bytes);

        let bits_in_top_byte = bit_len - (byte_len - 1) * 8;
        let top_byte_mask = if bits_in_top_byte == 8 {
            0xFFu8
        } else {
            (1u8 << bits_in_top_byte) - 1
        };
        bytes[0] &= top_byte_mask;
        bytes[0] |= 1 << (bits_in_top_byte - 1);

        let last = bytes.len() - 1;
        bytes[last] |= 1;
        bytes
    }
}
