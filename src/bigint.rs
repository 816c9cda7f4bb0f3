//! # Big-Integer and Hex Utilities
//!
//! Arbitrary-precision integer parsing and hex codec helpers shared by every
//! plan. All scalar subject I/O is big-endian hex with no `0x` prefix (see
//! the subprocess output convention), so these helpers are the single place
//! that convention is implemented.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::prng::Prng;

/// Decodes a hex string (either case, optionally odd-length) into bytes.
///
/// The subject-program convention requires even-length hex, but configured
/// key material is occasionally given with a leading zero omitted; this
/// left-pads with `"0"` before decoding so round-tripping via [`encode_hex`]
/// is lossless for any leading-zero-preserving caller.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    if input.len() % 2 == 1 {
        let padded = format!("0{}", input);
        hex::decode(padded)
    } else {
        hex::decode(input)
    }
}

/// Encodes bytes as lowercase hex with no prefix.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parses a hex string (any case) into an arbitrary-precision unsigned integer.
pub fn hex_to_biguint(input: &str) -> Option<BigUint> {
    let bytes = decode_hex(input).ok()?;
    Some(BigUint::from_bytes_be(&bytes))
}

/// Renders a `BigUint` as lowercase hex, left-padded with zero nibbles to
/// `min_hex_len` characters. Used when a fixed field width is required by a
/// subject program's argv layout (e.g. matching the modulus byte length).
pub fn biguint_to_hex(value: &BigUint, min_hex_len: usize) -> String {
    left_pad_hex(&value.to_str_radix(16), min_hex_len)
}

/// Left-pads a hex string with `'0'` characters until it reaches `min_len`.
/// A no-op if the string is already at least that long.
pub fn left_pad_hex(hex: &str, min_len: usize) -> String {
    if hex.len() >= min_len {
        hex.to_string()
    } else {
        let padding = "0".repeat(min_len - hex.len());
        format!("{}{}", padding, hex)
    }
}

/// Integer square root via Newton's method, rounding down.
///
/// Used twice in sequence by the Wiener-precondition probe to approximate
/// `N^(1/4)` as `bigSqrt(bigSqrt(N))`.
pub fn big_sqrt(value: &BigUint) -> BigUint {
    if value.is_zero() {
        return BigUint::zero();
    }
    let mut x = value.clone();
    let mut y = (&x + BigUint::from(1u32)) >> 1;
    while y < x {
        x = y.clone();
        y = (&x + value / &x) >> 1;
    }
    x
}

/// Number of bytes required to hold `value`'s bit length, i.e. `⌈bitlen/8⌉`.
pub fn byte_len(value: &BigUint) -> usize {
    (value.bits() as usize + 7) / 8
}

/// Miller-Rabin probabilistic primality test with `rounds` independent
/// witnesses. A composite is declared prime with probability at most
/// `4^-rounds`; this test-input generator is not suitable for producing
/// real key material, only RSA-exponent-sweep candidates of a known bit
/// length.
pub fn is_probably_prime(candidate: &BigUint, rounds: u32, prng: &mut Prng) -> bool {
    let zero = BigUint::zero();
    let one = BigUint::one();
    let two = &one + &one;

    if candidate < &two {
        return false;
    }
    if candidate == &two {
        return true;
    }
    if candidate % &two == zero {
        return false;
    }

    let candidate_minus_one = candidate - &one;
    let mut d = candidate_minus_one.clone();
    let mut r = 0u32;
    while &d % &two == zero {
        d /= &two;
        r += 1;
    }

    'witness: for _ in 0..rounds {
        let bit_len = candidate.bits() as usize;
        let witness_bytes = prng.random_odd_of_bitlen(bit_len.max(8));
        let mut witness = BigUint::from_bytes_be(&witness_bytes) % (candidate - &two) + &two;
        if witness < two {
            witness = two.clone();
        }

        let mut x = witness.modpow(&d, candidate);
        if x == one || x == candidate_minus_one {
            continue 'witness;
        }

        for _ in 0..r.saturating_sub(1) {
            x = x.modpow(&two, candidate);
            if x == candidate_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Draws a random odd candidate of exactly `bit_len` bits and repeats until
/// [`is_probably_prime`] accepts it. Used by the RSA-ENC exponent-length
/// sweep to build fresh moduli at specific bit lengths; bounded to avoid an
/// unbounded loop on pathological bit lengths (2 and 3 have few odd
/// candidates).
pub fn random_prime_of_bitlen(bit_len: usize, rounds: u32, prng: &mut Prng) -> BigUint {
    loop {
        let bytes = prng.random_odd_of_bitlen(bit_len);
        let candidate = BigUint::from_bytes_be(&bytes);
        if is_probably_prime(&candidate, rounds, prng) {
            return candidate;
        }
    }
}
