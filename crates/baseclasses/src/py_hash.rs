//! Deterministic hashing for field values and records.
//!
//! Hashes are stable across runs and processes (equivalent to CPython's
//! `PYTHONHASHSEED=0`): text and bytes use SipHash-1-3 with a zeroed key, numbers
//! use the Mersenne-prime modular algorithm, and sequences mix element hashes with
//! the xxHash-style lanes CPython uses for tuples.
//!
//! ## Cross-type hash invariant
//!
//! `Value` equality treats `0 == 0.0 == False` and `1 == 1.0 == True`, so the
//! hashes of int, float, and bool must agree for equivalent inputs. Integral floats
//! therefore hash through the integer path, and booleans hash as `0`/`1`.

use crate::value::Value;

/// Mersenne prime used for numeric hashing: `2^61 - 1`.
///
/// All numeric kinds hash modulo this prime so that equal values across kinds
/// produce identical hashes.
const MODULUS: i64 = (1 << 61) - 1;

/// Hashes any field value.
///
/// Lists hash like tuples; maps hash independently of insertion order because
/// map equality ignores it.
#[must_use]
pub fn hash_value(value: &Value) -> i64 {
    match value {
        Value::None => NONE_HASH,
        Value::Bool(b) => i64::from(*b),
        Value::Int(i) => hash_int(*i),
        Value::Float(f) => hash_float(*f),
        Value::Str(s) => hash_bytes(s.as_bytes()),
        Value::Bytes(b) => hash_bytes(b),
        Value::List(items) | Value::Tuple(items) => hash_sequence(items.iter().map(hash_value)),
        Value::Map(map) => {
            let mut acc: u64 = 0;
            for (key, item) in map {
                let pair = hash_sequence([hash_bytes(key.as_bytes()), hash_value(item)]);
                acc ^= shuffle_bits(pair as u64);
            }
            acc ^= (map.len() as u64).wrapping_add(1).wrapping_mul(1_927_868_237);
            finish_signed(acc)
        }
        Value::Record(instance) => instance.hash_value(),
    }
}

/// Fixed hash used for `None`.
const NONE_HASH: i64 = 0x00FC_B2E9;

/// Hashes raw bytes with the seed-0 SipHash-1-3 behavior.
///
/// This applies two conventions:
/// - empty input hashes to `0`
/// - a computed hash of `-1` is remapped to `-2`
#[must_use]
pub(crate) fn hash_bytes(bytes: &[u8]) -> i64 {
    if bytes.is_empty() {
        return 0;
    }
    let signed = i64::from_ne_bytes(siphash13_with_seed0(bytes).to_ne_bytes());
    if signed == -1 { -2 } else { signed }
}

/// Hashes a signed 64-bit integer with the modular algorithm.
///
/// The result is `n % MODULUS` (sign-preserving), with `-1` remapped to `-2`.
#[must_use]
pub(crate) fn hash_int(value: i64) -> i64 {
    if value == 0 {
        return 0;
    }

    let sign: i64 = if value < 0 { -1 } else { 1 };

    // i64::MIN's absolute value overflows i64, so widen first.
    let abs_val: u64 = i128::from(value).unsigned_abs() as u64;
    let remainder = (abs_val % MODULUS as u64) as i64;

    let result = sign * remainder;
    if result == -1 { -2 } else { result }
}

/// Hashes an `f64`.
///
/// Integral values delegate to [`hash_int`] so that `hash(n) == hash(n as f64)`.
/// Other values use a `frexp` decomposition accumulated modulo `MODULUS`.
///
/// Special values:
/// - `+inf` hashes to `314159`
/// - `-inf` hashes to `-314159`
/// - `NaN` hashes to `0`
#[must_use]
pub(crate) fn hash_float(value: f64) -> i64 {
    if value.is_infinite() {
        return if value > 0.0 { 314_159 } else { -314_159 };
    }
    if value.is_nan() {
        return 0;
    }

    let truncated = value.trunc();
    if value == truncated && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        return hash_int(truncated as i64);
    }

    let (frac, exp) = frexp(value);
    let mut m = frac;
    let mut e = exp;

    let sign: i64 = if m < 0.0 {
        m = -m;
        -1
    } else {
        1
    };

    // Mantissa bits are consumed in 28-bit chunks.
    let mut x: u64 = 0;
    while m > 0.0 {
        x = ((x << 28) & (MODULUS as u64)) | (x >> 33);
        m *= 268_435_456.0; // 2^28
        e -= 28;
        let w = m as u64;
        m -= w as f64;
        x = x.wrapping_add(w);
        if x >= MODULUS as u64 {
            x -= MODULUS as u64;
        }
    }

    e %= 61;
    if e < 0 {
        e += 61;
    }
    x = ((x << e as u32) & (MODULUS as u64)) | (x >> (61 - e) as u32);

    let result = (sign * x as i64) % MODULUS;
    if result == -1 { -2 } else { result }
}

/// Mixes element hashes in order, like a tuple hash.
#[must_use]
pub(crate) fn hash_sequence(lanes: impl IntoIterator<Item = i64>) -> i64 {
    const XXPRIME_1: u64 = 11_400_714_785_074_694_791;
    const XXPRIME_2: u64 = 14_029_467_366_897_019_727;
    const XXPRIME_5: u64 = 2_870_177_450_012_600_261;
    const TUPLE_HASH_SUFFIX: u64 = 3_527_539;

    let mut acc = XXPRIME_5;
    let mut len: u64 = 0;
    for lane_signed in lanes {
        let lane = u64::from_ne_bytes(lane_signed.to_ne_bytes());
        acc = acc.wrapping_add(lane.wrapping_mul(XXPRIME_2));
        acc = acc.rotate_left(31);
        acc = acc.wrapping_mul(XXPRIME_1);
        len += 1;
    }

    acc = acc.wrapping_add(len ^ (XXPRIME_5 ^ TUPLE_HASH_SUFFIX));
    if acc == u64::MAX {
        acc = 1_546_275_796;
    }
    i64::from_ne_bytes(acc.to_ne_bytes())
}

/// Spreads bits of one entry hash before it is folded into an unordered accumulator.
fn shuffle_bits(h: u64) -> u64 {
    ((h ^ 89_869_747) ^ (h << 16)).wrapping_mul(3_644_798_167)
}

fn finish_signed(acc: u64) -> i64 {
    let signed = i64::from_ne_bytes(acc.to_ne_bytes());
    if signed == -1 { 590_923_713 } else { signed }
}

/// Returns `(frac, exp)` such that `value == frac * 2^exp` with `0.5 <= |frac| < 1.0`.
fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 || value.is_nan() || value.is_infinite() {
        return (value, 0);
    }
    let bits = value.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    if exponent == 0 {
        // Subnormal: scale by 2^64 to normalize, then adjust the exponent.
        let normalized = value * (1u64 << 63) as f64 * 2.0;
        let (frac, exp) = frexp(normalized);
        return (frac, exp - 64);
    }
    let frac_bits = (bits & 0x800F_FFFF_FFFF_FFFF) | 0x3FE0_0000_0000_0000;
    let frac = f64::from_bits(frac_bits);
    (frac, exponent - 1022)
}

/// Computes SipHash-1-3 with a zero key.
#[must_use]
fn siphash13_with_seed0(bytes: &[u8]) -> u64 {
    const K0: u64 = 0;
    const K1: u64 = 0;

    let mut v0 = K0 ^ 0x736f_6d65_7073_6575;
    let mut v1 = K1 ^ 0x646f_7261_6e64_6f6d;
    let mut v2 = K0 ^ 0x6c79_6765_6e65_7261;
    let mut v3 = K1 ^ 0x7465_6462_7974_6573;

    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut block = [0_u8; 8];
        block.copy_from_slice(chunk);
        let message = u64::from_le_bytes(block);
        v3 ^= message;
        sip_round(&mut v0, &mut v1, &mut v2, &mut v3);
        v0 ^= message;
    }

    let mut tail = (bytes.len() as u64) << 56;
    for (index, byte) in chunks.remainder().iter().copied().enumerate() {
        tail |= u64::from(byte) << (index * 8);
    }

    v3 ^= tail;
    sip_round(&mut v0, &mut v1, &mut v2, &mut v3);
    v0 ^= tail;
    v2 ^= 0xff;
    sip_round(&mut v0, &mut v1, &mut v2, &mut v3);
    sip_round(&mut v0, &mut v1, &mut v2, &mut v3);
    sip_round(&mut v0, &mut v1, &mut v2, &mut v3);

    v0 ^ v1 ^ v2 ^ v3
}

fn sip_round(v0: &mut u64, v1: &mut u64, v2: &mut u64, v3: &mut u64) {
    *v0 = v0.wrapping_add(*v1);
    *v1 = v1.rotate_left(13);
    *v1 ^= *v0;
    *v0 = v0.rotate_left(32);

    *v2 = v2.wrapping_add(*v3);
    *v3 = v3.rotate_left(16);
    *v3 ^= *v2;

    *v0 = v0.wrapping_add(*v3);
    *v3 = v3.rotate_left(21);
    *v3 ^= *v0;

    *v2 = v2.wrapping_add(*v1);
    *v1 = v1.rotate_left(17);
    *v1 ^= *v2;
    *v2 = v2.rotate_left(32);
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    #[test]
    fn small_ints_hash_to_themselves() {
        assert_eq!(hash_int(0), 0);
        assert_eq!(hash_int(42), 42);
        assert_eq!(hash_int(-1), -2);
        assert_eq!(hash_int(MODULUS), 0);
    }

    #[test]
    fn numeric_kinds_agree() {
        assert_eq!(hash_value(&Value::Int(1)), hash_value(&Value::Float(1.0)));
        assert_eq!(hash_value(&Value::Bool(true)), hash_value(&Value::Int(1)));
        assert_eq!(hash_value(&Value::Float(-0.0)), hash_value(&Value::Int(0)));
        assert_eq!(hash_float(f64::INFINITY), 314_159);
        assert_eq!(hash_float(f64::NAN), 0);
    }

    #[test]
    fn fractional_floats_match_known_values() {
        // hash(0.5) under PYTHONHASHSEED=0
        assert_eq!(hash_float(0.5), 1_152_921_504_606_846_976);
        assert_eq!(hash_float(-0.5), -1_152_921_504_606_846_976);
    }

    #[test]
    fn empty_text_hashes_to_zero() {
        assert_eq!(hash_bytes(b""), 0);
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
    }

    #[test]
    fn empty_tuple_hash_is_stable() {
        // hash(()) in CPython 3.8+
        assert_eq!(hash_sequence([]), 5_740_354_900_026_072_187);
    }

    #[test]
    fn map_hash_ignores_insertion_order() {
        let mut forward = IndexMap::new();
        forward.insert("a".to_owned(), Value::Int(1));
        forward.insert("b".to_owned(), Value::Int(2));
        let mut backward = IndexMap::new();
        backward.insert("b".to_owned(), Value::Int(2));
        backward.insert("a".to_owned(), Value::Int(1));
        assert_eq!(hash_value(&Value::Map(forward)), hash_value(&Value::Map(backward)));
    }
}
