//! Tests for the U256 word type

use fugue_primitives::{ArithmeticError, U256};
use proptest::prelude::*;

fn word() -> impl Strategy<Value = U256> {
    any::<[u64; 4]>().prop_map(U256::from_limbs)
}

fn nonzero_word() -> impl Strategy<Value = U256> {
    word().prop_filter("divisor must be non-zero", |w| !w.is_zero())
}

// =============================================================================
// Algebraic laws
// =============================================================================

proptest! {
    #[test]
    fn add_sub_round_trip(a in word(), b in word()) {
        prop_assert_eq!(a.wrapping_add(b).wrapping_sub(b), a);
    }

    #[test]
    fn add_commutes(a in word(), b in word()) {
        prop_assert_eq!(a.wrapping_add(b), b.wrapping_add(a));
    }

    #[test]
    fn mul_commutes(a in word(), b in word()) {
        prop_assert_eq!(a.wrapping_mul(b), b.wrapping_mul(a));
    }

    #[test]
    fn div_rem_identity(a in word(), b in nonzero_word()) {
        let (q, r) = a.div_rem(b).unwrap();
        prop_assert!(r < b);
        prop_assert_eq!(q.wrapping_mul(b).wrapping_add(r), a);
    }

    #[test]
    fn double_negation_is_identity(a in word()) {
        prop_assert_eq!(a.negate().negate(), a);
    }

    #[test]
    fn sub_is_add_of_negation(a in word(), b in word()) {
        prop_assert_eq!(a.wrapping_sub(b), a.wrapping_add(b.negate()));
    }

    #[test]
    fn shift_left_then_right_clears_low_bits(x in word(), n in 0u32..256) {
        // Shifting left discards the top n bits; shifting back leaves the
        // remaining bits exactly where they started
        let round_trip = x.shl(n).shr(n);
        let expected = x & (U256::MAX.shr(n));
        prop_assert_eq!(round_trip, expected);
    }

    #[test]
    fn shift_by_zero_is_identity(x in word()) {
        prop_assert_eq!(x.shl(0), x);
        prop_assert_eq!(x.shr(0), x);
        prop_assert_eq!(x.sar(0), x);
    }

    #[test]
    fn sar_agrees_with_shr_for_non_negative(x in word(), n in 0u32..256) {
        let positive = x.shr(1); // clear the sign bit
        prop_assert_eq!(positive.sar(n), positive.shr(n));
    }

    #[test]
    fn be_bytes_round_trip(a in word()) {
        prop_assert_eq!(U256::from_be_bytes(a.to_be_bytes()), a);
    }

    #[test]
    fn small_arithmetic_matches_u128(a in any::<u64>(), b in any::<u64>()) {
        let wide = U256::from_u64(a).wrapping_mul(U256::from_u64(b));
        let narrow = a as u128 * b as u128;
        prop_assert_eq!(wide.low_u64(), narrow as u64);
        prop_assert_eq!(wide.limbs()[2], (narrow >> 64) as u64);
    }

    #[test]
    fn signed_div_rem_identity(a in word(), b in nonzero_word()) {
        // a == (a sdiv b) * b + (a smod b), except the wrapped overflow case
        prop_assume!(!(a == U256::SIGNED_MIN && b == U256::MAX));
        let q = a.signed_div(b).unwrap();
        let r = a.signed_rem(b).unwrap();
        prop_assert_eq!(q.wrapping_mul(b).wrapping_add(r), a);
    }
}

// =============================================================================
// Fixed-value edge cases
// =============================================================================

mod edge_cases {
    use super::*;

    #[test]
    fn division_by_zero_is_a_typed_error() {
        assert_eq!(
            U256::MAX.div_rem(U256::ZERO),
            Err(ArithmeticError::DivisionByZero)
        );
        assert_eq!(
            U256::MAX.signed_div(U256::ZERO),
            Err(ArithmeticError::DivisionByZero)
        );
        assert_eq!(
            U256::MAX.signed_rem(U256::ZERO),
            Err(ArithmeticError::DivisionByZero)
        );
    }

    #[test]
    fn signed_min_divided_by_minus_one_wraps() {
        assert_eq!(
            U256::SIGNED_MIN.signed_div(U256::MAX).unwrap(),
            U256::SIGNED_MIN
        );
    }

    #[test]
    fn signed_min_rem_minus_one_is_zero() {
        assert_eq!(
            U256::SIGNED_MIN.signed_rem(U256::MAX).unwrap(),
            U256::ZERO
        );
    }

    #[test]
    fn max_plus_one_wraps_to_zero() {
        assert_eq!(U256::MAX.wrapping_add(U256::ONE), U256::ZERO);
    }

    #[test]
    fn zero_minus_one_wraps_to_max() {
        assert_eq!(U256::ZERO.wrapping_sub(U256::ONE), U256::MAX);
    }

    #[test]
    fn minus_one_is_all_ones() {
        assert_eq!(U256::ONE.negate(), U256::MAX);
    }

    #[test]
    fn full_width_division() {
        // (2^256 - 1) / (2^128 + 1) leaves remainder 0: the divisor splits
        // the all-ones pattern exactly
        let divisor = U256::from_limbs([0, 1, 0, 1]);
        let (q, r) = U256::MAX.div_rem(divisor).unwrap();
        assert_eq!(q, U256::from_limbs([0, 0, u64::MAX, u64::MAX]));
        assert_eq!(r, U256::ZERO);
    }

    #[test]
    fn exponentiation_edges() {
        assert_eq!(U256::ZERO.pow(U256::ZERO), U256::ONE);
        assert_eq!(U256::MAX.pow(U256::ONE), U256::MAX);
        assert_eq!(
            U256::from_u64(3).pow(U256::from_u64(5)),
            U256::from_u64(243)
        );
    }
}

// =============================================================================
// Rendering
// =============================================================================

mod rendering {
    use super::*;

    #[test]
    fn decimal_of_two_limb_value() {
        // 2^64 = 18446744073709551616
        let value = U256::from_limbs([0, 0, 1, 0]);
        assert_eq!(value.to_string(), "18446744073709551616");
    }

    #[test]
    fn decimal_matches_u64_display() {
        for sample in [0u64, 1, 9, 10, 12345, u64::MAX] {
            assert_eq!(U256::from_u64(sample).to_string(), sample.to_string());
        }
    }

    #[test]
    fn binary_has_msb_first() {
        let rendered = format!("{:b}", U256::SIGNED_MIN);
        assert!(rendered.starts_with('1'));
        assert!(rendered[1..].chars().all(|c| c == '0'));
    }

    #[test]
    fn hex_round_trips_through_bytes() {
        let value = U256::from_u64(0xCAFE);
        let stripped = value.to_hex().trim_start_matches("0x").to_string();
        let bytes: [u8; 32] = hex::decode(stripped).unwrap().try_into().unwrap();
        assert_eq!(U256::from_be_bytes(bytes), value);
    }
}
