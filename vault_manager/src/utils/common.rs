//! Common utility and helper functions that are used across the project

use alloy_primitives::{Address, U256};
use candid::Nat;
use num_bigint::BigUint;

use super::error::*;
use crate::constants::{max_bps, MAX_BPS};

/// Returns `a * b / c`, failing on overflow or a zero denominator.
pub fn mul_div(a: U256, b: U256, c: U256) -> VaultResult<U256> {
    a.checked_mul(b)
        .ok_or_else(|| arithmetic_err("Multiplication overflowed."))?
        .checked_div(c)
        .ok_or_else(|| arithmetic_err("Denominator was zero."))
}

/// Returns the `bps` share of `amount`.
pub fn bps_of(amount: U256, bps: u64) -> VaultResult<U256> {
    mul_div(amount, U256::from(bps), max_bps())
}

/// Fails with `InvariantViolation` if `bps` is above `limit`.
pub fn require_bps(bps: u64, limit: u64, what: &str) -> VaultResult<()> {
    if bps > limit || bps > MAX_BPS {
        return Err(invariant_err(format!(
            "{} of {} bps is above the limit of {} bps.",
            what, bps, limit
        )));
    }
    Ok(())
}

/// Returns Err if the address is the zero address
pub fn require_non_zero(address: Address) -> VaultResult<Address> {
    if address == Address::ZERO {
        return Err(invariant_err("The zero address is not accepted."));
    }
    Ok(address)
}

/// Splits a raw (profit, loss) pair so that at most one side is non-zero.
pub fn net_profit_loss(profit: U256, loss: U256) -> (U256, U256) {
    if profit >= loss {
        (profit - loss, U256::ZERO)
    } else {
        (U256::ZERO, loss - profit)
    }
}

/// Converts values of type `U256` to `Nat`
pub fn u256_to_nat(value: &U256) -> Nat {
    Nat(BigUint::from_bytes_be(&value.to_be_bytes::<32>()))
}

/// Converts values of type `Nat` to `U256`
pub fn nat_to_u256(n: &Nat) -> VaultResult<U256> {
    let be_bytes = n.0.to_bytes_be();
    if be_bytes.len() > 32 {
        return Err(VaultError::DecodingError("The `Nat` input length exceedes 32 bytes when converted to big-endian bytes representation.".to_string()));
    }
    // Ensure the byte array is exactly 32 bytes long
    let mut padded_bytes = [0u8; 32];
    let start_pos = 32 - be_bytes.len();
    padded_bytes[start_pos..].copy_from_slice(&be_bytes);

    Ok(U256::from_be_bytes(padded_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mul_div_rejects_zero_denominator() {
        let result = mul_div(U256::from(10), U256::from(10), U256::ZERO);
        assert!(matches!(result, Err(VaultError::Arithmetic(_))));
    }

    #[test]
    fn mul_div_rejects_overflow() {
        let result = mul_div(U256::MAX, U256::from(2), U256::from(1));
        assert!(matches!(result, Err(VaultError::Arithmetic(_))));
    }

    #[test]
    fn bps_of_full_ratio_is_identity() {
        assert_eq!(bps_of(U256::from(1234), MAX_BPS).unwrap(), U256::from(1234));
        assert_eq!(bps_of(U256::from(1000), 250).unwrap(), U256::from(25));
    }

    #[test]
    fn require_bps_checks_both_limits() {
        assert!(require_bps(5_000, 5_000, "fee").is_ok());
        assert!(require_bps(5_001, 5_000, "fee").is_err());
        assert!(require_bps(10_001, 20_000, "fee").is_err());
    }

    #[test]
    fn zero_address_is_rejected() {
        assert!(require_non_zero(Address::ZERO).is_err());
        assert!(require_non_zero(Address::repeat_byte(0x11)).is_ok());
    }

    proptest! {
        #[test]
        fn nat_round_trips_through_u256(value in any::<u128>()) {
            let value = U256::from(value);
            prop_assert_eq!(nat_to_u256(&u256_to_nat(&value)).unwrap(), value);
        }

        #[test]
        fn netting_never_leaves_both_sides(profit in any::<u64>(), loss in any::<u64>()) {
            let (p, l) = net_profit_loss(U256::from(profit), U256::from(loss));
            prop_assert!(p == U256::ZERO || l == U256::ZERO);
            prop_assert_eq!(
                U256::from(profit) + l,
                U256::from(loss) + p
            );
        }
    }
}
