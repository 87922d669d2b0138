//! Amounts, denominations and the splitting rules used for change and
//! output generation.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Amount errors
#[derive(Debug, Error)]
pub enum Error {
    /// Addition overflowed
    #[error("Amount overflow")]
    AmountOverflow,
    /// Split target could not be met
    #[error("Cannot split token into target")]
    SplitValuesGreater,
}

/// An amount, denominated in the minor unit of a keyset (e.g. satoshis).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero amount
    pub const ZERO: Amount = Amount(0);

    /// Create an [`Amount`] from a `u64`
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Numeric value
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    /// Split into parts that are powers of two, largest first.
    ///
    /// This is the canonical denomination set a mint is expected to
    /// support: every positive integer has a unique binary decomposition.
    pub fn split(&self) -> Vec<Self> {
        let value = self.0;
        (0_u32..64)
            .rev()
            .filter_map(|bit| {
                let part = 1_u64 << bit;
                ((value & part) == part).then_some(Self(part))
            })
            .collect()
    }

    /// Split `self` into parts according to a [`SplitTarget`], producing the
    /// denominations that new blinded outputs should be minted for.
    pub fn split_targeted(&self, target: &SplitTarget) -> Result<Vec<Self>, Error> {
        let target_amount = match target {
            SplitTarget::None => return Ok(self.split()),
            SplitTarget::Value(amount) => *amount,
        };

        if target_amount > *self {
            return Err(Error::SplitValuesGreater);
        }

        let mut parts = Vec::new();
        let mut remaining = self.0;

        // Emit as many `target_amount`-sized parts as fit, then decompose
        // the remainder into powers of two so the full value is covered.
        if target_amount > Amount::ZERO {
            let target = target_amount.0;
            while remaining >= target {
                parts.push(Amount(target));
                remaining -= target;
            }
        }

        if remaining > 0 {
            parts.extend(Amount(remaining).split());
        }

        Ok(parts)
    }

    /// Sum an iterator of amounts, failing on overflow instead of wrapping.
    pub fn try_sum<I: IntoIterator<Item = Amount>>(iter: I) -> Result<Amount, Error> {
        iter.into_iter()
            .try_fold(Amount::ZERO, |acc, amt| acc.checked_add(amt))
    }

    /// Checked addition
    pub fn checked_add(self, rhs: Amount) -> Result<Amount, Error> {
        self.0
            .checked_add(rhs.0)
            .map(Amount)
            .ok_or(Error::AmountOverflow)
    }

    /// Checked subtraction; returns `None` on underflow rather than
    /// panicking or wrapping.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }
}

/// Target used when splitting an amount into new outputs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SplitTarget {
    /// Use the default, unconstrained power-of-two split.
    #[default]
    None,
    /// Prefer outputs of this denomination, falling back to a power-of-two
    /// split for the remainder.
    Value(Amount),
}

/// Per-keyset input fee, expressed in parts-per-thousand (ppk) per input.
///
/// A mapping used by the fee engine when several keysets are mixed in one
/// input set; missing entries are treated as a fee of zero.
pub type FeeAndAmounts = std::collections::HashMap<crate::nuts::nut02::Id, u64>;

/// Round `Σ input_fee_ppk / 1000` up to the nearest integer, per NUT-02.
pub fn fee_for_ppk_sum(total_ppk: u64) -> Amount {
    Amount(total_ppk.div_ceil(1000))
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Amount> for u64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<u64> for Amount {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<u64> for Amount {
    fn partial_cmp(&self, other: &u64) -> Option<Ordering> {
        self.0.partial_cmp(other)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl core::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Amount(iter.map(|amt| amt.0).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_amount() {
        assert_eq!(Amount::from(1).split(), vec![Amount::from(1)]);
        assert_eq!(Amount::from(2).split(), vec![Amount::from(2)]);
        assert_eq!(
            Amount::from(3).split(),
            vec![Amount::from(2), Amount::from(1)]
        );
        let amounts: Vec<Amount> = [8, 2, 1].iter().map(|a| Amount::from(*a)).collect();
        assert_eq!(Amount::from(11).split(), amounts);
        let amounts: Vec<Amount> = [128, 64, 32, 16, 8, 4, 2, 1]
            .iter()
            .map(|a| Amount::from(*a))
            .collect();
        assert_eq!(Amount::from(255).split(), amounts);
    }

    #[test]
    fn test_split_targeted_value() {
        let parts = Amount::from(100)
            .split_targeted(&SplitTarget::Value(Amount::from(10)))
            .unwrap();
        assert_eq!(parts, vec![Amount::from(10); 10]);
    }

    #[test]
    fn test_split_targeted_with_remainder() {
        let parts = Amount::from(25)
            .split_targeted(&SplitTarget::Value(Amount::from(10)))
            .unwrap();
        // Two 10s, then the 5 remainder split into powers of two (4 + 1).
        assert_eq!(
            parts,
            vec![Amount::from(10), Amount::from(10), Amount::from(4), Amount::from(1)]
        );
    }

    #[test]
    fn test_fee_math() {
        // Three inputs each with input_fee_ppk = 1000.
        let total_ppk = 1000 * 3;
        assert_eq!(fee_for_ppk_sum(total_ppk), Amount::from(3));
    }

    #[test]
    fn test_try_sum_overflow() {
        let result = Amount::try_sum([Amount::from(u64::MAX), Amount::from(1)]);
        assert!(result.is_err());
    }
}
