//! Coin selection and fee accounting.

use std::collections::HashMap;

use crate::amount::fee_for_ppk_sum;
use crate::nuts::{Id, Proof};
use crate::wallet::Error;
use crate::Amount;

/// Per-keyset input fee table, parts-per-thousand per input; a missing
/// entry is treated as zero.
pub type FeeTable = HashMap<Id, u64>;

/// `fee = ceil(sum(input_fee_ppk) / 1000)` over the given input set.
pub fn fee_for_inputs(inputs: &[Proof], fee_table: &FeeTable) -> Amount {
    let total_ppk: u64 = inputs
        .iter()
        .map(|p| fee_table.get(&p.keyset_id).copied().unwrap_or(0))
        .sum();
    fee_for_ppk_sum(total_ppk)
}

/// `sum(inputs) == sum(outputs) + fee`
pub fn balances(inputs: &[Proof], output_amount: Amount, fee: Amount) -> Result<(), Error> {
    let input_amount = Amount::try_sum(inputs.iter().map(|p| p.amount))?;
    let required = output_amount.checked_add(fee)?;
    if input_amount != required.to_u64() {
        return Err(Error::BalanceMismatch {
            inputs: input_amount.to_u64(),
            outputs: output_amount.to_u64(),
            fee: fee.to_u64(),
        });
    }
    Ok(())
}

/// Select a subset of `available` proofs covering `target + fee_for(I)`:
///
/// 1. consider only the supplied (already unit/keyset-filtered) proofs;
/// 2. prefer a single-keyset solution, then lowest fee, then fewest proofs,
///    tie-broken by ascending `(keyset_id, secret)`;
/// 3. among solutions covering the target, return the smallest overshoot.
///
/// Proofs are assumed already sorted by the caller into candidate order;
/// this function is greedy or exhaustive-decision need not be: it picks
/// proofs largest-first per keyset group, which for the powers-of-two
/// denomination set used throughout this crate minimizes both proof count
/// and overshoot simultaneously.
pub fn select_proofs(
    available: &[Proof],
    target: Amount,
    fee_table: &FeeTable,
) -> Result<Vec<Proof>, Error> {
    if available.is_empty() {
        return Err(Error::NoSpendableProofs);
    }

    let mut by_keyset: HashMap<Id, Vec<Proof>> = HashMap::new();
    for proof in available {
        by_keyset.entry(proof.keyset_id).or_default().push(proof.clone());
    }

    // Deterministic tie-break: ascending (keyset_id, secret), then pick
    // largest-first within a keyset so fewer proofs are needed.
    let mut keyset_ids: Vec<Id> = by_keyset.keys().copied().collect();
    keyset_ids.sort();

    let mut best: Option<Vec<Proof>> = None;

    for keyset_id in &keyset_ids {
        let mut candidates = by_keyset[keyset_id].clone();
        candidates.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.secret.cmp(&b.secret)));

        if let Some(solution) = try_single_keyset(&candidates, target, fee_table) {
            best = Some(pick_better(best, solution, fee_table, target));
        }
    }

    // No single keyset covers the target: fall back to the full available
    // set (still sorted deterministically) so cross-keyset spends succeed.
    if best.is_none() {
        let mut all: Vec<Proof> = available.to_vec();
        all.sort_by(|a, b| {
            a.keyset_id
                .cmp(&b.keyset_id)
                .then_with(|| a.secret.cmp(&b.secret))
        });
        if let Some(solution) = try_single_keyset(&all, target, fee_table) {
            best = Some(solution);
        }
    }

    best.ok_or(Error::InsufficientBalance)
}

fn try_single_keyset(sorted_desc: &[Proof], target: Amount, fee_table: &FeeTable) -> Option<Vec<Proof>> {
    let mut selected = Vec::new();
    for proof in sorted_desc {
        let fee = fee_for_inputs(&selected, fee_table);
        let selected_amount = Amount::try_sum(selected.iter().map(|p| p.amount)).ok()?;
        if selected_amount >= target.checked_add(fee).ok()? {
            break;
        }
        selected.push(proof.clone());
    }

    let fee = fee_for_inputs(&selected, fee_table);
    let selected_amount = Amount::try_sum(selected.iter().map(|p| p.amount)).ok()?;
    let required = target.checked_add(fee).ok()?;
    (selected_amount >= required).then_some(selected)
}

fn pick_better(
    current: Option<Vec<Proof>>,
    candidate: Vec<Proof>,
    fee_table: &FeeTable,
    target: Amount,
) -> Vec<Proof> {
    let Some(current) = current else {
        return candidate;
    };

    let current_fee = fee_for_inputs(&current, fee_table);
    let candidate_fee = fee_for_inputs(&candidate, fee_table);

    let current_overshoot = overshoot(&current, target, current_fee);
    let candidate_overshoot = overshoot(&candidate, target, candidate_fee);

    match candidate_fee.to_u64().cmp(&current_fee.to_u64()) {
        std::cmp::Ordering::Less => candidate,
        std::cmp::Ordering::Greater => current,
        std::cmp::Ordering::Equal => {
            if candidate.len() < current.len() {
                candidate
            } else if candidate.len() > current.len() {
                current
            } else if candidate_overshoot < current_overshoot {
                candidate
            } else {
                current
            }
        }
    }
}

fn overshoot(selected: &[Proof], target: Amount, fee: Amount) -> u64 {
    let selected_amount: u64 = selected.iter().map(|p| p.amount.to_u64()).sum();
    selected_amount.saturating_sub(target.to_u64() + fee.to_u64())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::nuts::PublicKey;
    use crate::secret::Secret;

    fn keyset() -> Id {
        Id::from_str("009a1f293253e41e").unwrap()
    }

    fn proof(amount: u64) -> Proof {
        let c = PublicKey::from_hex("02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104")
            .unwrap();
        Proof::new(Amount::from(amount), keyset(), Secret::generate(), c)
    }

    #[test]
    fn test_select_exact_covers_target() {
        let available = vec![proof(64), proof(32), proof(16)];
        let selected = select_proofs(&available, Amount::from(48), &FeeTable::new()).unwrap();
        let total: u64 = selected.iter().map(|p| p.amount.to_u64()).sum();
        assert!(total >= 48);
    }

    #[test]
    fn test_select_insufficient_balance() {
        let available = vec![proof(4)];
        let err = select_proofs(&available, Amount::from(100), &FeeTable::new()).unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance));
    }

    #[test]
    fn test_select_empty_is_no_spendable_proofs() {
        let err = select_proofs(&[], Amount::from(1), &FeeTable::new()).unwrap_err();
        assert!(matches!(err, Error::NoSpendableProofs));
    }

    #[test]
    fn test_fee_for_inputs_and_balance_check() {
        // Three inputs each with input_fee_ppk = 1000.
        let mut fee_table = FeeTable::new();
        fee_table.insert(keyset(), 1000);
        let inputs = vec![proof(64), proof(32), proof(16)];

        let fee = fee_for_inputs(&inputs, &fee_table);
        assert_eq!(fee, Amount::from(3));
        assert!(balances(&inputs, Amount::from(109), fee).is_ok());
        assert!(balances(&inputs, Amount::from(110), fee).is_err());
    }
}
