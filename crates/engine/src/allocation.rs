//! Allocation rules: how egg production and its cash equivalent are divided.
//!
//! Everything here is pure and works on snapshots, so the same rules serve
//! the ledger fold and the write operations.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::{EggRecord, EngineError, Family, Investor, MoneyCents, ResultEngine};

/// Eggs each family gets from a batch: `floor(quantity / family_count)`.
///
/// A batch produced with no families allocates nothing.
pub fn per_family_share(quantity: i64, family_count: i64) -> i64 {
    if family_count <= 0 || quantity <= 0 {
        return 0;
    }
    quantity / family_count
}

/// Eggs a family actually received.
///
/// Sums the frozen per-family share of every batch whose delivery to the
/// family is `Delivered`. When no batch carries any delivery entry (records
/// created before deliveries were tracked) the share is approximated as
/// `total_eggs / family_count`.
pub fn family_egg_share(eggs: &[EggRecord], family_id: &str, family_count: usize) -> i64 {
    let tracked = eggs.iter().any(|egg| !egg.deliveries.is_empty());
    if !tracked {
        let total: i64 = eggs.iter().map(|egg| egg.quantity).sum();
        return per_family_share(total, family_count as i64);
    }

    eggs.iter()
        .filter(|egg| {
            egg.deliveries
                .get(family_id)
                .is_some_and(|delivery| delivery.is_delivered())
        })
        .map(EggRecord::per_family_share)
        .sum()
}

/// Cash equivalent of a rejected share at the given price per egg.
pub fn rejected_cash_value(share: i64, egg_price: MoneyCents) -> ResultEngine<MoneyCents> {
    egg_price
        .checked_mul(share)
        .ok_or_else(|| EngineError::InvalidAmount("cash value too large".to_string()))
}

/// Splits a cash value equally among family members.
///
/// Shares sum exactly to `cash_value`; leftover cents go to the first
/// members in the order they were assigned.
pub fn split_among_members(cash_value: MoneyCents, members: &[Uuid]) -> Vec<(Uuid, MoneyCents)> {
    members
        .iter()
        .copied()
        .zip(cash_value.split_even(members.len()))
        .collect()
}

/// Validates a complete family list against the known investors.
///
/// - names must not be empty and ids must be unique
/// - each family has exactly `member_count` assigned investors
/// - every assigned investor exists
/// - no investor belongs to two families
pub fn validate_families(families: &[Family], investors: &[Investor]) -> ResultEngine<()> {
    let known: HashSet<Uuid> = investors.iter().map(|i| i.id).collect();
    let mut family_ids = HashSet::new();
    let mut assigned: HashMap<Uuid, &str> = HashMap::new();

    for family in families {
        if family.id.trim().is_empty() || family.name.trim().is_empty() {
            return Err(EngineError::InvalidName(
                "family id and name must not be empty".to_string(),
            ));
        }
        if !family_ids.insert(family.id.as_str()) {
            return Err(EngineError::ExistingKey(family.id.clone()));
        }
        if family.investor_ids.len() != family.member_count {
            return Err(EngineError::MemberCountMismatch(format!(
                "family '{}' expects {} members, got {}",
                family.name,
                family.member_count,
                family.investor_ids.len()
            )));
        }
        for investor_id in &family.investor_ids {
            if !known.contains(investor_id) {
                return Err(EngineError::KeyNotFound(format!(
                    "investor {investor_id} not exists"
                )));
            }
            if let Some(other) = assigned.insert(*investor_id, family.name.as_str()) {
                return Err(EngineError::InvalidPayload(format!(
                    "investor {investor_id} already belongs to family '{other}'"
                )));
            }
        }
    }
    Ok(())
}

/// Investors that can still be picked for `family_id`: those not assigned to
/// any other family.
pub fn selectable_investors<'a>(
    families: &[Family],
    family_id: Option<&str>,
    investors: &'a [Investor],
) -> Vec<&'a Investor> {
    let taken: HashSet<Uuid> = families
        .iter()
        .filter(|family| Some(family.id.as_str()) != family_id)
        .flat_map(|family| family.investor_ids.iter().copied())
        .collect();
    investors
        .iter()
        .filter(|investor| !taken.contains(&investor.id))
        .collect()
}
