//! # Block Reward Winner
//!
//! The fully funded node that has waited longest since its last reward is
//! paid next; its reward is split over contributors by stake.

use crate::domain::{NodeInfo, STAKING_PORTIONS};
use shared_types::{AccountAddress, PublicKey};
use std::collections::BTreeMap;

/// Node with the smallest `(last_reward_block_height, last_reward_transaction_index)`.
///
/// Ties go to the smaller key. `PublicKey::NULL` if no node is fully funded.
pub fn select_winner(infos: &BTreeMap<PublicKey, NodeInfo>) -> PublicKey {
    infos
        .iter()
        .filter(|(_, info)| info.is_fully_funded())
        .min_by_key(|(_, info)| {
            (
                info.last_reward_block_height,
                info.last_reward_transaction_index,
            )
        })
        .map(|(key, _)| *key)
        .unwrap_or(PublicKey::NULL)
}

/// Payees of the winner's reward and their shares in portions.
///
/// Each contributor receives `amount * (STAKING_PORTIONS - operator cut) /
/// staking_requirement`; the operator additionally receives the cut.
/// Without a winner the whole reward goes to `AccountAddress::NULL`.
pub fn winner_addresses_and_portions(
    infos: &BTreeMap<PublicKey, NodeInfo>,
    winner: &PublicKey,
) -> Vec<(AccountAddress, u64)> {
    let info = match infos.get(winner) {
        Some(info) if info.staking_requirement > 0 => info,
        _ => return vec![(AccountAddress::NULL, STAKING_PORTIONS)],
    };

    let remaining_portions = STAKING_PORTIONS.saturating_sub(info.portions_for_operator) as u128;
    info.contributors
        .iter()
        .map(|contributor| {
            let mut portions = (contributor.amount as u128 * remaining_portions
                / info.staking_requirement as u128) as u64;
            if contributor.address == info.operator_address {
                portions = portions.saturating_add(info.portions_for_operator);
            }
            (contributor.address, portions)
        })
        .collect()
}
