//! # Swarm Rebalancing
//!
//! Assigns queued nodes to storage swarms while moving as few existing
//! assignments as possible.
//!
//! ## Phases
//!
//! 1. Top up swarms below `MIN_SWARM_SIZE` from the queue.
//! 2. Steal from the largest swarm for any swarm still below the minimum.
//! 3. Hand remaining queued nodes to the smallest swarms up to `MAX_SWARM_SIZE`.
//! 4. Mint new swarms while the queue holds `MAX_SWARM_SIZE + SWARM_BUFFER` nodes.
//! 5. Report swarms that remain below the minimum.

use super::prng::{portable_shuffle, uniform_distribution_portable};
use crate::domain::{
    SwarmId, IDEAL_SWARM_SIZE, MAX_SWARM_SIZE, MIN_SWARM_SIZE, QUEUE_SWARM_ID, SWARM_BUFFER,
};
use rand_chacha::rand_core::RngCore;
use shared_types::PublicKey;
use std::collections::BTreeMap;

/// Swarm membership, queue included under `QUEUE_SWARM_ID`.
pub type SwarmMap = BTreeMap<SwarmId, Vec<PublicKey>>;

/// Rebalance `swarms` in place and return the ids of swarms left below the minimum.
///
/// Nodes still waiting afterwards stay under `QUEUE_SWARM_ID`.
pub fn calc_swarm_changes<R: RngCore>(swarms: &mut SwarmMap, rng: &mut R) -> Vec<SwarmId> {
    let mut queue = swarms.remove(&QUEUE_SWARM_ID).unwrap_or_default();
    portable_shuffle(&mut queue, rng);

    for members in swarms.values_mut() {
        while members.len() < MIN_SWARM_SIZE {
            match queue.pop() {
                Some(node) => members.push(node),
                None => break,
            }
        }
    }

    let starving: Vec<SwarmId> = swarms
        .iter()
        .filter(|(_, members)| members.len() < MIN_SWARM_SIZE)
        .map(|(id, _)| *id)
        .collect();
    for id in starving {
        while swarms.get(&id).map_or(false, |m| m.len() < MIN_SWARM_SIZE) {
            let Some(donor) = largest_donor(swarms, id) else {
                break;
            };
            let Some(node) = swarms.get_mut(&donor).map(|members| {
                let idx = uniform_distribution_portable(rng, members.len() as u64) as usize;
                members.remove(idx)
            }) else {
                break;
            };
            if let Some(members) = swarms.get_mut(&id) {
                members.push(node);
            }
        }
    }

    while !queue.is_empty() {
        let Some(id) = smallest_open_swarm(swarms) else {
            break;
        };
        if let (Some(members), Some(node)) = (swarms.get_mut(&id), queue.pop()) {
            members.push(node);
        }
    }

    while queue.len() >= MAX_SWARM_SIZE + SWARM_BUFFER {
        let new_id = fresh_swarm_id(swarms, rng);
        let donors: Vec<SwarmId> = swarms
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|(id, _)| *id)
            .collect();

        let mut new_members = Vec::with_capacity(IDEAL_SWARM_SIZE);
        for slot in 0..IDEAL_SWARM_SIZE {
            if donors.is_empty() {
                let idx = uniform_distribution_portable(rng, queue.len() as u64) as usize;
                new_members.push(queue.swap_remove(idx));
                continue;
            }
            let donor = donors[slot % donors.len()];
            if let Some(members) = swarms.get_mut(&donor) {
                let member_idx = uniform_distribution_portable(rng, members.len() as u64) as usize;
                let queue_idx = uniform_distribution_portable(rng, queue.len() as u64) as usize;
                let incoming = queue.swap_remove(queue_idx);
                new_members.push(std::mem::replace(&mut members[member_idx], incoming));
            }
        }
        tracing::debug!(swarm_id = new_id, "minted swarm");
        swarms.insert(new_id, new_members);
    }

    let decommissioned: Vec<SwarmId> = swarms
        .iter()
        .filter(|(_, members)| members.len() < MIN_SWARM_SIZE)
        .map(|(id, _)| *id)
        .collect();

    if !queue.is_empty() {
        swarms.insert(QUEUE_SWARM_ID, queue);
    }
    decommissioned
}

/// Largest swarm other than `recipient` that can give a node; ties by smallest id.
fn largest_donor(swarms: &SwarmMap, recipient: SwarmId) -> Option<SwarmId> {
    let mut best: Option<(SwarmId, usize)> = None;
    for (id, members) in swarms {
        if *id == recipient || members.len() <= MIN_SWARM_SIZE {
            continue;
        }
        if best.map_or(true, |(_, len)| members.len() > len) {
            best = Some((*id, members.len()));
        }
    }
    best.map(|(id, _)| id)
}

/// Smallest swarm below the maximum; ties by smallest id.
fn smallest_open_swarm(swarms: &SwarmMap) -> Option<SwarmId> {
    let mut best: Option<(SwarmId, usize)> = None;
    for (id, members) in swarms {
        if members.len() >= MAX_SWARM_SIZE {
            continue;
        }
        if best.map_or(true, |(_, len)| members.len() < len) {
            best = Some((*id, members.len()));
        }
    }
    best.map(|(id, _)| id)
}

fn fresh_swarm_id<R: RngCore>(swarms: &SwarmMap, rng: &mut R) -> SwarmId {
    loop {
        let id = uniform_distribution_portable(rng, u64::MAX);
        if id != QUEUE_SWARM_ID && !swarms.contains_key(&id) {
            return id;
        }
    }
}
