//! Block ingestion.
//!
//! Applies one block to the registry state: pruning, expiries, reward
//! rotation, transactions, swarms and the quorum for the block's height.

use super::transactions::BlockContext;
use crate::algorithms::{calc_swarm_changes, generate_quorum_state, rng_from_hash, SwarmMap};
use crate::domain::{
    invariant_quorum_membership, RollbackEvent, ServiceNodeError, ServiceNodeResult,
    QUORUM_LIFETIME,
};
use crate::ports::CryptoProvider;
use crate::state::RegistryState;
use shared_types::{Block, Hash, PublicKey, Transaction};
use tracing::{debug, error, info, warn};

impl<'a, C: CryptoProvider + ?Sized> BlockContext<'a, C> {
    /// Apply `block` on top of `state`.
    ///
    /// Transaction errors are logged and skipped. The first inconsistent-state
    /// error, or an invariant violation, is returned after the whole block
    /// has been applied.
    pub fn process_block(
        &self,
        state: &mut RegistryState,
        block: &Block,
        txs: &[Transaction],
        check_invariants: bool,
    ) -> ServiceNodeResult<()> {
        if block.height != state.height {
            return Err(ServiceNodeError::HeightMismatch {
                expected: state.height,
                actual: block.height,
            });
        }
        let height = block.height;
        state.height += 1;
        state.cull_rollback_events(height);

        if self.policy.uses_key_image_locking() {
            self.expire_blacklist(state);
        }
        let mut membership_changed = self.expire_nodes(state);
        if let Some(winner) = block.miner_tx.extra.service_node_winner {
            self.rotate_winner(state, &winner);
        }

        let mut failure = None;
        for (index, tx) in txs.iter().enumerate() {
            match self.process_transaction(state, tx, index as u32) {
                Ok(changed) => membership_changed |= changed,
                Err(e) if e.is_inconsistent_state() => {
                    error!(height, tx = %tx.hash, error = %e, "Inconsistent service node state");
                    failure.get_or_insert(e);
                }
                Err(e) => debug!(height, tx = %tx.hash, error = %e, "Transaction rejected"),
            }
        }

        if membership_changed {
            update_swarms(state, height, &block.hash);
        }

        let quorum = generate_quorum_state(&state.infos, &block.hash);
        if check_invariants {
            // The quorum is cached regardless; the block is already committed.
            let violation = invariant_quorum_membership(&quorum, &state.infos)
                .and_then(|()| state.infos.values().try_for_each(|info| info.check_invariants()));
            if let Err(e) = violation {
                error!(height, error = %e, "Service node invariant violated");
                failure.get_or_insert(e);
            }
        }
        state.quorum_states.insert(height, quorum);
        if height >= QUORUM_LIFETIME {
            state.quorum_states = state.quorum_states.split_off(&(height - QUORUM_LIFETIME));
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn expire_blacklist(&self, state: &mut RegistryState) {
        let expired: Vec<_> = state
            .key_image_blacklist
            .iter()
            .filter(|entry| self.height >= entry.unlock_height)
            .copied()
            .collect();
        for entry in expired {
            state.blacklist_remove(&entry);
            state
                .rollback_events
                .push_back(RollbackEvent::KeyImageBlacklist {
                    height: self.height,
                    entry,
                    was_adding: false,
                });
        }
    }

    fn expire_nodes(&self, state: &mut RegistryState) -> bool {
        let expired: Vec<PublicKey> = state
            .infos
            .iter()
            .filter(|(_, info)| self.policy.is_expired(info, self.height))
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            if let Some(info) = state.infos.remove(key) {
                state
                    .rollback_events
                    .push_back(RollbackEvent::change(self.height, *key, &info));
                info!(height = self.height, key = %key, "Service node expired");
            }
        }
        !expired.is_empty()
    }

    fn rotate_winner(&self, state: &mut RegistryState, winner: &PublicKey) {
        let Some(info) = state.infos.get_mut(winner) else {
            return;
        };
        state
            .rollback_events
            .push_back(RollbackEvent::change(self.height, *winner, info));
        info.last_reward_block_height = self.height;
        info.last_reward_transaction_index = u32::MAX;
    }
}

/// Rebalance swarms and record every reassignment.
fn update_swarms(state: &mut RegistryState, height: u64, block_hash: &Hash) {
    let mut swarms = SwarmMap::new();
    for (key, info) in &state.infos {
        swarms.entry(info.swarm_id).or_default().push(*key);
    }

    let mut rng = rng_from_hash(block_hash);
    for swarm_id in calc_swarm_changes(&mut swarms, &mut rng) {
        warn!(height, swarm_id, "Swarm below minimum size, decommissioned");
    }

    for (swarm_id, members) in swarms {
        for key in members {
            let Some(info) = state.infos.get_mut(&key) else {
                continue;
            };
            if info.swarm_id == swarm_id {
                continue;
            }
            state
                .rollback_events
                .push_back(RollbackEvent::change(height, key, info));
            info.swarm_id = swarm_id;
        }
    }
}
