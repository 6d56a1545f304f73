//! Per-transaction state transitions.
//!
//! Every accepted transition pushes its undo record before mutating the
//! state. A rejected transaction leaves the state untouched.

use crate::domain::{
    get_staking_requirement, key_image_unlock_hash, portions_to_amount, registration_hash_input,
    Contributor, KeyImageBlacklistEntry, LockedContribution, NodeInfo, RollbackEvent,
    ServiceNodeError, ServiceNodeResult, StakingPolicy, MAX_KEY_IMAGES_PER_CONTRIBUTOR,
    MAX_NUMBER_OF_CONTRIBUTORS, STAKING_PORTIONS,
};
use crate::ports::CryptoProvider;
use crate::state::RegistryState;
use shared_types::{AccountAddress, NetworkType, PublicKey, Transaction, TxType};
use tracing::{debug, info};

/// Stake decoded from a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeContribution {
    /// Contributor wallet.
    pub address: AccountAddress,
    /// Sum of the qualifying outputs.
    pub transferred: u64,
    /// Outputs locked by key image.
    pub locked_contributions: Vec<LockedContribution>,
}

/// Block-wide inputs shared by every transaction of the block.
pub(crate) struct BlockContext<'a, C: CryptoProvider + ?Sized> {
    pub crypto: &'a C,
    pub policy: StakingPolicy,
    pub network: NetworkType,
    pub height: u64,
    pub timestamp: u64,
}

impl<'a, C: CryptoProvider + ?Sized> BlockContext<'a, C> {
    /// Decode the stake a transaction pays to its contributor.
    pub fn get_contribution(&self, tx: &Transaction) -> ServiceNodeResult<StakeContribution> {
        let extra = &tx.extra;
        let address = extra
            .service_node_contributor
            .ok_or(ServiceNodeError::MissingExtraField("service_node_contributor"))?;
        let tx_secret = extra
            .tx_secret_key
            .as_ref()
            .ok_or(ServiceNodeError::MissingExtraField("tx_secret_key"))?;

        if let Some(tx_public) = extra.tx_public_key {
            if self.crypto.secret_key_to_public_key(tx_secret) != Some(tx_public) {
                return Err(ServiceNodeError::InvalidKey(tx_public));
            }
        }

        let derivation = self
            .crypto
            .generate_key_derivation(&address.view_public_key, tx_secret)
            .ok_or(ServiceNodeError::InvalidKey(address.view_public_key))?;

        let mut transferred: u64 = 0;
        let mut locked_contributions = Vec::new();
        let mut used_proofs = vec![false; extra.key_image_proofs.len()];

        for (index, output) in tx.outputs.iter().enumerate() {
            let expected = self
                .crypto
                .derive_public_key(&derivation, index as u64, &address.spend_public_key)
                .ok_or(ServiceNodeError::InvalidKey(address.spend_public_key))?;
            if output.key != expected {
                continue;
            }
            if !self
                .policy
                .is_valid_stake_unlock_time(output.unlock_time, self.height)
            {
                continue;
            }

            if self.policy.uses_key_image_locking() {
                let proof = extra
                    .key_image_proofs
                    .iter()
                    .enumerate()
                    .find(|(i, proof)| {
                        !used_proofs[*i]
                            && self.crypto.check_key_image_proof(
                                &output.key,
                                &proof.key_image,
                                &proof.signature,
                            )
                    })
                    .map(|(i, proof)| (i, proof.key_image));
                let Some((proof_index, key_image)) = proof else {
                    continue;
                };
                used_proofs[proof_index] = true;
                locked_contributions.push(LockedContribution {
                    key_image_pub_key: output.key,
                    key_image,
                    amount: output.amount,
                });
            }
            transferred = transferred.saturating_add(output.amount);
        }

        Ok(StakeContribution {
            address,
            transferred,
            locked_contributions,
        })
    }

    /// Validate a registration and build the node record it creates.
    ///
    /// `Ok(None)` if the transaction is not a registration.
    pub fn registration_info(
        &self,
        tx: &Transaction,
        index: u32,
    ) -> ServiceNodeResult<Option<(PublicKey, NodeInfo)>> {
        let Some(registration) = tx.extra.service_node_register.as_ref() else {
            return Ok(None);
        };
        let key = tx
            .extra
            .service_node_pubkey
            .ok_or(ServiceNodeError::MissingExtraField("service_node_pubkey"))?;

        if registration.portions.is_empty()
            || registration.portions.len() != registration.addresses.len()
        {
            return Err(ServiceNodeError::PortionsMismatch {
                portions: registration.portions.len(),
                addresses: registration.addresses.len(),
            });
        }
        if registration.addresses.len() > MAX_NUMBER_OF_CONTRIBUTORS {
            return Err(ServiceNodeError::TooManyContributors(
                registration.addresses.len(),
            ));
        }
        if !self.policy.check_service_node_portions(&registration.portions) {
            return Err(ServiceNodeError::InvalidPortions);
        }
        if registration.portions_for_operator > STAKING_PORTIONS {
            return Err(ServiceNodeError::OperatorPortionsTooLarge(
                registration.portions_for_operator,
            ));
        }

        let hash = self.crypto.fast_hash(&registration_hash_input(
            &registration.addresses,
            registration.portions_for_operator,
            &registration.portions,
            registration.expiration_timestamp,
        ));
        if !self
            .crypto
            .check_signature(&hash, &key, &registration.signature)
        {
            return Err(ServiceNodeError::InvalidSignature);
        }
        if registration.expiration_timestamp < self.timestamp {
            return Err(ServiceNodeError::RegistrationExpired {
                expiration: registration.expiration_timestamp,
                block_timestamp: self.timestamp,
            });
        }

        let stake = self.get_contribution(tx)?;
        let staking_requirement = get_staking_requirement(self.network, self.height);
        let minimum = self
            .policy
            .min_node_contribution(staking_requirement, 0, 0);
        if stake.transferred < minimum {
            return Err(ServiceNodeError::InsufficientContribution {
                transferred: stake.transferred,
                minimum,
            });
        }

        let mut total_addresses = registration.addresses.len();
        if !registration.addresses.contains(&stake.address) {
            total_addresses += 1;
        }
        if total_addresses > MAX_NUMBER_OF_CONTRIBUTORS {
            return Err(ServiceNodeError::TooManyContributors(total_addresses));
        }

        let mut info = NodeInfo::new(
            self.policy.node_info_version(),
            self.height,
            staking_requirement,
            registration.addresses[0],
            registration.portions_for_operator,
        );
        info.last_reward_transaction_index = index;
        for (address, portions) in registration.addresses.iter().zip(&registration.portions) {
            if info.contributor_index(address).is_some() {
                return Err(ServiceNodeError::DuplicateAddress(*address));
            }
            let reserved = portions_to_amount(*portions, staking_requirement);
            info.contributors.push(Contributor::new(*address, reserved));
            info.total_reserved += reserved;
        }

        Ok(Some((key, info)))
    }

    /// Apply a registration. `Ok(false)` if the transaction is not one.
    pub fn process_registration(
        &self,
        state: &mut RegistryState,
        tx: &Transaction,
        index: u32,
    ) -> ServiceNodeResult<bool> {
        let Some((key, mut info)) = self.registration_info(tx, index)? else {
            return Ok(false);
        };

        match state.infos.get(&key) {
            Some(existing) => {
                if !self.policy.allows_reregistration(existing, self.height) {
                    return Err(ServiceNodeError::AlreadyRegistered(key));
                }
                info.last_reward_block_height = existing.last_reward_block_height;
                info.last_reward_transaction_index = existing.last_reward_transaction_index;
                state
                    .rollback_events
                    .push_back(RollbackEvent::change(self.height, key, existing));
                info!(height = self.height, key = %key, "Service node re-registered");
            }
            None => {
                state.rollback_events.push_back(RollbackEvent::New {
                    height: self.height,
                    key,
                });
                info!(height = self.height, key = %key, "New service node registered");
            }
        }
        state.infos.insert(key, info);
        Ok(true)
    }

    /// Apply a stake contribution. `Ok(false)` if the transaction is not one.
    pub fn process_contribution(
        &self,
        state: &mut RegistryState,
        tx: &Transaction,
        index: u32,
    ) -> ServiceNodeResult<bool> {
        let Some(key) = tx.extra.service_node_pubkey else {
            return Ok(false);
        };
        if tx.extra.service_node_contributor.is_none() {
            return Ok(false);
        }

        let stake = self.get_contribution(tx)?;
        let existing = state
            .infos
            .get(&key)
            .ok_or(ServiceNodeError::UnknownServiceNode(key))?;
        if existing.is_fully_funded() {
            return Err(ServiceNodeError::AlreadyFullyFunded(key));
        }
        if stake.transferred == 0 {
            return Ok(false);
        }

        let contributor_index = existing.contributor_index(&stake.address);
        if contributor_index.is_none() {
            if existing.contributors.len() >= MAX_NUMBER_OF_CONTRIBUTORS {
                return Err(ServiceNodeError::TooManyContributors(
                    existing.contributors.len() + 1,
                ));
            }
            let minimum = self.policy.min_node_contribution(
                existing.staking_requirement,
                existing.total_reserved,
                existing.total_num_locked_contributions(),
            );
            if stake.transferred < minimum {
                return Err(ServiceNodeError::InsufficientContribution {
                    transferred: stake.transferred,
                    minimum,
                });
            }
        }
        if self.policy.uses_key_image_locking() {
            let already_locked = contributor_index
                .map(|i| existing.contributors[i].locked_contributions.len())
                .unwrap_or(0);
            if already_locked + stake.locked_contributions.len() > MAX_KEY_IMAGES_PER_CONTRIBUTOR
            {
                return Err(ServiceNodeError::TooManyLockedContributions(stake.address));
            }
        }

        state
            .rollback_events
            .push_back(RollbackEvent::change(self.height, key, existing));
        let mut info = existing.clone();

        let slot = match contributor_index {
            Some(i) => i,
            None => {
                info.contributors.push(Contributor::new(stake.address, 0));
                info.contributors.len() - 1
            }
        };

        let can_increase_reserved_by = info.staking_requirement.saturating_sub(info.total_reserved);
        let contributor = &mut info.contributors[slot];
        let max_amount = contributor.reserved.saturating_add(can_increase_reserved_by);
        let transferred = stake
            .transferred
            .min(max_amount.saturating_sub(contributor.amount));

        contributor.amount += transferred;
        info.total_contributed += transferred;
        if contributor.amount > contributor.reserved {
            info.total_reserved += contributor.amount - contributor.reserved;
            contributor.reserved = contributor.amount;
        }
        if self.policy.uses_key_image_locking() {
            contributor
                .locked_contributions
                .extend(stake.locked_contributions);
        }
        info.last_reward_block_height = self.height;
        info.last_reward_transaction_index = index;

        info!(
            height = self.height,
            key = %key,
            contributor = %stake.address,
            amount = transferred,
            "Contribution received"
        );
        if info.is_fully_funded() {
            info!(height = self.height, key = %key, "Service node fully funded");
        }
        state.infos.insert(key, info);
        Ok(true)
    }

    /// Apply a quorum deregistration.
    pub fn process_deregistration(
        &self,
        state: &mut RegistryState,
        tx: &Transaction,
    ) -> ServiceNodeResult<bool> {
        if tx.tx_type != TxType::Deregister {
            return Ok(false);
        }
        let deregister = tx
            .extra
            .service_node_deregister
            .as_ref()
            .ok_or(ServiceNodeError::MissingExtraField("service_node_deregister"))?;

        let quorum = state
            .quorum_states
            .get(&deregister.block_height)
            .ok_or(ServiceNodeError::MissingQuorumState(deregister.block_height))?;
        let key = *quorum
            .nodes_to_test
            .get(deregister.service_node_index as usize)
            .ok_or(ServiceNodeError::ServiceNodeIndexOutOfBounds {
                index: deregister.service_node_index,
                len: quorum.nodes_to_test.len(),
            })?;
        let info = state
            .infos
            .get(&key)
            .cloned()
            .ok_or(ServiceNodeError::UnknownServiceNode(key))?;

        if self.policy.uses_key_image_locking() {
            let unlock_height = self.height + self.policy.lock_blocks();
            for contributor in &info.contributors {
                for locked in &contributor.locked_contributions {
                    let entry = KeyImageBlacklistEntry {
                        key_image: locked.key_image,
                        unlock_height,
                    };
                    if state.blacklist_insert(entry) {
                        state
                            .rollback_events
                            .push_back(RollbackEvent::KeyImageBlacklist {
                                height: self.height,
                                entry,
                                was_adding: true,
                            });
                    }
                }
            }
        }

        state
            .rollback_events
            .push_back(RollbackEvent::change(self.height, key, &info));
        state.infos.remove(&key);
        info!(height = self.height, key = %key, "Service node deregistered");
        Ok(true)
    }

    /// Apply a stake unlock request.
    pub fn process_unlock(&self, state: &mut RegistryState, tx: &Transaction) -> ServiceNodeResult<bool> {
        if tx.tx_type != TxType::KeyImageUnlock || !self.policy.uses_key_image_locking() {
            return Ok(false);
        }
        let key = tx
            .extra
            .service_node_pubkey
            .ok_or(ServiceNodeError::MissingExtraField("service_node_pubkey"))?;
        let unlock = tx
            .extra
            .key_image_unlock
            .as_ref()
            .ok_or(ServiceNodeError::MissingExtraField("key_image_unlock"))?;

        let info = state
            .infos
            .get(&key)
            .ok_or(ServiceNodeError::UnknownServiceNode(key))?;
        if info.is_unlocking() {
            return Err(ServiceNodeError::UnlockAlreadyRequested(key));
        }
        let locked = info
            .contributors
            .iter()
            .flat_map(|c| c.locked_contributions.iter())
            .find(|locked| locked.key_image == unlock.key_image)
            .ok_or(ServiceNodeError::KeyImageNotLocked(key))?;

        let hash = key_image_unlock_hash(unlock.nonce);
        if !self
            .crypto
            .check_signature(&hash, &locked.key_image_pub_key, &unlock.signature)
        {
            return Err(ServiceNodeError::InvalidSignature);
        }

        state.rollback_events.push_back(RollbackEvent::KeyImageUnlock {
            height: self.height,
            key,
        });
        let unlock_height = self.height + self.policy.lock_blocks() / 2;
        if let Some(info) = state.infos.get_mut(&key) {
            info.requested_unlock_height = unlock_height;
        }
        info!(height = self.height, key = %key, unlock_height, "Stake unlock requested");
        Ok(true)
    }

    /// Apply one non-coinbase transaction.
    ///
    /// Returns whether node membership changed.
    pub fn process_transaction(
        &self,
        state: &mut RegistryState,
        tx: &Transaction,
        index: u32,
    ) -> ServiceNodeResult<bool> {
        match tx.tx_type {
            TxType::Standard => {
                let registered = match self.process_registration(state, tx, index) {
                    Ok(registered) => registered,
                    Err(e) => {
                        debug!(height = self.height, tx = %tx.hash, error = %e, "Registration rejected");
                        false
                    }
                };
                if let Err(e) = self.process_contribution(state, tx, index) {
                    debug!(height = self.height, tx = %tx.hash, error = %e, "Contribution rejected");
                }
                Ok(registered)
            }
            TxType::Deregister => self.process_deregistration(state, tx),
            TxType::KeyImageUnlock => self.process_unlock(state, tx).map(|_| false),
        }
    }
}
