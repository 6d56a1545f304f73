//! Read side of the list: the query API and miner tx validation.

use super::command::build_registration_cmd;
use super::ServiceNodeList;
use crate::algorithms::{select_winner, winner_addresses_and_portions};
use crate::domain::{
    get_staking_requirement, portions_to_amount, KeyImageBlacklistEntry, NodeListFilter,
    OwnStatus, QuorumState, RegistrationCmdError, ServiceNodeError, ServiceNodePubkeyInfo,
    ServiceNodeResult, StakingEra, StakingPolicy, DEREGISTER_TX_LIFETIME_BY_HEIGHT,
};
use crate::ports::{BlockchainReader, CryptoProvider, ServiceNodeListApi, ServiceNodeStore};
use crate::validation::verify_deregister;
use shared_types::{
    AccountAddress, BlockRewardParts, Hash, KeyImage, PublicKey, Transaction,
    ValidateMinerTxHook, HF_VERSION_SERVICE_NODES,
};
use tracing::{debug, warn};

impl<B, C, S> ServiceNodeListApi for ServiceNodeList<B, C, S>
where
    B: BlockchainReader,
    C: CryptoProvider,
    S: ServiceNodeStore,
{
    fn height(&self) -> u64 {
        self.read_state(|state| state.height)
    }

    fn service_node_list_state(&self, filter: &NodeListFilter) -> Vec<ServiceNodePubkeyInfo> {
        self.read_state(|state| {
            state
                .infos
                .iter()
                .filter(|(key, _)| filter.pubkeys.is_empty() || filter.pubkeys.contains(key))
                .filter(|(_, info)| !filter.fully_funded_only || info.is_fully_funded())
                .map(|(key, info)| ServiceNodePubkeyInfo {
                    pubkey: *key,
                    info: info.clone(),
                })
                .collect()
        })
    }

    fn quorum_state(&self, height: u64) -> Option<QuorumState> {
        self.read_state(|state| state.quorum_states.get(&height).cloned())
    }

    fn quorum_states(&self, start: u64, end: u64) -> Vec<(u64, QuorumState)> {
        if start > end {
            return Vec::new();
        }
        self.read_state(|state| {
            state
                .quorum_states
                .range(start..=end)
                .map(|(height, quorum)| (*height, quorum.clone()))
                .collect()
        })
    }

    fn key_image_blacklist(&self) -> Vec<KeyImageBlacklistEntry> {
        self.read_state(|state| state.key_image_blacklist.clone())
    }

    fn is_service_node(&self, pubkey: &PublicKey) -> bool {
        self.read_state(|state| state.infos.contains_key(pubkey))
    }

    fn own_status(&self) -> Option<OwnStatus> {
        let keys = self.keys.as_ref()?;
        let info = self.read_state(|state| state.infos.get(&keys.public_key).cloned());
        Some(OwnStatus {
            pubkey: keys.public_key,
            info,
        })
    }

    fn staking_requirement(&self, height: u64) -> u64 {
        get_staking_requirement(self.config.network_type, height)
    }

    fn winner(&self) -> PublicKey {
        self.read_state(|state| select_winner(&state.infos))
    }

    fn winner_addresses_and_portions(&self) -> Vec<(AccountAddress, u64)> {
        self.read_state(|state| {
            let winner = select_winner(&state.infos);
            winner_addresses_and_portions(&state.infos, &winner)
        })
    }

    fn is_key_image_locked(&self, key_image: &KeyImage) -> Option<u64> {
        self.read_state(|state| {
            if let Some(entry) = state
                .key_image_blacklist
                .iter()
                .find(|entry| &entry.key_image == key_image)
            {
                return Some(entry.unlock_height);
            }
            state.infos.values().find_map(|info| {
                info.contributors
                    .iter()
                    .flat_map(|c| c.locked_contributions.iter())
                    .any(|locked| &locked.key_image == key_image)
                    .then_some(info.requested_unlock_height)
            })
        })
    }

    fn check_deregister_tx(&self, tx: &Transaction, current_height: u64) -> ServiceNodeResult<()> {
        let deregister = tx
            .extra
            .service_node_deregister
            .as_ref()
            .ok_or(ServiceNodeError::MissingExtraField("service_node_deregister"))?;

        let height = deregister.block_height;
        if height >= current_height || current_height - height >= DEREGISTER_TX_LIFETIME_BY_HEIGHT {
            return Err(ServiceNodeError::DeregisterOutOfWindow {
                height,
                current: current_height,
            });
        }

        let quorum = self
            .quorum_state(height)
            .ok_or(ServiceNodeError::MissingQuorumState(height))?;
        verify_deregister(&*self.crypto, deregister, &quorum)
    }

    fn make_registration_cmd(
        &self,
        args: &[String],
        make_friendly: bool,
    ) -> Result<String, RegistrationCmdError> {
        let keys = self
            .keys
            .as_ref()
            .ok_or(RegistrationCmdError::NoServiceNodeKeys)?;
        let height = self.blockchain.current_height();
        let network = self.config.network_type;
        let policy = StakingPolicy::for_version(self.blockchain.hard_fork_version(height), network)
            .unwrap_or_else(|| StakingPolicy::for_era(StakingEra::Legacy, network));
        build_registration_cmd(
            &*self.crypto,
            keys,
            policy,
            self.time_source.now(),
            args,
            make_friendly,
        )
    }
}

impl<B, C, S> ValidateMinerTxHook for ServiceNodeList<B, C, S>
where
    B: BlockchainReader,
    C: CryptoProvider,
    S: ServiceNodeStore,
{
    fn validate_miner_tx(
        &self,
        _prev_id: &Hash,
        miner_tx: &Transaction,
        height: u64,
        hf_version: u8,
        reward_parts: &BlockRewardParts,
    ) -> bool {
        if hf_version < HF_VERSION_SERVICE_NODES {
            return true;
        }

        let (winner, payouts) = self.read_state(|state| {
            let winner = select_winner(&state.infos);
            (winner, winner_addresses_and_portions(&state.infos, &winner))
        });

        let named = miner_tx.extra.service_node_winner.unwrap_or(PublicKey::NULL);
        if named != winner {
            warn!(height, named = %named, expected = %winner, "Miner tx pays the wrong service node");
            return false;
        }
        if miner_tx.outputs.len() < payouts.len() + 1 {
            warn!(
                height,
                outputs = miner_tx.outputs.len(),
                payees = payouts.len(),
                "Miner tx has too few outputs"
            );
            return false;
        }

        let (_, deterministic_secret) = self.crypto.deterministic_keypair(height);
        for (i, (address, portions)) in payouts.iter().enumerate() {
            let output_index = i + 1;
            let output = &miner_tx.outputs[output_index];
            let expected_amount = portions_to_amount(*portions, reward_parts.service_node_total);
            if output.amount != expected_amount {
                warn!(
                    height,
                    output_index,
                    amount = output.amount,
                    expected = expected_amount,
                    "Service node reward amount mismatch"
                );
                return false;
            }

            let expected_key = self
                .crypto
                .generate_key_derivation(&address.view_public_key, &deterministic_secret)
                .and_then(|derivation| {
                    self.crypto.derive_public_key(
                        &derivation,
                        output_index as u64,
                        &address.spend_public_key,
                    )
                });
            match expected_key {
                Some(key) if key == output.key => {}
                Some(_) => {
                    warn!(height, output_index, "Service node reward paid to the wrong key");
                    return false;
                }
                None => {
                    debug!(height, address = %address, "Payee address has invalid keys");
                    return false;
                }
            }
        }
        true
    }
}
