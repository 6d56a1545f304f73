//! # Node Lifecycle
//!
//! Registration through expiry as seen by both the registry and a quorum
//! cop following the same chain.

#[cfg(test)]
mod tests {
    use crate::integration::{Network, NOW};
    use shared_types::{PublicKey, ValidateMinerTxHook, COIN, HF_VERSION_INFINITE_STAKING};
    use sn_01_service_node_list::domain::STAKING_PORTIONS;
    use sn_01_service_node_list::testing::{
        contribution_tx, registration_tx, unlock_tx, Registration, TestChain, TestWallet,
        REWARD_PARTS,
    };
    use sn_01_service_node_list::{NodeListFilter, ServiceNodeListApi};
    use sn_02_quorum_cop::{QuorumCopApi, QuorumCopError};

    #[test]
    fn test_solo_node_from_registration_to_expiry() {
        let mut net = Network::new(HF_VERSION_INFINITE_STAKING);
        net.add_empty_blocks(1);

        let operator = TestWallet::from_seed(1);
        let stake = net.chain.register_solo(&operator);
        let key = operator.node_keys().public_key;
        net.start_cop(operator.node_keys());

        // The cop hears its own announcement once the registry knows the node.
        net.gossip_uptime_proofs();
        let cop = net.cop(&key).unwrap();
        assert_eq!(cop.last_uptime_proof(&key), Some(NOW));

        // Sole funded node: it wins the next block and its coinbase validates.
        assert_eq!(net.chain.list.winner(), key);
        let block = net.chain.make_block(&[], 0);
        assert!(net.chain.list.validate_miner_tx(
            &block.prev_hash,
            &block.miner_tx,
            block.height,
            block.major_version,
            &REWARD_PARTS,
        ));
        assert_eq!(block.miner_tx.outputs[1].amount, REWARD_PARTS.service_node_total);

        let unlock_height = net.chain.height();
        net.add_block(vec![unlock_tx(&key, &stake.locked[0], 1)]);
        let requested = net.chain.list.snapshot().infos[&key].requested_unlock_height;
        assert_eq!(requested, unlock_height + 15);

        while net.chain.height() <= requested {
            net.add_block(Vec::new());
        }
        assert!(net.chain.list.is_service_node(&key));

        net.add_block(Vec::new());
        assert!(!net.chain.list.is_service_node(&key));
        assert_eq!(net.chain.list.winner(), PublicKey::NULL);
        assert_eq!(net.chain.list.is_key_image_locked(&stake.locked[0].key_image), None);

        // An expired node can no longer announce itself.
        net.clock.set(NOW + 3_600);
        let proof = cop.generate_uptime_proof().unwrap();
        assert_eq!(
            cop.handle_uptime_proof(&proof),
            Err(QuorumCopError::UnknownServiceNode(key))
        );
    }

    #[test]
    fn test_shared_node_pays_both_contributors() {
        let net = Network::new(HF_VERSION_INFINITE_STAKING);
        net.add_empty_blocks(1);

        let operator = TestWallet::from_seed(1);
        let friend = TestWallet::from_seed(2);
        let key = operator.node_keys().public_key;
        let half = 50 * COIN;

        let height = net.chain.height();
        let registration = Registration::with_shares(
            &operator,
            &[(operator.address, STAKING_PORTIONS / 2)],
            TestChain::timestamp(height) + 3_600,
        );
        net.add_block(vec![
            registration_tx(&registration, net.chain.policy(), height, half).tx,
        ]);

        // Half funded: listed, but neither rewarded nor tested.
        assert!(net.chain.list.is_service_node(&key));
        assert_eq!(net.chain.list.winner(), PublicKey::NULL);
        let funded = NodeListFilter {
            fully_funded_only: true,
            ..NodeListFilter::default()
        };
        assert!(net.chain.list.service_node_list_state(&funded).is_empty());

        let height = net.chain.height();
        net.add_block(vec![
            contribution_tx(&friend, &key, net.chain.policy(), height, half).tx,
        ]);

        let info = net.chain.list.snapshot().infos[&key].clone();
        assert!(info.is_fully_funded());
        assert!(info.check_invariants().is_ok());
        assert_eq!(info.contributors.len(), 2);
        assert_eq!(net.chain.list.service_node_list_state(&funded).len(), 1);

        assert_eq!(net.chain.list.winner(), key);
        let payouts = net.chain.list.winner_addresses_and_portions();
        assert_eq!(payouts.len(), 2);
        assert_eq!(payouts[0].0, operator.address);
        assert_eq!(payouts[1].0, friend.address);
        assert_eq!(payouts[0].1, payouts[1].1);
        assert!(payouts[0].1 + payouts[1].1 <= STAKING_PORTIONS);

        // The coinbase paying both validates.
        let block = net.chain.make_block(&[], 0);
        assert!(net.chain.list.validate_miner_tx(
            &block.prev_hash,
            &block.miner_tx,
            block.height,
            block.major_version,
            &REWARD_PARTS,
        ));
        assert_eq!(block.miner_tx.outputs.len(), 3);
    }
}
