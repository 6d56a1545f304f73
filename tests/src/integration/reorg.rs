//! # Reorg Equivalence
//!
//! Whatever path the registry took to a block, its state must equal a
//! registry rebuilt from scratch over the same chain, and popping then
//! replaying the same blocks must leave it untouched.

#[cfg(test)]
mod tests {
    use crate::integration::init_tracing;
    use shared_types::{DeregisterVoteEntry, Transaction, COIN, HF_VERSION_INFINITE_STAKING};
    use sn_01_service_node_list::adapters::InMemoryKVStore;
    use sn_01_service_node_list::domain::STAKING_PORTIONS;
    use sn_01_service_node_list::testing::{
        contribution_tx, deregister_tx, registration_tx, sign_vote, unlock_tx, Registration,
        StakeTx, TestChain, TestWallet,
    };
    use sn_01_service_node_list::{NodeListFilter, RegistryState, ServiceNodeListApi};
    use std::sync::Arc;

    fn assert_same(actual: &RegistryState, expected: &RegistryState) {
        assert_eq!(actual.height, expected.height);
        assert_eq!(actual.infos, expected.infos);
        assert_eq!(actual.quorum_states, expected.quorum_states);
        assert_eq!(actual.key_image_blacklist, expected.key_image_blacklist);
    }

    fn rebuilt(chain: &TestChain) -> RegistryState {
        let list = TestChain::list_for(&chain.blockchain, &Arc::new(InMemoryKVStore::new()), None);
        list.init();
        list.snapshot()
    }

    fn node_count(chain: &TestChain) -> usize {
        chain
            .list
            .service_node_list_state(&NodeListFilter::default())
            .len()
    }

    /// Deregistration of candidate `index` at `height` signed by the first
    /// seven voters.
    fn deregistration(
        chain: &TestChain,
        wallets: &[TestWallet],
        height: u64,
        index: u32,
    ) -> Transaction {
        let quorum = chain.list.quorum_state(height).unwrap();
        let votes = quorum
            .quorum_nodes
            .iter()
            .take(7)
            .enumerate()
            .map(|(voter, key)| {
                let wallet = wallets
                    .iter()
                    .find(|w| w.node_keys().public_key == *key)
                    .unwrap();
                let vote = sign_vote(&wallet.node_keys(), height, index, voter as u32);
                DeregisterVoteEntry {
                    voters_quorum_index: vote.voters_quorum_index,
                    signature: vote.signature,
                }
            })
            .collect();
        deregister_tx(height, index, votes)
    }

    struct Busy {
        chain: TestChain,
        wallets: Vec<TestWallet>,
        first_stake: StakeTx,
        shared_node: TestWallet,
    }

    /// Twelve funded nodes plus one waiting for a contributor.
    fn busy_chain() -> Busy {
        init_tracing();
        let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
        chain.add_empty_blocks(1);

        let first = TestWallet::from_seed(1);
        let first_stake = chain.register_solo(&first);

        let height = chain.height();
        let requirement = chain.list.staking_requirement(height);
        let mut wallets = vec![first];
        wallets.extend((2..=12).map(TestWallet::from_seed));
        let txs = wallets[1..]
            .iter()
            .map(|wallet| {
                let registration =
                    Registration::solo(wallet, TestChain::timestamp(height) + 3_600);
                registration_tx(&registration, chain.policy(), height, requirement).tx
            })
            .collect();
        chain.add_block(txs);

        let shared_node = TestWallet::from_seed(13);
        let height = chain.height();
        let registration = Registration::with_shares(
            &shared_node,
            &[(shared_node.address, STAKING_PORTIONS / 2)],
            TestChain::timestamp(height) + 3_600,
        );
        chain.add_block(vec![
            registration_tx(&registration, chain.policy(), height, requirement / 2).tx,
        ]);
        chain.add_empty_blocks(1);
        assert_eq!(node_count(&chain), 13);

        Busy {
            chain,
            wallets,
            first_stake,
            shared_node,
        }
    }

    #[test]
    fn test_shallow_reorg_then_fork_matches_rebuild() {
        let Busy {
            chain,
            wallets,
            first_stake,
            shared_node,
        } = busy_chain();
        let shared_key = shared_node.node_keys().public_key;
        let first_key = wallets[0].node_keys().public_key;
        let fork_point = chain.height();
        let before = chain.list.snapshot();

        // Funding, an unlock request and a deregistration.
        let height = chain.height();
        let friend = TestWallet::from_seed(14);
        chain.add_block(vec![
            contribution_tx(&friend, &shared_key, chain.policy(), height, 50 * COIN).tx,
        ]);
        chain.add_block(vec![unlock_tx(&first_key, &first_stake.locked[0], 1)]);
        chain.add_block(vec![deregistration(&chain, &wallets, 2, 0)]);
        chain.add_empty_blocks(2);
        assert_eq!(node_count(&chain), 12);
        assert!(chain.list.snapshot().infos[&shared_key].is_fully_funded());
        assert!(!chain.list.key_image_blacklist().is_empty());

        chain.detach(fork_point);
        assert_same(&chain.list.snapshot(), &before);
        assert!(!chain.list.snapshot().infos[&shared_key].is_fully_funded());

        // A competing branch deregisters the other candidate instead.
        chain.add_block_with_salt(vec![deregistration(&chain, &wallets, 2, 1)], 5);
        chain.add_block_with_salt(Vec::new(), 5);
        assert_eq!(node_count(&chain), 12);
        assert_same(&chain.list.snapshot(), &rebuilt(&chain));
    }

    #[test]
    fn test_reorg_past_undo_horizon_matches_rebuild() {
        let Busy {
            chain,
            shared_node,
            ..
        } = busy_chain();
        let shared_key = shared_node.node_keys().public_key;

        let height = chain.height();
        let friend = TestWallet::from_seed(14);
        chain.add_block(vec![
            contribution_tx(&friend, &shared_key, chain.policy(), height, 50 * COIN).tx,
        ]);
        chain.add_empty_blocks(40);
        let fork_point = height + 2;

        chain.detach(fork_point);
        assert_eq!(chain.list.height(), fork_point);
        assert!(chain.list.snapshot().infos[&shared_key].is_fully_funded());
        assert_same(&chain.list.snapshot(), &rebuilt(&chain));

        chain.add_block_with_salt(Vec::new(), 9);
        assert_same(&chain.list.snapshot(), &rebuilt(&chain));
    }

    #[test]
    fn test_detach_and_replay_is_idempotent_at_every_height() {
        init_tracing();
        let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
        chain.add_empty_blocks(1);

        let first = TestWallet::from_seed(1);
        let first_stake = chain.register_solo(&first);
        let height = chain.height();
        let requirement = chain.list.staking_requirement(height);
        let txs = (2..=12)
            .map(|seed| {
                let registration = Registration::solo(
                    &TestWallet::from_seed(seed),
                    TestChain::timestamp(height) + 3_600,
                );
                registration_tx(&registration, chain.policy(), height, requirement).tx
            })
            .collect();
        chain.add_block(txs);
        chain.add_block(vec![unlock_tx(
            &first.node_keys().public_key,
            &first_stake.locked[0],
            1,
        )]);
        chain.add_empty_blocks(32 - chain.height());

        let tip = chain.height();
        let recorded: Vec<_> = (0..tip)
            .map(|height| chain.blockchain.block(height).unwrap())
            .collect();
        let expected = chain.list.snapshot();
        assert!(!expected.rollback_events.is_empty());

        for fork_point in 1..tip {
            chain.detach(fork_point);
            for (block, txs) in &recorded[fork_point as usize..] {
                chain.replay_block(block, txs);
            }
            assert_eq!(chain.list.snapshot(), expected, "detached at {fork_point}");
        }
    }
}
