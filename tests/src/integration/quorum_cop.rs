//! # Quorum Deregistration
//!
//! Live nodes exchange uptime proofs; the one that stays silent is voted
//! off by the quorums testing it and its deregistration is mined.

#[cfg(test)]
mod tests {
    use crate::integration::Network;
    use shared_types::{PublicKey, Transaction, HF_VERSION_INFINITE_STAKING};
    use sn_01_service_node_list::domain::VOTE_LIFETIME_BY_HEIGHT;
    use sn_01_service_node_list::testing::TestWallet;
    use sn_01_service_node_list::{NodeListFilter, ServiceNodeListApi};
    use sn_02_quorum_cop::QuorumCopApi;
    use std::collections::HashSet;

    /// Twelve nodes registered at height 1; every node but the first one
    /// tested at that height runs a cop.
    fn network_with_silent_node() -> (Network, Vec<TestWallet>, PublicKey) {
        let mut net = Network::new(HF_VERSION_INFINITE_STAKING);
        net.add_empty_blocks(1);
        let wallets = net.register_all(1..=12);

        let quorum = net.chain.list.quorum_state(1).unwrap();
        assert_eq!(quorum.nodes_to_test.len(), 2);
        let silent = quorum.nodes_to_test[0];

        for wallet in &wallets {
            let keys = wallet.node_keys();
            if keys.public_key != silent {
                net.start_cop(keys);
            }
        }
        net.gossip_uptime_proofs();
        (net, wallets, silent)
    }

    /// Candidate a deregistration targets.
    fn target_of(net: &Network, tx: &Transaction) -> PublicKey {
        let extra = tx.extra.service_node_deregister.as_ref().unwrap();
        let quorum = net.chain.list.quorum_state(extra.block_height).unwrap();
        quorum.nodes_to_test[extra.service_node_index as usize]
    }

    /// Mine empty blocks until the cops first judge.
    fn run_until_judging(net: &Network) {
        while net.chain.height() < VOTE_LIFETIME_BY_HEIGHT - 1 {
            net.add_block(Vec::new());
        }
        assert!(net.sink.txs.lock().is_empty());
        assert_eq!(net.pool.pending(), 0);
        net.add_block(Vec::new());
    }

    #[test]
    fn test_silent_node_is_voted_off() {
        let (net, _, silent) = network_with_silent_node();
        for (key, cop) in &net.cops {
            assert!(cop.last_uptime_proof(key).is_some());
            assert!(cop.last_uptime_proof(&silent).is_none());
        }

        run_until_judging(&net);

        let relayed = net.sink.txs.lock().clone();
        assert!(!relayed.is_empty());
        assert!(relayed.iter().all(|tx| target_of(&net, tx) == silent));
        let candidates: HashSet<(u64, u32)> = relayed
            .iter()
            .filter_map(|tx| tx.extra.service_node_deregister.as_ref())
            .map(|extra| (extra.block_height, extra.service_node_index))
            .collect();
        assert_eq!(candidates.len(), relayed.len());

        let tx = relayed
            .iter()
            .find(|tx| {
                tx.extra
                    .service_node_deregister
                    .as_ref()
                    .map_or(false, |extra| extra.block_height == 1)
            })
            .cloned()
            .unwrap();
        assert!(net
            .chain
            .list
            .check_deregister_tx(&tx, net.chain.height())
            .is_ok());
        let silent_image = net.chain.list.snapshot().infos[&silent].contributors[0]
            .locked_contributions[0]
            .key_image;

        net.add_block(vec![tx]);
        assert!(!net.chain.list.is_service_node(&silent));
        assert_eq!(
            net.chain
                .list
                .service_node_list_state(&NodeListFilter::default())
                .len(),
            11
        );
        assert!(net
            .chain
            .list
            .key_image_blacklist()
            .iter()
            .any(|entry| entry.key_image == silent_image));
    }

    #[test]
    fn test_responsive_network_keeps_everyone() {
        let mut net = Network::new(HF_VERSION_INFINITE_STAKING);
        net.add_empty_blocks(1);
        let wallets = net.register_all(1..=12);
        for wallet in &wallets {
            net.start_cop(wallet.node_keys());
        }
        net.gossip_uptime_proofs();

        run_until_judging(&net);
        net.add_empty_blocks(5);

        assert!(net.sink.txs.lock().is_empty());
        assert_eq!(net.pool.pending(), 0);
        assert_eq!(
            net.chain
                .list
                .service_node_list_state(&NodeListFilter::default())
                .len(),
            12
        );
        for (_, cop) in &net.cops {
            assert_eq!(cop.last_height(), net.chain.height() - 1 - 20);
        }
    }

    #[test]
    fn test_replayed_heights_do_not_duplicate_deregistrations() {
        let (net, _, _) = network_with_silent_node();
        run_until_judging(&net);
        let relayed = net.sink.txs.lock().len();
        let judged = net.cops[0].1.last_height();
        assert!(relayed > 0);

        // Pop blocks below the judged horizon; the cops rewind with the chain.
        let fork_point = judged - 9;
        net.detach(fork_point);
        for (_, cop) in &net.cops {
            assert_eq!(cop.last_height(), fork_point);
        }

        while net.chain.height() < VOTE_LIFETIME_BY_HEIGHT {
            net.add_block(Vec::new());
        }
        assert_eq!(net.cops[0].1.last_height(), judged);
        assert_eq!(net.sink.txs.lock().len(), relayed);
    }
}
