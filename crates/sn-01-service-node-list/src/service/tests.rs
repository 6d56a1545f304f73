use super::*;
use crate::domain::{
    NodeListFilter, QuorumState, RegistrationCmdError, ServiceNodeError,
    KEY_IMAGE_AWAITING_UNLOCK_HEIGHT, QUEUE_SWARM_ID, STAKING_PORTIONS,
};
use crate::ports::{ServiceNodeListApi, ServiceNodeStore};
use crate::testing::{
    contribution_tx, deregister_tx, registration_tx, sign_vote, unlock_tx, Registration,
    TestChain, TestWallet, REWARD_PARTS,
};
use shared_types::{
    AccountAddress, DeregisterVoteEntry, PublicKey, ValidateMinerTxHook, COIN,
    HF_VERSION_GRACE_PERIOD,
    HF_VERSION_INFINITE_STAKING,
};

const REQUIREMENT: u64 = 100 * COIN;

fn assert_same_registry(a: &RegistryState, b: &RegistryState) {
    assert_eq!(a.height, b.height);
    assert_eq!(a.infos, b.infos);
    assert_eq!(a.quorum_states, b.quorum_states);
    assert_eq!(a.key_image_blacklist, b.key_image_blacklist);
}

/// Register one node per wallet, all in the next block.
fn register_all(chain: &TestChain, seeds: std::ops::RangeInclusive<u32>) -> Vec<TestWallet> {
    let height = chain.height();
    let wallets: Vec<TestWallet> = seeds.map(TestWallet::from_seed).collect();
    let txs = wallets
        .iter()
        .map(|wallet| {
            let reg = Registration::solo(wallet, TestChain::timestamp(height) + 3_600);
            registration_tx(&reg, chain.policy(), height, REQUIREMENT).tx
        })
        .collect();
    chain.add_block(txs);
    wallets
}

fn votes_for(
    wallets: &[TestWallet],
    quorum: &QuorumState,
    height: u64,
    candidate: u32,
    count: usize,
) -> Vec<DeregisterVoteEntry> {
    quorum.quorum_nodes[..count]
        .iter()
        .enumerate()
        .map(|(voter_index, key)| {
            let wallet = wallets
                .iter()
                .find(|w| w.node_keys().public_key == *key)
                .unwrap();
            let vote = sign_vote(&wallet.node_keys(), height, candidate, voter_index as u32);
            DeregisterVoteEntry {
                voters_quorum_index: vote.voters_quorum_index,
                signature: vote.signature,
            }
        })
        .collect()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_solo_registration_lifecycle() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(2);
    let operator = TestWallet::from_seed(1);
    let stake = chain.register_solo(&operator);
    let key = operator.node_keys().public_key;

    assert!(chain.list.is_service_node(&key));
    let nodes = chain.list.service_node_list_state(&NodeListFilter::default());
    assert_eq!(nodes.len(), 1);
    let info = &nodes[0].info;
    assert_eq!(info.registration_height, 2);
    assert!(info.is_fully_funded());
    assert_eq!(info.total_contributed, REQUIREMENT);
    assert_eq!(info.operator_address, operator.address);
    assert_eq!(info.swarm_id, QUEUE_SWARM_ID);

    assert_eq!(chain.list.winner(), key);
    assert_eq!(
        chain.list.winner_addresses_and_portions(),
        vec![(operator.address, STAKING_PORTIONS)]
    );
    assert_eq!(chain.list.quorum_state(2).unwrap().quorum_nodes, vec![key]);
    assert_eq!(
        chain.list.is_key_image_locked(&stake.locked[0].key_image),
        Some(KEY_IMAGE_AWAITING_UNLOCK_HEIGHT)
    );

    let blob = chain.store.get(SERVICE_NODE_STATE_KEY).unwrap().unwrap();
    let persisted = PersistedState::from_bytes(&blob).unwrap();
    assert_eq!(persisted.height, 3);
    assert_eq!(persisted.infos.len(), 1);
}

#[test]
fn test_empty_list_pays_null_address() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    assert_eq!(chain.list.winner(), PublicKey::NULL);
    assert_eq!(
        chain.list.winner_addresses_and_portions(),
        vec![(AccountAddress::NULL, STAKING_PORTIONS)]
    );

    let block = chain.make_block(&[], 0);
    assert!(chain.list.validate_miner_tx(
        &block.prev_hash,
        &block.miner_tx,
        block.height,
        chain.hf_version,
        &REWARD_PARTS
    ));
}

#[test]
fn test_winner_rotates_after_reward() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    let a = TestWallet::from_seed(1);
    let b = TestWallet::from_seed(2);
    chain.register_solo(&a);
    assert_eq!(chain.list.winner(), a.node_keys().public_key);

    // Block 2 pays A and registers B; A drops behind B's fresh registration.
    chain.register_solo(&b);
    assert_eq!(chain.list.winner(), b.node_keys().public_key);

    chain.add_empty_blocks(1);
    assert_eq!(chain.list.winner(), a.node_keys().public_key);
    let snapshot = chain.list.snapshot();
    let a_info = &snapshot.infos[&a.node_keys().public_key];
    assert_eq!(a_info.last_reward_block_height, 2);
    assert_eq!(a_info.last_reward_transaction_index, u32::MAX);
}

#[test]
fn test_validate_miner_tx() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    chain.register_solo(&TestWallet::from_seed(1));

    let block = chain.make_block(&[], 0);
    let validate = |tx: &shared_types::Transaction, hf: u8| {
        chain
            .list
            .validate_miner_tx(&block.prev_hash, tx, block.height, hf, &REWARD_PARTS)
    };
    assert!(validate(&block.miner_tx, chain.hf_version));
    assert_eq!(block.miner_tx.outputs[1].amount, REWARD_PARTS.service_node_total);

    let mut wrong_winner = block.miner_tx.clone();
    wrong_winner.extra.service_node_winner = Some(PublicKey([9; 32]));
    assert!(!validate(&wrong_winner, chain.hf_version));

    let mut unnamed = block.miner_tx.clone();
    unnamed.extra.service_node_winner = None;
    assert!(!validate(&unnamed, chain.hf_version));

    let mut short = block.miner_tx.clone();
    short.outputs.truncate(1);
    assert!(!validate(&short, chain.hf_version));

    let mut wrong_amount = block.miner_tx.clone();
    wrong_amount.outputs[1].amount += 1;
    assert!(!validate(&wrong_amount, chain.hf_version));

    let mut wrong_key = block.miner_tx.clone();
    wrong_key.outputs[1].key = block.miner_tx.outputs[0].key;
    assert!(!validate(&wrong_key, chain.hf_version));

    // Before service nodes any coinbase is acceptable.
    assert!(validate(&wrong_winner, 8));
}

// =============================================================================
// Expiry and unlocks
// =============================================================================

#[test]
fn test_grace_period_expiry() {
    let chain = TestChain::new(HF_VERSION_GRACE_PERIOD);
    chain.add_empty_blocks(1);
    let operator = TestWallet::from_seed(1);
    chain.register_solo(&operator);
    let key = operator.node_keys().public_key;

    // Registered at 1, lock of 30 plus 20 blocks of grace.
    chain.add_empty_blocks(49);
    assert_eq!(chain.height(), 51);
    assert!(chain.list.is_service_node(&key));

    chain.add_empty_blocks(1);
    assert!(!chain.list.is_service_node(&key));
}

#[test]
fn test_unlock_then_expiry() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    let operator = TestWallet::from_seed(1);
    let stake = chain.register_solo(&operator);
    let key = operator.node_keys().public_key;

    chain.add_block(vec![unlock_tx(&key, &stake.locked[0], 1)]);
    let requested = 2 + 15;
    assert_eq!(
        chain.list.snapshot().infos[&key].requested_unlock_height,
        requested
    );
    assert_eq!(
        chain.list.is_key_image_locked(&stake.locked[0].key_image),
        Some(requested)
    );

    // A second request does not move the unlock height.
    chain.add_block(vec![unlock_tx(&key, &stake.locked[0], 2)]);
    assert_eq!(
        chain.list.snapshot().infos[&key].requested_unlock_height,
        requested
    );

    chain.add_empty_blocks(requested - 3);
    assert_eq!(chain.height(), requested + 1);
    assert!(chain.list.is_service_node(&key));

    chain.add_empty_blocks(1);
    assert!(!chain.list.is_service_node(&key));
    assert_eq!(
        chain.list.is_key_image_locked(&stake.locked[0].key_image),
        None
    );
}

#[test]
fn test_contribution_past_reservation_is_truncated() {
    let chain = TestChain::new(HF_VERSION_GRACE_PERIOD);
    chain.add_empty_blocks(1);
    let operator = TestWallet::from_seed(1);
    let key = operator.node_keys().public_key;

    let reg = Registration::solo(&operator, TestChain::timestamp(1) + 3_600);
    let stake = registration_tx(&reg, chain.policy(), 1, REQUIREMENT / 10 * 6);
    chain.add_block(vec![stake.tx]);
    assert!(!chain.list.snapshot().infos[&key].is_fully_funded());

    let outsider = TestWallet::from_seed(2);
    let late = contribution_tx(&outsider, &key, chain.policy(), 2, REQUIREMENT);
    chain.add_block(vec![late.tx]);
    let info = chain.list.snapshot().infos[&key].clone();
    assert_eq!(info.contributors.len(), 2);
    assert_eq!(info.contributors[1].amount, 0);
    assert_eq!(info.total_reserved, REQUIREMENT);
    assert_eq!(info.total_contributed, REQUIREMENT / 10 * 6);

    let top_up = contribution_tx(&operator, &key, chain.policy(), 3, REQUIREMENT);
    chain.add_block(vec![top_up.tx]);
    let info = chain.list.snapshot().infos[&key].clone();
    assert!(info.is_fully_funded());
    assert_eq!(info.total_contributed, REQUIREMENT);
    assert_eq!(info.total_reserved, REQUIREMENT);
    assert!(info.check_invariants().is_ok());
}

// =============================================================================
// Deregistration
// =============================================================================

#[test]
fn test_quorum_deregistration_and_blacklist() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    let wallets = register_all(&chain, 1..=12);
    let quorum_height = 1;
    let quorum = chain.list.quorum_state(quorum_height).unwrap();
    assert_eq!(quorum.quorum_nodes.len(), 10);
    assert_eq!(quorum.nodes_to_test.len(), 2);

    let candidate = quorum.nodes_to_test[0];
    let candidate_wallet = wallets
        .iter()
        .find(|w| w.node_keys().public_key == candidate)
        .unwrap();
    let candidate_image = chain.list.snapshot().infos[&candidate].contributors[0]
        .locked_contributions[0]
        .key_image;

    let weak = deregister_tx(quorum_height, 0, votes_for(&wallets, &quorum, quorum_height, 0, 6));
    assert_eq!(
        chain.list.check_deregister_tx(&weak, chain.height()),
        Err(ServiceNodeError::NotEnoughVotes { got: 6, required: 7 })
    );

    let tx = deregister_tx(quorum_height, 0, votes_for(&wallets, &quorum, quorum_height, 0, 7));
    assert!(chain.list.check_deregister_tx(&tx, chain.height()).is_ok());
    assert!(matches!(
        chain.list.check_deregister_tx(&tx, quorum_height),
        Err(ServiceNodeError::DeregisterOutOfWindow { .. })
    ));
    assert!(matches!(
        chain.list.check_deregister_tx(&tx, quorum_height + 120),
        Err(ServiceNodeError::DeregisterOutOfWindow { .. })
    ));

    let deregister_height = chain.height();
    chain.add_block(vec![tx]);
    assert!(!chain.list.is_service_node(&candidate));
    assert_eq!(
        chain.list.service_node_list_state(&NodeListFilter::default()).len(),
        11
    );
    assert!(!chain
        .list
        .snapshot()
        .infos
        .values()
        .any(|info| info.operator_address == candidate_wallet.address));

    let unlock_height = deregister_height + 30;
    assert_eq!(
        chain.list.is_key_image_locked(&candidate_image),
        Some(unlock_height)
    );

    // The entry goes in the block at exactly its unlock height.
    chain.add_empty_blocks(unlock_height - chain.height());
    assert_eq!(chain.height(), unlock_height);
    assert_eq!(chain.list.key_image_blacklist().len(), 1);
    chain.add_empty_blocks(1);
    assert!(chain.list.key_image_blacklist().is_empty());
    assert_eq!(chain.list.is_key_image_locked(&candidate_image), None);
}

// =============================================================================
// Reorgs and recovery
// =============================================================================

#[test]
fn test_shallow_reorg_restores_state() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    let a = TestWallet::from_seed(1);
    let stake = chain.register_solo(&a);
    chain.add_empty_blocks(3);
    let before = chain.list.snapshot();

    let key = a.node_keys().public_key;
    chain.register_solo(&TestWallet::from_seed(2));
    chain.add_block(vec![unlock_tx(&key, &stake.locked[0], 1)]);
    chain.add_empty_blocks(2);
    assert_eq!(chain.list.service_node_list_state(&NodeListFilter::default()).len(), 2);

    chain.detach(before.height);
    assert_same_registry(&chain.list.snapshot(), &before);

    // Replaying a fork leaves the list identical to a fresh rebuild.
    chain.add_block_with_salt(Vec::new(), 7);
    chain.register_solo(&TestWallet::from_seed(3));
    let rebuilt = TestChain::list_for(
        &chain.blockchain,
        &std::sync::Arc::new(crate::adapters::InMemoryKVStore::new()),
        None,
    );
    rebuilt.init();
    assert_same_registry(&rebuilt.snapshot(), &chain.list.snapshot());
}

#[test]
fn test_deep_reorg_rebuilds() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    chain.register_solo(&TestWallet::from_seed(1));
    chain.add_empty_blocks(5);
    let before = chain.list.snapshot();

    chain.register_solo(&TestWallet::from_seed(2));
    chain.add_empty_blocks(40);

    chain.detach(before.height);
    assert_same_registry(&chain.list.snapshot(), &before);
    assert_eq!(chain.list.height(), chain.height());
}

#[test]
fn test_missing_quorum_triggers_rebuild() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    let wallets = register_all(&chain, 1..=12);
    let quorum = chain.list.quorum_state(1).unwrap();
    let votes = votes_for(&wallets, &quorum, 1, 0, 7);

    chain.add_block(vec![deregister_tx(5_000, 0, votes)]);
    assert_eq!(chain.list.height(), chain.height());
    assert_eq!(
        chain.list.service_node_list_state(&NodeListFilter::default()).len(),
        12
    );
}

#[test]
fn test_skipped_block_triggers_rebuild() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    let operator = TestWallet::from_seed(1);
    let reg = Registration::solo(&operator, TestChain::timestamp(1) + 3_600);
    let stake = registration_tx(&reg, chain.policy(), 1, REQUIREMENT);

    // The host stores a block the list never hears about.
    let block = chain.make_block(&[stake.tx.clone()], 0);
    chain.blockchain.push(block, vec![stake.tx]);
    assert_eq!(chain.list.height(), 1);

    chain.add_empty_blocks(1);
    assert_eq!(chain.list.height(), 3);
    assert!(chain.list.is_service_node(&operator.node_keys().public_key));
}

// =============================================================================
// Initialisation and persistence
// =============================================================================

#[test]
fn test_init_loads_matching_blob() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    chain.register_solo(&TestWallet::from_seed(1));
    chain.add_empty_blocks(2);

    let reopened = TestChain::list_for(&chain.blockchain, &chain.store, None);
    reopened.init();
    assert_eq!(reopened.snapshot(), chain.list.snapshot());
}

#[test]
fn test_init_rebuilds_stale_or_foreign_blob() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    chain.register_solo(&TestWallet::from_seed(1));
    let stale = chain.store.get(SERVICE_NODE_STATE_KEY).unwrap().unwrap();
    chain.register_solo(&TestWallet::from_seed(2));
    chain.add_empty_blocks(2);
    let expected = chain.list.snapshot();

    chain.store.put(SERVICE_NODE_STATE_KEY, &stale).unwrap();
    let reopened = TestChain::list_for(&chain.blockchain, &chain.store, None);
    reopened.init();
    assert_same_registry(&reopened.snapshot(), &expected);

    let mut foreign = PersistedState::from(&expected);
    foreign.version = PERSISTED_STATE_VERSION + 1;
    foreign.infos.clear();
    chain
        .store
        .put(SERVICE_NODE_STATE_KEY, &foreign.to_bytes().unwrap())
        .unwrap();
    let reopened = TestChain::list_for(&chain.blockchain, &chain.store, None);
    reopened.init();
    assert_same_registry(&reopened.snapshot(), &expected);

    chain.store.put(SERVICE_NODE_STATE_KEY, b"garbage").unwrap();
    let reopened = TestChain::list_for(&chain.blockchain, &chain.store, None);
    reopened.init();
    assert_same_registry(&reopened.snapshot(), &expected);
}

#[test]
fn test_before_service_node_fork() {
    let mut chain = TestChain::new(8);
    chain.add_empty_blocks(3);
    assert_eq!(chain.list.height(), 3);
    assert!(chain.list.quorum_state(2).is_none());

    let reopened = TestChain::list_for(&chain.blockchain, &chain.store, None);
    reopened.init();
    assert_eq!(reopened.height(), 3);

    chain.hf_version = HF_VERSION_INFINITE_STAKING;
    let operator = TestWallet::from_seed(1);
    chain.register_solo(&operator);
    assert!(chain.list.is_service_node(&operator.node_keys().public_key));
    assert!(chain.list.quorum_state(3).is_some());
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn test_list_filters_and_own_status() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    let solo = TestWallet::from_seed(1);
    chain.register_solo(&solo);

    let open = TestWallet::from_seed(2);
    let reg = Registration::with_shares(
        &open,
        &[(open.address, STAKING_PORTIONS / 2)],
        TestChain::timestamp(2) + 3_600,
    );
    chain.add_block(vec![registration_tx(&reg, chain.policy(), 2, REQUIREMENT / 2).tx]);

    let all = chain.list.service_node_list_state(&NodeListFilter::default());
    assert_eq!(all.len(), 2);
    assert!(all.windows(2).all(|w| w[0].pubkey < w[1].pubkey));

    let funded = chain.list.service_node_list_state(&NodeListFilter {
        pubkeys: Vec::new(),
        fully_funded_only: true,
    });
    assert_eq!(funded.len(), 1);
    assert_eq!(funded[0].pubkey, solo.node_keys().public_key);

    let picked = chain.list.service_node_list_state(&NodeListFilter {
        pubkeys: vec![open.node_keys().public_key],
        fully_funded_only: false,
    });
    assert_eq!(picked.len(), 1);

    assert!(chain.list.own_status().is_none());
    let with_keys = TestChain::list_for(&chain.blockchain, &chain.store, Some(solo.node_keys()));
    with_keys.init();
    let status = with_keys.own_status().unwrap();
    assert_eq!(status.pubkey, solo.node_keys().public_key);
    assert!(status.info.unwrap().is_fully_funded());

    let stranger = TestChain::list_for(
        &chain.blockchain,
        &chain.store,
        Some(TestWallet::from_seed(9).node_keys()),
    );
    stranger.init();
    assert_eq!(stranger.own_status().unwrap().info, None);
}

#[test]
fn test_quorum_states_range() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(6);
    let range = chain.list.quorum_states(2, 4);
    let heights: Vec<u64> = range.iter().map(|(h, _)| *h).collect();
    assert_eq!(heights, vec![2, 3, 4]);
    assert!(chain.list.quorum_states(4, 2).is_empty());
    assert_eq!(chain.list.quorum_states(5, 100).len(), 1);
    assert_eq!(chain.list.staking_requirement(0), REQUIREMENT);
}

#[test]
fn test_make_registration_cmd() {
    let chain = TestChain::new(HF_VERSION_INFINITE_STAKING);
    chain.add_empty_blocks(1);
    let operator = TestWallet::from_seed(1);
    let args = vec![
        "0".to_string(),
        operator.address.to_string(),
        STAKING_PORTIONS.to_string(),
    ];
    assert_eq!(
        chain.list.make_registration_cmd(&args, false),
        Err(RegistrationCmdError::NoServiceNodeKeys)
    );

    let clock = std::sync::Arc::new(crate::ports::MockTimeSource::new(1_000));
    let list = TestChain::list_for(&chain.blockchain, &chain.store, Some(operator.node_keys()))
        .with_time_source(Box::new(clock));
    list.init();
    let cmd = list.make_registration_cmd(&args, false).unwrap();
    assert!(cmd.starts_with(&format!(
        "register_service_node 0 {} {} ",
        operator.address, STAKING_PORTIONS
    )));
    assert!(cmd.contains(&operator.node_keys().public_key.to_string()));
}
