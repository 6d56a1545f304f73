//! Test Fixtures
//!
//! Wallets, signed service node transactions and an in-memory chain driving
//! a `ServiceNodeList`. Available to dependents with the `test-utils` feature.

use crate::adapters::{CurveCryptoProvider, InMemoryKVStore};
use crate::algorithms::{select_winner, winner_addresses_and_portions};
use crate::config::RegistryConfig;
use crate::domain::{
    key_image_unlock_hash, portions_to_amount, registration_hash_input, ServiceNodeKeys,
    StakingPolicy, STAKING_PORTIONS,
};
use crate::ports::{BlockchainReader, CryptoProvider, MockBlockchain, ServiceNodeListApi};
use crate::service::{ServiceNodeList, ServiceNodeListDependencies};
use crate::validation::vote_hash;
use shared_crypto::{
    cn_fast_hash, derive_public_key, derive_secret_key, deterministic_keypair_from_height,
    generate_key_derivation, generate_key_image, generate_key_image_proof, generate_signature,
    keypair_from_seed,
};
use shared_types::{
    AccountAddress, Block, BlockAddedHook, BlockRewardParts, BlockchainDetachedHook,
    DeregisterExtra, DeregisterVote, DeregisterVoteEntry, Hash, KeyImage,
    KeyImageProof, KeyImageUnlockExtra, PublicKey, RegistrationExtra, SecretKey, Transaction,
    TxExtra, TxOutput, TxType, COIN,
};
use std::sync::Arc;

/// Registry type used by the fixtures.
pub type TestList = ServiceNodeList<MockBlockchain, CurveCryptoProvider, InMemoryKVStore>;

/// Reward split used for every fixture block.
pub const REWARD_PARTS: BlockRewardParts = BlockRewardParts {
    base_miner: 10 * COIN,
    service_node_total: 5 * COIN,
};

/// Block timestamp at height 0; blocks are two minutes apart.
pub const GENESIS_TIMESTAMP: u64 = 1_600_000_000;

fn seeded_keypair(tag: &[u8], seed: u32) -> (PublicKey, SecretKey) {
    let mut bytes = tag.to_vec();
    bytes.extend_from_slice(&seed.to_le_bytes());
    keypair_from_seed(&bytes)
}

/// A wallet with spend and view keys derived from a seed.
#[derive(Debug, Clone)]
pub struct TestWallet {
    /// Seed the keys were derived from.
    pub seed: u32,
    /// Public address.
    pub address: AccountAddress,
    /// Spend secret.
    pub spend_secret: SecretKey,
    /// View secret.
    pub view_secret: SecretKey,
}

impl TestWallet {
    /// Wallet number `seed`.
    pub fn from_seed(seed: u32) -> Self {
        let (spend_public, spend_secret) = seeded_keypair(b"spend", seed);
        let (view_public, view_secret) = seeded_keypair(b"view", seed);
        Self {
            seed,
            address: AccountAddress::new(spend_public, view_public),
            spend_secret,
            view_secret,
        }
    }

    /// Operating keys of the service node this wallet runs.
    pub fn node_keys(&self) -> ServiceNodeKeys {
        let (public_key, secret_key) = seeded_keypair(b"node", self.seed);
        ServiceNodeKeys {
            public_key,
            secret_key,
        }
    }
}

/// A signed registration, ready to be embedded in a stake transaction.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Node being registered.
    pub node: ServiceNodeKeys,
    /// Wallet funding the registration transaction.
    pub staker: TestWallet,
    /// Signed payload.
    pub extra: RegistrationExtra,
}

impl Registration {
    /// Operator reserves the whole stake.
    pub fn solo(operator: &TestWallet, expiration_timestamp: u64) -> Self {
        Self::with_shares(
            operator,
            &[(operator.address, STAKING_PORTIONS)],
            expiration_timestamp,
        )
    }

    /// Operator's node with the given reservations; the operator must come first.
    pub fn with_shares(
        operator: &TestWallet,
        shares: &[(AccountAddress, u64)],
        expiration_timestamp: u64,
    ) -> Self {
        let node = operator.node_keys();
        let addresses: Vec<AccountAddress> = shares.iter().map(|(a, _)| *a).collect();
        let portions: Vec<u64> = shares.iter().map(|(_, p)| *p).collect();
        let hash = cn_fast_hash(&registration_hash_input(
            &addresses,
            0,
            &portions,
            expiration_timestamp,
        ));
        let signature = generate_signature(&hash, &node.public_key, &node.secret_key)
            .expect("node key is a valid scalar");
        Self {
            node,
            staker: operator.clone(),
            extra: RegistrationExtra {
                addresses,
                portions_for_operator: 0,
                portions,
                expiration_timestamp,
                signature,
            },
        }
    }
}

/// A staked output whose key image the staker can prove.
#[derive(Debug, Clone)]
pub struct LockedOutput {
    /// One-time output key.
    pub output_key: PublicKey,
    /// One-time secret of the output.
    pub secret: SecretKey,
    /// Key image of the output.
    pub key_image: KeyImage,
}

/// A stake transaction and the outputs it locks.
#[derive(Debug, Clone)]
pub struct StakeTx {
    /// The transaction.
    pub tx: Transaction,
    /// Its staked outputs.
    pub locked: Vec<LockedOutput>,
}

fn stake_tx(
    wallet: &TestWallet,
    node: &PublicKey,
    policy: StakingPolicy,
    height: u64,
    amount: u64,
    registration: Option<RegistrationExtra>,
) -> StakeTx {
    let mut seed = b"stake".to_vec();
    seed.extend_from_slice(&wallet.seed.to_le_bytes());
    seed.extend_from_slice(&height.to_le_bytes());
    seed.extend_from_slice(&amount.to_le_bytes());
    seed.extend_from_slice(node.as_bytes());
    let (tx_public, tx_secret) = keypair_from_seed(&seed);

    let derivation = generate_key_derivation(&wallet.address.view_public_key, &tx_secret)
        .expect("view key is a valid point");
    let output_key = derive_public_key(&derivation, 0, &wallet.address.spend_public_key)
        .expect("spend key is a valid point");
    let secret = derive_secret_key(&derivation, 0, &wallet.spend_secret)
        .expect("spend secret is a valid scalar");
    let key_image = generate_key_image(&output_key, &secret).expect("valid output secret");

    let unlock_time = if policy.uses_key_image_locking() {
        0
    } else {
        height + policy.lock_blocks()
    };
    let key_image_proofs = if policy.uses_key_image_locking() {
        vec![KeyImageProof {
            key_image,
            signature: generate_key_image_proof(&output_key, &secret, &key_image)
                .expect("valid output secret"),
        }]
    } else {
        Vec::new()
    };

    let tx = Transaction {
        hash: cn_fast_hash(&seed),
        tx_type: TxType::Standard,
        outputs: vec![TxOutput {
            amount,
            key: output_key,
            unlock_time,
        }],
        extra: TxExtra {
            tx_public_key: Some(tx_public),
            tx_secret_key: Some(tx_secret),
            service_node_register: registration,
            service_node_pubkey: Some(*node),
            service_node_contributor: Some(wallet.address),
            key_image_proofs,
            ..TxExtra::default()
        },
    };
    StakeTx {
        tx,
        locked: vec![LockedOutput {
            output_key,
            secret,
            key_image,
        }],
    }
}

/// Registration transaction paying `amount` from the registration's staker.
pub fn registration_tx(
    registration: &Registration,
    policy: StakingPolicy,
    height: u64,
    amount: u64,
) -> StakeTx {
    stake_tx(
        &registration.staker,
        &registration.node.public_key,
        policy,
        height,
        amount,
        Some(registration.extra.clone()),
    )
}

/// Contribution of `amount` from `wallet` to `node`.
pub fn contribution_tx(
    wallet: &TestWallet,
    node: &PublicKey,
    policy: StakingPolicy,
    height: u64,
    amount: u64,
) -> StakeTx {
    stake_tx(wallet, node, policy, height, amount, None)
}

/// Unlock request for `locked`, signed with its output secret.
pub fn unlock_tx(node: &PublicKey, locked: &LockedOutput, nonce: u32) -> Transaction {
    let signature = generate_signature(
        &key_image_unlock_hash(nonce),
        &locked.output_key,
        &locked.secret,
    )
    .expect("valid output secret");
    Transaction {
        hash: cn_fast_hash(locked.key_image.as_bytes()),
        tx_type: TxType::KeyImageUnlock,
        outputs: Vec::new(),
        extra: TxExtra {
            service_node_pubkey: Some(*node),
            key_image_unlock: Some(KeyImageUnlockExtra {
                key_image: locked.key_image,
                nonce,
                signature,
            }),
            ..TxExtra::default()
        },
    }
}

/// Vote by `voter` to deregister candidate `service_node_index` of the quorum at `block_height`.
pub fn sign_vote(
    voter: &ServiceNodeKeys,
    block_height: u64,
    service_node_index: u32,
    voters_quorum_index: u32,
) -> DeregisterVote {
    let crypto = CurveCryptoProvider::new();
    let hash = vote_hash(&crypto, block_height, service_node_index);
    DeregisterVote {
        block_height,
        service_node_index,
        voters_quorum_index,
        signature: crypto
            .generate_signature(&hash, &voter.public_key, &voter.secret_key)
            .expect("voter key is a valid scalar"),
    }
}

/// Deregistration transaction carrying `votes`.
pub fn deregister_tx(
    block_height: u64,
    service_node_index: u32,
    votes: Vec<DeregisterVoteEntry>,
) -> Transaction {
    let mut id = block_height.to_le_bytes().to_vec();
    id.extend_from_slice(&service_node_index.to_le_bytes());
    Transaction {
        hash: cn_fast_hash(&id),
        tx_type: TxType::Deregister,
        outputs: Vec::new(),
        extra: TxExtra {
            service_node_deregister: Some(DeregisterExtra {
                block_height,
                service_node_index,
                votes,
            }),
            ..TxExtra::default()
        },
    }
}

/// Coinbase naming `winner` and paying `payouts` from `REWARD_PARTS`.
pub fn miner_tx(height: u64, winner: PublicKey, payouts: &[(AccountAddress, u64)]) -> Transaction {
    let (_, secret) = deterministic_keypair_from_height(height);
    let mut outputs = vec![TxOutput {
        amount: REWARD_PARTS.base_miner,
        key: PublicKey::NULL,
        unlock_time: 0,
    }];
    for (i, (address, portions)) in payouts.iter().enumerate() {
        let derivation = generate_key_derivation(&address.view_public_key, &secret)
            .expect("payee view key is a valid point");
        outputs.push(TxOutput {
            amount: portions_to_amount(*portions, REWARD_PARTS.service_node_total),
            key: derive_public_key(&derivation, (i + 1) as u64, &address.spend_public_key)
                .expect("payee spend key is a valid point"),
            unlock_time: 0,
        });
    }
    Transaction {
        hash: cn_fast_hash(&height.to_le_bytes()),
        tx_type: TxType::Standard,
        outputs,
        extra: TxExtra {
            service_node_winner: Some(winner),
            ..TxExtra::default()
        },
    }
}

/// A chain in memory with a registry following it.
pub struct TestChain {
    /// Host chain.
    pub blockchain: Arc<MockBlockchain>,
    /// Store holding the persisted blob.
    pub store: Arc<InMemoryKVStore>,
    /// Registry under test.
    pub list: TestList,
    /// Version of new blocks.
    pub hf_version: u8,
}

impl TestChain {
    /// Empty fakechain at `hf_version`, registry initialised.
    pub fn new(hf_version: u8) -> Self {
        let blockchain = Arc::new(MockBlockchain::new(hf_version));
        let store = Arc::new(InMemoryKVStore::new());
        let list = Self::list_for(&blockchain, &store, None);
        list.init();
        Self {
            blockchain,
            store,
            list,
            hf_version,
        }
    }

    /// A fresh registry over this chain and store, not yet initialised.
    pub fn list_for(
        blockchain: &Arc<MockBlockchain>,
        store: &Arc<InMemoryKVStore>,
        keys: Option<ServiceNodeKeys>,
    ) -> TestList {
        let list = ServiceNodeList::new(ServiceNodeListDependencies {
            blockchain: Arc::clone(blockchain),
            crypto: Arc::new(CurveCryptoProvider::new()),
            store: Arc::clone(store),
            config: RegistryConfig::for_testing(),
        });
        match keys {
            Some(keys) => list.with_keys(keys),
            None => list,
        }
    }

    /// Height of the next block.
    pub fn height(&self) -> u64 {
        self.blockchain.current_height()
    }

    /// Staking policy of the next block.
    pub fn policy(&self) -> StakingPolicy {
        StakingPolicy::for_version(self.hf_version, RegistryConfig::for_testing().network_type)
            .expect("fixture chains run service node forks")
    }

    /// Timestamp of the block at `height`.
    pub fn timestamp(height: u64) -> u64 {
        GENESIS_TIMESTAMP + height * 120
    }

    /// Build the next block on `prev_hash`, distinguished by `salt`.
    pub fn make_block(&self, txs: &[Transaction], salt: u64) -> Block {
        let height = self.height();
        let prev_hash = match height {
            0 => Hash::NULL,
            h => self
                .blockchain
                .block(h - 1)
                .map(|(block, _)| block.hash)
                .unwrap_or(Hash::NULL),
        };
        let mut id = height.to_le_bytes().to_vec();
        id.extend_from_slice(&salt.to_le_bytes());
        id.extend_from_slice(prev_hash.as_bytes());

        let state = self.list.snapshot();
        let winner = select_winner(&state.infos);
        let payouts = winner_addresses_and_portions(&state.infos, &winner);

        Block {
            height,
            hash: cn_fast_hash(&id),
            prev_hash,
            timestamp: Self::timestamp(height),
            major_version: self.hf_version,
            miner_tx: miner_tx(height, winner, &payouts),
            tx_hashes: txs.iter().map(|tx| tx.hash).collect(),
        }
    }

    /// Append a block carrying `txs` and notify the registry.
    pub fn add_block(&self, txs: Vec<Transaction>) -> Block {
        self.add_block_with_salt(txs, 0)
    }

    /// Like `add_block`, with a salt so forks get distinct hashes.
    pub fn add_block_with_salt(&self, txs: Vec<Transaction>, salt: u64) -> Block {
        let block = self.make_block(&txs, salt);
        self.blockchain.push(block.clone(), txs.clone());
        self.list.block_added(&block, &txs);
        block
    }

    /// Re-append a block popped by `detach` and notify the registry.
    pub fn replay_block(&self, block: &Block, txs: &[Transaction]) {
        self.blockchain.push(block.clone(), txs.to_vec());
        self.list.block_added(block, txs);
    }

    /// Append `count` empty blocks.
    pub fn add_empty_blocks(&self, count: u64) {
        for _ in 0..count {
            self.add_block(Vec::new());
        }
    }

    /// Pop blocks at and above `height` and notify the registry.
    pub fn detach(&self, height: u64) {
        self.blockchain.pop_to(height);
        self.list.blockchain_detached(height);
    }

    /// Register `operator`'s node with the full stake in the next block.
    pub fn register_solo(&self, operator: &TestWallet) -> StakeTx {
        let height = self.height();
        let registration = Registration::solo(operator, Self::timestamp(height) + 3_600);
        let requirement = self.list.staking_requirement(height);
        let stake = registration_tx(&registration, self.policy(), height, requirement);
        self.add_block(vec![stake.tx.clone()]);
        stake
    }
}
