//! # Staking Policy
//!
//! Staking rules differ by hard fork era. A `StakingPolicy` is selected once
//! per block (or per validation call) and answers every era-dependent
//! question, so no other code branches on the hard fork version.
//!
//! | Era | Versions | Re-registration | Expiry | Stake lock |
//! |-----|----------|-----------------|--------|------------|
//! | `Legacy` | 9 | rejected | `reg + lock` | unlock time |
//! | `GracePeriod` | 10 | after `reg + lock` | `reg + lock + excess` | unlock time |
//! | `InfiniteStaking` | 11+ | rejected | unlock request, or unfunded at `reg + lock` | key image |

use super::entities::{NodeInfo, NodeInfoVersion};
use super::invariants::{
    MAX_KEY_IMAGES_PER_CONTRIBUTOR, MAX_NUMBER_OF_CONTRIBUTORS, STAKING_PORTIONS,
    STAKING_REQUIREMENT_LOCK_BLOCKS_EXCESS,
};
use serde::{Deserialize, Serialize};
use shared_types::{
    NetworkType, BLOCKS_EXPECTED_IN_DAYS, COIN, CRYPTONOTE_MAX_BLOCK_NUMBER,
    HF_VERSION_GRACE_PERIOD, HF_VERSION_INFINITE_STAKING, HF_VERSION_SERVICE_NODES,
};

/// Staking rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StakingEra {
    /// First service node fork.
    Legacy,
    /// Re-registration grace period.
    GracePeriod,
    /// Key image locked stakes.
    InfiniteStaking,
}

/// Era rules bound to a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakingPolicy {
    era: StakingEra,
    lock_blocks: u64,
}

impl StakingPolicy {
    /// Policy for a hard fork version; `None` before service nodes exist.
    pub fn for_version(hf_version: u8, network: NetworkType) -> Option<Self> {
        let era = if hf_version >= HF_VERSION_INFINITE_STAKING {
            StakingEra::InfiniteStaking
        } else if hf_version >= HF_VERSION_GRACE_PERIOD {
            StakingEra::GracePeriod
        } else if hf_version >= HF_VERSION_SERVICE_NODES {
            StakingEra::Legacy
        } else {
            return None;
        };
        Some(Self::for_era(era, network))
    }

    /// Policy of `era` on `network`.
    pub fn for_era(era: StakingEra, network: NetworkType) -> Self {
        Self {
            era,
            lock_blocks: staking_num_lock_blocks(network),
        }
    }

    /// Active era.
    pub fn era(&self) -> StakingEra {
        self.era
    }

    /// Blocks a stake stays locked.
    pub fn lock_blocks(&self) -> u64 {
        self.lock_blocks
    }

    /// Schema version of nodes registered under this era.
    pub fn node_info_version(&self) -> NodeInfoVersion {
        match self.era {
            StakingEra::Legacy => NodeInfoVersion::V0Legacy,
            StakingEra::GracePeriod => NodeInfoVersion::V1GracePeriod,
            StakingEra::InfiniteStaking => NodeInfoVersion::V2InfiniteStaking,
        }
    }

    /// True if stakes are locked by key image.
    pub fn uses_key_image_locking(&self) -> bool {
        self.era == StakingEra::InfiniteStaking
    }

    /// Whether `existing` may be replaced by a new registration at `block_height`.
    pub fn allows_reregistration(&self, existing: &NodeInfo, block_height: u64) -> bool {
        match self.era {
            StakingEra::GracePeriod => {
                block_height >= existing.registration_height + self.lock_blocks
            }
            StakingEra::Legacy | StakingEra::InfiniteStaking => false,
        }
    }

    /// Whether `info` leaves the list at `block_height`.
    pub fn is_expired(&self, info: &NodeInfo, block_height: u64) -> bool {
        let lock_end = info.registration_height + self.lock_blocks;
        match self.era {
            StakingEra::Legacy => block_height >= lock_end,
            StakingEra::GracePeriod => {
                block_height >= lock_end + STAKING_REQUIREMENT_LOCK_BLOCKS_EXCESS
            }
            StakingEra::InfiniteStaking => {
                if info.version < NodeInfoVersion::V2InfiniteStaking {
                    return block_height >= lock_end + STAKING_REQUIREMENT_LOCK_BLOCKS_EXCESS;
                }
                if info.is_unlocking() {
                    block_height > info.requested_unlock_height
                } else {
                    !info.is_fully_funded() && block_height >= lock_end
                }
            }
        }
    }

    /// Whether an output with `unlock_time`, mined at `block_height`, counts as stake.
    pub fn is_valid_stake_unlock_time(&self, unlock_time: u64, block_height: u64) -> bool {
        match self.era {
            StakingEra::InfiniteStaking => true,
            StakingEra::Legacy | StakingEra::GracePeriod => {
                unlock_time < CRYPTONOTE_MAX_BLOCK_NUMBER
                    && unlock_time >= block_height + self.lock_blocks
            }
        }
    }

    /// Smallest acceptable contribution for the next slot.
    ///
    /// Before infinite staking the minimum is a quarter of the requirement or
    /// whatever is left. Afterwards the remainder is split over the free key
    /// image slots.
    pub fn min_node_contribution(
        &self,
        staking_requirement: u64,
        total_reserved: u64,
        num_locked_contributions: usize,
    ) -> u64 {
        let needed = staking_requirement.saturating_sub(total_reserved);
        match self.era {
            StakingEra::InfiniteStaking => {
                let slots = MAX_NUMBER_OF_CONTRIBUTORS * MAX_KEY_IMAGES_PER_CONTRIBUTOR;
                if num_locked_contributions >= slots {
                    return u64::MAX;
                }
                needed / (slots - num_locked_contributions) as u64
            }
            StakingEra::Legacy | StakingEra::GracePeriod => {
                needed.min(staking_requirement / MAX_NUMBER_OF_CONTRIBUTORS as u64)
            }
        }
    }

    /// Oldest uptime proof major version accepted.
    pub fn min_uptime_proof_major_version(&self) -> u16 {
        match self.era {
            StakingEra::Legacy => 0,
            StakingEra::GracePeriod => 2,
            StakingEra::InfiniteStaking => 3,
        }
    }

    /// Whether registration portions are acceptable.
    ///
    /// Each slot must meet the minimum contribution computed over
    /// `STAKING_PORTIONS` with the slots before it reserved, and the total must
    /// not exceed `STAKING_PORTIONS`.
    pub fn check_service_node_portions(&self, portions: &[u64]) -> bool {
        if portions.len() > MAX_NUMBER_OF_CONTRIBUTORS {
            return false;
        }
        let mut reserved: u64 = 0;
        for (i, &portion) in portions.iter().enumerate() {
            if reserved > STAKING_PORTIONS {
                return false;
            }
            if portion < self.min_node_contribution(STAKING_PORTIONS, reserved, i) {
                return false;
            }
            reserved = match reserved.checked_add(portion) {
                Some(r) => r,
                None => return false,
            };
        }
        reserved <= STAKING_PORTIONS
    }
}

/// Blocks a stake stays locked on `network`.
pub fn staking_num_lock_blocks(network: NetworkType) -> u64 {
    match network {
        NetworkType::Fakechain => 30,
        NetworkType::Testnet => BLOCKS_EXPECTED_IN_DAYS * 2,
        NetworkType::Mainnet | NetworkType::Stagenet => BLOCKS_EXPECTED_IN_DAYS * 30,
    }
}

/// Stake required to register at `height`.
///
/// On production networks the requirement decays from 45 000 coins toward a
/// 10 000 coin floor, halving the variable part every 129 600 blocks and
/// interpolating linearly within a halving period. A linear schedule bounds
/// it from below until it flattens at 15 000 coins.
pub fn get_staking_requirement(network: NetworkType, height: u64) -> u64 {
    const HALVING_PERIOD: u64 = 129_600;
    const LINEAR_END_HEIGHT: u64 = 3_628_800;

    if matches!(network, NetworkType::Testnet | NetworkType::Fakechain) {
        return 100 * COIN;
    }

    let fork_height = network.service_node_fork_height();
    let adjusted = height.max(fork_height) - fork_height;

    let halvings = adjusted / HALVING_PERIOD;
    let into_period = adjusted % HALVING_PERIOD;
    let variable = if halvings >= 63 {
        0
    } else {
        let start = (35_000 * COIN) >> halvings;
        let end = start >> 1;
        let drop = (start - end) as u128 * into_period as u128 / HALVING_PERIOD as u128;
        start - drop as u64
    };
    let curve = 10_000 * COIN + variable;

    let linear = if height < LINEAR_END_HEIGHT {
        (5 * COIN as u128 * height as u128 / 2_592) as u64 + 8_000 * COIN
    } else {
        15_000 * COIN
    };

    curve.max(linear)
}

/// `amount * portions / STAKING_PORTIONS` without overflow.
pub fn portions_to_amount(portions: u64, amount: u64) -> u64 {
    (amount as u128 * portions as u128 / STAKING_PORTIONS as u128) as u64
}
