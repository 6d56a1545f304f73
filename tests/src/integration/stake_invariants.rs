//! # Stake Properties
//!
//! Arbitrary contribution sequences against a partly reserved node never
//! break the stake accounting, whichever era the chain is in.

#[cfg(test)]
mod tests {
    use crate::integration::init_tracing;
    use proptest::prelude::*;
    use shared_types::{COIN, HF_VERSION_GRACE_PERIOD, HF_VERSION_INFINITE_STAKING};
    use sn_01_service_node_list::domain::{MAX_NUMBER_OF_CONTRIBUTORS, STAKING_PORTIONS};
    use sn_01_service_node_list::testing::{
        contribution_tx, registration_tx, Registration, TestChain, TestWallet,
    };
    use sn_01_service_node_list::ServiceNodeListApi;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_contributions_keep_stake_consistent(
            hf_version in prop::sample::select(vec![
                HF_VERSION_GRACE_PERIOD,
                HF_VERSION_INFINITE_STAKING,
            ]),
            operator_quarters in 1u64..=4,
            contributions in prop::collection::vec((1u32..=7, 1u64..=120), 0..10),
        ) {
            init_tracing();
            let chain = TestChain::new(hf_version);
            chain.add_empty_blocks(1);

            let operator = TestWallet::from_seed(1);
            let key = operator.node_keys().public_key;
            let height = chain.height();
            let requirement = chain.list.staking_requirement(height);
            let registration = Registration::with_shares(
                &operator,
                &[(operator.address, STAKING_PORTIONS / 4 * operator_quarters)],
                TestChain::timestamp(height) + 3_600,
            );
            chain.add_block(vec![registration_tx(
                &registration,
                chain.policy(),
                height,
                requirement / 4 * operator_quarters,
            )
            .tx]);

            let mut funded = chain.list.snapshot().infos[&key].total_contributed;
            prop_assert_eq!(funded, requirement / 4 * operator_quarters);

            for (seed, coins) in contributions {
                let was_full = chain.list.snapshot().infos[&key].is_fully_funded();
                let height = chain.height();
                let tx = contribution_tx(
                    &TestWallet::from_seed(seed),
                    &key,
                    chain.policy(),
                    height,
                    coins * COIN,
                );
                chain.add_block(vec![tx.tx]);

                let info = chain.list.snapshot().infos[&key].clone();
                prop_assert!(info.check_invariants().is_ok());
                prop_assert!(info.total_contributed <= info.staking_requirement);
                prop_assert!(info.total_contributed >= funded);
                prop_assert!(info.contributors.len() <= MAX_NUMBER_OF_CONTRIBUTORS);
                prop_assert_eq!(info.contributors[0].address, operator.address);
                if was_full {
                    prop_assert_eq!(info.total_contributed, funded);
                }
                funded = info.total_contributed;

                if info.is_fully_funded() {
                    let payouts = chain.list.winner_addresses_and_portions();
                    let total: u128 = payouts.iter().map(|(_, p)| *p as u128).sum();
                    prop_assert!(total <= STAKING_PORTIONS as u128);
                }
            }
        }
    }
}
