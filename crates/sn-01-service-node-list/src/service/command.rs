//! `register_service_node` wallet command builder.

use crate::domain::{
    registration_hash_input, RegistrationCmdError, ServiceNodeKeys, StakingPolicy,
    MAX_NUMBER_OF_CONTRIBUTORS, STAKING_AUTHORIZATION_EXPIRATION_WINDOW, STAKING_PORTIONS,
};
use crate::ports::CryptoProvider;
use chrono::DateTime;
use shared_types::AccountAddress;
use std::collections::HashSet;

fn parse_portions(arg: &str) -> Result<u64, RegistrationCmdError> {
    arg.parse::<u64>()
        .map_err(|_| RegistrationCmdError::InvalidPortions(arg.to_string()))
}

/// Build a signed registration command for the node owning `keys`.
///
/// `args` is `<operator cut> <address> <portions> [<address> <portions> ...]`.
/// Contributors after the operator are reordered by descending portions so
/// that later, smaller slots meet their lower minimum.
pub(crate) fn build_registration_cmd<C: CryptoProvider + ?Sized>(
    crypto: &C,
    keys: &ServiceNodeKeys,
    policy: StakingPolicy,
    now: u64,
    args: &[String],
    make_friendly: bool,
) -> Result<String, RegistrationCmdError> {
    if args.len() < 3 || args.len() % 2 == 0 {
        return Err(RegistrationCmdError::Usage);
    }
    if (args.len() - 1) / 2 > MAX_NUMBER_OF_CONTRIBUTORS {
        return Err(RegistrationCmdError::TooManyContributors(
            MAX_NUMBER_OF_CONTRIBUTORS,
        ));
    }

    let portions_for_operator = parse_portions(&args[0])?;
    if portions_for_operator > STAKING_PORTIONS {
        return Err(RegistrationCmdError::InvalidPortions(args[0].clone()));
    }

    let mut seen = HashSet::new();
    let mut contributors: Vec<(AccountAddress, u64)> = Vec::with_capacity(args.len() / 2);
    for pair in args[1..].chunks_exact(2) {
        let address: AccountAddress = pair[0]
            .parse()
            .map_err(|_| RegistrationCmdError::InvalidAddress(pair[0].clone()))?;
        if !seen.insert(address) {
            return Err(RegistrationCmdError::DuplicateAddress(pair[0].clone()));
        }
        contributors.push((address, parse_portions(&pair[1])?));
    }
    contributors[1..].sort_by(|a, b| b.1.cmp(&a.1));

    let mut reserved: u64 = 0;
    for (slot, (address, portions)) in contributors.iter().enumerate() {
        let minimum = policy.min_node_contribution(STAKING_PORTIONS, reserved, slot);
        let remaining = STAKING_PORTIONS - reserved;
        if *portions < minimum || *portions > remaining {
            return Err(RegistrationCmdError::InvalidContributorAmount {
                address: address.to_string(),
                portions: *portions,
                minimum,
                remaining,
            });
        }
        reserved += portions;
    }

    let addresses: Vec<AccountAddress> = contributors.iter().map(|(a, _)| *a).collect();
    let portions: Vec<u64> = contributors.iter().map(|(_, p)| *p).collect();
    let expiration = now + STAKING_AUTHORIZATION_EXPIRATION_WINDOW;
    let hash = crypto.fast_hash(&registration_hash_input(
        &addresses,
        portions_for_operator,
        &portions,
        expiration,
    ));
    let signature = crypto
        .generate_signature(&hash, &keys.public_key, &keys.secret_key)
        .ok_or(RegistrationCmdError::SigningFailed)?;

    let mut cmd = format!("register_service_node {}", portions_for_operator);
    for (address, portions) in &contributors {
        cmd.push_str(&format!(" {} {}", address, portions));
    }
    cmd.push_str(&format!(" {} {} {}", expiration, keys.public_key, signature));

    if !make_friendly {
        return Ok(cmd);
    }
    let expires_at = DateTime::from_timestamp(expiration as i64, 0)
        .map(|t| t.format("%Y-%m-%d %I:%M:%S %p UTC").to_string())
        .unwrap_or_else(|| expiration.to_string());
    Ok(format!(
        "Run this command in the wallet that will fund this registration:\n\n\
         {}\n\n\
         This registration expires at {}.\n\
         This should be in about 2 weeks, if it isn't, check this computer's clock.\n\
         Please submit your registration into the blockchain before this time or it will be invalid.",
        cmd, expires_at
    ))
}
