pub mod balancer;
pub mod curator;
pub mod l1;
pub mod middleware;
pub mod operator;
pub mod staker;
pub mod vault;
pub mod vault_manager;

use crate::cli::SignerArgs;
use crate::client::Client;
use crate::query::VaultAmounts;
use crate::rpc::EthRpc;
use crate::signer::{load_signer, AnySigner, SignerOptions};
use crate::types::format_units;
use alloy_primitives::{Address, U256};
use dialoguer::Input;

/// Resolve the signing backend. Prints why when there is none to use.
pub(crate) async fn signer_or_report(args: &SignerArgs, chain_id: u64) -> Option<AnySigner> {
    let options = SignerOptions {
        private_key: args.private_key,
        ledger: args.ledger,
        ledger_address: args.ledger_address,
    };
    match load_signer(&options, chain_id).await {
        Ok(Some(signer)) => Some(signer),
        Ok(None) => {
            println!("Private key or ledger is required");
            None
        }
        Err(err) => {
            println!("Failed! Reason: {err:#}");
            None
        }
    }
}

/// Ask a yes/no question. Only an exact `y` proceeds; anything else prints `Cancel`.
pub(crate) fn confirm(question: &str) -> bool {
    let answer = Input::<String>::new()
        .with_prompt(question)
        .allow_empty(true)
        .interact_text();
    match answer {
        Ok(answer) if answer == "y" => true,
        Ok(_) => {
            println!("Cancel");
            false
        }
        Err(err) => {
            tracing::debug!("prompt failed: {err}");
            println!("Cancel");
            false
        }
    }
}

fn indented(indent: usize, line: impl std::fmt::Display) {
    println!("{:indent$}{line}", "");
}

/// Vaults grouped by collateral, in first-seen order.
fn group_by_collateral(vaults: &[VaultAmounts]) -> Vec<(Address, Vec<&VaultAmounts>)> {
    let mut groups: Vec<(Address, Vec<&VaultAmounts>)> = Vec::new();
    for vault in vaults {
        match groups.iter_mut().find(|(collateral, _)| *collateral == vault.vault.collateral) {
            Some((_, members)) => members.push(vault),
            None => groups.push((vault.vault.collateral, vec![vault])),
        }
    }
    groups
}

/// Print per-group stakes by collateral, then the grand totals per collateral.
///
/// `heading` names what each group is keyed by, `Operator` or `L1`.
pub(crate) async fn print_stakes<C: EthRpc>(
    client: &Client<C>,
    heading: &str,
    groups: &[(Address, Vec<VaultAmounts>)],
) {
    let mut totals: Vec<(Address, U256)> = Vec::new();
    for (key, vaults) in groups {
        indented(2, format!("{heading}: {key}"));
        let mut parts = Vec::new();
        for (collateral, members) in group_by_collateral(vaults) {
            let meta = client.token_meta(collateral).await;
            indented(4, format!("Collateral: {collateral} ({})", meta.symbol));
            let mut sum = U256::ZERO;
            for vault in members {
                indented(6, format!("Vault: {}", vault.vault.vault));
                indented(8, format!("Type: {} / {}", vault.vault.delegator_type, vault.vault.slasher_type));
                indented(8, format!("Stake: {}", format_units(vault.total(), meta.decimals)));
                sum = sum.saturating_add(vault.total());
            }
            parts.push(format!("{} {}", format_units(sum, meta.decimals), meta.symbol));
            match totals.iter_mut().find(|(token, _)| *token == collateral) {
                Some((_, total)) => *total = total.saturating_add(sum),
                None => totals.push((collateral, sum)),
            }
        }
        if parts.is_empty() {
            indented(4, "Total stake: 0");
        } else {
            indented(4, format!("Total stake: {}", parts.join(" + ")));
        }
        println!();
    }

    println!("Total stakes:");
    for (collateral, total) in totals {
        let meta = client.token_meta(collateral).await;
        indented(
            2,
            format!("Collateral {collateral} ({}): {}", meta.symbol, format_units(total, meta.decimals)),
        );
    }
}
