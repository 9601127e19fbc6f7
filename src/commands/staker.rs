use crate::abi::{address_arg, uint_arg, Entity};
use crate::cli::{ClaimArgs, DepositArgs, WithdrawArgs};
use crate::client::{Client, WriteCall};
use crate::commands::{confirm, signer_or_report};
use crate::rpc::EthRpc;
use crate::signer::StakingSigner;
use crate::types::{format_timestamp, format_units, needs_confirmation, or_signer};
use alloy_primitives::{Address, U256};
use anyhow::Result;

/// Why a claim for `epoch` must not be sent, if it must not.
fn claim_refusal(epoch: U256, current_epoch: U256, withdrawals: U256, claimed: bool) -> Option<String> {
    if epoch >= current_epoch {
        Some(format!("Epoch {epoch} isn't claimable yet"))
    } else if withdrawals.is_zero() {
        Some(format!("No withdrawals for epoch {epoch}"))
    } else if claimed {
        Some(format!("Already claimed withdrawals for epoch {epoch}"))
    } else {
        None
    }
}

/// A withdrawal made now is recorded in the next epoch and unlocks when that epoch ends.
fn withdrawal_schedule(current_epoch: U256, epoch_start: u64, epoch_duration: u64) -> (U256, u64) {
    let next_epoch = current_epoch.saturating_add(U256::from(1u64));
    let unlocks_at = epoch_start.saturating_add(epoch_duration.saturating_mul(2));
    (next_epoch, unlocks_at)
}

fn beneficiary(requested: Option<Address>, signer: Address) -> Address {
    requested.map_or(signer, |target| or_signer(target, signer))
}

pub async fn deposit<C: EthRpc>(args: DepositArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let from = signer.address();
    let on_behalf_of = beneficiary(args.on_behalf_of, from);
    let collateral = client.collateral(args.vault).await?;
    let meta = client.token_meta(collateral).await;
    let amount = args.amount.to_wei(meta.decimals)?;

    if needs_confirmation(on_behalf_of, from) {
        let question = format!(
            "Are you sure you want to deposit {} {} to vault = {} on behalf of {on_behalf_of}? (y/n)",
            args.amount, meta.symbol, args.vault
        );
        if !confirm(&question) {
            return Ok(());
        }
    }

    let allowance = client.allowance(collateral, from, args.vault).await?;
    tracing::debug!(%from, %collateral, %allowance, %amount, "checked allowance");
    if allowance < amount {
        println!("Need to approve the vault to spend the tokens");
        let approve = WriteCall::new(
            Entity::Erc20,
            collateral,
            "approve",
            vec![address_arg(args.vault), uint_arg(amount, 256)],
        );
        let success = format!(
            "Successfully approved {} {} for deposit to vault = {}",
            args.amount, meta.symbol, args.vault
        );
        if client.write(&signer, approve, &success).await.is_none() {
            return Ok(());
        }
    }

    println!("Depositing...");
    let call = WriteCall::new(
        Entity::Vault,
        args.vault,
        "deposit",
        vec![address_arg(on_behalf_of), uint_arg(amount, 256)],
    );
    let success = format!(
        "Successfully deposited {} {} to vault = {} on behalf of {on_behalf_of}",
        args.amount, meta.symbol, args.vault
    );
    client.write(&signer, call, &success).await;
    Ok(())
}

pub async fn withdraw<C: EthRpc>(args: WithdrawArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let from = signer.address();
    let claimer = beneficiary(args.claimer, from);
    let collateral = client.collateral(args.vault).await?;
    let meta = client.token_meta(collateral).await;
    let amount = args.amount.to_wei(meta.decimals)?;

    if needs_confirmation(claimer, from) {
        let question = format!(
            "Are you sure you want to withdraw {} {} from vault = {} with claimer = {claimer}? (y/n)",
            args.amount, meta.symbol, args.vault
        );
        if !confirm(&question) {
            return Ok(());
        }
    }

    let current_epoch = client.current_epoch(args.vault).await?;
    let epoch_start = client.current_epoch_start(args.vault).await?;
    let epoch_duration = client.epoch_duration(args.vault).await?;
    let (next_epoch, unlocks_at) = withdrawal_schedule(current_epoch, epoch_start, epoch_duration);

    let call = WriteCall::new(
        Entity::Vault,
        args.vault,
        "withdraw",
        vec![address_arg(claimer), uint_arg(amount, 256)],
    );
    let success = format!(
        "Successfully withdrew {} {} from vault = {} with claimer = {claimer}\n\
         It will be claimable after epoch {next_epoch} ends ({})",
        args.amount,
        meta.symbol,
        args.vault,
        format_timestamp(unlocks_at)
    );
    client.write(&signer, call, &success).await;
    Ok(())
}

pub async fn claim<C: EthRpc>(args: ClaimArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let from = signer.address();
    let recipient = beneficiary(args.recipient, from);

    let current_epoch = client.current_epoch(args.vault).await?;
    let withdrawals = client.withdrawals(args.vault, args.epoch, from).await?;
    let claimed = client.withdrawals_claimed(args.vault, args.epoch, from).await?;
    if let Some(refusal) = claim_refusal(args.epoch, current_epoch, withdrawals, claimed) {
        println!("{refusal}");
        return Ok(());
    }

    let meta = client.token_meta(client.collateral(args.vault).await?).await;
    let readable = format_units(withdrawals, meta.decimals);
    if needs_confirmation(recipient, from) {
        let question = format!(
            "Are you sure you want to claim {readable} {} from vault = {} to recipient = {recipient}? (y/n)",
            meta.symbol, args.vault
        );
        if !confirm(&question) {
            return Ok(());
        }
    }

    let call = WriteCall::new(
        Entity::Vault,
        args.vault,
        "claim",
        vec![address_arg(recipient), uint_arg(args.epoch, 256)],
    );
    let success = format!(
        "Successfully claimed {readable} {} from vault = {} to recipient = {recipient} for epoch = {}",
        meta.symbol, args.vault, args.epoch
    );
    client.write(&signer, call, &success).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::tests::test_abis;
    use crate::cli::SignerArgs;
    use crate::client::tests::mock_client;
    use crate::multicall::tests::MockChain;
    use crate::signer::tests::{ANVIL_ADDRESS, ANVIL_KEY};
    use alloy_primitives::{address, Selector};
    use alloy_sol_types::SolValue;

    const VAULT: Address = address!("5050505050505050505050505050505050505050");
    const TOKEN: Address = address!("7777777777777777777777777777777777777777");
    const ONE_TOKEN: u64 = 1_000_000_000_000_000_000;

    /// A vault over an 18-decimal token where the anvil account has approved `allowance`.
    fn vault_chain(allowance: U256) -> MockChain {
        let abis = test_abis();
        let mut chain = MockChain::default();
        chain.respond(VAULT, abis.function(Entity::Vault, "collateral", 0).unwrap(), &[], TOKEN.abi_encode());
        chain.respond(
            TOKEN,
            abis.function(Entity::Erc20, "symbol", 0).unwrap(),
            &[],
            ("sAVAX".to_string(),).abi_encode_params(),
        );
        chain.respond(TOKEN, abis.function(Entity::Erc20, "decimals", 0).unwrap(), &[], U256::from(18u8).abi_encode());
        chain.respond(
            TOKEN,
            abis.function(Entity::Erc20, "allowance", 2).unwrap(),
            &[address_arg(ANVIL_ADDRESS), address_arg(VAULT)],
            allowance.abi_encode(),
        );
        chain
    }

    fn deposit_args(on_behalf_of: Option<Address>) -> DepositArgs {
        DepositArgs {
            vault: VAULT,
            amount: "1".parse().unwrap(),
            on_behalf_of,
            signer: SignerArgs {
                private_key: Some(ANVIL_KEY),
                ledger: false,
                ledger_address: None,
            },
        }
    }

    fn selector(entity: Entity, name: &str) -> Selector {
        test_abis().function(entity, name, 2).unwrap().selector()
    }

    fn epoch(value: u64) -> U256 {
        U256::from(value)
    }

    #[test]
    fn current_epoch_is_not_claimable() {
        assert_eq!(
            claim_refusal(epoch(5), epoch(5), epoch(10), false).as_deref(),
            Some("Epoch 5 isn't claimable yet")
        );
    }

    #[test]
    fn withdrawal_unlocks_after_the_next_epoch() {
        let (recorded, unlocks_at) = withdrawal_schedule(epoch(5), 1_000, 100);
        assert_eq!(recorded, epoch(6));
        assert_eq!(unlocks_at, 1_200);
        assert!(claim_refusal(recorded, epoch(6), epoch(10), false).is_some());
        assert_eq!(claim_refusal(recorded, epoch(7), epoch(10), false), None);
    }

    #[test]
    fn empty_or_claimed_epochs_are_refused() {
        assert_eq!(
            claim_refusal(epoch(3), epoch(5), U256::ZERO, false).as_deref(),
            Some("No withdrawals for epoch 3")
        );
        assert_eq!(
            claim_refusal(epoch(3), epoch(5), epoch(1), true).as_deref(),
            Some("Already claimed withdrawals for epoch 3")
        );
    }

    #[test]
    fn own_address_needs_no_confirmation() {
        let other = Address::repeat_byte(0x42);
        assert_eq!(beneficiary(None, ANVIL_ADDRESS), ANVIL_ADDRESS);
        assert_eq!(beneficiary(Some(Address::ZERO), ANVIL_ADDRESS), ANVIL_ADDRESS);
        assert!(!needs_confirmation(beneficiary(Some(ANVIL_ADDRESS), ANVIL_ADDRESS), ANVIL_ADDRESS));
        assert!(needs_confirmation(beneficiary(Some(other), ANVIL_ADDRESS), ANVIL_ADDRESS));
    }

    #[tokio::test]
    async fn deposit_for_self_skips_prompt_and_approve() {
        let client = mock_client(vault_chain(U256::from(2 * ONE_TOKEN)));
        deposit(deposit_args(Some(ANVIL_ADDRESS)), &client).await.unwrap();

        let chain = client.caller();
        assert_eq!(chain.sent_selectors(), vec![(VAULT, selector(Entity::Vault, "deposit"))]);
        let expected = (ANVIL_ADDRESS, U256::from(ONE_TOKEN)).abi_encode_params();
        assert_eq!(&chain.sent.borrow()[0].input[4..], &expected[..]);
    }

    #[tokio::test]
    async fn short_allowance_is_approved_before_deposit() {
        let client = mock_client(vault_chain(U256::ZERO));
        deposit(deposit_args(None), &client).await.unwrap();

        let chain = client.caller();
        assert_eq!(
            chain.sent_selectors(),
            vec![
                (TOKEN, selector(Entity::Erc20, "approve")),
                (VAULT, selector(Entity::Vault, "deposit")),
            ]
        );
        let nonces: Vec<u64> = chain.sent.borrow().iter().map(|tx| tx.nonce).collect();
        assert_eq!(nonces, vec![0, 1]);
    }

    #[tokio::test]
    async fn failed_approve_stops_the_deposit() {
        let mut chain = vault_chain(U256::ZERO);
        chain.reject(TOKEN, selector(Entity::Erc20, "approve"));
        let client = mock_client(chain);

        deposit(deposit_args(None), &client).await.unwrap();
        assert!(client.caller().sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_deposit_is_reported_not_raised() {
        let mut chain = vault_chain(U256::from(ONE_TOKEN));
        chain.reject(VAULT, selector(Entity::Vault, "deposit"));
        let client = mock_client(chain);

        assert!(deposit(deposit_args(None), &client).await.is_ok());
        assert!(client.caller().sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn deposit_without_signer_sends_nothing() {
        let client = mock_client(vault_chain(U256::ZERO));
        let mut args = deposit_args(None);
        args.signer.private_key = None;

        deposit(args, &client).await.unwrap();
        assert!(client.caller().sent.borrow().is_empty());
        assert_eq!(client.caller().round_trips.get(), 0);
    }
}
