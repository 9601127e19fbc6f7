//! Vault curator commands. They act on the vault's delegator, so the vault is
//! resolved to its delegator before anything is signed.

use crate::abi::{address_arg, uint_arg, Entity};
use crate::cli::{SetL1LimitArgs, SetMaxL1LimitArgs, SetOperatorL1SharesArgs};
use crate::client::{Client, WriteCall};
use crate::commands::signer_or_report;
use crate::query::DelegatorType;
use crate::rpc::EthRpc;
use alloy_primitives::Address;
use anyhow::Result;

const NO_L1_LIMITS: &str = "Delegator doesn't have such functionality.";
const NO_OPERATOR_SHARES: &str = "It is not a L1RestakeDelegator.";

/// The vault's delegator, or `None` after printing `refusal` when it is not an L1 restake delegator.
async fn restake_delegator<C: EthRpc>(client: &Client<C>, vault: Address, refusal: &str) -> Result<Option<Address>> {
    let delegator = client.delegator(vault).await?;
    let delegator_type = DelegatorType::from_code(client.entity_type(delegator).await.ok());
    if delegator_type != DelegatorType::L1Restake {
        tracing::debug!(%vault, %delegator, %delegator_type, "unexpected delegator type");
        println!("{refusal}");
        return Ok(None);
    }
    Ok(Some(delegator))
}

pub async fn set_max_l1_limit<C: EthRpc>(args: SetMaxL1LimitArgs, client: &Client<C>) -> Result<()> {
    let delegator = client.delegator(args.vault).await?;
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let call = WriteCall::new(
        Entity::Delegator,
        delegator,
        "setMaxL1Limit",
        vec![
            address_arg(args.l1),
            uint_arg(args.asset_class, 96),
            uint_arg(args.max_limit, 256),
        ],
    );
    let success = format!(
        "Successfully set max limit = {} in vault = {}",
        args.max_limit, args.vault
    );
    client.write(&signer, call, &success).await;
    Ok(())
}

pub async fn set_l1_limit<C: EthRpc>(args: SetL1LimitArgs, client: &Client<C>) -> Result<()> {
    let Some(delegator) = restake_delegator(client, args.vault, NO_L1_LIMITS).await? else {
        return Ok(());
    };
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let call = WriteCall::new(
        Entity::Delegator,
        delegator,
        "setL1Limit",
        vec![
            address_arg(args.l1),
            uint_arg(args.asset_class, 96),
            uint_arg(args.limit, 256),
        ],
    );
    let success = format!(
        "Successfully set limit = {} for asset class = {}",
        args.limit, args.asset_class
    );
    client.write(&signer, call, &success).await;
    Ok(())
}

pub async fn set_operator_l1_shares<C: EthRpc>(args: SetOperatorL1SharesArgs, client: &Client<C>) -> Result<()> {
    let Some(delegator) = restake_delegator(client, args.vault, NO_OPERATOR_SHARES).await? else {
        return Ok(());
    };
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let call = WriteCall::new(
        Entity::Delegator,
        delegator,
        "setOperatorL1Shares",
        vec![
            address_arg(args.l1),
            uint_arg(args.asset_class, 96),
            address_arg(args.operator),
            uint_arg(args.shares, 256),
        ],
    );
    let success = format!(
        "Successfully set shares = {} for operator = {} in asset class = {}",
        args.shares, args.operator, args.asset_class
    );
    client.write(&signer, call, &success).await;
    Ok(())
}
