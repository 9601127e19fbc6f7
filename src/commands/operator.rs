use crate::abi::{address_arg, Entity};
use crate::cli::{
    AddressArgs, L1SignatureArgs, L1WriteArgs, OpVaultL1Args, OperatorArgs, OperatorL1Args,
    OperatorVaultArgs, RegisterOperatorArgs, SignerArgs, VaultSignatureArgs, VaultWriteArgs,
};
use crate::client::{Client, WriteCall};
use crate::commands::{confirm, print_stakes, signer_or_report};
use crate::query::{self, DelegatorType};
use crate::rpc::EthRpc;
use crate::typed_data::{sign_authorization, Authorization, OptInService};
use crate::types::format_units;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use anyhow::Result;

pub async fn is_op<C: EthRpc>(args: AddressArgs, client: &Client<C>) -> Result<()> {
    println!("{}", client.is_operator(args.address).await?);
    Ok(())
}

pub async fn ops<C: EthRpc>(client: &Client<C>) -> Result<()> {
    let operators = query::operators(client).await?;
    println!("All operators [{} total]:", operators.len());
    for operator in operators {
        println!("  Operator: {operator}");
    }
    Ok(())
}

/// `shares / total` as a percentage with two decimals, rounded down.
fn share_percent(shares: U256, total: U256) -> String {
    if total.is_zero() {
        return "0.00".to_string();
    }
    let basis_points = shares.saturating_mul(U256::from(10_000u64)) / total;
    let hundred = U256::from(100u64);
    format!("{}.{:0>2}", basis_points / hundred, (basis_points % hundred).to_string())
}

pub async fn op_vault_l1_stake<C: EthRpc>(args: OpVaultL1Args, client: &Client<C>) -> Result<()> {
    let delegator = client.delegator(args.vault).await?;
    let collateral = client.collateral(args.vault).await?;
    let meta = client.token_meta(collateral).await;
    let delegator_type = DelegatorType::from_code(client.entity_type(delegator).await.ok());

    println!("Operator stake in vault = {}", args.vault);
    println!();
    for asset_class in client.asset_classes() {
        let stake = client.stake(delegator, args.l1, *asset_class, args.operator).await?;
        println!(
            "for asset_class = {asset_class} is {} {}",
            format_units(stake, meta.decimals),
            meta.symbol
        );
        if delegator_type == DelegatorType::L1Restake {
            let shares = client
                .operator_l1_shares(delegator, args.l1, *asset_class, args.operator)
                .await?;
            let total = client
                .total_operator_l1_shares(delegator, args.l1, *asset_class)
                .await?;
            println!(
                "which is {}% ({shares} / {total} in shares) of L1 stake",
                share_percent(shares, total)
            );
        }
    }
    Ok(())
}

pub async fn op_l1s<C: EthRpc>(args: OperatorArgs, client: &Client<C>) -> Result<()> {
    let l1s = query::op_l1s(client, args.operator).await?;
    println!("Operator: {}", args.operator);
    println!("L1s [{} total]:", l1s.len());
    for l1 in l1s {
        println!("  L1: {}", l1.l1);
    }
    Ok(())
}

pub async fn op_stakes<C: EthRpc>(args: OperatorArgs, client: &Client<C>) -> Result<()> {
    let stakes = query::op_l1s_vaults(client, args.operator).await?;
    println!("Operator: {}", args.operator);
    println!("L1s [{} total]:", stakes.len());
    let groups: Vec<_> = stakes.into_iter().map(|stake| (stake.l1, stake.vaults)).collect();
    print_stakes(client, "L1", &groups).await;
    Ok(())
}

fn service_noun(service: OptInService) -> &'static str {
    match service {
        OptInService::L1 => "L1",
        OptInService::Vault => "vault",
    }
}

fn opt_in_status(operator: Address, service: OptInService, target: Address, opted_in: bool) -> String {
    let verb = if opted_in { "IS" } else { "IS NOT" };
    format!(
        "Operator = {operator} {verb} opted in to {} = {target}",
        service_noun(service)
    )
}

pub async fn check_opt_in_vault<C: EthRpc>(args: OperatorVaultArgs, client: &Client<C>) -> Result<()> {
    let opted_in = client
        .is_opted_in(OptInService::Vault, args.operator, args.vault)
        .await?;
    println!("{}", opt_in_status(args.operator, OptInService::Vault, args.vault, opted_in));
    Ok(())
}

pub async fn check_opt_in_l1<C: EthRpc>(args: OperatorL1Args, client: &Client<C>) -> Result<()> {
    let opted_in = client.is_opted_in(OptInService::L1, args.operator, args.l1).await?;
    println!("{}", opt_in_status(args.operator, OptInService::L1, args.l1, opted_in));
    Ok(())
}

pub async fn register_operator<C: EthRpc>(args: RegisterOperatorArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let call = WriteCall::new(
        Entity::OperatorRegistry,
        client.deployment.op_registry,
        "registerOperator",
        vec![DynSolValue::String(args.metadata_url)],
    );
    client
        .write(&signer, call, "Successfully registered as an operator")
        .await;
    Ok(())
}

async fn submit_opt<C: EthRpc>(
    client: &Client<C>,
    signer_args: &SignerArgs,
    service: OptInService,
    kind: Authorization,
    target: Address,
) -> Result<()> {
    let Some(signer) = signer_or_report(signer_args, client.chain_id()).await else {
        return Ok(());
    };
    let (function, success) = match kind {
        Authorization::OptIn => ("optIn", format!("Successfully opted in to {} = {target}", service_noun(service))),
        Authorization::OptOut => ("optOut", format!("Successfully opted out from {} = {target}", service_noun(service))),
    };
    let call = WriteCall::new(
        service.entity(),
        service.address(&client.deployment),
        function,
        vec![address_arg(target)],
    );
    client.write(&signer, call, &success).await;
    Ok(())
}

pub async fn opt_in_vault<C: EthRpc>(args: VaultWriteArgs, client: &Client<C>) -> Result<()> {
    submit_opt(client, &args.signer, OptInService::Vault, Authorization::OptIn, args.vault).await
}

pub async fn opt_out_vault<C: EthRpc>(args: VaultWriteArgs, client: &Client<C>) -> Result<()> {
    submit_opt(client, &args.signer, OptInService::Vault, Authorization::OptOut, args.vault).await
}

pub async fn opt_in_l1<C: EthRpc>(args: L1WriteArgs, client: &Client<C>) -> Result<()> {
    submit_opt(client, &args.signer, OptInService::L1, Authorization::OptIn, args.l1).await
}

pub async fn opt_out_l1<C: EthRpc>(args: L1WriteArgs, client: &Client<C>) -> Result<()> {
    submit_opt(client, &args.signer, OptInService::L1, Authorization::OptOut, args.l1).await
}

async fn sign_opt<C: EthRpc>(
    client: &Client<C>,
    signer_args: &SignerArgs,
    service: OptInService,
    kind: Authorization,
    target: Address,
    duration: u64,
) -> Result<()> {
    let Some(signer) = signer_or_report(signer_args, client.chain_id()).await else {
        return Ok(());
    };
    let action = match kind {
        Authorization::OptIn => "opt-in to",
        Authorization::OptOut => "opt-out from",
    };
    let question = format!(
        "Are you sure you want to sign an {action} {} = {target} that anyone can submit? (y/n)",
        service_noun(service)
    );
    if !confirm(&question) {
        return Ok(());
    }
    sign_authorization(client, &signer, service, kind, target, duration).await?;
    Ok(())
}

pub async fn opt_in_vault_signature<C: EthRpc>(args: VaultSignatureArgs, client: &Client<C>) -> Result<()> {
    sign_opt(client, &args.signer, OptInService::Vault, Authorization::OptIn, args.vault, args.duration).await
}

pub async fn opt_out_vault_signature<C: EthRpc>(args: VaultSignatureArgs, client: &Client<C>) -> Result<()> {
    sign_opt(client, &args.signer, OptInService::Vault, Authorization::OptOut, args.vault, args.duration).await
}

pub async fn opt_in_l1_signature<C: EthRpc>(args: L1SignatureArgs, client: &Client<C>) -> Result<()> {
    sign_opt(client, &args.signer, OptInService::L1, Authorization::OptIn, args.l1, args.duration).await
}

pub async fn opt_out_l1_signature<C: EthRpc>(args: L1SignatureArgs, client: &Client<C>) -> Result<()> {
    sign_opt(client, &args.signer, OptInService::L1, Authorization::OptOut, args.l1, args.duration).await
}
