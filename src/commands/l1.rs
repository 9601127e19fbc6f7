use crate::abi::{address_arg, Entity};
use crate::cli::{AddressArgs, L1Args, L1sArgs, RegisterL1Args, SubnetworkArgs};
use crate::client::{Client, WriteCall};
use crate::commands::{print_stakes, signer_or_report};
use crate::query;
use crate::rpc::EthRpc;
use crate::signer::StakingSigner;
use crate::types::{format_units, subnetwork as subnetwork_key};
use alloy_dyn_abi::DynSolValue;
use anyhow::Result;

pub async fn is_l1<C: EthRpc>(args: AddressArgs, client: &Client<C>) -> Result<()> {
    println!("{}", client.is_l1(args.address).await?);
    Ok(())
}

pub async fn l1s<C: EthRpc>(args: L1sArgs, client: &Client<C>) -> Result<()> {
    let l1s = query::l1s(client).await?;
    println!("All L1s [{} total]:", l1s.len());
    for l1 in l1s {
        println!("  L1: {}", l1.l1);
        println!("    Middleware: {}", l1.middleware);
        println!("    Metadata: {}", l1.metadata_url);
        if args.full {
            let operators = query::l1_ops(client, l1.l1).await?;
            let vaults = query::l1_vaults(client, l1.l1).await?;
            println!("    Operators: {} total", operators.len());
            println!("    Vaults: {} total", vaults.len());
        }
        println!();
    }
    Ok(())
}

pub async fn l1_ops<C: EthRpc>(args: L1Args, client: &Client<C>) -> Result<()> {
    let operators = query::l1_ops(client, args.l1).await?;
    println!("L1: {}", args.l1);
    println!("Operators [{} total]:", operators.len());
    for operator in operators {
        println!("  Operator: {operator}");
    }
    Ok(())
}

pub async fn l1_vaults<C: EthRpc>(args: L1Args, client: &Client<C>) -> Result<()> {
    let vaults = query::l1_vaults(client, args.l1).await?;
    println!("L1: {}", args.l1);
    println!("Vaults [{} total]:", vaults.len());
    for vault in vaults {
        let meta = client.token_meta(vault.vault.collateral).await;
        println!("  Vault: {}", vault.vault.vault);
        println!("    Collateral: {} ({})", vault.vault.collateral, meta.symbol);
        for (asset_class, limit) in &vault.amounts {
            println!(
                "    Limit for asset class {asset_class}: {} {}",
                format_units(*limit, meta.decimals),
                meta.symbol
            );
        }
    }
    Ok(())
}

pub async fn l1_stakes<C: EthRpc>(args: L1Args, client: &Client<C>) -> Result<()> {
    let stakes = query::l1_ops_vaults(client, args.l1).await?;
    println!("L1: {}", args.l1);
    println!("Operators [{} total]:", stakes.len());
    let groups: Vec<_> = stakes
        .into_iter()
        .map(|stake| (stake.operator, stake.vaults))
        .collect();
    print_stakes(client, "Operator", &groups).await;
    Ok(())
}

pub fn subnetwork(args: SubnetworkArgs) -> Result<()> {
    println!("{}", subnetwork_key(args.l1, args.id));
    Ok(())
}

pub async fn register_l1<C: EthRpc>(args: RegisterL1Args, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let fee = client.register_fee().await?;
    tracing::debug!(from = %signer.address(), %fee, "registering L1");
    let call = WriteCall::new(
        Entity::L1Registry,
        client.deployment.l1_registry,
        "registerL1",
        vec![
            address_arg(args.validator_manager),
            address_arg(args.l1_middleware),
            DynSolValue::String(args.metadata_url),
        ],
    )
    .with_value(fee);
    client.write(&signer, call, "Successfully registered as L1").await;
    Ok(())
}
