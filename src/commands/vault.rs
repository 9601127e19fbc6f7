use crate::cli::{AddressArgs, BalanceArgs, VaultArgs, WithdrawalsArgs};
use crate::client::{Client, TokenMeta};
use crate::query;
use crate::rpc::EthRpc;
use crate::types::format_units;
use alloy_primitives::U256;
use anyhow::Result;

pub async fn is_vault<C: EthRpc>(args: AddressArgs, client: &Client<C>) -> Result<()> {
    println!("{}", client.is_vault(args.address).await?);
    Ok(())
}

pub async fn vaults<C: EthRpc>(client: &Client<C>) -> Result<()> {
    let vaults = query::vaults(client).await?;
    println!("All vaults [{} total]:", vaults.len());
    for vault in vaults {
        let meta = client.token_meta(vault.collateral).await;
        println!("  Vault: {}", vault.vault);
        println!("    Collateral: {} ({})", vault.collateral, meta.symbol);
        println!("    Delegator: {} ({})", vault.delegator, vault.delegator_type);
        println!("    Slasher: {} ({})", vault.slasher, vault.slasher_type);
        println!();
    }
    Ok(())
}

pub async fn vault_ops<C: EthRpc>(args: VaultArgs, client: &Client<C>) -> Result<()> {
    let operators = query::vault_ops(client, args.vault).await?;
    println!("Vault: {}", args.vault);
    println!("Operators [{} total]:", operators.len());
    for operator in operators {
        println!("  Operator: {operator}");
    }
    Ok(())
}

pub async fn vault_l1s<C: EthRpc>(args: VaultArgs, client: &Client<C>) -> Result<()> {
    let l1s = query::vault_l1s(client, args.vault).await?;
    let meta = client.token_meta(client.collateral(args.vault).await?).await;
    println!("Vault: {}", args.vault);
    println!("L1s [{} total]:", l1s.len());
    for l1 in l1s {
        println!("  L1: {}", l1.l1);
        for (asset_class, limit) in &l1.amounts {
            println!(
                "    Max limit for asset class {asset_class}: {} {}",
                format_units(*limit, meta.decimals),
                meta.symbol
            );
        }
    }
    Ok(())
}

pub async fn vault_l1s_ops<C: EthRpc>(args: VaultArgs, client: &Client<C>) -> Result<()> {
    let l1s = query::vault_l1s_ops(client, args.vault).await?;
    println!("Vault: {}", args.vault);
    println!("L1s [{} total]:", l1s.len());
    println!();
    for (l1, operators) in l1s {
        println!("  L1: {l1}");
        println!("  Operators [{} total]:", operators.len());
        for operator in operators {
            println!("    Operator: {operator}");
        }
        println!();
    }
    Ok(())
}

fn wei_with_units(value: U256, meta: &TokenMeta) -> String {
    format!("{value} ({} {})", format_units(value, meta.decimals), meta.symbol)
}

pub async fn active_balance_of<C: EthRpc>(args: BalanceArgs, client: &Client<C>) -> Result<()> {
    let balance = client.active_balance(args.vault, args.address).await?;
    let meta = client.token_meta(client.collateral(args.vault).await?).await;
    println!("{}", wei_with_units(balance, &meta));
    Ok(())
}

pub async fn withdrawals_of<C: EthRpc>(args: WithdrawalsArgs, client: &Client<C>) -> Result<()> {
    let withdrawals = client.withdrawals(args.vault, args.epoch, args.address).await?;
    let meta = client.token_meta(client.collateral(args.vault).await?).await;
    println!("{}", wei_with_units(withdrawals, &meta));
    Ok(())
}

pub async fn withdrawals_claimed<C: EthRpc>(args: WithdrawalsArgs, client: &Client<C>) -> Result<()> {
    println!(
        "{}",
        client
            .withdrawals_claimed(args.vault, args.epoch, args.address)
            .await?
    );
    Ok(())
}
