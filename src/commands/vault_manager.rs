//! Vault registration on an L1's middleware vault manager. Each L1 deploys its
//! own manager, so its address is the first argument of every command.

use crate::cli::{VaultAtArgs, VaultManagerArgs, VaultManagerLimitArgs, VaultManagerVaultArgs, VaultManagerWriteArgs};
use crate::client::{Client, WriteCall};
use crate::commands::signer_or_report;
use crate::rpc::EthRpc;
use crate::types::to_uint96;
use anyhow::Result;

alloy_sol_types::sol! {
    function registerVault(address vault, uint96 assetClassId, uint256 vaultMaxL1Limit) external;
    function updateVaultMaxL1Limit(address vault, uint96 assetClassId, uint256 vaultMaxL1Limit) external;
    function removeVault(address vault) external;
    function getVaultCount() external view returns (uint256);
    function getVaultAtWithTimes(uint256 index) external view returns (address vault, uint48 enabledTime, uint48 disabledTime);
    function getVaultAssetClass(address vault) external view returns (uint96);
}

pub async fn register_vault<C: EthRpc>(args: VaultManagerLimitArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let call = registerVaultCall {
        vault: args.vault,
        assetClassId: to_uint96(args.asset_class)?,
        vaultMaxL1Limit: args.max_limit,
    };
    println!("Registering Vault L1...");
    client.write(&signer, WriteCall::sol(args.manager, &call), "Vault registered").await;
    Ok(())
}

pub async fn update_vault_max_l1_limit<C: EthRpc>(args: VaultManagerLimitArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let call = updateVaultMaxL1LimitCall {
        vault: args.vault,
        assetClassId: to_uint96(args.asset_class)?,
        vaultMaxL1Limit: args.max_limit,
    };
    println!("Updating Vault Max L1 limit...");
    client.write(&signer, WriteCall::sol(args.manager, &call), "Max L1 limit updated").await;
    Ok(())
}

pub async fn remove_vault<C: EthRpc>(args: VaultManagerWriteArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    println!("Removing vault...");
    let call = removeVaultCall { vault: args.vault };
    client.write(&signer, WriteCall::sol(args.manager, &call), "Vault removed").await;
    Ok(())
}

pub async fn vault_count<C: EthRpc>(args: VaultManagerArgs, client: &Client<C>) -> Result<()> {
    let count = client.call(args.manager, &getVaultCountCall {}).await?;
    println!("Vault count: {count}");
    Ok(())
}

pub async fn vault_at_with_times<C: EthRpc>(args: VaultAtArgs, client: &Client<C>) -> Result<()> {
    let entry = client
        .call(args.manager, &getVaultAtWithTimesCall { index: args.index })
        .await?;
    println!("Vault: {}", entry.vault);
    println!("Enabled time: {}", entry.enabledTime);
    println!("Disabled time: {}", entry.disabledTime);
    Ok(())
}

pub async fn vault_asset_class<C: EthRpc>(args: VaultManagerVaultArgs, client: &Client<C>) -> Result<()> {
    let class = client
        .call(args.manager, &getVaultAssetClassCall { vault: args.vault })
        .await?;
    println!("Vault asset class: {class}");
    Ok(())
}
