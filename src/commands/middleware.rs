//! AvalancheL1Middleware operator, node and stake-cache commands. Only the
//! calls that stay on the EVM side are exposed here.

use crate::cli::{
    ForceUpdateNodesArgs, MiddlewareArgs, MiddlewareEpochArgs, MiddlewareNodeArgs, MiddlewareNodeWriteArgs,
    MiddlewareOperatorArgs, MiddlewareOperatorEpochArgs, MiddlewareOperatorWriteArgs, MiddlewareWriteArgs,
    OperatorCacheArgs, OperatorStakeArgs, StakeUpdateArgs,
};
use crate::client::{Client, WriteCall};
use crate::commands::signer_or_report;
use crate::rpc::EthRpc;
use crate::types::{format_timestamp, to_uint48, to_uint96};
use alloy_primitives::Address;
use anyhow::Result;

alloy_sol_types::sol! {
    function registerOperator(address operator) external;
    function disableOperator(address operator) external;
    function removeOperator(address operator) external;
    function removeNode(bytes32 nodeId) external;
    function initializeValidatorStakeUpdate(bytes32 nodeId, uint256 stakeAmount) external;
    function calcAndCacheStakes(uint48 epoch, uint96 assetClassId) external returns (uint256 totalStake);
    function calcAndCacheNodeStakeForAllOperators() external;
    function forceUpdateNodes(address operator, uint256 limitStake) external;

    function getCurrentEpoch() external view returns (uint48 epoch);
    function getEpochStartTs(uint48 epoch) external view returns (uint48 timestamp);
    function getOperatorStake(address operator, uint48 epoch, uint96 assetClassId) external view returns (uint256 stake);
    function getAllOperators() external view returns (address[]);
    function getOperatorNodesLength(address operator) external view returns (uint256);
    function getActiveNodesForEpoch(address operator, uint48 epoch) external view returns (bytes32[] activeNodeIds);
    function operatorLockedStake(address operator) external view returns (uint256);
    function nodePendingRemoval(bytes32 nodeId) external view returns (bool);
    function nodePendingUpdate(bytes32 nodeId) external view returns (bool);
    function getOperatorUsedStakeCached(address operator) external view returns (uint256 registeredStake);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperatorAction {
    Register,
    Disable,
    Remove,
}

async fn operator_write<C: EthRpc>(
    args: MiddlewareOperatorWriteArgs,
    client: &Client<C>,
    action: OperatorAction,
) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let operator = args.operator;
    let (progress, call, success) = match action {
        OperatorAction::Register => (
            "Registering operator...",
            WriteCall::sol(args.middleware, &registerOperatorCall { operator }),
            format!("Operator {operator} registered"),
        ),
        OperatorAction::Disable => (
            "Disabling operator...",
            WriteCall::sol(args.middleware, &disableOperatorCall { operator }),
            format!("Operator {operator} disabled"),
        ),
        OperatorAction::Remove => (
            "Removing operator...",
            WriteCall::sol(args.middleware, &removeOperatorCall { operator }),
            format!("Operator {operator} removed"),
        ),
    };
    println!("{progress}");
    client.write(&signer, call, &success).await;
    Ok(())
}

pub async fn register_operator<C: EthRpc>(args: MiddlewareOperatorWriteArgs, client: &Client<C>) -> Result<()> {
    operator_write(args, client, OperatorAction::Register).await
}

pub async fn disable_operator<C: EthRpc>(args: MiddlewareOperatorWriteArgs, client: &Client<C>) -> Result<()> {
    operator_write(args, client, OperatorAction::Disable).await
}

pub async fn remove_operator<C: EthRpc>(args: MiddlewareOperatorWriteArgs, client: &Client<C>) -> Result<()> {
    operator_write(args, client, OperatorAction::Remove).await
}

pub async fn remove_node<C: EthRpc>(args: MiddlewareNodeWriteArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    println!("Removing node...");
    let call = WriteCall::sol(args.middleware, &removeNodeCall { nodeId: args.node_id });
    let success = format!("Node {} removal initialized", args.node_id);
    client.write(&signer, call, &success).await;
    Ok(())
}

pub async fn init_stake_update<C: EthRpc>(args: StakeUpdateArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    println!("Initializing validator stake update...");
    let call = initializeValidatorStakeUpdateCall {
        nodeId: args.node_id,
        stakeAmount: args.new_stake,
    };
    let success = format!("Stake update to {} initialized for node {}", args.new_stake, args.node_id);
    client.write(&signer, WriteCall::sol(args.middleware, &call), &success).await;
    Ok(())
}

pub async fn operator_cache<C: EthRpc>(args: OperatorCacheArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    let call = calcAndCacheStakesCall {
        epoch: to_uint48(args.epoch)?,
        assetClassId: to_uint96(args.asset_class)?,
    };
    println!("Calculating and caching stakes...");
    let success = format!(
        "Stakes cached for epoch {} and asset class {}",
        args.epoch, args.asset_class
    );
    client.write(&signer, WriteCall::sol(args.middleware, &call), &success).await;
    Ok(())
}

pub async fn calc_node_stakes<C: EthRpc>(args: MiddlewareWriteArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    println!("Calculating node stakes for all operators...");
    let call = WriteCall::sol(args.middleware, &calcAndCacheNodeStakeForAllOperatorsCall {});
    client.write(&signer, call, "Node stakes cached").await;
    Ok(())
}

pub async fn force_update_nodes<C: EthRpc>(args: ForceUpdateNodesArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    println!("Forcing node updates...");
    let call = forceUpdateNodesCall {
        operator: args.operator,
        limitStake: args.limit_stake,
    };
    let success = format!("Nodes of operator {} updated", args.operator);
    client.write(&signer, WriteCall::sol(args.middleware, &call), &success).await;
    Ok(())
}

pub async fn current_epoch<C: EthRpc>(args: MiddlewareArgs, client: &Client<C>) -> Result<()> {
    let epoch = client.call(args.middleware, &getCurrentEpochCall {}).await?;
    println!("{epoch}");
    Ok(())
}

pub async fn epoch_start_ts<C: EthRpc>(args: MiddlewareEpochArgs, client: &Client<C>) -> Result<()> {
    let call = getEpochStartTsCall {
        epoch: to_uint48(args.epoch)?,
    };
    let timestamp: u64 = client.call(args.middleware, &call).await?.to();
    println!("{timestamp} ({})", format_timestamp(timestamp));
    Ok(())
}

pub async fn operator_stake<C: EthRpc>(args: OperatorStakeArgs, client: &Client<C>) -> Result<()> {
    let call = getOperatorStakeCall {
        operator: args.operator,
        epoch: to_uint48(args.epoch)?,
        assetClassId: to_uint96(args.asset_class)?,
    };
    let stake = client.call(args.middleware, &call).await?;
    println!("{stake}");
    Ok(())
}

pub async fn all_operators<C: EthRpc>(args: MiddlewareArgs, client: &Client<C>) -> Result<()> {
    let operators: Vec<Address> = client.call(args.middleware, &getAllOperatorsCall {}).await?;
    println!("Operators [{} total]:", operators.len());
    for operator in operators {
        println!("  {operator}");
    }
    Ok(())
}

pub async fn operator_nodes_length<C: EthRpc>(args: MiddlewareOperatorArgs, client: &Client<C>) -> Result<()> {
    let call = getOperatorNodesLengthCall {
        operator: args.operator,
    };
    println!("{}", client.call(args.middleware, &call).await?);
    Ok(())
}

pub async fn active_nodes_for_epoch<C: EthRpc>(args: MiddlewareOperatorEpochArgs, client: &Client<C>) -> Result<()> {
    let call = getActiveNodesForEpochCall {
        operator: args.operator,
        epoch: to_uint48(args.epoch)?,
    };
    let nodes = client.call(args.middleware, &call).await?;
    println!("Active nodes of {} in epoch {} [{} total]:", args.operator, args.epoch, nodes.len());
    for node in nodes {
        println!("  {node}");
    }
    Ok(())
}

pub async fn operator_locked_stake<C: EthRpc>(args: MiddlewareOperatorArgs, client: &Client<C>) -> Result<()> {
    let call = operatorLockedStakeCall { operator: args.operator };
    println!("{}", client.call(args.middleware, &call).await?);
    Ok(())
}

pub async fn node_pending_removal<C: EthRpc>(args: MiddlewareNodeArgs, client: &Client<C>) -> Result<()> {
    let call = nodePendingRemovalCall { nodeId: args.node_id };
    println!("{}", client.call(args.middleware, &call).await?);
    Ok(())
}

pub async fn node_pending_update<C: EthRpc>(args: MiddlewareNodeArgs, client: &Client<C>) -> Result<()> {
    let call = nodePendingUpdateCall { nodeId: args.node_id };
    println!("{}", client.call(args.middleware, &call).await?);
    Ok(())
}

pub async fn operator_used_stake<C: EthRpc>(args: MiddlewareOperatorArgs, client: &Client<C>) -> Result<()> {
    let call = getOperatorUsedStakeCachedCall { operator: args.operator };
    println!("{}", client.call(args.middleware, &call).await?);
    Ok(())
}
