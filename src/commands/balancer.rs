//! BalancerValidatorManager security modules.

use crate::cli::{BalancerArgs, SecurityModuleArgs, SetUpSecurityModuleArgs};
use crate::client::{Client, WriteCall};
use crate::commands::signer_or_report;
use crate::rpc::EthRpc;
use anyhow::Result;

alloy_sol_types::sol! {
    function setUpSecurityModule(address securityModule, uint64 maxWeight) external;
    function getSecurityModules() external view returns (address[] securityModules);
    function getSecurityModuleWeights(address securityModule) external view returns (uint64 weight, uint64 maxWeight);
}

pub async fn set_up_security_module<C: EthRpc>(args: SetUpSecurityModuleArgs, client: &Client<C>) -> Result<()> {
    let Some(signer) = signer_or_report(&args.signer, client.chain_id()).await else {
        return Ok(());
    };
    println!("Setting up security module...");
    let call = setUpSecurityModuleCall {
        securityModule: args.middleware,
        maxWeight: args.max_weight,
    };
    let success = format!(
        "Security module {} set up with max weight {}",
        args.middleware, args.max_weight
    );
    client.write(&signer, WriteCall::sol(args.balancer, &call), &success).await;
    Ok(())
}

pub async fn security_modules<C: EthRpc>(args: BalancerArgs, client: &Client<C>) -> Result<()> {
    let modules = client.call(args.balancer, &getSecurityModulesCall {}).await?;
    println!("Security modules [{} total]:", modules.len());
    for module in modules {
        println!("  {module}");
    }
    Ok(())
}

pub async fn security_module_weights<C: EthRpc>(args: SecurityModuleArgs, client: &Client<C>) -> Result<()> {
    let call = getSecurityModuleWeightsCall {
        securityModule: args.security_module,
    };
    let weights = client.call(args.balancer, &call).await?;
    println!("Weight: {}", weights.weight);
    println!("Max weight: {}", weights.maxWeight);
    Ok(())
}
