use crate::client::Client;
use crate::commands;
use crate::config::{Chain, Config};
use crate::types::{
    parse_address, parse_b256, parse_u256, parse_uint48, parse_uint96, TokenAmount, DEFAULT_ASSET_CLASS,
    DEFAULT_SIGNATURE_DURATION,
};
use alloy_primitives::{Address, B256, U256};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "restake-cli",
    version,
    about = "Query and operate the L1 restaking protocol: registries, vaults, delegators and opt-in services"
)]
pub struct Cli {
    /// Chain to use, by name or chain id.
    #[arg(long, global = true, default_value = "anvil")]
    pub chain: Chain,

    /// RPC endpoint overriding the chain's default.
    #[arg(long, global = true)]
    pub provider: Option<String>,

    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load(self.config_path.as_deref())?;
        let client = Client::connect(&config, self.chain, self.provider.as_deref()).await?;
        self.command.run(&client).await
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check if an address is a registered L1.
    #[command(name = "isl1")]
    IsL1(AddressArgs),
    /// List all L1s.
    #[command(name = "l1s")]
    L1s(L1sArgs),
    /// List operators opted into an L1.
    #[command(name = "l1ops")]
    L1Ops(L1Args),
    /// List vaults backing an L1 with their limits.
    #[command(name = "l1vaults")]
    L1Vaults(L1Args),
    /// Show stakes of all operators in an L1.
    #[command(name = "l1stakes")]
    L1Stakes(L1Args),
    /// Print the subnetwork identifier of an L1 and asset class.
    Subnetwork(SubnetworkArgs),
    /// Register the signer's L1.
    #[command(name = "register-l1")]
    RegisterL1(RegisterL1Args),

    /// Check if an address is a registered operator.
    #[command(name = "isop")]
    IsOp(AddressArgs),
    /// List all operators.
    Ops,
    /// Get operator stake in a vault for an L1.
    #[command(name = "op-vault-l1-stake")]
    OpVaultL1Stake(OpVaultL1Args),
    /// List L1s an operator opted into.
    #[command(name = "opl1s")]
    OpL1s(OperatorArgs),
    /// Show operator stakes in all its L1s.
    #[command(name = "opstakes")]
    OpStakes(OperatorArgs),
    /// Check if an operator is opted into a vault.
    CheckOptInVault(OperatorVaultArgs),
    /// Check if an operator is opted into an L1.
    #[command(name = "check-opt-in-l1")]
    CheckOptInL1(OperatorL1Args),
    /// Register the signer as an operator.
    RegisterOperator(RegisterOperatorArgs),
    /// Opt into a vault.
    OptInVault(VaultWriteArgs),
    /// Opt out from a vault.
    OptOutVault(VaultWriteArgs),
    /// Opt into an L1.
    #[command(name = "opt-in-l1")]
    OptInL1(L1WriteArgs),
    /// Opt out from an L1.
    #[command(name = "opt-out-l1")]
    OptOutL1(L1WriteArgs),
    /// Sign an authorization to opt into a vault.
    OptInVaultSignature(VaultSignatureArgs),
    /// Sign an authorization to opt out from a vault.
    OptOutVaultSignature(VaultSignatureArgs),
    /// Sign an authorization to opt into an L1.
    #[command(name = "opt-in-l1-signature")]
    OptInL1Signature(L1SignatureArgs),
    /// Sign an authorization to opt out from an L1.
    #[command(name = "opt-out-l1-signature")]
    OptOutL1Signature(L1SignatureArgs),

    /// Check if an address is a vault.
    #[command(name = "isvault")]
    IsVault(AddressArgs),
    /// List all vaults.
    Vaults,
    /// List operators opted into a vault.
    #[command(name = "vaultops")]
    VaultOps(VaultArgs),
    /// List L1s a vault backs.
    #[command(name = "vaultl1s")]
    VaultL1s(VaultArgs),
    /// List, per L1 a vault backs, the vault's operators opted into it.
    #[command(name = "vaultl1sops")]
    VaultL1sOps(VaultArgs),
    /// Active balance of an account in a vault.
    ActiveBalanceOf(BalanceArgs),
    /// Withdrawals of an account in a vault for an epoch.
    WithdrawalsOf(WithdrawalsArgs),
    /// Whether an epoch's withdrawals of an account are claimed.
    WithdrawalsClaimed(WithdrawalsArgs),

    /// Set the maximum L1 limit at a vault's delegator.
    #[command(name = "set-max-l1-limit")]
    SetMaxL1Limit(SetMaxL1LimitArgs),
    /// Set an L1 limit at a vault's delegator.
    #[command(name = "set-l1-limit")]
    SetL1Limit(SetL1LimitArgs),
    /// Set operator shares in an L1 at a vault's delegator.
    #[command(name = "set-operator-l1-shares")]
    SetOperatorL1Shares(SetOperatorL1SharesArgs),

    /// Deposit into a vault.
    Deposit(DepositArgs),
    /// Withdraw from a vault.
    Withdraw(WithdrawArgs),
    /// Claim an epoch's withdrawal from a vault.
    Claim(ClaimArgs),

    /// Register a vault with an L1's vault manager.
    #[command(name = "vault-manager-register-vault-l1")]
    VaultManagerRegisterVault(VaultManagerLimitArgs),
    /// Update a vault's maximum L1 limit in the vault manager.
    #[command(name = "vault-manager-update-vault-max-l1-limit")]
    VaultManagerUpdateVaultMaxL1Limit(VaultManagerLimitArgs),
    /// Remove a vault from the vault manager.
    #[command(name = "vault-manager-remove-vault")]
    VaultManagerRemoveVault(VaultManagerWriteArgs),
    /// Number of vaults in the vault manager.
    #[command(name = "get-vault-count")]
    GetVaultCount(VaultManagerArgs),
    /// Vault at an index with its enabled and disabled times.
    #[command(name = "get-vault-at-with-times")]
    GetVaultAtWithTimes(VaultAtArgs),
    /// Asset class a vault is registered under.
    #[command(name = "get-vault-asset-class")]
    GetVaultAssetClass(VaultManagerVaultArgs),

    /// Register an operator in an L1 middleware.
    #[command(name = "middleware-register-operator")]
    MiddlewareRegisterOperator(MiddlewareOperatorWriteArgs),
    /// Disable an operator in an L1 middleware.
    #[command(name = "middleware-disable-operator")]
    MiddlewareDisableOperator(MiddlewareOperatorWriteArgs),
    /// Remove a disabled operator from an L1 middleware.
    #[command(name = "middleware-remove-operator")]
    MiddlewareRemoveOperator(MiddlewareOperatorWriteArgs),
    /// Start removing a node.
    #[command(name = "middleware-remove-node")]
    MiddlewareRemoveNode(MiddlewareNodeWriteArgs),
    /// Start a validator stake update and lock the stake.
    #[command(name = "middleware-init-stake-update")]
    MiddlewareInitStakeUpdate(StakeUpdateArgs),
    /// Calculate and cache operator stakes for an epoch and asset class.
    #[command(name = "middleware-operator-cache")]
    MiddlewareOperatorCache(OperatorCacheArgs),
    /// Calculate and cache node stakes for all operators.
    #[command(name = "middleware-calc-node-stakes")]
    MiddlewareCalcNodeStakes(MiddlewareWriteArgs),
    /// Force an update of an operator's nodes.
    #[command(name = "middleware-force-update-nodes")]
    MiddlewareForceUpdateNodes(ForceUpdateNodesArgs),
    /// Operator stake for an epoch and asset class.
    #[command(name = "middleware-get-operator-stake")]
    MiddlewareGetOperatorStake(OperatorStakeArgs),
    /// Current middleware epoch.
    #[command(name = "middleware-get-current-epoch")]
    MiddlewareGetCurrentEpoch(MiddlewareArgs),
    /// Start timestamp of an epoch.
    #[command(name = "middleware-get-epoch-start-ts")]
    MiddlewareGetEpochStartTs(MiddlewareEpochArgs),
    /// Nodes of an operator active in an epoch.
    #[command(name = "middleware-get-active-nodes-for-epoch")]
    MiddlewareGetActiveNodesForEpoch(MiddlewareOperatorEpochArgs),
    /// Number of nodes of an operator.
    #[command(name = "middleware-get-operator-nodes-length")]
    MiddlewareGetOperatorNodesLength(MiddlewareOperatorArgs),
    /// Stake an operator has locked for pending updates.
    #[command(name = "middleware-get-operator-locked-stake")]
    MiddlewareGetOperatorLockedStake(MiddlewareOperatorArgs),
    /// Whether a node is pending removal.
    #[command(name = "middleware-node-pending-removal")]
    MiddlewareNodePendingRemoval(MiddlewareNodeArgs),
    /// Whether a node has a pending stake update.
    #[command(name = "middleware-node-pending-update")]
    MiddlewareNodePendingUpdate(MiddlewareNodeArgs),
    /// Cached stake an operator's nodes use.
    #[command(name = "middleware-get-operator-used-stake")]
    MiddlewareGetOperatorUsedStake(MiddlewareOperatorArgs),
    /// All operators registered in an L1 middleware.
    #[command(name = "middleware-get-all-operators")]
    MiddlewareGetAllOperators(MiddlewareArgs),

    /// Add a middleware as a security module of a balancer validator manager.
    #[command(name = "balancer-set-up-security-module")]
    BalancerSetUpSecurityModule(SetUpSecurityModuleArgs),
    /// List the security modules of a balancer validator manager.
    #[command(name = "balancer-get-security-modules")]
    BalancerGetSecurityModules(BalancerArgs),
    /// Current and maximum weight of a security module.
    #[command(name = "balancer-get-security-module-weights")]
    BalancerGetSecurityModuleWeights(SecurityModuleArgs),
}

impl Command {
    pub async fn run(self, client: &Client) -> Result<()> {
        match self {
            Command::IsL1(args) => commands::l1::is_l1(args, client).await,
            Command::L1s(args) => commands::l1::l1s(args, client).await,
            Command::L1Ops(args) => commands::l1::l1_ops(args, client).await,
            Command::L1Vaults(args) => commands::l1::l1_vaults(args, client).await,
            Command::L1Stakes(args) => commands::l1::l1_stakes(args, client).await,
            Command::Subnetwork(args) => commands::l1::subnetwork(args),
            Command::RegisterL1(args) => commands::l1::register_l1(args, client).await,

            Command::IsOp(args) => commands::operator::is_op(args, client).await,
            Command::Ops => commands::operator::ops(client).await,
            Command::OpVaultL1Stake(args) => commands::operator::op_vault_l1_stake(args, client).await,
            Command::OpL1s(args) => commands::operator::op_l1s(args, client).await,
            Command::OpStakes(args) => commands::operator::op_stakes(args, client).await,
            Command::CheckOptInVault(args) => commands::operator::check_opt_in_vault(args, client).await,
            Command::CheckOptInL1(args) => commands::operator::check_opt_in_l1(args, client).await,
            Command::RegisterOperator(args) => commands::operator::register_operator(args, client).await,
            Command::OptInVault(args) => commands::operator::opt_in_vault(args, client).await,
            Command::OptOutVault(args) => commands::operator::opt_out_vault(args, client).await,
            Command::OptInL1(args) => commands::operator::opt_in_l1(args, client).await,
            Command::OptOutL1(args) => commands::operator::opt_out_l1(args, client).await,
            Command::OptInVaultSignature(args) => commands::operator::opt_in_vault_signature(args, client).await,
            Command::OptOutVaultSignature(args) => commands::operator::opt_out_vault_signature(args, client).await,
            Command::OptInL1Signature(args) => commands::operator::opt_in_l1_signature(args, client).await,
            Command::OptOutL1Signature(args) => commands::operator::opt_out_l1_signature(args, client).await,

            Command::IsVault(args) => commands::vault::is_vault(args, client).await,
            Command::Vaults => commands::vault::vaults(client).await,
            Command::VaultOps(args) => commands::vault::vault_ops(args, client).await,
            Command::VaultL1s(args) => commands::vault::vault_l1s(args, client).await,
            Command::VaultL1sOps(args) => commands::vault::vault_l1s_ops(args, client).await,
            Command::ActiveBalanceOf(args) => commands::vault::active_balance_of(args, client).await,
            Command::WithdrawalsOf(args) => commands::vault::withdrawals_of(args, client).await,
            Command::WithdrawalsClaimed(args) => commands::vault::withdrawals_claimed(args, client).await,

            Command::SetMaxL1Limit(args) => commands::curator::set_max_l1_limit(args, client).await,
            Command::SetL1Limit(args) => commands::curator::set_l1_limit(args, client).await,
            Command::SetOperatorL1Shares(args) => commands::curator::set_operator_l1_shares(args, client).await,

            Command::Deposit(args) => commands::staker::deposit(args, client).await,
            Command::Withdraw(args) => commands::staker::withdraw(args, client).await,
            Command::Claim(args) => commands::staker::claim(args, client).await,

            Command::VaultManagerRegisterVault(args) => commands::vault_manager::register_vault(args, client).await,
            Command::VaultManagerUpdateVaultMaxL1Limit(args) => {
                commands::vault_manager::update_vault_max_l1_limit(args, client).await
            }
            Command::VaultManagerRemoveVault(args) => commands::vault_manager::remove_vault(args, client).await,
            Command::GetVaultCount(args) => commands::vault_manager::vault_count(args, client).await,
            Command::GetVaultAtWithTimes(args) => commands::vault_manager::vault_at_with_times(args, client).await,
            Command::GetVaultAssetClass(args) => commands::vault_manager::vault_asset_class(args, client).await,

            Command::MiddlewareRegisterOperator(args) => commands::middleware::register_operator(args, client).await,
            Command::MiddlewareDisableOperator(args) => commands::middleware::disable_operator(args, client).await,
            Command::MiddlewareRemoveOperator(args) => commands::middleware::remove_operator(args, client).await,
            Command::MiddlewareRemoveNode(args) => commands::middleware::remove_node(args, client).await,
            Command::MiddlewareInitStakeUpdate(args) => commands::middleware::init_stake_update(args, client).await,
            Command::MiddlewareOperatorCache(args) => commands::middleware::operator_cache(args, client).await,
            Command::MiddlewareCalcNodeStakes(args) => commands::middleware::calc_node_stakes(args, client).await,
            Command::MiddlewareForceUpdateNodes(args) => commands::middleware::force_update_nodes(args, client).await,
            Command::MiddlewareGetOperatorStake(args) => commands::middleware::operator_stake(args, client).await,
            Command::MiddlewareGetCurrentEpoch(args) => commands::middleware::current_epoch(args, client).await,
            Command::MiddlewareGetEpochStartTs(args) => commands::middleware::epoch_start_ts(args, client).await,
            Command::MiddlewareGetActiveNodesForEpoch(args) => {
                commands::middleware::active_nodes_for_epoch(args, client).await
            }
            Command::MiddlewareGetOperatorNodesLength(args) => {
                commands::middleware::operator_nodes_length(args, client).await
            }
            Command::MiddlewareGetOperatorLockedStake(args) => {
                commands::middleware::operator_locked_stake(args, client).await
            }
            Command::MiddlewareNodePendingRemoval(args) => commands::middleware::node_pending_removal(args, client).await,
            Command::MiddlewareNodePendingUpdate(args) => commands::middleware::node_pending_update(args, client).await,
            Command::MiddlewareGetOperatorUsedStake(args) => commands::middleware::operator_used_stake(args, client).await,
            Command::MiddlewareGetAllOperators(args) => commands::middleware::all_operators(args, client).await,

            Command::BalancerSetUpSecurityModule(args) => commands::balancer::set_up_security_module(args, client).await,
            Command::BalancerGetSecurityModules(args) => commands::balancer::security_modules(args, client).await,
            Command::BalancerGetSecurityModuleWeights(args) => {
                commands::balancer::security_module_weights(args, client).await
            }
        }
    }
}

/// Signing backend options shared by every write command.
#[derive(Args, Debug, Clone)]
pub struct SignerArgs {
    /// Private key for signing transactions.
    #[arg(long, env = "PK", hide_env_values = true, value_parser = parse_b256)]
    pub private_key: Option<B256>,

    /// Sign on a Ledger device instead of with a private key.
    #[arg(long)]
    pub ledger: bool,

    /// Ledger account to sign with (defaults to the first account).
    #[arg(long, value_parser = parse_address)]
    pub ledger_address: Option<Address>,
}

#[derive(Args, Debug)]
pub struct AddressArgs {
    #[arg(value_parser = parse_address)]
    pub address: Address,
}

#[derive(Args, Debug)]
pub struct L1sArgs {
    /// Also count operators and vaults of every L1.
    #[arg(long)]
    pub full: bool,
}

#[derive(Args, Debug)]
pub struct L1Args {
    #[arg(value_parser = parse_address)]
    pub l1: Address,
}

#[derive(Args, Debug)]
pub struct SubnetworkArgs {
    #[arg(value_parser = parse_address)]
    pub l1: Address,

    #[arg(default_value_t = U256::from(DEFAULT_ASSET_CLASS), value_parser = parse_uint96)]
    pub id: U256,
}

#[derive(Args, Debug)]
pub struct RegisterL1Args {
    /// Validator manager contract of the L1.
    #[arg(value_parser = parse_address)]
    pub validator_manager: Address,

    #[arg(value_parser = parse_address)]
    pub l1_middleware: Address,

    pub metadata_url: String,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct OperatorArgs {
    #[arg(value_parser = parse_address)]
    pub operator: Address,
}

#[derive(Args, Debug)]
pub struct OpVaultL1Args {
    #[arg(value_parser = parse_address)]
    pub operator: Address,

    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[arg(value_parser = parse_address)]
    pub l1: Address,
}

#[derive(Args, Debug)]
pub struct OperatorVaultArgs {
    #[arg(value_parser = parse_address)]
    pub operator: Address,

    #[arg(value_parser = parse_address)]
    pub vault: Address,
}

#[derive(Args, Debug)]
pub struct OperatorL1Args {
    #[arg(value_parser = parse_address)]
    pub operator: Address,

    #[arg(value_parser = parse_address)]
    pub l1: Address,
}

#[derive(Args, Debug)]
pub struct RegisterOperatorArgs {
    pub metadata_url: String,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct VaultWriteArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct L1WriteArgs {
    #[arg(value_parser = parse_address)]
    pub l1: Address,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct VaultSignatureArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    /// Seconds until the signature expires.
    #[arg(default_value_t = DEFAULT_SIGNATURE_DURATION, value_parser = parse_uint48)]
    pub duration: u64,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct L1SignatureArgs {
    #[arg(value_parser = parse_address)]
    pub l1: Address,

    /// Seconds until the signature expires.
    #[arg(default_value_t = DEFAULT_SIGNATURE_DURATION, value_parser = parse_uint48)]
    pub duration: u64,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct VaultArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[arg(value_parser = parse_address)]
    pub address: Address,
}

#[derive(Args, Debug)]
pub struct WithdrawalsArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[arg(value_parser = parse_u256)]
    pub epoch: U256,

    #[arg(value_parser = parse_address)]
    pub address: Address,
}

#[derive(Args, Debug)]
pub struct SetMaxL1LimitArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[arg(value_parser = parse_address)]
    pub l1: Address,

    /// Most stake the L1 is ready to take from the vault, in wei.
    #[arg(value_parser = parse_u256)]
    pub max_limit: U256,

    #[arg(default_value_t = U256::from(DEFAULT_ASSET_CLASS), value_parser = parse_uint96)]
    pub asset_class: U256,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct SetL1LimitArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[arg(value_parser = parse_address)]
    pub l1: Address,

    /// Most stake the L1 can get, in wei.
    #[arg(value_parser = parse_u256)]
    pub limit: U256,

    #[arg(default_value_t = U256::from(DEFAULT_ASSET_CLASS), value_parser = parse_uint96)]
    pub asset_class: U256,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct SetOperatorL1SharesArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[arg(value_parser = parse_address)]
    pub l1: Address,

    #[arg(value_parser = parse_address)]
    pub operator: Address,

    /// Operator shares; the operator gets shares / total shares of the L1 stake.
    #[arg(value_parser = parse_u256)]
    pub shares: U256,

    #[arg(default_value_t = U256::from(DEFAULT_ASSET_CLASS), value_parser = parse_uint96)]
    pub asset_class: U256,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct DepositArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    /// Amount in token units, e.g. 1000 for 1000 AVAX.
    #[arg(allow_negative_numbers = true)]
    pub amount: TokenAmount,

    /// Account credited with the deposit (defaults to the signer).
    #[arg(value_parser = parse_address)]
    pub on_behalf_of: Option<Address>,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct WithdrawArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    /// Amount in token units.
    #[arg(allow_negative_numbers = true)]
    pub amount: TokenAmount,

    /// Account allowed to claim the withdrawal (defaults to the signer).
    #[arg(value_parser = parse_address)]
    pub claimer: Option<Address>,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct ClaimArgs {
    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[arg(value_parser = parse_u256)]
    pub epoch: U256,

    /// Account receiving the tokens (defaults to the signer).
    #[arg(value_parser = parse_address)]
    pub recipient: Option<Address>,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct VaultManagerArgs {
    /// MiddlewareVaultManager of the L1.
    #[arg(value_parser = parse_address)]
    pub manager: Address,
}

#[derive(Args, Debug)]
pub struct VaultManagerVaultArgs {
    #[arg(value_parser = parse_address)]
    pub manager: Address,

    #[arg(value_parser = parse_address)]
    pub vault: Address,
}

#[derive(Args, Debug)]
pub struct VaultAtArgs {
    #[arg(value_parser = parse_address)]
    pub manager: Address,

    #[arg(value_parser = parse_u256)]
    pub index: U256,
}

#[derive(Args, Debug)]
pub struct VaultManagerLimitArgs {
    #[arg(value_parser = parse_address)]
    pub manager: Address,

    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[arg(value_parser = parse_uint96)]
    pub asset_class: U256,

    /// Most stake the vault can give the L1, in wei.
    #[arg(value_parser = parse_u256)]
    pub max_limit: U256,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct VaultManagerWriteArgs {
    #[arg(value_parser = parse_address)]
    pub manager: Address,

    #[arg(value_parser = parse_address)]
    pub vault: Address,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct MiddlewareArgs {
    /// AvalancheL1Middleware of the L1.
    #[arg(value_parser = parse_address)]
    pub middleware: Address,
}

#[derive(Args, Debug)]
pub struct MiddlewareEpochArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_uint48)]
    pub epoch: u64,
}

#[derive(Args, Debug)]
pub struct MiddlewareOperatorArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_address)]
    pub operator: Address,
}

#[derive(Args, Debug)]
pub struct MiddlewareOperatorEpochArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_address)]
    pub operator: Address,

    #[arg(value_parser = parse_uint48)]
    pub epoch: u64,
}

#[derive(Args, Debug)]
pub struct OperatorStakeArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_address)]
    pub operator: Address,

    #[arg(value_parser = parse_uint48)]
    pub epoch: u64,

    #[arg(value_parser = parse_uint96)]
    pub asset_class: U256,
}

#[derive(Args, Debug)]
pub struct MiddlewareNodeArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_b256)]
    pub node_id: B256,
}

#[derive(Args, Debug)]
pub struct MiddlewareWriteArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct MiddlewareOperatorWriteArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_address)]
    pub operator: Address,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct MiddlewareNodeWriteArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_b256)]
    pub node_id: B256,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct StakeUpdateArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_b256)]
    pub node_id: B256,

    /// New stake of the node, in wei.
    #[arg(value_parser = parse_u256)]
    pub new_stake: U256,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct OperatorCacheArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_uint48)]
    pub epoch: u64,

    #[arg(value_parser = parse_uint96)]
    pub asset_class: U256,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct ForceUpdateNodesArgs {
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    #[arg(value_parser = parse_address)]
    pub operator: Address,

    /// Stake limit in wei; 0 means none.
    #[arg(long, default_value_t = U256::ZERO, value_parser = parse_u256)]
    pub limit_stake: U256,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct BalancerArgs {
    /// BalancerValidatorManager of the L1.
    #[arg(value_parser = parse_address)]
    pub balancer: Address,
}

#[derive(Args, Debug)]
pub struct SecurityModuleArgs {
    #[arg(value_parser = parse_address)]
    pub balancer: Address,

    #[arg(value_parser = parse_address)]
    pub security_module: Address,
}

#[derive(Args, Debug)]
pub struct SetUpSecurityModuleArgs {
    #[arg(value_parser = parse_address)]
    pub balancer: Address,

    /// Middleware to add as a security module.
    #[arg(value_parser = parse_address)]
    pub middleware: Address,

    pub max_weight: u64,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flat_command_names() {
        let cli = Cli::try_parse_from(["restake-cli", "--chain", "fuji", "isl1", "0x0165878A594ca255338adfa4d48449f69242Eb8F"])
            .unwrap();
        assert_eq!(cli.chain, Chain::Fuji);
        assert!(matches!(cli.command, Command::IsL1(_)));

        let cli = Cli::try_parse_from(["restake-cli", "vaultl1sops", "0x0165878A594ca255338adfa4d48449f69242Eb8F"]).unwrap();
        assert_eq!(cli.chain, Chain::Anvil);
        assert!(matches!(cli.command, Command::VaultL1sOps(_)));
    }

    #[test]
    fn contract_family_commands_take_the_contract_first() {
        let manager = "0x0165878A594ca255338adfa4d48449f69242Eb8F";
        let vault = "0x5050505050505050505050505050505050505050";
        let cli = Cli::try_parse_from([
            "restake-cli",
            "vault-manager-register-vault-l1",
            manager,
            vault,
            "1",
            "1000",
        ])
        .unwrap();
        let Command::VaultManagerRegisterVault(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.manager, parse_address(manager).unwrap());
        assert_eq!(args.vault, parse_address(vault).unwrap());
        assert_eq!(args.max_limit, U256::from(1000u64));

        let cli = Cli::try_parse_from(["restake-cli", "middleware-force-update-nodes", manager, vault]).unwrap();
        let Command::MiddlewareForceUpdateNodes(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.limit_stake, U256::ZERO);

        let cli = Cli::try_parse_from(["restake-cli", "balancer-set-up-security-module", manager, vault, "500"]).unwrap();
        assert!(matches!(cli.command, Command::BalancerSetUpSecurityModule(ref a) if a.max_weight == 500));

        let epoch_too_wide = Cli::try_parse_from(["restake-cli", "middleware-get-epoch-start-ts", manager, "281474976710656"]);
        assert!(epoch_too_wide.is_err());
    }

    #[test]
    fn positional_defaults_apply() {
        let cli = Cli::try_parse_from([
            "restake-cli",
            "set-l1-limit",
            "0x0165878A594ca255338adfa4d48449f69242Eb8F",
            "0x5FC8d32690cc91D4c39d9d3abcBD16989F875707",
            "1000",
            "--ledger",
        ])
        .unwrap();
        let Command::SetL1Limit(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.asset_class, U256::from(1u64));
        assert_eq!(args.limit, U256::from(1000u64));
        assert!(args.signer.ledger);

        let cli = Cli::try_parse_from([
            "restake-cli",
            "opt-in-l1-signature",
            "0x5FC8d32690cc91D4c39d9d3abcBD16989F875707",
        ])
        .unwrap();
        let Command::OptInL1Signature(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.duration, 604_800);
    }

    #[test]
    fn bad_inputs_never_reach_a_command() {
        for argv in [
            vec!["restake-cli", "isl1", "0x1234"],
            vec!["restake-cli", "--chain", "mainnet", "ops"],
            vec!["restake-cli", "deposit", "0x0165878A594ca255338adfa4d48449f69242Eb8F", "0"],
            vec!["restake-cli", "deposit", "0x0165878A594ca255338adfa4d48449f69242Eb8F", "-1"],
            vec![
                "restake-cli",
                "set-max-l1-limit",
                "0x0165878A594ca255338adfa4d48449f69242Eb8F",
                "0x5FC8d32690cc91D4c39d9d3abcBD16989F875707",
                "10",
                "79228162514264337593543950336",
            ],
        ] {
            assert!(Cli::try_parse_from(argv.clone()).is_err(), "{argv:?} parsed");
        }
    }

    #[test]
    fn negative_amounts_reach_the_amount_parser() {
        for command in ["deposit", "withdraw"] {
            let err = Cli::try_parse_from([
                "restake-cli",
                command,
                "0x0165878A594ca255338adfa4d48449f69242Eb8F",
                "-1",
            ])
            .unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
            assert!(err.to_string().contains("Token amount cannot be negative"), "{err}");
        }
    }

    #[test]
    fn asset_classes_above_64_bits_parse() {
        let cli = Cli::try_parse_from([
            "restake-cli",
            "set-l1-limit",
            "0x0165878A594ca255338adfa4d48449f69242Eb8F",
            "0x5FC8d32690cc91D4c39d9d3abcBD16989F875707",
            "1000",
            "18446744073709551616",
        ])
        .unwrap();
        let Command::SetL1Limit(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.asset_class, U256::from(1u64) << 64);
    }
}
