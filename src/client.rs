use crate::abi::{
    as_address, as_bool, as_string, as_uint, decode_output, decode_type, encode_call, encode_type_call,
    uint_arg, address_arg, ContractAbis, Entity,
};
use crate::config::{Chain, Config, Deployment};
use crate::error::ConfigError;
use crate::multicall::Multicall;
use crate::rpc::{self, EthRpc, RpcClient};
use crate::signer::StakingSigner;
use crate::typed_data::OptInService;
use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::Function;
use alloy_primitives::{Address, Bytes, TxHash, TxKind, U256};
use alloy_sol_types::SolCall;
use anyhow::{anyhow, Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMeta {
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMeta {
    fn unknown() -> Self {
        Self {
            symbol: "Unknown".to_string(),
            decimals: 0,
        }
    }
}

/// Token metadata keyed by token address. Entries are never evicted.
pub trait TokenMetaStore {
    fn get(&self, token: &Address) -> Option<TokenMeta>;
    fn insert(&mut self, token: Address, meta: TokenMeta);
}

impl TokenMetaStore for HashMap<Address, TokenMeta> {
    fn get(&self, token: &Address) -> Option<TokenMeta> {
        HashMap::get(self, token).cloned()
    }

    fn insert(&mut self, token: Address, meta: TokenMeta) {
        HashMap::insert(self, token, meta);
    }
}

enum Payload<'a> {
    /// Encoded against the loaded interface of `entity`.
    Interface {
        entity: Entity,
        function: &'a str,
        args: Vec<DynSolValue>,
    },
    /// Already encoded through a static binding.
    Encoded { signature: &'static str, data: Bytes },
}

/// A contract call to be signed and submitted.
pub struct WriteCall<'a> {
    pub to: Address,
    payload: Payload<'a>,
    pub value: U256,
}

impl<'a> WriteCall<'a> {
    pub fn new(entity: Entity, to: Address, function: &'a str, args: Vec<DynSolValue>) -> Self {
        Self {
            to,
            payload: Payload::Interface {
                entity,
                function,
                args,
            },
            value: U256::ZERO,
        }
    }

    /// A call to a contract this client has no interface file for.
    pub fn sol<T: SolCall>(to: Address, call: &T) -> Self {
        Self {
            to,
            payload: Payload::Encoded {
                signature: T::SIGNATURE,
                data: Bytes::from(call.abi_encode()),
            },
            value: U256::ZERO,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Connection to one chain with the protocol's contracts bound to their interfaces.
pub struct Client<C = RpcClient> {
    caller: C,
    pub chain: Chain,
    pub deployment: Deployment,
    abis: ContractAbis,
    multicall: Option<Address>,
    asset_classes: Vec<u64>,
    token_meta: RefCell<Box<dyn TokenMetaStore>>,
}

impl Client<RpcClient> {
    /// Load interfaces, open the RPC connection and check it serves `chain`.
    pub async fn connect(config: &Config, chain: Chain, provider: Option<&str>) -> Result<Self> {
        let abis = ContractAbis::load(&config.abi_root()?)?;
        let deployment = config.deployment(chain)?;
        let multicall = config.resolve_multicall(chain)?;
        let asset_classes = config.asset_classes()?;

        let url = config.resolve_rpc(chain, provider);
        tracing::debug!(%chain, %url, "connecting");
        let rpc = RpcClient::new(&url)?;
        let actual = rpc::chain_id(&rpc).await?;
        if actual != chain.chain_id() {
            return Err(ConfigError::ChainIdMismatch {
                expected: chain.chain_id(),
                actual,
            }
            .into());
        }
        println!("Connected to chain ID {actual}");

        Ok(Client::new(rpc, chain, abis, deployment)
            .with_multicall(multicall)
            .with_asset_classes(asset_classes))
    }
}

impl<C: EthRpc> Client<C> {
    pub fn new(caller: C, chain: Chain, abis: ContractAbis, deployment: Deployment) -> Self {
        Self {
            caller,
            chain,
            deployment,
            abis,
            multicall: None,
            asset_classes: vec![crate::types::DEFAULT_ASSET_CLASS],
            token_meta: RefCell::new(Box::new(HashMap::new())),
        }
    }

    pub fn with_multicall(mut self, multicall: Option<Address>) -> Self {
        self.multicall = multicall;
        self
    }

    pub fn with_asset_classes(mut self, asset_classes: Vec<u64>) -> Self {
        self.asset_classes = asset_classes;
        self
    }

    #[cfg(test)]
    pub(crate) fn caller(&self) -> &C {
        &self.caller
    }

    #[cfg(test)]
    pub fn with_token_store(mut self, store: Box<dyn TokenMetaStore>) -> Self {
        self.token_meta = RefCell::new(store);
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }

    pub fn asset_classes(&self) -> &[u64] {
        &self.asset_classes
    }

    pub fn function(&self, entity: Entity, name: &str, arity: usize) -> Result<&Function> {
        self.abis.function(entity, name, arity)
    }

    /// Sign and submit `call`, then wait for it to be mined.
    ///
    /// Prints `success` once the receipt is in. Any failure along the way is
    /// reported as `Failed! Reason: ...` and yields `None`.
    pub async fn write<S: StakingSigner>(
        &self,
        signer: &S,
        call: WriteCall<'_>,
        success: &str,
    ) -> Option<TxHash> {
        match self.submit(signer, &call).await {
            Ok(tx_hash) => {
                println!("{success}");
                Some(tx_hash)
            }
            Err(err) => {
                tracing::debug!(to = %call.to, "write failed: {err:?}");
                println!("Failed! Reason: {err:#}");
                None
            }
        }
    }

    async fn submit<S: StakingSigner>(&self, signer: &S, call: &WriteCall<'_>) -> Result<TxHash> {
        let (signature, input) = match &call.payload {
            Payload::Interface { entity, function, args } => {
                let function = self.function(*entity, function, args.len())?;
                (function.signature(), encode_call(function, args)?)
            }
            Payload::Encoded { signature, data } => (signature.to_string(), data.clone()),
        };
        let from = signer.address();

        let nonce = self.caller.nonce(from).await?;
        let (max_fee_per_gas, max_priority_fee_per_gas) = self.caller.fees().await?;
        let gas_limit = self
            .caller
            .estimate_gas(from, call.to, input.clone(), call.value)
            .await
            .with_context(|| format!("gas estimation for {signature} failed"))?;

        let mut tx = TxEip1559 {
            chain_id: self.chain_id(),
            nonce,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            to: TxKind::Call(call.to),
            value: call.value,
            access_list: Default::default(),
            input,
        };
        tracing::debug!(%from, to = %call.to, nonce, gas_limit, function = %signature, "built transaction");

        let tx_signature = signer.sign_transaction(&mut tx).await?;
        let envelope: TxEnvelope = tx.into_signed(tx_signature).into();
        self.caller.send_and_wait(envelope).await
    }

    /// View call through a static binding.
    pub async fn call<T: SolCall>(&self, to: Address, call: &T) -> Result<T::Return> {
        tracing::debug!(contract = %to, function = T::SIGNATURE, "eth_call");
        let raw = self
            .caller
            .call(to, Bytes::from(call.abi_encode()))
            .await
            .with_context(|| format!("{} at {to} failed", T::SIGNATURE))?;
        T::abi_decode_returns(&raw).with_context(|| format!("failed to decode {}", T::SIGNATURE))
    }

    /// Generic view call. Errors from the node are passed through with the call attached as context.
    pub async fn read(
        &self,
        entity: Entity,
        address: Address,
        name: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>> {
        let function = self.function(entity, name, args.len())?;
        let data = encode_call(function, args)?;
        tracing::debug!(%entity, contract = %address, function = name, "eth_call");
        let raw = self
            .caller
            .call(address, data)
            .await
            .with_context(|| format!("{entity}.{name} at {address} failed"))?;
        decode_output(function, &raw)
    }

    async fn read_one(&self, entity: Entity, address: Address, name: &str, args: &[DynSolValue]) -> Result<DynSolValue> {
        self.read(entity, address, name, args)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{entity}.{name} returned nothing"))
    }

    pub async fn read_address(&self, entity: Entity, address: Address, name: &str, args: &[DynSolValue]) -> Result<Address> {
        as_address(&self.read_one(entity, address, name, args).await?)
    }

    pub async fn read_uint(&self, entity: Entity, address: Address, name: &str, args: &[DynSolValue]) -> Result<U256> {
        as_uint(&self.read_one(entity, address, name, args).await?)
    }

    pub async fn read_bool(&self, entity: Entity, address: Address, name: &str, args: &[DynSolValue]) -> Result<bool> {
        as_bool(&self.read_one(entity, address, name, args).await?)
    }

    pub async fn read_string(&self, entity: Entity, address: Address, name: &str, args: &[DynSolValue]) -> Result<String> {
        as_string(&self.read_one(entity, address, name, args).await?)
    }

    /// Run a batch through Multicall3 when the chain has one, else call by call.
    pub async fn aggregate(&self, batch: Multicall<'_>) -> Result<Vec<Option<DynSolValue>>> {
        batch.call(&self.caller, self.multicall).await
    }

    /// Symbol and decimals of an ERC-20, memoized for the life of the client.
    /// Tokens that do not answer are recorded as `Unknown` with 0 decimals.
    pub async fn token_meta(&self, token: Address) -> TokenMeta {
        if let Some(meta) = self.token_meta.borrow().get(&token) {
            return meta;
        }
        let meta = match self.fetch_token_meta(token).await {
            Ok(meta) => meta,
            Err(err) => {
                tracing::warn!(%token, "token metadata unavailable: {err:#}");
                TokenMeta::unknown()
            }
        };
        self.token_meta.borrow_mut().insert(token, meta.clone());
        meta
    }

    async fn fetch_token_meta(&self, token: Address) -> Result<TokenMeta> {
        let symbol = self.read_string(Entity::Erc20, token, "symbol", &[]).await?;
        let decimals = self.read_uint(Entity::Erc20, token, "decimals", &[]).await?;
        let decimals = u8::try_from(decimals).map_err(|_| anyhow!("decimals {decimals} out of range"))?;
        Ok(TokenMeta { symbol, decimals })
    }

    /// `TYPE()` of a delegator or slasher.
    pub async fn entity_type(&self, address: Address) -> Result<u64> {
        tracing::debug!(contract = %address, "TYPE()");
        let raw = self.caller.call(address, encode_type_call()).await?;
        decode_type(&raw)
    }

    pub async fn is_l1(&self, address: Address) -> Result<bool> {
        self.read_bool(Entity::L1Registry, self.deployment.l1_registry, "isRegistered", &[address_arg(address)])
            .await
    }

    pub async fn is_operator(&self, address: Address) -> Result<bool> {
        self.read_bool(Entity::OperatorRegistry, self.deployment.op_registry, "isRegistered", &[address_arg(address)])
            .await
    }

    pub async fn is_vault(&self, address: Address) -> Result<bool> {
        self.read_bool(Entity::VaultFactory, self.deployment.vault_factory, "isEntity", &[address_arg(address)])
            .await
    }

    pub async fn register_fee(&self) -> Result<U256> {
        self.read_uint(Entity::L1Registry, self.deployment.l1_registry, "registerFee", &[]).await
    }

    pub async fn collateral(&self, vault: Address) -> Result<Address> {
        self.read_address(Entity::Vault, vault, "collateral", &[]).await
    }

    pub async fn delegator(&self, vault: Address) -> Result<Address> {
        self.read_address(Entity::Vault, vault, "delegator", &[]).await
    }

    pub async fn slasher(&self, vault: Address) -> Result<Address> {
        self.read_address(Entity::Vault, vault, "slasher", &[]).await
    }

    pub async fn epoch_duration(&self, vault: Address) -> Result<u64> {
        to_u64(self.read_uint(Entity::Vault, vault, "epochDuration", &[]).await?)
    }

    pub async fn current_epoch(&self, vault: Address) -> Result<U256> {
        self.read_uint(Entity::Vault, vault, "currentEpoch", &[]).await
    }

    pub async fn current_epoch_start(&self, vault: Address) -> Result<u64> {
        to_u64(self.read_uint(Entity::Vault, vault, "currentEpochStart", &[]).await?)
    }

    pub async fn active_balance(&self, vault: Address, account: Address) -> Result<U256> {
        self.read_uint(Entity::Vault, vault, "activeBalanceOf", &[address_arg(account)]).await
    }

    pub async fn withdrawals(&self, vault: Address, epoch: U256, account: Address) -> Result<U256> {
        self.read_uint(Entity::Vault, vault, "withdrawalsOf", &[uint_arg(epoch, 256), address_arg(account)])
            .await
    }

    pub async fn withdrawals_claimed(&self, vault: Address, epoch: U256, account: Address) -> Result<bool> {
        self.read_bool(Entity::Vault, vault, "isWithdrawalsClaimed", &[uint_arg(epoch, 256), address_arg(account)])
            .await
    }

    pub async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        self.read_uint(Entity::Erc20, token, "allowance", &[address_arg(owner), address_arg(spender)])
            .await
    }

    pub async fn is_opted_in(&self, service: OptInService, who: Address, target: Address) -> Result<bool> {
        let address = service.address(&self.deployment);
        self.read_bool(service.entity(), address, "isOptedIn", &[address_arg(who), address_arg(target)])
            .await
    }

    pub async fn opt_in_nonce(&self, service: OptInService, who: Address, target: Address) -> Result<U256> {
        let address = service.address(&self.deployment);
        self.read_uint(service.entity(), address, "nonces", &[address_arg(who), address_arg(target)])
            .await
    }

    pub async fn stake(&self, delegator: Address, l1: Address, asset_class: u64, operator: Address) -> Result<U256> {
        let args = [address_arg(l1), asset_class_arg(asset_class), address_arg(operator)];
        self.read_uint(Entity::Delegator, delegator, "stake", &args).await
    }

    pub async fn operator_l1_shares(
        &self,
        delegator: Address,
        l1: Address,
        asset_class: u64,
        operator: Address,
    ) -> Result<U256> {
        let args = [address_arg(l1), asset_class_arg(asset_class), address_arg(operator)];
        self.read_uint(Entity::Delegator, delegator, "operatorL1Shares", &args).await
    }

    pub async fn total_operator_l1_shares(&self, delegator: Address, l1: Address, asset_class: u64) -> Result<U256> {
        let args = [address_arg(l1), asset_class_arg(asset_class)];
        self.read_uint(Entity::Delegator, delegator, "totalOperatorL1Shares", &args).await
    }
}

pub fn asset_class_arg(asset_class: u64) -> DynSolValue {
    uint_arg(U256::from(asset_class), 96)
}

fn to_u64(value: U256) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{value} does not fit in 64 bits"))
}
