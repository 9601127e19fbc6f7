//! Registry enumeration and the cross-entity views built on top of it.
//!
//! Batched reads come back in the order they were queued. Every helper that
//! batches consumes the results by replaying the loops that queued them, so
//! the two passes must stay in lockstep.

use crate::abi::{address_arg, as_address, as_string, uint_arg, Entity};
use crate::client::{asset_class_arg, Client};
use crate::multicall::Multicall;
use crate::rpc::EthRpc;
use crate::typed_data::OptInService;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1Info {
    pub l1: Address,
    pub middleware: Address,
    pub metadata_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegatorType {
    L1Restake,
    Unknown,
}

impl DelegatorType {
    pub fn from_code(code: Option<u64>) -> Self {
        match code {
            Some(0) => DelegatorType::L1Restake,
            _ => DelegatorType::Unknown,
        }
    }
}

impl fmt::Display for DelegatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DelegatorType::L1Restake => "L1Restake",
            DelegatorType::Unknown => "Unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlasherType {
    NonSlashable,
    Instant,
    Veto,
    Unknown,
}

impl SlasherType {
    pub fn from_code(code: Option<u64>) -> Self {
        match code {
            Some(0) => SlasherType::Instant,
            Some(1) => SlasherType::Veto,
            _ => SlasherType::Unknown,
        }
    }
}

impl fmt::Display for SlasherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlasherType::NonSlashable => "NonSlashable",
            SlasherType::Instant => "InstantSlasher",
            SlasherType::Veto => "VetoSlasher",
            SlasherType::Unknown => "Unknown",
        })
    }
}

/// A vault with its wiring, assembled from several reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultInfo {
    pub vault: Address,
    pub collateral: Address,
    pub delegator: Address,
    pub slasher: Address,
    pub delegator_type: DelegatorType,
    pub slasher_type: SlasherType,
}

/// Non-zero per-asset-class amounts (limits or stakes) of one vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultAmounts {
    pub vault: VaultInfo,
    pub amounts: BTreeMap<u64, U256>,
}

impl VaultAmounts {
    pub fn total(&self) -> U256 {
        self.amounts.values().fold(U256::ZERO, |sum, amount| sum.saturating_add(*amount))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorVaults {
    pub operator: Address,
    pub vaults: Vec<VaultAmounts>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1Vaults {
    pub l1: Address,
    pub vaults: Vec<VaultAmounts>,
}

/// Non-zero per-asset-class amounts one vault grants an L1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1Amounts {
    pub l1: Address,
    pub amounts: BTreeMap<u64, U256>,
}

fn index_arg(index: u64) -> DynSolValue {
    uint_arg(U256::from(index), 256)
}

fn count(value: U256) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("registry size {value} is out of range"))
}

fn amount(value: Option<DynSolValue>) -> U256 {
    value
        .as_ref()
        .and_then(DynSolValue::as_uint)
        .map(|(value, _)| value)
        .unwrap_or_default()
}

pub async fn l1s<C: EthRpc>(client: &Client<C>) -> Result<Vec<L1Info>> {
    let registry = client.deployment.l1_registry;
    let total = count(client.read_uint(Entity::L1Registry, registry, "totalL1s", &[]).await?)?;
    let mut l1s = Vec::new();
    for index in 0..total {
        let values = client
            .read(Entity::L1Registry, registry, "getL1At", &[index_arg(index)])
            .await?;
        let [l1, middleware, metadata_url] = values.as_slice() else {
            anyhow::bail!("getL1At({index}) returned {} values", values.len());
        };
        l1s.push(L1Info {
            l1: as_address(l1)?,
            middleware: as_address(middleware)?,
            metadata_url: as_string(metadata_url)?,
        });
    }
    Ok(l1s)
}

pub async fn operators<C: EthRpc>(client: &Client<C>) -> Result<Vec<Address>> {
    let registry = client.deployment.op_registry;
    let total = count(
        client
            .read_uint(Entity::OperatorRegistry, registry, "totalOperators", &[])
            .await?,
    )?;
    let mut operators = Vec::new();
    for index in 0..total {
        let values = client
            .read(Entity::OperatorRegistry, registry, "getOperatorAt", &[index_arg(index)])
            .await?;
        let first = values
            .first()
            .ok_or_else(|| anyhow!("getOperatorAt({index}) returned nothing"))?;
        operators.push(as_address(first)?);
    }
    Ok(operators)
}

/// L1s the operator has opted into.
pub async fn op_l1s<C: EthRpc>(client: &Client<C>, operator: Address) -> Result<Vec<L1Info>> {
    let mut opted = Vec::new();
    for l1 in l1s(client).await? {
        if client.is_opted_in(OptInService::L1, operator, l1.l1).await? {
            opted.push(l1);
        }
    }
    Ok(opted)
}

/// Operators opted into the L1.
pub async fn l1_ops<C: EthRpc>(client: &Client<C>, l1: Address) -> Result<Vec<Address>> {
    let mut opted = Vec::new();
    for operator in operators(client).await? {
        if client.is_opted_in(OptInService::L1, operator, l1).await? {
            opted.push(operator);
        }
    }
    Ok(opted)
}

pub async fn vaults<C: EthRpc>(client: &Client<C>) -> Result<Vec<VaultInfo>> {
    let factory = client.deployment.vault_factory;
    let total = count(
        client
            .read_uint(Entity::VaultFactory, factory, "totalEntities", &[])
            .await?,
    )?;
    let mut addresses = Vec::new();
    for index in 0..total {
        addresses.push(
            client
                .read_address(Entity::VaultFactory, factory, "entity", &[index_arg(index)])
                .await?,
        );
    }

    const WIRING: [&str; 3] = ["collateral", "delegator", "slasher"];
    let functions = WIRING
        .iter()
        .map(|name| client.function(Entity::Vault, name, 0))
        .collect::<Result<Vec<_>>>()?;
    let mut batch = Multicall::new();
    for vault in &addresses {
        for function in &functions {
            batch.add(*vault, *function, &[])?;
        }
    }
    let wiring = client.aggregate(batch).await?;

    let mut vaults = Vec::with_capacity(addresses.len());
    for (vault, values) in addresses.into_iter().zip(wiring.chunks(WIRING.len())) {
        let [collateral, delegator, slasher] = values else {
            anyhow::bail!("incomplete wiring for vault {vault}");
        };
        let wired = |value: &Option<DynSolValue>, what: &str| {
            value
                .as_ref()
                .and_then(DynSolValue::as_address)
                .ok_or_else(|| anyhow!("failed to read {what} of vault {vault}"))
        };
        let delegator = wired(delegator, "delegator")?;
        let slasher = wired(slasher, "slasher")?;

        let delegator_type = if delegator.is_zero() {
            DelegatorType::Unknown
        } else {
            DelegatorType::from_code(client.entity_type(delegator).await.ok())
        };
        let slasher_type = if slasher.is_zero() {
            SlasherType::NonSlashable
        } else {
            SlasherType::from_code(client.entity_type(slasher).await.ok())
        };

        vaults.push(VaultInfo {
            vault,
            collateral: wired(collateral, "collateral")?,
            delegator,
            slasher,
            delegator_type,
            slasher_type,
        });
    }
    Ok(vaults)
}

/// L1 limits of the given vaults, keeping vaults with at least one non-zero limit.
async fn l1_limits<C: EthRpc>(client: &Client<C>, vaults: &[VaultInfo], l1: Address) -> Result<Vec<VaultAmounts>> {
    let classes = client.asset_classes();
    let delegated: Vec<&VaultInfo> = vaults.iter().filter(|vault| !vault.delegator.is_zero()).collect();

    let l1_limit = client.function(Entity::Delegator, "l1Limit", 2)?;
    let mut batch = Multicall::new();
    for vault in &delegated {
        for class in classes {
            batch.add(vault.delegator, l1_limit, &[address_arg(l1), asset_class_arg(*class)])?;
        }
    }
    tracing::debug!(%l1, calls = batch.len(), "queued l1Limit reads");
    let mut limits = client.aggregate(batch).await?.into_iter();

    let mut result = Vec::new();
    for vault in delegated {
        let mut amounts = BTreeMap::new();
        for class in classes {
            let limit = amount(limits.next().flatten());
            if !limit.is_zero() {
                amounts.insert(*class, limit);
            }
        }
        if !amounts.is_empty() {
            result.push(VaultAmounts {
                vault: vault.clone(),
                amounts,
            });
        }
    }
    Ok(result)
}

/// Vaults that grant the L1 a non-zero limit.
pub async fn l1_vaults<C: EthRpc>(client: &Client<C>, l1: Address) -> Result<Vec<VaultAmounts>> {
    let all = vaults(client).await?;
    l1_limits(client, &all, l1).await
}

/// Stake of every operator opted into the L1, per vault that backs the L1.
pub async fn l1_ops_vaults<C: EthRpc>(client: &Client<C>, l1: Address) -> Result<Vec<OperatorVaults>> {
    let vaults = l1_vaults(client, l1).await?;
    let operators = l1_ops(client, l1).await?;
    let classes = client.asset_classes();

    let stake = client.function(Entity::Delegator, "stake", 3)?;
    let mut batch = Multicall::new();
    for operator in &operators {
        for vault in &vaults {
            for class in classes {
                let args = [address_arg(l1), asset_class_arg(*class), address_arg(*operator)];
                batch.add(vault.vault.delegator, stake, &args)?;
            }
        }
    }
    let mut stakes = client.aggregate(batch).await?.into_iter();

    let mut result = Vec::with_capacity(operators.len());
    for operator in operators {
        let mut backed = Vec::new();
        for vault in &vaults {
            let mut amounts = BTreeMap::new();
            for class in classes {
                let value = amount(stakes.next().flatten());
                if !value.is_zero() {
                    amounts.insert(*class, value);
                }
            }
            if !amounts.is_empty() {
                backed.push(VaultAmounts {
                    vault: vault.vault.clone(),
                    amounts,
                });
            }
        }
        result.push(OperatorVaults {
            operator,
            vaults: backed,
        });
    }
    Ok(result)
}

/// Stake of the operator in every L1 it opted into, per vault.
pub async fn op_l1s_vaults<C: EthRpc>(client: &Client<C>, operator: Address) -> Result<Vec<L1Vaults>> {
    let l1s = op_l1s(client, operator).await?;
    let all = vaults(client).await?;
    let classes = client.asset_classes();

    let mut backing = Vec::with_capacity(l1s.len());
    for l1 in &l1s {
        backing.push(l1_limits(client, &all, l1.l1).await?);
    }

    let stake = client.function(Entity::Delegator, "stake", 3)?;
    let mut batch = Multicall::new();
    for (l1, vaults) in l1s.iter().zip(&backing) {
        for vault in vaults {
            for class in classes {
                let args = [address_arg(l1.l1), asset_class_arg(*class), address_arg(operator)];
                batch.add(vault.vault.delegator, stake, &args)?;
            }
        }
    }
    let mut stakes = client.aggregate(batch).await?.into_iter();

    let mut result = Vec::with_capacity(l1s.len());
    for (l1, vaults) in l1s.iter().zip(backing) {
        let mut staked = Vec::new();
        for vault in vaults {
            let mut amounts = BTreeMap::new();
            for class in classes {
                let value = amount(stakes.next().flatten());
                if !value.is_zero() {
                    amounts.insert(*class, value);
                }
            }
            if !amounts.is_empty() {
                staked.push(VaultAmounts {
                    vault: vault.vault,
                    amounts,
                });
            }
        }
        result.push(L1Vaults {
            l1: l1.l1,
            vaults: staked,
        });
    }
    Ok(result)
}

/// Operators opted into the vault.
pub async fn vault_ops<C: EthRpc>(client: &Client<C>, vault: Address) -> Result<Vec<Address>> {
    let mut opted = Vec::new();
    for operator in operators(client).await? {
        if client.is_opted_in(OptInService::Vault, operator, vault).await? {
            opted.push(operator);
        }
    }
    Ok(opted)
}

/// L1s the vault's curator has granted a non-zero max limit.
pub async fn vault_l1s<C: EthRpc>(client: &Client<C>, vault: Address) -> Result<Vec<L1Amounts>> {
    let l1s = l1s(client).await?;
    let delegator = client.delegator(vault).await?;
    let classes = client.asset_classes();

    let max_l1_limit = client.function(Entity::Delegator, "maxL1Limit", 2)?;
    let mut batch = Multicall::new();
    for l1 in &l1s {
        for class in classes {
            batch.add(delegator, max_l1_limit, &[address_arg(l1.l1), asset_class_arg(*class)])?;
        }
    }
    let mut limits = client.aggregate(batch).await?.into_iter();

    let mut result = Vec::new();
    for l1 in l1s {
        let mut amounts = BTreeMap::new();
        for class in classes {
            let limit = amount(limits.next().flatten());
            if !limit.is_zero() {
                amounts.insert(*class, limit);
            }
        }
        if !amounts.is_empty() {
            result.push(L1Amounts { l1: l1.l1, amounts });
        }
    }
    Ok(result)
}

/// For each L1 the vault backs, the vault's operators that also opted into that L1.
pub async fn vault_l1s_ops<C: EthRpc>(client: &Client<C>, vault: Address) -> Result<Vec<(Address, Vec<Address>)>> {
    let operators = vault_ops(client, vault).await?;
    let mut result = Vec::new();
    for l1 in vault_l1s(client, vault).await? {
        let mut opted = Vec::new();
        for operator in &operators {
            if client.is_opted_in(OptInService::L1, *operator, l1.l1).await? {
                opted.push(*operator);
            }
        }
        result.push((l1.l1, opted));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::tests::test_abis;
    use crate::client::tests::mock_client;
    use crate::config::Chain;
    use crate::multicall::tests::{MockChain, AGGREGATOR};
    use alloy_primitives::address;
    use alloy_sol_types::SolValue;

    const L1: Address = address!("a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1");
    const OPERATOR: Address = address!("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b");
    const TOKEN: Address = address!("7070707070707070707070707070707070707070");

    struct Fixture {
        chain: MockChain,
        vaults: Vec<(Address, Address)>,
    }

    impl Fixture {
        /// Two vaults. The first backs [`L1`] with a limit of 500, the second
        /// has no limit. [`OPERATOR`] is opted into [`L1`] and staked 300 in the first.
        fn new() -> Self {
            let abis = test_abis();
            let deployment = Chain::Anvil.default_deployment();
            let f = |entity, name, arity| abis.function(entity, name, arity).unwrap();
            let mut chain = MockChain::default();
            let vaults = vec![
                (Address::repeat_byte(0x31), Address::repeat_byte(0xd1)),
                (Address::repeat_byte(0x32), Address::repeat_byte(0xd2)),
            ];

            chain.respond(
                deployment.vault_factory,
                f(Entity::VaultFactory, "totalEntities", 0),
                &[],
                U256::from(2u64).abi_encode(),
            );
            for (index, (vault, delegator)) in vaults.iter().enumerate() {
                chain.respond(
                    deployment.vault_factory,
                    f(Entity::VaultFactory, "entity", 1),
                    &[index_arg(index as u64)],
                    vault.abi_encode(),
                );
                chain.respond(*vault, f(Entity::Vault, "collateral", 0), &[], TOKEN.abi_encode());
                chain.respond(*vault, f(Entity::Vault, "delegator", 0), &[], delegator.abi_encode());
                chain.respond(*vault, f(Entity::Vault, "slasher", 0), &[], Address::ZERO.abi_encode());
            }
            // Only the first delegator answers TYPE().
            chain.respond(vaults[0].1, f(Entity::Delegator, "TYPE", 0), &[], U256::ZERO.abi_encode());
            chain.respond(
                vaults[0].1,
                f(Entity::Delegator, "l1Limit", 2),
                &[address_arg(L1), asset_class_arg(1)],
                U256::from(500u64).abi_encode(),
            );
            chain.respond(
                vaults[1].1,
                f(Entity::Delegator, "l1Limit", 2),
                &[address_arg(L1), asset_class_arg(1)],
                U256::ZERO.abi_encode(),
            );

            chain.respond(
                deployment.op_registry,
                f(Entity::OperatorRegistry, "totalOperators", 0),
                &[],
                U256::from(1u64).abi_encode(),
            );
            chain.respond(
                deployment.op_registry,
                f(Entity::OperatorRegistry, "getOperatorAt", 1),
                &[index_arg(0)],
                (OPERATOR, "https://op.example".to_string()).abi_encode_params(),
            );
            chain.respond(
                deployment.op_l1_opt_in,
                f(Entity::OperatorL1OptIn, "isOptedIn", 2),
                &[address_arg(OPERATOR), address_arg(L1)],
                true.abi_encode(),
            );
            chain.respond(
                vaults[0].1,
                f(Entity::Delegator, "stake", 3),
                &[address_arg(L1), asset_class_arg(1), address_arg(OPERATOR)],
                U256::from(300u64).abi_encode(),
            );

            Self { chain, vaults }
        }
    }

    #[tokio::test]
    async fn vaults_resolve_wiring_and_types() {
        let fixture = Fixture::new();
        let client = mock_client(fixture.chain);
        let vaults = vaults(&client).await.unwrap();

        assert_eq!(vaults.len(), 2);
        assert_eq!(vaults[0].vault, fixture.vaults[0].0);
        assert_eq!(vaults[0].collateral, TOKEN);
        assert_eq!(vaults[0].delegator_type, DelegatorType::L1Restake);
        assert_eq!(vaults[1].delegator_type, DelegatorType::Unknown);
        assert_eq!(vaults[0].slasher_type, SlasherType::NonSlashable);
        assert_eq!(vaults[0].slasher_type.to_string(), "NonSlashable");
    }

    #[tokio::test]
    async fn l1_vaults_drop_zero_limits() {
        let client = mock_client(Fixture::new().chain);
        let backing = l1_vaults(&client, L1).await.unwrap();
        assert_eq!(backing.len(), 1);
        assert_eq!(backing[0].amounts, BTreeMap::from([(1, U256::from(500u64))]));
    }

    #[tokio::test]
    async fn operator_stakes_agree_with_and_without_aggregator() {
        let sequential = mock_client(Fixture::new().chain);
        let batched = mock_client(Fixture::new().chain).with_multicall(Some(AGGREGATOR));

        let expected = l1_ops_vaults(&sequential, L1).await.unwrap();
        assert_eq!(l1_ops_vaults(&batched, L1).await.unwrap(), expected);

        assert_eq!(expected.len(), 1);
        assert_eq!(expected[0].operator, OPERATOR);
        assert_eq!(expected[0].vaults.len(), 1);
        assert_eq!(expected[0].vaults[0].total(), U256::from(300u64));
    }

    #[tokio::test]
    async fn extra_asset_classes_replay_in_order() {
        let fixture = Fixture::new();
        let vault = fixture.vaults[0];
        let mut chain = fixture.chain;
        let abis = test_abis();
        chain.respond(
            vault.1,
            abis.function(Entity::Delegator, "l1Limit", 2).unwrap(),
            &[address_arg(L1), asset_class_arg(2)],
            U256::from(70u64).abi_encode(),
        );
        let client = mock_client(chain)
            .with_multicall(Some(AGGREGATOR))
            .with_asset_classes(vec![1, 2]);

        let backing = l1_vaults(&client, L1).await.unwrap();
        assert_eq!(
            backing[0].amounts,
            BTreeMap::from([(1, U256::from(500u64)), (2, U256::from(70u64))])
        );
        assert_eq!(backing[0].total(), U256::from(570u64));
    }

    #[test]
    fn type_codes_render() {
        assert_eq!(DelegatorType::from_code(Some(0)).to_string(), "L1Restake");
        assert_eq!(DelegatorType::from_code(Some(3)).to_string(), "Unknown");
        assert_eq!(SlasherType::from_code(Some(0)).to_string(), "InstantSlasher");
        assert_eq!(SlasherType::from_code(Some(1)).to_string(), "VetoSlasher");
        assert_eq!(SlasherType::from_code(None).to_string(), "Unknown");
    }
}
