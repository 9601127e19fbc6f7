use crate::error::ConfigError;
use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

alloy_sol_types::sol! {
    // Shared by delegators and slashers, neither of which needs its full ABI for this.
    function TYPE() external view returns (uint64);
}

/// Every contract kind the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    OperatorRegistry,
    L1Registry,
    VaultFactory,
    OperatorL1OptIn,
    OperatorVaultOptIn,
    Vault,
    Delegator,
    Erc20,
}

impl Entity {
    pub const ALL: [Entity; 8] = [
        Entity::OperatorRegistry,
        Entity::L1Registry,
        Entity::VaultFactory,
        Entity::OperatorL1OptIn,
        Entity::OperatorVaultOptIn,
        Entity::Vault,
        Entity::Delegator,
        Entity::Erc20,
    ];

    /// Contract name of the build artifact, `<name>.json`.
    pub fn artifact(self) -> &'static str {
        match self {
            Entity::OperatorRegistry => "OperatorRegistry",
            Entity::L1Registry => "L1Registry",
            Entity::VaultFactory => "VaultFactory",
            Entity::OperatorL1OptIn => "OperatorL1OptInService",
            Entity::OperatorVaultOptIn => "OperatorVaultOptInService",
            Entity::Vault => "VaultTokenized",
            Entity::Delegator => "L1RestakeDelegator",
            Entity::Erc20 => "ERC20",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.artifact())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactFile {
    Build { abi: JsonAbi },
    Bare(JsonAbi),
}

/// One parsed interface per [`Entity`], complete by construction.
#[derive(Debug, Clone)]
pub struct ContractAbis {
    abis: Vec<JsonAbi>,
}

impl ContractAbis {
    /// Find `<Artifact>.json` for every entity anywhere under `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let mut found = BTreeMap::new();
        index_artifacts(root, &mut found)
            .with_context(|| format!("failed to scan ABI directory {}", root.display()))?;

        let mut abis = Vec::with_capacity(Entity::ALL.len());
        for entity in Entity::ALL {
            let path = found
                .get(&format!("{}.json", entity.artifact()))
                .ok_or_else(|| ConfigError::AbiNotFound {
                    contract: entity.artifact(),
                    root: root.to_path_buf(),
                })?;
            tracing::debug!(%entity, path = %path.display(), "loading ABI");
            abis.push(read_artifact(path)?);
        }
        Ok(Self { abis })
    }

    pub fn from_abis(mut abis: BTreeMap<Entity, JsonAbi>) -> Result<Self> {
        Entity::ALL
            .into_iter()
            .map(|entity| {
                abis.remove(&entity)
                    .ok_or_else(|| anyhow!("missing ABI for {entity}"))
            })
            .collect::<Result<Vec<_>>>()
            .map(|abis| Self { abis })
    }

    pub fn get(&self, entity: Entity) -> &JsonAbi {
        &self.abis[entity.index()]
    }

    /// Resolve an overloaded function by argument count.
    pub fn function(&self, entity: Entity, name: &str, arity: usize) -> Result<&Function> {
        self.get(entity)
            .function(name)
            .and_then(|overloads| overloads.iter().find(|function| function.inputs.len() == arity))
            .ok_or_else(|| anyhow!("{entity} has no function {name} taking {arity} arguments"))
    }
}

fn index_artifacts(dir: &Path, found: &mut BTreeMap<String, PathBuf>) -> std::io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            index_artifacts(&path, found)?;
        } else if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            found.entry(name.to_string()).or_insert(path);
        }
    }
    Ok(())
}

fn read_artifact(path: &Path) -> Result<JsonAbi> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read ABI {}", path.display()))?;
    let artifact: ArtifactFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse ABI {}", path.display()))?;
    Ok(match artifact {
        ArtifactFile::Build { abi } => abi,
        ArtifactFile::Bare(abi) => abi,
    })
}

pub fn encode_call(function: &Function, args: &[DynSolValue]) -> Result<Bytes> {
    let data = function
        .abi_encode_input(args)
        .with_context(|| format!("failed to encode {}", function.signature()))?;
    Ok(Bytes::from(data))
}

/// Decode return data. A single struct return is flattened into its fields.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<DynSolValue>> {
    let mut values = function
        .abi_decode_output(data)
        .with_context(|| format!("failed to decode {} output", function.name))?;
    if values.len() == 1 {
        if let DynSolValue::Tuple(fields) = &values[0] {
            values = fields.clone();
        }
    }
    Ok(values)
}

pub fn encode_type_call() -> Bytes {
    Bytes::from(TYPECall {}.abi_encode())
}

pub fn decode_type(data: &[u8]) -> Result<u64> {
    let (value,) = <(u64,)>::abi_decode(data)?;
    Ok(value)
}

pub fn address_arg(value: Address) -> DynSolValue {
    DynSolValue::Address(value)
}

pub fn uint_arg(value: U256, bits: usize) -> DynSolValue {
    DynSolValue::Uint(value, bits)
}

pub fn as_address(value: &DynSolValue) -> Result<Address> {
    value
        .as_address()
        .ok_or_else(|| anyhow!("expected an address, got {value:?}"))
}

pub fn as_uint(value: &DynSolValue) -> Result<U256> {
    value
        .as_uint()
        .map(|(value, _)| value)
        .ok_or_else(|| anyhow!("expected an unsigned integer, got {value:?}"))
}

pub fn as_bool(value: &DynSolValue) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| anyhow!("expected a bool, got {value:?}"))
}

pub fn as_string(value: &DynSolValue) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("expected a string, got {value:?}"))
}
