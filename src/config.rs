use crate::error::ConfigError;
use crate::types::{parse_address, DEFAULT_ASSET_CLASS};
use alloy_primitives::{address, Address};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming the contracts checkout whose `out/` holds the ABI artifacts.
pub const CORE_PATH_ENV: &str = "SUZAKU_CORE_PATH";

pub const MULTICALL3: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Chain {
    Anvil,
    Fuji,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Anvil, Chain::Fuji];

    pub fn name(self) -> &'static str {
        match self {
            Chain::Anvil => "anvil",
            Chain::Fuji => "fuji",
        }
    }

    pub fn chain_id(self) -> u64 {
        match self {
            Chain::Anvil => 31337,
            Chain::Fuji => 43113,
        }
    }

    pub fn default_rpc(self) -> &'static str {
        match self {
            Chain::Anvil => "http://127.0.0.1:8545",
            Chain::Fuji => "https://api.avax-test.network/ext/bc/C/rpc",
        }
    }

    /// Plain anvil nodes have no Multicall3 deployed, so batches fall back to sequential calls.
    pub fn default_multicall(self) -> Option<Address> {
        match self {
            Chain::Anvil => None,
            Chain::Fuji => Some(MULTICALL3),
        }
    }

    pub fn default_deployment(self) -> Deployment {
        match self {
            Chain::Anvil => Deployment {
                op_registry: address!("0165878A594ca255338adfa4d48449f69242Eb8F"),
                l1_registry: address!("5FC8d32690cc91D4c39d9d3abcBD16989F875707"),
                vault_factory: address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"),
                op_l1_opt_in: address!("959922bE3CAee4b8Cd9a407cc3ac1C251C2007B1"),
                op_vault_opt_in: address!("0B306BF915C4d645ff596e518fAf3F9669b97016"),
            },
            Chain::Fuji => Deployment {
                op_registry: address!("46D45D6be6214F6bd8124187caD1a5302755d7A2"),
                l1_registry: address!("B9826Bbf0deB10cC3924449B93F418db6b16be36"),
                vault_factory: address!("407A039D94948484D356eFB765b3c74382A050B4"),
                op_l1_opt_in: address!("0360C1cB32A20D97b358538D9Db71339ce2c9592"),
                op_vault_opt_in: address!("C30c9f7482B2ED82d0532812285295f8b7453941"),
            },
        }
    }

    fn valid_options() -> String {
        Chain::ALL
            .iter()
            .flat_map(|chain| [chain.chain_id().to_string(), chain.name().to_string()])
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for Chain {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Chain::ALL
            .into_iter()
            .find(|chain| chain.name() == needle || chain.chain_id().to_string() == needle)
            .ok_or_else(|| ConfigError::InvalidChain {
                value: value.to_string(),
                valid: Chain::valid_options(),
            })
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Addresses of the singleton protocol contracts on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub op_registry: Address,
    pub l1_registry: Address,
    pub vault_factory: Address,
    pub op_l1_opt_in: Address,
    pub op_vault_opt_in: Address,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    pub chains: Option<BTreeMap<String, ChainConfig>>,
    pub addresses: Option<BTreeMap<String, AddressConfig>>,
    pub abi: Option<AbiConfig>,
    pub restaking: Option<RestakingConfig>,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ChainConfig {
    pub rpc: Option<String>,
    pub multicall: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct AddressConfig {
    pub op_registry: Option<String>,
    pub l1_registry: Option<String>,
    pub vault_factory: Option<String>,
    pub op_l1_opt_in: Option<String>,
    pub op_vault_opt_in: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct AbiConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct RestakingConfig {
    pub asset_classes: Option<Vec<u64>>,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self {
                path,
                ..Self::default()
            });
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.path = path;
        Ok(config)
    }

    fn chain(&self, chain: Chain) -> Option<&ChainConfig> {
        self.chains.as_ref()?.get(chain.name())
    }

    /// `--provider` wins over the config file, which wins over the built-in endpoint.
    pub fn resolve_rpc(&self, chain: Chain, provider: Option<&str>) -> String {
        provider
            .map(str::to_string)
            .or_else(|| self.chain(chain)?.rpc.clone())
            .unwrap_or_else(|| chain.default_rpc().to_string())
    }

    pub fn resolve_multicall(&self, chain: Chain) -> Result<Option<Address>> {
        match self.chain(chain).and_then(|cfg| cfg.multicall.as_deref()) {
            Some(value) => Ok(Some(parse_address(value).context("invalid multicall address")?)),
            None => Ok(chain.default_multicall()),
        }
    }

    pub fn deployment(&self, chain: Chain) -> Result<Deployment> {
        let mut deployment = chain.default_deployment();
        let Some(overrides) = self.addresses.as_ref().and_then(|all| all.get(chain.name())) else {
            return Ok(deployment);
        };

        let slots = [
            (&overrides.op_registry, &mut deployment.op_registry),
            (&overrides.l1_registry, &mut deployment.l1_registry),
            (&overrides.vault_factory, &mut deployment.vault_factory),
            (&overrides.op_l1_opt_in, &mut deployment.op_l1_opt_in),
            (&overrides.op_vault_opt_in, &mut deployment.op_vault_opt_in),
        ];
        for (value, slot) in slots {
            if let Some(value) = value {
                *slot = parse_address(value)
                    .with_context(|| format!("invalid address override for {chain}"))?;
            }
        }
        Ok(deployment)
    }

    /// Directory searched for ABI artifacts.
    pub fn abi_root(&self) -> Result<PathBuf, ConfigError> {
        self.abi_root_from(std::env::var(CORE_PATH_ENV).ok())
    }

    fn abi_root_from(&self, env: Option<String>) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = self.abi.as_ref().and_then(|abi| abi.dir.clone()) {
            return Ok(dir);
        }
        let core = env
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingEnv(CORE_PATH_ENV))?;
        let core = PathBuf::from(core);
        let out = core.join("out");
        Ok(if out.is_dir() { out } else { core })
    }

    pub fn asset_classes(&self) -> Result<Vec<u64>, ConfigError> {
        match self.restaking.as_ref().and_then(|cfg| cfg.asset_classes.clone()) {
            Some(classes) if classes.is_empty() => Err(ConfigError::NoAssetClasses),
            Some(classes) => Ok(classes),
            None => Ok(vec![DEFAULT_ASSET_CLASS]),
        }
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        return dir.join("restake-cli").join("config.toml");
    }
    PathBuf::from("./config.toml")
}
