use std::path::PathBuf;
use thiserror::Error;

/// Failures detected before any command logic runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid chain: {value}. Valid options are: {valid}")]
    InvalidChain { value: String, valid: String },

    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    #[error("Could not find ABI file for {contract} under {}", root.display())]
    AbiNotFound { contract: &'static str, root: PathBuf },

    #[error("Mismatch between specified chain ID ({expected}) and provider's chain ID ({actual})")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("asset_classes must list at least one asset class")]
    NoAssetClasses,
}
