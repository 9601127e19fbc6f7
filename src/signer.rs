use alloy_consensus::TxEip1559;
use alloy_network::TxSigner;
use alloy_primitives::{Address, Signature, B256};
use alloy_signer::{Signer, SignerSync};
use alloy_signer_ledger::{HDPath, LedgerSigner};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{Eip712Domain, SolStruct};
use anyhow::{anyhow, Context, Result};

/// Accounts scanned on the device when `--ledger-address` is given.
const LEDGER_SEARCH_DEPTH: usize = 10;

/// Something that can authorize protocol actions for one account.
#[allow(async_fn_in_trait)]
pub trait StakingSigner {
    fn address(&self) -> Address;

    async fn sign_transaction(&self, tx: &mut TxEip1559) -> Result<Signature>;

    async fn sign_typed_data<T: SolStruct + Send + Sync>(
        &self,
        payload: &T,
        domain: &Eip712Domain,
    ) -> Result<Signature>;
}

impl StakingSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        Signer::address(self)
    }

    async fn sign_transaction(&self, tx: &mut TxEip1559) -> Result<Signature> {
        Ok(TxSigner::<Signature>::sign_transaction(self, tx).await?)
    }

    async fn sign_typed_data<T: SolStruct + Send + Sync>(
        &self,
        payload: &T,
        domain: &Eip712Domain,
    ) -> Result<Signature> {
        Ok(self.sign_hash_sync(&payload.eip712_signing_hash(domain))?)
    }
}

/// A Ledger account. The USB handle lives as long as this value.
pub struct LedgerAccount {
    inner: LedgerSigner,
    path: String,
}

impl LedgerAccount {
    /// Open the device at `m/44'/60'/0'/0/0`, or scan for `expected` among the first accounts.
    pub async fn connect(chain_id: u64, expected: Option<Address>) -> Result<Self> {
        let Some(expected) = expected else {
            return Self::open(chain_id, 0).await;
        };
        for index in 0..LEDGER_SEARCH_DEPTH {
            let account = Self::open(chain_id, index).await?;
            if Signer::address(&account.inner) == expected {
                return Ok(account);
            }
        }
        Err(anyhow!(
            "account {expected} not found in the first {LEDGER_SEARCH_DEPTH} Ledger accounts"
        ))
    }

    async fn open(chain_id: u64, index: usize) -> Result<Self> {
        let path = bip44_path(index);
        let inner = LedgerSigner::new(HDPath::Other(path.clone()), Some(chain_id))
            .await
            .with_context(|| format!("failed to open Ledger account {path}"))?;
        tracing::debug!(%path, address = %Signer::address(&inner), "ledger account");
        Ok(Self { inner, path })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn bip44_path(index: usize) -> String {
    format!("m/44'/60'/0'/0/{index}")
}

impl StakingSigner for LedgerAccount {
    fn address(&self) -> Address {
        Signer::address(&self.inner)
    }

    async fn sign_transaction(&self, tx: &mut TxEip1559) -> Result<Signature> {
        println!("Sign transaction on Ledger device");
        Ok(TxSigner::<Signature>::sign_transaction(&self.inner, tx).await?)
    }

    async fn sign_typed_data<T: SolStruct + Send + Sync>(
        &self,
        payload: &T,
        domain: &Eip712Domain,
    ) -> Result<Signature> {
        println!("Sign data on Ledger device");
        // The device signs the domain separator and struct hash pair.
        Ok(Signer::sign_typed_data(&self.inner, payload, domain).await?)
    }
}

/// The backend chosen on the command line.
pub enum AnySigner {
    Local(PrivateKeySigner),
    Ledger(LedgerAccount),
}

impl StakingSigner for AnySigner {
    fn address(&self) -> Address {
        match self {
            AnySigner::Local(signer) => StakingSigner::address(signer),
            AnySigner::Ledger(signer) => signer.address(),
        }
    }

    async fn sign_transaction(&self, tx: &mut TxEip1559) -> Result<Signature> {
        match self {
            AnySigner::Local(signer) => StakingSigner::sign_transaction(signer, tx).await,
            AnySigner::Ledger(signer) => signer.sign_transaction(tx).await,
        }
    }

    async fn sign_typed_data<T: SolStruct + Send + Sync>(
        &self,
        payload: &T,
        domain: &Eip712Domain,
    ) -> Result<Signature> {
        match self {
            AnySigner::Local(signer) => StakingSigner::sign_typed_data(signer, payload, domain).await,
            AnySigner::Ledger(signer) => signer.sign_typed_data(payload, domain).await,
        }
    }
}

pub struct SignerOptions {
    pub private_key: Option<B256>,
    pub ledger: bool,
    pub ledger_address: Option<Address>,
}

/// `Ok(None)` when no backend was requested.
///
/// `--ledger` takes precedence over a private key, which may be present only
/// because `PK` is set in the environment.
pub async fn load_signer(options: &SignerOptions, chain_id: u64) -> Result<Option<AnySigner>> {
    if options.ledger {
        if options.private_key.is_some() {
            tracing::debug!("--ledger given, ignoring private key");
        }
        let account = LedgerAccount::connect(chain_id, options.ledger_address).await?;
        tracing::info!(path = account.path(), address = %account.address(), "using Ledger account");
        return Ok(Some(AnySigner::Ledger(account)));
    }
    match options.private_key {
        Some(key) => Ok(Some(AnySigner::Local(load_wallet(&key)?))),
        None => Ok(None),
    }
}

fn load_wallet(key: &B256) -> Result<PrivateKeySigner> {
    PrivateKeySigner::from_bytes(key).map_err(|err| anyhow!("invalid private key: {err}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_consensus::SignableTransaction;
    use alloy_primitives::{address, b256, Bytes, TxKind, U256};

    /// First anvil development account.
    pub(crate) const ANVIL_KEY: B256 =
        b256!("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80");
    pub(crate) const ANVIL_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    pub(crate) fn anvil_signer() -> AnySigner {
        AnySigner::Local(load_wallet(&ANVIL_KEY).unwrap())
    }

    #[tokio::test]
    async fn private_key_backend_resolves() {
        let options = SignerOptions {
            private_key: Some(ANVIL_KEY),
            ledger: false,
            ledger_address: None,
        };
        let signer = load_signer(&options, 31337).await.unwrap().unwrap();
        assert!(matches!(signer, AnySigner::Local(_)));
        assert_eq!(signer.address(), ANVIL_ADDRESS);
    }

    #[tokio::test]
    async fn no_backend_is_none() {
        let options = SignerOptions {
            private_key: None,
            ledger: false,
            ledger_address: None,
        };
        assert!(load_signer(&options, 31337).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn local_transaction_signature_recovers_sender() {
        let signer = anvil_signer();
        let mut tx = TxEip1559 {
            chain_id: 31337,
            nonce: 7,
            gas_limit: 100_000,
            max_fee_per_gas: 2_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
            to: TxKind::Call(Address::repeat_byte(0x42)),
            value: U256::ZERO,
            access_list: Default::default(),
            input: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
        };
        let signature = signer.sign_transaction(&mut tx).await.unwrap();
        let recovered = signature
            .recover_address_from_prehash(&tx.signature_hash())
            .unwrap();
        assert_eq!(recovered, ANVIL_ADDRESS);
    }

    #[test]
    fn ledger_paths_follow_bip44() {
        assert_eq!(bip44_path(0), "m/44'/60'/0'/0/0");
        assert_eq!(bip44_path(3), "m/44'/60'/0'/0/3");
    }
}
