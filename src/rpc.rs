use alloy_consensus::TxEnvelope;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{TransactionInput, TransactionReceipt, TransactionRequest};
use alloy_transport_http::Http;
use anyhow::{Context, Result};
use url::Url;

const USER_AGENT: &str = concat!("restake-cli/", env!("CARGO_PKG_VERSION"));

/// The node operations the facade needs: view calls plus what it takes to
/// build, broadcast and confirm a transaction.
#[allow(async_fn_in_trait)]
pub trait EthRpc {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    async fn nonce(&self, account: Address) -> Result<u64>;

    /// `(max_fee_per_gas, max_priority_fee_per_gas)`.
    async fn fees(&self) -> Result<(u128, u128)>;

    async fn estimate_gas(&self, from: Address, to: Address, data: Bytes, value: U256) -> Result<u64>;

    /// Broadcast and wait for the receipt. A reverted transaction is an error.
    async fn send_and_wait(&self, envelope: TxEnvelope) -> Result<TxHash>;
}

#[derive(Clone)]
pub struct RpcClient {
    pub url: String,
    pub provider: RootProvider,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self> {
        let parsed: Url = url.parse().with_context(|| format!("invalid rpc url {url}"))?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build http client")?;
        let is_local = matches!(parsed.host_str(), Some("127.0.0.1" | "localhost"));
        let transport = Http::with_client(http, parsed);
        let client = alloy_rpc_client::RpcClient::new(transport, is_local);
        Ok(Self {
            url: url.to_string(),
            provider: RootProvider::new(client),
        })
    }
}

impl EthRpc for RpcClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        eth_call(self, to, data).await
    }

    async fn nonce(&self, account: Address) -> Result<u64> {
        nonce(self, account).await
    }

    async fn fees(&self) -> Result<(u128, u128)> {
        eip1559_fees(self).await
    }

    async fn estimate_gas(&self, from: Address, to: Address, data: Bytes, value: U256) -> Result<u64> {
        estimate_gas(self, from, to, data, value).await
    }

    async fn send_and_wait(&self, envelope: TxEnvelope) -> Result<TxHash> {
        let receipt = send_and_wait(self, envelope).await?;
        Ok(receipt.transaction_hash)
    }
}

pub async fn eth_call(client: &RpcClient, to: Address, data: Bytes) -> Result<Bytes> {
    let request = TransactionRequest {
        to: Some(to.into()),
        input: TransactionInput::new(data),
        ..Default::default()
    };
    Ok(client.provider.call(request).await?)
}

pub async fn chain_id(client: &RpcClient) -> Result<u64> {
    client
        .provider
        .get_chain_id()
        .await
        .with_context(|| format!("failed to reach {}", client.url))
}

pub async fn nonce(client: &RpcClient, account: Address) -> Result<u64> {
    Ok(client.provider.get_transaction_count(account).await?)
}

pub async fn estimate_gas(
    client: &RpcClient,
    from: Address,
    to: Address,
    data: Bytes,
    value: U256,
) -> Result<u64> {
    let request = TransactionRequest {
        from: Some(from),
        to: Some(to.into()),
        input: TransactionInput::new(data),
        value: Some(value),
        ..Default::default()
    };
    Ok(client.provider.estimate_gas(request).await?)
}

/// `(max_fee_per_gas, max_priority_fee_per_gas)` from the provider's default estimator.
pub async fn eip1559_fees(client: &RpcClient) -> Result<(u128, u128)> {
    let estimate = client.provider.estimate_eip1559_fees().await?;
    Ok((estimate.max_fee_per_gas, estimate.max_priority_fee_per_gas))
}

/// Broadcast a signed transaction, print its hash, and block until it is mined.
pub async fn send_and_wait(client: &RpcClient, envelope: TxEnvelope) -> Result<TransactionReceipt> {
    let pending = client.provider.send_tx_envelope(envelope).await?;
    let tx_hash: TxHash = *pending.tx_hash();
    println!("Transaction sent: {tx_hash:#x}, waiting...");
    tracing::info!(%tx_hash, "transaction broadcast");

    let receipt = pending.get_receipt().await?;
    if !receipt.status() {
        anyhow::bail!("transaction {tx_hash:#x} reverted");
    }
    Ok(receipt)
}
