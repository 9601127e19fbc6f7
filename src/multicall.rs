use crate::abi::{decode_output, encode_call};
use crate::rpc::EthRpc;
use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::Function;
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{SolCall, SolValue};
use anyhow::{Context, Result};

alloy_sol_types::sol! {
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct Call3Result {
        bool success;
        bytes returnData;
    }

    function aggregate3(Call3[] calls) external payable returns (Call3Result[] returnData);
}

struct QueuedCall<'a> {
    target: Address,
    data: Bytes,
    function: &'a Function,
}

/// A batch of view calls answered in one round trip through Multicall3.
///
/// Results come back in enqueue order and carry no key of their own: callers
/// regroup them by replaying the exact loops they used to queue them. Reverted
/// calls yield `None`.
#[derive(Default)]
pub struct Multicall<'a> {
    calls: Vec<QueuedCall<'a>>,
}

impl<'a> Multicall<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: Address, function: &'a Function, args: &[DynSolValue]) -> Result<()> {
        let data = encode_call(function, args)?;
        self.calls.push(QueuedCall {
            target,
            data,
            function,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Without an aggregator address the calls are issued one at a time.
    pub async fn call<C: EthRpc>(
        self,
        caller: &C,
        aggregator: Option<Address>,
    ) -> Result<Vec<Option<DynSolValue>>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        match aggregator {
            Some(aggregator) => self.aggregate(caller, aggregator).await,
            None => self.sequential(caller).await,
        }
    }

    async fn aggregate<C: EthRpc>(self, caller: &C, aggregator: Address) -> Result<Vec<Option<DynSolValue>>> {
        let calls = self
            .calls
            .iter()
            .map(|call| Call3 {
                target: call.target,
                allowFailure: true,
                callData: call.data.clone(),
            })
            .collect();
        tracing::debug!(calls = self.len(), %aggregator, "multicall batch");

        let data = Bytes::from(aggregate3Call { calls }.abi_encode());
        let raw = caller.call(aggregator, data).await.context("multicall failed")?;
        let (results,) = <(Vec<Call3Result>,)>::abi_decode_params(&raw)
            .context("failed to decode multicall results")?;
        if results.len() != self.len() {
            anyhow::bail!("multicall returned {} results for {} calls", results.len(), self.len());
        }

        Ok(self
            .calls
            .iter()
            .zip(results)
            .map(|(call, result)| {
                if result.success {
                    first_output(call, &result.returnData)
                } else {
                    tracing::debug!(contract = %call.target, function = %call.function.name, "call reverted in batch");
                    None
                }
            })
            .collect())
    }

    async fn sequential<C: EthRpc>(self, caller: &C) -> Result<Vec<Option<DynSolValue>>> {
        let mut values = Vec::with_capacity(self.len());
        for call in &self.calls {
            let value = match caller.call(call.target, call.data.clone()).await {
                Ok(data) => first_output(call, &data),
                Err(err) => {
                    tracing::debug!(contract = %call.target, function = %call.function.name, "call failed: {err:#}");
                    None
                }
            };
            values.push(value);
        }
        Ok(values)
    }
}

fn first_output(call: &QueuedCall<'_>, data: &[u8]) -> Option<DynSolValue> {
    match decode_output(call.function, data) {
        Ok(values) => values.into_iter().next(),
        Err(err) => {
            tracing::debug!(contract = %call.target, "undecodable result: {err:#}");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::abi::tests::test_abis;
    use crate::abi::{address_arg, as_uint, uint_arg, Entity};
    use alloy_consensus::{SignableTransaction, TxEnvelope};
    use alloy_primitives::{address, Selector, TxHash, U256};
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, HashSet};

    pub(crate) const AGGREGATOR: Address = address!("cacacacacacacacacacacacacacacacacacacaca");

    /// A transaction the mock accepted, with its sender recovered from the signature.
    #[derive(Debug, Clone)]
    pub(crate) struct SentTx {
        pub(crate) from: Address,
        pub(crate) to: Address,
        pub(crate) chain_id: u64,
        pub(crate) nonce: u64,
        pub(crate) value: U256,
        pub(crate) input: Bytes,
    }

    impl SentTx {
        pub(crate) fn selector(&self) -> Selector {
            Selector::from_slice(&self.input[..4])
        }
    }

    /// Canned `eth_call` answers keyed by `(to, calldata)`. Unknown calls revert.
    /// Batches sent to [`AGGREGATOR`] are unpacked and answered from the same table.
    ///
    /// Transactions are accepted unless their `(to, selector)` was passed to
    /// [`MockChain::reject`], in which case gas estimation reverts.
    #[derive(Default)]
    pub(crate) struct MockChain {
        responses: HashMap<(Address, Bytes), Bytes>,
        rejected: HashSet<(Address, Selector)>,
        pub(crate) round_trips: Cell<usize>,
        pub(crate) sent: RefCell<Vec<SentTx>>,
    }

    impl MockChain {
        pub(crate) fn respond(&mut self, to: Address, function: &Function, args: &[DynSolValue], output: Vec<u8>) {
            let data = encode_call(function, args).unwrap();
            self.respond_raw(to, data, output);
        }

        pub(crate) fn respond_raw(&mut self, to: Address, data: impl Into<Bytes>, output: Vec<u8>) {
            self.responses.insert((to, data.into()), Bytes::from(output));
        }

        pub(crate) fn reject(&mut self, to: Address, selector: impl Into<Selector>) {
            self.rejected.insert((to, selector.into()));
        }

        pub(crate) fn sent_selectors(&self) -> Vec<(Address, Selector)> {
            self.sent.borrow().iter().map(|tx| (tx.to, tx.selector())).collect()
        }

        fn lookup(&self, to: Address, data: &Bytes) -> Option<Bytes> {
            self.responses.get(&(to, data.clone())).cloned()
        }
    }

    impl EthRpc for MockChain {
        async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
            self.round_trips.set(self.round_trips.get() + 1);
            if to == AGGREGATOR {
                let batch = aggregate3Call::abi_decode(&data)?;
                let results: Vec<Call3Result> = batch
                    .calls
                    .iter()
                    .map(|call| match self.lookup(call.target, &call.callData) {
                        Some(data) => Call3Result {
                            success: true,
                            returnData: data,
                        },
                        None => Call3Result {
                            success: false,
                            returnData: Bytes::new(),
                        },
                    })
                    .collect();
                return Ok(Bytes::from((results,).abi_encode_params()));
            }
            self.lookup(to, &data)
                .ok_or_else(|| anyhow::anyhow!("execution reverted"))
        }

        async fn nonce(&self, _account: Address) -> Result<u64> {
            Ok(self.sent.borrow().len() as u64)
        }

        async fn fees(&self) -> Result<(u128, u128)> {
            Ok((2_000_000_000, 1_000_000_000))
        }

        async fn estimate_gas(&self, _from: Address, to: Address, data: Bytes, _value: U256) -> Result<u64> {
            if data.len() >= 4 && self.rejected.contains(&(to, Selector::from_slice(&data[..4]))) {
                anyhow::bail!("execution reverted");
            }
            Ok(100_000)
        }

        async fn send_and_wait(&self, envelope: TxEnvelope) -> Result<TxHash> {
            let signed = envelope
                .as_eip1559()
                .ok_or_else(|| anyhow::anyhow!("expected an EIP-1559 transaction"))?;
            let tx = signed.tx();
            let from = signed
                .signature()
                .recover_address_from_prehash(&tx.signature_hash())?;
            let to = *tx.to.to().ok_or_else(|| anyhow::anyhow!("contract creation"))?;
            self.sent.borrow_mut().push(SentTx {
                from,
                to,
                chain_id: tx.chain_id,
                nonce: tx.nonce,
                value: tx.value,
                input: tx.input.clone(),
            });
            Ok(*envelope.tx_hash())
        }
    }

    #[tokio::test]
    async fn batched_results_match_individual_calls() {
        let abis = test_abis();
        let stake = abis.function(Entity::Delegator, "stake", 3).unwrap();
        let l1 = Address::repeat_byte(0x01);
        let operator = Address::repeat_byte(0x02);
        let delegators: Vec<Address> = (0x10..0x14).map(Address::repeat_byte).collect();
        let classes = [1u64, 2];

        let mut chain = MockChain::default();
        for (i, delegator) in delegators.iter().enumerate() {
            for class in classes {
                // One gap so reverted entries are exercised too.
                if i == 2 && class == 2 {
                    continue;
                }
                let args = [address_arg(l1), uint_arg(U256::from(class), 96), address_arg(operator)];
                let amount = U256::from(1000 * (i as u64 + 1) + class);
                chain.respond(*delegator, stake, &args, amount.abi_encode());
            }
        }

        let mut batched = Multicall::new();
        let mut one_by_one = Multicall::new();
        for delegator in &delegators {
            for class in classes {
                let args = [address_arg(l1), uint_arg(U256::from(class), 96), address_arg(operator)];
                batched.add(*delegator, stake, &args).unwrap();
                one_by_one.add(*delegator, stake, &args).unwrap();
            }
        }

        assert_eq!(batched.len(), delegators.len() * classes.len());
        let batched = batched.call(&chain, Some(AGGREGATOR)).await.unwrap();
        assert_eq!(chain.round_trips.get(), 1);

        let one_by_one = one_by_one.call(&chain, None).await.unwrap();

        assert_eq!(batched, one_by_one);
        for (i, group) in batched.chunks(classes.len()).enumerate() {
            for (class, value) in classes.iter().zip(group) {
                match value {
                    Some(value) => {
                        assert_eq!(as_uint(value).unwrap(), U256::from(1000 * (i as u64 + 1) + class))
                    }
                    None => assert_eq!((i, *class), (2, 2)),
                }
            }
        }
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let chain = MockChain::default();
        let values = Multicall::new().call(&chain, Some(AGGREGATOR)).await.unwrap();
        assert!(values.is_empty());
        assert_eq!(chain.round_trips.get(), 0);
    }
}
