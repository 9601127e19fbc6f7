//! EIP-712 authorizations that let a third party submit an operator's opt-in or opt-out.

use crate::abi::Entity;
use crate::client::Client;
use crate::config::Deployment;
use crate::rpc::EthRpc;
use crate::signer::StakingSigner;
use crate::types::{deadline_after, format_timestamp};
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct};
use anyhow::{anyhow, Result};
use std::fmt;

alloy_sol_types::sol! {
    struct OptIn {
        address who;
        address where;
        uint256 nonce;
        uint48 deadline;
    }

    struct OptOut {
        address who;
        address where;
        uint256 nonce;
        uint48 deadline;
    }
}

const DOMAIN_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptInService {
    L1,
    Vault,
}

impl OptInService {
    /// EIP-712 domain name of the service contract.
    pub fn domain_name(self) -> &'static str {
        match self {
            OptInService::L1 => "OperatorL1OptInService",
            OptInService::Vault => "OperatorVaultOptInService",
        }
    }

    pub fn entity(self) -> Entity {
        match self {
            OptInService::L1 => Entity::OperatorL1OptIn,
            OptInService::Vault => Entity::OperatorVaultOptIn,
        }
    }

    pub fn address(self, deployment: &Deployment) -> Address {
        match self {
            OptInService::L1 => deployment.op_l1_opt_in,
            OptInService::Vault => deployment.op_vault_opt_in,
        }
    }

    pub fn domain(self, chain_id: u64, verifying_contract: Address) -> Eip712Domain {
        Eip712Domain::new(
            Some(self.domain_name().into()),
            Some(DOMAIN_VERSION.into()),
            Some(U256::from(chain_id)),
            Some(verifying_contract),
            None,
        )
    }
}

impl fmt::Display for OptInService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptInService::L1 => "L1",
            OptInService::Vault => "Vault",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    OptIn,
    OptOut,
}

/// The fields shared by both authorization kinds.
#[derive(Debug, Clone, Copy)]
pub struct Permit {
    pub who: Address,
    pub target: Address,
    pub nonce: U256,
    pub deadline: u64,
}

impl Permit {
    fn opt_in(&self) -> Result<OptIn> {
        Ok(OptIn {
            who: self.who,
            r#where: self.target,
            nonce: self.nonce,
            deadline: self.deadline.try_into().map_err(|_| anyhow!("deadline does not fit in uint48"))?,
        })
    }

    fn opt_out(&self) -> Result<OptOut> {
        Ok(OptOut {
            who: self.who,
            r#where: self.target,
            nonce: self.nonce,
            deadline: self.deadline.try_into().map_err(|_| anyhow!("deadline does not fit in uint48"))?,
        })
    }

    /// The digest a wallet signs for this permit under `domain`.
    pub fn signing_hash(&self, kind: Authorization, domain: &Eip712Domain) -> Result<B256> {
        Ok(match kind {
            Authorization::OptIn => self.opt_in()?.eip712_signing_hash(domain),
            Authorization::OptOut => self.opt_out()?.eip712_signing_hash(domain),
        })
    }

    pub async fn sign<S: StakingSigner>(
        &self,
        signer: &S,
        kind: Authorization,
        domain: &Eip712Domain,
    ) -> Result<alloy_primitives::Signature> {
        match kind {
            Authorization::OptIn => signer.sign_typed_data(&self.opt_in()?, domain).await,
            Authorization::OptOut => signer.sign_typed_data(&self.opt_out()?, domain).await,
        }
    }
}

/// Sign an opt-in or opt-out authorization for `target` valid for `duration` seconds.
///
/// Reading the current nonce is a read-path failure and propagates. Signing
/// failures are reported and yield `None`.
pub async fn sign_authorization<C: EthRpc, S: StakingSigner>(
    client: &Client<C>,
    signer: &S,
    service: OptInService,
    kind: Authorization,
    target: Address,
    duration: u64,
) -> Result<Option<String>> {
    let who = signer.address();
    let nonce = client.opt_in_nonce(service, who, target).await?;
    let permit = Permit {
        who,
        target,
        nonce,
        deadline: deadline_after(duration)?,
    };
    let domain = service.domain(client.chain_id(), service.address(&client.deployment));
    tracing::debug!(?kind, %service, %who, %target, %nonce, deadline = permit.deadline, "signing authorization");

    match permit.sign(signer, kind, &domain).await {
        Ok(signature) => {
            let encoded = hex::encode(signature.as_bytes());
            println!();
            println!("Operator: {who}");
            println!("{service}: {target}");
            println!("Nonce: {nonce}");
            println!("Deadline: {} ({})", permit.deadline, format_timestamp(permit.deadline));
            println!("Success! Your signature is: 0x{encoded}");
            Ok(Some(encoded))
        }
        Err(err) => {
            println!("Failed! Reason: {err:#}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::tests::{anvil_signer, ANVIL_ADDRESS};
    use alloy_primitives::keccak256;
    use alloy_sol_types::SolValue;

    fn permit() -> Permit {
        Permit {
            who: ANVIL_ADDRESS,
            target: Address::repeat_byte(0xab),
            nonce: U256::from(3u64),
            deadline: 1_700_000_000,
        }
    }

    #[test]
    fn type_strings_match_contracts() {
        let permit = permit();
        assert_eq!(
            OptIn::eip712_encode_type(),
            "OptIn(address who,address where,uint256 nonce,uint48 deadline)"
        );
        assert_eq!(
            OptOut::eip712_encode_type(),
            "OptOut(address who,address where,uint256 nonce,uint48 deadline)"
        );
    }

    #[test]
    fn signing_hash_matches_manual_encoding() {
        let permit = permit();
        let contract = Address::repeat_byte(0xcd);
        let domain = OptInService::L1.domain(43113, contract);

        let type_hash = keccak256("OptIn(address who,address where,uint256 nonce,uint48 deadline)");
        let struct_hash = keccak256(
            (type_hash, permit.who, permit.target, permit.nonce, U256::from(permit.deadline)).abi_encode(),
        );
        let domain_type = keccak256(
            "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let separator = keccak256(
            (
                domain_type,
                keccak256("OperatorL1OptInService"),
                keccak256("1"),
                U256::from(43113u64),
                contract,
            )
                .abi_encode(),
        );
        let mut digest = vec![0x19, 0x01];
        digest.extend_from_slice(separator.as_slice());
        digest.extend_from_slice(struct_hash.as_slice());

        assert_eq!(
            permit.signing_hash(Authorization::OptIn, &domain).unwrap(),
            keccak256(digest)
        );
        assert_ne!(
            permit.signing_hash(Authorization::OptIn, &domain).unwrap(),
            permit.signing_hash(Authorization::OptOut, &domain).unwrap()
        );
    }

    #[tokio::test]
    async fn local_signature_recovers_operator() {
        let permit = permit();
        let domain = OptInService::Vault.domain(31337, Address::repeat_byte(0xee));
        let signature = permit
            .sign(&anvil_signer(), Authorization::OptOut, &domain)
            .await
            .unwrap();
        let hash = permit.signing_hash(Authorization::OptOut, &domain).unwrap();
        assert_eq!(signature.recover_address_from_prehash(&hash).unwrap(), ANVIL_ADDRESS);
    }
}
