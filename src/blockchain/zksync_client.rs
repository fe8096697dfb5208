// src/blockchain/zksync_client.rs
//! zkSync blockchain client implementation.
//!
//! Provides a high-level interface for interacting with zkSync Era over JSON-RPC:
//! read-only contract queries through a plain provider, and transaction sending through
//! a signer middleware when a wallet key is configured.

use crate::error::{DidError, Result};
use crate::wallet::key_management::KeyManager;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::LocalWallet;
use ethers::middleware::SignerMiddleware;
use ethers::types::{Address, H256, U64};
use ethers_contract::{Contract, ContractError};
use ethers_core::abi::{Abi, Detokenize, Tokenize};
use log::{debug, info};
use std::sync::Arc;

/// Provider wrapped with the wallet that signs transactions.
pub type SignerClient = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

/// zkSync blockchain client for managing wallet and contract interactions.
///
/// Cloning is cheap; the provider and signer are shared.
#[derive(Clone)]
pub struct ZkSyncClient {
    /// zkSync RPC provider
    provider: Arc<Provider<Http>>,
    /// Signing middleware, absent for a read-only client
    signer: Option<Arc<SignerClient>>,
    keys: Option<KeyManager>,
}

impl ZkSyncClient {
    /// Creates a new zkSync client instance.
    ///
    /// # Arguments
    /// * `rpc_url` - zkSync RPC endpoint URL
    /// * `private_key` - Hex-encoded private key (with or without 0x prefix); `None`
    ///   gives a read-only client
    ///
    /// # Errors
    /// Returns error if:
    /// - The RPC URL is malformed
    /// - Private key is invalid
    /// - Chain ID cannot be retrieved
    pub async fn new(rpc_url: &str, private_key: Option<&str>) -> Result<Self> {
        let provider = Arc::new(
            Provider::<Http>::try_from(rpc_url)
                .map_err(|e| DidError::Config(format!("invalid RPC URL {rpc_url}: {e}")))?,
        );

        let Some(private_key) = private_key else {
            info!("no wallet key configured, client is read-only");
            return Ok(Self { provider, signer: None, keys: None });
        };

        // Transactions must be signed for the chain they are sent to
        let chain_id = provider.get_chainid().await?.as_u64();
        let keys = KeyManager::from_hex(private_key)?.with_chain_id(chain_id);
        let signer = SignerMiddleware::new(provider.clone(), keys.wallet().clone());
        info!("wallet {:?} connected on chain {chain_id}", keys.address());

        Ok(Self {
            provider,
            signer: Some(Arc::new(signer)),
            keys: Some(keys),
        })
    }

    /// Gets the connected wallet's address, if any.
    pub fn signer_address(&self) -> Option<Address> {
        self.keys.as_ref().map(KeyManager::address)
    }

    pub fn keys(&self) -> Option<&KeyManager> {
        self.keys.as_ref()
    }

    /// Sends a transaction to a smart contract and waits for its receipt.
    ///
    /// # Errors
    /// Returns error if:
    /// - No wallet is configured
    /// - Method invocation fails
    /// - The transaction is dropped from the mempool or reverts
    pub async fn send_transaction(
        &self,
        contract_address: Address,
        abi: &Abi,
        method: &str,
        params: impl Tokenize + Send,
    ) -> Result<H256> {
        let signer = self.signer.as_ref().ok_or(DidError::NoSigner)?;
        let contract = Contract::new(contract_address, abi.clone(), signer.clone());

        let call = contract.method::<_, ()>(method, params)?;
        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash = pending.tx_hash();
        debug!("{method} sent as {tx_hash:?}");

        let receipt = pending
            .await?
            .ok_or_else(|| DidError::Transaction(format!("{method} {tx_hash:?} was dropped")))?;
        if receipt.status == Some(U64::zero()) {
            return Err(DidError::Transaction(format!("{method} {tx_hash:?} reverted")));
        }
        info!("{method} confirmed in {tx_hash:?}");
        Ok(tx_hash)
    }

    /// Queries a smart contract (read-only operation).
    ///
    /// # Errors
    /// Returns error if:
    /// - Method invocation fails
    /// - The call reverts ([`DidError::Reverted`])
    /// - Return value decoding fails
    pub async fn query_contract<R: Detokenize + Send + Sync>(
        &self,
        contract_address: Address,
        abi: &Abi,
        method: &str,
        params: impl Tokenize + Send,
    ) -> Result<R> {
        let contract = Contract::new(contract_address, abi.clone(), self.provider.clone());

        contract
            .method::<_, R>(method, params)?
            .call()
            .await
            .map_err(contract_error)
    }
}

fn contract_error<M: Middleware>(err: ContractError<M>) -> DidError {
    match err {
        ContractError::Revert(data) => DidError::Reverted(format!("{data:?}")),
        other => DidError::Contract(other.to_string()),
    }
}
