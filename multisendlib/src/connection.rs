use crate::common::{Address, EthereumWallet};
use crate::contract::batch_executor::BatchExecutorHandler;
use crate::Network;
use alloy::network::{Ethereum, NetworkWallet};
use alloy::providers::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy::providers::{Identity, ProviderBuilder, ReqwestProvider};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{reqwest, Client, Http};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Private key is invalid")]
    InvalidPrivateKey,
}

/// Where the signing identity comes from.
///
/// Either an RPC-endpoint-plus-private-key pair (the endpoint lives in
/// [`Network`]) or a wallet constructed elsewhere and injected by the caller.
/// Resolved once, on first use.
#[derive(Clone)]
pub enum WalletSource {
    /// Hex encoded private key, with or without `0x` prefix.
    PrivateKey(String),
    /// An externally constructed wallet, e.g. a hardware backed signer.
    Injected(EthereumWallet),
}

impl WalletSource {
    pub(crate) fn to_wallet(&self) -> Result<EthereumWallet, Error> {
        match self {
            WalletSource::PrivateKey(private_key) => {
                let signer = PrivateKeySigner::from_str(private_key.trim_start_matches("0x"))
                    .map_err(|err| {
                        error!("Failed to parse private key: {err:?}");
                        Error::InvalidPrivateKey
                    })?;
                Ok(EthereumWallet::from(signer))
            }
            WalletSource::Injected(wallet) => Ok(wallet.clone()),
        }
    }
}

// Never print key material.
impl fmt::Debug for WalletSource {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletSource::PrivateKey(_) => formatter.write_str("WalletSource::PrivateKey(..)"),
            WalletSource::Injected(_) => formatter.write_str("WalletSource::Injected(..)"),
        }
    }
}

pub(crate) type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    ReqwestProvider,
    Http<Client>,
    Ethereum,
>;

pub(crate) type WalletProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    ReqwestProvider,
    Http<Client>,
    Ethereum,
>;

/// A resolved connection: signing provider plus the executor contract handle.
/// Built lazily on first use and memoized for the sender's lifetime.
pub(crate) struct Connection {
    pub provider: WalletProvider,
    pub signer_address: Address,
    pub executor: BatchExecutorHandler<Http<Client>, WalletProvider, Ethereum>,
}

pub(crate) fn connect(network: &Network, source: &WalletSource) -> Result<Connection, Error> {
    let wallet = source.to_wallet()?;
    let signer_address =
        <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&wallet);
    let provider = wallet_provider(network.rpc_url().clone(), wallet);
    let executor = BatchExecutorHandler::new(*network.executor_address(), provider.clone());
    debug!("Connected to {} as {signer_address}", network.rpc_url());

    Ok(Connection {
        provider,
        signer_address,
        executor,
    })
}

pub(crate) fn http_provider(rpc_url: reqwest::Url) -> HttpProvider {
    ProviderBuilder::new()
        .with_recommended_fillers()
        .on_http(rpc_url)
}

pub(crate) fn wallet_provider(rpc_url: reqwest::Url, wallet: EthereumWallet) -> WalletProvider {
    ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(wallet)
        .on_http(rpc_url)
}

/// Generate a wallet backed by a random private key.
pub fn random_wallet() -> EthereumWallet {
    EthereumWallet::from(PrivateKeySigner::random())
}

#[cfg(test)]
mod tests {
    use super::*;

    // First default Anvil account.
    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn private_key_source_resolves_with_and_without_prefix() {
        let with_prefix = WalletSource::PrivateKey(TEST_PRIVATE_KEY.to_string());
        let without_prefix =
            WalletSource::PrivateKey(TEST_PRIVATE_KEY.trim_start_matches("0x").to_string());

        let wallet_a = with_prefix.to_wallet().expect("key must parse");
        let wallet_b = without_prefix.to_wallet().expect("key must parse");

        let address_a = <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&wallet_a);
        let address_b = <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&wallet_b);
        assert_eq!(address_a, address_b);
    }

    #[test]
    fn malformed_private_key_is_rejected() {
        let source = WalletSource::PrivateKey("0xnot-a-key".to_string());
        assert!(matches!(source.to_wallet(), Err(Error::InvalidPrivateKey)));
    }

    #[test]
    fn debug_output_redacts_key_material() {
        let source = WalletSource::PrivateKey(TEST_PRIVATE_KEY.to_string());
        let printed = format!("{source:?}");
        assert!(!printed.contains("ac0974"));
    }
}
