#[macro_use]
extern crate tracing;

pub mod amount;
pub mod balance;
pub mod batch;
pub mod common;
pub mod connection;
pub mod contract;
pub mod estimate;
pub(crate) mod event;
#[cfg(feature = "external-signer")]
pub mod external_signer;
pub mod sender;
pub mod transaction;
pub mod utils;

use crate::common::Address;
use alloy::transports::http::reqwest;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),
    #[error("Invalid executor contract address: {0}")]
    InvalidAddress(String),
}

/// Network configuration: the RPC endpoint to talk to and the address of the
/// deployed batch executor contract on that chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Network {
    pub rpc_url_http: reqwest::Url,
    pub executor_address: Address,
}

impl Network {
    pub fn new(rpc_url: &str, executor_address: &str) -> Result<Self, NetworkError> {
        let rpc_url_http = reqwest::Url::parse(rpc_url)
            .map_err(|err| NetworkError::InvalidRpcUrl(format!("{rpc_url}: {err}")))?;
        let executor_address = Address::from_str(executor_address)
            .map_err(|_| NetworkError::InvalidAddress(executor_address.to_string()))?;

        Ok(Self {
            rpc_url_http,
            executor_address,
        })
    }

    pub fn rpc_url(&self) -> &reqwest::Url {
        &self.rpc_url_http
    }

    pub fn executor_address(&self) -> &Address {
        &self.executor_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_rejects_malformed_config() {
        assert!(matches!(
            Network::new("not a url", "0x385e7887E5b41750E3679Da787B943EC42f37d75"),
            Err(NetworkError::InvalidRpcUrl(_))
        ));
        assert!(matches!(
            Network::new("http://localhost:8545", "0x1234"),
            Err(NetworkError::InvalidAddress(_))
        ));
    }

    #[test]
    fn network_parses_valid_config() {
        let network = Network::new(
            "http://localhost:8545",
            "0x385e7887E5b41750E3679Da787B943EC42f37d75",
        )
        .expect("config must parse");
        assert_eq!(network.rpc_url().as_str(), "http://localhost:8545/");
    }
}
