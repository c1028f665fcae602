// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::common::Address;
use crate::{Network, NetworkError};
use rand::Rng;
use std::env;

/// environment variable to connect to a custom EVM network
pub const RPC_URL: &str = "RPC_URL";
const RPC_URL_BUILD_TIME_VAL: Option<&str> = option_env!("RPC_URL");
pub const EXECUTOR_CONTRACT_ADDRESS: &str = "EXECUTOR_CONTRACT_ADDRESS";
const EXECUTOR_CONTRACT_ADDRESS_BUILD_TIME_VAL: Option<&str> =
    option_env!("EXECUTOR_CONTRACT_ADDRESS");

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to get network configuration: {0}")]
    FailedToGetNetwork(String),
    #[error(transparent)]
    InvalidNetwork(#[from] NetworkError),
}

/// Generate a random Address.
pub fn dummy_address() -> Address {
    Address::new(rand::rngs::OsRng.gen())
}

/// Get the `Network` from environment variables.
/// Returns an error if any of them is missing or malformed.
pub fn get_network_from_env() -> Result<Network, Error> {
    let vars = [
        env::var(RPC_URL)
            .ok()
            .or_else(|| RPC_URL_BUILD_TIME_VAL.map(|s| s.to_string())),
        env::var(EXECUTOR_CONTRACT_ADDRESS)
            .ok()
            .or_else(|| EXECUTOR_CONTRACT_ADDRESS_BUILD_TIME_VAL.map(|s| s.to_string())),
    ]
    .into_iter()
    .map(|var| {
        var.ok_or(Error::FailedToGetNetwork(format!(
            "missing env var, make sure to set all of: {RPC_URL}, {EXECUTOR_CONTRACT_ADDRESS}"
        )))
    })
    .collect::<Result<Vec<String>, Error>>()?;

    info!("Using custom EVM network from environment variables");
    Ok(Network::new(&vars[0], &vars[1])?)
}
