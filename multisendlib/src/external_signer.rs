// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::common::{Address, Amount, Calldata};
use crate::connection::http_provider;
use crate::contract::batch_executor::{self, BatchExecutorHandler};
use crate::contract::erc20::Erc20Token;
use crate::Network;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Batch executor contract error: {0}")]
    BatchExecutorContract(#[from] batch_executor::error::Error),
}

/// Approve an address / smart contract to spend this wallet's tokens.
///
/// Returns the transaction calldata (input, to).
pub fn approve_to_spend_tokens_calldata(
    network: &Network,
    token: Address,
    spender: Address,
    value: Amount,
) -> (Calldata, Address) {
    let provider = http_provider(network.rpc_url().clone());
    let token = Erc20Token::new(token, provider);
    token.approve_calldata(spender, value)
}

/// Transfer tokens from the supplied wallet to a single address.
///
/// Returns the transaction calldata (input, to).
pub fn transfer_tokens_calldata(
    network: &Network,
    token: Address,
    receiver: Address,
    amount: Amount,
) -> (Calldata, Address) {
    let provider = http_provider(network.rpc_url().clone());
    let token = Erc20Token::new(token, provider);
    token.transfer_calldata(receiver, amount)
}

/// Prepare a native multi send for an external signer.
///
/// Returns the transaction calldata (input, to). The signer must attach the
/// exact amount sum as transaction value.
pub fn batch_transfer_native_calldata(
    network: &Network,
    recipients: &[Address],
    amounts: &[Amount],
) -> Result<(Calldata, Address), Error> {
    let provider = http_provider(network.rpc_url().clone());
    let executor = BatchExecutorHandler::new(*network.executor_address(), provider);
    Ok(executor.native_transfer_calldata(recipients, amounts)?)
}

#[derive(Serialize, Deserialize)]
pub struct PreparedTokenBatch {
    pub calldata: Calldata,
    pub to: Address,
    pub approve_spender: Address,
    pub approve_amount: Amount,
}

/// Prepare a single token multi send for an external signer.
///
/// Returns the transfer calldata along with the approval the executor needs
/// before it can draw the tokens. The approval transaction must finalize
/// before the transfer is submitted.
pub fn batch_transfer_token_calldata(
    network: &Network,
    token: Address,
    recipients: &[Address],
    amounts: &[Amount],
) -> Result<PreparedTokenBatch, Error> {
    let provider = http_provider(network.rpc_url().clone());
    let executor = BatchExecutorHandler::new(*network.executor_address(), provider);
    let (calldata, to) = executor.token_transfer_calldata(token, recipients, amounts)?;

    Ok(PreparedTokenBatch {
        calldata,
        to,
        approve_spender: *network.executor_address(),
        approve_amount: amounts.iter().copied().sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::dummy_address;

    fn test_network() -> Network {
        Network::new(
            "http://localhost:8545",
            "0x385e7887E5b41750E3679Da787B943EC42f37d75",
        )
        .expect("test config must parse")
    }

    #[test]
    fn token_batch_requests_exact_approval() -> Result<(), Error> {
        let network = test_network();
        let prepared = batch_transfer_token_calldata(
            &network,
            dummy_address(),
            &[dummy_address(), dummy_address()],
            &[Amount::from(3u64), Amount::from(4u64)],
        )?;

        assert_eq!(prepared.approve_amount, Amount::from(7u64));
        assert_eq!(&prepared.approve_spender, network.executor_address());
        assert_eq!(&prepared.to, network.executor_address());
        assert!(!prepared.calldata.is_empty());
        Ok(())
    }

    #[test]
    fn native_batch_rejects_invalid_input() {
        let network = test_network();
        let result = batch_transfer_native_calldata(&network, &[dummy_address()], &[]);
        assert!(matches!(result, Err(Error::BatchExecutorContract(_))));
    }
}
