// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::common::{Address, TxHash, U256};
use crate::connection::http_provider;
use crate::event::{BatchTransferEvent, BATCH_TRANSFER_EVENT_SIGNATURE};
use crate::Network;
use alloy::primitives::FixedBytes;
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log, TransactionReceipt};
use alloy::transports::{RpcError, TransportErrorKind};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    RpcError(#[from] RpcError<TransportErrorKind>),
    #[error("Transaction is not confirmed")]
    TransactionUnconfirmed,
    #[error("Transaction was not found")]
    TransactionNotFound,
    #[error("Transaction has not been included in a block yet")]
    TransactionNotInBlock,
    #[error("No event proof found")]
    EventProofNotFound,
}

/// Get a transaction receipt by its hash.
pub async fn get_transaction_receipt_by_hash(
    network: &Network,
    transaction_hash: TxHash,
) -> Result<Option<TransactionReceipt>, Error> {
    let provider = http_provider(network.rpc_url().clone());
    let maybe_receipt = provider.get_transaction_receipt(transaction_hash).await?;
    Ok(maybe_receipt)
}

/// Get BatchTransfer logs for a block, filtered by sender and token.
async fn get_batch_transfer_logs(
    network: &Network,
    block_number: u64,
    sender: Address,
    token: Address,
) -> Result<Vec<Log>, Error> {
    let topic1: FixedBytes<32> = FixedBytes::left_padding_from(sender.as_slice());
    let topic2: FixedBytes<32> = FixedBytes::left_padding_from(token.as_slice());

    let filter = Filter::new()
        .event_signature(BATCH_TRANSFER_EVENT_SIGNATURE)
        .topic1(topic1)
        .topic2(topic2)
        .from_block(block_number)
        .to_block(block_number);

    let provider = http_provider(network.rpc_url().clone());
    let logs = provider.get_logs(&filter).await?;
    Ok(logs)
}

/// Verify that a finalized transaction performed a batch transfer with the
/// expected totals. Pass the zero address as token for native batches.
pub async fn verify_batch_transfer(
    network: &Network,
    tx_hash: TxHash,
    sender: Address,
    token: Address,
    expected_total: U256,
    expected_recipient_count: u64,
) -> Result<(), Error> {
    let transaction = get_transaction_receipt_by_hash(network, tx_hash)
        .await?
        .ok_or(Error::TransactionNotFound)?;

    // If the status is True, it means the tx is confirmed.
    if !transaction.status() {
        return Err(Error::TransactionUnconfirmed);
    }

    let block_number = transaction
        .block_number
        .ok_or(Error::TransactionNotInBlock)?;

    let logs = get_batch_transfer_logs(network, block_number, sender, token).await?;

    for log in logs {
        if log.transaction_hash != Some(tx_hash) {
            // Wrong transaction.
            continue;
        }

        if let Ok(event) = BatchTransferEvent::try_from(log) {
            // Check if the event matches what we expect.
            if event.sender == sender
                && event.token == token
                && event.total_amount == expected_total
                && event.recipient_count == U256::from(expected_recipient_count)
            {
                return Ok(());
            }
        }
    }

    Err(Error::EventProofNotFound)
}
