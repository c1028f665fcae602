// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::common::{Address, U256};
use crate::contract::batch_executor::interface::IBatchExecutor;
use alloy::primitives::FixedBytes;
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;

// Taken from the generated interface so it cannot drift from the ABI.
pub(crate) const BATCH_TRANSFER_EVENT_SIGNATURE: FixedBytes<32> =
    IBatchExecutor::BatchTransfer::SIGNATURE_HASH;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Topics amount is unexpected. Was expecting 3")]
    TopicsAmountUnexpected,
    #[error("Event signature is missing")]
    EventSignatureMissing,
    #[error("Event signature does not match")]
    EventSignatureDoesNotMatch,
    #[error("Event data length is unexpected")]
    DataLengthUnexpected,
}

/// Struct for the BatchTransfer event emitted by the batch executor contract.
#[derive(Debug)]
pub(crate) struct BatchTransferEvent {
    pub sender: Address,
    /// Zero for native batches.
    pub token: Address,
    pub total_amount: U256,
    pub recipient_count: U256,
}

impl TryFrom<Log> for BatchTransferEvent {
    type Error = Error;

    fn try_from(log: Log) -> Result<Self, Self::Error> {
        // Verify the amount of topics
        if log.topics().len() != 3 {
            error!("Topics amount is unexpected. Was expecting 3");
            return Err(Error::TopicsAmountUnexpected);
        }

        let topic0 = log
            .topics()
            .first()
            .ok_or(Error::EventSignatureMissing)
            .inspect_err(|_| error!("Event signature is missing"))?;

        // Verify the event signature
        if topic0 != &BATCH_TRANSFER_EVENT_SIGNATURE {
            error!(
                "Event signature does not match. Expected: {:?}, got: {:?}",
                BATCH_TRANSFER_EVENT_SIGNATURE, topic0
            );
            return Err(Error::EventSignatureDoesNotMatch);
        }

        // Extract the data
        let sender = Address::from_slice(&log.topics()[1][12..]);
        let token = Address::from_slice(&log.topics()[2][12..]);

        let data = log.inner.data.data.as_ref();
        if data.len() != 64 {
            return Err(Error::DataLengthUnexpected);
        }
        let total_amount = U256::from_be_slice(&data[..32]);
        let recipient_count = U256::from_be_slice(&data[32..]);

        Ok(Self {
            sender,
            token,
            total_amount,
            recipient_count,
        })
    }
}
