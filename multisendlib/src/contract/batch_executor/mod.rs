pub mod error;
pub mod interface;

pub use interface::IBatchExecutor;

use crate::common::{Address, Amount, Calldata};
use crate::contract::batch_executor::error::Error;
use crate::contract::batch_executor::interface::IBatchExecutor::IBatchExecutorInstance;
use alloy::providers::{Network, Provider};
use alloy::transports::Transport;

/// Mirror of the executor's own input validation, run before any calldata is
/// built so malformed batches fail locally instead of reverting on chain.
fn check_parallel_arrays(recipients: &[Address], amounts: &[Amount]) -> Result<(), Error> {
    if recipients.len() != amounts.len() {
        return Err(Error::LengthMismatch(recipients.len(), amounts.len()));
    }
    if recipients.is_empty() {
        return Err(Error::EmptyInput);
    }
    for (position, recipient) in recipients.iter().enumerate() {
        if recipient.is_zero() {
            return Err(Error::InvalidRecipient(position));
        }
    }
    Ok(())
}

fn check_amounts_nonzero(amounts: &[Amount]) -> Result<(), Error> {
    for (position, amount) in amounts.iter().enumerate() {
        if amount.is_zero() {
            return Err(Error::ZeroAmount(position));
        }
    }
    Ok(())
}

fn check_tokens_nonzero(tokens: &[Address]) -> Result<(), Error> {
    for (position, token) in tokens.iter().enumerate() {
        if token.is_zero() {
            return Err(Error::InvalidToken(position));
        }
    }
    Ok(())
}

pub struct BatchExecutorHandler<T: Transport + Clone, P: Provider<T, N>, N: Network> {
    pub contract: IBatchExecutorInstance<T, P, N>,
}

impl<T, P, N> BatchExecutorHandler<T, P, N>
where
    T: Transport + Clone,
    P: Provider<T, N>,
    N: Network,
{
    /// Create a new BatchExecutorHandler instance from the deployed
    /// contract's address.
    pub fn new(contract_address: Address, provider: P) -> Self {
        let contract = IBatchExecutor::new(contract_address, provider);
        Self { contract }
    }

    /// Set the provider
    pub fn set_provider(&mut self, provider: P) {
        let address = *self.contract.address();
        self.contract = IBatchExecutor::new(address, provider);
    }

    /// Returns the native multi send transaction calldata (input, to).
    pub fn native_transfer_calldata(
        &self,
        recipients: &[Address],
        amounts: &[Amount],
    ) -> Result<(Calldata, Address), Error> {
        check_parallel_arrays(recipients, amounts)?;

        let calldata = self
            .contract
            .batchTransferNative(recipients.to_vec(), amounts.to_vec())
            .calldata()
            .to_owned();

        Ok((calldata, *self.contract.address()))
    }

    /// Returns the single token multi send transaction calldata (input, to).
    pub fn token_transfer_calldata(
        &self,
        token: Address,
        recipients: &[Address],
        amounts: &[Amount],
    ) -> Result<(Calldata, Address), Error> {
        check_tokens_nonzero(&[token])?;
        check_parallel_arrays(recipients, amounts)?;
        check_amounts_nonzero(amounts)?;

        let calldata = self
            .contract
            .batchTransferToken(token, recipients.to_vec(), amounts.to_vec())
            .calldata()
            .to_owned();

        Ok((calldata, *self.contract.address()))
    }

    /// Returns the multi token single recipient transaction calldata
    /// (input, to).
    pub fn multi_token_transfer_calldata(
        &self,
        tokens: &[Address],
        recipient: Address,
        amounts: &[Amount],
    ) -> Result<(Calldata, Address), Error> {
        if tokens.len() != amounts.len() {
            return Err(Error::LengthMismatch(tokens.len(), amounts.len()));
        }
        if tokens.is_empty() {
            return Err(Error::EmptyInput);
        }
        if recipient.is_zero() {
            return Err(Error::InvalidRecipient(0));
        }
        // Per entry, in the executor's own order.
        for (position, (token, amount)) in tokens.iter().zip(amounts).enumerate() {
            if token.is_zero() {
                return Err(Error::InvalidToken(position));
            }
            if amount.is_zero() {
                return Err(Error::ZeroAmount(position));
            }
        }

        let calldata = self
            .contract
            .batchTransferMultiToken(tokens.to_vec(), recipient, amounts.to_vec())
            .calldata()
            .to_owned();

        Ok((calldata, *self.contract.address()))
    }

    /// Simulate the native multi send and return the gas it would use.
    pub async fn estimate_native_gas(
        &self,
        recipients: &[Address],
        amounts: &[Amount],
        attached_value: Amount,
    ) -> Result<u128, Error> {
        check_parallel_arrays(recipients, amounts)?;

        let gas = self
            .contract
            .batchTransferNative(recipients.to_vec(), amounts.to_vec())
            .value(attached_value)
            .estimate_gas()
            .await
            .inspect_err(|err| error!("Error estimating native batch gas: {err:?}"))?;

        Ok(gas.into())
    }

    /// Simulate the single token multi send and return the gas it would use.
    pub async fn estimate_token_gas(
        &self,
        token: Address,
        recipients: &[Address],
        amounts: &[Amount],
    ) -> Result<u128, Error> {
        check_tokens_nonzero(&[token])?;
        check_parallel_arrays(recipients, amounts)?;
        check_amounts_nonzero(amounts)?;

        let gas = self
            .contract
            .batchTransferToken(token, recipients.to_vec(), amounts.to_vec())
            .estimate_gas()
            .await
            .inspect_err(|err| error!("Error estimating token batch gas: {err:?}"))?;

        Ok(gas.into())
    }

    /// Submit one atomic native multi send carrying the attached value and
    /// wait for it to finalize. The attached value must equal the amount sum,
    /// exactly as the contract itself requires.
    pub async fn batch_transfer_native(
        &self,
        recipients: Vec<Address>,
        amounts: Vec<Amount>,
        attached_value: Amount,
        gas_limit: u64,
    ) -> Result<N::ReceiptResponse, Error> {
        check_parallel_arrays(&recipients, &amounts)?;

        let total: Amount = amounts.iter().copied().sum();
        if attached_value != total {
            return Err(Error::ValueMismatch {
                expected: total,
                actual: attached_value,
            });
        }

        debug!(
            "Submitting native batch transfer to {} recipients, total {total}",
            recipients.len()
        );
        let receipt = self
            .contract
            .batchTransferNative(recipients, amounts)
            .value(attached_value)
            .gas(gas_limit.into())
            .send()
            .await
            .inspect_err(|err| error!("Error sending native batch transfer: {err:?}"))?
            .get_receipt()
            .await
            .inspect_err(|err| error!("Error waiting for native batch transfer: {err:?}"))?;

        Ok(receipt)
    }

    /// Submit one atomic single token multi send and wait for it to finalize.
    /// The executor draws the tokens via its allowance, so the approval must
    /// already be in place.
    pub async fn batch_transfer_token(
        &self,
        token: Address,
        recipients: Vec<Address>,
        amounts: Vec<Amount>,
        gas_limit: u64,
    ) -> Result<N::ReceiptResponse, Error> {
        check_tokens_nonzero(&[token])?;
        check_parallel_arrays(&recipients, &amounts)?;
        check_amounts_nonzero(&amounts)?;

        debug!(
            "Submitting batch transfer of token {token} to {} recipients",
            recipients.len()
        );
        let receipt = self
            .contract
            .batchTransferToken(token, recipients, amounts)
            .gas(gas_limit.into())
            .send()
            .await
            .inspect_err(|err| error!("Error sending token batch transfer: {err:?}"))?
            .get_receipt()
            .await
            .inspect_err(|err| error!("Error waiting for token batch transfer: {err:?}"))?;

        Ok(receipt)
    }

    /// Submit one atomic multi token transfer to a single recipient and wait
    /// for it to finalize.
    pub async fn batch_transfer_multi_token(
        &self,
        tokens: Vec<Address>,
        recipient: Address,
        amounts: Vec<Amount>,
        gas_limit: u64,
    ) -> Result<N::ReceiptResponse, Error> {
        // Same checks as the calldata builder.
        self.multi_token_transfer_calldata(&tokens, recipient, &amounts)?;

        let receipt = self
            .contract
            .batchTransferMultiToken(tokens, recipient, amounts)
            .gas(gas_limit.into())
            .send()
            .await
            .inspect_err(|err| error!("Error sending multi token transfer: {err:?}"))?
            .get_receipt()
            .await
            .inspect_err(|err| error!("Error waiting for multi token transfer: {err:?}"))?;

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{http_provider, HttpProvider};
    use crate::utils::dummy_address;
    use alloy::network::Ethereum;
    use alloy::sol_types::SolCall;
    use alloy::transports::http::{Client, Http};

    fn test_handler() -> BatchExecutorHandler<Http<Client>, HttpProvider, Ethereum> {
        let provider = http_provider(
            "http://localhost:8545"
                .parse()
                .expect("hardcoded URL must parse"),
        );
        BatchExecutorHandler::new(dummy_address(), provider)
    }

    #[test]
    fn native_calldata_matches_abi_encoding() {
        let handler = test_handler();
        let recipients = vec![dummy_address(), dummy_address()];
        let amounts = vec![Amount::from(1u64), Amount::from(2u64)];

        let (calldata, to) = handler
            .native_transfer_calldata(&recipients, &amounts)
            .expect("valid batch must encode");

        let expected = IBatchExecutor::batchTransferNativeCall {
            recipients,
            amounts,
        }
        .abi_encode();
        assert_eq!(calldata.as_ref(), expected.as_slice());
        assert_eq!(&to, handler.contract.address());
    }

    #[test]
    fn token_calldata_matches_abi_encoding() {
        let handler = test_handler();
        let token = dummy_address();
        let recipients = vec![dummy_address()];
        let amounts = vec![Amount::from(100_000_000u64)];

        let (calldata, _) = handler
            .token_transfer_calldata(token, &recipients, &amounts)
            .expect("valid batch must encode");

        let expected = IBatchExecutor::batchTransferTokenCall {
            token,
            recipients,
            amounts,
        }
        .abi_encode();
        assert_eq!(calldata.as_ref(), expected.as_slice());
    }

    #[test]
    fn rejects_length_mismatch_before_encoding() {
        let handler = test_handler();
        let recipients = vec![dummy_address(), dummy_address()];
        let amounts = vec![Amount::from(1u64)];

        let result = handler.native_transfer_calldata(&recipients, &amounts);
        assert!(matches!(result, Err(Error::LengthMismatch(2, 1))));
    }

    #[test]
    fn rejects_empty_input_before_encoding() {
        let handler = test_handler();
        let result = handler.native_transfer_calldata(&[], &[]);
        assert!(matches!(result, Err(Error::EmptyInput)));
    }

    #[test]
    fn rejects_zero_address_recipients() {
        let handler = test_handler();
        let recipients = vec![dummy_address(), Address::ZERO];
        let amounts = vec![Amount::from(1u64), Amount::from(2u64)];

        let result = handler.native_transfer_calldata(&recipients, &amounts);
        assert!(matches!(result, Err(Error::InvalidRecipient(1))));
    }

    #[test]
    fn rejects_zero_token_amounts() {
        let handler = test_handler();
        let token = dummy_address();
        let recipients = vec![dummy_address(), dummy_address()];
        let amounts = vec![Amount::from(1u64), Amount::ZERO];

        let result = handler.token_transfer_calldata(token, &recipients, &amounts);
        assert!(matches!(result, Err(Error::ZeroAmount(1))));
    }

    #[test]
    fn rejects_zero_token_address() {
        let handler = test_handler();
        let recipients = vec![dummy_address()];
        let amounts = vec![Amount::from(1u64)];

        let result = handler.token_transfer_calldata(Address::ZERO, &recipients, &amounts);
        assert!(matches!(result, Err(Error::InvalidToken(0))));
    }

    #[test]
    fn multi_token_checks_every_entry() {
        let handler = test_handler();
        let recipient = dummy_address();

        let result = handler.multi_token_transfer_calldata(
            &[dummy_address(), Address::ZERO],
            recipient,
            &[Amount::from(1u64), Amount::from(2u64)],
        );
        assert!(matches!(result, Err(Error::InvalidToken(1))));

        let result = handler.multi_token_transfer_calldata(
            &[dummy_address()],
            Address::ZERO,
            &[Amount::from(1u64)],
        );
        assert!(matches!(result, Err(Error::InvalidRecipient(0))));

        let result = handler.multi_token_transfer_calldata(
            &[dummy_address()],
            recipient,
            &[Amount::ZERO],
        );
        assert!(matches!(result, Err(Error::ZeroAmount(0))));
    }

    #[tokio::test]
    async fn native_send_rejects_value_mismatch_locally() {
        let handler = test_handler();
        let recipients = vec![dummy_address()];
        let amounts = vec![Amount::from(5u64)];

        // Wrong attached value fails before anything touches the network.
        let result = handler
            .batch_transfer_native(recipients, amounts, Amount::from(4u64), 21_000)
            .await;
        assert!(matches!(
            result,
            Err(Error::ValueMismatch { expected, actual })
                if expected == Amount::from(5u64) && actual == Amount::from(4u64)
        ));
    }
}
