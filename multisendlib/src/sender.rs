use crate::amount::{self, parse_amount, NATIVE_DECIMALS};
use crate::balance::{build_report, TokenBalanceReport};
use crate::batch::{self, BatchState, BatchStatus, TransferEntry};
use crate::common::{Address, Amount, TxHash};
use crate::connection::{self, connect, Connection, WalletSource};
use crate::contract::batch_executor;
use crate::contract::erc20::{self, Erc20Token};
use crate::estimate::{apply_safety_margin, gas_limit_with_margin, CostEstimate};
use crate::Network;
use alloy::providers::Provider;
use alloy::rpc::types::TransactionReceipt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tokio::sync::OnceCell;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Batch is empty")]
    EmptyBatch,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error(transparent)]
    InvalidAmount(#[from] amount::Error),
    #[error(transparent)]
    Batch(#[from] batch::Error),
    #[error(transparent)]
    Connection(#[from] connection::Error),
    #[error("Balance query for token {token} failed: {source}")]
    BalanceQuery {
        token: Address,
        source: erc20::Error,
    },
    #[error("Cost estimation failed: {0}")]
    Estimation(#[from] batch_executor::error::Error),
    #[error("Batch submission failed for the {group} group during {step}: {source}")]
    Submission {
        group: GroupKind,
        step: SubmitStep,
        source: SubmitFailure,
        /// Receipts of the groups that finalized before the failure. Those
        /// transfers are not rolled back; the caller recovers them here.
        completed: Box<BatchReceipts>,
    },
}

/// Which transfer group an operation was working on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupKind {
    Native,
    Token(Address),
}

impl fmt::Display for GroupKind {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GroupKind::Native => formatter.write_str("native"),
            GroupKind::Token(token) => write!(formatter, "token {token}"),
        }
    }
}

/// Which step of the per-group pipeline failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitStep {
    BalanceCheck,
    Approval,
    Estimation,
    Transfer,
}

impl fmt::Display for SubmitStep {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let step = match self {
            SubmitStep::BalanceCheck => "balance check",
            SubmitStep::Approval => "approval",
            SubmitStep::Estimation => "gas estimation",
            SubmitStep::Transfer => "transfer",
        };
        formatter.write_str(step)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SubmitFailure {
    #[error(transparent)]
    Executor(#[from] batch_executor::error::Error),
    #[error(transparent)]
    Token(#[from] erc20::Error),
    #[error("Insufficient balance: {balance} available, {required} required")]
    InsufficientBalance { balance: Amount, required: Amount },
}

/// Outcome of one finalized on-chain call. A receipt with `success == false`
/// means the call was included but reverted; that is reported, not thrown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u128,
    pub success: bool,
    pub recipient_count: usize,
}

/// Receipts of a whole submission: the native group plus one entry per token
/// group that was processed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReceipts {
    pub native: Option<SubmitReceipt>,
    pub tokens: HashMap<Address, SubmitReceipt>,
    pub total_transfers: usize,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SubmitOptions {
    /// Gas limit applied to every submitted call. When unset each call is
    /// estimated individually and padded by the safety margin.
    pub gas_limit: Option<u64>,
}

/// Accumulates native and token transfers and submits them as grouped atomic
/// calls through the batch executor contract.
///
/// One sender owns its batch state and its connection; operations are
/// strictly sequential. Entries cannot be added while a submission is in
/// flight (`submit` takes `&mut self`).
pub struct BatchSender {
    network: Network,
    wallet: WalletSource,
    state: BatchState,
    connection: OnceCell<Connection>,
}

impl BatchSender {
    pub fn new(network: Network, wallet: WalletSource) -> Self {
        Self {
            network,
            wallet,
            state: BatchState::default(),
            connection: OnceCell::new(),
        }
    }

    /// Convenience constructor for the endpoint-plus-key configuration.
    /// The key is validated here; the connection itself is still only
    /// established on first use.
    pub fn new_from_private_key(network: Network, private_key: &str) -> Result<Self, Error> {
        let wallet = WalletSource::PrivateKey(private_key.to_string());
        wallet.to_wallet()?;
        Ok(Self::new(network, wallet))
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    async fn connection(&self) -> Result<&Connection, Error> {
        let connection = self
            .connection
            .get_or_try_init(|| async { connect(&self.network, &self.wallet) })
            .await?;
        Ok(connection)
    }

    /// Queue a native transfer. The amount is a decimal string in whole
    /// native units, e.g. "0.00001".
    pub fn add_native_transfer(&mut self, recipient: &str, amount: &str) -> Result<(), Error> {
        let recipient = parse_address(recipient)?;
        let amount = parse_amount(amount, NATIVE_DECIMALS)?;
        self.state.push_native(TransferEntry { recipient, amount })?;
        debug!("Queued native transfer of {amount} to {recipient}");
        Ok(())
    }

    /// Queue a token transfer. The amount is a decimal string in whole token
    /// units, scaled by `decimals` (18 when not supplied).
    pub fn add_token_transfer(
        &mut self,
        token: &str,
        recipient: &str,
        amount: &str,
        decimals: Option<u8>,
    ) -> Result<(), Error> {
        let token = parse_address(token)?;
        let recipient = parse_address(recipient)?;
        let decimals = decimals.unwrap_or(NATIVE_DECIMALS);
        let amount = parse_amount(amount, decimals)?;
        self.state
            .push_token(token, decimals, TransferEntry { recipient, amount })?;
        debug!("Queued transfer of {amount} of token {token} to {recipient}");
        Ok(())
    }

    /// Drop all queued transfers. Idempotent.
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// Aggregate view over the queued batch. Pure, never touches the network.
    pub fn status(&self) -> BatchStatus {
        self.state.status()
    }

    /// Check, per token group, whether the signer's balance covers the queued
    /// total. Read-only; the caller may ignore the outcome.
    pub async fn check_token_balances(&self) -> Result<Vec<TokenBalanceReport>, Error> {
        let connection = self.connection().await?;

        let mut reports = Vec::with_capacity(self.state.token_groups().len());
        for group in self.state.token_groups() {
            let token = Erc20Token::new(group.token, connection.provider.clone());

            let decimals = match token.decimals().await {
                Ok(decimals) => decimals,
                Err(err) => {
                    warn!(
                        "Token {} does not expose decimals, using the supplied hint {}: {err:?}",
                        group.token, group.decimals
                    );
                    group.decimals
                }
            };

            let balance = token
                .balance_of(connection.signer_address)
                .await
                .map_err(|source| Error::BalanceQuery {
                    token: group.token,
                    source,
                })?;

            reports.push(build_report(group, balance, decimals));
        }

        Ok(reports)
    }

    /// Predict the cost of the queued native group. Fails with `EmptyBatch`
    /// when nothing native is queued; never returns a silent zero-cost
    /// result.
    pub async fn estimate_native_cost(
        &self,
        gas_price: Option<u128>,
    ) -> Result<CostEstimate, Error> {
        if self.state.native_entries().is_empty() {
            return Err(Error::EmptyBatch);
        }
        let connection = self.connection().await?;

        let (recipients, amounts) = parallel_arrays(self.state.native_entries());
        let total_value = self.state.native_total();

        let gas_units = connection
            .executor
            .estimate_native_gas(&recipients, &amounts, total_value)
            .await?;
        let gas_price = resolve_gas_price(connection, gas_price).await;

        Ok(build_estimate(
            recipients.len(),
            total_value,
            gas_units,
            gas_price,
        ))
    }

    /// Predict the cost of one queued token group, mirroring the gas logic
    /// the submission path applies per group.
    pub async fn estimate_token_cost(
        &self,
        token: &str,
        gas_price: Option<u128>,
    ) -> Result<CostEstimate, Error> {
        let token = parse_address(token)?;
        let group = self.state.group(&token).ok_or(Error::EmptyBatch)?;
        let connection = self.connection().await?;

        let (recipients, amounts) = parallel_arrays(&group.entries);
        let required = group.required_total();

        let gas_units = connection
            .executor
            .estimate_token_gas(token, &recipients, &amounts)
            .await?;
        let gas_price = resolve_gas_price(connection, gas_price).await;

        Ok(build_estimate(
            recipients.len(),
            required,
            gas_units,
            gas_price,
        ))
    }

    /// Submit the queued batch: one atomic call for the native group, then,
    /// per token group in creation order, an approval (when the standing
    /// allowance is short) followed by one atomic transfer call.
    ///
    /// Each group's call is its own atomic unit. A failure in a later group
    /// does not roll back earlier groups; their receipts travel inside the
    /// returned error. An included-but-reverted call yields a receipt with
    /// `success == false` and processing continues.
    pub async fn submit(&mut self, options: SubmitOptions) -> Result<BatchReceipts, Error> {
        if self.state.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let connection = self.connection().await?;

        let mut receipts = BatchReceipts::default();

        if !self.state.native_entries().is_empty() {
            let (recipients, amounts) = parallel_arrays(self.state.native_entries());
            let total_value = self.state.native_total();

            let gas_limit = match options.gas_limit {
                Some(gas_limit) => gas_limit,
                None => {
                    let gas_units = connection
                        .executor
                        .estimate_native_gas(&recipients, &amounts, total_value)
                        .await
                        .map_err(|source| {
                            submission_error(
                                GroupKind::Native,
                                SubmitStep::Estimation,
                                source.into(),
                                &receipts,
                            )
                        })?;
                    gas_limit_with_margin(gas_units)
                }
            };

            info!(
                "Submitting native batch: {} transfers, total {total_value}",
                recipients.len()
            );
            let recipient_count = recipients.len();
            let receipt = connection
                .executor
                .batch_transfer_native(recipients, amounts, total_value, gas_limit)
                .await
                .map_err(|source| {
                    submission_error(
                        GroupKind::Native,
                        SubmitStep::Transfer,
                        source.into(),
                        &receipts,
                    )
                })?;

            let receipt = to_submit_receipt(receipt, recipient_count);
            if !receipt.success {
                error!(
                    "Native batch transaction {} finalized with failed status",
                    receipt.tx_hash
                );
            }
            receipts.total_transfers += recipient_count;
            receipts.native = Some(receipt);
        }

        for group in self.state.token_groups() {
            let group_kind = GroupKind::Token(group.token);
            let required = group.required_total();
            let token = Erc20Token::new(group.token, connection.provider.clone());

            // Local fail-fast check, distinct from the contract's own
            // allowance enforcement.
            let balance = token
                .balance_of(connection.signer_address)
                .await
                .map_err(|source| {
                    submission_error(
                        group_kind,
                        SubmitStep::BalanceCheck,
                        source.into(),
                        &receipts,
                    )
                })?;
            if balance < required {
                return Err(submission_error(
                    group_kind,
                    SubmitStep::BalanceCheck,
                    SubmitFailure::InsufficientBalance { balance, required },
                    &receipts,
                ));
            }

            let allowance = token
                .allowance(connection.signer_address, *self.network.executor_address())
                .await
                .map_err(|source| {
                    submission_error(group_kind, SubmitStep::Approval, source.into(), &receipts)
                })?;
            if allowance < required {
                // Approve exactly what this group needs, and only proceed
                // once the approval has finalized.
                debug!(
                    "Allowance {allowance} below required {required} for token {}, approving",
                    group.token
                );
                let approval_tx = token
                    .approve(*self.network.executor_address(), required)
                    .await
                    .map_err(|source| {
                        submission_error(group_kind, SubmitStep::Approval, source.into(), &receipts)
                    })?;
                debug!("Approval transaction {approval_tx} finalized");
            }

            let (recipients, amounts) = parallel_arrays(&group.entries);
            let gas_limit = match options.gas_limit {
                Some(gas_limit) => gas_limit,
                None => {
                    let gas_units = connection
                        .executor
                        .estimate_token_gas(group.token, &recipients, &amounts)
                        .await
                        .map_err(|source| {
                            submission_error(
                                group_kind,
                                SubmitStep::Estimation,
                                source.into(),
                                &receipts,
                            )
                        })?;
                    gas_limit_with_margin(gas_units)
                }
            };

            info!(
                "Submitting batch for token {}: {} transfers, total {required}",
                group.token,
                recipients.len()
            );
            let recipient_count = recipients.len();
            let receipt = connection
                .executor
                .batch_transfer_token(group.token, recipients, amounts, gas_limit)
                .await
                .map_err(|source| {
                    submission_error(group_kind, SubmitStep::Transfer, source.into(), &receipts)
                })?;

            let receipt = to_submit_receipt(receipt, recipient_count);
            if !receipt.success {
                error!(
                    "Batch transaction {} for token {} finalized with failed status",
                    receipt.tx_hash, group.token
                );
            }
            receipts.total_transfers += recipient_count;
            receipts.tokens.insert(group.token, receipt);
        }

        Ok(receipts)
    }
}

fn parse_address(value: &str) -> Result<Address, Error> {
    let address =
        Address::from_str(value).map_err(|_| Error::InvalidAddress(value.to_string()))?;
    if address.is_zero() {
        return Err(Error::InvalidAddress(value.to_string()));
    }
    Ok(address)
}

fn parallel_arrays(entries: &[TransferEntry]) -> (Vec<Address>, Vec<Amount>) {
    entries
        .iter()
        .map(|entry| (entry.recipient, entry.amount))
        .unzip()
}

async fn resolve_gas_price(connection: &Connection, gas_price: Option<u128>) -> u128 {
    if let Some(gas_price) = gas_price {
        return gas_price;
    }
    match connection.provider.get_gas_price().await {
        Ok(gas_price) => gas_price.into(),
        Err(err) => {
            warn!("Failed to query the gas price, explicitly falling back to zero: {err:?}");
            0
        }
    }
}

fn build_estimate(
    transfer_count: usize,
    total_value: Amount,
    gas_units: u128,
    gas_price: u128,
) -> CostEstimate {
    // Both factors fit 128 bits, the product always fits 256.
    let simulated_cost = Amount::from(gas_units) * Amount::from(gas_price);
    CostEstimate {
        transfer_count,
        total_value,
        gas_units,
        gas_price,
        simulated_cost,
        cost_with_margin: apply_safety_margin(simulated_cost),
    }
}

fn submission_error(
    group: GroupKind,
    step: SubmitStep,
    source: SubmitFailure,
    completed: &BatchReceipts,
) -> Error {
    Error::Submission {
        group,
        step,
        source,
        completed: Box::new(completed.clone()),
    }
}

fn to_submit_receipt(receipt: TransactionReceipt, recipient_count: usize) -> SubmitReceipt {
    SubmitReceipt {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        gas_used: receipt.gas_used.into(),
        success: receipt.status(),
        recipient_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::dummy_address;

    // First default Anvil account.
    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_sender() -> BatchSender {
        let network = Network::new(
            "http://localhost:8545",
            "0x385e7887E5b41750E3679Da787B943EC42f37d75",
        )
        .expect("test config must parse");
        BatchSender::new_from_private_key(network, TEST_PRIVATE_KEY)
            .expect("test key must be valid")
    }

    #[test]
    fn status_reflects_queued_transfers() -> Result<(), Error> {
        let mut sender = test_sender();
        let recipient_1 = dummy_address().to_string();
        let recipient_2 = dummy_address().to_string();
        let token = dummy_address().to_string();

        sender.add_native_transfer(&recipient_1, "0.00001")?;
        sender.add_native_transfer(&recipient_2, "0.00005")?;

        let status = sender.status();
        assert_eq!(status.native_transfers, 2);
        assert_eq!(status.total_transfers, 2);
        assert_eq!(status.total_native_value, "0.00006");

        sender.add_token_transfer(&token, &recipient_2, "100", Some(6))?;

        let status = sender.status();
        assert_eq!(status.total_transfers, 3);
        assert_eq!(status.token_transfers, 1);
        assert_eq!(status.distinct_tokens, 1);
        assert_eq!(status.unique_recipients, 2);

        let group = sender
            .state()
            .group(&parse_address(&token)?)
            .expect("group must exist");
        assert_eq!(group.required_total(), Amount::from(100_000_000u64));
        Ok(())
    }

    #[test]
    fn recipient_addresses_are_case_normalized() -> Result<(), Error> {
        let mut sender = test_sender();
        let recipient = dummy_address();

        sender.add_native_transfer(&recipient.to_string().to_lowercase(), "1")?;
        sender.add_native_transfer(&recipient.to_string().to_uppercase().replace("0X", "0x"), "2")?;

        assert_eq!(sender.status().unique_recipients, 1);
        Ok(())
    }

    #[test]
    fn rejects_malformed_and_zero_addresses() {
        let mut sender = test_sender();

        assert!(matches!(
            sender.add_native_transfer("not-an-address", "1"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            sender.add_native_transfer("0x0000000000000000000000000000000000000000", "1"),
            Err(Error::InvalidAddress(_))
        ));

        // Both the token and the recipient are validated independently.
        let valid = dummy_address().to_string();
        assert!(matches!(
            sender.add_token_transfer("0xnope", &valid, "1", None),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            sender.add_token_transfer(&valid, "0xnope", "1", None),
            Err(Error::InvalidAddress(_))
        ));

        assert!(sender.state().is_empty());
    }

    #[test]
    fn rejects_malformed_amounts_without_mutating_state() {
        let mut sender = test_sender();
        let recipient = dummy_address().to_string();

        assert!(matches!(
            sender.add_native_transfer(&recipient, "1.2.3"),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            sender.add_native_transfer(&recipient, "-1"),
            Err(Error::InvalidAmount(_))
        ));
        assert!(sender.state().is_empty());
    }

    #[test]
    fn token_decimals_default_to_native() -> Result<(), Error> {
        let mut sender = test_sender();
        let token = dummy_address();
        let recipient = dummy_address().to_string();

        sender.add_token_transfer(&token.to_string(), &recipient, "1", None)?;

        let group = sender.state().group(&token).expect("group must exist");
        assert_eq!(group.decimals, NATIVE_DECIMALS);
        assert_eq!(
            group.required_total(),
            Amount::from(1_000_000_000_000_000_000u64)
        );
        Ok(())
    }

    #[test]
    fn clear_resets_the_batch() -> Result<(), Error> {
        let mut sender = test_sender();
        sender.add_native_transfer(&dummy_address().to_string(), "1")?;
        sender.clear();
        assert_eq!(sender.status().total_transfers, 0);
        sender.clear();
        assert_eq!(sender.status().total_transfers, 0);
        Ok(())
    }

    #[test]
    fn invalid_private_key_is_rejected_eagerly() {
        let network = Network::new(
            "http://localhost:8545",
            "0x385e7887E5b41750E3679Da787B943EC42f37d75",
        )
        .expect("test config must parse");
        assert!(matches!(
            BatchSender::new_from_private_key(network, "0xnot-a-key"),
            Err(Error::Connection(connection::Error::InvalidPrivateKey))
        ));
    }

    #[tokio::test]
    async fn estimate_fails_on_empty_batch_before_any_network_io() {
        let sender = test_sender();
        assert!(matches!(
            sender.estimate_native_cost(None).await,
            Err(Error::EmptyBatch)
        ));
        assert!(matches!(
            sender
                .estimate_token_cost(&dummy_address().to_string(), None)
                .await,
            Err(Error::EmptyBatch)
        ));
    }

    #[tokio::test]
    async fn submit_fails_on_empty_batch_before_any_network_io() {
        let mut sender = test_sender();
        assert!(matches!(
            sender.submit(SubmitOptions::default()).await,
            Err(Error::EmptyBatch)
        ));
    }
}
