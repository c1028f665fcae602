use crate::common::{Address, Calldata, TxHash, U256};
use crate::contract::erc20::IERC20::IERC20Instance;
use alloy::providers::{Network, Provider};
use alloy::sol;
use alloy::transports::{RpcError, Transport, TransportErrorKind};

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function transfer(address to, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);
        function decimals() external view returns (uint8);
    }
);

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ContractError(#[from] alloy::contract::Error),
    #[error(transparent)]
    RpcError(#[from] RpcError<TransportErrorKind>),
    #[error(transparent)]
    PendingTransactionError(#[from] alloy::providers::PendingTransactionError),
}

pub struct Erc20Token<T: Transport + Clone, P: Provider<T, N>, N: Network> {
    pub contract: IERC20Instance<T, P, N>,
}

impl<T, P, N> Erc20Token<T, P, N>
where
    T: Transport + Clone,
    P: Provider<T, N>,
    N: Network,
{
    /// Create a handle onto a deployed token contract.
    pub fn new(token_address: Address, provider: P) -> Self {
        let contract = IERC20::new(token_address, provider);
        Erc20Token { contract }
    }

    pub fn set_provider(&mut self, provider: P) {
        let address = *self.contract.address();
        self.contract = IERC20::new(address, provider);
    }

    /// Get the raw token balance of an address.
    pub async fn balance_of(&self, account: Address) -> Result<U256, Error> {
        debug!("Getting balance of account: {account:?}");
        let balance = self
            .contract
            .balanceOf(account)
            .call()
            .await
            .inspect_err(|err| error!("Error getting balance of account: {err:?}"))?
            ._0;
        debug!("Balance of account: {account} is {balance}");
        Ok(balance)
    }

    /// Get the raw amount the spender may still move out of the owner's balance.
    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, Error> {
        debug!("Getting allowance of spender {spender:?} for owner {owner:?}");
        let allowance = self
            .contract
            .allowance(owner, spender)
            .call()
            .await
            .inspect_err(|err| error!("Error getting allowance: {err:?}"))?
            ._0;
        Ok(allowance)
    }

    /// The token's display decimals, if the contract exposes them.
    pub async fn decimals(&self) -> Result<u8, Error> {
        let decimals = self.contract.decimals().call().await?._0;
        Ok(decimals)
    }

    /// Approve spender to spend a raw amount of tokens. Waits for the
    /// approval to finalize.
    pub async fn approve(&self, spender: Address, value: U256) -> Result<TxHash, Error> {
        debug!("Approving spender to spend raw amt of tokens: {value}");
        let call = self.contract.approve(spender, value);
        let pending_tx_builder = call.send().await.inspect_err(|err| {
            error!(
                "Error approving spender {spender:?} to spend raw amt of tokens {value}: {err:?}"
            )
        })?;

        let pending_tx_hash = *pending_tx_builder.tx_hash();
        debug!("The approval for spender {spender:?} is pending with tx_hash: {pending_tx_hash:?}");
        let tx_hash = pending_tx_builder.watch().await.inspect_err(|err| {
            error!("Error watching approve tx with hash {pending_tx_hash:?}: {err:?}")
        })?;

        debug!("Approve tx with hash {tx_hash:?} is successful");

        Ok(tx_hash)
    }

    /// Returns the approve transaction calldata (input, to).
    pub fn approve_calldata(&self, spender: Address, value: U256) -> (Calldata, Address) {
        let calldata = self.contract.approve(spender, value).calldata().to_owned();
        (calldata, *self.contract.address())
    }

    /// Returns the transfer transaction calldata (input, to).
    pub fn transfer_calldata(&self, receiver: Address, amount: U256) -> (Calldata, Address) {
        let calldata = self.contract.transfer(receiver, amount).calldata().to_owned();
        (calldata, *self.contract.address())
    }
}
