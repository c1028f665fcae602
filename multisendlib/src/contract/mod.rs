pub mod batch_executor;
pub mod erc20;
