use crate::amount::format_amount;
use crate::batch::TokenGroup;
use crate::common::{Address, Amount};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Read-only sufficiency report for one token group. A diagnostic the caller
/// may ignore; producing it never mutates the batch.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalanceReport {
    pub token: Address,
    /// Decimals used for the formatted fields: the contract's own value when
    /// queryable, else the hint supplied with the entries.
    pub decimals: u8,
    #[serde_as(as = "DisplayFromStr")]
    pub balance: Amount,
    pub balance_formatted: String,
    #[serde_as(as = "DisplayFromStr")]
    pub required: Amount,
    pub required_formatted: String,
    /// `balance >= required`
    pub sufficient: bool,
    pub transfer_count: usize,
}

pub(crate) fn build_report(group: &TokenGroup, balance: Amount, decimals: u8) -> TokenBalanceReport {
    let required = group.required_total();
    TokenBalanceReport {
        token: group.token,
        decimals,
        balance,
        balance_formatted: format_amount(balance, decimals),
        required,
        required_formatted: format_amount(required, decimals),
        sufficient: balance >= required,
        transfer_count: group.entries.len(),
    }
}
