// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::common::Amount;
use alloy::primitives::utils::{format_units, parse_units, ParseUnits};

/// Decimals of the native asset. Token amounts use their own decimals.
pub const NATIVE_DECIMALS: u8 = 18;

/// The maximum number of decimals a 256 bit amount can be scaled by.
const MAX_DECIMALS: u8 = 77;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Failed to parse amount: {0}")]
    InvalidAmount(String),
    #[error("Amount must not be negative")]
    NegativeAmount,
    #[error("Unsupported decimals value: {0}")]
    UnsupportedDecimals(u8),
}

/// Convert a human readable decimal amount into its base unit representation.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<Amount, Error> {
    if decimals > MAX_DECIMALS {
        return Err(Error::UnsupportedDecimals(decimals));
    }

    let parsed = parse_units(amount, decimals)
        .map_err(|err| Error::InvalidAmount(format!("{amount}: {err}")))?;

    match parsed {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => Err(Error::NegativeAmount),
    }
}

/// Format a base unit amount as a decimal string, trimming trailing zeros but
/// always keeping at least one fractional digit.
///
/// Falls back to the raw base unit value if the decimals are out of range.
pub fn format_amount(value: Amount, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let formatted = match format_units(value, decimals) {
        Ok(formatted) => formatted,
        Err(_) => return value.to_string(),
    };

    if !formatted.contains('.') {
        return formatted;
    }

    let trimmed = formatted.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}
